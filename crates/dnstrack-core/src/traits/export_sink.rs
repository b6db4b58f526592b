// # Export Sink Trait
//
// Defines the interface for recording every poll result outside the
// process.
//
// ## Purpose
//
// The export log is the only on-disk artifact of a measurement. It is an
// append-only record of what each nameserver answered and when, suitable
// for later analysis of the propagation timeline.
//
// ## Implementations
//
// - CSV file: [`CsvExportSink`](crate::export::CsvExportSink)
// - In-memory: [`MemoryExportSink`](crate::export::MemoryExportSink)

use async_trait::async_trait;

use crate::tracker::TrackerUpdate;

/// Trait for export sink implementations
///
/// # Thread Safety
///
/// Several trackers may report at the same moment. Implementations must
/// serialize writes so that each update lands as one complete line,
/// never interleaved with another.
///
/// # Failure Policy
///
/// Export is best effort. The tracker logs a failed `append()` and carries
/// on polling; a sink error never ends a measurement.
#[async_trait]
pub trait ExportSink: Send + Sync {
    /// Append one poll result
    ///
    /// # Parameters
    ///
    /// - `update`: The poll result to record
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The line was written
    /// - `Err(Error)`: Write error
    async fn append(&self, update: &TrackerUpdate) -> Result<(), crate::Error>;

    /// Persist any pending writes
    async fn flush(&self) -> Result<(), crate::Error>;
}
