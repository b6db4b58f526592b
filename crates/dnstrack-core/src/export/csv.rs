// # CSV Export Sink
//
// Append-only export file.
//
// ## Open Semantics
//
// The file is created exclusively: an existing file is never appended to or
// overwritten, and a missing parent directory is an error rather than being
// created. Both fail before any tracker starts.
//
// ## Write Semantics
//
// A `tokio::sync::Mutex` around the file serializes writers, and each
// update is written as a single buffer ending in `\n`, so lines from
// concurrent trackers never interleave.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use super::format_export_line;
use crate::Error;
use crate::traits::ExportSink;
use crate::tracker::TrackerUpdate;

/// Export sink writing one line per poll to a new file
///
/// # Example
///
/// ```rust,no_run
/// use dnstrack_core::export::CsvExportSink;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let sink = CsvExportSink::create("/tmp/dns_tracker_output.csv").await?;
///     println!("exporting to {}", sink.path().display());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct CsvExportSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl CsvExportSink {
    /// Create the export file
    ///
    /// # Returns
    ///
    /// - `Ok(CsvExportSink)`: The file was created empty
    /// - `Err(Error::Export)`: If the file exists or its directory is missing
    pub async fn create<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(Error::export(format!(
                    "Export directory {} does not exist",
                    parent.display()
                )));
            }
        }

        let file = OpenOptions::new()
            .append(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => {
                    Error::export(format!("Export file {} already exists", path.display()))
                }
                _ => Error::export(format!(
                    "Failed to create export file {}: {}",
                    path.display(),
                    e
                )),
            })?;

        debug!("Export file {} created", path.display());

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Location of the export file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ExportSink for CsvExportSink {
    async fn append(&self, update: &TrackerUpdate) -> Result<(), Error> {
        let mut line = format_export_line(update);
        line.push('\n');

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await.map_err(|e| {
            Error::export(format!("Failed to write {}: {}", self.path.display(), e))
        })?;
        file.flush().await?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), Error> {
        let mut file = self.file.lock().await;
        file.flush().await?;
        file.sync_data().await?;
        Ok(())
    }
}
