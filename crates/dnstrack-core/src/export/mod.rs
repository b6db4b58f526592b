// # Export Sinks
//
// Implementations of the ExportSink trait and the line format they share.
//
// ## Line Format
//
// One line per successful poll, fields separated by `; `:
//
// ```text
// 2024-05-01T12:00:00Z; 192.0.2.53; example.com; "192.0.2.1(300)";"192.0.2.2(300)"
// 2024-05-01T12:00:00Z; 192.0.2.53; _sip._udp.example.com; "sip1.example.com.(10,300)"
// ```
//
// A records are written as `address(ttl)`, SRV records as
// `target(priority,ttl)`. An empty answer leaves the value field empty.

pub mod csv;
pub mod memory;

pub use csv::CsvExportSink;
pub use memory::MemoryExportSink;

use chrono::SecondsFormat;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::records::Record;
use crate::tracker::TrackerUpdate;

/// File name used when `--export` is given without a path
pub const DEFAULT_EXPORT_FILE: &str = "dns_tracker_output.csv";

/// Render one poll result as an export line, without the newline
pub fn format_export_line(update: &TrackerUpdate) -> String {
    let values = update
        .current
        .records
        .iter()
        .map(|record| match record {
            Record::A(a) => format!("\"{}({})\"", a.address, a.ttl),
            Record::Srv(srv) => format!("\"{}({},{})\"", srv.target, srv.priority, srv.ttl),
        })
        .collect::<Vec<_>>()
        .join(";");

    format!(
        "{}; {}; {}; {}",
        update
            .current
            .polled_at
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        update.server,
        update.name,
        values
    )
}

/// Default export location: `$HOME/dns_tracker_output.csv`
pub fn default_export_path() -> Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .ok_or_else(|| Error::export("HOME is not set; give --export=PATH explicitly"))?;
    Ok(PathBuf::from(home).join(DEFAULT_EXPORT_FILE))
}
