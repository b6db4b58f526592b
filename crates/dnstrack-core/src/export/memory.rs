// # Memory Export Sink
//
// Keeps export lines in memory. Used by tests and embedders that render the
// export themselves.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::format_export_line;
use crate::Error;
use crate::traits::ExportSink;
use crate::tracker::TrackerUpdate;

/// In-memory export sink
#[derive(Debug, Clone, Default)]
pub struct MemoryExportSink {
    lines: Arc<RwLock<Vec<String>>>,
}

impl MemoryExportSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines appended so far
    pub async fn lines(&self) -> Vec<String> {
        self.lines.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.lines.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.lines.read().await.is_empty()
    }
}

#[async_trait]
impl ExportSink for MemoryExportSink {
    async fn append(&self, update: &TrackerUpdate) -> Result<(), Error> {
        self.lines.write().await.push(format_export_line(update));
        Ok(())
    }

    async fn flush(&self) -> Result<(), Error> {
        // Nothing buffered
        Ok(())
    }
}
