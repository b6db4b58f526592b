// # dnstrack-core
//
// Core library for tracking DNS propagation across nameservers.
//
// ## Architecture Overview
//
// This library provides the core functionality for watching one name on
// several nameservers until its answer changes:
// - **Resolver**: Trait for querying one explicit nameserver
// - **ExportSink**: Trait for the append-only export of poll results
// - **Tracker**: Poll/compare/sleep loop for one server
// - **Supervisor**: Runs one tracker per server and joins them
// - **Aggregator**: Merges tracker events into a renderable view
// - **ResolverRegistry**: Plugin-based registry for resolver backends
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from resolver backends
// 2. **Event-Driven**: Trackers publish events over one channel
// 3. **Plugin-Based**: Backends are registered by name, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Order-Insensitive**: Answers are compared by normalized fingerprint

pub mod aggregator;
pub mod config;
pub mod error;
pub mod export;
pub mod fingerprint;
pub mod records;
pub mod registry;
pub mod supervisor;
pub mod tracker;
pub mod traits;

// Re-export core types for convenience
pub use aggregator::{AggregateSnapshot, Aggregator, ViewMode};
pub use config::{PollMode, QuerySpec, TrackerConfig};
pub use error::{Error, Result};
pub use export::{CsvExportSink, MemoryExportSink};
pub use fingerprint::{Fingerprint, compare, fingerprint, normalize};
pub use records::{Record, RecordSet, RecordType};
pub use registry::ResolverRegistry;
pub use supervisor::{Completion, PollIntervalHandle, Supervisor, TrackerReport};
pub use tracker::{ChangeReport, Tracker, TrackerEvent, TrackerOutcome, TrackerUpdate};
pub use traits::{ExportSink, Resolver, ResolverFactory};
