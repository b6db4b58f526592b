//! Core traits for DNS tracking
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`Resolver`]: Query one explicit nameserver
//! - [`ExportSink`]: Append-only record of poll results

pub mod export_sink;
pub mod resolver;

pub use export_sink::ExportSink;
pub use resolver::{Resolver, ResolverFactory};
