// # Resolver Trait
//
// Defines the interface for looking up a name against one explicit
// nameserver.
//
// ## Implementations
//
// - hickory-resolver: `dnstrack-resolver-hickory` crate
// - Test doubles: scripted resolvers in the contract tests
//
// ## Usage
//
// ```rust,ignore
// use dnstrack_core::{RecordType, Resolver};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let resolver = /* Resolver implementation */;
//
//     let answer = resolver
//         .resolve("example.com", RecordType::A, "192.0.2.53")
//         .await?;
//     println!("{} record(s)", answer.len());
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::config::ResolverSettings;
use crate::records::{RecordSet, RecordType};

/// Trait for resolver implementations
///
/// A resolver sends one query to one nameserver and returns the answer
/// section as a [`RecordSet`].
///
/// # Contract
///
/// - The query goes to `server`, never to the system default resolver
/// - NXDOMAIN and empty answers are `Ok` with an empty record set
/// - Transport failures, timeouts and refusals are
///   [`Error::Resolution`](crate::Error::Resolution)
/// - No answer caching: every call reaches the nameserver
///
/// # Retries
///
/// The tracker never retries a failed lookup. Whatever retry policy a
/// backend library applies on the wire stays inside the implementation;
/// the tracker sees one result per call.
///
/// # Cancellation
///
/// The returned future may be dropped at any await point when the process
/// is cancelled. Implementations must not leave shared state half-updated.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `name` as `record_type` against `server`
    ///
    /// # Parameters
    ///
    /// - `name`: The domain name to query
    /// - `record_type`: A or SRV
    /// - `server`: Nameserver as `IP` or `IP:PORT`
    ///
    /// # Returns
    ///
    /// - `Ok(RecordSet)`: The answer records in wire order (possibly empty)
    /// - `Err(Error)`: If the nameserver could not be queried
    async fn resolve(
        &self,
        name: &str,
        record_type: RecordType,
        server: &str,
    ) -> Result<RecordSet, crate::Error>;

    /// Get the resolver name (for logging/debugging)
    fn resolver_name(&self) -> &'static str;
}

/// Helper trait for constructing resolvers from configuration
pub trait ResolverFactory: Send + Sync {
    /// Create a Resolver instance from configuration
    ///
    /// # Parameters
    ///
    /// - `settings`: Backend settings (timeout, backend name)
    ///
    /// # Returns
    ///
    /// A boxed Resolver trait object
    fn create(&self, settings: &ResolverSettings) -> Result<Box<dyn Resolver>, crate::Error>;
}
