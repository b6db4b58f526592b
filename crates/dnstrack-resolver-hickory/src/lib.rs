// # Hickory Resolver Backend
//
// This crate provides the `hickory` resolver backend for dns-tracker.
//
// ## Behavior
//
// - Every lookup goes to the one nameserver the tracker names, never to
//   the system resolver or the hosts file
// - The answer cache is disabled, so every poll reaches the nameserver
// - NXDOMAIN and NODATA answers are an empty record set, not an error
// - Only records of the queried type are returned; CNAME chains and other
//   intermediates are dropped
// - One attempt per lookup; the tracker decides what a failure means
//
// ## Connection Reuse
//
// One `TokioAsyncResolver` is built per nameserver on first use and reused
// for later polls. With caching off this only saves connection setup.

use async_trait::async_trait;
use dnstrack_core::config::{ResolverSettings, nameserver_addr};
use dnstrack_core::records::{Record, RecordSet, RecordType, SrvRecord};
use dnstrack_core::traits::{Resolver, ResolverFactory};
use dnstrack_core::{Error, ResolverRegistry, Result};
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::{RData, RecordType as WireType};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, trace};

/// Backend name used in the registry
pub const BACKEND_NAME: &str = "hickory";

/// Default lookup attempts per poll
const DEFAULT_ATTEMPTS: usize = 1;

/// Settings of the hickory backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HickorySettings {
    /// Per-lookup timeout
    pub timeout: Duration,
    /// Attempts per lookup before reporting a failure
    pub attempts: usize,
}

impl HickorySettings {
    /// Derive backend settings from the generic resolver settings
    pub fn from_resolver_settings(settings: &ResolverSettings) -> Self {
        Self {
            timeout: settings.timeout(),
            attempts: DEFAULT_ATTEMPTS,
        }
    }

    fn resolver_opts(&self) -> ResolverOpts {
        let mut opts = ResolverOpts::default();
        opts.timeout = self.timeout;
        opts.attempts = self.attempts;
        opts.cache_size = 0;
        opts.use_hosts_file = false;
        opts
    }
}

impl Default for HickorySettings {
    fn default() -> Self {
        Self::from_resolver_settings(&ResolverSettings::default())
    }
}

/// Resolver querying explicit nameservers through hickory-resolver
pub struct HickoryResolver {
    settings: HickorySettings,

    /// One resolver per nameserver address
    resolvers: Mutex<HashMap<SocketAddr, TokioAsyncResolver>>,
}

impl std::fmt::Debug for HickoryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HickoryResolver")
            .field("settings", &self.settings)
            .finish()
    }
}

impl HickoryResolver {
    /// Create a resolver with the given settings
    pub fn new(settings: HickorySettings) -> Self {
        Self {
            settings,
            resolvers: Mutex::new(HashMap::new()),
        }
    }

    /// The backend settings
    pub fn settings(&self) -> &HickorySettings {
        &self.settings
    }

    /// Resolver bound to `addr`, built on first use
    fn resolver_for(&self, addr: SocketAddr) -> TokioAsyncResolver {
        let mut resolvers = self
            .resolvers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        resolvers
            .entry(addr)
            .or_insert_with(|| {
                debug!("Building resolver for nameserver {}", addr);
                let group = NameServerConfigGroup::from_ips_clear(&[addr.ip()], addr.port(), true);
                let config = ResolverConfig::from_parts(None, vec![], group);
                TokioAsyncResolver::tokio(config, self.settings.resolver_opts())
            })
            .clone()
    }
}

#[async_trait]
impl Resolver for HickoryResolver {
    async fn resolve(&self, name: &str, record_type: RecordType, server: &str) -> Result<RecordSet> {
        let addr = nameserver_addr(server)?;
        let resolver = self.resolver_for(addr);
        let query = fully_qualified(name);

        trace!("Querying {} {} @{}", record_type, query, addr);

        match resolver.lookup(query.as_str(), wire_type(record_type)).await {
            Ok(lookup) => {
                let records: RecordSet = lookup
                    .record_iter()
                    .filter_map(|record| {
                        let owner = record.name().to_string();
                        match record.data()? {
                            RData::A(a) if record_type == RecordType::A => {
                                Some(Record::a(owner, a.0, record.ttl()))
                            }
                            RData::SRV(srv) if record_type == RecordType::Srv => Some(Record::Srv(SrvRecord {
                                owner,
                                target: srv.target().to_string(),
                                priority: srv.priority(),
                                weight: srv.weight(),
                                port: srv.port(),
                                ttl: record.ttl(),
                            })),
                            _ => None,
                        }
                    })
                    .collect();

                debug!("{} {} @{}: {} record(s)", record_type, query, addr, records.len());
                Ok(records)
            }
            Err(e) if is_empty_answer(&e) => {
                debug!("{} {} @{}: no records", record_type, query, addr);
                Ok(RecordSet::new())
            }
            Err(e) => Err(Error::resolution(server, name, e.to_string())),
        }
    }

    fn resolver_name(&self) -> &'static str {
        BACKEND_NAME
    }
}

/// Factory for creating hickory resolvers
pub struct HickoryFactory;

impl ResolverFactory for HickoryFactory {
    fn create(&self, settings: &ResolverSettings) -> Result<Box<dyn Resolver>> {
        if settings.timeout_secs == 0 {
            return Err(Error::config("Resolver timeout must be > 0 seconds"));
        }
        Ok(Box::new(HickoryResolver::new(HickorySettings::from_resolver_settings(
            settings,
        ))))
    }
}

/// Register the hickory backend with a registry
///
/// # Example
///
/// ```rust
/// use dnstrack_core::ResolverRegistry;
///
/// let registry = ResolverRegistry::new();
/// dnstrack_resolver_hickory::register(&registry);
/// assert!(registry.has_resolver("hickory"));
/// ```
pub fn register(registry: &ResolverRegistry) {
    registry.register_resolver(BACKEND_NAME, Box::new(HickoryFactory));
}

fn wire_type(record_type: RecordType) -> WireType {
    match record_type {
        RecordType::A => WireType::A,
        RecordType::Srv => WireType::SRV,
    }
}

/// Append the root dot so no search domain is ever applied
fn fully_qualified(name: &str) -> String {
    let name = name.trim();
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{}.", name)
    }
}

/// NXDOMAIN and NODATA surface as `NoRecordsFound`; SERVFAIL and REFUSED
/// carry the same kind but are failures
fn is_empty_answer(e: &ResolveError) -> bool {
    matches!(
        e.kind(),
        ResolveErrorKind::NoRecordsFound {
            response_code: ResponseCode::NXDomain | ResponseCode::NoError,
            ..
        }
    )
}
