//! Configuration types for DNS tracking
//!
//! A [`TrackerConfig`] is the template shared by every tracked server. The
//! supervisor turns it into one immutable [`QuerySpec`] per server.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::records::RecordType;

/// Maximum number of nameservers tracked at once
pub const MAX_SERVERS: usize = 5;

/// Default poll interval in continuous mode
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Default DNS port when a server is given without one
pub const DEFAULT_DNS_PORT: u16 = 53;

/// Main tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// What to resolve
    pub query: QueryConfig,

    /// Nameservers to query, one tracker each
    pub servers: Vec<String>,

    /// Single lookup or continuous polling
    #[serde(default)]
    pub mode: PollMode,

    /// Show raw records instead of change placeholders
    #[serde(default)]
    pub verbose: bool,

    /// Resolver backend settings
    #[serde(default)]
    pub resolver: ResolverSettings,

    /// Optional supervisor settings
    #[serde(default)]
    pub supervisor: SupervisorSettings,
}

impl TrackerConfig {
    /// Create a single-shot configuration for one query
    pub fn new(record_type: RecordType, name: impl Into<String>, servers: Vec<String>) -> Self {
        Self {
            query: QueryConfig {
                record_type,
                name: name.into(),
            },
            servers,
            mode: PollMode::default(),
            verbose: false,
            resolver: ResolverSettings::default(),
            supervisor: SupervisorSettings::default(),
        }
    }

    /// Switch to continuous polling with the given interval
    pub fn with_continuous(mut self, interval: Duration) -> Self {
        self.mode = PollMode::Continuous {
            interval_secs: interval.as_secs(),
        };
        self
    }

    /// Enable or disable verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.servers.is_empty() {
            return Err(Error::argument("At least one DNS server is required"));
        }

        if self.servers.len() > MAX_SERVERS {
            return Err(Error::argument(format!(
                "At most {} DNS servers can be tracked, got {}",
                MAX_SERVERS,
                self.servers.len()
            )));
        }

        let mut seen = HashSet::new();
        for server in &self.servers {
            nameserver_addr(server)?;
            if !seen.insert(server.as_str()) {
                return Err(Error::argument(format!("DNS server {} given twice", server)));
            }
        }

        self.validate_template()
    }

    /// Validate everything except the server list
    ///
    /// The supervisor only needs a well-formed query template; an empty
    /// server list is legal there and completes immediately.
    pub fn validate_template(&self) -> Result<()> {
        self.query.validate()?;
        self.mode.validate()?;
        self.resolver.validate()?;

        if self.supervisor.event_channel_capacity == 0 {
            return Err(Error::config("Event channel capacity must be > 0"));
        }

        Ok(())
    }

    /// Build the immutable query for one server
    pub fn query_for(&self, server: impl Into<String>) -> QuerySpec {
        QuerySpec {
            record_type: self.query.record_type,
            name: self.query.name.clone(),
            server: server.into(),
            poll_interval: self.mode.interval(),
            continuous: self.mode.is_continuous(),
            verbose: self.verbose,
        }
    }
}

/// The name and type being tracked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Record type to query
    pub record_type: RecordType,

    /// Domain name to query
    pub name: String,
}

impl QueryConfig {
    /// Validate the queried name
    pub fn validate(&self) -> Result<()> {
        validate_domain_name(&self.name)
    }
}

/// Polling mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PollMode {
    /// One lookup, one report
    #[default]
    SingleShot,

    /// Poll until the answer changes or the process is cancelled
    Continuous {
        /// Seconds between polls
        #[serde(default = "default_poll_interval_secs")]
        interval_secs: u64,
    },
}

impl PollMode {
    /// Whether trackers keep polling
    pub fn is_continuous(&self) -> bool {
        matches!(self, PollMode::Continuous { .. })
    }

    /// Poll interval (the default for single-shot, where it is unused)
    pub fn interval(&self) -> Duration {
        match self {
            PollMode::SingleShot => Duration::from_secs(default_poll_interval_secs()),
            PollMode::Continuous { interval_secs } => Duration::from_secs(*interval_secs),
        }
    }

    fn validate(&self) -> Result<()> {
        if let PollMode::Continuous { interval_secs: 0 } = self {
            return Err(Error::argument("Poll interval must be > 0 seconds"));
        }
        Ok(())
    }
}

/// Resolver backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSettings {
    /// Registered backend name
    #[serde(default = "default_resolver_backend")]
    pub backend: String,

    /// Per-query timeout in seconds
    #[serde(default = "default_resolver_timeout_secs")]
    pub timeout_secs: u64,
}

impl ResolverSettings {
    /// Per-query timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.backend.is_empty() {
            return Err(Error::config("Resolver backend cannot be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(Error::config("Resolver timeout must be > 0 seconds"));
        }
        Ok(())
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            backend: default_resolver_backend(),
            timeout_secs: default_resolver_timeout_secs(),
        }
    }
}

/// Supervisor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorSettings {
    /// Capacity of the tracker event channel
    ///
    /// Trackers wait for room instead of dropping events, so a slow
    /// consumer delays polling rather than losing change reports.
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// Immutable query for one tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    /// Record type to query
    pub record_type: RecordType,
    /// Domain name to query
    pub name: String,
    /// Nameserver to send the query to
    pub server: String,
    /// Time between polls in continuous mode
    pub poll_interval: Duration,
    /// Whether to keep polling after the first answer
    pub continuous: bool,
    /// Show raw records
    pub verbose: bool,
}

/// Parse a server given as `IP` or `IP:PORT`
///
/// Bare IPv6 addresses are accepted without brackets.
pub fn nameserver_addr(server: &str) -> Result<SocketAddr> {
    let server = server.trim();
    if let Ok(ip) = server.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_DNS_PORT));
    }
    server.parse::<SocketAddr>().map_err(|_| {
        Error::argument(format!(
            "DNS server '{}' is not an IP address or IP:PORT",
            server
        ))
    })
}

/// Validate that a string is a plausible domain name
///
/// Basic RFC 1035 checks. Underscores are allowed so SRV owner names such
/// as `_sip._udp.example.com` pass.
pub fn validate_domain_name(domain: &str) -> Result<()> {
    let domain = domain.strip_suffix('.').unwrap_or(domain);

    if domain.is_empty() {
        return Err(Error::argument("Domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(Error::argument(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(Error::argument(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(Error::argument(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::argument(format!(
                "Domain label contains invalid characters. Label: '{}'",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::argument(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_resolver_backend() -> String {
    "hickory".to_string()
}

fn default_resolver_timeout_secs() -> u64 {
    5
}

fn default_event_channel_capacity() -> usize {
    1000
}
