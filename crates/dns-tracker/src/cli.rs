//! Clap derive structures for the `dns_tracker` CLI.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use dnstrack_core::aggregator::ViewMode;
use dnstrack_core::{RecordType, TrackerConfig};

/// dns_tracker -- watch a DNS answer propagate across nameservers
#[derive(Debug, Parser)]
#[command(
    name = "dns_tracker",
    version,
    about = "Measure how long a DNS change takes to reach each nameserver",
    long_about = "Queries the same name on up to five nameservers.\n\n\
        By default every server is asked once and the answers are shown.\n\
        With -c the query repeats until each server's answer changes or\n\
        the measurement is interrupted with Ctrl-C.",
    after_help = "Set DNS_TRACKER_LOG_LEVEL (trace, debug, info, warn, error) for diagnostics on stderr."
)]
pub struct Cli {
    /// Record type to query (A or SRV)
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub record_type: String,

    /// Domain name to query
    #[arg(short = 'n', long = "name", value_name = "NAME")]
    pub name: String,

    /// Nameservers to query, as IP or IP:PORT (at most five)
    #[arg(short = 's', long = "server", value_name = "SERVER", num_args = 1.., required = true)]
    pub servers: Vec<String>,

    /// Poll continuously, every SECONDS (default 60), until the answer changes
    #[arg(
        short = 'c',
        long = "continuous",
        value_name = "SECONDS",
        num_args = 0..=1,
        default_missing_value = "60"
    )]
    pub continuous: Option<u64>,

    /// Append every answer to a CSV file (default $HOME/dns_tracker_output.csv)
    #[arg(long, value_name = "PATH", num_args = 0..=1, require_equals = true)]
    pub export: Option<Option<PathBuf>>,

    /// Show raw records instead of change placeholders
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Show every distinct answer per server with first and last sighting
    #[arg(long)]
    pub history: bool,
}

impl Cli {
    /// Build and validate the tracker configuration
    pub fn tracker_config(&self) -> dnstrack_core::Result<TrackerConfig> {
        let record_type = RecordType::from_str(&self.record_type)?;

        let mut config = TrackerConfig::new(record_type, self.name.trim(), self.servers.clone())
            .with_verbose(self.verbose);

        if let Some(interval) = self.continuous {
            config = config.with_continuous(Duration::from_secs(interval));
        }

        config.validate()?;
        Ok(config)
    }

    /// Aggregator retention mode
    pub fn view_mode(&self) -> ViewMode {
        if self.history {
            ViewMode::History
        } else {
            ViewMode::Latest
        }
    }

    /// Poll interval shown in the header
    pub fn interval(&self) -> Option<Duration> {
        self.continuous.map(Duration::from_secs)
    }
}
