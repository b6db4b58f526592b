//! Tracker supervisor
//!
//! Runs one [`Tracker`] per configured server and resolves once every one of
//! them reached a terminal phase.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────┐
//!                 │  Supervisor  │── PollIntervalHandle (watch)
//!                 └──────────────┘
//!                        │ spawn (JoinSet)
//!         ┌──────────────┼──────────────┐
//!         ▼              ▼              ▼
//!   ┌──────────┐   ┌──────────┐   ┌──────────┐
//!   │ Tracker  │   │ Tracker  │   │ Tracker  │
//!   │ @server1 │   │ @server2 │   │ @server3 │
//!   └──────────┘   └──────────┘   └──────────┘
//!         │              │              │
//!         └──────── TrackerEvent (mpsc) ┘
//!                        │
//!                        ▼
//!                   event receiver
//! ```

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::TrackerConfig;
use crate::error::{Error, Result};
use crate::tracker::{Tracker, TrackerEvent, TrackerOutcome};
use crate::traits::{ExportSink, Resolver};

/// Outcome of one tracker, tagged with its server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerReport {
    pub server: String,
    pub outcome: TrackerOutcome,
}

/// Result of a supervised run: one report per server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub reports: Vec<TrackerReport>,
}

impl Completion {
    /// Report for `server`, if it was tracked
    pub fn report(&self, server: &str) -> Option<&TrackerReport> {
        self.reports.iter().find(|r| r.server == server)
    }

    /// Servers whose lookup failed
    pub fn failed(&self) -> impl Iterator<Item = &TrackerReport> {
        self.reports.iter().filter(|r| r.outcome.is_failure())
    }

    /// Servers that saw a change
    pub fn changed(&self) -> impl Iterator<Item = &TrackerReport> {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, TrackerOutcome::Changed(_)))
    }
}

/// Handle to change the poll interval of running trackers
///
/// A new interval applies from each tracker's next sleep; a sleep already in
/// progress is not shortened.
#[derive(Debug, Clone)]
pub struct PollIntervalHandle {
    tx: Arc<watch::Sender<Duration>>,
}

impl PollIntervalHandle {
    /// Publish a new interval
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Trackers will use `interval` from their next sleep
    /// - `Err(Error)`: If `interval` is zero
    pub fn set(&self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(Error::argument("Poll interval must be > 0 seconds"));
        }
        self.tx.send_replace(interval);
        info!("Poll interval set to {}s", interval.as_secs());
        Ok(())
    }

    /// The interval currently published
    pub fn current(&self) -> Duration {
        *self.tx.borrow()
    }
}

/// Starts and joins the trackers of one measurement
pub struct Supervisor {
    /// Query template and server list
    config: TrackerConfig,

    /// Resolver shared by all trackers
    resolver: Arc<dyn Resolver>,

    /// Optional export sink shared by all trackers
    export: Option<Arc<dyn ExportSink>>,

    /// Event sender cloned into every tracker
    event_tx: mpsc::Sender<TrackerEvent>,

    /// Interval publisher
    interval_tx: Arc<watch::Sender<Duration>>,
}

impl Supervisor {
    /// Create a supervisor
    ///
    /// # Parameters
    ///
    /// - `config`: Query template and servers
    /// - `resolver`: Resolver implementation
    ///
    /// # Returns
    ///
    /// A tuple of (supervisor, event_receiver) where event_receiver yields
    /// the events of all trackers. The receiver closes once every tracker
    /// has finished.
    pub fn new(
        config: TrackerConfig,
        resolver: Arc<dyn Resolver>,
    ) -> Result<(Self, mpsc::Receiver<TrackerEvent>)> {
        config.validate_template()?;

        let (tx, rx) = mpsc::channel(config.supervisor.event_channel_capacity);
        let (interval_tx, _) = watch::channel(config.mode.interval());

        let supervisor = Self {
            config,
            resolver,
            export: None,
            event_tx: tx,
            interval_tx: Arc::new(interval_tx),
        };

        Ok((supervisor, rx))
    }

    /// Append every successful poll of every tracker to `sink`
    pub fn with_export(mut self, sink: Arc<dyn ExportSink>) -> Self {
        self.export = Some(sink);
        self
    }

    /// Handle to reconfigure the poll interval while running
    pub fn interval_handle(&self) -> PollIntervalHandle {
        PollIntervalHandle {
            tx: Arc::clone(&self.interval_tx),
        }
    }

    /// Number of trackers this supervisor will start
    pub fn server_count(&self) -> usize {
        self.config.servers.len()
    }

    /// Run all trackers to completion
    ///
    /// Consumes the supervisor, so completion is reported exactly once.
    /// With no servers it returns immediately.
    ///
    /// # Parameters
    ///
    /// - `cancel`: Token shared with every tracker
    pub async fn run(self, cancel: CancellationToken) -> Completion {
        let Self {
            config,
            resolver,
            export,
            event_tx,
            interval_tx,
        } = self;

        info!(
            servers = config.servers.len(),
            name = %config.query.name,
            record_type = %config.query.record_type,
            "Supervisor starting trackers"
        );

        let mut trackers = JoinSet::new();
        for server in &config.servers {
            let mut tracker = Tracker::new(config.query_for(server), Arc::clone(&resolver), event_tx.clone())
                .with_interval_updates(interval_tx.subscribe());
            if let Some(sink) = &export {
                tracker = tracker.with_export(Arc::clone(sink));
            }

            let server = server.clone();
            let cancel = cancel.clone();
            trackers.spawn(async move {
                let outcome = tracker.run(cancel).await;
                TrackerReport { server, outcome }
            });
        }

        // Trackers hold the remaining senders
        drop(event_tx);

        let mut reports = Vec::with_capacity(config.servers.len());
        while let Some(joined) = trackers.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => error!("Tracker task ended abnormally: {}", e),
            }
        }

        // A panicked task loses its report; account for it as a failure
        for server in &config.servers {
            if !reports.iter().any(|r| &r.server == server) {
                reports.push(TrackerReport {
                    server: server.clone(),
                    outcome: TrackerOutcome::Failed("tracker task aborted".to_string()),
                });
            }
        }

        if let Some(sink) = &export {
            if let Err(e) = sink.flush().await {
                error!("Failed to flush export: {}", e);
            }
        }

        info!(trackers = reports.len(), "All trackers finished");
        Completion { reports }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{RecordSet, RecordType};
    use async_trait::async_trait;

    struct EmptyResolver;

    #[async_trait]
    impl Resolver for EmptyResolver {
        async fn resolve(&self, _name: &str, _record_type: RecordType, _server: &str) -> Result<RecordSet> {
            Ok(RecordSet::new())
        }

        fn resolver_name(&self) -> &'static str {
            "empty"
        }
    }

    #[test]
    fn test_interval_handle() {
        let config = TrackerConfig::new(RecordType::A, "example.com", vec!["192.0.2.1".to_string()])
            .with_continuous(Duration::from_secs(30));
        let (supervisor, _rx) = Supervisor::new(config, Arc::new(EmptyResolver)).unwrap();

        let handle = supervisor.interval_handle();
        assert_eq!(handle.current(), Duration::from_secs(30));

        handle.set(Duration::from_secs(5)).unwrap();
        assert_eq!(handle.current(), Duration::from_secs(5));
        assert!(handle.set(Duration::ZERO).is_err());
    }

    #[tokio::test]
    async fn test_no_servers_completes_immediately() {
        let config = TrackerConfig::new(RecordType::A, "example.com", Vec::new());
        let (supervisor, mut rx) = Supervisor::new(config, Arc::new(EmptyResolver)).unwrap();
        assert_eq!(supervisor.server_count(), 0);

        let completion = supervisor.run(CancellationToken::new()).await;
        assert!(completion.reports.is_empty());
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_invalid_template_rejected() {
        let config = TrackerConfig::new(RecordType::A, "", vec!["192.0.2.1".to_string()]);
        assert!(Supervisor::new(config, Arc::new(EmptyResolver)).is_err());
    }
}
