// # Result Aggregator
//
// Merges the events of all trackers into one view for rendering.
//
// ## Purpose
//
// Each server gets one entry holding its latest answer, the answer before
// it, and its terminal change or failure. In history mode the aggregator
// also keeps a ledger of every distinct answer per server.
//
// ## Concurrency
//
// The view sits behind a `tokio::sync::RwLock` and the aggregator is cheap
// to clone. In the binary a single task feeds it from the tracker event
// channel, so there is one writer; renderers take deep-copy snapshots.

pub mod ledger;

pub use ledger::{Ledger, LedgerEntry};

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::tracker::{ChangeReport, PollSnapshot, TrackerEvent, TrackerUpdate};

/// What the aggregator retains
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    /// Latest and previous answer per server
    #[default]
    Latest,
    /// Additionally every distinct answer per server
    History,
}

/// Latest known state of one server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerView {
    /// Tracked nameserver
    pub server: String,
    /// Whether the latest poll detected a change
    pub hash_changed: bool,
    /// The answer before the latest one
    pub previous: Option<PollSnapshot>,
    /// The latest answer
    pub current: PollSnapshot,
    /// Terminal change, once detected
    pub change: Option<ChangeReport>,
}

/// Failure of one server's tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerFailure {
    pub server: String,
    pub name: String,
    pub error: String,
}

/// Deep copy of the aggregate view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateSnapshot {
    /// Retention mode of the aggregator
    pub mode: ViewMode,
    /// Servers with at least one answer, sorted by server
    pub servers: Vec<ServerView>,
    /// Ledger entries grouped by server, first-seen order within a server
    pub ledger: Vec<LedgerEntry>,
    /// Failed servers, sorted by server
    pub failures: Vec<ServerFailure>,
}

impl AggregateSnapshot {
    /// View of `server`, if it answered
    pub fn server(&self, server: &str) -> Option<&ServerView> {
        self.servers.iter().find(|v| v.server == server)
    }

    /// Ledger entries of `server`
    pub fn ledger_for<'a>(&'a self, server: &'a str) -> impl Iterator<Item = &'a LedgerEntry> + 'a {
        self.ledger.iter().filter(move |e| e.server == server)
    }
}

#[derive(Debug, Default)]
struct AggregateView {
    servers: BTreeMap<String, ServerView>,
    ledger: Ledger,
    failures: BTreeMap<String, ServerFailure>,
}

/// Shared view over all trackers
///
/// # Example
///
/// ```rust,no_run
/// use dnstrack_core::aggregator::{Aggregator, ViewMode};
///
/// # async fn render(mut events: tokio::sync::mpsc::Receiver<dnstrack_core::TrackerEvent>) {
/// let aggregator = Aggregator::new(ViewMode::History);
///
/// while let Some(event) = events.recv().await {
///     aggregator.apply(&event).await;
///     let snapshot = aggregator.snapshot().await;
///     println!("{} server(s) answered", snapshot.servers.len());
/// }
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Aggregator {
    mode: ViewMode,
    inner: Arc<RwLock<AggregateView>>,
}

impl Aggregator {
    /// Create an empty aggregator
    pub fn new(mode: ViewMode) -> Self {
        Self {
            mode,
            inner: Arc::new(RwLock::new(AggregateView::default())),
        }
    }

    /// Dispatch any tracker event
    pub async fn apply(&self, event: &TrackerEvent) {
        match event {
            TrackerEvent::Started { server } => {
                debug!(server = %server, "Tracker started");
            }
            TrackerEvent::Update(update) => self.on_update(update).await,
            TrackerEvent::Changed(report) => self.on_change(report).await,
            TrackerEvent::Failed { server, name, error } => {
                self.on_failure(server, name, error).await;
            }
        }
    }

    /// Merge one poll result
    ///
    /// An update without a previous answer inherits the current answer of
    /// the stored entry, so the view always shows the answer before the
    /// latest one. Re-applying the stored poll leaves the view unchanged.
    pub async fn on_update(&self, update: &TrackerUpdate) {
        let mut guard = self.inner.write().await;

        let stored = guard.servers.get(&update.server);
        let previous = match (&update.previous, stored) {
            (Some(previous), _) => Some(previous.clone()),
            (None, Some(view)) if view.current == update.current => view.previous.clone(),
            (None, Some(view)) => Some(view.current.clone()),
            (None, None) => None,
        };
        let change = stored.and_then(|view| view.change.clone());

        if self.mode == ViewMode::History {
            guard.ledger.observe(&update.server, &update.current);
            debug!(server = %update.server, answers = guard.ledger.len(), "Ledger updated");
        }

        guard.servers.insert(
            update.server.clone(),
            ServerView {
                server: update.server.clone(),
                hash_changed: update.hash_changed,
                previous,
                current: update.current.clone(),
                change,
            },
        );
    }

    /// Merge a terminal change report
    pub async fn on_change(&self, report: &ChangeReport) {
        let mut guard = self.inner.write().await;

        if self.mode == ViewMode::History {
            guard.ledger.observe(&report.server, &report.current);
        }

        guard.servers.insert(
            report.server.clone(),
            ServerView {
                server: report.server.clone(),
                hash_changed: true,
                previous: Some(report.previous.clone()),
                current: report.current.clone(),
                change: Some(report.clone()),
            },
        );
    }

    /// Record a failed tracker
    pub async fn on_failure(&self, server: &str, name: &str, error: &str) {
        let mut guard = self.inner.write().await;
        guard.failures.insert(
            server.to_string(),
            ServerFailure {
                server: server.to_string(),
                name: name.to_string(),
                error: error.to_string(),
            },
        );
    }

    /// Deep copy of the current view
    pub async fn snapshot(&self) -> AggregateSnapshot {
        let guard = self.inner.read().await;

        let servers: Vec<ServerView> = guard.servers.values().cloned().collect();

        let mut ledger: Vec<LedgerEntry> = guard.ledger.entries().to_vec();
        ledger.sort_by(|a, b| a.server.cmp(&b.server));

        AggregateSnapshot {
            mode: self.mode,
            servers,
            ledger,
            failures: guard.failures.values().cloned().collect(),
        }
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(ViewMode::default())
    }
}
