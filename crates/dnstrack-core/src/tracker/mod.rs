//! Single-server tracker
//!
//! A [`Tracker`] polls one nameserver for one name until the answer changes,
//! the single lookup is reported, the lookup fails, or the run is cancelled.
//!
//! ## Phases
//!
//! ```text
//!  Idle ──► Polling ──► Evaluating ──┬──► Sleeping ──► Polling ...
//!              │                     │
//!              ▼                     ├──► Reporting ──► Done
//!           Failed                   │
//!                                    └──► SingleShotReported
//! ```
//!
//! Cancellation is observed while a lookup is in flight and while sleeping;
//! either way the tracker ends as [`TrackerOutcome::Cancelled`].
//!
//! ## Event Flow
//!
//! 1. `Started` when the loop begins
//! 2. `Update` after every successful poll that did not change
//! 3. `Changed` once, with the before and after answers
//! 4. `Failed` once, if a lookup errors

pub mod state;

pub use state::{Evaluation, PollSnapshot, TrackerState};

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::QuerySpec;
use crate::records::RecordType;
use crate::traits::{ExportSink, Resolver};

/// Result of one successful poll, as published to the aggregator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerUpdate {
    /// Nameserver that answered
    pub server: String,
    /// Queried name
    pub name: String,
    /// Queried type
    pub record_type: RecordType,
    /// Whether this poll detected a change
    pub hash_changed: bool,
    /// The poll just taken
    pub current: PollSnapshot,
    /// The baseline, when the tracker reports one
    ///
    /// Left empty on routine polls; the aggregator fills it from the entry
    /// it already holds for the server.
    pub previous: Option<PollSnapshot>,
}

/// Terminal change report of one tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeReport {
    /// Nameserver whose answer changed
    pub server: String,
    /// Queried name
    pub name: String,
    /// Queried type
    pub record_type: RecordType,
    /// Last poll before the change
    pub previous: PollSnapshot,
    /// First poll showing the change
    pub current: PollSnapshot,
    /// Wall-clock start of the tracker
    pub started_at: DateTime<Utc>,
    /// Time from tracker start to the poll that saw the change
    pub elapsed: Duration,
}

impl ChangeReport {
    /// The change expressed as an update carrying both snapshots
    pub fn to_update(&self) -> TrackerUpdate {
        TrackerUpdate {
            server: self.server.clone(),
            name: self.name.clone(),
            record_type: self.record_type,
            hash_changed: true,
            current: self.current.clone(),
            previous: Some(self.previous.clone()),
        }
    }

    /// Wall-clock time the change was observed
    pub fn changed_at(&self) -> DateTime<Utc> {
        self.current.polled_at
    }
}

/// Events emitted by trackers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerEvent {
    /// Tracker loop started
    Started {
        server: String,
    },

    /// Poll finished without a change
    Update(TrackerUpdate),

    /// Answer changed; the tracker is done
    Changed(ChangeReport),

    /// Lookup failed; the tracker is done
    Failed {
        server: String,
        name: String,
        error: String,
    },
}

impl TrackerEvent {
    /// Server the event concerns
    pub fn server(&self) -> &str {
        match self {
            TrackerEvent::Started { server } => server,
            TrackerEvent::Update(update) => &update.server,
            TrackerEvent::Changed(report) => &report.server,
            TrackerEvent::Failed { server, .. } => server,
        }
    }
}

/// How a tracker ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerOutcome {
    /// Continuous mode detected a change
    Changed(ChangeReport),
    /// Single-shot mode reported its one answer
    SingleShotReported,
    /// A lookup failed
    Failed(String),
    /// The run was cancelled
    Cancelled,
}

impl TrackerOutcome {
    /// Whether the tracker ended on a lookup failure
    pub fn is_failure(&self) -> bool {
        matches!(self, TrackerOutcome::Failed(_))
    }
}

/// Tracker lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerPhase {
    Idle,
    Polling,
    Evaluating,
    Sleeping,
    Reporting,
    Done,
    SingleShotReported,
    Failed,
    Cancelled,
}

impl TrackerPhase {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TrackerPhase::Done
                | TrackerPhase::SingleShotReported
                | TrackerPhase::Failed
                | TrackerPhase::Cancelled
        )
    }
}

impl fmt::Display for TrackerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Polls one nameserver until a terminal phase
///
/// ## Lifecycle
///
/// 1. Create with [`Tracker::new()`]
/// 2. Optionally attach an export sink and an interval receiver
/// 3. Drive with [`Tracker::run()`], which consumes the tracker
pub struct Tracker {
    /// Immutable query for this server
    query: QuerySpec,

    /// Resolver shared with the sibling trackers
    resolver: Arc<dyn Resolver>,

    /// Optional export sink
    export: Option<Arc<dyn ExportSink>>,

    /// Event sender towards the aggregator
    event_tx: mpsc::Sender<TrackerEvent>,

    /// Current poll interval, read on entering Sleeping
    interval_rx: watch::Receiver<Duration>,

    phase: TrackerPhase,
}

impl Tracker {
    /// Create a tracker
    ///
    /// # Parameters
    ///
    /// - `query`: What to resolve and where
    /// - `resolver`: Resolver implementation
    /// - `event_tx`: Channel for tracker events
    pub fn new(query: QuerySpec, resolver: Arc<dyn Resolver>, event_tx: mpsc::Sender<TrackerEvent>) -> Self {
        let (_, interval_rx) = watch::channel(query.poll_interval);
        Self {
            query,
            resolver,
            export: None,
            event_tx,
            interval_rx,
            phase: TrackerPhase::Idle,
        }
    }

    /// Append every successful poll to `sink`
    pub fn with_export(mut self, sink: Arc<dyn ExportSink>) -> Self {
        self.export = Some(sink);
        self
    }

    /// Follow interval changes published on `interval_rx`
    pub fn with_interval_updates(mut self, interval_rx: watch::Receiver<Duration>) -> Self {
        self.interval_rx = interval_rx;
        self
    }

    /// The query this tracker runs
    pub fn query(&self) -> &QuerySpec {
        &self.query
    }

    /// Run until a terminal phase
    ///
    /// # Parameters
    ///
    /// - `cancel`: Token that ends the run from outside
    ///
    /// # Returns
    ///
    /// The terminal outcome. Lookup errors are outcomes, not `Err`: a failed
    /// server never affects its siblings.
    pub async fn run(mut self, cancel: CancellationToken) -> TrackerOutcome {
        let mut state = TrackerState::new(Utc::now(), Instant::now());

        info!(
            server = %self.query.server,
            name = %self.query.name,
            record_type = %self.query.record_type,
            "Tracker started"
        );
        self.emit(TrackerEvent::Started {
            server: self.query.server.clone(),
        })
        .await;

        loop {
            self.transition(TrackerPhase::Polling);

            let answer = tokio::select! {
                biased;

                _ = cancel.cancelled() => None,

                answer = self.resolver.resolve(&self.query.name, self.query.record_type, &self.query.server) => Some(answer),
            };

            let records = match answer {
                Some(Ok(records)) => records,
                Some(Err(e)) => return self.fail(e).await,
                None => return self.cancelled(),
            };

            self.transition(TrackerPhase::Evaluating);
            debug!(server = %self.query.server, records = records.len(), "Poll answered");

            match state.observe(records, Utc::now(), Instant::now()) {
                Evaluation::Changed { previous, current } => {
                    self.transition(TrackerPhase::Reporting);

                    let report = ChangeReport {
                        server: self.query.server.clone(),
                        name: self.query.name.clone(),
                        record_type: self.query.record_type,
                        previous,
                        current,
                        started_at: state.started_at(),
                        elapsed: state.elapsed(),
                    };

                    info!(
                        server = %report.server,
                        name = %report.name,
                        "Change detected after {}s ({} -> {})",
                        report.elapsed.as_secs(),
                        report.previous.fingerprint.short(),
                        report.current.fingerprint.short()
                    );

                    self.export(&report.to_update()).await;
                    self.emit(TrackerEvent::Changed(report.clone())).await;
                    self.transition(TrackerPhase::Done);
                    return TrackerOutcome::Changed(report);
                }
                Evaluation::Baseline { current } | Evaluation::Unchanged { current } => {
                    let update = TrackerUpdate {
                        server: self.query.server.clone(),
                        name: self.query.name.clone(),
                        record_type: self.query.record_type,
                        hash_changed: false,
                        current,
                        previous: None,
                    };

                    self.export(&update).await;
                    self.emit(TrackerEvent::Update(update)).await;
                }
            }

            if !self.query.continuous {
                self.transition(TrackerPhase::SingleShotReported);
                return TrackerOutcome::SingleShotReported;
            }

            self.transition(TrackerPhase::Sleeping);
            let interval = *self.interval_rx.borrow_and_update();
            debug!(server = %self.query.server, "Next poll in {}s", interval.as_secs());

            let woke = tokio::select! {
                biased;

                _ = cancel.cancelled() => false,

                _ = tokio::time::sleep(interval) => true,
            };

            if !woke {
                return self.cancelled();
            }
        }
    }

    /// Move to `next`, logging the transition
    fn transition(&mut self, next: TrackerPhase) {
        debug!(
            server = %self.query.server,
            "Phase {} -> {}",
            self.phase,
            next
        );
        self.phase = next;
    }

    fn cancelled(&mut self) -> TrackerOutcome {
        self.transition(TrackerPhase::Cancelled);
        info!(server = %self.query.server, "Tracker cancelled");
        TrackerOutcome::Cancelled
    }

    async fn fail(&mut self, e: crate::Error) -> TrackerOutcome {
        self.transition(TrackerPhase::Failed);
        error!(
            server = %self.query.server,
            name = %self.query.name,
            "Tracker failed: {}",
            e
        );

        let message = e.to_string();
        self.emit(TrackerEvent::Failed {
            server: self.query.server.clone(),
            name: self.query.name.clone(),
            error: message.clone(),
        })
        .await;

        TrackerOutcome::Failed(message)
    }

    /// Append to the export sink, if any
    ///
    /// Export is best effort: a failed write is logged and polling goes on.
    async fn export(&self, update: &TrackerUpdate) {
        if let Some(sink) = &self.export {
            if let Err(e) = sink.append(update).await {
                warn!(server = %update.server, "Export failed: {}", e);
            }
        }
    }

    /// Emit a tracker event
    ///
    /// Waits for channel capacity instead of dropping: a change report must
    /// reach the aggregator.
    async fn emit(&self, event: TrackerEvent) {
        if self.event_tx.send(event).await.is_err() {
            debug!(server = %self.query.server, "Event receiver closed, event discarded");
        }
    }
}
