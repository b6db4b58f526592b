//! Per-server poll state
//!
//! [`TrackerState`] holds the previous and current observation of one
//! server and decides, poll by poll, whether the answer changed. It does no
//! I/O; the tracker loop feeds it answers and acts on the [`Evaluation`].

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;

use crate::fingerprint::{Fingerprint, compare, fingerprint_records};
use crate::records::RecordSet;

/// One successful poll: the answer and its fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSnapshot {
    /// Fingerprint of the normalized answer
    pub fingerprint: Fingerprint,
    /// Answer records as received
    pub records: RecordSet,
    /// Wall-clock time of the poll
    pub polled_at: DateTime<Utc>,
}

impl PollSnapshot {
    /// Fingerprint a raw answer
    pub fn new(records: RecordSet, polled_at: DateTime<Utc>) -> Self {
        Self {
            fingerprint: fingerprint_records(&records),
            records,
            polled_at,
        }
    }
}

/// Result of evaluating one poll against the baseline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// First successful poll; it becomes the baseline
    Baseline {
        /// The baseline poll
        current: PollSnapshot,
    },

    /// Same fingerprint as the baseline
    Unchanged {
        /// The poll just taken (now the baseline)
        current: PollSnapshot,
    },

    /// Fingerprint differs from the baseline
    Changed {
        /// Last poll before the change
        previous: PollSnapshot,
        /// First poll showing the change
        current: PollSnapshot,
    },
}

/// Mutable state of one tracker
#[derive(Debug, Clone)]
pub struct TrackerState {
    /// Last poll that matched the baseline
    previous: Option<PollSnapshot>,
    started_at: DateTime<Utc>,
    start_time: Instant,
    last_poll_time: Option<Instant>,
}

impl TrackerState {
    /// Create state for a tracker that starts now
    ///
    /// # Parameters
    ///
    /// - `started_at`: Wall-clock start, shown in reports
    /// - `start_time`: Monotonic start, used for the elapsed time
    pub fn new(started_at: DateTime<Utc>, start_time: Instant) -> Self {
        Self {
            previous: None,
            started_at,
            start_time,
            last_poll_time: None,
        }
    }

    /// Record one successful poll and compare it with the baseline
    ///
    /// Baseline and unchanged polls replace the baseline, so a later change
    /// is reported against the last poll that still matched.
    pub fn observe(&mut self, records: RecordSet, polled_at: DateTime<Utc>, now: Instant) -> Evaluation {
        let snapshot = PollSnapshot::new(records, polled_at);
        self.last_poll_time = Some(now);

        let Some(previous) = self.previous.clone() else {
            self.previous = Some(snapshot.clone());
            return Evaluation::Baseline { current: snapshot };
        };

        if compare(Some(&previous.fingerprint), &snapshot.fingerprint) {
            Evaluation::Changed {
                previous,
                current: snapshot,
            }
        } else {
            self.previous = Some(snapshot.clone());
            Evaluation::Unchanged { current: snapshot }
        }
    }

    /// Time from tracker start to the most recent poll
    pub fn elapsed(&self) -> Duration {
        self.last_poll_time
            .map(|last| last.duration_since(self.start_time))
            .unwrap_or_default()
    }

    /// Wall-clock start of the tracker
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
