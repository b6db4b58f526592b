// # Occurrence Ledger
//
// Arena of every distinct answer each server has given.
//
// ## Layout
//
// Entries live in a `Vec` in first-seen order. A `(server, fingerprint)`
// index maps to the arena slot, so a repeat observation only extends
// `last_seen` of the existing entry. Entries are never removed.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::fingerprint::Fingerprint;
use crate::records::RecordSet;
use crate::tracker::PollSnapshot;

/// Arena slot of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct LedgerKey(usize);

/// One distinct answer of one server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Server that gave the answer
    pub server: String,
    /// Fingerprint of the answer
    pub fingerprint: Fingerprint,
    /// Time of the first poll with this answer
    pub first_seen: DateTime<Utc>,
    /// Time of the latest poll with this answer
    pub last_seen: DateTime<Utc>,
    /// The answer as first seen
    pub records: RecordSet,
}

/// Append/update-only ledger of answers
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
    index: HashMap<(String, Fingerprint), LedgerKey>,
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `server` answered with `snapshot`
    ///
    /// A known answer only moves `last_seen` forward; a new one is appended.
    pub fn observe(&mut self, server: &str, snapshot: &PollSnapshot) {
        let lookup = (server.to_string(), snapshot.fingerprint);

        if let Some(&key) = self.index.get(&lookup) {
            let entry = &mut self.entries[key.0];
            if snapshot.polled_at > entry.last_seen {
                entry.last_seen = snapshot.polled_at;
            }
            return;
        }

        let key = LedgerKey(self.entries.len());
        self.entries.push(LedgerEntry {
            server: server.to_string(),
            fingerprint: snapshot.fingerprint,
            first_seen: snapshot.polled_at,
            last_seen: snapshot.polled_at,
            records: snapshot.records.clone(),
        });
        self.index.insert(lookup, key);
    }

    /// All entries in first-seen order
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
