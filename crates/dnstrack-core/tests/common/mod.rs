//! Test doubles and common utilities for contract tests
//!
//! This module provides scripted resolvers that answer from a per-server
//! queue, so tests control exactly what each nameserver returns on each
//! poll without touching the network.

#![allow(dead_code)]

use dnstrack_core::error::{Error, Result};
use dnstrack_core::records::{Record, RecordSet, RecordType};
use dnstrack_core::traits::Resolver;
use dnstrack_core::{TrackerConfig, TrackerEvent};
use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// One scripted resolver reply
#[derive(Debug, Clone)]
pub enum Reply {
    Answer(RecordSet),
    Fail(String),
}

/// A resolver that replays a script per server
///
/// Replies are consumed in order; the last reply of a script repeats
/// forever. A server without a script fails every lookup.
#[derive(Clone, Default)]
pub struct ScriptedResolver {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Reply>>>>,
    /// Monotonic time of every call, per server
    calls: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
}

impl ScriptedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the replies for `server`
    pub fn script(self, server: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(server.to_string(), replies.into());
        self
    }

    /// Number of lookups sent to `server`
    pub fn call_count(&self, server: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(server)
            .map(|calls| calls.len())
            .unwrap_or(0)
    }

    /// Monotonic times of the lookups sent to `server`
    pub fn call_times(&self, server: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .get(server)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Resolver for ScriptedResolver {
    async fn resolve(&self, name: &str, _record_type: RecordType, server: &str) -> Result<RecordSet> {
        self.calls
            .lock()
            .unwrap()
            .entry(server.to_string())
            .or_default()
            .push(Instant::now());

        let reply = {
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(server) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Answer(records)) => Ok(records),
            Some(Reply::Fail(message)) => Err(Error::resolution(server, name, message)),
            None => Err(Error::resolution(server, name, "no script for server")),
        }
    }

    fn resolver_name(&self) -> &'static str {
        "scripted"
    }
}

/// A resolver whose lookups never complete
pub struct PendingResolver;

#[async_trait::async_trait]
impl Resolver for PendingResolver {
    async fn resolve(&self, _name: &str, _record_type: RecordType, _server: &str) -> Result<RecordSet> {
        std::future::pending().await
    }

    fn resolver_name(&self) -> &'static str {
        "pending"
    }
}

/// A-record answer for `example.com` from `(address, ttl)` pairs
pub fn a_answer(entries: &[([u8; 4], u32)]) -> Reply {
    Reply::Answer(
        entries
            .iter()
            .map(|(octets, ttl)| Record::a("example.com.", Ipv4Addr::from(*octets), *ttl))
            .collect(),
    )
}

/// SRV answer for `_sip._udp.example.com` from `(target, priority, ttl)`
pub fn srv_answer(entries: &[(&str, u16, u32)]) -> Reply {
    Reply::Answer(
        entries
            .iter()
            .map(|(target, priority, ttl)| Record::srv("_sip._udp.example.com.", *target, *priority, *ttl))
            .collect(),
    )
}

/// Continuous-mode configuration for `example.com`
pub fn continuous_config(record_type: RecordType, name: &str, servers: &[&str], interval: Duration) -> TrackerConfig {
    TrackerConfig::new(record_type, name, servers.iter().map(|s| s.to_string()).collect())
        .with_continuous(interval)
}

/// Single-shot configuration for `example.com`
pub fn single_shot_config(servers: &[&str]) -> TrackerConfig {
    TrackerConfig::new(
        RecordType::A,
        "example.com",
        servers.iter().map(|s| s.to_string()).collect(),
    )
}

/// Drain every event left on a closed channel
pub async fn drain(rx: &mut mpsc::Receiver<TrackerEvent>) -> Vec<TrackerEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

/// Whether `elapsed` is `expected` up to timer granularity
pub fn about(elapsed: Duration, expected: Duration) -> bool {
    elapsed >= expected && elapsed < expected + Duration::from_secs(1)
}
