//! Contract Test: Aggregator and Occurrence Ledger
//!
//! This test verifies how tracker events fold into the aggregate view.
//!
//! Constraints verified:
//! - Repeating an answer extends `last_seen` and keeps `first_seen`
//! - A new answer adds a ledger entry; old entries are never removed
//! - Applying the same update twice is idempotent
//! - The previous slot is filled from the stored entry
//! - Failures are visible next to the answers of other servers
//!
//! If this test fails, someone has:
//! - Overwritten ledger entries instead of extending them
//! - Keyed the ledger on something other than (server, fingerprint)
//! - Lost the previous answer between updates

mod common;

use common::*;
use dnstrack_core::aggregator::{Aggregator, ViewMode};
use dnstrack_core::records::RecordType;
use dnstrack_core::{Supervisor, TrackerEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SERVER: &str = "192.0.2.53";
const FAILING: &str = "192.0.2.54";

/// Run a supervised measurement and fold every event into `aggregator`
async fn run_into(aggregator: &Aggregator, resolver: ScriptedResolver, servers: &[&str]) -> Vec<TrackerEvent> {
    let config = continuous_config(RecordType::A, "example.com", servers, Duration::from_secs(60));
    let (supervisor, mut rx) = Supervisor::new(config, Arc::new(resolver)).expect("valid config");

    supervisor.run(CancellationToken::new()).await;

    let events = drain(&mut rx).await;
    for event in &events {
        aggregator.apply(event).await;
    }
    events
}

#[tokio::test(start_paused = true)]
async fn history_ledger_tracks_distinct_answers() {
    let resolver = ScriptedResolver::new()
        .script(
            SERVER,
            vec![
                a_answer(&[([192, 0, 2, 1], 300)]),
                a_answer(&[([192, 0, 2, 1], 240)]),
                a_answer(&[([192, 0, 2, 2], 300)]),
            ],
        )
        .script(FAILING, vec![Reply::Fail("refused".to_string())]);

    let aggregator = Aggregator::new(ViewMode::History);
    let events = run_into(&aggregator, resolver, &[SERVER, FAILING]).await;

    let updates: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            TrackerEvent::Update(u) => Some(u.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(updates.len(), 2);

    let snapshot = aggregator.snapshot().await;
    let ledger: Vec<_> = snapshot.ledger_for(SERVER).collect();
    assert_eq!(ledger.len(), 2, "two distinct answers");

    // The repeated answer spans both unchanged polls
    let first = ledger[0];
    assert_eq!(first.first_seen, updates[0].current.polled_at);
    assert_eq!(first.last_seen, updates[1].current.polled_at);
    assert_eq!(first.records.records()[0].value(), "192.0.2.1");

    // The change opened a new entry
    assert_eq!(ledger[1].records.records()[0].value(), "192.0.2.2");
    assert_eq!(ledger[1].first_seen, ledger[1].last_seen);

    // The failed server has no answers but is reported
    assert_eq!(snapshot.ledger_for(FAILING).count(), 0);
    assert!(snapshot.server(FAILING).is_none());
    assert_eq!(snapshot.failures.len(), 1);
    assert_eq!(snapshot.failures[0].server, FAILING);

    // Final view shows the change with both sides
    let view = snapshot.server(SERVER).expect("server answered");
    assert!(view.hash_changed);
    assert!(view.change.is_some());
    assert_eq!(view.previous.as_ref().map(|p| p.records.records()[0].ttl()), Some(240));
}

#[tokio::test(start_paused = true)]
async fn repeated_update_is_idempotent() {
    let resolver = ScriptedResolver::new().script(SERVER, vec![a_answer(&[([192, 0, 2, 1], 300)])]);

    let aggregator = Aggregator::new(ViewMode::History);
    let config = single_shot_config(&[SERVER]);
    let (supervisor, mut rx) = Supervisor::new(config, Arc::new(resolver)).expect("valid config");
    supervisor.run(CancellationToken::new()).await;

    let update = drain(&mut rx)
        .await
        .into_iter()
        .find_map(|e| match e {
            TrackerEvent::Update(u) => Some(u),
            _ => None,
        })
        .expect("one update");

    aggregator.on_update(&update).await;
    let once = aggregator.snapshot().await;
    aggregator.on_update(&update).await;
    let twice = aggregator.snapshot().await;

    assert_eq!(once.ledger, twice.ledger);
    assert_eq!(twice.ledger.len(), 1);
    assert_eq!(twice.ledger[0].first_seen, update.current.polled_at);

    // The same poll applied twice is still the first answer
    let view = twice.server(SERVER).unwrap();
    assert!(view.previous.is_none());
    assert_eq!(view.current, update.current);
}

#[tokio::test]
async fn latest_mode_has_no_ledger() {
    let resolver = ScriptedResolver::new().script(SERVER, vec![a_answer(&[([192, 0, 2, 1], 300)])]);

    let aggregator = Aggregator::new(ViewMode::Latest);
    let config = single_shot_config(&[SERVER]);
    let (supervisor, mut rx) = Supervisor::new(config, Arc::new(resolver)).expect("valid config");
    supervisor.run(CancellationToken::new()).await;

    for event in drain(&mut rx).await {
        aggregator.apply(&event).await;
    }

    let snapshot = aggregator.snapshot().await;
    assert_eq!(snapshot.mode, ViewMode::Latest);
    assert!(snapshot.ledger.is_empty());
    assert_eq!(snapshot.servers.len(), 1);
    assert!(snapshot.servers[0].previous.is_none());
}
