//! Contract Test: Change Detection
//!
//! This test verifies that a tracker reports a change exactly when the
//! normalized answer differs from the previous poll.
//!
//! Constraints verified:
//! - TTL-only differences are not a change
//! - Reordered answers are not a change
//! - A record repeated within one answer is not a change
//! - An address, target or membership difference is a change
//! - The change report carries the last matching poll and the new one
//! - Elapsed time runs from tracker start to the poll that saw the change
//!
//! If this test fails, someone has:
//! - Included TTL or wire order in the fingerprint
//! - Stopped collapsing duplicate entries before hashing
//! - Reported against the first poll instead of the last matching one
//! - Measured elapsed time from the wrong origin

mod common;

use common::*;
use dnstrack_core::records::RecordType;
use dnstrack_core::{Supervisor, TrackerEvent, TrackerOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SERVER: &str = "192.0.2.53";

#[tokio::test(start_paused = true)]
async fn ttl_change_is_ignored_and_address_change_is_reported() {
    let resolver = ScriptedResolver::new().script(
        SERVER,
        vec![
            a_answer(&[([192, 0, 2, 1], 300)]),
            a_answer(&[([192, 0, 2, 1], 250)]),
            a_answer(&[([192, 0, 2, 2], 300)]),
        ],
    );

    let config = continuous_config(RecordType::A, "example.com", &[SERVER], Duration::from_secs(60));
    let (supervisor, mut rx) = Supervisor::new(config, Arc::new(resolver.clone())).expect("valid config");

    let completion = supervisor.run(CancellationToken::new()).await;
    let events = drain(&mut rx).await;

    // Three polls: baseline, TTL-only, changed address
    assert_eq!(resolver.call_count(SERVER), 3);

    let updates: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            TrackerEvent::Update(update) => Some(update),
            _ => None,
        })
        .collect();
    assert_eq!(updates.len(), 2, "baseline and TTL-only poll are plain updates");
    assert!(updates.iter().all(|u| !u.hash_changed));

    let report = match &completion.report(SERVER).expect("server reported").outcome {
        TrackerOutcome::Changed(report) => report.clone(),
        other => panic!("expected a change, got {:?}", other),
    };

    // Previous is the TTL-only poll, not the baseline
    assert_eq!(report.previous.records.records()[0].ttl(), 250);
    assert_eq!(report.current.records.records()[0].value(), "192.0.2.2");
    assert_eq!(report.name, "example.com");
    assert_eq!(report.server, SERVER);
    assert!(
        about(report.elapsed, Duration::from_secs(120)),
        "elapsed should span two intervals, got {:?}",
        report.elapsed
    );

    // The terminal event is the change itself
    assert!(matches!(events.last(), Some(TrackerEvent::Changed(r)) if *r == report));
}

#[tokio::test(start_paused = true)]
async fn srv_reorder_is_ignored_and_added_target_is_reported() {
    let resolver = ScriptedResolver::new().script(
        SERVER,
        vec![
            srv_answer(&[("a.example.com.", 10, 60), ("b.example.com.", 20, 60)]),
            srv_answer(&[("b.example.com.", 20, 60), ("A.example.com", 10, 55)]),
            srv_answer(&[
                ("a.example.com.", 10, 60),
                ("b.example.com.", 20, 60),
                ("c.example.com.", 30, 60),
            ]),
        ],
    );

    let config = continuous_config(
        RecordType::Srv,
        "_sip._udp.example.com",
        &[SERVER],
        Duration::from_secs(60),
    );
    let (supervisor, mut rx) = Supervisor::new(config, Arc::new(resolver.clone())).expect("valid config");

    let completion = supervisor.run(CancellationToken::new()).await;
    let events = drain(&mut rx).await;

    let unchanged = events
        .iter()
        .filter(|e| matches!(e, TrackerEvent::Update(u) if !u.hash_changed))
        .count();
    assert_eq!(unchanged, 2, "reordered answer must not count as a change");

    match &completion.report(SERVER).expect("server reported").outcome {
        TrackerOutcome::Changed(report) => {
            assert_eq!(report.previous.records.len(), 2);
            assert_eq!(report.current.records.len(), 3);
            assert_ne!(report.previous.fingerprint, report.current.fingerprint);
        }
        other => panic!("expected a change, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn duplicated_entry_is_not_a_change() {
    let resolver = ScriptedResolver::new().script(
        SERVER,
        vec![
            a_answer(&[([192, 0, 2, 1], 300)]),
            a_answer(&[([192, 0, 2, 1], 300), ([192, 0, 2, 1], 250)]),
            a_answer(&[([192, 0, 2, 2], 300)]),
        ],
    );

    let config = continuous_config(RecordType::A, "example.com", &[SERVER], Duration::from_secs(60));
    let (supervisor, mut rx) = Supervisor::new(config, Arc::new(resolver.clone())).expect("valid config");

    let completion = supervisor.run(CancellationToken::new()).await;
    let events = drain(&mut rx).await;

    let unchanged = events
        .iter()
        .filter(|e| matches!(e, TrackerEvent::Update(u) if !u.hash_changed))
        .count();
    assert_eq!(unchanged, 2, "repeated entry must not end the measurement");
    assert_eq!(resolver.call_count(SERVER), 3);

    match &completion.report(SERVER).expect("server reported").outcome {
        TrackerOutcome::Changed(report) => {
            assert_eq!(report.previous.records.len(), 2);
            assert_eq!(report.current.records.records()[0].value(), "192.0.2.2");
        }
        other => panic!("expected a change, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn nxdomain_after_answer_is_a_change() {
    let resolver = ScriptedResolver::new().script(
        SERVER,
        vec![a_answer(&[([192, 0, 2, 1], 300)]), Reply::Answer(Default::default())],
    );

    let config = continuous_config(RecordType::A, "example.com", &[SERVER], Duration::from_secs(60));
    let (supervisor, _rx) = Supervisor::new(config, Arc::new(resolver)).expect("valid config");

    let completion = supervisor.run(CancellationToken::new()).await;

    match &completion.report(SERVER).expect("server reported").outcome {
        TrackerOutcome::Changed(report) => assert!(report.current.records.is_empty()),
        other => panic!("expected a change, got {:?}", other),
    }
}

#[tokio::test]
async fn single_shot_polls_once_per_server() {
    let servers = ["192.0.2.1", "192.0.2.2"];
    let resolver = ScriptedResolver::new()
        .script(servers[0], vec![a_answer(&[([192, 0, 2, 10], 300)])])
        .script(servers[1], vec![a_answer(&[([192, 0, 2, 20], 300)])]);

    let (supervisor, mut rx) =
        Supervisor::new(single_shot_config(&servers), Arc::new(resolver.clone())).expect("valid config");

    let completion = supervisor.run(CancellationToken::new()).await;
    let events = drain(&mut rx).await;

    for server in servers {
        assert_eq!(resolver.call_count(server), 1);
        assert_eq!(
            completion.report(server).map(|r| &r.outcome),
            Some(&TrackerOutcome::SingleShotReported)
        );
    }

    let updates = events
        .iter()
        .filter(|e| matches!(e, TrackerEvent::Update(_)))
        .count();
    assert_eq!(updates, 2);
}
