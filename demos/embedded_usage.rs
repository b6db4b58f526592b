//! Minimal embedding example for dnstrack-core
//!
//! Tracks one name on two in-process "nameservers" whose answer changes
//! after a few polls. No network access is needed. The application owns
//! the supervisor, the event loop and the aggregate view.

use dnstrack_core::aggregator::{Aggregator, ViewMode};
use dnstrack_core::records::{Record, RecordSet, RecordType};
use dnstrack_core::traits::Resolver;
use dnstrack_core::{MemoryExportSink, Result, Supervisor, TrackerConfig, TrackerEvent, TrackerOutcome};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Resolver whose answer moves to a new address after `switch_after` polls
struct FlippingResolver {
    switch_after: usize,
    calls: Mutex<HashMap<String, usize>>,
}

impl FlippingResolver {
    fn new(switch_after: usize) -> Self {
        Self {
            switch_after,
            calls: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait::async_trait]
impl Resolver for FlippingResolver {
    async fn resolve(&self, name: &str, _record_type: RecordType, server: &str) -> Result<RecordSet> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(server.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        // The second server picks the change up one poll later
        let lag = if server.ends_with(".2") { 1 } else { 0 };
        let address = if call > self.switch_after + lag {
            Ipv4Addr::new(192, 0, 2, 20)
        } else {
            Ipv4Addr::new(192, 0, 2, 10)
        };

        println!("[Resolver] {} @{} (poll {}) -> {}", name, server, call, address);
        Ok(std::iter::once(Record::a(format!("{}.", name), address, 300)).collect())
    }

    fn resolver_name(&self) -> &'static str {
        "embedded"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    println!("=== Embedded dnstrack-core Example ===\n");

    let config = TrackerConfig::new(
        RecordType::A,
        "example.com",
        vec!["192.0.2.1".to_string(), "192.0.2.2".to_string()],
    )
    .with_continuous(Duration::from_secs(1));
    config.validate()?;

    println!("1. Creating supervisor...");
    let export = MemoryExportSink::new();
    let (supervisor, mut events) = Supervisor::new(config, Arc::new(FlippingResolver::new(2)))?;
    let supervisor = supervisor.with_export(Arc::new(export.clone()));

    println!("2. Starting trackers in background...");
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(supervisor.run(cancel.clone()));

    let aggregator = Aggregator::new(ViewMode::History);
    while let Some(event) = events.recv().await {
        let kind = match &event {
            TrackerEvent::Started { .. } => "started",
            TrackerEvent::Update(_) => "update",
            TrackerEvent::Changed(_) => "changed",
            TrackerEvent::Failed { .. } => "failed",
        };
        println!("[Event] @{} {}", event.server(), kind);
        aggregator.apply(&event).await;
    }

    let completion = match handle.await {
        Ok(completion) => completion,
        Err(e) => {
            eprintln!("Supervisor task failed: {}", e);
            return Ok(());
        }
    };

    println!("\n3. All trackers finished:");
    for report in &completion.reports {
        match &report.outcome {
            TrackerOutcome::Changed(change) => {
                println!("   {} changed after {:?}", report.server, change.elapsed);
            }
            other => println!("   {} ended: {:?}", report.server, other),
        }
    }

    println!("\n4. Occurrence ledger:");
    let snapshot = aggregator.snapshot().await;
    for entry in &snapshot.ledger {
        println!(
            "   @{} {} .. {} {}",
            entry.server,
            entry.first_seen.format("%H:%M:%S"),
            entry.last_seen.format("%H:%M:%S"),
            entry.fingerprint.short()
        );
    }

    println!("\n5. Exported lines:");
    for line in export.lines().await {
        println!("   {}", line);
    }

    println!("\n=== Embedding Successful ===");
    Ok(())
}
