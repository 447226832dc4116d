//! Minimal embedding example for dns01-core
//!
//! This example demonstrates using dns01-core as a library in a custom
//! application: an in-memory "vendor" and a resolver that reads it, driven
//! by the orchestrator exactly as an ACME client would.

use dns01_core::{
    Challenge, ChallengeOrchestrator, Dns01Solver, DnsProvider, DnsRecord, OrchestratorConfig,
    OrchestratorEvent, PropagationPolicy, Result, TxtResolver,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Zone = Arc<Mutex<HashMap<String, Vec<String>>>>;

/// In-memory DNS provider for embedded usage
struct EmbeddedProvider {
    zone: Zone,
}

#[async_trait::async_trait]
impl DnsProvider for EmbeddedProvider {
    async fn create_record(&self, record: &DnsRecord) -> Result<()> {
        println!("[Embedded] Publishing {} TXT {}", record.fqdn, record.value);
        self.zone
            .lock()
            .map_err(|_| dns01_core::Error::provider("embedded", "zone lock poisoned"))?
            .entry(record.fqdn.clone())
            .or_default()
            .push(record.value.clone());
        Ok(())
    }

    async fn delete_record(&self, record: &DnsRecord) -> Result<()> {
        println!("[Embedded] Removing {}", record.fqdn);
        let mut zone = self
            .zone
            .lock()
            .map_err(|_| dns01_core::Error::provider("embedded", "zone lock poisoned"))?;
        if let Some(values) = zone.get_mut(&record.fqdn) {
            values.retain(|v| v != &record.value);
        }
        Ok(())
    }

    fn propagation_policy(&self) -> PropagationPolicy {
        PropagationPolicy::new(Duration::from_secs(10), Duration::from_millis(200))
    }

    fn provider_name(&self) -> &'static str {
        "embedded"
    }
}

/// Resolver that sees the in-memory zone after a short delay
struct EmbeddedResolver {
    zone: Zone,
}

#[async_trait::async_trait]
impl TxtResolver for EmbeddedResolver {
    async fn lookup_txt(&self, fqdn: &str) -> Result<Vec<String>> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let zone = self
            .zone
            .lock()
            .map_err(|_| dns01_core::Error::resolution("zone lock poisoned"))?;
        Ok(zone.get(fqdn).cloned().unwrap_or_default())
    }

    fn resolver_name(&self) -> &'static str {
        "embedded"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Embedded dns01-core Example ===\n");

    let zone: Zone = Arc::new(Mutex::new(HashMap::new()));
    let provider = Arc::new(EmbeddedProvider { zone: zone.clone() });
    let resolver = Arc::new(EmbeddedResolver { zone });

    let (orchestrator, mut events) =
        ChallengeOrchestrator::new(provider, resolver, OrchestratorConfig::default())?;

    // Monitor events
    let event_monitor = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                OrchestratorEvent::PropagationConfirmed {
                    fqdn,
                    attempts,
                    elapsed,
                } => println!(
                    "[Event] {} visible after {} check(s) ({:?})",
                    fqdn, attempts, elapsed
                ),
                other => println!("[Event] {:?}", other),
            }
        }
    });

    let (timeout, interval) = orchestrator.timeout();
    println!("Propagation policy: {:?} timeout, {:?} interval\n", timeout, interval);

    // The three-call contract, as an ACME client drives it
    let solver: &dyn Dns01Solver = &orchestrator;
    solver.present("example.com", "token", "abc123==").await?;
    println!("(ACME server validates here)");
    solver.clean_up("example.com", "token", "abc123==").await?;

    // Or let the orchestrator own the whole lifecycle around validation
    let status = orchestrator
        .solve(Challenge::new("www.example.com", "t0", "xyz789=="), |record| async move {
            println!("(validating {} against {})", record.fqdn, record.value);
            Ok("valid")
        })
        .await?;
    println!("solve: {}", status);

    // Several challenges of one order, presented concurrently
    let challenges = [
        Challenge::new("example.com", "t1", "key-one"),
        Challenge::new("*.example.com", "t2", "key-two"),
    ];
    for (challenge, result) in challenges
        .iter()
        .zip(orchestrator.present_all(&challenges).await)
    {
        println!("present {}: {:?}", challenge.domain, result.map(|_| "ok"));
    }
    orchestrator.clean_up_all(&challenges).await;

    drop(orchestrator);
    let _ = event_monitor.await;

    println!("\n=== Example Complete ===");
    Ok(())
}
