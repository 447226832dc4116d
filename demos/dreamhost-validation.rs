// DreamHost Provider Validation Tool
//
// Exercises the DreamHost provider and a hickory resolver end to end
// against a real account.
//
// ## Usage
//
// ```bash
// export DREAMHOST_API_KEY="your_api_key"
// export DNS01_DOMAIN="example.com"
// export DNS01_KEY_AUTH="token.thumbprint"   # optional
// export DNS01_MODE="dry-run"                # or "live"
//
// cargo run -p dns01-demos --bin dreamhost_validation
// ```
//
// In dry-run mode nothing is published, so the propagation step is skipped.

use dns01_core::{DnsProvider, PropagationPolicy, PropagationWaiter, TxtResolver, compute_record};
use dns01_provider_dreamhost::DreamhostProvider;
use dns01_resolver_hickory::HickoryTxtResolver;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("=== DreamHost Provider Validation ===");

    let api_key = std::env::var("DREAMHOST_API_KEY")
        .map_err(|_| "DREAMHOST_API_KEY environment variable not set")?;
    let domain =
        std::env::var("DNS01_DOMAIN").map_err(|_| "DNS01_DOMAIN environment variable not set")?;
    let key_auth = std::env::var("DNS01_KEY_AUTH")
        .unwrap_or_else(|_| "dns01-validation-token.dns01-validation-thumbprint".to_string());
    let mode = std::env::var("DNS01_MODE").unwrap_or_else(|_| "dry-run".to_string());
    let dry_run = mode != "live";

    info!("Configuration:");
    info!("  Domain: {}", domain);
    info!("  Mode: {}", if dry_run { "DRY-RUN" } else { "LIVE" });

    // Step 1: Create provider
    info!("--- Step 1: Creating DreamHost provider ---");
    let provider = if dry_run {
        DreamhostProvider::new_dry_run(api_key)?
    } else {
        DreamhostProvider::new_live(api_key)?
    };
    info!("✓ Provider created: {:?}", provider);

    // Step 2: Compute the challenge record
    info!("--- Step 2: Computing challenge record ---");
    let record = compute_record(&domain, &key_auth)?;
    info!("✓ {} {} {}", record.fqdn, record.record_type, record.value);

    // Step 3: Publish
    info!("--- Step 3: Creating TXT record ---");
    let created = match provider.create_record(&record).await {
        Ok(()) => {
            info!("✓ Record created");
            true
        }
        Err(e) => {
            error!("✗ Create failed: {}", e);
            false
        }
    };

    // Step 4: Wait for propagation
    info!("--- Step 4: Waiting for propagation ---");
    let propagated = if !created {
        warn!("Skipped: nothing was created");
        false
    } else if dry_run {
        info!("Skipped in dry-run mode");
        true
    } else {
        let resolver: Arc<dyn TxtResolver> = Arc::new(HickoryTxtResolver::authoritative(&[]));
        let waiter = PropagationWaiter::new(resolver);
        let policy = PropagationPolicy::new(Duration::from_secs(300), Duration::from_secs(10));
        match waiter
            .wait(&record.fqdn, &record.value, &policy, &CancellationToken::new())
            .await
        {
            Ok(report) => {
                info!(
                    "✓ Visible after {} check(s) ({:?})",
                    report.attempts, report.elapsed
                );
                true
            }
            Err(e) => {
                error!("✗ {}", e);
                false
            }
        }
    };

    // Step 5: Clean up
    info!("--- Step 5: Deleting TXT record ---");
    let deleted = match provider.delete_record(&record).await {
        Ok(()) => {
            info!("✓ Record deleted");
            true
        }
        Err(e) => {
            error!("✗ Delete failed: {}", e);
            false
        }
    };

    info!("=== Validation Summary ===");
    let mark = |ok: bool| if ok { "✓" } else { "✗" };
    info!("  {} create_record", mark(created));
    info!("  {} propagation", mark(propagated));
    info!("  {} delete_record", mark(deleted));

    if created && propagated && deleted {
        info!("All checks passed");
        Ok(())
    } else {
        Err("validation failed".into())
    }
}
