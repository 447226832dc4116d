//! Contract Test: Concurrent Challenges
//!
//! Constraints verified:
//! - Challenges for different domains proceed in parallel
//! - One failing challenge does not affect its siblings
//! - A wildcard and its base domain can be validated together, each
//!   cleanup removing only its own value
//!
//! If this test fails, someone has serialized challenge processing or
//! introduced shared state between challenges.

mod common;

use common::*;
use dns01_core::{Challenge, ChallengeOrchestrator, Error, OrchestratorConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn orchestrator_over(provider: MockDnsProvider) -> (ChallengeOrchestrator, MockDnsProvider) {
    let handle = MockDnsProvider::sharing_counters_with(&provider);
    let resolver = Arc::new(ZoneResolver::new(provider.zone()));
    let (orchestrator, _rx) =
        ChallengeOrchestrator::new(Arc::new(provider), resolver, OrchestratorConfig::default())
            .unwrap();
    (orchestrator, handle)
}

#[tokio::test(start_paused = true)]
async fn challenges_run_in_parallel() {
    let (orchestrator, provider) =
        orchestrator_over(MockDnsProvider::new("mock").with_create_delay(Duration::from_secs(10)));

    let challenges = [
        Challenge::new("a.example.com", "ta", "ka"),
        Challenge::new("b.example.com", "tb", "kb"),
    ];

    let start = Instant::now();
    let results = orchestrator.present_all(&challenges).await;

    assert!(results.iter().all(|r| r.is_ok()), "{results:?}");
    assert_eq!(provider.create_call_count(), 2);
    assert_eq!(provider.published("_acme-challenge.a.example.com.").len(), 1);
    assert_eq!(provider.published("_acme-challenge.b.example.com.").len(), 1);
    // Sequential processing would take 20s
    assert!(start.elapsed() < Duration::from_secs(15));
}

#[tokio::test]
async fn failure_is_isolated_to_its_challenge() {
    let (orchestrator, provider) = orchestrator_over(
        MockDnsProvider::new("mock").rejecting("_acme-challenge.b.example.com.", "no_such_zone"),
    );

    let challenges = [
        Challenge::new("a.example.com", "ta", "ka"),
        Challenge::new("b.example.com", "tb", "kb"),
    ];
    let results = orchestrator.present_all(&challenges).await;

    assert!(results[0].is_ok());
    assert!(matches!(
        &results[1],
        Err(Error::Provider { message, .. }) if message == "no_such_zone"
    ));
    assert_eq!(provider.published("_acme-challenge.a.example.com.").len(), 1);
    assert_eq!(provider.delete_call_count(), 0);
}

#[tokio::test]
async fn clean_up_all_removes_every_record() {
    let (orchestrator, provider) = orchestrator_over(MockDnsProvider::new("mock"));

    let challenges = [
        Challenge::new("a.example.com", "ta", "ka"),
        Challenge::new("b.example.com", "tb", "kb"),
    ];
    orchestrator.present_all(&challenges).await;

    let results = orchestrator.clean_up_all(&challenges).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(provider.delete_call_count(), 2);
    assert!(provider.published("_acme-challenge.a.example.com.").is_empty());
    assert!(provider.published("_acme-challenge.b.example.com.").is_empty());
}

#[tokio::test]
async fn wildcard_and_base_share_one_name() {
    let (orchestrator, provider) = orchestrator_over(MockDnsProvider::new("mock"));
    let fqdn = "_acme-challenge.example.com.";

    let wildcard = Challenge::new("*.example.com", "t1", "wildcard-key");
    let base = Challenge::new("example.com", "t2", "base-key");
    let results = orchestrator
        .present_all(&[wildcard.clone(), base.clone()])
        .await;

    assert!(results.iter().all(|r| r.is_ok()), "{results:?}");
    assert_eq!(provider.published(fqdn).len(), 2);

    orchestrator
        .clean_up(&wildcard.domain, &wildcard.token, &wildcard.key_authorization)
        .await
        .unwrap();

    assert_eq!(
        provider.published(fqdn),
        vec![base.record().unwrap().value]
    );
}
