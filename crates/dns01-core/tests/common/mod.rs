//! Test doubles and common utilities for contract tests
//!
//! The doubles share an in-memory zone: `MockDnsProvider` writes to it and
//! `ZoneResolver` reads from it, so tests observe the same records a real
//! vendor and resolver pair would.

#![allow(dead_code)]

use dns01_core::error::{Error, Result};
use dns01_core::{DnsProvider, DnsRecord, PropagationPolicy, TxtResolver};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared record store: fqdn -> TXT values
pub type Zone = Arc<Mutex<HashMap<String, Vec<String>>>>;

pub fn new_zone() -> Zone {
    Arc::new(Mutex::new(HashMap::new()))
}

/// A mock DnsProvider that tracks calls and publishes into a [`Zone`]
pub struct MockDnsProvider {
    pub name: &'static str,
    zone: Zone,
    create_calls: Arc<AtomicUsize>,
    delete_calls: Arc<AtomicUsize>,
    deleted: Arc<Mutex<Vec<String>>>,
    create_error: Option<String>,
    rejected_fqdns: HashMap<String, String>,
    delete_error: Option<String>,
    create_delay: Option<Duration>,
    policy: PropagationPolicy,
    readiness: Option<Arc<dyn TxtResolver>>,
}

impl MockDnsProvider {
    pub fn new(name: &'static str) -> Self {
        Self::with_zone(name, new_zone())
    }

    pub fn with_zone(name: &'static str, zone: Zone) -> Self {
        Self {
            name,
            zone,
            create_calls: Arc::new(AtomicUsize::new(0)),
            delete_calls: Arc::new(AtomicUsize::new(0)),
            deleted: Arc::new(Mutex::new(Vec::new())),
            create_error: None,
            rejected_fqdns: HashMap::new(),
            delete_error: None,
            create_delay: None,
            policy: PropagationPolicy::default(),
            readiness: None,
        }
    }

    /// Reject every create with `message`
    pub fn failing_create(mut self, message: &str) -> Self {
        self.create_error = Some(message.to_string());
        self
    }

    /// Reject creates for one fqdn only
    pub fn rejecting(mut self, fqdn: &str, message: &str) -> Self {
        self.rejected_fqdns
            .insert(fqdn.to_string(), message.to_string());
        self
    }

    /// Fail every delete with `message`
    pub fn failing_delete(mut self, message: &str) -> Self {
        self.delete_error = Some(message.to_string());
        self
    }

    /// Sleep before answering a create
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    pub fn with_policy(mut self, policy: PropagationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_readiness(mut self, resolver: Arc<dyn TxtResolver>) -> Self {
        self.readiness = Some(resolver);
        self
    }

    /// Create a new MockDnsProvider that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            name: other.name,
            zone: Arc::clone(&other.zone),
            create_calls: Arc::clone(&other.create_calls),
            delete_calls: Arc::clone(&other.delete_calls),
            deleted: Arc::clone(&other.deleted),
            create_error: other.create_error.clone(),
            rejected_fqdns: other.rejected_fqdns.clone(),
            delete_error: other.delete_error.clone(),
            create_delay: other.create_delay,
            policy: other.policy,
            readiness: other.readiness.clone(),
        }
    }

    pub fn zone(&self) -> Zone {
        Arc::clone(&self.zone)
    }

    pub fn create_call_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn delete_call_count(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Fqdns passed to delete_record, in call order
    pub fn deleted_records(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    /// Values currently published at `fqdn`
    pub fn published(&self, fqdn: &str) -> Vec<String> {
        self.zone
            .lock()
            .unwrap()
            .get(fqdn)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn create_record(&self, record: &DnsRecord) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.create_error {
            return Err(Error::provider(self.name, message.clone()));
        }
        if let Some(message) = self.rejected_fqdns.get(&record.fqdn) {
            return Err(Error::provider(self.name, message.clone()));
        }

        self.zone
            .lock()
            .unwrap()
            .entry(record.fqdn.clone())
            .or_default()
            .push(record.value.clone());
        Ok(())
    }

    async fn delete_record(&self, record: &DnsRecord) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.deleted.lock().unwrap().push(record.fqdn.clone());

        if let Some(message) = &self.delete_error {
            return Err(Error::provider(self.name, message.clone()));
        }

        // Deleting an absent record succeeds
        let mut zone = self.zone.lock().unwrap();
        if let Some(values) = zone.get_mut(&record.fqdn) {
            values.retain(|v| v != &record.value);
            if values.is_empty() {
                zone.remove(&record.fqdn);
            }
        }
        Ok(())
    }

    fn propagation_policy(&self) -> PropagationPolicy {
        self.policy
    }

    fn provider_name(&self) -> &'static str {
        self.name
    }

    fn readiness_resolver(&self) -> Option<Arc<dyn TxtResolver>> {
        self.readiness.clone()
    }
}

/// Serves the values of a [`Zone`], hiding them for the first `hidden_for` lookups
pub struct ZoneResolver {
    zone: Zone,
    hidden_for: usize,
    calls: AtomicUsize,
}

impl ZoneResolver {
    pub fn new(zone: Zone) -> Self {
        Self::lagging(zone, 0)
    }

    pub fn lagging(zone: Zone, hidden_for: usize) -> Self {
        Self {
            zone,
            hidden_for,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TxtResolver for ZoneResolver {
    async fn lookup_txt(&self, fqdn: &str) -> Result<Vec<String>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.hidden_for {
            return Ok(Vec::new());
        }
        Ok(self
            .zone
            .lock()
            .unwrap()
            .get(fqdn)
            .cloned()
            .unwrap_or_default())
    }

    fn resolver_name(&self) -> &'static str {
        "zone"
    }
}

/// A resolver that never sees any record
#[derive(Default)]
pub struct NeverResolver {
    calls: AtomicUsize,
}

impl NeverResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TxtResolver for NeverResolver {
    async fn lookup_txt(&self, _fqdn: &str) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    fn resolver_name(&self) -> &'static str {
        "never"
    }
}

/// Fails with a resolution error for the first `failures` lookups, then answers `values`
pub struct FlakyResolver {
    failures: usize,
    values: Vec<String>,
    calls: AtomicUsize,
}

impl FlakyResolver {
    pub fn new(failures: usize, values: &[&str]) -> Self {
        Self {
            failures,
            values: values.iter().map(|v| v.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TxtResolver for FlakyResolver {
    async fn lookup_txt(&self, _fqdn: &str) -> Result<Vec<String>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(Error::resolution("SERVFAIL"));
        }
        Ok(self.values.clone())
    }

    fn resolver_name(&self) -> &'static str {
        "flaky"
    }
}

/// A resolver whose lookups never complete
pub struct HangingResolver;

#[async_trait::async_trait]
impl TxtResolver for HangingResolver {
    async fn lookup_txt(&self, _fqdn: &str) -> Result<Vec<String>> {
        std::future::pending().await
    }

    fn resolver_name(&self) -> &'static str {
        "hanging"
    }
}

/// Orchestrator config with a fixed propagation policy
pub fn config_with_policy(timeout_secs: u64, interval_secs: u64) -> dns01_core::OrchestratorConfig {
    dns01_core::OrchestratorConfig {
        propagation_timeout_secs: Some(timeout_secs),
        poll_interval_secs: Some(interval_secs),
        ..Default::default()
    }
}
