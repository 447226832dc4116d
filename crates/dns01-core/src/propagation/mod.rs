//! Propagation waiting
//!
//! After a provider accepts a record, DNS infrastructure may take anywhere
//! from seconds to an hour to serve it. The [`PropagationWaiter`] polls a
//! [`TxtResolver`] until the expected value shows up or the provider's
//! [`PropagationPolicy`] runs out.
//!
//! ## Poll Schedule
//!
//! ```text
//! t=0        t=i        t=2i             t=timeout
//!  │ check    │ check    │ check   ...     │ final check → PropagationTimeout
//!  └──sleep───┘──sleep───┘                 │
//! ```
//!
//! - The first check happens immediately
//! - Resolution errors count as "not yet", never as failure
//! - Each lookup is bounded by the time left, so a hung resolver cannot
//!   push the failure past the deadline
//! - The cancellation token is observed while looking up and while sleeping

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::error::{Error, Result};
use crate::traits::TxtResolver;

/// Lower bound for a single lookup's budget
///
/// Keeps the final check (taken when no time is left) meaningful.
const MIN_LOOKUP_BUDGET: Duration = Duration::from_secs(1);

/// Deadline used when `start + timeout` does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Budget for [`PropagationWaiter::check_once`]
const CHECK_ONCE_BUDGET: Duration = Duration::from_secs(5);

/// How long and how often to poll for a record
///
/// Supplied by each provider. A zero interval, or one longer than the
/// timeout, degrades the waiter to a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationPolicy {
    /// Overall time allowed for the record to become visible
    pub timeout: Duration,
    /// Pause between checks
    pub poll_interval: Duration,
}

impl PropagationPolicy {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Whether the policy only allows a single check
    pub fn is_single_check(&self) -> bool {
        self.poll_interval.is_zero() || self.poll_interval > self.timeout
    }

    /// Replace either field with a configured value
    pub fn with_overrides(self, timeout: Option<Duration>, poll_interval: Option<Duration>) -> Self {
        Self {
            timeout: timeout.unwrap_or(self.timeout),
            poll_interval: poll_interval.unwrap_or(self.poll_interval),
        }
    }
}

impl Default for PropagationPolicy {
    /// 60 seconds, checked every 2 seconds
    fn default() -> Self {
        Self::new(Duration::from_secs(60), Duration::from_secs(2))
    }
}

/// Outcome of a successful wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationReport {
    /// Number of checks performed, including the successful one
    pub attempts: usize,
    /// Time from the first check to the successful one
    pub elapsed: Duration,
}

/// Polls DNS until a TXT value is observed
#[derive(Clone)]
pub struct PropagationWaiter {
    resolver: Arc<dyn TxtResolver>,
}

impl PropagationWaiter {
    pub fn new(resolver: Arc<dyn TxtResolver>) -> Self {
        Self { resolver }
    }

    /// Wait for `expected_value` to appear among the TXT values at `fqdn`
    ///
    /// # Returns
    ///
    /// - `Ok(PropagationReport)`: The value was observed
    /// - `Err(Error::PropagationTimeout)`: Not observed before `policy.timeout`
    /// - `Err(Error::Cancelled)`: `cancel` fired
    pub async fn wait(
        &self,
        fqdn: &str,
        expected_value: &str,
        policy: &PropagationPolicy,
        cancel: &CancellationToken,
    ) -> Result<PropagationReport> {
        let start = Instant::now();
        let deadline = start
            .checked_add(policy.timeout)
            .unwrap_or_else(|| start + FAR_FUTURE);
        let single_check = policy.is_single_check();
        let mut attempts = 0usize;

        debug!(
            fqdn = %fqdn,
            resolver = self.resolver.resolver_name(),
            timeout_secs = policy.timeout.as_secs(),
            interval_secs = policy.poll_interval.as_secs(),
            single_check,
            "Waiting for DNS propagation"
        );

        loop {
            attempts += 1;
            let budget = deadline
                .saturating_duration_since(Instant::now())
                .max(MIN_LOOKUP_BUDGET);

            let found = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(Error::cancelled(format!("propagation wait for {} aborted", fqdn)));
                }
                found = self.check_within(fqdn, expected_value, budget) => found,
            };

            if found {
                let elapsed = start.elapsed();
                info!(fqdn = %fqdn, attempts, elapsed_ms = elapsed.as_millis() as u64, "DNS propagation confirmed");
                return Ok(PropagationReport { attempts, elapsed });
            }

            let now = Instant::now();
            if single_check || now >= deadline {
                return Err(Error::PropagationTimeout {
                    fqdn: fqdn.to_string(),
                    timeout: policy.timeout,
                    attempts,
                });
            }

            let pause = policy.poll_interval.min(deadline - now);
            trace!(fqdn = %fqdn, attempts, pause_ms = pause.as_millis() as u64, "Record not yet propagated");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(Error::cancelled(format!("propagation wait for {} aborted", fqdn)));
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }

    /// Check once, without waiting
    pub async fn check_once(&self, fqdn: &str, expected_value: &str) -> bool {
        self.check_within(fqdn, expected_value, CHECK_ONCE_BUDGET).await
    }

    /// Single lookup; every failure mode reads as "not yet"
    async fn check_within(&self, fqdn: &str, expected_value: &str, budget: Duration) -> bool {
        match tokio::time::timeout(budget, self.resolver.lookup_txt(fqdn)).await {
            Ok(Ok(values)) => {
                trace!(fqdn = %fqdn, values = ?values, "TXT lookup answered");
                values.iter().any(|value| value == expected_value)
            }
            Ok(Err(e)) => {
                debug!(fqdn = %fqdn, error = %e, "TXT lookup failed, treating as not propagated");
                false
            }
            Err(_) => {
                debug!(fqdn = %fqdn, budget_ms = budget.as_millis() as u64, "TXT lookup timed out, treating as not propagated");
                false
            }
        }
    }
}
