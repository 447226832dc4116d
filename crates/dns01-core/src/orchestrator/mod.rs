//! Challenge orchestration
//!
//! The ChallengeOrchestrator is responsible for:
//! - Deriving the challenge record
//! - Publishing it via the DnsProvider
//! - Waiting for it to become visible in DNS
//! - Removing it once the ACME layer is done, on every path that may have created it
//!
//! ## Architecture
//!
//! ```text
//!  ACME layer ── present(domain, token, key_auth) ──┐
//!                                                   ▼
//!                                      ┌─────────────────────────┐
//!                                      │  ChallengeOrchestrator  │
//!                                      └─────────────────────────┘
//!          ┌──────────────────────┬─────────────────┴───────┬──────────────────────┐
//!          ▼                      ▼                         ▼                      ▼
//! ┌─────────────────┐   ┌──────────────────┐   ┌────────────────────┐   ┌─────────────────┐
//! │ compute_record  │   │   DnsProvider    │   │ PropagationWaiter  │   │     Events      │
//! │ (fqdn, value)   │   │ (create/delete)  │   │ (poll TxtResolver) │   │    (notify)     │
//! └─────────────────┘   └──────────────────┘   └────────────────────┘   └─────────────────┘
//! ```
//!
//! ## Challenge Lifecycle
//!
//! ```text
//! Pending ──create ok──▶ RecordCreated ──visible──▶ Propagated ──▶ Validated
//!    │                        │                         │              │
//!    └─create rejected─▶ Failed ◀──timeout/cancel───────┘              │
//!                            │                                         │
//!                            └───────────── clean up ──────────────────┴──▶ CleanedUp
//! ```
//!
//! Every challenge is an independent future. The provider and resolver are
//! shared read-only; no locks are taken.

use futures::future::join_all;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::challenge::{Challenge, DnsRecord};
use crate::config::OrchestratorConfig;
use crate::error::{Error, Result};
use crate::propagation::{PropagationPolicy, PropagationWaiter};
use crate::traits::{Dns01Solver, DnsProvider, TxtResolver};

/// Lifecycle state of a single challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChallengeState {
    /// Record computed, nothing sent to the provider yet
    Pending,
    /// Provider accepted the record
    RecordCreated,
    /// Record observed in DNS
    Propagated,
    /// ACME validation succeeded
    Validated,
    /// Cleanup ran (whether or not the delete succeeded)
    CleanedUp,
    /// Presenting the record failed
    Failed,
}

impl ChallengeState {
    /// `Failed` and `CleanedUp` end the presentation flow
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChallengeState::Failed | ChallengeState::CleanedUp)
    }
}

impl fmt::Display for ChallengeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChallengeState::Pending => "pending",
            ChallengeState::RecordCreated => "record-created",
            ChallengeState::Propagated => "propagated",
            ChallengeState::Validated => "validated",
            ChallengeState::CleanedUp => "cleaned-up",
            ChallengeState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Events emitted by the ChallengeOrchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorEvent {
    /// Provider accepted the record
    RecordCreated { fqdn: String },

    /// Record observed in DNS
    PropagationConfirmed {
        fqdn: String,
        attempts: usize,
        elapsed: Duration,
    },

    /// Presenting the challenge failed
    ChallengeFailed { fqdn: String, error: String },

    /// Record removed
    CleanedUp { fqdn: String },

    /// Record removal failed (the record may be left behind)
    CleanupFailed { fqdn: String, error: String },
}

/// In-memory state of one in-flight challenge
///
/// Created by [`ChallengeOrchestrator::begin`], discarded after cleanup.
#[derive(Debug, Clone)]
pub struct ChallengeSession {
    challenge: Challenge,
    record: DnsRecord,
    state: ChallengeState,
    /// Whether the provider may hold the record
    record_may_exist: bool,
}

impl ChallengeSession {
    fn new(challenge: Challenge) -> Result<Self> {
        let record = challenge.record()?;
        Ok(Self {
            challenge,
            record,
            state: ChallengeState::Pending,
            record_may_exist: false,
        })
    }

    pub fn challenge(&self) -> &Challenge {
        &self.challenge
    }

    pub fn record(&self) -> &DnsRecord {
        &self.record
    }

    pub fn state(&self) -> ChallengeState {
        self.state
    }

    /// Whether a cleanup is still owed for this challenge
    pub fn needs_cleanup(&self) -> bool {
        self.record_may_exist && self.state != ChallengeState::CleanedUp
    }

    /// Record that the ACME server accepted the challenge
    ///
    /// Only valid once the record has propagated.
    pub fn mark_validated(&mut self) -> Result<()> {
        if self.state != ChallengeState::Propagated {
            return Err(Error::invalid_argument(format!(
                "cannot mark {} validated in state {}",
                self.record.fqdn, self.state
            )));
        }
        self.transition(ChallengeState::Validated);
        Ok(())
    }

    fn transition(&mut self, to: ChallengeState) {
        trace!(fqdn = %self.record.fqdn, from = %self.state, to = %to, "Challenge state transition");
        self.state = to;
    }
}

/// DNS-01 challenge orchestrator
///
/// One orchestrator serves every challenge of an order. It is immutable
/// after construction and may be shared by reference across tasks.
///
/// ## Cancellation
///
/// The orchestrator's [`CancellationToken`] aborts in-flight creates and
/// propagation waits. Deletes are not cancellable (they only have the
/// provider call timeout), so cleanup still runs after an abort.
pub struct ChallengeOrchestrator {
    /// DNS provider for publishing records
    provider: Arc<dyn DnsProvider>,

    /// Propagation waiter bound to the effective resolver
    waiter: PropagationWaiter,

    /// Effective propagation policy (provider policy plus overrides)
    policy: PropagationPolicy,

    /// Upper bound for each provider call
    provider_timeout: Duration,

    /// External abort signal
    cancel: CancellationToken,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<OrchestratorEvent>,
}

impl ChallengeOrchestrator {
    /// Create a new orchestrator
    ///
    /// # Parameters
    ///
    /// - `provider`: DNS provider implementation
    /// - `resolver`: Resolver for propagation checks (replaced by the
    ///   provider's readiness check when it offers one)
    /// - `config`: Orchestrator configuration
    ///
    /// # Returns
    ///
    /// A tuple of (orchestrator, event_receiver) where event_receiver yields orchestrator events
    pub fn new(
        provider: Arc<dyn DnsProvider>,
        resolver: Arc<dyn TxtResolver>,
        config: OrchestratorConfig,
    ) -> Result<(Self, mpsc::Receiver<OrchestratorEvent>)> {
        config.validate()?;

        let resolver = provider.readiness_resolver().unwrap_or(resolver);
        let policy = config.effective_policy(provider.propagation_policy());
        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        debug!(
            provider = provider.provider_name(),
            resolver = resolver.resolver_name(),
            timeout_secs = policy.timeout.as_secs(),
            interval_secs = policy.poll_interval.as_secs(),
            "Orchestrator configured"
        );

        let orchestrator = Self {
            provider,
            waiter: PropagationWaiter::new(resolver),
            policy,
            provider_timeout: config.provider_timeout(),
            cancel: CancellationToken::new(),
            event_tx: tx,
        };

        Ok((orchestrator, rx))
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that aborts in-flight presentations when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Effective propagation policy
    pub fn policy(&self) -> PropagationPolicy {
        self.policy
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Start tracking a challenge
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if the challenge domain is empty.
    pub fn begin(&self, challenge: Challenge) -> Result<ChallengeSession> {
        ChallengeSession::new(challenge)
    }

    /// Publish the session's record and wait until it is visible
    ///
    /// On failure the session ends in [`ChallengeState::Failed`]. A rejected
    /// create is returned unchanged and leaves nothing to clean up; after a
    /// timeout or cancellation [`ChallengeSession::needs_cleanup`] is set.
    pub async fn present_session(&self, session: &mut ChallengeSession) -> Result<()> {
        if session.state != ChallengeState::Pending {
            return Err(Error::invalid_argument(format!(
                "cannot present {} in state {}",
                session.record.fqdn, session.state
            )));
        }

        if self.cancel.is_cancelled() {
            return self.fail(
                session,
                Error::cancelled(format!("presentation of {} aborted", session.record.fqdn)),
            );
        }

        info!(
            fqdn = %session.record.fqdn,
            provider = self.provider.provider_name(),
            "Creating DNS-01 challenge record"
        );

        session.record_may_exist = true;
        let created = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = tokio::time::timeout(self.provider_timeout, self.provider.create_record(&session.record)) => Some(result),
        };

        match created {
            Some(Ok(Ok(()))) => {}
            Some(Ok(Err(e))) => {
                // Rejected by the vendor: nothing was published
                session.record_may_exist = false;
                return self.fail(session, e);
            }
            Some(Err(_)) => {
                let error = Error::provider_timeout(
                    self.provider.provider_name(),
                    "create_record",
                    self.provider_timeout,
                );
                return self.fail(session, error);
            }
            None => {
                return self.fail(
                    session,
                    Error::cancelled(format!("creation of {} aborted", session.record.fqdn)),
                );
            }
        }

        session.transition(ChallengeState::RecordCreated);
        self.emit_event(OrchestratorEvent::RecordCreated {
            fqdn: session.record.fqdn.clone(),
        });

        let waited = self
            .waiter
            .wait(
                &session.record.fqdn,
                &session.record.value,
                &self.policy,
                &self.cancel,
            )
            .await;

        match waited {
            Ok(report) => {
                session.transition(ChallengeState::Propagated);
                self.emit_event(OrchestratorEvent::PropagationConfirmed {
                    fqdn: session.record.fqdn.clone(),
                    attempts: report.attempts,
                    elapsed: report.elapsed,
                });
                Ok(())
            }
            Err(e) => self.fail(session, e),
        }
    }

    /// Remove the session's record
    ///
    /// Runs from any state and always leaves the session in
    /// [`ChallengeState::CleanedUp`]. A failed delete is logged and returned
    /// as a secondary error; callers may ignore it.
    pub async fn clean_up_session(&self, session: &mut ChallengeSession) -> Result<()> {
        if session.state == ChallengeState::CleanedUp {
            debug!(fqdn = %session.record.fqdn, "Challenge already cleaned up");
            return Ok(());
        }

        debug!(fqdn = %session.record.fqdn, state = %session.state, "Cleaning up DNS-01 challenge record");

        let deleted = match tokio::time::timeout(
            self.provider_timeout,
            self.provider.delete_record(&session.record),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::provider_timeout(
                self.provider.provider_name(),
                "delete_record",
                self.provider_timeout,
            )),
        };

        session.record_may_exist = false;
        session.transition(ChallengeState::CleanedUp);

        match deleted {
            Ok(()) => {
                info!(fqdn = %session.record.fqdn, "DNS-01 challenge record cleaned up");
                self.emit_event(OrchestratorEvent::CleanedUp {
                    fqdn: session.record.fqdn.clone(),
                });
                Ok(())
            }
            Err(e) => {
                warn!(
                    fqdn = %session.record.fqdn,
                    provider = self.provider.provider_name(),
                    error = %e,
                    "Failed to clean up DNS-01 challenge record"
                );
                self.emit_event(OrchestratorEvent::CleanupFailed {
                    fqdn: session.record.fqdn.clone(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Publish a record and wait for it, cleaning up if the wait fails
    ///
    /// A rejected create is returned as-is and triggers no cleanup.
    pub async fn present(&self, domain: &str, token: &str, key_auth: &str) -> Result<()> {
        let mut session = self.begin(Challenge::new(domain, token, key_auth))?;

        match self.present_session(&mut session).await {
            Ok(()) => Ok(()),
            Err(e) => {
                if session.needs_cleanup() {
                    // Primary error wins; the cleanup outcome is only logged
                    let _ = self.clean_up_session(&mut session).await;
                }
                Err(e)
            }
        }
    }

    /// Remove the record for a challenge
    pub async fn clean_up(&self, domain: &str, token: &str, key_auth: &str) -> Result<()> {
        let mut session = self.begin(Challenge::new(domain, token, key_auth))?;
        self.clean_up_session(&mut session).await
    }

    /// `(timeout, poll_interval)` of the effective propagation policy
    pub fn timeout(&self) -> (Duration, Duration) {
        (self.policy.timeout, self.policy.poll_interval)
    }

    /// Present, validate and clean up a challenge in one call
    ///
    /// `validate` runs once the record is visible and receives it; it is
    /// raced against the cancellation token. The record is removed on every
    /// path that may have created it, and the cleanup outcome never replaces
    /// the returned result.
    pub async fn solve<F, Fut, T>(&self, challenge: Challenge, validate: F) -> Result<T>
    where
        F: FnOnce(DnsRecord) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut session = self.begin(challenge)?;

        if let Err(e) = self.present_session(&mut session).await {
            if session.needs_cleanup() {
                let _ = self.clean_up_session(&mut session).await;
            }
            return Err(e);
        }

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::cancelled(format!(
                "validation of {} aborted",
                session.record.fqdn
            ))),
            result = validate(session.record.clone()) => result,
        };

        if outcome.is_ok() {
            session.transition(ChallengeState::Validated);
        }

        let _ = self.clean_up_session(&mut session).await;
        outcome
    }

    /// Present several challenges concurrently
    ///
    /// Returns one result per challenge, in input order. A failing
    /// challenge does not affect its siblings.
    pub async fn present_all(&self, challenges: &[Challenge]) -> Vec<Result<()>> {
        join_all(challenges.iter().map(|c| {
            self.present(&c.domain, &c.token, &c.key_authorization)
        }))
        .await
    }

    /// Clean up several challenges concurrently
    pub async fn clean_up_all(&self, challenges: &[Challenge]) -> Vec<Result<()>> {
        join_all(challenges.iter().map(|c| {
            self.clean_up(&c.domain, &c.token, &c.key_authorization)
        }))
        .await
    }

    /// Move a session to Failed and surface the error
    fn fail(&self, session: &mut ChallengeSession, error: Error) -> Result<()> {
        warn!(
            fqdn = %session.record.fqdn,
            state = %session.state,
            error = %error,
            "DNS-01 challenge failed"
        );
        session.transition(ChallengeState::Failed);
        self.emit_event(OrchestratorEvent::ChallengeFailed {
            fqdn: session.record.fqdn.clone(),
            error: error.to_string(),
        });
        Err(error)
    }

    /// Emit an orchestrator event
    fn emit_event(&self, event: OrchestratorEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

#[async_trait::async_trait]
impl Dns01Solver for ChallengeOrchestrator {
    async fn present(&self, domain: &str, token: &str, key_auth: &str) -> Result<()> {
        ChallengeOrchestrator::present(self, domain, token, key_auth).await
    }

    async fn clean_up(&self, domain: &str, token: &str, key_auth: &str) -> Result<()> {
        ChallengeOrchestrator::clean_up(self, domain, token, key_auth).await
    }

    fn timeout(&self) -> (Duration, Duration) {
        ChallengeOrchestrator::timeout(self)
    }
}
