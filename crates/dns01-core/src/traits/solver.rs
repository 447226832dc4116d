use async_trait::async_trait;
use std::time::Duration;

/// The three-call contract an ACME client drives for DNS-01
///
/// `present` publishes the record and returns once it is visible,
/// `clean_up` removes it after validation whatever the outcome, and
/// `timeout` tells the client how long `present` may take.
#[async_trait]
pub trait Dns01Solver: Send + Sync {
    async fn present(&self, domain: &str, token: &str, key_auth: &str) -> crate::Result<()>;

    async fn clean_up(&self, domain: &str, token: &str, key_auth: &str) -> crate::Result<()>;

    /// `(timeout, poll_interval)` of the effective propagation policy
    fn timeout(&self) -> (Duration, Duration);
}
