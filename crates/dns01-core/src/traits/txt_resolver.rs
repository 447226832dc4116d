// # TXT Resolver Trait
//
// Defines the read-only view of DNS used while waiting for propagation.
//
// ## Implementations
//
// - Hickory (system, fixed or authoritative nameservers): `dns01-resolver-hickory` crate
// - Test doubles: `crates/dns01-core/tests/common`

use async_trait::async_trait;
use std::sync::Arc;

/// Trait for TXT lookups
///
/// # Error Semantics
///
/// Every error returned here is treated as transient by the
/// `PropagationWaiter`: SERVFAIL, timeouts and unreachable servers all mean
/// "not visible yet". Implementations should return
/// [`crate::Error::Resolution`].
///
/// An empty vector means the name currently has no TXT values.
///
/// # Thread Safety
///
/// A single resolver is queried concurrently by every in-flight waiter.
#[async_trait]
pub trait TxtResolver: Send + Sync {
    /// Look up every TXT value published at `fqdn`
    ///
    /// Multi-string TXT records are joined into a single value.
    async fn lookup_txt(&self, fqdn: &str) -> Result<Vec<String>, crate::Error>;

    /// Get the resolver name (for logging/debugging)
    fn resolver_name(&self) -> &'static str;
}

/// Helper trait for constructing resolvers from configuration
pub trait TxtResolverFactory: Send + Sync {
    fn create(
        &self,
        config: &crate::config::ResolverConfig,
    ) -> Result<Arc<dyn TxtResolver>, crate::Error>;
}
