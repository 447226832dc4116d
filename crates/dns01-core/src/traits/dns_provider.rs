// # DNS Provider Trait
//
// Defines the interface for publishing challenge records via vendor APIs.
//
// ## Implementations
//
// - DreamHost: `dns01-provider-dreamhost` crate
// - Future: Cloudflare, Route53, DigitalOcean, etc.
//
// ## Usage
//
// ```rust,ignore
// use dns01_core::{compute_record, DnsProvider};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//     let record = compute_record("example.com", "token.thumbprint")?;
//
//     provider.create_record(&record).await?;
//     // ... ACME validation ...
//     provider.delete_record(&record).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::sync::Arc;

use crate::challenge::DnsRecord;
use crate::propagation::PropagationPolicy;
use crate::traits::TxtResolver;

/// Trait for DNS provider implementations
///
/// Each vendor backend implements this trait. The orchestrator never sees
/// authentication schemes (query-string keys, signed headers, OAuth) or
/// response shapes; everything a vendor reports as failure comes back as
/// [`crate::Error::Provider`] carrying the vendor's message.
///
/// # Thread Safety
///
/// Implementations must be thread-safe: one instance serves every
/// concurrent challenge, and its configuration is never mutated after
/// construction.
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse vendor-specific responses
/// - ✅ Return success or failure (the ACME layer owns retries)
///
/// ## Forbidden Capabilities
/// - ❌ Retry a rejected create (a single rejection ends the attempt)
/// - ❌ Poll DNS for propagation (owned by `PropagationWaiter`)
/// - ❌ Spawn tasks or keep state beyond credentials
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Publish a challenge record
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The vendor accepted the record
    /// - `Err(Error::Provider)`: Non-success vendor response, transport
    ///   failure or undecodable response
    async fn create_record(&self, record: &DnsRecord) -> Result<(), crate::Error>;

    /// Remove a challenge record
    ///
    /// # Idempotency
    ///
    /// Deleting a record that does not exist must succeed.
    async fn delete_record(&self, record: &DnsRecord) -> Result<(), crate::Error>;

    /// How long, and how often, to poll for this provider's records
    fn propagation_policy(&self) -> PropagationPolicy;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;

    /// Provider-supplied readiness check
    ///
    /// Providers whose API can report when a change is live return a
    /// resolver here; it then replaces DNS polling for their records.
    fn readiness_resolver(&self) -> Option<Arc<dyn TxtResolver>> {
        None
    }
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Arc<dyn DnsProvider>, crate::Error>;
}
