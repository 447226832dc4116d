// # DreamHost DNS Provider
//
// This crate provides a DreamHost DNS provider for DNS-01 challenge
// orchestration.
//
// ## Behaviour
//
// - ✅ One HTTP request per create/delete
// - ✅ Transport failures, non-2xx statuses and undecodable bodies are errors
// - ✅ Vendor failure messages (`data`) passed through verbatim
// - ✅ Deleting a record that does not exist succeeds
// - ✅ Dry-run mode for safe testing
// - ✅ HTTP timeout configured (30 seconds)
// - ❌ NO retry logic (owned by the ACME layer)
// - ❌ NO propagation polling (owned by `PropagationWaiter`)
//
// ## Security Requirements
//
// - API key NEVER appears in logs or `Debug` output
// - Provider MUST fail fast if the key is empty
//
// ## API Reference
//
// - DreamHost API: https://help.dreamhost.com/hc/en-us/articles/4407354972692
// - Add record:    GET `/?key=..&cmd=dns-add_record&format=json&record=..&type=TXT&value=..`
// - Remove record: GET `/?key=..&cmd=dns-remove_record&format=json&record=..&type=TXT&value=..`
//
// Responses are `{"result": "success" | "error", "data": "..."}`.

use async_trait::async_trait;
use dns01_core::config::ProviderConfig;
use dns01_core::traits::{DnsProvider, DnsProviderFactory};
use dns01_core::{DnsRecord, Error, PropagationPolicy, Result};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// DreamHost API base URL
pub const DREAMHOST_API_URL: &str = "https://api.dreamhost.com";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// DreamHost applies changes slowly; allow up to an hour
const PROPAGATION_TIMEOUT: Duration = Duration::from_secs(60 * 60);

const POLL_INTERVAL: Duration = Duration::from_secs(30);

const PROVIDER_NAME: &str = "dreamhost";

/// `data` values DreamHost returns when the record to remove is already gone
///
/// `no_such_value` covers a name that still holds other TXT values, as when
/// a wildcard and its base domain share `_acme-challenge`.
const ABSENT_RECORD_MESSAGES: [&str; 3] = ["no_such_record", "no_such_type", "no_such_value"];

/// API commands used by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    AddRecord,
    RemoveRecord,
}

impl Command {
    fn as_str(&self) -> &'static str {
        match self {
            Command::AddRecord => "dns-add_record",
            Command::RemoveRecord => "dns-remove_record",
        }
    }
}

/// Body returned by every DreamHost API command
///
/// Field names are matched case-insensitively by some clients; accept the
/// capitalised spelling too.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(alias = "Result")]
    result: String,
    #[serde(alias = "Data", default)]
    data: serde_json::Value,
}

impl ApiResponse {
    fn is_success(&self) -> bool {
        self.result == "success"
    }

    /// `data` as the vendor's message
    fn message(&self) -> String {
        match &self.data {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => self.result.clone(),
            other => other.to_string(),
        }
    }
}

/// Failure modes of a single API request
#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("HTTP request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to parse response: {0}")]
    Decode(#[source] reqwest::Error),

    /// Non-success `result`; carries `data` verbatim
    #[error("{0}")]
    Rejected(String),
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        Error::provider(PROVIDER_NAME, err.to_string())
    }
}

/// DreamHost DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider logs the request it would send and
/// reports success without contacting DreamHost. Records are never
/// published, so propagation checks will not succeed.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API key.
pub struct DreamhostProvider {
    /// DreamHost API key
    /// ⚠️ NEVER log this value
    api_key: String,

    /// API endpoint (overridable for testing)
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: log requests instead of sending them
    dry_run: bool,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for DreamhostProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DreamhostProvider")
            .field("api_key", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl DreamhostProvider {
    /// Create a new DreamHost provider
    ///
    /// # Parameters
    ///
    /// - `api_key`: DreamHost API key with `dns-*` permissions
    /// - `base_url`: Optional endpoint override (defaults to [`DREAMHOST_API_URL`])
    /// - `dry_run`: If true, log requests instead of sending them
    ///
    /// # Errors
    ///
    /// `Error::Config("Dreamhost credentials missing")` if `api_key` is empty.
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::config("Dreamhost credentials missing"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = base_url
            .unwrap_or_else(|| DREAMHOST_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            api_key,
            base_url,
            client,
            dry_run,
        })
    }

    /// Create a provider against the public API (production/live mode)
    pub fn new_live(api_key: impl Into<String>) -> Result<Self> {
        Self::new(api_key, None, false)
    }

    /// Create a provider in dry-run mode
    pub fn new_dry_run(api_key: impl Into<String>) -> Result<Self> {
        Self::new(api_key, None, true)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Send one API command for a record
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /?key=<key>&cmd=<cmd>&format=json&record=<name>&type=TXT&value=<value>
    /// ```
    async fn api_request(
        &self,
        command: Command,
        record: &DnsRecord,
    ) -> std::result::Result<ApiResponse, ApiError> {
        let url = format!("{}/", self.base_url);
        let record_type = record.record_type.as_str();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cmd", command.as_str()),
                ("format", "json"),
                ("record", record.name_without_dot()),
                ("type", record_type),
                ("value", record.value.as_str()),
            ])
            .send()
            .await
            // The URL carries the API key
            .map_err(|e| ApiError::Transport(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(ApiError::Status { status, body });
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.without_url()))?;
        tracing::debug!(
            cmd = command.as_str(),
            result = %body.result,
            "DreamHost API responded"
        );
        Ok(body)
    }

    /// Log the request a dry-run provider would have sent
    fn log_dry_run(&self, command: Command, record: &DnsRecord) {
        tracing::info!(
            "[DRY-RUN] Would send {} to {} for {} ({} {})",
            command.as_str(),
            self.base_url,
            record.name_without_dot(),
            record.record_type,
            record.value
        );
    }
}

#[async_trait]
impl DnsProvider for DreamhostProvider {
    /// Add a TXT record
    ///
    /// # Returns
    ///
    /// - `Ok(())`: DreamHost answered `result: success`
    /// - `Err(Error::Provider)`: Any other answer (with `data` verbatim),
    ///   or the request could not be completed
    async fn create_record(&self, record: &DnsRecord) -> Result<()> {
        tracing::info!(
            "Adding DreamHost record: {} [mode: {}]",
            record.name_without_dot(),
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        if self.dry_run {
            self.log_dry_run(Command::AddRecord, record);
            return Ok(());
        }

        let response = self.api_request(Command::AddRecord, record).await?;
        if !response.is_success() {
            return Err(ApiError::Rejected(response.message()).into());
        }

        tracing::info!("DreamHost record added: {}", record.name_without_dot());
        Ok(())
    }

    /// Remove a TXT record
    ///
    /// Answers reporting the record as already absent (`no_such_record`,
    /// `no_such_type`, `no_such_value`) count as success.
    async fn delete_record(&self, record: &DnsRecord) -> Result<()> {
        tracing::info!(
            "Removing DreamHost record: {} [mode: {}]",
            record.name_without_dot(),
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        if self.dry_run {
            self.log_dry_run(Command::RemoveRecord, record);
            return Ok(());
        }

        let response = self.api_request(Command::RemoveRecord, record).await?;
        if response.is_success() {
            tracing::info!("DreamHost record removed: {}", record.name_without_dot());
            return Ok(());
        }

        let message = response.message();
        if ABSENT_RECORD_MESSAGES.contains(&message.as_str()) {
            tracing::debug!(
                "DreamHost record already absent: {}",
                record.name_without_dot()
            );
            return Ok(());
        }

        Err(ApiError::Rejected(message).into())
    }

    fn propagation_policy(&self) -> PropagationPolicy {
        PropagationPolicy::new(PROPAGATION_TIMEOUT, POLL_INTERVAL)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Factory for creating DreamHost providers
pub struct DreamhostFactory;

impl DnsProviderFactory for DreamhostFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn DnsProvider>> {
        match config {
            ProviderConfig::Dreamhost {
                api_key,
                base_url,
                dry_run,
            } => {
                if *dry_run {
                    tracing::warn!(
                        "DreamHost provider running in DRY-RUN mode - no changes will be made"
                    );
                }

                Ok(Arc::new(DreamhostProvider::new(
                    api_key.clone(),
                    base_url.clone(),
                    *dry_run,
                )?))
            }
            _ => Err(Error::config("Invalid config for DreamHost provider")),
        }
    }
}

/// Register the DreamHost provider with a registry
///
/// # Example
///
/// ```rust
/// use dns01_core::ProviderRegistry;
///
/// let mut registry = ProviderRegistry::new();
/// dns01_provider_dreamhost::register(&mut registry);
/// assert!(registry.has_provider("dreamhost"));
/// ```
pub fn register(registry: &mut dns01_core::ProviderRegistry) {
    registry.register_provider(PROVIDER_NAME, Box::new(DreamhostFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_creation() {
        let config = ProviderConfig::Dreamhost {
            api_key: "test_key".to_string(),
            base_url: None,
            dry_run: false,
        };

        let provider = DreamhostFactory.create(&config).unwrap();
        assert_eq!(provider.provider_name(), "dreamhost");
    }

    #[test]
    fn test_missing_key() {
        let err = DreamhostProvider::new("", None, false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Dreamhost credentials missing"
        );
    }

    #[test]
    fn test_factory_rejects_other_configs() {
        let config = ProviderConfig::Custom {
            factory: "dreamhost".to_string(),
            config: serde_json::json!({}),
        };
        assert!(DreamhostFactory.create(&config).is_err());
    }

    #[test]
    fn test_dry_run_mode() {
        let dry = DreamhostProvider::new_dry_run("key").unwrap();
        let live = DreamhostProvider::new_live("key").unwrap();

        assert!(dry.is_dry_run());
        assert!(!live.is_dry_run());
        assert_eq!(live.base_url(), DREAMHOST_API_URL);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let provider =
            DreamhostProvider::new("key", Some("http://127.0.0.1:8080/".to_string()), false)
                .unwrap();
        assert_eq!(provider.base_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_propagation_policy() {
        let provider = DreamhostProvider::new_live("key").unwrap();
        let policy = provider.propagation_policy();

        assert_eq!(policy.timeout, Duration::from_secs(3600));
        assert_eq!(policy.poll_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_api_key_not_exposed_in_debug() {
        let provider = DreamhostProvider::new_live("super_secret_key_12345").unwrap();
        let debug_output = format!("{:?}", provider);

        assert!(!debug_output.contains("super_secret_key_12345"));
        assert!(debug_output.contains("<REDACTED>"));
    }

    #[test]
    fn test_response_message() {
        let rejected: ApiResponse =
            serde_json::from_str(r#"{"result":"error","data":"no_such_zone"}"#).unwrap();
        assert!(!rejected.is_success());
        assert_eq!(rejected.message(), "no_such_zone");

        let capitalised: ApiResponse =
            serde_json::from_str(r#"{"Result":"success","Data":"record_added"}"#).unwrap();
        assert!(capitalised.is_success());
    }

    #[tokio::test]
    async fn test_dry_run_sends_nothing() {
        // Unroutable endpoint: any real request would fail
        let provider =
            DreamhostProvider::new("key", Some("http://127.0.0.1:9".to_string()), true).unwrap();
        let record = dns01_core::compute_record("example.com", "k").unwrap();

        provider.create_record(&record).await.unwrap();
        provider.delete_record(&record).await.unwrap();
    }
}
