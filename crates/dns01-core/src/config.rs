//! Configuration types for DNS-01 orchestration
//!
//! This module defines all configuration structures used throughout the crate.
//! Loading them (environment, files) is the embedding application's job; the
//! core only validates.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

use crate::propagation::PropagationPolicy;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dns01Config {
    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Resolver used for propagation checks
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Optional orchestrator settings
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

impl Dns01Config {
    /// Create a configuration for a provider with default settings
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            resolver: ResolverConfig::default(),
            orchestrator: OrchestratorConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.provider.validate()?;
        self.resolver.validate()?;
        self.orchestrator.validate()?;
        Ok(())
    }
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// DreamHost provider
    Dreamhost {
        /// DreamHost API key
        api_key: String,
        /// API endpoint override (defaults to the public DreamHost API)
        #[serde(default)]
        base_url: Option<String>,
        /// Log requests instead of sending them
        #[serde(default)]
        dry_run: bool,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Dreamhost {
                base_url, dry_run, ..
            } => f
                .debug_struct("Dreamhost")
                .field("api_key", &"<redacted>")
                .field("base_url", base_url)
                .field("dry_run", dry_run)
                .finish(),
            ProviderConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("config", &"<redacted>")
                .finish(),
        }
    }
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Dreamhost {
                api_key, base_url, ..
            } => {
                if api_key.is_empty() {
                    return Err(crate::Error::config("Dreamhost credentials missing"));
                }
                if let Some(url) = base_url
                    && !url.starts_with("https://")
                    && !url.starts_with("http://")
                {
                    return Err(crate::Error::config(format!(
                        "Dreamhost base URL must use HTTP or HTTPS scheme. Got: {}",
                        url
                    )));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Dreamhost { .. } => "dreamhost",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Resolver configuration for propagation checks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolverConfig {
    /// Host resolver configuration (e.g., /etc/resolv.conf)
    #[default]
    System,

    /// Query a fixed set of recursive nameservers
    Nameservers {
        /// Nameserver addresses (port 53)
        addrs: Vec<IpAddr>,
    },

    /// Query the zone's authoritative nameservers directly
    Authoritative {
        /// Recursive servers used to discover the NS set (empty = system)
        #[serde(default)]
        bootstrap: Vec<IpAddr>,
    },
}

impl ResolverConfig {
    /// Validate the resolver configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ResolverConfig::Nameservers { addrs } if addrs.is_empty() => Err(
                crate::Error::config("Nameserver resolver needs at least one address"),
            ),
            _ => Ok(()),
        }
    }

    /// Get the resolver type name
    pub fn type_name(&self) -> &str {
        match self {
            ResolverConfig::System => "system",
            ResolverConfig::Nameservers { .. } => "nameservers",
            ResolverConfig::Authoritative { .. } => "authoritative",
        }
    }
}

/// Upper bound for the propagation timeout and poll interval overrides (one day)
pub const MAX_PROPAGATION_SECS: u64 = 86_400;

/// Upper bound for a single provider call (one hour)
pub const MAX_PROVIDER_TIMEOUT_SECS: u64 = 3_600;

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Upper bound for a single provider create/delete call (in seconds)
    ///
    /// Independent of the propagation policy.
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Capacity of the event channel
    ///
    /// When full, events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Override for the provider's propagation timeout (in seconds)
    #[serde(default)]
    pub propagation_timeout_secs: Option<u64>,

    /// Override for the provider's poll interval (in seconds)
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
}

impl OrchestratorConfig {
    /// Validate the orchestrator configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.provider_timeout_secs == 0 {
            return Err(crate::Error::config("Provider timeout must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        if self.provider_timeout_secs > MAX_PROVIDER_TIMEOUT_SECS {
            return Err(crate::Error::config(format!(
                "Provider timeout must be at most {} seconds. Got: {}",
                MAX_PROVIDER_TIMEOUT_SECS, self.provider_timeout_secs
            )));
        }
        for (name, value) in [
            ("Propagation timeout", self.propagation_timeout_secs),
            ("Poll interval", self.poll_interval_secs),
        ] {
            if let Some(secs) = value
                && secs > MAX_PROPAGATION_SECS
            {
                return Err(crate::Error::config(format!(
                    "{} must be at most {} seconds. Got: {}",
                    name, MAX_PROPAGATION_SECS, secs
                )));
            }
        }
        Ok(())
    }

    /// Provider call timeout as a Duration
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    /// Apply the configured overrides to a provider's policy
    pub fn effective_policy(&self, provider_policy: PropagationPolicy) -> PropagationPolicy {
        provider_policy.with_overrides(
            self.propagation_timeout_secs.map(Duration::from_secs),
            self.poll_interval_secs.map(Duration::from_secs),
        )
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            provider_timeout_secs: default_provider_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            propagation_timeout_secs: None,
            poll_interval_secs: None,
        }
    }
}

fn default_provider_timeout_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dreamhost_requires_key() {
        let config = ProviderConfig::Dreamhost {
            api_key: String::new(),
            base_url: None,
            dry_run: false,
        };
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Dreamhost credentials missing"
        );
    }

    #[test]
    fn test_base_url_scheme_checked() {
        let config = ProviderConfig::Dreamhost {
            api_key: "key".to_string(),
            base_url: Some("ftp://api.example".to_string()),
            dry_run: false,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_json_uses_defaults() {
        let json = serde_json::json!({
            "provider": { "type": "dreamhost", "api_key": "abc" }
        });
        let config: Dns01Config = serde_json::from_value(json).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.provider.type_name(), "dreamhost");
        assert_eq!(config.resolver, ResolverConfig::System);
        assert_eq!(config.orchestrator.provider_timeout_secs, 30);
        assert_eq!(config.orchestrator.event_channel_capacity, 100);
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let config = ProviderConfig::Dreamhost {
            api_key: "super-secret".to_string(),
            base_url: None,
            dry_run: true,
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_empty_nameserver_list_rejected() {
        let resolver = ResolverConfig::Nameservers { addrs: vec![] };
        assert!(resolver.validate().is_err());
    }

    #[test]
    fn test_effective_policy_overrides() {
        let base = PropagationPolicy::new(Duration::from_secs(3600), Duration::from_secs(30));

        let untouched = OrchestratorConfig::default().effective_policy(base);
        assert_eq!(untouched, base);

        let config = OrchestratorConfig {
            propagation_timeout_secs: Some(120),
            ..OrchestratorConfig::default()
        };
        let tuned = config.effective_policy(base);
        assert_eq!(tuned.timeout, Duration::from_secs(120));
        assert_eq!(tuned.poll_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_oversized_overrides_rejected() {
        for config in [
            OrchestratorConfig {
                propagation_timeout_secs: Some(u64::MAX),
                ..OrchestratorConfig::default()
            },
            OrchestratorConfig {
                poll_interval_secs: Some(MAX_PROPAGATION_SECS + 1),
                ..OrchestratorConfig::default()
            },
            OrchestratorConfig {
                provider_timeout_secs: u64::MAX,
                ..OrchestratorConfig::default()
            },
        ] {
            assert!(config.validate().is_err(), "{config:?}");
        }

        let one_day = OrchestratorConfig {
            propagation_timeout_secs: Some(MAX_PROPAGATION_SECS),
            ..OrchestratorConfig::default()
        };
        assert!(one_day.validate().is_ok());
    }

    #[test]
    fn test_zero_provider_timeout_rejected() {
        let config = OrchestratorConfig {
            provider_timeout_secs: 0,
            ..OrchestratorConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
