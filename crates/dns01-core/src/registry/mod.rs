//! Plugin-based provider registry
//!
//! The registry allows DNS providers and TXT resolvers to be registered
//! dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dns01_core::registry::ProviderRegistry;
//! use dns01_core::config::ProviderConfig;
//!
//! let mut registry = ProviderRegistry::new();
//! dns01_provider_dreamhost::register(&mut registry);
//! dns01_resolver_hickory::register(&mut registry);
//!
//! let config = ProviderConfig::Dreamhost { ... };
//! let provider = registry.create_provider(&config)?;
//! ```
//!
//! ## Registration
//!
//! Implementations register themselves from a `register` function:
//!
//! ```rust,ignore
//! // In dns01-provider-dreamhost crate
//! pub fn register(registry: &mut ProviderRegistry) {
//!     registry.register_provider("dreamhost", Box::new(DreamhostFactory));
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{ProviderConfig, ResolverConfig};
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, DnsProviderFactory, TxtResolver, TxtResolverFactory};

/// Registry for plugin-based provider and resolver creation
///
/// Registration happens once at startup, before the registry is shared, so
/// it takes `&mut self` and needs no locking.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered DNS provider factories
    providers: HashMap<String, Box<dyn DnsProviderFactory>>,

    /// Registered TXT resolver factories
    resolvers: HashMap<String, Box<dyn TxtResolverFactory>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a DNS provider factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider type name (e.g., "dreamhost")
    /// - `factory`: Factory object for creating provider instances
    ///
    /// A later registration under the same name replaces the earlier one.
    pub fn register_provider(
        &mut self,
        name: impl Into<String>,
        factory: Box<dyn DnsProviderFactory>,
    ) {
        self.providers.insert(name.into(), factory);
    }

    /// Register a TXT resolver factory
    ///
    /// # Parameters
    ///
    /// - `name`: Resolver type name ("system", "nameservers", "authoritative")
    /// - `factory`: Factory object for creating resolver instances
    pub fn register_resolver(
        &mut self,
        name: impl Into<String>,
        factory: Box<dyn TxtResolverFactory>,
    ) {
        self.resolvers.insert(name.into(), factory);
    }

    /// Create a DNS provider from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn DnsProvider>)`: Created provider instance
    /// - `Err(Error)`: If the provider type is not registered or creation fails
    pub fn create_provider(&self, config: &ProviderConfig) -> Result<Arc<dyn DnsProvider>> {
        let provider_type = config.type_name();

        let factory = self
            .providers
            .get(provider_type)
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?;

        factory.create(config)
    }

    /// Create a TXT resolver from configuration
    pub fn create_resolver(&self, config: &ResolverConfig) -> Result<Arc<dyn TxtResolver>> {
        let resolver_type = config.type_name();

        let factory = self
            .resolvers
            .get(resolver_type)
            .ok_or_else(|| Error::config(format!("Unknown resolver type: {}", resolver_type)))?;

        factory.create(config)
    }

    /// List all registered provider types
    pub fn list_providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// List all registered resolver types
    pub fn list_resolvers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.resolvers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Check if a resolver type is registered
    pub fn has_resolver(&self, name: &str) -> bool {
        self.resolvers.contains_key(name)
    }
}
