// # Hickory TXT Resolver
//
// `TxtResolver` implementation backed by hickory-resolver.
//
// ## Modes
//
// - **system**: host configuration (e.g. `/etc/resolv.conf`), falling back
//   to hickory's default upstreams
// - **nameservers**: a fixed set of recursive servers
// - **authoritative**: discover the zone's NS set through a bootstrap
//   resolver, then ask those servers directly. Sees a record as soon as the
//   vendor's nameservers serve it, independent of recursive caches.
//
// Caching is disabled everywhere: a cached NXDOMAIN would hide the record
// for its negative TTL.

use async_trait::async_trait;
use dns01_core::config::ResolverConfig;
use dns01_core::traits::{TxtResolver, TxtResolverFactory};
use dns01_core::{Error, Result};
use futures::future::join_all;
use hickory_resolver::config::{
    NameServerConfigGroup, ResolverConfig as HickoryConfig, ResolverOpts,
};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::ProtoErrorKind;
use hickory_resolver::{ResolveError, TokioResolver};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Per-query timeout inside hickory
const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolver options for propagation checks
fn propagation_opts() -> ResolverOpts {
    let mut opts = ResolverOpts::default();
    opts.cache_size = 0;
    opts.timeout = QUERY_TIMEOUT;
    opts.attempts = 2;
    opts
}

fn resolver_for(config: HickoryConfig) -> TokioResolver {
    TokioResolver::builder_with_config(config, TokioConnectionProvider::default())
        .with_options(propagation_opts())
        .build()
}

/// Resolver using the host system configuration (with fallback)
fn system_resolver() -> TokioResolver {
    #[cfg(any(unix, target_os = "windows"))]
    {
        match TokioResolver::builder_tokio() {
            Ok(mut builder) => {
                let opts = builder.options_mut();
                opts.cache_size = 0;
                opts.timeout = QUERY_TIMEOUT;
                return builder.build();
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to load system DNS configuration, falling back to defaults: {e}"
                );
            }
        }
    }

    resolver_for(HickoryConfig::default())
}

/// Resolver querying `addrs` on port 53
fn nameserver_resolver(addrs: &[IpAddr]) -> TokioResolver {
    resolver_for(HickoryConfig::from_parts(
        None,
        vec![],
        NameServerConfigGroup::from_ips_clear(addrs, 53, true),
    ))
}

/// Candidate zone apexes for `fqdn`, most specific first (root excluded)
fn zone_candidates(fqdn: &str) -> Vec<String> {
    let name = fqdn.trim_end_matches('.');
    let mut candidates = Vec::new();
    let mut rest = name;

    loop {
        if !rest.is_empty() {
            candidates.push(format!("{}.", rest));
        }
        match rest.split_once('.') {
            Some((_, parent)) => rest = parent,
            None => break,
        }
    }
    candidates
}

/// NXDOMAIN or an empty NOERROR answer
fn is_empty_answer(error: &ResolveError) -> bool {
    error
        .proto()
        .is_some_and(|proto| matches!(proto.kind(), ProtoErrorKind::NoRecordsFound { .. }))
}

enum Mode {
    Direct(TokioResolver),
    Authoritative { bootstrap: TokioResolver },
}

/// TXT resolver built on hickory
pub struct HickoryTxtResolver {
    mode: Mode,
    name: &'static str,
}

impl HickoryTxtResolver {
    /// Use the host's resolver configuration
    pub fn system() -> Self {
        Self {
            mode: Mode::Direct(system_resolver()),
            name: "hickory-system",
        }
    }

    /// Query a fixed set of recursive nameservers
    ///
    /// # Errors
    ///
    /// `Error::Config` if `addrs` is empty.
    pub fn with_nameservers(addrs: &[IpAddr]) -> Result<Self> {
        if addrs.is_empty() {
            return Err(Error::config(
                "Nameserver resolver needs at least one address",
            ));
        }
        Ok(Self {
            mode: Mode::Direct(nameserver_resolver(addrs)),
            name: "hickory-nameservers",
        })
    }

    /// Query the authoritative nameservers of the record's zone
    ///
    /// `bootstrap` servers are used to find the NS set; an empty list uses
    /// the system configuration.
    pub fn authoritative(bootstrap: &[IpAddr]) -> Self {
        let bootstrap = if bootstrap.is_empty() {
            system_resolver()
        } else {
            nameserver_resolver(bootstrap)
        };
        Self {
            mode: Mode::Authoritative { bootstrap },
            name: "hickory-authoritative",
        }
    }
}

/// Addresses of the nameservers authoritative for `fqdn`
async fn authoritative_addrs(bootstrap: &TokioResolver, fqdn: &str) -> Result<Vec<IpAddr>> {
    for zone in zone_candidates(fqdn) {
        let hosts: Vec<String> = match bootstrap.ns_lookup(zone.as_str()).await {
            Ok(response) => response.iter().map(|ns| ns.to_string()).collect(),
            Err(e) if is_empty_answer(&e) => continue,
            Err(e) => {
                return Err(Error::resolution(format!(
                    "NS lookup for {} failed: {}",
                    zone, e
                )));
            }
        };
        if hosts.is_empty() {
            continue;
        }

        tracing::trace!(zone = %zone, nameservers = ?hosts, "Found authoritative nameservers");

        let lookups = join_all(hosts.iter().map(|host| bootstrap.lookup_ip(host.as_str()))).await;
        let mut addrs: Vec<IpAddr> = lookups
            .into_iter()
            .filter_map(|lookup| lookup.ok())
            .flat_map(|ips| ips.iter().collect::<Vec<_>>())
            .collect();
        addrs.sort();
        addrs.dedup();

        if addrs.is_empty() {
            return Err(Error::resolution(format!(
                "No addresses for nameservers of {}",
                zone
            )));
        }
        return Ok(addrs);
    }

    Err(Error::resolution(format!("No zone found for {}", fqdn)))
}

/// Lookup TXT values at `fqdn`, joining multi-string records
async fn txt_values(resolver: &TokioResolver, fqdn: &str) -> Result<Vec<String>> {
    match resolver.txt_lookup(fqdn).await {
        Ok(response) => Ok(response
            .iter()
            .map(|txt| {
                txt.txt_data()
                    .iter()
                    .map(|data| String::from_utf8_lossy(data))
                    .collect::<String>()
            })
            .collect()),
        Err(e) if is_empty_answer(&e) => Ok(Vec::new()),
        Err(e) => Err(Error::resolution(format!(
            "TXT lookup for {} failed: {}",
            fqdn, e
        ))),
    }
}

#[async_trait]
impl TxtResolver for HickoryTxtResolver {
    async fn lookup_txt(&self, fqdn: &str) -> Result<Vec<String>> {
        match &self.mode {
            Mode::Direct(resolver) => txt_values(resolver, fqdn).await,
            Mode::Authoritative { bootstrap } => {
                let addrs = authoritative_addrs(bootstrap, fqdn).await?;
                txt_values(&nameserver_resolver(&addrs), fqdn).await
            }
        }
    }

    fn resolver_name(&self) -> &'static str {
        self.name
    }
}

/// Factory for creating hickory resolvers
pub struct HickoryResolverFactory;

impl TxtResolverFactory for HickoryResolverFactory {
    fn create(&self, config: &ResolverConfig) -> Result<Arc<dyn TxtResolver>> {
        let resolver = match config {
            ResolverConfig::System => HickoryTxtResolver::system(),
            ResolverConfig::Nameservers { addrs } => HickoryTxtResolver::with_nameservers(addrs)?,
            ResolverConfig::Authoritative { bootstrap } => {
                HickoryTxtResolver::authoritative(bootstrap)
            }
        };
        tracing::debug!(resolver = resolver.resolver_name(), "TXT resolver created");
        Ok(Arc::new(resolver))
    }
}

/// Register the hickory resolver for every resolver type
pub fn register(registry: &mut dns01_core::ProviderRegistry) {
    for name in ["system", "nameservers", "authoritative"] {
        registry.register_resolver(name, Box::new(HickoryResolverFactory));
    }
}
