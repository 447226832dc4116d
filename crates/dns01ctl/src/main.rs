// # dns01ctl - DNS-01 challenge tool
//
// This binary is a THIN integration layer:
// - DO NOT add challenge, DNS or retry logic here
// - All DNS-01 logic MUST be in dns01-core and the provider/resolver crates
//
// dns01ctl is responsible for:
// 1. Reading configuration from flags and environment variables
// 2. Initializing logging and the runtime
// 3. Registering providers and resolvers
// 4. Driving the ChallengeOrchestrator for one command
//
// ## Configuration
//
// ### DNS Provider
// - `DNS01_PROVIDER`: Provider type (dreamhost)
// - `DREAMHOST_API_KEY`: DreamHost API key
// - `DREAMHOST_API_URL`: API endpoint override
// - `DNS01_DRY_RUN`: Log provider requests instead of sending them
//
// ### Propagation checks
// - `DNS01_NAMESERVERS`: Comma-separated resolver IPs (default: system)
// - `DNS01_AUTHORITATIVE`: Query the zone's authoritative nameservers
// - `DNS01_PROPAGATION_TIMEOUT_SECS`: Override the provider's timeout
// - `DNS01_POLL_INTERVAL_SECS`: Override the provider's poll interval
// - `DNS01_PROVIDER_TIMEOUT_SECS`: Bound for each provider call
//
// ### Logging
// - `DNS01_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export DREAMHOST_API_KEY=your_key
//
// dns01ctl present example.com "$KEY_AUTH"
// # ... ACME validation ...
// dns01ctl cleanup example.com "$KEY_AUTH"
//
// # Publish several records and keep them until SIGINT/SIGTERM
// dns01ctl hold example.com="$KEY_AUTH_1" '*.example.com'="$KEY_AUTH_2"
// ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dns01_core::{
    Challenge, ChallengeOrchestrator, Dns01Config, OrchestratorConfig, OrchestratorEvent,
    ProviderConfig, ProviderRegistry, ResolverConfig, compute_record,
};
use std::net::IpAddr;
use std::process::ExitCode;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// - 0: Success
/// - 1: Configuration or startup error
/// - 2: Runtime error (provider rejection, propagation timeout, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dns01ExitCode {
    /// Command completed
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// The challenge could not be completed
    RuntimeError = 2,
}

impl From<Dns01ExitCode> for ExitCode {
    fn from(code: Dns01ExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Command-line arguments
///
/// No `Debug` derive: the API key must never be printed.
#[derive(Parser)]
#[command(
    name = "dns01ctl",
    author,
    version,
    about = "Publish and remove ACME DNS-01 challenge records"
)]
struct Cli {
    /// DNS provider type
    #[arg(long, env = "DNS01_PROVIDER", default_value = "dreamhost", global = true)]
    provider: String,

    /// DreamHost API key
    #[arg(long, env = "DREAMHOST_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// DreamHost API endpoint override
    #[arg(long, env = "DREAMHOST_API_URL", global = true)]
    api_url: Option<String>,

    /// Log provider requests instead of sending them
    #[arg(long, env = "DNS01_DRY_RUN", global = true)]
    dry_run: bool,

    /// Recursive resolvers for propagation checks (comma-separated IPs)
    #[arg(long, env = "DNS01_NAMESERVERS", value_delimiter = ',', global = true)]
    nameservers: Vec<IpAddr>,

    /// Check the zone's authoritative nameservers instead of recursive resolvers
    #[arg(long, env = "DNS01_AUTHORITATIVE", global = true)]
    authoritative: bool,

    /// Override the provider's propagation timeout (seconds)
    #[arg(long, env = "DNS01_PROPAGATION_TIMEOUT_SECS", global = true)]
    propagation_timeout_secs: Option<u64>,

    /// Override the provider's poll interval (seconds)
    #[arg(long, env = "DNS01_POLL_INTERVAL_SECS", global = true)]
    poll_interval_secs: Option<u64>,

    /// Upper bound for each provider API call (seconds)
    #[arg(long, env = "DNS01_PROVIDER_TIMEOUT_SECS", default_value_t = 30, global = true)]
    provider_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DNS01_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the record name and value for a challenge
    Record(ChallengeArgs),
    /// Publish a challenge record and wait until it is visible
    Present(ChallengeArgs),
    /// Remove a challenge record
    Cleanup(ChallengeArgs),
    /// Print the provider's propagation timeout and poll interval
    Timeout,
    /// Publish several records, keep them until SIGINT/SIGTERM, then remove them
    Hold {
        /// Challenges as DOMAIN=KEY_AUTHORIZATION
        #[arg(required = true, value_parser = parse_challenge)]
        challenges: Vec<Challenge>,
    },
}

#[derive(Args, Debug)]
struct ChallengeArgs {
    /// Domain being validated (e.g. example.com or *.example.com)
    domain: String,

    /// Key authorization (token.thumbprint)
    key_auth: String,

    /// Challenge token
    #[arg(long, default_value = "")]
    token: String,
}

impl ChallengeArgs {
    fn challenge(&self) -> Challenge {
        Challenge::new(&self.domain, &self.token, &self.key_auth)
    }
}

/// Parse `DOMAIN=KEY_AUTHORIZATION`
///
/// Splits on the first `=`; key authorizations may contain more.
fn parse_challenge(raw: &str) -> std::result::Result<Challenge, String> {
    match raw.split_once('=') {
        Some((domain, key_auth)) if !domain.is_empty() && !key_auth.is_empty() => {
            Ok(Challenge::new(domain, "", key_auth))
        }
        _ => Err(format!("expected DOMAIN=KEY_AUTHORIZATION, got '{}'", raw)),
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "DNS01_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

impl Cli {
    /// Build and validate the library configuration
    fn to_config(&self) -> Result<Dns01Config> {
        let provider = match self.provider.as_str() {
            "dreamhost" => ProviderConfig::Dreamhost {
                api_key: self.api_key.clone().unwrap_or_default(),
                base_url: self.api_url.clone(),
                dry_run: self.dry_run,
            },
            other => anyhow::bail!(
                "DNS01_PROVIDER '{}' is not supported. Supported providers: dreamhost",
                other
            ),
        };

        let resolver = if self.authoritative {
            ResolverConfig::Authoritative {
                bootstrap: self.nameservers.clone(),
            }
        } else if self.nameservers.is_empty() {
            ResolverConfig::System
        } else {
            ResolverConfig::Nameservers {
                addrs: self.nameservers.clone(),
            }
        };

        let config = Dns01Config {
            provider,
            resolver,
            orchestrator: OrchestratorConfig {
                provider_timeout_secs: self.provider_timeout_secs,
                propagation_timeout_secs: self.propagation_timeout_secs,
                poll_interval_secs: self.poll_interval_secs,
                ..OrchestratorConfig::default()
            },
        };

        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match parse_log_level(&cli.log_level) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return Dns01ExitCode::ConfigError.into();
        }
    };

    // stdout carries command output; logs go to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return Dns01ExitCode::ConfigError.into();
    }

    // Pure computation, no provider needed
    if let Command::Record(args) = &cli.command {
        return match compute_record(&args.domain, &args.key_auth) {
            Ok(record) => {
                println!("{} {} {}", record.fqdn, record.record_type, record.value);
                Dns01ExitCode::Success.into()
            }
            Err(e) => {
                error!("{}", e);
                Dns01ExitCode::RuntimeError.into()
            }
        };
    }

    let config = match cli.to_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration validation error: {:#}", e);
            return Dns01ExitCode::ConfigError.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return Dns01ExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run(cli.command, config)).into()
}

/// Set up the orchestrator and execute one command
async fn run(command: Command, config: Dns01Config) -> Dns01ExitCode {
    let orchestrator = match build_orchestrator(config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            error!("Startup error: {:#}", e);
            return Dns01ExitCode::ConfigError;
        }
    };

    // SIGINT/SIGTERM abort in-flight work; cleanup still runs
    let cancel = orchestrator.cancellation_token();
    tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => {
                warn!("Received {}, aborting", signal);
                cancel.cancel();
            }
            Err(e) => error!("Signal handling error: {}", e),
        }
    });

    match execute(&orchestrator, command).await {
        Ok(()) => Dns01ExitCode::Success,
        Err(e) => {
            error!("{:#}", e);
            Dns01ExitCode::RuntimeError
        }
    }
}

fn build_orchestrator(config: Dns01Config) -> Result<ChallengeOrchestrator> {
    let mut registry = ProviderRegistry::new();

    #[cfg(feature = "dreamhost")]
    {
        debug!("Registering DreamHost provider");
        dns01_provider_dreamhost::register(&mut registry);
    }
    dns01_resolver_hickory::register(&mut registry);

    let provider = registry
        .create_provider(&config.provider)
        .context("Failed to create DNS provider")?;
    let resolver = registry
        .create_resolver(&config.resolver)
        .context("Failed to create TXT resolver")?;

    info!(
        provider = provider.provider_name(),
        resolver = resolver.resolver_name(),
        "Components created"
    );

    let (orchestrator, mut events) =
        ChallengeOrchestrator::new(provider, resolver, config.orchestrator)
            .context("Failed to create orchestrator")?;

    // Ends when the orchestrator (the only sender) is dropped
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(&event);
        }
    });

    Ok(orchestrator)
}

fn log_event(event: &OrchestratorEvent) {
    match event {
        OrchestratorEvent::RecordCreated { fqdn } => debug!(fqdn = %fqdn, "Record created"),
        OrchestratorEvent::PropagationConfirmed {
            fqdn,
            attempts,
            elapsed,
        } => debug!(fqdn = %fqdn, attempts, elapsed = ?elapsed, "Propagation confirmed"),
        OrchestratorEvent::ChallengeFailed { fqdn, error } => {
            debug!(fqdn = %fqdn, error = %error, "Challenge failed")
        }
        OrchestratorEvent::CleanedUp { fqdn } => debug!(fqdn = %fqdn, "Record removed"),
        OrchestratorEvent::CleanupFailed { fqdn, error } => {
            warn!(fqdn = %fqdn, error = %error, "Record may be left behind")
        }
    }
}

async fn execute(orchestrator: &ChallengeOrchestrator, command: Command) -> Result<()> {
    match command {
        // Handled before the runtime starts
        Command::Record(_) => Ok(()),

        Command::Present(args) => {
            let challenge = args.challenge();
            orchestrator
                .present(&challenge.domain, &challenge.token, &challenge.key_authorization)
                .await
                .with_context(|| format!("Failed to present challenge for {}", challenge.domain))?;
            info!("Challenge record for {} is live", challenge.domain);
            Ok(())
        }

        Command::Cleanup(args) => {
            let challenge = args.challenge();
            orchestrator
                .clean_up(&challenge.domain, &challenge.token, &challenge.key_authorization)
                .await
                .with_context(|| format!("Failed to clean up challenge for {}", challenge.domain))?;
            Ok(())
        }

        Command::Timeout => {
            let (timeout, interval) = orchestrator.timeout();
            println!("timeout={}s interval={}s", timeout.as_secs(), interval.as_secs());
            Ok(())
        }

        Command::Hold { challenges } => hold(orchestrator, &challenges).await,
    }
}

/// Present every challenge, wait for a shutdown signal, then clean up
async fn hold(orchestrator: &ChallengeOrchestrator, challenges: &[Challenge]) -> Result<()> {
    let results = orchestrator.present_all(challenges).await;
    let failed = results.iter().filter(|r| r.is_err()).count();

    for (challenge, result) in challenges.iter().zip(&results) {
        match result {
            Ok(()) => {
                let record = challenge.record()?;
                println!("{} {} {}", record.fqdn, record.record_type, record.value);
            }
            Err(e) => error!("Challenge for {} failed: {}", challenge.domain, e),
        }
    }

    if failed == 0 {
        info!(
            "{} record(s) live, waiting for SIGINT/SIGTERM",
            challenges.len()
        );
        orchestrator.cancellation_token().cancelled().await;
    }

    let cleanup_failures = orchestrator
        .clean_up_all(challenges)
        .await
        .iter()
        .filter(|r| r.is_err())
        .count();

    if failed > 0 {
        anyhow::bail!("{} of {} challenge(s) failed", failed, challenges.len());
    }
    if cleanup_failures > 0 {
        anyhow::bail!("{} record(s) could not be removed", cleanup_failures);
    }
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let received = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(received)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
