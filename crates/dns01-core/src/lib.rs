// # dns01-core
//
// Core library for ACME DNS-01 challenge orchestration.
//
// ## Architecture Overview
//
// This library provides the provider-agnostic half of a DNS-01 solver:
// - **compute_record**: Derives the `_acme-challenge` TXT record for a challenge
// - **DnsProvider**: Trait for creating/deleting records via vendor APIs
// - **TxtResolver**: Trait for observing published TXT values in DNS
// - **PropagationWaiter**: Polls DNS until the record is visible, bounded by a policy
// - **ChallengeOrchestrator**: Drives create → wait → clean up for each challenge
// - **ProviderRegistry**: Plugin-based registry for providers and resolvers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Vendor specifics live in provider crates
// 2. **Plugin-Based**: Providers are registered dynamically, no hard-coded if-else
// 3. **Library-First**: The ACME layer embeds the orchestrator directly
// 4. **No Shared Mutable State**: Each challenge is an independent future
// 5. **Never Leak Records**: Cleanup is attempted on every exit path that may have created one

pub mod challenge;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod propagation;
pub mod registry;
pub mod traits;

// Re-export core types for convenience
pub use challenge::{Challenge, DnsRecord, RecordType, compute_record};
pub use config::{Dns01Config, OrchestratorConfig, ProviderConfig, ResolverConfig};
pub use error::{Error, Result};
pub use orchestrator::{ChallengeOrchestrator, ChallengeSession, ChallengeState, OrchestratorEvent};
pub use propagation::{PropagationPolicy, PropagationReport, PropagationWaiter};
pub use registry::ProviderRegistry;
pub use traits::{Dns01Solver, DnsProvider, TxtResolver};
