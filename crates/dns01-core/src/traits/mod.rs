//! Core traits for DNS-01 orchestration
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`DnsProvider`]: Create and delete challenge records via vendor APIs
//! - [`TxtResolver`]: Observe published TXT values in DNS
//! - [`Dns01Solver`]: The inbound contract offered to the ACME layer

pub mod dns_provider;
pub mod solver;
pub mod txt_resolver;

pub use dns_provider::{DnsProvider, DnsProviderFactory};
pub use solver::Dns01Solver;
pub use txt_resolver::{TxtResolver, TxtResolverFactory};
