//! Query execution runtime for sluice.
//!
//! - `cache`: the adaptive result cache ([`AdaptiveCache`])
//! - `ttl`: TTL selection by query shape and time of day ([`TtlPolicy`])
//! - `executor`: the resilient executor ([`QueryExecutor`])
//! - `stats`: execution counters ([`ExecutionStats`])
pub mod cache;
pub mod executor;
pub mod stats;
pub mod ttl;

pub use cache::{AdaptiveCache, CacheKey};
pub use executor::{ExecuteOptions, FlushScope, QueryExecutor, QueryOutcome};
pub use stats::ExecutionStats;
pub use ttl::TtlPolicy;
