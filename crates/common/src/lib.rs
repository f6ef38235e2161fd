//! Shared building blocks for the sluice crates.
//!
//! - **Configuration**: strongly typed application and data source configuration (`config`).
//! - **Data model**: data source descriptors and engine kinds (`models`).
//! - **Dialects**: per-engine connection strings and DDL (`dialect`).
//! - **Resilience**: retry policy with deadlines (`retry`).
//! - **Telemetry**: tracing setup (`telemetry`) and log sanitization (`scrubber`).
pub mod config;
pub mod dialect;
pub mod models;
pub mod retry;
pub mod scrubber;
pub mod telemetry;

pub use dialect::EngineDialect;
pub use models::{DataSourceDescriptor, EngineKind, SourceId};
pub use retry::{retry_with_policy, RetryPolicy};
