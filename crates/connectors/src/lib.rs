//! Connections to registered data sources.
//!
//! - `pool`: one sqlx pool per engine kind behind [`EnginePool`]
//! - `manager`: the per-identity pool registry ([`PoolManager`])
//! - `rows`: driver rows to ordered JSON maps
//! - `backend`: the [`QueryBackend`] seam the executor talks to
pub mod backend;
pub mod manager;
pub mod pool;
pub mod rows;

pub use backend::QueryBackend;
pub use manager::PoolManager;
pub use pool::EnginePool;
pub use rows::{Row, Rows};
