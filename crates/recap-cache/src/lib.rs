//! Key-value stores for sessions, media summaries and subject history.
//!
//! This crate provides:
//! - A `KvStore` trait with Redis and in-memory implementations
//! - `CacheGateway`, which degrades store failures into misses/no-ops

pub mod config;
pub mod error;
pub mod gateway;
pub mod store;

pub use config::{CacheBackend, CacheConfig};
pub use error::{CacheError, CacheResult};
pub use gateway::CacheGateway;
pub use store::{KvStore, MemoryStore, RedisStore};
