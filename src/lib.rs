//! # EsoxSolutions.BoundedPool
//!
//! Bounded, blocking object pool for expensive-to-construct resources.
//!
//! ## Features
//!
//! - Hard cap on the number of objects ever constructed
//! - Lazy construction: objects are built on first shortage only
//! - `acquire` blocks while the pool is exhausted, `release` wakes one waiter
//! - Fallible constructors: a failed construction does not use up capacity
//! - Automatic return of objects via RAII (Drop trait)
//! - Health monitoring and metrics
//! - Prometheus metrics export
//!
//! ## Quick Start
//!
//! ```rust
//! use esox_boundedpool::BoundedPool;
//!
//! let pool = BoundedPool::new(4, || vec![0u8; 1024]).unwrap();
//! {
//!     let buffer = pool.get().unwrap();
//!     println!("Got buffer of {} bytes", buffer.len());
//!     // Buffer automatically returned when `buffer` goes out of scope
//! }
//!
//! let buffer = pool.acquire().unwrap();
//! pool.release(buffer);
//! assert_eq!(pool.constructed_count(), 1);
//! ```
//!
//! ## Lifetime contract
//!
//! Objects live as long as the pool. Every object acquired with
//! [`BoundedPool::acquire`] must go back through [`BoundedPool::release`] on
//! the same pool, exactly once. The pool trusts its callers here and does
//! not verify it.

mod config;
mod errors;
mod health;
mod metrics;
mod pool;

pub use config::PoolConfiguration;
pub use errors::{PoolError, PoolResult};
pub use health::HealthStatus;
#[cfg(feature = "metrics")]
pub use metrics::MetricsExporter;
pub use metrics::PoolMetrics;
pub use pool::{BoundedPool, PooledObject};
