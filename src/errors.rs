//! Error types for the bounded pool

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum PoolError {
    #[error("Pool capacity must be greater than zero")]
    InvalidCapacity,

    #[error("Pool is exhausted - no free objects and capacity reached")]
    PoolExhausted,

    #[error("Object construction failed: {0}")]
    Construction(#[source] Arc<dyn StdError + Send + Sync>),

    #[error("Metrics export failed: {0}")]
    MetricsExport(String),
}

impl PoolError {
    pub(crate) fn construction<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        PoolError::Construction(Arc::new(err))
    }

    /// Whether this error came from the constructor
    pub fn is_construction(&self) -> bool {
        matches!(self, PoolError::Construction(_))
    }
}

pub type PoolResult<T> = Result<T, PoolError>;
