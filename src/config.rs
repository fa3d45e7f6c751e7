//! Pool configuration options

use crate::errors::{PoolError, PoolResult};

/// Configuration for a bounded pool
///
/// # Examples
///
/// ```
/// use esox_boundedpool::PoolConfiguration;
///
/// let config = PoolConfiguration::new()
///     .with_max_pool_size(8)
///     .with_name("db_connections");
///
/// assert_eq!(config.max_pool_size, 8);
/// assert_eq!(config.name, "db_connections");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfiguration {
    /// Hard cap on the number of objects the pool will ever construct
    pub max_pool_size: usize,

    /// Name used in log events and as the `pool` metrics label
    pub name: String,
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            max_pool_size: 16,
            name: "bounded_pool".to_string(),
        }
    }
}

impl PoolConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum pool size
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_boundedpool::PoolConfiguration;
    ///
    /// let config = PoolConfiguration::new().with_max_pool_size(50);
    ///
    /// assert_eq!(config.max_pool_size, 50);
    /// ```
    pub fn with_max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }

    /// Set the pool name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Check the configuration before a pool is built from it
    pub fn validate(&self) -> PoolResult<()> {
        if self.max_pool_size == 0 {
            return Err(PoolError::InvalidCapacity);
        }
        Ok(())
    }
}
