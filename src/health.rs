//! Health monitoring for bounded pools

use crate::metrics::PoolMetrics;

/// Health status of a bounded pool
///
/// # Examples
///
/// ```
/// use esox_boundedpool::BoundedPool;
///
/// let pool = BoundedPool::new(3, || vec![0u8; 64]).unwrap();
///
/// let health = pool.get_health_status();
/// assert!(health.is_healthy());
/// assert_eq!(health.outstanding_objects, 0);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "metrics", derive(serde::Serialize))]
pub struct HealthStatus {
    /// Whether the pool is healthy
    pub is_healthy: bool,

    /// Number of warnings detected
    pub warning_count: usize,

    /// Current pool utilization (0.0 to 1.0)
    pub utilization: f64,

    /// Free objects count
    pub available_objects: usize,

    /// Outstanding objects count
    pub outstanding_objects: usize,

    /// Threads blocked in acquire
    pub waiting_threads: usize,

    /// Total capacity
    pub total_capacity: usize,

    /// Warning messages
    pub warnings: Vec<String>,
}

impl HealthStatus {
    /// Derive a health status from a metrics snapshot
    pub fn from_metrics(metrics: &PoolMetrics) -> Self {
        let mut warnings = Vec::new();
        let mut is_healthy = true;

        // Saturated with callers queueing behind it
        if metrics.utilization > 0.9 && metrics.waiting > 0 {
            warnings.push(format!(
                "High utilization: {:.1}% with {} waiting",
                metrics.utilization * 100.0,
                metrics.waiting
            ));
            is_healthy = false;
        }

        if metrics.available == 0 && metrics.constructed == metrics.max_capacity {
            warnings.push("Pool is exhausted".to_string());
        }

        if metrics.construction_failures > 0 {
            warnings.push(format!(
                "{} object construction(s) failed",
                metrics.construction_failures
            ));
        }

        Self {
            is_healthy,
            warning_count: warnings.len(),
            utilization: metrics.utilization,
            available_objects: metrics.available,
            outstanding_objects: metrics.outstanding,
            waiting_threads: metrics.waiting,
            total_capacity: metrics.max_capacity,
            warnings,
        }
    }

    /// Check if the pool is healthy
    pub fn is_healthy(&self) -> bool {
        self.is_healthy
    }
}
