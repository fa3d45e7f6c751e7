//! Metrics collection and export for bounded pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "metrics")]
use crate::errors::{PoolError, PoolResult};

/// Point-in-time metrics for a pool
///
/// # Examples
///
/// ```
/// use esox_boundedpool::BoundedPool;
///
/// let pool = BoundedPool::new(3, || String::new()).unwrap();
///
/// let item = pool.acquire().unwrap();
/// let metrics = pool.get_metrics();
/// assert_eq!(metrics.total_acquired, 1);
/// assert_eq!(metrics.outstanding, 1);
/// assert_eq!(metrics.constructed, 1);
/// pool.release(item);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "metrics", derive(serde::Serialize))]
pub struct PoolMetrics {
    /// Total successful acquires
    pub total_acquired: usize,

    /// Total releases
    pub total_released: usize,

    /// Total constructor invocations that succeeded
    pub total_constructed: usize,

    /// Constructor invocations that returned an error
    pub construction_failures: usize,

    /// Acquires that had to block before they could proceed
    pub wait_events: usize,

    /// Non-blocking acquires refused because the pool was exhausted
    pub exhausted_events: usize,

    /// Objects constructed so far (never decreases)
    pub constructed: usize,

    /// Objects on the free list
    pub available: usize,

    /// Objects currently held by callers
    pub outstanding: usize,

    /// Threads currently blocked in acquire
    pub waiting: usize,

    /// Pool utilization ratio (0.0 to 1.0), outstanding over capacity
    pub utilization: f64,

    /// Maximum pool capacity
    pub max_capacity: usize,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_acquired".to_string(), self.total_acquired.to_string());
        metrics.insert("total_released".to_string(), self.total_released.to_string());
        metrics.insert("total_constructed".to_string(), self.total_constructed.to_string());
        metrics.insert("construction_failures".to_string(), self.construction_failures.to_string());
        metrics.insert("wait_events".to_string(), self.wait_events.to_string());
        metrics.insert("exhausted_events".to_string(), self.exhausted_events.to_string());
        metrics.insert("constructed".to_string(), self.constructed.to_string());
        metrics.insert("available".to_string(), self.available.to_string());
        metrics.insert("outstanding".to_string(), self.outstanding.to_string());
        metrics.insert("waiting".to_string(), self.waiting.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        metrics.insert("max_capacity".to_string(), self.max_capacity.to_string());
        metrics
    }
}

/// Metrics exporter for Prometheus format
#[cfg(feature = "metrics")]
pub struct MetricsExporter;

#[cfg(feature = "metrics")]
impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_boundedpool::{BoundedPool, PoolConfiguration};
    /// use std::collections::HashMap;
    ///
    /// let config = PoolConfiguration::new().with_max_pool_size(2).with_name("my_pool");
    /// let pool = BoundedPool::with_config(config, || 0u8).unwrap();
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = pool.export_metrics_prometheus(Some(&tags)).unwrap();
    /// assert!(output.contains("boundedpool_objects_outstanding"));
    /// assert!(output.contains("service=\"api\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> PoolResult<String> {
        use prometheus::{Encoder, TextEncoder};

        let registry = prometheus::Registry::new();
        let labels = Self::format_labels(pool_name, tags);

        // Gauge metrics
        let gauges = [
            ("boundedpool_objects_constructed", "Objects constructed so far", metrics.constructed),
            ("boundedpool_objects_available", "Objects on the free list", metrics.available),
            ("boundedpool_objects_outstanding", "Objects held by callers", metrics.outstanding),
            ("boundedpool_waiters", "Threads blocked in acquire", metrics.waiting),
            ("boundedpool_capacity", "Maximum pool capacity", metrics.max_capacity),
        ];
        for (name, help, value) in gauges {
            let gauge = prometheus::IntGauge::with_opts(Self::opts(name, help, &labels))
                .map_err(Self::export_error)?;
            gauge.set(value as i64);
            registry.register(Box::new(gauge)).map_err(Self::export_error)?;
        }

        let utilization = prometheus::Gauge::with_opts(Self::opts(
            "boundedpool_utilization",
            "Pool utilization ratio",
            &labels,
        ))
        .map_err(Self::export_error)?;
        utilization.set(metrics.utilization);
        registry.register(Box::new(utilization)).map_err(Self::export_error)?;

        // Counter metrics
        let counters = [
            ("boundedpool_acquired_total", "Total objects acquired", metrics.total_acquired),
            ("boundedpool_released_total", "Total objects released", metrics.total_released),
            ("boundedpool_constructed_total", "Total successful constructions", metrics.total_constructed),
            ("boundedpool_construction_failures_total", "Failed constructions", metrics.construction_failures),
            ("boundedpool_wait_events_total", "Acquires that had to block", metrics.wait_events),
            ("boundedpool_exhausted_events_total", "Non-blocking acquires refused", metrics.exhausted_events),
        ];
        for (name, help, value) in counters {
            let counter = prometheus::IntCounter::with_opts(Self::opts(name, help, &labels))
                .map_err(Self::export_error)?;
            counter.inc_by(value as u64);
            registry.register(Box::new(counter)).map_err(Self::export_error)?;
        }

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .map_err(Self::export_error)?;

        String::from_utf8(buffer).map_err(|e| PoolError::MetricsExport(e.to_string()))
    }

    fn opts(name: &str, help: &str, labels: &HashMap<String, String>) -> prometheus::Opts {
        prometheus::Opts::new(name, help).const_labels(labels.clone())
    }

    fn format_labels(
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> HashMap<String, String> {
        let mut labels = HashMap::new();
        labels.insert("pool".to_string(), pool_name.to_string());

        if let Some(tags) = tags {
            for (key, value) in tags {
                labels.insert(key.clone(), value.clone());
            }
        }

        labels
    }

    fn export_error(err: prometheus::Error) -> PoolError {
        PoolError::MetricsExport(err.to_string())
    }
}

/// Internal metrics tracker
#[derive(Debug, Default)]
pub(crate) struct MetricsTracker {
    pub total_acquired: AtomicUsize,
    pub total_released: AtomicUsize,
    pub total_constructed: AtomicUsize,
    pub construction_failures: AtomicUsize,
    pub wait_events: AtomicUsize,
    pub exhausted_events: AtomicUsize,
}

/// Live gauges read under the pool lock
#[derive(Debug, Clone, Copy)]
pub(crate) struct Gauges {
    pub constructed: usize,
    pub available: usize,
    pub waiting: usize,
    pub capacity: usize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_metrics(&self, gauges: Gauges) -> PoolMetrics {
        let outstanding = gauges.constructed.saturating_sub(gauges.available);
        let utilization = if gauges.capacity > 0 {
            outstanding as f64 / gauges.capacity as f64
        } else {
            0.0
        };

        PoolMetrics {
            total_acquired: self.total_acquired.load(Ordering::Relaxed),
            total_released: self.total_released.load(Ordering::Relaxed),
            total_constructed: self.total_constructed.load(Ordering::Relaxed),
            construction_failures: self.construction_failures.load(Ordering::Relaxed),
            wait_events: self.wait_events.load(Ordering::Relaxed),
            exhausted_events: self.exhausted_events.load(Ordering::Relaxed),
            constructed: gauges.constructed,
            available: gauges.available,
            outstanding,
            waiting: gauges.waiting,
            utilization,
            max_capacity: gauges.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gauges(constructed: usize, available: usize) -> Gauges {
        Gauges {
            constructed,
            available,
            waiting: 0,
            capacity: 4,
        }
    }

    #[test]
    fn snapshot_derives_outstanding_and_utilization() {
        let tracker = MetricsTracker::new();
        MetricsTracker::record(&tracker.total_acquired);
        MetricsTracker::record(&tracker.total_acquired);

        let metrics = tracker.get_metrics(gauges(3, 1));
        assert_eq!(metrics.total_acquired, 2);
        assert_eq!(metrics.outstanding, 2);
        assert!((metrics.utilization - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn export_formats_utilization() {
        let metrics = MetricsTracker::new().get_metrics(gauges(4, 1));
        let exported = metrics.export();
        assert_eq!(exported["utilization"], "0.75");
        assert_eq!(exported["outstanding"], "3");
        assert_eq!(exported["max_capacity"], "4");
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn prometheus_export_includes_pool_label() {
        let metrics = MetricsTracker::new().get_metrics(gauges(2, 0));
        let output = MetricsExporter::export_prometheus(&metrics, "conns", None).unwrap();
        assert!(output.contains("# TYPE boundedpool_objects_outstanding gauge"));
        assert!(output.contains("boundedpool_objects_outstanding{pool=\"conns\"} 2"));
        assert!(output.contains("# TYPE boundedpool_acquired_total counter"));
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn prometheus_export_rejects_bad_label_names() {
        let metrics = MetricsTracker::new().get_metrics(gauges(0, 0));
        let mut tags = HashMap::new();
        tags.insert("bad label".to_string(), "x".to_string());

        let result = MetricsExporter::export_prometheus(&metrics, "conns", Some(&tags));
        assert!(matches!(result, Err(PoolError::MetricsExport(_))));
    }
}
