//! Bounded, blocking object pool

use crate::config::PoolConfiguration;
use crate::errors::{PoolError, PoolResult};
use crate::health::HealthStatus;
use crate::metrics::{Gauges, MetricsTracker, PoolMetrics};

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::ops::{Deref, DerefMut};
use tracing::{debug, info, trace, warn};

#[cfg(feature = "metrics")]
use crate::metrics::MetricsExporter;

type Constructor<T> = Box<dyn Fn() -> PoolResult<T> + Send + Sync>;

/// A pooled object that automatically returns to the pool when dropped
pub struct PooledObject<'a, T> {
    value: Option<T>,
    pool: &'a BoundedPool<T>,
}

impl<'a, T> PooledObject<'a, T> {
    fn new(value: T, pool: &'a BoundedPool<T>) -> Self {
        Self {
            value: Some(value),
            pool,
        }
    }

    /// Detach the inner value without returning it to the pool.
    ///
    /// The object stays outstanding: hand it back with
    /// [`BoundedPool::release`] or its capacity slot is gone for good.
    pub fn into_inner(mut self) -> T {
        self.value.take().expect("Value already taken")
    }
}

impl<T> Deref for PooledObject<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value.as_ref().expect("Value already taken")
    }
}

impl<T> DerefMut for PooledObject<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.value.as_mut().expect("Value already taken")
    }
}

impl<T> Drop for PooledObject<'_, T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            self.pool.release(value);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PooledObject<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledObject")
            .field("value", &self.value)
            .finish()
    }
}

/// Mutable pool state, only ever touched under the pool mutex.
struct PoolState<T> {
    /// Successful constructor invocations. Never decreases.
    constructed: usize,
    /// Slots claimed by constructions still in flight.
    reserved: usize,
    free: Vec<T>,
    waiting: usize,
}

impl<T> PoolState<T> {
    fn can_claim(&self, max: usize) -> bool {
        !self.free.is_empty() || self.constructed + self.reserved < max
    }

    /// Caller must have checked `can_claim`.
    fn claim(&mut self) -> Claim<T> {
        match self.free.pop() {
            Some(item) => Claim::Free(item),
            None => {
                self.reserved += 1;
                Claim::Construct
            }
        }
    }
}

enum Claim<T> {
    Free(T),
    Construct,
}

/// A capacity slot held while the constructor runs outside the lock.
///
/// Dropping it without `commit` hands the slot back, so a failing or
/// panicking constructor never costs the pool capacity.
struct Reservation<'a, T> {
    pool: &'a BoundedPool<T>,
    committed: bool,
}

impl<T> Reservation<'_, T> {
    fn commit(mut self) -> usize {
        self.committed = true;
        let mut state = self.pool.state.lock();
        state.reserved -= 1;
        state.constructed += 1;
        state.constructed
    }
}

impl<T> Drop for Reservation<'_, T> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        self.pool.state.lock().reserved -= 1;
        self.pool.available.notify_one();
        debug!(pool = %self.pool.name, "Rolled back construction slot");
    }
}

/// Pool that constructs at most `max` objects, lazily, and blocks
/// acquirers once all of them are outstanding.
///
/// Objects are never destroyed by the pool: once built, an object lives
/// until the pool itself is dropped. The pool does not check that a
/// released object came from it. Releasing foreign objects or releasing
/// the same object twice breaks the capacity accounting.
///
/// # Examples
///
/// ```
/// use esox_boundedpool::BoundedPool;
///
/// let pool = BoundedPool::new(2, || Vec::<u8>::with_capacity(4096)).unwrap();
///
/// let buffer = pool.acquire().unwrap();
/// pool.release(buffer);
///
/// {
///     let mut buffer = pool.get().unwrap();
///     buffer.push(1);
///     // Returned to the pool when `buffer` goes out of scope
/// }
///
/// assert_eq!(pool.constructed_count(), 1);
/// ```
pub struct BoundedPool<T> {
    max: usize,
    name: String,
    constructor: Constructor<T>,
    state: Mutex<PoolState<T>>,
    available: Condvar,
    metrics: MetricsTracker,
}

impl<T> BoundedPool<T> {
    /// Create a pool of at most `max` objects built by `constructor`.
    ///
    /// Fails with [`PoolError::InvalidCapacity`] when `max` is zero.
    pub fn new<F>(max: usize, constructor: F) -> PoolResult<Self>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_config(
            PoolConfiguration::new().with_max_pool_size(max),
            constructor,
        )
    }

    /// Create a pool from a configuration and an infallible constructor
    pub fn with_config<F>(config: PoolConfiguration, constructor: F) -> PoolResult<Self>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::build(config, Box::new(move || Ok::<T, PoolError>(constructor())))
    }

    /// Create a pool whose constructor may fail.
    ///
    /// A failed construction is reported by the [`acquire`](Self::acquire)
    /// call that triggered it and does not use up capacity.
    pub fn try_new<F, E>(config: PoolConfiguration, constructor: F) -> PoolResult<Self>
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: StdError + Send + Sync + 'static,
    {
        Self::build(
            config,
            Box::new(move || constructor().map_err(PoolError::construction)),
        )
    }

    fn build(config: PoolConfiguration, constructor: Constructor<T>) -> PoolResult<Self> {
        config.validate()?;

        info!(pool = %config.name, max = config.max_pool_size, "Created bounded pool");

        Ok(Self {
            max: config.max_pool_size,
            state: Mutex::new(PoolState {
                constructed: 0,
                reserved: 0,
                free: Vec::with_capacity(config.max_pool_size),
                waiting: 0,
            }),
            name: config.name,
            constructor,
            available: Condvar::new(),
            metrics: MetricsTracker::new(),
        })
    }

    /// Get an object from the pool, blocking while none is free and the
    /// pool is at capacity.
    ///
    /// Only fails when a new object had to be built and the constructor
    /// returned an error. There is no timeout: if nobody ever releases,
    /// this never returns.
    pub fn acquire(&self) -> PoolResult<T> {
        let claim = {
            let mut state = self.state.lock();
            if !state.can_claim(self.max) {
                state.waiting += 1;
                MetricsTracker::record(&self.metrics.wait_events);
                debug!(pool = %self.name, waiting = state.waiting, "Pool exhausted, waiting");

                while !state.can_claim(self.max) {
                    self.available.wait(&mut state);
                }
                state.waiting -= 1;
            }
            state.claim()
        };

        self.fulfil(claim)
    }

    /// Get an object without blocking.
    ///
    /// Returns [`PoolError::PoolExhausted`] where [`acquire`](Self::acquire)
    /// would wait.
    pub fn try_acquire(&self) -> PoolResult<T> {
        let claim = {
            let mut state = self.state.lock();
            if !state.can_claim(self.max) {
                MetricsTracker::record(&self.metrics.exhausted_events);
                return Err(PoolError::PoolExhausted);
            }
            state.claim()
        };

        self.fulfil(claim)
    }

    /// Blocking acquire wrapped in a guard that releases on drop
    pub fn get(&self) -> PoolResult<PooledObject<'_, T>> {
        self.acquire().map(|item| PooledObject::new(item, self))
    }

    /// Non-blocking acquire wrapped in a guard that releases on drop
    pub fn try_get(&self) -> Option<PooledObject<'_, T>> {
        self.try_acquire().ok().map(|item| PooledObject::new(item, self))
    }

    /// Return an object to the pool, waking at most one blocked acquirer.
    ///
    /// `item` must have come from this pool and must not be released twice.
    pub fn release(&self, item: T) {
        self.push_free(item);
        MetricsTracker::record(&self.metrics.total_released);
        trace!(pool = %self.name, "Released object");
    }

    /// Build up to `count` objects ahead of demand, bounded by the
    /// remaining capacity. Returns how many were built.
    pub fn warmup(&self, count: usize) -> PoolResult<usize> {
        let mut built = 0;
        while built < count {
            {
                let mut state = self.state.lock();
                if state.constructed + state.reserved >= self.max {
                    break;
                }
                state.reserved += 1;
            }
            let item = self.construct()?;
            self.push_free(item);
            built += 1;
        }

        debug!(pool = %self.name, built, "Warmed up pool");
        Ok(built)
    }

    fn fulfil(&self, claim: Claim<T>) -> PoolResult<T> {
        let item = match claim {
            Claim::Free(item) => {
                trace!(pool = %self.name, "Acquired object from free list");
                item
            }
            Claim::Construct => self.construct()?,
        };

        MetricsTracker::record(&self.metrics.total_acquired);
        Ok(item)
    }

    /// Caller must already hold a reserved slot.
    fn construct(&self) -> PoolResult<T> {
        let reservation = Reservation {
            pool: self,
            committed: false,
        };

        match (self.constructor)() {
            Ok(item) => {
                let constructed = reservation.commit();
                MetricsTracker::record(&self.metrics.total_constructed);
                debug!(pool = %self.name, constructed, max = self.max, "Constructed new object");
                Ok(item)
            }
            Err(err) => {
                drop(reservation);
                MetricsTracker::record(&self.metrics.construction_failures);
                warn!(pool = %self.name, error = %err, "Object construction failed");
                Err(err)
            }
        }
    }

    fn push_free(&self, item: T) {
        self.state.lock().free.push(item);
        self.available.notify_one();
    }

    /// Maximum number of objects this pool will construct
    pub fn max_size(&self) -> usize {
        self.max
    }

    /// Pool name from its configuration
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Objects constructed so far
    pub fn constructed_count(&self) -> usize {
        self.state.lock().constructed
    }

    /// Objects on the free list
    pub fn available_count(&self) -> usize {
        self.state.lock().free.len()
    }

    /// Objects currently held by callers
    pub fn outstanding_count(&self) -> usize {
        let state = self.state.lock();
        state.constructed.saturating_sub(state.free.len())
    }

    /// Threads currently blocked in [`acquire`](Self::acquire)
    pub fn waiting_count(&self) -> usize {
        self.state.lock().waiting
    }

    /// Get pool metrics
    pub fn get_metrics(&self) -> PoolMetrics {
        let gauges = {
            let state = self.state.lock();
            Gauges {
                constructed: state.constructed,
                available: state.free.len(),
                waiting: state.waiting,
                capacity: self.max,
            }
        };
        self.metrics.get_metrics(gauges)
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }

    /// Export metrics in Prometheus format, labelled with the pool name
    #[cfg(feature = "metrics")]
    pub fn export_metrics_prometheus(
        &self,
        tags: Option<&HashMap<String, String>>,
    ) -> PoolResult<String> {
        MetricsExporter::export_prometheus(&self.get_metrics(), &self.name, tags)
    }

    /// Get health status
    pub fn get_health_status(&self) -> HealthStatus {
        HealthStatus::from_metrics(&self.get_metrics())
    }
}

impl<T> fmt::Debug for BoundedPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BoundedPool")
            .field("name", &self.name)
            .field("max", &self.max)
            .field("constructed", &state.constructed)
            .field("available", &state.free.len())
            .field("waiting", &state.waiting)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn counting_pool(max: usize) -> (BoundedPool<usize>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let pool = BoundedPool::new(max, move || counter.fetch_add(1, Ordering::SeqCst)).unwrap();
        (pool, calls)
    }

    #[test]
    fn creation_is_lazy() {
        let (pool, calls) = counting_pool(4);

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(pool.constructed_count(), 0);
        assert_eq!(pool.available_count(), 0);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let result = BoundedPool::new(0, String::new);
        assert!(matches!(result, Err(PoolError::InvalidCapacity)));
    }

    #[test]
    fn acquire_release_reuses_single_object() {
        let (pool, calls) = counting_pool(1);

        let item = pool.acquire().unwrap();
        pool.release(item);
        let item = pool.acquire().unwrap();
        pool.release(item);

        assert_eq!(pool.constructed_count(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(pool.available_count(), 1);
    }

    #[test]
    fn try_acquire_reports_exhaustion() {
        let (pool, _) = counting_pool(2);

        let first = pool.try_acquire().unwrap();
        let second = pool.try_acquire().unwrap();
        assert!(matches!(pool.try_acquire(), Err(PoolError::PoolExhausted)));
        assert_eq!(pool.outstanding_count(), 2);

        pool.release(first);
        let third = pool.try_acquire().unwrap();
        assert_eq!(pool.constructed_count(), 2);

        pool.release(second);
        pool.release(third);
        assert_eq!(pool.get_metrics().exhausted_events, 1);
    }

    #[test]
    fn guard_returns_object_on_drop() {
        let (pool, _) = counting_pool(1);

        {
            let guard = pool.get().unwrap();
            assert_eq!(*guard, 0);
            assert!(pool.try_get().is_none());
        }

        assert_eq!(pool.available_count(), 1);
        assert!(pool.try_get().is_some());
    }

    #[test]
    fn guard_derefs_mutably() {
        let pool = BoundedPool::new(1, Vec::<u32>::new).unwrap();

        pool.get().unwrap().push(7);

        let item = pool.acquire().unwrap();
        assert_eq!(item, vec![7]);
        pool.release(item);
    }

    #[test]
    fn into_inner_keeps_object_outstanding() {
        let (pool, _) = counting_pool(1);

        let item = pool.get().unwrap().into_inner();
        assert_eq!(pool.outstanding_count(), 1);
        assert!(pool.try_get().is_none());

        pool.release(item);
        assert_eq!(pool.outstanding_count(), 0);
    }

    #[test]
    fn warmup_is_bounded_by_capacity() {
        let (pool, calls) = counting_pool(3);

        assert_eq!(pool.warmup(10).unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(pool.available_count(), 3);

        // Nothing left to build
        assert_eq!(pool.warmup(1).unwrap(), 0);
        let item = pool.acquire().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        pool.release(item);
    }

    #[test]
    fn failed_construction_does_not_consume_capacity() {
        let fail = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&fail);
        let config = PoolConfiguration::new().with_max_pool_size(1);
        let pool = BoundedPool::try_new(config, move || {
            if flag.load(Ordering::SeqCst) {
                Err(io::Error::other("backend down"))
            } else {
                Ok(42)
            }
        })
        .unwrap();

        let err = pool.acquire().unwrap_err();
        assert!(err.is_construction());
        assert_eq!(pool.constructed_count(), 0);

        fail.store(false, Ordering::SeqCst);
        assert_eq!(pool.acquire().unwrap(), 42);
        assert_eq!(pool.constructed_count(), 1);

        let metrics = pool.get_metrics();
        assert_eq!(metrics.construction_failures, 1);
        assert_eq!(metrics.total_acquired, 1);
    }

    #[test]
    fn panicking_constructor_rolls_back_slot() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let pool = BoundedPool::new(1, move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first construction blows up");
            }
            "ok"
        })
        .unwrap();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| pool.acquire()));
        assert!(outcome.is_err());
        assert_eq!(pool.constructed_count(), 0);

        assert_eq!(pool.try_acquire().unwrap(), "ok");
        assert_eq!(pool.constructed_count(), 1);
    }

    #[test]
    fn metrics_track_acquire_and_release() {
        let (pool, _) = counting_pool(2);

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        pool.release(a);

        let metrics = pool.get_metrics();
        assert_eq!(metrics.total_acquired, 2);
        assert_eq!(metrics.total_released, 1);
        assert_eq!(metrics.total_constructed, 2);
        assert_eq!(metrics.outstanding, 1);
        assert_eq!(metrics.available, 1);
        assert_eq!(metrics.wait_events, 0);

        pool.release(b);
        assert_eq!(pool.export_metrics()["outstanding"], "0");
    }

    #[test]
    fn debug_shows_counts() {
        let config = PoolConfiguration::new().with_max_pool_size(2).with_name("buffers");
        let pool = BoundedPool::with_config(config, || 0u8).unwrap();
        let item = pool.acquire().unwrap();

        let output = format!("{pool:?}");
        assert!(output.contains("name: \"buffers\""));
        assert!(output.contains("constructed: 1"));
        pool.release(item);
    }
}
