//! Basic usage examples for BoundedPool

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use esox_boundedpool::{BoundedPool, PoolConfiguration, PoolError};

fn main() {
    println!("=== EsoxSolutions.BoundedPool - Basic Examples ===\n");

    // Example 1: Acquire and release by hand
    acquire_release();

    // Example 2: RAII guards
    guards();

    // Example 3: Try methods
    try_methods();

    // Example 4: Fallible constructor
    fallible_constructor();

    // Example 5: Metrics and health
    metrics_and_health();
}

fn acquire_release() {
    println!("1. Acquire / Release:");
    let pool = BoundedPool::new(1, || String::from("expensive")).unwrap();

    let item = pool.acquire().unwrap();
    println!("   Got: {}", item);
    pool.release(item);

    let item = pool.acquire().unwrap();
    pool.release(item);
    println!("   Constructed after two cycles: {}\n", pool.constructed_count());
}

fn guards() {
    println!("2. Guards:");
    let pool = BoundedPool::new(3, || Vec::<u8>::with_capacity(16)).unwrap();

    {
        let mut buffer = pool.get().unwrap();
        buffer.extend_from_slice(b"hello");
        println!("   Outstanding while held: {}", pool.outstanding_count());
    }

    println!("   Available after return: {}\n", pool.available_count());
}

fn try_methods() {
    println!("3. Try Methods:");
    let pool = BoundedPool::new(1, || 42).unwrap();

    let obj1 = pool.try_get();
    assert!(obj1.is_some());
    println!("   First try: Success");

    // Capacity reached while the object is checked out
    let obj2 = pool.try_get();
    assert!(obj2.is_none());
    println!("   Second try: None (pool exhausted)");

    drop(obj1);

    let obj3 = pool.try_get();
    assert!(obj3.is_some());
    println!("   Third try: Success\n");
}

fn fallible_constructor() {
    println!("4. Fallible Constructor:");
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);

    let config = PoolConfiguration::new().with_max_pool_size(1).with_name("flaky");
    let pool = BoundedPool::try_new(config, move || {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(io::Error::other("connection refused"))
        } else {
            Ok("connected")
        }
    })
    .unwrap();

    match pool.acquire() {
        Err(PoolError::Construction(err)) => println!("   First acquire failed: {}", err),
        other => println!("   Unexpected: {:?}", other),
    }

    let conn = pool.acquire().unwrap();
    println!("   Second acquire: {} (constructed {})", conn, pool.constructed_count());
    pool.release(conn);
    println!();
}

fn metrics_and_health() {
    println!("5. Metrics and Health:");
    let pool = BoundedPool::new(2, || 0u64).unwrap();

    {
        let _obj1 = pool.get().unwrap();
        let _obj2 = pool.get().unwrap();

        let health = pool.get_health_status();
        println!("   Health: {}", if health.is_healthy { "Healthy" } else { "Unhealthy" });
        println!("   Utilization: {:.1}%", health.utilization * 100.0);
        for warning in &health.warnings {
            println!("   Warning: {}", warning);
        }
    }

    let metrics = pool.export_metrics();
    println!("\n   Metrics:");
    for (key, value) in metrics {
        println!("     {}: {}", key, value);
    }
}
