// EsoxSolutions.BoundedPool
// Bounded, blocking object pool

// This is just a binary wrapper - the actual library is in lib.rs
// Run the demo with: cargo run --example basic

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use esox_boundedpool::{BoundedPool, PoolConfiguration, PoolResult};
use tracing_subscriber::EnvFilter;

fn main() -> PoolResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("=== EsoxSolutions.BoundedPool ===");
    println!();

    let config = PoolConfiguration::new()
        .with_max_pool_size(2)
        .with_name("demo");
    let pool = Arc::new(BoundedPool::with_config(config, || String::from("connection"))?);

    let workers: Vec<_> = (0..4)
        .map(|id| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || -> PoolResult<()> {
                let conn = pool.get()?;
                println!("  worker {id} holds {}", *conn);
                thread::sleep(Duration::from_millis(50));
                Ok(())
            })
        })
        .collect();

    for worker in workers {
        match worker.join() {
            Ok(result) => result?,
            Err(_) => eprintln!("  worker panicked"),
        }
    }

    let metrics = pool.get_metrics();
    println!();
    println!("  Constructed: {} of {}", metrics.constructed, metrics.max_capacity);
    println!("  Waits: {}", metrics.wait_events);
    Ok(())
}
