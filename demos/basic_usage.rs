//! Basic usage example of the cache.

use expiring_kv::{
    backend::InMemoryBackend, error::Result, CacheBackend, CacheKeyBuilder, InMemoryConfig,
    IncrPolicy,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Example entity: Employment
#[derive(Clone, Serialize, Deserialize, Debug)]
struct Employment {
    id: String,
    employer_name: String,
    salary: f64,
    hire_date: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .init();

    println!("=== expiring-kv: Basic Usage Example ===\n");

    let config = InMemoryConfig::default().with_incr_policy(IncrPolicy::InitializeZero);
    let cache = InMemoryBackend::with_config(config);

    println!("Example 1: Structured values");
    let employment = Employment {
        id: "emp_001".to_string(),
        employer_name: "Acme Corp".to_string(),
        salary: 75000.0,
        hire_date: "2023-01-15".to_string(),
    };
    let key = CacheKeyBuilder::build("employment", &employment.id);
    cache.set_marshal(&key, &employment, 300).await?;
    let cached: Employment = cache.get_marshal(&key).await?;
    println!("  cached {} -> {:?}\n", key, cached);

    println!("Example 2: First writer wins");
    let first = cache.set_if_not_exist("lock:payroll", "worker-a", 5).await;
    let second = cache.set_if_not_exist("lock:payroll", "worker-b", 5).await;
    println!("  worker-a acquired: {}, worker-b acquired: {}\n", first, second);

    println!("Example 3: Counters");
    for _ in 0..3 {
        cache.incr("stats:page_views").await?;
    }
    println!(
        "  page views: {}\n",
        cache.get_i64_with_fallback("stats:page_views", 0).await
    );

    println!("Example 4: Expiry");
    cache.set("otp:emp_001", "493021", 1).await;
    println!("  otp present: {}", cache.exists("otp:emp_001").await);
    tokio::time::sleep(Duration::from_millis(1100)).await;
    println!("  otp present after 1.1s: {}\n", cache.exists("otp:emp_001").await);

    println!("Example 5: Namespace invalidation");
    cache.remove_prefix(&CacheKeyBuilder::namespace("employment")).await?;
    println!("  {} present: {}", key, cache.exists(&key).await);

    cache.log_stats().await;
    println!("\n=== Example Complete ===");
    Ok(())
}
