use std::time::Duration;

use unicache::prelude::*;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

    println!("Connecting to Redis at {}", redis_url);

    let config = RedisConfig::new(redis_url)
        .pool_size(5)
        .connection_timeout(Duration::from_secs(2));

    let backend = match RedisBackend::new(config).await {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("Failed to connect to Redis: {}", e);
            println!("Make sure Redis is running at 127.0.0.1:6379 or set REDIS_URL");
            return Ok(());
        }
    };

    // Version and TTLs come from UNICACHE_* variables when set
    let settings = CacheSettings::new("1").with_env_overrides(|name| std::env::var(name).ok())?;
    let registry = CacheRegistry::new(backend, settings)?;
    let greetings = registry.get_cache("greetings").ok_or("cache disabled")?;

    greetings.put("hello", &"world".to_string()).await;

    match greetings.get::<_, String>("hello").await {
        Some(value) => println!("Hit: {}", value),
        None => println!("Miss"),
    }

    println!(
        "Cleared {} keys (evictor: {})",
        greetings.clear().await,
        greetings.evictor().as_str()
    );

    Ok(())
}
