use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use unicache::TracingMetrics;
use unicache::prelude::*;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // TRACE shows per-call events, DEBUG shows absorbed failures
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    println!("Initialized tracing...");

    let backend = MemoryBackend::new(MemoryConfig::default());
    let metrics = TracingMetrics::new().with_service_name("example-service");

    let registry = CacheRegistry::with_codec_and_metrics(
        Arc::new(backend.clone()),
        CacheSettings::new("42"),
        ValueCodec::json(),
        Arc::new(metrics),
    )?;
    let users = registry.get_cache("userCache").ok_or("cache disabled")?;

    println!("\nSetting value...");
    users.put("user:1", &"Alice".to_string()).await;

    println!("\nGetting value (hit)...");
    println!("   Got: {:?}", users.get::<_, String>("user:1").await);

    println!("\nGetting missing value (miss)...");
    println!("   Got: {:?}", users.get::<_, String>("user:99").await);

    println!("\nBackend outage...");
    backend.set_available(false);
    println!("   Got: {:?}", users.get::<_, String>("user:1").await);
    users.put("user:2", &"Bob".to_string()).await;
    backend.set_available(true);

    println!("\nCheck your console output for structured logs!");
    Ok(())
}
