//! Two application versions sharing one memory backend
//!
//! Build 876 caches an article. Build 877, deployed next to it, reads the
//! article without touching the database because `Article` kept its shape.
//! `Draft` changed between the builds, so 877 misses and reloads instead of
//! decoding 876's bytes into the wrong layout.

use unicache::prelude::*;

mod build_876 {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, unicache::CacheValue)]
    #[cache_value(tag = "Article", crate = "unicache")]
    pub struct Article {
        pub id: u64,
        pub title: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, unicache::CacheValue)]
    #[cache_value(tag = "Draft", crate = "unicache")]
    pub struct Draft {
        pub body: String,
    }
}

mod build_877 {
    use serde::{Deserialize, Serialize};

    pub use super::build_876::Article;

    #[derive(Debug, Clone, Serialize, Deserialize, unicache::CacheValue)]
    #[cache_value(tag = "Draft", crate = "unicache")]
    pub struct Draft {
        pub body: String,
        pub revision: u32,
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("=== unicache rolling deploy ===\n");

    let backend = MemoryBackend::new(MemoryConfig::default());

    let old = CacheRegistry::new(backend.clone(), CacheSettings::new("876"))?;
    let new = CacheRegistry::new(
        backend.clone(),
        CacheSettings::new("877").expiration("draftCache", 600),
    )?;

    let old_articles = old.get_cache("articleCache").ok_or("cache disabled")?;
    let new_articles = new.get_cache("articleCache").ok_or("cache disabled")?;

    println!("876 caches article 13...");
    old_articles
        .put(
            &13u64,
            &build_876::Article {
                id: 13,
                title: "Release notes".to_string(),
            },
        )
        .await;

    match new_articles.get::<_, build_877::Article>(&13u64).await {
        Some(article) => println!("877 HIT: {:?}", article),
        None => println!("877 MISS"),
    }
    println!("   promotions: {}", new_articles.stats().promotions);

    println!("\n876 caches a draft...");
    let old_drafts = old.get_cache("draftCache").ok_or("cache disabled")?;
    let new_drafts = new.get_cache("draftCache").ok_or("cache disabled")?;
    old_drafts
        .put(
            "intro",
            &build_876::Draft {
                body: "Hello".to_string(),
            },
        )
        .await;

    let draft = new_drafts
        .get_or_load("intro", || async {
            println!("   877 loads the draft from the database");
            Ok::<_, std::io::Error>(build_877::Draft {
                body: "Hello".to_string(),
                revision: 2,
            })
        })
        .await?;
    println!("877 got {:?}", draft);
    println!(
        "   fingerprint misses: {}",
        new_drafts.stats().fingerprint_misses
    );

    println!("\n876 still reads its own draft:");
    println!("   {:?}", old_drafts.get::<_, build_876::Draft>("intro").await);

    println!("\nEvicting article 13 for every version...");
    new_articles.evict(&13u64).await;
    println!(
        "   876 now sees: {:?}",
        old_articles.get::<_, build_876::Article>(&13u64).await
    );

    println!("\n--- Statistics ---");
    for (name, stats) in new.stats() {
        println!(
            "{name}: hits={} misses={} puts={} hit ratio={:.0}%",
            stats.hits,
            stats.misses,
            stats.puts,
            stats.hit_ratio() * 100.0
        );
    }

    Ok(())
}
