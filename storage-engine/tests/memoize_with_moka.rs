use memokv::{CacheContext, CacheObject, KeyValueStore, MemoError};
use serde::{Deserialize, Serialize};
use shared::config::{Backend, CacheOptions, StoreConfig};
use shared::TtlSecs;
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use storage_engine::{MokaConnector, MokaStore};
use tokio::time::sleep;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Report {
    owner: String,
    total: u64,
}

async fn open_context(namespace: &str) -> (CacheContext, Arc<dyn KeyValueStore>) {
    let config = StoreConfig::new(
        StoreConfig::DEFAULT_PORT,
        StoreConfig::DEFAULT_HOST,
        CacheOptions::with_namespace(namespace),
    )
    .with_backend(Backend::Memory);
    let ctx = CacheContext::new(config);
    let store = ctx.open(&MokaConnector).await.unwrap();
    (ctx, store)
}

#[tokio::test]
async fn test_context_set_get_round_trip() {
    let (ctx, store) = open_context("ns").await;
    let report = Report {
        owner: "ada".to_string(),
        total: 42,
    };

    ctx.set("report", &report, None).await.unwrap();

    assert_eq!(ctx.get::<Report>("report").await.unwrap(), Some(report));
    assert!(store.get("ns::report").await.unwrap().is_some());
    assert_eq!(store.get("report").await.unwrap(), None);
}

#[tokio::test]
async fn test_context_set_with_ttl_expires() {
    let (ctx, _store) = open_context("ns").await;

    ctx.set("short", &1u32, Some(TtlSecs(1))).await.unwrap();
    assert_eq!(ctx.get::<u32>("short").await.unwrap(), Some(1));

    sleep(Duration::from_millis(1200)).await;
    assert_eq!(ctx.get::<u32>("short").await.unwrap(), None);
}

#[tokio::test]
async fn test_template_memoizer_recomputes_after_ttl() {
    let (ctx, _store) = open_context("reports").await;
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = calls.clone();
    let build = ctx
        .memoize_template(
            "report:{0}",
            move |(owner,): (String,)| {
                let counter = counter.clone();
                async move {
                    let total = counter.fetch_add(1, Ordering::SeqCst) as u64 + 1;
                    Ok::<_, Infallible>(Report { owner, total })
                }
            },
            Some(TtlSecs(1)),
        )
        .await
        .unwrap();

    let first = build.call(("ada".to_string(),)).await.unwrap();
    let cached = build.call(("ada".to_string(),)).await.unwrap();
    assert_eq!(first, cached);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    sleep(Duration::from_millis(1200)).await;

    let fresh = build.call(("ada".to_string(),)).await.unwrap();
    assert_eq!(fresh.total, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_template_memoizer_remove_key_forces_recompute() {
    let (ctx, store) = open_context("reports").await;
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = calls.clone();
    let build = ctx
        .memoize_template(
            "report:{0}:{1}",
            move |(owner, year): (String, u32)| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Infallible>(Report {
                        owner,
                        total: u64::from(year),
                    })
                }
            },
            None,
        )
        .await
        .unwrap();

    build.call(("ada".to_string(), 2024)).await.unwrap();
    build.call(("ada".to_string(), 2025)).await.unwrap();
    assert!(store.get("reports::report:ada:2024").await.unwrap().is_some());

    assert!(build.remove_key(&("ada".to_string(), 2024)).await.unwrap());
    assert_eq!(store.get("reports::report:ada:2024").await.unwrap(), None);
    assert!(store.get("reports::report:ada:2025").await.unwrap().is_some());

    build.call(("ada".to_string(), 2024)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_template_memoizer_failure_leaves_no_entry() {
    let (ctx, store) = open_context("ns").await;
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = calls.clone();
    let parse = ctx
        .memoize_template(
            "parse:{0}",
            move |(raw,): (String,)| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    raw.parse::<u64>().map_err(|e| e.to_string())
                }
            },
            Some(TtlSecs(60)),
        )
        .await
        .unwrap();

    let err = parse.call(("abc".to_string(),)).await.unwrap_err();
    assert!(matches!(err, MemoError::Compute(_)));
    assert!(store.keys("ns::parse:*").await.unwrap().is_empty());

    parse.call(("abc".to_string(),)).await.unwrap_err();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    assert_eq!(parse.call(("17".to_string(),)).await.unwrap(), 17);
    assert_eq!(store.keys("ns::parse:*").await.unwrap(), vec!["ns::parse:17"]);
}

#[tokio::test]
async fn test_context_flush_by_pattern() {
    let (ctx, store) = open_context("ns").await;
    for id in 0..5 {
        ctx.set(&format!("session:{}", id), &id, None).await.unwrap();
    }
    ctx.set("config", "keep", None).await.unwrap();
    store.set("session:9", "outside namespace").await.unwrap();

    assert_eq!(ctx.flush("session:*").await.unwrap(), 5);

    assert!(store.keys("ns::session:*").await.unwrap().is_empty());
    assert_eq!(ctx.get::<String>("config").await.unwrap().as_deref(), Some("keep"));
    assert!(store.get("session:9").await.unwrap().is_some());
}

#[tokio::test]
async fn test_context_close_then_reopen() {
    let (ctx, _store) = open_context("ns").await;
    ctx.set("k", &1u8, None).await.unwrap();

    ctx.close().await.unwrap();
    assert!(ctx.get::<u8>("k").await.is_err());

    // A fresh in-process store starts empty
    ctx.open(&MokaConnector).await.unwrap();
    assert_eq!(ctx.get::<u8>("k").await.unwrap(), None);
}

#[tokio::test]
async fn test_cache_object_memoize_over_moka() {
    let store = Arc::new(MokaStore::new());
    let cache = CacheObject::new(store.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = calls.clone();
    let square = cache
        .memoize(
            move |n: u64| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Infallible>(n * n)
                }
            },
            1,
            |n: &u64| format!("square:{}", n),
        )
        .unwrap();

    assert_eq!(square.call(12).await.unwrap(), 144);
    assert_eq!(square.call(12).await.unwrap(), 144);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.get("square:12").await.unwrap().as_deref(), Some("144"));

    sleep(Duration::from_millis(1200)).await;

    assert_eq!(square.call(12).await.unwrap(), 144);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
