//! Integration tests against a live Redis with the search module.
//!
//! ## Running Tests
//!
//! ```bash
//! docker run -d -p 6379:6379 redis/redis-stack-server
//! HASHDEX_TEST_REDIS_URL=redis://127.0.0.1:6379 \
//!     cargo test --package hashdex-index --test redis_integration -- --ignored
//! ```
//!
//! These tests are marked `#[ignore]` to prevent running in CI without a server.

mod common;

use std::sync::Arc;

use hashdex_config::StoreConfig;
use hashdex_index::{
    Field, IndexManager, NativeQuery, QueryExecutor, Reconciled, RedisStore, SearchStore,
};

fn redis_url() -> Option<String> {
    std::env::var("HASHDEX_TEST_REDIS_URL").ok()
}

/// Skip test if no server is configured
macro_rules! require_redis {
    () => {
        match redis_url() {
            Some(url) => url,
            None => {
                eprintln!("Skipping: HASHDEX_TEST_REDIS_URL not set");
                return;
            }
        }
    };
}

async fn connect(url: String) -> Arc<RedisStore> {
    let config = StoreConfig {
        url,
        ..Default::default()
    };
    Arc::new(
        RedisStore::connect(&config)
            .await
            .expect("Failed to connect to Redis"),
    )
}

#[tokio::test]
#[ignore] // Requires Redis with the search module
async fn test_reconcile_and_search_round_trip() {
    let url = require_redis!();
    let store = connect(url).await;
    let manager = IndexManager::with_record_prefix(store.clone(), "hashdex-test-index");
    let schema = common::people_schema();

    // Start from a clean slate
    store.drop_index("people").await.expect("drop failed");
    let _ = manager.ensure_index(&schema).await.expect("first reconcile failed");
    assert_eq!(
        manager.ensure_index(&schema).await.expect("second reconcile failed"),
        Reconciled::Unchanged
    );

    store
        .hash_set(
            "people:1",
            &[
                ("age".to_string(), "42".to_string()),
                ("status".to_string(), "a&b".to_string()),
                ("bio".to_string(), "hello there".to_string()),
            ],
        )
        .await
        .expect("HSET failed");

    // Indexing is asynchronous on the server
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let executor = QueryExecutor::new(store.clone());
    let analysis = hashdex_index::analyze(&schema).expect("analyze failed");
    let age = Field::<i32>::new("age");
    let status = Field::<String>::new("status");

    let query = NativeQuery::from_predicate(&analysis, &(age.gt(30) & status.eq("a&b")))
        .expect("compile failed");
    let page = executor.search(&query, 1, 10).await;

    assert!(!page.is_degraded(), "search degraded: {:?}", page);
    assert_eq!(page.into_value().ids, vec!["1"]);

    store.drop_index("people").await.expect("cleanup failed");
}

#[tokio::test]
#[ignore] // Requires Redis with the search module
async fn test_drop_missing_index_reports_false() {
    let url = require_redis!();
    let store = connect(url).await;

    let dropped = store
        .drop_index("hashdex-test-does-not-exist")
        .await
        .expect("drop of a missing index should not fail");
    assert!(!dropped);
}
