use std::collections::HashSet;
use std::sync::Arc;

use httpmock::MockServer;
use metrics_util::debugging::DebuggingRecorder;
use reqwest::Url;
use serde_json::Value;

use kvedge::application::articles::ArticleService;
use kvedge::application::revalidate::{CollectionAction, RevalidationOutcome, RevalidationService};
use kvedge::cache::{CacheAside, CacheKey, KvStore, MemoryKvStore};
use kvedge::domain::{Article, ArticleId, ChangeEvent};
use kvedge::infra::rest::RestOrigin;

fn rest_origin(server: &MockServer) -> Arc<RestOrigin> {
    let base = Url::parse(&server.base_url()).expect("mock url");
    Arc::new(RestOrigin::new(&base, "/rest/v1", "articles", "key").expect("origin"))
}

#[tokio::test]
async fn cache_and_origin_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let healthy = MockServer::start();
    healthy.mock(|when, then| {
        when.method("GET").path("/rest/v1/articles");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"[{"id":1,"title":"A"}]"#);
    });
    let failing = MockServer::start();
    failing.mock(|when, then| {
        when.method("GET").path("/rest/v1/articles");
        then.status(503).body("down");
    });

    let store = Arc::new(MemoryKvStore::new());
    let cache = CacheAside::new(store.clone());

    // miss, write, hit
    let articles = ArticleService::new(rest_origin(&healthy), cache.clone());
    assert_eq!(articles.list().await.expect("cold list").len(), 1);
    assert_eq!(articles.list().await.expect("warm list").len(), 1);

    // undecodable entry
    let item_key = CacheKey::article(&ArticleId::Int(1));
    store
        .put(&item_key, "{broken".to_string())
        .await
        .expect("seed corrupt entry");
    let lookup = cache.read::<Value>(&item_key).await.expect("read");
    assert!(!lookup.is_hit());

    // delete event with a failing collection refresh
    let revalidation = RevalidationService::new(rest_origin(&failing), cache.clone(), "articles");
    let outcome = revalidation
        .handle(&ChangeEvent::deleted(Article::new(1)))
        .await;
    assert!(matches!(
        outcome,
        RevalidationOutcome::Applied {
            collection: CollectionAction::Failed,
            ..
        }
    ));

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "kvedge_cache_hit_total",
        "kvedge_cache_miss_total",
        "kvedge_cache_decode_error_total",
        "kvedge_cache_write_total",
        "kvedge_cache_delete_total",
        "kvedge_revalidate_events_total",
        "kvedge_revalidate_failures_total",
        "kvedge_origin_request_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
