use httpmock::MockServer;
use reqwest::Url;
use serde_json::json;

use kvedge::application::repos::{ArticlesRepo, CreateArticleParams, RepoError};
use kvedge::domain::ArticleId;
use kvedge::infra::rest::RestOrigin;

const TABLE_PATH: &str = "/rest/v1/articles";

fn origin(server: &MockServer) -> RestOrigin {
    let base = Url::parse(&server.base_url()).expect("mock url");
    RestOrigin::new(&base, "/rest/v1", "articles", "service-key").expect("origin")
}

#[tokio::test]
async fn list_orders_by_id_and_sends_credentials() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path(TABLE_PATH)
            .query_param("select", "*")
            .query_param("order", "id.asc")
            .header("apikey", "service-key")
            .header("authorization", "Bearer service-key");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"[{"id":1,"title":"A","content":"x"},{"id":2,"title":"B","content":"y"}]"#);
    });

    let rows = origin(&server).list_articles().await.expect("list");
    mock.assert();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, ArticleId::Int(1));
    assert_eq!(rows[1].title(), Some("B"));
    assert_eq!(
        serde_json::to_value(&rows[0]).expect("json"),
        json!({ "id": 1, "title": "A", "content": "x" })
    );
}

#[tokio::test]
async fn find_filters_by_id_and_takes_first_row() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path(TABLE_PATH)
            .query_param("select", "*")
            .query_param("id", "eq.7");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"[{"id":7,"title":"Seven"}]"#);
    });

    let found = origin(&server)
        .find_article(&ArticleId::Int(7))
        .await
        .expect("find");
    mock.assert();

    let article = found.expect("row present");
    assert_eq!(article.title(), Some("Seven"));
}

#[tokio::test]
async fn find_without_rows_is_none() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path(TABLE_PATH).query_param("id", "eq.99");
        then.status(200)
            .header("content-type", "application/json")
            .body("[]");
    });

    let found = origin(&server)
        .find_article(&ArticleId::Int(99))
        .await
        .expect("find");
    assert!(found.is_none());
}

#[tokio::test]
async fn id_the_column_cannot_hold_is_none() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path(TABLE_PATH)
            .query_param("id", "eq.hello-world");
        then.status(400)
            .header("content-type", "application/json")
            .body(r#"{"code":"22P02","details":null,"hint":null,"message":"invalid input syntax for type bigint: \"hello-world\""}"#);
    });

    let found = origin(&server)
        .find_article(&ArticleId::parse("hello-world"))
        .await
        .expect("uncastable id is a miss");
    mock.assert();
    assert!(found.is_none());
}

#[tokio::test]
async fn other_find_rejections_still_surface() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path(TABLE_PATH);
        then.status(401)
            .header("content-type", "application/json")
            .body(r#"{"code":"PGRST301","message":"JWT expired"}"#);
    });

    let err = origin(&server)
        .find_article(&ArticleId::Int(1))
        .await
        .expect_err("unauthorized");
    assert!(matches!(err, RepoError::Rejected { status: 401, .. }));
}

#[tokio::test]
async fn create_asks_for_representation() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST")
            .path(TABLE_PATH)
            .header("prefer", "return=representation")
            .json_body(json!({ "title": "T", "content": "C" }));
        then.status(201)
            .header("content-type", "application/json")
            .body(r#"[{"id":3,"title":"T","content":"C"}]"#);
    });

    let created = origin(&server)
        .create_article(CreateArticleParams {
            title: "T".to_string(),
            content: "C".to_string(),
        })
        .await
        .expect("create");
    mock.assert();

    assert_eq!(created.id, ArticleId::Int(3));
}

#[tokio::test]
async fn create_without_representation_is_decode_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("POST").path(TABLE_PATH);
        then.status(201)
            .header("content-type", "application/json")
            .body("[]");
    });

    let err = origin(&server)
        .create_article(CreateArticleParams {
            title: "T".to_string(),
            content: "C".to_string(),
        })
        .await
        .expect_err("empty representation");
    assert!(matches!(err, RepoError::Decode(_)));
}

#[tokio::test]
async fn gateway_rejection_keeps_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("POST").path(TABLE_PATH);
        then.status(400)
            .header("content-type", "application/json")
            .body(r#"{"code":"23502","message":"null value in column \"title\""}"#);
    });

    let err = origin(&server)
        .create_article(CreateArticleParams {
            title: String::new(),
            content: "C".to_string(),
        })
        .await
        .expect_err("rejected");
    match err {
        RepoError::Rejected { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("title"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn server_error_is_unavailable() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path(TABLE_PATH);
        then.status(503).body("maintenance");
    });

    let err = origin(&server).list_articles().await.expect_err("503");
    assert!(matches!(err, RepoError::Unavailable(_)));
}

#[tokio::test]
async fn malformed_rows_are_decode_errors() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path(TABLE_PATH);
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"not":"an array"}"#);
    });

    let err = origin(&server).list_articles().await.expect_err("not an array");
    assert!(matches!(err, RepoError::Decode(_)));
}

#[tokio::test]
async fn unreachable_origin_is_unavailable() {
    let base = Url::parse("http://127.0.0.1:9").expect("url");
    let origin = RestOrigin::new(&base, "/rest/v1", "articles", "k").expect("origin");

    let err = origin.list_articles().await.expect_err("connection refused");
    assert!(matches!(err, RepoError::Unavailable(_)));
}
