//! End-to-end flow: search, pick a candidate, play it, stream it.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{candidate_for, test_app};
use hayase_core::testing::{FailingSource, MockEngine, StaticSource};

const HASH: &str = "abcdabcdabcdabcdabcdabcdabcdabcdabcdabcd";

async fn json_request(
    router: axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = match body {
        Some(body) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app(Arc::new(MockEngine::new()), vec![]);
    let (status, body) = json_request(app.router, "GET", "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_config_endpoint_is_sanitized() {
    let app = test_app(Arc::new(MockEngine::new()), vec![]);
    let (status, body) = json_request(app.router, "GET", "/api/v1/config", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["search"]["tosho_enabled"].is_boolean());
    assert!(body["search"].get("tosho").is_none());
}

#[tokio::test]
async fn test_search_degrades_on_source_failure() {
    let app = test_app(
        Arc::new(MockEngine::new()),
        vec![
            Arc::new(StaticSource::new(
                "animetosho",
                vec![
                    candidate_for(HASH, "Example Show - 01", "animetosho"),
                    candidate_for(HASH, "Example Show - 01 v2", "animetosho"),
                ],
            )),
            Arc::new(FailingSource::new("nyaa")),
        ],
    );

    let (status, body) = json_request(
        app.router,
        "POST",
        "/api/v1/search",
        Some(json!({"query": "Example Show"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    let candidates = body["candidates"].as_array().unwrap();
    assert_eq!(candidates[0]["id"], 0);
    assert_eq!(candidates[1]["id"], 1);
    assert!(candidates
        .iter()
        .all(|c| c["source"] == "animetosho"));
}

#[tokio::test]
async fn test_play_unknown_identifier_reports_engine_error() {
    let app = test_app(Arc::new(MockEngine::new()), vec![]);
    let (status, body) = json_request(
        app.router,
        "POST",
        "/api/v1/swarms/play",
        Some(json!({"identifier": HASH})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("join"));
}

#[tokio::test]
async fn test_detached_play_returns_accepted() {
    let engine = Arc::new(MockEngine::new());
    engine
        .add_swarm(HASH, "Example Show - 01")
        .with_file("Example Show - 01.mp4", vec![0u8; 64])
        .finish()
        .await;
    let app = test_app(Arc::clone(&engine), vec![]);

    let (status, body) = json_request(
        app.router,
        "POST",
        "/api/v1/swarms/play",
        Some(json!({"identifier": HASH, "detached": true})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["detached"], true);

    // The background join lands shortly after.
    for _ in 0..50 {
        if app.sessions.is_active(HASH).await {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("detached play never joined the swarm");
}

#[tokio::test]
async fn test_full_search_play_stream_flow() {
    let engine = Arc::new(MockEngine::new());
    let content: Vec<u8> = (0..4096u32).map(|i| (i % 199) as u8).collect();
    engine
        .add_swarm(HASH, "Example Show - 01")
        .with_file("Example Show - 01.mp4", content.clone())
        .finish()
        .await;

    let app = test_app(
        Arc::clone(&engine),
        vec![Arc::new(StaticSource::new(
            "animetosho",
            vec![candidate_for(HASH, "Example Show - 01", "animetosho")],
        ))],
    );

    // 1. Search.
    let (status, body) = json_request(
        app.router.clone(),
        "POST",
        "/api/v1/search",
        Some(json!({"query": "Example Show"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let magnet = body["candidates"][0]["magnet_uri"].as_str().unwrap().to_string();
    assert!(magnet.contains(HASH));

    // 2. Play the selected candidate; blocks until the file list is up.
    let (status, body) = json_request(
        app.router.clone(),
        "POST",
        "/api/v1/swarms/play",
        Some(json!({"identifier": magnet, "catalog_id": 7, "episode": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["mime"], "video/mp4");
    let url = files[0]["url"].as_str().unwrap();
    assert!(url.contains(&format!("hash={}", HASH)));

    // 3. Stream with a range, mid-transfer.
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/stream?hash={}", HASH))
                .header(header::RANGE, "bytes=0-1023")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "video/mp4"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(bytes.as_ref(), &content[..1024]);

    // 4. Stats see the active swarm.
    let (status, body) = json_request(
        app.router.clone(),
        "GET",
        &format!("/api/v1/swarms/{}/stats", HASH),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hash"], HASH);
    assert_eq!(body["size"]["total"], 4096);

    // 5. Close; the swarm is released and the session list drains.
    let (status, _) = json_request(
        app.router.clone(),
        "DELETE",
        &format!("/api/v1/swarms/{}", HASH),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(engine.was_released(HASH).await);

    let (status, body) = json_request(app.router, "GET", "/api/v1/swarms", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_library_endpoints_reflect_snapshots() {
    let engine = Arc::new(MockEngine::new());
    engine
        .add_swarm(HASH, "Example Show - 01")
        .with_file("Example Show - 01.mp4", vec![0u8; 2000])
        .finish()
        .await;
    let app = test_app(Arc::clone(&engine), vec![]);

    app.sessions.play(HASH, 55, 1).await.unwrap();
    engine.set_counters(HASH, 1000, 0).await;
    app.sessions.close(HASH).await.unwrap();

    // Closing leaves a record behind even without persistence.
    let (status, body) = json_request(app.router.clone(), "GET", "/api/v1/library", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["entries"][0]["catalog_id"], 55);

    let (status, body) =
        json_request(app.router.clone(), "GET", "/api/v1/library/55", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"][0]["hash"], HASH);

    let (status, body) =
        json_request(app.router.clone(), "GET", "/api/v1/library/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"], 1);
    assert_eq!(body["total_bytes"], 2000);

    let (status, body) =
        json_request(app.router.clone(), "DELETE", "/api/v1/library/55", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 1);
    assert!(app.store.get(HASH).is_none());

    let (status, body) = json_request(app.router, "GET", "/api/v1/library", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_stats_unknown_swarm_is_not_found() {
    let app = test_app(Arc::new(MockEngine::new()), vec![]);
    let (status, _) = json_request(
        app.router,
        "GET",
        &format!("/api/v1/swarms/{}/stats", HASH),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
