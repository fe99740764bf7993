use anyhow::Result;
use axum::http::StatusCode;
use serde_json::Value;

mod support;
use support::{ALPHA, BETA, FakeStreams, FakeTmdb, SourceBehavior, build_test_app};

#[tokio::test]
async fn fallback_source_serves_when_primary_fails() -> Result<()> {
    let streams = FakeStreams::default();
    streams
        .on(ALPHA, SourceBehavior::Status(500))
        .on(BETA, SourceBehavior::Serve("<html>player</html>"));
    let app = build_test_app(FakeTmdb::default(), streams).await?;

    let response = app.server.get("/stream/550").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["sourceName"], "beta");
    assert_eq!(body["payload"], "<html>player</html>");

    let cached = app.cached("stream:movie:550").await.expect("winner remembered");
    assert_eq!(cached["source"], "beta");
    Ok(())
}

#[tokio::test]
async fn cached_source_is_revalidated_and_reused() -> Result<()> {
    let streams = FakeStreams::default();
    streams.on(ALPHA, SourceBehavior::Serve("<html>alpha</html>"));
    let app = build_test_app(FakeTmdb::default(), streams).await?;

    app.server.get("/stream/550").await.assert_status_ok();
    let first_fetches = app.streams.fetch_count();

    let response = app.server.get("/stream/550").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["sourceName"], "alpha");
    // Revalidation re-fetches the remembered URL only.
    assert_eq!(app.streams.fetch_count(), first_fetches + 1);
    Ok(())
}

#[tokio::test]
async fn tv_kind_only_races_sources_serving_tv() -> Result<()> {
    let streams = FakeStreams::default();
    streams
        .on(ALPHA, SourceBehavior::Status(404))
        .on(BETA, SourceBehavior::Serve("<html>movie only</html>"));
    let app = build_test_app(FakeTmdb::default(), streams).await?;

    let response = app
        .server
        .get("/stream/1399")
        .add_query_param("mediaKind", "tv")
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    assert_eq!(
        response.text(),
        "All streaming sources are currently unavailable."
    );
    assert!(app.cached("stream:tv:1399").await.is_none());
    Ok(())
}

#[tokio::test]
async fn exhaustion_is_a_plain_text_502() -> Result<()> {
    let app = build_test_app(FakeTmdb::default(), FakeStreams::default()).await?;

    let response = app.server.get("/stream/550").await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    assert_eq!(
        response.text(),
        "All streaming sources are currently unavailable."
    );
    Ok(())
}

#[tokio::test]
async fn malformed_input_is_rejected_before_any_fetch() -> Result<()> {
    let app = build_test_app(FakeTmdb::default(), FakeStreams::default()).await?;

    let bad_id = app.server.get("/stream/550%3Bdrop").await;
    bad_id.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(bad_id.text(), "Invalid ID format");

    let bad_kind = app
        .server
        .get("/stream/550")
        .add_query_param("mediaKind", "anime")
        .await;
    bad_kind.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(bad_kind.text(), "Invalid media type");

    assert_eq!(app.streams.fetch_count(), 0);
    Ok(())
}

#[tokio::test]
async fn legacy_media_type_parameter_is_accepted() -> Result<()> {
    let streams = FakeStreams::default();
    streams.on(ALPHA, SourceBehavior::Serve("<html>tv</html>"));
    let app = build_test_app(FakeTmdb::default(), streams).await?;

    let response = app
        .server
        .get("/stream/1399")
        .add_query_param("media_type", "tv")
        .await;

    response.assert_status_ok();
    assert!(app.cached("stream:tv:1399").await.is_some());
    Ok(())
}
