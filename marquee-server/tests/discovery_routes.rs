use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{Value, json};

mod support;
use support::{FakeStreams, FakeTmdb, build_test_app, movie_page};

#[tokio::test]
async fn hero_pads_with_placeholders_and_caches() -> Result<()> {
    let tmdb = FakeTmdb::default();
    tmdb.on("/movie/popular", movie_page(1, 4));
    let app = build_test_app(tmdb, FakeStreams::default()).await?;

    let response = app.server.get("/hero").await;
    response.assert_status_ok();

    let heroes: Vec<Value> = response.json();
    assert_eq!(heroes.len(), 10);
    let placeholders = heroes.iter().filter(|h| h["title"] == "No Title").count();
    assert_eq!(placeholders, 6);
    assert!(
        heroes
            .iter()
            .filter(|h| h["title"] != "No Title")
            .all(|h| h["image"].as_str().is_some_and(|i| i.contains("/original/")))
    );

    app.server.get("/hero").await.assert_status_ok();
    assert_eq!(app.tmdb.call_count("/movie/popular"), 1);
    Ok(())
}

#[tokio::test]
async fn search_requires_a_query_and_defaults_to_multi() -> Result<()> {
    let tmdb = FakeTmdb::default();
    tmdb.on("/search/multi", movie_page(10, 3));
    let app = build_test_app(tmdb, FakeStreams::default()).await?;

    let missing = app.server.get("/search").add_query_param("query", "  ").await;
    missing.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(missing.text(), "Missing search query");

    let response = app
        .server
        .get("/search")
        .add_query_param("query", "dune")
        .add_query_param("type", "podcast")
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["results"].as_array().map(Vec::len), Some(3));
    assert_eq!(body["page"], 1);
    assert_eq!(body["totalPages"], 3);
    assert_eq!(body["hasNextPage"], true);
    assert!(app.cached("search:multi:dune:page:1").await.is_some());
    Ok(())
}

#[tokio::test]
async fn genre_browse_requires_a_numeric_id() -> Result<()> {
    let tmdb = FakeTmdb::default();
    tmdb.on("/discover/movie", movie_page(40, 6));
    let app = build_test_app(tmdb, FakeStreams::default()).await?;

    let missing = app.server.get("/search/genre").await;
    missing.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(missing.text(), "Missing genre id");

    let invalid = app
        .server
        .get("/search/genre")
        .add_query_param("id", "action")
        .await;
    invalid.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(invalid.text(), "Invalid genre id");
    assert_eq!(app.tmdb.call_count("/discover/movie"), 0);

    let response = app
        .server
        .get("/search/genre")
        .add_query_param("id", "28")
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["results"].as_array().map(Vec::len), Some(6));
    assert_eq!(body["results"][0]["id"], 40);
    assert_eq!(body["totalResults"], 6);
    assert!(app.cached("genre:28:page:1").await.is_some());
    Ok(())
}

#[tokio::test]
async fn trending_lists_movies_of_the_day() -> Result<()> {
    let tmdb = FakeTmdb::default();
    tmdb.on("/trending/movie/day", movie_page(30, 5));
    let app = build_test_app(tmdb, FakeStreams::default()).await?;

    let response = app.server.get("/trending").add_query_param("page", 2).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["trending"].as_array().map(Vec::len), Some(5));
    assert_eq!(body["trending"][0]["mediaType"], "movie");
    assert!(app.cached("trending:day:page:2").await.is_some());
    Ok(())
}

#[tokio::test]
async fn watchlist_sync_stores_records_with_ids() -> Result<()> {
    let app = build_test_app(FakeTmdb::default(), FakeStreams::default()).await?;

    let response = app
        .server
        .post("/watchlist/sync")
        .json(&json!([
            { "id": 550, "title": "Fight Club" },
            { "title": "no id" },
            { "id": "tt0944947", "title": "Game of Thrones" }
        ]))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body, json!({ "success": true, "count": 3 }));

    let stored = app
        .cache
        .hash_entries("watchlist:offline")
        .expect("hash written");
    assert_eq!(stored.len(), 2);
    assert!(stored.contains_key("550"));
    assert!(stored.contains_key("tt0944947"));
    Ok(())
}

#[tokio::test]
async fn watchlist_sync_rejects_empty_payloads() -> Result<()> {
    let app = build_test_app(FakeTmdb::default(), FakeStreams::default()).await?;

    let empty_array = app.server.post("/watchlist/sync").json(&json!([])).await;
    empty_array.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(empty_array.text(), "No watchlist data provided.");

    let object = app
        .server
        .post("/watchlist/sync")
        .json(&json!({ "id": 1 }))
        .await;
    object.assert_status(StatusCode::BAD_REQUEST);

    let no_body = app.server.post("/watchlist/sync").await;
    no_body.assert_status(StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn ping_and_health_report_status() -> Result<()> {
    let app = build_test_app(FakeTmdb::default(), FakeStreams::default()).await?;

    let ping = app.server.get("/ping").await;
    ping.assert_status_ok();
    assert_eq!(ping.json::<Value>()["status"], "ok");

    let health = app.server.get("/health").await;
    health.assert_status_ok();
    let body: Value = health.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["cache"]["backend"], "memory");
    Ok(())
}
