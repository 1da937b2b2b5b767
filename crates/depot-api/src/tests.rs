//! Router tests against in-memory SQLite stores.

use std::{sync::Arc, time::Duration};

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use depot_core::{
  alias::AliasTable,
  asset::{AssetTag, Document, fields},
  category::Category,
  layout::StoreLayout,
  store::AssetStore,
};
use depot_engine::{
  AggregationCache, CacheOptions, LocationPolicy, ReconcileOptions, Reconciler, StoreSet,
  TransitionEngine,
};
use depot_store_sqlite::{SqliteCollection, SqliteDatabase};
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{AppState, api_router};

async fn make_state() -> AppState<SqliteCollection> {
  let db = SqliteDatabase::open_in_memory().await.unwrap();
  let stores = Arc::new(StoreSet::new(StoreLayout::default(), |spec| {
    db.collection(&spec.name)
  }));
  let cache = AggregationCache::spawn(stores.clone(), CacheOptions {
    resubscribe_delay: Duration::from_millis(10),
    ..Default::default()
  });
  let engine = TransitionEngine::new(
    stores.clone(),
    LocationPolicy::default(),
    Arc::new(AliasTable::default()),
  );
  AppState {
    engine: Arc::new(engine),
    cache,
    reconciler: Reconciler::new(stores, ReconcileOptions::default()),
  }
}

async fn call(
  state: &AppState<SqliteCollection>,
  method: &str,
  uri: &str,
  body: Option<Value>,
) -> Response {
  let builder = Request::builder().method(method).uri(uri);
  let req = match body {
    Some(json) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(json.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };
  api_router(state.clone()).oneshot(req).await.unwrap()
}

async fn body_json(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

async fn check_in(state: &AppState<SqliteCollection>, tag: &str, category: &str) -> Response {
  call(
    state,
    "POST",
    &format!("/assets/{tag}/transition"),
    Some(json!({
      "category": category,
      "location": "DepartmentIT",
      "owner": "alice",
      "model": "U2720Q",
      "serial": "SN-1",
    })),
  )
  .await
}

async fn seed(state: &AppState<SqliteCollection>, category: Category, tag: &str) {
  state
    .engine
    .stores()
    .store(category)
    .unwrap()
    .put(&AssetTag::new(tag).unwrap(), Document::new().with(fields::SERIAL, "x"))
    .await
    .unwrap();
}

// ─── Assets ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn transition_registers_then_updates() {
  let state = make_state().await;

  let resp = check_in(&state, "A001", "laptop").await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let report = body_json(resp).await;
  assert_eq!(report["kind"], "registered");
  assert_eq!(report["category"], "computer");
  assert_eq!(report["direction"], "check_in");

  let resp = call(
    &state,
    "POST",
    "/assets/A001/transition",
    Some(json!({ "category": "computer", "location": "Branch-9", "owner": "alice" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let report = body_json(resp).await;
  assert_eq!(report["kind"], "updated");
  assert_eq!(report["direction"], "check_out");
}

#[tokio::test]
async fn locate_returns_record() {
  let state = make_state().await;
  check_in(&state, "M100", "display").await;

  let resp = call(&state, "GET", "/assets/M100", None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let located = body_json(resp).await;
  assert_eq!(located["category"], "monitor");
  assert_eq!(located["record"]["attribute"], "U2720Q");
  assert_eq!(located["record"]["location"], "DepartmentIT");
  assert!(located["warning"].is_null());
}

#[tokio::test]
async fn locate_unknown_tag_is_404() {
  let state = make_state().await;
  let resp = call(&state, "GET", "/assets/ghost", None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  let body = body_json(resp).await;
  assert!(body["error"].as_str().unwrap().contains("ghost"));
}

#[tokio::test]
async fn missing_attribute_is_400() {
  let state = make_state().await;
  let resp = call(
    &state,
    "POST",
    "/assets/A001/transition",
    Some(json!({ "category": "computer", "location": "DepartmentIT" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert!(body_json(resp).await["error"].as_str().unwrap().contains("owner"));
}

#[tokio::test]
async fn unknown_category_is_400() {
  let state = make_state().await;
  let resp = call(
    &state,
    "POST",
    "/assets/A001/move",
    Some(json!({ "category": "toaster" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn move_reports_source_and_is_idempotent() {
  let state = make_state().await;
  check_in(&state, "A001", "computer").await;

  let resp = call(&state, "POST", "/assets/A001/move", Some(json!({ "category": "gary" }))).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let report = body_json(resp).await;
  assert_eq!(report["kind"], "moved");
  assert_eq!(report["from"], "computer");
  assert_eq!(report["category"], "quarantine");

  let resp =
    call(&state, "POST", "/assets/A001/move", Some(json!({ "category": "quarantine" }))).await;
  assert_eq!(body_json(resp).await["kind"], "unchanged");
}

// ─── Scan ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn scan_resolves_alias_before_tag() {
  let state = make_state().await;
  check_in(&state, "A001", "computer").await;

  let resp = call(&state, "POST", "/scan", Some(json!({ "input": "iPad" }))).await;
  let body = body_json(resp).await;
  assert_eq!(body["kind"], "category");
  assert_eq!(body["category"], "tablet");

  let resp = call(&state, "POST", "/scan", Some(json!({ "input": "A001\n" }))).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = body_json(resp).await;
  assert_eq!(body["kind"], "asset");
  assert_eq!(body["category"], "computer");

  let resp = call(&state, "POST", "/scan", Some(json!({ "input": "nothing" }))).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ─── Stores and consistency ──────────────────────────────────────────────────

#[tokio::test]
async fn lists_one_store() {
  let state = make_state().await;
  seed(&state, Category::Tablet, "IP2").await;
  seed(&state, Category::Tablet, "IP1").await;
  seed(&state, Category::Server, "S1").await;

  let resp = call(&state, "GET", "/stores/ipads/assets", None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let assets = body_json(resp).await;
  let tags: Vec<_> = assets
    .as_array()
    .unwrap()
    .iter()
    .map(|a| a["tag"].as_str().unwrap().to_owned())
    .collect();
  assert_eq!(tags, ["IP1", "IP2"]);
}

#[tokio::test]
async fn consistency_lists_duplicates() {
  let state = make_state().await;
  let resp = call(&state, "GET", "/consistency", None).await;
  assert_eq!(body_json(resp).await["consistent"], true);

  seed(&state, Category::Server, "S1").await;
  seed(&state, Category::Quarantine, "S1").await;

  let body = body_json(call(&state, "GET", "/consistency", None).await).await;
  assert_eq!(body["consistent"], false);
  assert_eq!(body["duplicates"][0]["tag"], "S1");
  assert_eq!(body["duplicates"][0]["stores"], json!(["server", "quarantine"]));
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn summary_and_activity_follow_the_cache() {
  let state = make_state().await;
  check_in(&state, "A100", "computer").await;
  check_in(&state, "A150", "monitor").await;
  check_in(&state, "B200", "server").await;

  tokio::time::timeout(
    Duration::from_secs(5),
    state.cache.wait_for(|s| s.is_loaded() && s.total_across_all_stores() == 3),
  )
  .await
  .unwrap()
  .unwrap();

  let summary = body_json(call(&state, "GET", "/summary", None).await).await;
  assert_eq!(summary["totalAcrossAllStores"], 3);
  assert_eq!(summary["loaded"], true);
  assert_eq!(summary["stores"].as_array().unwrap().len(), 6);
  assert_eq!(summary["stores"][0]["store"], "Computer");
  assert_eq!(summary["stores"][0]["count"], 1);

  let all = body_json(call(&state, "GET", "/activity", None).await).await;
  assert_eq!(all.as_array().unwrap().len(), 3);

  let limited = body_json(call(&state, "GET", "/activity?limit=1", None).await).await;
  assert_eq!(limited.as_array().unwrap().len(), 1);

  let filtered = body_json(call(&state, "GET", "/activity?filter=a1", None).await).await;
  let mut tags: Vec<_> = filtered
    .as_array()
    .unwrap()
    .iter()
    .map(|e| e["tag"].as_str().unwrap().to_owned())
    .collect();
  tags.sort();
  assert_eq!(tags, ["A100", "A150"]);
}
