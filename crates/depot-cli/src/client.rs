//! Async HTTP client wrapping the depot JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use depot_core::{
  ConsistencyWarning,
  asset::{ActivityEntry, AssetRecord, AssetTag, Attributes, Direction},
  category::Category,
  store::StoredAsset,
};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;

/// Connection settings for the depot API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
}

// ─── Response shapes ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StoreCount {
  pub store:  String,
  pub count:  usize,
  pub loaded: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
  pub stores:                  Vec<StoreCount>,
  pub total_across_all_stores: usize,
}

#[derive(Debug, Deserialize)]
pub struct Located {
  pub tag:      AssetTag,
  pub category: Category,
  pub record:   AssetRecord,
  pub warning:  Option<ConsistencyWarning>,
}

#[derive(Debug, Deserialize)]
pub struct Report {
  pub tag:       AssetTag,
  pub category:  Category,
  pub kind:      String,
  pub from:      Option<Category>,
  pub direction: Option<Direction>,
  pub at:        Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanResult {
  Category { category: Category },
  Asset(Located),
}

#[derive(Debug, Deserialize)]
pub struct ConsistencyReport {
  pub duplicates: Vec<ConsistencyWarning>,
}

#[derive(Debug, Serialize)]
struct TransitionBody<'a> {
  category:   &'a str,
  location:   &'a str,
  #[serde(flatten)]
  attributes: &'a Attributes,
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Async HTTP client for the depot JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  base:   Url,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    let base = Url::parse(&config.base_url)
      .with_context(|| format!("invalid server URL {:?}", config.base_url))?;
    Ok(Self { client, base })
  }

  /// `<base>/api/<segments...>`, with each segment percent-encoded.
  fn url(&self, segments: &[&str]) -> Result<Url> {
    let mut url = self.base.clone();
    url
      .path_segments_mut()
      .map_err(|()| anyhow!("server URL cannot be a base: {}", self.base))?
      .pop_if_empty()
      .push("api")
      .extend(segments);
    Ok(url)
  }

  async fn send<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
    let resp = req.send().await.with_context(|| format!("{what} failed"))?;
    decode(resp, what).await
  }

  /// `GET /api/summary`
  pub async fn summary(&self) -> Result<Summary> {
    self.send(self.client.get(self.url(&["summary"])?), "GET /summary").await
  }

  /// `GET /api/activity[?limit=<n>][&filter=<s>]`
  pub async fn activity(
    &self,
    limit: Option<usize>,
    filter: Option<&str>,
  ) -> Result<Vec<ActivityEntry>> {
    let mut query = Vec::new();
    if let Some(limit) = limit {
      query.push(("limit", limit.to_string()));
    }
    if let Some(filter) = filter {
      query.push(("filter", filter.to_owned()));
    }
    let req = self.client.get(self.url(&["activity"])?).query(&query);
    self.send(req, "GET /activity").await
  }

  /// `GET /api/assets/<tag>`
  pub async fn locate(&self, tag: &str) -> Result<Located> {
    self.send(self.client.get(self.url(&["assets", tag])?), "GET /assets").await
  }

  /// `POST /api/assets/<tag>/transition`
  pub async fn transition(
    &self,
    tag: &str,
    category: &str,
    location: &str,
    attributes: &Attributes,
  ) -> Result<Report> {
    let body = TransitionBody { category, location, attributes };
    let req = self.client.post(self.url(&["assets", tag, "transition"])?).json(&body);
    self.send(req, "POST /assets/transition").await
  }

  /// `POST /api/assets/<tag>/move`
  pub async fn move_to(&self, tag: &str, category: &str) -> Result<Report> {
    let req = self
      .client
      .post(self.url(&["assets", tag, "move"])?)
      .json(&json!({ "category": category }));
    self.send(req, "POST /assets/move").await
  }

  /// `POST /api/scan`
  pub async fn scan(&self, input: &str) -> Result<ScanResult> {
    let req = self.client.post(self.url(&["scan"])?).json(&json!({ "input": input }));
    self.send(req, "POST /scan").await
  }

  /// `GET /api/stores/<category>/assets`
  pub async fn list(&self, category: &str) -> Result<Vec<StoredAsset>> {
    let req = self.client.get(self.url(&["stores", category, "assets"])?);
    self.send(req, "GET /stores/assets").await
  }

  /// `GET /api/consistency`
  pub async fn consistency(&self) -> Result<ConsistencyReport> {
    self.send(self.client.get(self.url(&["consistency"])?), "GET /consistency").await
  }
}

/// Deserialise a success body, or turn the API's `{"error": ...}` body into
/// an error.
async fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
  let status = resp.status();
  if status.is_success() {
    return resp.json().await.with_context(|| format!("deserialising {what}"));
  }

  let message = resp
    .json::<serde_json::Value>()
    .await
    .ok()
    .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_owned))
    .unwrap_or_else(|| status.to_string());
  Err(anyhow!("{what} → {status}: {message}"))
}
