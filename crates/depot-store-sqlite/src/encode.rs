//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. Documents are stored as a JSON
//! object whose values keep their type tag, so `json_patch` merges them field
//! by field.

use chrono::{DateTime, Utc};
use depot_core::{
  asset::{AssetTag, Document},
  store::StoredAsset,
};

use crate::Result;

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

// ─── Document ────────────────────────────────────────────────────────────────

pub fn encode_document(doc: &Document) -> Result<String> {
  Ok(serde_json::to_string(doc)?)
}

pub fn decode_document(s: &str) -> Result<Document> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `documents` row.
pub struct RawDocument {
  pub tag:    String,
  pub fields: String,
}

impl RawDocument {
  pub fn into_stored(self) -> Result<StoredAsset> {
    Ok(StoredAsset {
      tag:      AssetTag::new(&self.tag)?,
      document: decode_document(&self.fields)?,
    })
  }
}
