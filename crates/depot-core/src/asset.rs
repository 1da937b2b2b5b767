//! Asset types: tags, stored documents, and the typed views derived from
//! them.
//!
//! The backing store only knows flat field maps ([`Document`]). Everything
//! typed ([`AssetRecord`], [`ActivityEntry`]) is a read-side projection of a
//! document, computed with the category of the store it was found in.

use std::{borrow::Borrow, collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, category::Category};

/// Well-known document field names.
pub mod fields {
  pub const OWNER: &str = "owner";
  pub const MODEL: &str = "model";
  pub const SERIAL: &str = "serialNumber";
  pub const LOCATION: &str = "currentLocation";
  pub const CHECK_IN: &str = "checkIn";
  pub const CHECK_OUT: &str = "checkOut";
}

// ─── AssetTag ────────────────────────────────────────────────────────────────

/// The unique key of a physical asset. Never empty; surrounding whitespace
/// (a trailing newline from a scanner, say) is stripped on construction.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct AssetTag(String);

impl AssetTag {
  pub fn new(raw: impl AsRef<str>) -> Result<Self> {
    let trimmed = raw.as_ref().trim();
    if trimmed.is_empty() {
      return Err(Error::ValidationFailed("asset tag cannot be empty".into()));
    }
    Ok(Self(trimmed.to_owned()))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for AssetTag {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::new(value) }
}

impl From<AssetTag> for String {
  fn from(tag: AssetTag) -> Self { tag.0 }
}

impl AsRef<str> for AssetTag {
  fn as_ref(&self) -> &str { &self.0 }
}

impl Borrow<str> for AssetTag {
  fn borrow(&self) -> &str { &self.0 }
}

impl fmt::Display for AssetTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(&self.0)
  }
}

// ─── Documents ───────────────────────────────────────────────────────────────

/// A single typed value inside a [`Document`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
  String(String),
  Number(f64),
  Timestamp(DateTime<Utc>),
}

impl From<String> for FieldValue {
  fn from(s: String) -> Self { Self::String(s) }
}

impl From<&str> for FieldValue {
  fn from(s: &str) -> Self { Self::String(s.to_owned()) }
}

impl From<f64> for FieldValue {
  fn from(n: f64) -> Self { Self::Number(n) }
}

impl From<DateTime<Utc>> for FieldValue {
  fn from(ts: DateTime<Utc>) -> Self { Self::Timestamp(ts) }
}

/// The flat field map stored under an asset tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(BTreeMap<String, FieldValue>);

impl Document {
  pub fn new() -> Self { Self::default() }

  pub fn get(&self, field: &str) -> Option<&FieldValue> { self.0.get(field) }

  pub fn get_str(&self, field: &str) -> Option<&str> {
    match self.0.get(field) {
      Some(FieldValue::String(s)) => Some(s),
      _ => None,
    }
  }

  pub fn get_timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
    match self.0.get(field) {
      Some(FieldValue::Timestamp(ts)) => Some(*ts),
      _ => None,
    }
  }

  pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
    self.0.insert(field.into(), value.into());
  }

  /// Builder-style [`Document::set`].
  pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
    self.set(field, value);
    self
  }

  /// Overlay `patch` onto `self`. Fields absent from the patch are kept.
  pub fn merge(&mut self, patch: Document) { self.0.extend(patch.0); }

  pub fn contains(&self, field: &str) -> bool { self.0.contains_key(field) }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v))
  }
}

impl FromIterator<(String, FieldValue)> for Document {
  fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// Whether an asset was last checked in (returned home) or checked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
  CheckIn,
  CheckOut,
}

impl Direction {
  /// The timestamp field this transition writes.
  pub fn field_name(self) -> &'static str {
    match self {
      Self::CheckIn => fields::CHECK_IN,
      Self::CheckOut => fields::CHECK_OUT,
    }
  }
}

// ─── AssetRecord ─────────────────────────────────────────────────────────────

/// A typed read of a [`Document`], interpreted under the category of the
/// store that holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
  pub category:  Category,
  /// The category-specific attribute (owner, model, or serial).
  pub attribute: Option<String>,
  pub location:  Option<String>,
  pub check_in:  Option<DateTime<Utc>>,
  pub check_out: Option<DateTime<Utc>>,
  /// The full stored document, including fields not modelled above.
  pub document:  Document,
}

impl AssetRecord {
  pub fn from_document(category: Category, document: Document) -> Self {
    let attribute = document
      .get_str(category.required_attribute().field_name())
      .map(str::to_owned);
    Self {
      category,
      attribute,
      location: document.get_str(fields::LOCATION).map(str::to_owned),
      check_in: document.get_timestamp(fields::CHECK_IN),
      check_out: document.get_timestamp(fields::CHECK_OUT),
      document,
    }
  }

  /// The most recent of the check-in and check-out timestamps.
  pub fn last_activity(&self) -> Option<DateTime<Utc>> {
    latest(self.check_in, self.check_out)
  }

  /// The direction of the last transition, decided by whichever timestamp
  /// is more recent. Equal timestamps count as checked in.
  pub fn state(&self) -> Option<Direction> { state_of(self.check_in, self.check_out) }
}

// ─── ActivityEntry ───────────────────────────────────────────────────────────

/// The read-only summary of an asset used for the recent-activity feed.
/// Rebuilt on every aggregation pass; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
  pub tag:       AssetTag,
  pub category:  Category,
  pub check_in:  Option<DateTime<Utc>>,
  pub check_out: Option<DateTime<Utc>>,
}

impl ActivityEntry {
  pub fn from_document(tag: AssetTag, category: Category, doc: &Document) -> Self {
    Self {
      tag,
      category,
      check_in: doc.get_timestamp(fields::CHECK_IN),
      check_out: doc.get_timestamp(fields::CHECK_OUT),
    }
  }

  pub fn last_activity(&self) -> Option<DateTime<Utc>> {
    latest(self.check_in, self.check_out)
  }

  pub fn state(&self) -> Option<Direction> { state_of(self.check_in, self.check_out) }
}

fn state_of(
  check_in: Option<DateTime<Utc>>,
  check_out: Option<DateTime<Utc>>,
) -> Option<Direction> {
  match (check_in, check_out) {
    (Some(i), Some(o)) if o > i => Some(Direction::CheckOut),
    (Some(_), _) => Some(Direction::CheckIn),
    (None, Some(_)) => Some(Direction::CheckOut),
    (None, None) => None,
  }
}

fn latest(
  a: Option<DateTime<Utc>>,
  b: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
  match (a, b) {
    (Some(a), Some(b)) => Some(a.max(b)),
    (a, b) => a.or(b),
  }
}

// ─── Attributes ──────────────────────────────────────────────────────────────

/// Attributes supplied when registering or transitioning an asset. Only the
/// one required by the target category is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
  pub owner:  Option<String>,
  pub model:  Option<String>,
  pub serial: Option<String>,
}

impl Attributes {
  pub fn get(&self, field: crate::category::AttributeField) -> Option<&str> {
    use crate::category::AttributeField;
    match field {
      AttributeField::Owner => self.owner.as_deref(),
      AttributeField::Model => self.model.as_deref(),
      AttributeField::Serial => self.serial.as_deref(),
    }
  }
}
