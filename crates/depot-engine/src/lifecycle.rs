//! Check-in, check-out, and moves between stores.
//!
//! The [`TransitionEngine`] is the only writer of asset records. It resolves
//! the tag first, then either writes in place (register or update) or moves
//! the record to another store. A move is two writes, copy then delete, with
//! no transaction spanning them: if the delete fails the tag is left in both
//! stores and the caller receives [`Error::PartialMove`].

use std::{str::FromStr, sync::Arc};

use chrono::{DateTime, Utc};
use depot_core::{
  Error, Result,
  alias::AliasTable,
  asset::{AssetTag, Attributes, Direction, Document, fields},
  category::Category,
  store::AssetStore,
};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::{
  fanout::StoreSet,
  reconcile::ReconcileRequest,
  resolver::{AssetResolver, Located},
};

// ─── Location policy ─────────────────────────────────────────────────────────

/// Decides whether a location counts as checking an asset in or out.
///
/// Exactly one location is "home"; arriving there is a check-in and anything
/// else is a check-out. The comparison is exact and ignores prior state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationPolicy {
  home_location: String,
}

impl LocationPolicy {
  pub const DEFAULT_HOME: &'static str = "DepartmentIT";

  pub fn new(home_location: impl Into<String>) -> Self {
    Self { home_location: home_location.into() }
  }

  pub fn home_location(&self) -> &str { &self.home_location }

  pub fn classify(&self, location: &str) -> Direction {
    if location == self.home_location {
      Direction::CheckIn
    } else {
      Direction::CheckOut
    }
  }
}

impl Default for LocationPolicy {
  fn default() -> Self { Self::new(Self::DEFAULT_HOME) }
}

// ─── Reports ─────────────────────────────────────────────────────────────────

/// What a successful call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionKind {
  /// The tag was new and is now filed under the target category.
  Registered,
  /// The tag was already filed under the target category and was updated.
  Updated,
  /// The record was copied from `from` and the original deleted.
  Moved { from: Category },
  /// Nothing needed to change.
  Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionReport {
  pub tag:       AssetTag,
  pub category:  Category,
  #[serde(flatten)]
  pub kind:      TransitionKind,
  /// Present when a check-in or check-out timestamp was written.
  pub direction: Option<Direction>,
  pub at:        Option<DateTime<Utc>>,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct TransitionEngine<S> {
  stores:    Arc<StoreSet<S>>,
  resolver:  AssetResolver<S>,
  policy:    LocationPolicy,
  aliases:   Arc<AliasTable>,
  reconcile: Option<mpsc::Sender<ReconcileRequest>>,
}

impl<S: AssetStore> TransitionEngine<S> {
  pub fn new(
    stores: Arc<StoreSet<S>>,
    policy: LocationPolicy,
    aliases: Arc<AliasTable>,
  ) -> Self {
    Self {
      resolver: AssetResolver::new(stores.clone()),
      stores,
      policy,
      aliases,
      reconcile: None,
    }
  }

  /// Forward every [`Error::PartialMove`] to a reconciler.
  pub fn with_reconciler(mut self, tx: mpsc::Sender<ReconcileRequest>) -> Self {
    self.reconcile = Some(tx);
    self
  }

  pub fn resolver(&self) -> &AssetResolver<S> { &self.resolver }

  pub fn stores(&self) -> &Arc<StoreSet<S>> { &self.stores }

  pub fn policy(&self) -> &LocationPolicy { &self.policy }

  pub fn aliases(&self) -> &AliasTable { &self.aliases }

  /// Turn free text (a scanned label or typed item type) into a category.
  ///
  /// Known aliases win; otherwise the text must name a category itself.
  pub fn classify_category(&self, raw: &str) -> Result<Category> {
    if let Some(category) = self.aliases.canonicalize(raw) {
      return Ok(category);
    }
    Category::from_str(raw.trim())
      .map_err(|_| Error::ValidationFailed(format!("unknown item type {raw:?}")))
  }

  /// Record that `tag` is now at `location`, filed under `category`.
  ///
  /// Registers the tag if no store holds it, updates it in place if
  /// `category` already holds it, and moves it otherwise. The home location
  /// sets `checkIn`; any other location sets `checkOut`. The other timestamp
  /// is left as it was.
  pub async fn register_or_transition(
    &self,
    tag: &str,
    category: Category,
    location: &str,
    attributes: &Attributes,
  ) -> Result<TransitionReport> {
    let tag = AssetTag::new(tag)?;
    let patch_attr = required_attribute(category, attributes)?;
    if location.trim().is_empty() {
      return Err(Error::ValidationFailed("location cannot be empty".into()));
    }

    let direction = self.policy.classify(location);
    let at = Utc::now();
    let patch = Document::new()
      .with(patch_attr.0, patch_attr.1)
      .with(fields::LOCATION, location)
      .with(direction.field_name(), at);

    let kind = match self.resolver.locate(&tag).await {
      Ok(found) if found.category == category => {
        self.write(category, &tag, patch).await?;
        TransitionKind::Updated
      }
      Ok(found) => {
        let from = found.category;
        self.relocate(found, category, Some(patch)).await?;
        TransitionKind::Moved { from }
      }
      Err(Error::NotFound(_)) => {
        self.write(category, &tag, patch).await?;
        TransitionKind::Registered
      }
      Err(e) => return Err(e),
    };

    tracing::info!(
      tag = %tag,
      category = %category,
      ?kind,
      ?direction,
      location,
      "asset transitioned"
    );
    Ok(TransitionReport {
      tag,
      category,
      kind,
      direction: Some(direction),
      at: Some(at),
    })
  }

  /// Move `tag` into `target`, carrying its record over unchanged.
  pub async fn move_to(&self, tag: &str, target: Category) -> Result<TransitionReport> {
    let tag = AssetTag::new(tag)?;
    let found = self.resolver.locate(&tag).await?;

    let kind = if found.category == target {
      TransitionKind::Unchanged
    } else {
      let from = found.category;
      self.relocate(found, target, None).await?;
      tracing::info!(tag = %tag, from = %from, to = %target, "asset moved");
      TransitionKind::Moved { from }
    };

    Ok(TransitionReport { tag, category: target, kind, direction: None, at: None })
  }

  async fn write(&self, category: Category, tag: &AssetTag, patch: Document) -> Result<()> {
    self
      .stores
      .store(category)?
      .put(tag, patch)
      .await
      .map_err(|e| Error::backend(category, e))
  }

  /// Copy the located record into `to`, then delete it from its current
  /// store. The delete is only attempted after the copy is confirmed.
  async fn relocate(
    &self,
    found: Located,
    to: Category,
    patch: Option<Document>,
  ) -> Result<()> {
    let from = found.category;
    let tag = found.tag;
    let source = self.stores.store(from)?;
    let target = self.stores.store(to)?;

    let mut copy = found.record.document;
    if let Some(patch) = patch {
      copy.merge(patch);
    }

    target.put(&tag, copy).await.map_err(|e| Error::backend(to, e))?;

    match source.delete(&tag).await {
      Ok(true) => Ok(()),
      Ok(false) => {
        tracing::warn!(tag = %tag, store = %from, "source copy already gone during move");
        Ok(())
      }
      Err(e) => {
        tracing::error!(
          tag = %tag,
          from = %from,
          to = %to,
          error = %e,
          "move copied but could not delete source; asset is in both stores"
        );
        if let Some(tx) = &self.reconcile {
          let request = ReconcileRequest { tag: tag.clone(), from, to };
          match tx.try_send(request) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
              tracing::warn!(tag = %tag, "reconcile queue is full; partial move left for sweep");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
              tracing::warn!(tag = %tag, "reconciler is gone; partial move left for manual repair");
            }
          }
        }
        Err(Error::PartialMove { tag, from, to, source: e.into() })
      }
    }
  }
}

/// The attribute `category` requires, as a `(field, value)` pair.
fn required_attribute(
  category: Category,
  attributes: &Attributes,
) -> Result<(&'static str, String)> {
  let field = category.required_attribute();
  match attributes.get(field).map(str::trim) {
    Some(value) if !value.is_empty() => Ok((field.field_name(), value.to_owned())),
    _ => Err(Error::ValidationFailed(format!(
      "{} is required for {category}",
      field.field_name()
    ))),
  }
}
