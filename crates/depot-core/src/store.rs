//! The `AssetStore` trait, the gateway to one named store.
//!
//! The trait is implemented by storage backends (e.g. `depot-store-sqlite`).
//! The engine fans out over one instance per category and never depends on a
//! concrete backend.

use std::{future::Future, pin::Pin};

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::asset::{AssetTag, Document};

/// One document together with the tag it is stored under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAsset {
  pub tag:      AssetTag,
  pub document: Document,
}

/// A live stream of full store snapshots.
///
/// The first item is the store's contents at subscription time; every later
/// item is the complete contents after a change. The stream has no final
/// event under normal operation. If it ends or yields an error, consumers
/// resubscribe.
pub type SnapshotStream<E> =
  Pin<Box<dyn Stream<Item = Result<Vec<StoredAsset>, E>> + Send>>;

/// Abstraction over one named, keyed document store.
///
/// Implementations do not retry; transport and backend failures surface as
/// `Self::Error` and the caller decides what to do.
pub trait AssetStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The store's collection name.
  fn name(&self) -> &str;

  /// Fetch the document stored under `tag`, if any.
  fn get<'a>(
    &'a self,
    tag: &'a AssetTag,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + 'a;

  /// Merge `fields` into the document stored under `tag`, creating it if
  /// absent. Fields not present in `fields` are left untouched.
  fn put<'a>(
    &'a self,
    tag: &'a AssetTag,
    fields: Document,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove the document stored under `tag`. Returns `false` if there was
  /// nothing to remove.
  fn delete<'a>(
    &'a self,
    tag: &'a AssetTag,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Every document in the store, ordered by tag.
  fn list_all(
    &self,
  ) -> impl Future<Output = Result<Vec<StoredAsset>, Self::Error>> + Send + '_;

  /// Subscribe to the store's change stream. See [`SnapshotStream`].
  fn subscribe(
    &self,
  ) -> impl Future<Output = Result<SnapshotStream<Self::Error>, Self::Error>>
  + Send
  + '_;
}
