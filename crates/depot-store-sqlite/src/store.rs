//! [`SqliteDatabase`] and [`SqliteCollection`]: the SQLite implementation
//! of [`AssetStore`].

use std::{
  collections::HashMap,
  path::Path,
  sync::{Arc, Mutex, PoisonError},
};

use chrono::Utc;
use depot_core::{
  asset::{AssetTag, Document},
  store::{AssetStore, SnapshotStream, StoredAsset},
};
use rusqlite::OptionalExtension as _;
use tokio::sync::broadcast;

use crate::{
  Error, Result,
  encode::{RawDocument, decode_document, encode_document, encode_dt},
  schema::{SCHEMA, UPSERT},
};

/// Pending change notifications per collection before subscribers lag.
const CHANGE_CAPACITY: usize = 16;

// ─── Database ────────────────────────────────────────────────────────────────

/// A single SQLite file holding every collection.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteDatabase {
  conn:     tokio_rusqlite::Connection,
  channels: Arc<Mutex<HashMap<String, broadcast::Sender<()>>>>,
}

impl SqliteDatabase {
  /// Open (or create) a database at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory database, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self { conn, channels: Arc::default() })
  }

  /// A handle to the collection called `name`.
  ///
  /// Every handle for the same name shares one change channel, so a write
  /// through any of them reaches every subscriber.
  pub fn collection(&self, name: impl Into<String>) -> SqliteCollection {
    let name = name.into();
    let changes = self
      .channels
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .entry(name.clone())
      .or_insert_with(|| broadcast::channel(CHANGE_CAPACITY).0)
      .clone();
    SqliteCollection { conn: self.conn.clone(), name: Arc::from(name), changes }
  }
}

// ─── Collection ──────────────────────────────────────────────────────────────

/// One named store inside a [`SqliteDatabase`].
#[derive(Clone)]
pub struct SqliteCollection {
  conn:    tokio_rusqlite::Connection,
  name:    Arc<str>,
  changes: broadcast::Sender<()>,
}

impl SqliteCollection {
  fn notify(&self) {
    // No receivers just means nobody is subscribed.
    let _ = self.changes.send(());
  }
}

async fn list_collection(
  conn: &tokio_rusqlite::Connection,
  name: Arc<str>,
) -> Result<Vec<StoredAsset>> {
  let raws: Vec<RawDocument> = conn
    .call(move |conn| {
      let mut stmt = conn.prepare(
        "SELECT tag, fields FROM documents WHERE collection = ?1 ORDER BY tag",
      )?;
      let rows = stmt
        .query_map(rusqlite::params![&*name], |row| {
          Ok(RawDocument { tag: row.get(0)?, fields: row.get(1)? })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      Ok(rows)
    })
    .await?;

  raws.into_iter().map(RawDocument::into_stored).collect()
}

// ─── AssetStore impl ─────────────────────────────────────────────────────────

impl AssetStore for SqliteCollection {
  type Error = Error;

  fn name(&self) -> &str { &self.name }

  async fn get(&self, tag: &AssetTag) -> Result<Option<Document>> {
    let name = self.name.clone();
    let tag_str = tag.as_str().to_owned();

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT fields FROM documents WHERE collection = ?1 AND tag = ?2",
              rusqlite::params![&*name, tag_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.as_deref().map(decode_document).transpose()
  }

  async fn put(&self, tag: &AssetTag, fields: Document) -> Result<()> {
    let name = self.name.clone();
    let tag_str = tag.as_str().to_owned();
    let fields_str = encode_document(&fields)?;
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          UPSERT,
          rusqlite::params![&*name, tag_str, fields_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    self.notify();
    Ok(())
  }

  async fn delete(&self, tag: &AssetTag) -> Result<bool> {
    let name = self.name.clone();
    let tag_str = tag.as_str().to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM documents WHERE collection = ?1 AND tag = ?2",
          rusqlite::params![&*name, tag_str],
        )?)
      })
      .await?;

    if removed > 0 {
      self.notify();
    }
    Ok(removed > 0)
  }

  async fn list_all(&self) -> Result<Vec<StoredAsset>> {
    list_collection(&self.conn, self.name.clone()).await
  }

  async fn subscribe(&self) -> Result<SnapshotStream<Error>> {
    // Register before the first read so no write can slip between them.
    let mut changes = self.changes.subscribe();
    let conn = self.conn.clone();
    let name = self.name.clone();

    let stream = async_stream::stream! {
      yield list_collection(&conn, name.clone()).await;
      loop {
        match changes.recv().await {
          Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {}
          Err(broadcast::error::RecvError::Closed) => break,
        }
        // Collapse a burst of writes into one snapshot.
        while let Ok(()) | Err(broadcast::error::TryRecvError::Lagged(_)) =
          changes.try_recv()
        {}
        yield list_collection(&conn, name.clone()).await;
      }
    };

    Ok(Box::pin(stream))
  }
}
