//! Repair of interrupted moves.
//!
//! A move whose delete half failed leaves the tag in two stores. The
//! transition engine hands each such move to the [`Reconciler`] as a
//! [`ReconcileRequest`]; the reconciler re-resolves the tag and, when the
//! copy is confirmed in the target store, finishes the delete. A source copy
//! with later activity than the target is merged into the target first.
//!
//! The reconciler never removes the only copy of a record.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use depot_core::{
  ConsistencyWarning, Error, Result,
  asset::{AssetRecord, AssetTag},
  category::Category,
  store::AssetStore,
};
use serde::Serialize;
use tokio::{
  sync::mpsc,
  task::{JoinHandle, JoinSet},
};

use crate::{fanout::StoreSet, resolver::AssetResolver};

/// A move that copied into `to` but did not finish deleting from `from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileRequest {
  pub tag:  AssetTag,
  pub from: Category,
  pub to:   Category,
}

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
  pub retry_delay:    Duration,
  pub max_attempts:   u32,
  /// Pending requests beyond this are refused; `sweep` still reports them.
  pub queue_capacity: usize,
}

impl Default for ReconcileOptions {
  fn default() -> Self {
    Self { retry_delay: Duration::from_secs(5), max_attempts: 5, queue_capacity: 256 }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum ReconcileOutcome {
  /// The stale source copy was deleted.
  Repaired,
  /// Nothing to do: only the target store holds the tag.
  AlreadyConsistent,
  /// The target store never received the copy, so there is nothing safe to
  /// delete.
  Dropped,
  /// Every attempt failed; the tag stays in both stores.
  Abandoned(String),
}

pub struct Reconciler<S> {
  stores:   Arc<StoreSet<S>>,
  resolver: AssetResolver<S>,
  options:  ReconcileOptions,
}

impl<S> Clone for Reconciler<S> {
  fn clone(&self) -> Self {
    Self {
      stores:   self.stores.clone(),
      resolver: self.resolver.clone(),
      options:  self.options.clone(),
    }
  }
}

impl<S: AssetStore + 'static> Reconciler<S> {
  pub fn new(stores: Arc<StoreSet<S>>, options: ReconcileOptions) -> Self {
    Self { resolver: AssetResolver::new(stores.clone()), stores, options }
  }

  /// One repair attempt.
  ///
  /// Fails if either store involved cannot be reached, since the copy has to
  /// be confirmed before the source is touched.
  pub async fn reconcile(&self, request: &ReconcileRequest) -> Result<ReconcileOutcome> {
    let resolution = self.resolver.resolve_all(&request.tag).await;
    for (category, err) in resolution.failures {
      if category == request.from || category == request.to {
        return Err(err);
      }
    }

    let copy_of = |category: Category| {
      resolution
        .hits
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, doc)| AssetRecord::from_document(category, doc.clone()))
    };
    let Some(target) = copy_of(request.to) else {
      return Ok(ReconcileOutcome::Dropped);
    };
    let Some(source) = copy_of(request.from) else {
      return Ok(ReconcileOutcome::AlreadyConsistent);
    };

    // While both copies exist, lookups land on the higher-priority one. When
    // that is the source, it may have taken writes after the move.
    if source.last_activity() > target.last_activity() {
      tracing::info!(
        tag = %request.tag,
        from = %request.from,
        to = %request.to,
        "source copy is newer; carrying it over before delete"
      );
      self
        .stores
        .store(request.to)?
        .put(&request.tag, source.document)
        .await
        .map_err(|e| Error::backend(request.to, e))?;
    }

    self
      .stores
      .store(request.from)?
      .delete(&request.tag)
      .await
      .map_err(|e| Error::backend(request.from, e))?;
    Ok(ReconcileOutcome::Repaired)
  }

  /// Retry [`Reconciler::reconcile`] until it succeeds or the attempts run out.
  pub async fn reconcile_with_retry(&self, request: &ReconcileRequest) -> ReconcileOutcome {
    let attempts = self.options.max_attempts.max(1);
    let mut attempt = 1;
    loop {
      match self.reconcile(request).await {
        Ok(outcome) => return outcome,
        Err(e) if attempt >= attempts => {
          return ReconcileOutcome::Abandoned(e.to_string());
        }
        Err(e) => {
          tracing::debug!(tag = %request.tag, attempt, error = %e, "reconcile attempt failed");
          attempt += 1;
          tokio::time::sleep(self.options.retry_delay).await;
        }
      }
    }
  }

  /// Process requests until every sender is dropped. Each request runs on
  /// its own task, so one store that keeps failing does not hold up the rest.
  pub async fn run(self, mut requests: mpsc::Receiver<ReconcileRequest>) {
    let mut in_flight = JoinSet::new();
    loop {
      tokio::select! {
        request = requests.recv() => match request {
          Some(request) => {
            let reconciler = self.clone();
            in_flight.spawn(async move { reconciler.handle(request).await });
          }
          None => break,
        },
        Some(joined) = in_flight.join_next() => {
          if let Err(e) = joined {
            tracing::error!(error = %e, "reconcile task failed");
          }
        }
      }
    }
    while in_flight.join_next().await.is_some() {}
    tracing::debug!("reconciler stopped");
  }

  async fn handle(&self, request: ReconcileRequest) {
    match self.reconcile_with_retry(&request).await {
      ReconcileOutcome::Repaired => tracing::info!(
        tag = %request.tag,
        from = %request.from,
        to = %request.to,
        "partial move repaired"
      ),
      ReconcileOutcome::AlreadyConsistent => {
        tracing::debug!(tag = %request.tag, "partial move already consistent")
      }
      ReconcileOutcome::Dropped => tracing::warn!(
        tag = %request.tag,
        to = %request.to,
        "target store does not hold the tag; dropping reconcile request"
      ),
      ReconcileOutcome::Abandoned(reason) => tracing::error!(
        tag = %request.tag,
        from = %request.from,
        to = %request.to,
        %reason,
        "giving up on partial move; asset remains in both stores"
      ),
    }
  }

  /// Start [`Reconciler::run`] on its own task and return the sender to feed it.
  pub fn spawn(self) -> (mpsc::Sender<ReconcileRequest>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(self.options.queue_capacity.max(1));
    (tx, tokio::spawn(self.run(rx)))
  }

  /// List every tag held by more than one store. Detects only; nothing is
  /// deleted, since without a move request there is no way to tell which
  /// copy is stale.
  pub async fn sweep(&self) -> Result<Vec<ConsistencyWarning>> {
    let listed = self.stores.fan_out(|_, store| store.list_all()).await.into_result()?;

    let mut holders: BTreeMap<AssetTag, Vec<Category>> = BTreeMap::new();
    for (category, assets) in listed {
      for asset in assets {
        holders.entry(asset.tag).or_default().push(category);
      }
    }

    let warnings: Vec<_> = holders
      .into_iter()
      .filter(|(_, stores)| stores.len() > 1)
      .map(|(tag, stores)| ConsistencyWarning { tag, stores })
      .collect();
    for warning in &warnings {
      tracing::warn!("{warning}");
    }
    Ok(warnings)
  }
}
