//! Live totals and the recent-activity feed.
//!
//! # Overview
//!
//! The [`AggregationCache`] keeps one subscription per store. Each watcher
//! task forwards full store snapshots to a single recompute task, which
//! rebuilds the aggregate and publishes it as an immutable
//! [`AggregateSnapshot`]. Readers only ever see a fully built snapshot.
//!
//! ```text
//! store A ─▶ watcher ─┐
//! store B ─▶ watcher ─┼─▶ mpsc ─▶ recompute ─▶ watch<Arc<AggregateSnapshot>>
//! store C ─▶ watcher ─┘
//! ```
//!
//! Subscriptions are treated as infinite. When one errors or ends, its
//! watcher waits [`CacheOptions::resubscribe_delay`] and subscribes again;
//! the other stores are unaffected.

use std::{
  cmp::Reverse,
  collections::{BTreeMap, HashMap},
  sync::Arc,
  time::Duration,
};

use depot_core::{
  asset::{ActivityEntry, AssetTag},
  category::Category,
  layout::StoreLayout,
  store::{AssetStore, StoredAsset},
};
use futures::StreamExt as _;
use serde::Serialize;
use tokio::sync::{mpsc, watch};

use crate::fanout::StoreSet;

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// The document count of one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreCount {
  pub category: Category,
  pub store:    String,
  pub count:    usize,
  /// `false` until the store's first snapshot has arrived.
  pub loaded:   bool,
}

/// A consistent view of every store as of the last processed update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateSnapshot {
  /// Incremented on every recompute; 0 before any store has reported.
  pub version:  u64,
  /// Per-store counts, in store priority order.
  pub counts:   Vec<StoreCount>,
  /// One entry per tag, most recent activity first.
  pub activity: Vec<ActivityEntry>,
}

impl AggregateSnapshot {
  /// The snapshot before any store has reported.
  pub fn empty(layout: &StoreLayout) -> Self {
    Self::build(layout, &BTreeMap::new(), 0)
  }

  /// Rebuild from the last-known contents of each store.
  ///
  /// A tag found in more than one store keeps the entry with the later
  /// activity, ties going to the higher-priority store. Entries are ranked by
  /// `max(checkIn, checkOut)` descending, then store priority, then tag.
  /// Entries with no timestamp at all rank last.
  pub fn build(
    layout: &StoreLayout,
    per_store: &BTreeMap<Category, Vec<StoredAsset>>,
    version: u64,
  ) -> Self {
    let counts = layout
      .stores()
      .iter()
      .map(|spec| {
        let docs = per_store.get(&spec.category);
        StoreCount {
          category: spec.category,
          store:    spec.name.clone(),
          count:    docs.map_or(0, Vec::len),
          loaded:   docs.is_some(),
        }
      })
      .collect();

    let mut merged: HashMap<&AssetTag, (usize, ActivityEntry)> = HashMap::new();
    for (priority, spec) in layout.stores().iter().enumerate() {
      let Some(docs) = per_store.get(&spec.category) else { continue };
      for asset in docs {
        let entry =
          ActivityEntry::from_document(asset.tag.clone(), spec.category, &asset.document);
        match merged.get(&asset.tag) {
          Some((_, existing)) if existing.last_activity() >= entry.last_activity() => {}
          _ => {
            merged.insert(&asset.tag, (priority, entry));
          }
        }
      }
    }

    let mut ranked: Vec<(usize, ActivityEntry)> = merged.into_values().collect();
    ranked.sort_by(|(pa, a), (pb, b)| {
      let key_a = (a.last_activity().is_none(), Reverse(a.last_activity()));
      let key_b = (b.last_activity().is_none(), Reverse(b.last_activity()));
      key_a.cmp(&key_b).then(pa.cmp(pb)).then_with(|| a.tag.cmp(&b.tag))
    });

    Self {
      version,
      counts,
      activity: ranked.into_iter().map(|(_, e)| e).collect(),
    }
  }

  pub fn total_across_all_stores(&self) -> usize {
    self.counts.iter().map(|c| c.count).sum()
  }

  pub fn count(&self, category: Category) -> usize {
    self
      .counts
      .iter()
      .find(|c| c.category == category)
      .map_or(0, |c| c.count)
  }

  /// `true` once every store has delivered at least one snapshot.
  pub fn is_loaded(&self) -> bool { self.counts.iter().all(|c| c.loaded) }

  pub fn top_n_activity(&self, n: usize) -> &[ActivityEntry] {
    &self.activity[..n.min(self.activity.len())]
  }

  /// Entries whose tag contains `needle`, ignoring case, in ranked order.
  /// An empty needle matches everything.
  pub fn filtered_by(&self, needle: &str) -> Vec<&ActivityEntry> {
    let needle = needle.to_lowercase();
    self
      .activity
      .iter()
      .filter(|e| e.tag.as_str().to_lowercase().contains(&needle))
      .collect()
  }
}

// ─── Cache ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CacheOptions {
  /// Pause between a failed or finished subscription and the next attempt.
  pub resubscribe_delay: Duration,
  /// Snapshots buffered between the watchers and the recompute task.
  pub channel_capacity:  usize,
}

impl Default for CacheOptions {
  fn default() -> Self {
    Self { resubscribe_delay: Duration::from_secs(2), channel_capacity: 64 }
  }
}

/// Handle to the running aggregation. Cloning is cheap; the background tasks
/// stop when [`AggregationCache::shutdown`] is called or the last handle is
/// dropped.
#[derive(Clone)]
pub struct AggregationCache {
  snapshot: watch::Receiver<Arc<AggregateSnapshot>>,
  shutdown: Arc<watch::Sender<bool>>,
}

impl AggregationCache {
  /// Subscribe to every store in `stores` and start aggregating.
  pub fn spawn<S>(stores: Arc<StoreSet<S>>, options: CacheOptions) -> Self
  where
    S: AssetStore + 'static,
  {
    let layout = stores.layout().clone();
    let (publish, snapshot) = watch::channel(Arc::new(AggregateSnapshot::empty(&layout)));
    let (shutdown, _) = watch::channel(false);
    let (updates_tx, updates_rx) = mpsc::channel(options.channel_capacity.max(1));

    for category in layout.categories() {
      tokio::spawn(watch_store(
        stores.clone(),
        category,
        updates_tx.clone(),
        options.resubscribe_delay,
        shutdown.subscribe(),
      ));
    }
    tokio::spawn(recompute(layout, updates_rx, publish));

    Self { snapshot, shutdown: Arc::new(shutdown) }
  }

  /// The last fully processed snapshot.
  pub fn snapshot(&self) -> Arc<AggregateSnapshot> { self.snapshot.borrow().clone() }

  pub fn total_across_all_stores(&self) -> usize {
    self.snapshot.borrow().total_across_all_stores()
  }

  pub fn count(&self, category: Category) -> usize { self.snapshot.borrow().count(category) }

  pub fn top_n_activity(&self, n: usize) -> Vec<ActivityEntry> {
    self.snapshot.borrow().top_n_activity(n).to_vec()
  }

  pub fn filtered_by(&self, needle: &str) -> Vec<ActivityEntry> {
    self.snapshot.borrow().filtered_by(needle).into_iter().cloned().collect()
  }

  /// Wait for the next published snapshot. Returns `None` once the cache has
  /// stopped.
  pub async fn changed(&self) -> Option<Arc<AggregateSnapshot>> {
    let mut rx = self.snapshot.clone();
    rx.borrow_and_update();
    rx.changed().await.ok()?;
    Some(rx.borrow_and_update().clone())
  }

  /// A receiver that is notified on every published snapshot.
  pub fn watch(&self) -> watch::Receiver<Arc<AggregateSnapshot>> { self.snapshot.clone() }

  /// Wait until a published snapshot satisfies `pred`. Returns `None` if the
  /// cache stopped first.
  pub async fn wait_for(
    &self,
    mut pred: impl FnMut(&AggregateSnapshot) -> bool,
  ) -> Option<Arc<AggregateSnapshot>> {
    let mut rx = self.snapshot.clone();
    rx.wait_for(|s| pred(s)).await.ok().map(|s| s.clone())
  }

  /// Stop every watcher; the recompute task exits once they are gone.
  pub fn shutdown(&self) { self.shutdown.send_replace(true); }
}

/// Keep one store's subscription alive, forwarding every snapshot.
async fn watch_store<S: AssetStore>(
  stores: Arc<StoreSet<S>>,
  category: Category,
  updates: mpsc::Sender<(Category, Vec<StoredAsset>)>,
  delay: Duration,
  mut shutdown: watch::Receiver<bool>,
) {
  let store = match stores.store(category) {
    Ok(store) => store,
    Err(e) => {
      tracing::error!(store = %category, error = %e, "cannot watch store");
      return;
    }
  };

  loop {
    let subscribed = tokio::select! {
      res = store.subscribe() => res,
      _ = shutdown.changed() => return,
    };

    match subscribed {
      Ok(mut stream) => {
        tracing::debug!(store = %category, "subscribed");
        loop {
          tokio::select! {
            item = stream.next() => match item {
              Some(Ok(snapshot)) => {
                if updates.send((category, snapshot)).await.is_err() {
                  return;
                }
              }
              Some(Err(e)) => {
                tracing::warn!(store = %category, error = %e, "subscription failed; resubscribing");
                break;
              }
              None => {
                tracing::warn!(store = %category, "subscription ended; resubscribing");
                break;
              }
            },
            _ = shutdown.changed() => return,
          }
        }
      }
      Err(e) => {
        tracing::warn!(store = %category, error = %e, "could not subscribe; retrying");
      }
    }

    tokio::select! {
      _ = tokio::time::sleep(delay) => {}
      _ = shutdown.changed() => return,
    }
  }
}

/// The single writer: folds store snapshots into the published aggregate.
async fn recompute(
  layout: StoreLayout,
  mut updates: mpsc::Receiver<(Category, Vec<StoredAsset>)>,
  publish: watch::Sender<Arc<AggregateSnapshot>>,
) {
  let mut per_store: BTreeMap<Category, Vec<StoredAsset>> = BTreeMap::new();
  let mut version = 0;

  while let Some((category, snapshot)) = updates.recv().await {
    per_store.insert(category, snapshot);
    // Only the newest queued snapshot of each store matters.
    while let Ok((category, snapshot)) = updates.try_recv() {
      per_store.insert(category, snapshot);
    }

    version += 1;
    let aggregate = AggregateSnapshot::build(&layout, &per_store, version);
    tracing::debug!(
      version,
      total = aggregate.total_across_all_stores(),
      "aggregate recomputed"
    );
    publish.send_replace(Arc::new(aggregate));
  }
  tracing::debug!("aggregation stopped");
}
