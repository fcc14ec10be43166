// Live read-path for backend tables: one fetch loop per table, shared by
// every consumer, invalidated by the change feed. No row-level patching:
// each invalidation refetches the whole table and the result is trusted as
// ground truth.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use thiserror::Error;
use tokio::sync::{broadcast, watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::live::feed::{ChangeEvent, ChangeFeedHub};
use crate::store::{SelectQuery, TableStore};
use crate::tables::Table;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Subscription closed")]
    Closed,
}

/// Point-in-time view of one table's cache entry.
#[derive(Debug, Clone)]
pub struct TableSnapshot {
    pub rows: Arc<Vec<Value>>,
    pub is_loading: bool,
    /// Last fetch failure, if any. Rows keep their previous value on
    /// failure, so stale data stays visible until a refetch succeeds.
    pub error: Option<String>,
}

impl TableSnapshot {
    fn initial() -> Self {
        Self {
            rows: Arc::new(Vec::new()),
            is_loading: true,
            error: None,
        }
    }
}

/// Shared cache of live table reads.
///
/// The cache key is the table: concurrent subscribers to the same table
/// share one entry, one fetch loop, and one change-feed receiver. The entry
/// is torn down when the last [`TableSubscription`] handle drops.
pub struct SyncEngine {
    store: Arc<dyn TableStore>,
    feed: ChangeFeedHub,
    active: Mutex<HashMap<Table, Weak<SharedSubscription>>>,
}

struct SharedSubscription {
    table: Table,
    refresh: Arc<Notify>,
    snapshot: watch::Receiver<TableSnapshot>,
    task: JoinHandle<()>,
}

impl Drop for SharedSubscription {
    fn drop(&mut self) {
        // Last consumer unmounted; leaving the loop running would leak the
        // feed receiver and keep refetching a table nobody reads.
        self.task.abort();
        debug!(table = %self.table, "closed live table subscription");
    }
}

/// Handle to one table's live cache entry. Clone to add a consumer; the
/// underlying loop survives until every handle is gone.
pub struct TableSubscription {
    shared: Arc<SharedSubscription>,
    rx: watch::Receiver<TableSnapshot>,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn TableStore>, feed: ChangeFeedHub) -> Self {
        Self {
            store,
            feed,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to a table with the default projection (all columns, no
    /// explicit order).
    pub async fn subscribe(&self, table: Table) -> TableSubscription {
        self.subscribe_with(table, SelectQuery::default()).await
    }

    /// Subscribe with an explicit projection.
    ///
    /// Entries are keyed by table alone, so the first subscriber's query is
    /// the one the shared loop runs; callers are expected to use a
    /// consistent projection per table.
    pub async fn subscribe_with(&self, table: Table, query: SelectQuery) -> TableSubscription {
        let mut active = self.active.lock().await;
        active.retain(|_, weak| weak.strong_count() > 0);

        if let Some(shared) = active.get(&table).and_then(Weak::upgrade) {
            let rx = shared.snapshot.clone();
            return TableSubscription { shared, rx };
        }

        let (tx, rx) = watch::channel(TableSnapshot::initial());
        let refresh = Arc::new(Notify::new());
        let task = spawn_fetch_loop(
            Arc::clone(&self.store),
            table,
            query,
            tx,
            self.feed.subscribe(),
            Arc::clone(&refresh),
        );

        let shared = Arc::new(SharedSubscription {
            table,
            refresh,
            snapshot: rx.clone(),
            task,
        });
        active.insert(table, Arc::downgrade(&shared));
        debug!(table = %table, "opened live table subscription");

        TableSubscription { shared, rx }
    }
}

fn spawn_fetch_loop(
    store: Arc<dyn TableStore>,
    table: Table,
    query: SelectQuery,
    tx: watch::Sender<TableSnapshot>,
    mut feed_rx: broadcast::Receiver<ChangeEvent>,
    refresh: Arc<Notify>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tx.send_modify(|snap| snap.is_loading = true);

            match store.fetch(table, &query).await {
                Ok(rows) => {
                    tx.send_modify(|snap| {
                        snap.rows = Arc::new(rows);
                        snap.is_loading = false;
                        snap.error = None;
                    });
                }
                Err(err) => {
                    warn!(table = %table, error = %err, "table refetch failed; keeping previous rows");
                    tx.send_modify(|snap| {
                        snap.is_loading = false;
                        snap.error = Some(err.to_string());
                    });
                }
            }

            // Block until this table is invalidated, by a matching change
            // event or a manual refresh.
            loop {
                tokio::select! {
                    _ = refresh.notified() => break,
                    event = feed_rx.recv() => match event {
                        Ok(ev) if ev.table == table => break,
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(table = %table, skipped, "change feed lagged; refetching");
                            break;
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    },
                }
            }

            // Coalesce notifications that queued up while we were waiting;
            // the refetch about to run observes their effects anyway.
            while feed_rx.try_recv().is_ok() {}
        }
    })
}

impl TableSubscription {
    pub fn table(&self) -> Table {
        self.shared.table
    }

    /// Current snapshot, without waiting.
    pub fn snapshot(&self) -> TableSnapshot {
        self.rx.borrow().clone()
    }

    /// Wait for the next snapshot change.
    pub async fn changed(&mut self) -> Result<TableSnapshot, SyncError> {
        self.rx.changed().await.map_err(|_| SyncError::Closed)?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Wait until the entry is not mid-fetch and return it.
    pub async fn ready(&mut self) -> Result<TableSnapshot, SyncError> {
        let snap = self
            .rx
            .wait_for(|snap| !snap.is_loading)
            .await
            .map_err(|_| SyncError::Closed)?;
        Ok(snap.clone())
    }

    /// Force a refetch without waiting for a change event.
    pub fn refresh(&self) {
        self.shared.refresh.notify_one();
    }
}

impl Clone for TableSubscription {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            rx: self.rx.clone(),
        }
    }
}
