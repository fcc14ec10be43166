mod common;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::{sleep, timeout};

use protocol_desk::live::{ChangeFeedHub, SyncEngine, TableSnapshot, TableSubscription};
use protocol_desk::store::memory::MemoryStore;
use protocol_desk::store::{SelectQuery, StoreError, TableStore};
use protocol_desk::tables::Table;

// These tests exercise the live read-path: one shared fetch loop per table,
// invalidation through the change feed, and teardown on last drop.

/// Wrapper that counts fetches per table.
struct CountingStore {
    inner: MemoryStore,
    fetches: Mutex<HashMap<Table, usize>>,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fetches: Mutex::new(HashMap::new()),
        }
    }

    fn feed(&self) -> ChangeFeedHub {
        self.inner.feed()
    }

    fn fetch_count(&self, table: Table) -> usize {
        *self.fetches.lock().unwrap().get(&table).unwrap_or(&0)
    }
}

#[async_trait]
impl TableStore for CountingStore {
    async fn fetch(&self, table: Table, query: &SelectQuery) -> Result<Vec<Value>, StoreError> {
        *self.fetches.lock().unwrap().entry(table).or_insert(0) += 1;
        self.inner.fetch(table, query).await
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, StoreError> {
        self.inner.insert(table, row).await
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<Value, StoreError> {
        self.inner.update(table, id, patch).await
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError> {
        self.inner.delete(table, id).await
    }
}

async fn wait_for_rows(sub: &mut TableSubscription, expected: usize) -> Result<TableSnapshot> {
    let snap = timeout(Duration::from_secs(2), async {
        loop {
            let snap = sub.snapshot();
            if !snap.is_loading && snap.rows.len() == expected {
                return snap;
            }
            sub.changed().await.expect("subscription closed");
        }
    })
    .await?;
    Ok(snap)
}

#[tokio::test]
async fn initial_fetch_populates_snapshot() -> Result<()> {
    common::init_tracing();
    let store = Arc::new(MemoryStore::new());
    store
        .seed(
            Table::Clients,
            vec![
                json!({ "id": "c1", "full_name": "Sheikh Al-Rashid" }),
                json!({ "id": "c2", "full_name": "Min. Okafor" }),
            ],
        )
        .await;
    let engine = SyncEngine::new(Arc::clone(&store) as Arc<dyn TableStore>, store.feed());

    let mut sub = engine.subscribe(Table::Clients).await;
    let snap = sub.ready().await?;
    assert_eq!(snap.rows.len(), 2);
    assert!(snap.error.is_none());
    Ok(())
}

#[tokio::test]
async fn concurrent_consumers_share_one_fetch() -> Result<()> {
    let store = Arc::new(CountingStore::new());
    let engine = SyncEngine::new(Arc::clone(&store) as Arc<dyn TableStore>, store.feed());

    let mut first = engine.subscribe(Table::StaffMembers).await;
    let mut second = engine.subscribe(Table::StaffMembers).await;
    first.ready().await?;
    second.ready().await?;

    assert_eq!(store.fetch_count(Table::StaffMembers), 1);
    Ok(())
}

#[tokio::test]
async fn write_invalidates_and_refetches() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let engine = SyncEngine::new(Arc::clone(&store) as Arc<dyn TableStore>, store.feed());

    let mut sub = engine.subscribe(Table::InventoryItems).await;
    sub.ready().await?;

    store
        .insert(Table::InventoryItems, json!({ "name": "Podium", "quantity": 1 }))
        .await?;

    let snap = wait_for_rows(&mut sub, 1).await?;
    assert_eq!(snap.rows[0]["name"], "Podium");
    Ok(())
}

#[tokio::test]
async fn burst_of_writes_converges_to_full_snapshot() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let engine = SyncEngine::new(Arc::clone(&store) as Arc<dyn TableStore>, store.feed());

    let mut sub = engine.subscribe(Table::GalleryPhotos).await;
    sub.ready().await?;

    for i in 0..5 {
        store
            .insert(Table::GalleryPhotos, json!({ "id": format!("g{i}"), "url": "u" }))
            .await?;
    }

    // However the notifications coalesce, the final refetch is ground truth.
    let snap = wait_for_rows(&mut sub, 5).await?;
    assert!(snap.error.is_none());
    Ok(())
}

#[tokio::test]
async fn events_for_other_tables_do_not_invalidate() -> Result<()> {
    let store = Arc::new(CountingStore::new());
    let engine = SyncEngine::new(Arc::clone(&store) as Arc<dyn TableStore>, store.feed());

    let mut meetings = engine.subscribe(Table::MeetingRequests).await;
    let mut clients = engine.subscribe(Table::Clients).await;
    meetings.ready().await?;
    clients.ready().await?;

    store
        .insert(Table::Clients, json!({ "full_name": "New client" }))
        .await?;
    wait_for_rows(&mut clients, 1).await?;

    assert_eq!(store.fetch_count(Table::Clients), 2);
    assert_eq!(store.fetch_count(Table::MeetingRequests), 1);
    Ok(())
}

#[tokio::test]
async fn manual_refresh_triggers_refetch() -> Result<()> {
    let store = Arc::new(CountingStore::new());
    let engine = SyncEngine::new(Arc::clone(&store) as Arc<dyn TableStore>, store.feed());

    let mut sub = engine.subscribe(Table::JobPostings).await;
    sub.ready().await?;
    assert_eq!(store.fetch_count(Table::JobPostings), 1);

    sub.refresh();
    timeout(Duration::from_secs(2), async {
        while store.fetch_count(Table::JobPostings) < 2 {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;
    Ok(())
}

/// Store that succeeds once, then fails every later fetch.
struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

#[async_trait]
impl TableStore for FlakyStore {
    async fn fetch(&self, table: Table, query: &SelectQuery) -> Result<Vec<Value>, StoreError> {
        if self.failing.swap(true, Ordering::SeqCst) {
            return Err(StoreError::Fetch("backend unavailable".to_string()));
        }
        self.inner.fetch(table, query).await
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, StoreError> {
        self.inner.insert(table, row).await
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<Value, StoreError> {
        self.inner.update(table, id, patch).await
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError> {
        self.inner.delete(table, id).await
    }
}

#[tokio::test]
async fn failed_refetch_keeps_previous_rows_visible() -> Result<()> {
    let inner = MemoryStore::new();
    inner
        .seed(Table::CareerApplications, vec![json!({ "id": "ap1" })])
        .await;
    let feed = inner.feed();
    let store = Arc::new(FlakyStore {
        inner,
        failing: AtomicBool::new(false),
    });
    let engine = SyncEngine::new(Arc::clone(&store) as Arc<dyn TableStore>, feed);

    let mut sub = engine.subscribe(Table::CareerApplications).await;
    let snap = sub.ready().await?;
    assert_eq!(snap.rows.len(), 1);

    sub.refresh();
    let snap = timeout(Duration::from_secs(2), async {
        loop {
            let snap = sub.snapshot();
            if snap.error.is_some() {
                return snap;
            }
            sub.changed().await.expect("subscription closed");
        }
    })
    .await?;

    // Stale-but-present: the failed refetch must not blank out the data.
    assert_eq!(snap.rows.len(), 1);
    Ok(())
}

#[tokio::test]
async fn dropping_last_handle_closes_the_feed_subscription() -> Result<()> {
    let store = Arc::new(CountingStore::new());
    let feed = store.feed();
    let engine = SyncEngine::new(Arc::clone(&store) as Arc<dyn TableStore>, feed.clone());

    let mut sub = engine.subscribe(Table::EmailNotifications).await;
    sub.ready().await?;
    let second = sub.clone();
    drop(sub);
    // Still one live handle; the loop must stay up.
    assert_eq!(store.fetch_count(Table::EmailNotifications), 1);
    drop(second);

    timeout(Duration::from_secs(2), async {
        while feed.receiver_count() > 0 {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;

    // A fresh subscription starts a fresh loop with its own initial fetch.
    let mut again = engine.subscribe(Table::EmailNotifications).await;
    again.ready().await?;
    assert_eq!(store.fetch_count(Table::EmailNotifications), 2);
    Ok(())
}
