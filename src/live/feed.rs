// In-process fan-out of row-change notifications. The hub is the single
// seam between whatever produces change events (Postgres NOTIFY, the
// in-memory store's own mutations) and the table subscriptions consuming
// them.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config;
use crate::store::StoreError;
use crate::tables::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// One row-level change on a backend table. Carries no row data: consumers
/// refetch the full table rather than patching individual rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub op: ChangeOp,
}

/// Broadcast hub for change events. Cheap to clone; all clones share the
/// same underlying channel.
#[derive(Debug, Clone)]
pub struct ChangeFeedHub {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeedHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: ChangeEvent) {
        if self.tx.send(event).is_err() {
            trace!(table = %event.table, "change event dropped; no active subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeFeedHub {
    fn default() -> Self {
        Self::new(config::config().sync.feed_buffer)
    }
}

/// NOTIFY payload emitted by the per-table triggers:
/// `{"table": "clients", "op": "INSERT"}`.
#[derive(Debug, Deserialize)]
struct NotifyPayload {
    table: String,
    op: ChangeOp,
}

/// Bridge Postgres NOTIFY traffic into the hub.
///
/// Listens on the configured channel and republishes each payload as a
/// [`ChangeEvent`]. Payloads naming tables outside the known set are logged
/// and dropped. The returned task runs until aborted; `PgListener`
/// reconnects on its own, so a connection error here only pauses the loop.
pub async fn listen_postgres(
    pool: &PgPool,
    hub: ChangeFeedHub,
) -> Result<JoinHandle<()>, StoreError> {
    let channel = config::config().sync.notify_channel.clone();
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(&channel).await?;
    info!(%channel, "listening for row change notifications");

    Ok(tokio::spawn(async move {
        loop {
            match listener.recv().await {
                Ok(notification) => {
                    let payload = notification.payload();
                    match serde_json::from_str::<NotifyPayload>(payload) {
                        Ok(parsed) => match parsed.table.parse::<Table>() {
                            Ok(table) => {
                                debug!(table = %table, op = ?parsed.op, "row change notification");
                                hub.publish(ChangeEvent {
                                    table,
                                    op: parsed.op,
                                });
                            }
                            Err(err) => warn!(%err, "change notification for unknown table"),
                        },
                        Err(err) => warn!(%err, payload, "malformed change notification"),
                    }
                }
                Err(err) => {
                    warn!(%err, "change listener connection error; retrying");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_parses_uppercase_ops() {
        let p: NotifyPayload =
            serde_json::from_str(r#"{"table": "clients", "op": "INSERT"}"#).unwrap();
        assert_eq!(p.table, "clients");
        assert_eq!(p.op, ChangeOp::Insert);
    }

    #[tokio::test]
    async fn hub_delivers_to_subscribers() {
        let hub = ChangeFeedHub::new(8);
        let mut rx = hub.subscribe();
        hub.publish(ChangeEvent {
            table: Table::Clients,
            op: ChangeOp::Update,
        });
        let event = rx.recv().await.unwrap();
        assert_eq!(event.table, Table::Clients);
        assert_eq!(event.op, ChangeOp::Update);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_harmless() {
        let hub = ChangeFeedHub::new(8);
        hub.publish(ChangeEvent {
            table: Table::StaffMembers,
            op: ChangeOp::Delete,
        });
        assert_eq!(hub.receiver_count(), 0);
    }
}
