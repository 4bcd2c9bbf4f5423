use std::time::Duration;

use serde::Deserialize;
use spins_common::database::{DOCUMENT_CHANGES_CHANNEL, Database};
use sqlx::postgres::PgListener;
use tokio::sync::mpsc;

use crate::domain::store::{ChangeEvent, ChangeFeed, ChangeKind, DocumentId, StoreError};

/// Payload the documents trigger sends with `pg_notify`.
#[derive(Debug, Deserialize)]
struct Notification {
    collection: String,
    id: String,
    op: String,
}

const RECONNECT_BASE_DELAY: Duration = Duration::from_millis(250);
const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Opens a dedicated connection listening for changes of `collection`.
///
/// The connection is re-established when it drops. Every reconnect emits a
/// [`ChangeKind::Resync`] event since notifications sent meanwhile are lost.
pub async fn listen(
    database: &'static Database,
    collection: &str,
) -> Result<ChangeFeed, StoreError> {
    let listener = connect(database).await.map_err(StoreError::backend)?;

    let (sender, receiver) = mpsc::unbounded_channel();
    let forwarder = tokio::spawn(forward(database, listener, collection.to_owned(), sender));

    Ok(ChangeFeed::new(receiver, forwarder))
}

async fn connect(database: &Database) -> Result<PgListener, sqlx::Error> {
    let mut listener = PgListener::connect_with(database.database_pool()).await?;
    listener.listen(DOCUMENT_CHANGES_CHANNEL).await?;
    Ok(listener)
}

async fn forward(
    database: &'static Database,
    mut listener: PgListener,
    collection: String,
    sender: mpsc::UnboundedSender<ChangeEvent>,
) {
    loop {
        let notification = match listener.try_recv().await {
            Ok(Some(notification)) => notification,
            Ok(None) => {
                // PgListener reconnects on the next call
                tracing::warn!(%collection, "lost change listener connection, reconnecting");
                if sender.send(ChangeEvent::resync(collection.as_str())).is_err() {
                    return;
                }
                continue;
            }
            Err(error) => {
                tracing::error!(%error, %collection, "change listener failed, reconnecting");
                let Some(reconnected) = reconnect(database, &collection, &sender).await else {
                    return;
                };
                listener = reconnected;
                if sender.send(ChangeEvent::resync(collection.as_str())).is_err() {
                    return;
                }
                continue;
            }
        };

        let Some(event) = to_event(notification.payload()) else {
            tracing::warn!(payload = notification.payload(), "ignoring unreadable change notification");
            continue;
        };
        if event.collection == collection && sender.send(event).is_err() {
            return;
        }
    }
}

/// Retries until a listener is connected or the feed has been dropped.
async fn reconnect(
    database: &Database,
    collection: &str,
    sender: &mpsc::UnboundedSender<ChangeEvent>,
) -> Option<PgListener> {
    let mut attempt = 0;
    loop {
        tokio::time::sleep(reconnect_delay(attempt)).await;
        if sender.is_closed() {
            return None;
        }
        match connect(database).await {
            Ok(listener) => {
                tracing::info!(attempt, %collection, "change listener reconnected");
                return Some(listener);
            }
            Err(error) => {
                tracing::warn!(%error, attempt, %collection, "change listener reconnect failed");
                attempt = attempt.saturating_add(1);
            }
        }
    }
}

fn reconnect_delay(attempt: u32) -> Duration {
    RECONNECT_BASE_DELAY
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(RECONNECT_MAX_DELAY)
}

fn to_event(payload: &str) -> Option<ChangeEvent> {
    let notification: Notification = serde_json::from_str(payload).ok()?;
    let kind = match notification.op.as_str() {
        "INSERT" => ChangeKind::Created,
        "UPDATE" => ChangeKind::Updated,
        "DELETE" => ChangeKind::Deleted,
        _ => return None,
    };
    Some(ChangeEvent::new(
        notification.collection,
        DocumentId::new(notification.id),
        kind,
    ))
}
