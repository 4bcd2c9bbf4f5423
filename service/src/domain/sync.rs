use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use spins_common::{ARTISTS_COLLECTION, Artist};
use tokio::task::JoinHandle;

use crate::domain::{
    catalog::sorted_artists,
    store::{ChangeFeed, DocumentStore, QueryFilter, StoreError},
};

/// Full, name-ordered view of the artist collection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArtistSnapshot {
    /// Strictly increasing across the snapshots of one subscription
    pub generation: u64,
    pub artists: Vec<Artist>,
}

/// Pushes a fresh [`ArtistSnapshot`] after every change of the artist
/// collection.
#[derive(Clone)]
pub struct ArtistSync<S> {
    store: S,
    retry: Resubscribe,
}

/// How often a closed change feed is re-opened before the subscription gives
/// up. Attempts are counted per run of feeds that close without an event.
#[derive(Clone, Copy, Debug)]
struct Resubscribe {
    attempts: u32,
    base_delay: Duration,
}

const MAX_RESUBSCRIBE_DELAY: Duration = Duration::from_secs(30);

/// Handle of a running subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    cancelled: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl<S: DocumentStore> ArtistSync<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            retry: Resubscribe::default(),
        }
    }

    #[cfg(test)]
    fn with_retry(mut self, attempts: u32, base_delay: Duration) -> Self {
        self.retry = Resubscribe {
            attempts,
            base_delay,
        };
        self
    }

    /// Delivers the current snapshot, then one per observed change.
    ///
    /// Changes arriving close together are coalesced into one re-fetch, and a
    /// snapshot is dropped when newer changes are already queued. Never
    /// fails: when the subscription cannot be set up the error is logged and
    /// an inactive [`Subscription`] is returned. A feed that closes later is
    /// re-opened; once that keeps failing the subscription turns inactive.
    pub async fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(ArtistSnapshot) + Send + 'static,
    {
        let feed = match self.store.watch(ARTISTS_COLLECTION).await {
            Ok(feed) => feed,
            Err(error) => {
                tracing::error!(%error, "failed to subscribe to artist changes");
                return Subscription::noop();
            }
        };

        let cancelled = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(deliver(
            self.store.clone(),
            feed,
            self.retry,
            cancelled.clone(),
            callback,
        ));
        tracing::debug!("subscribed to artist changes");

        Subscription {
            cancelled,
            task: Some(task),
        }
    }
}

impl Default for Resubscribe {
    fn default() -> Self {
        Self {
            attempts: 8,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl Resubscribe {
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(MAX_RESUBSCRIBE_DELAY)
    }
}

impl Subscription {
    /// A subscription that was never started.
    pub fn noop() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(true)),
            task: None,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.cancelled.load(Ordering::Acquire)
    }

    /// Stops delivery. Safe to call any number of times.
    pub fn unsubscribe(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("unsubscribed from artist changes");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

async fn deliver<S, F>(
    store: S,
    mut feed: ChangeFeed,
    retry: Resubscribe,
    cancelled: Arc<AtomicBool>,
    mut callback: F,
) where
    S: DocumentStore,
    F: FnMut(ArtistSnapshot),
{
    let mut generation = 0;
    let mut closures = 0;
    loop {
        let coalesced = feed.drain();
        generation += 1;

        match fetch(&store).await {
            Ok(artists) => {
                if cancelled.load(Ordering::Acquire) {
                    break;
                }
                if feed.has_pending() {
                    tracing::debug!(generation, "discarding stale artist snapshot");
                    continue;
                }
                tracing::debug!(generation, coalesced, artists = artists.len(), "artist snapshot");
                callback(ArtistSnapshot { generation, artists });
            }
            Err(error) => tracing::error!(%error, "failed to refresh artists"),
        }

        // wait for a change, or for a re-opened feed after which everything is re-read
        loop {
            if let Some(event) = feed.next().await {
                closures = 0;
                tracing::debug!(document_id = ?event.document_id, kind = ?event.kind, "artist changed");
                break;
            }

            if closures >= retry.attempts {
                tracing::error!(attempts = closures, "artist change feed closed, live updates stopped");
                cancelled.store(true, Ordering::Release);
                return;
            }
            tracing::warn!(attempt = closures, "artist change feed closed, resubscribing");
            tokio::time::sleep(retry.delay(closures)).await;
            closures += 1;

            match store.watch(ARTISTS_COLLECTION).await {
                Ok(reopened) => {
                    feed = reopened;
                    break;
                }
                Err(error) => tracing::warn!(%error, "failed to resubscribe to artist changes"),
            }
        }
    }
}

async fn fetch<S: DocumentStore>(store: &S) -> Result<Vec<Artist>, StoreError> {
    let documents = store
        .query_documents(ARTISTS_COLLECTION, &QueryFilter::All)
        .await?;
    Ok(sorted_artists(documents))
}
