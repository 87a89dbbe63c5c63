//! Query subscriptions.
//!
//! A [`QuerySubscription`] binds one cached query to the invalidation
//! channel. [`QuerySubscription::changed`] waits until a committed write
//! touches a tag the query provides, refetches through the cache, and yields
//! the fresh snapshot.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::cache::{CacheValue, QueryKey};
use crate::client::RosterClient;
use crate::error::ClientError;
use crate::invalidation::Invalidation;
use crate::tags::Tag;

/// A live view of one query.
pub struct QuerySubscription<T> {
    client: RosterClient,
    key: QueryKey,
    /// Tags provided by the last snapshot (the key's base tags until then).
    tags: Arc<[Tag]>,
    events: broadcast::Receiver<Invalidation>,
    extract: fn(CacheValue) -> Option<T>,
}

impl<T> std::fmt::Debug for QuerySubscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySubscription")
            .field("key", &self.key)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

impl<T> QuerySubscription<T> {
    pub(crate) fn new(
        client: RosterClient,
        key: QueryKey,
        events: broadcast::Receiver<Invalidation>,
        extract: fn(CacheValue) -> Option<T>,
    ) -> Self {
        let tags = key.base_tags().into();
        Self {
            client,
            key,
            tags,
            events,
            extract,
        }
    }

    /// The watched query.
    #[must_use]
    pub const fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Current snapshot, served from the cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns the fetch error if the snapshot had to be refetched and the
    /// request failed.
    pub async fn current(&mut self) -> Result<T, ClientError> {
        let entry = self.client.read(self.key.clone()).await?;
        self.tags = Arc::clone(&entry.tags);
        (self.extract)(entry.value).ok_or_else(|| ClientError::EmptyBody(self.key.request().path))
    }

    /// Wait for an invalidation affecting this query, then return the
    /// refetched snapshot.
    ///
    /// Events that do not touch the query's tags are skipped. If the
    /// subscriber fell behind and events were dropped, it refetches anyway.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Closed` if the client is gone, or the refetch
    /// error.
    pub async fn changed(&mut self) -> Result<T, ClientError> {
        loop {
            match self.events.recv().await {
                Ok(event) if event.affects(&self.tags) => {
                    debug!(query = ?self.key, cause = ?event.cause, "Subscribed query invalidated");
                    return self.current().await;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(query = ?self.key, skipped, "Subscriber lagged, refetching");
                    return self.current().await;
                }
                Err(RecvError::Closed) => return Err(ClientError::Closed),
            }
        }
    }
}
