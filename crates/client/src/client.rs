//! Query client.
//!
//! The single point of HTTP communication. It knows nothing about users or
//! addresses: endpoint modules describe requests, and the client executes
//! them, caches reads by [`QueryKey`], and publishes invalidations after
//! writes.

use std::sync::Arc;

use moka::future::Cache;
use reqwest::Method;
use roster_core::{Address, User};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, instrument};
use url::Url;

use crate::cache::{CacheEntry, CacheValue, QueryKey, TagLedger};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::invalidation::{Invalidation, Mutation};
use crate::subscription::QuerySubscription;
use crate::tags::{Tag, TagKind};

/// Pending invalidation events a slow subscriber may fall behind by before
/// it is told it lagged.
const INVALIDATION_CHANNEL_CAPACITY: usize = 64;

/// A request descriptor: method, path relative to the base URL, optional JSON body.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl Request {
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::DELETE,
            path: path.into(),
            body: None,
        }
    }

    /// POST with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Encode` if the body cannot be serialized.
    pub fn post<B: Serialize>(path: impl Into<String>, body: &B) -> Result<Self, ClientError> {
        Ok(Self {
            method: Method::POST,
            path: path.into(),
            body: Some(serde_json::to_value(body).map_err(ClientError::Encode)?),
        })
    }

    /// PUT with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Encode` if the body cannot be serialized.
    pub fn put<B: Serialize>(path: impl Into<String>, body: &B) -> Result<Self, ClientError> {
        Ok(Self {
            method: Method::PUT,
            path: path.into(),
            body: Some(serde_json::to_value(body).map_err(ClientError::Encode)?),
        })
    }
}

// =============================================================================
// RosterClient
// =============================================================================

/// Client for the Roster REST backend.
///
/// Cheap to clone; clones share one cache, one invalidation ledger and one
/// invalidation channel.
#[derive(Clone)]
pub struct RosterClient {
    inner: Arc<RosterClientInner>,
}

struct RosterClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<QueryKey, CacheEntry>,
    ledger: TagLedger,
    events: broadcast::Sender<Invalidation>,
}

impl std::fmt::Debug for RosterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosterClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("cached_queries", &self.inner.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl RosterClient {
    /// Create a new client.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_idle(config.cache_idle)
            .build();

        let (events, _) = broadcast::channel(INVALIDATION_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(RosterClientInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.clone(),
                cache,
                ledger: TagLedger::default(),
                events,
            }),
        }
    }

    /// Backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Perform one HTTP call and decode the JSON body.
    ///
    /// Returns `Ok(None)` for a successful response with an empty body.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Network` if no response arrived,
    /// `ClientError::Status` for a non-success status (with whatever body
    /// text came back), and `ClientError::Decode` if the body is not JSON.
    pub async fn execute(
        &self,
        request: &Request,
    ) -> Result<Option<serde_json::Value>, ClientError> {
        let text = self.send(request).await?;
        parse_body(&text)
    }

    /// Perform one HTTP call and return the body text of a success response.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn send(&self, request: &Request) -> Result<String, ClientError> {
        let url = self
            .inner
            .base_url
            .join(&request.path)
            .map_err(|e| ClientError::InvalidPath {
                path: request.path.clone(),
                reason: e.to_string(),
            })?;

        let mut builder = self.inner.client.request(request.method.clone(), url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %excerpt(&response_text),
                "Backend returned non-success status"
            );
            return Err(ClientError::Status {
                status,
                body: response_text,
            });
        }

        Ok(response_text)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Read a query through the cache.
    ///
    /// Fresh entries are served without a request. Missing or stale entries
    /// are fetched; concurrent reads of the same key share one request.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; nothing is cached on failure.
    #[instrument(skip(self))]
    pub async fn read(&self, key: QueryKey) -> Result<CacheEntry, ClientError> {
        loop {
            if let Some(entry) = self.inner.cache.get(&key).await {
                if !self.inner.ledger.is_stale(&entry) {
                    debug!("Cache hit");
                    return Ok(entry);
                }
                debug!("Cache entry stale, refetching");
                self.inner.cache.invalidate(&key).await;
            }

            let entry = self
                .inner
                .cache
                .try_get_with(key.clone(), self.fetch(key.clone()))
                .await
                .map_err(ClientError::from_shared)?;

            // A request joined in flight may have been sent before the last
            // write committed.
            if !self.inner.ledger.is_stale(&entry) {
                return Ok(entry);
            }
            debug!("Joined request predates an invalidation, refetching");
        }
    }

    /// Fetch a query from the backend, bypassing the cache.
    async fn fetch(&self, key: QueryKey) -> Result<CacheEntry, ClientError> {
        let fetched_at = self.inner.ledger.current();
        debug!(query = ?key, generation = fetched_at, "Fetching");

        let request = key.request();
        let body = self
            .execute(&request)
            .await?
            .ok_or_else(|| ClientError::EmptyBody(request.path.clone()))?;

        let value = match &key {
            QueryKey::Users => CacheValue::Users(decode::<Vec<User>>(body)?.into()),
            QueryKey::User(_) => CacheValue::User(Arc::new(decode(body)?)),
            QueryKey::Addresses | QueryKey::UnassignedAddresses => {
                CacheValue::Addresses(decode::<Vec<Address>>(body)?.into())
            }
            QueryKey::Address(_) => CacheValue::Address(Arc::new(decode(body)?)),
        };

        Ok(CacheEntry {
            tags: key.provides(&value).into(),
            value,
            fetched_at,
        })
    }

    /// Subscribe to a query: the subscription refetches and yields a fresh
    /// snapshot whenever a write invalidates a tag the query provides.
    #[must_use]
    pub fn watch<T>(
        &self,
        key: QueryKey,
        extract: fn(CacheValue) -> Option<T>,
    ) -> QuerySubscription<T> {
        QuerySubscription::new(self.clone(), key, self.inner.events.subscribe(), extract)
    }

    /// Receive every invalidation event published from now on.
    #[must_use]
    pub fn invalidations(&self) -> broadcast::Receiver<Invalidation> {
        self.inner.events.subscribe()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Send a write and, once the backend accepts it, invalidate the tags the
    /// mutation names. Returns the raw body text; decoding it is up to the
    /// caller and happens after the invalidation.
    ///
    /// A rejected write invalidates nothing.
    ///
    /// # Errors
    ///
    /// Returns the request error unchanged.
    #[instrument(skip(self, request), fields(mutation = %mutation))]
    pub async fn commit(
        &self,
        mutation: Mutation,
        request: &Request,
    ) -> Result<String, ClientError> {
        let body = self.send(request).await?;
        self.invalidate(Some(mutation), mutation.invalidates());
        Ok(body)
    }

    /// Mark tags stale and notify subscribers.
    pub fn invalidate(&self, cause: Option<Mutation>, tags: Vec<Tag>) {
        let generation = self.inner.ledger.invalidate(&tags);
        debug!(
            generation,
            tags = %tags.iter().map(ToString::to_string).collect::<Vec<_>>().join(","),
            "Invalidated tags"
        );
        // No receivers is fine: nothing is subscribed.
        let _ = self.inner.events.send(Invalidation { cause, tags });
    }

    /// Drop every cached query.
    pub async fn invalidate_all(&self) {
        self.inner.ledger.invalidate_all();
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
        let _ = self.inner.events.send(Invalidation {
            cause: None,
            tags: vec![Tag::all(TagKind::Users), Tag::all(TagKind::Addresses)],
        });
    }
}

/// Decode a JSON body into a typed value.
pub(crate) fn decode<T: DeserializeOwned>(body: serde_json::Value) -> Result<T, ClientError> {
    Ok(serde_json::from_value(body)?)
}

/// Decode the body of a write that must return a record.
pub(crate) fn decode_record<T: DeserializeOwned>(path: &str, text: &str) -> Result<T, ClientError> {
    let body = parse_body(text)?.ok_or_else(|| ClientError::EmptyBody(path.to_string()))?;
    decode(body)
}

/// Parse response text as JSON; blank text is `None`.
fn parse_body(text: &str) -> Result<Option<serde_json::Value>, ClientError> {
    if text.trim().is_empty() {
        return Ok(None);
    }

    match serde_json::from_str(text) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::error!(
                error = %e,
                body = %excerpt(text),
                "Failed to parse backend response"
            );
            Err(ClientError::Decode(e))
        }
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(500).collect()
}
