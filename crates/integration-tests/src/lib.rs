//! Integration test support for Roster.
//!
//! [`FakeBackend`] is an in-process stand-in for the users/addresses REST
//! backend. It keeps records in memory, enforces the one-to-one link between
//! users and addresses, and records every request it receives so tests can
//! assert how many round trips the client made.
//!
//! ```rust,ignore
//! let backend = FakeBackend::spawn().await;
//! let client = backend.client();
//!
//! client.list_users().await?;
//! client.list_users().await?;
//! assert_eq!(backend.count("GET", "/users"), 1);
//! ```

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use roster_client::{ClientConfig, RosterClient};
use roster_core::{Address, AddressId, AddressInput, User, UserId, UserInput};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A request as seen by the backend: `"GET /users"`.
pub type RecordedRequest = String;

#[derive(Debug, Default)]
struct Store {
    users: BTreeMap<i64, UserInput>,
    addresses: BTreeMap<i64, AddressInput>,
    next_id: i64,
    requests: Vec<RecordedRequest>,
    /// Status returned for the next N requests instead of handling them.
    failures: Vec<StatusCode>,
    latency: Duration,
    /// Plain-text body for successful deletes; `None` answers 204.
    delete_body: Option<String>,
}

impl Store {
    fn deleted(&self) -> Response {
        self.delete_body.as_ref().map_or_else(
            || StatusCode::NO_CONTENT.into_response(),
            |body| (StatusCode::OK, body.clone()).into_response(),
        )
    }

    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn address(&self, id: i64) -> Option<Address> {
        self.addresses.get(&id).map(|input| Address {
            id: AddressId::new(id),
            region: input.region.clone(),
            city: input.city.clone(),
            street: input.street.clone(),
            house: input.house.clone(),
            apartment: input.apartment.clone(),
        })
    }

    fn user(&self, id: i64) -> Option<User> {
        self.users.get(&id).map(|input| User {
            id: UserId::new(id),
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            middle_name: input.middle_name.clone(),
            phone: input.phone.clone(),
            email: input.email.clone(),
            birth_date: input.birth_date,
            address: input
                .address_id
                .and_then(|address_id| self.address(address_id.as_i64())),
        })
    }

    /// Id of the user linked to `address_id`, other than `except`.
    fn owner_of(&self, address_id: AddressId, except: Option<i64>) -> Option<i64> {
        self.users
            .iter()
            .find(|(id, user)| Some(**id) != except && user.address_id == Some(address_id))
            .map(|(id, _)| *id)
    }

    /// Check the address link of a user write.
    fn check_link(&self, input: &UserInput, user_id: Option<i64>) -> Result<(), Response> {
        let Some(address_id) = input.address_id else {
            return Ok(());
        };
        if !self.addresses.contains_key(&address_id.as_i64()) {
            return Err((StatusCode::BAD_REQUEST, "Unknown address").into_response());
        }
        if self.owner_of(address_id, user_id).is_some() {
            return Err((StatusCode::CONFLICT, "Address already assigned").into_response());
        }
        Ok(())
    }
}

type Shared = Arc<Mutex<Store>>;

fn lock(store: &Shared) -> MutexGuard<'_, Store> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

/// In-memory users/addresses backend bound to a random local port.
#[derive(Debug)]
pub struct FakeBackend {
    store: Shared,
    addr: SocketAddr,
    server: JoinHandle<()>,
}

impl FakeBackend {
    /// Bind to `127.0.0.1:0` and start serving.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn spawn() -> Self {
        let store = Shared::default();
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Failed to read local address");

        let app = router(Arc::clone(&store));
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            store,
            addr,
            server,
        }
    }

    /// Base URL with trailing slash, e.g. `http://127.0.0.1:41234/`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// A fresh client (with its own cache) pointed at this backend.
    ///
    /// # Panics
    ///
    /// Panics if the base URL is rejected, which would be a bug here.
    #[must_use]
    pub fn client(&self) -> RosterClient {
        let config = ClientConfig::new(&self.base_url()).expect("Fake backend URL is valid");
        RosterClient::new(&config)
    }

    /// Insert an address directly, bypassing the HTTP surface.
    #[must_use]
    pub fn seed_address(&self, input: AddressInput) -> Address {
        let mut store = lock(&self.store);
        let id = store.next_id();
        store.addresses.insert(id, input);
        store.address(id).unwrap_or_else(|| unreachable!("just inserted"))
    }

    /// Insert a user directly, bypassing the HTTP surface and link checks.
    #[must_use]
    pub fn seed_user(&self, input: UserInput) -> User {
        let mut store = lock(&self.store);
        let id = store.next_id();
        store.users.insert(id, input);
        store.user(id).unwrap_or_else(|| unreachable!("just inserted"))
    }

    /// Change a user behind the client's back.
    pub fn rename_user(&self, id: UserId, first_name: &str) {
        if let Some(user) = lock(&self.store).users.get_mut(&id.as_i64()) {
            user.first_name = first_name.to_string();
        }
    }

    /// Answer the next request with `status` instead of handling it.
    pub fn fail_next(&self, status: StatusCode) {
        lock(&self.store).failures.push(status);
    }

    /// Answer successful deletes with `200` and a plain-text (non-JSON) body.
    pub fn answer_deletes_with(&self, body: &str) {
        lock(&self.store).delete_body = Some(body.to_string());
    }

    /// Delay every response, so concurrent reads overlap.
    pub fn set_latency(&self, latency: Duration) {
        lock(&self.store).latency = latency;
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.store).requests.clone()
    }

    /// How many times `method path` was requested.
    #[must_use]
    pub fn count(&self, method: &str, path: &str) -> usize {
        let wanted = format!("{method} {path}");
        lock(&self.store)
            .requests
            .iter()
            .filter(|r| **r == wanted)
            .count()
    }

    /// Forget recorded requests.
    pub fn clear_requests(&self) {
        lock(&self.store).requests.clear();
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// A base URL nothing listens on.
///
/// # Panics
///
/// Panics if no local port can be bound.
pub async fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind throwaway listener");
    let addr = listener.local_addr().expect("Failed to read local address");
    drop(listener);
    format!("http://{addr}/")
}

// =============================================================================
// Routes
// =============================================================================

fn router(store: Shared) -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/addresses", get(list_addresses).post(create_address))
        .route("/addresses/without-users", get(list_unassigned))
        .route(
            "/addresses/{id}",
            get(get_address).put(update_address).delete(delete_address),
        )
        .layer(middleware::from_fn_with_state(store.clone(), record))
        .with_state(store)
}

/// Record the request, then apply latency and injected failures.
async fn record(State(store): State<Shared>, request: Request, next: Next) -> Response {
    let (latency, failure) = {
        let mut store = lock(&store);
        store
            .requests
            .push(format!("{} {}", request.method(), request.uri().path()));
        let failure = if store.failures.is_empty() {
            None
        } else {
            Some(store.failures.remove(0))
        };
        (store.latency, failure)
    };

    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
    if let Some(status) = failure {
        return (status, "Injected failure").into_response();
    }
    next.run(request).await
}

async fn list_users(State(store): State<Shared>) -> Json<Vec<User>> {
    let store = lock(&store);
    Json(store.users.keys().filter_map(|id| store.user(*id)).collect())
}

async fn get_user(State(store): State<Shared>, Path(id): Path<i64>) -> Response {
    lock(&store)
        .user(id)
        .map_or_else(not_found, |user| Json(user).into_response())
}

async fn create_user(State(store): State<Shared>, Json(input): Json<UserInput>) -> Response {
    let mut store = lock(&store);
    if let Err(response) = store.check_link(&input, None) {
        return response;
    }
    let id = store.next_id();
    store.users.insert(id, input);
    store
        .user(id)
        .map_or_else(not_found, |user| (StatusCode::CREATED, Json(user)).into_response())
}

async fn update_user(
    State(store): State<Shared>,
    Path(id): Path<i64>,
    Json(input): Json<UserInput>,
) -> Response {
    let mut store = lock(&store);
    if !store.users.contains_key(&id) {
        return not_found();
    }
    if let Err(response) = store.check_link(&input, Some(id)) {
        return response;
    }
    store.users.insert(id, input);
    store
        .user(id)
        .map_or_else(not_found, |user| Json(user).into_response())
}

async fn delete_user(State(store): State<Shared>, Path(id): Path<i64>) -> Response {
    let mut store = lock(&store);
    if store.users.remove(&id).is_none() {
        return not_found();
    }
    store.deleted()
}

async fn list_addresses(State(store): State<Shared>) -> Json<Vec<Address>> {
    let store = lock(&store);
    Json(
        store
            .addresses
            .keys()
            .filter_map(|id| store.address(*id))
            .collect(),
    )
}

async fn list_unassigned(State(store): State<Shared>) -> Json<Vec<Address>> {
    let store = lock(&store);
    Json(
        store
            .addresses
            .keys()
            .filter(|id| store.owner_of(AddressId::new(**id), None).is_none())
            .filter_map(|id| store.address(*id))
            .collect(),
    )
}

async fn get_address(State(store): State<Shared>, Path(id): Path<i64>) -> Response {
    lock(&store)
        .address(id)
        .map_or_else(not_found, |address| Json(address).into_response())
}

async fn create_address(
    State(store): State<Shared>,
    Json(input): Json<AddressInput>,
) -> Response {
    let mut store = lock(&store);
    let id = store.next_id();
    store.addresses.insert(id, input);
    store
        .address(id)
        .map_or_else(not_found, |address| {
            (StatusCode::CREATED, Json(address)).into_response()
        })
}

async fn update_address(
    State(store): State<Shared>,
    Path(id): Path<i64>,
    Json(input): Json<AddressInput>,
) -> Response {
    let mut store = lock(&store);
    if !store.addresses.contains_key(&id) {
        return not_found();
    }
    store.addresses.insert(id, input);
    store
        .address(id)
        .map_or_else(not_found, |address| Json(address).into_response())
}

/// Deleting a linked address unlinks it from its user.
async fn delete_address(State(store): State<Shared>, Path(id): Path<i64>) -> Response {
    let mut store = lock(&store);
    if store.addresses.remove(&id).is_none() {
        return not_found();
    }
    for user in store.users.values_mut() {
        if user.address_id == Some(AddressId::new(id)) {
            user.address_id = None;
        }
    }
    store.deleted()
}
