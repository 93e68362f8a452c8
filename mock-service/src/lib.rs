//! In-memory stand-in for the restful-booker API.
//!
//! Implements the endpoints the load test calls with the same status codes the real service
//! answers with, including its quirks: a successful delete is `201 Created`, an update of a
//! missing booking is `405`, and rejected credentials are still a `200`.
use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use metrics::counter;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
#[allow(unused)]
use tracing::{debug, info, warn};

const TOKEN_LEN: usize = 15;
const REQUIRED_FIELDS: [&str; 5] = [
    "firstname",
    "lastname",
    "totalprice",
    "depositpaid",
    "bookingdates",
];

/// Shared state of the mock. Cloning shares the same bookings.
#[derive(Clone)]
pub struct MockBooker {
    inner: Arc<Store>,
}

struct Store {
    bookings: RwLock<BTreeMap<u64, Value>>,
    tokens: RwLock<HashSet<String>>,
    next_id: AtomicU64,
    requests: AtomicU64,
    username: String,
    password: String,
    limiter: Option<DefaultDirectRateLimiter>,
    delay: Duration,
}

impl Default for MockBooker {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl MockBooker {
    pub fn builder() -> MockBookerBuilder {
        MockBookerBuilder {
            username: "admin".to_string(),
            password: "password123".to_string(),
            max_tps: None,
            delay: Duration::ZERO,
        }
    }

    pub fn booking_count(&self) -> usize {
        read(&self.inner.bookings).len()
    }

    pub fn booking(&self, id: u64) -> Option<Value> {
        read(&self.inner.bookings).get(&id).cloned()
    }

    /// Requests served since the last call.
    pub fn take_request_count(&self) -> u64 {
        self.inner.requests.swap(0, Ordering::Relaxed)
    }
}

pub struct MockBookerBuilder {
    username: String,
    password: String,
    max_tps: Option<NonZeroU32>,
    delay: Duration,
}

impl MockBookerBuilder {
    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.username = username.to_string();
        self.password = password.to_string();
        self
    }

    /// Answer `503` to requests above this rate.
    pub fn max_tps(mut self, tps: NonZeroU32) -> Self {
        self.max_tps = Some(tps);
        self
    }

    /// Added latency on every request.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn build(self) -> MockBooker {
        MockBooker {
            inner: Arc::new(Store {
                bookings: RwLock::new(BTreeMap::new()),
                tokens: RwLock::new(HashSet::new()),
                next_id: AtomicU64::new(1),
                requests: AtomicU64::new(0),
                username: self.username,
                password: self.password,
                limiter: self.max_tps.map(|tps| RateLimiter::direct(Quota::per_second(tps))),
                delay: self.delay,
            }),
        }
    }
}

pub fn app(state: MockBooker) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/auth", axum::routing::post(auth))
        .route("/booking", get(list_bookings).post(create_booking))
        .route(
            "/booking/:id",
            get(get_booking).put(update_booking).delete(delete_booking),
        )
        .layer(middleware::from_fn_with_state(state.clone(), throttle))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: MockBooker) -> std::io::Result<()> {
    axum::serve(listener, app(state)).await
}

/// Serve on an ephemeral localhost port in the background.
pub async fn spawn(state: MockBooker) -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(err) = serve(listener, state).await {
            warn!("Mock service stopped: {err}");
        }
    });
    Ok(addr)
}

pub async fn run(addr: SocketAddr, state: MockBooker) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Mock booking service listening on {addr}");
    serve(listener, state).await
}

/// Print the served TPS once a second.
pub async fn tps_measure_task(state: MockBooker) {
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let transactions = state.take_request_count();
        println!("{transactions} TPS");
    }
}

async fn throttle(State(state): State<MockBooker>, request: Request, next: Next) -> Response {
    state.inner.requests.fetch_add(1, Ordering::Relaxed);
    counter!("mock-service.requests").increment(1);

    if let Some(limiter) = &state.inner.limiter {
        if limiter.check().is_err() {
            counter!("mock-service.throttled").increment(1);
            return (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable").into_response();
        }
    }

    if !state.inner.delay.is_zero() {
        tokio::time::sleep(state.inner.delay).await;
    }

    next.run(request).await
}

async fn ping() -> (StatusCode, &'static str) {
    (StatusCode::CREATED, "Created")
}

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

async fn auth(State(state): State<MockBooker>, Json(creds): Json<Credentials>) -> Json<Value> {
    if creds.username != state.inner.username || creds.password != state.inner.password {
        debug!(username = %creds.username, "Rejected credentials");
        return Json(json!({ "reason": "Bad credentials" }));
    }

    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect();
    write(&state.inner.tokens).insert(token.clone());

    Json(json!({ "token": token }))
}

async fn list_bookings(State(state): State<MockBooker>) -> Json<Value> {
    let ids: Vec<Value> = read(&state.inner.bookings)
        .keys()
        .map(|id| json!({ "bookingid": id }))
        .collect();
    Json(Value::Array(ids))
}

async fn create_booking(
    State(state): State<MockBooker>,
    Json(booking): Json<Value>,
) -> Result<Json<Value>, (StatusCode, &'static str)> {
    if !is_valid_booking(&booking) {
        return Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"));
    }

    let id = state.inner.next_id.fetch_add(1, Ordering::Relaxed);
    write(&state.inner.bookings).insert(id, booking.clone());
    debug!(bookingid = id, "Created booking");

    Ok(Json(json!({ "bookingid": id, "booking": booking })))
}

async fn get_booking(
    State(state): State<MockBooker>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, (StatusCode, &'static str)> {
    state
        .booking(id)
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Not Found"))
}

async fn update_booking(
    State(state): State<MockBooker>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    Json(booking): Json<Value>,
) -> Result<Json<Value>, (StatusCode, &'static str)> {
    if !is_authorized(&state, &headers) {
        return Err((StatusCode::FORBIDDEN, "Forbidden"));
    }
    if !is_valid_booking(&booking) {
        return Err((StatusCode::BAD_REQUEST, "Bad Request"));
    }

    let mut bookings = write(&state.inner.bookings);
    match bookings.get_mut(&id) {
        Some(existing) => {
            *existing = booking.clone();
            Ok(Json(booking))
        }
        None => Err((StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")),
    }
}

async fn delete_booking(
    State(state): State<MockBooker>,
    Path(id): Path<u64>,
) -> (StatusCode, &'static str) {
    match write(&state.inner.bookings).remove(&id) {
        Some(_) => (StatusCode::CREATED, "Created"),
        None => (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed"),
    }
}

fn is_authorized(state: &MockBooker, headers: &HeaderMap) -> bool {
    let tokens = read(&state.inner.tokens);
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|cookie| cookie.trim().strip_prefix("token="))
        .any(|token| tokens.contains(token))
}

fn is_valid_booking(booking: &Value) -> bool {
    booking
        .as_object()
        .is_some_and(|fields| REQUIRED_FIELDS.iter().all(|f| fields.contains_key(*f)))
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
