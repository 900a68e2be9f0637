//! In-memory shop backend speaking the same JSON contract as the real API.
//!
//! Serves everything under `/api`, keeps the session in an HttpOnly cookie and
//! checks roles with the same [`check_access`] the client guard uses. Listings
//! are paginated with a relative `next_page_url`. [`Faults`] lets tests make
//! logout fail or slow listings down.

pub mod store;
mod handlers;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use base64::Engine;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::AppError;
use crate::identity::{check_access, Access, Identity, RoleSet, SessionState};
pub use store::{ShopStore, SEED_PASSWORD, SEED_USERS};

pub const SESSION_COOKIE: &str = "storefront_session";
pub const API_PREFIX: &str = "/api";

#[derive(Debug, Clone)]
pub struct MockOptions {
    /// 0 picks an ephemeral port.
    pub port: u16,
    pub page_size: usize,
}

impl Default for MockOptions {
    fn default() -> Self { Self { port: 0, page_size: 10 } }
}

#[derive(Default)]
pub struct Faults {
    fail_logout: AtomicBool,
    listing_delay_ms: AtomicU64,
}

impl Faults {
    pub fn fail_logout(&self, on: bool) { self.fail_logout.store(on, Ordering::SeqCst) }

    pub fn delay_listings(&self, delay: Duration) {
        self.listing_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst)
    }

    fn logout_fails(&self) -> bool { self.fail_logout.load(Ordering::SeqCst) }

    async fn listing_pause(&self) {
        let ms = self.listing_delay_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

#[derive(Clone)]
pub struct MockState {
    store: Arc<Mutex<ShopStore>>,
    sessions: Arc<RwLock<HashMap<String, i64>>>,
    faults: Arc<Faults>,
    page_size: usize,
}

impl MockState {
    pub fn new(store: ShopStore, page_size: usize) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            faults: Arc::new(Faults::default()),
            page_size: page_size.max(1),
        }
    }

    async fn caller(&self, headers: &HeaderMap) -> SessionState {
        let Some(sid) = parse_cookie(headers, SESSION_COOKIE) else { return SessionState::Anonymous };
        let user_id = self.sessions.read().await.get(&sid).copied();
        match user_id.and_then(|id| self.store.lock().user(id)) {
            Some(identity) => SessionState::Authenticated(identity),
            None => SessionState::Anonymous,
        }
    }

    /// Resolve the caller and check it against `roles`.
    async fn require(&self, headers: &HeaderMap, roles: RoleSet) -> Result<Identity, MockError> {
        let state = self.caller(headers).await;
        match check_access(&state, roles) {
            Access::Granted => state
                .identity()
                .cloned()
                .ok_or_else(|| MockError(AppError::auth("unauthenticated", "Unauthenticated."))),
            Access::Forbidden(_) => Err(MockError(AppError::forbidden("forbidden", "Forbidden."))),
            Access::Unauthenticated | Access::Pending => Err(MockError(AppError::auth("unauthenticated", "Unauthenticated."))),
        }
    }
}

/// `AppError` rendered as `{success: false, message}` with its HTTP status.
pub struct MockError(pub AppError);

impl From<AppError> for MockError {
    fn from(e: AppError) -> Self { MockError(e) }
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        crate::tprintln!("mock: {} -> {}", status, self.0);
        (status, Json(json!({"success": false, "message": self.0.message()}))).into_response()
    }
}

pub type MockResult = Result<Response, MockError>;

fn ok_with<T: Serialize>(data: T, message: &str) -> MockResult {
    Ok(Json(json!({"success": true, "message": message, "data": data})).into_response())
}

fn ok_message(message: &str) -> MockResult {
    Ok(Json(json!({"success": true, "message": message})).into_response())
}

/// One page of `all` plus the cursor for the next one, if any.
fn paginate<T: Serialize>(all: Vec<T>, page: Option<usize>, page_size: usize, path: &str, message: &str) -> MockResult {
    let page = page.unwrap_or(1).max(1);
    let start = (page - 1).saturating_mul(page_size);
    let more = all.len() > start.saturating_add(page_size);
    let items: Vec<T> = all.into_iter().skip(start).take(page_size).collect();
    let next = more.then(|| format!("{}{}?page={}", API_PREFIX, path, page + 1));
    Ok(Json(json!({"success": true, "message": message, "data": items, "next_page_url": next})).into_response())
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get("cookie")?.to_str().ok()?;
    raw.split(';').find_map(|part| {
        let (k, v) = part.trim().split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}

fn new_session_id() -> String {
    let mut buf = [0u8; 32];
    if let Err(e) = getrandom::getrandom(&mut buf) {
        error!(target: "mock", error = %e, "random source unavailable");
    }
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

fn session_cookie(sid: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("{}={}; HttpOnly; SameSite=Lax; Path=/", SESSION_COOKIE, sid)).ok()
}

fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("storefront_session=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Lax; Path=/")
}

pub fn router(state: MockState) -> Router {
    let api = Router::new()
        .route("/me", get(handlers::me))
        .route("/auth", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/products", get(handlers::list_products).post(handlers::create_product))
        .route("/products/all", get(handlers::list_all_products))
        .route("/products/import", post(handlers::import_products))
        .route("/products/{id}", put(handlers::update_product))
        .route("/cart", get(handlers::cart))
        .route("/cart/add", post(handlers::cart_add))
        .route("/cart/remove", post(handlers::cart_remove))
        .route("/cart/update", put(handlers::cart_update))
        .route("/order/checkout", post(handlers::checkout))
        .route("/orders", get(handlers::list_orders))
        .route("/orders/{id}/payments", post(handlers::upload_payment))
        .route("/payment/waiting", get(handlers::waiting_payments))
        .route("/payments/{id}/verify", put(handlers::verify_payment))
        .route("/shipment", get(handlers::list_shipments))
        .route("/shipment/{id}/logs", get(handlers::shipment_logs))
        .route("/shipment/{id}/status/{status}", put(handlers::advance_shipment));
    Router::new()
        .route("/", get(|| async { "storefront mock ok" }))
        .nest(API_PREFIX, api)
        .with_state(state)
}

/// A running mock backend. Stops when dropped.
pub struct MockServer {
    addr: SocketAddr,
    state: MockState,
    task: JoinHandle<()>,
}

impl MockServer {
    pub async fn start() -> anyhow::Result<Self> { Self::start_with(MockOptions::default()).await }

    pub async fn start_with(opts: MockOptions) -> anyhow::Result<Self> {
        let state = MockState::new(ShopStore::seeded(chrono::Utc::now()), opts.page_size);
        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], opts.port))).await?;
        let addr = listener.local_addr()?;
        let app = router(state.clone());
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(target: "mock", error = %e, "mock server stopped");
            }
        });
        info!(target: "mock", %addr, "mock backend listening");
        Ok(Self { addr, state, task })
    }

    pub fn addr(&self) -> SocketAddr { self.addr }

    /// Base URL a client should be configured with.
    pub fn api_url(&self) -> String { format!("http://{}{}", self.addr, API_PREFIX) }

    pub fn faults(&self) -> &Faults { &self.state.faults }

    pub fn with_store<R>(&self, f: impl FnOnce(&mut ShopStore) -> R) -> R { f(&mut self.state.store.lock()) }

    pub async fn session_count(&self) -> usize { self.state.sessions.read().await.len() }

    /// Invalidate every server-side session, as if they had all timed out.
    pub async fn drop_sessions(&self) { self.state.sessions.write().await.clear(); }
}

impl Drop for MockServer {
    fn drop(&mut self) { self.task.abort(); }
}

/// Run the mock in the foreground until the process is stopped.
pub async fn serve(opts: MockOptions) -> anyhow::Result<()> {
    let state = MockState::new(ShopStore::seeded(chrono::Utc::now()), opts.page_size);
    let addr = SocketAddr::from(([127, 0, 0, 1], opts.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(target: "mock", addr = %listener.local_addr()?, "mock backend listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_lookup() {
        let mut h = HeaderMap::new();
        h.insert("cookie", HeaderValue::from_static("theme=dark; storefront_session=abc-123; x=1"));
        assert_eq!(parse_cookie(&h, SESSION_COOKIE).as_deref(), Some("abc-123"));
        assert_eq!(parse_cookie(&h, "missing"), None);
    }

    #[test]
    fn session_ids_are_distinct() {
        let a = new_session_id();
        assert_eq!(a.len(), 43);
        assert_ne!(a, new_session_id());
    }
}
