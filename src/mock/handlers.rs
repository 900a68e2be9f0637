use axum::extract::{Multipart, Path, Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};

use super::store::ProductPatch;
use super::{clear_session_cookie, new_session_id, ok_message, ok_with, paginate, parse_cookie, session_cookie};
use super::{MockError, MockResult, MockState, SESSION_COOKIE};
use crate::api::{ProductForm, VerifyPayment};
use crate::error::AppError;
use crate::identity::{Credentials, Role, RoleSet};

#[derive(Debug, Deserialize)]
pub(super) struct PageQuery {
    page: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CartBody {
    product_id: i64,
    #[serde(default)]
    quantity: Option<i64>,
}

const ADMIN: RoleSet = RoleSet::only(Role::Admin);
const BUYER: RoleSet = RoleSet::only(Role::Buyer);
const CS1: RoleSet = RoleSet::only(Role::Cs1);
const CS2: RoleSet = RoleSet::only(Role::Cs2);

pub(super) async fn me(State(st): State<MockState>, headers: HeaderMap) -> MockResult {
    let who = st.require(&headers, RoleSet::of(&Role::ALL)).await?;
    ok_with(who, "Authenticated")
}

pub(super) async fn login(State(st): State<MockState>, Json(body): Json<Credentials>) -> MockResult {
    let identity = st.store.lock().authenticate(&body.email, &body.password)?;
    let sid = new_session_id();
    st.sessions.write().await.insert(sid.clone(), identity.id);
    info!(target: "mock", user = %identity.email, role = %identity.role, "login");
    let mut headers = HeaderMap::new();
    if let Some(cookie) = session_cookie(&sid) {
        headers.insert("Set-Cookie", cookie);
    }
    Ok((headers, Json(serde_json::json!({"success": true, "message": "Login successfully", "data": identity}))).into_response())
}

pub(super) async fn logout(State(st): State<MockState>, headers: HeaderMap) -> MockResult {
    if st.faults.logout_fails() {
        return Err(MockError(AppError::remote("logout_failed", "Logout failed")));
    }
    if let Some(sid) = parse_cookie(&headers, SESSION_COOKIE) {
        st.sessions.write().await.remove(&sid);
    }
    let mut h = HeaderMap::new();
    h.insert("Set-Cookie", clear_session_cookie());
    Ok((h, Json(serde_json::json!({"success": true, "message": "Logout successfully"}))).into_response())
}

pub(super) async fn list_products(State(st): State<MockState>, headers: HeaderMap, Query(q): Query<PageQuery>) -> MockResult {
    st.require(&headers, BUYER).await?;
    st.faults.listing_pause().await;
    let all = st.store.lock().products(false);
    paginate(all, q.page, st.page_size, "/products", "Fetch data success")
}

pub(super) async fn list_all_products(State(st): State<MockState>, headers: HeaderMap, Query(q): Query<PageQuery>) -> MockResult {
    st.require(&headers, ADMIN).await?;
    st.faults.listing_pause().await;
    let all = st.store.lock().products(true);
    paginate(all, q.page, st.page_size, "/products/all", "Fetch products success")
}

pub(super) async fn create_product(State(st): State<MockState>, headers: HeaderMap, Json(form): Json<ProductForm>) -> MockResult {
    st.require(&headers, ADMIN).await?;
    let product = st.store.lock().create_product(form)?;
    ok_with(product, "Product created")
}

pub(super) async fn update_product(
    State(st): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(patch): Json<ProductPatch>,
) -> MockResult {
    st.require(&headers, ADMIN).await?;
    let product = st.store.lock().patch_product(id, patch)?;
    ok_with(product, "Product updated")
}

/// Reads the first file part named `field`: (file name, bytes).
async fn file_part(multipart: &mut Multipart, field: &str) -> Result<(String, Vec<u8>), MockError> {
    let bad = |e: axum::extract::multipart::MultipartError| MockError(AppError::user("multipart_invalid", e.to_string()));
    while let Some(part) = multipart.next_field().await.map_err(bad)? {
        if part.name() == Some(field) {
            let name = part.file_name().unwrap_or("upload").to_string();
            let bytes = part.bytes().await.map_err(bad)?;
            return Ok((name, bytes.to_vec()));
        }
    }
    Err(MockError(AppError::user("file_missing", format!("The {} field is required.", field))))
}

pub(super) async fn import_products(State(st): State<MockState>, headers: HeaderMap, mut multipart: Multipart) -> MockResult {
    st.require(&headers, ADMIN).await?;
    let (name, bytes) = file_part(&mut multipart, "file").await?;
    if !name.to_ascii_lowercase().ends_with(".csv") {
        return Err(MockError(AppError::user("unsupported_sheet", "Only CSV exports can be imported here.")));
    }
    let text = String::from_utf8(bytes).map_err(|_| MockError(AppError::user("sheet_unreadable", "File is not valid UTF-8 text.")))?;
    let added = st.store.lock().import_csv(&text)?;
    debug!(target: "mock", file = %name, added, "import");
    ok_message(&format!("Imported {} products", added))
}

pub(super) async fn cart(State(st): State<MockState>, headers: HeaderMap) -> MockResult {
    let who = st.require(&headers, BUYER).await?;
    let cart = st.store.lock().cart(who.id);
    ok_with(cart, "Fetch cart success")
}

pub(super) async fn cart_add(State(st): State<MockState>, headers: HeaderMap, Json(body): Json<CartBody>) -> MockResult {
    let who = st.require(&headers, BUYER).await?;
    st.store.lock().add_to_cart(who.id, body.product_id, body.quantity.unwrap_or(1))?;
    ok_message("Added to cart")
}

pub(super) async fn cart_remove(State(st): State<MockState>, headers: HeaderMap, Json(body): Json<CartBody>) -> MockResult {
    let who = st.require(&headers, BUYER).await?;
    st.store.lock().remove_from_cart(who.id, body.product_id)?;
    ok_message("Removed from cart")
}

pub(super) async fn cart_update(State(st): State<MockState>, headers: HeaderMap, Json(body): Json<CartBody>) -> MockResult {
    let who = st.require(&headers, BUYER).await?;
    let quantity = body.quantity.ok_or_else(|| MockError(AppError::user("quantity_missing", "The quantity field is required.")))?;
    st.store.lock().update_cart(who.id, body.product_id, quantity)?;
    ok_message("Cart updated")
}

pub(super) async fn checkout(State(st): State<MockState>, headers: HeaderMap) -> MockResult {
    let who = st.require(&headers, BUYER).await?;
    let order = st.store.lock().checkout(who.id, Utc::now())?;
    info!(target: "mock", order = %order.order_number, "checkout");
    ok_with(order, "Checkout successful, please complete the payment")
}

pub(super) async fn list_orders(State(st): State<MockState>, headers: HeaderMap, Query(q): Query<PageQuery>) -> MockResult {
    let who = st.require(&headers, BUYER).await?;
    st.faults.listing_pause().await;
    let all = st.store.lock().orders_of(who.id);
    paginate(all, q.page, st.page_size, "/orders", "Fetch orders successful")
}

pub(super) async fn upload_payment(
    State(st): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> MockResult {
    let who = st.require(&headers, BUYER).await?;
    let (name, bytes) = file_part(&mut multipart, "proof").await?;
    if bytes.is_empty() {
        return Err(MockError(AppError::user("proof_empty", "The proof file is empty.")));
    }
    let ext = name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase()).unwrap_or_else(|| "bin".to_string());
    let stored = format!("payments/{}.{}", uuid::Uuid::new_v4(), ext);
    let order = st.store.lock().attach_proof(who.id, id, stored, Utc::now())?;
    ok_with(order, "Payment proof uploaded")
}

pub(super) async fn waiting_payments(State(st): State<MockState>, headers: HeaderMap, Query(q): Query<PageQuery>) -> MockResult {
    st.require(&headers, CS1).await?;
    st.faults.listing_pause().await;
    let all = st.store.lock().waiting_payments();
    paginate(all, q.page, st.page_size, "/payment/waiting", "Fetch payments success")
}

pub(super) async fn verify_payment(
    State(st): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<VerifyPayment>,
) -> MockResult {
    st.require(&headers, CS1).await?;
    let order = st.store.lock().verify_payment(id, body.approved, &body.notes, Utc::now())?;
    let message = if body.approved { "Payment approved" } else { "Payment rejected" };
    ok_with(order, message)
}

pub(super) async fn list_shipments(State(st): State<MockState>, headers: HeaderMap, Query(q): Query<PageQuery>) -> MockResult {
    st.require(&headers, CS2).await?;
    st.faults.listing_pause().await;
    let all = st.store.lock().shipments();
    paginate(all, q.page, st.page_size, "/shipment", "Get shipment data successful")
}

pub(super) async fn shipment_logs(State(st): State<MockState>, headers: HeaderMap, Path(id): Path<i64>) -> MockResult {
    let who = st.require(&headers, RoleSet::of(&[Role::Buyer, Role::Cs2])).await?;
    let logs = st.store.lock().shipment_logs(id, &who)?;
    ok_with(logs, "Fetch shipment logs success")
}

pub(super) async fn advance_shipment(
    State(st): State<MockState>,
    headers: HeaderMap,
    Path((id, status)): Path<(i64, String)>,
) -> MockResult {
    st.require(&headers, CS2).await?;
    let order = st.store.lock().advance_shipment(id, &status, Utc::now())?;
    ok_with(order, "Status updated")
}
