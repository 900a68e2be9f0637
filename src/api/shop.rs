//! Typed calls for the shop endpoints used by the page controllers.
//! Each mutation returns the server's `message` so callers can show it.

use std::path::Path;

use serde_json::{json, Value};

use super::models::{Cart, OrderStatus, ProductForm, ShipmentLog, VerifyPayment};
use super::{ApiClient, Envelope};
use crate::error::AppResult;

pub const PRODUCTS: &str = "/products";
pub const PRODUCTS_ALL: &str = "/products/all";
pub const ORDERS: &str = "/orders";
pub const PAYMENTS_WAITING: &str = "/payment/waiting";
pub const SHIPMENTS: &str = "/shipment";

impl ApiClient {
    pub async fn cart(&self) -> AppResult<Cart> {
        let env: Envelope<Cart> = self.get("/cart").await?;
        Ok(env.data.unwrap_or_default())
    }

    pub async fn add_to_cart(&self, product_id: i64, quantity: i64) -> AppResult<Option<String>> {
        let env: Envelope<Value> = self.post("/cart/add", Some(&json!({"product_id": product_id, "quantity": quantity}))).await?;
        Ok(env.message)
    }

    pub async fn remove_from_cart(&self, product_id: i64) -> AppResult<Option<String>> {
        let env: Envelope<Value> = self.post("/cart/remove", Some(&json!({"product_id": product_id}))).await?;
        Ok(env.message)
    }

    pub async fn update_cart_quantity(&self, product_id: i64, quantity: i64) -> AppResult<Option<String>> {
        let env: Envelope<Value> = self.put("/cart/update", Some(&json!({"product_id": product_id, "quantity": quantity}))).await?;
        Ok(env.message)
    }

    pub async fn checkout(&self) -> AppResult<Option<String>> {
        let env: Envelope<Value> = self.post::<Value, _>("/order/checkout", None).await?;
        Ok(env.message)
    }

    pub async fn shipment_logs(&self, order_id: i64) -> AppResult<Vec<ShipmentLog>> {
        let env: Envelope<Vec<ShipmentLog>> = self.get(&format!("/shipment/{}/logs", order_id)).await?;
        Ok(env.data.unwrap_or_default())
    }

    pub async fn upload_payment_proof(&self, order_id: i64, proof: &Path) -> AppResult<Option<String>> {
        let env: Envelope<Value> = self.upload(&format!("/orders/{}/payments", order_id), "proof", proof).await?;
        Ok(env.message)
    }

    pub async fn create_product(&self, form: &ProductForm) -> AppResult<Option<String>> {
        let env: Envelope<Value> = self.post(PRODUCTS, Some(form)).await?;
        Ok(env.message)
    }

    pub async fn update_product(&self, id: i64, form: &ProductForm) -> AppResult<Option<String>> {
        let env: Envelope<Value> = self.put(&format!("/products/{}", id), Some(form)).await?;
        Ok(env.message)
    }

    pub async fn set_product_active(&self, id: i64, active: bool) -> AppResult<Option<String>> {
        let env: Envelope<Value> = self.put(&format!("/products/{}", id), Some(&json!({"is_active": active}))).await?;
        Ok(env.message)
    }

    pub async fn import_products(&self, sheet: &Path) -> AppResult<Option<String>> {
        let env: Envelope<Value> = self.upload("/products/import", "file", sheet).await?;
        Ok(env.message)
    }

    pub async fn verify_payment(&self, payment_id: i64, body: &VerifyPayment) -> AppResult<Option<String>> {
        let env: Envelope<Value> = self.put(&format!("/payments/{}/verify", payment_id), Some(body)).await?;
        Ok(env.message)
    }

    pub async fn set_shipment_status(&self, order_id: i64, status: OrderStatus) -> AppResult<Option<String>> {
        let env: Envelope<Value> = self.put::<Value, _>(&format!("/shipment/{}/status/{}", order_id, status), None).await?;
        Ok(env.message)
    }
}
