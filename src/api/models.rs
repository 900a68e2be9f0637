//! Wire shapes of the shop API. Amounts and flags are decoded leniently because
//! the server emits decimals as strings and booleans as 0/1 in places.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

fn de_amount<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Text(String),
    }
    match Option::<Raw>::deserialize(d)? {
        None => Ok(0.0),
        Some(Raw::Num(n)) => Ok(n),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(0.0),
        Some(Raw::Text(s)) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
    }
}

fn de_count<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    let v = de_amount(d)?;
    if v.fract() != 0.0 || !v.is_finite() || v.abs() > i64::MAX as f64 {
        return Err(serde::de::Error::custom(format!("expected a whole number, got {}", v)));
    }
    Ok(v as i64)
}

fn de_flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Num(i64),
        Text(String),
    }
    match Option::<Raw>::deserialize(d)? {
        None => Ok(false),
        Some(Raw::Bool(b)) => Ok(b),
        Some(Raw::Num(n)) => Ok(n != 0),
        Some(Raw::Text(s)) => Ok(matches!(s.trim(), "1" | "true")),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de_amount")]
    pub price: f64,
    #[serde(default, deserialize_with = "de_count")]
    pub stock: i64,
    #[serde(default = "active_default", deserialize_with = "de_flag")]
    pub is_active: bool,
}

fn active_default() -> bool { true }

/// Create/update body for the admin product form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "de_amount")]
    pub price: f64,
    #[serde(default, deserialize_with = "de_count")]
    pub stock: i64,
    #[serde(default = "active_default", deserialize_with = "de_flag")]
    pub is_active: bool,
}

impl Default for ProductForm {
    fn default() -> Self {
        Self { name: String::new(), description: String::new(), price: 0.0, stock: 0, is_active: true }
    }
}

impl From<&Product> for ProductForm {
    fn from(p: &Product) -> Self {
        Self {
            name: p.name.clone(),
            description: p.description.clone().unwrap_or_default(),
            price: p.price,
            stock: p.stock,
            is_active: p.is_active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i64,
    #[serde(deserialize_with = "de_count")]
    pub quantity: i64,
    pub product: Product,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn total_items(&self) -> i64 { self.items.iter().map(|i| i.quantity).sum() }

    pub fn total_price(&self) -> f64 { self.items.iter().map(|i| i.product.price * i.quantity as f64).sum() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingPayment,
    Verified,
    Packing,
    Shipping,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
    #[serde(other)]
    Other,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::Verified => "verified",
            OrderStatus::Packing => "packing",
            OrderStatus::Shipping => "shipping",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Other => "other",
        }
    }

    /// Next step on the shipment desk: verified → packing → shipped → delivered.
    pub fn next_shipment_step(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Verified => Some(OrderStatus::Packing),
            OrderStatus::Packing => Some(OrderStatus::Shipped),
            OrderStatus::Shipped => Some(OrderStatus::Delivered),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    #[serde(default)]
    pub product_name: String,
    #[serde(default, deserialize_with = "de_amount")]
    pub price: f64,
    #[serde(default, deserialize_with = "de_count")]
    pub quantity: i64,
}

impl OrderItem {
    pub fn line_total(&self) -> f64 { self.price * self.quantity as f64 }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub status: String,
    #[serde(default)]
    pub proof_path: Option<String>,
    #[serde(default)]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub status: OrderStatus,
    #[serde(default, deserialize_with = "de_amount")]
    pub total_amount: f64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub expired_at: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub payment: Option<Payment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentLog {
    pub id: i64,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyPayment {
    pub approved: bool,
    #[serde(default)]
    pub notes: String,
}
