//! Buyer order history: tracking and payment proof upload.

use std::path::Path;

use chrono::{DateTime, Utc};

use super::{Submit, SubmitGate, ViewContext};
use crate::api::{shop, Order, OrderStatus, ShipmentLog};
use crate::error::{AppError, AppResult};
use crate::format::parse_timestamp;
use crate::pagination::{LoadOutcome, Paginator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Success,
    Warning,
    Info,
    Primary,
    Danger,
    Neutral,
}

pub fn status_tone(status: OrderStatus) -> StatusTone {
    match status {
        OrderStatus::Completed | OrderStatus::Delivered => StatusTone::Success,
        OrderStatus::PendingPayment => StatusTone::Warning,
        OrderStatus::Packing | OrderStatus::Shipping | OrderStatus::Shipped => StatusTone::Info,
        OrderStatus::Verified => StatusTone::Primary,
        OrderStatus::Cancelled => StatusTone::Danger,
        _ => StatusTone::Neutral,
    }
}

/// An unpaid order whose payment window has passed.
pub fn is_expired(order: &Order, now: DateTime<Utc>) -> bool {
    if order.status != OrderStatus::PendingPayment {
        return false;
    }
    order
        .expired_at
        .as_deref()
        .and_then(parse_timestamp)
        .map(|deadline| deadline < now)
        .unwrap_or(false)
}

pub fn can_upload_payment(order: &Order, now: DateTime<Utc>) -> bool {
    order.status == OrderStatus::PendingPayment && !is_expired(order, now)
}

/// Orders that have entered the shipment flow and so carry a timeline.
pub fn can_track(order: &Order) -> bool {
    matches!(
        order.status,
        OrderStatus::Packing | OrderStatus::Shipped | OrderStatus::Delivered | OrderStatus::Shipping | OrderStatus::Completed
    )
}

pub struct MyOrders {
    ctx: ViewContext,
    orders: Paginator<Order>,
    upload_gate: SubmitGate,
}

impl MyOrders {
    pub fn new(ctx: ViewContext) -> Self {
        Self { ctx, orders: Paginator::new(), upload_gate: SubmitGate::new() }
    }

    pub async fn refresh(&self) -> AppResult<()> {
        let message = self.ctx.reload(&self.orders, shop::ORDERS, "Failed to fetch orders data").await?;
        self.ctx.notifier.success_or(message, "Fetch orders successful");
        Ok(())
    }

    pub async fn load_more(&self) -> AppResult<LoadOutcome> { self.ctx.more(&self.orders).await }

    pub fn orders(&self) -> Vec<Order> { self.orders.items() }

    pub fn has_more(&self) -> bool { self.orders.has_more() }

    pub fn find(&self, order_id: i64) -> Option<Order> {
        self.orders.with_items(|items| items.iter().find(|o| o.id == order_id).cloned())
    }

    /// Shipment timeline for one order, oldest first as the server sends it.
    pub async fn tracking(&self, order_id: i64) -> AppResult<Vec<ShipmentLog>> {
        self.ctx
            .api
            .shipment_logs(order_id)
            .await
            .map_err(|e| self.ctx.fail(e, "Failed to fetch shipment data"))
    }

    /// Upload a payment proof, then refetch the listing.
    pub async fn upload_proof(&self, order_id: i64, proof: Option<&Path>) -> AppResult<Submit<()>> {
        let Some(proof) = proof else {
            return Err(self.ctx.fail(AppError::user("proof_missing", "Please select a payment proof file"), "Upload failed"));
        };
        let Some(_permit) = self.upload_gate.try_enter() else { return Ok(Submit::Suppressed) };
        let message = self
            .ctx
            .api
            .upload_payment_proof(order_id, proof)
            .await
            .map_err(|e| self.ctx.fail(e, "Upload failed"))?;
        self.ctx.notifier.success_or(message, "Upload proof data success");
        self.refresh().await?;
        Ok(Submit::Done(()))
    }

    pub fn close(&self) { self.orders.close() }
}
