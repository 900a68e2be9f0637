//! Shipment desk (cs2): move paid orders through packing, shipped, delivered.

use super::{Submit, SubmitGate, ViewContext};
use crate::api::{shop, Order, OrderStatus};
use crate::error::{AppError, AppResult};
use crate::pagination::{LoadOutcome, Paginator};

pub const NO_FURTHER_STATUS: &str = "Status cannot be updated further.";

pub struct ShipmentDesk {
    ctx: ViewContext,
    orders: Paginator<Order>,
    advance_gate: SubmitGate,
}

impl ShipmentDesk {
    pub fn new(ctx: ViewContext) -> Self {
        Self { ctx, orders: Paginator::new(), advance_gate: SubmitGate::new() }
    }

    pub async fn refresh(&self) -> AppResult<()> {
        let message = self.ctx.reload(&self.orders, shop::SHIPMENTS, "Failed to load shipment data").await?;
        self.ctx.notifier.success_or(message, "Get shipment data successful");
        Ok(())
    }

    pub async fn load_more(&self) -> AppResult<LoadOutcome> { self.ctx.more(&self.orders).await }

    pub fn orders(&self) -> Vec<Order> { self.orders.items() }

    pub fn has_more(&self) -> bool { self.orders.has_more() }

    /// Advance one order to its next shipment step.
    /// Returns `Ok(Submit::Done(None))` with a warning when there is no next step;
    /// no request is made in that case.
    pub async fn advance(&self, order_id: i64) -> AppResult<Submit<Option<OrderStatus>>> {
        let Some(order) = self.orders.with_items(|items| items.iter().find(|o| o.id == order_id).cloned()) else {
            let err = AppError::not_found("order_missing", format!("Order {} is not loaded", order_id));
            return Err(self.ctx.fail(err, "Failed to update status"));
        };
        let Some(next) = order.status.next_shipment_step() else {
            self.ctx.notifier.warning(NO_FURTHER_STATUS);
            return Ok(Submit::Done(None));
        };
        let Some(_permit) = self.advance_gate.try_enter() else { return Ok(Submit::Suppressed) };
        self.ctx
            .api
            .set_shipment_status(order_id, next)
            .await
            .map_err(|e| self.ctx.fail(e, "Failed to update status"))?;
        self.orders.update_where(|o| o.id == order_id, |o| o.status = next);
        self.ctx.notifier.success(format!("Order {} updated to {}", order.order_number, next));
        Ok(Submit::Done(Some(next)))
    }

    pub fn close(&self) { self.orders.close() }
}
