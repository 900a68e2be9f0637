//! Payment verification desk (cs1).

use super::{Submit, SubmitGate, ViewContext};
use crate::api::{shop, Order, VerifyPayment};
use crate::error::{AppError, AppResult};
use crate::pagination::{LoadOutcome, Paginator};

pub struct PaymentDesk {
    ctx: ViewContext,
    waiting: Paginator<Order>,
    verify_gate: SubmitGate,
}

impl PaymentDesk {
    pub fn new(ctx: ViewContext) -> Self {
        Self { ctx, waiting: Paginator::new(), verify_gate: SubmitGate::new() }
    }

    pub async fn refresh(&self) -> AppResult<()> {
        self.ctx.reload(&self.waiting, shop::PAYMENTS_WAITING, "Failed to fetch payments").await?;
        Ok(())
    }

    pub async fn load_more(&self) -> AppResult<LoadOutcome> { self.ctx.more(&self.waiting).await }

    /// Orders whose payment proof awaits a decision.
    pub fn waiting(&self) -> Vec<Order> { self.waiting.items() }

    pub fn has_more(&self) -> bool { self.waiting.has_more() }

    /// Approve or reject the payment attached to `order_id`, then refetch.
    pub async fn verify(&self, order_id: i64, approved: bool, notes: &str) -> AppResult<Submit<()>> {
        let payment_id = self
            .waiting
            .with_items(|items| items.iter().find(|o| o.id == order_id).and_then(|o| o.payment.as_ref()).map(|p| p.id));
        let Some(payment_id) = payment_id else {
            let err = AppError::not_found("payment_missing", format!("No waiting payment for order {}", order_id));
            return Err(self.ctx.fail(err, "Verification failed"));
        };
        let Some(_permit) = self.verify_gate.try_enter() else { return Ok(Submit::Suppressed) };
        let body = VerifyPayment { approved, notes: notes.trim().to_string() };
        let message = self
            .ctx
            .api
            .verify_payment(payment_id, &body)
            .await
            .map_err(|e| self.ctx.fail(e, "Verification failed"))?;
        let fallback = if approved { "Payment approved" } else { "Payment rejected" };
        self.ctx.notifier.success_or(message, fallback);
        self.refresh().await?;
        Ok(Submit::Done(()))
    }

    pub fn close(&self) { self.waiting.close() }
}
