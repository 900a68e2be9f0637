//! Buyer catalog and cart.

use parking_lot::Mutex;
use tracing::info;

use super::{Submit, SubmitGate, ViewContext};
use crate::api::{shop, Cart, Product};
use crate::error::{AppError, AppResult};
use crate::pagination::{LoadOutcome, Paginator};

/// Where the buyer lands after a successful checkout.
pub const CHECKOUT_LANDING: &str = "/my-orders";

pub struct Catalog {
    ctx: ViewContext,
    products: Paginator<Product>,
    cart: Mutex<Cart>,
    cart_gate: SubmitGate,
    checkout_gate: SubmitGate,
}

impl Catalog {
    pub fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            products: Paginator::new(),
            cart: Mutex::new(Cart::default()),
            cart_gate: SubmitGate::new(),
            checkout_gate: SubmitGate::new(),
        }
    }

    /// Load the first product page and the cart.
    pub async fn open(&self) -> AppResult<()> {
        self.refresh_products().await?;
        self.refresh_cart().await?;
        Ok(())
    }

    pub async fn refresh_products(&self) -> AppResult<()> {
        let message = self.ctx.reload(&self.products, shop::PRODUCTS, "Failed to fetch data!").await?;
        self.ctx.notifier.success_or(message, "Fetch data success");
        Ok(())
    }

    pub async fn load_more(&self) -> AppResult<LoadOutcome> { self.ctx.more(&self.products).await }

    pub fn products(&self) -> Vec<Product> { self.products.items() }

    pub fn has_more(&self) -> bool { self.products.has_more() }

    pub async fn refresh_cart(&self) -> AppResult<Cart> {
        let cart = self.ctx.api.cart().await.map_err(|e| self.ctx.fail(e, "Failed to fetch data!"))?;
        *self.cart.lock() = cart.clone();
        Ok(cart)
    }

    pub fn cart(&self) -> Cart { self.cart.lock().clone() }

    pub fn cart_count(&self) -> i64 { self.cart.lock().total_items() }

    pub fn cart_total(&self) -> f64 { self.cart.lock().total_price() }

    pub fn find_product(&self, id: i64) -> Option<Product> {
        self.products.with_items(|items| items.iter().find(|p| p.id == id).cloned())
    }

    pub async fn add_to_cart(&self, product: &Product) -> AppResult<Submit<()>> {
        let Some(_permit) = self.cart_gate.try_enter() else { return Ok(Submit::Suppressed) };
        let fallback = format!("Failed to add {}", product.name);
        self.ctx.api.add_to_cart(product.id, 1).await.map_err(|e| self.ctx.fail(e, &fallback))?;
        self.ctx.notifier.success(format!("{} added to cart!", product.name));
        self.refresh_cart().await?;
        Ok(Submit::Done(()))
    }

    pub async fn remove_from_cart(&self, product_id: i64) -> AppResult<Submit<()>> {
        let Some(_permit) = self.cart_gate.try_enter() else { return Ok(Submit::Suppressed) };
        self.ctx.api.remove_from_cart(product_id).await.map_err(|e| self.ctx.fail(e, "Failed to remove item"))?;
        self.ctx.notifier.success("Item removed from cart");
        self.refresh_cart().await?;
        Ok(Submit::Done(()))
    }

    pub async fn update_quantity(&self, product_id: i64, quantity: i64) -> AppResult<Submit<()>> {
        if quantity < 1 {
            let err = AppError::user("quantity_invalid", "Quantity must be at least 1");
            return Err(self.ctx.fail(err, "Failed to update quantity"));
        }
        let Some(_permit) = self.cart_gate.try_enter() else { return Ok(Submit::Suppressed) };
        self.ctx
            .api
            .update_cart_quantity(product_id, quantity)
            .await
            .map_err(|e| self.ctx.fail(e, "Failed to update quantity"))?;
        self.ctx.notifier.success("Item quantity updated");
        self.refresh_cart().await?;
        Ok(Submit::Done(()))
    }

    /// Place the order for the whole cart. Returns the route to land on.
    pub async fn checkout(&self) -> AppResult<Submit<&'static str>> {
        let Some(_permit) = self.checkout_gate.try_enter() else { return Ok(Submit::Suppressed) };
        if self.cart.lock().items.is_empty() {
            return Err(self.ctx.fail(AppError::user("cart_empty", "Your cart is empty"), "Failed to checkout"));
        }
        let message = self.ctx.api.checkout().await.map_err(|e| self.ctx.fail(e, "Failed to checkout"))?;
        info!(target: "views", "checkout placed");
        self.ctx.notifier.success_or(message, "Checkout successful!");
        *self.cart.lock() = Cart::default();
        Ok(Submit::Done(CHECKOUT_LANDING))
    }

    /// Teardown: late listing responses are dropped.
    pub fn close(&self) { self.products.close() }
}
