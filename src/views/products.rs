//! Admin product master: create, edit, activate/deactivate, spreadsheet import.

use std::path::Path;

use super::{Submit, SubmitGate, ViewContext};
use crate::api::{shop, Product, ProductForm};
use crate::error::{AppError, AppResult};
use crate::pagination::{LoadOutcome, Paginator};

const NAME_TOO_SHORT: &str = "Name minimal 2 characters";

fn validate(form: &ProductForm) -> AppResult<()> {
    if form.name.trim().chars().count() < 2 {
        return Err(AppError::user("name_too_short", NAME_TOO_SHORT));
    }
    if form.price < 0.0 || !form.price.is_finite() {
        return Err(AppError::user("price_invalid", "Price must not be negative"));
    }
    if form.stock < 0 {
        return Err(AppError::user("stock_invalid", "Stock must not be negative"));
    }
    Ok(())
}

pub struct ProductAdmin {
    ctx: ViewContext,
    products: Paginator<Product>,
    form_gate: SubmitGate,
    toggle_gate: SubmitGate,
    import_gate: SubmitGate,
}

impl ProductAdmin {
    pub fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            products: Paginator::new(),
            form_gate: SubmitGate::new(),
            toggle_gate: SubmitGate::new(),
            import_gate: SubmitGate::new(),
        }
    }

    pub async fn refresh(&self) -> AppResult<()> {
        self.ctx.reload(&self.products, shop::PRODUCTS_ALL, "Failed to fetch products").await?;
        Ok(())
    }

    pub async fn load_more(&self) -> AppResult<LoadOutcome> { self.ctx.more(&self.products).await }

    pub fn products(&self) -> Vec<Product> { self.products.items() }

    pub fn has_more(&self) -> bool { self.products.has_more() }

    pub fn find(&self, id: i64) -> Option<Product> {
        self.products.with_items(|items| items.iter().find(|p| p.id == id).cloned())
    }

    pub async fn create(&self, form: &ProductForm) -> AppResult<Submit<()>> {
        validate(form).map_err(|e| self.ctx.fail(e, "Error adding product"))?;
        let Some(_permit) = self.form_gate.try_enter() else { return Ok(Submit::Suppressed) };
        let message = self.ctx.api.create_product(form).await.map_err(|e| self.ctx.fail(e, "Error adding product"))?;
        self.ctx.notifier.success_or(message, "Product added!");
        self.refresh().await?;
        Ok(Submit::Done(()))
    }

    pub async fn update(&self, id: i64, form: &ProductForm) -> AppResult<Submit<()>> {
        validate(form).map_err(|e| self.ctx.fail(e, "Update failed"))?;
        let Some(_permit) = self.form_gate.try_enter() else { return Ok(Submit::Suppressed) };
        let message = self.ctx.api.update_product(id, form).await.map_err(|e| self.ctx.fail(e, "Update failed"))?;
        self.ctx.notifier.success_or(message, "Updated successfully");
        self.refresh().await?;
        Ok(Submit::Done(()))
    }

    /// Flip `is_active`. The loaded row changes only once the server accepted it.
    pub async fn toggle_active(&self, id: i64) -> AppResult<Submit<bool>> {
        let Some(current) = self.find(id).map(|p| p.is_active) else {
            return Err(self.ctx.fail(AppError::not_found("product_missing", format!("Product {} is not loaded", id)), "Failed toggling status"));
        };
        let Some(_permit) = self.toggle_gate.try_enter() else { return Ok(Submit::Suppressed) };
        let next = !current;
        let message = self
            .ctx
            .api
            .set_product_active(id, next)
            .await
            .map_err(|e| self.ctx.fail(e, "Failed toggling status"))?;
        self.products.update_where(|p| p.id == id, |p| p.is_active = next);
        self.ctx.notifier.success_or(message, "Status updated");
        Ok(Submit::Done(next))
    }

    pub async fn import(&self, sheet: Option<&Path>) -> AppResult<Submit<()>> {
        let Some(sheet) = sheet else {
            let err = AppError::user("file_missing", "Please select an Excel file!");
            return Err(self.ctx.fail(err, "Import failed"));
        };
        let Some(_permit) = self.import_gate.try_enter() else { return Ok(Submit::Suppressed) };
        let message = self.ctx.api.import_products(sheet).await.map_err(|e| self.ctx.fail(e, "Import failed"))?;
        self.ctx.notifier.success_or(message, "Import success!");
        self.refresh().await?;
        Ok(Submit::Done(()))
    }

    pub fn close(&self) { self.products.close() }
}
