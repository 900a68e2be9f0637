//! In-memory shop data behind the mock backend.

use std::collections::HashMap;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Deserialize;

use crate::api::{Cart, CartItem, Order, OrderItem, OrderStatus, Payment, Product, ProductForm, ShipmentLog};
use crate::error::{AppError, AppResult};
use crate::identity::{Identity, Role};

pub const SEED_PASSWORD: &str = "secret123";

/// Seeded accounts, one per role: (email, display name, role).
pub const SEED_USERS: [(&str, &str, Role); 4] = [
    ("admin@shop.test", "Store Admin", Role::Admin),
    ("buyer@shop.test", "Rina Buyer", Role::Buyer),
    ("cs1@shop.test", "Payment Desk", Role::Cs1),
    ("cs2@shop.test", "Shipment Desk", Role::Cs2),
];

const SEED_PRODUCTS: usize = 25;
const INACTIVE_FROM: usize = 24;
const PAYMENT_WINDOW_HOURS: i64 = 24;

fn stamp(t: DateTime<Utc>) -> String { t.to_rfc3339_opts(SecondsFormat::Secs, true) }

/// Partial product update; absent fields keep their value.
#[derive(Debug, Default, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub is_active: Option<bool>,
}

struct UserRecord {
    identity: Identity,
    password: String,
}

struct CartLine {
    id: i64,
    product_id: i64,
    quantity: i64,
}

struct OrderRecord {
    buyer_id: i64,
    order: Order,
    logs: Vec<ShipmentLog>,
}

pub struct ShopStore {
    users: Vec<UserRecord>,
    products: Vec<Product>,
    carts: HashMap<i64, Vec<CartLine>>,
    orders: Vec<OrderRecord>,
    next_id: i64,
}

impl ShopStore {
    pub fn empty() -> Self {
        let users = SEED_USERS
            .iter()
            .enumerate()
            .map(|(i, (email, name, role))| UserRecord {
                identity: Identity { id: i as i64 + 1, email: email.to_string(), role: *role, name: Some(name.to_string()) },
                password: SEED_PASSWORD.to_string(),
            })
            .collect();
        Self { users, products: Vec::new(), carts: HashMap::new(), orders: Vec::new(), next_id: 100 }
    }

    /// Users, a catalog of products (the last ones inactive) and buyer orders in every stage.
    pub fn seeded(now: DateTime<Utc>) -> Self {
        let mut s = Self::empty();
        for n in 1..=SEED_PRODUCTS {
            let id = s.alloc();
            s.products.push(Product {
                id,
                name: format!("Product {:02}", n),
                description: Some(format!("Seeded catalog item number {}", n)),
                price: 2500.0 * n as f64,
                stock: 10 + n as i64,
                is_active: n < INACTIVE_FROM,
            });
        }
        let buyer = s.user_by_role(Role::Buyer);
        let stages: [(OrderStatus, i64, Option<&str>); 7] = [
            (OrderStatus::PendingPayment, PAYMENT_WINDOW_HOURS, None),
            (OrderStatus::PendingPayment, -1, None),
            (OrderStatus::PendingPayment, 20, Some("pending")),
            (OrderStatus::Verified, 0, Some("verified")),
            (OrderStatus::Packing, 0, Some("verified")),
            (OrderStatus::Shipped, 0, Some("verified")),
            (OrderStatus::Delivered, 0, Some("verified")),
        ];
        for (i, (status, expires_in, payment)) in stages.into_iter().enumerate() {
            let created = now - Duration::hours(48 - i as i64);
            let product = s.products[i].clone();
            let order_id = s.alloc();
            let item_id = s.alloc();
            let payment = match payment {
                Some(st) => Some(Payment {
                    id: s.alloc(),
                    status: st.to_string(),
                    proof_path: Some(format!("payments/seed-{}.jpg", order_id)),
                    admin_notes: None,
                }),
                None => None,
            };
            let mut logs = Vec::new();
            for step in shipment_path_to(status) {
                logs.push(ShipmentLog { id: s.alloc(), status: step.as_str().to_string(), created_at: Some(stamp(created)) });
            }
            s.orders.push(OrderRecord {
                buyer_id: buyer,
                order: Order {
                    id: order_id,
                    order_number: format!("ORD-{:05}", order_id),
                    status,
                    total_amount: product.price,
                    created_at: Some(stamp(created)),
                    expired_at: (status == OrderStatus::PendingPayment).then(|| stamp(now + Duration::hours(expires_in))),
                    items: vec![OrderItem { id: item_id, product_name: product.name, price: product.price, quantity: 1 }],
                    payment,
                },
                logs,
            });
        }
        s
    }

    fn alloc(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn user_by_role(&self, role: Role) -> i64 {
        self.users.iter().find(|u| u.identity.role == role).map(|u| u.identity.id).unwrap_or_default()
    }

    pub fn authenticate(&self, email: &str, password: &str) -> AppResult<Identity> {
        self.users
            .iter()
            .find(|u| u.identity.email.eq_ignore_ascii_case(email.trim()) && u.password == password)
            .map(|u| u.identity.clone())
            .ok_or_else(|| AppError::auth("invalid_credentials", "Invalid email or password"))
    }

    pub fn user(&self, id: i64) -> Option<Identity> {
        self.users.iter().find(|u| u.identity.id == id).map(|u| u.identity.clone())
    }

    pub fn products(&self, include_inactive: bool) -> Vec<Product> {
        self.products.iter().filter(|p| include_inactive || p.is_active).cloned().collect()
    }

    fn product_mut(&mut self, id: i64) -> AppResult<&mut Product> {
        self.products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::not_found("product_missing", "Product not found"))
    }

    fn check_form(form: &ProductForm) -> AppResult<()> {
        if form.name.trim().chars().count() < 2 {
            return Err(AppError::user("name_too_short", "The name field must be at least 2 characters."));
        }
        if form.price < 0.0 || form.stock < 0 {
            return Err(AppError::user("negative_value", "Price and stock must not be negative."));
        }
        Ok(())
    }

    pub fn create_product(&mut self, form: ProductForm) -> AppResult<Product> {
        Self::check_form(&form)?;
        let name = form.name.trim().to_string();
        let product = Product {
            id: self.alloc(),
            name,
            description: Some(form.description).filter(|d| !d.trim().is_empty()),
            price: form.price,
            stock: form.stock,
            is_active: form.is_active,
        };
        self.products.push(product.clone());
        Ok(product)
    }

    pub fn patch_product(&mut self, id: i64, patch: ProductPatch) -> AppResult<Product> {
        if let Some(name) = &patch.name {
            if name.trim().chars().count() < 2 {
                return Err(AppError::user("name_too_short", "The name field must be at least 2 characters."));
            }
        }
        let p = self.product_mut(id)?;
        if let Some(name) = patch.name {
            p.name = name.trim().to_string();
        }
        if let Some(d) = patch.description {
            p.description = Some(d).filter(|d| !d.trim().is_empty());
        }
        if let Some(price) = patch.price {
            p.price = price;
        }
        if let Some(stock) = patch.stock {
            p.stock = stock;
        }
        if let Some(active) = patch.is_active {
            p.is_active = active;
        }
        Ok(p.clone())
    }

    /// Import `name,price,stock[,description]` rows. A header row is skipped.
    /// Every row is checked before any is stored; one bad row imports nothing.
    pub fn import_csv(&mut self, text: &str) -> AppResult<usize> {
        let mut forms = Vec::new();
        for (n, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || (n == 0 && line.to_ascii_lowercase().starts_with("name")) {
                continue;
            }
            let cols: Vec<&str> = line.split(',').map(str::trim).collect();
            let bad_row = || AppError::user("import_row_invalid", format!("Row {} is not valid", n + 1));
            if cols.len() < 3 {
                return Err(bad_row());
            }
            let price = cols[1].parse::<f64>().map_err(|_| bad_row())?;
            let stock = cols[2].parse::<i64>().map_err(|_| bad_row())?;
            let description = cols.get(3).map(|s| s.to_string()).unwrap_or_default();
            let form = ProductForm { name: cols[0].to_string(), description, price, stock, is_active: true };
            Self::check_form(&form).map_err(|e| AppError::user("import_row_invalid", format!("Row {}: {}", n + 1, e.message())))?;
            forms.push(form);
        }
        let added = forms.len();
        for form in forms {
            self.create_product(form)?;
        }
        Ok(added)
    }

    pub fn cart(&self, user_id: i64) -> Cart {
        let items = self
            .carts
            .get(&user_id)
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(|l| {
                        let product = self.products.iter().find(|p| p.id == l.product_id)?.clone();
                        Some(CartItem { id: l.id, quantity: l.quantity, product })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Cart { items }
    }

    fn purchasable(&self, product_id: i64, quantity: i64) -> AppResult<()> {
        let p = self
            .products
            .iter()
            .find(|p| p.id == product_id && p.is_active)
            .ok_or_else(|| AppError::not_found("product_missing", "Product not found"))?;
        if quantity > p.stock {
            return Err(AppError::user("insufficient_stock", format!("Only {} left in stock", p.stock)));
        }
        Ok(())
    }

    pub fn add_to_cart(&mut self, user_id: i64, product_id: i64, quantity: i64) -> AppResult<()> {
        if quantity < 1 {
            return Err(AppError::user("quantity_invalid", "Quantity must be at least 1"));
        }
        let existing = self
            .carts
            .get(&user_id)
            .and_then(|lines| lines.iter().find(|l| l.product_id == product_id))
            .map(|l| l.quantity)
            .unwrap_or(0);
        self.purchasable(product_id, existing + quantity)?;
        let id = self.alloc();
        let lines = self.carts.entry(user_id).or_default();
        match lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity += quantity,
            None => lines.push(CartLine { id, product_id, quantity }),
        }
        Ok(())
    }

    pub fn remove_from_cart(&mut self, user_id: i64, product_id: i64) -> AppResult<()> {
        let lines = self.carts.entry(user_id).or_default();
        let before = lines.len();
        lines.retain(|l| l.product_id != product_id);
        if lines.len() == before {
            return Err(AppError::not_found("cart_item_missing", "Item is not in the cart"));
        }
        Ok(())
    }

    pub fn update_cart(&mut self, user_id: i64, product_id: i64, quantity: i64) -> AppResult<()> {
        if quantity < 1 {
            return Err(AppError::user("quantity_invalid", "Quantity must be at least 1"));
        }
        self.purchasable(product_id, quantity)?;
        let line = self
            .carts
            .get_mut(&user_id)
            .and_then(|lines| lines.iter_mut().find(|l| l.product_id == product_id))
            .ok_or_else(|| AppError::not_found("cart_item_missing", "Item is not in the cart"))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Turn the cart into a pending-payment order and take the stock.
    pub fn checkout(&mut self, user_id: i64, now: DateTime<Utc>) -> AppResult<Order> {
        let cart = self.cart(user_id);
        if cart.items.is_empty() {
            return Err(AppError::user("cart_empty", "Cart is empty"));
        }
        for item in &cart.items {
            self.purchasable(item.product.id, item.quantity)?;
        }
        let mut items = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            let id = self.alloc();
            if let Ok(p) = self.product_mut(item.product.id) {
                p.stock -= item.quantity;
            }
            items.push(OrderItem { id, product_name: item.product.name.clone(), price: item.product.price, quantity: item.quantity });
        }
        let id = self.alloc();
        let order = Order {
            id,
            order_number: format!("ORD-{:05}", id),
            status: OrderStatus::PendingPayment,
            total_amount: cart.total_price(),
            created_at: Some(stamp(now)),
            expired_at: Some(stamp(now + Duration::hours(PAYMENT_WINDOW_HOURS))),
            items,
            payment: None,
        };
        self.orders.push(OrderRecord { buyer_id: user_id, order: order.clone(), logs: Vec::new() });
        self.carts.remove(&user_id);
        Ok(order)
    }

    /// A buyer's orders, newest first.
    pub fn orders_of(&self, user_id: i64) -> Vec<Order> {
        self.orders.iter().rev().filter(|r| r.buyer_id == user_id).map(|r| r.order.clone()).collect()
    }

    fn record_mut(&mut self, order_id: i64) -> AppResult<&mut OrderRecord> {
        self.orders
            .iter_mut()
            .find(|r| r.order.id == order_id)
            .ok_or_else(|| AppError::not_found("order_missing", "Order not found"))
    }

    pub fn attach_proof(&mut self, user_id: i64, order_id: i64, proof_path: String, now: DateTime<Utc>) -> AppResult<Order> {
        let payment_id = self.alloc();
        let rec = self.record_mut(order_id)?;
        if rec.buyer_id != user_id {
            return Err(AppError::not_found("order_missing", "Order not found"));
        }
        if rec.order.status != OrderStatus::PendingPayment {
            return Err(AppError::user("order_not_payable", "Order is not awaiting payment"));
        }
        let expired = rec
            .order
            .expired_at
            .as_deref()
            .and_then(crate::format::parse_timestamp)
            .map(|deadline| deadline < now)
            .unwrap_or(false);
        if expired {
            return Err(AppError::user("order_expired", "This order has expired."));
        }
        let id = rec.order.payment.as_ref().map(|p| p.id).unwrap_or(payment_id);
        rec.order.payment = Some(Payment { id, status: "pending".to_string(), proof_path: Some(proof_path), admin_notes: None });
        Ok(rec.order.clone())
    }

    pub fn shipment_logs(&self, order_id: i64, viewer: &Identity) -> AppResult<Vec<ShipmentLog>> {
        let rec = self
            .orders
            .iter()
            .find(|r| r.order.id == order_id && (viewer.role != Role::Buyer || r.buyer_id == viewer.id))
            .ok_or_else(|| AppError::not_found("order_missing", "Order not found"))?;
        Ok(rec.logs.clone())
    }

    /// Orders carrying a proof that awaits verification, oldest first.
    pub fn waiting_payments(&self) -> Vec<Order> {
        self.orders
            .iter()
            .filter(|r| r.order.status == OrderStatus::PendingPayment)
            .filter(|r| r.order.payment.as_ref().map(|p| p.status == "pending").unwrap_or(false))
            .map(|r| r.order.clone())
            .collect()
    }

    pub fn verify_payment(&mut self, payment_id: i64, approved: bool, notes: &str, now: DateTime<Utc>) -> AppResult<Order> {
        let log_id = self.alloc();
        let rec = self
            .orders
            .iter_mut()
            .find(|r| r.order.payment.as_ref().map(|p| p.id) == Some(payment_id))
            .ok_or_else(|| AppError::not_found("payment_missing", "Payment not found"))?;
        let Some(payment) = rec.order.payment.as_mut() else {
            return Err(AppError::not_found("payment_missing", "Payment not found"));
        };
        if payment.status != "pending" {
            return Err(AppError::user("payment_decided", "Payment was already verified"));
        }
        payment.status = if approved { "verified" } else { "rejected" }.to_string();
        payment.admin_notes = Some(notes.to_string()).filter(|n| !n.trim().is_empty());
        if approved {
            rec.order.status = OrderStatus::Verified;
            rec.logs.push(ShipmentLog { id: log_id, status: OrderStatus::Verified.as_str().to_string(), created_at: Some(stamp(now)) });
        }
        Ok(rec.order.clone())
    }

    /// Paid orders on their way to the customer.
    pub fn shipments(&self) -> Vec<Order> {
        self.orders
            .iter()
            .filter(|r| {
                matches!(r.order.status, OrderStatus::Verified | OrderStatus::Packing | OrderStatus::Shipped | OrderStatus::Delivered)
            })
            .map(|r| r.order.clone())
            .collect()
    }

    /// Only the single next step is accepted.
    pub fn advance_shipment(&mut self, order_id: i64, status: &str, now: DateTime<Utc>) -> AppResult<Order> {
        let log_id = self.alloc();
        let rec = self.record_mut(order_id)?;
        let next = rec.order.status.next_shipment_step();
        match next {
            Some(n) if n.as_str() == status => {
                rec.order.status = n;
                rec.logs.push(ShipmentLog { id: log_id, status: n.as_str().to_string(), created_at: Some(stamp(now)) });
                Ok(rec.order.clone())
            }
            _ => Err(AppError::user(
                "invalid_transition",
                format!("Cannot move order from {} to {}", rec.order.status, status),
            )),
        }
    }
}

// Shipment log entries an order at `status` has accumulated.
fn shipment_path_to(status: OrderStatus) -> Vec<OrderStatus> {
    let path = [OrderStatus::Verified, OrderStatus::Packing, OrderStatus::Shipped, OrderStatus::Delivered];
    match path.iter().position(|s| *s == status) {
        Some(i) => path[..=i].to_vec(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> { Utc::now() }

    #[test]
    fn seed_shapes() {
        let s = ShopStore::seeded(now());
        assert_eq!(s.products(true).len(), SEED_PRODUCTS);
        assert_eq!(s.products(false).len(), INACTIVE_FROM - 1);
        assert_eq!(s.waiting_payments().len(), 1);
        assert_eq!(s.shipments().len(), 4);
        assert_eq!(s.orders_of(2).len(), 7);
        assert!(s.authenticate("BUYER@shop.test", SEED_PASSWORD).is_ok());
        assert!(s.authenticate("buyer@shop.test", "nope").unwrap_err().is_auth());
    }

    #[test]
    fn cart_to_order() {
        let mut s = ShopStore::seeded(now());
        let pid = s.products(false)[0].id;
        let stock = s.products(false)[0].stock;
        s.add_to_cart(2, pid, 1).unwrap();
        s.add_to_cart(2, pid, 1).unwrap();
        assert_eq!(s.cart(2).total_items(), 2);
        assert_eq!(s.update_cart(2, pid, 0).unwrap_err().code_str(), "quantity_invalid");
        assert_eq!(s.add_to_cart(2, pid, stock).unwrap_err().code_str(), "insufficient_stock");

        let order = s.checkout(2, now()).unwrap();
        assert_eq!(order.status, OrderStatus::PendingPayment);
        assert_eq!(order.items[0].quantity, 2);
        assert!(s.cart(2).items.is_empty());
        assert_eq!(s.products(false)[0].stock, stock - 2);
        assert_eq!(s.orders_of(2)[0].id, order.id);
        assert_eq!(s.checkout(2, now()).unwrap_err().code_str(), "cart_empty");
    }

    #[test]
    fn payment_then_shipment() {
        let t = now();
        let mut s = ShopStore::seeded(t);
        let order = s.orders_of(2).into_iter().find(|o| o.payment.is_none() && o.status == OrderStatus::PendingPayment && o.expired_at.as_deref().and_then(crate::format::parse_timestamp).map(|d| d > t).unwrap_or(false)).unwrap();
        let paid = s.attach_proof(2, order.id, "payments/x.png".into(), t).unwrap();
        let payment_id = paid.payment.unwrap().id;
        assert_eq!(s.waiting_payments().len(), 2);

        let verified = s.verify_payment(payment_id, true, " ok ", t).unwrap();
        assert_eq!(verified.status, OrderStatus::Verified);
        assert!(s.verify_payment(payment_id, true, "", t).is_err());

        assert_eq!(s.advance_shipment(order.id, "shipped", t).unwrap_err().code_str(), "invalid_transition");
        assert_eq!(s.advance_shipment(order.id, "packing", t).unwrap().status, OrderStatus::Packing);
        let buyer = s.user(2).unwrap();
        let logs = s.shipment_logs(order.id, &buyer).unwrap();
        assert_eq!(logs.iter().map(|l| l.status.as_str()).collect::<Vec<_>>(), vec!["verified", "packing"]);
    }

    #[test]
    fn expired_orders_refuse_proofs() {
        let t = now();
        let mut s = ShopStore::seeded(t);
        let expired = s
            .orders_of(2)
            .into_iter()
            .find(|o| o.expired_at.as_deref().and_then(crate::format::parse_timestamp).map(|d| d < t).unwrap_or(false))
            .unwrap();
        assert_eq!(s.attach_proof(2, expired.id, "p.png".into(), t).unwrap_err().code_str(), "order_expired");
    }

    #[test]
    fn csv_import() {
        let mut s = ShopStore::empty();
        let n = s.import_csv("name,price,stock\nBolt,1500,100\nNut, 500 , 250, zinc plated\n").unwrap();
        assert_eq!(n, 2);
        assert_eq!(s.products(true)[1].description.as_deref(), Some("zinc plated"));
        assert_eq!(s.import_csv("Washer,abc,1").unwrap_err().code_str(), "import_row_invalid");
    }

    #[test]
    fn csv_import_with_a_bad_row_stores_nothing() {
        let mut s = ShopStore::empty();
        let err = s.import_csv("name,price,stock
Bolt,1500,100
Clamp,900,x
").unwrap_err();
        assert_eq!(err.code_str(), "import_row_invalid");
        assert!(s.products(true).is_empty());

        let err = s.import_csv("Bolt,1500,100
X,10,1
").unwrap_err();
        assert_eq!(err.code_str(), "import_row_invalid");
        assert!(s.products(true).is_empty());
    }
}
