//! Terminal front end: command parsing, the interactive `Shell`, table output.
//!
//! The shell owns one instance of each page controller and a `Navigator`.
//! Every screen command re-runs the guard first, so a session that expired
//! mid-way sends the user back to the login surface instead of acting.

pub mod outputformatter;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::api::{ApiClient, ProductForm};
use crate::config::ClientConfig;
use crate::error::AppResult;
use crate::format::{format_date, format_idr};
use crate::identity::{SessionState, SessionStore, WRONG_CREDENTIALS};
use crate::notify::Notifier;
use crate::pagination::LoadOutcome;
use crate::routing::{Navigation, Navigator, RedirectReason, Screen, LOGIN_PATH};
use crate::views::orders::{can_track, can_upload_payment, is_expired};
use crate::views::{Catalog, MyOrders, PaymentDesk, ProductAdmin, ShipmentDesk, Submit, ViewContext};
use outputformatter::render_table;

pub const HELP: &str = "\
Session:
  login <email> <password>     sign in and open your home screen
  logout                       sign out
  whoami                       show the current session
  go <path>                    open a screen (/buyer, /my-orders, /admin, /cs1, /cs2)
  menu                         list the screens you may open
Listings (current screen):
  list                         reload and print the first page
  more                         load the next page
Buyer (/buyer):
  cart                         show the cart
  add <product_id>             add one unit to the cart
  remove <product_id>          remove a product from the cart
  qty <product_id> <n>         set the quantity (n >= 1)
  checkout                     place the order
Buyer (/my-orders):
  track <order_id>             show the shipment timeline
  pay <order_id> <file>        upload a payment proof
Admin (/admin):
  create <price> <stock> <name...>
  toggle <product_id>          activate / deactivate a product
  import <file>                import products from a spreadsheet export
Payments (/cs1):
  verify <order_id> approve|reject [notes...]
Shipments (/cs2):
  advance <order_id>           move the order to its next shipment step
Other:
  help, quit";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}' (type 'help')")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("'{0}' is not a valid number")]
    BadNumber(String),
    #[error("'{command}' is not available here (current screen: {location})")]
    WrongScreen { command: &'static str, location: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { email: String, password: String },
    Logout,
    Whoami,
    Go(String),
    Menu,
    List,
    More,
    Cart,
    Add(i64),
    Remove(i64),
    Qty { product_id: i64, quantity: i64 },
    Checkout,
    Track(i64),
    Pay { order_id: i64, file: Option<PathBuf> },
    Create(ProductForm),
    Toggle(i64),
    Import(Option<PathBuf>),
    Verify { order_id: i64, approved: bool, notes: String },
    Advance(i64),
    Help,
    Quit,
}

fn number<T: std::str::FromStr>(raw: Option<&str>, usage: &'static str) -> Result<T, CommandError> {
    let raw = raw.ok_or(CommandError::Usage(usage))?;
    raw.parse::<T>().map_err(|_| CommandError::BadNumber(raw.to_string()))
}

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else { return Err(CommandError::Usage("<command> [args...]")) };
    let rest: Vec<&str> = parts.collect();
    let arg = |i: usize| rest.get(i).copied();
    let tail = |from: usize| rest.get(from..).map(|s| s.join(" ")).unwrap_or_default();
    let cmd = match head.to_ascii_lowercase().as_str() {
        "login" => match (arg(0), arg(1)) {
            (Some(e), Some(p)) => Command::Login { email: e.to_string(), password: p.to_string() },
            _ => return Err(CommandError::Usage("login <email> <password>")),
        },
        "logout" => Command::Logout,
        "whoami" => Command::Whoami,
        "go" => Command::Go(arg(0).ok_or(CommandError::Usage("go <path>"))?.to_string()),
        "menu" => Command::Menu,
        "list" => Command::List,
        "more" => Command::More,
        "cart" => Command::Cart,
        "add" => Command::Add(number(arg(0), "add <product_id>")?),
        "remove" => Command::Remove(number(arg(0), "remove <product_id>")?),
        "qty" => Command::Qty {
            product_id: number(arg(0), "qty <product_id> <n>")?,
            quantity: number(arg(1), "qty <product_id> <n>")?,
        },
        "checkout" => Command::Checkout,
        "track" => Command::Track(number(arg(0), "track <order_id>")?),
        "pay" => Command::Pay { order_id: number(arg(0), "pay <order_id> <file>")?, file: arg(1).map(PathBuf::from) },
        "create" => {
            let usage = "create <price> <stock> <name...>";
            let price: f64 = number(arg(0), usage)?;
            let stock: i64 = number(arg(1), usage)?;
            Command::Create(ProductForm { name: tail(2), price, stock, ..ProductForm::default() })
        }
        "toggle" => Command::Toggle(number(arg(0), "toggle <product_id>")?),
        "import" => Command::Import(arg(0).map(PathBuf::from)),
        "verify" => {
            let usage = "verify <order_id> approve|reject [notes...]";
            let order_id = number(arg(0), usage)?;
            let approved = match arg(1).map(|s| s.to_ascii_lowercase()) {
                Some(d) if d == "approve" => true,
                Some(d) if d == "reject" => false,
                _ => return Err(CommandError::Usage(usage)),
            };
            Command::Verify { order_id, approved, notes: tail(2) }
        }
        "advance" => Command::Advance(number(arg(0), "advance <order_id>")?),
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(cmd)
}

/// What a command printed, and whether the shell should stop.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub quit: bool,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self { Self { text: text.into(), quit: false } }
}

pub struct Shell {
    session: Arc<SessionStore>,
    notifier: Arc<Notifier>,
    nav: Navigator,
    catalog: Catalog,
    orders: MyOrders,
    products: ProductAdmin,
    payments: PaymentDesk,
    shipments: ShipmentDesk,
}

impl Shell {
    pub fn new(config: ClientConfig) -> AppResult<Self> {
        let api = Arc::new(ApiClient::new(config)?);
        let session = Arc::new(SessionStore::new(api.clone()));
        let notifier = Arc::new(Notifier::new());
        let ctx = ViewContext::new(api, session.clone(), notifier.clone());
        Ok(Self {
            nav: Navigator::new(session.clone()),
            session,
            notifier,
            catalog: Catalog::new(ctx.clone()),
            orders: MyOrders::new(ctx.clone()),
            products: ProductAdmin::new(ctx.clone()),
            payments: PaymentDesk::new(ctx.clone()),
            shipments: ShipmentDesk::new(ctx),
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> { &self.session }

    pub fn notifier(&self) -> &Arc<Notifier> { &self.notifier }

    pub fn location(&self) -> String { self.nav.location() }

    /// Restore any existing session and open the screen it lands on.
    pub async fn start(&self) -> Reply {
        self.session.initialize().await;
        let here = match self.session.current().role() {
            Some(role) => role.home_path(),
            None => LOGIN_PATH,
        };
        self.open(here).await
    }

    pub async fn execute(&self, line: &str) -> Result<Reply, CommandError> {
        let cmd = parse_command(line)?;
        // Failed calls already pushed a notice; the shell prints notices separately.
        let reply = match cmd {
            Command::Help => Reply::text(HELP),
            Command::Quit => Reply { text: String::new(), quit: true },
            Command::Login { email, password } => self.login(&email, &password).await,
            Command::Logout => self.logout().await,
            Command::Whoami => Reply::text(describe_session(&self.session.current())),
            Command::Go(path) => self.open(&path).await,
            Command::Menu => {
                let links = self.nav.menu();
                if links.is_empty() {
                    Reply::text("(no screens available; log in first)")
                } else {
                    Reply::text(links.iter().map(|l| format!("{:<20} {}", l.label, l.path)).collect::<Vec<_>>().join("\n"))
                }
            }
            Command::List => {
                let screen = self.current_screen();
                let _ = self.load(screen).await;
                Reply::text(self.render(screen))
            }
            Command::More => self.more().await,
            Command::Cart => {
                self.require(Screen::Catalog, "cart")?;
                let _ = self.catalog.refresh_cart().await;
                Reply::text(self.render_cart())
            }
            Command::Add(id) => {
                self.require(Screen::Catalog, "add")?;
                match self.catalog.find_product(id) {
                    Some(p) => self.submitted(self.catalog.add_to_cart(&p).await, || self.render_cart()),
                    None => {
                        self.notifier.warning(format!("Product {} is not in the list", id));
                        Reply::default()
                    }
                }
            }
            Command::Remove(id) => {
                self.require(Screen::Catalog, "remove")?;
                self.submitted(self.catalog.remove_from_cart(id).await, || self.render_cart())
            }
            Command::Qty { product_id, quantity } => {
                self.require(Screen::Catalog, "qty")?;
                self.submitted(self.catalog.update_quantity(product_id, quantity).await, || self.render_cart())
            }
            Command::Checkout => {
                self.require(Screen::Catalog, "checkout")?;
                match self.catalog.checkout().await {
                    Ok(Submit::Done(landing)) => self.open(landing).await,
                    Ok(Submit::Suppressed) => Reply::text("(checkout already in progress)"),
                    Err(_) => Reply::default(),
                }
            }
            Command::Track(order_id) => {
                self.require(Screen::MyOrders, "track")?;
                match self.orders.tracking(order_id).await {
                    Ok(logs) => {
                        let rows: Vec<Vec<String>> = logs
                            .iter()
                            .map(|l| vec![l.status.clone(), l.created_at.as_deref().map(format_date).unwrap_or_default()])
                            .collect();
                        Reply::text(render_table(&["status", "at"], &rows))
                    }
                    Err(_) => Reply::default(),
                }
            }
            Command::Pay { order_id, file } => {
                self.require(Screen::MyOrders, "pay")?;
                self.submitted(self.orders.upload_proof(order_id, file.as_deref()).await, || self.render(Some(Screen::MyOrders)))
            }
            Command::Create(form) => {
                self.require(Screen::ProductAdmin, "create")?;
                self.submitted(self.products.create(&form).await, || self.render(Some(Screen::ProductAdmin)))
            }
            Command::Toggle(id) => {
                self.require(Screen::ProductAdmin, "toggle")?;
                self.submitted(self.products.toggle_active(id).await, || self.render(Some(Screen::ProductAdmin)))
            }
            Command::Import(file) => {
                self.require(Screen::ProductAdmin, "import")?;
                self.submitted(self.products.import(file.as_deref()).await, || self.render(Some(Screen::ProductAdmin)))
            }
            Command::Verify { order_id, approved, notes } => {
                self.require(Screen::PaymentDesk, "verify")?;
                self.submitted(self.payments.verify(order_id, approved, &notes).await, || self.render(Some(Screen::PaymentDesk)))
            }
            Command::Advance(order_id) => {
                self.require(Screen::ShipmentDesk, "advance")?;
                self.submitted(self.shipments.advance(order_id).await, || self.render(Some(Screen::ShipmentDesk)))
            }
        };
        Ok(reply)
    }

    async fn login(&self, email: &str, password: &str) -> Reply {
        match self.session.login(email, password).await {
            Ok(identity) => {
                self.notifier.success("Login successfully");
                self.open(identity.role.home_path()).await
            }
            Err(e) => {
                self.notifier.failure(&e, WRONG_CREDENTIALS);
                Reply::default()
            }
        }
    }

    async fn logout(&self) -> Reply {
        match self.session.logout().await {
            Ok(()) => self.notifier.success("Logout successfully"),
            Err(_) => self.notifier.error("Logout failed, please try again!"),
        }
        self.close_views();
        self.open(LOGIN_PATH).await
    }

    fn close_views(&self) {
        self.catalog.close();
        self.orders.close();
        self.products.close();
        self.payments.close();
        self.shipments.close();
    }

    /// Navigate, then load and print the screen it lands on.
    async fn open(&self, path: &str) -> Reply {
        let nav = self.nav.navigate(path);
        let mut lines = vec![describe_navigation(&nav)];
        let screen = nav.screen();
        if self.load(screen).await.is_ok() {
            lines.push(self.render(screen));
        }
        // A listing may have expired the session; show where that leaves us.
        if let Navigation::Rendered { redirects, .. } = self.nav.revalidate() {
            if redirects.iter().any(|(_, r)| *r == RedirectReason::Unauthenticated) {
                lines.push("session expired; please log in again".to_string());
            }
        }
        Reply::text(lines.join("\n"))
    }

    fn current_screen(&self) -> Option<Screen> { self.nav.revalidate().screen() }

    fn require(&self, want: Screen, command: &'static str) -> Result<(), CommandError> {
        match self.current_screen() {
            Some(s) if s == want => Ok(()),
            _ => Err(CommandError::WrongScreen { command, location: self.nav.location() }),
        }
    }

    async fn load(&self, screen: Option<Screen>) -> AppResult<()> {
        match screen {
            Some(Screen::Catalog) => self.catalog.open().await,
            Some(Screen::MyOrders) => self.orders.refresh().await,
            Some(Screen::ProductAdmin) => self.products.refresh().await,
            Some(Screen::PaymentDesk) => self.payments.refresh().await,
            Some(Screen::ShipmentDesk) => self.shipments.refresh().await,
            Some(Screen::Login) | None => Ok(()),
        }
    }

    async fn more(&self) -> Reply {
        let screen = self.current_screen();
        let outcome = match screen {
            Some(Screen::Catalog) => self.catalog.load_more().await,
            Some(Screen::MyOrders) => self.orders.load_more().await,
            Some(Screen::ProductAdmin) => self.products.load_more().await,
            Some(Screen::PaymentDesk) => self.payments.load_more().await,
            Some(Screen::ShipmentDesk) => self.shipments.load_more().await,
            Some(Screen::Login) | None => return Reply::text("(nothing to load here)"),
        };
        match outcome {
            Ok(LoadOutcome::Appended { .. }) => Reply::text(self.render(screen)),
            Ok(LoadOutcome::Exhausted) => Reply::text("(no more items)"),
            Ok(LoadOutcome::Busy) => Reply::text("(already loading)"),
            Ok(LoadOutcome::Stale) => Reply::default(),
            Err(_) => Reply::default(),
        }
    }

    fn submitted<T>(&self, result: AppResult<Submit<T>>, render: impl FnOnce() -> String) -> Reply {
        match result {
            Ok(Submit::Done(_)) => Reply::text(render()),
            Ok(Submit::Suppressed) => Reply::text("(still submitting; try again shortly)"),
            Err(_) => Reply::default(),
        }
    }

    fn render(&self, screen: Option<Screen>) -> String {
        let (table, more) = match screen {
            Some(Screen::Catalog) => {
                let rows: Vec<Vec<String>> = self
                    .catalog
                    .products()
                    .iter()
                    .map(|p| vec![p.id.to_string(), p.name.clone(), format_idr(p.price), p.stock.to_string()])
                    .collect();
                let summary = format!("cart: {} item(s), {}", self.catalog.cart_count(), format_idr(self.catalog.cart_total()));
                (format!("{}\n{}", render_table(&["id", "product", "price", "stock"], &rows), summary), self.catalog.has_more())
            }
            Some(Screen::MyOrders) => {
                let now = Utc::now();
                let rows: Vec<Vec<String>> = self
                    .orders
                    .orders()
                    .iter()
                    .map(|o| {
                        let action = if is_expired(o, now) {
                            "expired"
                        } else if can_upload_payment(o, now) {
                            "pay"
                        } else if can_track(o) {
                            "track"
                        } else {
                            ""
                        };
                        vec![
                            o.id.to_string(),
                            o.order_number.clone(),
                            o.status.to_string(),
                            format_idr(o.total_amount),
                            o.created_at.as_deref().map(format_date).unwrap_or_default(),
                            action.to_string(),
                        ]
                    })
                    .collect();
                (render_table(&["id", "order", "status", "total", "created", "action"], &rows), self.orders.has_more())
            }
            Some(Screen::ProductAdmin) => {
                let rows: Vec<Vec<String>> = self
                    .products
                    .products()
                    .iter()
                    .map(|p| {
                        vec![
                            p.id.to_string(),
                            p.name.clone(),
                            format_idr(p.price),
                            p.stock.to_string(),
                            if p.is_active { "active" } else { "inactive" }.to_string(),
                        ]
                    })
                    .collect();
                (render_table(&["id", "product", "price", "stock", "status"], &rows), self.products.has_more())
            }
            Some(Screen::PaymentDesk) => {
                let rows: Vec<Vec<String>> = self
                    .payments
                    .waiting()
                    .iter()
                    .map(|o| {
                        let payment = o.payment.as_ref();
                        vec![
                            o.id.to_string(),
                            o.order_number.clone(),
                            format_idr(o.total_amount),
                            payment.map(|p| p.status.replace('_', " ")).unwrap_or_default(),
                            payment.and_then(|p| p.proof_path.clone()).unwrap_or_default(),
                        ]
                    })
                    .collect();
                (render_table(&["id", "order", "amount", "payment", "proof"], &rows), self.payments.has_more())
            }
            Some(Screen::ShipmentDesk) => {
                let rows: Vec<Vec<String>> = self
                    .shipments
                    .orders()
                    .iter()
                    .map(|o| {
                        let next = o.status.next_shipment_step().map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
                        vec![o.id.to_string(), o.order_number.clone(), o.status.as_str().to_uppercase(), next]
                    })
                    .collect();
                (render_table(&["id", "order", "status", "next"], &rows), self.shipments.has_more())
            }
            Some(Screen::Login) => ("log in with: login <email> <password>".to_string(), false),
            None => ("(waiting for session)".to_string(), false),
        };
        if more {
            format!("{}\n(more available: type 'more')", table)
        } else {
            table
        }
    }

    fn render_cart(&self) -> String {
        let cart = self.catalog.cart();
        let rows: Vec<Vec<String>> = cart
            .items
            .iter()
            .map(|i| {
                vec![
                    i.product.id.to_string(),
                    i.product.name.clone(),
                    i.quantity.to_string(),
                    format_idr(i.product.price),
                    format_idr(i.product.price * i.quantity as f64),
                ]
            })
            .collect();
        format!(
            "{}\ntotal: {} item(s), {}",
            render_table(&["product_id", "product", "qty", "price", "subtotal"], &rows),
            cart.total_items(),
            format_idr(cart.total_price())
        )
    }
}

fn describe_session(state: &SessionState) -> String {
    match state {
        SessionState::Loading => "checking session...".to_string(),
        SessionState::Anonymous => "not logged in".to_string(),
        SessionState::Authenticated(id) => format!("{} ({})", id.name.as_deref().unwrap_or(&id.email), id.role),
    }
}

fn describe_navigation(nav: &Navigation) -> String {
    match nav {
        Navigation::Pending { path } => format!("{} (waiting for session)", path),
        Navigation::Rendered { path, screen, redirects } => {
            let mut s = format!("@ {} [{:?}]", path, screen);
            if let Some((from, reason)) = redirects.first() {
                s.push_str(&format!(" (redirected from {}: {:?})", from, reason));
            }
            s
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(
            parse_command("login buyer@shop.test secret"),
            Ok(Command::Login { email: "buyer@shop.test".into(), password: "secret".into() })
        );
        assert_eq!(parse_command("qty 4 2"), Ok(Command::Qty { product_id: 4, quantity: 2 }));
        assert_eq!(parse_command("PAY 9"), Ok(Command::Pay { order_id: 9, file: None }));
        assert_eq!(
            parse_command("verify 3 reject blurry photo"),
            Ok(Command::Verify { order_id: 3, approved: false, notes: "blurry photo".into() })
        );
        match parse_command("create 15000 4 Steel Pipe 2in").unwrap() {
            Command::Create(form) => {
                assert_eq!(form.name, "Steel Pipe 2in");
                assert_eq!(form.price, 15000.0);
                assert_eq!(form.stock, 4);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(parse_command("add x"), Err(CommandError::BadNumber("x".into())));
        assert_eq!(parse_command("add"), Err(CommandError::Usage("add <product_id>")));
        assert_eq!(parse_command("verify 1 maybe"), Err(CommandError::Usage("verify <order_id> approve|reject [notes...]")));
        assert!(matches!(parse_command("fly"), Err(CommandError::Unknown(_))));
    }
}
