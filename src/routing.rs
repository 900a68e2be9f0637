//! Role-gated navigation.
//!
//! Every navigation runs the guard against the session as it is *now*; nothing
//! is cached from an earlier check, so login and logout take effect on the next
//! `navigate` or `revalidate`.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::identity::{check_access, Access, Role, RoleSet, SessionState, SessionStore};

pub const LOGIN_PATH: &str = "/auth";
const MAX_REDIRECTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Login,
    ProductAdmin,
    Catalog,
    MyOrders,
    PaymentDesk,
    ShipmentDesk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub screen: Screen,
    pub required: RoleSet,
    /// Only for visitors; a signed-in user is sent to their home.
    pub guest_only: bool,
}

pub static ROUTES: [Route; 6] = [
    Route { path: LOGIN_PATH, screen: Screen::Login, required: RoleSet::PUBLIC, guest_only: true },
    Route { path: "/admin", screen: Screen::ProductAdmin, required: RoleSet::only(Role::Admin), guest_only: false },
    Route { path: "/buyer", screen: Screen::Catalog, required: RoleSet::only(Role::Buyer), guest_only: false },
    Route { path: "/my-orders", screen: Screen::MyOrders, required: RoleSet::only(Role::Buyer), guest_only: false },
    Route { path: "/cs1", screen: Screen::PaymentDesk, required: RoleSet::only(Role::Cs1), guest_only: false },
    Route { path: "/cs2", screen: Screen::ShipmentDesk, required: RoleSet::only(Role::Cs2), guest_only: false },
];

fn normalize(path: &str) -> &str {
    let p = path.trim();
    let p = p.split(['?', '#']).next().unwrap_or(p);
    let trimmed = p.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

pub fn find_route(path: &str) -> Option<&'static Route> {
    let p = normalize(path);
    ROUTES.iter().find(|r| r.path == p)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    Unauthenticated,
    Forbidden,
    AlreadySignedIn,
    UnknownRoute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Session unresolved; render nothing.
    Pending,
    Render(Screen),
    Redirect { to: &'static str, reason: RedirectReason },
}

/// Guard for one route under the given session.
pub fn guard(state: &SessionState, route: &Route) -> Decision {
    match check_access(state, route.required) {
        Access::Pending => Decision::Pending,
        Access::Unauthenticated => Decision::Redirect { to: LOGIN_PATH, reason: RedirectReason::Unauthenticated },
        Access::Forbidden(role) => Decision::Redirect { to: role.home_path(), reason: RedirectReason::Forbidden },
        Access::Granted => match state.role() {
            Some(role) if route.guest_only => Decision::Redirect { to: role.home_path(), reason: RedirectReason::AlreadySignedIn },
            _ => Decision::Render(route.screen),
        },
    }
}

/// Guard for an arbitrary path; unknown paths go to the login surface.
pub fn evaluate(state: &SessionState, path: &str) -> Decision {
    match find_route(path) {
        Some(route) => guard(state, route),
        None if state.is_loading() => Decision::Pending,
        None => Decision::Redirect { to: LOGIN_PATH, reason: RedirectReason::UnknownRoute },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Waiting on the session; `path` is kept and retried by `revalidate`.
    Pending { path: String },
    Rendered { path: String, screen: Screen, redirects: Vec<(String, RedirectReason)> },
}

impl Navigation {
    pub fn screen(&self) -> Option<Screen> {
        match self {
            Navigation::Rendered { screen, .. } => Some(*screen),
            Navigation::Pending { .. } => None,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Navigation::Pending { path } | Navigation::Rendered { path, .. } => path,
        }
    }
}

/// Current location plus the guard, bound to the shared session store.
pub struct Navigator {
    session: Arc<SessionStore>,
    location: Mutex<String>,
}

impl Navigator {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session, location: Mutex::new(LOGIN_PATH.to_string()) }
    }

    pub fn session(&self) -> &Arc<SessionStore> { &self.session }

    pub fn location(&self) -> String { self.location.lock().clone() }

    pub fn navigate(&self, path: &str) -> Navigation {
        let state = self.session.current();
        let mut current = normalize(path).to_string();
        let mut redirects = Vec::new();
        for _ in 0..=MAX_REDIRECTS {
            match evaluate(&state, &current) {
                Decision::Pending => {
                    *self.location.lock() = current.clone();
                    return Navigation::Pending { path: current };
                }
                Decision::Render(screen) => {
                    debug!(target: "guard", path = %current, screen = ?screen, "render");
                    *self.location.lock() = current.clone();
                    return Navigation::Rendered { path: current, screen, redirects };
                }
                Decision::Redirect { to, reason } => {
                    debug!(target: "guard", from = %current, to, reason = ?reason, "redirect");
                    redirects.push((current, reason));
                    current = to.to_string();
                }
            }
        }
        // Route table has no cycles; land on the login surface if one ever appears.
        *self.location.lock() = LOGIN_PATH.to_string();
        Navigation::Rendered { path: LOGIN_PATH.to_string(), screen: Screen::Login, redirects }
    }

    /// Navigate once the initial identity check has resolved.
    pub async fn navigate_when_ready(&self, path: &str) -> Navigation {
        self.session.ready().await;
        self.navigate(path)
    }

    /// Re-run the guard for the current location, e.g. after a session change.
    pub fn revalidate(&self) -> Navigation {
        let here = self.location();
        self.navigate(&here)
    }

    pub fn menu(&self) -> Vec<MenuLink> { menu_for(&self.session.current()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuLink {
    pub label: &'static str,
    pub path: &'static str,
}

const MENU: [MenuLink; 4] = [
    MenuLink { label: "My Orders", path: "/my-orders" },
    MenuLink { label: "Master Product", path: "/admin" },
    MenuLink { label: "Payment Management", path: "/cs1" },
    MenuLink { label: "Shipment", path: "/cs2" },
];

/// Navbar entries the session may follow; an entry shows iff its route would render.
pub fn menu_for(state: &SessionState) -> Vec<MenuLink> {
    MENU.iter()
        .copied()
        .filter(|link| matches!(evaluate(state, link.path), Decision::Render(_)))
        .collect()
}
