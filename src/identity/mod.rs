//! Identity, roles and the client-side session store.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod session;
mod provider;
mod authorizer;

pub use principal::{Identity, Role};
pub use session::{SessionState, SessionStore, WRONG_CREDENTIALS};
pub use provider::{AuthBackend, Credentials};
pub use authorizer::{check_access, Access, RoleSet};
