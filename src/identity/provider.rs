use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::principal::Identity;
use crate::error::AppResult;

/// Body of the login request.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("email", &self.email).field("password", &"***").finish()
    }
}

/// Server side of authentication. The credential itself (a cookie) never
/// passes through here; the transport carries it on every request.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Current identity for the credential attached to the transport.
    async fn whoami(&self) -> AppResult<Identity>;
    /// Submit credentials; on success the server establishes the credential.
    async fn authenticate(&self, credentials: &Credentials) -> AppResult<()>;
    /// Ask the server to invalidate the credential.
    async fn invalidate(&self) -> AppResult<()>;
}
