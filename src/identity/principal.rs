use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Buyer,
    Cs1,
    Cs2,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Buyer, Role::Cs1, Role::Cs2];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Buyer => "buyer",
            Role::Cs1 => "cs1",
            Role::Cs2 => "cs2",
        }
    }

    /// Landing route for this role after login, and the redirect target
    /// when it asks for a route it may not see.
    pub fn home_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin",
            Role::Buyer => "/buyer",
            Role::Cs1 => "/cs1",
            Role::Cs2 => "/cs2",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "buyer" => Ok(Role::Buyer),
            "cs1" => Ok(Role::Cs1),
            "cs2" => Ok(Role::Cs2),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// The authenticated user as reported by the identity endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}
