use super::principal::Role;
use super::session::SessionState;

/// Set of roles permitted to view a target. The empty set means public.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const PUBLIC: RoleSet = RoleSet(0);

    const fn bit(role: Role) -> u8 {
        match role {
            Role::Admin => 1,
            Role::Buyer => 1 << 1,
            Role::Cs1 => 1 << 2,
            Role::Cs2 => 1 << 3,
        }
    }

    pub const fn only(role: Role) -> Self { RoleSet(Self::bit(role)) }

    pub fn of(roles: &[Role]) -> Self {
        roles.iter().fold(RoleSet::PUBLIC, |acc, r| acc.with(*r))
    }

    pub const fn with(self, role: Role) -> Self { RoleSet(self.0 | Self::bit(role)) }

    pub const fn contains(&self, role: Role) -> bool { self.0 & Self::bit(role) != 0 }

    pub const fn is_public(&self) -> bool { self.0 == 0 }

    pub fn roles(&self) -> Vec<Role> {
        Role::ALL.iter().copied().filter(|r| self.contains(*r)).collect()
    }
}

/// Result of the capability check for one (session, requirement) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Session still resolving; nothing may render yet.
    Pending,
    Granted,
    Unauthenticated,
    /// Authenticated with a role outside the requirement.
    Forbidden(Role),
}

/// The one capability check shared by the route guard, the navbar and the mock backend.
pub fn check_access(state: &SessionState, required: RoleSet) -> Access {
    match state {
        SessionState::Loading => Access::Pending,
        _ if required.is_public() => Access::Granted,
        SessionState::Anonymous => Access::Unauthenticated,
        SessionState::Authenticated(id) if required.contains(id.role) => Access::Granted,
        SessionState::Authenticated(id) => Access::Forbidden(id.role),
    }
}
