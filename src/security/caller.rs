//! Identity of the user a request acts for.

/// Pseudo-user for unauthenticated requests.
pub const GUEST: &str = "Guest";

/// Superuser that passes every permission check.
pub const ADMINISTRATOR: &str = "Administrator";

/// The authenticated caller, passed explicitly into every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    user: String,
}

impl CallerContext {
    /// Context for an unauthenticated request.
    pub fn guest() -> Self {
        Self {
            user: GUEST.to_string(),
        }
    }

    /// Context for an authenticated user.
    pub fn user(id: impl Into<String>) -> Self {
        let user = id.into();
        if user.is_empty() {
            return Self::guest();
        }
        Self { user }
    }

    pub fn user_id(&self) -> &str {
        &self.user
    }

    pub fn is_guest(&self) -> bool {
        self.user == GUEST
    }
}
