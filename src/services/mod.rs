// Accounts
pub mod users;

// Customers
pub mod client_import;
pub mod clients;

// Orders and the status workflow
pub mod order_workflow;
pub mod orders;

// Files
pub mod art;
pub mod documents;
pub mod storage;

// Stock and money
pub mod finance;
pub mod goals;
pub mod inventory;

// Read-only aggregates
pub mod calendar;
pub mod dashboards;
pub mod reports;

use crate::auth::AuthUser;
use crate::entities::Role;
use uuid::Uuid;

/// Who is performing an operation; services decide visibility and role
/// gates from this alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_supervisor(&self) -> bool {
        self.role.is_supervisor()
    }

    /// Sellers are confined to their own orders and clients' order data.
    pub fn is_seller(&self) -> bool {
        self.role == Role::Seller
    }
}

impl From<&AuthUser> for Actor {
    fn from(user: &AuthUser) -> Self {
        Self::new(user.user_id, user.role)
    }
}

/// Normalize a page/limit pair: pages start at 1, limits are clamped.
pub(crate) fn page_bounds(page: u64, limit: u64, max_limit: u64) -> (u64, u64) {
    (page.max(1), limit.clamp(1, max_limit.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_are_clamped() {
        assert_eq!(page_bounds(0, 0, 100), (1, 1));
        assert_eq!(page_bounds(3, 500, 100), (3, 100));
        assert_eq!(page_bounds(2, 20, 100), (2, 20));
    }
}
