/*!
 * # Role-Based Access Control (RBAC) Module
 *
 * Every staff role maps to a fixed permission set. Admins hold `*`.
 */

use super::permissions::consts::*;
pub use crate::entities::user::Role;
use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    pub static ref ROLE_PERMISSIONS: HashMap<Role, Vec<&'static str>> = {
        let mut roles = HashMap::new();

        roles.insert(Role::Admin, vec!["*"]);

        // Managers run the shop floor but do not administer accounts
        roles.insert(
            Role::Manager,
            vec![
                "clients:*",
                "orders:*",
                "art:*",
                "documents:*",
                "inventory:*",
                "finance:*",
                "goals:*",
                REPORTS_READ,
                DASHBOARD_READ,
                CALENDAR_READ,
            ],
        );

        roles.insert(
            Role::Seller,
            vec![
                CLIENTS_READ,
                CLIENTS_WRITE,
                CLIENTS_IMPORT,
                ORDERS_READ,
                ORDERS_CREATE,
                ORDERS_UPDATE,
                ORDERS_STATUS,
                ART_READ,
                ART_REVIEW,
                DOCUMENTS_READ,
                DOCUMENTS_WRITE,
                INVENTORY_READ,
                GOALS_READ,
                DASHBOARD_READ,
                CALENDAR_READ,
            ],
        );

        roles.insert(
            Role::ArtFinalist,
            vec![
                CLIENTS_READ,
                ORDERS_READ,
                ORDERS_STATUS,
                ART_READ,
                ART_UPLOAD,
                DOCUMENTS_READ,
                DOCUMENTS_WRITE,
                DASHBOARD_READ,
                CALENDAR_READ,
            ],
        );

        roles.insert(
            Role::Production,
            vec![
                CLIENTS_READ,
                ORDERS_READ,
                ORDERS_STATUS,
                ART_READ,
                DOCUMENTS_READ,
                INVENTORY_READ,
                INVENTORY_MOVE,
                DASHBOARD_READ,
                CALENDAR_READ,
            ],
        );

        roles
    };
}

/// All permissions granted to a role.
pub fn permissions_for(role: Role) -> Vec<String> {
    ROLE_PERMISSIONS
        .get(&role)
        .map(|perms| perms.iter().map(|p| p.to_string()).collect())
        .unwrap_or_default()
}

/// Check if a granted permission covers a required one
pub fn check_permission(granted: &str, required: &str) -> bool {
    if granted == "*" || granted == required {
        return true;
    }

    if let Some(resource) = granted.strip_suffix(":*") {
        return required
            .split_once(':')
            .map(|(req_resource, _)| req_resource == resource)
            .unwrap_or(false);
    }

    false
}

pub fn role_has_permission(role: Role, required: &str) -> bool {
    ROLE_PERMISSIONS
        .get(&role)
        .map(|perms| perms.iter().any(|granted| check_permission(granted, required)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn wildcard_matches_whole_resource_only() {
        assert!(check_permission("orders:*", "orders:delete"));
        assert!(!check_permission("orders:*", "orders_archive:read"));
        assert!(check_permission("*", "users:manage"));
        assert!(!check_permission("orders:read", "orders:update"));
    }

    #[rstest]
    #[case(Role::Admin, USERS_MANAGE, true)]
    #[case(Role::Manager, USERS_MANAGE, false)]
    #[case(Role::Manager, FINANCE_MANAGE, true)]
    #[case(Role::Seller, ORDERS_CREATE, true)]
    #[case(Role::Seller, FINANCE_READ, false)]
    #[case(Role::Seller, ART_UPLOAD, false)]
    #[case(Role::ArtFinalist, ART_UPLOAD, true)]
    #[case(Role::ArtFinalist, ORDERS_CREATE, false)]
    #[case(Role::Production, INVENTORY_MOVE, true)]
    #[case(Role::Production, INVENTORY_MANAGE, false)]
    fn role_permission_table(#[case] role: Role, #[case] perm: &str, #[case] expected: bool) {
        assert_eq!(role_has_permission(role, perm), expected);
    }

    #[test]
    fn every_role_has_an_entry() {
        use sea_orm::Iterable;
        for role in Role::iter() {
            assert!(!permissions_for(role).is_empty(), "{:?} has no permissions", role);
        }
    }
}
