/*!
 * # Permissions Module
 *
 * Permissions are `resource:action` strings. A trailing `:*` grants every
 * action on a resource and a bare `*` grants everything.
 */

/// Permission actions
pub struct Actions;

impl Actions {
    pub const READ: &'static str = "read";
    pub const CREATE: &'static str = "create";
    pub const UPDATE: &'static str = "update";
    pub const DELETE: &'static str = "delete";
    pub const MANAGE: &'static str = "manage";
    pub const ALL: &'static str = "*";
}

/// Resource types
pub struct Resources;

impl Resources {
    pub const USERS: &'static str = "users";
    pub const CLIENTS: &'static str = "clients";
    pub const ORDERS: &'static str = "orders";
    pub const ART: &'static str = "art";
    pub const DOCUMENTS: &'static str = "documents";
    pub const INVENTORY: &'static str = "inventory";
    pub const FINANCE: &'static str = "finance";
    pub const GOALS: &'static str = "goals";
    pub const REPORTS: &'static str = "reports";
    pub const DASHBOARD: &'static str = "dashboard";
    pub const CALENDAR: &'static str = "calendar";
}

/// Build a permission string from resource and action.
pub fn permission(resource: &str, action: &str) -> String {
    format!("{}:{}", resource, action)
}

/// Common permission string constants for compile-time safety
pub mod consts {
    // Users
    pub const USERS_MANAGE: &str = "users:manage";

    // Clients
    pub const CLIENTS_READ: &str = "clients:read";
    pub const CLIENTS_WRITE: &str = "clients:write";
    pub const CLIENTS_DELETE: &str = "clients:delete";
    pub const CLIENTS_IMPORT: &str = "clients:import";

    // Orders
    pub const ORDERS_READ: &str = "orders:read";
    pub const ORDERS_CREATE: &str = "orders:create";
    pub const ORDERS_UPDATE: &str = "orders:update";
    pub const ORDERS_DELETE: &str = "orders:delete";
    pub const ORDERS_STATUS: &str = "orders:status";

    // Art proofs
    pub const ART_READ: &str = "art:read";
    pub const ART_UPLOAD: &str = "art:upload";
    pub const ART_REVIEW: &str = "art:review";

    // Documents
    pub const DOCUMENTS_READ: &str = "documents:read";
    pub const DOCUMENTS_WRITE: &str = "documents:write";

    // Inventory
    pub const INVENTORY_READ: &str = "inventory:read";
    pub const INVENTORY_MANAGE: &str = "inventory:manage";
    pub const INVENTORY_MOVE: &str = "inventory:move";

    // Finance
    pub const FINANCE_READ: &str = "finance:read";
    pub const FINANCE_MANAGE: &str = "finance:manage";

    // Goals
    pub const GOALS_READ: &str = "goals:read";
    pub const GOALS_MANAGE: &str = "goals:manage";

    // Read-only views
    pub const REPORTS_READ: &str = "reports:read";
    pub const DASHBOARD_READ: &str = "dashboard:read";
    pub const CALENDAR_READ: &str = "calendar:read";
}
