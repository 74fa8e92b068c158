//! sea-orm entities, one module per table.

pub mod art_version;
pub mod client;
pub mod document;
pub mod inventory_movement;
pub mod order;
pub mod order_item;
pub mod order_status_history;
pub mod payable;
pub mod product;
pub mod receivable;
pub mod sales_goal;
pub mod session;
pub mod user;

pub use order::OrderStatus;
pub use user::Role;
