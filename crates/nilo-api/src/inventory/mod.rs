pub mod client;
pub mod models;

pub use client::{AWAITING_APPROVAL_ACTION, ClientPageQuery, InventoryClient, REFRESH_SUCCESS_MARKER};
