//! Shared types for the order lifecycle workspace.

mod types;

pub use types::{OrderId, OrderItemId, Version};
