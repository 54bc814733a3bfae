//! Domain layer for the order lifecycle.
//!
//! This crate provides:
//! - The `Order` aggregate with its line items and status state machine
//! - The `OrderRepository` storage port with optimistic concurrency
//! - `OrderService`, the use-case layer that loads, mutates and saves orders

pub mod error;
pub mod order;
pub mod repository;

pub use error::DomainError;
pub use order::{
    AddItem, CustomerId, DEFAULT_CURRENCY, DEFAULT_SOURCE_CHANNEL, ErrorKind, Money, Order,
    OrderError, OrderItem, OrderItemRecord, OrderRecord, OrderService, OrderStatus, PlaceOrder,
    ProductId, ProductVariantId, ShippingAddress,
};
pub use repository::{OrderRepository, OrderRepositoryExt, RepositoryError};
