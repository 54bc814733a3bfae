//! Storage port for the order aggregate.

use async_trait::async_trait;
use common::{OrderId, Version};
use thiserror::Error;

use crate::order::Order;

/// Errors raised by order repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The stored version moved on since the order was loaded.
    /// The caller must reload the order and retry.
    #[error(
        "Concurrent modification of order {order_id}: expected version {expected}, found {actual}"
    )]
    ConcurrentModification {
        order_id: OrderId,
        expected: Version,
        actual: Version,
    },

    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Another order already uses this order number.
    #[error("Order number already in use: {0}")]
    DuplicateOrderNumber(String),

    /// The storage backend failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Loads and persists fully hydrated orders.
///
/// Implementations guard every update with the order's version: a write only
/// succeeds if the stored version still equals the version the order was
/// loaded with, and it then advances both the stored and the in-memory
/// version by one.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Stores a newly created order.
    ///
    /// Fails with `DuplicateOrderNumber` if the order number is taken and
    /// with `ConcurrentModification` if the order ID already exists.
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError>;

    /// Writes the order's current state if its version is still current.
    ///
    /// On success the order's version is advanced and the new version returned.
    async fn update(&self, order: &mut Order) -> Result<Version, RepositoryError>;

    /// Loads an order with all of its items.
    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Loads an order by its human-readable number.
    async fn find_by_order_number(
        &self,
        order_number: &str,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Deletes an order and its items. Returns false if nothing was deleted.
    async fn delete(&self, order_id: OrderId) -> Result<bool, RepositoryError>;
}

/// Extension trait providing convenience methods for repositories.
#[async_trait]
pub trait OrderRepositoryExt: OrderRepository {
    /// Loads an order, failing with `OrderNotFound` if it does not exist.
    async fn get(&self, order_id: OrderId) -> Result<Order, RepositoryError> {
        self.find_by_id(order_id)
            .await?
            .ok_or(RepositoryError::OrderNotFound(order_id))
    }

    /// Checks if an order exists.
    async fn exists(&self, order_id: OrderId) -> Result<bool, RepositoryError> {
        Ok(self.find_by_id(order_id).await?.is_some())
    }
}

// Blanket implementation for all OrderRepository implementations
impl<T: OrderRepository + ?Sized> OrderRepositoryExt for T {}
