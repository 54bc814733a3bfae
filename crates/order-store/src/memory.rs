use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, Version};
use domain::{Order, OrderRecord, OrderRepository, RepositoryError};
use tokio::sync::RwLock;

use crate::restore::restore;

/// In-memory order repository for testing.
///
/// Orders are kept as [`OrderRecord`]s, so every load hands out an
/// independent aggregate and the same compare-and-swap rules apply as in the
/// PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<OrderId, OrderRecord>>>,
}

impl InMemoryOrderRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Removes all orders.
    pub async fn clear(&self) {
        self.orders.write().await.clear();
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id()))]
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut store = self.orders.write().await;

        if let Some(existing) = store.get(&order.id()) {
            return Err(RepositoryError::ConcurrentModification {
                order_id: order.id(),
                expected: order.version(),
                actual: existing.version,
            });
        }
        if store
            .values()
            .any(|record| record.order_number == order.order_number())
        {
            return Err(RepositoryError::DuplicateOrderNumber(
                order.order_number().to_string(),
            ));
        }

        store.insert(order.id(), OrderRecord::from(order));
        Ok(())
    }

    #[tracing::instrument(skip(self, order), fields(order_id = %order.id(), version = %order.version()))]
    async fn update(&self, order: &mut Order) -> Result<Version, RepositoryError> {
        let mut store = self.orders.write().await;

        let stored = store
            .get_mut(&order.id())
            .ok_or(RepositoryError::OrderNotFound(order.id()))?;

        if stored.version != order.version() {
            return Err(RepositoryError::ConcurrentModification {
                order_id: order.id(),
                expected: order.version(),
                actual: stored.version,
            });
        }

        let new_version = order.advance_version();
        *stored = OrderRecord::from(&*order);
        Ok(new_version)
    }

    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let store = self.orders.read().await;
        Ok(store.get(&order_id).cloned().map(restore))
    }

    async fn find_by_order_number(
        &self,
        order_number: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let store = self.orders.read().await;
        Ok(store
            .values()
            .find(|record| record.order_number == order_number)
            .cloned()
            .map(restore))
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, order_id: OrderId) -> Result<bool, RepositoryError> {
        Ok(self.orders.write().await.remove(&order_id).is_some())
    }
}
