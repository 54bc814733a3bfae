//! Order service providing the use-case API for order operations.

use common::{OrderId, OrderItemId};

use crate::error::DomainError;
use crate::repository::{OrderRepository, OrderRepositoryExt, RepositoryError};

use super::{AddItem, Money, Order, OrderError, OrderStatus, PlaceOrder};

/// Service for managing orders.
///
/// Each method runs one unit of work: load the order, invoke exactly one
/// aggregate operation, persist the result with a version check. Rejected
/// operations are never persisted. Concurrency conflicts are returned to
/// the caller, which should reload and retry.
pub struct OrderService<R: OrderRepository> {
    repository: R,
}

impl<R: OrderRepository> OrderService<R> {
    /// Creates a new order service backed by the given repository.
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// Returns a reference to the underlying repository.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Creates and stores a new order.
    #[tracing::instrument(skip(self))]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<Order, DomainError> {
        let order = Order::create(
            cmd.order_number,
            cmd.customer_id,
            cmd.shipping_address,
            cmd.source_channel,
        )?;

        self.repository.insert(&order).await?;

        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!(
            order_id = %order.id(),
            order_number = order.order_number(),
            "order placed"
        );
        Ok(order)
    }

    /// Loads an order by ID.
    ///
    /// Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, DomainError> {
        Ok(self.repository.find_by_id(order_id).await?)
    }

    /// Loads an order by its order number.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_by_number(
        &self,
        order_number: &str,
    ) -> Result<Option<Order>, DomainError> {
        Ok(self.repository.find_by_order_number(order_number).await?)
    }

    /// Adds an item to an order.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(&self, cmd: AddItem) -> Result<Order, DomainError> {
        let item = cmd.to_item()?;

        self.execute(cmd.order_id, |order| order.add_order_item(item).map(|()| true))
            .await
    }

    /// Removes an item from an order.
    ///
    /// Removing an item that is not in the order succeeds without writing.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        order_id: OrderId,
        item_id: OrderItemId,
    ) -> Result<Order, DomainError> {
        self.execute(order_id, |order| {
            order
                .remove_order_item(item_id)
                .map(|removed| removed.is_some())
        })
        .await
    }

    /// Updates the quantity of an item in an order.
    #[tracing::instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        order_id: OrderId,
        item_id: OrderItemId,
        quantity: u32,
    ) -> Result<Order, DomainError> {
        self.execute(order_id, |order| {
            order.update_item_quantity(item_id, quantity).map(|()| true)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_shipping_amount(
        &self,
        order_id: OrderId,
        amount: Money,
    ) -> Result<Order, DomainError> {
        self.execute(order_id, |order| {
            order.update_shipping_amount(amount).map(|()| true)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_tax_amount(
        &self,
        order_id: OrderId,
        amount: Money,
    ) -> Result<Order, DomainError> {
        self.execute(order_id, |order| order.update_tax_amount(amount).map(|()| true))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_discount_amount(
        &self,
        order_id: OrderId,
        amount: Money,
    ) -> Result<Order, DomainError> {
        self.execute(order_id, |order| {
            order.update_discount_amount(amount).map(|()| true)
        })
        .await
    }

    /// Confirms a pending order.
    #[tracing::instrument(skip(self))]
    pub async fn confirm(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.transition(order_id, Order::confirm).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_payment_pending(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.transition(order_id, Order::mark_payment_pending).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_payment_completed(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.transition(order_id, Order::mark_payment_completed)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn start_processing(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.transition(order_id, Order::start_processing).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_shipped(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.transition(order_id, Order::mark_shipped).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_delivered(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.transition(order_id, Order::mark_delivered).await
    }

    /// Cancels an order that has not been paid yet.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.transition(order_id, Order::cancel).await
    }

    async fn transition(
        &self,
        order_id: OrderId,
        step: fn(&mut Order) -> Result<(), OrderError>,
    ) -> Result<Order, DomainError> {
        let order = self
            .execute(order_id, |order| step(order).map(|()| true))
            .await?;

        let status: OrderStatus = order.status();
        metrics::counter!("order_transitions_total", "to" => status.as_str()).increment(1);
        tracing::info!(%order_id, %status, "order status changed");
        Ok(order)
    }

    /// Loads the order, applies the command and writes it back if it changed.
    ///
    /// The command returns whether it modified the order.
    async fn execute<F>(&self, order_id: OrderId, command_fn: F) -> Result<Order, DomainError>
    where
        F: FnOnce(&mut Order) -> Result<bool, OrderError> + Send,
    {
        let mut order = self.repository.get(order_id).await?;

        if !command_fn(&mut order)? {
            return Ok(order);
        }

        match self.repository.update(&mut order).await {
            Ok(_) => Ok(order),
            Err(err @ RepositoryError::ConcurrentModification { .. }) => {
                metrics::counter!("order_concurrency_conflicts_total").increment(1);
                tracing::warn!(%order_id, error = %err, "concurrent modification");
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }
}
