//! Order aggregate and related types.

mod aggregate;
mod commands;
mod item;
mod record;
mod service;
mod status;
mod value_objects;

pub use aggregate::Order;
pub use commands::{AddItem, PlaceOrder};
pub use item::OrderItem;
pub use record::{OrderItemRecord, OrderRecord};
pub use service::OrderService;
pub use status::{OrderStatus, UnknownOrderStatus};
pub use value_objects::{
    CustomerId, DEFAULT_CURRENCY, DEFAULT_SOURCE_CHANNEL, Money, ProductId, ProductVariantId,
    ShippingAddress,
};

use common::OrderItemId;
use thiserror::Error;

/// Broad classification of an [`OrderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A structurally invalid input to a constructor or mutator.
    InvalidArgument,
    /// The operation is not permitted in the order's current status.
    IllegalState,
}

/// Errors that can occur during order operations.
///
/// Every error is raised before any state is changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Order number is required.
    #[error("Order number must not be blank")]
    BlankOrderNumber,

    /// Shipping address is required.
    #[error("Shipping address must not be empty")]
    EmptyShippingAddress,

    /// Product name is required.
    #[error("Product name must not be blank")]
    BlankProductName,

    /// Product SKU is required.
    #[error("Product SKU must not be blank")]
    BlankProductSku,

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Negative unit price.
    #[error("Invalid unit price: {price} (must not be negative)")]
    NegativeUnitPrice { price: Money },

    /// Negative order-level amount (tax, shipping or discount).
    #[error("Invalid {component} amount: {amount} (must not be negative)")]
    NegativeAmount {
        component: &'static str,
        amount: Money,
    },

    /// A computed amount does not fit the decimal range.
    #[error("Amount overflow: {component} exceeds the supported range")]
    AmountOverflow { component: &'static str },

    /// Item not found in order.
    #[error("Item not found: {item_id}")]
    ItemNotFound { item_id: OrderItemId },

    /// Order is not in the status the transition starts from.
    #[error("Cannot {action}: order must be {required} but is {current}")]
    InvalidStateTransition {
        action: &'static str,
        required: OrderStatus,
        current: OrderStatus,
    },

    /// Order has progressed past the point where it can be cancelled or its
    /// items changed.
    #[error("Cannot {action}: order is {current} and can no longer be cancelled or modified")]
    NotCancellable {
        action: &'static str,
        current: OrderStatus,
    },

    /// Order has no items.
    #[error("Cannot confirm an order with no items")]
    NoItems,
}

impl OrderError {
    /// Returns whether the error is an invalid argument or an illegal state.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::BlankOrderNumber
            | OrderError::EmptyShippingAddress
            | OrderError::BlankProductName
            | OrderError::BlankProductSku
            | OrderError::InvalidQuantity { .. }
            | OrderError::NegativeUnitPrice { .. }
            | OrderError::NegativeAmount { .. }
            | OrderError::AmountOverflow { .. }
            | OrderError::ItemNotFound { .. } => ErrorKind::InvalidArgument,
            OrderError::InvalidStateTransition { .. }
            | OrderError::NotCancellable { .. }
            | OrderError::NoItems => ErrorKind::IllegalState,
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        self.kind() == ErrorKind::InvalidArgument
    }

    pub fn is_illegal_state(&self) -> bool {
        self.kind() == ErrorKind::IllegalState
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert!(OrderError::BlankOrderNumber.is_invalid_argument());
        assert!(OrderError::InvalidQuantity { quantity: 0 }.is_invalid_argument());
        assert!(OrderError::AmountOverflow { component: "total" }.is_invalid_argument());
        assert!(OrderError::NoItems.is_illegal_state());
        assert!(
            OrderError::NotCancellable {
                action: "add item",
                current: OrderStatus::Paid,
            }
            .is_illegal_state()
        );
    }

    #[test]
    fn test_transition_error_names_required_and_current_status() {
        let err = OrderError::InvalidStateTransition {
            action: "confirm",
            required: OrderStatus::Pending,
            current: OrderStatus::Cancelled,
        };
        assert_eq!(
            err.to_string(),
            "Cannot confirm: order must be PENDING but is CANCELLED"
        );
    }
}
