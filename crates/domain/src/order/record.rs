//! Persisted representations of orders and items.
//!
//! Records carry every stored field as-is. Storage adapters write them with
//! [`OrderRecord::from`] and load aggregates back through
//! [`Order::rehydrate`](super::Order::rehydrate), which skips the creation
//! validation that only applies to brand new orders.

use chrono::{DateTime, Utc};
use common::{OrderId, OrderItemId, Version};
use serde::{Deserialize, Serialize};

use super::{
    CustomerId, Money, Order, OrderItem, OrderStatus, ProductId, ProductVariantId,
    ShippingAddress,
};

/// Stored form of an [`OrderItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemRecord {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub product_variant_id: Option<ProductVariantId>,
    pub product_name: String,
    pub product_sku: String,
    pub variant_name: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
}

impl From<&OrderItem> for OrderItemRecord {
    fn from(item: &OrderItem) -> Self {
        Self {
            id: item.id(),
            product_id: item.product_id(),
            product_variant_id: item.product_variant_id(),
            product_name: item.product_name().to_string(),
            product_sku: item.product_sku().to_string(),
            variant_name: item.variant_name().map(str::to_string),
            quantity: item.quantity(),
            unit_price: item.unit_price(),
            total_price: item.total_price(),
        }
    }
}

/// Stored form of an [`Order`], items included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub order_number: String,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub shipping_amount: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
    pub currency: String,
    pub shipping_address: ShippingAddress,
    pub source_channel: String,
    pub version: Version,
    pub order_date: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub payment_completed_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemRecord>,
}

impl From<&Order> for OrderRecord {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id(),
            order_number: order.order_number().to_string(),
            customer_id: order.customer_id(),
            status: order.status(),
            subtotal: order.subtotal(),
            tax_amount: order.tax_amount(),
            shipping_amount: order.shipping_amount(),
            discount_amount: order.discount_amount(),
            total_amount: order.total_amount(),
            currency: order.currency().to_string(),
            shipping_address: order.shipping_address().clone(),
            source_channel: order.source_channel().to_string(),
            version: order.version(),
            order_date: order.order_date(),
            confirmed_at: order.confirmed_at(),
            payment_completed_at: order.payment_completed_at(),
            shipped_at: order.shipped_at(),
            delivered_at: order.delivered_at(),
            cancelled_at: order.cancelled_at(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
            items: order.items().iter().map(OrderItemRecord::from).collect(),
        }
    }
}
