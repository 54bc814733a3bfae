//! Order commands.

use common::OrderId;

use super::{
    CustomerId, Money, OrderError, OrderItem, ProductId, ProductVariantId, ShippingAddress,
};

/// Command to place a new order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    /// Human-readable order number, unique across all orders.
    pub order_number: String,

    /// The customer placing the order.
    pub customer_id: CustomerId,

    /// Where the order ships to.
    pub shipping_address: ShippingAddress,

    /// Channel the order came in through. Defaults when absent.
    pub source_channel: Option<String>,
}

impl PlaceOrder {
    /// Creates a new PlaceOrder command.
    pub fn new(
        order_number: impl Into<String>,
        customer_id: CustomerId,
        shipping_address: ShippingAddress,
    ) -> Self {
        Self {
            order_number: order_number.into(),
            customer_id,
            shipping_address,
            source_channel: None,
        }
    }

    /// Sets the source channel.
    pub fn via(mut self, source_channel: impl Into<String>) -> Self {
        self.source_channel = Some(source_channel.into());
        self
    }
}

/// Command to add a product line to an order.
#[derive(Debug, Clone)]
pub struct AddItem {
    /// The order to add the item to.
    pub order_id: OrderId,

    pub product_id: ProductId,
    pub product_name: String,
    pub product_sku: String,
    pub product_variant_id: Option<ProductVariantId>,
    pub variant_name: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
}

impl AddItem {
    /// Creates a new AddItem command for a product without variant.
    pub fn new(
        order_id: OrderId,
        product_id: ProductId,
        product_name: impl Into<String>,
        product_sku: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            order_id,
            product_id,
            product_name: product_name.into(),
            product_sku: product_sku.into(),
            product_variant_id: None,
            variant_name: None,
            quantity,
            unit_price,
        }
    }

    /// Sets the product variant.
    pub fn with_variant(
        mut self,
        variant_id: ProductVariantId,
        variant_name: impl Into<String>,
    ) -> Self {
        self.product_variant_id = Some(variant_id);
        self.variant_name = Some(variant_name.into());
        self
    }

    /// Builds the validated item.
    pub fn to_item(&self) -> Result<OrderItem, OrderError> {
        OrderItem::create(
            self.product_id,
            self.product_name.clone(),
            self.product_sku.clone(),
            self.product_variant_id,
            self.variant_name.clone(),
            self.quantity,
            self.unit_price,
        )
    }
}
