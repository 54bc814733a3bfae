//! Order line items.

use common::OrderItemId;
use serde::{Deserialize, Serialize};

use super::{Money, OrderError, OrderItemRecord, ProductId, ProductVariantId};

/// One product line in an order.
///
/// Product name, SKU and variant name are snapshots taken when the item was
/// created, not live references to the catalog. `total_price` is always
/// `unit_price * quantity` and cannot be set directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    id: OrderItemId,
    product_id: ProductId,
    product_variant_id: Option<ProductVariantId>,
    product_name: String,
    product_sku: String,
    variant_name: Option<String>,
    quantity: u32,
    unit_price: Money,
    total_price: Money,
}

impl OrderItem {
    /// Creates a new item with a generated identifier.
    pub fn create(
        product_id: ProductId,
        product_name: impl Into<String>,
        product_sku: impl Into<String>,
        product_variant_id: Option<ProductVariantId>,
        variant_name: Option<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Self, OrderError> {
        let product_name = product_name.into();
        let product_sku = product_sku.into();

        if product_name.trim().is_empty() {
            return Err(OrderError::BlankProductName);
        }
        if product_sku.trim().is_empty() {
            return Err(OrderError::BlankProductSku);
        }
        validate_quantity(quantity)?;
        validate_unit_price(unit_price)?;
        let total_price = line_total(unit_price, quantity)?;

        Ok(Self {
            id: OrderItemId::new(),
            product_id,
            product_variant_id,
            product_name,
            product_sku,
            variant_name,
            quantity,
            unit_price,
            total_price,
        })
    }

    /// Rebuilds an item from persisted state without validation.
    ///
    /// The total is re-derived from the stored quantity and unit price, or
    /// kept as stored if that product is out of range.
    pub fn rehydrate(record: OrderItemRecord) -> Self {
        Self {
            id: record.id,
            product_id: record.product_id,
            product_variant_id: record.product_variant_id,
            product_name: record.product_name,
            product_sku: record.product_sku,
            variant_name: record.variant_name,
            quantity: record.quantity,
            unit_price: record.unit_price,
            total_price: record
                .unit_price
                .checked_mul(record.quantity)
                .unwrap_or(record.total_price),
        }
    }

    /// Replaces the quantity and recomputes the total.
    pub fn update_quantity(&mut self, quantity: u32) -> Result<(), OrderError> {
        validate_quantity(quantity)?;
        self.total_price = line_total(self.unit_price, quantity)?;
        self.quantity = quantity;
        Ok(())
    }

    /// Replaces the unit price and recomputes the total.
    pub fn update_unit_price(&mut self, unit_price: Money) -> Result<(), OrderError> {
        validate_unit_price(unit_price)?;
        self.total_price = line_total(unit_price, self.quantity)?;
        self.unit_price = unit_price;
        Ok(())
    }
}

// Query methods
impl OrderItem {
    pub fn id(&self) -> OrderItemId {
        self.id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn product_variant_id(&self) -> Option<ProductVariantId> {
        self.product_variant_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn product_sku(&self) -> &str {
        &self.product_sku
    }

    pub fn variant_name(&self) -> Option<&str> {
        self.variant_name.as_deref()
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    /// Returns `unit_price * quantity`.
    pub fn total_price(&self) -> Money {
        self.total_price
    }
}

pub(super) fn validate_quantity(quantity: u32) -> Result<(), OrderError> {
    if quantity == 0 {
        return Err(OrderError::InvalidQuantity { quantity });
    }
    Ok(())
}

fn line_total(unit_price: Money, quantity: u32) -> Result<Money, OrderError> {
    unit_price
        .checked_mul(quantity)
        .ok_or(OrderError::AmountOverflow {
            component: "item total",
        })
}

pub(super) fn validate_unit_price(price: Money) -> Result<(), OrderError> {
    if price.is_negative() {
        return Err(OrderError::NegativeUnitPrice { price });
    }
    Ok(())
}
