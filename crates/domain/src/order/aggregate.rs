//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{OrderId, OrderItemId, Version};

use super::item::{validate_quantity, validate_unit_price};
use super::{
    CustomerId, DEFAULT_CURRENCY, DEFAULT_SOURCE_CHANNEL, Money, OrderError, OrderItem,
    OrderRecord, OrderStatus, ShippingAddress,
};

/// Order aggregate root.
///
/// Owns its line items and four monetary components. After every mutation:
/// - `subtotal` is the sum of item totals,
/// - `total = subtotal + tax + shipping - discount`,
/// - tax, shipping and discount are non-negative.
///
/// State only changes through the methods below; a failed call leaves the
/// order exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    order_number: String,
    customer_id: CustomerId,
    status: OrderStatus,
    subtotal: Money,
    tax_amount: Money,
    shipping_amount: Money,
    discount_amount: Money,
    total_amount: Money,
    currency: String,
    shipping_address: ShippingAddress,
    source_channel: String,
    version: Version,
    order_date: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
    payment_completed_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    items: Vec<OrderItem>,
}

// Construction
impl Order {
    /// Creates a new pending order.
    ///
    /// The order number must be non-blank and the shipping address must have
    /// at least one field. A blank or missing source channel falls back to
    /// [`DEFAULT_SOURCE_CHANNEL`]. Uniqueness of the order number is checked
    /// by the repository, not here.
    pub fn create(
        order_number: impl Into<String>,
        customer_id: CustomerId,
        shipping_address: ShippingAddress,
        source_channel: Option<String>,
    ) -> Result<Self, OrderError> {
        let order_number = order_number.into();
        if order_number.trim().is_empty() {
            return Err(OrderError::BlankOrderNumber);
        }
        if shipping_address.is_empty() {
            return Err(OrderError::EmptyShippingAddress);
        }

        let source_channel = source_channel
            .filter(|channel| !channel.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SOURCE_CHANNEL.to_string());
        let now = Utc::now();

        Ok(Self {
            id: OrderId::new(),
            order_number,
            customer_id,
            status: OrderStatus::Pending,
            subtotal: Money::zero(),
            tax_amount: Money::zero(),
            shipping_amount: Money::zero(),
            discount_amount: Money::zero(),
            total_amount: Money::zero(),
            currency: DEFAULT_CURRENCY.to_string(),
            shipping_address,
            source_channel,
            version: Version::first(),
            order_date: now,
            confirmed_at: None,
            payment_completed_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
            items: Vec::new(),
        })
    }

    /// Rebuilds an order from storage.
    ///
    /// No creation validation runs and timestamps, status and version are
    /// taken as stored. Item totals, subtotal and total are derived from the
    /// stored items and adjustments so a loaded order always satisfies the
    /// monetary invariants. Stored totals are kept only when the derived ones
    /// would overflow.
    pub fn rehydrate(record: OrderRecord) -> Self {
        let mut order = Self {
            id: record.id,
            order_number: record.order_number,
            customer_id: record.customer_id,
            status: record.status,
            subtotal: record.subtotal,
            tax_amount: record.tax_amount,
            shipping_amount: record.shipping_amount,
            discount_amount: record.discount_amount,
            total_amount: record.total_amount,
            currency: record.currency,
            shipping_address: record.shipping_address,
            source_channel: record.source_channel,
            version: record.version,
            order_date: record.order_date,
            confirmed_at: record.confirmed_at,
            payment_completed_at: record.payment_completed_at,
            shipped_at: record.shipped_at,
            delivered_at: record.delivered_at,
            cancelled_at: record.cancelled_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
            items: record.items.into_iter().map(OrderItem::rehydrate).collect(),
        };
        if let Ok(totals) = order.totals_with(order.items.iter(), order.adjustments()) {
            order.subtotal = totals.subtotal;
            order.total_amount = totals.total;
        }
        order
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the human-readable order number.
    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the sum of all item totals.
    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn tax_amount(&self) -> Money {
        self.tax_amount
    }

    pub fn shipping_amount(&self) -> Money {
        self.shipping_amount
    }

    pub fn discount_amount(&self) -> Money {
        self.discount_amount
    }

    /// Returns `subtotal + tax + shipping - discount`.
    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Returns the shipping address as captured at creation.
    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    pub fn source_channel(&self) -> &str {
        &self.source_channel
    }

    /// Returns the optimistic concurrency token.
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    pub fn payment_completed_at(&self) -> Option<DateTime<Utc>> {
        self.payment_completed_at
    }

    pub fn shipped_at(&self) -> Option<DateTime<Utc>> {
        self.shipped_at
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the items in insertion order.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Returns an item by its identifier.
    pub fn find_item(&self, item_id: OrderItemId) -> Option<&OrderItem> {
        self.items.iter().find(|item| item.id() == item_id)
    }

    /// Returns the number of lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the sum of all item quantities.
    pub fn total_item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity())).sum()
    }

    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }

    /// Returns true if the order is in a terminal status.
    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }
}

// Item and adjustment mutations
//
// Each mutation computes the resulting totals before touching any field, so
// an overflow leaves the order unchanged.
impl Order {
    /// Appends an item. Only allowed while the order can still be cancelled.
    pub fn add_order_item(&mut self, item: OrderItem) -> Result<(), OrderError> {
        self.ensure_modifiable("add item")?;

        let totals = self.totals_with(self.items.iter().chain([&item]), self.adjustments())?;
        self.items.push(item);
        self.apply(totals);
        Ok(())
    }

    /// Removes the item with the given identifier.
    ///
    /// Returns `Ok(None)` without touching the order if no such item exists.
    pub fn remove_order_item(
        &mut self,
        item_id: OrderItemId,
    ) -> Result<Option<OrderItem>, OrderError> {
        self.ensure_modifiable("remove item")?;

        let Some(position) = self.items.iter().position(|item| item.id() == item_id) else {
            return Ok(None);
        };
        let remaining = self
            .items
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != position)
            .map(|(_, item)| item);
        let totals = self.totals_with(remaining, self.adjustments())?;

        let removed = self.items.remove(position);
        self.apply(totals);
        Ok(Some(removed))
    }

    /// Changes the quantity of an attached item.
    pub fn update_item_quantity(
        &mut self,
        item_id: OrderItemId,
        quantity: u32,
    ) -> Result<(), OrderError> {
        self.ensure_modifiable("update item quantity")?;
        validate_quantity(quantity)?;

        self.replace_item(item_id, |item| item.update_quantity(quantity))
    }

    /// Changes the unit price of an attached item.
    pub fn update_item_unit_price(
        &mut self,
        item_id: OrderItemId,
        unit_price: Money,
    ) -> Result<(), OrderError> {
        self.ensure_modifiable("update item unit price")?;
        validate_unit_price(unit_price)?;

        self.replace_item(item_id, |item| item.update_unit_price(unit_price))
    }

    /// Replaces the shipping charge. Allowed in any status.
    pub fn update_shipping_amount(&mut self, amount: Money) -> Result<(), OrderError> {
        ensure_non_negative("shipping", amount)?;
        let adjustments = Adjustments {
            shipping: amount,
            ..self.adjustments()
        };
        let totals = self.totals_with(self.items.iter(), adjustments)?;

        self.shipping_amount = amount;
        self.apply(totals);
        Ok(())
    }

    /// Replaces the tax amount. Allowed in any status.
    pub fn update_tax_amount(&mut self, amount: Money) -> Result<(), OrderError> {
        ensure_non_negative("tax", amount)?;
        let adjustments = Adjustments {
            tax: amount,
            ..self.adjustments()
        };
        let totals = self.totals_with(self.items.iter(), adjustments)?;

        self.tax_amount = amount;
        self.apply(totals);
        Ok(())
    }

    /// Replaces the discount. Allowed in any status.
    pub fn update_discount_amount(&mut self, amount: Money) -> Result<(), OrderError> {
        ensure_non_negative("discount", amount)?;
        let adjustments = Adjustments {
            discount: amount,
            ..self.adjustments()
        };
        let totals = self.totals_with(self.items.iter(), adjustments)?;

        self.discount_amount = amount;
        self.apply(totals);
        Ok(())
    }

    /// Advances the optimistic concurrency token by one.
    ///
    /// Called by a repository once a compare-and-swap write on the previous
    /// version has succeeded.
    pub fn advance_version(&mut self) -> Version {
        self.version = self.version.next();
        self.version
    }
}

// Status transitions
impl Order {
    /// `Pending` → `Confirmed`. Requires at least one item.
    pub fn confirm(&mut self) -> Result<(), OrderError> {
        self.ensure_status("confirm", OrderStatus::Pending)?;
        if !self.has_items() {
            return Err(OrderError::NoItems);
        }

        self.confirmed_at = Some(self.move_to(OrderStatus::Confirmed));
        Ok(())
    }

    /// `Confirmed` → `PaymentPending`.
    pub fn mark_payment_pending(&mut self) -> Result<(), OrderError> {
        self.ensure_status("mark payment pending", OrderStatus::Confirmed)?;
        self.move_to(OrderStatus::PaymentPending);
        Ok(())
    }

    /// `PaymentPending` → `Paid`.
    pub fn mark_payment_completed(&mut self) -> Result<(), OrderError> {
        self.ensure_status("complete payment", OrderStatus::PaymentPending)?;
        self.payment_completed_at = Some(self.move_to(OrderStatus::Paid));
        Ok(())
    }

    /// `Paid` → `Processing`.
    pub fn start_processing(&mut self) -> Result<(), OrderError> {
        self.ensure_status("start processing", OrderStatus::Paid)?;
        self.move_to(OrderStatus::Processing);
        Ok(())
    }

    /// `Processing` → `Shipped`.
    pub fn mark_shipped(&mut self) -> Result<(), OrderError> {
        self.ensure_status("mark shipped", OrderStatus::Processing)?;
        self.shipped_at = Some(self.move_to(OrderStatus::Shipped));
        Ok(())
    }

    /// `Shipped` → `Delivered`.
    pub fn mark_delivered(&mut self) -> Result<(), OrderError> {
        self.ensure_status("mark delivered", OrderStatus::Shipped)?;
        self.delivered_at = Some(self.move_to(OrderStatus::Delivered));
        Ok(())
    }

    /// `Pending`, `Confirmed` or `PaymentPending` → `Cancelled`.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        self.ensure_modifiable("cancel")?;
        self.cancelled_at = Some(self.move_to(OrderStatus::Cancelled));
        Ok(())
    }
}

// Internal helpers
impl Order {
    fn ensure_status(&self, action: &'static str, required: OrderStatus) -> Result<(), OrderError> {
        if self.status != required {
            return Err(OrderError::InvalidStateTransition {
                action,
                required,
                current: self.status,
            });
        }
        Ok(())
    }

    fn ensure_modifiable(&self, action: &'static str) -> Result<(), OrderError> {
        if !self.status.can_be_cancelled() {
            return Err(OrderError::NotCancellable {
                action,
                current: self.status,
            });
        }
        Ok(())
    }

    /// Applies `change` to a copy of the item and commits it only if the
    /// order totals still compute.
    fn replace_item(
        &mut self,
        item_id: OrderItemId,
        change: impl FnOnce(&mut OrderItem) -> Result<(), OrderError>,
    ) -> Result<(), OrderError> {
        let position = self
            .items
            .iter()
            .position(|item| item.id() == item_id)
            .ok_or(OrderError::ItemNotFound { item_id })?;

        let mut updated = self.items[position].clone();
        change(&mut updated)?;

        let items = self
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| if index == position { &updated } else { item });
        let totals = self.totals_with(items, self.adjustments())?;

        self.items[position] = updated;
        self.apply(totals);
        Ok(())
    }

    /// Sets the new status and stamps `updated_at`, returning the timestamp.
    fn move_to(&mut self, status: OrderStatus) -> DateTime<Utc> {
        let now = Utc::now();
        self.status = status;
        self.updated_at = now;
        now
    }

    fn adjustments(&self) -> Adjustments {
        Adjustments {
            tax: self.tax_amount,
            shipping: self.shipping_amount,
            discount: self.discount_amount,
        }
    }

    fn totals_with<'a>(
        &self,
        items: impl IntoIterator<Item = &'a OrderItem>,
        adjustments: Adjustments,
    ) -> Result<Totals, OrderError> {
        let subtotal = Money::checked_sum(items.into_iter().map(OrderItem::total_price))
            .ok_or(OrderError::AmountOverflow {
                component: "subtotal",
            })?;
        let total = subtotal
            .checked_add(adjustments.tax)
            .and_then(|amount| amount.checked_add(adjustments.shipping))
            .and_then(|amount| amount.checked_sub(adjustments.discount))
            .ok_or(OrderError::AmountOverflow { component: "total" })?;

        Ok(Totals { subtotal, total })
    }

    fn apply(&mut self, totals: Totals) {
        self.subtotal = totals.subtotal;
        self.total_amount = totals.total;
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Copy)]
struct Adjustments {
    tax: Money,
    shipping: Money,
    discount: Money,
}

#[derive(Debug, Clone, Copy)]
struct Totals {
    subtotal: Money,
    total: Money,
}

fn ensure_non_negative(component: &'static str, amount: Money) -> Result<(), OrderError> {
    if amount.is_negative() {
        return Err(OrderError::NegativeAmount { component, amount });
    }
    Ok(())
}
