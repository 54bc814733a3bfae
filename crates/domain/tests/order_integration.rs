//! Integration tests for the Order aggregate.
//!
//! These tests walk an order through the documented lifecycle scenarios
//! using only the public API of the crate.

use common::Version;
use domain::{
    CustomerId, ErrorKind, Money, Order, OrderError, OrderItem, OrderRecord, OrderStatus,
    ProductId, ShippingAddress,
};

fn item(product_id: i64, quantity: u32, unit_price: i64) -> OrderItem {
    OrderItem::create(
        ProductId::new(product_id),
        "Keyboard",
        format!("KB-{product_id}"),
        None,
        None,
        quantity,
        Money::from_i64(unit_price),
    )
    .unwrap()
}

/// Order with shipping address `{recipient: "A"}` and one item of 2 x 10000.
fn scenario_one() -> Order {
    let address = ShippingAddress::new().with("recipient", "A");
    let mut order = Order::create("ORD-20240101-0001", CustomerId::new(1), address, None).unwrap();
    order.add_order_item(item(1, 2, 10000)).unwrap();
    order
}

mod lifecycle_scenarios {
    use super::*;

    #[test]
    fn adding_an_item_sets_subtotal_and_total() {
        let order = scenario_one();

        assert_eq!(order.subtotal(), Money::from_i64(20000));
        assert_eq!(order.total_amount(), Money::from_i64(20000));
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[test]
    fn tax_is_added_to_total_without_changing_status() {
        let mut order = scenario_one();
        order.update_tax_amount(Money::from_i64(2000)).unwrap();

        assert_eq!(order.total_amount(), Money::from_i64(22000));
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[test]
    fn confirmed_order_still_accepts_items() {
        let mut order = scenario_one();
        order.update_tax_amount(Money::from_i64(2000)).unwrap();

        order.confirm().unwrap();
        assert_eq!(order.status(), OrderStatus::Confirmed);
        assert!(order.confirmed_at().is_some());

        order.add_order_item(item(2, 1, 5000)).unwrap();
        assert_eq!(order.subtotal(), Money::from_i64(25000));
        assert_eq!(order.total_amount(), Money::from_i64(27000));
    }

    #[test]
    fn paid_order_rejects_new_items() {
        let mut order = scenario_one();
        order.update_tax_amount(Money::from_i64(2000)).unwrap();
        order.confirm().unwrap();
        order.add_order_item(item(2, 1, 5000)).unwrap();

        order.mark_payment_pending().unwrap();
        order.mark_payment_completed().unwrap();
        assert_eq!(order.status(), OrderStatus::Paid);
        assert!(order.payment_completed_at().is_some());
        assert!(order.status().is_processing());

        let err = order.add_order_item(item(3, 1, 100)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalState);
        assert_eq!(order.item_count(), 2);
    }

    #[test]
    fn cancelled_order_cannot_be_confirmed() {
        let mut order = scenario_one();

        order.cancel().unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert!(order.cancelled_at().is_some());

        let err = order.confirm().unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidStateTransition {
                required: OrderStatus::Pending,
                current: OrderStatus::Cancelled,
                ..
            }
        ));
        assert!(order.confirmed_at().is_none());
    }

    #[test]
    fn empty_shipping_address_produces_no_order() {
        let result = Order::create("ORD-2", CustomerId::new(1), ShippingAddress::new(), None);
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn order_runs_through_to_delivery() {
        let mut order = scenario_one();
        order.confirm().unwrap();
        order.mark_payment_pending().unwrap();
        order.mark_payment_completed().unwrap();
        order.start_processing().unwrap();
        order.mark_shipped().unwrap();
        order.mark_delivered().unwrap();

        assert_eq!(order.status(), OrderStatus::Delivered);
        assert!(order.is_completed());
        assert!(order.shipped_at().is_some());
        assert!(order.delivered_at().is_some());
        assert!(order.cancel().unwrap_err().is_illegal_state());
    }
}

mod boundaries {
    use super::*;

    #[test]
    fn zero_quantity_item_is_rejected() {
        let result = OrderItem::create(
            ProductId::new(1),
            "Keyboard",
            "KB-1",
            None,
            None,
            0,
            Money::from_i64(100),
        );
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn item_priced_one_cent_below_zero_is_rejected() {
        let result = OrderItem::create(
            ProductId::new(1),
            "Keyboard",
            "KB-1",
            None,
            None,
            1,
            Money::new(rust_decimal::Decimal::new(-1, 2)),
        );
        assert!(matches!(result, Err(OrderError::NegativeUnitPrice { .. })));
    }

    #[test]
    fn removing_unknown_item_changes_nothing() {
        let mut order = scenario_one();
        let updated_at = order.updated_at();

        let removed = order.remove_order_item(common::OrderItemId::new()).unwrap();

        assert!(removed.is_none());
        assert_eq!(order.updated_at(), updated_at);
        assert_eq!(order.subtotal(), Money::from_i64(20000));
    }

    #[test]
    fn confirming_order_without_items_fails() {
        let address = ShippingAddress::new().with("recipient", "A");
        let mut order = Order::create("ORD-3", CustomerId::new(1), address, None).unwrap();

        assert_eq!(order.confirm(), Err(OrderError::NoItems));
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[test]
    fn total_item_count_sums_quantities() {
        let mut order = scenario_one();
        order.add_order_item(item(2, 3, 1)).unwrap();

        assert_eq!(order.item_count(), 2);
        assert_eq!(order.total_item_count(), 5);
    }
}

mod read_only_views {
    use super::*;

    #[test]
    fn copied_items_do_not_alias_the_order() {
        let order = scenario_one();
        let mut copy = order.items().to_vec();

        copy[0].update_quantity(99).unwrap();
        copy.clear();

        assert_eq!(order.items().len(), 1);
        assert_eq!(order.items()[0].quantity(), 2);
        assert_eq!(order.subtotal(), Money::from_i64(20000));
    }

    #[test]
    fn copied_address_does_not_alias_the_order() {
        let order = scenario_one();
        let copy = order.shipping_address().clone().with("recipient", "B");

        assert_eq!(copy.get("recipient"), Some("B"));
        assert_eq!(order.shipping_address().get("recipient"), Some("A"));
    }

    #[test]
    fn records_are_detached_from_the_order() {
        let order = scenario_one();
        let mut record = OrderRecord::from(&order);
        record.items.clear();
        record.status = OrderStatus::Failed;

        assert_eq!(order.item_count(), 1);
        assert_eq!(order.status(), OrderStatus::Pending);
    }
}

mod rehydration {
    use super::*;

    #[test]
    fn record_roundtrip_through_json_restores_order() {
        let mut order = scenario_one();
        order.update_shipping_amount(Money::from_i64(3000)).unwrap();
        order.confirm().unwrap();
        order.advance_version();

        let json = serde_json::to_string(&OrderRecord::from(&order)).unwrap();
        let record: OrderRecord = serde_json::from_str(&json).unwrap();
        let restored = Order::rehydrate(record);

        assert_eq!(restored, order);
        assert_eq!(restored.version(), Version::new(2));
        assert_eq!(restored.total_amount(), Money::from_i64(23000));
    }

    #[test]
    fn refunded_orders_load_as_terminal() {
        let mut record = OrderRecord::from(&scenario_one());
        record.status = OrderStatus::Refunded;

        let mut order = Order::rehydrate(record);
        assert!(order.is_completed());
        assert!(order.add_order_item(item(5, 1, 1)).is_err());
        assert!(order.cancel().is_err());
    }
}
