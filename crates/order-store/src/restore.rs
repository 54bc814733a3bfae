//! Shared load path for both repositories.

use domain::{Order, OrderRecord};

/// Rebuilds an order from a stored record.
///
/// The aggregate re-derives subtotal and total from its items and
/// adjustments. A stored total that disagrees with the derived one is
/// logged and counted.
pub(crate) fn restore(record: OrderRecord) -> Order {
    let stored_subtotal = record.subtotal;
    let stored_total = record.total_amount;

    let order = Order::rehydrate(record);

    if order.subtotal() != stored_subtotal || order.total_amount() != stored_total {
        metrics::counter!("order_store_total_drift_total").increment(1);
        tracing::warn!(
            order_id = %order.id(),
            %stored_subtotal,
            %stored_total,
            subtotal = %order.subtotal(),
            total = %order.total_amount(),
            "stored order totals disagree with line items"
        );
    }

    order
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use domain::{CustomerId, Money, OrderItem, ProductId, ShippingAddress};

    use super::*;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn restore_with_logs(record: OrderRecord) -> (Order, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let order = tracing::subscriber::with_default(subscriber, || restore(record));
        (order, logs.contents())
    }

    fn stored_order() -> Order {
        let mut order = Order::create(
            "ORD-1",
            CustomerId::new(1),
            ShippingAddress::new().with("recipient", "A"),
            None,
        )
        .unwrap();
        let item = OrderItem::create(
            ProductId::new(1),
            "Widget",
            "WGT-1",
            None,
            None,
            2,
            Money::from_i64(500),
        )
        .unwrap();
        order.add_order_item(item).unwrap();
        order
    }

    #[test]
    fn test_consistent_record_restores_silently() {
        let order = stored_order();

        let (restored, logs) = restore_with_logs(OrderRecord::from(&order));

        assert_eq!(restored, order);
        assert!(!logs.contains("disagree"), "{logs}");
    }

    #[test]
    fn test_drifted_totals_are_corrected_and_reported() {
        let order = stored_order();
        let mut record = OrderRecord::from(&order);
        record.subtotal = Money::from_i64(1);
        record.total_amount = Money::from_i64(1);

        let (restored, logs) = restore_with_logs(record);

        assert_eq!(restored.subtotal(), Money::from_i64(1000));
        assert_eq!(restored.total_amount(), Money::from_i64(1000));
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("stored order totals disagree with line items"), "{logs}");
        assert!(logs.contains("stored_total=1"), "{logs}");
    }
}
