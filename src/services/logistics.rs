//! Shipment tracking derived from order state.
//!
//! There is no carrier integration: the timeline is built from the order's
//! status and its lifecycle timestamps.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::database::models::Order;
use crate::types::OrderStatus;

pub const CARRIER: &str = "Marketplace Logistics";

/// `MKT` + yymmdd + 8 uppercase hex digits, e.g. `MKT2410193F9A0C12`
pub fn generate_tracking_number(now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!("MKT{}{:08X}", now.format("%y%m%d"), suffix)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TrackingEvent {
    pub status: OrderStatus,
    pub description: &'static str,
    pub completed: bool,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Tracking {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub carrier: Option<&'static str>,
    pub tracking_number: Option<String>,
    pub events: Vec<TrackingEvent>,
}

fn event(status: OrderStatus, at: Option<DateTime<Utc>>, completed: bool) -> TrackingEvent {
    let description = match status {
        OrderStatus::Pending => "Order placed",
        OrderStatus::Processing => "Seller is preparing your order",
        OrderStatus::Shipped => "Handed to carrier",
        OrderStatus::Delivered => "Delivered",
        OrderStatus::Cancelled => "Order cancelled",
    };
    TrackingEvent {
        status,
        description,
        completed,
        at,
    }
}

pub fn tracking_for(order: &Order) -> Tracking {
    let status = order.status;
    let reached = |step: OrderStatus| -> bool {
        use OrderStatus::*;
        match (status, step) {
            (_, Pending) => true,
            (Processing | Shipped | Delivered, Processing) => true,
            (Shipped | Delivered, Shipped) => true,
            (Delivered, Delivered) => true,
            _ => false,
        }
    };

    let mut events = vec![event(OrderStatus::Pending, Some(order.created_at), true)];

    if status == OrderStatus::Cancelled {
        events.push(event(OrderStatus::Cancelled, order.cancelled_at, true));
    } else {
        // No dedicated timestamp for processing
        events.push(event(OrderStatus::Processing, None, reached(OrderStatus::Processing)));
        events.push(event(OrderStatus::Shipped, order.shipped_at, reached(OrderStatus::Shipped)));
        events.push(event(OrderStatus::Delivered, order.delivered_at, reached(OrderStatus::Delivered)));
    }

    let shipped = matches!(status, OrderStatus::Shipped | OrderStatus::Delivered);
    Tracking {
        order_id: order.id,
        status,
        carrier: shipped.then_some(CARRIER),
        tracking_number: if shipped { order.tracking_number.clone() } else { None },
        events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    fn order(status: OrderStatus) -> Order {
        let created = Utc.with_ymd_and_hms(2024, 10, 19, 9, 0, 0).unwrap();
        Order {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            customer_name: "Ada".to_string(),
            customer_email: "ada@example.com".to_string(),
            status,
            total_amount: Decimal::new(4200, 2),
            shipping_address: "1 Main St".to_string(),
            payment_method: "card".to_string(),
            tracking_number: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn tracking_number_shape() {
        let now = Utc.with_ymd_and_hms(2024, 10, 19, 12, 0, 0).unwrap();
        let number = generate_tracking_number(now);
        assert_eq!(number.len(), 17);
        assert!(number.starts_with("MKT241019"));
        assert!(number[9..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn pending_order_has_one_completed_step() {
        let tracking = tracking_for(&order(OrderStatus::Pending));
        let done: Vec<_> = tracking.events.iter().filter(|e| e.completed).collect();
        assert_eq!(done.len(), 1);
        assert_eq!(tracking.events.len(), 4);
        assert!(tracking.carrier.is_none());
    }

    #[test]
    fn shipped_order_exposes_carrier() {
        let mut o = order(OrderStatus::Shipped);
        o.shipped_at = Some(o.created_at + Duration::days(1));
        o.tracking_number = Some("MKT24101900000001".to_string());

        let tracking = tracking_for(&o);
        assert_eq!(tracking.carrier, Some(CARRIER));
        assert_eq!(tracking.tracking_number.as_deref(), Some("MKT24101900000001"));
        let shipped = &tracking.events[2];
        assert_eq!(shipped.status, OrderStatus::Shipped);
        assert!(shipped.completed);
        assert_eq!(shipped.at, o.shipped_at);
        assert!(!tracking.events[3].completed);
    }

    #[test]
    fn cancelled_order_ends_with_cancel() {
        let mut o = order(OrderStatus::Cancelled);
        o.cancelled_at = Some(o.created_at + Duration::hours(2));
        o.updated_at = o.cancelled_at.unwrap();

        let tracking = tracking_for(&o);
        let last = tracking.events.last().unwrap();
        assert_eq!(last.status, OrderStatus::Cancelled);
        assert_eq!(tracking.events.len(), 2);
    }
}
