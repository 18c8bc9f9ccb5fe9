use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::OrderStatus;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub shipping_address: String,
    pub payment_method: String,
    pub tracking_number: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const ORDER_SELECT: &str = "SELECT o.id, o.customer_id, u.name AS customer_name, \
     u.email AS customer_email, o.status, o.total_amount, o.shipping_address, o.payment_method, \
     o.tracking_number, o.shipped_at, o.delivered_at, o.cancelled_at, o.created_at, o.updated_at \
     FROM orders o \
     JOIN users u ON u.id = o.customer_id";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub seller_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// An order as one seller sees it: only their own line items.
#[derive(Debug, Clone, Serialize)]
pub struct SellerOrder {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub seller_subtotal: Decimal,
}
