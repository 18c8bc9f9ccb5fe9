use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::api::{Page, Paginated};
use crate::database::models::{Order, OrderDetail, OrderItem, SellerOrder, ORDER_SELECT};
use crate::services::logistics::generate_tracking_number;
use crate::services::mailer::{deliver, templates, Mailer};
use crate::services::ServiceError;
use crate::types::{ApprovalStatus, OrderStatus, ProductStatus};

const MAX_ADDRESS_LEN: usize = 500;
const MAX_PAYMENT_METHOD_LEN: usize = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutInput {
    pub shipping_address: String,
    pub payment_method: String,
}

impl CheckoutInput {
    fn validate(&self) -> Result<(), ServiceError> {
        let address = self.shipping_address.trim();
        if address.is_empty() || address.chars().count() > MAX_ADDRESS_LEN {
            return Err(ServiceError::validation(
                "shipping_address",
                format!("must be 1 to {} characters", MAX_ADDRESS_LEN),
            ));
        }
        let method = self.payment_method.trim();
        if method.is_empty() || method.chars().count() > MAX_PAYMENT_METHOD_LEN {
            return Err(ServiceError::validation(
                "payment_method",
                format!("must be 1 to {} characters", MAX_PAYMENT_METHOD_LEN),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub customer_id: Option<Uuid>,
    pub seller_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");
        if let Some(customer_id) = self.customer_id {
            qb.push(" AND o.customer_id = ").push_bind(customer_id);
        }
        if let Some(seller_id) = self.seller_id {
            qb.push(" AND o.id IN (SELECT order_id FROM order_items WHERE seller_id = ")
                .push_bind(seller_id)
                .push(")");
        }
        if let Some(status) = self.status {
            qb.push(" AND o.status = ").push_bind(status.as_str());
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
}

/// A cart line joined with its locked product row
#[derive(Debug, Clone, FromRow)]
struct CheckoutLine {
    product_id: Uuid,
    seller_id: Uuid,
    name: String,
    price: Decimal,
    stock: i32,
    quantity: i32,
    #[sqlx(try_from = "String")]
    status: ProductStatus,
    #[sqlx(try_from = "String")]
    approval_status: ApprovalStatus,
}

/// Checks every line against its product and returns the order total.
fn price_checkout(lines: &[CheckoutLine]) -> Result<Decimal, ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::BadRequest("Cart is empty".to_string()));
    }

    let mut total = Decimal::ZERO;
    for line in lines {
        if line.status != ProductStatus::Active || line.approval_status != ApprovalStatus::Approved {
            return Err(ServiceError::Conflict(format!("'{}' is no longer available", line.name)));
        }
        if line.quantity > line.stock {
            return Err(ServiceError::Conflict(format!(
                "Insufficient stock for '{}': {} available, {} requested",
                line.name, line.stock, line.quantity
            )));
        }
        total += line.price * Decimal::from(line.quantity);
    }
    Ok(total)
}

/// One sold line as a seller exports it
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SellerSaleRow {
    pub order_id: Uuid,
    pub ordered_at: DateTime<Utc>,
    pub status: String,
    pub customer_name: String,
    pub shipping_address: String,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

pub struct OrderService {
    pool: PgPool,
    mailer: Arc<dyn Mailer>,
}

impl OrderService {
    pub fn new(pool: PgPool, mailer: Arc<dyn Mailer>) -> Self {
        Self { pool, mailer }
    }

    /// Turns the customer's cart into an order in a single transaction.
    pub async fn checkout(&self, customer_id: Uuid, input: CheckoutInput) -> Result<OrderDetail, ServiceError> {
        input.validate()?;

        let mut tx = self.pool.begin().await?;

        // Lock in product id order so concurrent checkouts cannot deadlock
        let lines = sqlx::query_as::<_, CheckoutLine>(
            "SELECT p.id AS product_id, p.seller_id, p.name, p.price, p.stock, ci.quantity,
                    p.status, p.approval_status
             FROM cart_items ci
             JOIN products p ON p.id = ci.product_id
             WHERE ci.user_id = $1
             ORDER BY p.id
             FOR UPDATE OF p",
        )
        .bind(customer_id)
        .fetch_all(&mut *tx)
        .await?;

        let total = price_checkout(&lines)?;

        let order_id: Uuid = sqlx::query_scalar(
            "INSERT INTO orders (customer_id, total_amount, shipping_address, payment_method)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(customer_id)
        .bind(total)
        .bind(input.shipping_address.trim())
        .bind(input.payment_method.trim())
        .fetch_one(&mut *tx)
        .await?;

        for line in &lines {
            let subtotal = line.price * Decimal::from(line.quantity);
            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, seller_id, product_name, quantity, unit_price, subtotal)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(line.seller_id)
            .bind(&line.name)
            .bind(line.quantity)
            .bind(line.price)
            .bind(subtotal)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE products SET stock = stock - $2, updated_at = now() WHERE id = $1")
                .bind(line.product_id)
                .bind(line.quantity)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(customer_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!("Customer {} placed order {} ({} lines, total {})", customer_id, order_id, lines.len(), total);

        let detail = self.detail(order_id).await?;
        deliver(
            self.mailer.as_ref(),
            templates::order_confirmation(&detail.order.customer_email, &detail.order.customer_name, order_id, total),
        )
        .await;
        Ok(detail)
    }

    pub async fn list(&self, filter: &OrderFilter, page: Page) -> Result<Paginated<OrderDetail>, ServiceError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders o");
        filter.push_conditions(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(ORDER_SELECT);
        filter.push_conditions(&mut select);
        select
            .push(" ORDER BY o.created_at DESC, o.id LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let orders = select.build_query_as::<Order>().fetch_all(&self.pool).await?;

        let mut items = self.items_for(&orders, None).await?;
        let details = orders
            .into_iter()
            .map(|order| {
                let items = items.remove(&order.id).unwrap_or_default();
                OrderDetail { order, items }
            })
            .collect();

        Ok(Paginated::new(details, page, total))
    }

    /// Orders containing the seller's items, reduced to those items
    pub async fn seller_list(
        &self,
        seller_id: Uuid,
        status: Option<OrderStatus>,
        page: Page,
    ) -> Result<Paginated<SellerOrder>, ServiceError> {
        let filter = OrderFilter {
            seller_id: Some(seller_id),
            status,
            ..Default::default()
        };

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders o");
        filter.push_conditions(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(ORDER_SELECT);
        filter.push_conditions(&mut select);
        select
            .push(" ORDER BY o.created_at DESC, o.id LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let orders = select.build_query_as::<Order>().fetch_all(&self.pool).await?;

        let mut items = self.items_for(&orders, Some(seller_id)).await?;
        let seller_orders = orders
            .into_iter()
            .map(|order| {
                let items = items.remove(&order.id).unwrap_or_default();
                let seller_subtotal = items.iter().map(|i| i.subtotal).sum();
                SellerOrder {
                    order,
                    items,
                    seller_subtotal,
                }
            })
            .collect();

        Ok(Paginated::new(seller_orders, page, total))
    }

    pub async fn detail(&self, id: Uuid) -> Result<OrderDetail, ServiceError> {
        let order = sqlx::query_as::<_, Order>(&format!("{} WHERE o.id = $1", ORDER_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order"))?;

        let items = sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = $1 ORDER BY product_name")
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        Ok(OrderDetail { order, items })
    }

    /// A customer's own order; other customers' orders read as missing
    pub async fn customer_detail(&self, customer_id: Uuid, id: Uuid) -> Result<OrderDetail, ServiceError> {
        let detail = self.detail(id).await?;
        if detail.order.customer_id != customer_id {
            return Err(ServiceError::not_found("Order"));
        }
        Ok(detail)
    }

    pub async fn cancel(&self, customer_id: Uuid, id: Uuid) -> Result<OrderDetail, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let status = lock_order(&mut tx, id)
            .await?
            .filter(|(owner, _)| *owner == customer_id)
            .map(|(_, status)| status)
            .ok_or_else(|| ServiceError::not_found("Order"))?;

        if status != OrderStatus::Pending {
            return Err(ServiceError::Conflict(format!(
                "Only pending orders can be cancelled (order is {})",
                status
            )));
        }

        restore_stock(&mut tx, id).await?;
        sqlx::query("UPDATE orders SET status = 'cancelled', cancelled_at = now(), updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!("Customer {} cancelled order {}", customer_id, id);
        self.detail(id).await
    }

    pub async fn update_status(&self, admin_id: Uuid, id: Uuid, update: StatusUpdate) -> Result<OrderDetail, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let (_, current) = lock_order(&mut tx, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order"))?;
        let next = current.transition(update.status)?;

        match next {
            OrderStatus::Shipped => {
                let tracking_number = update
                    .tracking_number
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| generate_tracking_number(Utc::now()));
                sqlx::query(
                    "UPDATE orders SET status = $2, tracking_number = $3, shipped_at = now(), updated_at = now()
                     WHERE id = $1",
                )
                .bind(id)
                .bind(next.as_str())
                .bind(tracking_number)
                .execute(&mut *tx)
                .await?;
            }
            OrderStatus::Delivered => {
                sqlx::query("UPDATE orders SET status = $2, delivered_at = now(), updated_at = now() WHERE id = $1")
                    .bind(id)
                    .bind(next.as_str())
                    .execute(&mut *tx)
                    .await?;
            }
            OrderStatus::Cancelled => {
                restore_stock(&mut tx, id).await?;
                sqlx::query("UPDATE orders SET status = $2, cancelled_at = now(), updated_at = now() WHERE id = $1")
                    .bind(id)
                    .bind(next.as_str())
                    .execute(&mut *tx)
                    .await?;
            }
            OrderStatus::Pending | OrderStatus::Processing => {
                sqlx::query("UPDATE orders SET status = $2, updated_at = now() WHERE id = $1")
                    .bind(id)
                    .bind(next.as_str())
                    .execute(&mut *tx)
                    .await?;
            }
        }
        tx.commit().await?;

        tracing::info!("Admin {} moved order {} from {} to {}", admin_id, id, current, next);
        self.detail(id).await
    }

    pub async fn export_rows(&self, filter: &OrderFilter) -> Result<Vec<Order>, ServiceError> {
        let mut select = QueryBuilder::<Postgres>::new(ORDER_SELECT);
        filter.push_conditions(&mut select);
        select.push(" ORDER BY o.created_at DESC, o.id");
        let orders = select.build_query_as::<Order>().fetch_all(&self.pool).await?;
        Ok(orders)
    }

    pub async fn seller_sales(&self, seller_id: Uuid) -> Result<Vec<SellerSaleRow>, ServiceError> {
        let rows = sqlx::query_as::<_, SellerSaleRow>(
            "SELECT o.id AS order_id, o.created_at AS ordered_at, o.status, u.name AS customer_name,
                    o.shipping_address, oi.product_name, oi.quantity, oi.unit_price, oi.subtotal
             FROM order_items oi
             JOIN orders o ON o.id = oi.order_id
             JOIN users u ON u.id = o.customer_id
             WHERE oi.seller_id = $1
             ORDER BY o.created_at DESC, oi.product_name",
        )
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn items_for(
        &self,
        orders: &[Order],
        seller_id: Option<Uuid>,
    ) -> Result<HashMap<Uuid, Vec<OrderItem>>, ServiceError> {
        if orders.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();

        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items
             WHERE order_id = ANY($1) AND ($2::uuid IS NULL OR seller_id = $2)
             ORDER BY product_name",
        )
        .bind(&ids)
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for item in items {
            grouped.entry(item.order_id).or_default().push(item);
        }
        Ok(grouped)
    }
}

async fn lock_order(conn: &mut PgConnection, id: Uuid) -> Result<Option<(Uuid, OrderStatus)>, ServiceError> {
    let row: Option<(Uuid, String)> = sqlx::query_as("SELECT customer_id, status FROM orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(|(customer_id, status)| {
        let status = status
            .parse::<OrderStatus>()
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        Ok((customer_id, status))
    })
    .transpose()
}

async fn restore_stock(conn: &mut PgConnection, order_id: Uuid) -> Result<(), ServiceError> {
    sqlx::query(
        "UPDATE products p SET stock = p.stock + oi.quantity, updated_at = now()
         FROM order_items oi
         WHERE oi.order_id = $1 AND p.id = oi.product_id",
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, price: &str, stock: i32, quantity: i32) -> CheckoutLine {
        CheckoutLine {
            product_id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            name: name.to_string(),
            price: price.parse().unwrap(),
            stock,
            quantity,
            status: ProductStatus::Active,
            approval_status: ApprovalStatus::Approved,
        }
    }

    #[test]
    fn empty_cart_is_a_bad_request() {
        assert!(matches!(price_checkout(&[]), Err(ServiceError::BadRequest(_))));
    }

    #[test]
    fn totals_every_line() {
        let lines = [line("Mug", "8.50", 10, 2), line("Tea", "4.25", 3, 3)];
        assert_eq!(price_checkout(&lines).unwrap(), "29.75".parse::<Decimal>().unwrap());
    }

    #[test]
    fn insufficient_stock_conflicts() {
        let lines = [line("Mug", "8.50", 1, 2)];
        let err = price_checkout(&lines).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(ref m) if m.contains("Insufficient stock for 'Mug'")));
    }

    #[test]
    fn hidden_products_cannot_be_bought() {
        let mut hidden = line("Lamp", "20.00", 5, 1);
        hidden.status = ProductStatus::Inactive;
        assert!(matches!(price_checkout(&[hidden]), Err(ServiceError::Conflict(_))));

        let mut unreviewed = line("Lamp", "20.00", 5, 1);
        unreviewed.approval_status = ApprovalStatus::Pending;
        assert!(matches!(price_checkout(&[unreviewed]), Err(ServiceError::Conflict(_))));
    }

    #[test]
    fn checkout_input_rules() {
        let ok = CheckoutInput {
            shipping_address: "1 Main St".to_string(),
            payment_method: "card".to_string(),
        };
        assert!(ok.validate().is_ok());

        let blank = CheckoutInput {
            shipping_address: "   ".to_string(),
            ..ok.clone()
        };
        assert!(matches!(blank.validate(), Err(ServiceError::Validation { ref field, .. }) if field == "shipping_address"));
    }

    #[test]
    fn seller_filter_uses_item_subquery() {
        let filter = OrderFilter {
            seller_id: Some(Uuid::nil()),
            status: Some(OrderStatus::Shipped),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders o");
        filter.push_conditions(&mut qb);
        let sql = qb.sql();
        assert!(sql.contains("o.id IN (SELECT order_id FROM order_items WHERE seller_id = $1)"));
        assert!(sql.contains("o.status = $2"));
    }
}
