use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::CartLine;
use crate::services::ServiceError;

pub const MAX_LINE_QUANTITY: i32 = 99;

#[derive(Debug, Clone, Serialize)]
pub struct Cart {
    pub items: Vec<CartLine>,
    pub item_count: i64,
    pub total: Decimal,
}

impl Cart {
    /// Totals only count lines that can still be bought
    pub fn from_lines(items: Vec<CartLine>) -> Self {
        let (item_count, total) = items
            .iter()
            .filter(|line| line.available)
            .fold((0_i64, Decimal::ZERO), |(count, total), line| {
                (count + i64::from(line.quantity), total + line.line_total)
            });
        Self { items, item_count, total }
    }
}

fn validate_quantity(quantity: i32, stock: i32) -> Result<(), ServiceError> {
    if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
        return Err(ServiceError::validation(
            "quantity",
            format!("must be between 1 and {}", MAX_LINE_QUANTITY),
        ));
    }
    if quantity > stock {
        return Err(ServiceError::Conflict(format!("Only {} left in stock", stock)));
    }
    Ok(())
}

/// Quantity a line would hold after adding to it
fn combined_quantity(existing: Option<i32>, added: i32) -> i32 {
    existing.unwrap_or(0).saturating_add(added)
}

pub struct CartService {
    pool: PgPool,
}

impl CartService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, user_id: Uuid) -> Result<Cart, ServiceError> {
        let lines = sqlx::query_as::<_, CartLine>(
            "SELECT ci.product_id, p.name, p.image_url, p.price, ci.quantity, p.stock,
                    (p.status = 'active' AND p.approval_status = 'approved' AND p.stock >= ci.quantity) AS available,
                    p.price * ci.quantity AS line_total
             FROM cart_items ci
             JOIN products p ON p.id = ci.product_id
             WHERE ci.user_id = $1
             ORDER BY ci.created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Cart::from_lines(lines))
    }

    pub async fn add(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<Cart, ServiceError> {
        let stock = self.buyable_stock(product_id).await?;
        let existing: Option<i32> =
            sqlx::query_scalar("SELECT quantity FROM cart_items WHERE user_id = $1 AND product_id = $2")
                .bind(user_id)
                .bind(product_id)
                .fetch_optional(&self.pool)
                .await?;

        if quantity < 1 {
            return Err(ServiceError::validation("quantity", "must be at least 1"));
        }
        validate_quantity(quantity, stock)?;
        validate_quantity(combined_quantity(existing, quantity), stock)?;

        sqlx::query(
            "INSERT INTO cart_items (user_id, product_id, quantity) VALUES ($1, $2, $3)
             ON CONFLICT (user_id, product_id)
             DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity, updated_at = now()",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        self.get(user_id).await
    }

    /// Zero removes the line.
    pub async fn set_quantity(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<Cart, ServiceError> {
        if quantity == 0 {
            return self.remove(user_id, product_id).await;
        }

        let stock = self.buyable_stock(product_id).await?;
        validate_quantity(quantity, stock)?;

        let updated = sqlx::query(
            "UPDATE cart_items SET quantity = $3, updated_at = now() WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(ServiceError::not_found("Cart item"));
        }

        self.get(user_id).await
    }

    pub async fn remove(&self, user_id: Uuid, product_id: Uuid) -> Result<Cart, ServiceError> {
        let deleted = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(ServiceError::not_found("Cart item"));
        }
        self.get(user_id).await
    }

    pub async fn clear(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        let deleted = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(deleted.rows_affected())
    }

    async fn buyable_stock(&self, product_id: Uuid) -> Result<i32, ServiceError> {
        sqlx::query_scalar(
            "SELECT stock FROM products WHERE id = $1 AND status = 'active' AND approval_status = 'approved'",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("Product"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: i32, price: &str, available: bool) -> CartLine {
        let price: Decimal = price.parse().unwrap();
        CartLine {
            product_id: Uuid::new_v4(),
            name: "Widget".to_string(),
            image_url: None,
            price,
            quantity,
            stock: 10,
            available,
            line_total: price * Decimal::from(quantity),
        }
    }

    #[test]
    fn totals_skip_unavailable_lines() {
        let cart = Cart::from_lines(vec![line(2, "3.50", true), line(1, "10.00", false), line(3, "1.25", true)]);
        assert_eq!(cart.items.len(), 3);
        assert_eq!(cart.item_count, 5);
        assert_eq!(cart.total, "10.75".parse::<Decimal>().unwrap());
    }

    #[test]
    fn quantity_bounds() {
        assert!(validate_quantity(1, 5).is_ok());
        assert!(matches!(validate_quantity(0, 5), Err(ServiceError::Validation { .. })));
        assert!(matches!(validate_quantity(100, 500), Err(ServiceError::Validation { .. })));
        assert!(matches!(validate_quantity(6, 5), Err(ServiceError::Conflict(_))));
    }

    #[test]
    fn adding_to_a_line_cannot_overflow() {
        assert_eq!(combined_quantity(None, 3), 3);
        assert_eq!(combined_quantity(Some(5), 2), 7);
        assert_eq!(combined_quantity(Some(5), i32::MAX), i32::MAX);
        assert!(matches!(validate_quantity(i32::MAX, 50), Err(ServiceError::Validation { .. })));
        assert!(matches!(
            validate_quantity(combined_quantity(Some(98), 2), 500),
            Err(ServiceError::Validation { .. })
        ));
    }
}
