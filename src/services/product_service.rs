use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::api::{Page, Paginated};
use crate::database::models::{Product, PRODUCT_SELECT};
use crate::services::{like_pattern, ServiceError};
use crate::types::{ApprovalStatus, ProductStatus};

const PRODUCT_FROM: &str = "FROM products p \
     JOIN users u ON u.id = p.seller_id \
     LEFT JOIN categories c ON c.id = p.category_id";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl CatalogSort {
    fn order_by(self) -> &'static str {
        match self {
            CatalogSort::Newest => " ORDER BY p.created_at DESC, p.id",
            CatalogSort::PriceAsc => " ORDER BY p.price ASC, p.id",
            CatalogSort::PriceDesc => " ORDER BY p.price DESC, p.id",
            CatalogSort::Name => " ORDER BY p.name ASC, p.id",
        }
    }
}

/// Which products a listing may see
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub public_only: bool,
    pub seller_id: Option<Uuid>,
    pub status: Option<ProductStatus>,
    pub approval_status: Option<ApprovalStatus>,
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: CatalogSort,
}

impl ProductFilter {
    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");
        if self.public_only {
            qb.push(" AND p.approval_status = 'approved' AND p.status = 'active'");
        }
        if let Some(seller_id) = self.seller_id {
            qb.push(" AND p.seller_id = ").push_bind(seller_id);
        }
        if let Some(status) = self.status {
            qb.push(" AND p.status = ").push_bind(status.as_str());
        }
        if let Some(approval) = self.approval_status {
            qb.push(" AND p.approval_status = ").push_bind(approval.as_str());
        }
        if let Some(category_id) = self.category_id {
            qb.push(" AND p.category_id = ").push_bind(category_id);
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = like_pattern(search);
            qb.push(" AND (p.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.sku ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(min) = self.min_price {
            qb.push(" AND p.price >= ").push_bind(min);
        }
        if let Some(max) = self.max_price {
            qb.push(" AND p.price <= ").push_bind(max);
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub sku: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Absent keeps the value, `null` clears it
    #[serde(default, deserialize_with = "nullable")]
    pub sku: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "nullable")]
    pub image_url: Option<Option<String>>,
}

/// Tells an explicit `null` apart from a missing key
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ProductUpdate {
    /// Edits customers see go back through review; stock and SKU do not.
    pub fn changes_listing_content(&self) -> bool {
        self.name.is_some()
            || self.description.is_some()
            || self.price.is_some()
            || self.category_id.is_some()
            || self.image_url.is_some()
    }
}

fn validate_product_name(name: &str) -> Result<(), ServiceError> {
    let len = name.trim().chars().count();
    if len == 0 || len > 200 {
        return Err(ServiceError::validation("name", "must be 1 to 200 characters"));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> Result<(), ServiceError> {
    if price <= Decimal::ZERO {
        return Err(ServiceError::validation("price", "must be greater than zero"));
    }
    if price.scale() > 2 {
        return Err(ServiceError::validation("price", "must have at most two decimal places"));
    }
    Ok(())
}

fn validate_stock(stock: i32) -> Result<(), ServiceError> {
    if stock < 0 {
        return Err(ServiceError::validation("stock", "cannot be negative"));
    }
    Ok(())
}

pub struct ProductService {
    pool: PgPool,
}

impl ProductService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filter: &ProductFilter, page: Page) -> Result<Paginated<Product>, ServiceError> {
        let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) {}", PRODUCT_FROM));
        filter.push_conditions(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(PRODUCT_SELECT);
        filter.push_conditions(&mut select);
        select
            .push(filter.sort.order_by())
            .push(" LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = select.build_query_as::<Product>().fetch_all(&self.pool).await?;

        Ok(Paginated::new(items, page, total))
    }

    /// Every matching product, unpaginated
    pub async fn export_rows(&self, filter: &ProductFilter) -> Result<Vec<Product>, ServiceError> {
        let mut select = QueryBuilder::<Postgres>::new(PRODUCT_SELECT);
        filter.push_conditions(&mut select);
        select.push(filter.sort.order_by());
        let items = select.build_query_as::<Product>().fetch_all(&self.pool).await?;
        Ok(items)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Product>, ServiceError> {
        let product = sqlx::query_as::<_, Product>(&format!("{} WHERE p.id = $1", PRODUCT_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Customer-facing lookup; hidden products are indistinguishable from missing ones
    pub async fn public_get(&self, id: Uuid) -> Result<Product, ServiceError> {
        self.find(id)
            .await?
            .filter(Product::is_public)
            .ok_or_else(|| ServiceError::not_found("Product"))
    }

    pub async fn get(&self, id: Uuid) -> Result<Product, ServiceError> {
        self.find(id).await?.ok_or_else(|| ServiceError::not_found("Product"))
    }

    pub async fn seller_get(&self, seller_id: Uuid, id: Uuid) -> Result<Product, ServiceError> {
        self.find(id)
            .await?
            .filter(|p| p.seller_id == seller_id)
            .ok_or_else(|| ServiceError::not_found("Product"))
    }

    pub async fn create(&self, seller_id: Uuid, input: ProductInput) -> Result<Product, ServiceError> {
        validate_product_name(&input.name)?;
        validate_price(input.price)?;
        validate_stock(input.stock)?;
        self.ensure_category(input.category_id).await?;

        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO products (seller_id, category_id, name, description, sku, price, stock, image_url)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(seller_id)
        .bind(input.category_id)
        .bind(input.name.trim())
        .bind(input.description.trim())
        .bind(input.sku.as_deref().map(str::trim))
        .bind(input.price)
        .bind(input.stock)
        .bind(input.image_url)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("Seller {} created product {}", seller_id, id);
        self.get(id).await
    }

    pub async fn update(&self, seller_id: Uuid, id: Uuid, update: ProductUpdate) -> Result<Product, ServiceError> {
        let current = self.seller_get(seller_id, id).await?;

        if let Some(name) = &update.name {
            validate_product_name(name)?;
        }
        if let Some(price) = update.price {
            validate_price(price)?;
        }
        if let Some(stock) = update.stock {
            validate_stock(stock)?;
        }
        self.ensure_category(update.category_id.flatten()).await?;

        let resubmit = update.changes_listing_content();
        let (approval, status) = if resubmit {
            let status = if current.status == ProductStatus::Active {
                ProductStatus::Inactive
            } else {
                current.status
            };
            (ApprovalStatus::Pending, status)
        } else {
            (current.approval_status, current.status)
        };

        sqlx::query(
            "UPDATE products SET
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                sku = CASE WHEN $5 THEN $6 ELSE sku END,
                price = COALESCE($7, price),
                stock = COALESCE($8, stock),
                category_id = CASE WHEN $9 THEN $10 ELSE category_id END,
                image_url = CASE WHEN $11 THEN $12 ELSE image_url END,
                approval_status = $13,
                status = $14,
                rejection_reason = CASE WHEN $15 THEN NULL ELSE rejection_reason END,
                updated_at = now()
             WHERE id = $1 AND seller_id = $2",
        )
        .bind(id)
        .bind(seller_id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.description.as_deref().map(str::trim))
        .bind(update.sku.is_some())
        .bind(update.sku.flatten().map(|sku| sku.trim().to_string()))
        .bind(update.price)
        .bind(update.stock)
        .bind(update.category_id.is_some())
        .bind(update.category_id.flatten())
        .bind(update.image_url.is_some())
        .bind(update.image_url.flatten())
        .bind(approval.as_str())
        .bind(status.as_str())
        .bind(resubmit)
        .execute(&self.pool)
        .await?;

        if resubmit {
            tracing::info!("Product {} edited by seller {}, back to review", id, seller_id);
        }
        self.get(id).await
    }

    pub async fn set_status(&self, seller_id: Uuid, id: Uuid, to: ProductStatus) -> Result<Product, ServiceError> {
        let current = self.seller_get(seller_id, id).await?;
        let next = current.status.transition(to, current.approval_status)?;

        sqlx::query("UPDATE products SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(next.as_str())
            .execute(&self.pool)
            .await?;

        self.get(id).await
    }

    /// Products that were ever ordered are kept (inactive) for order history.
    /// Returns true when the row was actually removed.
    pub async fn delete(&self, seller_id: Uuid, id: Uuid) -> Result<bool, ServiceError> {
        self.seller_get(seller_id, id).await?;

        let ordered: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM order_items WHERE product_id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        if ordered {
            sqlx::query("UPDATE products SET status = 'inactive', updated_at = now() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
            tracing::info!("Product {} has order history, deactivated instead of deleted", id);
            return Ok(false);
        }

        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }

    pub async fn review(
        &self,
        admin_id: Uuid,
        id: Uuid,
        to: ApprovalStatus,
        reason: Option<String>,
    ) -> Result<Product, ServiceError> {
        let current = self.get(id).await?;
        let next = current.approval_status.transition(to)?;

        let reason = match next {
            ApprovalStatus::Rejected => {
                let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
                Some(reason.ok_or_else(|| ServiceError::validation("reason", "is required when rejecting"))?)
            }
            _ => None,
        };

        // A rejected listing cannot stay live
        let status = if next == ApprovalStatus::Rejected && current.status == ProductStatus::Active {
            ProductStatus::Inactive
        } else {
            current.status
        };

        sqlx::query(
            "UPDATE products
             SET approval_status = $2, rejection_reason = $3, status = $4, updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(next.as_str())
        .bind(reason)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        tracing::info!("Admin {} marked product {} as {}", admin_id, id, next);
        self.get(id).await
    }

    async fn ensure_category(&self, category_id: Option<Uuid>) -> Result<(), ServiceError> {
        let Some(category_id) = category_id else {
            return Ok(());
        };
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
            .bind(category_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(ServiceError::validation("category_id", "unknown category"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn price_rules() {
        assert!(validate_price(dec("19.99")).is_ok());
        assert!(validate_price(dec("0")).is_err());
        assert!(validate_price(dec("-1")).is_err());
        assert!(validate_price(dec("1.999")).is_err());
    }

    #[test]
    fn stock_edits_skip_review() {
        let restock = ProductUpdate {
            stock: Some(40),
            sku: Some(Some("SKU-9".to_string())),
            ..Default::default()
        };
        assert!(!restock.changes_listing_content());

        let reprice = ProductUpdate {
            price: Some(dec("5.00")),
            ..Default::default()
        };
        assert!(reprice.changes_listing_content());
    }

    #[test]
    fn null_clears_optional_fields() {
        let update: ProductUpdate = serde_json::from_value(serde_json::json!({
            "category_id": null,
            "sku": null,
            "stock": 3
        }))
        .unwrap();
        assert_eq!(update.category_id, Some(None));
        assert_eq!(update.sku, Some(None));
        assert_eq!(update.image_url, None);
        assert!(update.changes_listing_content());

        let untouched: ProductUpdate = serde_json::from_value(serde_json::json!({ "stock": 3 })).unwrap();
        assert_eq!(untouched.category_id, None);
        assert!(!untouched.changes_listing_content());
    }

    #[test]
    fn public_filter_restricts_visibility() {
        let filter = ProductFilter {
            public_only: true,
            search: Some("lamp".to_string()),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM products p");
        filter.push_conditions(&mut qb);
        let sql = qb.sql();
        assert!(sql.contains("p.approval_status = 'approved' AND p.status = 'active'"));
        assert!(sql.contains("p.name ILIKE $1"));
        assert!(sql.contains("p.sku ILIKE $3"));
    }

    #[test]
    fn sort_deserializes() {
        let sort: CatalogSort = serde_json::from_value(serde_json::json!("price_desc")).unwrap();
        assert_eq!(sort, CatalogSort::PriceDesc);
        assert!(CatalogSort::default().order_by().contains("created_at DESC"));
    }
}
