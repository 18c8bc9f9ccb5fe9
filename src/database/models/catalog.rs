use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::{ApprovalStatus, ProductStatus};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub seller_name: String,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub name: String,
    pub description: String,
    pub sku: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub image_url: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ProductStatus,
    #[sqlx(try_from = "String")]
    pub approval_status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether customers can see and buy the product
    pub fn is_public(&self) -> bool {
        self.status == ProductStatus::Active && self.approval_status == ApprovalStatus::Approved
    }
}

/// Products are always read with their seller and category names.
pub const PRODUCT_SELECT: &str = "SELECT p.id, p.seller_id, u.name AS seller_name, p.category_id, \
     c.name AS category_name, p.name, p.description, p.sku, p.price, p.stock, p.image_url, \
     p.status, p.approval_status, p.rejection_reason, p.created_at, p.updated_at \
     FROM products p \
     JOIN users u ON u.id = p.seller_id \
     LEFT JOIN categories c ON c.id = p.category_id";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub stock: i32,
    pub available: bool,
    pub line_total: Decimal,
}
