use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::ApplicationStatus;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SellerProfile {
    pub user_id: Uuid,
    pub business_name: String,
    pub business_address: String,
    pub tax_id: Option<String>,
    pub bank_account_name: Option<String>,
    pub bank_account_number: Option<String>,
    pub bank_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SellerApplication {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub business_name: String,
    pub business_address: String,
    pub tax_id: Option<String>,
    pub bank_account_name: Option<String>,
    pub bank_account_number: Option<String>,
    pub bank_name: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ApplicationStatus,
    pub rejection_reason: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub const APPLICATION_COLUMNS: &str = "id, name, email, phone, password_hash, business_name, \
     business_address, tax_id, bank_account_name, bank_account_number, bank_name, status, \
     rejection_reason, reviewed_by, reviewed_at, created_at";
