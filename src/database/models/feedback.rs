use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::FeedbackStatus;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Feedback {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub rating: Option<i32>,
    #[sqlx(try_from = "String")]
    pub status: FeedbackStatus,
    pub admin_response: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const FEEDBACK_COLUMNS: &str = "id, user_id, name, email, subject, message, rating, status, \
     admin_response, responded_at, created_at, updated_at";
