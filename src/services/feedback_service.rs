use std::sync::Arc;

use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::api::{Page, Paginated};
use crate::auth::validation::{normalize_email, validate_email, validate_name};
use crate::database::models::{Feedback, FEEDBACK_COLUMNS};
use crate::services::mailer::{deliver, templates, Mailer};
use crate::services::{check, ServiceError};
use crate::types::FeedbackStatus;

const MAX_SUBJECT_LEN: usize = 200;
const MAX_MESSAGE_LEN: usize = 5000;

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackInput {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub rating: Option<i32>,
}

impl FeedbackInput {
    fn validate(&self) -> Result<(), ServiceError> {
        check("name", validate_name(&self.name))?;
        check("email", validate_email(&self.email))?;

        let subject = self.subject.trim().chars().count();
        if subject == 0 || subject > MAX_SUBJECT_LEN {
            return Err(ServiceError::validation(
                "subject",
                format!("must be 1 to {} characters", MAX_SUBJECT_LEN),
            ));
        }
        let message = self.message.trim().chars().count();
        if message == 0 || message > MAX_MESSAGE_LEN {
            return Err(ServiceError::validation(
                "message",
                format!("must be 1 to {} characters", MAX_MESSAGE_LEN),
            ));
        }
        if let Some(rating) = self.rating {
            if !(1..=5).contains(&rating) {
                return Err(ServiceError::validation("rating", "must be between 1 and 5"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackUpdate {
    pub status: Option<FeedbackStatus>,
    pub response: Option<String>,
}

/// Resolves the status an update lands on. A response always means `responded`.
fn target_status(current: FeedbackStatus, update: &FeedbackUpdate) -> Result<FeedbackStatus, ServiceError> {
    let response = update.response.as_deref().map(str::trim);
    let requested = match (response, update.status) {
        (Some(""), _) => return Err(ServiceError::validation("response", "cannot be empty")),
        (Some(_), Some(status)) if status != FeedbackStatus::Responded => {
            return Err(ServiceError::validation(
                "status",
                "must be 'responded' (or omitted) when a response is given",
            ))
        }
        (Some(_), _) => FeedbackStatus::Responded,
        (None, Some(status)) => status,
        (None, None) => return Err(ServiceError::BadRequest("Nothing to update".to_string())),
    };
    Ok(current.transition(requested)?)
}

pub struct FeedbackService {
    pool: PgPool,
    mailer: Arc<dyn Mailer>,
}

impl FeedbackService {
    pub fn new(pool: PgPool, mailer: Arc<dyn Mailer>) -> Self {
        Self { pool, mailer }
    }

    pub async fn submit(&self, user_id: Option<Uuid>, input: FeedbackInput) -> Result<Feedback, ServiceError> {
        input.validate()?;

        let feedback = sqlx::query_as::<_, Feedback>(&format!(
            "INSERT INTO customer_feedback (user_id, name, email, subject, message, rating)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            FEEDBACK_COLUMNS
        ))
        .bind(user_id)
        .bind(input.name.trim())
        .bind(normalize_email(&input.email))
        .bind(input.subject.trim())
        .bind(input.message.trim())
        .bind(input.rating)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("Feedback {} received from {}", feedback.id, feedback.email);
        Ok(feedback)
    }

    pub async fn list(&self, status: Option<FeedbackStatus>, page: Page) -> Result<Paginated<Feedback>, ServiceError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM customer_feedback");
        push_status_filter(&mut count, status);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM customer_feedback", FEEDBACK_COLUMNS));
        push_status_filter(&mut select, status);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = select.build_query_as::<Feedback>().fetch_all(&self.pool).await?;

        Ok(Paginated::new(items, page, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<Feedback, ServiceError> {
        sqlx::query_as::<_, Feedback>(&format!("SELECT {} FROM customer_feedback WHERE id = $1", FEEDBACK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Feedback"))
    }

    pub async fn update(&self, admin_id: Uuid, id: Uuid, update: FeedbackUpdate) -> Result<Feedback, ServiceError> {
        let current = self.get(id).await?;
        let next = target_status(current.status, &update)?;
        let response = update.response.as_deref().map(str::trim);

        // The status guard makes concurrent updates fail instead of overwrite
        let feedback = sqlx::query_as::<_, Feedback>(&format!(
            "UPDATE customer_feedback SET
                status = $2,
                admin_response = COALESCE($3, admin_response),
                responded_at = CASE WHEN $3 IS NULL THEN responded_at ELSE now() END,
                updated_at = now()
             WHERE id = $1 AND status = $4
             RETURNING {}",
            FEEDBACK_COLUMNS
        ))
        .bind(id)
        .bind(next.as_str())
        .bind(response)
        .bind(current.status.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::Conflict("Feedback was updated concurrently".to_string()))?;

        tracing::info!("Admin {} moved feedback {} from {} to {}", admin_id, id, current.status, next);

        if let Some(response) = response {
            deliver(
                self.mailer.as_ref(),
                templates::feedback_response(&feedback.email, &feedback.name, &feedback.subject, response),
            )
            .await;
        }
        Ok(feedback)
    }
}

fn push_status_filter(qb: &mut QueryBuilder<'_, Postgres>, status: Option<FeedbackStatus>) {
    if let Some(status) = status {
        qb.push(" WHERE status = ").push_bind(status.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> FeedbackInput {
        FeedbackInput {
            name: "Lin".to_string(),
            email: "Lin@Example.com".to_string(),
            subject: "Late delivery".to_string(),
            message: "My parcel took two weeks.".to_string(),
            rating: Some(3),
        }
    }

    #[test]
    fn rating_must_be_one_to_five() {
        assert!(input().validate().is_ok());
        let mut bad = input();
        bad.rating = Some(6);
        assert!(matches!(bad.validate(), Err(ServiceError::Validation { ref field, .. }) if field == "rating"));
        bad.rating = None;
        assert!(bad.validate().is_ok());
    }

    #[test]
    fn response_implies_responded() {
        let update = FeedbackUpdate {
            status: None,
            response: Some("Sorry about that, refund issued.".to_string()),
        };
        assert_eq!(target_status(FeedbackStatus::New, &update).unwrap(), FeedbackStatus::Responded);
    }

    #[test]
    fn response_with_other_status_is_rejected() {
        let update = FeedbackUpdate {
            status: Some(FeedbackStatus::Closed),
            response: Some("Done".to_string()),
        };
        assert!(matches!(target_status(FeedbackStatus::New, &update), Err(ServiceError::Validation { .. })));
    }

    #[test]
    fn backwards_moves_are_invalid_transitions() {
        let update = FeedbackUpdate {
            status: Some(FeedbackStatus::Reviewed),
            response: None,
        };
        assert!(matches!(
            target_status(FeedbackStatus::Closed, &update),
            Err(ServiceError::InvalidTransition(_))
        ));
    }

    #[test]
    fn empty_update_is_bad_request() {
        assert!(matches!(
            target_status(FeedbackStatus::New, &FeedbackUpdate::default()),
            Err(ServiceError::BadRequest(_))
        ));
    }
}
