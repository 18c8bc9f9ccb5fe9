use std::sync::Arc;

use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::api::{Page, Paginated};
use crate::auth::hash_password;
use crate::auth::validation::{normalize_email, validate_email, validate_name, validate_password};
use crate::config;
use crate::database::is_unique_violation;
use crate::database::models::{SellerApplication, APPLICATION_COLUMNS};
use crate::services::mailer::{deliver, templates, Mailer};
use crate::services::{check, ServiceError};
use crate::types::ApplicationStatus;

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub business_name: String,
    pub business_address: String,
    pub tax_id: Option<String>,
    pub bank_account_name: Option<String>,
    pub bank_account_number: Option<String>,
    pub bank_name: Option<String>,
}

impl ApplicationInput {
    fn validate(&self) -> Result<(), ServiceError> {
        check("name", validate_name(&self.name))?;
        check("email", validate_email(&self.email))?;
        check("password", validate_password(&self.password))?;
        if self.business_name.trim().is_empty() {
            return Err(ServiceError::validation("business_name", "is required"));
        }
        if self.business_address.trim().is_empty() {
            return Err(ServiceError::validation("business_address", "is required"));
        }
        Ok(())
    }
}

fn push_status_filter(qb: &mut QueryBuilder<'_, Postgres>, status: Option<ApplicationStatus>) {
    if let Some(status) = status {
        qb.push(" WHERE status = ").push_bind(status.as_str());
    }
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub struct SellerApplicationService {
    pool: PgPool,
    mailer: Arc<dyn Mailer>,
}

impl SellerApplicationService {
    pub fn new(pool: PgPool, mailer: Arc<dyn Mailer>) -> Self {
        Self { pool, mailer }
    }

    pub async fn submit(&self, input: ApplicationInput) -> Result<SellerApplication, ServiceError> {
        input.validate()?;
        let email = normalize_email(&input.email);

        if self.email_taken(&email).await? {
            return Err(ServiceError::Conflict("Email is already registered".to_string()));
        }

        let password_hash = hash_password(&input.password)?;
        let application = sqlx::query_as::<_, SellerApplication>(&format!(
            "INSERT INTO seller_applications
                (name, email, phone, password_hash, business_name, business_address,
                 tax_id, bank_account_name, bank_account_number, bank_name)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {}",
            APPLICATION_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(&email)
        .bind(trimmed(&input.phone))
        .bind(&password_hash)
        .bind(input.business_name.trim())
        .bind(input.business_address.trim())
        .bind(trimmed(&input.tax_id))
        .bind(trimmed(&input.bank_account_name))
        .bind(trimmed(&input.bank_account_number))
        .bind(trimmed(&input.bank_name))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::Conflict("An application for this email is already pending".to_string())
            } else {
                e.into()
            }
        })?;

        tracing::info!("Seller application {} submitted by {}", application.id, application.email);
        Ok(application)
    }

    pub async fn list(
        &self,
        status: Option<ApplicationStatus>,
        page: Page,
    ) -> Result<Paginated<SellerApplication>, ServiceError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM seller_applications");
        push_status_filter(&mut count, status);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM seller_applications", APPLICATION_COLUMNS));
        push_status_filter(&mut select, status);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = select.build_query_as::<SellerApplication>().fetch_all(&self.pool).await?;

        Ok(Paginated::new(items, page, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<SellerApplication, ServiceError> {
        sqlx::query_as::<_, SellerApplication>(&format!(
            "SELECT {} FROM seller_applications WHERE id = $1",
            APPLICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("Seller application"))
    }

    /// Creates the seller account and profile from the application, all or nothing.
    pub async fn approve(&self, admin_id: Uuid, id: Uuid) -> Result<SellerApplication, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let application = sqlx::query_as::<_, SellerApplication>(&format!(
            "SELECT {} FROM seller_applications WHERE id = $1 FOR UPDATE",
            APPLICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ServiceError::not_found("Seller application"))?;

        let next = application.status.transition(ApplicationStatus::Approved)?;

        let taken: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
            .bind(&application.email)
            .fetch_one(&mut *tx)
            .await?;
        if taken {
            return Err(ServiceError::Conflict(format!(
                "A user with email {} already exists",
                application.email
            )));
        }

        let user_id: Uuid = sqlx::query_scalar(
            "INSERT INTO users (name, email, phone, password_hash, role, email_verified)
             VALUES ($1, $2, $3, $4, 'seller', TRUE)
             RETURNING id",
        )
        .bind(&application.name)
        .bind(&application.email)
        .bind(&application.phone)
        .bind(&application.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::Conflict(format!("A user with email {} already exists", application.email))
            } else {
                e.into()
            }
        })?;

        sqlx::query(
            "INSERT INTO seller_profiles
                (user_id, business_name, business_address, tax_id, bank_account_name, bank_account_number, bank_name)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user_id)
        .bind(&application.business_name)
        .bind(&application.business_address)
        .bind(&application.tax_id)
        .bind(&application.bank_account_name)
        .bind(&application.bank_account_number)
        .bind(&application.bank_name)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE seller_applications SET status = $2, reviewed_by = $3, reviewed_at = now() WHERE id = $1")
            .bind(id)
            .bind(next.as_str())
            .bind(admin_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!("Admin {} approved seller application {}, created seller {}", admin_id, id, user_id);

        deliver(
            self.mailer.as_ref(),
            templates::application_approved(&application.email, &application.name, &config::config().mail.app_url),
        )
        .await;
        self.get(id).await
    }

    pub async fn reject(&self, admin_id: Uuid, id: Uuid, reason: &str) -> Result<SellerApplication, ServiceError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ServiceError::validation("reason", "is required when rejecting"));
        }

        let mut tx = self.pool.begin().await?;
        let status: String = sqlx::query_scalar("SELECT status FROM seller_applications WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ServiceError::not_found("Seller application"))?;
        let current = ApplicationStatus::try_from(status).map_err(|e| ServiceError::Internal(e.to_string()))?;
        let next = current.transition(ApplicationStatus::Rejected)?;

        sqlx::query(
            "UPDATE seller_applications
             SET status = $2, rejection_reason = $3, reviewed_by = $4, reviewed_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(next.as_str())
        .bind(reason)
        .bind(admin_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!("Admin {} rejected seller application {}", admin_id, id);
        let application = self.get(id).await?;
        deliver(
            self.mailer.as_ref(),
            templates::application_rejected(&application.email, &application.name, reason),
        )
        .await;
        Ok(application)
    }

    async fn email_taken(&self, email: &str) -> Result<bool, ServiceError> {
        let taken: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(taken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ApplicationInput {
        ApplicationInput {
            name: "Grace Hopper".to_string(),
            email: "grace@example.com".to_string(),
            password: "compiler42".to_string(),
            phone: None,
            business_name: "Hopper Hardware".to_string(),
            business_address: "12 Navy Yard".to_string(),
            tax_id: Some("  ".to_string()),
            bank_account_name: None,
            bank_account_number: None,
            bank_name: None,
        }
    }

    #[test]
    fn accepts_complete_application() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn requires_business_details() {
        let mut missing = input();
        missing.business_address = " ".to_string();
        let err = missing.validate().unwrap_err();
        assert!(matches!(err, ServiceError::Validation { ref field, .. } if field == "business_address"));
    }

    #[test]
    fn weak_password_rejected() {
        let mut weak = input();
        weak.password = "short".to_string();
        assert!(matches!(weak.validate(), Err(ServiceError::Validation { ref field, .. }) if field == "password"));
    }

    #[test]
    fn blank_optionals_become_null() {
        let application = input();
        assert_eq!(trimmed(&application.tax_id), None);
        assert_eq!(trimmed(&Some(" 123 ".to_string())), Some("123"));
    }
}
