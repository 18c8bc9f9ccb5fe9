use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::validation::{validate_name, validate_password};
use crate::auth::{hash_password, verify_password};
use crate::database::models::{SellerProfile, User, USER_COLUMNS};
use crate::services::auth_service::revoke_all_refresh_tokens;
use crate::services::{check, ServiceError};
use crate::types::Role;

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    #[serde(flatten)]
    pub user: User,
    pub seller_profile: Option<SellerProfile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SellerProfileUpdate {
    pub business_name: Option<String>,
    pub business_address: Option<String>,
    pub tax_id: Option<String>,
    pub bank_account_name: Option<String>,
    pub bank_account_number: Option<String>,
    pub bank_name: Option<String>,
}

pub struct AccountService {
    pool: PgPool,
}

impl AccountService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<Profile, ServiceError> {
        let user = self.user(user_id).await?;
        let seller_profile = if user.role == Role::Seller {
            self.seller_profile(user_id).await?
        } else {
            None
        };
        Ok(Profile { user, seller_profile })
    }

    pub async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<Profile, ServiceError> {
        if let Some(name) = &update.name {
            check("name", validate_name(name))?;
        }

        sqlx::query(
            "UPDATE users
             SET name = COALESCE($2, name), phone = COALESCE($3, phone), updated_at = now()
             WHERE id = $1",
        )
        .bind(user_id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.phone.as_deref().map(str::trim))
        .execute(&self.pool)
        .await?;

        self.profile(user_id).await
    }

    pub async fn change_password(&self, user_id: Uuid, current: &str, new_password: &str) -> Result<(), ServiceError> {
        let user = self.user(user_id).await?;
        if !verify_password(current, &user.password_hash) {
            return Err(ServiceError::validation("current_password", "Current password is incorrect"));
        }
        check("new_password", validate_password(new_password))?;

        let password_hash = hash_password(new_password)?;
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(user_id)
            .bind(&password_hash)
            .execute(&mut *tx)
            .await?;
        revoke_all_refresh_tokens(&mut *tx, user_id).await?;
        tx.commit().await?;

        tracing::info!("User {} changed their password", user_id);
        Ok(())
    }

    pub async fn update_seller_profile(
        &self,
        user_id: Uuid,
        update: SellerProfileUpdate,
    ) -> Result<SellerProfile, ServiceError> {
        for (field, value) in [
            ("business_name", &update.business_name),
            ("business_address", &update.business_address),
        ] {
            if matches!(value, Some(v) if v.trim().is_empty()) {
                return Err(ServiceError::validation(field, "cannot be empty"));
            }
        }

        sqlx::query_as::<_, SellerProfile>(
            "UPDATE seller_profiles SET
                business_name = COALESCE($2, business_name),
                business_address = COALESCE($3, business_address),
                tax_id = COALESCE($4, tax_id),
                bank_account_name = COALESCE($5, bank_account_name),
                bank_account_number = COALESCE($6, bank_account_number),
                bank_name = COALESCE($7, bank_name),
                updated_at = now()
             WHERE user_id = $1
             RETURNING *",
        )
        .bind(user_id)
        .bind(update.business_name.as_deref().map(str::trim))
        .bind(update.business_address.as_deref().map(str::trim))
        .bind(update.tax_id)
        .bind(update.bank_account_name)
        .bind(update.bank_account_number)
        .bind(update.bank_name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("Seller profile"))
    }

    async fn user(&self, user_id: Uuid) -> Result<User, ServiceError> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    async fn seller_profile(&self, user_id: Uuid) -> Result<Option<SellerProfile>, ServiceError> {
        let profile = sqlx::query_as::<_, SellerProfile>("SELECT * FROM seller_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }
}
