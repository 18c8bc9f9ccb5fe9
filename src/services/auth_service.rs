use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::tokens::{generate_refresh_token, hash_refresh_token};
use crate::auth::validation::{normalize_email, validate_email, validate_name, validate_password};
use crate::auth::{generate_access_token, hash_password, reject_unknown_account, verify_password, Claims};
use crate::config;
use crate::database::models::{RefreshTokenRecord, User, USER_COLUMNS};
use crate::database::{is_connection_error, is_unique_violation};
use crate::services::fallback_store::{FallbackStoreError, FallbackUser, FallbackUserStore};
use crate::services::mailer::{deliver, templates, Mailer};
use crate::services::otp_service::OtpService;
use crate::services::{check, ServiceError};
use crate::state::AppState;
use crate::types::{OtpPurpose, Role};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

/// The slice of a user returned alongside tokens
#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub email_verified: bool,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            email_verified: user.email_verified,
        }
    }
}

impl From<&FallbackUser> for SessionUser {
    fn from(user: &FallbackUser) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            email_verified: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: SessionUser,
    pub access_token: String,
    /// Absent for sessions issued from the fallback store
    pub refresh_token: Option<String>,
    pub token_type: &'static str,
    pub expires_in: i64,
}

impl From<FallbackStoreError> for ServiceError {
    fn from(err: FallbackStoreError) -> Self {
        match err {
            FallbackStoreError::DuplicateEmail(_) => ServiceError::Conflict("Email is already registered".to_string()),
            other => ServiceError::Unavailable(format!("Database and fallback store unavailable: {}", other)),
        }
    }
}

pub struct AuthService {
    pool: PgPool,
    mailer: Arc<dyn Mailer>,
    fallback: Arc<FallbackUserStore>,
}

impl AuthService {
    pub fn new(pool: PgPool, mailer: Arc<dyn Mailer>, fallback: Arc<FallbackUserStore>) -> Self {
        Self { pool, mailer, fallback }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.pool().clone(), state.mailer.clone(), state.fallback_users.clone())
    }

    pub async fn register(&self, input: RegisterInput) -> Result<AuthSession, ServiceError> {
        check("name", validate_name(&input.name))?;
        check("email", validate_email(&input.email))?;
        check("password", validate_password(&input.password))?;

        let email = normalize_email(&input.email);
        let name = input.name.trim();
        let password_hash = hash_password(&input.password)?;

        let inserted = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, phone, password_hash, role)
             VALUES ($1, $2, $3, $4, 'customer')
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(name)
        .bind(&email)
        .bind(input.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()))
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await;

        let user = match inserted {
            Ok(user) => user,
            Err(e) if is_unique_violation(&e) => {
                return Err(ServiceError::Conflict("Email is already registered".to_string()))
            }
            Err(e) if is_connection_error(&e) => {
                tracing::warn!("Database unreachable during registration, using fallback store: {}", e);
                let user = self.fallback.insert(name, &email, Role::Customer, &password_hash).await?;
                return self.fallback_session(&user);
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!("Registered customer {} ({})", user.email, user.id);
        self.send_code(&user.email, OtpPurpose::VerifyEmail).await;
        self.issue_session(&user).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError> {
        let email = normalize_email(email);

        let lookup = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS))
            .bind(&email)
            .fetch_optional(&self.pool)
            .await;

        let user = match lookup {
            Ok(Some(user)) => user,
            Ok(None) => {
                reject_unknown_account(password);
                tracing::warn!("Login failed: unknown email {}", email);
                return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
            Err(e) if is_connection_error(&e) => {
                tracing::warn!("Database unreachable during login, using fallback store: {}", e);
                return self.login_fallback(&email, password).await;
            }
            Err(e) => return Err(e.into()),
        };

        if !verify_password(password, &user.password_hash) {
            tracing::warn!("Login failed: wrong password for {}", user.id);
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
        if !user.is_active {
            tracing::warn!("Login refused: user {} is deactivated", user.id);
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        sqlx::query("UPDATE users SET last_login_at = now() WHERE id = $1")
            .bind(user.id)
            .execute(&self.pool)
            .await?;

        tracing::info!("User {} logged in as {}", user.id, user.role);
        self.issue_session(&user).await
    }

    async fn login_fallback(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError> {
        let matched = match self.fallback.find_by_email(email).await? {
            Some(user) => verify_password(password, &user.password_hash).then_some(user),
            None => {
                reject_unknown_account(password);
                None
            }
        };
        let user = matched.ok_or_else(|| ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        self.fallback_session(&user)
    }

    /// Fallback sessions are customer sessions whatever the file records.
    fn fallback_session(&self, user: &FallbackUser) -> Result<AuthSession, ServiceError> {
        if user.role != Role::Customer {
            tracing::warn!("Fallback account {} has role {}, signing in as customer", user.id, user.role);
        }
        let ttl = config::config().security.access_token_ttl_minutes;
        let mut claims = Claims::new(user.id, &user.email, Role::Customer, ttl);
        claims.fallback = true;

        Ok(AuthSession {
            user: SessionUser {
                role: Role::Customer,
                ..SessionUser::from(user)
            },
            access_token: generate_access_token(&claims)?,
            refresh_token: None,
            token_type: "Bearer",
            expires_in: ttl * 60,
        })
    }

    async fn issue_session(&self, user: &User) -> Result<AuthSession, ServiceError> {
        let refresh_token = store_refresh_token(&self.pool, user.id).await?;
        session_for(user, refresh_token)
    }

    /// Exchange a refresh token for a new pair; the presented token is revoked.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, ServiceError> {
        let invalid = || ServiceError::Unauthorized("Invalid or expired refresh token".to_string());
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT id, user_id, expires_at, revoked_at FROM refresh_tokens
             WHERE token_hash = $1
             FOR UPDATE",
        )
        .bind(hash_refresh_token(refresh_token))
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(invalid)?;

        if !record.is_usable(Utc::now()) {
            tracing::warn!("Rejected stale refresh token for user {}", record.user_id);
            return Err(invalid());
        }

        sqlx::query("UPDATE refresh_tokens SET revoked_at = now() WHERE id = $1")
            .bind(record.id)
            .execute(&mut *tx)
            .await?;

        let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(record.user_id)
            .fetch_optional(&mut *tx)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(invalid)?;

        let new_token = store_refresh_token(&mut *tx, user.id).await?;
        tx.commit().await?;

        session_for(&user, new_token)
    }

    pub async fn logout(&self, refresh_token: &str) -> Result<(), ServiceError> {
        sqlx::query("UPDATE refresh_tokens SET revoked_at = now() WHERE token_hash = $1 AND revoked_at IS NULL")
            .bind(hash_refresh_token(refresh_token))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Issue a code if it makes sense for this email. Silent either way so
    /// the endpoint does not reveal which emails exist.
    pub async fn request_code(&self, email: &str, purpose: OtpPurpose) -> Result<(), ServiceError> {
        let email = normalize_email(email);
        let user = self.find_by_email(&email).await?;

        let eligible = match (&user, purpose) {
            (Some(user), OtpPurpose::VerifyEmail) => user.is_active && !user.email_verified,
            (Some(user), OtpPurpose::ResetPassword) => user.is_active,
            (None, _) => false,
        };

        if eligible {
            self.send_code(&email, purpose).await;
        } else {
            tracing::debug!("Skipped {} code for {}", purpose, email);
        }
        Ok(())
    }

    pub async fn verify_email(&self, email: &str, code: &str) -> Result<(), ServiceError> {
        let email = normalize_email(email);
        OtpService::new(self.pool.clone())
            .verify(&email, OtpPurpose::VerifyEmail, code)
            .await?;

        let updated = sqlx::query("UPDATE users SET email_verified = TRUE, updated_at = now() WHERE email = $1")
            .bind(&email)
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(ServiceError::not_found("User"));
        }
        Ok(())
    }

    pub async fn reset_password(&self, email: &str, code: &str, new_password: &str) -> Result<(), ServiceError> {
        check("new_password", validate_password(new_password))?;
        let email = normalize_email(email);

        OtpService::new(self.pool.clone())
            .verify(&email, OtpPurpose::ResetPassword, code)
            .await?;

        let password_hash = hash_password(new_password)?;
        let mut tx = self.pool.begin().await?;

        let user_id: Option<Uuid> = sqlx::query_scalar(
            "UPDATE users SET password_hash = $1, updated_at = now() WHERE email = $2 RETURNING id",
        )
        .bind(&password_hash)
        .bind(&email)
        .fetch_optional(&mut *tx)
        .await?;
        let user_id = user_id.ok_or_else(|| ServiceError::not_found("User"))?;

        revoke_all_refresh_tokens(&mut *tx, user_id).await?;
        tx.commit().await?;

        tracing::info!("Password reset for user {}", user_id);
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn send_code(&self, email: &str, purpose: OtpPurpose) {
        match OtpService::new(self.pool.clone()).issue(email, purpose).await {
            Ok(code) => {
                let ttl = config::config().security.otp_ttl_minutes;
                deliver(self.mailer.as_ref(), templates::otp(email, &code, purpose, ttl)).await;
            }
            Err(e) => tracing::error!("Could not issue {} code for {}: {}", purpose, email, e),
        }
    }
}

fn session_for(user: &User, refresh_token: String) -> Result<AuthSession, ServiceError> {
    let ttl = config::config().security.access_token_ttl_minutes;
    let claims = Claims::new(user.id, &user.email, user.role, ttl);

    Ok(AuthSession {
        user: SessionUser::from(user),
        access_token: generate_access_token(&claims)?,
        refresh_token: Some(refresh_token),
        token_type: "Bearer",
        expires_in: ttl * 60,
    })
}

async fn store_refresh_token<'e, E: PgExecutor<'e>>(executor: E, user_id: Uuid) -> Result<String, ServiceError> {
    let token = generate_refresh_token();
    let expires_at = Utc::now() + Duration::days(config::config().security.refresh_token_ttl_days);

    sqlx::query("INSERT INTO refresh_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(hash_refresh_token(&token))
        .bind(expires_at)
        .execute(executor)
        .await?;

    Ok(token)
}

pub async fn revoke_all_refresh_tokens<'e, E: PgExecutor<'e>>(executor: E, user_id: Uuid) -> Result<u64, ServiceError> {
    let result = sqlx::query("UPDATE refresh_tokens SET revoked_at = now() WHERE user_id = $1 AND revoked_at IS NULL")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
