use chrono::{Duration, Utc};
use sqlx::PgPool;

use crate::auth::otp::{self, OtpError};
use crate::auth::{hash_password, verify_password};
use crate::config;
use crate::database::models::OtpRecord;
use crate::services::ServiceError;
use crate::types::OtpPurpose;

impl From<OtpError> for ServiceError {
    fn from(err: OtpError) -> Self {
        ServiceError::validation("code", err.to_string())
    }
}

const OTP_COLUMNS: &str = "id, email, purpose, code_hash, attempts, expires_at, consumed_at, created_at";

pub struct OtpService {
    pool: PgPool,
}

impl OtpService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store a fresh code and return it in clear for mailing.
    /// Earlier unconsumed codes for the same email and purpose stop working.
    pub async fn issue(&self, email: &str, purpose: OtpPurpose) -> Result<String, ServiceError> {
        let security = &config::config().security;
        let code = otp::generate_code();
        let code_hash = hash_password(&code)?;
        let expires_at = Utc::now() + Duration::minutes(security.otp_ttl_minutes);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE otps SET consumed_at = now()
             WHERE email = $1 AND purpose = $2 AND consumed_at IS NULL",
        )
        .bind(email)
        .bind(purpose.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO otps (email, purpose, code_hash, expires_at) VALUES ($1, $2, $3, $4)")
            .bind(email)
            .bind(purpose.as_str())
            .bind(&code_hash)
            .bind(expires_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!("Issued {} code for {}", purpose, email);
        Ok(code)
    }

    /// Check a code and consume it on success. Every guess, malformed or
    /// wrong, spends one attempt.
    pub async fn verify(&self, email: &str, purpose: OtpPurpose, code: &str) -> Result<(), ServiceError> {
        let max_attempts = config::config().security.otp_max_attempts;

        let record = sqlx::query_as::<_, OtpRecord>(&format!(
            "SELECT {} FROM otps
             WHERE email = $1 AND purpose = $2
             ORDER BY created_at DESC
             LIMIT 1",
            OTP_COLUMNS
        ))
        .bind(email)
        .bind(purpose.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(OtpError::Missing)?;

        otp::check_usable(&record, Utc::now(), max_attempts)?;

        // The attempt is taken before the comparison; concurrent guesses
        // race on this row, never past the limit.
        let reserved: Option<i32> = sqlx::query_scalar(
            "UPDATE otps SET attempts = attempts + 1
             WHERE id = $1 AND attempts < $2 AND consumed_at IS NULL AND expires_at > now()
             RETURNING attempts",
        )
        .bind(record.id)
        .bind(max_attempts)
        .fetch_optional(&self.pool)
        .await?;

        if reserved.is_none() {
            return Err(self.refusal_reason(&record, max_attempts).await?.into());
        }

        if !otp::is_well_formed(code) || !verify_password(code, &record.code_hash) {
            tracing::warn!("Incorrect {} code for {}", purpose, email);
            return Err(OtpError::Mismatch.into());
        }

        let consumed = sqlx::query("UPDATE otps SET consumed_at = now() WHERE id = $1 AND consumed_at IS NULL")
            .bind(record.id)
            .execute(&self.pool)
            .await?;
        if consumed.rows_affected() == 0 {
            return Err(OtpError::Consumed.into());
        }

        Ok(())
    }

    /// Why a reservation found no row: the code changed state after it was read
    async fn refusal_reason(&self, record: &OtpRecord, max_attempts: i32) -> Result<OtpError, ServiceError> {
        let current = sqlx::query_as::<_, OtpRecord>(&format!("SELECT {} FROM otps WHERE id = $1", OTP_COLUMNS))
            .bind(record.id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match current {
            Some(current) => otp::check_usable(&current, Utc::now(), max_attempts)
                .err()
                .unwrap_or(OtpError::TooManyAttempts),
            None => OtpError::Missing,
        })
    }
}
