use chrono::{DateTime, Utc};
use rand::Rng;
use thiserror::Error;

use crate::database::models::OtpRecord;

pub const OTP_LENGTH: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OtpError {
    #[error("No active code for this email")]
    Missing,
    #[error("Code has already been used")]
    Consumed,
    #[error("Code has expired")]
    Expired,
    #[error("Too many attempts, request a new code")]
    TooManyAttempts,
    #[error("Incorrect code")]
    Mismatch,
}

/// Zero-padded six digit numeric code
pub fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:0width$}", n, width = OTP_LENGTH)
}

/// Checks everything except the code itself. The caller reserves the
/// attempt in the database before comparing the code.
pub fn check_usable(record: &OtpRecord, now: DateTime<Utc>, max_attempts: i32) -> Result<(), OtpError> {
    if record.consumed_at.is_some() {
        return Err(OtpError::Consumed);
    }
    if record.expires_at <= now {
        return Err(OtpError::Expired);
    }
    if record.attempts >= max_attempts {
        return Err(OtpError::TooManyAttempts);
    }
    Ok(())
}

pub fn is_well_formed(code: &str) -> bool {
    code.len() == OTP_LENGTH && code.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OtpPurpose;
    use chrono::Duration;
    use uuid::Uuid;

    fn record(expires_in: i64, attempts: i32, consumed: bool) -> OtpRecord {
        let now = Utc::now();
        OtpRecord {
            id: Uuid::new_v4(),
            email: "buyer@example.com".to_string(),
            purpose: OtpPurpose::VerifyEmail,
            code_hash: String::new(),
            attempts,
            expires_at: now + Duration::minutes(expires_in),
            consumed_at: consumed.then_some(now),
            created_at: now,
        }
    }

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..50 {
            let code = generate_code();
            assert!(is_well_formed(&code), "bad code {}", code);
        }
        assert!(!is_well_formed("12345"));
        assert!(!is_well_formed("12a456"));
    }

    #[test]
    fn usable_code_passes() {
        assert_eq!(check_usable(&record(10, 0, false), Utc::now(), 5), Ok(()));
    }

    #[test]
    fn rejects_expired_consumed_and_exhausted() {
        let now = Utc::now();
        assert_eq!(check_usable(&record(-1, 0, false), now, 5), Err(OtpError::Expired));
        assert_eq!(check_usable(&record(10, 0, true), now, 5), Err(OtpError::Consumed));
        assert_eq!(check_usable(&record(10, 5, false), now, 5), Err(OtpError::TooManyAttempts));
    }

    #[test]
    fn exactly_max_attempts_are_allowed() {
        let now = Utc::now();
        let mut otp = record(10, 0, false);
        let mut allowed = 0;
        // Each allowed guess spends one attempt, as the reservation does
        while check_usable(&otp, now, 3).is_ok() {
            otp.attempts += 1;
            allowed += 1;
            assert!(allowed <= 3, "limit not enforced");
        }
        assert_eq!(allowed, 3);
        assert_eq!(check_usable(&otp, now, 3), Err(OtpError::TooManyAttempts));
        assert_eq!(check_usable(&record(10, 2, false), now, 3), Ok(()));
    }
}
