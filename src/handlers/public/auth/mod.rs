// handlers/public/auth/mod.rs - Token acquisition and account recovery

pub mod otp;     // OTP issue, email verification, password reset
pub mod session; // register, login, refresh, logout

pub use otp::{forgot_password_post, otp_send_post, reset_password_post, verify_email_post};
pub use session::{login_post, logout_post, refresh_post, register_post};
