pub mod jwt;
pub mod otp;
pub mod password;
pub mod tokens;
pub mod validation;

pub use jwt::{decode_access_token, generate_access_token, Claims, JwtError};
pub use password::{hash_password, reject_unknown_account, verify_password};
