pub mod catalog;
pub mod feedback;
pub mod order;
pub mod otp;
pub mod seller;
pub mod user;

pub use catalog::{CartLine, Category, Product, PRODUCT_SELECT};
pub use feedback::{Feedback, FEEDBACK_COLUMNS};
pub use order::{Order, OrderDetail, OrderItem, SellerOrder, ORDER_SELECT};
pub use otp::OtpRecord;
pub use seller::{SellerApplication, SellerProfile, APPLICATION_COLUMNS};
pub use user::{RefreshTokenRecord, User, USER_COLUMNS};
