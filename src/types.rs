/// Shared domain enums used across the codebase
///
/// Every status is stored as TEXT in PostgreSQL and round-trips through
/// `as_str` / `TryFrom<String>`.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid {kind} value: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// A rejected status change
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot move {kind} from '{from}' to '{to}'")]
pub struct TransitionError {
    pub kind: &'static str,
    pub from: String,
    pub to: String,
}

macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ParseEnumError { kind: $kind, value: other.to_string() }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseEnumError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

text_enum!(Role, "role", {
    Customer => "customer",
    Seller => "seller",
    Admin => "admin",
});

text_enum!(ApplicationStatus, "application status", {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

text_enum!(ApprovalStatus, "approval status", {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

text_enum!(ProductStatus, "product status", {
    Draft => "draft",
    Active => "active",
    Inactive => "inactive",
});

text_enum!(FeedbackStatus, "feedback status", {
    New => "new",
    Reviewed => "reviewed",
    Responded => "responded",
    Closed => "closed",
});

text_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

text_enum!(OtpPurpose, "otp purpose", {
    VerifyEmail => "verify_email",
    ResetPassword => "reset_password",
});

fn reject(kind: &'static str, from: impl fmt::Display, to: impl fmt::Display) -> TransitionError {
    TransitionError {
        kind,
        from: from.to_string(),
        to: to.to_string(),
    }
}

impl ApplicationStatus {
    /// Applications are reviewed exactly once.
    pub fn transition(self, to: ApplicationStatus) -> Result<ApplicationStatus, TransitionError> {
        match (self, to) {
            (ApplicationStatus::Pending, ApplicationStatus::Approved)
            | (ApplicationStatus::Pending, ApplicationStatus::Rejected) => Ok(to),
            _ => Err(reject("seller application", self, to)),
        }
    }
}

impl ApprovalStatus {
    pub fn transition(self, to: ApprovalStatus) -> Result<ApprovalStatus, TransitionError> {
        match (self, to) {
            (ApprovalStatus::Pending, ApprovalStatus::Approved)
            | (ApprovalStatus::Pending, ApprovalStatus::Rejected)
            | (ApprovalStatus::Rejected, ApprovalStatus::Approved)
            | (ApprovalStatus::Approved, ApprovalStatus::Rejected) => Ok(to),
            _ => Err(reject("product approval", self, to)),
        }
    }
}

impl ProductStatus {
    /// Listing status is free-form for the seller, except that only
    /// approved products may go live.
    pub fn transition(self, to: ProductStatus, approval: ApprovalStatus) -> Result<ProductStatus, TransitionError> {
        if to == ProductStatus::Active && approval != ApprovalStatus::Approved {
            return Err(reject("product status", self, format!("{} (approval is {})", to, approval)));
        }
        Ok(to)
    }
}

impl FeedbackStatus {
    fn rank(self) -> u8 {
        match self {
            FeedbackStatus::New => 0,
            FeedbackStatus::Reviewed => 1,
            FeedbackStatus::Responded => 2,
            FeedbackStatus::Closed => 3,
        }
    }

    /// Forward-only progression.
    pub fn transition(self, to: FeedbackStatus) -> Result<FeedbackStatus, TransitionError> {
        if to.rank() > self.rank() {
            Ok(to)
        } else {
            Err(reject("feedback", self, to))
        }
    }
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn transition(self, to: OrderStatus) -> Result<OrderStatus, TransitionError> {
        use OrderStatus::*;
        match (self, to) {
            (Pending, Processing) | (Pending, Cancelled) => Ok(to),
            (Processing, Shipped) | (Processing, Cancelled) => Ok(to),
            (Shipped, Delivered) => Ok(to),
            _ => Err(reject("order", self, to)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_text_forms() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), *role);
        }
        assert_eq!(OtpPurpose::try_from("reset_password".to_string()).unwrap(), OtpPurpose::ResetPassword);
        let err = "superuser".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "invalid role value: 'superuser'");
    }

    #[test]
    fn serde_uses_snake_case() {
        assert_eq!(serde_json::to_value(OtpPurpose::VerifyEmail).unwrap(), "verify_email");
        let status: OrderStatus = serde_json::from_value(serde_json::json!("shipped")).unwrap();
        assert_eq!(status, OrderStatus::Shipped);
    }

    #[test]
    fn applications_are_reviewed_once() {
        assert_eq!(
            ApplicationStatus::Pending.transition(ApplicationStatus::Approved),
            Ok(ApplicationStatus::Approved)
        );
        assert!(ApplicationStatus::Pending.transition(ApplicationStatus::Rejected).is_ok());
        assert!(ApplicationStatus::Approved.transition(ApplicationStatus::Rejected).is_err());
        assert!(ApplicationStatus::Rejected.transition(ApplicationStatus::Approved).is_err());
        assert!(ApplicationStatus::Pending.transition(ApplicationStatus::Pending).is_err());
    }

    #[test]
    fn only_approved_products_go_live() {
        assert!(ProductStatus::Draft
            .transition(ProductStatus::Active, ApprovalStatus::Pending)
            .is_err());
        assert_eq!(
            ProductStatus::Draft.transition(ProductStatus::Active, ApprovalStatus::Approved),
            Ok(ProductStatus::Active)
        );
        assert_eq!(
            ProductStatus::Active.transition(ProductStatus::Inactive, ApprovalStatus::Rejected),
            Ok(ProductStatus::Inactive)
        );
    }

    #[test]
    fn feedback_moves_forward_only() {
        assert!(FeedbackStatus::New.transition(FeedbackStatus::Closed).is_ok());
        assert!(FeedbackStatus::Reviewed.transition(FeedbackStatus::Responded).is_ok());
        assert!(FeedbackStatus::Responded.transition(FeedbackStatus::Reviewed).is_err());
        assert!(FeedbackStatus::Closed.transition(FeedbackStatus::Closed).is_err());
    }

    #[test]
    fn order_lifecycle() {
        use OrderStatus::*;
        assert!(Pending.transition(Processing).is_ok());
        assert!(Processing.transition(Shipped).is_ok());
        assert!(Shipped.transition(Delivered).is_ok());
        assert!(Shipped.transition(Cancelled).is_err());
        assert!(Pending.transition(Delivered).is_err());
        assert!(Delivered.is_terminal() && Cancelled.is_terminal());
        let err = Delivered.transition(Pending).unwrap_err();
        assert_eq!(err.to_string(), "cannot move order from 'delivered' to 'pending'");
    }

    #[test]
    fn approval_can_be_revisited() {
        assert!(ApprovalStatus::Rejected.transition(ApprovalStatus::Approved).is_ok());
        assert!(ApprovalStatus::Approved.transition(ApprovalStatus::Rejected).is_ok());
        assert!(ApprovalStatus::Approved.transition(ApprovalStatus::Pending).is_err());
    }
}
