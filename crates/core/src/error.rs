use rust_decimal::Decimal;
use thiserror::Error;

pub type PerksResult<T> = Result<T, PerksError>;

#[derive(Error, Debug)]
pub enum PerksError {
    #[error("No reward program is currently active")]
    NoActiveProgram,

    #[error("Program has no active reward slots configured")]
    NoRewardsConfigured,

    #[error("Daily free spin limit reached")]
    DailyLimitExceeded,

    #[error("Insufficient points: need {needed}, have {available}")]
    InsufficientPoints { needed: u64, available: u64 },

    #[error("Coupon code not found")]
    CouponNotFound,

    #[error("Coupon has already been used")]
    CouponAlreadyUsed,

    #[error("Coupon has expired")]
    CouponExpired,

    #[error("Order subtotal is below the coupon minimum of {minimum}")]
    OrderBelowMinimum { minimum: Decimal },

    #[error("Event rule not found")]
    RuleNotFound,

    #[error("Invalid event context: {0}")]
    InvalidEventContext(String),

    #[error("Customer not found")]
    CustomerNotFound,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
