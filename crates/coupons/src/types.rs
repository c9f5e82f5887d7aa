//! Coupon entity and the summary shapes returned to checkout callers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use perks_core::types::{DiscountTerms, LifecycleEvent};

/// Coupon lifecycle state. Created Active; moves to Used exactly once or to
/// Expired when the validity window lapses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CouponStatus {
    Active,
    Used,
    Expired,
}

/// Where a coupon came from. Back-references are ids only; the originating
/// configuration may be edited or deleted without touching issued coupons.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "source")]
pub enum CouponOrigin {
    Spin { program_id: Uuid, slot_id: Uuid },
    Event { rule_id: Uuid, kind: LifecycleEvent },
}

/// A customer-bound, single-use discount grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub customer_id: Uuid,
    /// Discount terms copied from the originating slot or rule at issuance.
    pub terms: DiscountTerms,
    pub status: CouponStatus,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    /// The order that consumed the coupon.
    pub order_id: Option<Uuid>,
    pub origin: CouponOrigin,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-facing coupon description attached to a validation quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponSummary {
    pub code: String,
    pub terms: DiscountTerms,
    pub expires_at: DateTime<Utc>,
}

impl From<&Coupon> for CouponSummary {
    fn from(coupon: &Coupon) -> Self {
        Self {
            code: coupon.code.clone(),
            terms: coupon.terms.clone(),
            expires_at: coupon.expires_at,
        }
    }
}

/// Result of validating a coupon against an order subtotal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponQuote {
    pub discount: Decimal,
    pub coupon: CouponSummary,
}
