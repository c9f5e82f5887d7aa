//! The coupon ledger: issuance, validation, discount computation, and
//! single-use redemption shared by the spin wheel and the event rules
//! engine.

pub mod codes;
pub mod ledger;
pub mod types;

pub use ledger::{compute_discount, CouponLedger};
pub use types::{Coupon, CouponOrigin, CouponQuote, CouponStatus, CouponSummary};
