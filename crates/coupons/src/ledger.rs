//! The coupon ledger: issuance, validation, discount math, redemption, and
//! the expiry sweep. Backed by DashMap for development; conditional status
//! transitions run under the entry's write guard so they are exactly-once
//! under concurrency.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use perks_core::config::CouponConfig;
use perks_core::error::{PerksError, PerksResult};
use perks_core::types::{DiscountKind, DiscountTerms};

use crate::codes::generate_code;
use crate::types::{Coupon, CouponOrigin, CouponQuote, CouponStatus, CouponSummary};

/// Compute the discount a coupon's terms yield on an order subtotal. The
/// minimum-order floor is checked by the caller; this is pure arithmetic.
///
/// Percent discounts truncate sub-unit fractions rather than rounding.
/// The result never exceeds the subtotal.
pub fn compute_discount(terms: &DiscountTerms, subtotal: Decimal) -> Decimal {
    let raw = match terms.kind {
        DiscountKind::Percent => {
            let pct = (subtotal * terms.value / Decimal::ONE_HUNDRED).trunc();
            match terms.max_discount {
                Some(cap) => pct.min(cap),
                None => pct,
            }
        }
        DiscountKind::Fixed => terms.value,
    };
    raw.min(subtotal)
}

/// In-memory coupon ledger backed by `DashMap`, indexed by id and by code.
pub struct CouponLedger {
    config: CouponConfig,
    coupons: Arc<DashMap<Uuid, Coupon>>,
    by_code: Arc<DashMap<String, Uuid>>,
}

impl Default for CouponLedger {
    fn default() -> Self {
        Self::new(CouponConfig::default())
    }
}

impl CouponLedger {
    pub fn new(config: CouponConfig) -> Self {
        info!(
            code_length = config.code_length,
            code_prefix = %config.code_prefix,
            "CouponLedger initialized"
        );
        Self {
            config,
            coupons: Arc::new(DashMap::new()),
            by_code: Arc::new(DashMap::new()),
        }
    }

    // ─── Issuance ───────────────────────────────────────────────────────────

    /// Issue an Active coupon to a customer, snapshotting the discount terms
    /// of the originating slot or rule. Expiry is `now + validity_days`.
    pub fn issue(
        &self,
        customer_id: Uuid,
        origin: CouponOrigin,
        terms: DiscountTerms,
        validity_days: u32,
        now: DateTime<Utc>,
    ) -> Coupon {
        let id = Uuid::new_v4();
        let code = self.reserve_code(id);
        let coupon = Coupon {
            id,
            code,
            customer_id,
            terms,
            status: CouponStatus::Active,
            expires_at: now + Duration::days(i64::from(validity_days)),
            used_at: None,
            order_id: None,
            origin,
            created_at: now,
            updated_at: now,
        };
        info!(
            coupon_id = %coupon.id,
            code = %coupon.code,
            customer_id = %customer_id,
            expires_at = %coupon.expires_at,
            "Coupon issued"
        );
        metrics::counter!("coupons.issued").increment(1);
        self.coupons.insert(coupon.id, coupon.clone());
        coupon
    }

    /// Generate codes until one is unused, reserving it in the code index.
    /// Collisions are vanishingly rare at the configured length; the loop
    /// simply retries.
    fn reserve_code(&self, id: Uuid) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let code = generate_code(&self.config.code_prefix, self.config.code_length, &mut rng);
            if let Entry::Vacant(slot) = self.by_code.entry(code.clone()) {
                slot.insert(id);
                return code;
            }
        }
    }

    // ─── Checkout ───────────────────────────────────────────────────────────

    /// Validate a coupon against an order subtotal and quote the discount.
    /// A coupon found past its expiry has its stored status flipped as a
    /// side effect.
    pub fn validate(
        &self,
        code: &str,
        subtotal: Decimal,
        now: DateTime<Utc>,
    ) -> PerksResult<CouponQuote> {
        let id = *self.by_code.get(code).ok_or(PerksError::CouponNotFound)?;
        let mut entry = self.coupons.get_mut(&id).ok_or(PerksError::CouponNotFound)?;
        let coupon = entry.value_mut();

        Self::check_usable(coupon, now)?;

        if let Some(minimum) = coupon.terms.min_order_amount {
            if subtotal < minimum {
                return Err(PerksError::OrderBelowMinimum { minimum });
            }
        }

        let discount = compute_discount(&coupon.terms, subtotal);
        debug!(code = %coupon.code, %subtotal, %discount, "Coupon validated");
        Ok(CouponQuote {
            discount,
            coupon: CouponSummary::from(&*coupon),
        })
    }

    /// Redeem a coupon for an order: Active → Used, exactly once. A
    /// concurrent loser observes `CouponAlreadyUsed`; the transition happens
    /// under the entry's write guard.
    pub fn redeem(&self, code: &str, order_id: Uuid, now: DateTime<Utc>) -> PerksResult<Coupon> {
        let id = *self.by_code.get(code).ok_or(PerksError::CouponNotFound)?;
        let mut entry = self.coupons.get_mut(&id).ok_or(PerksError::CouponNotFound)?;
        let coupon = entry.value_mut();

        Self::check_usable(coupon, now)?;

        coupon.status = CouponStatus::Used;
        coupon.used_at = Some(now);
        coupon.order_id = Some(order_id);
        coupon.updated_at = now;
        info!(code = %coupon.code, %order_id, "Coupon redeemed");
        metrics::counter!("coupons.redeemed").increment(1);
        Ok(coupon.clone())
    }

    /// Reject Used and Expired coupons, lazily flipping an Active coupon
    /// whose expiry has passed. Call with the entry's write guard held.
    fn check_usable(coupon: &mut Coupon, now: DateTime<Utc>) -> PerksResult<()> {
        match coupon.status {
            CouponStatus::Used => Err(PerksError::CouponAlreadyUsed),
            CouponStatus::Expired => Err(PerksError::CouponExpired),
            CouponStatus::Active if now > coupon.expires_at => {
                coupon.status = CouponStatus::Expired;
                coupon.updated_at = now;
                metrics::counter!("coupons.expired").increment(1);
                Err(PerksError::CouponExpired)
            }
            CouponStatus::Active => Ok(()),
        }
    }

    // ─── Maintenance ────────────────────────────────────────────────────────

    /// Flip every Active coupon past its expiry to Expired. Idempotent;
    /// `validate` does not depend on it, the sweep keeps stored status
    /// consistent for reporting.
    pub fn expire_stale(&self, now: DateTime<Utc>) -> usize {
        let mut flipped = 0;
        for mut entry in self.coupons.iter_mut() {
            if entry.status == CouponStatus::Active && now > entry.expires_at {
                entry.status = CouponStatus::Expired;
                entry.updated_at = now;
                flipped += 1;
            }
        }
        if flipped > 0 {
            info!(count = flipped, "Expired stale coupons");
            metrics::counter!("coupons.expired").increment(flipped as u64);
        }
        flipped
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    pub fn find_by_code(&self, code: &str) -> Option<Coupon> {
        let id = *self.by_code.get(code)?;
        self.coupons.get(&id).map(|c| c.clone())
    }

    /// A customer's coupons, newest first. Stale Active rows are flipped on
    /// the way out so callers never render an expired coupon as usable.
    pub fn coupons_for_customer(&self, customer_id: &Uuid, now: DateTime<Utc>) -> Vec<Coupon> {
        let mut coupons: Vec<Coupon> = self
            .coupons
            .iter_mut()
            .filter(|c| c.customer_id == *customer_id)
            .map(|mut entry| {
                if entry.status == CouponStatus::Active && now > entry.expires_at {
                    entry.status = CouponStatus::Expired;
                    entry.updated_at = now;
                    metrics::counter!("coupons.expired").increment(1);
                }
                entry.clone()
            })
            .collect();
        coupons.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        coupons
    }

    /// Whether `rule_id` has ever granted this customer a coupon. Dedup for
    /// inherently single-shot events (first order, new user).
    pub fn has_rule_grant(&self, customer_id: &Uuid, rule_id: &Uuid) -> bool {
        self.coupons.iter().any(|c| {
            c.customer_id == *customer_id
                && matches!(&c.origin, CouponOrigin::Event { rule_id: r, .. } if r == rule_id)
        })
    }

    /// Whether `rule_id` granted this customer a coupon dated in `year`.
    /// Derives dedup state from what was actually issued rather than a
    /// separate counter.
    pub fn has_rule_grant_in_year(&self, customer_id: &Uuid, rule_id: &Uuid, year: i32) -> bool {
        self.coupons.iter().any(|c| {
            c.customer_id == *customer_id
                && c.created_at.year() == year
                && matches!(&c.origin, CouponOrigin::Event { rule_id: r, .. } if r == rule_id)
        })
    }
}
