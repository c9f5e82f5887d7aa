//! Reward program configuration records: time-boxed programs, the weighted
//! reward slots on their wheels, and lifecycle event rules.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use perks_core::types::{DiscountKind, DiscountTerms, LifecycleEvent, MonthDay, TierLevel};

// ---------------------------------------------------------------------------
// Programs
// ---------------------------------------------------------------------------

/// A time-boxed Lucky Spin campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub id: Uuid,
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Free spins each customer gets per calendar day.
    pub daily_free_spins: u32,
    /// Point cost of one extra spin beyond the free allowance.
    pub points_per_spin: u64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Program {
    /// Whether the program is live at `now`: active flag set and
    /// `starts_at <= now < ends_at`.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.starts_at <= now && now < self.ends_at
    }
}

// ---------------------------------------------------------------------------
// Reward slots
// ---------------------------------------------------------------------------

/// The kind of outcome a wheel slot produces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    Percent,
    Fixed,
    /// A losing slot; the spin is recorded but no coupon is issued.
    NoReward,
}

/// One weighted outcome on a program's spin wheel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardSlot {
    pub id: Uuid,
    pub program_id: Uuid,
    pub kind: RewardKind,
    /// Percentage (0-100) for Percent, currency amount for Fixed,
    /// ignored for NoReward.
    pub value: Decimal,
    pub max_discount: Option<Decimal>,
    pub min_order_amount: Option<Decimal>,
    /// Days an issued coupon stays valid.
    pub validity_days: u32,
    /// Base draw probability before tier adjustment. The active slots of a
    /// program need not sum to 1; selection normalizes.
    pub base_probability: f64,
    pub silver_multiplier: f64,
    pub gold_multiplier: f64,
    pub platinum_multiplier: f64,
    pub label: String,
    pub icon: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RewardSlot {
    /// Probability multiplier for a customer tier. Bronze and unknown tiers
    /// draw at the base probability.
    pub fn tier_multiplier(&self, tier: TierLevel) -> f64 {
        match tier {
            TierLevel::Bronze => 1.0,
            TierLevel::Silver => self.silver_multiplier,
            TierLevel::Gold => self.gold_multiplier,
            TierLevel::Platinum => self.platinum_multiplier,
        }
    }

    /// Discount terms snapshot for coupon issuance. `None` for losing slots.
    pub fn discount_terms(&self) -> Option<DiscountTerms> {
        let kind = match self.kind {
            RewardKind::Percent => DiscountKind::Percent,
            RewardKind::Fixed => DiscountKind::Fixed,
            RewardKind::NoReward => return None,
        };
        Some(DiscountTerms {
            kind,
            value: self.value,
            max_discount: self.max_discount,
            min_order_amount: self.min_order_amount,
        })
    }
}

// ---------------------------------------------------------------------------
// Event rules
// ---------------------------------------------------------------------------

/// Configuration for one lifecycle auto-grant: when an event of `kind`
/// matches this rule's parameters, the customer receives a coupon with the
/// rule's discount terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRule {
    pub id: Uuid,
    pub name: String,
    pub kind: LifecycleEvent,
    pub discount: DiscountTerms,
    pub validity_days: u32,
    /// Inactive: minimum days since the customer's last order.
    pub inactive_days: Option<u32>,
    /// NewUser: maximum days since registration.
    pub new_user_days: Option<u32>,
    /// Holiday: the calendar day the rule fires on.
    pub holiday_date: Option<MonthDay>,
    /// VipTier: the tier the customer must have been promoted into.
    pub target_tier_id: Option<Uuid>,
    /// Tiers the rule applies to; empty means all tiers.
    pub eligible_tier_ids: Vec<Uuid>,
    /// Suppress repeat grants from this rule within a calendar year.
    pub once_per_year: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventRule {
    /// Whether the rule's tier filter admits a customer. An empty filter
    /// admits everyone, including customers without a tier.
    pub fn admits_tier(&self, tier_id: Option<&Uuid>) -> bool {
        if self.eligible_tier_ids.is_empty() {
            return true;
        }
        tier_id.is_some_and(|id| self.eligible_tier_ids.contains(id))
    }
}
