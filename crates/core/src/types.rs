//! Shared domain types consumed by the catalog, coupon, spin, and event
//! crates.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ─── Discount Terms ─────────────────────────────────────────────────────────

/// How a discount reduces an order subtotal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// Percentage off the subtotal (`value` is the percentage, 0-100).
    Percent,
    /// Fixed amount off the subtotal (`value` is a currency amount).
    Fixed,
}

/// Discount parameters shared by reward slots, event rules, and the coupons
/// they produce. Issuance copies these by value; later edits to the source
/// configuration never change an already-issued coupon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountTerms {
    pub kind: DiscountKind,
    pub value: Decimal,
    /// Upper bound on the computed discount (Percent coupons).
    pub max_discount: Option<Decimal>,
    /// Minimum order subtotal required to apply the coupon.
    pub min_order_amount: Option<Decimal>,
}

impl DiscountTerms {
    pub fn percent(value: Decimal) -> Self {
        Self {
            kind: DiscountKind::Percent,
            value,
            max_discount: None,
            min_order_amount: None,
        }
    }

    pub fn fixed(value: Decimal) -> Self {
        Self {
            kind: DiscountKind::Fixed,
            value,
            max_discount: None,
            min_order_amount: None,
        }
    }

    pub fn with_max_discount(mut self, cap: Decimal) -> Self {
        self.max_discount = Some(cap);
        self
    }

    pub fn with_min_order(mut self, floor: Decimal) -> Self {
        self.min_order_amount = Some(floor);
        self
    }
}

// ─── Tier Levels ────────────────────────────────────────────────────────────

/// Customer tier levels recognized by the reward wheel. Reward slots carry a
/// probability multiplier for Silver, Gold, and Platinum; Bronze and any
/// unrecognized tier use the base probability unchanged.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum TierLevel {
    #[default]
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl TierLevel {
    /// Resolve a tier catalog name, case-insensitively. Unknown names behave
    /// as Bronze so a misconfigured tier can never block a spin.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "silver" => TierLevel::Silver,
            "gold" => TierLevel::Gold,
            "platinum" => TierLevel::Platinum,
            _ => TierLevel::Bronze,
        }
    }
}

// ─── Lifecycle Events ───────────────────────────────────────────────────────

/// Customer lifecycle events that can auto-grant coupons through the event
/// rules engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    Birthday,
    NewUser,
    Inactive,
    VipTier,
    FirstOrder,
    Holiday,
}

// ─── Month-Day Calendar Key ─────────────────────────────────────────────────

/// A month/day pair with an `"MM-DD"` string form. Holiday rules and
/// birthday matching compare month and day only, independent of year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthDay {
    month: u32,
    day: u32,
}

impl MonthDay {
    /// Build a month/day key, rejecting combinations that never occur on a
    /// calendar. Feb 29 is accepted; it only matches in leap years.
    pub fn new(month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(2024, month, day).map(|_| Self { month, day })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            month: date.month(),
            day: date.day(),
        }
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn matches(&self, date: NaiveDate) -> bool {
        date.month() == self.month && date.day() == self.day
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

impl FromStr for MonthDay {
    type Err = crate::error::PerksError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || crate::error::PerksError::Config(format!("invalid month-day: {s:?}"));
        let (month, day) = s.split_once('-').ok_or_else(invalid)?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        let day: u32 = day.parse().map_err(|_| invalid())?;
        Self::new(month, day).ok_or_else(invalid)
    }
}

impl TryFrom<String> for MonthDay {
    type Error = crate::error::PerksError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MonthDay> for String {
    fn from(md: MonthDay) -> Self {
        md.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_from_name() {
        assert_eq!(TierLevel::from_name("Gold"), TierLevel::Gold);
        assert_eq!(TierLevel::from_name("PLATINUM"), TierLevel::Platinum);
        assert_eq!(TierLevel::from_name("silver"), TierLevel::Silver);
        assert_eq!(TierLevel::from_name("bronze"), TierLevel::Bronze);
        assert_eq!(TierLevel::from_name("copper"), TierLevel::Bronze);
    }

    #[test]
    fn test_month_day_round_trip() {
        let md: MonthDay = "03-08".parse().unwrap();
        assert_eq!(md.month(), 3);
        assert_eq!(md.day(), 8);
        assert_eq!(md.to_string(), "03-08");
    }

    #[test]
    fn test_month_day_rejects_malformed() {
        assert!("13-40".parse::<MonthDay>().is_err());
        assert!("02-30".parse::<MonthDay>().is_err());
        assert!("0308".parse::<MonthDay>().is_err());
        assert!("".parse::<MonthDay>().is_err());
    }

    #[test]
    fn test_month_day_matches_any_year() {
        let md = MonthDay::new(3, 8).unwrap();
        assert!(md.matches(NaiveDate::from_ymd_opt(2024, 3, 8).unwrap()));
        assert!(md.matches(NaiveDate::from_ymd_opt(1999, 3, 8).unwrap()));
        assert!(!md.matches(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()));
    }

    #[test]
    fn test_month_day_serde_string_form() {
        let md = MonthDay::new(12, 25).unwrap();
        let json = serde_json::to_string(&md).unwrap();
        assert_eq!(json, "\"12-25\"");
        let back: MonthDay = serde_json::from_str(&json).unwrap();
        assert_eq!(back, md);
    }
}
