//! Lifecycle event evaluation: match active rules against a customer event,
//! filter by tier, dedup against previously granted coupons, and issue one
//! coupon per surviving rule.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use perks_catalog::{CatalogStore, EventRule};
use perks_core::customers::{CustomerDirectory, CustomerProfile};
use perks_core::error::{PerksError, PerksResult};
use perks_core::types::{LifecycleEvent, MonthDay};
use perks_coupons::{Coupon, CouponLedger, CouponOrigin};

/// Trigger-supplied data accompanying an event. Everything else the
/// predicates need is read from the customer profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventContext {
    /// Days since the customer's last order, when the inactivity detector
    /// already computed it. Falls back to the profile's `last_order_at`.
    pub days_inactive: Option<u32>,
    /// The completed order behind a FirstOrder trigger.
    pub order_id: Option<Uuid>,
}

/// The lifecycle auto-grant engine.
pub struct EventEngine {
    catalog: Arc<CatalogStore>,
    ledger: Arc<CouponLedger>,
    customers: Arc<CustomerDirectory>,
    grant_locks: DashMap<(Uuid, Uuid), Arc<Mutex<()>>>,
}

impl EventEngine {
    pub fn new(
        catalog: Arc<CatalogStore>,
        ledger: Arc<CouponLedger>,
        customers: Arc<CustomerDirectory>,
    ) -> Self {
        Self {
            catalog,
            ledger,
            customers,
            grant_locks: DashMap::new(),
        }
    }

    /// Evaluate an event for a customer and issue a coupon for every active
    /// matching rule that passes the tier filter and dedup. Evaluation with
    /// no match, or blocked by dedup, leaves no trace.
    pub fn evaluate(
        &self,
        customer_id: Uuid,
        kind: LifecycleEvent,
        ctx: &EventContext,
        now: DateTime<Utc>,
    ) -> PerksResult<Vec<Coupon>> {
        let profile = self.customers.get(&customer_id)?;
        let mut issued = Vec::new();

        for rule in self.catalog.active_rules(kind) {
            if !rule.admits_tier(profile.tier_id.as_ref()) {
                continue;
            }
            if !self.rule_matches(&rule, &profile, ctx, now)? {
                continue;
            }

            // Dedup check and issuance under one per-(customer, rule) lock;
            // a concurrent sweep of the same event cannot double-grant.
            let lock = self
                .grant_locks
                .entry((customer_id, rule.id))
                .or_default()
                .clone();
            let _guard = lock.lock();

            if self.already_granted(&customer_id, &rule, now) {
                continue;
            }

            let coupon = self.ledger.issue(
                customer_id,
                CouponOrigin::Event {
                    rule_id: rule.id,
                    kind,
                },
                rule.discount.clone(),
                rule.validity_days,
                now,
            );
            info!(
                customer_id = %customer_id,
                rule_id = %rule.id,
                rule = %rule.name,
                kind = ?kind,
                code = %coupon.code,
                "Event rule granted coupon"
            );
            metrics::counter!("events.granted").increment(1);
            issued.push(coupon);
        }

        Ok(issued)
    }

    fn rule_matches(
        &self,
        rule: &EventRule,
        profile: &CustomerProfile,
        ctx: &EventContext,
        now: DateTime<Utc>,
    ) -> PerksResult<bool> {
        let today = now.date_naive();
        match rule.kind {
            LifecycleEvent::Birthday => {
                let dob = profile.date_of_birth.ok_or_else(|| {
                    PerksError::InvalidEventContext("customer has no date of birth".into())
                })?;
                Ok(MonthDay::of(dob).matches(today))
            }
            LifecycleEvent::NewUser => {
                let Some(window) = rule.new_user_days else {
                    warn!(rule_id = %rule.id, "NewUser rule has no new_user_days");
                    return Ok(false);
                };
                let age_days = (now - profile.registered_at).num_days();
                Ok(age_days >= 0 && age_days <= i64::from(window))
            }
            LifecycleEvent::Inactive => {
                let Some(threshold) = rule.inactive_days else {
                    warn!(rule_id = %rule.id, "Inactive rule has no inactive_days");
                    return Ok(false);
                };
                let idle_days = match ctx.days_inactive {
                    Some(days) => i64::from(days),
                    None => {
                        let last = profile.last_order_at.ok_or_else(|| {
                            PerksError::InvalidEventContext(
                                "customer has no last order on record".into(),
                            )
                        })?;
                        (now - last).num_days()
                    }
                };
                Ok(idle_days >= i64::from(threshold))
            }
            LifecycleEvent::VipTier => {
                let Some(target) = rule.target_tier_id else {
                    warn!(rule_id = %rule.id, "VipTier rule has no target_tier_id");
                    return Ok(false);
                };
                let tier = profile.tier_id.ok_or_else(|| {
                    PerksError::InvalidEventContext("customer has no tier".into())
                })?;
                Ok(tier == target)
            }
            // The trigger fires exactly when the first order completes;
            // single-shot dedup does the rest.
            LifecycleEvent::FirstOrder => Ok(true),
            LifecycleEvent::Holiday => {
                let Some(holiday) = rule.holiday_date else {
                    warn!(rule_id = %rule.id, "Holiday rule has no holiday_date");
                    return Ok(false);
                };
                Ok(holiday.matches(today))
            }
        }
    }

    /// FirstOrder and NewUser are single-shot for life; other kinds dedup
    /// per calendar year when the rule asks for it. State derives from the
    /// coupons actually issued under this rule.
    fn already_granted(&self, customer_id: &Uuid, rule: &EventRule, now: DateTime<Utc>) -> bool {
        match rule.kind {
            LifecycleEvent::FirstOrder | LifecycleEvent::NewUser => {
                self.ledger.has_rule_grant(customer_id, &rule.id)
            }
            _ if rule.once_per_year => {
                self.ledger
                    .has_rule_grant_in_year(customer_id, &rule.id, now.year())
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};
    use perks_catalog::NewEventRule;
    use perks_core::config::CouponConfig;
    use perks_core::types::DiscountTerms;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        // 2026-03-08, a Sunday.
        Utc.with_ymd_and_hms(2026, 3, 8, 9, 0, 0).unwrap()
    }

    struct Fixture {
        engine: Arc<EventEngine>,
        catalog: Arc<CatalogStore>,
        customers: Arc<CustomerDirectory>,
        ledger: Arc<CouponLedger>,
    }

    fn fixture() -> Fixture {
        let catalog = Arc::new(CatalogStore::new());
        let ledger = Arc::new(CouponLedger::new(CouponConfig::default()));
        let customers = Arc::new(CustomerDirectory::new());
        let engine = Arc::new(EventEngine::new(
            Arc::clone(&catalog),
            Arc::clone(&ledger),
            Arc::clone(&customers),
        ));
        Fixture {
            engine,
            catalog,
            customers,
            ledger,
        }
    }

    fn add_customer(fx: &Fixture) -> Uuid {
        let profile = CustomerProfile::new(Uuid::new_v4(), now() - Duration::days(365));
        let id = profile.id;
        fx.customers.upsert(profile);
        id
    }

    fn set_dob(fx: &Fixture, customer: Uuid, dob: NaiveDate) {
        let mut profile = fx.customers.get(&customer).unwrap();
        profile.date_of_birth = Some(dob);
        fx.customers.upsert(profile);
    }

    fn birthday_rule(fx: &Fixture, once_per_year: bool) -> EventRule {
        fx.catalog.create_rule(
            NewEventRule {
                name: "Birthday 10%".into(),
                discount: DiscountTerms::percent(dec!(10)),
                once_per_year,
                ..Default::default()
            },
            now(),
        )
    }

    #[test]
    fn test_birthday_grants_once_per_year() {
        let fx = fixture();
        birthday_rule(&fx, true);
        let customer = add_customer(&fx);
        set_dob(&fx, customer, NaiveDate::from_ymd_opt(1994, 3, 8).unwrap());

        let first = fx
            .engine
            .evaluate(customer, LifecycleEvent::Birthday, &EventContext::default(), now())
            .unwrap();
        assert_eq!(first.len(), 1);

        // Same-day re-evaluation is blocked by the per-year dedup.
        let second = fx
            .engine
            .evaluate(customer, LifecycleEvent::Birthday, &EventContext::default(), now())
            .unwrap();
        assert!(second.is_empty());

        // Next year's birthday grants again.
        let next_year = Utc.with_ymd_and_hms(2027, 3, 8, 9, 0, 0).unwrap();
        let third = fx
            .engine
            .evaluate(customer, LifecycleEvent::Birthday, &EventContext::default(), next_year)
            .unwrap();
        assert_eq!(third.len(), 1);
    }

    #[test]
    fn test_birthday_wrong_day_no_grant() {
        let fx = fixture();
        birthday_rule(&fx, true);
        let customer = add_customer(&fx);
        set_dob(&fx, customer, NaiveDate::from_ymd_opt(1994, 7, 1).unwrap());

        let issued = fx
            .engine
            .evaluate(customer, LifecycleEvent::Birthday, &EventContext::default(), now())
            .unwrap();
        assert!(issued.is_empty());
    }

    #[test]
    fn test_birthday_without_dob_is_invalid_context() {
        let fx = fixture();
        birthday_rule(&fx, true);
        let customer = add_customer(&fx);

        assert!(matches!(
            fx.engine
                .evaluate(customer, LifecycleEvent::Birthday, &EventContext::default(), now()),
            Err(PerksError::InvalidEventContext(_))
        ));
    }

    #[test]
    fn test_holiday_matches_month_day_only() {
        let fx = fixture();
        fx.catalog.create_rule(
            NewEventRule {
                name: "Women's Day".into(),
                kind: LifecycleEvent::Holiday,
                holiday_date: MonthDay::new(3, 8),
                discount: DiscountTerms::fixed(dec!(20000)),
                ..Default::default()
            },
            now(),
        );
        let customer = add_customer(&fx);

        let on_day = fx
            .engine
            .evaluate(customer, LifecycleEvent::Holiday, &EventContext::default(), now())
            .unwrap();
        assert_eq!(on_day.len(), 1);

        let off_day = Utc.with_ymd_and_hms(2026, 3, 9, 9, 0, 0).unwrap();
        let issued = fx
            .engine
            .evaluate(customer, LifecycleEvent::Holiday, &EventContext::default(), off_day)
            .unwrap();
        assert!(issued.is_empty());
    }

    #[test]
    fn test_new_user_window_and_single_shot() {
        let fx = fixture();
        fx.catalog.create_rule(
            NewEventRule {
                name: "Welcome voucher".into(),
                kind: LifecycleEvent::NewUser,
                new_user_days: Some(7),
                once_per_year: false,
                discount: DiscountTerms::fixed(dec!(10000)),
                ..Default::default()
            },
            now(),
        );

        let fresh = CustomerProfile::new(Uuid::new_v4(), now() - Duration::days(3));
        let fresh_id = fresh.id;
        fx.customers.upsert(fresh);

        let stale = CustomerProfile::new(Uuid::new_v4(), now() - Duration::days(30));
        let stale_id = stale.id;
        fx.customers.upsert(stale);

        let issued = fx
            .engine
            .evaluate(fresh_id, LifecycleEvent::NewUser, &EventContext::default(), now())
            .unwrap();
        assert_eq!(issued.len(), 1);

        // Single-shot regardless of the once_per_year flag.
        let again = fx
            .engine
            .evaluate(fresh_id, LifecycleEvent::NewUser, &EventContext::default(), now())
            .unwrap();
        assert!(again.is_empty());

        let outside = fx
            .engine
            .evaluate(stale_id, LifecycleEvent::NewUser, &EventContext::default(), now())
            .unwrap();
        assert!(outside.is_empty());
    }

    #[test]
    fn test_inactive_threshold_with_override_and_profile() {
        let fx = fixture();
        fx.catalog.create_rule(
            NewEventRule {
                name: "We miss you".into(),
                kind: LifecycleEvent::Inactive,
                inactive_days: Some(60),
                once_per_year: false,
                discount: DiscountTerms::percent(dec!(15)),
                ..Default::default()
            },
            now(),
        );
        let customer = add_customer(&fx);

        // Context override says long idle.
        let ctx = EventContext {
            days_inactive: Some(90),
            ..Default::default()
        };
        let issued = fx
            .engine
            .evaluate(customer, LifecycleEvent::Inactive, &ctx, now())
            .unwrap();
        assert_eq!(issued.len(), 1);

        // Profile-derived idle time below the threshold does not match.
        let active_buyer = add_customer(&fx);
        fx.customers
            .record_order(&active_buyer, now() - Duration::days(10))
            .unwrap();
        let issued = fx
            .engine
            .evaluate(
                active_buyer,
                LifecycleEvent::Inactive,
                &EventContext::default(),
                now(),
            )
            .unwrap();
        assert!(issued.is_empty());

        // No override and no order history is an invalid context.
        let ghost = add_customer(&fx);
        assert!(matches!(
            fx.engine
                .evaluate(ghost, LifecycleEvent::Inactive, &EventContext::default(), now()),
            Err(PerksError::InvalidEventContext(_))
        ));
    }

    #[test]
    fn test_vip_tier_target_and_eligibility_filter() {
        let fx = fixture();
        let gold = Uuid::new_v4();
        let platinum = Uuid::new_v4();
        fx.catalog.create_rule(
            NewEventRule {
                name: "Gold promotion gift".into(),
                kind: LifecycleEvent::VipTier,
                target_tier_id: Some(gold),
                once_per_year: false,
                discount: DiscountTerms::percent(dec!(20)),
                ..Default::default()
            },
            now(),
        );

        let promoted = add_customer(&fx);
        fx.customers.set_tier(&promoted, Some(gold), now()).unwrap();
        let issued = fx
            .engine
            .evaluate(promoted, LifecycleEvent::VipTier, &EventContext::default(), now())
            .unwrap();
        assert_eq!(issued.len(), 1);

        // A customer promoted into a different tier does not match.
        let other = add_customer(&fx);
        fx.customers
            .set_tier(&other, Some(platinum), now())
            .unwrap();
        let issued = fx
            .engine
            .evaluate(other, LifecycleEvent::VipTier, &EventContext::default(), now())
            .unwrap();
        assert!(issued.is_empty());
    }

    #[test]
    fn test_tier_filter_excludes_customer() {
        let fx = fixture();
        let silver = Uuid::new_v4();
        fx.catalog.create_rule(
            NewEventRule {
                name: "Silver birthday".into(),
                eligible_tier_ids: vec![silver],
                discount: DiscountTerms::percent(dec!(10)),
                ..Default::default()
            },
            now(),
        );
        let customer = add_customer(&fx);
        set_dob(&fx, customer, NaiveDate::from_ymd_opt(1994, 3, 8).unwrap());

        // No tier: the filter excludes the customer before predicates run.
        let issued = fx
            .engine
            .evaluate(customer, LifecycleEvent::Birthday, &EventContext::default(), now())
            .unwrap();
        assert!(issued.is_empty());

        fx.customers.set_tier(&customer, Some(silver), now()).unwrap();
        let issued = fx
            .engine
            .evaluate(customer, LifecycleEvent::Birthday, &EventContext::default(), now())
            .unwrap();
        assert_eq!(issued.len(), 1);
    }

    #[test]
    fn test_first_order_single_shot() {
        let fx = fixture();
        fx.catalog.create_rule(
            NewEventRule {
                name: "First order thanks".into(),
                kind: LifecycleEvent::FirstOrder,
                once_per_year: false,
                discount: DiscountTerms::fixed(dec!(5000)),
                ..Default::default()
            },
            now(),
        );
        let customer = add_customer(&fx);
        let ctx = EventContext {
            order_id: Some(Uuid::new_v4()),
            ..Default::default()
        };

        let issued = fx
            .engine
            .evaluate(customer, LifecycleEvent::FirstOrder, &ctx, now())
            .unwrap();
        assert_eq!(issued.len(), 1);

        let again = fx
            .engine
            .evaluate(customer, LifecycleEvent::FirstOrder, &ctx, now())
            .unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn test_concurrent_evaluation_grants_once() {
        let fx = fixture();
        birthday_rule(&fx, true);
        let customer = add_customer(&fx);
        set_dob(&fx, customer, NaiveDate::from_ymd_opt(1994, 3, 8).unwrap());

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let engine = Arc::clone(&fx.engine);
                std::thread::spawn(move || {
                    engine
                        .evaluate(customer, LifecycleEvent::Birthday, &EventContext::default(), now())
                        .unwrap()
                        .len()
                })
            })
            .collect();
        let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(granted, 1);
        assert_eq!(fx.ledger.coupons_for_customer(&customer, now()).len(), 1);
    }

    #[test]
    fn test_no_rules_is_side_effect_free() {
        let fx = fixture();
        let customer = add_customer(&fx);
        let issued = fx
            .engine
            .evaluate(customer, LifecycleEvent::Holiday, &EventContext::default(), now())
            .unwrap();
        assert!(issued.is_empty());
        assert!(fx.ledger.coupons_for_customer(&customer, now()).is_empty());
    }
}
