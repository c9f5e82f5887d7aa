//! Spin orchestration: eligibility, the draw, history append, and coupon
//! issuance. The daily-limit check and everything that follows it run under
//! one per-`(customer, program, day)` critical section so two concurrent
//! requests can never both pass the cap.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use perks_catalog::{CatalogStore, Program, RewardSlot};
use perks_core::config::SpinConfig;
use perks_core::customers::{CustomerDirectory, TierCatalog};
use perks_core::error::{PerksError, PerksResult};
use perks_coupons::{Coupon, CouponLedger, CouponOrigin};

use crate::history::{SpinHistoryStore, SpinKind, SpinRecord};
use crate::selector::select_reward;

/// Counters a client renders next to the wheel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinStatus {
    pub remaining_free_spins: u32,
    pub spins_today: u32,
    pub customer_points: u64,
    pub points_per_spin: u64,
}

/// Result of one spin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinOutcome {
    pub slot: RewardSlot,
    /// Index of the winning slot in the displayed wheel order.
    pub slot_index: usize,
    /// `None` when the slot was a losing one.
    pub coupon: Option<Coupon>,
    pub status: SpinStatus,
}

type DayKey = (Uuid, Uuid, NaiveDate);

/// The Lucky Spin engine.
pub struct SpinEngine {
    catalog: Arc<CatalogStore>,
    ledger: Arc<CouponLedger>,
    customers: Arc<CustomerDirectory>,
    tiers: Arc<TierCatalog>,
    history: SpinHistoryStore,
    config: SpinConfig,
    day_locks: DashMap<DayKey, Arc<Mutex<()>>>,
}

impl SpinEngine {
    pub fn new(
        catalog: Arc<CatalogStore>,
        ledger: Arc<CouponLedger>,
        customers: Arc<CustomerDirectory>,
        tiers: Arc<TierCatalog>,
        config: SpinConfig,
    ) -> Self {
        Self {
            catalog,
            ledger,
            customers,
            tiers,
            history: SpinHistoryStore::new(),
            config,
            day_locks: DashMap::new(),
        }
    }

    /// The live program and its wheel, for rendering. `NoActiveProgram` is
    /// the caller's "no program" state, not a failure.
    pub fn current_program_and_rewards(
        &self,
        now: DateTime<Utc>,
    ) -> PerksResult<(Program, Vec<RewardSlot>)> {
        let program = self
            .catalog
            .current_program(now)
            .ok_or(PerksError::NoActiveProgram)?;
        let slots = self.catalog.active_slots(&program.id);
        Ok((program, slots))
    }

    pub fn spin_status(&self, customer_id: &Uuid, now: DateTime<Utc>) -> PerksResult<SpinStatus> {
        let program = self
            .catalog
            .current_program(now)
            .ok_or(PerksError::NoActiveProgram)?;
        self.status_with(&program, customer_id, now)
    }

    /// Perform one spin. Eligibility, payment, the draw, the history append,
    /// and coupon issuance happen under the `(customer, program, day)` lock.
    pub fn spin(
        &self,
        customer_id: Uuid,
        kind: SpinKind,
        now: DateTime<Utc>,
    ) -> PerksResult<SpinOutcome> {
        let program = self
            .catalog
            .current_program(now)
            .ok_or(PerksError::NoActiveProgram)?;
        let slots = self.catalog.active_slots(&program.id);
        if slots.is_empty() {
            return Err(PerksError::NoRewardsConfigured);
        }
        let profile = self.customers.get(&customer_id)?;
        let tier = self.tiers.level(profile.tier_id.as_ref());
        let day = now.date_naive();

        let lock = self
            .day_locks
            .entry((customer_id, program.id, day))
            .or_default()
            .clone();
        let _guard = lock.lock();

        let points_spent = match kind {
            SpinKind::Free => {
                let used = self.history.count_on_day(
                    &customer_id,
                    &program.id,
                    day,
                    Some(SpinKind::Free),
                );
                if used >= program.daily_free_spins {
                    return Err(PerksError::DailyLimitExceeded);
                }
                0
            }
            // Point spins are not capped by the free allowance; the
            // exchange exists to buy spins past it.
            SpinKind::PointsExchange => {
                self.customers
                    .try_spend_points(&customer_id, program.points_per_spin, now)?;
                program.points_per_spin
            }
        };

        let selection = select_reward(&slots, tier, &mut rand::thread_rng())?;
        let coupon = selection.slot.discount_terms().map(|terms| {
            self.ledger.issue(
                customer_id,
                CouponOrigin::Spin {
                    program_id: program.id,
                    slot_id: selection.slot.id,
                },
                terms,
                selection.slot.validity_days,
                now,
            )
        });

        self.history.append(SpinRecord {
            id: Uuid::new_v4(),
            customer_id,
            program_id: program.id,
            slot_id: selection.slot.id,
            coupon_id: coupon.as_ref().map(|c| c.id),
            kind,
            points_spent,
            spun_on: day,
            created_at: now,
        });
        metrics::counter!("spins.performed").increment(1);

        debug!(
            customer_id = %customer_id,
            program_id = %program.id,
            slot = %selection.slot.label,
            kind = ?kind,
            won_coupon = coupon.is_some(),
            "Spin resolved"
        );

        let status = self.status_with(&program, &customer_id, now)?;
        Ok(SpinOutcome {
            slot: selection.slot,
            slot_index: selection.index,
            coupon,
            status,
        })
    }

    /// A customer's recent spins, newest first.
    pub fn spin_history_for_customer(&self, customer_id: &Uuid) -> Vec<SpinRecord> {
        self.history
            .for_customer(customer_id, self.config.history_page_size)
    }

    fn status_with(
        &self,
        program: &Program,
        customer_id: &Uuid,
        now: DateTime<Utc>,
    ) -> PerksResult<SpinStatus> {
        let profile = self.customers.get(customer_id)?;
        let day = now.date_naive();
        let free_used =
            self.history
                .count_on_day(customer_id, &program.id, day, Some(SpinKind::Free));
        let spins_today = self.history.count_on_day(customer_id, &program.id, day, None);
        Ok(SpinStatus {
            remaining_free_spins: program.daily_free_spins.saturating_sub(free_used),
            spins_today,
            customer_points: profile.points,
            points_per_spin: program.points_per_spin,
        })
    }
}
