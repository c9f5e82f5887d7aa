//! Read-mostly catalog store for programs, reward slots, and event rules.
//! Backed by DashMap for development; the authorization-critical paths
//! (spin counts, coupon status) never read from here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use perks_core::error::{PerksError, PerksResult};
use perks_core::types::{DiscountTerms, LifecycleEvent, MonthDay};

use crate::types::{EventRule, Program, RewardKind, RewardSlot};

// ---------------------------------------------------------------------------
// Creation payloads
// ---------------------------------------------------------------------------

/// Parameters for creating a program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProgram {
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub daily_free_spins: u32,
    pub points_per_spin: u64,
}

/// Parameters for creating a reward slot under a program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRewardSlot {
    pub kind: RewardKind,
    pub value: Decimal,
    pub max_discount: Option<Decimal>,
    pub min_order_amount: Option<Decimal>,
    pub validity_days: u32,
    pub base_probability: f64,
    pub silver_multiplier: f64,
    pub gold_multiplier: f64,
    pub platinum_multiplier: f64,
    pub label: String,
    pub icon: Option<String>,
    pub sort_order: i32,
}

impl Default for NewRewardSlot {
    fn default() -> Self {
        Self {
            kind: RewardKind::NoReward,
            value: Decimal::ZERO,
            max_discount: None,
            min_order_amount: None,
            validity_days: 7,
            base_probability: 0.0,
            silver_multiplier: 1.0,
            gold_multiplier: 1.0,
            platinum_multiplier: 1.0,
            label: String::new(),
            icon: None,
            sort_order: 0,
        }
    }
}

/// Parameters for creating an event rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEventRule {
    pub name: String,
    pub kind: LifecycleEvent,
    pub discount: DiscountTerms,
    pub validity_days: u32,
    pub inactive_days: Option<u32>,
    pub new_user_days: Option<u32>,
    pub holiday_date: Option<MonthDay>,
    pub target_tier_id: Option<Uuid>,
    pub eligible_tier_ids: Vec<Uuid>,
    pub once_per_year: bool,
}

impl Default for NewEventRule {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: LifecycleEvent::Birthday,
            discount: DiscountTerms::percent(Decimal::ZERO),
            validity_days: 14,
            inactive_days: None,
            new_user_days: None,
            holiday_date: None,
            target_tier_id: None,
            eligible_tier_ids: Vec::new(),
            once_per_year: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// In-memory catalog store backed by `DashMap`.
pub struct CatalogStore {
    programs: Arc<DashMap<Uuid, Program>>,
    slots: Arc<DashMap<Uuid, RewardSlot>>,
    rules: Arc<DashMap<Uuid, EventRule>>,
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogStore {
    pub fn new() -> Self {
        info!("CatalogStore initialized");
        Self {
            programs: Arc::new(DashMap::new()),
            slots: Arc::new(DashMap::new()),
            rules: Arc::new(DashMap::new()),
        }
    }

    // ─── Programs ───────────────────────────────────────────────────────────

    pub fn create_program(&self, params: NewProgram, now: DateTime<Utc>) -> Program {
        let program = Program {
            id: Uuid::new_v4(),
            name: params.name,
            starts_at: params.starts_at,
            ends_at: params.ends_at,
            daily_free_spins: params.daily_free_spins,
            points_per_spin: params.points_per_spin,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        info!(program_id = %program.id, name = %program.name, "Program created");
        self.programs.insert(program.id, program.clone());
        program
    }

    pub fn program(&self, id: &Uuid) -> Option<Program> {
        self.programs.get(id).map(|p| p.clone())
    }

    pub fn set_program_active(
        &self,
        id: &Uuid,
        active: bool,
        now: DateTime<Utc>,
    ) -> Option<Program> {
        let mut entry = self.programs.get_mut(id)?;
        entry.is_active = active;
        entry.updated_at = now;
        Some(entry.clone())
    }

    /// Delete a program and every slot it owns.
    pub fn delete_program(&self, id: &Uuid) -> bool {
        let removed = self.programs.remove(id).is_some();
        if removed {
            self.slots.retain(|_, slot| slot.program_id != *id);
            info!(program_id = %id, "Program and its slots deleted");
        }
        removed
    }

    /// The program live at `now`. Storage does not enforce uniqueness; with
    /// several candidates the earliest-starting (then lowest-id) one wins so
    /// repeated lookups agree.
    pub fn current_program(&self, now: DateTime<Utc>) -> Option<Program> {
        self.programs
            .iter()
            .filter(|p| p.is_current(now))
            .map(|p| p.clone())
            .min_by_key(|p| (p.starts_at, p.id))
    }

    // ─── Reward slots ───────────────────────────────────────────────────────

    /// Add a slot to an existing program. Returns `None` if the program is
    /// unknown.
    pub fn create_slot(
        &self,
        program_id: &Uuid,
        params: NewRewardSlot,
        now: DateTime<Utc>,
    ) -> Option<RewardSlot> {
        if !self.programs.contains_key(program_id) {
            return None;
        }
        let slot = RewardSlot {
            id: Uuid::new_v4(),
            program_id: *program_id,
            kind: params.kind,
            value: params.value,
            max_discount: params.max_discount,
            min_order_amount: params.min_order_amount,
            validity_days: params.validity_days,
            base_probability: params.base_probability,
            silver_multiplier: params.silver_multiplier,
            gold_multiplier: params.gold_multiplier,
            platinum_multiplier: params.platinum_multiplier,
            label: params.label,
            icon: params.icon,
            is_active: true,
            sort_order: params.sort_order,
            created_at: now,
            updated_at: now,
        };
        self.slots.insert(slot.id, slot.clone());
        Some(slot)
    }

    pub fn slot(&self, id: &Uuid) -> Option<RewardSlot> {
        self.slots.get(id).map(|s| s.clone())
    }

    pub fn set_slot_active(&self, id: &Uuid, active: bool, now: DateTime<Utc>) -> Option<RewardSlot> {
        let mut entry = self.slots.get_mut(id)?;
        entry.is_active = active;
        entry.updated_at = now;
        Some(entry.clone())
    }

    /// Active slots of a program in wheel display order: `sort_order`, then
    /// id to break ties deterministically.
    pub fn active_slots(&self, program_id: &Uuid) -> Vec<RewardSlot> {
        let mut slots: Vec<RewardSlot> = self
            .slots
            .iter()
            .filter(|s| s.program_id == *program_id && s.is_active)
            .map(|s| s.clone())
            .collect();
        slots.sort_by_key(|s| (s.sort_order, s.id));
        slots
    }

    // ─── Event rules ────────────────────────────────────────────────────────

    pub fn create_rule(&self, params: NewEventRule, now: DateTime<Utc>) -> EventRule {
        let rule = EventRule {
            id: Uuid::new_v4(),
            name: params.name,
            kind: params.kind,
            discount: params.discount,
            validity_days: params.validity_days,
            inactive_days: params.inactive_days,
            new_user_days: params.new_user_days,
            holiday_date: params.holiday_date,
            target_tier_id: params.target_tier_id,
            eligible_tier_ids: params.eligible_tier_ids,
            once_per_year: params.once_per_year,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        info!(rule_id = %rule.id, kind = ?rule.kind, name = %rule.name, "Event rule created");
        self.rules.insert(rule.id, rule.clone());
        rule
    }

    pub fn rule(&self, id: &Uuid) -> PerksResult<EventRule> {
        self.rules
            .get(id)
            .map(|r| r.clone())
            .ok_or(PerksError::RuleNotFound)
    }

    pub fn set_rule_active(&self, id: &Uuid, active: bool, now: DateTime<Utc>) -> Option<EventRule> {
        let mut entry = self.rules.get_mut(id)?;
        entry.is_active = active;
        entry.updated_at = now;
        Some(entry.clone())
    }

    pub fn delete_rule(&self, id: &Uuid) -> bool {
        self.rules.remove(id).is_some()
    }

    pub fn active_rules(&self, kind: LifecycleEvent) -> Vec<EventRule> {
        let mut rules: Vec<EventRule> = self
            .rules
            .iter()
            .filter(|r| r.kind == kind && r.is_active)
            .map(|r| r.clone())
            .collect();
        rules.sort_by_key(|r| (r.created_at, r.id));
        rules
    }
}
