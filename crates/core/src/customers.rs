//! Customer directory — the collaborator surface the reward engines read
//! profiles from and deduct points against. Backed by DashMap for
//! development; swap for the platform's customer service in production.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{PerksError, PerksResult};
use crate::types::TierLevel;

/// Customer attributes the reward engines consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub id: Uuid,
    pub tier_id: Option<Uuid>,
    pub points: u64,
    pub date_of_birth: Option<NaiveDate>,
    pub registered_at: DateTime<Utc>,
    pub last_order_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomerProfile {
    pub fn new(id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id,
            tier_id: None,
            points: 0,
            date_of_birth: None,
            registered_at: now,
            last_order_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Tier id → display name mapping, consumed for probability-multiplier
/// lookup and rule eligibility filters.
#[derive(Debug, Default)]
pub struct TierCatalog {
    names: DashMap<Uuid, String>,
}

impl TierCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: Uuid, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    pub fn name(&self, id: &Uuid) -> Option<String> {
        self.names.get(id).map(|n| n.clone())
    }

    /// Resolve a customer's tier id to a wheel tier level. Missing or
    /// unknown tiers behave as Bronze.
    pub fn level(&self, tier_id: Option<&Uuid>) -> TierLevel {
        tier_id
            .and_then(|id| self.names.get(id))
            .map(|n| TierLevel::from_name(&n))
            .unwrap_or_default()
    }
}

/// In-memory customer store with atomic point accounting.
pub struct CustomerDirectory {
    customers: Arc<DashMap<Uuid, CustomerProfile>>,
}

impl Default for CustomerDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomerDirectory {
    pub fn new() -> Self {
        Self {
            customers: Arc::new(DashMap::new()),
        }
    }

    pub fn upsert(&self, profile: CustomerProfile) {
        self.customers.insert(profile.id, profile);
    }

    pub fn get(&self, id: &Uuid) -> PerksResult<CustomerProfile> {
        self.customers
            .get(id)
            .map(|c| c.clone())
            .ok_or(PerksError::CustomerNotFound)
    }

    /// Deduct `amount` points if the balance covers it. The check and the
    /// decrement run under the entry's write guard, so concurrent spenders
    /// cannot overdraw the balance. Returns the new balance.
    pub fn try_spend_points(
        &self,
        id: &Uuid,
        amount: u64,
        now: DateTime<Utc>,
    ) -> PerksResult<u64> {
        let mut entry = self.customers.get_mut(id).ok_or(PerksError::CustomerNotFound)?;
        if entry.points < amount {
            return Err(PerksError::InsufficientPoints {
                needed: amount,
                available: entry.points,
            });
        }
        entry.points -= amount;
        entry.updated_at = now;
        debug!(customer_id = %id, spent = amount, balance = entry.points, "Points deducted");
        Ok(entry.points)
    }

    pub fn add_points(&self, id: &Uuid, amount: u64, now: DateTime<Utc>) -> PerksResult<u64> {
        let mut entry = self.customers.get_mut(id).ok_or(PerksError::CustomerNotFound)?;
        entry.points += amount;
        entry.updated_at = now;
        Ok(entry.points)
    }

    pub fn set_tier(&self, id: &Uuid, tier_id: Option<Uuid>, now: DateTime<Utc>) -> PerksResult<()> {
        let mut entry = self.customers.get_mut(id).ok_or(PerksError::CustomerNotFound)?;
        entry.tier_id = tier_id;
        entry.updated_at = now;
        Ok(())
    }

    /// Stamp the customer's latest completed order, the data source for
    /// inactivity evaluation.
    pub fn record_order(&self, id: &Uuid, now: DateTime<Utc>) -> PerksResult<()> {
        let mut entry = self.customers.get_mut(id).ok_or(PerksError::CustomerNotFound)?;
        entry.last_order_at = Some(now);
        entry.updated_at = now;
        Ok(())
    }
}
