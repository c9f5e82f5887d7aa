//! Append-only spin history. Daily spin counts are always derived from
//! these rows, never from a separate counter.

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a spin was paid for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SpinKind {
    Free,
    PointsExchange,
}

/// One spin attempt. Rows are append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinRecord {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub program_id: Uuid,
    pub slot_id: Uuid,
    /// `None` when the slot was a losing one.
    pub coupon_id: Option<Uuid>,
    pub kind: SpinKind,
    pub points_spent: u64,
    /// Calendar day the spin counts against.
    pub spun_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// In-memory append-only spin ledger.
pub struct SpinHistoryStore {
    records: RwLock<Vec<SpinRecord>>,
}

impl Default for SpinHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SpinHistoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn append(&self, record: SpinRecord) {
        self.records.write().push(record);
    }

    /// Spins a customer made against a program on `day`, optionally
    /// restricted to one spin kind.
    pub fn count_on_day(
        &self,
        customer_id: &Uuid,
        program_id: &Uuid,
        day: NaiveDate,
        kind: Option<SpinKind>,
    ) -> u32 {
        self.records
            .read()
            .iter()
            .filter(|r| {
                r.customer_id == *customer_id
                    && r.program_id == *program_id
                    && r.spun_on == day
                    && kind.map_or(true, |k| r.kind == k)
            })
            .count() as u32
    }

    /// A customer's spins, newest first, capped at `limit`.
    pub fn for_customer(&self, customer_id: &Uuid, limit: usize) -> Vec<SpinRecord> {
        let records = self.records.read();
        let mut mine: Vec<SpinRecord> = records
            .iter()
            .filter(|r| r.customer_id == *customer_id)
            .cloned()
            .collect();
        mine.reverse();
        mine.truncate(limit);
        mine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(customer: Uuid, program: Uuid, day: NaiveDate, kind: SpinKind) -> SpinRecord {
        SpinRecord {
            id: Uuid::new_v4(),
            customer_id: customer,
            program_id: program,
            slot_id: Uuid::new_v4(),
            coupon_id: None,
            kind,
            points_spent: 0,
            spun_on: day,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_count_filters_day_and_kind() {
        let store = SpinHistoryStore::new();
        let customer = Uuid::new_v4();
        let program = Uuid::new_v4();
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2026, 5, 31).unwrap();

        store.append(record(customer, program, today, SpinKind::Free));
        store.append(record(customer, program, today, SpinKind::Free));
        store.append(record(customer, program, today, SpinKind::PointsExchange));
        store.append(record(customer, program, yesterday, SpinKind::Free));
        store.append(record(Uuid::new_v4(), program, today, SpinKind::Free));

        assert_eq!(
            store.count_on_day(&customer, &program, today, Some(SpinKind::Free)),
            2
        );
        assert_eq!(store.count_on_day(&customer, &program, today, None), 3);
        assert_eq!(
            store.count_on_day(&customer, &program, yesterday, Some(SpinKind::Free)),
            1
        );
    }

    #[test]
    fn test_for_customer_newest_first_with_limit() {
        let store = SpinHistoryStore::new();
        let customer = Uuid::new_v4();
        let program = Uuid::new_v4();
        let day = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();

        let first = record(customer, program, day, SpinKind::Free);
        let second = record(customer, program, day, SpinKind::Free);
        let third = record(customer, program, day, SpinKind::PointsExchange);
        store.append(first.clone());
        store.append(second.clone());
        store.append(third.clone());

        let listed = store.for_customer(&customer, 2);
        assert_eq!(
            listed.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![third.id, second.id]
        );
    }
}
