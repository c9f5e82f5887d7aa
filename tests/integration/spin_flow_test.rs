//! Integration test for the full spin → coupon → checkout flow.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use perks_catalog::{CatalogStore, NewProgram, NewRewardSlot, RewardKind};
    use perks_core::config::{CouponConfig, SpinConfig};
    use perks_core::customers::{CustomerDirectory, CustomerProfile, TierCatalog};
    use perks_core::error::PerksError;
    use perks_coupons::CouponLedger;
    use perks_spin::{SpinEngine, SpinKind};

    #[test]
    fn test_spin_to_checkout_flow() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();

        let catalog = Arc::new(CatalogStore::new());
        let ledger = Arc::new(CouponLedger::new(CouponConfig::default()));
        let customers = Arc::new(CustomerDirectory::new());
        let tiers = Arc::new(TierCatalog::new());

        let program = catalog.create_program(
            NewProgram {
                name: "Summer wheel".to_string(),
                starts_at: now - Duration::days(1),
                ends_at: now + Duration::days(30),
                daily_free_spins: 1,
                points_per_spin: 100,
            },
            now,
        );
        catalog
            .create_slot(
                &program.id,
                NewRewardSlot {
                    kind: RewardKind::Percent,
                    value: dec!(10),
                    max_discount: Some(dec!(20000)),
                    validity_days: 7,
                    base_probability: 1.0,
                    label: "10% off".to_string(),
                    ..Default::default()
                },
                now,
            )
            .unwrap();

        let customer = CustomerProfile::new(Uuid::new_v4(), now - Duration::days(90));
        let customer_id = customer.id;
        customers.upsert(customer);

        let engine = SpinEngine::new(
            Arc::clone(&catalog),
            Arc::clone(&ledger),
            Arc::clone(&customers),
            tiers,
            SpinConfig::default(),
        );

        // Spin wins the only slot and issues a coupon.
        let outcome = engine.spin(customer_id, SpinKind::Free, now).unwrap();
        let coupon = outcome.coupon.expect("the single slot always wins");
        assert_eq!(outcome.status.remaining_free_spins, 0);

        // The free allowance is spent for the day.
        assert!(matches!(
            engine.spin(customer_id, SpinKind::Free, now),
            Err(PerksError::DailyLimitExceeded)
        ));

        // Checkout quotes the capped percentage discount.
        let quote = ledger.validate(&coupon.code, dec!(500000), now).unwrap();
        assert_eq!(quote.discount, dec!(20000));

        // Redemption is single-use.
        let order_id = Uuid::new_v4();
        ledger.redeem(&coupon.code, order_id, now).unwrap();
        assert!(matches!(
            ledger.redeem(&coupon.code, Uuid::new_v4(), now),
            Err(PerksError::CouponAlreadyUsed)
        ));
        assert!(matches!(
            ledger.validate(&coupon.code, dec!(500000), now),
            Err(PerksError::CouponAlreadyUsed)
        ));
    }
}
