//! Weighted reward selection — pure categorical sampling over a program's
//! active slots, adjusted by the customer's tier. Free of persistence and
//! clock access so a seeded generator reproduces draws exactly.

use rand::Rng;

use perks_catalog::RewardSlot;
use perks_core::error::{PerksError, PerksResult};
use perks_core::types::TierLevel;

/// The winning slot and its index within the wheel's display order. The
/// index drives the client's wheel animation.
#[derive(Debug, Clone)]
pub struct Selection {
    pub slot: RewardSlot,
    pub index: usize,
}

/// Pick one slot by tier-weighted categorical sampling.
///
/// `slots` must already be in display order (`sort_order`, then id); the
/// fixed walk order is what lets two engines draw identically from the same
/// seed. Each slot weighs `base_probability * tier_multiplier(tier)`; the
/// draw normalizes by the weight sum, so base probabilities need not sum
/// to 1. A zero (or non-finite) weight sum falls back to uniform selection
/// rather than failing the spin.
pub fn select_reward(
    slots: &[RewardSlot],
    tier: TierLevel,
    rng: &mut impl Rng,
) -> PerksResult<Selection> {
    if slots.is_empty() {
        return Err(PerksError::NoRewardsConfigured);
    }

    let weights: Vec<f64> = slots
        .iter()
        .map(|slot| slot.base_probability * slot.tier_multiplier(tier))
        .collect();
    let total: f64 = weights.iter().sum();

    let index = if total <= 0.0 || !total.is_finite() {
        rng.gen_range(0..slots.len())
    } else {
        let roll = rng.gen_range(0.0..total);
        let mut acc = 0.0;
        // Rounding can leave roll >= acc after the final slot; it wins then.
        let mut chosen = slots.len() - 1;
        for (i, weight) in weights.iter().enumerate() {
            acc += weight;
            if roll < acc {
                chosen = i;
                break;
            }
        }
        chosen
    };

    Ok(Selection {
        slot: slots[index].clone(),
        index,
    })
}
