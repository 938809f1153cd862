//! Lazy reward accrual ("reward per share" checkpoints).
//!
//! Each pool emits `reward_rate` units per second, starting at
//! `period_start`. At every checkpoint the emission since the previous one is
//! split into the controller cut and the staker part; the staker part is
//! folded into `acc_reward_per_share`, scaled by REWARD_PRECISION. A position
//! remembers the accumulator value at its last checkpoint and earns
//! `amount * (acc - acc_checkpoint) / REWARD_PRECISION`, which keeps reward
//! computation O(1) regardless of the number of stakers.
//!
//! The accumulator lives in 256-bit space: with a single base unit staked,
//! one checkpoint adds `emitted * REWARD_PRECISION`. Only the settled
//! amounts, bounded by what the pool actually emitted, are narrowed back to
//! i128.

use soroban_sdk::{Env, I256};

use crate::error::StakingError;
use crate::storage::{StakePosition, StakingPool, BPS_DENOMINATOR, REWARD_PRECISION};

/// `a * b / d`, rounded toward zero.
pub fn mul_div(env: &Env, a: i128, b: i128, d: i128) -> Result<i128, StakingError> {
    if d == 0 {
        return Err(StakingError::Overflow);
    }
    I256::from_i128(env, a)
        .mul(&I256::from_i128(env, b))
        .div(&I256::from_i128(env, d))
        .to_i128()
        .ok_or(StakingError::Overflow)
}

/// Advance the pool accumulator to `now`.
///
/// Nothing is emitted before `period_start`; emission over an interval with
/// nothing staked is not distributed to anyone.
pub fn accrue_pool(env: &Env, pool: &mut StakingPool, now: u64) -> Result<(), StakingError> {
    let from = pool.last_accrual.max(pool.period_start);
    if now <= from {
        return Ok(());
    }

    if pool.total_staked > 0 {
        let elapsed = (now - from) as i128;
        let emitted = elapsed
            .checked_mul(pool.reward_rate)
            .ok_or(StakingError::Overflow)?;
        let controller_cut = mul_div(
            env,
            emitted,
            pool.controller_share_bps as i128,
            BPS_DENOMINATOR,
        )?;
        let to_stakers = emitted
            .checked_sub(controller_cut)
            .ok_or(StakingError::Overflow)?;

        let per_share = I256::from_i128(env, to_stakers)
            .mul(&I256::from_i128(env, REWARD_PRECISION))
            .div(&I256::from_i128(env, pool.total_staked));
        pool.acc_reward_per_share = pool.acc_reward_per_share.add(&per_share);
        pool.controller_owed = pool
            .controller_owed
            .checked_add(controller_cut)
            .ok_or(StakingError::Overflow)?;
    }

    pool.last_accrual = now;
    Ok(())
}

/// Move everything the position earned since its last checkpoint into
/// `pending` and move the checkpoint to `acc_reward_per_share`.
///
/// Must run before every change of `amount`.
pub fn settle_position(
    env: &Env,
    position: &mut StakePosition,
    acc_reward_per_share: &I256,
) -> Result<(), StakingError> {
    let earned = acc_reward_per_share
        .sub(&position.acc_checkpoint)
        .mul(&I256::from_i128(env, position.amount))
        .div(&I256::from_i128(env, REWARD_PRECISION))
        .to_i128()
        .ok_or(StakingError::Overflow)?;
    position.pending = position
        .pending
        .checked_add(earned)
        .ok_or(StakingError::Overflow)?;
    position.acc_checkpoint = acc_reward_per_share.clone();
    Ok(())
}

/// Reward a position would hold if it were settled at `now`. Pure read.
pub fn pending_at(
    env: &Env,
    pool: &StakingPool,
    position: &StakePosition,
    now: u64,
) -> Result<i128, StakingError> {
    let mut pool = pool.clone();
    let mut position = position.clone();
    accrue_pool(env, &mut pool, now)?;
    settle_position(env, &mut position, &pool.acc_reward_per_share)?;
    Ok(position.pending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use soroban_sdk::{testutils::Address as _, Address};

    const E18: i128 = 1_000_000_000_000_000_000;
    const RATE: i128 = 11_574_074_074_000;

    fn pool(env: &Env, share_bps: u32, total_staked: i128) -> StakingPool {
        StakingPool {
            id: 1,
            period_start: 1_000,
            max_stake: 100 * E18,
            reward_rate: RATE,
            controller_share_bps: share_bps,
            controller: Address::generate(env),
            total_staked,
            acc_reward_per_share: I256::from_i32(env, 0),
            last_accrual: 1_000,
            controller_owed: 0,
        }
    }

    fn position(env: &Env, amount: i128) -> StakePosition {
        StakePosition {
            amount,
            ..StakePosition::empty(env)
        }
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        let env = Env::default();
        // 10^30 * 10^18 overflows i128 but the quotient fits.
        let r = mul_div(&env, 1_000_000_000_000 * E18, E18, E18).unwrap();
        assert_eq!(r, 1_000_000_000_000 * E18);
    }

    #[test]
    fn test_mul_div_zero_denominator() {
        let env = Env::default();
        assert_eq!(mul_div(&env, 1, 1, 0), Err(StakingError::Overflow));
    }

    #[test]
    fn test_no_emission_before_period_start() {
        let env = Env::default();
        let mut p = pool(&env, 0, 6 * E18);
        p.period_start = 5_000;
        accrue_pool(&env, &mut p, 4_000).unwrap();
        assert_eq!(p.acc_reward_per_share, I256::from_i32(&env, 0));
    }

    #[test]
    fn test_empty_pool_emission_is_dropped() {
        let env = Env::default();
        let mut p = pool(&env, 0, 0);
        accrue_pool(&env, &mut p, 2_000).unwrap();
        assert_eq!(p.acc_reward_per_share, I256::from_i32(&env, 0));
        assert_eq!(p.last_accrual, 2_000);
    }

    #[test]
    fn test_pro_rata_share() {
        let env = Env::default();
        let p = pool(&env, 0, 6 * E18);
        // 300s * rate * (2/6)
        let pending = pending_at(&env, &p, &position(&env, 2 * E18), 1_300).unwrap();
        assert_eq!(pending, 300 * RATE / 3);
    }

    #[test]
    fn test_controller_cut() {
        let env = Env::default();
        let mut p = pool(&env, 2_500, 4 * E18);
        accrue_pool(&env, &mut p, 1_100).unwrap();

        let emitted = 100 * RATE;
        assert_eq!(p.controller_owed, emitted / 4);

        let pending = pending_at(&env, &p, &position(&env, 4 * E18), 1_100).unwrap();
        assert_eq!(pending, emitted - emitted / 4);
    }

    #[test]
    fn test_settle_is_idempotent_at_same_checkpoint() {
        let env = Env::default();
        let mut p = pool(&env, 0, 2 * E18);
        accrue_pool(&env, &mut p, 1_060).unwrap();

        let mut pos = position(&env, 2 * E18);
        settle_position(&env, &mut pos, &p.acc_reward_per_share).unwrap();
        let first = pos.pending;
        settle_position(&env, &mut pos, &p.acc_reward_per_share).unwrap();
        assert_eq!(pos.pending, first);
        assert_eq!(first, 60 * RATE);
    }

    #[test]
    fn test_single_unit_stake_accumulator_beyond_i128() {
        let env = Env::default();
        let mut p = pool(&env, 0, 1);
        p.reward_rate = E18;
        accrue_pool(&env, &mut p, 1_200).unwrap();

        // 200 * 10^18 * 10^18 per unit does not fit in i128.
        assert!(p.acc_reward_per_share.to_i128().is_none());

        let mut lone = position(&env, 1);
        settle_position(&env, &mut lone, &p.acc_reward_per_share).unwrap();
        assert_eq!(lone.pending, 200 * E18);

        // A large position joining at the checkpoint earns nothing retroactively.
        let mut late = position(&env, 5 * E18);
        late.acc_checkpoint = p.acc_reward_per_share.clone();
        p.total_staked += 5 * E18;
        accrue_pool(&env, &mut p, 1_201).unwrap();
        settle_position(&env, &mut late, &p.acc_reward_per_share).unwrap();
        assert!(late.pending <= E18);
        assert!(late.pending > E18 - E18 / 1_000);
    }
}
