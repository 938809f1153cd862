#![no_std]

mod error;
mod events;
mod rewards;
mod storage;

pub use error::StakingError;
pub use storage::{StakePosition, StakingPool};

use soroban_sdk::{contract, contractimpl, log, token, Address, Env, I256};
use storage::{DataKey, BPS_DENOMINATOR, BUMP_AMOUNT, BUMP_THRESHOLD};

/// Staking Ledger Contract
///
/// Tracks per-pool, per-staker balances of a single token and accrues
/// time-based rewards with the reward-per-share checkpoint technique.
///
/// Key features:
/// - Admin creates pools with a stake cap, an emission rate and a controller cut
/// - Stakers stake/unstake against a pool; rewards accrue lazily in O(1)
/// - The controller cut is credited at every accrual checkpoint
/// - Rewards are paid from a reserve topped up through `fund_rewards`
#[contract]
pub struct StakingLedger;

#[contractimpl]
impl StakingLedger {
    /// Constructor: delegates to initialize() for the actual setup logic.
    pub fn __constructor(env: Env, admin: Address, token: Address, start_grace_secs: u64) {
        Self::initialize(env, admin, token, start_grace_secs).expect("initialization failed");
    }

    /// Initialize the ledger.
    ///
    /// # Arguments
    /// * `admin` - Address that can create pools
    /// * `token` - Token contract staked into pools and paid out as reward
    /// * `start_grace_secs` - How far in the past a new pool's period start may lie
    pub fn initialize(
        env: Env,
        admin: Address,
        token: Address,
        start_grace_secs: u64,
    ) -> Result<(), StakingError> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(StakingError::AlreadyInitialized);
        }

        admin.require_auth();

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Token, &token);
        env.storage()
            .instance()
            .set(&DataKey::StartGrace, &start_grace_secs);
        env.storage().instance().set(&DataKey::RewardReserve, &0i128);
        Self::bump_instance(&env);

        Ok(())
    }

    /// Create a staking pool (admin only).
    ///
    /// # Arguments
    /// * `id` - Caller-assigned pool id, unique
    /// * `period_start` - Timestamp rewards start accruing from
    /// * `max_stake` - Cap on the pool's total stake
    /// * `reward_rate` - Reward units emitted per second across the pool
    /// * `controller_share_bps` - Controller cut of every emission (0..=10000)
    /// * `controller` - Address credited with the controller cut
    #[allow(clippy::too_many_arguments)]
    pub fn create_pool(
        env: Env,
        admin: Address,
        id: u32,
        period_start: u64,
        max_stake: i128,
        reward_rate: i128,
        controller_share_bps: u32,
        controller: Address,
    ) -> Result<(), StakingError> {
        Self::require_initialized(&env)?;
        Self::require_admin(&env, &admin)?;

        admin.require_auth();

        if env.storage().persistent().has(&DataKey::Pool(id)) {
            return Err(StakingError::DuplicatePool);
        }
        if reward_rate < 0 || max_stake <= 0 || controller_share_bps as i128 > BPS_DENOMINATOR {
            return Err(StakingError::InvalidParameters);
        }

        let grace: u64 = env
            .storage()
            .instance()
            .get(&DataKey::StartGrace)
            .ok_or(StakingError::StorageCorrupted)?;
        let now = env.ledger().timestamp();
        if period_start < now.saturating_sub(grace) {
            return Err(StakingError::InvalidParameters);
        }

        let pool = StakingPool {
            id,
            period_start,
            max_stake,
            reward_rate,
            controller_share_bps,
            controller,
            total_staked: 0,
            acc_reward_per_share: I256::from_i32(&env, 0),
            last_accrual: period_start,
            controller_owed: 0,
        };
        Self::save_pool(&env, &pool);
        Self::bump_instance(&env);

        events::pool_created(&env, id, max_stake, reward_rate);

        Ok(())
    }

    /// Stake tokens into a pool.
    ///
    /// Accrues the caller's pending reward up to now, then pulls `amount`
    /// from the staker.
    ///
    /// # Returns
    /// The staker's new staked amount
    pub fn stake(
        env: Env,
        staker: Address,
        pool_id: u32,
        amount: i128,
    ) -> Result<i128, StakingError> {
        Self::require_initialized(&env)?;

        if amount <= 0 {
            return Err(StakingError::InvalidAmount);
        }

        staker.require_auth();

        let mut pool = Self::load_pool(&env, pool_id)?;
        let new_total = pool
            .total_staked
            .checked_add(amount)
            .ok_or(StakingError::Overflow)?;
        if new_total > pool.max_stake {
            return Err(StakingError::CapExceeded);
        }

        let token_client = token::Client::new(&env, &Self::token_address(&env)?);
        if token_client.balance(&staker) < amount {
            return Err(StakingError::InsufficientBalance);
        }

        rewards::accrue_pool(&env, &mut pool, env.ledger().timestamp())?;

        let mut position = Self::load_position(&env, pool_id, &staker);
        rewards::settle_position(&env, &mut position, &pool.acc_reward_per_share)?;
        position.amount = position
            .amount
            .checked_add(amount)
            .ok_or(StakingError::Overflow)?;
        pool.total_staked = new_total;

        Self::save_pool(&env, &pool);
        Self::save_position(&env, pool_id, &staker, &position);
        Self::bump_instance(&env);

        token_client.transfer(&staker, &env.current_contract_address(), &amount);

        log!(&env, "stake: pool {} amount {} total {}", pool_id, amount, new_total);
        events::staked(&env, pool_id, staker, amount, new_total);

        Ok(position.amount)
    }

    /// Unstake tokens from a pool.
    ///
    /// Returns the principal together with every accrued reward the reserve
    /// can cover; any uncovered remainder stays pending on the position.
    ///
    /// # Returns
    /// (principal returned, reward paid)
    pub fn unstake(
        env: Env,
        staker: Address,
        pool_id: u32,
        amount: i128,
    ) -> Result<(i128, i128), StakingError> {
        Self::require_initialized(&env)?;

        if amount <= 0 {
            return Err(StakingError::InvalidAmount);
        }

        staker.require_auth();

        let mut pool = Self::load_pool(&env, pool_id)?;
        let mut position = Self::load_position(&env, pool_id, &staker);
        if amount > position.amount {
            return Err(StakingError::InsufficientStake);
        }

        rewards::accrue_pool(&env, &mut pool, env.ledger().timestamp())?;
        rewards::settle_position(&env, &mut position, &pool.acc_reward_per_share)?;

        position.amount -= amount;
        pool.total_staked = pool
            .total_staked
            .checked_sub(amount)
            .ok_or(StakingError::Overflow)?;

        let reserve = Self::reward_reserve(&env);
        let reward = position.pending.min(reserve);
        position.pending -= reward;
        env.storage()
            .instance()
            .set(&DataKey::RewardReserve, &(reserve - reward));

        Self::save_pool(&env, &pool);
        Self::save_position(&env, pool_id, &staker, &position);
        Self::bump_instance(&env);

        let payout = amount.checked_add(reward).ok_or(StakingError::Overflow)?;
        let token_client = token::Client::new(&env, &Self::token_address(&env)?);
        token_client.transfer(&env.current_contract_address(), &staker, &payout);

        events::unstaked(&env, pool_id, staker, amount, reward);

        Ok((amount, reward))
    }

    /// Pay out the caller's accrued reward without touching principal.
    ///
    /// # Returns
    /// Reward paid
    pub fn claim_rewards(env: Env, staker: Address, pool_id: u32) -> Result<i128, StakingError> {
        Self::require_initialized(&env)?;

        staker.require_auth();

        let mut pool = Self::load_pool(&env, pool_id)?;
        let mut position = Self::load_position(&env, pool_id, &staker);

        rewards::accrue_pool(&env, &mut pool, env.ledger().timestamp())?;
        rewards::settle_position(&env, &mut position, &pool.acc_reward_per_share)?;

        let reward = position.pending;
        if reward <= 0 {
            return Err(StakingError::NothingToClaim);
        }
        let reserve = Self::reward_reserve(&env);
        if reserve < reward {
            return Err(StakingError::RewardReserveDepleted);
        }

        position.pending = 0;
        env.storage()
            .instance()
            .set(&DataKey::RewardReserve, &(reserve - reward));

        Self::save_pool(&env, &pool);
        Self::save_position(&env, pool_id, &staker, &position);
        Self::bump_instance(&env);

        let token_client = token::Client::new(&env, &Self::token_address(&env)?);
        token_client.transfer(&env.current_contract_address(), &staker, &reward);

        events::reward_claimed(&env, pool_id, staker, reward);

        Ok(reward)
    }

    /// Pay the pool controller the share credited to it so far.
    ///
    /// # Returns
    /// Amount paid to the controller
    pub fn withdraw_controller_share(env: Env, pool_id: u32) -> Result<i128, StakingError> {
        Self::require_initialized(&env)?;

        let mut pool = Self::load_pool(&env, pool_id)?;
        pool.controller.require_auth();

        rewards::accrue_pool(&env, &mut pool, env.ledger().timestamp())?;

        let owed = pool.controller_owed;
        if owed <= 0 {
            return Err(StakingError::NothingToClaim);
        }
        let reserve = Self::reward_reserve(&env);
        if reserve < owed {
            return Err(StakingError::RewardReserveDepleted);
        }

        pool.controller_owed = 0;
        env.storage()
            .instance()
            .set(&DataKey::RewardReserve, &(reserve - owed));
        Self::save_pool(&env, &pool);
        Self::bump_instance(&env);

        let token_client = token::Client::new(&env, &Self::token_address(&env)?);
        token_client.transfer(&env.current_contract_address(), &pool.controller, &owed);

        events::controller_paid(&env, pool_id, pool.controller, owed);

        Ok(owed)
    }

    /// Top up the reward reserve.
    ///
    /// # Returns
    /// Reserve after funding
    pub fn fund_rewards(env: Env, from: Address, amount: i128) -> Result<i128, StakingError> {
        Self::require_initialized(&env)?;

        if amount <= 0 {
            return Err(StakingError::InvalidAmount);
        }

        from.require_auth();

        let reserve = Self::reward_reserve(&env)
            .checked_add(amount)
            .ok_or(StakingError::Overflow)?;
        env.storage()
            .instance()
            .set(&DataKey::RewardReserve, &reserve);
        Self::bump_instance(&env);

        let token_client = token::Client::new(&env, &Self::token_address(&env)?);
        token_client.transfer(&from, &env.current_contract_address(), &amount);

        events::rewards_funded(&env, from, amount, reserve);

        Ok(reserve)
    }

    /// Reward accrued but not yet paid to `staker`, as of the current ledger time.
    pub fn pending_reward(env: Env, pool_id: u32, staker: Address) -> Result<i128, StakingError> {
        Self::require_initialized(&env)?;

        let pool = Self::load_pool(&env, pool_id)?;
        let position = Self::load_position(&env, pool_id, &staker);
        rewards::pending_at(&env, &pool, &position, env.ledger().timestamp())
    }

    /// Get a pool record.
    pub fn get_pool(env: Env, pool_id: u32) -> Result<StakingPool, StakingError> {
        Self::require_initialized(&env)?;
        Self::load_pool(&env, pool_id)
    }

    /// Get a staker's position (zero record if none).
    pub fn get_position(env: Env, pool_id: u32, staker: Address) -> StakePosition {
        Self::load_position(&env, pool_id, &staker)
    }

    /// Get a pool's total stake.
    pub fn get_total_staked(env: Env, pool_id: u32) -> Result<i128, StakingError> {
        Self::require_initialized(&env)?;
        Ok(Self::load_pool(&env, pool_id)?.total_staked)
    }

    /// Get the unpaid reward reserve.
    pub fn get_reward_reserve(env: Env) -> i128 {
        Self::reward_reserve(&env)
    }

    /// Get the admin address.
    pub fn get_admin(env: Env) -> Result<Address, StakingError> {
        Self::require_initialized(&env)?;
        env.storage()
            .instance()
            .get(&DataKey::Admin)
            .ok_or(StakingError::StorageCorrupted)
    }

    /// Get the staked token address.
    pub fn get_token(env: Env) -> Result<Address, StakingError> {
        Self::require_initialized(&env)?;
        Self::token_address(&env)
    }

    // --- Internal helpers ---

    fn require_initialized(env: &Env) -> Result<(), StakingError> {
        if !env.storage().instance().has(&DataKey::Admin) {
            return Err(StakingError::NotInitialized);
        }
        Ok(())
    }

    fn require_admin(env: &Env, caller: &Address) -> Result<(), StakingError> {
        let admin: Address = env
            .storage()
            .instance()
            .get(&DataKey::Admin)
            .ok_or(StakingError::StorageCorrupted)?;
        if *caller != admin {
            return Err(StakingError::NotAuthorized);
        }
        Ok(())
    }

    fn token_address(env: &Env) -> Result<Address, StakingError> {
        env.storage()
            .instance()
            .get(&DataKey::Token)
            .ok_or(StakingError::StorageCorrupted)
    }

    fn reward_reserve(env: &Env) -> i128 {
        env.storage()
            .instance()
            .get(&DataKey::RewardReserve)
            .unwrap_or(0)
    }

    fn load_pool(env: &Env, pool_id: u32) -> Result<StakingPool, StakingError> {
        env.storage()
            .persistent()
            .get(&DataKey::Pool(pool_id))
            .ok_or(StakingError::UnknownPool)
    }

    fn save_pool(env: &Env, pool: &StakingPool) {
        let key = DataKey::Pool(pool.id);
        env.storage().persistent().set(&key, pool);
        env.storage()
            .persistent()
            .extend_ttl(&key, BUMP_THRESHOLD, BUMP_AMOUNT);
    }

    fn load_position(env: &Env, pool_id: u32, staker: &Address) -> StakePosition {
        env.storage()
            .persistent()
            .get(&DataKey::Position(pool_id, staker.clone()))
            .unwrap_or_else(|| StakePosition::empty(env))
    }

    /// Positions with nothing staked and nothing pending are pruned.
    fn save_position(env: &Env, pool_id: u32, staker: &Address, position: &StakePosition) {
        let key = DataKey::Position(pool_id, staker.clone());
        if position.amount == 0 && position.pending == 0 {
            env.storage().persistent().remove(&key);
            return;
        }
        env.storage().persistent().set(&key, position);
        env.storage()
            .persistent()
            .extend_ttl(&key, BUMP_THRESHOLD, BUMP_AMOUNT);
    }

    fn bump_instance(env: &Env) {
        env.storage()
            .instance()
            .extend_ttl(BUMP_THRESHOLD, BUMP_AMOUNT);
    }
}
