use soroban_sdk::{contracttype, Address, Env, I256};

/// Storage keys for the contract.
#[derive(Clone)]
#[contracttype]
pub enum DataKey {
    /// Admin address (can create pools)
    Admin,
    /// Token staked and paid out as reward
    Token,
    /// How far in the past (seconds) a new pool's period start may lie
    StartGrace,
    /// Reward tokens funded into the contract and not yet paid out
    RewardReserve,
    /// Pool record: Pool(pool_id)
    Pool(u32),
    /// Staker position: Position(pool_id, staker)
    Position(u32, Address),
}

/// A staking bucket with its own cap, emission rate and controller cut.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StakingPool {
    pub id: u32,
    pub period_start: u64,
    pub max_stake: i128,
    /// Reward units emitted per second across the whole pool
    pub reward_rate: i128,
    /// Controller cut of every emission, in basis points
    pub controller_share_bps: u32,
    pub controller: Address,
    pub total_staked: i128,
    /// Accumulated reward per staked unit, scaled by REWARD_PRECISION.
    /// 256-bit: a tiny total stake makes a single checkpoint exceed i128.
    pub acc_reward_per_share: I256,
    pub last_accrual: u64,
    /// Controller share credited at checkpoints, not yet withdrawn
    pub controller_owed: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StakePosition {
    pub amount: i128,
    /// Pool accumulator at the position's last checkpoint
    pub acc_checkpoint: I256,
    /// Reward settled at earlier checkpoints and not yet paid
    pub pending: i128,
}

impl StakePosition {
    pub fn empty(env: &Env) -> Self {
        StakePosition {
            amount: 0,
            acc_checkpoint: I256::from_i32(env, 0),
            pending: 0,
        }
    }
}

/// Fixed-point scale of `acc_reward_per_share`.
pub const REWARD_PRECISION: i128 = 1_000_000_000_000_000_000; // 10^18

/// Basis points denominator (100% = 10000 bp).
pub const BPS_DENOMINATOR: i128 = 10_000;

/// Persistent entry TTL management (~30 days at 5s ledgers).
pub const BUMP_THRESHOLD: u32 = 518_400;
pub const BUMP_AMOUNT: u32 = 1_036_800;
