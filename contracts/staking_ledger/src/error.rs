use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum StakingError {
    /// Contract already initialized
    AlreadyInitialized = 1,
    /// Contract not initialized
    NotInitialized = 2,
    /// Only admin can perform this action
    NotAuthorized = 3,
    /// A pool with this id already exists
    DuplicatePool = 4,
    /// No pool with this id
    UnknownPool = 5,
    /// Negative reward rate, share above 100%, bad cap or stale period start
    InvalidParameters = 6,
    /// Amount must be positive
    InvalidAmount = 7,
    /// Stake would push the pool above its cap
    CapExceeded = 8,
    /// Staker token balance cannot cover the stake
    InsufficientBalance = 9,
    /// Unstake amount exceeds the staked position
    InsufficientStake = 10,
    /// No accrued reward to pay out
    NothingToClaim = 11,
    /// Reward reserve cannot cover the payout
    RewardReserveDepleted = 12,
    /// Arithmetic overflow
    Overflow = 13,
    /// Critical storage data missing (contract state corrupted)
    StorageCorrupted = 14,
}
