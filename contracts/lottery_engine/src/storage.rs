use soroban_sdk::{contracttype, Address, BytesN, String, Vec};

/// Storage keys for the contract.
/// Engine configuration lives in instance storage, per-lottery records in
/// persistent storage.
#[derive(Clone)]
#[contracttype]
pub enum DataKey {
    /// Admin address (creates lotteries, triggers draws)
    Admin,
    /// Randomness bridge contract
    Randomness,
    /// Token tickets and boosts are paid in
    PaymentToken,
    /// Defaults copied into every new lottery
    Config,
    /// Last allocated lottery id (0 = none yet)
    LastLotteryId,
    /// Lottery record: Lottery(lottery_id)
    Lottery(u32),
    /// Ticket/boost entry: Entry(lottery_id, address)
    Entry(u32, Address),
    /// Participant addresses by slot: Roster(lottery_id, chunk)
    Roster(u32, u32),
    /// Participant weights by slot, parallel to Roster: Weights(lottery_id, chunk)
    Weights(u32, u32),
    /// Sum of each Weights chunk: WeightTotals(lottery_id)
    WeightTotals(u32),
    /// Latest randomness request of a draw: DrawRequest(lottery_id)
    DrawRequest(u32),
    /// Winners and claim flags: DrawResult(lottery_id)
    DrawResult(u32),
}

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LotteryPhase {
    Open,
    Closed,
    DrawRequested,
    Resolved,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LotteryConfig {
    /// Extra ticket multiples granted per boost: weight = tickets * (1 + boosts * boost_factor)
    pub boost_factor: u32,
    /// Boosts allowed per participant (0 = unlimited)
    pub max_boosts: u32,
    /// An address wins at most one prize
    pub distinct_winners: bool,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Lottery {
    pub id: u32,
    pub cost_per_ticket: i128,
    pub boost_cost: i128,
    pub start_time: u64,
    pub close_time: u64,
    pub nft_contract: Address,
    pub prize_ids: Vec<u32>,
    /// 0 = unlimited
    pub max_participants: u32,
    /// Prize metadata URI with an `{id}` placeholder
    pub metadata_uri: String,
    pub phase: LotteryPhase,
    pub participant_count: u32,
    pub total_tickets: u32,
    pub total_weight: u128,
    /// Ticket and boost payments held for this lottery
    pub proceeds: i128,
    pub config: LotteryConfig,
}

#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Participant {
    pub tickets: u32,
    pub boosts: u32,
    /// Position in order of first purchase
    pub slot: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingDraw {
    pub request_id: u64,
    pub attempts: u32,
    pub requested_at: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PrizeAssignment {
    pub prize_id: u32,
    /// None when every participant already won and prizes remained
    pub winner: Option<Address>,
    pub claimed: bool,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DrawResult {
    pub request_id: u64,
    pub random_value: BytesN<32>,
    pub assignments: Vec<PrizeAssignment>,
}

/// Participants per Roster/Weights entry. Slot `s` lives at chunk
/// `s / PARTICIPANT_CHUNK`, position `s % PARTICIPANT_CHUNK`.
pub const PARTICIPANT_CHUNK: u32 = 64;

/// Bridge error code for a consumer slot with a request still in flight.
pub const BRIDGE_REQUEST_PENDING: u32 = 4;

/// NFT units minted per redeemed prize.
pub const PRIZE_QUANTITY: i128 = 1;

/// Persistent entry TTL management (~30 days at 5s ledgers).
pub const BUMP_THRESHOLD: u32 = 518_400;
pub const BUMP_AMOUNT: u32 = 1_036_800;
