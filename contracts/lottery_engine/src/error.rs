use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum LotteryError {
    /// Contract already initialized
    AlreadyInitialized = 1,
    /// Contract not initialized
    NotInitialized = 2,
    /// Caller is not the admin or the randomness bridge
    NotAuthorized = 3,
    /// No lottery with this id
    UnknownLottery = 4,
    /// Close time must be after start time
    InvalidWindow = 5,
    /// Lottery needs at least one prize
    EmptyPrizeList = 6,
    /// Prize ids must be distinct
    DuplicatePrize = 7,
    /// Negative cost or oversized metadata URI
    InvalidParameters = 8,
    /// Ticket count must be positive
    InvalidAmount = 9,
    /// Lottery not accepting tickets or boosts
    LotteryNotOpen = 10,
    /// Participant cap reached
    LotteryFull = 11,
    /// Balance cannot cover the ticket or boost cost
    InsufficientPayment = 12,
    /// Boost target holds no ticket
    NotAParticipant = 13,
    /// Participant already boosted the maximum number of times
    BoostLimitReached = 14,
    /// Draw requested before close time
    LotteryStillOpen = 15,
    /// Lottery already drawn or its draw is still in flight
    AlreadyDrawn = 16,
    /// Nobody bought a ticket
    NoParticipants = 17,
    /// Randomness bridge refused the request
    RandomnessRequestFailed = 18,
    /// Fulfillment for a request this lottery is not waiting on
    UnknownRequest = 19,
    /// Randomness delivered outside the DrawRequested phase
    NotDrawRequested = 20,
    /// Winners not drawn yet
    LotteryNotResolved = 21,
    /// Address holds no prize in this lottery
    NotAWinner = 22,
    /// Every prize of this address was already redeemed
    AlreadyClaimed = 23,
    /// No ticket proceeds left to withdraw
    NothingToWithdraw = 24,
    /// Arithmetic overflow
    Overflow = 25,
    /// Critical storage data missing (contract state corrupted)
    StorageCorrupted = 26,
}
