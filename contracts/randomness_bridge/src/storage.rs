use soroban_sdk::{contracttype, Address, BytesN};

/// Storage keys for the contract.
#[derive(Clone)]
#[contracttype]
pub enum DataKey {
    /// Admin address (manages oracle, consumers and expiry)
    Admin,
    /// Trusted oracle identity, the only address allowed to fulfill
    Oracle,
    /// Oracle key hash forwarded with every request
    KeyHash,
    /// Seconds after which a pending request may be reissued (0 = never)
    RequestExpiry,
    /// Last issued request id
    LastRequestId,
    /// Consumer allowlist: Consumer(contract)
    Consumer(Address),
    /// Request record: Request(request_id)
    Request(u64),
    /// Outstanding request of a consumer slot: Pending(consumer, consumer_id)
    Pending(Address, u64),
}

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RequestStatus {
    Requested,
    Fulfilled,
    /// Expired and replaced by a newer request for the same consumer slot
    Superseded,
}

/// One request/fulfill round trip, retained after fulfillment for audit.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RandomRequest {
    pub id: u64,
    pub consumer: Address,
    pub consumer_id: u64,
    pub seed: BytesN<32>,
    pub requested_at: u64,
    pub status: RequestStatus,
    pub random_value: Option<BytesN<32>>,
}

/// Persistent entry TTL management (~30 days at 5s ledgers).
pub const BUMP_THRESHOLD: u32 = 518_400;
pub const BUMP_AMOUNT: u32 = 1_036_800;
