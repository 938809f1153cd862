#![no_std]

mod error;
mod events;
mod storage;

pub use error::BridgeError;
pub use storage::{RandomRequest, RequestStatus};

use soroban_sdk::{contract, contractclient, contractimpl, log, Address, BytesN, Env};
use storage::{DataKey, BUMP_AMOUNT, BUMP_THRESHOLD};

/// Callback every consumer contract exposes. Invoked once per fulfilled
/// request, carrying the consumer's own correlation id.
#[contractclient(name = "RandomnessConsumerClient")]
pub trait RandomnessConsumer {
    fn receive_randomness(env: Env, consumer_id: u64, request_id: u64, random_value: BytesN<32>);
}

/// Randomness Bridge Contract
///
/// Wraps the asynchronous round trip to an external verifiable-randomness
/// oracle as two independent entry points correlated by a request id:
/// - `request` records the request and publishes a `rand_req` event
/// - `fulfill` (oracle only) stores the value and calls the consumer back
///
/// Each (consumer, consumer_id) slot holds at most one unfulfilled request.
/// A pending request older than the configured expiry may be superseded by
/// a fresh one.
#[contract]
pub struct RandomnessBridge;

#[contractimpl]
impl RandomnessBridge {
    /// Constructor: delegates to initialize() for the actual setup logic.
    pub fn __constructor(
        env: Env,
        admin: Address,
        oracle: Address,
        key_hash: BytesN<32>,
        request_expiry_secs: u64,
    ) {
        Self::initialize(env, admin, oracle, key_hash, request_expiry_secs)
            .expect("initialization failed");
    }

    /// Initialize the bridge.
    ///
    /// # Arguments
    /// * `admin` - Address managing oracle, consumers and expiry
    /// * `oracle` - Trusted identity allowed to fulfill requests
    /// * `key_hash` - Oracle key hash forwarded with every request
    /// * `request_expiry_secs` - Age after which a pending request may be reissued (0 = never)
    pub fn initialize(
        env: Env,
        admin: Address,
        oracle: Address,
        key_hash: BytesN<32>,
        request_expiry_secs: u64,
    ) -> Result<(), BridgeError> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(BridgeError::AlreadyInitialized);
        }

        admin.require_auth();

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Oracle, &oracle);
        env.storage().instance().set(&DataKey::KeyHash, &key_hash);
        env.storage()
            .instance()
            .set(&DataKey::RequestExpiry, &request_expiry_secs);
        env.storage().instance().set(&DataKey::LastRequestId, &0u64);
        Self::bump_instance(&env);

        Ok(())
    }

    /// Allow or revoke a consumer contract (admin only).
    pub fn set_consumer(
        env: Env,
        admin: Address,
        consumer: Address,
        allowed: bool,
    ) -> Result<(), BridgeError> {
        Self::require_initialized(&env)?;
        Self::require_admin(&env, &admin)?;

        admin.require_auth();

        let key = DataKey::Consumer(consumer);
        if allowed {
            env.storage().persistent().set(&key, &true);
            env.storage()
                .persistent()
                .extend_ttl(&key, BUMP_THRESHOLD, BUMP_AMOUNT);
        } else {
            env.storage().persistent().remove(&key);
        }

        Ok(())
    }

    /// Replace the trusted oracle (admin only).
    pub fn set_oracle(env: Env, admin: Address, oracle: Address) -> Result<(), BridgeError> {
        Self::require_initialized(&env)?;
        Self::require_admin(&env, &admin)?;

        admin.require_auth();

        env.storage().instance().set(&DataKey::Oracle, &oracle);

        Ok(())
    }

    /// Update the request expiry (admin only).
    pub fn set_request_expiry(
        env: Env,
        admin: Address,
        request_expiry_secs: u64,
    ) -> Result<(), BridgeError> {
        Self::require_initialized(&env)?;
        Self::require_admin(&env, &admin)?;

        admin.require_auth();

        env.storage()
            .instance()
            .set(&DataKey::RequestExpiry, &request_expiry_secs);

        Ok(())
    }

    /// Request a random value for a consumer slot.
    ///
    /// # Arguments
    /// * `consumer` - Calling contract (must authorize and be allowlisted)
    /// * `consumer_id` - Consumer's correlation id (e.g. a lottery id)
    /// * `seed` - Domain-separation value forwarded to the oracle
    ///
    /// # Returns
    /// The new request id
    pub fn request(
        env: Env,
        consumer: Address,
        consumer_id: u64,
        seed: BytesN<32>,
    ) -> Result<u64, BridgeError> {
        Self::require_initialized(&env)?;

        consumer.require_auth();

        if !Self::is_consumer(env.clone(), consumer.clone()) {
            return Err(BridgeError::NotAuthorized);
        }

        let now = env.ledger().timestamp();
        let pending_key = DataKey::Pending(consumer.clone(), consumer_id);

        if let Some(previous_id) = env.storage().persistent().get::<_, u64>(&pending_key) {
            let mut previous = Self::load_request(&env, previous_id)?;
            if previous.status == RequestStatus::Requested {
                let expiry: u64 = env
                    .storage()
                    .instance()
                    .get(&DataKey::RequestExpiry)
                    .ok_or(BridgeError::StorageCorrupted)?;
                if expiry == 0 || now < previous.requested_at.saturating_add(expiry) {
                    return Err(BridgeError::RequestAlreadyPending);
                }
                previous.status = RequestStatus::Superseded;
                Self::save_request(&env, &previous);
                log!(&env, "request {} superseded after expiry", previous_id);
            }
        }

        let last_id: u64 = env
            .storage()
            .instance()
            .get(&DataKey::LastRequestId)
            .ok_or(BridgeError::StorageCorrupted)?;
        let request_id = last_id + 1;

        let request = RandomRequest {
            id: request_id,
            consumer: consumer.clone(),
            consumer_id,
            seed: seed.clone(),
            requested_at: now,
            status: RequestStatus::Requested,
            random_value: None,
        };
        Self::save_request(&env, &request);

        env.storage().persistent().set(&pending_key, &request_id);
        env.storage()
            .persistent()
            .extend_ttl(&pending_key, BUMP_THRESHOLD, BUMP_AMOUNT);
        env.storage()
            .instance()
            .set(&DataKey::LastRequestId, &request_id);
        Self::bump_instance(&env);

        let key_hash: BytesN<32> = env
            .storage()
            .instance()
            .get(&DataKey::KeyHash)
            .ok_or(BridgeError::StorageCorrupted)?;
        events::randomness_requested(&env, request_id, consumer, consumer_id, seed, key_hash);

        Ok(request_id)
    }

    /// Deliver the random value for a request (oracle only).
    ///
    /// Re-sending the exact fulfillment of an already fulfilled request is
    /// accepted as a no-op; the consumer is called back only once. A consumer
    /// callback that fails does not undo the fulfillment: the slot is freed
    /// and the consumer may request again.
    pub fn fulfill(
        env: Env,
        oracle: Address,
        request_id: u64,
        random_value: BytesN<32>,
    ) -> Result<(), BridgeError> {
        Self::require_initialized(&env)?;

        let stored_oracle: Address = env
            .storage()
            .instance()
            .get(&DataKey::Oracle)
            .ok_or(BridgeError::StorageCorrupted)?;
        if oracle != stored_oracle {
            return Err(BridgeError::NotAuthorized);
        }
        oracle.require_auth();

        let mut request = env
            .storage()
            .persistent()
            .get::<_, RandomRequest>(&DataKey::Request(request_id))
            .ok_or(BridgeError::UnknownRequest)?;

        match request.status {
            RequestStatus::Requested => {}
            RequestStatus::Fulfilled if request.random_value.as_ref() == Some(&random_value) => {
                return Ok(());
            }
            _ => return Err(BridgeError::UnknownRequest),
        }

        request.status = RequestStatus::Fulfilled;
        request.random_value = Some(random_value.clone());
        Self::save_request(&env, &request);

        let pending_key = DataKey::Pending(request.consumer.clone(), request.consumer_id);
        if env.storage().persistent().get::<_, u64>(&pending_key) == Some(request_id) {
            env.storage().persistent().remove(&pending_key);
        }
        Self::bump_instance(&env);

        let consumer = RandomnessConsumerClient::new(&env, &request.consumer);
        let delivered = matches!(
            consumer.try_receive_randomness(&request.consumer_id, &request_id, &random_value),
            Ok(Ok(()))
        );
        if !delivered {
            log!(&env, "consumer rejected randomness for request {}", request_id);
        }

        events::randomness_fulfilled(&env, request_id, random_value, delivered);

        Ok(())
    }

    /// Get a request record.
    pub fn get_request(env: Env, request_id: u64) -> Result<RandomRequest, BridgeError> {
        Self::require_initialized(&env)?;
        env.storage()
            .persistent()
            .get(&DataKey::Request(request_id))
            .ok_or(BridgeError::UnknownRequest)
    }

    /// Outstanding request id of a consumer slot, if any.
    pub fn pending_request(env: Env, consumer: Address, consumer_id: u64) -> Option<u64> {
        env.storage()
            .persistent()
            .get(&DataKey::Pending(consumer, consumer_id))
    }

    /// Whether `consumer` may request randomness.
    pub fn is_consumer(env: Env, consumer: Address) -> bool {
        env.storage()
            .persistent()
            .get(&DataKey::Consumer(consumer))
            .unwrap_or(false)
    }

    /// Get the oracle address.
    pub fn get_oracle(env: Env) -> Result<Address, BridgeError> {
        Self::require_initialized(&env)?;
        env.storage()
            .instance()
            .get(&DataKey::Oracle)
            .ok_or(BridgeError::StorageCorrupted)
    }

    /// Get the oracle key hash.
    pub fn get_key_hash(env: Env) -> Result<BytesN<32>, BridgeError> {
        Self::require_initialized(&env)?;
        env.storage()
            .instance()
            .get(&DataKey::KeyHash)
            .ok_or(BridgeError::StorageCorrupted)
    }

    /// Get the request expiry in seconds (0 = never).
    pub fn get_request_expiry(env: Env) -> Result<u64, BridgeError> {
        Self::require_initialized(&env)?;
        env.storage()
            .instance()
            .get(&DataKey::RequestExpiry)
            .ok_or(BridgeError::StorageCorrupted)
    }

    // --- Internal helpers ---

    fn require_initialized(env: &Env) -> Result<(), BridgeError> {
        if !env.storage().instance().has(&DataKey::Admin) {
            return Err(BridgeError::NotInitialized);
        }
        Ok(())
    }

    fn require_admin(env: &Env, caller: &Address) -> Result<(), BridgeError> {
        let admin: Address = env
            .storage()
            .instance()
            .get(&DataKey::Admin)
            .ok_or(BridgeError::StorageCorrupted)?;
        if *caller != admin {
            return Err(BridgeError::NotAuthorized);
        }
        Ok(())
    }

    fn load_request(env: &Env, request_id: u64) -> Result<RandomRequest, BridgeError> {
        env.storage()
            .persistent()
            .get(&DataKey::Request(request_id))
            .ok_or(BridgeError::StorageCorrupted)
    }

    fn save_request(env: &Env, request: &RandomRequest) {
        let key = DataKey::Request(request.id);
        env.storage().persistent().set(&key, request);
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

#[cfg(test)]
mod test {
    use super::*;
    use soroban_sdk::{
        symbol_short,
        testutils::{Address as _, Ledger},
        Env,
    };

    const START: u64 = 1_700_000_000;
    const EXPIRY: u64 = 600;

    /// Records every callback it receives.
    #[contract]
    pub struct MockConsumer;

    #[contractimpl]
    impl MockConsumer {
        pub fn receive_randomness(
            env: Env,
            consumer_id: u64,
            request_id: u64,
            random_value: BytesN<32>,
        ) {
            let calls: u32 = env
                .storage()
                .instance()
                .get(&symbol_short!("calls"))
                .unwrap_or(0);
            env.storage()
                .instance()
                .set(&symbol_short!("calls"), &(calls + 1));
            env.storage()
                .instance()
                .set(&symbol_short!("last"), &(consumer_id, request_id, random_value));
        }

        pub fn calls(env: Env) -> u32 {
            env.storage()
                .instance()
                .get(&symbol_short!("calls"))
                .unwrap_or(0)
        }

        pub fn last(env: Env) -> Option<(u64, u64, BytesN<32>)> {
            env.storage().instance().get(&symbol_short!("last"))
        }
    }

    /// Own module: contract fn exports are module-level items.
    mod rejecting {
        use soroban_sdk::{contract, contractimpl, BytesN, Env};

        #[contract]
        pub struct RejectingConsumer;

        #[contractimpl]
        impl RejectingConsumer {
            pub fn receive_randomness(
                _env: Env,
                _consumer_id: u64,
                _request_id: u64,
                _random_value: BytesN<32>,
            ) {
                panic!("rejected");
            }
        }
    }

    use rejecting::RejectingConsumer;

    /// Register the bridge and an allowlisted mock consumer.
    /// Returns (env, bridge_id, admin, oracle, consumer_id)
    fn setup_test() -> (Env, Address, Address, Address, Address) {
        let env = Env::default();
        env.mock_all_auths();
        env.ledger().set_timestamp(START);

        let admin = Address::generate(&env);
        let oracle = Address::generate(&env);
        let key_hash = BytesN::from_array(&env, &[7u8; 32]);

        let bridge_id = env.register(
            RandomnessBridge,
            (admin.clone(), oracle.clone(), key_hash, EXPIRY),
        );
        let consumer_id = env.register(MockConsumer, ());

        let client = RandomnessBridgeClient::new(&env, &bridge_id);
        client.set_consumer(&admin, &consumer_id, &true);

        (env, bridge_id, admin, oracle, consumer_id)
    }

    fn seed(env: &Env, byte: u8) -> BytesN<32> {
        BytesN::from_array(env, &[byte; 32])
    }

    #[test]
    fn test_initialize() {
        let (env, bridge_id, _admin, oracle, consumer) = setup_test();
        let client = RandomnessBridgeClient::new(&env, &bridge_id);

        assert_eq!(client.get_oracle(), oracle);
        assert_eq!(client.get_request_expiry(), EXPIRY);
        assert_eq!(client.get_key_hash(), BytesN::from_array(&env, &[7u8; 32]));
        assert!(client.is_consumer(&consumer));
    }

    #[test]
    fn test_request_then_fulfill_calls_consumer_back() {
        let (env, bridge_id, _admin, oracle, consumer) = setup_test();
        let client = RandomnessBridgeClient::new(&env, &bridge_id);
        let consumer_client = MockConsumerClient::new(&env, &consumer);

        let request_id = client.request(&consumer, &1, &seed(&env, 1));
        assert_eq!(request_id, 1);
        assert_eq!(client.pending_request(&consumer, &1), Some(1));
        assert_eq!(client.get_request(&1).status, RequestStatus::Requested);

        let value = seed(&env, 42);
        client.fulfill(&oracle, &request_id, &value);

        let request = client.get_request(&request_id);
        assert_eq!(request.status, RequestStatus::Fulfilled);
        assert_eq!(request.random_value, Some(value.clone()));
        assert_eq!(client.pending_request(&consumer, &1), None);
        assert_eq!(consumer_client.calls(), 1);
        assert_eq!(consumer_client.last(), Some((1, request_id, value)));
    }

    #[test]
    #[should_panic(expected = "Error(Contract, #4)")] // RequestAlreadyPending = 4
    fn test_second_request_while_pending() {
        let (env, bridge_id, _admin, _oracle, consumer) = setup_test();
        let client = RandomnessBridgeClient::new(&env, &bridge_id);

        client.request(&consumer, &1, &seed(&env, 1));
        client.request(&consumer, &1, &seed(&env, 2));
    }

    #[test]
    fn test_independent_consumer_ids() {
        let (env, bridge_id, _admin, _oracle, consumer) = setup_test();
        let client = RandomnessBridgeClient::new(&env, &bridge_id);

        assert_eq!(client.request(&consumer, &1, &seed(&env, 1)), 1);
        assert_eq!(client.request(&consumer, &2, &seed(&env, 1)), 2);
    }

    #[test]
    fn test_request_allowed_again_after_expiry() {
        let (env, bridge_id, _admin, oracle, consumer) = setup_test();
        let client = RandomnessBridgeClient::new(&env, &bridge_id);

        let first = client.request(&consumer, &1, &seed(&env, 1));
        env.ledger().set_timestamp(START + EXPIRY);
        let second = client.request(&consumer, &1, &seed(&env, 2));

        assert_eq!(second, first + 1);
        assert_eq!(client.get_request(&first).status, RequestStatus::Superseded);
        assert_eq!(client.pending_request(&consumer, &1), Some(second));

        // The superseded request can no longer be fulfilled.
        let result = client.try_fulfill(&oracle, &first, &seed(&env, 9));
        assert_eq!(result, Err(Ok(BridgeError::UnknownRequest)));
    }

    #[test]
    #[should_panic(expected = "Error(Contract, #4)")] // RequestAlreadyPending = 4
    fn test_no_expiry_means_pending_forever() {
        let (env, bridge_id, admin, _oracle, consumer) = setup_test();
        let client = RandomnessBridgeClient::new(&env, &bridge_id);
        client.set_request_expiry(&admin, &0);

        client.request(&consumer, &1, &seed(&env, 1));
        env.ledger().set_timestamp(START + 10 * EXPIRY);
        client.request(&consumer, &1, &seed(&env, 2));
    }

    #[test]
    fn test_resending_same_fulfillment_is_noop() {
        let (env, bridge_id, _admin, oracle, consumer) = setup_test();
        let client = RandomnessBridgeClient::new(&env, &bridge_id);
        let consumer_client = MockConsumerClient::new(&env, &consumer);

        let request_id = client.request(&consumer, &1, &seed(&env, 1));
        let value = seed(&env, 42);
        client.fulfill(&oracle, &request_id, &value);
        client.fulfill(&oracle, &request_id, &value);

        assert_eq!(consumer_client.calls(), 1);
    }

    #[test]
    #[should_panic(expected = "Error(Contract, #5)")] // UnknownRequest = 5
    fn test_conflicting_refulfillment_rejected() {
        let (env, bridge_id, _admin, oracle, consumer) = setup_test();
        let client = RandomnessBridgeClient::new(&env, &bridge_id);

        let request_id = client.request(&consumer, &1, &seed(&env, 1));
        client.fulfill(&oracle, &request_id, &seed(&env, 42));
        client.fulfill(&oracle, &request_id, &seed(&env, 43));
    }

    #[test]
    #[should_panic(expected = "Error(Contract, #5)")] // UnknownRequest = 5
    fn test_fulfill_unknown_request() {
        let (env, bridge_id, _admin, oracle, _consumer) = setup_test();
        let client = RandomnessBridgeClient::new(&env, &bridge_id);

        client.fulfill(&oracle, &99, &seed(&env, 42));
    }

    #[test]
    #[should_panic(expected = "Error(Contract, #3)")] // NotAuthorized = 3
    fn test_fulfill_by_non_oracle() {
        let (env, bridge_id, _admin, _oracle, consumer) = setup_test();
        let client = RandomnessBridgeClient::new(&env, &bridge_id);

        let request_id = client.request(&consumer, &1, &seed(&env, 1));
        let attacker = Address::generate(&env);
        client.fulfill(&attacker, &request_id, &seed(&env, 42));
    }

    #[test]
    #[should_panic(expected = "Error(Contract, #3)")] // NotAuthorized = 3
    fn test_request_from_unregistered_consumer() {
        let (env, bridge_id, _admin, _oracle, _consumer) = setup_test();
        let client = RandomnessBridgeClient::new(&env, &bridge_id);

        let stranger = env.register(MockConsumer, ());
        client.request(&stranger, &1, &seed(&env, 1));
    }

    #[test]
    fn test_revoked_consumer_cannot_request() {
        let (env, bridge_id, admin, _oracle, consumer) = setup_test();
        let client = RandomnessBridgeClient::new(&env, &bridge_id);

        client.set_consumer(&admin, &consumer, &false);
        let result = client.try_request(&consumer, &1, &seed(&env, 1));
        assert_eq!(result, Err(Ok(BridgeError::NotAuthorized)));
    }

    #[test]
    fn test_failed_callback_still_fulfills_and_frees_slot() {
        let (env, bridge_id, admin, oracle, _consumer) = setup_test();
        let client = RandomnessBridgeClient::new(&env, &bridge_id);

        let rejecting = env.register(RejectingConsumer, ());
        client.set_consumer(&admin, &rejecting, &true);

        let request_id = client.request(&rejecting, &1, &seed(&env, 1));
        client.fulfill(&oracle, &request_id, &seed(&env, 42));

        assert_eq!(client.get_request(&request_id).status, RequestStatus::Fulfilled);
        assert_eq!(client.pending_request(&rejecting, &1), None);
        assert_eq!(client.request(&rejecting, &1, &seed(&env, 2)), request_id + 1);
    }

    #[test]
    fn test_rejecting_consumer_does_not_affect_others() {
        let (env, bridge_id, admin, oracle, consumer) = setup_test();
        let client = RandomnessBridgeClient::new(&env, &bridge_id);
        let consumer_client = MockConsumerClient::new(&env, &consumer);

        let rejecting = env.register(RejectingConsumer, ());
        client.set_consumer(&admin, &rejecting, &true);

        let rejected_id = client.request(&rejecting, &1, &seed(&env, 1));
        let accepted_id = client.request(&consumer, &1, &seed(&env, 2));

        client.fulfill(&oracle, &rejected_id, &seed(&env, 42));
        client.fulfill(&oracle, &accepted_id, &seed(&env, 43));

        assert_eq!(consumer_client.calls(), 1);
        assert_eq!(
            consumer_client.last(),
            Some((1, accepted_id, seed(&env, 43)))
        );
        assert_eq!(client.get_request(&rejected_id).status, RequestStatus::Fulfilled);
        assert_eq!(client.get_request(&accepted_id).status, RequestStatus::Fulfilled);
    }

    #[test]
    fn test_set_oracle() {
        let (env, bridge_id, admin, _oracle, consumer) = setup_test();
        let client = RandomnessBridgeClient::new(&env, &bridge_id);

        let new_oracle = Address::generate(&env);
        client.set_oracle(&admin, &new_oracle);
        assert_eq!(client.get_oracle(), new_oracle);

        let request_id = client.request(&consumer, &1, &seed(&env, 1));
        client.fulfill(&new_oracle, &request_id, &seed(&env, 42));
        assert_eq!(client.get_request(&request_id).status, RequestStatus::Fulfilled);
    }
}
