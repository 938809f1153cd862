use soroban_sdk::{symbol_short, Address, BytesN, Env};

/// Picked up by the off-chain oracle, which answers through `fulfill`.
pub fn randomness_requested(
    env: &Env,
    request_id: u64,
    consumer: Address,
    consumer_id: u64,
    seed: BytesN<32>,
    key_hash: BytesN<32>,
) {
    env.events().publish(
        (symbol_short!("rand_req"), consumer, consumer_id),
        (request_id, seed, key_hash),
    );
}

pub fn randomness_fulfilled(env: &Env, request_id: u64, random_value: BytesN<32>, delivered: bool) {
    env.events()
        .publish((symbol_short!("rand_ful"), request_id), (random_value, delivered));
}
