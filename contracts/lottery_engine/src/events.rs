use soroban_sdk::{symbol_short, Address, BytesN, Env};

pub fn lottery_created(env: &Env, lottery_id: u32, start_time: u64, close_time: u64, prizes: u32) {
    env.events().publish(
        (symbol_short!("lot_new"), lottery_id),
        (start_time, close_time, prizes),
    );
}

pub fn tickets_bought(env: &Env, lottery_id: u32, participant: Address, count: u32, tickets: u32) {
    env.events()
        .publish((symbol_short!("tickets"), lottery_id, participant), (count, tickets));
}

pub fn participant_boosted(env: &Env, lottery_id: u32, participant: Address, boosts: u32) {
    env.events()
        .publish((symbol_short!("boosted"), lottery_id, participant), boosts);
}

pub fn draw_requested(env: &Env, lottery_id: u32, request_id: u64, attempt: u32) {
    env.events()
        .publish((symbol_short!("draw_req"), lottery_id), (request_id, attempt));
}

pub fn lottery_resolved(env: &Env, lottery_id: u32, random_value: BytesN<32>, winners: u32) {
    env.events()
        .publish((symbol_short!("resolved"), lottery_id), (random_value, winners));
}

pub fn prize_redeemed(env: &Env, lottery_id: u32, winner: Address, prize_id: u32) {
    env.events()
        .publish((symbol_short!("redeemed"), lottery_id, winner), prize_id);
}
