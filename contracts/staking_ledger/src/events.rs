use soroban_sdk::{symbol_short, Address, Env};

pub fn pool_created(env: &Env, pool_id: u32, max_stake: i128, reward_rate: i128) {
    env.events()
        .publish((symbol_short!("pool_new"), pool_id), (max_stake, reward_rate));
}

pub fn staked(env: &Env, pool_id: u32, staker: Address, amount: i128, total_staked: i128) {
    env.events()
        .publish((symbol_short!("staked"), pool_id, staker), (amount, total_staked));
}

pub fn unstaked(env: &Env, pool_id: u32, staker: Address, amount: i128, reward: i128) {
    env.events()
        .publish((symbol_short!("unstaked"), pool_id, staker), (amount, reward));
}

pub fn reward_claimed(env: &Env, pool_id: u32, staker: Address, reward: i128) {
    env.events()
        .publish((symbol_short!("claimed"), pool_id, staker), reward);
}

pub fn controller_paid(env: &Env, pool_id: u32, controller: Address, amount: i128) {
    env.events()
        .publish((symbol_short!("ctrl_pay"), pool_id, controller), amount);
}

pub fn rewards_funded(env: &Env, from: Address, amount: i128, reserve: i128) {
    env.events()
        .publish((symbol_short!("funded"), from), (amount, reserve));
}
