//! Weighted winner selection.
//!
//! Every participant holds a weight (tickets scaled by boosts) at its slot,
//! in order of first purchase. Weights are stored in chunks of
//! PARTICIPANT_CHUNK slots next to a running total per chunk, both updated at
//! purchase time. For prize `i` a sub-seed `sha256(random_value || i)` is
//! reduced modulo the remaining weight; the winner is the first slot whose
//! cumulative weight is strictly greater than that target. The walk goes
//! over the chunk totals first and then inside a single chunk, so a draw
//! touches at most one weight chunk per prize. With distinct winners the
//! chosen slot's weight is removed before the next prize. Prizes left over
//! once all weight is exhausted stay unassigned.

use soroban_sdk::{Bytes, BytesN, Env, Map, Vec};

use crate::error::LotteryError;
use crate::storage::{Participant, PARTICIPANT_CHUNK};

/// `tickets * (1 + boosts * boost_factor)`
pub fn participant_weight(entry: &Participant, boost_factor: u32) -> Result<u128, LotteryError> {
    let multiplier = (entry.boosts as u128)
        .checked_mul(boost_factor as u128)
        .and_then(|b| b.checked_add(1))
        .ok_or(LotteryError::Overflow)?;
    (entry.tickets as u128)
        .checked_mul(multiplier)
        .ok_or(LotteryError::Overflow)
}

/// Seed the draw request: the bridge mixes it with its own key material.
pub fn draw_seed(env: &Env, lottery_id: u32, attempt: u32) -> BytesN<32> {
    let mut data = Bytes::new(env);
    data.extend_from_array(&lottery_id.to_be_bytes());
    data.extend_from_array(&env.ledger().timestamp().to_be_bytes());
    data.extend_from_array(&env.ledger().sequence().to_be_bytes());
    data.extend_from_array(&attempt.to_be_bytes());
    env.crypto().sha256(&data).to_bytes()
}

/// Per-prize value derived from the delivered randomness.
pub fn prize_entropy(env: &Env, random_value: &BytesN<32>, prize_index: u32) -> u128 {
    let mut data = Bytes::from_array(env, &random_value.to_array());
    data.extend_from_array(&prize_index.to_be_bytes());
    let digest = env.crypto().sha256(&data).to_array();

    let mut head = [0u8; 16];
    head.copy_from_slice(&digest[..16]);
    u128::from_be_bytes(head)
}

/// First index whose cumulative value is strictly greater than `target`,
/// with the target rebased to that element.
pub fn locate(values: &Vec<u128>, target: u128) -> Result<(u32, u128), LotteryError> {
    let mut rest = target;
    for (index, value) in values.iter().enumerate() {
        if rest < value {
            return Ok((index as u32, rest));
        }
        rest -= value;
    }
    Err(LotteryError::StorageCorrupted)
}

/// Pick a winning slot for each of `prize_count` prizes.
///
/// `totals` holds one weight sum per chunk; `load_chunk` fetches the
/// weights of a chunk and is called at most once per chunk.
pub fn select_slots<F>(
    env: &Env,
    totals: &Vec<u128>,
    mut load_chunk: F,
    prize_count: u32,
    random_value: &BytesN<32>,
    distinct_winners: bool,
) -> Result<Vec<Option<u32>>, LotteryError>
where
    F: FnMut(u32) -> Result<Vec<u128>, LotteryError>,
{
    let mut totals = totals.clone();
    let mut remaining = 0u128;
    for total in totals.iter() {
        remaining = remaining
            .checked_add(total)
            .ok_or(LotteryError::Overflow)?;
    }

    let mut chunks: Map<u32, Vec<u128>> = Map::new(env);
    let mut slots = Vec::new(env);
    for index in 0..prize_count {
        if remaining == 0 {
            slots.push_back(None);
            continue;
        }

        let target = prize_entropy(env, random_value, index) % remaining;
        let (chunk, rest) = locate(&totals, target)?;
        let mut weights = match chunks.get(chunk) {
            Some(weights) => weights,
            None => load_chunk(chunk)?,
        };
        let (position, _) = locate(&weights, rest)?;

        if distinct_winners {
            let removed = weights.get_unchecked(position);
            weights.set(position, 0);
            totals.set(chunk, totals.get_unchecked(chunk) - removed);
            remaining -= removed;
        }
        chunks.set(chunk, weights);

        slots.push_back(Some(chunk * PARTICIPANT_CHUNK + position));
    }

    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use soroban_sdk::vec;

    /// Chunk totals and a loader over `weights` laid out by slot.
    fn layout(env: &Env, weights: &[u128]) -> (Vec<u128>, Map<u32, Vec<u128>>) {
        let mut totals = Vec::new(env);
        let mut chunks = Map::new(env);
        for (chunk, part) in weights.chunks(PARTICIPANT_CHUNK as usize).enumerate() {
            let chunk_weights = Vec::from_slice(env, part);
            totals.push_back(part.iter().sum());
            chunks.set(chunk as u32, chunk_weights);
        }
        (totals, chunks)
    }

    fn select(
        env: &Env,
        weights: &[u128],
        prize_count: u32,
        seed: u8,
        distinct: bool,
    ) -> Vec<Option<u32>> {
        let (totals, chunks) = layout(env, weights);
        let value = BytesN::from_array(env, &[seed; 32]);
        select_slots(
            env,
            &totals,
            |chunk| chunks.get(chunk).ok_or(LotteryError::StorageCorrupted),
            prize_count,
            &value,
            distinct,
        )
        .unwrap()
    }

    #[test]
    fn test_weight_formula() {
        let entry = Participant {
            tickets: 3,
            boosts: 2,
            slot: 0,
        };
        assert_eq!(participant_weight(&entry, 1).unwrap(), 9);
        assert_eq!(participant_weight(&entry, 0).unwrap(), 3);
        assert_eq!(participant_weight(&Participant::default(), 5).unwrap(), 0);
    }

    #[test]
    fn test_locate_strictly_greater() {
        let env = Env::default();
        let weights = vec![&env, 2u128, 3, 1];
        assert_eq!(locate(&weights, 0), Ok((0, 0)));
        assert_eq!(locate(&weights, 1), Ok((0, 1)));
        assert_eq!(locate(&weights, 2), Ok((1, 0)));
        assert_eq!(locate(&weights, 4), Ok((1, 2)));
        assert_eq!(locate(&weights, 5), Ok((2, 0)));
        assert_eq!(locate(&weights, 6), Err(LotteryError::StorageCorrupted));
    }

    #[test]
    fn test_locate_skips_zero_weight() {
        let env = Env::default();
        // second participant already removed
        let weights = vec![&env, 2u128, 0, 1];
        assert_eq!(locate(&weights, 2), Ok((2, 0)));
    }

    #[test]
    fn test_assignment_is_deterministic() {
        let env = Env::default();
        let weights = [1u128, 3, 2, 5];
        assert_eq!(
            select(&env, &weights, 3, 7, true),
            select(&env, &weights, 3, 7, true)
        );
    }

    #[test]
    fn test_distinct_winners() {
        let env = Env::default();
        let slots = select(&env, &[1, 1, 1], 3, 42, true);
        let a = slots.get_unchecked(0).unwrap();
        let b = slots.get_unchecked(1).unwrap();
        let c = slots.get_unchecked(2).unwrap();
        assert!(a != b && b != c && a != c);
    }

    #[test]
    fn test_leftover_prizes_unassigned() {
        let env = Env::default();
        let slots = select(&env, &[4], 2, 1, true);
        assert_eq!(slots, vec![&env, Some(0u32), None]);
    }

    #[test]
    fn test_repeat_winners_allowed() {
        let env = Env::default();
        let slots = select(&env, &[1], 2, 9, false);
        assert_eq!(slots, vec![&env, Some(0u32), Some(0u32)]);
    }

    #[test]
    fn test_zero_weight_never_wins() {
        let env = Env::default();
        for seed in 0u8..16 {
            let slots = select(&env, &[0, 5, 0], 1, seed, true);
            assert_eq!(slots.get_unchecked(0), Some(1));
        }
    }

    #[test]
    fn test_slots_span_chunks() {
        let env = Env::default();
        // Only the first slot of the second chunk and the last slot of the
        // third chunk carry weight.
        let mut weights = [0u128; 3 * PARTICIPANT_CHUNK as usize];
        let second = PARTICIPANT_CHUNK as usize;
        let last = weights.len() - 1;
        weights[second] = 1;
        weights[last] = 1;

        let slots = select(&env, &weights, 3, 5, true);
        let a = slots.get_unchecked(0).unwrap();
        let b = slots.get_unchecked(1).unwrap();
        assert!(a != b);
        for slot in [a, b] {
            assert!(slot == second as u32 || slot == last as u32);
        }
        assert_eq!(slots.get_unchecked(2), None);
    }

    #[test]
    fn test_chunk_loaded_once() {
        let env = Env::default();
        let (totals, chunks) = layout(&env, &[1, 1, 1, 1]);
        let value = BytesN::from_array(&env, &[3u8; 32]);
        let mut loads = 0u32;
        let slots = select_slots(
            &env,
            &totals,
            |chunk| {
                loads += 1;
                chunks.get(chunk).ok_or(LotteryError::StorageCorrupted)
            },
            4,
            &value,
            true,
        )
        .unwrap();
        assert_eq!(loads, 1);
        assert_eq!(slots.len(), 4);
    }

    #[test]
    fn test_totals_out_of_sync() {
        let env = Env::default();
        let totals = vec![&env, 5u128];
        let value = BytesN::from_array(&env, &[0u8; 32]);
        let result = select_slots(
            &env,
            &totals,
            |_| Ok(vec![&env, 0u128]),
            1,
            &value,
            true,
        );
        assert_eq!(result, Err(LotteryError::StorageCorrupted));
    }
}
