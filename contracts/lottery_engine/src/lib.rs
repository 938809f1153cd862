#![no_std]

mod draw;
mod error;
mod events;
mod storage;
mod uri;

pub use error::LotteryError;
pub use storage::{
    DrawResult, Lottery, LotteryConfig, LotteryPhase, Participant, PendingDraw, PrizeAssignment,
};

use soroban_sdk::{
    contract, contractclient, contractimpl, log, token, Address, Bytes, BytesN, Env, Error,
    IntoVal, Map, String, Val, Vec,
};
use storage::{
    DataKey, BRIDGE_REQUEST_PENDING, BUMP_AMOUNT, BUMP_THRESHOLD, PARTICIPANT_CHUNK, PRIZE_QUANTITY,
};

/// Randomness bridge entry point used to start a draw.
#[contractclient(name = "RandomnessSourceClient")]
pub trait RandomnessSource {
    fn request(env: Env, consumer: Address, consumer_id: u64, seed: BytesN<32>) -> u64;
}

/// Multi-token NFT contract the prizes are minted from. The lottery must be
/// allowed to mint on it.
#[contractclient(name = "PrizeNftClient")]
pub trait PrizeNft {
    fn mint(env: Env, to: Address, id: u32, quantity: i128, data: Bytes);
    fn uri(env: Env, id: u32) -> String;
}

/// Lottery Engine Contract
///
/// Runs time-boxed NFT lotteries:
/// - Participants buy tickets (and optional boosts) while a lottery is open
/// - After close the admin requests randomness from the bridge
/// - The bridge calls back `receive_randomness`, which draws the winners
/// - Winners redeem their prize, minted from the lottery's NFT contract
///
/// Phases only move forward: Open -> Closed -> DrawRequested -> Resolved.
/// Closed is not stored; it is an Open lottery whose close time has passed.
#[contract]
pub struct LotteryEngine;

#[contractimpl]
impl LotteryEngine {
    /// Constructor: delegates to initialize() for the actual setup logic.
    pub fn __constructor(
        env: Env,
        admin: Address,
        randomness: Address,
        payment_token: Address,
        config: LotteryConfig,
    ) {
        Self::initialize(env, admin, randomness, payment_token, config)
            .expect("initialization failed");
    }

    /// Initialize the engine.
    ///
    /// # Arguments
    /// * `admin` - Address allowed to create lotteries and trigger draws
    /// * `randomness` - Randomness bridge contract
    /// * `payment_token` - Token tickets and boosts are paid in
    /// * `config` - Boost and winner policy copied into new lotteries
    pub fn initialize(
        env: Env,
        admin: Address,
        randomness: Address,
        payment_token: Address,
        config: LotteryConfig,
    ) -> Result<(), LotteryError> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(LotteryError::AlreadyInitialized);
        }

        admin.require_auth();

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Randomness, &randomness);
        env.storage()
            .instance()
            .set(&DataKey::PaymentToken, &payment_token);
        env.storage().instance().set(&DataKey::Config, &config);
        env.storage().instance().set(&DataKey::LastLotteryId, &0u32);
        Self::bump_instance(&env);

        Ok(())
    }

    /// Replace the policy applied to lotteries created from now on (admin only).
    pub fn set_config(env: Env, admin: Address, config: LotteryConfig) -> Result<(), LotteryError> {
        Self::require_initialized(&env)?;
        Self::require_admin(&env, &admin)?;

        admin.require_auth();

        env.storage().instance().set(&DataKey::Config, &config);

        Ok(())
    }

    /// Point the engine at another randomness bridge (admin only).
    pub fn set_randomness_source(
        env: Env,
        admin: Address,
        randomness: Address,
    ) -> Result<(), LotteryError> {
        Self::require_initialized(&env)?;
        Self::require_admin(&env, &admin)?;

        admin.require_auth();

        env.storage().instance().set(&DataKey::Randomness, &randomness);

        Ok(())
    }

    /// Create a lottery (admin only).
    ///
    /// # Arguments
    /// * `cost_per_ticket` - Price of one ticket in the payment token (0 = free)
    /// * `boost_cost` - Price of one boost (0 = free)
    /// * `start_time` / `close_time` - Ticket window, close exclusive
    /// * `nft_contract` - Contract the prizes are minted from
    /// * `prize_ids` - Distinct prize token ids, drawn in this order
    /// * `max_participants` - Participant cap (0 = unlimited)
    /// * `metadata_uri` - Prize metadata URI template with `{id}` placeholder
    ///
    /// # Returns
    /// The new lottery id (sequential from 1)
    #[allow(clippy::too_many_arguments)]
    pub fn create_new_lottery(
        env: Env,
        admin: Address,
        cost_per_ticket: i128,
        boost_cost: i128,
        start_time: u64,
        close_time: u64,
        nft_contract: Address,
        prize_ids: Vec<u32>,
        max_participants: u32,
        metadata_uri: String,
    ) -> Result<u32, LotteryError> {
        Self::require_initialized(&env)?;
        Self::require_admin(&env, &admin)?;

        admin.require_auth();

        if close_time <= start_time {
            return Err(LotteryError::InvalidWindow);
        }
        if prize_ids.is_empty() {
            return Err(LotteryError::EmptyPrizeList);
        }
        for i in 0..prize_ids.len() {
            for j in (i + 1)..prize_ids.len() {
                if prize_ids.get_unchecked(i) == prize_ids.get_unchecked(j) {
                    return Err(LotteryError::DuplicatePrize);
                }
            }
        }
        if cost_per_ticket < 0 || boost_cost < 0 || metadata_uri.len() > uri::MAX_URI_LEN {
            return Err(LotteryError::InvalidParameters);
        }

        let config: LotteryConfig = env
            .storage()
            .instance()
            .get(&DataKey::Config)
            .ok_or(LotteryError::StorageCorrupted)?;
        let last_id: u32 = env
            .storage()
            .instance()
            .get(&DataKey::LastLotteryId)
            .ok_or(LotteryError::StorageCorrupted)?;
        let lottery_id = last_id.checked_add(1).ok_or(LotteryError::Overflow)?;

        let prize_count = prize_ids.len();
        let lottery = Lottery {
            id: lottery_id,
            cost_per_ticket,
            boost_cost,
            start_time,
            close_time,
            nft_contract,
            prize_ids,
            max_participants,
            metadata_uri,
            phase: LotteryPhase::Open,
            participant_count: 0,
            total_tickets: 0,
            total_weight: 0,
            proceeds: 0,
            config,
        };
        Self::save_lottery(&env, &lottery);

        env.storage()
            .instance()
            .set(&DataKey::LastLotteryId, &lottery_id);
        Self::bump_instance(&env);

        events::lottery_created(&env, lottery_id, start_time, close_time, prize_count);

        Ok(lottery_id)
    }

    /// Buy `count` tickets for `participant`, paid by the participant.
    ///
    /// # Returns
    /// The participant's ticket count after the purchase
    pub fn buy_tickets(
        env: Env,
        participant: Address,
        lottery_id: u32,
        count: u32,
    ) -> Result<u32, LotteryError> {
        Self::require_initialized(&env)?;

        participant.require_auth();

        if count == 0 {
            return Err(LotteryError::InvalidAmount);
        }

        let mut lottery = Self::load_lottery(&env, lottery_id)?;
        Self::require_open(&env, &lottery)?;

        let entry_key = DataKey::Entry(lottery_id, participant.clone());
        let existing: Option<Participant> = env.storage().persistent().get(&entry_key);
        let is_new = existing.is_none();
        let mut entry = existing.unwrap_or_default();

        if is_new && lottery.max_participants > 0 && lottery.participant_count >= lottery.max_participants
        {
            return Err(LotteryError::LotteryFull);
        }

        let cost = lottery
            .cost_per_ticket
            .checked_mul(count as i128)
            .ok_or(LotteryError::Overflow)?;
        Self::collect_payment(&env, &participant, cost)?;
        if is_new {
            entry.slot = Self::enroll(&env, &mut lottery, &participant)?;
        }

        let old_weight = draw::participant_weight(&entry, lottery.config.boost_factor)?;
        entry.tickets = entry
            .tickets
            .checked_add(count)
            .ok_or(LotteryError::Overflow)?;
        let new_weight = draw::participant_weight(&entry, lottery.config.boost_factor)?;

        lottery.total_tickets = lottery
            .total_tickets
            .checked_add(count)
            .ok_or(LotteryError::Overflow)?;
        lottery.total_weight = lottery
            .total_weight
            .checked_sub(old_weight)
            .and_then(|w| w.checked_add(new_weight))
            .ok_or(LotteryError::Overflow)?;
        lottery.proceeds = lottery
            .proceeds
            .checked_add(cost)
            .ok_or(LotteryError::Overflow)?;
        Self::set_weight(&env, lottery_id, entry.slot, old_weight, new_weight)?;

        env.storage().persistent().set(&entry_key, &entry);
        env.storage()
            .persistent()
            .extend_ttl(&entry_key, BUMP_THRESHOLD, BUMP_AMOUNT);
        Self::save_lottery(&env, &lottery);

        events::tickets_bought(&env, lottery_id, participant, count, entry.tickets);

        Ok(entry.tickets)
    }

    /// Buy a single ticket.
    pub fn buy_one_ticket(
        env: Env,
        participant: Address,
        lottery_id: u32,
    ) -> Result<u32, LotteryError> {
        Self::buy_tickets(env, participant, lottery_id, 1)
    }

    /// Boost an existing participant's odds, paid by `payer`.
    ///
    /// # Returns
    /// The participant's boost count after the purchase
    pub fn boost_participant(
        env: Env,
        payer: Address,
        lottery_id: u32,
        participant: Address,
    ) -> Result<u32, LotteryError> {
        Self::require_initialized(&env)?;

        payer.require_auth();

        let mut lottery = Self::load_lottery(&env, lottery_id)?;
        Self::require_open(&env, &lottery)?;

        let entry_key = DataKey::Entry(lottery_id, participant.clone());
        let mut entry: Participant = match env.storage().persistent().get(&entry_key) {
            Some(entry) => entry,
            None => return Err(LotteryError::NotAParticipant),
        };
        if entry.tickets == 0 {
            return Err(LotteryError::NotAParticipant);
        }
        if lottery.config.max_boosts > 0 && entry.boosts >= lottery.config.max_boosts {
            return Err(LotteryError::BoostLimitReached);
        }

        Self::collect_payment(&env, &payer, lottery.boost_cost)?;

        let old_weight = draw::participant_weight(&entry, lottery.config.boost_factor)?;
        entry.boosts = entry.boosts.checked_add(1).ok_or(LotteryError::Overflow)?;
        let new_weight = draw::participant_weight(&entry, lottery.config.boost_factor)?;

        lottery.total_weight = lottery
            .total_weight
            .checked_sub(old_weight)
            .and_then(|w| w.checked_add(new_weight))
            .ok_or(LotteryError::Overflow)?;
        lottery.proceeds = lottery
            .proceeds
            .checked_add(lottery.boost_cost)
            .ok_or(LotteryError::Overflow)?;
        Self::set_weight(&env, lottery_id, entry.slot, old_weight, new_weight)?;

        env.storage().persistent().set(&entry_key, &entry);
        env.storage()
            .persistent()
            .extend_ttl(&entry_key, BUMP_THRESHOLD, BUMP_AMOUNT);
        Self::save_lottery(&env, &lottery);

        events::participant_boosted(&env, lottery_id, participant, entry.boosts);

        Ok(entry.boosts)
    }

    /// Request the winning randomness for a closed lottery (admin only).
    ///
    /// A lottery whose previous request is still in flight can be re-drawn
    /// once the bridge lets that request expire, or right away when the
    /// bridge delivered it but the callback was rejected.
    ///
    /// # Returns
    /// The bridge request id
    pub fn draw_winning_numbers(
        env: Env,
        admin: Address,
        lottery_id: u32,
    ) -> Result<u64, LotteryError> {
        Self::require_initialized(&env)?;
        Self::require_admin(&env, &admin)?;

        admin.require_auth();

        let mut lottery = Self::load_lottery(&env, lottery_id)?;
        let redraw = match Self::effective_phase(&env, &lottery) {
            LotteryPhase::Open => return Err(LotteryError::LotteryStillOpen),
            LotteryPhase::Resolved => return Err(LotteryError::AlreadyDrawn),
            LotteryPhase::Closed => false,
            LotteryPhase::DrawRequested => true,
        };
        if lottery.participant_count == 0 {
            return Err(LotteryError::NoParticipants);
        }

        let draw_key = DataKey::DrawRequest(lottery_id);
        let attempt = env
            .storage()
            .persistent()
            .get::<_, PendingDraw>(&draw_key)
            .map_or(0, |pending| pending.attempts)
            .checked_add(1)
            .ok_or(LotteryError::Overflow)?;
        let seed = draw::draw_seed(&env, lottery_id, attempt);

        let randomness: Address = env
            .storage()
            .instance()
            .get(&DataKey::Randomness)
            .ok_or(LotteryError::StorageCorrupted)?;
        let bridge = RandomnessSourceClient::new(&env, &randomness);
        let request_id = match bridge.try_request(
            &env.current_contract_address(),
            &(lottery_id as u64),
            &seed,
        ) {
            Ok(Ok(request_id)) => request_id,
            // Still pending on the bridge side: the draw is in flight.
            Err(Ok(error)) if redraw && error == Error::from_contract_error(BRIDGE_REQUEST_PENDING) => {
                return Err(LotteryError::AlreadyDrawn)
            }
            _ => return Err(LotteryError::RandomnessRequestFailed),
        };

        env.storage().persistent().set(
            &draw_key,
            &PendingDraw {
                request_id,
                attempts: attempt,
                requested_at: env.ledger().timestamp(),
            },
        );
        env.storage()
            .persistent()
            .extend_ttl(&draw_key, BUMP_THRESHOLD, BUMP_AMOUNT);

        lottery.phase = LotteryPhase::DrawRequested;
        Self::save_lottery(&env, &lottery);

        log!(&env, "lottery {} draw attempt {}", lottery_id, attempt);
        events::draw_requested(&env, lottery_id, request_id, attempt);

        Ok(request_id)
    }

    /// Randomness callback, invoked by the bridge only.
    ///
    /// # Arguments
    /// * `consumer_id` - Lottery id the request was made for
    /// * `request_id` - Must match the lottery's latest request
    /// * `random_value` - Oracle-provided randomness
    pub fn receive_randomness(
        env: Env,
        consumer_id: u64,
        request_id: u64,
        random_value: BytesN<32>,
    ) -> Result<(), LotteryError> {
        Self::require_initialized(&env)?;

        let randomness: Address = env
            .storage()
            .instance()
            .get(&DataKey::Randomness)
            .ok_or(LotteryError::StorageCorrupted)?;
        randomness.require_auth();

        let lottery_id = u32::try_from(consumer_id).map_err(|_| LotteryError::UnknownLottery)?;
        let lottery = Self::load_lottery(&env, lottery_id)?;
        if lottery.phase != LotteryPhase::DrawRequested {
            return Err(LotteryError::NotDrawRequested);
        }

        let pending: PendingDraw = env
            .storage()
            .persistent()
            .get(&DataKey::DrawRequest(lottery_id))
            .ok_or(LotteryError::StorageCorrupted)?;
        if pending.request_id != request_id {
            return Err(LotteryError::UnknownRequest);
        }

        Self::finalize(&env, lottery, request_id, random_value)
    }

    /// Winner status of an address.
    ///
    /// # Returns
    /// (is_winner, prize_id, claimed): the first unredeemed prize, or the
    /// first prize when all are redeemed. (false, 0, false) for non-winners.
    /// With repeat winners the reported prize moves on as prizes are
    /// redeemed; `get_prizes_won` lists them all.
    pub fn is_address_winner(
        env: Env,
        lottery_id: u32,
        address: Address,
    ) -> Result<(bool, u32, bool), LotteryError> {
        let won = Self::get_prizes_won(env, lottery_id, address)?;

        for assignment in won.iter() {
            if !assignment.claimed {
                return Ok((true, assignment.prize_id, false));
            }
        }

        Ok(match won.first() {
            Some(assignment) => (true, assignment.prize_id, true),
            None => (false, 0, false),
        })
    }

    /// Every prize assigned to an address, in draw order.
    pub fn get_prizes_won(
        env: Env,
        lottery_id: u32,
        address: Address,
    ) -> Result<Vec<PrizeAssignment>, LotteryError> {
        let result = Self::load_result(&env, lottery_id)?;
        let mut won = Vec::new(&env);
        for assignment in result.assignments.iter() {
            if assignment.winner.as_ref() == Some(&address) {
                won.push_back(assignment);
            }
        }
        Ok(won)
    }

    /// Mint the winner's next unredeemed prize.
    ///
    /// # Returns
    /// The redeemed prize id
    pub fn redeem_nft(env: Env, winner: Address, lottery_id: u32) -> Result<u32, LotteryError> {
        winner.require_auth();

        let lottery = Self::load_lottery(&env, lottery_id)?;
        let mut result = Self::load_result(&env, lottery_id)?;

        let mut has_won = false;
        let mut target: Option<(u32, PrizeAssignment)> = None;
        for (index, assignment) in result.assignments.iter().enumerate() {
            if assignment.winner.as_ref() != Some(&winner) {
                continue;
            }
            has_won = true;
            if !assignment.claimed {
                target = Some((index as u32, assignment));
                break;
            }
        }
        if !has_won {
            return Err(LotteryError::NotAWinner);
        }
        let (index, mut assignment) = target.ok_or(LotteryError::AlreadyClaimed)?;

        // Flag before minting.
        assignment.claimed = true;
        let prize_id = assignment.prize_id;
        result.assignments.set(index, assignment);
        Self::save_result(&env, lottery_id, &result);

        PrizeNftClient::new(&env, &lottery.nft_contract).mint(
            &winner,
            &prize_id,
            &PRIZE_QUANTITY,
            &Bytes::new(&env),
        );

        events::prize_redeemed(&env, lottery_id, winner, prize_id);

        Ok(prize_id)
    }

    /// Withdraw a resolved lottery's ticket and boost proceeds (admin only).
    ///
    /// # Returns
    /// Amount transferred to `to`
    pub fn withdraw_proceeds(
        env: Env,
        admin: Address,
        lottery_id: u32,
        to: Address,
    ) -> Result<i128, LotteryError> {
        Self::require_initialized(&env)?;
        Self::require_admin(&env, &admin)?;

        admin.require_auth();

        let mut lottery = Self::load_lottery(&env, lottery_id)?;
        if lottery.phase != LotteryPhase::Resolved {
            return Err(LotteryError::LotteryNotResolved);
        }
        if lottery.proceeds == 0 {
            return Err(LotteryError::NothingToWithdraw);
        }

        let amount = lottery.proceeds;
        lottery.proceeds = 0;
        Self::save_lottery(&env, &lottery);

        let token_client = token::Client::new(&env, &Self::payment_token(&env)?);
        token_client.transfer(&env.current_contract_address(), &to, &amount);

        Ok(amount)
    }

    // --- Read-only methods ---

    pub fn get_current_lottery_id(env: Env) -> u32 {
        env.storage()
            .instance()
            .get(&DataKey::LastLotteryId)
            .unwrap_or(0)
    }

    /// Lottery record, with Closed reported once the close time has passed.
    pub fn get_lottery_info(env: Env, lottery_id: u32) -> Result<Lottery, LotteryError> {
        let mut lottery = Self::load_lottery(&env, lottery_id)?;
        lottery.phase = Self::effective_phase(&env, &lottery);
        Ok(lottery)
    }

    pub fn get_number_of_participants(env: Env, lottery_id: u32) -> Result<u32, LotteryError> {
        Ok(Self::load_lottery(&env, lottery_id)?.participant_count)
    }

    /// Sum of all participant weights (tickets including boosts).
    pub fn get_total_entries(env: Env, lottery_id: u32) -> Result<u128, LotteryError> {
        Ok(Self::load_lottery(&env, lottery_id)?.total_weight)
    }

    pub fn get_participant(env: Env, lottery_id: u32, address: Address) -> Participant {
        env.storage()
            .persistent()
            .get(&DataKey::Entry(lottery_id, address))
            .unwrap_or_default()
    }

    pub fn is_booster(env: Env, lottery_id: u32, address: Address) -> bool {
        Self::get_participant(env, lottery_id, address).boosts > 0
    }

    pub fn get_draw_result(env: Env, lottery_id: u32) -> Result<DrawResult, LotteryError> {
        Self::load_result(&env, lottery_id)
    }

    pub fn get_pending_draw(env: Env, lottery_id: u32) -> Option<PendingDraw> {
        env.storage()
            .persistent()
            .get(&DataKey::DrawRequest(lottery_id))
    }

    /// Metadata URI of a prize: the lottery's template, or the NFT contract's
    /// own `uri` when the lottery has none, with `{id}` substituted.
    pub fn get_prize_uri(env: Env, lottery_id: u32, prize_id: u32) -> Result<String, LotteryError> {
        let lottery = Self::load_lottery(&env, lottery_id)?;
        let template = if lottery.metadata_uri.len() == 0 {
            PrizeNftClient::new(&env, &lottery.nft_contract).uri(&prize_id)
        } else {
            lottery.metadata_uri
        };
        uri::expand(&env, &template, prize_id)
    }

    pub fn get_config(env: Env) -> Result<LotteryConfig, LotteryError> {
        env.storage()
            .instance()
            .get(&DataKey::Config)
            .ok_or(LotteryError::NotInitialized)
    }

    pub fn get_admin(env: Env) -> Result<Address, LotteryError> {
        env.storage()
            .instance()
            .get(&DataKey::Admin)
            .ok_or(LotteryError::NotInitialized)
    }

    pub fn get_randomness_source(env: Env) -> Result<Address, LotteryError> {
        env.storage()
            .instance()
            .get(&DataKey::Randomness)
            .ok_or(LotteryError::NotInitialized)
    }

    pub fn get_payment_token(env: Env) -> Result<Address, LotteryError> {
        env.storage()
            .instance()
            .get(&DataKey::PaymentToken)
            .ok_or(LotteryError::NotInitialized)
    }

    // --- Internal helpers ---

    fn require_initialized(env: &Env) -> Result<(), LotteryError> {
        if !env.storage().instance().has(&DataKey::Admin) {
            return Err(LotteryError::NotInitialized);
        }
        Ok(())
    }

    fn require_admin(env: &Env, caller: &Address) -> Result<(), LotteryError> {
        let admin: Address = env
            .storage()
            .instance()
            .get(&DataKey::Admin)
            .ok_or(LotteryError::StorageCorrupted)?;
        if *caller != admin {
            return Err(LotteryError::NotAuthorized);
        }
        Ok(())
    }

    fn require_open(env: &Env, lottery: &Lottery) -> Result<(), LotteryError> {
        let now = env.ledger().timestamp();
        if lottery.phase != LotteryPhase::Open || now < lottery.start_time || now >= lottery.close_time
        {
            return Err(LotteryError::LotteryNotOpen);
        }
        Ok(())
    }

    fn effective_phase(env: &Env, lottery: &Lottery) -> LotteryPhase {
        if lottery.phase == LotteryPhase::Open && env.ledger().timestamp() >= lottery.close_time {
            LotteryPhase::Closed
        } else {
            lottery.phase
        }
    }

    fn payment_token(env: &Env) -> Result<Address, LotteryError> {
        env.storage()
            .instance()
            .get(&DataKey::PaymentToken)
            .ok_or(LotteryError::StorageCorrupted)
    }

    fn collect_payment(env: &Env, payer: &Address, amount: i128) -> Result<(), LotteryError> {
        if amount == 0 {
            return Ok(());
        }
        let token_client = token::Client::new(env, &Self::payment_token(env)?);
        if token_client.balance(payer) < amount {
            return Err(LotteryError::InsufficientPayment);
        }
        token_client.transfer(payer, &env.current_contract_address(), &amount);
        Ok(())
    }

    /// Append a participant to the roster with zero weight.
    ///
    /// # Returns
    /// The participant's slot
    fn enroll(
        env: &Env,
        lottery: &mut Lottery,
        participant: &Address,
    ) -> Result<u32, LotteryError> {
        let slot = lottery.participant_count;
        let chunk = slot / PARTICIPANT_CHUNK;

        let roster_key = DataKey::Roster(lottery.id, chunk);
        let mut roster: Vec<Address> = env
            .storage()
            .persistent()
            .get(&roster_key)
            .unwrap_or_else(|| Vec::new(env));
        roster.push_back(participant.clone());
        Self::save_persistent(env, &roster_key, &roster);

        let weights_key = DataKey::Weights(lottery.id, chunk);
        let mut weights: Vec<u128> = env
            .storage()
            .persistent()
            .get(&weights_key)
            .unwrap_or_else(|| Vec::new(env));
        weights.push_back(0);
        Self::save_persistent(env, &weights_key, &weights);

        if slot % PARTICIPANT_CHUNK == 0 {
            let totals_key = DataKey::WeightTotals(lottery.id);
            let mut totals: Vec<u128> = env
                .storage()
                .persistent()
                .get(&totals_key)
                .unwrap_or_else(|| Vec::new(env));
            totals.push_back(0);
            Self::save_persistent(env, &totals_key, &totals);
        }

        lottery.participant_count = slot.checked_add(1).ok_or(LotteryError::Overflow)?;
        Ok(slot)
    }

    /// Replace the weight held at `slot`, keeping its chunk total in step.
    fn set_weight(
        env: &Env,
        lottery_id: u32,
        slot: u32,
        old_weight: u128,
        new_weight: u128,
    ) -> Result<(), LotteryError> {
        let chunk = slot / PARTICIPANT_CHUNK;
        let position = slot % PARTICIPANT_CHUNK;

        let weights_key = DataKey::Weights(lottery_id, chunk);
        let mut weights: Vec<u128> = env
            .storage()
            .persistent()
            .get(&weights_key)
            .ok_or(LotteryError::StorageCorrupted)?;
        if weights.get(position) != Some(old_weight) {
            return Err(LotteryError::StorageCorrupted);
        }
        weights.set(position, new_weight);
        Self::save_persistent(env, &weights_key, &weights);

        let totals_key = DataKey::WeightTotals(lottery_id);
        let mut totals: Vec<u128> = env
            .storage()
            .persistent()
            .get(&totals_key)
            .ok_or(LotteryError::StorageCorrupted)?;
        let total = totals
            .get(chunk)
            .ok_or(LotteryError::StorageCorrupted)?
            .checked_sub(old_weight)
            .and_then(|t| t.checked_add(new_weight))
            .ok_or(LotteryError::Overflow)?;
        totals.set(chunk, total);
        Self::save_persistent(env, &totals_key, &totals);

        Ok(())
    }

    /// Draw winners from the delivered value and resolve the lottery.
    fn finalize(
        env: &Env,
        mut lottery: Lottery,
        request_id: u64,
        random_value: BytesN<32>,
    ) -> Result<(), LotteryError> {
        let lottery_id = lottery.id;
        let totals: Vec<u128> = env
            .storage()
            .persistent()
            .get(&DataKey::WeightTotals(lottery_id))
            .ok_or(LotteryError::StorageCorrupted)?;

        let slots = draw::select_slots(
            env,
            &totals,
            |chunk| {
                env.storage()
                    .persistent()
                    .get(&DataKey::Weights(lottery_id, chunk))
                    .ok_or(LotteryError::StorageCorrupted)
            },
            lottery.prize_ids.len(),
            &random_value,
            lottery.config.distinct_winners,
        )?;

        let mut rosters: Map<u32, Vec<Address>> = Map::new(env);
        let mut assignments = Vec::new(env);
        let mut winners = 0u32;
        for (prize_id, slot) in lottery.prize_ids.iter().zip(slots.iter()) {
            let winner = match slot {
                Some(slot) => {
                    let chunk = slot / PARTICIPANT_CHUNK;
                    let roster = match rosters.get(chunk) {
                        Some(roster) => roster,
                        None => {
                            let roster: Vec<Address> = env
                                .storage()
                                .persistent()
                                .get(&DataKey::Roster(lottery_id, chunk))
                                .ok_or(LotteryError::StorageCorrupted)?;
                            rosters.set(chunk, roster.clone());
                            roster
                        }
                    };
                    winners += 1;
                    Some(
                        roster
                            .get(slot % PARTICIPANT_CHUNK)
                            .ok_or(LotteryError::StorageCorrupted)?,
                    )
                }
                None => None,
            };
            assignments.push_back(PrizeAssignment {
                prize_id,
                winner,
                claimed: false,
            });
        }

        Self::save_result(
            env,
            lottery_id,
            &DrawResult {
                request_id,
                random_value: random_value.clone(),
                assignments,
            },
        );

        lottery.phase = LotteryPhase::Resolved;
        Self::save_lottery(env, &lottery);

        log!(env, "lottery {} resolved with {} prizes assigned", lottery_id, winners);
        events::lottery_resolved(env, lottery_id, random_value, winners);

        Ok(())
    }

    fn load_lottery(env: &Env, lottery_id: u32) -> Result<Lottery, LotteryError> {
        env.storage()
            .persistent()
            .get(&DataKey::Lottery(lottery_id))
            .ok_or(LotteryError::UnknownLottery)
    }

    fn save_lottery(env: &Env, lottery: &Lottery) {
        let key = DataKey::Lottery(lottery.id);
        env.storage().persistent().set(&key, lottery);
        env.storage()
            .persistent()
            .extend_ttl(&key, BUMP_THRESHOLD, BUMP_AMOUNT);
    }

    fn load_result(env: &Env, lottery_id: u32) -> Result<DrawResult, LotteryError> {
        let lottery = Self::load_lottery(env, lottery_id)?;
        if lottery.phase != LotteryPhase::Resolved {
            return Err(LotteryError::LotteryNotResolved);
        }
        env.storage()
            .persistent()
            .get(&DataKey::DrawResult(lottery_id))
            .ok_or(LotteryError::StorageCorrupted)
    }

    fn save_result(env: &Env, lottery_id: u32, result: &DrawResult) {
        let key = DataKey::DrawResult(lottery_id);
        env.storage().persistent().set(&key, result);
        env.storage()
            .persistent()
            .extend_ttl(&key, BUMP_THRESHOLD, BUMP_AMOUNT);
    }

    fn save_persistent<V: IntoVal<Env, Val>>(env: &Env, key: &DataKey, value: &V) {
        env.storage().persistent().set(key, value);
        env.storage()
            .persistent()
            .extend_ttl(key, BUMP_THRESHOLD, BUMP_AMOUNT);
    }

    fn bump_instance(env: &Env) {
        env.storage()
            .instance()
            .extend_ttl(BUMP_THRESHOLD, BUMP_AMOUNT);
    }
}
