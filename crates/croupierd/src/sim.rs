//! A deterministic, scripted game host.
//!
//! `SimHost` stands in for the real game: every action settles after a
//! configurable number of ticks, the way the real host's animations do, so
//! the deferred-completion machinery is exercised end to end. The rules are
//! a deliberately small caricature: enough to drive every endpoint, nothing
//! more.

use croupier_host::{
    BlindStatus, Blinds, CardArea, CardInfo, CardSet, GameError, GameHost, GameState, PackArea,
    RoundStatus, ShopArea, Snapshot, Tweaks,
};

const HAND_SIZE: usize = 8;
const JOKER_SLOTS: usize = 5;
const CONSUMABLE_SLOTS: usize = 2;
const HANDS_PER_ROUND: u32 = 4;
const DISCARDS_PER_ROUND: u32 = 3;
const CHIPS_PER_CARD: u64 = 50;
const STARTING_MONEY: i64 = 4;
const BASE_REROLL_COST: i64 = 5;
const FINAL_ANTE: u32 = 8;

const DECKS: &[&str] = &["RED", "BLUE", "YELLOW", "GREEN", "BLACK"];
const STAKES: &[&str] = &["WHITE", "RED", "GREEN", "BLACK", "BLUE", "PURPLE", "ORANGE", "GOLD"];

/// Pending state change applied when its delay elapses.
struct Transition {
    remaining: u64,
    effect: Effect,
}

enum Effect {
    GoMenu,
    BeginRun {
        deck: String,
        stake: String,
        seed: String,
    },
    EnterBlind,
    MarkSkipped,
    ResolvePlay {
        cards: Vec<usize>,
    },
    ResolveDiscard {
        cards: Vec<usize>,
    },
    EnterShop,
    LeaveShop,
    TakeCard {
        slot: usize,
    },
    RedeemVoucher {
        slot: usize,
    },
    OpenPack {
        slot: usize,
    },
    Reroll {
        cost: i64,
    },
    SpendConsumable {
        slot: usize,
    },
    ResolvePick {
        slot: usize,
    },
    CloseOpenPack,
    SpawnKey {
        key: String,
    },
    AdoptSave {
        snapshot: Box<Snapshot>,
    },
}

/// Scripted [`GameHost`] with tick-delayed action settlement.
pub struct SimHost {
    settle_delay: u64,
    transition: Option<Transition>,
    state: GameState,
    money: i64,
    ante_num: u32,
    round_num: u32,
    deck: String,
    stake: String,
    seed: String,
    won: bool,
    hand: Vec<CardInfo>,
    jokers: Vec<CardInfo>,
    consumables: Vec<CardInfo>,
    round: RoundStatus,
    blinds: Blinds,
    shop: Option<ShopArea>,
    pack: Option<PackArea>,
    used_vouchers: Vec<String>,
    next_id: u64,
}

impl SimHost {
    /// Creates a host at the menu whose actions settle after `settle_delay`
    /// ticks.
    #[must_use]
    pub fn new(settle_delay: u64) -> Self {
        Self {
            settle_delay,
            transition: None,
            state: GameState::Menu,
            money: 0,
            ante_num: 0,
            round_num: 0,
            deck: String::new(),
            stake: String::new(),
            seed: String::new(),
            won: false,
            hand: Vec::new(),
            jokers: Vec::new(),
            consumables: Vec::new(),
            round: RoundStatus::default(),
            blinds: Blinds::default(),
            shop: None,
            pack: None,
            used_vouchers: Vec::new(),
            next_id: 0,
        }
    }

    /// Advances the simulated game by one tick.
    pub fn tick(&mut self) {
        let Some(transition) = &mut self.transition else {
            return;
        };
        transition.remaining = transition.remaining.saturating_sub(1);
        if transition.remaining == 0 {
            if let Some(transition) = self.transition.take() {
                self.apply(transition.effect);
            }
        }
    }

    fn schedule(&mut self, effect: Effect) {
        self.transition = Some(Transition {
            remaining: self.settle_delay.max(1),
            effect,
        });
    }

    fn fresh_card(&mut self, set: CardSet, key: &str, label: &str, cost: i64) -> CardInfo {
        self.next_id += 1;
        CardInfo {
            id: self.next_id,
            key: key.to_owned(),
            label: label.to_owned(),
            set,
            cost,
        }
    }

    fn deal_hand(&mut self) {
        self.hand.clear();
        let suits = ["H", "S", "D", "C"];
        let ranks = ["A", "K", "Q", "J", "10", "9", "8", "7"];
        for index in 0..HAND_SIZE {
            let suit = suits[index % suits.len()];
            let rank = ranks[index % ranks.len()];
            let key = format!("{suit}_{rank}");
            let card = self.fresh_card(CardSet::Playing, &key, &key, 0);
            self.hand.push(card);
        }
    }

    fn refill_hand(&mut self) {
        while self.hand.len() < HAND_SIZE {
            let card = self.fresh_card(CardSet::Playing, "S_2", "S_2", 0);
            self.hand.push(card);
        }
    }

    fn remove_hand_cards(&mut self, cards: &[usize]) {
        let mut sorted: Vec<usize> = cards.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        for index in sorted.into_iter().rev() {
            if index < self.hand.len() {
                self.hand.remove(index);
            }
        }
    }

    fn build_shop(&mut self) {
        let joker = self.fresh_card(CardSet::Joker, "j_joker", "Joker", 5);
        let planet = self.fresh_card(CardSet::Planet, "c_mercury", "Mercury", 3);
        let voucher = self.fresh_card(CardSet::Voucher, "v_overstock_norm", "Overstock", 10);
        let buffoon = self.fresh_card(CardSet::Booster, "p_buffoon_1", "Buffoon Pack", 4);
        let standard = self.fresh_card(CardSet::Booster, "p_standard_1", "Standard Pack", 4);
        self.shop = Some(ShopArea {
            cards: vec![joker, planet],
            vouchers: vec![voucher],
            packs: vec![buffoon, standard],
            reroll_cost: BASE_REROLL_COST,
        });
    }

    fn current_blind_slot(&mut self) -> &mut BlindStatus {
        if matches!(self.blinds.small, BlindStatus::Upcoming | BlindStatus::Current) {
            &mut self.blinds.small
        } else if matches!(self.blinds.big, BlindStatus::Upcoming | BlindStatus::Current) {
            &mut self.blinds.big
        } else {
            &mut self.blinds.boss
        }
    }

    fn boss_is_current(&self) -> bool {
        self.blinds.boss == BlindStatus::Current
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::GoMenu => {
                self.state = GameState::Menu;
                self.money = 0;
                self.ante_num = 0;
                self.round_num = 0;
                self.deck.clear();
                self.stake.clear();
                self.seed.clear();
                self.won = false;
                self.hand.clear();
                self.jokers.clear();
                self.consumables.clear();
                self.round = RoundStatus::default();
                self.blinds = Blinds::default();
                self.shop = None;
                self.pack = None;
                self.used_vouchers.clear();
            }
            Effect::BeginRun { deck, stake, seed } => {
                self.state = GameState::BlindSelect;
                self.money = STARTING_MONEY;
                self.ante_num = 1;
                self.round_num = 0;
                self.deck = deck;
                self.stake = stake;
                self.seed = seed;
                self.won = false;
                self.blinds = Blinds::default();
                self.jokers.clear();
                self.consumables.clear();
                self.used_vouchers.clear();
                self.shop = None;
                self.pack = None;
            }
            Effect::EnterBlind => {
                *self.current_blind_slot() = BlindStatus::Current;
                self.state = GameState::SelectingHand;
                self.round_num += 1;
                self.round = RoundStatus {
                    chips: 0,
                    chips_target: u64::from(self.ante_num) * 300,
                    hands_left: HANDS_PER_ROUND,
                    discards_left: DISCARDS_PER_ROUND,
                };
                self.deal_hand();
            }
            Effect::MarkSkipped => {
                *self.current_blind_slot() = BlindStatus::Skipped;
                self.state = GameState::BlindSelect;
            }
            Effect::ResolvePlay { cards } => {
                self.round.chips += CHIPS_PER_CARD * cards.len() as u64;
                self.remove_hand_cards(&cards);
                if self.round.chips >= self.round.chips_target {
                    let was_boss = self.boss_is_current();
                    *self.current_blind_slot() = BlindStatus::Defeated;
                    if was_boss && self.ante_num >= FINAL_ANTE {
                        self.won = true;
                    }
                    self.state = GameState::RoundEval;
                    self.hand.clear();
                } else if self.round.hands_left <= 1 {
                    self.round.hands_left = 0;
                    self.state = GameState::GameOver;
                } else {
                    self.round.hands_left -= 1;
                    self.refill_hand();
                }
            }
            Effect::ResolveDiscard { cards } => {
                self.remove_hand_cards(&cards);
                self.round.discards_left = self.round.discards_left.saturating_sub(1);
                self.refill_hand();
            }
            Effect::EnterShop => {
                self.state = GameState::Shop;
                self.money += 4 + i64::from(self.round.hands_left);
                self.build_shop();
            }
            Effect::LeaveShop => {
                self.state = GameState::BlindSelect;
                self.shop = None;
                if self.blinds.boss != BlindStatus::Upcoming {
                    self.ante_num += 1;
                    self.blinds = Blinds::default();
                }
            }
            Effect::TakeCard { slot } => {
                let Some(shop) = self.shop.as_mut() else {
                    return;
                };
                if slot >= shop.cards.len() {
                    return;
                }
                let card = shop.cards.remove(slot);
                self.money -= card.cost;
                match card.set {
                    CardSet::Joker => self.jokers.push(card),
                    CardSet::Tarot | CardSet::Planet | CardSet::Spectral => {
                        self.consumables.push(card);
                    }
                    _ => self.hand.push(card),
                }
            }
            Effect::RedeemVoucher { slot } => {
                let Some(shop) = self.shop.as_mut() else {
                    return;
                };
                if slot >= shop.vouchers.len() {
                    return;
                }
                let voucher = shop.vouchers.remove(slot);
                self.money -= voucher.cost;
                self.used_vouchers.push(voucher.key);
            }
            Effect::OpenPack { slot } => {
                let Some(shop) = self.shop.as_mut() else {
                    return;
                };
                if slot >= shop.packs.len() {
                    return;
                }
                let pack = shop.packs.remove(slot);
                self.money -= pack.cost;
                self.state = GameState::StandardPack;
                let choices = [("H_A", "H_A"), ("S_K", "S_K"), ("D_7", "D_7")];
                let cards = choices
                    .into_iter()
                    .map(|(key, label)| self.fresh_card(CardSet::Playing, key, label, 0))
                    .collect();
                self.pack = Some(PackArea { cards, choices: 1 });
            }
            Effect::Reroll { cost } => {
                self.money -= cost;
                let joker = self.fresh_card(CardSet::Joker, "j_greedy", "Greedy Joker", 6);
                let tarot = self.fresh_card(CardSet::Tarot, "c_fool", "The Fool", 3);
                if let Some(shop) = self.shop.as_mut() {
                    shop.cards = vec![joker, tarot];
                    shop.reroll_cost += 1;
                }
            }
            Effect::SpendConsumable { slot } => {
                if slot < self.consumables.len() {
                    self.consumables.remove(slot);
                }
            }
            Effect::ResolvePick { slot } => {
                if let Some(pack) = self.pack.as_mut()
                    && slot < pack.cards.len()
                {
                    let card = pack.cards.remove(slot);
                    match card.set {
                        CardSet::Joker => self.jokers.push(card),
                        CardSet::Tarot | CardSet::Planet | CardSet::Spectral => {
                            self.consumables.push(card);
                        }
                        _ => self.hand.push(card),
                    }
                }
                self.pack = None;
                self.state = GameState::Shop;
            }
            Effect::CloseOpenPack => {
                self.pack = None;
                self.state = GameState::Shop;
            }
            Effect::SpawnKey { key } => {
                if key.starts_with("j_") {
                    let card = self.fresh_card(CardSet::Joker, &key, &key, 0);
                    self.jokers.push(card);
                } else if key.starts_with("c_") {
                    let card = self.fresh_card(CardSet::Tarot, &key, &key, 0);
                    self.consumables.push(card);
                } else if key.starts_with("v_") {
                    self.used_vouchers.push(key);
                } else {
                    let card = self.fresh_card(CardSet::Playing, &key, &key, 0);
                    self.hand.push(card);
                }
            }
            Effect::AdoptSave { snapshot } => {
                let snapshot = *snapshot;
                self.state = snapshot.state;
                self.money = snapshot.money;
                self.ante_num = snapshot.ante_num;
                self.round_num = snapshot.round_num;
                self.deck = snapshot.deck;
                self.stake = snapshot.stake;
                self.seed = snapshot.seed;
                self.won = snapshot.won;
                self.hand = snapshot.hand.cards;
                self.jokers = snapshot.jokers.cards;
                self.consumables = snapshot.consumables.cards;
                self.round = snapshot.round;
                self.blinds = snapshot.blinds;
                self.shop = snapshot.shop;
                self.pack = snapshot.pack;
                self.used_vouchers = snapshot.used_vouchers;
            }
        }
    }
}

impl GameHost for SimHost {
    fn current_state(&self) -> GameState {
        self.state
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            money: self.money,
            ante_num: self.ante_num,
            round_num: self.round_num,
            deck: self.deck.clone(),
            stake: self.stake.clone(),
            seed: self.seed.clone(),
            won: self.won,
            hand: CardArea {
                cards: self.hand.clone(),
                limit: HAND_SIZE,
            },
            jokers: CardArea {
                cards: self.jokers.clone(),
                limit: JOKER_SLOTS,
            },
            consumables: CardArea {
                cards: self.consumables.clone(),
                limit: CONSUMABLE_SLOTS,
            },
            round: self.round.clone(),
            blinds: self.blinds,
            shop: self.shop.clone(),
            pack: self.pack.clone(),
            used_vouchers: self.used_vouchers.clone(),
        }
    }

    fn settled(&self) -> bool {
        self.transition.is_none()
    }

    fn start_run(&mut self, deck: &str, stake: &str, seed: Option<&str>) -> Result<(), GameError> {
        if !DECKS.contains(&deck) {
            return Err(GameError::invalid_value(format!("Unknown deck '{deck}'")));
        }
        if !STAKES.contains(&stake) {
            return Err(GameError::invalid_value(format!("Unknown stake '{stake}'")));
        }
        self.schedule(Effect::BeginRun {
            deck: deck.to_owned(),
            stake: stake.to_owned(),
            seed: seed.unwrap_or("SIMSEED").to_owned(),
        });
        Ok(())
    }

    fn main_menu(&mut self) -> Result<(), GameError> {
        self.schedule(Effect::GoMenu);
        Ok(())
    }

    fn select_blind(&mut self) -> Result<(), GameError> {
        self.schedule(Effect::EnterBlind);
        Ok(())
    }

    fn skip_blind(&mut self) -> Result<(), GameError> {
        if self.blinds.upcoming_is_boss() {
            return Err(GameError::invalid_state("Cannot skip Boss blind"));
        }
        self.schedule(Effect::MarkSkipped);
        Ok(())
    }

    fn play_hand(&mut self, cards: &[usize]) -> Result<(), GameError> {
        self.schedule(Effect::ResolvePlay {
            cards: cards.to_vec(),
        });
        Ok(())
    }

    fn discard_cards(&mut self, cards: &[usize]) -> Result<(), GameError> {
        if self.round.discards_left == 0 {
            return Err(GameError::invalid_state("No discards remaining this round"));
        }
        self.schedule(Effect::ResolveDiscard {
            cards: cards.to_vec(),
        });
        Ok(())
    }

    fn buy_card(&mut self, index: usize) -> Result<(), GameError> {
        self.schedule(Effect::TakeCard { slot: index });
        Ok(())
    }

    fn buy_voucher(&mut self, index: usize) -> Result<(), GameError> {
        self.schedule(Effect::RedeemVoucher { slot: index });
        Ok(())
    }

    fn buy_pack(&mut self, index: usize) -> Result<(), GameError> {
        self.schedule(Effect::OpenPack { slot: index });
        Ok(())
    }

    fn reroll_shop(&mut self) -> Result<(), GameError> {
        let cost = self
            .shop
            .as_ref()
            .map_or(BASE_REROLL_COST, |shop| shop.reroll_cost);
        self.schedule(Effect::Reroll { cost });
        Ok(())
    }

    fn cash_out(&mut self) -> Result<(), GameError> {
        self.schedule(Effect::EnterShop);
        Ok(())
    }

    fn next_round(&mut self) -> Result<(), GameError> {
        self.schedule(Effect::LeaveShop);
        Ok(())
    }

    fn use_consumable(&mut self, index: usize, _cards: &[usize]) -> Result<(), GameError> {
        if index >= self.consumables.len() {
            return Err(GameError::invalid_value(format!(
                "Invalid consumable index: {index}"
            )));
        }
        self.schedule(Effect::SpendConsumable { slot: index });
        Ok(())
    }

    fn pack_pick(&mut self, index: usize) -> Result<(), GameError> {
        self.schedule(Effect::ResolvePick { slot: index });
        Ok(())
    }

    fn pack_skip(&mut self) -> Result<(), GameError> {
        self.schedule(Effect::CloseOpenPack);
        Ok(())
    }

    fn spawn_card(&mut self, key: &str) -> Result<(), GameError> {
        self.schedule(Effect::SpawnKey {
            key: key.to_owned(),
        });
        Ok(())
    }

    fn apply_tweaks(&mut self, tweaks: &Tweaks) -> Result<(), GameError> {
        if let Some(money) = tweaks.money {
            self.money = money;
        }
        if let Some(chips) = tweaks.chips {
            self.round.chips = chips;
        }
        if let Some(ante) = tweaks.ante {
            self.ante_num = ante;
        }
        if let Some(round) = tweaks.round {
            self.round_num = round;
        }
        if let Some(hands) = tweaks.hands {
            self.round.hands_left = hands;
        }
        if let Some(discards) = tweaks.discards {
            self.round.discards_left = discards;
        }
        if tweaks.restock_shop {
            if self.state != GameState::Shop {
                return Err(GameError::invalid_state(
                    "Can re-stock shop only in SHOP state",
                ));
            }
            self.build_shop();
        }
        Ok(())
    }

    fn save_run(&mut self, path: &str) -> Result<(), GameError> {
        let serialised = serde_json::to_string_pretty(&self.snapshot())
            .map_err(|error| GameError::internal(format!("Failed to encode save: {error}")))?;
        std::fs::write(path, serialised)
            .map_err(|error| GameError::invalid_value(format!("Failed to write save: {error}")))
    }

    fn load_run(&mut self, path: &str) -> Result<(), GameError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|error| GameError::invalid_value(format!("Failed to read save: {error}")))?;
        let snapshot: Snapshot = serde_json::from_str(&raw)
            .map_err(|error| GameError::invalid_value(format!("Failed to parse save: {error}")))?;
        self.schedule(Effect::AdoptSave {
            snapshot: Box::new(snapshot),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settle(host: &mut SimHost) {
        for _ in 0..10 {
            host.tick();
        }
    }

    fn host_in_shop() -> SimHost {
        let mut host = SimHost::new(1);
        host.start_run("RED", "WHITE", Some("TEST123")).expect("start");
        settle(&mut host);
        host.select_blind().expect("select");
        settle(&mut host);
        // One oversized play clears the blind outright.
        host.apply_tweaks(&Tweaks {
            chips: Some(10_000),
            ..Tweaks::default()
        })
        .expect("tweak chips");
        host.play_hand(&[0]).expect("play");
        settle(&mut host);
        assert_eq!(host.current_state(), GameState::RoundEval);
        host.cash_out().expect("cash out");
        settle(&mut host);
        host
    }

    #[test]
    fn actions_settle_only_after_the_delay() {
        let mut host = SimHost::new(3);
        host.start_run("RED", "WHITE", None).expect("start");
        assert!(!host.settled());
        assert_eq!(host.current_state(), GameState::Menu);
        host.tick();
        host.tick();
        assert_eq!(host.current_state(), GameState::Menu, "not yet settled");
        host.tick();
        assert!(host.settled());
        assert_eq!(host.current_state(), GameState::BlindSelect);
    }

    #[test]
    fn unknown_deck_is_rejected() {
        let mut host = SimHost::new(1);
        let error = host
            .start_run("PAISLEY", "WHITE", None)
            .expect_err("unknown deck");
        assert!(error.to_string().contains("PAISLEY"));
    }

    #[test]
    fn entering_a_blind_deals_a_full_hand() {
        let mut host = SimHost::new(1);
        host.start_run("RED", "WHITE", None).expect("start");
        settle(&mut host);
        host.select_blind().expect("select");
        settle(&mut host);
        let snapshot = host.snapshot();
        assert_eq!(snapshot.state, GameState::SelectingHand);
        assert_eq!(snapshot.hand.count(), HAND_SIZE);
        assert_eq!(snapshot.round.hands_left, HANDS_PER_ROUND);
        assert_eq!(snapshot.blinds.small, BlindStatus::Current);
    }

    #[test]
    fn playing_without_reaching_target_consumes_a_hand() {
        let mut host = SimHost::new(1);
        host.start_run("RED", "WHITE", None).expect("start");
        settle(&mut host);
        host.select_blind().expect("select");
        settle(&mut host);
        host.play_hand(&[0, 1]).expect("play");
        settle(&mut host);
        let snapshot = host.snapshot();
        assert_eq!(snapshot.round.hands_left, HANDS_PER_ROUND - 1);
        assert_eq!(snapshot.hand.count(), HAND_SIZE, "hand redrawn");
        assert_eq!(snapshot.round.chips, 2 * CHIPS_PER_CARD);
    }

    #[test]
    fn buying_the_joker_moves_it_and_charges_for_it() {
        let mut host = host_in_shop();
        let before = host.snapshot();
        let shop = before.shop.as_ref().expect("shop open");
        let cost = shop.cards[0].cost;

        host.buy_card(0).expect("buy");
        settle(&mut host);

        let after = host.snapshot();
        assert_eq!(after.jokers.count(), before.jokers.count() + 1);
        assert_eq!(
            after.shop.as_ref().expect("shop").cards.len(),
            shop.cards.len() - 1
        );
        assert_eq!(after.money, before.money - cost);
    }

    #[test]
    fn skipping_the_small_blind_marks_it_skipped() {
        let mut host = SimHost::new(1);
        host.start_run("RED", "WHITE", None).expect("start");
        settle(&mut host);
        host.skip_blind().expect("skip small");
        settle(&mut host);
        assert_eq!(host.snapshot().blinds.small, BlindStatus::Skipped);
        assert_eq!(host.current_state(), GameState::BlindSelect);
    }

    #[test]
    fn boss_blind_cannot_be_skipped() {
        let mut host = SimHost::new(1);
        host.start_run("RED", "WHITE", None).expect("start");
        settle(&mut host);
        host.skip_blind().expect("skip small");
        settle(&mut host);
        host.skip_blind().expect("skip big");
        settle(&mut host);
        let error = host.skip_blind().expect_err("boss is not skippable");
        assert!(error.to_string().contains("Boss"));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("run.json");
        let path = path.to_str().expect("utf8 path");

        let mut host = host_in_shop();
        let saved = host.snapshot();
        host.save_run(path).expect("save");

        let mut fresh = SimHost::new(1);
        fresh.load_run(path).expect("load");
        settle(&mut fresh);
        let restored = fresh.snapshot();
        assert_eq!(restored.state, saved.state);
        assert_eq!(restored.money, saved.money);
        assert_eq!(restored.seed, saved.seed);
    }
}
