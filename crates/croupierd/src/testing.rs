//! Hand-rolled host stub shared by unit tests.

use std::cell::RefCell;

use croupier_host::{GameError, GameHost, GameState, Snapshot, Tweaks};

/// Scripted [`GameHost`] whose snapshot is set directly by the test and
/// whose action entry points only record that they were called.
pub(crate) struct StubHost {
    snapshot: Snapshot,
    settled: bool,
    calls: RefCell<Vec<String>>,
    action_result: Option<GameError>,
}

impl StubHost {
    pub(crate) fn new(state: GameState) -> Self {
        Self {
            snapshot: Snapshot::out_of_run(state),
            settled: true,
            calls: RefCell::new(Vec::new()),
            action_result: None,
        }
    }

    pub(crate) fn set_state(&mut self, state: GameState) {
        self.snapshot.state = state;
    }

    pub(crate) fn set_money(&mut self, money: i64) {
        self.snapshot.money = money;
    }

    pub(crate) fn set_settled(&mut self, settled: bool) {
        self.settled = settled;
    }

    pub(crate) fn snapshot_mut(&mut self) -> &mut Snapshot {
        &mut self.snapshot
    }

    /// Makes every subsequent action call fail with `error`.
    pub(crate) fn fail_actions_with(&mut self, error: GameError) {
        self.action_result = Some(error);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: impl Into<String>) -> Result<(), GameError> {
        self.calls.borrow_mut().push(call.into());
        match &self.action_result {
            None => Ok(()),
            Some(GameError::InvalidValue(m)) => Err(GameError::InvalidValue(m.clone())),
            Some(GameError::InvalidState(m)) => Err(GameError::InvalidState(m.clone())),
            Some(GameError::NotInRun(m)) => Err(GameError::NotInRun(m.clone())),
            Some(GameError::Internal(m)) => Err(GameError::Internal(m.clone())),
        }
    }
}

impl GameHost for StubHost {
    fn current_state(&self) -> GameState {
        self.snapshot.state
    }

    fn snapshot(&self) -> Snapshot {
        self.snapshot.clone()
    }

    fn settled(&self) -> bool {
        self.settled
    }

    fn start_run(&mut self, deck: &str, stake: &str, _seed: Option<&str>) -> Result<(), GameError> {
        self.record(format!("start_run({deck},{stake})"))
    }

    fn main_menu(&mut self) -> Result<(), GameError> {
        self.record("main_menu")
    }

    fn select_blind(&mut self) -> Result<(), GameError> {
        self.record("select_blind")
    }

    fn skip_blind(&mut self) -> Result<(), GameError> {
        self.record("skip_blind")
    }

    fn play_hand(&mut self, cards: &[usize]) -> Result<(), GameError> {
        self.record(format!("play_hand({cards:?})"))
    }

    fn discard_cards(&mut self, cards: &[usize]) -> Result<(), GameError> {
        self.record(format!("discard_cards({cards:?})"))
    }

    fn buy_card(&mut self, index: usize) -> Result<(), GameError> {
        self.record(format!("buy_card({index})"))
    }

    fn buy_voucher(&mut self, index: usize) -> Result<(), GameError> {
        self.record(format!("buy_voucher({index})"))
    }

    fn buy_pack(&mut self, index: usize) -> Result<(), GameError> {
        self.record(format!("buy_pack({index})"))
    }

    fn reroll_shop(&mut self) -> Result<(), GameError> {
        self.record("reroll_shop")
    }

    fn cash_out(&mut self) -> Result<(), GameError> {
        self.record("cash_out")
    }

    fn next_round(&mut self) -> Result<(), GameError> {
        self.record("next_round")
    }

    fn use_consumable(&mut self, index: usize, cards: &[usize]) -> Result<(), GameError> {
        self.record(format!("use_consumable({index},{cards:?})"))
    }

    fn pack_pick(&mut self, index: usize) -> Result<(), GameError> {
        self.record(format!("pack_pick({index})"))
    }

    fn pack_skip(&mut self) -> Result<(), GameError> {
        self.record("pack_skip")
    }

    fn spawn_card(&mut self, key: &str) -> Result<(), GameError> {
        self.record(format!("spawn_card({key})"))
    }

    fn apply_tweaks(&mut self, _tweaks: &Tweaks) -> Result<(), GameError> {
        self.record("apply_tweaks")
    }

    fn save_run(&mut self, path: &str) -> Result<(), GameError> {
        self.record(format!("save_run({path})"))
    }

    fn load_run(&mut self, path: &str) -> Result<(), GameError> {
        self.record(format!("load_run({path})"))
    }
}
