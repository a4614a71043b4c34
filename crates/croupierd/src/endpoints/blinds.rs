//! Blind selection and skipping.

use croupier_host::{BlindStatus, GameState};

use crate::dispatch::{Endpoint, ExecContext, Execution, NO_ARGS};
use crate::protocol::ApiError;
use crate::schedule::Deferred;
use crate::validator::Schema;

/// Enters the currently offered blind.
pub struct Select;

impl Endpoint for Select {
    fn name(&self) -> &'static str {
        "select"
    }

    fn description(&self) -> &'static str {
        "Enters the currently offered blind"
    }

    fn schema(&self) -> &'static Schema {
        NO_ARGS
    }

    fn requires_state(&self) -> Option<&'static [GameState]> {
        Some(&[GameState::BlindSelect])
    }

    fn execute(&self, ctx: ExecContext<'_>) -> Result<Execution, ApiError> {
        ctx.host.select_blind()?;
        Ok(Execution::Defer(Deferred::snapshot_when(|host| {
            host.current_state() == GameState::SelectingHand && host.settled()
        })))
    }
}

/// Which of the ante's blinds a skip will act on.
#[derive(Clone, Copy)]
enum SkipTarget {
    Small,
    Big,
}

/// Skips the currently offered blind; the boss can never be skipped.
pub struct Skip;

impl Endpoint for Skip {
    fn name(&self) -> &'static str {
        "skip"
    }

    fn description(&self) -> &'static str {
        "Skips the currently offered blind"
    }

    fn schema(&self) -> &'static Schema {
        NO_ARGS
    }

    fn requires_state(&self) -> Option<&'static [GameState]> {
        Some(&[GameState::BlindSelect])
    }

    fn execute(&self, ctx: ExecContext<'_>) -> Result<Execution, ApiError> {
        let blinds = ctx.host.snapshot().blinds;
        if blinds.upcoming_is_boss() {
            return Err(ApiError::game_state("Cannot skip Boss blind"));
        }
        let target = if matches!(blinds.small, BlindStatus::Upcoming | BlindStatus::Current) {
            SkipTarget::Small
        } else {
            SkipTarget::Big
        };

        ctx.host.skip_blind()?;
        Ok(Execution::Defer(Deferred::snapshot_when(move |host| {
            let snapshot = host.snapshot();
            let skipped = match target {
                SkipTarget::Small => snapshot.blinds.small == BlindStatus::Skipped,
                SkipTarget::Big => snapshot.blinds.big == BlindStatus::Skipped,
            };
            skipped && snapshot.state == GameState::BlindSelect && host.settled()
        })))
    }
}
