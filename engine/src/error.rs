use serde::Serialize;
use thiserror::Error;

use crate::battle::{Side, UnitId};
use crate::grid::Position;

/// Why a proposed action was refused. The battle is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    #[error("the battle is already over")]
    BattleOver,
    #[error("it is {expected:?}'s turn, not {got:?}'s")]
    NotYourTurn { expected: Side, got: Side },
    #[error("unknown unit {unit}")]
    UnknownUnit { unit: UnitId },
    #[error("unit {unit} is dead")]
    UnitDead { unit: UnitId },
    #[error("unit {unit} is stunned")]
    Stunned { unit: UnitId },
    #[error("unit {unit} has no ability {weapon}/{ability}")]
    UnknownAbility { unit: UnitId, weapon: usize, ability: usize },
    #[error("global cooldown, {turns} turn(s) left")]
    GlobalCooldown { turns: u32 },
    #[error("ability on cooldown, {turns} turn(s) left")]
    Cooldown { turns: u32 },
    #[error("weapon reloading, {turns} turn(s) left")]
    Reloading { turns: u32 },
    #[error("out of ammo: needs {required}, has {available}")]
    OutOfAmmo { required: u32, available: i32 },
    #[error("ability still charging, {turns} turn(s) left")]
    Charging { turns: u32 },
    #[error("{target} is not a valid target")]
    InvalidTarget { target: Position },
    #[error("cannot pass while an action is available")]
    PassNotAllowed,
}

impl Rejection {
    /// Stable machine-readable reason.
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::BattleOver => "battle_over",
            Rejection::NotYourTurn { .. } => "not_your_turn",
            Rejection::UnknownUnit { .. } => "unknown_unit",
            Rejection::UnitDead { .. } => "unit_dead",
            Rejection::Stunned { .. } => "stunned",
            Rejection::UnknownAbility { .. } => "unknown_ability",
            Rejection::GlobalCooldown { .. } => "global_cooldown",
            Rejection::Cooldown { .. } => "cooldown",
            Rejection::Reloading { .. } => "reloading",
            Rejection::OutOfAmmo { .. } => "out_of_ammo",
            Rejection::Charging { .. } => "charging",
            Rejection::InvalidTarget { .. } => "invalid_target",
            Rejection::PassNotAllowed => "pass_not_allowed",
        }
    }
}

/// A battle could not be set up from the given rosters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("the player roster is empty")]
    NoPlayerUnits,
    #[error("no enemy waves")]
    NoWaves,
    #[error("enemy wave {0} is empty")]
    EmptyWave(usize),
    #[error("unit '{0}' has no rank stats")]
    NoRanks(String),
    #[error("unit '{unit}' placed on unusable cell {position}")]
    InvalidCell { unit: String, position: Position },
    #[error("two {side:?} units placed on {position}")]
    Occupied { side: Side, position: Position },
}
