//! Append-only battle log records. One [`BattleEvent`] is written per resolved
//! action, pass or surrender; serialized with `serde_json` they form the
//! replay log (identical for identical seeds and actions).

use serde::{Deserialize, Serialize};

use crate::battle::{AbilityRef, Outcome, Side, UnitId};
use crate::grid::Position;
use crate::status::{EffectTick, InflictOutcome};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectRecord {
    pub effect: String,
    pub outcome: InflictOutcome,
    /// Per-tick damage fixed at application; 0 unless applied or refreshed.
    pub dot_damage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitRecord {
    pub target: UnitId,
    pub cell: Position,
    pub damage_percent: f64,
    /// A unit in front absorbed the attack; no damage was dealt.
    pub blocked_by: Option<UnitId>,
    pub dodged: bool,
    pub crit: bool,
    pub hp_damage: u32,
    pub armor_damage: u32,
    pub overflow: bool,
    pub killed: bool,
    pub effects: Vec<EffectRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotRecord {
    pub shot: u32,
    pub hits: Vec<HitRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    pub unit: UnitId,
    #[serde(flatten)]
    pub tick: EffectTick,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionRecord {
    Attack {
        unit: UnitId,
        ability: AbilityRef,
        ability_name: String,
        aim: Position,
        shots: Vec<ShotRecord>,
    },
    Pass,
    Surrender {
        penalty: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleEvent {
    pub seq: u32,
    pub turn: u32,
    pub side: Side,
    pub action: ActionRecord,
    pub ticks: Vec<TickRecord>,
    pub deaths: Vec<UnitId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wave_spawned: Option<u32>,
    pub outcome: Outcome,
}

impl BattleEvent {
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Every hit of an attack, in shot order.
    pub fn hits(&self) -> impl Iterator<Item = &HitRecord> {
        let shots: &[ShotRecord] = match &self.action {
            ActionRecord::Attack { shots, .. } => shots,
            _ => &[],
        };
        shots.iter().flat_map(|s| s.hits.iter())
    }
}
