//! Status effects on a unit: infliction, refresh, damage-over-time ticking and
//! the modifiers active effects impose.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::Dice;
use crate::battle::UnitId;
use crate::damage::{ArmorSplit, split_damage};
use crate::life::Vitals;
use crate::model::{
    DamageType, DotSpec, EffectChance, EffectFamily, Environment, StatusEffectDef, UnitStats,
};

/// An effect currently on a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveStatusEffect {
    pub effect: StatusEffectDef,
    pub remaining_turns: u32,
    /// Per-tick damage fixed at application time.
    pub original_dot_damage: u32,
    pub original_duration: u32,
    /// 1 on the first tick.
    pub current_turn: u32,
    pub source: Option<UnitId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InflictOutcome {
    /// The family is in the unit's immunities; no roll was made.
    Immune,
    /// The chance roll failed.
    Resisted,
    Applied,
    /// Already active; duration and damage were reset.
    Refreshed,
}

/// `floor(floor((dealt + bonus) × env) × ability_mult)`.
pub fn dot_damage_on_apply(dealt: u32, dot: &DotSpec, environment: &Environment) -> u32 {
    let base = f64::from(dealt) + dot.bonus_damage;
    let after_env = (base * environment.modifier(dot.damage_type)).floor();
    (after_env * dot.ability_damage_mult).floor().max(0.0) as u32
}

/// Share of the original damage dealt on tick `current_turn` (1-based).
///
/// Diminishing effects fall off linearly: `(d − t + 1) / d`. A zero duration
/// is treated as non-diminishing.
pub fn decay_multiplier(original_duration: u32, current_turn: u32, diminishing: bool) -> f64 {
    if !diminishing || original_duration == 0 {
        return 1.0;
    }
    let d = f64::from(original_duration);
    let t = f64::from(current_turn);
    ((d - t + 1.0) / d).max(0.0)
}

/// Damage of tick `current_turn`: `floor(original × decay)`, computed in integers.
pub fn decayed_dot_damage(
    original: u32,
    original_duration: u32,
    current_turn: u32,
    diminishing: bool,
) -> u32 {
    if !diminishing || original_duration == 0 {
        return original;
    }
    if current_turn > original_duration {
        return 0;
    }
    let left = u64::from(original_duration - current_turn + 1);
    (u64::from(original) * left / u64::from(original_duration)) as u32
}

/// Put `def` on a unit, or refresh it if an effect with the same id is active.
pub fn apply_effect(
    effects: &mut Vec<ActiveStatusEffect>,
    def: &StatusEffectDef,
    dealt: u32,
    environment: &Environment,
    source: Option<UnitId>,
) -> (InflictOutcome, u32) {
    let dot = def
        .dot
        .as_ref()
        .map(|d| dot_damage_on_apply(dealt, d, environment))
        .unwrap_or(0);

    if let Some(active) = effects.iter_mut().find(|e| e.effect.id == def.id) {
        active.remaining_turns = def.duration;
        active.original_duration = def.duration;
        active.current_turn = 1;
        active.original_dot_damage = dot;
        active.source = source;
        return (InflictOutcome::Refreshed, dot);
    }

    effects.push(ActiveStatusEffect {
        effect: def.clone(),
        remaining_turns: def.duration,
        original_dot_damage: dot,
        original_duration: def.duration,
        current_turn: 1,
        source,
    });
    (InflictOutcome::Applied, dot)
}

/// Immunity check, chance roll, then [`apply_effect`]. Immunity consumes no draw.
#[allow(clippy::too_many_arguments)]
pub fn inflict(
    name: &str,
    effects: &mut Vec<ActiveStatusEffect>,
    immunities: &BTreeSet<EffectFamily>,
    chance: &EffectChance,
    dealt: u32,
    environment: &Environment,
    source: Option<UnitId>,
    dice: &mut Dice,
    mut log: impl FnMut(String),
) -> (InflictOutcome, u32) {
    let def = &chance.effect;
    if immunities.contains(&def.family) {
        log(format!("[EFFECT][{}] immune to {}", name, def.name));
        return (InflictOutcome::Immune, 0);
    }
    if !dice.chance(chance.chance) {
        log(format!("[EFFECT][{}] resists {}", name, def.name));
        return (InflictOutcome::Resisted, 0);
    }

    let (outcome, dot) = apply_effect(effects, def, dealt, environment, source);
    match outcome {
        InflictOutcome::Refreshed => {
            log(format!("[EFFECT][{}] {} refreshed ({} per tick)", name, def.name, dot));
        }
        _ => log(format!(
            "[EFFECT][{}] gains {} for {} turns ({} per tick)",
            name, def.name, def.duration, dot
        )),
    }
    (outcome, dot)
}

/// What one effect did at a turn boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectTick {
    pub effect: String,
    pub raw_damage: u32,
    pub hp_damage: u32,
    pub armor_damage: u32,
    pub remaining_turns: u32,
    pub expired: bool,
}

/// Tick every effect on a unit once, in application order. Damage goes
/// through the unit's own resistances and armor; the environment is not
/// applied again. Stops early if the unit dies.
pub fn tick_effects(
    name: &str,
    stats: &UnitStats,
    active_armor: bool,
    vitals: &mut Vitals,
    effects: &mut Vec<ActiveStatusEffect>,
    mut log: impl FnMut(String),
) -> Vec<EffectTick> {
    let mut ticks = Vec::new();
    let mut i = 0;
    while i < effects.len() {
        if !vitals.alive {
            break;
        }

        let mut split = ArmorSplit::default();
        let mut raw = 0;
        if let Some(dot) = effects[i].effect.dot.clone() {
            let armor_mod =
                stats.armor_mod(dot.damage_type) * armor_modifier(effects, dot.damage_type);
            // effects that expired earlier in this pass no longer strip armor
            let bypass = bypasses_armor(active_armor, effects);
            let active = &effects[i];
            raw = decayed_dot_damage(
                active.original_dot_damage,
                active.original_duration,
                active.current_turn,
                dot.diminishing,
            );
            if raw > 0 {
                split = split_damage(
                    raw,
                    vitals.armor,
                    stats.hp_mod(dot.damage_type),
                    armor_mod,
                    dot.armor_piercing,
                    bypass,
                );
                log(format!("[DOT][{}] {} ticks for {}", name, active.effect.name, raw));
                vitals.apply(name, &split, &mut log);
            }
        }

        let active = &mut effects[i];
        active.remaining_turns = active.remaining_turns.saturating_sub(1);
        active.current_turn += 1;
        let expired = active.remaining_turns == 0;
        ticks.push(EffectTick {
            effect: active.effect.name.clone(),
            raw_damage: raw,
            hp_damage: split.hp_damage,
            armor_damage: split.armor_damage,
            remaining_turns: active.remaining_turns,
            expired,
        });
        if expired {
            log(format!("[EFFECT][{}] {} wears off", name, active.effect.name));
            effects.remove(i);
        } else {
            i += 1;
        }
    }
    ticks
}

/// A stun-like effect is active.
pub fn blocks_action(effects: &[ActiveStatusEffect]) -> bool {
    effects.iter().any(|e| e.effect.blocks_action)
}

/// Product of the incoming-damage multipliers of all active effects.
pub fn damage_modifier(effects: &[ActiveStatusEffect], damage_type: DamageType) -> f64 {
    effects
        .iter()
        .filter_map(|e| e.effect.damage_mods.get(&damage_type))
        .product()
}

pub fn armor_modifier(effects: &[ActiveStatusEffect], damage_type: DamageType) -> f64 {
    effects
        .iter()
        .filter_map(|e| e.effect.armor_damage_mods.get(&damage_type))
        .product()
}

/// Units with active armor lose it while under an effect that bypasses it.
pub fn bypasses_armor(active_armor: bool, effects: &[ActiveStatusEffect]) -> bool {
    active_armor && effects.iter().any(|e| e.effect.bypasses_active_armor)
}
