//! Hit resolution: dodge, power scaling, crits, modifiers and the armor/HP split.
//!
//! Everything here is a pure function of its inputs and the dice; nothing
//! mutates a unit. [`compute_hit`] runs the stages of [`PIPELINE`] in order,
//! flooring after every multiplicative step.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::Dice;
use crate::model::{Ability, Environment, Tag, UnitStats};
use crate::status::{self, ActiveStatusEffect};

pub const DODGE_BASE: i32 = 5;
pub const MAX_DODGE: f64 = 95.0;
pub const CRIT_MULTIPLIER: f64 = 1.5;

/// Chance in percent that a hit is dodged, always within `[0, 95]`.
pub fn dodge_chance(defense: i32, offense: i32) -> f64 {
    f64::from(defense - offense + DODGE_BASE).clamp(0.0, MAX_DODGE)
}

/// `1 + 0.02 × power`.
pub fn power_multiplier(power: i32) -> f64 {
    1.0 + 0.02 * f64::from(power)
}

/// `base × power_multiplier(power)`, truncated, computed in integers so that
/// e.g. power 25 gives exactly 1.5×.
pub fn scale_by_power(base: u32, power: i32) -> u32 {
    let scaled = i64::from(base) * (100 + 2 * i64::from(power)) / 100;
    scaled.clamp(0, i64::from(u32::MAX)) as u32
}

/// Raw damage the armor pool can soak before it is exhausted. `None` means
/// unlimited (a modifier of zero or less: armor takes nothing from any hit).
pub fn armor_capacity(armor: u32, armor_mod: f64) -> Option<u32> {
    if armor_mod <= 0.0 {
        return None;
    }
    Some((f64::from(armor) / armor_mod).floor() as u32)
}

fn scaled(value: u32, factor: f64) -> u32 {
    (f64::from(value) * factor).floor().max(0.0) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArmorSplit {
    pub hp_damage: u32,
    pub armor_damage: u32,
    /// Part of the hit went past an exhausted armor pool into HP.
    pub overflow_applied: bool,
}

/// Divide `incoming` between the armor pool and HP.
///
/// The armor-piercing share always goes to HP. The rest is soaked by armor up
/// to [`armor_capacity`]; whatever exceeds capacity reaches HP once. HP damage
/// is scaled by `hp_mod`, armor damage by `armor_mod`.
pub fn split_damage(
    incoming: u32,
    armor: u32,
    hp_mod: f64,
    armor_mod: f64,
    armor_piercing: f64,
    bypass_armor: bool,
) -> ArmorSplit {
    if bypass_armor || armor == 0 {
        return ArmorSplit {
            hp_damage: scaled(incoming, hp_mod),
            armor_damage: 0,
            overflow_applied: false,
        };
    }

    let piercing = scaled(incoming, (armor_piercing / 100.0).clamp(0.0, 1.0)).min(incoming);
    let armorable = incoming - piercing;

    match armor_capacity(armor, armor_mod) {
        None => ArmorSplit {
            hp_damage: scaled(piercing, hp_mod),
            armor_damage: 0,
            overflow_applied: false,
        },
        Some(capacity) if armorable <= capacity => ArmorSplit {
            hp_damage: scaled(piercing, hp_mod),
            armor_damage: scaled(armorable, armor_mod).min(armor),
            overflow_applied: false,
        },
        Some(capacity) => {
            let overflow = armorable - capacity;
            ArmorSplit {
                hp_damage: scaled(piercing + overflow, hp_mod),
                armor_damage: armor,
                overflow_applied: true,
            }
        }
    }
}

/// Critical chance in percent: unit base + ability + bonuses for each defender tag.
pub fn crit_chance(attacker: &UnitStats, ability: &Ability, defender_tags: &[Tag]) -> f64 {
    let tag_bonus: f64 = defender_tags
        .iter()
        .filter_map(|t| ability.crit_bonuses.get(t))
        .sum();
    attacker.critical + ability.crit_percent + tag_bonus
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Scaling,
    Crit,
    Class,
    Environment,
    Status,
    Falloff,
    ArmorSplit,
}

/// Order in which a landed hit is modified.
pub const PIPELINE: [Stage; 7] = [
    Stage::Scaling,
    Stage::Crit,
    Stage::Class,
    Stage::Environment,
    Stage::Status,
    Stage::Falloff,
    Stage::ArmorSplit,
];

/// The side of a hit being struck.
#[derive(Debug, Clone, Copy)]
pub struct Defender<'a> {
    pub stats: &'a UnitStats,
    pub tags: &'a [Tag],
    pub armor: u32,
    pub effects: &'a [ActiveStatusEffect],
    pub active_armor: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct HitInput<'a> {
    pub attacker: &'a UnitStats,
    pub ability: &'a Ability,
    pub defender: Defender<'a>,
    pub environment: &'a Environment,
    /// Attacker-class versus defender-class multiplier.
    pub class_modifier: f64,
    /// Share of the hit this cell takes, 100 for a primary impact.
    pub damage_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HitResult {
    pub hp_damage: u32,
    pub armor_damage: u32,
    pub was_crit: bool,
    pub was_dodged: bool,
    pub overflow_applied: bool,
}

impl HitResult {
    pub fn split(&self) -> ArmorSplit {
        ArmorSplit {
            hp_damage: self.hp_damage,
            armor_damage: self.armor_damage,
            overflow_applied: self.overflow_applied,
        }
    }

    pub fn dealt(&self) -> u32 {
        self.hp_damage + self.armor_damage
    }
}

/// Resolve one hit. Draws, in order: dodge, damage roll (only when the scaled
/// range is wider than one value), crit.
pub fn compute_hit(input: &HitInput<'_>, dice: &mut Dice) -> HitResult {
    let HitInput { attacker, ability, defender, environment, class_modifier, damage_percent } =
        *input;

    let dodge = dodge_chance(defender.stats.defense, attacker.accuracy + ability.attack);
    if dice.chance(dodge) {
        trace!(dodge, "hit dodged");
        return HitResult { was_dodged: true, ..HitResult::default() };
    }

    let damage_type = ability.damage_type;
    let mut damage = 0;
    let mut result = HitResult::default();
    for stage in PIPELINE {
        match stage {
            Stage::Scaling => {
                let lo = scale_by_power(ability.damage_min, attacker.power);
                let hi = scale_by_power(ability.damage_max, attacker.power);
                damage = if hi > lo { dice.range_inclusive(lo, hi) } else { lo };
            }
            Stage::Crit => {
                if dice.chance(crit_chance(attacker, ability, defender.tags)) {
                    result.was_crit = true;
                    damage = scaled(damage, CRIT_MULTIPLIER);
                }
            }
            Stage::Class => damage = scaled(damage, class_modifier),
            Stage::Environment => damage = scaled(damage, environment.modifier(damage_type)),
            Stage::Status => {
                damage = scaled(damage, status::damage_modifier(defender.effects, damage_type));
            }
            Stage::Falloff => {
                damage = scaled(damage, damage_percent / 100.0);
                if damage_percent > 0.0 {
                    damage = damage.max(1);
                }
            }
            Stage::ArmorSplit => {
                let armor_mod = defender.stats.armor_mod(damage_type)
                    * status::armor_modifier(defender.effects, damage_type);
                let split = split_damage(
                    damage,
                    defender.armor,
                    defender.stats.hp_mod(damage_type),
                    armor_mod,
                    ability.armor_piercing,
                    status::bypasses_armor(defender.active_armor, defender.effects),
                );
                result.hp_damage = split.hp_damage;
                result.armor_damage = split.armor_damage;
                result.overflow_applied = split.overflow_applied;
            }
        }
        trace!(?stage, damage, "damage stage");
    }
    result
}
