//! Immutable unit, weapon, ability and status-effect definitions.
//!
//! These are loaded once (see [`crate::scenario`]) and shared by every
//! instance spawned from them. Runtime state lives in [`crate::battle`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    #[default]
    Piercing,
    Cold,
    Crushing,
    Explosive,
    Fire,
    Torpedo,
    DepthCharge,
    Melee,
    Projectile,
    Shell,
    Poison,
}

/// How an attack travels to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LineOfFire {
    /// Melee; only the nearest living unit of a column can be hit.
    Contact,
    #[default]
    Direct,
    Precise,
    /// Arcs over everything.
    Indirect,
}

/// How much a unit obstructs attacks aimed at cells behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Blocking {
    #[default]
    None,
    Partial,
    Full,
    God,
}

impl LineOfFire {
    /// Whether a unit with `blocking` standing in front of the target stops this attack.
    pub fn is_blocked_by(self, blocking: Blocking) -> bool {
        match (self, blocking) {
            (_, Blocking::None) => false,
            (LineOfFire::Contact, _) => false,
            (LineOfFire::Indirect, _) => false,
            (LineOfFire::Direct, Blocking::Partial | Blocking::Full | Blocking::God) => true,
            (LineOfFire::Precise, Blocking::Partial) => false,
            (LineOfFire::Precise, Blocking::Full | Blocking::God) => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttackDirection {
    #[default]
    Any,
    /// Only targets in a higher row index than the attacker.
    Forward,
    /// Only targets in a lower row index than the attacker.
    Backward,
}

/// A unit class/type tag. Tags form a hierarchy, see [`crate::combat::targeting::TagHierarchy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(pub u16);

/// A unit class for class-versus-class damage multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub u16);

/// Damage multipliers keyed by attacker class, then defender class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ClassDamageMods(pub BTreeMap<ClassId, BTreeMap<ClassId, f64>>);

impl ClassDamageMods {
    /// 1.0 when either unit has no class or the pair has no entry.
    pub fn modifier(&self, attacker: Option<ClassId>, defender: Option<ClassId>) -> f64 {
        let (Some(attacker), Some(defender)) = (attacker, defender) else {
            return 1.0;
        };
        self.0
            .get(&attacker)
            .and_then(|row| row.get(&defender))
            .copied()
            .unwrap_or(1.0)
    }
}

fn one_u32() -> u32 {
    1
}

fn full_percent() -> f64 {
    100.0
}

fn unlimited_ammo() -> i32 {
    -1
}

fn default_weight() -> u32 {
    100
}

fn unit_multiplier() -> f64 {
    1.0
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitStats {
    pub hp: u32,
    #[serde(default)]
    pub armor: u32,
    #[serde(default)]
    pub defense: i32,
    #[serde(default)]
    pub accuracy: i32,
    #[serde(default)]
    pub power: i32,
    /// Base critical chance in percent.
    #[serde(default)]
    pub critical: f64,
    #[serde(default)]
    pub blocking: Blocking,
    #[serde(default = "one_u32")]
    pub size: u32,
    /// HP damage multiplier per damage type; missing entries are 1.0.
    #[serde(default)]
    pub damage_mods: BTreeMap<DamageType, f64>,
    /// Armor damage multiplier per damage type; missing entries are 1.0.
    #[serde(default)]
    pub armor_damage_mods: BTreeMap<DamageType, f64>,
}

impl UnitStats {
    pub fn hp_mod(&self, damage_type: DamageType) -> f64 {
        self.damage_mods.get(&damage_type).copied().unwrap_or(1.0)
    }

    pub fn armor_mod(&self, damage_type: DamageType) -> f64 {
        self.armor_damage_mods.get(&damage_type).copied().unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitTemplate {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub class: Option<ClassId>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Stats for rank 1, 2, ...
    pub ranks: Vec<UnitStats>,
    #[serde(default)]
    pub weapons: Vec<Weapon>,
    #[serde(default)]
    pub immunities: BTreeSet<EffectFamily>,
    /// Armor that stun effects flagged `bypasses_active_armor` can skip.
    #[serde(default)]
    pub active_armor: bool,
    /// Does not count towards defeat when it is the last unit standing.
    #[serde(default)]
    pub unimportant: bool,
}

impl UnitTemplate {
    /// Stats for a 1-based rank, clamped to the ranks that exist.
    pub fn stats_at_rank(&self, rank: u32) -> Option<&UnitStats> {
        if self.ranks.is_empty() {
            return None;
        }
        let idx = (rank.max(1) as usize - 1).min(self.ranks.len() - 1);
        self.ranks.get(idx)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    pub name: String,
    /// Rounds in a full magazine; `-1` never runs out.
    #[serde(default = "unlimited_ammo")]
    pub ammo: i32,
    /// Turn boundaries needed to refill an emptied magazine; 0 never refills.
    #[serde(default)]
    pub reload_turns: u32,
    pub abilities: Vec<Ability>,
}

impl Weapon {
    pub fn unlimited(&self) -> bool {
        self.ammo < 0
    }
}

/// Inclusive bounds on cross-grid distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeBand {
    pub min: u32,
    pub max: u32,
}

/// An offset (or, for [`TargetArea::Fixed`], an absolute cell) with the damage share it takes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaCell {
    pub dx: i32,
    pub dy: i32,
    #[serde(default = "full_percent")]
    pub damage_percent: f64,
    /// Impact order for staggered attacks.
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedCell {
    pub dx: i32,
    pub dy: i32,
    #[serde(default = "full_percent")]
    pub damage_percent: f64,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

/// Where a shot lands relative to the aimed cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetArea {
    #[default]
    Single,
    /// Offsets from the aimed cell.
    Reticle { cells: Vec<AreaCell> },
    /// Absolute cells on the defending grid; the aim is ignored.
    Fixed { cells: Vec<AreaCell> },
    /// One offset drawn by weight per shot.
    RandomWeighted { cells: Vec<WeightedCell> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    pub name: String,
    pub damage_min: u32,
    pub damage_max: u32,
    #[serde(default)]
    pub damage_type: DamageType,
    #[serde(default)]
    pub line_of_fire: LineOfFire,
    #[serde(default)]
    pub direction: AttackDirection,
    #[serde(default)]
    pub range: Option<RangeBand>,
    #[serde(default)]
    pub target_area: TargetArea,
    /// Splash overlaid on every impact.
    #[serde(default)]
    pub damage_area: Vec<AreaCell>,
    #[serde(default)]
    pub staggered: bool,
    #[serde(default = "one_u32")]
    pub shots_per_attack: u32,
    #[serde(default = "one_u32")]
    pub attacks_per_use: u32,
    /// Share of damage that ignores armor, in percent.
    #[serde(default)]
    pub armor_piercing: f64,
    /// Added to the attacker's accuracy for dodge.
    #[serde(default)]
    pub attack: i32,
    #[serde(default)]
    pub crit_percent: f64,
    /// Extra crit chance against defenders carrying a tag.
    #[serde(default)]
    pub crit_bonuses: BTreeMap<Tag, f64>,
    #[serde(default)]
    pub effects: Vec<EffectChance>,
    #[serde(default = "one_u32")]
    pub ammo_required: u32,
    #[serde(default)]
    pub cooldown: u32,
    #[serde(default)]
    pub global_cooldown: u32,
    #[serde(default)]
    pub charge_time: u32,
    /// Empty means any unit can be targeted.
    #[serde(default)]
    pub targets: Vec<Tag>,
    #[serde(default)]
    pub excluded: Vec<Tag>,
}

impl Ability {
    pub fn total_shots(&self) -> u32 {
        self.shots_per_attack * self.attacks_per_use
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectFamily {
    Bleed,
    Poison,
    Freeze,
    Shock,
    Fire,
    Water,
    Acid,
    Corrosion,
    Burn,
    Weaken,
    Slow,
    Stagger,
    Stun,
    Marked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DotSpec {
    #[serde(default)]
    pub damage_type: DamageType,
    /// Flat amount added to the triggering hit before scaling.
    #[serde(default)]
    pub bonus_damage: f64,
    #[serde(default = "unit_multiplier")]
    pub ability_damage_mult: f64,
    #[serde(default)]
    pub armor_piercing: f64,
    #[serde(default = "yes")]
    pub diminishing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffectDef {
    pub id: u32,
    pub name: String,
    pub family: EffectFamily,
    pub duration: u32,
    #[serde(default)]
    pub dot: Option<DotSpec>,
    /// The affected unit cannot act.
    #[serde(default)]
    pub blocks_action: bool,
    #[serde(default)]
    pub bypasses_active_armor: bool,
    /// Multiplies incoming damage of a type while active.
    #[serde(default)]
    pub damage_mods: BTreeMap<DamageType, f64>,
    #[serde(default)]
    pub armor_damage_mods: BTreeMap<DamageType, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectChance {
    /// Percent.
    #[serde(default = "full_percent")]
    pub chance: f64,
    pub effect: StatusEffectDef,
}

/// Battlefield-wide damage multipliers, e.g. a burning map boosting fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Environment {
    #[serde(default)]
    pub damage_mods: BTreeMap<DamageType, f64>,
}

impl Environment {
    pub fn modifier(&self, damage_type: DamageType) -> f64 {
        self.damage_mods.get(&damage_type).copied().unwrap_or(1.0)
    }
}
