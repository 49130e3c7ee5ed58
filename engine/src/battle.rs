//! The turn state machine. A [`Battle`] owns both rosters, the seeded dice and
//! the event log; callers drive it one action, pass or surrender at a time.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::Dice;
use crate::combat::targeting::{self, Impact, TagHierarchy};
use crate::damage::{self, Defender, HitInput};
use crate::error::{Rejection, SetupError};
use crate::event::{ActionRecord, BattleEvent, EffectRecord, HitRecord, ShotRecord, TickRecord};
use crate::grid::{Grid, Position};
use crate::life::Vitals;
use crate::model::{
    Ability, ClassDamageMods, EffectFamily, Environment, UnitStats, UnitTemplate, Weapon,
};
use crate::status::{self, ActiveStatusEffect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player,
    Enemy,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Player => Side::Enemy,
            Side::Enemy => Side::Player,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Ongoing,
    PlayerWin,
    EnemyWin,
    /// Both sides ran out of units at the same boundary.
    Draw,
    /// `penalty` is false when the side gave up before losing any unit.
    Surrendered { side: Side, penalty: bool },
    TurnLimit,
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        self != Outcome::Ongoing
    }

    pub fn winner(self) -> Option<Side> {
        match self {
            Outcome::PlayerWin => Some(Side::Player),
            Outcome::EnemyWin => Some(Side::Enemy),
            Outcome::Surrendered { side, .. } => Some(side.opponent()),
            Outcome::Ongoing | Outcome::Draw | Outcome::TurnLimit => None,
        }
    }
}

/// Weapon and ability index on the acting unit's template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AbilityRef {
    pub weapon: usize,
    pub ability: usize,
}

impl AbilityRef {
    pub const fn new(weapon: usize, ability: usize) -> Self {
        Self { weapon, ability }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Action {
    pub unit: UnitId,
    pub ability: AbilityRef,
    pub target: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponState {
    pub ammo: i32,
    pub reload_remaining: u32,
    /// Per ability.
    pub cooldowns: Vec<u32>,
    /// Own turn boundaries since each ability was last used.
    pub charge: Vec<u32>,
}

impl WeaponState {
    fn fresh(weapon: &Weapon) -> Self {
        let n = weapon.abilities.len();
        Self { ammo: weapon.ammo, reload_remaining: 0, cooldowns: vec![0; n], charge: vec![0; n] }
    }
}

/// A unit on the field.
#[derive(Debug, Clone)]
pub struct UnitInstance {
    pub id: UnitId,
    pub side: Side,
    pub template: Arc<UnitTemplate>,
    pub rank: u32,
    pub stats: UnitStats,
    pub position: Position,
    pub vitals: Vitals,
    pub weapons: Vec<WeaponState>,
    pub global_cooldown: u32,
    pub effects: Vec<ActiveStatusEffect>,
}

impl UnitInstance {
    fn spawn(id: UnitId, side: Side, placement: &Placement) -> Result<Self, SetupError> {
        let template = Arc::clone(&placement.template);
        let stats = template
            .stats_at_rank(placement.rank)
            .cloned()
            .ok_or_else(|| SetupError::NoRanks(template.name.clone()))?;
        let weapons = template.weapons.iter().map(WeaponState::fresh).collect();
        Ok(Self {
            id,
            side,
            rank: placement.rank.max(1),
            vitals: Vitals::new(stats.hp, stats.armor),
            stats,
            position: placement.position,
            weapons,
            global_cooldown: 0,
            effects: Vec::new(),
            template,
        })
    }

    pub fn name(&self) -> &str {
        &self.template.name
    }

    pub fn is_alive(&self) -> bool {
        self.vitals.alive
    }

    pub fn is_stunned(&self) -> bool {
        status::blocks_action(&self.effects)
    }

    pub fn ability(&self, r: AbilityRef) -> Option<&Ability> {
        self.template.weapons.get(r.weapon)?.abilities.get(r.ability)
    }

    /// Cooldowns, ammo, reload and charge allow `r` right now.
    pub fn check_ready(&self, r: AbilityRef, ability: &Ability) -> Result<(), Rejection> {
        if self.global_cooldown > 0 {
            return Err(Rejection::GlobalCooldown { turns: self.global_cooldown });
        }
        let (Some(weapon), Some(state)) =
            (self.template.weapons.get(r.weapon), self.weapons.get(r.weapon))
        else {
            return Err(Rejection::UnknownAbility {
                unit: self.id,
                weapon: r.weapon,
                ability: r.ability,
            });
        };
        let cooldown = state.cooldowns.get(r.ability).copied().unwrap_or(0);
        if cooldown > 0 {
            return Err(Rejection::Cooldown { turns: cooldown });
        }
        if !weapon.unlimited() {
            if state.reload_remaining > 0 {
                return Err(Rejection::Reloading { turns: state.reload_remaining });
            }
            if state.ammo < ability.ammo_required as i32 {
                return Err(Rejection::OutOfAmmo {
                    required: ability.ammo_required,
                    available: state.ammo,
                });
            }
        }
        let charge = state.charge.get(r.ability).copied().unwrap_or(0);
        if charge < ability.charge_time {
            return Err(Rejection::Charging { turns: ability.charge_time - charge });
        }
        Ok(())
    }

    fn consume(&mut self, r: AbilityRef, ability: &Ability) {
        let Some(weapon) = self.template.weapons.get(r.weapon) else {
            return;
        };
        let Some(state) = self.weapons.get_mut(r.weapon) else {
            return;
        };
        if !weapon.unlimited() {
            state.ammo -= ability.ammo_required as i32;
            if state.ammo < 0 {
                warn!(unit = %self.id, ammo = state.ammo, "ammo went negative");
                debug_assert!(state.ammo >= 0, "ammo below zero");
                state.ammo = 0;
            }
            if state.ammo == 0 && weapon.reload_turns > 0 {
                state.reload_remaining = weapon.reload_turns;
            }
        }
        if let Some(cd) = state.cooldowns.get_mut(r.ability) {
            *cd = ability.cooldown;
        }
        if let Some(ch) = state.charge.get_mut(r.ability) {
            *ch = 0;
        }
        self.global_cooldown = ability.global_cooldown;
    }

    /// One own turn boundary for cooldowns, reloads and charge. Timers set by
    /// `used` during this turn start counting at the next boundary.
    fn tick_timers(&mut self, used: Option<AbilityRef>) {
        if used.is_none() {
            self.global_cooldown = self.global_cooldown.saturating_sub(1);
        }
        let weapons = self.weapons.iter_mut().zip(self.template.weapons.iter());
        for (wi, (state, weapon)) in weapons.enumerate() {
            let used_here = used.filter(|r| r.weapon == wi).map(|r| r.ability);
            if used_here.is_none() && state.reload_remaining > 0 {
                state.reload_remaining -= 1;
                if state.reload_remaining == 0 {
                    state.ammo = weapon.ammo;
                }
            }
            for (ai, ability) in weapon.abilities.iter().enumerate() {
                if used_here == Some(ai) {
                    continue;
                }
                if let Some(cd) = state.cooldowns.get_mut(ai) {
                    *cd = cd.saturating_sub(1);
                }
                if let Some(ch) = state.charge.get_mut(ai) {
                    *ch = (*ch + 1).min(ability.charge_time);
                }
            }
        }
    }
}

/// A unit to put on the field at setup or when a wave arrives.
#[derive(Debug, Clone)]
pub struct Placement {
    pub template: Arc<UnitTemplate>,
    pub rank: u32,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct BattleSetup {
    pub grid: Grid,
    pub environment: Environment,
    pub tags: TagHierarchy,
    pub class_damage_mods: ClassDamageMods,
    pub player: Vec<Placement>,
    /// Enemy waves in arrival order; the first is on the field from the start.
    pub waves: Vec<Vec<Placement>>,
    pub max_turns: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SideStats {
    pub damage_dealt: u64,
    pub damage_taken: u64,
    pub units_lost: u32,
    pub kills: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BattleStats {
    pub player: SideStats,
    pub enemy: SideStats,
}

impl BattleStats {
    pub fn side(&self, side: Side) -> &SideStats {
        match side {
            Side::Player => &self.player,
            Side::Enemy => &self.enemy,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut SideStats {
        match side {
            Side::Player => &mut self.player,
            Side::Enemy => &mut self.enemy,
        }
    }

    fn record_damage(&mut self, attacker: Side, amount: u32) {
        self.side_mut(attacker).damage_dealt += u64::from(amount);
        self.side_mut(attacker.opponent()).damage_taken += u64::from(amount);
    }

    fn record_death(&mut self, victim: Side) {
        self.side_mut(victim).units_lost += 1;
        self.side_mut(victim.opponent()).kills += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSnapshot {
    pub name: String,
    pub family: EffectFamily,
    pub remaining_turns: u32,
    pub original_dot_damage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: UnitId,
    pub side: Side,
    pub name: String,
    pub rank: u32,
    pub position: Position,
    pub hp: u32,
    pub max_hp: u32,
    pub armor: u32,
    pub max_armor: u32,
    pub alive: bool,
    pub stunned: bool,
    pub global_cooldown: u32,
    pub weapons: Vec<WeaponState>,
    pub effects: Vec<EffectSnapshot>,
}

/// Read-only copy of everything an observer may need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleSnapshot {
    pub turn: u32,
    pub side_to_act: Side,
    pub wave: u32,
    pub total_waves: u32,
    pub outcome: Outcome,
    pub stats: BattleStats,
    pub units: Vec<UnitSnapshot>,
}

#[derive(Debug, Clone)]
pub struct Battle {
    grid: Grid,
    environment: Environment,
    tags: TagHierarchy,
    class_damage_mods: ClassDamageMods,
    max_turns: Option<u32>,
    units: Vec<UnitInstance>,
    pending_waves: VecDeque<Vec<UnitInstance>>,
    wave: u32,
    total_waves: u32,
    turn: u32,
    side_to_act: Side,
    outcome: Outcome,
    stats: BattleStats,
    dice: Dice,
    events: Vec<BattleEvent>,
    narration: Vec<String>,
}

fn check_placements(grid: &Grid, side: Side, placements: &[Placement]) -> Result<(), SetupError> {
    let mut taken = BTreeSet::new();
    for p in placements {
        if !grid.is_playable(p.position) {
            return Err(SetupError::InvalidCell {
                unit: p.template.name.clone(),
                position: p.position,
            });
        }
        if !taken.insert(p.position) {
            return Err(SetupError::Occupied { side, position: p.position });
        }
    }
    Ok(())
}

impl Battle {
    /// Validate the rosters and put the player units and the first enemy wave
    /// on the field. Unit ids are handed out in roster order, player first,
    /// then each wave in turn.
    pub fn new(setup: BattleSetup, dice: Dice) -> Result<Self, SetupError> {
        if setup.player.is_empty() {
            return Err(SetupError::NoPlayerUnits);
        }
        if setup.waves.is_empty() {
            return Err(SetupError::NoWaves);
        }
        check_placements(&setup.grid, Side::Player, &setup.player)?;
        for (i, wave) in setup.waves.iter().enumerate() {
            if wave.is_empty() {
                return Err(SetupError::EmptyWave(i));
            }
            check_placements(&setup.grid, Side::Enemy, wave)?;
        }

        let mut next_id = 0u32;
        let mut spawn_all = |side: Side, placements: &[Placement]| {
            placements
                .iter()
                .map(|p| {
                    let id = UnitId(next_id);
                    next_id += 1;
                    UnitInstance::spawn(id, side, p)
                })
                .collect::<Result<Vec<_>, SetupError>>()
        };

        let mut units = spawn_all(Side::Player, &setup.player)?;
        let mut pending_waves = VecDeque::new();
        for wave in &setup.waves {
            pending_waves.push_back(spawn_all(Side::Enemy, wave)?);
        }
        if let Some(first) = pending_waves.pop_front() {
            units.extend(first);
        }

        debug!(units = units.len(), waves = setup.waves.len(), "battle set up");
        Ok(Self {
            grid: setup.grid,
            environment: setup.environment,
            tags: setup.tags,
            class_damage_mods: setup.class_damage_mods,
            max_turns: setup.max_turns,
            units,
            pending_waves,
            wave: 0,
            total_waves: setup.waves.len() as u32,
            turn: 1,
            side_to_act: Side::Player,
            outcome: Outcome::Ongoing,
            stats: BattleStats::default(),
            dice,
            events: Vec::new(),
            narration: Vec::new(),
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn side_to_act(&self) -> Side {
        self.side_to_act
    }

    /// 0-based index of the enemy wave on the field.
    pub fn wave(&self) -> u32 {
        self.wave
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_terminal()
    }

    pub fn terminal(&self) -> Option<Outcome> {
        self.outcome.is_terminal().then_some(self.outcome)
    }

    pub fn stats(&self) -> &BattleStats {
        &self.stats
    }

    pub fn dice(&self) -> &Dice {
        &self.dice
    }

    pub fn units(&self) -> &[UnitInstance] {
        &self.units
    }

    pub fn unit(&self, id: UnitId) -> Option<&UnitInstance> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn living(&self, side: Side) -> impl Iterator<Item = &UnitInstance> {
        self.units.iter().filter(move |u| u.side == side && u.is_alive())
    }

    pub fn events(&self) -> &[BattleEvent] {
        &self.events
    }

    /// Human-readable lines, in resolution order.
    pub fn narration(&self) -> &[String] {
        &self.narration
    }

    /// The event log as JSON lines.
    pub fn event_log_json(&self) -> serde_json::Result<Vec<String>> {
        self.events.iter().map(BattleEvent::to_json_line).collect()
    }

    /// Cells `unit` could aim `ability` at, ignoring cooldowns and ammo.
    pub fn valid_targets(&self, unit: UnitId, ability: AbilityRef) -> BTreeSet<Position> {
        let Some(attacker) = self.unit(unit).filter(|u| u.is_alive()) else {
            return BTreeSet::new();
        };
        let Some(def) = attacker.ability(ability) else {
            return BTreeSet::new();
        };
        targeting::valid_targets(&self.grid, &self.units, &self.tags, attacker, def)
    }

    /// Every action `side` could submit now, ordered by unit, weapon, ability, target.
    pub fn legal_actions(&self, side: Side) -> Vec<Action> {
        if self.is_terminal() || side != self.side_to_act {
            return Vec::new();
        }
        let mut actions = Vec::new();
        for unit in self.living(side).filter(|u| !u.is_stunned()) {
            for (wi, weapon) in unit.template.weapons.iter().enumerate() {
                for (ai, ability) in weapon.abilities.iter().enumerate() {
                    let r = AbilityRef::new(wi, ai);
                    if unit.check_ready(r, ability).is_err() {
                        continue;
                    }
                    let (grid, units, tags) = (&self.grid, &self.units, &self.tags);
                    let targets = targeting::valid_targets(grid, units, tags, unit, ability);
                    let id = unit.id;
                    actions.extend(
                        targets.into_iter().map(|target| Action { unit: id, ability: r, target }),
                    );
                }
            }
        }
        actions
    }

    fn validate(&self, action: &Action) -> Result<usize, Rejection> {
        if self.is_terminal() {
            return Err(Rejection::BattleOver);
        }
        let idx = self
            .units
            .iter()
            .position(|u| u.id == action.unit)
            .ok_or(Rejection::UnknownUnit { unit: action.unit })?;
        let unit = &self.units[idx];
        if unit.side != self.side_to_act {
            return Err(Rejection::NotYourTurn { expected: self.side_to_act, got: unit.side });
        }
        if !unit.is_alive() {
            return Err(Rejection::UnitDead { unit: unit.id });
        }
        if unit.is_stunned() {
            return Err(Rejection::Stunned { unit: unit.id });
        }
        let ability = unit.ability(action.ability).ok_or(Rejection::UnknownAbility {
            unit: unit.id,
            weapon: action.ability.weapon,
            ability: action.ability.ability,
        })?;
        unit.check_ready(action.ability, ability)?;
        let targets = targeting::valid_targets(&self.grid, &self.units, &self.tags, unit, ability);
        if !targets.contains(&action.target) {
            return Err(Rejection::InvalidTarget { target: action.target });
        }
        Ok(idx)
    }

    /// Validate and fully resolve one action. On rejection nothing changes.
    pub fn apply_action(&mut self, action: Action) -> Result<BattleEvent, Rejection> {
        let idx = self.validate(&action)?;
        let side = self.side_to_act;
        let turn = self.turn;
        let attacker = &mut self.units[idx];
        let Some(ability) = attacker.ability(action.ability).cloned() else {
            return Err(Rejection::UnknownAbility {
                unit: action.unit,
                weapon: action.ability.weapon,
                ability: action.ability.ability,
            });
        };
        attacker.consume(action.ability, &ability);
        self.narration.push(format!(
            "[ACT][{}] {} uses {} on {}",
            side_label(side),
            attacker.template.name,
            ability.name,
            action.target
        ));
        debug!(
            unit = %action.unit,
            ability = %ability.name,
            aim = %action.target,
            "resolving action"
        );

        let mut deaths = Vec::new();
        let mut shots = Vec::new();
        for shot in 0..ability.total_shots() {
            let impacts =
                targeting::resolve_impacts(&self.grid, &ability, action.target, &mut self.dice);
            let hits = impacts
                .into_iter()
                .filter_map(|impact| self.resolve_hit(idx, &ability, impact, &mut deaths))
                .collect();
            shots.push(ShotRecord { shot, hits });
        }

        let ticks = self.end_turn(side, Some((action.unit, action.ability)), &mut deaths);
        let wave_spawned = self.evaluate();
        self.advance();
        let record = ActionRecord::Attack {
            unit: action.unit,
            ability: action.ability,
            ability_name: ability.name.clone(),
            aim: action.target,
            shots,
        };
        Ok(self.record(turn, side, record, ticks, deaths, wave_spawned))
    }

    fn resolve_hit(
        &mut self,
        attacker_idx: usize,
        ability: &Ability,
        impact: Impact,
        deaths: &mut Vec<UnitId>,
    ) -> Option<HitRecord> {
        let attacking = self.units[attacker_idx].side;
        let attacker_id = self.units[attacker_idx].id;
        let defending = attacking.opponent();
        let target_idx = self
            .units
            .iter()
            .position(|u| u.side == defending && u.is_alive() && u.position == impact.cell)?;
        let target_id = self.units[target_idx].id;

        let mut record = HitRecord {
            target: target_id,
            cell: impact.cell,
            damage_percent: impact.damage_percent,
            blocked_by: None,
            dodged: false,
            crit: false,
            hp_damage: 0,
            armor_damage: 0,
            overflow: false,
            killed: false,
            effects: Vec::new(),
        };

        let blocked = targeting::blocker(&self.units, defending, impact.cell, ability.line_of_fire);
        if let Some(by) = blocked {
            let name = &self.units[target_idx].template.name;
            self.narration.push(format!("[BLOCK][{}] shielded by {}", name, by));
            record.blocked_by = Some(by);
            return Some(record);
        }

        let result = {
            let attacker = &self.units[attacker_idx];
            let target = &self.units[target_idx];
            let input = HitInput {
                attacker: &attacker.stats,
                ability,
                defender: Defender {
                    stats: &target.stats,
                    tags: &target.template.tags,
                    armor: target.vitals.armor,
                    effects: &target.effects,
                    active_armor: target.template.active_armor,
                },
                environment: &self.environment,
                class_modifier: self
                    .class_damage_mods
                    .modifier(attacker.template.class, target.template.class),
                damage_percent: impact.damage_percent,
            };
            damage::compute_hit(&input, &mut self.dice)
        };
        trace!(defender = %target_id, ?result, "hit resolved");

        record.dodged = result.was_dodged;
        record.crit = result.was_crit;
        let target = &mut self.units[target_idx];
        if result.was_dodged {
            self.narration.push(format!("[MISS][{}] dodges", target.template.name));
            return Some(record);
        }
        if result.was_crit {
            self.narration.push(format!("[CRIT][{}] critical hit", target.template.name));
        }

        record.hp_damage = result.hp_damage;
        record.armor_damage = result.armor_damage;
        record.overflow = result.overflow_applied;
        let narration = &mut self.narration;
        let died =
            target.vitals.apply(&target.template.name, &result.split(), |m| narration.push(m));
        self.stats.record_damage(attacking, result.dealt());

        if died {
            record.killed = true;
            deaths.push(target_id);
            self.stats.record_death(defending);
            return Some(record);
        }

        for chance in &ability.effects {
            let (outcome, dot_damage) = status::inflict(
                &target.template.name,
                &mut target.effects,
                &target.template.immunities,
                chance,
                result.dealt(),
                &self.environment,
                Some(attacker_id),
                &mut self.dice,
                |m| narration.push(m),
            );
            record.effects.push(EffectRecord {
                effect: chance.effect.name.clone(),
                outcome,
                dot_damage,
            });
        }
        Some(record)
    }

    /// Turn boundary for `side`: effects tick, then timers.
    fn end_turn(
        &mut self,
        side: Side,
        used: Option<(UnitId, AbilityRef)>,
        deaths: &mut Vec<UnitId>,
    ) -> Vec<TickRecord> {
        let mut ticks = Vec::new();
        for unit in self.units.iter_mut().filter(|u| u.side == side && u.is_alive()) {
            let narration = &mut self.narration;
            let unit_ticks = status::tick_effects(
                &unit.template.name,
                &unit.stats,
                unit.template.active_armor,
                &mut unit.vitals,
                &mut unit.effects,
                |m| narration.push(m),
            );
            for tick in unit_ticks {
                self.stats.record_damage(side.opponent(), tick.hp_damage + tick.armor_damage);
                ticks.push(TickRecord { unit: unit.id, tick });
            }
            if !unit.is_alive() {
                deaths.push(unit.id);
                self.stats.record_death(side);
                continue;
            }
            let used_here = used.filter(|(id, _)| *id == unit.id).map(|(_, r)| r);
            unit.tick_timers(used_here);
        }
        ticks
    }

    fn has_important_alive(&self, side: Side) -> bool {
        self.living(side).any(|u| !u.template.unimportant)
    }

    /// Settle the outcome after a boundary. Returns the index of a wave that
    /// just arrived, if the enemy side was cleared and another wave was waiting.
    /// Both sides falling together is a draw only when no wave is left; a
    /// waiting wave means the enemy still holds the field.
    fn evaluate(&mut self) -> Option<u32> {
        let player = self.has_important_alive(Side::Player);
        let enemy = self.has_important_alive(Side::Enemy);
        match (player, enemy) {
            (true, true) => None,
            (false, false) if self.pending_waves.is_empty() => {
                self.finish(Outcome::Draw);
                None
            }
            (false, _) => {
                self.finish(Outcome::EnemyWin);
                None
            }
            (true, false) => match self.pending_waves.pop_front() {
                Some(next) => {
                    self.wave += 1;
                    self.narration.push(format!("[WAVE] wave {} arrives", self.wave + 1));
                    debug!(wave = self.wave, units = next.len(), "next wave");
                    self.units.extend(next);
                    Some(self.wave)
                }
                None => {
                    self.finish(Outcome::PlayerWin);
                    None
                }
            },
        }
    }

    fn finish(&mut self, outcome: Outcome) {
        self.outcome = outcome;
        self.narration.push(format!("[END] {:?}", outcome));
        debug!(?outcome, turn = self.turn, "battle over");
    }

    fn advance(&mut self) {
        if self.is_terminal() {
            return;
        }
        self.side_to_act = self.side_to_act.opponent();
        if self.side_to_act == Side::Player {
            self.turn += 1;
            if self.max_turns.is_some_and(|max| self.turn > max) {
                self.finish(Outcome::TurnLimit);
            }
        }
    }

    fn record(
        &mut self,
        turn: u32,
        side: Side,
        action: ActionRecord,
        ticks: Vec<TickRecord>,
        deaths: Vec<UnitId>,
        wave_spawned: Option<u32>,
    ) -> BattleEvent {
        let event = BattleEvent {
            seq: self.events.len() as u32,
            turn,
            side,
            action,
            ticks,
            deaths,
            wave_spawned,
            outcome: self.outcome,
        };
        self.events.push(event.clone());
        event
    }

    fn check_side(&self, side: Side) -> Result<(), Rejection> {
        if self.is_terminal() {
            return Err(Rejection::BattleOver);
        }
        if side != self.side_to_act {
            return Err(Rejection::NotYourTurn { expected: self.side_to_act, got: side });
        }
        Ok(())
    }

    /// End the turn without acting. Only allowed when `side` has no legal action.
    pub fn pass(&mut self, side: Side) -> Result<BattleEvent, Rejection> {
        self.check_side(side)?;
        if !self.legal_actions(side).is_empty() {
            return Err(Rejection::PassNotAllowed);
        }
        let turn = self.turn;
        self.narration.push(format!("[PASS][{}] no action available", side_label(side)));
        let mut deaths = Vec::new();
        let ticks = self.end_turn(side, None, &mut deaths);
        let wave_spawned = self.evaluate();
        self.advance();
        Ok(self.record(turn, side, ActionRecord::Pass, ticks, deaths, wave_spawned))
    }

    /// Concede. The penalty flag records whether the side had already lost a unit.
    pub fn surrender(&mut self, side: Side) -> Result<BattleEvent, Rejection> {
        self.check_side(side)?;
        let penalty = self.units.iter().any(|u| u.side == side && !u.is_alive());
        let turn = self.turn;
        self.finish(Outcome::Surrendered { side, penalty });
        let action = ActionRecord::Surrender { penalty };
        Ok(self.record(turn, side, action, Vec::new(), Vec::new(), None))
    }

    pub fn snapshot(&self) -> BattleSnapshot {
        BattleSnapshot {
            turn: self.turn,
            side_to_act: self.side_to_act,
            wave: self.wave,
            total_waves: self.total_waves,
            outcome: self.outcome,
            stats: self.stats,
            units: self
                .units
                .iter()
                .map(|u| UnitSnapshot {
                    id: u.id,
                    side: u.side,
                    name: u.template.name.clone(),
                    rank: u.rank,
                    position: u.position,
                    hp: u.vitals.hp,
                    max_hp: u.vitals.max_hp,
                    armor: u.vitals.armor,
                    max_armor: u.vitals.max_armor,
                    alive: u.is_alive(),
                    stunned: u.is_stunned(),
                    global_cooldown: u.global_cooldown,
                    weapons: u.weapons.clone(),
                    effects: u
                        .effects
                        .iter()
                        .map(|e| EffectSnapshot {
                            name: e.effect.name.clone(),
                            family: e.effect.family,
                            remaining_turns: e.remaining_turns,
                            original_dot_damage: e.original_dot_damage,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

fn side_label(side: Side) -> &'static str {
    match side {
        Side::Player => "player",
        Side::Enemy => "enemy",
    }
}
