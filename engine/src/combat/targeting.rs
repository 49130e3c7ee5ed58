//! Who an ability may aim at, which units stand in the way, and which cells a
//! shot actually lands on.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::Dice;
use crate::battle::{Side, UnitId, UnitInstance};
use crate::grid::{Grid, Position};
use crate::model::{Ability, AttackDirection, LineOfFire, Tag, TargetArea, WeightedCell};

/// Parent tag → child tags. Targeting a parent also targets every descendant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagHierarchy {
    children: BTreeMap<Tag, Vec<Tag>>,
}

impl TagHierarchy {
    pub fn new(children: BTreeMap<Tag, Vec<Tag>>) -> Self {
        Self { children }
    }

    /// `tags` plus all of their descendants.
    pub fn expand(&self, tags: &[Tag]) -> BTreeSet<Tag> {
        let mut out = BTreeSet::new();
        let mut stack: Vec<Tag> = tags.to_vec();
        while let Some(tag) = stack.pop() {
            if out.insert(tag) {
                if let Some(kids) = self.children.get(&tag) {
                    stack.extend(kids.iter().copied());
                }
            }
        }
        out
    }

    /// An ability without target tags can hit anything not excluded.
    pub fn can_target(&self, ability: &Ability, unit_tags: &[Tag]) -> bool {
        let excluded = self.expand(&ability.excluded);
        if unit_tags.iter().any(|t| excluded.contains(t)) {
            return false;
        }
        if ability.targets.is_empty() {
            return true;
        }
        let targets = self.expand(&ability.targets);
        unit_tags.iter().any(|t| targets.contains(t))
    }
}

/// Distance across the gap between the two grids: both rows count from the
/// front, plus one for the gap, plus half the column offset.
pub fn distance(attacker: Position, target: Position) -> u32 {
    let dc = u32::from(attacker.col.abs_diff(target.col));
    u32::from(attacker.row) + u32::from(target.row) + 1 + dc / 2
}

pub fn direction_allows(direction: AttackDirection, attacker: Position, target: Position) -> bool {
    match direction {
        AttackDirection::Any => true,
        AttackDirection::Forward => target.row > attacker.row,
        AttackDirection::Backward => target.row < attacker.row,
    }
}

fn living_in_front<'a>(
    units: &'a [UnitInstance],
    side: Side,
    cell: Position,
) -> impl Iterator<Item = &'a UnitInstance> + 'a {
    let mut front: Vec<&UnitInstance> = units
        .iter()
        .filter(|u| u.side == side && u.is_alive())
        .filter(|u| u.position.col == cell.col && u.position.row < cell.row)
        .collect();
    front.sort_by_key(|u| u.position.row);
    front.into_iter()
}

/// The first living unit of `side` in front of `cell` (same column, front to
/// back) whose blocking level stops `line_of_fire`.
pub fn blocker(
    units: &[UnitInstance],
    side: Side,
    cell: Position,
    line_of_fire: LineOfFire,
) -> Option<UnitId> {
    living_in_front(units, side, cell)
        .find(|u| line_of_fire.is_blocked_by(u.stats.blocking))
        .map(|u| u.id)
}

/// Nothing alive stands in front of `cell` in its column.
pub fn is_nearest_in_column(units: &[UnitInstance], side: Side, cell: Position) -> bool {
    living_in_front(units, side, cell).next().is_none()
}

/// Cells the attacker may aim `ability` at: living enemy units passing tag,
/// range, direction, contact and blocking rules.
pub fn valid_targets(
    grid: &Grid,
    units: &[UnitInstance],
    tags: &TagHierarchy,
    attacker: &UnitInstance,
    ability: &Ability,
) -> BTreeSet<Position> {
    let defending = attacker.side.opponent();
    units
        .iter()
        .filter(|u| u.side == defending && u.is_alive() && grid.is_playable(u.position))
        .filter(|u| tags.can_target(ability, &u.template.tags))
        .filter(|u| {
            ability.range.is_none_or(|r| {
                let d = distance(attacker.position, u.position);
                (r.min..=r.max).contains(&d)
            })
        })
        .filter(|u| direction_allows(ability.direction, attacker.position, u.position))
        .filter(|u| {
            ability.line_of_fire != LineOfFire::Contact
                || is_nearest_in_column(units, defending, u.position)
        })
        .filter(|u| blocker(units, defending, u.position, ability.line_of_fire).is_none())
        .map(|u| u.position)
        .collect()
}

/// One cell a shot lands on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Impact {
    pub cell: Position,
    pub damage_percent: f64,
    pub order: u32,
}

/// Pick one entry by weight. The roll is scaled to the total weight and the
/// first entry whose cumulative weight reaches it wins, so ties go to the
/// entry declared first.
pub fn pick_weighted<'a>(cells: &'a [WeightedCell], dice: &mut Dice) -> Option<&'a WeightedCell> {
    let total: u64 = cells.iter().map(|c| u64::from(c.weight)).sum();
    if total == 0 {
        return None;
    }
    let roll = dice.unit() * total as f64;
    let mut cumulative = 0u64;
    for cell in cells.iter().filter(|c| c.weight > 0) {
        cumulative += u64::from(cell.weight);
        if roll <= cumulative as f64 {
            return Some(cell);
        }
    }
    cells.iter().rev().find(|c| c.weight > 0)
}

/// Cells hit by one shot aimed at `aim`.
///
/// The target area gives the primary impacts, the damage area is overlaid on
/// each of them (percentages multiply). Off-grid and dead cells drop out.
/// Overlapping cells keep their highest percentage, unless the ability is
/// staggered: then every impact stands on its own, in `order`.
pub fn resolve_impacts(
    grid: &Grid,
    ability: &Ability,
    aim: Position,
    dice: &mut Dice,
) -> Vec<Impact> {
    let primaries: Vec<Impact> = match &ability.target_area {
        TargetArea::Single => vec![Impact { cell: aim, damage_percent: 100.0, order: 0 }],
        TargetArea::Reticle { cells } => cells
            .iter()
            .filter_map(|c| {
                aim.offset(c.dx, c.dy)
                    .map(|cell| Impact { cell, damage_percent: c.damage_percent, order: c.order })
            })
            .collect(),
        TargetArea::Fixed { cells } => cells
            .iter()
            .filter_map(|c| {
                Position::new(0, 0)
                    .offset(c.dx, c.dy)
                    .map(|cell| Impact { cell, damage_percent: c.damage_percent, order: c.order })
            })
            .collect(),
        TargetArea::RandomWeighted { cells } => pick_weighted(cells, dice)
            .and_then(|c| {
                aim.offset(c.dx, c.dy)
                    .map(|cell| Impact { cell, damage_percent: c.damage_percent, order: 0 })
            })
            .into_iter()
            .collect(),
    };

    let mut impacts = Vec::new();
    for primary in primaries {
        if ability.damage_area.is_empty() {
            impacts.push(primary);
            continue;
        }
        for splash in &ability.damage_area {
            if let Some(cell) = primary.cell.offset(splash.dx, splash.dy) {
                impacts.push(Impact {
                    cell,
                    damage_percent: primary.damage_percent * splash.damage_percent / 100.0,
                    order: primary.order + splash.order,
                });
            }
        }
    }
    impacts.retain(|i| grid.is_playable(i.cell));

    if ability.staggered {
        impacts.sort_by_key(|i| i.order);
        return impacts;
    }

    let mut merged: IndexMap<Position, Impact> = IndexMap::new();
    for impact in impacts {
        merged
            .entry(impact.cell)
            .and_modify(|m| {
                if impact.damage_percent > m.damage_percent {
                    m.damage_percent = impact.damage_percent;
                }
            })
            .or_insert(impact);
    }
    merged.into_values().collect()
}
