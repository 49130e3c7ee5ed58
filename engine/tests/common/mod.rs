#![allow(dead_code)]

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tactics_engine::battle::{AbilityRef, Action, Battle, BattleSetup, Placement, Side, UnitId};
use tactics_engine::combat::targeting::TagHierarchy;
use tactics_engine::grid::{Grid, Position};
use tactics_engine::model::{Ability, ClassDamageMods, Environment, UnitTemplate};
use tactics_engine::Dice;

pub fn from_json<T: DeserializeOwned>(v: Value) -> T {
    serde_json::from_value(v).expect("test fixture should deserialize")
}

pub fn ability(v: Value) -> Ability {
    from_json(v)
}

/// Unit with one unlimited weapon carrying `abilities`. `stats` is merged over
/// `{"hp": 100}`.
pub fn unit(id: u32, name: &str, stats: Value, abilities: Vec<Value>) -> Arc<UnitTemplate> {
    let mut rank = json!({ "hp": 100 });
    if let (Some(base), Some(extra)) = (rank.as_object_mut(), stats.as_object()) {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }
    let weapons = if abilities.is_empty() {
        json!([])
    } else {
        json!([{ "name": "Weapon", "abilities": abilities }])
    };
    Arc::new(from_json(json!({
        "id": id,
        "name": name,
        "ranks": [rank],
        "weapons": weapons,
    })))
}

pub fn with_template(v: Value) -> Arc<UnitTemplate> {
    Arc::new(from_json(v))
}

pub fn at(template: &Arc<UnitTemplate>, col: u8, row: u8) -> Placement {
    Placement { template: Arc::clone(template), rank: 1, position: Position::new(col, row) }
}

pub fn setup(player: Vec<Placement>, enemy: Vec<Placement>) -> BattleSetup {
    BattleSetup {
        grid: Grid::equal_5x3(),
        environment: Environment::default(),
        tags: TagHierarchy::default(),
        class_damage_mods: ClassDamageMods::default(),
        player,
        waves: vec![enemy],
        max_turns: None,
    }
}

/// Never dodged, never crits, picks the top of every damage range, passes
/// every effect roll below 99%.
pub fn steady_dice() -> Dice {
    Dice::from_scripted(vec![0.99])
}

pub fn battle(player: Vec<Placement>, enemy: Vec<Placement>) -> Battle {
    Battle::new(setup(player, enemy), steady_dice()).expect("valid setup")
}

pub fn id_at(battle: &Battle, side: Side, col: u8, row: u8) -> UnitId {
    battle
        .units()
        .iter()
        .find(|u| u.side == side && u.position == Position::new(col, row))
        .map(|u| u.id)
        .expect("unit at position")
}

pub fn act(unit: UnitId, col: u8, row: u8) -> Action {
    Action { unit, ability: AbilityRef::new(0, 0), target: Position::new(col, row) }
}

pub fn hp(battle: &Battle, id: UnitId) -> u32 {
    battle.unit(id).map(|u| u.vitals.hp).unwrap_or(0)
}
