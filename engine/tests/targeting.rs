mod common;

use std::collections::{BTreeMap, BTreeSet};

use common::{ability, act, at, battle, id_at, setup, steady_dice, unit};
use serde_json::json;
use tactics_engine::battle::{AbilityRef, Battle, Side};
use tactics_engine::combat::targeting::{blocker, distance, is_nearest_in_column, TagHierarchy};
use tactics_engine::grid::Position;
use tactics_engine::model::{Blocking, LineOfFire, Tag};

fn positions(list: &[(u8, u8)]) -> BTreeSet<Position> {
    list.iter().map(|&(c, r)| Position::new(c, r)).collect()
}

fn shooter(line_of_fire: &str) -> serde_json::Value {
    json!({ "name": "Shot", "damage_min": 10, "damage_max": 10, "line_of_fire": line_of_fire })
}

#[test]
fn line_of_fire_blocking_table() {
    use Blocking::*;
    use LineOfFire::*;
    assert!(Direct.is_blocked_by(Partial));
    assert!(Direct.is_blocked_by(God));
    assert!(!Precise.is_blocked_by(Partial));
    assert!(Precise.is_blocked_by(Full));
    assert!(Precise.is_blocked_by(God));
    assert!(!Indirect.is_blocked_by(God));
    assert!(!Contact.is_blocked_by(God));
    for lof in [Contact, Direct, Precise, Indirect] {
        assert!(!lof.is_blocked_by(None));
    }
}

fn column_fixture(line_of_fire: &str) -> Battle {
    let gunner = unit(1, "Gunner", json!({}), vec![shooter(line_of_fire)]);
    let wall = unit(2, "Wall", json!({ "blocking": "partial" }), vec![]);
    let grunt = unit(3, "Grunt", json!({}), vec![]);
    battle(
        vec![at(&gunner, 2, 0)],
        vec![at(&wall, 2, 0), at(&grunt, 2, 1), at(&grunt, 2, 2), at(&grunt, 0, 1)],
    )
}

#[test]
fn partial_blocker_shields_its_column_from_direct_fire() {
    let b = column_fixture("direct");
    let me = id_at(&b, Side::Player, 2, 0);
    assert_eq!(b.valid_targets(me, AbilityRef::new(0, 0)), positions(&[(2, 0), (0, 1)]));
}

#[test]
fn precise_and_indirect_pass_a_partial_blocker() {
    for lof in ["precise", "indirect"] {
        let b = column_fixture(lof);
        let me = id_at(&b, Side::Player, 2, 0);
        assert_eq!(
            b.valid_targets(me, AbilityRef::new(0, 0)),
            positions(&[(2, 0), (2, 1), (2, 2), (0, 1)]),
            "{lof}"
        );
    }
}

#[test]
fn first_qualifying_blocker_front_to_back_is_reported() {
    let gunner = unit(1, "Gunner", json!({}), vec![shooter("precise")]);
    let light = unit(2, "Sandbags", json!({ "blocking": "partial" }), vec![]);
    let heavy = unit(3, "Bunker", json!({ "blocking": "full" }), vec![]);
    let grunt = unit(4, "Grunt", json!({}), vec![]);
    let b = battle(
        vec![at(&gunner, 1, 0)],
        vec![at(&light, 1, 0), at(&heavy, 1, 1), at(&grunt, 1, 2)],
    );
    let cell = Position::new(1, 2);
    assert_eq!(
        blocker(b.units(), Side::Enemy, cell, LineOfFire::Precise),
        Some(id_at(&b, Side::Enemy, 1, 1))
    );
    assert_eq!(
        blocker(b.units(), Side::Enemy, cell, LineOfFire::Direct),
        Some(id_at(&b, Side::Enemy, 1, 0))
    );
    assert_eq!(blocker(b.units(), Side::Enemy, cell, LineOfFire::Indirect), None);
}

#[test]
fn dead_blockers_stop_blocking() {
    let gunner = unit(1, "Gunner", json!({}), vec![shooter("direct")]);
    let wall = unit(2, "Wall", json!({ "hp": 10, "blocking": "full" }), vec![]);
    let grunt = unit(3, "Grunt", json!({}), vec![]);
    let mut b = battle(vec![at(&gunner, 2, 0)], vec![at(&wall, 2, 0), at(&grunt, 2, 1)]);
    let me = id_at(&b, Side::Player, 2, 0);
    assert!(!b.valid_targets(me, AbilityRef::new(0, 0)).contains(&Position::new(2, 1)));

    b.apply_action(act(me, 2, 0)).expect("wall is a valid target");
    assert!(b.valid_targets(me, AbilityRef::new(0, 0)).contains(&Position::new(2, 1)));
}

#[test]
fn contact_only_reaches_the_nearest_living_unit_of_a_column() {
    let brawler = unit(1, "Brawler", json!({}), vec![shooter("contact")]);
    let grunt = unit(2, "Grunt", json!({}), vec![]);
    let b = battle(
        vec![at(&brawler, 0, 0)],
        vec![at(&grunt, 0, 0), at(&grunt, 0, 1), at(&grunt, 3, 1)],
    );
    let me = id_at(&b, Side::Player, 0, 0);
    assert_eq!(b.valid_targets(me, AbilityRef::new(0, 0)), positions(&[(0, 0), (3, 1)]));
    assert!(is_nearest_in_column(b.units(), Side::Enemy, Position::new(3, 1)));
    assert!(!is_nearest_in_column(b.units(), Side::Enemy, Position::new(0, 1)));
}

#[test]
fn direction_restricts_rows_relative_to_attacker() {
    let mk = |direction: &str| {
        let archer = unit(
            1,
            "Archer",
            json!({}),
            vec![json!({ "name": "Volley", "damage_min": 1, "damage_max": 1, "line_of_fire": "indirect", "direction": direction })],
        );
        let grunt = unit(2, "Grunt", json!({}), vec![]);
        battle(vec![at(&archer, 2, 1)], vec![at(&grunt, 1, 0), at(&grunt, 2, 1), at(&grunt, 3, 2)])
    };

    let b = mk("forward");
    let me = id_at(&b, Side::Player, 2, 1);
    assert_eq!(b.valid_targets(me, AbilityRef::new(0, 0)), positions(&[(3, 2)]));

    let b = mk("backward");
    assert_eq!(b.valid_targets(me, AbilityRef::new(0, 0)), positions(&[(1, 0)]));

    let b = mk("any");
    assert_eq!(b.valid_targets(me, AbilityRef::new(0, 0)), positions(&[(1, 0), (2, 1), (3, 2)]));
}

#[test]
fn tag_hierarchy_expands_parents() {
    let tags = TagHierarchy::new(BTreeMap::from([(Tag(10), vec![Tag(1), Tag(2)]), (Tag(2), vec![Tag(5)])]));
    assert_eq!(tags.expand(&[Tag(10)]), BTreeSet::from([Tag(10), Tag(1), Tag(2), Tag(5)]));

    let ab = ability(json!({ "name": "AT", "damage_min": 1, "damage_max": 1, "targets": [10], "excluded": [5] }));
    assert!(tags.can_target(&ab, &[Tag(1)]));
    assert!(tags.can_target(&ab, &[Tag(2)]));
    assert!(!tags.can_target(&ab, &[Tag(5)]));
    assert!(!tags.can_target(&ab, &[Tag(3)]));

    let any = ability(json!({ "name": "Any", "damage_min": 1, "damage_max": 1 }));
    assert!(tags.can_target(&any, &[Tag(3)]));
}

#[test]
fn untargetable_tags_are_not_valid_targets() {
    let gunner = unit(
        1,
        "AA Gun",
        json!({}),
        vec![json!({ "name": "Flak", "damage_min": 1, "damage_max": 1, "targets": [4] })],
    );
    let grunt = unit(2, "Grunt", json!({}), vec![]);
    let plane = common::with_template(json!({
        "id": 3, "name": "Plane", "tags": [4], "ranks": [{ "hp": 30 }]
    }));
    let b = battle(vec![at(&gunner, 2, 0)], vec![at(&grunt, 1, 0), at(&plane, 3, 0)]);
    let me = id_at(&b, Side::Player, 2, 0);
    assert_eq!(b.valid_targets(me, AbilityRef::new(0, 0)), positions(&[(3, 0)]));
}

#[test]
fn range_band_uses_cross_grid_distance() {
    assert_eq!(distance(Position::new(2, 0), Position::new(2, 0)), 1);
    assert_eq!(distance(Position::new(0, 1), Position::new(4, 2)), 6);
    assert_eq!(distance(Position::new(1, 0), Position::new(2, 0)), 1);

    let mortar = unit(
        1,
        "Mortar",
        json!({}),
        vec![json!({ "name": "Lob", "damage_min": 1, "damage_max": 1, "line_of_fire": "indirect", "range": { "min": 2, "max": 3 } })],
    );
    let grunt = unit(2, "Grunt", json!({}), vec![]);
    let b = battle(vec![at(&mortar, 2, 0)], vec![at(&grunt, 2, 0), at(&grunt, 2, 1), at(&grunt, 2, 2)]);
    let me = id_at(&b, Side::Player, 2, 0);
    assert_eq!(b.valid_targets(me, AbilityRef::new(0, 0)), positions(&[(2, 1), (2, 2)]));
}

#[test]
fn setup_rejects_dead_cells_and_overlaps() {
    use tactics_engine::error::SetupError;

    let grunt = unit(1, "Grunt", json!({}), vec![]);
    let bad = setup(vec![at(&grunt, 0, 2)], vec![at(&grunt, 1, 0)]);
    assert!(matches!(Battle::new(bad, steady_dice()), Err(SetupError::InvalidCell { .. })));

    let twice = setup(vec![at(&grunt, 1, 0)], vec![at(&grunt, 1, 0), at(&grunt, 1, 0)]);
    assert!(matches!(
        Battle::new(twice, steady_dice()),
        Err(SetupError::Occupied { side: Side::Enemy, .. })
    ));
}
