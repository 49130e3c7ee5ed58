use tactics_engine::api::{
    builtin_scenario, load_scenario, parse_scenario, simulate, simulate_many, start_battle, SimulationConfig,
};
use tactics_engine::battle::{Outcome, Side};

const YAML_DUEL: &str = r#"
name: Yard Duel
layout: equal3x3
units:
  - id: 1
    name: Sentry
    ranks:
      - { hp: 40, accuracy: 10 }
    weapons:
      - name: Carbine
        abilities:
          - { name: Burst, damage_min: 8, damage_max: 12 }
player:
  - { unit: 1, col: 1, row: 0 }
waves:
  - - { unit: 1, col: 1, row: 0 }
max_turns: 30
"#;

#[test]
fn builtin_simulation_reaches_an_outcome() {
    let cfg = SimulationConfig { scenario_id: Some("outpost_skirmish".into()), seed: 2025, ..Default::default() };
    let res = simulate(cfg).expect("simulation ran");
    assert!(res.outcome.is_terminal());
    assert!(res.actions > 0);
    assert_eq!(res.events.len(), res.actions);
    assert!(res.log.iter().any(|l| l.starts_with("[END]")));
    assert!(res.turns <= 41);
}

#[test]
fn scenario_file_loads_from_disk() {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let path = manifest
        .join("content/scenarios/outpost_skirmish.json")
        .to_string_lossy()
        .into_owned();
    let from_file = load_scenario(&SimulationConfig { scenario_path: Some(path), ..Default::default() })
        .expect("scenario file");
    assert_eq!(from_file, builtin_scenario("outpost_skirmish").expect("builtin"));
}

#[test]
fn missing_scenario_source_is_an_error() {
    assert!(load_scenario(&SimulationConfig::default()).is_err());
    assert!(builtin_scenario("no_such_place").is_err());
}

#[test]
fn many_simulations_account_for_every_sample() {
    let cfg = SimulationConfig { scenario_id: Some("outpost_skirmish".into()), seed: 10, ..Default::default() };
    let stats = simulate_many(cfg, 12).expect("batch ran");
    assert_eq!(stats.samples, 12);
    assert_eq!(
        stats.player_wins + stats.enemy_wins + stats.draws + stats.surrenders + stats.turn_limits,
        12
    );
    assert!(stats.avg_turns >= 1.0);
}

#[test]
fn yaml_scenarios_parse_by_extension() {
    let scenario = parse_scenario("duel.yaml", YAML_DUEL).expect("yaml scenario");
    assert_eq!(scenario.name, "Yard Duel");
    assert_eq!(scenario.max_turns, Some(30));

    let battle = start_battle(&scenario, 1, None).expect("battle");
    assert_eq!(battle.grid().columns(), 3);
    assert_eq!(battle.legal_actions(Side::Player).len(), 1);
    assert_eq!(battle.outcome(), Outcome::Ongoing);

    assert!(parse_scenario("duel.json", YAML_DUEL).is_err());
}

#[test]
fn turn_limit_override_wins_over_the_scenario() {
    let scenario = parse_scenario("duel.yml", YAML_DUEL).expect("yaml scenario");
    assert!(start_battle(&scenario, 1, Some(1)).is_ok());

    let cfg = SimulationConfig {
        scenario_id: Some("outpost_skirmish".into()),
        seed: 3,
        max_turns: Some(1),
        ..SimulationConfig::default()
    };
    let res = simulate(cfg).expect("simulation ran");
    assert!(res.turns <= 2);
    assert!(matches!(
        res.outcome,
        Outcome::TurnLimit | Outcome::PlayerWin | Outcome::EnemyWin | Outcome::Draw
    ));
}
