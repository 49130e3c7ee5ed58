//! Seeded self-play over a scenario: every decision is drawn uniformly from
//! the legal actions. Used by the CLI and as an end-to-end smoke harness.

use std::{fs, path::Path};

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::battle::{Battle, BattleStats, Outcome};
use crate::content::builtin_scenarios;
use crate::scenario::Scenario;
use crate::Dice;

const DEFAULT_MAX_TURNS: u32 = 100;
/// Keeps the policy stream apart from the battle's own dice.
const POLICY_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SimulationConfig {
    #[serde(default)]
    pub scenario_path: Option<String>,
    #[serde(default)]
    pub scenario_id: Option<String>,
    #[serde(default)]
    pub seed: u64,
    /// Overrides the scenario's own limit.
    #[serde(default)]
    pub max_turns: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SimulationResult {
    pub scenario: String,
    pub outcome: Outcome,
    pub turns: u32,
    pub actions: usize,
    pub stats: BattleStats,
    /// The event log as JSON lines.
    pub events: Vec<String>,
    pub log: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimulationStats {
    pub samples: u32,
    pub player_wins: u32,
    pub enemy_wins: u32,
    pub draws: u32,
    pub surrenders: u32,
    pub turn_limits: u32,
    pub avg_turns: f64,
}

pub fn builtin_scenario(id: &str) -> Result<Scenario> {
    let text = builtin_scenarios()
        .get(id)
        .copied()
        .ok_or_else(|| anyhow!("no built-in scenario '{}'", id))?;
    Scenario::from_json(text).with_context(|| format!("failed to parse built-in scenario: {}", id))
}

/// Parse scenario text; `.yaml`/`.yml` names are read as YAML, anything else as JSON.
pub fn parse_scenario(name: &str, text: &str) -> Result<Scenario> {
    let yaml = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    let scenario = if yaml { Scenario::from_yaml(text) } else { Scenario::from_json(text) };
    scenario.with_context(|| format!("failed to parse scenario: {}", name))
}

pub fn load_scenario_file(path: &str) -> Result<Scenario> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read scenario: {}", path))?;
    parse_scenario(path, &text)
}

pub fn load_scenario(cfg: &SimulationConfig) -> Result<Scenario> {
    match (&cfg.scenario_path, &cfg.scenario_id) {
        (Some(path), _) => load_scenario_file(path),
        (None, Some(id)) => builtin_scenario(id),
        (None, None) => bail!("either scenario_path or scenario_id is required"),
    }
}

/// Build a battle from a scenario with the given seed.
pub fn start_battle(scenario: &Scenario, seed: u64, max_turns: Option<u32>) -> Result<Battle> {
    let mut setup = scenario.to_setup()?;
    if max_turns.is_some() {
        setup.max_turns = max_turns;
    }
    setup.max_turns = setup.max_turns.or(Some(DEFAULT_MAX_TURNS));
    Battle::new(setup, Dice::from_seed(seed))
        .with_context(|| format!("invalid scenario '{}'", scenario.name))
}

/// Play a battle to the end with a uniform random policy on both sides.
pub fn run_random(battle: &mut Battle, policy: &mut Dice) -> Result<()> {
    while !battle.is_terminal() {
        let side = battle.side_to_act();
        let actions = battle.legal_actions(side);
        if actions.is_empty() {
            battle.pass(side).context("pass was refused")?;
            continue;
        }
        let pick = policy.range_inclusive(0, actions.len() as u32 - 1) as usize;
        let action = actions[pick];
        battle
            .apply_action(action)
            .with_context(|| format!("legal action was rejected: {:?}", action))?;
    }
    Ok(())
}

pub fn simulate(cfg: SimulationConfig) -> Result<SimulationResult> {
    let scenario = load_scenario(&cfg)?;
    simulate_scenario(&scenario, cfg.seed, cfg.max_turns)
}

pub fn simulate_scenario(
    scenario: &Scenario,
    seed: u64,
    max_turns: Option<u32>,
) -> Result<SimulationResult> {
    let mut battle = start_battle(scenario, seed, max_turns)?;
    let mut policy = Dice::from_seed(seed ^ POLICY_SALT);
    run_random(&mut battle, &mut policy)?;

    let outcome = battle.outcome();
    info!(scenario = %scenario.name, seed, ?outcome, turns = battle.turn(), "simulation finished");
    Ok(SimulationResult {
        scenario: scenario.name.clone(),
        outcome,
        turns: battle.turn(),
        actions: battle.events().len(),
        stats: *battle.stats(),
        events: battle.event_log_json().context("failed to serialize event log")?,
        log: battle.narration().to_vec(),
    })
}

/// Run `samples` battles; sample `i` uses `seed + i`.
pub fn simulate_many(cfg: SimulationConfig, samples: u32) -> Result<SimulationStats> {
    let scenario = load_scenario(&cfg)?;
    simulate_many_scenario(&scenario, cfg.seed, cfg.max_turns, samples)
}

pub fn simulate_many_scenario(
    scenario: &Scenario,
    base_seed: u64,
    max_turns: Option<u32>,
    samples: u32,
) -> Result<SimulationStats> {
    let mut stats = SimulationStats { samples, ..SimulationStats::default() };
    let mut total_turns = 0u64;
    for i in 0..samples {
        let seed = base_seed.wrapping_add(u64::from(i));
        let mut battle = start_battle(scenario, seed, max_turns)?;
        let mut policy = Dice::from_seed(seed ^ POLICY_SALT);
        run_random(&mut battle, &mut policy)?;
        total_turns += u64::from(battle.turn());
        match battle.outcome() {
            Outcome::PlayerWin => stats.player_wins += 1,
            Outcome::EnemyWin => stats.enemy_wins += 1,
            Outcome::Draw => stats.draws += 1,
            Outcome::Surrendered { .. } => stats.surrenders += 1,
            Outcome::TurnLimit => stats.turn_limits += 1,
            Outcome::Ongoing => {}
        }
    }
    if samples > 0 {
        stats.avg_turns = total_turns as f64 / f64::from(samples);
    }
    Ok(stats)
}
