use anyhow::Context;
use clap::Parser;
use encoding_rs::Encoding;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tactics_engine::api::{self, SimulationStats};
use tactics_engine::scenario::Scenario;

#[derive(Parser)]
#[command(name = "batch")]
#[command(about = "Monte Carlo sim: many random-policy battles per scenario")]
struct Args {
    /// Scenario file (JSON, or YAML by extension)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Built-in scenario id, used when no file is given
    #[arg(long, default_value = "outpost_skirmish")]
    builtin: String,

    /// Number of trials
    #[arg(long, default_value_t = 200)]
    trials: u32,

    /// Override the scenario turn limit
    #[arg(long)]
    max_turns: Option<u32>,

    /// RNG base seed (trial i uses seed+i)
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Optional plan file listing several runs; overrides the flags above
    #[arg(long)]
    plan: Option<PathBuf>,
}

#[derive(Deserialize)]
struct Plan {
    runs: Vec<PlanRun>,
}

#[derive(Deserialize)]
struct PlanRun {
    #[serde(default)]
    scenario: Option<PathBuf>,
    #[serde(default)]
    builtin: Option<String>,
    #[serde(default = "default_trials")]
    trials: u32,
    #[serde(default)]
    seed: u64,
    #[serde(default)]
    max_turns: Option<u32>,
}

fn default_trials() -> u32 {
    100
}

fn read_text_auto(path: &std::path::Path) -> anyhow::Result<String> {
    let bytes = fs::read(path)?;
    if let Some((enc, bom_len)) = Encoding::for_bom(&bytes) {
        let (cow, _, _) = enc.decode(&bytes[bom_len..]);
        Ok(cow.into_owned())
    } else {
        Ok(String::from_utf8(bytes)?)
    }
}

fn load(file: Option<&PathBuf>, builtin: &str) -> anyhow::Result<Scenario> {
    match file {
        Some(path) => {
            let text = read_text_auto(path)
                .with_context(|| format!("failed to read scenario: {}", path.display()))?;
            api::parse_scenario(&path.to_string_lossy(), &text)
        }
        None => api::builtin_scenario(builtin),
    }
}

fn pct(n: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * f64::from(n) / f64::from(total)
    }
}

fn report(name: &str, seed: u64, stats: &SimulationStats) {
    println!("Scenario: {}  (trials={}, seed={})", name, stats.samples, seed);
    println!(
        "Player wins: {} ({:.1}%)",
        stats.player_wins,
        pct(stats.player_wins, stats.samples)
    );
    println!(
        "Enemy wins: {} ({:.1}%)",
        stats.enemy_wins,
        pct(stats.enemy_wins, stats.samples)
    );
    println!(
        "Draws: {}  Turn limits: {}  Surrenders: {}",
        stats.draws, stats.turn_limits, stats.surrenders
    );
    println!("Avg turns: {:.2}", stats.avg_turns);
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let runs = match &args.plan {
        Some(path) => {
            let text = read_text_auto(path)
                .with_context(|| format!("failed to read plan: {}", path.display()))?;
            let plan: Plan = serde_json::from_str(&text)
                .with_context(|| format!("failed to parse plan: {}", path.display()))?;
            plan.runs
        }
        None => vec![PlanRun {
            scenario: args.scenario.clone(),
            builtin: Some(args.builtin.clone()),
            trials: args.trials,
            seed: args.seed,
            max_turns: args.max_turns,
        }],
    };

    for run in &runs {
        let builtin = run.builtin.as_deref().unwrap_or("outpost_skirmish");
        let scenario = load(run.scenario.as_ref(), builtin)?;
        let stats = api::simulate_many_scenario(&scenario, run.seed, run.max_turns, run.trials)?;
        report(&scenario.name, run.seed, &stats);
    }
    Ok(())
}
