use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use encoding_rs::Encoding;
use std::{fs, path::PathBuf};
use tactics_engine::api;
use tactics_engine::damage::{armor_capacity, dodge_chance, split_damage};
use tactics_engine::grid::{Grid, Layout};
use tactics_engine::scenario::Scenario;
use tactics_engine::Side;
use tracing::Level;

#[derive(Copy, Clone, ValueEnum)]
enum LayoutArg {
    #[value(name = "equal3x3")]
    Equal3x3,
    #[value(name = "equal4x3")]
    Equal4x3,
    #[value(name = "equal5x3")]
    Equal5x3,
}

#[derive(Copy, Clone, ValueEnum)]
enum SideArg {
    Player,
    Enemy,
}

#[derive(clap::Args)]
struct ScenarioArgs {
    /// Scenario file (JSON, or YAML by extension)
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// Built-in scenario id, used when no file is given
    #[arg(long, default_value = "outpost_skirmish")]
    builtin: String,
    /// RNG seed for determinism
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Subcommand)]
enum Cmd {
    /// Play a scenario with random legal actions on both sides
    Simulate {
        #[command(flatten)]
        scenario: ScenarioArgs,
        /// Override the scenario turn limit
        #[arg(long)]
        max_turns: Option<u32>,
        /// Print the event log as JSON lines instead of the narration
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List the legal opening actions of one side as JSON
    Actions {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[arg(long, value_enum, default_value_t = SideArg::Player)]
        side: SideArg,
    },
    /// Print the state snapshot at battle start as JSON
    Snapshot {
        #[command(flatten)]
        scenario: ScenarioArgs,
    },
    /// Dodge chance for a defense/offense pair
    Dodge {
        #[arg(long)]
        defense: i32,
        #[arg(long)]
        offense: i32,
    },
    /// Split a hit between armor and HP
    Armor {
        /// Incoming damage
        #[arg(long)]
        damage: u32,
        /// Current armor
        #[arg(long)]
        armor: u32,
        /// Armor damage modifier
        #[arg(long, default_value_t = 1.0)]
        modifier: f64,
        /// Armor-piercing percent
        #[arg(long, default_value_t = 0.0)]
        piercing: f64,
    },
    /// Draw a grid layout (`.` playable, `#` dead)
    Grid {
        #[arg(long, value_enum, default_value_t = LayoutArg::Equal5x3)]
        layout: LayoutArg,
    },
}

#[derive(Parser)]
#[command(name = "tactics")]
#[command(about = "Grid tactics combat engine harness")]
struct Cli {
    /// Log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Cmd,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
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

fn load(args: &ScenarioArgs) -> anyhow::Result<Scenario> {
    match &args.scenario {
        Some(path) => {
            let text = read_text_auto(path)
                .with_context(|| format!("failed to read scenario: {}", path.display()))?;
            api::parse_scenario(&path.to_string_lossy(), &text)
        }
        None => api::builtin_scenario(&args.builtin),
    }
}

fn to_layout(l: LayoutArg) -> Layout {
    match l {
        LayoutArg::Equal3x3 => Layout::Equal3x3,
        LayoutArg::Equal4x3 => Layout::Equal4x3,
        LayoutArg::Equal5x3 => Layout::Equal5x3,
    }
}

fn to_side(s: SideArg) -> Side {
    match s {
        SideArg::Player => Side::Player,
        SideArg::Enemy => Side::Enemy,
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Cmd::Simulate { scenario, max_turns, json } => {
            let sc = load(&scenario)?;
            let result = api::simulate_scenario(&sc, scenario.seed, max_turns)?;
            if json {
                for line in &result.events {
                    println!("{}", line);
                }
            } else {
                for line in &result.log {
                    println!("{}", line);
                }
                println!(
                    "[RESULT] {} seed={} outcome={:?} turns={} actions={}",
                    result.scenario, scenario.seed, result.outcome, result.turns, result.actions
                );
            }
        }
        Cmd::Actions { scenario, side } => {
            let sc = load(&scenario)?;
            let battle = api::start_battle(&sc, scenario.seed, None)?;
            let actions = battle.legal_actions(to_side(side));
            println!("{}", serde_json::to_string_pretty(&actions)?);
        }
        Cmd::Snapshot { scenario } => {
            let sc = load(&scenario)?;
            let battle = api::start_battle(&sc, scenario.seed, None)?;
            println!("{}", serde_json::to_string_pretty(&battle.snapshot())?);
        }
        Cmd::Dodge { defense, offense } => {
            println!(
                "dodge chance: {}% (defense {} vs offense {})",
                dodge_chance(defense, offense),
                defense,
                offense
            );
        }
        Cmd::Armor { damage, armor, modifier, piercing } => {
            let split = split_damage(damage, armor, 1.0, modifier, piercing, false);
            let capacity = armor_capacity(armor, modifier)
                .map(|c| c.to_string())
                .unwrap_or_else(|| "unlimited".to_string());
            println!(
                "capacity={} armor_damage={} hp_damage={} overflow={}",
                capacity, split.armor_damage, split.hp_damage, split.overflow_applied
            );
        }
        Cmd::Grid { layout } => {
            println!("{}", Grid::new(to_layout(layout)));
        }
    }
    Ok(())
}
