use assert_cmd::Command;
use predicates::prelude::*;

fn tactics() -> Command {
    Command::cargo_bin("tactics").expect("tactics binary")
}

#[test]
fn dodge_prints_clamped_chance() {
    tactics()
        .args(["dodge", "--defense", "10", "--offense", "12"])
        .assert()
        .success()
        .stdout("dodge chance: 3% (defense 10 vs offense 12)\n");
    tactics()
        .args(["dodge", "--defense", "300", "--offense", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("95%"));
}

#[test]
fn armor_reports_overflow() {
    tactics()
        .args(["armor", "--damage", "200", "--armor", "100", "--modifier", "0.6"])
        .assert()
        .success()
        .stdout("capacity=166 armor_damage=100 hp_damage=34 overflow=true\n");
}

#[test]
fn grid_draws_dead_cells() {
    tactics()
        .args(["grid", "--layout", "equal3x3"])
        .assert()
        .success()
        .stdout("...\n...\n#.#\n");
}

#[test]
fn simulate_builtin_ends_with_result_line() {
    tactics()
        .args(["simulate", "--seed", "42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[RESULT] Outpost Skirmish seed=42"))
        .stdout(predicate::str::contains("[ACT][player]"));
}

#[test]
fn simulate_json_is_one_event_per_line() {
    let out = tactics()
        .args(["simulate", "--seed", "7", "--json"])
        .output()
        .expect("run simulate");
    assert!(out.status.success());
    let text = String::from_utf8(out.stdout).expect("utf8 output");
    for line in text.lines() {
        let v: serde_json::Value = serde_json::from_str(line).expect("json line");
        assert!(v.get("seq").is_some());
    }
}

#[test]
fn snapshot_reads_bom_prefixed_yaml() {
    let yaml = "name: Yard Duel\n\
                layout: equal3x3\n\
                units:\n  - id: 1\n    name: Sentry\n    ranks: [{ hp: 40 }]\n\
                player: [{ unit: 1, col: 1, row: 0 }]\n\
                waves: [[{ unit: 1, col: 1, row: 0 }]]\n";
    let path = std::env::temp_dir().join(format!("tactics-cli-{}.yaml", std::process::id()));
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(yaml.as_bytes());
    std::fs::write(&path, bytes).expect("write scenario");

    tactics()
        .args(["snapshot", "--scenario"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"side_to_act\": \"player\""))
        .stdout(predicate::str::contains("Sentry"));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn unknown_builtin_fails() {
    tactics()
        .args(["snapshot", "--builtin", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nowhere"));
}

#[test]
fn batch_reports_totals() {
    Command::cargo_bin("batch")
        .expect("batch binary")
        .args(["--trials", "5", "--seed", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Scenario: Outpost Skirmish  (trials=5, seed=1)"))
        .stdout(predicate::str::contains("Player wins:"));
}
