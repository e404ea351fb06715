//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run and verify outputs.

mod common;

use common::{last_json_line, run_cli};
use tempfile::TempDir;

const PRESETS: [&str; 5] = ["reaction", "rhythm", "swipe", "color-match", "follow-dot"];

#[test]
fn test_games_list() {
    let home = TempDir::new().unwrap();
    let out = run_cli(home.path(), &["games", "list"]);
    assert_eq!(out.code, 0, "games list failed: {}", out.stderr);
    for id in PRESETS {
        assert!(out.stdout.contains(id), "missing {id} in:\n{}", out.stdout);
    }
}

#[test]
fn test_games_list_json() {
    let home = TempDir::new().unwrap();
    let out = run_cli(home.path(), &["games", "list", "--json"]);
    assert_eq!(out.code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&out.stdout).unwrap();
    assert_eq!(parsed.as_array().map(Vec::len), Some(PRESETS.len()));
}

#[test]
fn test_games_show() {
    let home = TempDir::new().unwrap();
    let out = run_cli(home.path(), &["games", "show", "reaction"]);
    assert_eq!(out.code, 0);
    assert!(out.stdout.contains("game_id = \"reaction\""));
    assert!(out.stdout.contains("total_rounds = 10"));
}

#[test]
fn test_unknown_game_fails() {
    let home = TempDir::new().unwrap();
    let out = run_cli(home.path(), &["games", "show", "tetris"]);
    assert_eq!(out.code, 1);
    assert!(out.stderr.contains("error:"));

    let out = run_cli(home.path(), &["play", "tetris", "--no-submit"]);
    assert_eq!(out.code, 1);
    assert!(out.stderr.contains("tetris"));
}

#[test]
fn test_play_json_ends_with_result() {
    let home = TempDir::new().unwrap();
    let out = run_cli(
        home.path(),
        &["play", "reaction", "--seed", "1", "--no-submit", "--json"],
    );
    assert_eq!(out.code, 0, "play failed: {}", out.stderr);

    let result = last_json_line(&out.stdout);
    assert_eq!(result["game_id"], "reaction");
    assert_eq!(result["total_rounds"], 10);
    assert_eq!(result["completed"], true);
    let successes = result["successes"].as_u64().unwrap();
    let failures = result["failures"].as_u64().unwrap();
    assert_eq!(successes + failures, 10);

    assert!(out.stdout.contains("\"type\":\"GameStarted\""));
    assert!(out.stdout.contains("\"type\":\"SessionEnded\""));
}

#[test]
fn test_play_same_seed_is_reproducible() {
    let home = TempDir::new().unwrap();
    let args = ["play", "color-match", "--seed", "7", "--no-submit", "--json"];
    let first = last_json_line(&run_cli(home.path(), &args).stdout);
    let second = last_json_line(&run_cli(home.path(), &args).stdout);
    assert_eq!(first["successes"], second["successes"]);
    assert_eq!(first["accuracy"], second["accuracy"]);
}

#[test]
fn test_perfect_player_scores_every_preset() {
    let home = TempDir::new().unwrap();
    for id in PRESETS {
        let out = run_cli(
            home.path(),
            &["play", id, "--seed", "3", "--hit-rate", "1", "--no-submit", "--json"],
        );
        assert_eq!(out.code, 0, "{id}: {}", out.stderr);
        let result = last_json_line(&out.stdout);
        assert_eq!(
            result["successes"], result["total_rounds"],
            "{id} missed a round: {result}"
        );
        assert_eq!(result["accuracy"], 1.0);
    }
}

#[test]
fn test_hopeless_player_scores_nothing() {
    let home = TempDir::new().unwrap();
    for id in PRESETS {
        let out = run_cli(
            home.path(),
            &["play", id, "--seed", "5", "--hit-rate", "0", "--no-submit", "--json"],
        );
        assert_eq!(out.code, 0, "{id}: {}", out.stderr);
        let result = last_json_line(&out.stdout);
        assert_eq!(result["successes"], 0, "{id} scored: {result}");
        assert_eq!(result["xp_awarded"], 0);
    }
}

#[test]
fn test_play_rejects_bad_hit_rate() {
    let home = TempDir::new().unwrap();
    let out = run_cli(home.path(), &["play", "reaction", "--hit-rate", "1.5"]);
    assert_eq!(out.code, 1);
    assert!(out.stderr.contains("--hit-rate"));
}

#[test]
fn test_config_path_under_home() {
    let home = TempDir::new().unwrap();
    let out = run_cli(home.path(), &["config", "path"]);
    assert_eq!(out.code, 0);
    let path = out.stdout.trim();
    assert!(path.starts_with(&*home.path().to_string_lossy()), "{path}");
    assert!(path.ends_with("config.toml"));
}

#[test]
fn test_config_set_then_get() {
    let home = TempDir::new().unwrap();
    let out = run_cli(home.path(), &["config", "set", "games.reaction.total_rounds", "4"]);
    assert_eq!(out.code, 0, "config set failed: {}", out.stderr);

    let out = run_cli(home.path(), &["config", "get", "games.reaction.total_rounds"]);
    assert_eq!(out.code, 0);
    assert_eq!(out.stdout.trim(), "4");

    let out = run_cli(
        home.path(),
        &["play", "reaction", "--seed", "2", "--no-submit", "--json"],
    );
    assert_eq!(last_json_line(&out.stdout)["total_rounds"], 4);
}

#[test]
fn test_config_sets_unset_optional_field() {
    let home = TempDir::new().unwrap();
    let out = run_cli(home.path(), &["config", "get", "games.reaction.countdown_interval_ms"]);
    assert_eq!(out.code, 0, "{}", out.stderr);
    assert_eq!(out.stdout.trim(), "none");

    let out = run_cli(
        home.path(),
        &["config", "set", "games.reaction.countdown_interval_ms", "1000"],
    );
    assert_eq!(out.code, 0, "config set failed: {}", out.stderr);
    assert_eq!(out.stdout.trim(), "games.reaction.countdown_interval_ms = 1000");
}

#[test]
fn test_config_reset_single_game() {
    let home = TempDir::new().unwrap();
    run_cli(home.path(), &["config", "set", "games.reaction.total_rounds", "4"]);
    run_cli(home.path(), &["config", "set", "games.swipe.total_rounds", "6"]);

    let out = run_cli(home.path(), &["config", "reset", "--game", "reaction"]);
    assert_eq!(out.code, 0, "{}", out.stderr);

    let out = run_cli(home.path(), &["config", "get", "games.reaction.total_rounds"]);
    assert_eq!(out.stdout.trim(), "10");
    let out = run_cli(home.path(), &["config", "get", "games.swipe.total_rounds"]);
    assert_eq!(out.stdout.trim(), "6");

    let out = run_cli(home.path(), &["config", "reset", "--game", "tetris"]);
    assert_eq!(out.code, 1);
}

#[test]
fn test_config_rejects_unknown_key() {
    let home = TempDir::new().unwrap();
    let out = run_cli(home.path(), &["config", "get", "no.such.key"]);
    assert_eq!(out.code, 1);
    assert!(out.stderr.contains("error:"));
}

#[test]
fn test_completions() {
    let home = TempDir::new().unwrap();
    let out = run_cli(home.path(), &["completions", "bash"]);
    assert_eq!(out.code, 0);
    assert!(out.stdout.contains("roundkit-cli"));
}
