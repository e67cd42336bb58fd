//! Integration tests for the `nuzlocke` binary
//!
//! Every run gets its own data directory, and only offline commands are
//! exercised against the real binary.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Helper to run the CLI with given args and capture output
fn run_cli(data_dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_nuzlocke"))
        .arg("--data-dir")
        .arg(data_dir)
        .args(args)
        .env_remove("GEMINI_API_KEY")
        .env_remove("API_KEY")
        .env_remove("NUZLOCKE_DATA_DIR")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute nuzlocke")
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_help_flag_exits_successfully() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(dir.path(), &["--help"]);
    assert!(output.status.success(), "Expected --help to exit successfully");
    let text = stdout(&output);
    assert!(text.contains("nuzlocke"), "Help should mention nuzlocke");
    assert!(text.contains("team"), "Help should list the team command");
}

#[test]
fn test_locations_marks_default_start() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(dir.path(), &["locations"]);
    assert!(output.status.success());
    assert!(stdout(&output).lines().next().unwrap().starts_with("> Your House"));
}

#[test]
fn test_team_changes_persist_between_runs() {
    let dir = TempDir::new().unwrap();

    let output = run_cli(
        dir.path(),
        &["team", "add", "Rowlet", "--nickname", "Hoot", "--level", "7"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let output = run_cli(dir.path(), &["team", "level", "hoot", "150"]);
    assert!(output.status.success());

    let output = run_cli(dir.path(), &["--json", "team", "list"]);
    assert!(output.status.success());
    let members: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(members[0]["nickname"], "Hoot");
    assert_eq!(members[0]["level"], 100);
}

#[test]
fn test_invalid_move_slot_prints_error_and_exits() {
    let dir = TempDir::new().unwrap();
    run_cli(dir.path(), &["team", "add", "Litten"]);

    let output = run_cli(dir.path(), &["team", "set-move", "Litten", "5", "Ember"]);
    assert!(!output.status.success(), "Expected slot 5 to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid move slot"), "{}", stderr);
}

#[test]
fn test_caught_toggles() {
    let dir = TempDir::new().unwrap();

    let output = run_cli(dir.path(), &["caught", "722"]);
    assert!(stdout(&output).contains("marked as caught"));

    let output = run_cli(dir.path(), &["caught", "722"]);
    assert!(stdout(&output).contains("no longer marked"));
}

#[test]
fn test_location_without_api_key_fails() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(dir.path(), &["location", "mahalo-trail"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("GEMINI_API_KEY"), "{}", stderr);
}

#[test]
fn test_cache_clear_on_empty_store() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(dir.path(), &["cache", "clear"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Removed 0 cached responses."));
}

/// Writes a fresh cached Pikachu so `learn` runs without the network
fn seed_pikachu(data_dir: &Path) {
    let move_json = |name: &str, raw_name: &str, level: u32| {
        serde_json::json!({
            "name": name,
            "raw_name": raw_name,
            "level_learned_at": level,
            "learn_method": "Level Up",
            "power": 40,
            "accuracy": 100,
            "pp": 30,
            "move_type": "Normal",
            "damage_class": "Physical",
            "short_effect": ""
        })
    };
    let entry = serde_json::json!({
        "timestamp": chrono::Utc::now().timestamp_millis(),
        "version": 2,
        "data": {
            "id": 25,
            "species_id": 25,
            "name": "pikachu",
            "sprite_url": null,
            "shiny_sprite_url": null,
            "genus": "Mouse Pokémon",
            "types": ["electric"],
            "abilities": [],
            "base_stats": [],
            "evolutions": null,
            "flavor_text": "",
            "moves": [
                move_json("Thunder Shock", "thunder-shock", 1),
                move_json("Quick Attack", "quick-attack", 5)
            ]
        }
    });
    std::fs::write(
        data_dir.join("pokemon_cache_pikachu.json"),
        entry.to_string(),
    )
    .unwrap();
}

#[test]
fn test_learn_with_add_recruits_pokemon_across_runs() {
    let dir = TempDir::new().unwrap();
    seed_pikachu(dir.path());

    // Staging alone does not survive the run
    let output = run_cli(dir.path(), &["learn", "pikachu", "Quick Attack"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("--add"));

    let output = run_cli(dir.path(), &["learn", "pikachu", "Quick Attack", "--add"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("learned Quick Attack in slot 1"));

    let output = run_cli(dir.path(), &["--json", "team", "list"]);
    let members: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(members.as_array().unwrap().len(), 1);
    assert_eq!(members[0]["pokemonId"], 25);
    assert_eq!(members[0]["level"], 5);
    assert_eq!(
        members[0]["moves"],
        serde_json::json!(["Quick Attack", "", "", ""])
    );
}

#[cfg(test)]
mod unit_tests {
    //! Unit tests for CLI parsing that don't require running the binary

    use clap::Parser;
    use nuzlocke_navigator::cli::{parse_move_slot, Cli, Commands, TeamCommands};

    #[test]
    fn test_cli_pokemon_add_flag() {
        let cli = Cli::parse_from(["nuzlocke", "pokemon", "rockruff", "--add"]);
        match cli.command {
            Commands::Pokemon { name, add } => {
                assert_eq!(name, "rockruff");
                assert!(add);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_item_is_optional() {
        let cli = Cli::parse_from(["nuzlocke", "team", "item", "Hoot"]);
        assert!(matches!(
            cli.command,
            Commands::Team(TeamCommands::Item { item: None, .. })
        ));
    }

    #[test]
    fn test_cli_rejects_non_numeric_pokemon_id() {
        assert!(Cli::try_parse_from(["nuzlocke", "caught", "pikachu"]).is_err());
    }

    #[test]
    fn test_parse_move_slot_bounds() {
        assert_eq!(parse_move_slot(2).unwrap(), 1);
        assert!(parse_move_slot(0).is_err());
    }
}
