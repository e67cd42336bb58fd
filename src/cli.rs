//! Command-line interface parsing for Nuzlocke Navigator
//!
//! This module defines the `nuzlocke` command tree with clap and the small
//! conversions between raw arguments and session inputs.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use thiserror::Error;

use crate::team::{AddTeamMember, MAX_LEVEL, MIN_LEVEL, MOVE_SLOTS};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// Move slots are numbered 1 to 4 on the command line
    #[error("Invalid move slot: {0}. Valid slots: 1, 2, 3, 4")]
    InvalidMoveSlot(usize),

    #[error("Please enter a question for the navigator")]
    EmptyPrompt,
}

/// Nuzlocke Navigator - A companion for Pokemon Ultra Moon Nuzlocke runs
#[derive(Parser, Debug)]
#[command(name = "nuzlocke")]
#[command(about = "Location guides, Pokedex lookups and team tracking for Ultra Moon Nuzlockes")]
#[command(version)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Directory for the team, caught list and response cache
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// How long cached API responses stay fresh
    #[arg(long, global = true, value_name = "HOURS", allow_negative_numbers = true)]
    pub cache_ttl_hours: Option<i64>,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the game progression with level caps
    Locations,

    /// Show generated details for a location
    ///
    /// Examples:
    ///   nuzlocke location mahalo-trail
    ///   nuzlocke location "Route 1 (Hau'oli Outskirts)" --set-current
    Location {
        /// Location id or name
        query: String,

        /// Also make this the current location of the run
        #[arg(long)]
        set_current: bool,
    },

    /// Ask the navigator a question about the run
    Guide {
        /// The question, e.g. "Which water type should I catch before Lana?"
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },

    /// Show Pokedex details for a Pokemon
    Pokemon {
        /// Pokemon name or National Dex number
        name: String,

        /// Add the Pokemon to the team at level 5 and mark it caught
        #[arg(long)]
        add: bool,
    },

    /// Show details for an ability
    Ability {
        /// Ability name, e.g. "surge-surfer" or "Surge Surfer"
        name: String,
    },

    /// Show details for a move
    Move {
        /// Move name, e.g. "thunder-shock" or "Thunder Shock"
        name: String,
    },

    /// Teach a level-up move to the team member of that Pokemon
    Learn {
        /// Pokemon name or National Dex number
        pokemon: String,

        /// Move name
        #[arg(value_name = "MOVE")]
        move_name: String,

        /// Add the Pokemon to the team with this move if no member is that Pokemon
        #[arg(long)]
        add: bool,
    },

    /// Manage the team
    #[command(subcommand)]
    Team(TeamCommands),

    /// Toggle whether a Pokemon id is marked caught
    Caught {
        /// National Dex number
        pokemon_id: u32,
    },

    /// Manage cached API responses
    #[command(subcommand)]
    Cache(CacheCommands),
}

/// Team subcommands
///
/// `MEMBER` accepts a member id, nickname or species.
#[derive(Subcommand, Debug)]
pub enum TeamCommands {
    /// Show the team
    List,

    /// Add a team member
    Add {
        species: String,

        #[arg(long, default_value_t = 5, allow_negative_numbers = true)]
        level: i64,

        #[arg(long)]
        nickname: Option<String>,

        /// National Dex number, used to link staged moves
        #[arg(long)]
        pokemon_id: Option<u32>,

        /// First move
        #[arg(long = "move", value_name = "MOVE")]
        initial_move: Option<String>,
    },

    /// Remove a team member
    Remove { member: String },

    /// Rename a team member
    Nickname { member: String, nickname: String },

    /// Set a member's level (clamped to 1-100)
    Level {
        member: String,
        #[arg(allow_negative_numbers = true)]
        level: i64,
    },

    /// Set a member's held item; omit ITEM to clear it
    Item { member: String, item: Option<String> },

    /// Set move slot 1-4; omit MOVE to clear the slot
    SetMove {
        member: String,
        slot: usize,
        #[arg(value_name = "MOVE")]
        move_name: Option<String>,
    },

    /// Toggle a member's shiny flag
    Shiny { member: String },
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Delete every cached API response
    Clear,
}

/// Maps the -v count to a default log level; RUST_LOG still takes precedence
pub fn log_filter(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

/// Converts a 1-based slot argument into a move index
///
/// # Returns
/// * `Ok(index)` in 0..4 for slots 1 to 4
/// * `Err(CliError::InvalidMoveSlot)` otherwise
pub fn parse_move_slot(slot: usize) -> Result<usize, CliError> {
    if (1..=MOVE_SLOTS).contains(&slot) {
        Ok(slot - 1)
    } else {
        Err(CliError::InvalidMoveSlot(slot))
    }
}

/// Joins the words of a `guide` prompt
pub fn join_prompt(words: &[String]) -> Result<String, CliError> {
    let prompt = words.join(" ").trim().to_string();
    if prompt.is_empty() {
        return Err(CliError::EmptyPrompt);
    }
    Ok(prompt)
}

/// Builds the roster input for `team add`
pub fn new_member(
    species: &str,
    level: i64,
    nickname: Option<&str>,
    pokemon_id: Option<u32>,
    initial_move: Option<&str>,
) -> AddTeamMember {
    AddTeamMember {
        species: species.to_string(),
        level: level.clamp(i64::from(MIN_LEVEL), i64::from(MAX_LEVEL)) as u32,
        nickname: nickname.map(str::to_string),
        pokemon_id,
        initial_move: initial_move.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_move_slot() {
        assert_eq!(parse_move_slot(1).unwrap(), 0);
        assert_eq!(parse_move_slot(4).unwrap(), 3);
        assert!(parse_move_slot(0).is_err());
        let err = parse_move_slot(5).unwrap_err();
        assert!(err.to_string().contains("Invalid move slot: 5"));
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(log_filter(0), LevelFilter::Warn);
        assert_eq!(log_filter(1), LevelFilter::Info);
        assert_eq!(log_filter(2), LevelFilter::Debug);
        assert_eq!(log_filter(7), LevelFilter::Debug);
    }

    #[test]
    fn test_join_prompt() {
        let words = vec!["Where".to_string(), "is".to_string(), "Rockruff?".to_string()];
        assert_eq!(join_prompt(&words).unwrap(), "Where is Rockruff?");
        assert!(matches!(
            join_prompt(&[" ".to_string()]),
            Err(CliError::EmptyPrompt)
        ));
    }

    #[test]
    fn test_new_member_clamps_level() {
        let member = new_member("Rowlet", 0, Some("Hoot"), Some(722), None);
        assert_eq!(member.level, 1);
        assert_eq!(member.nickname.as_deref(), Some("Hoot"));
        assert_eq!(member.pokemon_id, Some(722));

        assert_eq!(new_member("Rowlet", 500, None, None, None).level, 100);
        assert_eq!(new_member("Rowlet", -3, None, None, None).level, 1);
    }

    #[test]
    fn test_cli_parse_global_flags() {
        let cli = Cli::parse_from([
            "nuzlocke",
            "-vv",
            "--json",
            "--data-dir",
            "/tmp/run",
            "locations",
            "--cache-ttl-hours",
            "6",
        ]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.json);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/run")));
        assert_eq!(cli.cache_ttl_hours, Some(6));
        assert!(matches!(cli.command, Commands::Locations));
    }

    #[test]
    fn test_cli_parse_location() {
        let cli = Cli::parse_from(["nuzlocke", "location", "Mahalo Trail", "--set-current"]);
        match cli.command {
            Commands::Location { query, set_current } => {
                assert_eq!(query, "Mahalo Trail");
                assert!(set_current);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_guide_collects_words() {
        let cli = Cli::parse_from(["nuzlocke", "guide", "best", "early", "catch?"]);
        match cli.command {
            Commands::Guide { prompt } => assert_eq!(prompt.len(), 3),
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(Cli::try_parse_from(["nuzlocke", "guide"]).is_err());
    }

    #[test]
    fn test_cli_parse_team_commands() {
        let cli = Cli::parse_from([
            "nuzlocke", "team", "add", "Litten", "--level", "9", "--move", "Ember",
        ]);
        match cli.command {
            Commands::Team(TeamCommands::Add {
                species,
                level,
                initial_move,
                ..
            }) => {
                assert_eq!(species, "Litten");
                assert_eq!(level, 9);
                assert_eq!(initial_move.as_deref(), Some("Ember"));
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::parse_from(["nuzlocke", "team", "level", "Hoot", "-4"]);
        assert!(matches!(
            cli.command,
            Commands::Team(TeamCommands::Level { level: -4, .. })
        ));

        let cli = Cli::parse_from(["nuzlocke", "team", "set-move", "Hoot", "2"]);
        assert!(matches!(
            cli.command,
            Commands::Team(TeamCommands::SetMove { slot: 2, move_name: None, .. })
        ));
    }

    #[test]
    fn test_cli_parse_learn_and_cache() {
        let cli = Cli::parse_from(["nuzlocke", "learn", "pikachu", "Quick Attack"]);
        assert!(matches!(cli.command, Commands::Learn { add: false, .. }));

        let cli = Cli::parse_from(["nuzlocke", "learn", "pikachu", "Quick Attack", "--add"]);
        match cli.command {
            Commands::Learn { pokemon, move_name, add } => {
                assert_eq!(pokemon, "pikachu");
                assert_eq!(move_name, "Quick Attack");
                assert!(add);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::parse_from(["nuzlocke", "cache", "clear"]);
        assert!(matches!(cli.command, Commands::Cache(CacheCommands::Clear)));
    }

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["nuzlocke"]).is_err());
    }
}
