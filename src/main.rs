//! Nuzlocke Navigator - A companion for Pokemon Ultra Moon Nuzlocke runs
//!
//! A command-line application that generates location guides with Gemini,
//! looks up Pokedex data on PokeAPI and tracks the team of the current run.

use std::error::Error;

use clap::Parser;
use log::{debug, info, warn};
use serde::Serialize;

use nuzlocke_navigator::app::App;
use nuzlocke_navigator::cli::{
    join_prompt, log_filter, new_member, parse_move_slot, CacheCommands, Cli, Commands,
    TeamCommands,
};
use nuzlocke_navigator::config::{Config, API_KEY_VAR};
use nuzlocke_navigator::data::all_locations;
use nuzlocke_navigator::prefetch;
use nuzlocke_navigator::report;

/// Prints `value` as pretty JSON or as the text from `text`
fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<(), Box<dyn Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = Config::from_env().with_overrides(cli.data_dir.clone(), cli.cache_ttl_hours);
    let mut app = App::new(&config)?;
    let json = cli.json;
    let needs_gemini = matches!(cli.command, Commands::Location { .. } | Commands::Guide { .. });
    if needs_gemini && !app.has_api_key() {
        warn!(
            "{} is not set; location guides and the navigator are disabled",
            API_KEY_VAR
        );
    }

    match cli.command {
        Commands::Locations => {
            let current = app.current_location().map_or("", |loc| loc.id);
            emit(json, &all_locations(), || report::location_list(all_locations(), current))?;
        }
        Commands::Location { query, set_current } => {
            let view = app.select_location(&query).await?;
            if set_current {
                app.set_current_location(view.location.id)?;
            }
            emit(json, &view, || report::location_view(&view))?;
        }
        Commands::Guide { prompt } => {
            let prompt = join_prompt(&prompt)?;
            let guidance = app.ask_navigator(&prompt).await?;
            emit(json, &guidance, || report::guidance(&guidance.blocks))?;
        }
        Commands::Pokemon { name, add } => {
            let details = app.open_pokemon(&name).await?;
            if add {
                let member_id = app.add_to_team_from_detail()?;
                info!("Added {} as member {}", details.name, member_id);
            }
            let caught = app.caught().is_caught(details.id);
            emit(json, &details, || report::pokemon(&details, caught, None))?;
        }
        Commands::Ability { name } => {
            let details = app.lookup_ability(&name).await?;
            emit(json, &details, || report::ability(&details))?;
        }
        Commands::Move { name } => {
            let details = app.lookup_move(&name).await?;
            emit(json, &details, || report::move_detail(&details))?;
        }
        Commands::Learn {
            pokemon,
            move_name,
            add,
        } => {
            app.open_pokemon(&pokemon).await?;
            let outcome = if add {
                app.learn_move_and_add(&move_name)?
            } else {
                app.learn_move(&move_name)?
            };
            emit(json, &outcome, || {
                report::reconciliation(outcome.as_ref(), &move_name, app.roster())
            })?;
        }
        Commands::Team(command) => run_team(&mut app, command, json)?,
        Commands::Caught { pokemon_id } => {
            let caught = app.toggle_caught(pokemon_id)?;
            emit(json, &caught, || {
                if caught {
                    format!("#{} marked as caught.", pokemon_id)
                } else {
                    format!("#{} is no longer marked as caught.", pokemon_id)
                }
            })?;
        }
        Commands::Cache(CacheCommands::Clear) => {
            let removed = app.clear_cache();
            emit(json, &removed, || format!("Removed {} cached responses.", removed))?;
        }
    }

    if let Some(handle) = app.take_prefetch() {
        debug!("Waiting for {} prefetches", handle.len());
        prefetch::wait(handle).await;
    }
    app.save()?;
    Ok(())
}

fn run_team(app: &mut App, command: TeamCommands, json: bool) -> Result<(), Box<dyn Error>> {
    match command {
        TeamCommands::List => {}
        TeamCommands::Add {
            species,
            level,
            nickname,
            pokemon_id,
            initial_move,
        } => {
            app.add_team_member(new_member(
                &species,
                level,
                nickname.as_deref(),
                pokemon_id,
                initial_move.as_deref(),
            ))?;
        }
        TeamCommands::Remove { member } => {
            app.remove_team_member(&member)?;
        }
        TeamCommands::Nickname { member, nickname } => app.set_nickname(&member, &nickname)?,
        TeamCommands::Level { member, level } => {
            app.set_level(&member, level)?;
        }
        TeamCommands::Item { member, item } => {
            app.set_held_item(&member, item.as_deref().unwrap_or(""))?
        }
        TeamCommands::SetMove {
            member,
            slot,
            move_name,
        } => {
            let index = parse_move_slot(slot)?;
            app.set_move(&member, index, move_name.as_deref().unwrap_or(""))?;
        }
        TeamCommands::Shiny { member } => {
            app.toggle_shiny(&member)?;
        }
    }

    let next_battle = app.next_battle();
    emit(json, &app.roster(), || {
        report::team(app.roster(), next_battle.as_ref())
    })
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(log_filter(cli.verbose))
        .parse_default_env()
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
