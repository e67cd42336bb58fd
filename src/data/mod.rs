//! Core data models for Nuzlocke Navigator
//!
//! This module contains the view models assembled from the two upstream
//! services: generated location details, and Pokemon, ability and move details
//! denormalized from PokeAPI.

pub mod evolution;
pub mod gemini;
pub mod pokeapi;
pub mod progression;

pub use gemini::{GeminiClient, GeminiError};
pub use pokeapi::{normalize_pokemon_name, PokeApiClient, PokeApiError};
pub use progression::{all_locations, get_location_by_id, GameLocation, NextBattle};

use serde::{Deserialize, Serialize};

use crate::cache::Versioned;

/// A Pokemon that can be caught at a location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatchablePokemon {
    pub name: String,
    /// Encounter conditions such as "Tall grass" or "Fishing - Old Rod"
    pub conditions: String,
}

/// A trainer battle at a location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trainer {
    pub name: String,
    pub strongest_pokemon_name: String,
    pub strongest_pokemon_level: u32,
    pub notes: String,
}

/// An item that can be picked up or received at a location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub location_description: String,
}

/// A fixed encounter or gift Pokemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticEncounter {
    pub pokemon_name: String,
    pub level: u32,
    pub notes: String,
}

/// Generated, Nuzlocke-relevant details for one game location
///
/// Every field is always populated; missing upstream values normalize to an
/// empty string or an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationDetail {
    pub location_id: String,
    pub location_name: String,
    pub summary: String,
    pub catchable_pokemon: Vec<CatchablePokemon>,
    pub trainers: Vec<Trainer>,
    pub items: Vec<Item>,
    pub static_encounters: Vec<StaticEncounter>,
}

impl Versioned for LocationDetail {
    const SCHEMA_VERSION: u32 = 1;
}

/// One ability slot of a Pokemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilitySummary {
    /// Title-cased name, e.g. "Surge Surfer"
    pub display_name: String,
    /// PokeAPI name, e.g. "surge-surfer"
    pub raw_name: String,
    pub is_hidden: bool,
}

/// A base stat such as "Special Attack"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStat {
    pub name: String,
    pub value: u32,
}

/// A species in an evolution line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionStage {
    pub name: String,
    pub id: u32,
    pub sprite_url: String,
}

/// A forward evolution branch with its trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionStep {
    pub name: String,
    pub id: u32,
    pub sprite_url: String,
    /// "Level 16", "Use thunder stone", or the raw trigger name
    pub trigger: String,
    /// Auxiliary requirements, e.g. "Female" or "Happiness 220+"
    pub conditions: Vec<String>,
}

/// The evolution neighbourhood of a Pokemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evolutions {
    pub previous_stage: Option<EvolutionStage>,
    pub current_stage: EvolutionStage,
    pub next_stages: Vec<EvolutionStep>,
}

/// A level-up move enriched with its battle stats
///
/// Stats are `None` when the move's own detail fetch failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonMove {
    /// Title-cased name, e.g. "Thunder Shock"
    pub name: String,
    /// PokeAPI name, e.g. "thunder-shock"
    pub raw_name: String,
    pub level_learned_at: u32,
    pub learn_method: String,
    pub power: Option<u32>,
    pub accuracy: Option<u32>,
    pub pp: Option<u32>,
    pub move_type: Option<String>,
    pub damage_class: Option<String>,
    pub short_effect: String,
}

/// Denormalized Pokemon details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonDetail {
    /// Pokemon (form) id, e.g. 10100 for Alolan Raichu
    pub id: u32,
    /// Species id, e.g. 26 for any Raichu
    pub species_id: u32,
    pub name: String,
    pub sprite_url: Option<String>,
    pub shiny_sprite_url: Option<String>,
    pub genus: String,
    pub types: Vec<String>,
    pub abilities: Vec<AbilitySummary>,
    pub base_stats: Vec<BaseStat>,
    pub evolutions: Option<Evolutions>,
    pub flavor_text: String,
    pub moves: Vec<PokemonMove>,
}

impl Versioned for PokemonDetail {
    const SCHEMA_VERSION: u32 = 2;
}

/// A Pokemon that can have an ability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityPokemon {
    pub id: u32,
    pub name: String,
    pub display_name: String,
    pub is_hidden: bool,
}

/// Denormalized ability details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityDetail {
    pub id: u32,
    pub name: String,
    pub display_name: String,
    pub effect: String,
    pub short_effect: String,
    pub flavor_text: String,
    pub generation: String,
    pub pokemon: Vec<AbilityPokemon>,
}

impl Versioned for AbilityDetail {
    const SCHEMA_VERSION: u32 = 2;
}

/// Denormalized move details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveDetail {
    pub id: u32,
    pub name: String,
    pub display_name: String,
    pub move_type: String,
    pub damage_class: String,
    pub power: Option<u32>,
    pub accuracy: Option<u32>,
    pub pp: Option<u32>,
    pub priority: i32,
    pub effect_chance: Option<u32>,
    pub effect: String,
    /// Short effect with `$effect_chance` already interpolated
    pub short_effect: String,
    pub flavor_text: String,
    pub target: String,
    pub generation: String,
}

impl Versioned for MoveDetail {
    const SCHEMA_VERSION: u32 = 1;
}

/// Turns an API name like "special-attack" into "Special Attack"
pub fn display_name(raw: &str) -> String {
    raw.split(['-', ' '])
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Uppercases the first character of a word
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
