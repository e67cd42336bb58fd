//! Application session for Nuzlocke Navigator
//!
//! `App` ties the persisted run state (team, caught Pokemon, current location)
//! to the Gemini and PokeAPI clients and the detail panel. Every mutating
//! operation persists what it changed before returning.

use std::sync::Arc;

use chrono::Duration;
use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::cache::{CacheManager, FileStore, KeyValueStore, MemoryStore, StoreError};
use crate::config::{Config, ConfigError};
use crate::data::progression::{
    neighbors, next_battle, resolve_location, DEFAULT_CURRENT_LOCATION_ID,
};
use crate::data::{
    all_locations, get_location_by_id, AbilityDetail, GameLocation, GeminiClient, GeminiError,
    LocationDetail, MoveDetail, NextBattle, PokeApiClient, PokeApiError, PokemonDetail,
    PokemonMove,
};
use crate::detail::DetailPanel;
use crate::markup::{parse_guidance, Block};
use crate::prefetch::PrefetchHandle;
use crate::team::{AddTeamMember, CaughtStatus, Reconciliation, Roster, TeamError, TeamMember};

/// Storage key for the location the player is currently at
pub const CURRENT_LOCATION_KEY: &str = "nuzlocke-current-location";

/// Errors surfaced by session operations
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unknown location: \"{0}\"")]
    UnknownLocation(String),

    #[error("No Pokemon is open in the detail panel")]
    NoPokemonOpen,

    #[error("No team member matches \"{0}\"")]
    UnknownMember(String),

    #[error("{pokemon} does not learn \"{move_name}\" by level up")]
    MoveNotLearned { pokemon: String, move_name: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Gemini(#[from] GeminiError),

    #[error(transparent)]
    PokeApi(#[from] PokeApiError),

    #[error(transparent)]
    Team(#[from] TeamError),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("Failed to encode state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A location together with its generated details and level cap
#[derive(Debug, Clone, Serialize)]
pub struct LocationView {
    pub location: &'static GameLocation,
    pub details: LocationDetail,
    pub next_battle: Option<NextBattle>,
}

/// Navigator answer as raw text and parsed blocks
#[derive(Debug, Clone, Serialize)]
pub struct Guidance {
    pub text: String,
    pub blocks: Vec<Block>,
}

/// A Nuzlocke run session
pub struct App {
    /// Backing store for the team, caught map and current location
    store: Arc<dyn KeyValueStore>,
    /// Response cache sharing the store
    cache: CacheManager,
    gemini: GeminiClient,
    pokeapi: PokeApiClient,
    roster: Roster,
    caught: CaughtStatus,
    detail: DetailPanel,
    current_location_id: &'static str,
    /// Outstanding neighbour prefetch, if one was spawned
    prefetch: Option<PrefetchHandle>,
}

impl App {
    /// Creates a session from configuration
    ///
    /// # Arguments
    /// * `config` - Validated runtime configuration
    ///
    /// # Behavior
    /// Uses the configured data directory, then the platform data directory,
    /// and finally an in-memory store when neither is available.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        config.validate()?;

        let store: Arc<dyn KeyValueStore> = match &config.data_dir {
            Some(dir) => Arc::new(FileStore::with_dir(dir.clone())),
            None => match FileStore::new() {
                Some(store) => Arc::new(store),
                None => {
                    warn!("No data directory available; state will not be persisted");
                    Arc::new(MemoryStore::new())
                }
            },
        };

        let cache = CacheManager::new(store.clone())
            .with_ttl(Duration::hours(config.cache_ttl_hours));
        let gemini = GeminiClient::new(config.api_key.clone(), Some(cache.clone()))
            .with_base_url(config.gemini_base_url.clone())
            .with_model(config.gemini_model.clone());
        let pokeapi = PokeApiClient::new(Some(cache.clone()))
            .with_base_url(config.pokeapi_base_url.clone());

        Ok(Self::with_parts(store, cache, gemini, pokeapi))
    }

    /// Creates a session from prebuilt parts (used for testing)
    pub fn with_parts(
        store: Arc<dyn KeyValueStore>,
        cache: CacheManager,
        gemini: GeminiClient,
        pokeapi: PokeApiClient,
    ) -> Self {
        let roster = Roster::load(store.as_ref());
        let caught = CaughtStatus::load(store.as_ref());
        let current_location_id = load_current_location(store.as_ref());
        debug!(
            "Loaded session: {} team members, current location {}",
            roster.len(),
            current_location_id
        );

        Self {
            store,
            cache,
            gemini,
            pokeapi,
            roster,
            caught,
            detail: DetailPanel::new(),
            current_location_id,
            prefetch: None,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.gemini.has_api_key()
    }

    pub fn current_location(&self) -> Option<&'static GameLocation> {
        get_location_by_id(self.current_location_id)
    }

    /// The next boss after the current location
    pub fn next_battle(&self) -> Option<NextBattle> {
        next_battle(self.current_location_id)
    }

    /// Moves the run to another location and persists it
    pub fn set_current_location(&mut self, query: &str) -> Result<&'static GameLocation, AppError> {
        let location =
            resolve_location(query).ok_or_else(|| AppError::UnknownLocation(query.to_string()))?;
        self.current_location_id = location.id;
        let encoded = serde_json::to_string(location.id)?;
        self.store.set(CURRENT_LOCATION_KEY, &encoded)?;
        info!("Current location set to {}", location.name);
        Ok(location)
    }

    /// Fetches generated details for a location
    ///
    /// On success the locations before and after it are prefetched in the
    /// background; see [`App::take_prefetch`].
    pub async fn select_location(&mut self, query: &str) -> Result<LocationView, AppError> {
        let location =
            resolve_location(query).ok_or_else(|| AppError::UnknownLocation(query.to_string()))?;
        let details = self.gemini.fetch_location_details(location.name).await?;
        self.prefetch = self.prefetch_neighbors(location);

        Ok(LocationView {
            location,
            details,
            next_battle: next_battle(location.id),
        })
    }

    /// Spawns cache warming for the neighbours of `location`
    ///
    /// Returns `None` without an API key or when the location has no neighbours.
    pub fn prefetch_neighbors(&self, location: &GameLocation) -> Option<PrefetchHandle> {
        if !self.gemini.has_api_key() {
            return None;
        }
        let (previous, next) = neighbors(location.id);
        let targets: Vec<&'static GameLocation> = previous.into_iter().chain(next).collect();
        if targets.is_empty() {
            return None;
        }
        Some(PrefetchHandle::spawn(self.gemini.clone(), targets))
    }

    /// Hands over the outstanding prefetch so the caller can wait for it
    pub fn take_prefetch(&mut self) -> Option<PrefetchHandle> {
        self.prefetch.take()
    }

    /// Asks the navigator and parses the markup of its answer
    pub async fn ask_navigator(&self, prompt: &str) -> Result<Guidance, AppError> {
        let text = self.gemini.fetch_navigator_guidance(prompt).await?;
        let blocks = parse_guidance(&text, all_locations());
        Ok(Guidance { text, blocks })
    }

    pub fn detail(&self) -> &DetailPanel {
        &self.detail
    }

    /// Opens a Pokemon in the detail panel
    pub async fn open_pokemon(&mut self, name_or_id: &str) -> Result<PokemonDetail, AppError> {
        let ticket = self.detail.begin_pokemon();
        match self.pokeapi.fetch_pokemon_details(name_or_id).await {
            Ok(details) => {
                self.detail.complete_pokemon(ticket, Ok(details.clone()));
                Ok(details)
            }
            Err(e) => {
                self.detail.complete_pokemon(ticket, Err(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Opens an ability from the Pokemon in the detail panel
    pub async fn open_ability(&mut self, name: &str) -> Result<AbilityDetail, AppError> {
        let ticket = self.detail.begin_ability().ok_or(AppError::NoPokemonOpen)?;
        match self.pokeapi.fetch_ability_details(name).await {
            Ok(details) => {
                self.detail.complete_ability(ticket, Ok(details.clone()));
                Ok(details)
            }
            Err(e) => {
                self.detail.complete_ability(ticket, Err(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Opens a move from the Pokemon in the detail panel
    pub async fn open_move(&mut self, name: &str) -> Result<MoveDetail, AppError> {
        let ticket = self.detail.begin_move().ok_or(AppError::NoPokemonOpen)?;
        match self.pokeapi.fetch_full_move_details(name).await {
            Ok(details) => {
                self.detail.complete_move(ticket, Ok(details.clone()));
                Ok(details)
            }
            Err(e) => {
                self.detail.complete_move(ticket, Err(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Looks up an ability without touching the detail panel
    pub async fn lookup_ability(&self, name: &str) -> Result<AbilityDetail, AppError> {
        Ok(self.pokeapi.fetch_ability_details(name).await?)
    }

    /// Looks up a move without touching the detail panel
    pub async fn lookup_move(&self, name: &str) -> Result<MoveDetail, AppError> {
        Ok(self.pokeapi.fetch_full_move_details(name).await?)
    }

    pub fn back(&mut self) -> bool {
        self.detail.back()
    }

    pub fn close_detail(&mut self) {
        self.detail.close();
    }

    /// Stages a move and immediately tries to assign it to the team
    ///
    /// Staging the already staged move clears the selection, in which case
    /// `None` is returned.
    pub fn stage_move(
        &mut self,
        pokemon_id: u32,
        move_name: &str,
        details: PokemonMove,
    ) -> Result<Option<Reconciliation>, AppError> {
        self.detail.stage_move(pokemon_id, move_name, details);
        if self.detail.staged_move().is_none() {
            return Ok(None);
        }

        let outcome = self.roster.reconcile_staged_move(self.detail.staged_move_slot());
        if let Reconciliation::Assigned { ref member_id, slot } = outcome {
            info!("Assigned {} to member {} slot {}", move_name, member_id, slot);
            self.roster.save(self.store.as_ref())?;
        }
        Ok(Some(outcome))
    }

    /// Stages a move the open Pokemon learns by level up, matched by name
    pub fn learn_move(&mut self, move_name: &str) -> Result<Option<Reconciliation>, AppError> {
        let pokemon = self.detail.pokemon().ok_or(AppError::NoPokemonOpen)?;
        let wanted = move_name.trim().to_lowercase();
        let found = pokemon
            .moves
            .iter()
            .find(|m| m.name.to_lowercase() == wanted || m.raw_name == wanted.replace(' ', "-"))
            .cloned()
            .ok_or_else(|| AppError::MoveNotLearned {
                pokemon: pokemon.name.clone(),
                move_name: move_name.to_string(),
            })?;
        let pokemon_id = pokemon.id;
        let name = found.name.clone();
        self.stage_move(pokemon_id, &name, found)
    }

    /// Like `learn_move`, but a `Pending` move recruits the open Pokemon
    ///
    /// The staged move only lives for this session, so the new member is
    /// added here with the move in its first slot.
    pub fn learn_move_and_add(&mut self, move_name: &str) -> Result<Option<Reconciliation>, AppError> {
        match self.learn_move(move_name)? {
            Some(Reconciliation::Pending) => {
                let member_id = self.add_to_team_from_detail()?;
                Ok(Some(Reconciliation::Assigned { member_id, slot: 0 }))
            }
            outcome => Ok(outcome),
        }
    }

    /// Adds the open Pokemon to the team at level 5
    pub fn add_to_team_from_detail(&mut self) -> Result<String, AppError> {
        let pokemon = self.detail.pokemon().ok_or(AppError::NoPokemonOpen)?;
        let species = pokemon.name.clone();
        let pokemon_id = pokemon.id;

        let member_id = self.roster.add_from_detail(
            &species,
            pokemon_id,
            self.detail.staged_move_slot(),
            &mut self.caught,
        )?;
        self.save()?;
        Ok(member_id)
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn caught(&self) -> &CaughtStatus {
        &self.caught
    }

    /// Resolves a member by id, nickname or species (ignoring case)
    pub fn resolve_member(&self, query: &str) -> Result<&TeamMember, AppError> {
        let wanted = query.trim().to_lowercase();
        self.roster
            .get(query.trim())
            .or_else(|| {
                self.roster
                    .members()
                    .iter()
                    .find(|m| m.nickname.to_lowercase() == wanted)
            })
            .or_else(|| {
                self.roster
                    .members()
                    .iter()
                    .find(|m| m.species.to_lowercase() == wanted)
            })
            .ok_or_else(|| AppError::UnknownMember(query.to_string()))
    }

    fn member_id(&self, query: &str) -> Result<String, AppError> {
        self.resolve_member(query).map(|m| m.id.clone())
    }

    pub fn add_team_member(&mut self, new_member: AddTeamMember) -> Result<String, AppError> {
        let id = self.roster.add(new_member)?;
        self.roster.save(self.store.as_ref())?;
        Ok(id)
    }

    pub fn remove_team_member(&mut self, query: &str) -> Result<TeamMember, AppError> {
        let id = self.member_id(query)?;
        let removed = self.roster.remove(&id)?;
        self.roster.save(self.store.as_ref())?;
        Ok(removed)
    }

    pub fn set_nickname(&mut self, query: &str, nickname: &str) -> Result<(), AppError> {
        let id = self.member_id(query)?;
        self.roster.set_nickname(&id, nickname)?;
        Ok(self.roster.save(self.store.as_ref())?)
    }

    /// Returns the stored (clamped) level
    pub fn set_level(&mut self, query: &str, level: i64) -> Result<u32, AppError> {
        let id = self.member_id(query)?;
        let level = self.roster.set_level(&id, level)?;
        self.roster.save(self.store.as_ref())?;
        Ok(level)
    }

    pub fn set_held_item(&mut self, query: &str, item: &str) -> Result<(), AppError> {
        let id = self.member_id(query)?;
        self.roster.set_held_item(&id, item)?;
        Ok(self.roster.save(self.store.as_ref())?)
    }

    pub fn set_move(&mut self, query: &str, slot: usize, move_name: &str) -> Result<(), AppError> {
        let id = self.member_id(query)?;
        self.roster.set_move(&id, slot, move_name)?;
        Ok(self.roster.save(self.store.as_ref())?)
    }

    pub fn toggle_shiny(&mut self, query: &str) -> Result<bool, AppError> {
        let id = self.member_id(query)?;
        let shiny = self.roster.toggle_shiny(&id)?;
        self.roster.save(self.store.as_ref())?;
        Ok(shiny)
    }

    /// Flips the caught flag for a Pokemon id and returns the new value
    pub fn toggle_caught(&mut self, pokemon_id: u32) -> Result<bool, AppError> {
        let caught = self.caught.toggle(pokemon_id);
        self.caught.save(self.store.as_ref())?;
        Ok(caught)
    }

    /// Drops every cached API response; returns how many were removed
    pub fn clear_cache(&self) -> usize {
        self.cache.clear()
    }

    /// Persists the team and caught map
    pub fn save(&self) -> Result<(), AppError> {
        self.roster.save(self.store.as_ref())?;
        self.caught.save(self.store.as_ref())?;
        Ok(())
    }
}

/// Reads the persisted location, falling back to the default start
fn load_current_location(store: &dyn KeyValueStore) -> &'static str {
    let stored = match store.get(CURRENT_LOCATION_KEY) {
        Ok(Some(raw)) => serde_json::from_str::<String>(&raw).ok(),
        Ok(None) => None,
        Err(e) => {
            warn!("Failed to read current location: {}", e);
            None
        }
    };

    stored
        .as_deref()
        .and_then(get_location_by_id)
        .or_else(|| get_location_by_id(DEFAULT_CURRENT_LOCATION_ID))
        .or_else(|| all_locations().first())
        .map_or(DEFAULT_CURRENT_LOCATION_ID, |loc| loc.id)
}
