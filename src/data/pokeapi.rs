//! PokeAPI client
//!
//! Assembles denormalized Pokemon, ability and move views from the public
//! PokeAPI REST service and caches each of them independently.

use futures::future::join_all;
use log::{debug, info, warn};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;

use super::evolution::{process_evolution_chain, resource_id, EvolutionChainResponse, NamedResource};
use super::{
    capitalize, display_name, AbilityDetail, AbilityPokemon, AbilitySummary, BaseStat, MoveDetail,
    PokemonDetail, PokemonMove,
};
use crate::cache::{CacheManager, ABILITY_PREFIX, MOVE_PREFIX, POKEMON_PREFIX};

/// Base URL for the public PokeAPI
pub const POKEAPI_BASE_URL: &str = "https://pokeapi.co/api/v2";

/// Version group whose level-up learnset is shown
const VERSION_GROUP: &str = "ultra-sun-ultra-moon";

/// Maximum number of level-up moves enriched per Pokemon
const MAX_LEVEL_UP_MOVES: usize = 20;

const LEVEL_UP_METHOD: &str = "level-up";

/// Errors that can occur when fetching from PokeAPI
#[derive(Debug, Error)]
pub enum PokeApiError {
    /// Non-2xx response
    #[error("PokeAPI request failed for {endpoint}: {status} - {message}")]
    Http {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Failed to parse API response
    #[error("Failed to parse PokeAPI response for {endpoint}: {source}")]
    Parse {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Error body PokeAPI sends with 4xx/5xx statuses (when it sends JSON at all)
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    detail: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResource {
    url: String,
}

/// Response from `/pokemon/{name}`
#[derive(Debug, Deserialize)]
struct PokemonResponse {
    id: u32,
    name: String,
    species: NamedResource,
    #[serde(default)]
    sprites: Sprites,
    #[serde(default)]
    types: Vec<TypeSlot>,
    #[serde(default)]
    abilities: Vec<AbilitySlot>,
    #[serde(default)]
    stats: Vec<StatSlot>,
    #[serde(default)]
    moves: Vec<MoveSlot>,
}

#[derive(Debug, Default, Deserialize)]
struct Sprites {
    front_default: Option<String>,
    front_shiny: Option<String>,
    other: Option<OtherSprites>,
}

#[derive(Debug, Deserialize)]
struct OtherSprites {
    #[serde(rename = "official-artwork")]
    official_artwork: Option<ArtworkSprites>,
}

#[derive(Debug, Deserialize)]
struct ArtworkSprites {
    front_default: Option<String>,
    front_shiny: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TypeSlot {
    #[serde(rename = "type")]
    type_info: NamedResource,
}

#[derive(Debug, Deserialize)]
struct AbilitySlot {
    ability: NamedResource,
    #[serde(default)]
    is_hidden: bool,
}

#[derive(Debug, Deserialize)]
struct StatSlot {
    base_stat: u32,
    stat: NamedResource,
}

#[derive(Debug, Deserialize)]
struct MoveSlot {
    #[serde(rename = "move")]
    move_info: NamedResource,
    #[serde(default)]
    version_group_details: Vec<VersionGroupDetail>,
}

#[derive(Debug, Deserialize)]
struct VersionGroupDetail {
    level_learned_at: u32,
    move_learn_method: NamedResource,
    version_group: NamedResource,
}

/// Response from `/pokemon-species/{id}`
#[derive(Debug, Deserialize)]
struct SpeciesResponse {
    id: u32,
    #[serde(default)]
    flavor_text_entries: Vec<FlavorTextEntry>,
    #[serde(default)]
    genera: Vec<GenusEntry>,
    evolution_chain: Option<ApiResource>,
}

#[derive(Debug, Deserialize)]
struct FlavorTextEntry {
    flavor_text: String,
    language: NamedResource,
}

#[derive(Debug, Deserialize)]
struct GenusEntry {
    genus: String,
    language: NamedResource,
}

#[derive(Debug, Deserialize)]
struct EffectEntry {
    effect: String,
    short_effect: String,
    language: NamedResource,
}

/// Ability and move flavor text entries use `flavor_text` too, with a version group
#[derive(Debug, Deserialize)]
struct VersionedFlavorText {
    flavor_text: String,
    language: NamedResource,
}

/// Response from `/ability/{name}`
#[derive(Debug, Deserialize)]
struct AbilityResponse {
    id: u32,
    name: String,
    #[serde(default)]
    effect_entries: Vec<EffectEntry>,
    #[serde(default)]
    flavor_text_entries: Vec<VersionedFlavorText>,
    generation: Option<NamedResource>,
    #[serde(default)]
    pokemon: Vec<AbilityPokemonSlot>,
}

#[derive(Debug, Deserialize)]
struct AbilityPokemonSlot {
    #[serde(default)]
    is_hidden: bool,
    pokemon: NamedResource,
}

/// Response from `/move/{name}`
#[derive(Debug, Deserialize)]
struct MoveResponse {
    id: u32,
    name: String,
    #[serde(rename = "type")]
    type_info: Option<NamedResource>,
    damage_class: Option<NamedResource>,
    power: Option<u32>,
    accuracy: Option<u32>,
    pp: Option<u32>,
    #[serde(default)]
    priority: i32,
    effect_chance: Option<u32>,
    #[serde(default)]
    effect_entries: Vec<EffectEntry>,
    #[serde(default)]
    flavor_text_entries: Vec<VersionedFlavorText>,
    target: Option<NamedResource>,
    generation: Option<NamedResource>,
}

/// Turns user input such as "Alolan Raichu" or "Farfetch'd" into a PokeAPI name
///
/// Numeric ids pass through unchanged.
pub fn normalize_pokemon_name(input: &str) -> String {
    let name = input.trim().to_lowercase();
    match name.strip_prefix("alolan ") {
        Some(base) => format!("{}-alola", join_whitespace(base.trim(), "-")),
        None => strip_punctuation(&join_whitespace(&name, "-")),
    }
}

/// Turns an ability or move name such as "Thunder Shock" into "thunder-shock"
pub fn normalize_resource_name(input: &str) -> String {
    strip_punctuation(&join_whitespace(&input.trim().to_lowercase(), "-"))
}

fn join_whitespace(text: &str, separator: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(separator)
}

fn strip_punctuation(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '.' | '\'' | '\u{2019}' | '"'))
        .collect()
}

/// Replaces the line and form feeds PokeAPI keeps from the game text
fn sanitize_text(text: &str) -> String {
    text.replace(['\n', '\u{000C}', '\r'], " ")
}

fn english<'a, T>(entries: &'a [T], language: impl Fn(&T) -> &NamedResource) -> Option<&'a T> {
    entries.iter().find(|entry| language(entry).name == "en")
}

fn latest_english<'a, T>(
    entries: &'a [T],
    language: impl Fn(&T) -> &NamedResource,
) -> Option<&'a T> {
    entries.iter().rev().find(|entry| language(entry).name == "en")
}

/// "generation-vii" becomes "Generation VII"
fn generation_name(generation: Option<&NamedResource>) -> String {
    match generation {
        Some(resource) => match resource.name.strip_prefix("generation-") {
            Some(numeral) => format!("Generation {}", numeral.to_uppercase()),
            None => display_name(&resource.name),
        },
        None => String::new(),
    }
}

/// Client for the PokeAPI REST service
#[derive(Debug, Clone)]
pub struct PokeApiClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Base URL for the API (allows override for testing)
    base_url: String,
    /// Cache manager for persisting responses
    cache: Option<CacheManager>,
}

impl PokeApiClient {
    /// Creates a new PokeApiClient against the public API
    pub fn new(cache: Option<CacheManager>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: POKEAPI_BASE_URL.to_string(),
            cache,
        }
    }

    /// Overrides the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Fetches and decodes `{base_url}/{endpoint}`
    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, PokeApiError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("GET {}", url);

        let response = self.http_client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.detail.or(b.message))
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(PokeApiError::Http {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| PokeApiError::Parse {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    /// Fetches the denormalized details of a Pokemon
    ///
    /// # Arguments
    /// * `name_or_id` - A display name ("Alolan Raichu"), API name, or numeric id
    ///
    /// # Returns
    /// * `Ok(PokemonDetail)` - Details with up to 20 enriched level-up moves
    /// * `Err(PokeApiError)` - If the Pokemon or its species cannot be fetched
    ///
    /// # Behavior
    /// - Serves a fresh cached entry without touching the network
    /// - A failed evolution chain leaves `evolutions` as `None`
    /// - A failed move keeps its name and level with empty stats
    pub async fn fetch_pokemon_details(
        &self,
        name_or_id: &str,
    ) -> Result<PokemonDetail, PokeApiError> {
        let key = normalize_pokemon_name(name_or_id);
        let cache_key = format!("{}{}", POKEMON_PREFIX, key);

        if let Some(ref cache) = self.cache {
            if let Some(cached) = cache.get::<PokemonDetail>(&cache_key) {
                debug!("Cache hit: Pokemon {}", key);
                return Ok(cached);
            }
        }

        let pokemon: PokemonResponse = self.get_json(&format!("pokemon/{}", key)).await?;

        let species_endpoint = match resource_id(&pokemon.species.url) {
            Some(id) => format!("pokemon-species/{}", id),
            None => format!("pokemon-species/{}", pokemon.species.name),
        };
        let species: SpeciesResponse = self.get_json(&species_endpoint).await?;

        let evolutions = match species
            .evolution_chain
            .as_ref()
            .and_then(|chain| resource_id(&chain.url))
        {
            Some(chain_id) => {
                match self
                    .get_json::<EvolutionChainResponse>(&format!("evolution-chain/{}", chain_id))
                    .await
                {
                    Ok(response) => Some(process_evolution_chain(&response.chain, species.id)),
                    Err(e) => {
                        warn!("Failed to fetch evolution chain for {}: {}", pokemon.name, e);
                        None
                    }
                }
            }
            None => None,
        };

        let moves = self.fetch_level_up_moves(&pokemon.moves).await;

        let flavor_text = english(&species.flavor_text_entries, |e| &e.language)
            .map(|entry| sanitize_text(&entry.flavor_text))
            .unwrap_or_else(|| "No flavor text available.".to_string());

        let genus = english(&species.genera, |g| &g.language)
            .map(|entry| entry.genus.clone())
            .unwrap_or_else(|| "Unknown Pokémon".to_string());

        let mut abilities: Vec<AbilitySummary> = pokemon
            .abilities
            .iter()
            .map(|slot| AbilitySummary {
                display_name: display_name(&slot.ability.name),
                raw_name: slot.ability.name.clone(),
                is_hidden: slot.is_hidden,
            })
            .collect();
        // Stable: slot order is kept within each group
        abilities.sort_by_key(|ability| ability.is_hidden);

        let artwork = pokemon
            .sprites
            .other
            .as_ref()
            .and_then(|other| other.official_artwork.as_ref());

        let details = PokemonDetail {
            id: pokemon.id,
            species_id: species.id,
            name: capitalize(&pokemon.name),
            sprite_url: artwork
                .and_then(|art| art.front_default.clone())
                .or_else(|| pokemon.sprites.front_default.clone()),
            shiny_sprite_url: artwork
                .and_then(|art| art.front_shiny.clone())
                .or_else(|| pokemon.sprites.front_shiny.clone()),
            genus,
            types: pokemon
                .types
                .iter()
                .map(|slot| capitalize(&slot.type_info.name))
                .collect(),
            abilities,
            base_stats: pokemon
                .stats
                .iter()
                .map(|slot| BaseStat {
                    name: display_name(&slot.stat.name),
                    value: slot.base_stat,
                })
                .collect(),
            evolutions,
            flavor_text,
            moves,
        };

        if let Some(ref cache) = self.cache {
            cache.set(&cache_key, &details);
            info!("Pokemon data for \"{}\" cached", key);
        }

        Ok(details)
    }

    /// Enriches the Ultra Sun/Ultra Moon level-up learnset concurrently
    async fn fetch_level_up_moves(&self, slots: &[MoveSlot]) -> Vec<PokemonMove> {
        let mut learnset: Vec<(&str, u32)> = slots
            .iter()
            .filter_map(|slot| {
                slot.version_group_details
                    .iter()
                    .find(|detail| {
                        detail.version_group.name == VERSION_GROUP
                            && detail.move_learn_method.name == LEVEL_UP_METHOD
                    })
                    .filter(|detail| detail.level_learned_at > 0)
                    .map(|detail| (slot.move_info.name.as_str(), detail.level_learned_at))
            })
            .collect();

        learnset.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        learnset.truncate(MAX_LEVEL_UP_MOVES);

        let requests = learnset.into_iter().map(|(raw_name, level)| async move {
            match self.fetch_full_move_details(raw_name).await {
                Ok(detail) => PokemonMove {
                    name: display_name(raw_name),
                    raw_name: raw_name.to_string(),
                    level_learned_at: level,
                    learn_method: "Level Up".to_string(),
                    power: detail.power,
                    accuracy: detail.accuracy,
                    pp: detail.pp,
                    move_type: Some(detail.move_type),
                    damage_class: Some(detail.damage_class),
                    short_effect: if detail.short_effect.is_empty() {
                        "No effect description.".to_string()
                    } else {
                        detail.short_effect
                    },
                },
                Err(e) => {
                    warn!("Failed to fetch details for move {}: {}", raw_name, e);
                    PokemonMove {
                        name: display_name(raw_name),
                        raw_name: raw_name.to_string(),
                        level_learned_at: level,
                        learn_method: "Level Up".to_string(),
                        power: None,
                        accuracy: None,
                        pp: None,
                        move_type: None,
                        damage_class: None,
                        short_effect: "Error fetching details.".to_string(),
                    }
                }
            }
        });

        join_all(requests).await
    }

    /// Fetches the denormalized details of an ability
    pub async fn fetch_ability_details(
        &self,
        name_or_id: &str,
    ) -> Result<AbilityDetail, PokeApiError> {
        let key = normalize_resource_name(name_or_id);
        let cache_key = format!("{}{}", ABILITY_PREFIX, key);

        if let Some(ref cache) = self.cache {
            if let Some(cached) = cache.get::<AbilityDetail>(&cache_key) {
                debug!("Cache hit: ability {}", key);
                return Ok(cached);
            }
        }

        let ability: AbilityResponse = self.get_json(&format!("ability/{}", key)).await?;
        let effect = english(&ability.effect_entries, |e| &e.language);

        let details = AbilityDetail {
            id: ability.id,
            display_name: display_name(&ability.name),
            effect: effect
                .map(|e| sanitize_text(&e.effect))
                .unwrap_or_default(),
            short_effect: effect
                .map(|e| sanitize_text(&e.short_effect))
                .unwrap_or_default(),
            flavor_text: latest_english(&ability.flavor_text_entries, |e| &e.language)
                .map(|e| sanitize_text(&e.flavor_text))
                .unwrap_or_default(),
            generation: generation_name(ability.generation.as_ref()),
            pokemon: ability
                .pokemon
                .iter()
                .map(|slot| AbilityPokemon {
                    id: resource_id(&slot.pokemon.url).unwrap_or_default(),
                    name: slot.pokemon.name.clone(),
                    display_name: display_name(&slot.pokemon.name),
                    is_hidden: slot.is_hidden,
                })
                .collect(),
            name: ability.name,
        };

        if let Some(ref cache) = self.cache {
            cache.set(&cache_key, &details);
        }

        Ok(details)
    }

    /// Fetches the denormalized details of a move
    ///
    /// `$effect_chance` in the short effect is replaced with the move's
    /// effect chance, or removed when it has none.
    pub async fn fetch_full_move_details(
        &self,
        name_or_id: &str,
    ) -> Result<MoveDetail, PokeApiError> {
        let key = normalize_resource_name(name_or_id);
        let cache_key = format!("{}{}", MOVE_PREFIX, key);

        if let Some(ref cache) = self.cache {
            if let Some(cached) = cache.get::<MoveDetail>(&cache_key) {
                debug!("Cache hit: move {}", key);
                return Ok(cached);
            }
        }

        let response: MoveResponse = self.get_json(&format!("move/{}", key)).await?;
        let chance = response
            .effect_chance
            .map(|chance| chance.to_string())
            .unwrap_or_default();
        let effect = english(&response.effect_entries, |e| &e.language);

        let details = MoveDetail {
            id: response.id,
            display_name: display_name(&response.name),
            move_type: response
                .type_info
                .as_ref()
                .map(|t| capitalize(&t.name))
                .unwrap_or_default(),
            damage_class: response
                .damage_class
                .as_ref()
                .map(|c| capitalize(&c.name))
                .unwrap_or_default(),
            power: response.power,
            accuracy: response.accuracy,
            pp: response.pp,
            priority: response.priority,
            effect_chance: response.effect_chance,
            effect: effect
                .map(|e| sanitize_text(&e.effect.replace("$effect_chance", &chance)))
                .unwrap_or_default(),
            short_effect: effect
                .map(|e| sanitize_text(&e.short_effect.replace("$effect_chance", &chance)))
                .unwrap_or_default(),
            flavor_text: latest_english(&response.flavor_text_entries, |e| &e.language)
                .map(|e| sanitize_text(&e.flavor_text))
                .unwrap_or_default(),
            target: response
                .target
                .as_ref()
                .map(|t| display_name(&t.name))
                .unwrap_or_default(),
            generation: generation_name(response.generation.as_ref()),
            name: response.name,
        };

        if let Some(ref cache) = self.cache {
            cache.set(&cache_key, &details);
        }

        Ok(details)
    }
}
