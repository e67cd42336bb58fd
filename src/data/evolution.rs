//! Evolution chain processing
//!
//! Walks a PokeAPI evolution chain to find a species and describes its
//! neighbourhood: the stage it evolves from and every branch it evolves into.

use serde::Deserialize;

use super::{capitalize, EvolutionStage, EvolutionStep, Evolutions};

/// Base URL for the per-species sprites used in evolution stages
const SPRITE_BASE_URL: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";

/// A named PokeAPI resource reference
#[derive(Debug, Clone, Deserialize)]
pub struct NamedResource {
    pub name: String,
    pub url: String,
}

/// Response from `/evolution-chain/{id}`
#[derive(Debug, Deserialize)]
pub struct EvolutionChainResponse {
    pub chain: ChainLink,
}

/// One node of an evolution chain
#[derive(Debug, Clone, Deserialize)]
pub struct ChainLink {
    pub species: NamedResource,
    #[serde(default)]
    pub evolution_details: Vec<EvolutionDetail>,
    #[serde(default)]
    pub evolves_to: Vec<ChainLink>,
}

/// How a chain node is reached from its parent
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvolutionDetail {
    pub trigger: Option<NamedResource>,
    pub min_level: Option<u32>,
    pub item: Option<NamedResource>,
    pub gender: Option<u8>,
    pub held_item: Option<NamedResource>,
    pub known_move: Option<NamedResource>,
    pub min_affection: Option<u32>,
    pub min_beauty: Option<u32>,
    pub min_happiness: Option<u32>,
    pub time_of_day: Option<String>,
    pub location: Option<NamedResource>,
    #[serde(default)]
    pub needs_overworld_rain: bool,
    pub party_species: Option<NamedResource>,
}

/// Parses the trailing numeric id out of a resource URL
///
/// `https://pokeapi.co/api/v2/pokemon-species/25/` yields `Some(25)`.
pub fn resource_id(url: &str) -> Option<u32> {
    url.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

/// Sprite URL for a species id
pub fn sprite_url(id: u32) -> String {
    format!("{}/{}.png", SPRITE_BASE_URL, id)
}

fn stage(link: &ChainLink) -> EvolutionStage {
    let id = resource_id(&link.species.url).unwrap_or_default();
    EvolutionStage {
        name: link.species.name.clone(),
        id,
        sprite_url: sprite_url(id),
    }
}

fn spaced(name: &str) -> String {
    name.replace('-', " ")
}

/// Describes the trigger of a chain node, e.g. "Level 16" or "Use water stone"
fn trigger_text(detail: Option<&EvolutionDetail>) -> String {
    let Some(detail) = detail else {
        return "Unknown".to_string();
    };

    if let Some(level) = detail.min_level.filter(|level| *level > 0) {
        format!("Level {}", level)
    } else if let Some(ref item) = detail.item {
        format!("Use {}", spaced(&item.name))
    } else {
        detail
            .trigger
            .as_ref()
            .map(|trigger| trigger.name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

fn conditions(detail: Option<&EvolutionDetail>) -> Vec<String> {
    let Some(detail) = detail else {
        return Vec::new();
    };

    let mut conditions = Vec::new();
    match detail.gender {
        Some(1) => conditions.push("Female".to_string()),
        Some(2) => conditions.push("Male".to_string()),
        _ => {}
    }
    if let Some(ref item) = detail.held_item {
        conditions.push(format!("Hold {}", spaced(&item.name)));
    }
    if let Some(ref known) = detail.known_move {
        conditions.push(format!("Knows {}", spaced(&known.name)));
    }
    if let Some(n) = detail.min_affection.filter(|n| *n > 0) {
        conditions.push(format!("Affection {}+", n));
    }
    if let Some(n) = detail.min_beauty.filter(|n| *n > 0) {
        conditions.push(format!("Beauty {}+", n));
    }
    if let Some(n) = detail.min_happiness.filter(|n| *n > 0) {
        conditions.push(format!("Happiness {}+", n));
    }
    if let Some(time) = detail.time_of_day.as_deref().filter(|t| !t.is_empty()) {
        conditions.push(capitalize(time));
    }
    if let Some(ref location) = detail.location {
        conditions.push(format!("At {}", spaced(&location.name)));
    }
    if detail.needs_overworld_rain {
        conditions.push("Overworld rain".to_string());
    }
    if let Some(ref species) = detail.party_species {
        conditions.push(format!("With {} in party", spaced(&species.name)));
    }
    conditions
}

fn step(link: &ChainLink) -> EvolutionStep {
    let current = stage(link);
    let detail = link.evolution_details.first();
    EvolutionStep {
        name: current.name,
        id: current.id,
        sprite_url: current.sprite_url,
        trigger: trigger_text(detail),
        conditions: conditions(detail),
    }
}

/// Depth-first search recording the path from the root to `species_id`
fn find_path<'a>(link: &'a ChainLink, species_id: u32, path: &mut Vec<&'a ChainLink>) -> bool {
    path.push(link);
    if resource_id(&link.species.url) == Some(species_id) {
        return true;
    }
    for next in &link.evolves_to {
        if find_path(next, species_id, path) {
            return true;
        }
    }
    path.pop();
    false
}

/// Builds the evolution neighbourhood of `species_id` within `chain`
///
/// When the species is not in the chain, the root becomes the current stage
/// and there is no previous stage.
pub fn process_evolution_chain(chain: &ChainLink, species_id: u32) -> Evolutions {
    let mut path = Vec::new();

    if find_path(chain, species_id, &mut path) {
        let current = path[path.len() - 1];
        let previous_stage = path.len().checked_sub(2).map(|i| stage(path[i]));
        Evolutions {
            previous_stage,
            current_stage: stage(current),
            next_stages: current.evolves_to.iter().map(step).collect(),
        }
    } else {
        Evolutions {
            previous_stage: None,
            current_stage: stage(chain),
            next_stages: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIKACHU_CHAIN: &str = r#"{
        "id": 10,
        "chain": {
            "species": { "name": "pichu", "url": "https://pokeapi.co/api/v2/pokemon-species/172/" },
            "evolution_details": [],
            "evolves_to": [{
                "species": { "name": "pikachu", "url": "https://pokeapi.co/api/v2/pokemon-species/25/" },
                "evolution_details": [{
                    "trigger": { "name": "level-up", "url": "https://pokeapi.co/api/v2/evolution-trigger/1/" },
                    "min_happiness": 220,
                    "min_level": null,
                    "gender": null,
                    "item": null,
                    "time_of_day": "",
                    "needs_overworld_rain": false
                }],
                "evolves_to": [{
                    "species": { "name": "raichu", "url": "https://pokeapi.co/api/v2/pokemon-species/26/" },
                    "evolution_details": [{
                        "trigger": { "name": "use-item", "url": "https://pokeapi.co/api/v2/evolution-trigger/3/" },
                        "item": { "name": "thunder-stone", "url": "https://pokeapi.co/api/v2/item/83/" },
                        "location": null
                    }],
                    "evolves_to": []
                }]
            }]
        }
    }"#;

    const ROCKRUFF_CHAIN: &str = r#"{
        "chain": {
            "species": { "name": "rockruff", "url": "https://pokeapi.co/api/v2/pokemon-species/744/" },
            "evolution_details": [],
            "evolves_to": [
                {
                    "species": { "name": "lycanroc", "url": "https://pokeapi.co/api/v2/pokemon-species/745/" },
                    "evolution_details": [{
                        "trigger": { "name": "level-up", "url": "" },
                        "min_level": 25,
                        "time_of_day": "dusk",
                        "gender": 2,
                        "held_item": { "name": "king-s-rock", "url": "" },
                        "party_species": { "name": "mr-mime", "url": "" },
                        "needs_overworld_rain": true
                    }],
                    "evolves_to": []
                },
                {
                    "species": { "name": "mystery", "url": "https://pokeapi.co/api/v2/pokemon-species/9999/" },
                    "evolution_details": [],
                    "evolves_to": []
                }
            ]
        }
    }"#;

    fn chain(json: &str) -> ChainLink {
        serde_json::from_str::<EvolutionChainResponse>(json)
            .expect("fixture should parse")
            .chain
    }

    #[test]
    fn test_resource_id() {
        assert_eq!(
            resource_id("https://pokeapi.co/api/v2/pokemon-species/25/"),
            Some(25)
        );
        assert_eq!(resource_id("https://pokeapi.co/api/v2/move/33"), Some(33));
        assert_eq!(resource_id("https://pokeapi.co/api/v2/move/"), None);
        assert_eq!(resource_id(""), None);
    }

    #[test]
    fn test_middle_stage_has_previous_and_next() {
        let evolutions = process_evolution_chain(&chain(PIKACHU_CHAIN), 25);

        let previous = evolutions.previous_stage.unwrap();
        assert_eq!(previous.name, "pichu");
        assert_eq!(previous.id, 172);
        assert_eq!(
            previous.sprite_url,
            "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/172.png"
        );

        assert_eq!(evolutions.current_stage.name, "pikachu");
        assert_eq!(evolutions.next_stages.len(), 1);

        let raichu = &evolutions.next_stages[0];
        assert_eq!(raichu.name, "raichu");
        assert_eq!(raichu.id, 26);
        assert_eq!(raichu.trigger, "Use thunder stone");
        assert!(raichu.conditions.is_empty());
    }

    #[test]
    fn test_base_stage_happiness_condition() {
        let evolutions = process_evolution_chain(&chain(PIKACHU_CHAIN), 172);

        assert!(evolutions.previous_stage.is_none());
        assert_eq!(evolutions.current_stage.name, "pichu");
        let pikachu = &evolutions.next_stages[0];
        assert_eq!(pikachu.trigger, "level-up");
        assert_eq!(pikachu.conditions, vec!["Happiness 220+"]);
    }

    #[test]
    fn test_final_stage_has_no_next() {
        let evolutions = process_evolution_chain(&chain(PIKACHU_CHAIN), 26);

        assert_eq!(evolutions.previous_stage.unwrap().name, "pikachu");
        assert_eq!(evolutions.current_stage.id, 26);
        assert!(evolutions.next_stages.is_empty());
    }

    #[test]
    fn test_branches_and_conditions() {
        let evolutions = process_evolution_chain(&chain(ROCKRUFF_CHAIN), 744);

        assert_eq!(evolutions.next_stages.len(), 2);
        let lycanroc = &evolutions.next_stages[0];
        assert_eq!(lycanroc.trigger, "Level 25");
        assert_eq!(
            lycanroc.conditions,
            vec![
                "Male",
                "Hold king s rock",
                "Dusk",
                "Overworld rain",
                "With mr mime in party"
            ]
        );

        let mystery = &evolutions.next_stages[1];
        assert_eq!(mystery.trigger, "Unknown");
        assert!(mystery.conditions.is_empty());
    }

    #[test]
    fn test_species_not_in_chain_falls_back_to_root() {
        let evolutions = process_evolution_chain(&chain(PIKACHU_CHAIN), 133);

        assert!(evolutions.previous_stage.is_none());
        assert_eq!(evolutions.current_stage.name, "pichu");
        assert!(evolutions.next_stages.is_empty());
    }
}
