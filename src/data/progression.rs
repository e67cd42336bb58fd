//! Static game progression for Pokemon Ultra Moon
//!
//! This module contains the ordered list of locations a Nuzlocke run walks
//! through, with the boss battles that set each section's level cap.

use serde::Serialize;

/// A boss battle that caps the team's levels until it is cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignificantBattle {
    /// Level of the opponent's ace
    pub level: u32,
    /// Name of the battle or opponent, e.g. "Kahuna Hala"
    pub name: &'static str,
    /// Number of Pokemon the opponent fields
    pub pokemon_count: u32,
}

/// A location in the game progression
///
/// Uses `&'static str` fields so the progression can be declared statically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GameLocation {
    pub id: &'static str,
    pub name: &'static str,
    pub significant_battle: Option<SignificantBattle>,
}

/// The next boss battle after a location
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextBattle {
    pub level_cap: u32,
    pub battle_name: &'static str,
    pub location_name: &'static str,
    pub pokemon_count: u32,
}

/// Location a fresh run starts at
pub const DEFAULT_CURRENT_LOCATION_ID: &str = "your-house";

const fn location(id: &'static str, name: &'static str) -> GameLocation {
    GameLocation {
        id,
        name,
        significant_battle: None,
    }
}

const fn battle_location(
    id: &'static str,
    name: &'static str,
    level: u32,
    battle: &'static str,
    pokemon_count: u32,
) -> GameLocation {
    GameLocation {
        id,
        name,
        significant_battle: Some(SignificantBattle {
            level,
            name: battle,
            pokemon_count,
        }),
    }
}

/// Ordered Ultra Moon progression through Melemele and early Akala
pub static ULTRA_MOON_PROGRESSION: [GameLocation; 24] = [
    location("your-house", "Your House (Hau'oli Outskirts)"),
    location("iki-town-initial", "Iki Town (Initial Visit)"),
    location("mahalo-trail", "Mahalo Trail"),
    location("route-1-hauoli-outskirts", "Route 1 (Hau'oli Outskirts)"),
    location("professors-lab", "Professor Kukui's Lab"),
    location("trainers-school", "Trainers' School"),
    location("hauoli-city-beachfront", "Hau'oli City - Beachfront"),
    location("hauoli-city-shopping-district", "Hau'oli City - Shopping District"),
    location("hauoli-city-marina", "Hau'oli City - Marina"),
    location("route-2", "Route 2 (Melemele Island)"),
    location("berry-fields", "Berry Fields (Route 2)"),
    location("verdant-cavern-entrance", "Verdant Cavern - Entrance"),
    // Totem plus one ally
    battle_location(
        "verdant-cavern-trial-site",
        "Verdant Cavern - Trial Site",
        12,
        "Totem Gumshoos / Raticate",
        2,
    ),
    location("route-3", "Route 3 (Melemele Island)"),
    location("melemele-meadow", "Melemele Meadow"),
    location("seaward-cave", "Seaward Cave (Kala'e Bay entrance)"),
    location("kalae-bay", "Kala'e Bay"),
    battle_location(
        "iki-town-grand-trial",
        "Iki Town - Grand Trial",
        16,
        "Kahuna Hala",
        3,
    ),
    location("hehea-city", "Heahea City (Akala Island)"),
    location("route-4-akala", "Route 4 (Akala Island)"),
    location("paniola-town", "Paniola Town"),
    location("paniola-ranch", "Paniola Ranch"),
    location("route-5-akala", "Route 5 (Akala Island)"),
    battle_location(
        "brooklet-hill",
        "Brooklet Hill - Trial Site",
        20,
        "Totem Araquanid / Wishiwashi",
        2,
    ),
];

/// Returns all locations in progression order
pub fn all_locations() -> &'static [GameLocation] {
    &ULTRA_MOON_PROGRESSION
}

/// Looks up a location by its id
pub fn get_location_by_id(id: &str) -> Option<&'static GameLocation> {
    ULTRA_MOON_PROGRESSION.iter().find(|loc| loc.id == id)
}

/// Looks up a location by its display name, ignoring case
pub fn find_location_by_name(name: &str) -> Option<&'static GameLocation> {
    let wanted = name.trim().to_lowercase();
    ULTRA_MOON_PROGRESSION
        .iter()
        .find(|loc| loc.name.to_lowercase() == wanted)
}

/// Resolves user input that may be either an id or a display name
pub fn resolve_location(query: &str) -> Option<&'static GameLocation> {
    get_location_by_id(query.trim()).or_else(|| find_location_by_name(query))
}

fn position(id: &str) -> Option<usize> {
    ULTRA_MOON_PROGRESSION.iter().position(|loc| loc.id == id)
}

/// Finds the first significant battle strictly after `location_id`
///
/// Its level is the level cap for the current stretch of the run.
pub fn next_battle(location_id: &str) -> Option<NextBattle> {
    let index = position(location_id)?;
    ULTRA_MOON_PROGRESSION[index + 1..]
        .iter()
        .find_map(|loc| {
            loc.significant_battle.map(|battle| NextBattle {
                level_cap: battle.level,
                battle_name: battle.name,
                location_name: loc.name,
                pokemon_count: battle.pokemon_count,
            })
        })
}

/// Returns the locations immediately before and after `location_id`
pub fn neighbors(
    location_id: &str,
) -> (Option<&'static GameLocation>, Option<&'static GameLocation>) {
    match position(location_id) {
        Some(index) => (
            index
                .checked_sub(1)
                .and_then(|prev| ULTRA_MOON_PROGRESSION.get(prev)),
            ULTRA_MOON_PROGRESSION.get(index + 1),
        ),
        None => (None, None),
    }
}
