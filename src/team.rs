//! Team roster and caught-Pokemon tracking
//!
//! The roster holds at most six members with at most one member per Pokemon
//! id. Both the roster and the caught map persist to the key-value store as
//! camelCase JSON.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::cache::{KeyValueStore, StoreError};
use crate::detail::StagedMove;

/// Maximum number of Pokemon in a team
pub const MAX_TEAM_SIZE: usize = 6;

/// Number of move slots per member
pub const MOVE_SLOTS: usize = 4;

pub const MIN_LEVEL: u32 = 1;
pub const MAX_LEVEL: u32 = 100;

/// Level a Pokemon joins at when added from its detail panel
pub const DETAIL_ADD_LEVEL: u32 = 5;

/// Store key for the roster
pub const TEAM_KEY: &str = "nuzlocke-team";

/// Store key for the caught map
pub const CAUGHT_KEY: &str = "nuzlocke-caught-pokemon";

/// Errors from roster operations
#[derive(Debug, Error)]
pub enum TeamError {
    #[error("Your team is full (6 Pokémon maximum)")]
    TeamFull,

    #[error("{0} is already in your team")]
    AlreadyInTeam(String),

    #[error("No team member with id {0}")]
    MemberNotFound(String),

    #[error("Move slot {0} is out of range (0-3)")]
    InvalidMoveSlot(usize),

    #[error("Failed to save team: {0}")]
    Storage(#[from] StoreError),

    #[error("Failed to serialize team: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A Pokemon in the player's team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    /// Opaque id derived from the time the member was added
    pub id: String,
    pub species: String,
    #[serde(default)]
    pub nickname: String,
    pub level: u32,
    #[serde(default)]
    pub held_item: String,
    /// Move names, `""` for an empty slot
    #[serde(default, deserialize_with = "deserialize_moves")]
    pub moves: [String; MOVE_SLOTS],
    #[serde(default)]
    pub is_shiny: bool,
    #[serde(default)]
    pub pokemon_id: Option<u32>,
}

impl TeamMember {
    /// Nickname, or the species when no nickname is set
    pub fn display_name(&self) -> &str {
        if self.nickname.is_empty() {
            &self.species
        } else {
            &self.nickname
        }
    }
}

/// Older blobs may store fewer than four moves, or `null` slots
fn deserialize_moves<'de, D>(deserializer: D) -> Result<[String; MOVE_SLOTS], D::Error>
where
    D: Deserializer<'de>,
{
    let stored: Option<Vec<Option<String>>> = Option::deserialize(deserializer)?;
    let mut moves: [String; MOVE_SLOTS] = Default::default();
    for (slot, name) in moves.iter_mut().zip(stored.unwrap_or_default()) {
        *slot = name.unwrap_or_default();
    }
    Ok(moves)
}

/// Input for adding a member
#[derive(Debug, Clone, Default)]
pub struct AddTeamMember {
    pub species: String,
    pub level: u32,
    /// Defaults to the species
    pub nickname: Option<String>,
    pub pokemon_id: Option<u32>,
    /// Placed in the first move slot
    pub initial_move: Option<String>,
}

/// Outcome of trying to assign a staged move
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Reconciliation {
    /// Nothing is staged
    Idle,
    /// No member matches the staged Pokemon yet; the selection is kept
    Pending,
    /// The member already knows the move; the selection is cleared
    AlreadyKnown { member_id: String },
    /// The move was written into `slot`; the selection is cleared
    Assigned { member_id: String, slot: usize },
}

/// Pokemon ids the player has marked as caught
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaughtStatus {
    caught: BTreeMap<String, bool>,
}

impl CaughtStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_caught(&self, pokemon_id: u32) -> bool {
        self.caught
            .get(&pokemon_id.to_string())
            .copied()
            .unwrap_or(false)
    }

    /// Flips the caught flag and returns the new value
    pub fn toggle(&mut self, pokemon_id: u32) -> bool {
        let entry = self.caught.entry(pokemon_id.to_string()).or_insert(false);
        *entry = !*entry;
        *entry
    }

    pub fn mark_caught(&mut self, pokemon_id: u32) {
        self.caught.insert(pokemon_id.to_string(), true);
    }

    /// Ids currently marked as caught
    pub fn caught_ids(&self) -> Vec<u32> {
        self.caught
            .iter()
            .filter(|(_, caught)| **caught)
            .filter_map(|(id, _)| id.parse().ok())
            .collect()
    }

    /// Loads the caught map, falling back to an empty map on any failure
    pub fn load(store: &dyn KeyValueStore) -> Self {
        load_json(store, CAUGHT_KEY).unwrap_or_default()
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), TeamError> {
        store.set(CAUGHT_KEY, &serde_json::to_string(self)?)?;
        Ok(())
    }
}

fn load_json<T: serde::de::DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    match store.get(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Failed to parse {} from storage: {}", key, e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!("Failed to load {} from storage: {}", key, e);
            None
        }
    }
}

/// The player's team
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster {
    members: Vec<TeamMember>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the roster, falling back to an empty team on any failure
    ///
    /// Levels are clamped, a repeated `pokemon_id` keeps only its first member
    /// and an oversized team is truncated.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let mut roster: Roster = load_json(store, TEAM_KEY).unwrap_or_default();
        for member in &mut roster.members {
            member.level = member.level.clamp(MIN_LEVEL, MAX_LEVEL);
        }
        let mut seen = HashSet::new();
        roster.members.retain(|member| match member.pokemon_id {
            Some(pokemon_id) if !seen.insert(pokemon_id) => {
                warn!(
                    "Stored team repeats Pokemon #{}; dropping member {}",
                    pokemon_id, member.id
                );
                false
            }
            _ => true,
        });
        if roster.members.len() > MAX_TEAM_SIZE {
            warn!(
                "Stored team has {} members; keeping the first {}",
                roster.members.len(),
                MAX_TEAM_SIZE
            );
            roster.members.truncate(MAX_TEAM_SIZE);
        }
        roster
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), TeamError> {
        store.set(TEAM_KEY, &serde_json::to_string(self)?)?;
        Ok(())
    }

    pub fn members(&self) -> &[TeamMember] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= MAX_TEAM_SIZE
    }

    pub fn get(&self, member_id: &str) -> Option<&TeamMember> {
        self.members.iter().find(|m| m.id == member_id)
    }

    pub fn find_by_pokemon_id(&self, pokemon_id: u32) -> Option<&TeamMember> {
        self.members
            .iter()
            .find(|m| m.pokemon_id == Some(pokemon_id))
    }

    fn member_mut(&mut self, member_id: &str) -> Result<&mut TeamMember, TeamError> {
        self.members
            .iter_mut()
            .find(|m| m.id == member_id)
            .ok_or_else(|| TeamError::MemberNotFound(member_id.to_string()))
    }

    /// Time-derived id, bumped until it is unique within the roster
    fn next_id(&self) -> String {
        let mut candidate = Utc::now().timestamp_millis();
        while self.members.iter().any(|m| m.id == candidate.to_string()) {
            candidate += 1;
        }
        candidate.to_string()
    }

    /// Adds a member and returns its id
    pub fn add(&mut self, new_member: AddTeamMember) -> Result<String, TeamError> {
        if self.is_full() {
            return Err(TeamError::TeamFull);
        }
        if let Some(pokemon_id) = new_member.pokemon_id {
            if self.find_by_pokemon_id(pokemon_id).is_some() {
                return Err(TeamError::AlreadyInTeam(new_member.species));
            }
        }

        let mut moves: [String; MOVE_SLOTS] = Default::default();
        if let Some(initial) = new_member.initial_move.filter(|m| !m.is_empty()) {
            moves[0] = initial;
        }

        let id = self.next_id();
        let nickname = new_member
            .nickname
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| new_member.species.clone());

        info!("Adding {} to the team", new_member.species);
        self.members.push(TeamMember {
            id: id.clone(),
            species: new_member.species,
            nickname,
            level: new_member.level.clamp(MIN_LEVEL, MAX_LEVEL),
            held_item: String::new(),
            moves,
            is_shiny: false,
            pokemon_id: new_member.pokemon_id,
        });
        Ok(id)
    }

    pub fn remove(&mut self, member_id: &str) -> Result<TeamMember, TeamError> {
        let index = self
            .members
            .iter()
            .position(|m| m.id == member_id)
            .ok_or_else(|| TeamError::MemberNotFound(member_id.to_string()))?;
        Ok(self.members.remove(index))
    }

    pub fn set_nickname(&mut self, member_id: &str, nickname: &str) -> Result<(), TeamError> {
        self.member_mut(member_id)?.nickname = nickname.to_string();
        Ok(())
    }

    /// Sets the level, clamped to 1..=100; returns the stored level
    pub fn set_level(&mut self, member_id: &str, level: i64) -> Result<u32, TeamError> {
        let clamped = level.clamp(i64::from(MIN_LEVEL), i64::from(MAX_LEVEL)) as u32;
        self.member_mut(member_id)?.level = clamped;
        Ok(clamped)
    }

    pub fn set_held_item(&mut self, member_id: &str, item: &str) -> Result<(), TeamError> {
        self.member_mut(member_id)?.held_item = item.to_string();
        Ok(())
    }

    /// Writes a move into slot `index` (0-3); `""` clears the slot
    pub fn set_move(
        &mut self,
        member_id: &str,
        index: usize,
        move_name: &str,
    ) -> Result<(), TeamError> {
        if index >= MOVE_SLOTS {
            return Err(TeamError::InvalidMoveSlot(index));
        }
        self.member_mut(member_id)?.moves[index] = move_name.to_string();
        Ok(())
    }

    /// Flips the shiny flag and returns the new value
    pub fn toggle_shiny(&mut self, member_id: &str) -> Result<bool, TeamError> {
        let member = self.member_mut(member_id)?;
        member.is_shiny = !member.is_shiny;
        Ok(member.is_shiny)
    }

    /// Assigns a staged move to the member with the staged Pokemon id
    ///
    /// The move goes into the first empty slot, or overwrites slot 0 when all
    /// four are taken. The selection is cleared unless no member matches.
    pub fn reconcile_staged_move(&mut self, staged: &mut Option<StagedMove>) -> Reconciliation {
        let Some(selection) = staged.as_ref() else {
            return Reconciliation::Idle;
        };

        let Some(member) = self
            .members
            .iter_mut()
            .find(|m| m.pokemon_id == Some(selection.pokemon_id))
        else {
            return Reconciliation::Pending;
        };

        let move_name = selection.move_name.clone();
        *staged = None;

        if member.moves.iter().any(|m| *m == move_name) {
            return Reconciliation::AlreadyKnown {
                member_id: member.id.clone(),
            };
        }

        let slot = member
            .moves
            .iter()
            .position(String::is_empty)
            .unwrap_or(0);
        member.moves[slot] = move_name;

        Reconciliation::Assigned {
            member_id: member.id.clone(),
            slot,
        }
    }

    /// Adds a Pokemon from its detail panel at level 5
    ///
    /// A staged move for the same Pokemon becomes its first move and is
    /// consumed. The Pokemon is marked caught.
    pub fn add_from_detail(
        &mut self,
        species: &str,
        pokemon_id: u32,
        staged: &mut Option<StagedMove>,
        caught: &mut CaughtStatus,
    ) -> Result<String, TeamError> {
        if self.find_by_pokemon_id(pokemon_id).is_some() {
            return Err(TeamError::AlreadyInTeam(species.to_string()));
        }
        if self.is_full() {
            return Err(TeamError::TeamFull);
        }

        let initial_move = staged
            .as_ref()
            .filter(|selection| selection.pokemon_id == pokemon_id)
            .map(|selection| selection.move_name.clone());

        let id = self.add(AddTeamMember {
            species: species.to_string(),
            level: DETAIL_ADD_LEVEL,
            nickname: None,
            pokemon_id: Some(pokemon_id),
            initial_move: initial_move.clone(),
        })?;

        caught.mark_caught(pokemon_id);
        if initial_move.is_some() {
            *staged = None;
        }
        Ok(id)
    }
}
