//! Detail panel state
//!
//! Tracks which detail view is shown (a Pokemon, one of its abilities, or one
//! of its moves), the Pokemon to return to, and the move staged for
//! assignment to the team.
//!
//! Fetches are asynchronous, so every `begin_*` call hands out a
//! [`RequestTicket`]. A `complete_*` call only applies when its ticket is the
//! pending one; responses to superseded requests are dropped.

use serde::{Deserialize, Serialize};

use crate::data::{AbilityDetail, MoveDetail, PokemonDetail, PokemonMove};

/// Which panel is visible
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum DetailView {
    #[default]
    Closed,
    Pokemon,
    Ability,
    Move,
}

/// Identifies one in-flight detail request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    id: u64,
    view: DetailView,
}

/// A move the player picked for assignment to a team member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedMove {
    pub pokemon_id: u32,
    pub move_name: String,
    pub details: PokemonMove,
}

/// The detail panel state machine
#[derive(Debug, Default)]
pub struct DetailPanel {
    view: DetailView,
    pokemon: Option<PokemonDetail>,
    ability: Option<AbilityDetail>,
    move_detail: Option<MoveDetail>,
    /// Pokemon shown before an ability or move was opened
    pokemon_context: Option<PokemonDetail>,
    error: Option<String>,
    pending: Option<RequestTicket>,
    next_ticket: u64,
    staged_move: Option<StagedMove>,
}

impl DetailPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> DetailView {
        self.view
    }

    pub fn pokemon(&self) -> Option<&PokemonDetail> {
        self.pokemon.as_ref()
    }

    pub fn ability(&self) -> Option<&AbilityDetail> {
        self.ability.as_ref()
    }

    pub fn move_detail(&self) -> Option<&MoveDetail> {
        self.move_detail.as_ref()
    }

    pub fn pokemon_context(&self) -> Option<&PokemonDetail> {
        self.pokemon_context.as_ref()
    }

    /// Display string of the last failed fetch
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn staged_move(&self) -> Option<&StagedMove> {
        self.staged_move.as_ref()
    }

    /// Mutable access for consumers of the staged move
    pub fn staged_move_slot(&mut self) -> &mut Option<StagedMove> {
        &mut self.staged_move
    }

    fn issue(&mut self, view: DetailView) -> RequestTicket {
        self.next_ticket += 1;
        let ticket = RequestTicket {
            id: self.next_ticket,
            view,
        };
        self.pending = Some(ticket);
        ticket
    }

    /// Accepts `ticket` if it is the pending request for `view`
    fn settle(&mut self, ticket: RequestTicket, view: DetailView) -> bool {
        if ticket.view != view || self.pending != Some(ticket) {
            return false;
        }
        self.pending = None;
        true
    }

    /// Starts loading a Pokemon, discarding everything shown before
    pub fn begin_pokemon(&mut self) -> RequestTicket {
        self.view = DetailView::Closed;
        self.pokemon = None;
        self.ability = None;
        self.move_detail = None;
        self.pokemon_context = None;
        self.staged_move = None;
        self.error = None;
        self.issue(DetailView::Pokemon)
    }

    /// Starts loading an ability of the shown Pokemon
    ///
    /// Returns `None` unless a Pokemon is shown.
    pub fn begin_ability(&mut self) -> Option<RequestTicket> {
        self.begin_sub_view(DetailView::Ability)
    }

    /// Starts loading a move of the shown Pokemon
    ///
    /// Returns `None` unless a Pokemon is shown.
    pub fn begin_move(&mut self) -> Option<RequestTicket> {
        self.begin_sub_view(DetailView::Move)
    }

    fn begin_sub_view(&mut self, view: DetailView) -> Option<RequestTicket> {
        if self.view != DetailView::Pokemon {
            return None;
        }
        self.pokemon_context = self.pokemon.clone();
        self.ability = None;
        self.move_detail = None;
        self.error = None;
        Some(self.issue(view))
    }

    /// Applies the result of a Pokemon fetch
    ///
    /// Returns `false` when the ticket is stale and the result was dropped.
    pub fn complete_pokemon(
        &mut self,
        ticket: RequestTicket,
        result: Result<PokemonDetail, String>,
    ) -> bool {
        if !self.settle(ticket, DetailView::Pokemon) {
            return false;
        }
        match result {
            Ok(details) => {
                self.pokemon = Some(details);
                self.view = DetailView::Pokemon;
            }
            Err(error) => {
                self.error = Some(error);
                self.view = DetailView::Closed;
            }
        }
        true
    }

    /// Applies the result of an ability fetch
    pub fn complete_ability(
        &mut self,
        ticket: RequestTicket,
        result: Result<AbilityDetail, String>,
    ) -> bool {
        if !self.settle(ticket, DetailView::Ability) {
            return false;
        }
        match result {
            Ok(details) => {
                self.ability = Some(details);
                self.pokemon = None;
                self.move_detail = None;
                self.view = DetailView::Ability;
            }
            Err(error) => self.fall_back(error),
        }
        true
    }

    /// Applies the result of a move fetch
    pub fn complete_move(
        &mut self,
        ticket: RequestTicket,
        result: Result<MoveDetail, String>,
    ) -> bool {
        if !self.settle(ticket, DetailView::Move) {
            return false;
        }
        match result {
            Ok(details) => {
                self.move_detail = Some(details);
                self.pokemon = None;
                self.ability = None;
                self.view = DetailView::Move;
            }
            Err(error) => self.fall_back(error),
        }
        true
    }

    fn fall_back(&mut self, error: String) {
        self.error = Some(error);
        self.ability = None;
        self.move_detail = None;
        match self.pokemon_context.take() {
            Some(context) => {
                self.pokemon = Some(context);
                self.view = DetailView::Pokemon;
            }
            None => {
                self.pokemon = None;
                self.view = DetailView::Closed;
            }
        }
    }

    /// Returns from an ability or move to the Pokemon it was opened from
    ///
    /// Returns `false` (and changes nothing) when there is no Pokemon to return to.
    pub fn back(&mut self) -> bool {
        let Some(context) = self.pokemon_context.take() else {
            return false;
        };
        self.pokemon = Some(context);
        self.ability = None;
        self.move_detail = None;
        self.error = None;
        self.pending = None;
        self.view = DetailView::Pokemon;
        true
    }

    /// Closes the panel and forgets everything, including the staged move
    pub fn close(&mut self) {
        let next_ticket = self.next_ticket;
        *self = Self {
            next_ticket,
            ..Self::default()
        };
    }

    /// Stages a move for assignment, or unstages it if it is already staged
    pub fn stage_move(&mut self, pokemon_id: u32, move_name: &str, details: PokemonMove) {
        let same = self
            .staged_move
            .as_ref()
            .is_some_and(|staged| staged.pokemon_id == pokemon_id && staged.move_name == move_name);

        self.staged_move = if same {
            None
        } else {
            Some(StagedMove {
                pokemon_id,
                move_name: move_name.to_string(),
                details,
            })
        };
    }

    /// Name of the staged move when it belongs to the Pokemon on screen
    pub fn staged_move_for_current(&self) -> Option<&str> {
        if self.view != DetailView::Pokemon {
            return None;
        }
        let pokemon = self.pokemon.as_ref()?;
        self.staged_move
            .as_ref()
            .filter(|staged| staged.pokemon_id == pokemon.id)
            .map(|staged| staged.move_name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pokemon(id: u32, name: &str) -> PokemonDetail {
        PokemonDetail {
            id,
            species_id: id,
            name: name.to_string(),
            sprite_url: None,
            shiny_sprite_url: None,
            genus: String::new(),
            types: vec!["Electric".to_string()],
            abilities: Vec::new(),
            base_stats: Vec::new(),
            evolutions: None,
            flavor_text: String::new(),
            moves: Vec::new(),
        }
    }

    fn ability(name: &str) -> AbilityDetail {
        AbilityDetail {
            id: 9,
            name: name.to_string(),
            display_name: name.to_string(),
            effect: String::new(),
            short_effect: String::new(),
            flavor_text: String::new(),
            generation: String::new(),
            pokemon: Vec::new(),
        }
    }

    fn move_detail(name: &str) -> MoveDetail {
        MoveDetail {
            id: 84,
            name: name.to_string(),
            display_name: name.to_string(),
            move_type: "Electric".to_string(),
            damage_class: "Special".to_string(),
            power: Some(40),
            accuracy: Some(100),
            pp: Some(30),
            priority: 0,
            effect_chance: None,
            effect: String::new(),
            short_effect: String::new(),
            flavor_text: String::new(),
            target: String::new(),
            generation: String::new(),
        }
    }

    fn pokemon_move(name: &str) -> PokemonMove {
        PokemonMove {
            name: name.to_string(),
            raw_name: name.to_lowercase(),
            level_learned_at: 1,
            learn_method: "Level Up".to_string(),
            power: None,
            accuracy: None,
            pp: None,
            move_type: None,
            damage_class: None,
            short_effect: String::new(),
        }
    }

    /// Whenever a panel is shown, exactly its payload is present
    fn assert_consistent(panel: &DetailPanel) {
        match panel.view() {
            DetailView::Closed => {}
            DetailView::Pokemon => {
                assert!(panel.pokemon().is_some());
                assert!(panel.ability().is_none());
                assert!(panel.move_detail().is_none());
            }
            DetailView::Ability => {
                assert!(panel.ability().is_some());
                assert!(panel.pokemon().is_none());
                assert!(panel.move_detail().is_none());
                assert!(panel.pokemon_context().is_some());
            }
            DetailView::Move => {
                assert!(panel.move_detail().is_some());
                assert!(panel.pokemon().is_none());
                assert!(panel.ability().is_none());
                assert!(panel.pokemon_context().is_some());
            }
        }
    }

    fn showing_pikachu() -> DetailPanel {
        let mut panel = DetailPanel::new();
        let ticket = panel.begin_pokemon();
        assert!(panel.complete_pokemon(ticket, Ok(pokemon(25, "Pikachu"))));
        panel
    }

    #[test]
    fn test_open_pokemon() {
        let mut panel = DetailPanel::new();
        let ticket = panel.begin_pokemon();

        assert!(panel.is_loading());
        assert_eq!(panel.view(), DetailView::Closed);

        assert!(panel.complete_pokemon(ticket, Ok(pokemon(25, "Pikachu"))));
        assert!(!panel.is_loading());
        assert_eq!(panel.view(), DetailView::Pokemon);
        assert_eq!(panel.pokemon().unwrap().name, "Pikachu");
        assert_consistent(&panel);
    }

    #[test]
    fn test_failed_pokemon_closes_with_error() {
        let mut panel = showing_pikachu();
        let ticket = panel.begin_pokemon();
        panel.complete_pokemon(ticket, Err("PokeAPI request failed".to_string()));

        assert_eq!(panel.view(), DetailView::Closed);
        assert_eq!(panel.error(), Some("PokeAPI request failed"));
        assert!(panel.pokemon().is_none());
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut panel = DetailPanel::new();
        let first = panel.begin_pokemon();
        let second = panel.begin_pokemon();

        assert!(panel.complete_pokemon(second, Ok(pokemon(26, "Raichu"))));
        assert!(!panel.complete_pokemon(first, Ok(pokemon(25, "Pikachu"))));
        assert_eq!(panel.pokemon().unwrap().name, "Raichu");
    }

    #[test]
    fn test_ticket_for_other_view_is_rejected() {
        let mut panel = showing_pikachu();
        let ticket = panel.begin_ability().unwrap();

        assert!(!panel.complete_move(ticket, Ok(move_detail("Thunder Shock"))));
        assert!(panel.is_loading());
        assert!(panel.complete_ability(ticket, Ok(ability("Static"))));
    }

    #[test]
    fn test_ability_then_back() {
        let mut panel = showing_pikachu();
        let ticket = panel.begin_ability().unwrap();
        // Still showing the Pokemon while the ability loads
        assert_eq!(panel.view(), DetailView::Pokemon);
        assert_consistent(&panel);

        panel.complete_ability(ticket, Ok(ability("Static")));
        assert_eq!(panel.view(), DetailView::Ability);
        assert_eq!(panel.pokemon_context().unwrap().id, 25);
        assert_consistent(&panel);

        assert!(panel.back());
        assert_eq!(panel.view(), DetailView::Pokemon);
        assert_eq!(panel.pokemon().unwrap().id, 25);
        assert!(panel.pokemon_context().is_none());
        assert_consistent(&panel);

        // Nothing to go back to now
        assert!(!panel.back());
        assert_eq!(panel.view(), DetailView::Pokemon);
    }

    #[test]
    fn test_move_failure_falls_back_to_pokemon() {
        let mut panel = showing_pikachu();
        let ticket = panel.begin_move().unwrap();
        panel.complete_move(ticket, Err("move failed".to_string()));

        assert_eq!(panel.view(), DetailView::Pokemon);
        assert_eq!(panel.pokemon().unwrap().id, 25);
        assert_eq!(panel.error(), Some("move failed"));
        assert_consistent(&panel);
    }

    #[test]
    fn test_sub_views_require_a_pokemon() {
        let mut panel = DetailPanel::new();
        assert!(panel.begin_ability().is_none());
        assert!(panel.begin_move().is_none());

        let mut panel = showing_pikachu();
        let ticket = panel.begin_move().unwrap();
        panel.complete_move(ticket, Ok(move_detail("Thunder Shock")));
        assert_consistent(&panel);
        assert!(panel.begin_ability().is_none());
    }

    #[test]
    fn test_close_clears_everything() {
        let mut panel = showing_pikachu();
        panel.stage_move(25, "Thunder Shock", pokemon_move("Thunder Shock"));
        let ticket = panel.begin_ability().unwrap();

        panel.close();

        assert_eq!(panel.view(), DetailView::Closed);
        assert!(panel.pokemon().is_none());
        assert!(panel.pokemon_context().is_none());
        assert!(panel.staged_move().is_none());
        assert!(!panel.is_loading());
        // The in-flight request no longer applies
        assert!(!panel.complete_ability(ticket, Ok(ability("Static"))));
        assert_eq!(panel.view(), DetailView::Closed);
    }

    #[test]
    fn test_begin_pokemon_clears_staged_move() {
        let mut panel = showing_pikachu();
        panel.stage_move(25, "Growl", pokemon_move("Growl"));
        panel.begin_pokemon();
        assert!(panel.staged_move().is_none());
    }

    #[test]
    fn test_stage_move_toggles() {
        let mut panel = showing_pikachu();

        panel.stage_move(25, "Thunder Shock", pokemon_move("Thunder Shock"));
        assert_eq!(panel.staged_move_for_current(), Some("Thunder Shock"));

        panel.stage_move(25, "Growl", pokemon_move("Growl"));
        assert_eq!(panel.staged_move_for_current(), Some("Growl"));

        panel.stage_move(25, "Growl", pokemon_move("Growl"));
        assert!(panel.staged_move().is_none());
        assert_eq!(panel.staged_move_for_current(), None);
    }

    #[test]
    fn test_staged_move_for_other_pokemon_is_hidden() {
        let mut panel = showing_pikachu();
        panel.stage_move(26, "Thunderbolt", pokemon_move("Thunderbolt"));

        assert!(panel.staged_move().is_some());
        assert_eq!(panel.staged_move_for_current(), None);
    }
}
