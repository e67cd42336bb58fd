//! Plain-text reports for terminal output
//!
//! Each function turns one result into the lines printed by the `nuzlocke`
//! binary. JSON output bypasses this module and serializes the results directly.

use crate::app::LocationView;
use crate::data::{
    display_name, AbilityDetail, GameLocation, MoveDetail, NextBattle, PokemonDetail,
};
use crate::markup::{plain_text, Block};
use crate::team::{Reconciliation, Roster};

fn stat(value: Option<u32>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn battle_line(battle: &NextBattle) -> String {
    format!(
        "Next battle: {} at {} (level cap {}, {} Pokémon)",
        battle.battle_name, battle.location_name, battle.level_cap, battle.pokemon_count
    )
}

/// The progression, marking the current location and boss battles
pub fn location_list(locations: &[GameLocation], current_id: &str) -> String {
    locations
        .iter()
        .map(|loc| {
            let marker = if loc.id == current_id { ">" } else { " " };
            match loc.significant_battle {
                Some(battle) => format!(
                    "{} {:<40} {} (Lv {})",
                    marker, loc.name, battle.name, battle.level
                ),
                None => format!("{} {}", marker, loc.name),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn location_view(view: &LocationView) -> String {
    let details = &view.details;
    let mut lines = vec![details.location_name.clone()];
    if !details.summary.is_empty() {
        lines.push(details.summary.clone());
    }
    if let Some(ref battle) = view.next_battle {
        lines.push(battle_line(battle));
    }

    if !details.catchable_pokemon.is_empty() {
        lines.push(String::new());
        lines.push("Catchable Pokémon:".to_string());
        for pokemon in &details.catchable_pokemon {
            lines.push(format!("  {} - {}", pokemon.name, pokemon.conditions));
        }
    }
    if !details.static_encounters.is_empty() {
        lines.push(String::new());
        lines.push("Static encounters:".to_string());
        for encounter in &details.static_encounters {
            lines.push(format!(
                "  {} (Lv {}) {}",
                encounter.pokemon_name, encounter.level, encounter.notes
            ));
        }
    }
    if !details.trainers.is_empty() {
        lines.push(String::new());
        lines.push("Trainers:".to_string());
        for trainer in &details.trainers {
            lines.push(format!(
                "  {}: {} Lv {} {}",
                trainer.name,
                trainer.strongest_pokemon_name,
                trainer.strongest_pokemon_level,
                trainer.notes
            ));
        }
    }
    if !details.items.is_empty() {
        lines.push(String::new());
        lines.push("Items:".to_string());
        for item in &details.items {
            lines.push(format!("  {} - {}", item.name, item.location_description));
        }
    }

    lines.join("\n")
}

/// Guidance blocks with the markup markers removed
pub fn guidance(blocks: &[Block]) -> String {
    let mut lines = Vec::new();
    for block in blocks {
        match block {
            Block::Paragraph(tokens) => lines.push(plain_text(tokens)),
            Block::List(items) => {
                lines.extend(items.iter().map(|item| format!("  • {}", plain_text(item))));
            }
            Block::Spacer => lines.push(String::new()),
        }
    }
    lines.join("\n")
}

pub fn pokemon(details: &PokemonDetail, caught: bool, staged_move: Option<&str>) -> String {
    let types: Vec<String> = details.types.iter().map(|t| display_name(t)).collect();
    let mut lines = vec![
        format!(
            "#{:03} {}{}",
            details.species_id,
            display_name(&details.name),
            if caught { " (caught)" } else { "" }
        ),
        format!("{} | {}", details.genus, types.join(" / ")),
    ];
    if !details.flavor_text.is_empty() {
        lines.push(details.flavor_text.clone());
    }

    lines.push(String::new());
    lines.push("Abilities:".to_string());
    for ability in &details.abilities {
        let hidden = if ability.is_hidden { " (hidden)" } else { "" };
        lines.push(format!("  {}{}", ability.display_name, hidden));
    }

    lines.push("Base stats:".to_string());
    for base in &details.base_stats {
        lines.push(format!("  {:<16} {:>3}", base.name, base.value));
    }

    if let Some(ref evolutions) = details.evolutions {
        if let Some(ref previous) = evolutions.previous_stage {
            lines.push(format!("Evolves from: {}", display_name(&previous.name)));
        }
        for step in &evolutions.next_stages {
            let mut line = format!("Evolves into: {} ({})", display_name(&step.name), step.trigger);
            if !step.conditions.is_empty() {
                line.push_str(&format!(" [{}]", step.conditions.join(", ")));
            }
            lines.push(line);
        }
    }

    lines.push(String::new());
    lines.push("Level-up moves:".to_string());
    for learned in &details.moves {
        let marker = if staged_move == Some(learned.name.as_str()) { "*" } else { " " };
        lines.push(format!(
            "{} Lv {:>3}  {:<18} {:<9} Pow {:>3}  Acc {:>3}  PP {:>2}",
            marker,
            learned.level_learned_at,
            learned.name,
            learned.move_type.as_deref().unwrap_or("-"),
            stat(learned.power),
            stat(learned.accuracy),
            stat(learned.pp)
        ));
    }

    lines.join("\n")
}

pub fn ability(details: &AbilityDetail) -> String {
    let mut lines = vec![
        format!("{} ({})", details.display_name, details.generation),
        details.effect.clone(),
    ];
    if !details.flavor_text.is_empty() {
        lines.push(format!("\"{}\"", details.flavor_text));
    }
    if !details.pokemon.is_empty() {
        let holders: Vec<String> = details
            .pokemon
            .iter()
            .map(|p| {
                if p.is_hidden {
                    format!("{} (hidden)", p.display_name)
                } else {
                    p.display_name.clone()
                }
            })
            .collect();
        lines.push(format!("Pokémon: {}", holders.join(", ")));
    }
    lines.join("\n")
}

pub fn move_detail(details: &MoveDetail) -> String {
    let mut lines = vec![
        format!("{} ({})", details.display_name, details.generation),
        format!(
            "{} | {} | Power {} | Accuracy {} | PP {} | Priority {}",
            display_name(&details.move_type),
            display_name(&details.damage_class),
            stat(details.power),
            stat(details.accuracy),
            stat(details.pp),
            details.priority
        ),
        format!("Target: {}", display_name(&details.target)),
        details.short_effect.clone(),
    ];
    if !details.flavor_text.is_empty() {
        lines.push(format!("\"{}\"", details.flavor_text));
    }
    lines.join("\n")
}

/// The team, flagging members above the next level cap
pub fn team(roster: &Roster, next_battle: Option<&NextBattle>) -> String {
    if roster.is_empty() {
        return "Your team is empty.".to_string();
    }

    let mut lines = Vec::new();
    if let Some(battle) = next_battle {
        lines.push(battle_line(battle));
    }
    for member in roster.members() {
        let over_cap = next_battle.is_some_and(|b| member.level > b.level_cap);
        let mut header = format!("{} ({}) Lv {}", member.display_name(), member.species, member.level);
        if member.is_shiny {
            header.push_str(" ✨");
        }
        if over_cap {
            header.push_str(" [over level cap]");
        }
        lines.push(header);
        if !member.held_item.is_empty() {
            lines.push(format!("  Item: {}", member.held_item));
        }
        let moves: Vec<&str> = member
            .moves
            .iter()
            .map(|m| if m.is_empty() { "-" } else { m.as_str() })
            .collect();
        lines.push(format!("  Moves: {}", moves.join(" | ")));
        lines.push(format!("  Id: {}", member.id));
    }
    lines.join("\n")
}

/// Describes what happened to a staged move
pub fn reconciliation(outcome: Option<&Reconciliation>, move_name: &str, roster: &Roster) -> String {
    let member_name = |id: &str| {
        roster
            .get(id)
            .map_or_else(|| id.to_string(), |m| m.display_name().to_string())
    };
    match outcome {
        None => format!("Unstaged {}.", move_name),
        Some(Reconciliation::Idle) => "Nothing is staged.".to_string(),
        Some(Reconciliation::Pending) => format!(
            "No team member can learn {} yet. Run `learn` again with --add to recruit this Pokémon with it.",
            move_name
        ),
        Some(Reconciliation::AlreadyKnown { member_id }) => {
            format!("{} already knows {}.", member_name(member_id), move_name)
        }
        Some(Reconciliation::Assigned { member_id, slot }) => format!(
            "{} learned {} in slot {}.",
            member_name(member_id),
            move_name,
            slot + 1
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{all_locations, get_location_by_id, LocationDetail};
    use crate::data::progression::next_battle;
    use crate::markup::parse_guidance;
    use crate::team::AddTeamMember;

    #[test]
    fn test_location_list_marks_current_and_battles() {
        let list = location_list(all_locations(), "mahalo-trail");
        assert!(list.lines().any(|l| l.starts_with("> Mahalo Trail")));
        assert!(list.contains("Kahuna Hala (Lv 16)"));
        assert_eq!(list.lines().count(), all_locations().len());
    }

    #[test]
    fn test_location_view_skips_empty_sections() {
        let view = LocationView {
            location: get_location_by_id("mahalo-trail").unwrap(),
            details: LocationDetail {
                location_id: "mahalo-trail".to_string(),
                location_name: "Mahalo Trail".to_string(),
                summary: "Path to the ruins.".to_string(),
                catchable_pokemon: Vec::new(),
                trainers: Vec::new(),
                items: Vec::new(),
                static_encounters: Vec::new(),
            },
            next_battle: next_battle("mahalo-trail"),
        };
        let text = location_view(&view);
        assert!(text.starts_with("Mahalo Trail\nPath to the ruins."));
        assert!(text.contains("level cap 12"));
        assert!(!text.contains("Trainers:"));
    }

    #[test]
    fn test_guidance_strips_markup() {
        let blocks = parse_guidance("Catch **{{Rowlet}}** early.\n* Visit [[Mahalo Trail]]", all_locations());
        assert_eq!(
            guidance(&blocks),
            "Catch {{Rowlet}} early.\n  • Visit Mahalo Trail"
        );
    }

    #[test]
    fn test_team_report_flags_over_cap() {
        let mut roster = Roster::new();
        roster
            .add(AddTeamMember {
                species: "Litten".to_string(),
                level: 14,
                ..Default::default()
            })
            .unwrap();

        let battle = next_battle("your-house");
        let text = team(&roster, battle.as_ref());
        assert!(text.contains("Litten (Litten) Lv 14 [over level cap]"));
        assert!(text.contains("Moves: - | - | - | -"));

        assert_eq!(team(&Roster::new(), None), "Your team is empty.");
    }

    #[test]
    fn test_reconciliation_messages() {
        let roster = Roster::new();
        assert_eq!(
            reconciliation(Some(&Reconciliation::Pending), "Ember", &roster),
            "No team member can learn Ember yet. Run `learn` again with --add to recruit this Pokémon with it."
        );
        assert_eq!(
            reconciliation(
                Some(&Reconciliation::Assigned {
                    member_id: "1".to_string(),
                    slot: 2
                }),
                "Ember",
                &roster
            ),
            "1 learned Ember in slot 3."
        );
        assert_eq!(reconciliation(None, "Ember", &roster), "Unstaged Ember.");
    }
}
