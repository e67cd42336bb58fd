//! Navigator guidance markup
//!
//! Guidance text marks Pokemon as `{{Name}}`, locations as `[[Location]]` and
//! emphasis as `**text**`. Lines starting with `* ` or `- ` are list items.
//! This module turns that text into tokens and blocks a front end can render
//! and link.

use serde::Serialize;

use crate::data::GameLocation;

/// An inline piece of a guidance line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Token {
    Text(String),
    /// A Pokemon name that can be looked up
    PokemonRef(String),
    /// A location that resolved against the known progression
    LocationRef { id: String, name: String },
    Bold(String),
}

/// A block of guidance text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Block {
    Paragraph(Vec<Token>),
    /// Consecutive list items, one token run per item
    List(Vec<Vec<Token>>),
    /// Vertical space after a paragraph
    Spacer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Pokemon,
    Location,
    Bold,
}

struct Match<'a> {
    kind: Kind,
    start: usize,
    end: usize,
    content: &'a str,
}

/// Finds the first `open content close` where content is non-empty and free
/// of the delimiter characters
fn find_delimited<'a>(
    text: &'a str,
    kind: Kind,
    open: &str,
    close: &str,
    forbidden: [char; 2],
) -> Option<Match<'a>> {
    let mut from = 0;
    while let Some(offset) = text[from..].find(open) {
        let start = from + offset;
        let inner_start = start + open.len();
        let rest = &text[inner_start..];
        let content_len = rest.find(forbidden).unwrap_or(rest.len());
        if content_len > 0 && rest[content_len..].starts_with(close) {
            return Some(Match {
                kind,
                start,
                end: inner_start + content_len + close.len(),
                content: &rest[..content_len],
            });
        }
        // Advance one character past the opening position
        from = start + text[start..].chars().next().map_or(1, char::len_utf8);
    }
    None
}

/// Finds the first `**content**` with non-empty content
fn find_bold(text: &str) -> Option<Match<'_>> {
    let mut from = 0;
    while let Some(offset) = text[from..].find("**") {
        let start = from + offset;
        let inner_start = start + 2;
        let rest = &text[inner_start..];
        if let Some(first) = rest.chars().next() {
            let skip = first.len_utf8();
            if let Some(close) = rest[skip..].find("**") {
                let content_len = skip + close;
                return Some(Match {
                    kind: Kind::Bold,
                    start,
                    end: inner_start + content_len + 2,
                    content: &rest[..content_len],
                });
            }
        }
        from = start + 1;
    }
    None
}

fn push_text(tokens: &mut Vec<Token>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Token::Text(previous)) = tokens.last_mut() {
        previous.push_str(text);
    } else {
        tokens.push(Token::Text(text.to_string()));
    }
}

/// Splits one line into text, Pokemon, location and bold tokens
///
/// The leftmost marker wins; on a tie Pokemon beat locations beat bold.
/// A `[[Location]]` that matches no known location name (ignoring case)
/// becomes plain text.
pub fn tokenize_line(line: &str, locations: &[GameLocation]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut remaining = line;

    while !remaining.is_empty() {
        let candidates = [
            find_delimited(remaining, Kind::Pokemon, "{{", "}}", ['{', '}']),
            find_delimited(remaining, Kind::Location, "[[", "]]", ['[', ']']),
            find_bold(remaining),
        ];

        // min_by_key keeps the first of equal keys, which encodes the tie order
        let Some(found) = candidates.into_iter().flatten().min_by_key(|m| m.start) else {
            push_text(&mut tokens, remaining);
            break;
        };

        push_text(&mut tokens, &remaining[..found.start]);

        match found.kind {
            Kind::Pokemon => tokens.push(Token::PokemonRef(found.content.to_string())),
            Kind::Location => {
                let wanted = found.content.to_lowercase();
                match locations.iter().find(|loc| loc.name.to_lowercase() == wanted) {
                    Some(location) => tokens.push(Token::LocationRef {
                        id: location.id.to_string(),
                        name: found.content.to_string(),
                    }),
                    None => push_text(&mut tokens, found.content),
                }
            }
            Kind::Bold => tokens.push(Token::Bold(found.content.to_string())),
        }

        remaining = &remaining[found.end..];
    }

    tokens
}

fn list_item(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    trimmed
        .strip_prefix("* ")
        .or_else(|| trimmed.strip_prefix("- "))
}

/// Splits guidance text into paragraphs, lists and spacers
pub fn parse_guidance(text: &str, locations: &[GameLocation]) -> Vec<Block> {
    let lines: Vec<&str> = text.split('\n').map(|l| l.trim_end_matches('\r')).collect();
    let mut blocks = Vec::new();
    let mut items: Vec<Vec<Token>> = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        if let Some(item) = list_item(line) {
            items.push(tokenize_line(item, locations));
            continue;
        }

        if !items.is_empty() {
            blocks.push(Block::List(std::mem::take(&mut items)));
        }

        if !line.trim().is_empty() {
            blocks.push(Block::Paragraph(tokenize_line(line, locations)));
        } else if index > 0
            && !lines[index - 1].trim().is_empty()
            && matches!(blocks.last(), Some(Block::Paragraph(_)))
        {
            blocks.push(Block::Spacer);
        }
    }

    if !items.is_empty() {
        blocks.push(Block::List(items));
    }

    blocks
}

/// Flattens tokens back into readable text without markers
pub fn plain_text(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|token| match token {
            Token::Text(text) | Token::PokemonRef(text) | Token::Bold(text) => text.as_str(),
            Token::LocationRef { name, .. } => name.as_str(),
        })
        .collect()
}
