//! Gemini generative API client
//!
//! This module asks Gemini for Nuzlocke details about a game location (a strict
//! JSON contract) and for free-form navigator guidance (plain text carrying the
//! `{{Pokemon}}` / `[[Location]]` markup parsed by [`crate::markup`]).

use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::progression::all_locations;
use super::{CatchablePokemon, Item, LocationDetail, StaticEncounter, Trainer};
use crate::cache::{CacheManager, GUIDANCE_PREFIX, LOCATION_PREFIX};

/// Base URL for the Gemini REST API
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when none is configured
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-preview-04-17";

/// Low temperature keeps location JSON close to the documented shape
const LOCATION_TEMPERATURE: f32 = 0.1;

const GUIDANCE_TEMPERATURE: f32 = 0.5;

/// Maximum length of the prompt-derived part of a guidance cache key
const GUIDANCE_KEY_MAX_CHARS: usize = 100;

/// Errors that can occur when asking Gemini for content
#[derive(Debug, Error)]
pub enum GeminiError {
    /// No API key is configured; every generative feature is unavailable
    #[error("Gemini API key not configured. Set GEMINI_API_KEY to enable AI features.")]
    MissingApiKey,

    /// The navigator was asked an empty question
    #[error("Navigator prompt is empty")]
    EmptyPrompt,

    /// Gemini refused the prompt
    #[error("AI request for \"{subject}\" was blocked. Reason: {reason}. {message}")]
    Blocked {
        subject: String,
        reason: String,
        message: String,
    },

    /// Generation ended for a reason other than a normal stop
    #[error("AI generation for \"{subject}\" stopped prematurely. Reason: {reason}.")]
    StoppedEarly { subject: String, reason: String },

    /// A safety rating marked the candidate as blocked
    #[error("AI response for \"{subject}\" might have been blocked by safety filters.")]
    SafetyFiltered { subject: String },

    /// The response carried no text and no explanation
    #[error("AI response did not contain any text output for \"{subject}\".")]
    EmptyResponse { subject: String },

    /// The text (or the response envelope) is not valid JSON
    #[error("The AI returned malformed data for \"{subject}\" that could not be parsed as JSON. (Details: {source})")]
    MalformedJson {
        subject: String,
        #[source]
        source: serde_json::Error,
    },

    /// Non-2xx response from the API
    #[error("Gemini API request failed: {status} - {message}")]
    Http { status: u16, message: String },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Request body for `models/{model}:generateContent`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
    temperature: f32,
    thinking_config: ThinkingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

/// Response body from `generateContent`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
    #[serde(default)]
    safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SafetyRating {
    #[serde(default)]
    blocked: bool,
}

/// Error envelope returned with non-2xx statuses
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Client for the Gemini generative API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    /// HTTP client for making requests
    http_client: Client,
    /// API key; `None` disables every request
    api_key: Option<String>,
    /// Model identifier, e.g. "gemini-2.5-flash-preview-04-17"
    model: String,
    /// Base URL for the API (allows override for testing)
    base_url: String,
    /// Cache manager for persisting responses
    cache: Option<CacheManager>,
}

impl GeminiClient {
    /// Creates a new GeminiClient against the public API
    pub fn new(api_key: Option<String>, cache: Option<CacheManager>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
            cache,
        }
    }

    /// Overrides the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the model identifier
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Whether generative features are available
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generates the cache key for a location name
    pub fn location_cache_key(location_name: &str) -> String {
        format!(
            "{}{}",
            LOCATION_PREFIX,
            join_whitespace(&location_name.to_lowercase(), "_")
        )
    }

    /// Generates the cache key for a navigator prompt
    pub fn guidance_cache_key(user_prompt: &str) -> String {
        let normalized = join_whitespace(&user_prompt.to_lowercase(), "_");
        let truncated: String = normalized.chars().take(GUIDANCE_KEY_MAX_CHARS).collect();
        format!("{}{}", GUIDANCE_PREFIX, truncated)
    }

    /// Fetches Nuzlocke details for a game location
    ///
    /// # Arguments
    /// * `location_name` - Display name of the location, e.g. "Route 1"
    ///
    /// # Returns
    /// * `Ok(LocationDetail)` - Normalized details; every field is populated
    /// * `Err(GeminiError)` - Missing key, blocked or truncated generation,
    ///   malformed JSON, or a transport failure
    ///
    /// # Behavior
    /// - Serves a fresh cached entry without touching the network
    /// - Strips a markdown code fence if the model added one anyway
    /// - Caches the normalized result before returning it
    pub async fn fetch_location_details(
        &self,
        location_name: &str,
    ) -> Result<LocationDetail, GeminiError> {
        let api_key = self.api_key.as_deref().ok_or(GeminiError::MissingApiKey)?;
        let cache_key = Self::location_cache_key(location_name);

        if let Some(ref cache) = self.cache {
            if let Some(cached) = cache.get::<LocationDetail>(&cache_key) {
                debug!("Cache hit: location details for {}", location_name);
                return Ok(cached);
            }
        }

        let prompt = location_prompt(location_name);
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: &prompt }],
            }],
            system_instruction: None,
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: LOCATION_TEMPERATURE,
                thinking_config: ThinkingConfig { thinking_budget: 0 },
            },
        };

        let response = self.generate(api_key, &request, location_name).await?;
        let text = extract_text(&response, location_name)?;

        let json = strip_code_fence(&text);
        let parsed: Value =
            serde_json::from_str(json).map_err(|source| GeminiError::MalformedJson {
                subject: location_name.to_string(),
                source,
            })?;

        let details = normalize_location(&parsed, location_name);

        if let Some(ref cache) = self.cache {
            cache.set(&cache_key, &details);
            info!("Location details for \"{}\" cached", location_name);
        }

        Ok(details)
    }

    /// Asks the navigator a free-form question about the run
    ///
    /// The returned text may contain `{{Pokemon}}`, `[[Location]]` and
    /// `**bold**` markup and `*`/`-` list lines.
    pub async fn fetch_navigator_guidance(&self, user_prompt: &str) -> Result<String, GeminiError> {
        let api_key = self.api_key.as_deref().ok_or(GeminiError::MissingApiKey)?;
        let user_prompt = user_prompt.trim();
        if user_prompt.is_empty() {
            return Err(GeminiError::EmptyPrompt);
        }

        let cache_key = Self::guidance_cache_key(user_prompt);
        if let Some(ref cache) = self.cache {
            if let Some(cached) = cache.get::<String>(&cache_key) {
                debug!("Cache hit: navigator guidance");
                return Ok(cached);
            }
        }

        let instruction = navigator_instruction();
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: user_prompt }],
            }],
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part { text: &instruction }],
            }),
            generation_config: GenerationConfig {
                response_mime_type: "text/plain",
                temperature: GUIDANCE_TEMPERATURE,
                thinking_config: ThinkingConfig { thinking_budget: 0 },
            },
        };

        let response = self.generate(api_key, &request, user_prompt).await?;
        let text = extract_text(&response, user_prompt)?.trim().to_string();

        if let Some(ref cache) = self.cache {
            cache.set(&cache_key, &text);
        }

        Ok(text)
    }

    /// Sends a `generateContent` request and decodes the envelope
    async fn generate(
        &self,
        api_key: &str,
        request: &GenerateContentRequest<'_>,
        subject: &str,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("Unknown error").to_string());
            return Err(GeminiError::Http {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|source| {
            debug!("Undecodable Gemini response: {}", body);
            GeminiError::MalformedJson {
                subject: subject.to_string(),
                source,
            }
        })
    }
}

/// Pulls the text payload out of a response, or explains why there is none
fn extract_text(response: &GenerateContentResponse, subject: &str) -> Result<String, GeminiError> {
    let texts: Vec<&str> = response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect()
        })
        .unwrap_or_default();

    if !texts.is_empty() {
        return Ok(texts.concat());
    }

    warn!("Gemini response for \"{}\" carried no text: {:?}", subject, response);

    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.clone())
    {
        let message = response
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason_message.clone())
            .unwrap_or_else(|| "No additional message provided.".to_string());
        return Err(GeminiError::Blocked {
            subject: subject.to_string(),
            reason,
            message,
        });
    }

    if let Some(candidate) = response.candidates.first() {
        match candidate.finish_reason.as_deref() {
            Some(reason) if reason != "STOP" => {
                return Err(GeminiError::StoppedEarly {
                    subject: subject.to_string(),
                    reason: reason.to_string(),
                });
            }
            _ => {}
        }
        if candidate.safety_ratings.iter().any(|rating| rating.blocked) {
            return Err(GeminiError::SafetyFiltered {
                subject: subject.to_string(),
            });
        }
    }

    Err(GeminiError::EmptyResponse {
        subject: subject.to_string(),
    })
}

/// Removes a surrounding ```` ``` ```` or ```` ```json ```` fence, if present
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };

    let inner = inner
        .strip_prefix("json")
        .or_else(|| inner.strip_prefix("JSON"))
        .unwrap_or(inner);
    inner.trim()
}

/// Builds a `LocationDetail` from loosely-typed model output
///
/// Missing or mistyped strings become `""`, missing arrays become `[]`, and
/// levels accept either numbers or numeric strings.
pub fn normalize_location(parsed: &Value, requested_name: &str) -> LocationDetail {
    let well_formed = parsed.get("locationName").is_some_and(Value::is_string)
        && ["catchablePokemon", "trainers", "items", "staticEncounters"]
            .iter()
            .all(|key| parsed.get(*key).is_some_and(Value::is_array));
    if !well_formed {
        warn!(
            "Gemini response for location {} is missing some expected top-level fields",
            requested_name
        );
    }

    let catchable_pokemon = array_field(parsed, "catchablePokemon")
        .iter()
        .map(|p| CatchablePokemon {
            name: non_empty_or(string_field(p, "name"), "Unknown Pokemon"),
            conditions: string_field(p, "conditions"),
        })
        .collect();

    let trainers = array_field(parsed, "trainers")
        .iter()
        .map(|t| Trainer {
            name: string_field(t, "name"),
            strongest_pokemon_name: string_field(t, "strongestPokemonName"),
            strongest_pokemon_level: level_field(t, "strongestPokemonLevel"),
            notes: string_field(t, "notes"),
        })
        .collect();

    let items = array_field(parsed, "items")
        .iter()
        .map(|i| Item {
            name: string_field(i, "name"),
            location_description: string_field(i, "locationDescription"),
        })
        .collect();

    let static_encounters = array_field(parsed, "staticEncounters")
        .iter()
        .map(|s| StaticEncounter {
            pokemon_name: string_field(s, "pokemonName"),
            level: level_field(s, "level"),
            notes: string_field(s, "notes"),
        })
        .collect();

    LocationDetail {
        location_id: location_id(requested_name),
        location_name: non_empty_or(string_field(parsed, "locationName"), requested_name),
        summary: string_field(parsed, "summary"),
        catchable_pokemon,
        trainers,
        items,
        static_encounters,
    }
}

/// Derives a stable id from a location name, e.g. "route-1-hauoli-outskirts"
pub fn location_id(location_name: &str) -> String {
    join_whitespace(&location_name.to_lowercase(), "-")
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '\'' | ',' | '.'))
        .collect()
}

fn array_field<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn level_field(value: &Value, key: &str) -> u32 {
    match value.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .map(|level| u32::try_from(level).unwrap_or(u32::MAX))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

fn join_whitespace(text: &str, separator: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(separator)
}

fn location_prompt(location_name: &str) -> String {
    format!(
        r#"You are an assistant for a Pokemon Nuzlocke challenge tool.
Describe the game location "{name}" from Pokemon Ultra Moon.

Respond ONLY with a single valid JSON object:
- No introduction, explanation or apology, and no markdown code fences around the object.
- The whole response must parse as JSON. Escape quotes and newlines inside strings.
- No trailing commas.

The object must have exactly this structure:
{{
  "locationName": "string",
  "summary": "string",
  "catchablePokemon": [{{ "name": "string", "conditions": "string" }}],
  "trainers": [{{ "name": "string", "strongestPokemonName": "string", "strongestPokemonLevel": number, "notes": "string" }}],
  "items": [{{ "name": "string", "locationDescription": "string" }}],
  "staticEncounters": [{{ "pokemonName": "string", "level": number, "notes": "string" }}]
}}

Field guidance:
- "locationName": the confirmed name of the location, e.g. "Route 1 (Hau'oli Outskirts)".
- "summary": one or two Nuzlocke-relevant sentences about the location.
- "catchablePokemon[].conditions": encounter conditions such as "Day only", "SOS Battle (Pikipek)", "Surfing", "Fishing - Old Rod" or "Tall grass"; use "" for a standard encounter.
- "trainers[].name": trainer class and name, e.g. "Youngster Joey"; "strongestPokemonName"/"strongestPokemonLevel" describe their highest-level Pokemon; "notes" are optional remarks.
- "items[].locationDescription": how or where the item is obtained.
- "staticEncounters": fixed or gift encounters with their level and notes.

When information is unknown or not applicable use "" for strings and [] for arrays.
Never omit a key, at the top level or inside array objects.

Now provide the JSON for "{name}"."#,
        name = location_name
    )
}

fn navigator_instruction() -> String {
    let location_names = all_locations()
        .iter()
        .map(|loc| loc.name)
        .collect::<Vec<_>>()
        .join("; ");

    format!(
        r#"You are the Nuzlocke Navigator, an expert guide for a Pokemon Ultra Moon Nuzlocke run.
Answer the player's question concisely and accurately for Ultra Moon.

Formatting rules:
- Wrap every Pokemon species name in double curly braces, e.g. {{{{Rowlet}}}}.
- Wrap every game location in double square brackets, e.g. [[Mahalo Trail]], using one of the known location names exactly when it applies.
- Use **double asterisks** for emphasis.
- Start list items with "* " or "- " on their own line.
- Separate paragraphs with a blank line.
- Do not use any other markdown.

Known location names: {locations}"#,
        locations = location_names
    )
}
