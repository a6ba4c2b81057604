//! Pulls the suggestion payload out of free-form model output.
//!
//! Models wrap the object in prose or code fences often enough that the
//! content is never decoded directly. The policy is greedy: everything from the
//! first `{` to the last `}` is taken as the candidate object. Failure modes,
//! all reported as [`GenerationError::Format`]:
//!
//! - no brace-delimited span in the text;
//! - the span is not valid JSON, or not an object with an `outfits` array of
//!   `{id, title, description, searchQuery}` records;
//! - the array does not hold exactly [`SUGGESTION_COUNT`] records with ids
//!   `1..=SUGGESTION_COUNT`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::{
    models::{Suggestion, SUGGESTION_COUNT},
    openrouter::GenerationError,
};

static JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("static regex"));

#[derive(Debug, Deserialize)]
struct SuggestionEnvelope {
    outfits: Vec<Suggestion>,
}

/// Greedy first-`{`-to-last-`}` span, if any.
pub fn extract_json_object(text: &str) -> Option<&str> {
    JSON_OBJECT.find(text).map(|m| m.as_str())
}

/// Decodes model output into exactly three suggestions ordered by id.
pub fn parse_suggestions(text: &str) -> Result<Vec<Suggestion>, GenerationError> {
    let candidate = extract_json_object(text)
        .ok_or_else(|| GenerationError::Format("no JSON object in model output".to_string()))?;

    let envelope: SuggestionEnvelope = serde_json::from_str(candidate)
        .map_err(|e| GenerationError::Format(format!("undecodable suggestions: {e}")))?;

    let mut outfits = envelope.outfits;
    if outfits.len() != SUGGESTION_COUNT {
        return Err(GenerationError::Format(format!(
            "expected {SUGGESTION_COUNT} outfits, got {}",
            outfits.len()
        )));
    }

    outfits.sort_by_key(|s| s.id);
    let ids_ok = outfits.iter().zip(1u32..).all(|(s, expected)| s.id == expected);
    if !ids_ok {
        let ids: Vec<u32> = outfits.iter().map(|s| s.id).collect();
        return Err(GenerationError::Format(format!("unexpected outfit ids {ids:?}")));
    }

    Ok(outfits)
}
