//! LLM-backed structured metadata extraction.
//!
//! Asks the language model to pull dates and entities out of a chunk of
//! legal text. Extraction is strictly best-effort: any failure — no
//! model configured, network error, or a response that deviates from
//! the expected JSON shape — degrades to empty fields and never blocks
//! ingestion.

use serde::Deserialize;
use tracing::warn;

use crate::llm::LanguageModel;

/// Dates and entities extracted from a chunk. Both lists may be empty.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExtractedMetadata {
    pub dates: Vec<String>,
    pub entities: Vec<String>,
}

/// Extract metadata from `text`, analyzing at most `max_chars` of it.
///
/// Truncation is silent and lossy: only the prefix is submitted,
/// bounding latency and cost per chunk.
pub async fn extract(
    model: Option<&dyn LanguageModel>,
    text: &str,
    max_chars: usize,
) -> ExtractedMetadata {
    let Some(model) = model else {
        return ExtractedMetadata::default();
    };

    let prompt = build_prompt(truncate_chars(text, max_chars));

    match model.generate(&prompt).await {
        Ok(response) => match parse_response(&response) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(error = %e, "metadata response did not match schema, using empty fields");
                ExtractedMetadata::default()
            }
        },
        Err(e) => {
            warn!(error = %e, "metadata extraction failed, using empty fields");
            ExtractedMetadata::default()
        }
    }
}

fn build_prompt(text: &str) -> String {
    format!(
        "Extract the following metadata from the legal text below. Return ONLY a valid JSON object.\n\
         1. \"dates\": a list of all specific dates mentioned (YYYY-MM-DD format if possible, or original text).\n\
         2. \"entities\": a list of important entities (companies, people, jurisdictions) mentioned.\n\
         \n\
         Text:\n{}",
        text
    )
}

/// Parse a model response into [`ExtractedMetadata`].
///
/// Strips markdown code fences first, then applies the strict schema:
/// exactly two array-of-string fields. Anything else is an extraction
/// failure.
fn parse_response(response: &str) -> anyhow::Result<ExtractedMetadata> {
    let cleaned = strip_code_fences(response);
    Ok(serde_json::from_str(cleaned.trim())?)
}

/// Models frequently wrap JSON in ```json fences despite instructions.
fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "")
}

/// Truncate to at most `max_chars` characters without splitting a char.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
