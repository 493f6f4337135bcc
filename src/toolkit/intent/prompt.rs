

use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::core::error::{QueryMindError, Result};
use crate::core::intent::{IntentLabel, IntentScores};
use crate::core::models::ConceptMatch;


lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$").expect("static regex");
    static ref JSON_OBJECT: Regex = Regex::new(r"(?s)\{.*\}").expect("static regex");
}


pub const SYSTEM_PROMPT: &str = "You are an expert in intent-classification. Always respond with valid JSON.";


/// Numbered evidence list, one line per related concept.
pub fn format_related_concepts(related: &[ConceptMatch]) -> String {
    related
        .iter()
        .enumerate()
        .map(|(i, m)| {
            format!(
                "{}. Concept: {}, Intent: {}, Similarity Score: {}",
                i + 1,
                m.name,
                m.intent.map(|l| l.to_string()).unwrap_or_default(),
                crate::round_to(m.similarity, 3)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}


pub fn build_intent_prompt(query: &str, related: &[ConceptMatch]) -> String {
    let labels = IntentLabel::all()
        .iter()
        .enumerate()
        .map(|(i, label)| format!("{}. {}: {}", i + 1, label, label.description()))
        .collect::<Vec<_>>()
        .join("\n");

    let concepts = if related.is_empty() {
        "(none)".to_string()
    } else {
        format_related_concepts(related)
    };

    format!(
        r#"You have the following intents to classify between:
{labels}

Given the following query, and the closest related concepts in the database based on that query,
score how well each intent matches what the query is suggesting.

The data given from the database includes closest related concepts previously searched,
the intent behind those searches and how similar they are to the current query.

Sentence: "{query}"
Related Concepts in Database:
{concepts}

**Response Format (JSON):**
{{"Research": 0.0-1.0, "Answer": 0.0-1.0, "Transactional": 0.0-1.0, "News": 0.0-1.0, "Navigational": 0.0-1.0}}"#
    )
}


/// Reads a per-label score object from the reply. A bare label name, or an
/// object carrying only `"intent"`, becomes a one-hot vector.
pub fn parse_label_scores(reply: &str) -> Result<IntentScores> {
    let trimmed = reply.trim();
    let body = CODE_FENCE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map_or(trimmed, |m| m.as_str());

    if let Some(label) = bare_label(body) {
        return Ok(IntentScores::one_hot(label));
    }

    let json = JSON_OBJECT
        .find(body)
        .map(|m| m.as_str())
        .ok_or_else(|| malformed(reply, "no JSON object"))?;
    let value: Value =
        serde_json::from_str(json).map_err(|e| malformed(reply, &e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| malformed(reply, "not an object"))?;

    if object.len() == 1 {
        if let Some(label) = object.get("intent").and_then(Value::as_str).and_then(bare_label) {
            return Ok(IntentScores::one_hot(label));
        }
    }

    let mut scores = IntentScores::zeros();
    let mut seen = 0;
    for (key, raw) in object {
        let label = IntentLabel::from_str(key.trim())
            .map_err(|_| malformed(reply, &format!("unknown label '{}'", key)))?;
        let score = raw
            .as_f64()
            .filter(|s| (0.0..=1.0).contains(s))
            .ok_or_else(|| malformed(reply, &format!("score for {} is not in [0, 1]", label)))?;
        scores.set(label, score);
        seen += 1;
    }

    if seen == 0 {
        return Err(malformed(reply, "no label scores"));
    }
    Ok(scores)
}

fn bare_label(text: &str) -> Option<IntentLabel> {
    let cleaned = text
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '.' || c.is_whitespace());
    let cleaned = cleaned.strip_prefix("Intent:").map_or(cleaned, str::trim);
    IntentLabel::from_str(cleaned).ok()
}

fn malformed(reply: &str, reason: &str) -> QueryMindError {
    QueryMindError::MalformedEvidence(format!(
        "intent scores unreadable ({}): {}",
        reason,
        crate::safe_truncate(reply, 120)
    ))
}
