//! Design concepts - typed decode of the generation payload
//!
//! The AI response is decoded into records with an exhaustive failure case,
//! never accessed field-by-field. A concept missing only its shirt text
//! survives decode and is skipped at render; anything else malformed aborts
//! the run before assets exist.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::error::{ForgeError, Result};

/// One generated design: the unit every downstream stage consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignConcept {
    /// Display name; sanitized copies double as file and URL keys.
    pub title: String,
    /// Marketing copy for the listing.
    pub description: String,
    /// Literal text rendered onto the garment. The model alternates between
    /// `tshirt_text` and `shirt_text`; both spellings decode here. Absent
    /// means the concept is skipped at the render stage.
    #[serde(default, alias = "tshirt_text")]
    pub shirt_text: Option<String>,
    pub marketing_tags: Vec<String>,
}

/// Ordered concepts from one generation call, with the requested count.
/// The actual count may be fewer or more than requested; both are tolerated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationBatch {
    pub requested: usize,
    pub concepts: Vec<DesignConcept>,
}

impl GenerationBatch {
    /// Decode the raw structured payload: a mapping with a `patterns` key
    /// holding the concept records.
    pub fn from_payload(requested: usize, payload: &Value) -> Result<Self> {
        let patterns = payload
            .get("patterns")
            .ok_or_else(|| ForgeError::SchemaViolation("payload has no `patterns` key".into()))?
            .as_array()
            .ok_or_else(|| ForgeError::SchemaViolation("`patterns` is not an array".into()))?;

        let mut concepts = Vec::with_capacity(patterns.len());
        for (index, record) in patterns.iter().enumerate() {
            let concept: DesignConcept = serde_json::from_value(record.clone()).map_err(|e| {
                ForgeError::SchemaViolation(format!("pattern {}: {}", index, e))
            })?;
            concepts.push(concept);
        }

        Ok(Self { requested, concepts })
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }
}

/// Make a title safe for use as a filename and a URL path segment.
///
/// Whitespace becomes `_`, anything outside `[A-Za-z0-9._-]` is dropped, and
/// leading/trailing separators are trimmed. Idempotent: sanitizing an
/// already-sanitized title returns it unchanged.
pub fn sanitize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_whitespace() {
            out.push('_');
        } else if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            out.push(c);
        }
    }
    let trimmed = out.trim_matches(|c| matches!(c, '.' | '_' | '-'));
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Derive one unique file key per concept, in input order.
///
/// Duplicate sanitized titles get `_2`, `_3`, ... suffixes so later concepts
/// never silently overwrite earlier files or URLs.
pub fn unique_file_keys(concepts: &[DesignConcept]) -> Vec<String> {
    let mut used = HashSet::new();
    let mut keys = Vec::with_capacity(concepts.len());
    for concept in concepts {
        let base = sanitize_title(&concept.title);
        let mut key = base.clone();
        let mut suffix = 2;
        while !used.insert(key.clone()) {
            key = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        keys.push(key);
    }
    keys
}
