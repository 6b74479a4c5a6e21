//! Model-specific request options.
//!
//! A table of {model pattern → extra payload fields}. The first matching row
//! wins; the result is resolved once per run.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// How a row's pattern is compared with the model slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Slug equals the pattern.
    Exact,
    /// Slug starts with the pattern.
    Prefix,
    /// Slug contains the pattern.
    Contains,
}

/// One row of the options table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOption {
    /// Comparison used for `pattern`.
    #[serde(rename = "match")]
    pub kind: MatchKind,

    /// Text compared against the model slug.
    pub pattern: String,

    /// Top-level payload fields added to the request.
    pub options: Map<String, Value>,
}

impl ModelOption {
    /// Returns true if this row applies to `model`.
    #[must_use]
    pub fn matches(&self, model: &str) -> bool {
        match self.kind {
            MatchKind::Exact => model == self.pattern,
            MatchKind::Prefix => model.starts_with(&self.pattern),
            MatchKind::Contains => model.contains(&self.pattern),
        }
    }
}

/// Ordered model options table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelOptionsTable {
    rows: Vec<ModelOption>,
}

impl ModelOptionsTable {
    /// Reasoning settings for the models the pipeline is used with.
    #[must_use]
    pub fn builtin() -> Self {
        let row = |kind, pattern: &str, options: Value| ModelOption {
            kind,
            pattern: pattern.to_string(),
            options: options.as_object().cloned().unwrap_or_default(),
        };

        Self {
            rows: vec![
                row(MatchKind::Prefix, "x-ai/grok-4.1", json!({"reasoning": {"effort": "medium"}})),
                row(MatchKind::Contains, "glm-4.5", json!({"reasoning": {"enabled": true}})),
            ],
        }
    }

    /// Parse a table from JSON (an array of rows).
    ///
    /// # Errors
    ///
    /// Returns error if the text is not a valid table.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Load a table from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&text)?)
    }

    /// Rows in match order.
    #[must_use]
    pub fn rows(&self) -> &[ModelOption] {
        &self.rows
    }

    /// Extra payload fields for `model` (empty when no row matches).
    #[must_use]
    pub fn resolve(&self, model: &str) -> Map<String, Value> {
        self.rows.iter().find(|row| row.matches(model)).map(|row| row.options.clone()).unwrap_or_default()
    }
}
