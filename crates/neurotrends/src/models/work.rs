//! OpenAlex work model and the normalized paper record derived from it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Highest abstract position honored when rebuilding text.
pub const MAX_ABSTRACT_POSITION: i64 = 100_000;

/// An OpenAlex work, reduced to the fields the pipeline reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAlexWork {
    /// OpenAlex work URL, e.g. `https://openalex.org/W123`.
    ///
    /// Kept as raw JSON so exports with numeric ids still load.
    #[serde(default)]
    pub id: Option<Value>,

    /// Work title.
    #[serde(default)]
    pub title: Option<String>,

    /// Abstract as word → positions.
    #[serde(default)]
    pub abstract_inverted_index: Option<BTreeMap<String, Vec<i64>>>,

    /// Authors in byline order.
    #[serde(default)]
    pub authorships: Option<Vec<Authorship>>,

    /// Publication year.
    #[serde(default)]
    pub publication_year: Option<i32>,

    /// Fallback year field used by some exports.
    #[serde(default)]
    pub year: Option<i32>,
}

/// One entry of a work's author list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Authorship {
    /// Author reference.
    #[serde(default)]
    pub author: Option<DehydratedAuthor>,
}

/// Minimal author reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DehydratedAuthor {
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
}

impl OpenAlexWork {
    /// Id as text: strings verbatim, other values as compact JSON, empty when absent.
    #[must_use]
    pub fn id_text(&self) -> String {
        match &self.id {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Get the first author's display name if available.
    #[must_use]
    pub fn first_author(&self) -> Option<&str> {
        self.authorships.as_ref()?.first()?.author.as_ref()?.display_name.as_deref()
    }

    /// Publication year, falling back to `year`.
    #[must_use]
    pub fn year(&self) -> Year {
        self.publication_year.or(self.year).map_or(Year::Unknown, Year::Known)
    }

    /// Rebuild the abstract text.
    #[must_use]
    pub fn abstract_text(&self) -> String {
        self.abstract_inverted_index.as_ref().map(reconstruct_abstract).unwrap_or_default()
    }
}

/// Rebuild an abstract from an inverted index.
///
/// Allocates `max(position) + 1` slots, writes each word into its slots and
/// joins them with single spaces. Unfilled slots stay empty, so the result
/// always has `max(position) + 1` space-separated tokens. Negative positions
/// and positions above [`MAX_ABSTRACT_POSITION`] are ignored. When two words
/// claim a slot the one iterated last (greatest key) wins.
#[must_use]
pub fn reconstruct_abstract(index: &BTreeMap<String, Vec<i64>>) -> String {
    let valid = |pos: &i64| (0..=MAX_ABSTRACT_POSITION).contains(pos);

    let Some(max_pos) = index.values().flatten().copied().filter(valid).max() else {
        return String::new();
    };

    let mut words = vec![""; max_pos as usize + 1];
    for (word, positions) in index {
        for &pos in positions.iter().filter(|p| valid(*p)) {
            words[pos as usize] = word.as_str();
        }
    }
    words.join(" ")
}

/// Publication year, or "N/A" when the source has none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Year {
    /// A known year.
    Known(i32),
    /// No year in the source record.
    Unknown,
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(year) => write!(f, "{year}"),
            Self::Unknown => f.write_str("N/A"),
        }
    }
}

impl Serialize for Year {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(year) => serializer.serialize_i32(*year),
            Self::Unknown => serializer.serialize_str("N/A"),
        }
    }
}

/// A normalized paper ready for classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperRecord {
    /// Work id (empty when the source has none).
    pub id: String,
    /// Title (empty when missing).
    pub title: String,
    /// First author's display name (empty when missing).
    pub first_author: String,
    /// Publication year.
    pub year: Year,
    /// Reconstructed abstract.
    pub r#abstract: String,
}

impl From<&OpenAlexWork> for PaperRecord {
    fn from(work: &OpenAlexWork) -> Self {
        Self {
            id: work.id_text(),
            title: work.title.clone().unwrap_or_default(),
            first_author: work.first_author().unwrap_or_default().to_string(),
            year: work.year(),
            r#abstract: work.abstract_text(),
        }
    }
}

impl PaperRecord {
    /// Decode one JSONL input line.
    ///
    /// # Errors
    ///
    /// Returns the decoding error when the line is not a work object.
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        let work: OpenAlexWork = serde_json::from_str(line)?;
        Ok(Self::from(&work))
    }
}
