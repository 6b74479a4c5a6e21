//! Curated dataset of recording-scale papers.

use serde::{Deserialize, Serialize};

/// Month assumed when a row has none (mid-year).
pub const DEFAULT_MONTH: u32 = 7;

const MONTH_NAMES: [&str; 12] =
    ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];

/// One row of `neural_recording_papers.csv`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordingPaper {
    /// Publication year.
    #[serde(rename = "Year")]
    pub year: i32,

    /// Publication month (1-12).
    #[serde(rename = "Month", default)]
    pub month: Option<f64>,

    /// Neurons recorded simultaneously.
    #[serde(rename = "Neurons", default)]
    pub neurons: Option<f64>,

    /// Author list as written in the source.
    #[serde(rename = "Authors", default)]
    pub authors: String,

    /// Recording method (e.g. "Ephys", "Imaging").
    #[serde(rename = "Method", default)]
    pub method: Option<String>,

    /// Where the datapoint was curated from.
    #[serde(rename = "Source", default)]
    pub source: String,

    /// Journal or preprint server.
    #[serde(rename = "Publication", default)]
    pub publication: String,

    /// Free-text note on the method.
    #[serde(rename = "Method Note", default)]
    pub method_note: Option<String>,

    /// Digital Object Identifier.
    #[serde(rename = "DOI", default)]
    pub doi: String,
}

impl RecordingPaper {
    /// Month clamped to 1..=12, defaulting to [`DEFAULT_MONTH`].
    #[must_use]
    pub fn month_or_default(&self) -> u32 {
        self.month
            .filter(|m| m.is_finite())
            .map_or(DEFAULT_MONTH, |m| (m as i64).clamp(1, 12) as u32)
    }

    /// Year as a decimal placed mid-month.
    #[must_use]
    pub fn decimal_year(&self) -> f64 {
        decimal_year(self.year, self.month_or_default())
    }

    /// Recording method, or "Unknown" when blank.
    #[must_use]
    pub fn method_or_unknown(&self) -> &str {
        self.method.as_deref().map(str::trim).filter(|m| !m.is_empty()).unwrap_or("Unknown")
    }

    /// Label like "Jul 2024".
    #[must_use]
    pub fn date_label(&self) -> String {
        format_date(self.year, self.month_or_default())
    }
}

/// `year + (month - 0.5) / 12`.
#[must_use]
pub fn decimal_year(year: i32, month: u32) -> f64 {
    f64::from(year) + (f64::from(month) - 0.5) / 12.0
}

/// Format a year and month as "Mon YYYY".
#[must_use]
pub fn format_date(year: i32, month: u32) -> String {
    let idx = month.clamp(1, 12) as usize - 1;
    format!("{} {}", MONTH_NAMES[idx], year)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_year_mid_month() {
        assert!((decimal_year(2020, 1) - (2020.0 + 0.5 / 12.0)).abs() < 1e-12);
        assert!((decimal_year(2020, 12) - (2020.0 + 11.5 / 12.0)).abs() < 1e-12);
    }

    #[test]
    fn test_month_default_and_clamp() {
        let mut row = RecordingPaper { year: 2010, ..Default::default() };
        assert_eq!(row.month_or_default(), 7);
        row.month = Some(f64::NAN);
        assert_eq!(row.month_or_default(), 7);
        row.month = Some(14.0);
        assert_eq!(row.month_or_default(), 12);
        assert_eq!(row.date_label(), "Dec 2010");
    }

    #[test]
    fn test_method_unknown_when_blank() {
        let mut row = RecordingPaper::default();
        assert_eq!(row.method_or_unknown(), "Unknown");
        row.method = Some("  ".into());
        assert_eq!(row.method_or_unknown(), "Unknown");
        row.method = Some("Imaging".into());
        assert_eq!(row.method_or_unknown(), "Imaging");
    }
}
