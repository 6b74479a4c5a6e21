//! Growth trends of recording scale.
//!
//! Loads the curated dataset, fits exponential growth (all datapoints, the
//! best-in-year frontier and each recording method), projects when the fits
//! reach biological milestones, and writes the chart payload, a summary and
//! a Markdown report.

mod regression;

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;

pub use regression::{
    BIO_REFERENCES, Reference, ReferenceHit, Regression, SERIES_POINTS, SeriesPoint,
};

use crate::error::{TrendError, TrendResult};
use crate::formatters::format_trend_report;
use crate::models::RecordingPaper;

/// Years added past the latest datapoint before milestones are considered.
pub const FIT_RANGE_PADDING_YEARS: f64 = 5.0;

/// Furthest the fit range may reach past the latest datapoint.
pub const MAX_FUTURE_YEARS: f64 = 20.0;

/// Absolute end of the fit range.
pub const X_RANGE_MAX: f64 = 2040.0;

/// Label of the fit over every datapoint.
pub const OVERALL_LABEL: &str = "All datapoints";

/// Label of the fit over the best-in-year datapoints.
pub const FRONTIER_LABEL: &str = "Best in year";

/// Rows of the curated dataset that carry a neuron count.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<RecordingPaper>,
}

impl Dataset {
    /// Read the dataset from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened or a row does not decode.
    pub fn load(path: &Path) -> TrendResult<Self> {
        let file = std::fs::File::open(path).map_err(|e| TrendError::io(path, e))?;
        Self::from_reader(file)
    }

    /// Read the dataset from CSV text.
    ///
    /// # Errors
    ///
    /// Returns error if a row does not decode.
    pub fn from_reader<R: Read>(reader: R) -> TrendResult<Self> {
        let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut rows = Vec::new();
        let mut dropped = 0usize;

        for row in csv.deserialize::<RecordingPaper>() {
            let row = row?;
            if row.neurons.is_some_and(f64::is_finite) {
                rows.push(row);
            } else {
                dropped += 1;
            }
        }

        tracing::debug!(rows = rows.len(), dropped, "Loaded recording dataset");
        Ok(Self { rows })
    }

    /// Build a dataset from rows already in memory.
    #[must_use]
    pub fn from_rows(rows: Vec<RecordingPaper>) -> Self {
        Self { rows: rows.into_iter().filter(|r| r.neurons.is_some_and(f64::is_finite)).collect() }
    }

    /// Rows in file order.
    #[must_use]
    pub fn rows(&self) -> &[RecordingPaper] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no row has a neuron count.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Best row of each year; later rows win ties.
    #[must_use]
    pub fn frontier(&self) -> Vec<&RecordingPaper> {
        let mut best: BTreeMap<i32, &RecordingPaper> = BTreeMap::new();
        for row in &self.rows {
            let neurons = row.neurons.unwrap_or(0.0);
            match best.get(&row.year) {
                Some(current) if current.neurons.unwrap_or(0.0) > neurons => {}
                _ => {
                    best.insert(row.year, row);
                }
            }
        }
        best.into_values().collect()
    }

    /// Sorted distinct recording methods.
    #[must_use]
    pub fn methods(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|r| r.method_or_unknown().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Earliest and latest decimal years.
    #[must_use]
    pub fn year_span(&self) -> Option<(f64, f64)> {
        let mut years = self.rows.iter().map(RecordingPaper::decimal_year);
        let first = years.next()?;
        Some(years.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y))))
    }
}

fn points_of<'a>(rows: impl IntoIterator<Item = &'a RecordingPaper>) -> Vec<(f64, f64)> {
    rows.into_iter().map(|r| (r.decimal_year(), r.neurons.unwrap_or(0.0))).collect()
}

/// Fit of one recording method.
#[derive(Debug, Clone)]
pub struct MethodFit {
    /// Method name.
    pub method: String,
    /// Rows using the method.
    pub count: usize,
    /// Fit, when the method spans at least two years.
    pub regression: Option<Regression>,
}

impl MethodFit {
    /// Milestone crossings of this method's fit.
    #[must_use]
    pub fn reference_hits(&self) -> Vec<ReferenceHit> {
        self.regression.as_ref().map(Regression::reference_hits).unwrap_or_default()
    }
}

/// Every fit over one shared range.
#[derive(Debug, Clone)]
pub struct TrendFits {
    /// `(start, end)` decimal years of the fitted series.
    pub range: (f64, f64),
    /// Fit over every row.
    pub overall: Regression,
    /// Fit over the best row of each year.
    pub frontier: Option<Regression>,
    /// One entry per method, in method order.
    pub methods: Vec<MethodFit>,
}

impl TrendFits {
    /// Fit everything over `(start, end)`.
    ///
    /// # Errors
    ///
    /// Returns error if the whole dataset spans fewer than two years.
    pub fn compute(dataset: &Dataset, range: (f64, f64)) -> TrendResult<Self> {
        let overall = Regression::fit(OVERALL_LABEL, &points_of(dataset.rows()), range).ok_or_else(
            || TrendError::InsufficientData("need datapoints from at least two distinct dates".into()),
        )?;
        let frontier = Regression::fit(FRONTIER_LABEL, &points_of(dataset.frontier()), range);

        let methods = dataset
            .methods()
            .into_iter()
            .map(|method| {
                let rows: Vec<&RecordingPaper> =
                    dataset.rows().iter().filter(|r| r.method_or_unknown() == method).collect();
                let regression = Regression::fit(method.clone(), &points_of(rows.iter().copied()), range);
                MethodFit { method, count: rows.len(), regression }
            })
            .collect();

        Ok(Self { range, overall, frontier, methods })
    }

    /// Fit with the range stretched to show milestone crossings.
    ///
    /// The range starts at the earliest datapoint and initially ends
    /// [`FIT_RANGE_PADDING_YEARS`] past the latest. It is then extended to the
    /// latest milestone crossing of the frontier or any method, but never past
    /// `min(latest + MAX_FUTURE_YEARS, X_RANGE_MAX)`.
    ///
    /// # Errors
    ///
    /// Returns error if the dataset is empty or spans fewer than two years.
    pub fn with_milestone_range(dataset: &Dataset) -> TrendResult<Self> {
        let (min_year, max_year) = dataset
            .year_span()
            .ok_or_else(|| TrendError::InsufficientData("no rows with a neuron count".into()))?;

        let initial_end = max_year + FIT_RANGE_PADDING_YEARS;
        let fits = Self::compute(dataset, (min_year, initial_end))?;

        let cap = (max_year + MAX_FUTURE_YEARS).min(X_RANGE_MAX);
        let latest_within = |hits: Vec<ReferenceHit>| {
            hits.into_iter().map(|h| h.year).filter(|y| *y <= cap).fold(0.0, f64::max)
        };

        let mut wanted = initial_end;
        if let Some(frontier) = &fits.frontier {
            wanted = wanted.max(latest_within(frontier.reference_hits()));
        }
        for method in &fits.methods {
            wanted = wanted.max(latest_within(method.reference_hits()));
        }
        let desired_end = cap.min(wanted);

        if (desired_end - initial_end).abs() > 1e-6 {
            tracing::debug!(initial_end, desired_end, "Refitting over extended range");
            return Self::compute(dataset, (min_year, desired_end));
        }
        Ok(fits)
    }
}

/// A dataset row as plotted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    /// Position in the dataset.
    pub id: usize,
    /// Publication year.
    pub year: i32,
    /// Publication month.
    pub month: u32,
    /// "Mon YYYY".
    pub date_label: String,
    /// Year as a decimal.
    pub decimal_year: f64,
    /// Neurons recorded.
    pub neurons: f64,
    /// Authors.
    pub authors: String,
    /// Recording method.
    pub method: String,
    /// Curation source.
    pub source: String,
    /// Journal or preprint server.
    pub publication: String,
    /// Method note, empty when absent.
    pub method_note: String,
    /// DOI.
    pub doi: String,
}

impl DataPoint {
    fn from_row(id: usize, row: &RecordingPaper) -> Self {
        Self {
            id,
            year: row.year,
            month: row.month_or_default(),
            date_label: row.date_label(),
            decimal_year: row.decimal_year(),
            neurons: row.neurons.unwrap_or(0.0),
            authors: row.authors.clone(),
            method: row.method_or_unknown().to_string(),
            source: row.source.clone(),
            publication: row.publication.clone(),
            method_note: row.method_note.clone().unwrap_or_default(),
            doi: row.doi.clone(),
        }
    }
}

/// A fit as drawn on the chart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionView {
    /// Display label.
    pub label: String,
    /// Doubling time, when growing.
    pub doubling_time_years: Option<f64>,
    /// Fitted curve; empty when there was nothing to fit.
    pub series: Vec<SeriesPoint>,
}

impl RegressionView {
    fn new(label: &str, regression: Option<&Regression>) -> Self {
        Self {
            label: label.to_string(),
            doubling_time_years: regression.and_then(|r| r.doubling_time_years),
            series: regression.map(|r| r.series.clone()).unwrap_or_default(),
        }
    }
}

/// The overall and frontier fits.
#[derive(Debug, Clone, Serialize)]
pub struct Regressions {
    /// Fit over every row.
    pub overall: RegressionView,
    /// Fit over the best row of each year.
    pub frontier: RegressionView,
}

/// Per-method statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodStat {
    /// Method name.
    pub method: String,
    /// Rows using it.
    pub count: usize,
    /// Doubling time, when growing.
    pub doubling_time_years: Option<f64>,
    /// Fitted curve.
    pub series: Vec<SeriesPoint>,
    /// Milestone crossings.
    pub reference_hits: Vec<ReferenceHit>,
}

/// Range of the x axis.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct XRange {
    /// Start.
    pub min: f64,
    /// End.
    pub max: f64,
}

/// Everything the chart needs (`data.json`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPayload {
    pub points: Vec<DataPoint>,
    pub regressions: Regressions,
    pub methods: Vec<String>,
    pub method_regressions: Vec<MethodStat>,
    pub max_neurons: f64,
    pub x_range: XRange,
    pub references: Vec<Reference>,
}

impl TrendPayload {
    /// Assemble the payload from a dataset and its fits.
    #[must_use]
    pub fn new(dataset: &Dataset, fits: &TrendFits) -> Self {
        let method_regressions = fits
            .methods
            .iter()
            .map(|m| MethodStat {
                method: m.method.clone(),
                count: m.count,
                doubling_time_years: m.regression.as_ref().and_then(|r| r.doubling_time_years),
                series: m.regression.as_ref().map(|r| r.series.clone()).unwrap_or_default(),
                reference_hits: m.reference_hits(),
            })
            .collect();

        Self {
            points: dataset.rows().iter().enumerate().map(|(i, r)| DataPoint::from_row(i, r)).collect(),
            regressions: Regressions {
                overall: RegressionView::new(OVERALL_LABEL, Some(&fits.overall)),
                frontier: RegressionView::new(FRONTIER_LABEL, fits.frontier.as_ref()),
            },
            methods: dataset.methods(),
            method_regressions,
            max_neurons: dataset.rows().iter().filter_map(|r| r.neurons).fold(0.0, f64::max),
            x_range: XRange { min: fits.range.0, max: fits.range.1 },
            references: BIO_REFERENCES.to_vec(),
        }
    }
}

/// Rows contributed by one curation source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceCount {
    /// Source name.
    pub source: String,
    /// Rows from it.
    pub count: usize,
}

/// Headline numbers (`summary.json`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSummary {
    pub rows: usize,
    pub latest_date: String,
    pub latest_authors: String,
    pub latest_publication: String,
    pub latest_method: String,
    pub latest_neurons: i64,
    pub max_neurons: i64,
    pub max_publication: String,
    pub max_authors: String,
    pub max_year: i32,
    pub max_method: String,
    /// Most rows first.
    pub sources: Vec<SourceCount>,
}

impl TrendSummary {
    /// Summarize a non-empty dataset.
    ///
    /// # Errors
    ///
    /// Returns error if the dataset is empty.
    pub fn new(dataset: &Dataset) -> TrendResult<Self> {
        let empty = || TrendError::InsufficientData("no rows with a neuron count".into());
        let rows = dataset.rows();

        // First row wins ties for both picks.
        let latest = rows
            .iter()
            .reduce(|a, b| if b.decimal_year() > a.decimal_year() { b } else { a })
            .ok_or_else(empty)?;
        let top = rows
            .iter()
            .reduce(|a, b| if b.neurons > a.neurons { b } else { a })
            .ok_or_else(empty)?;

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for row in rows {
            *counts.entry(row.source.as_str()).or_default() += 1;
        }
        let mut sources: Vec<SourceCount> = counts
            .into_iter()
            .map(|(source, count)| SourceCount { source: source.to_string(), count })
            .collect();
        sources.sort_by(|a, b| b.count.cmp(&a.count));

        Ok(Self {
            rows: rows.len(),
            latest_date: latest.date_label(),
            latest_authors: latest.authors.clone(),
            latest_publication: latest.publication.clone(),
            latest_method: latest.method_or_unknown().to_string(),
            latest_neurons: latest.neurons.unwrap_or(0.0) as i64,
            max_neurons: top.neurons.unwrap_or(0.0) as i64,
            max_publication: top.publication.clone(),
            max_authors: top.authors.clone(),
            max_year: top.year,
            max_method: top.method_or_unknown().to_string(),
            sources,
        })
    }
}

/// Files written by [`build_site`].
#[derive(Debug, Clone)]
pub struct SiteFiles {
    /// Chart payload.
    pub data: PathBuf,
    /// Headline numbers.
    pub summary: PathBuf,
    /// Markdown report.
    pub report: PathBuf,
    /// Copy of the dataset.
    pub csv: PathBuf,
}

fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> TrendResult<()> {
    std::fs::write(path, contents).map_err(|e| TrendError::io(path, e))
}

/// Returns true if both paths resolve to the same existing file.
fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Fit the dataset at `data_path` and write the outputs into `out_dir`.
///
/// # Errors
///
/// Returns error if the dataset cannot be read, has too little data, or an
/// output cannot be written.
pub fn build_site(data_path: &Path, out_dir: &Path) -> TrendResult<SiteFiles> {
    let dataset = Dataset::load(data_path)?;
    let fits = TrendFits::with_milestone_range(&dataset)?;
    let payload = TrendPayload::new(&dataset, &fits);
    let summary = TrendSummary::new(&dataset)?;

    std::fs::create_dir_all(out_dir).map_err(|e| TrendError::io(out_dir, e))?;

    let files = SiteFiles {
        data: out_dir.join("data.json"),
        summary: out_dir.join("summary.json"),
        report: out_dir.join("report.md"),
        csv: out_dir.join(data_path.file_name().unwrap_or_else(|| "neural_recording_papers.csv".as_ref())),
    };

    write_file(&files.data, serde_json::to_vec(&payload)?)?;
    write_file(&files.summary, serde_json::to_vec_pretty(&summary)?)?;
    write_file(&files.report, format_trend_report(&payload, &summary))?;
    // Copying a file onto itself truncates it.
    if !same_file(data_path, &files.csv) {
        std::fs::copy(data_path, &files.csv).map_err(|e| TrendError::io(&files.csv, e))?;
    }

    tracing::info!(
        rows = dataset.len(),
        range_end = fits.range.1,
        out_dir = %out_dir.display(),
        "Wrote trend outputs"
    );
    Ok(files)
}
