//! Log-linear growth fits.

use serde::Serialize;

/// Points in a fitted series.
pub const SERIES_POINTS: usize = 200;

/// A biological scale the fits are projected onto.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reference {
    /// Display label, e.g. "Mouse cortex (~1.4e7)".
    pub label: &'static str,
    /// Neuron count of the structure.
    pub neurons: f64,
}

/// Milestones reported for every fit.
pub const BIO_REFERENCES: [Reference; 3] = [
    Reference { label: "Fruit fly brain (~1.5e5)", neurons: 1.5e5 },
    Reference { label: "Mouse cortex (~1.4e7)", neurons: 1.4e7 },
    Reference { label: "Mouse brain (~7.1e7)", neurons: 7.1e7 },
];

/// One point of a fitted curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    /// Year as a decimal.
    pub decimal_year: f64,
    /// Fitted neuron count.
    pub neurons: f64,
}

/// Projected year a fit reaches a reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceHit {
    /// Reference label.
    pub label: String,
    /// Decimal year of the crossing.
    pub year: f64,
}

/// Least-squares fit of `ln(neurons)` against decimal year.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Regression {
    /// Display label.
    pub label: String,
    /// Growth rate in ln-units per year.
    pub slope: f64,
    /// Value of `ln(neurons)` at year zero.
    pub intercept: f64,
    /// `ln 2 / slope`; absent for flat or shrinking fits.
    pub doubling_time_years: Option<f64>,
    /// Fitted curve over the requested range.
    pub series: Vec<SeriesPoint>,
}

impl Regression {
    /// Fit `(decimal_year, neurons)` pairs over `range`.
    ///
    /// Pairs with non-positive or non-finite neurons are ignored. Returns
    /// `None` unless at least two distinct years remain.
    #[must_use]
    pub fn fit(label: impl Into<String>, points: &[(f64, f64)], range: (f64, f64)) -> Option<Self> {
        let usable: Vec<(f64, f64)> = points
            .iter()
            .filter(|(x, y)| x.is_finite() && y.is_finite() && *y > 0.0)
            .map(|&(x, y)| (x, y.ln()))
            .collect();

        let n = usable.len() as f64;
        if usable.len() < 2 {
            return None;
        }

        let mean_x = usable.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y = usable.iter().map(|(_, y)| y).sum::<f64>() / n;
        let sxx: f64 = usable.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
        let sxy: f64 = usable.iter().map(|(x, y)| (x - mean_x) * (y - mean_y)).sum();

        // All x equal: slope undefined.
        if sxx <= f64::EPSILON * n {
            return None;
        }

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;
        let doubling_time_years = (slope > 0.0).then(|| std::f64::consts::LN_2 / slope);

        let series = linspace(range.0, range.1, SERIES_POINTS)
            .map(|x| SeriesPoint { decimal_year: x, neurons: (intercept + slope * x).exp() })
            .collect();

        Some(Self { label: label.into(), slope, intercept, doubling_time_years, series })
    }

    /// Fitted neuron count at `year`.
    #[must_use]
    pub fn predict(&self, year: f64) -> f64 {
        (self.intercept + self.slope * year).exp()
    }

    /// Year the fit reaches `target`, if it is growing.
    #[must_use]
    pub fn year_for_target(&self, target: f64) -> Option<f64> {
        if self.slope <= 0.0 || target <= 0.0 {
            return None;
        }
        Some((target.ln() - self.intercept) / self.slope)
    }

    /// Crossing years for each of [`BIO_REFERENCES`].
    #[must_use]
    pub fn reference_hits(&self) -> Vec<ReferenceHit> {
        BIO_REFERENCES
            .iter()
            .filter_map(|r| {
                self.year_for_target(r.neurons).map(|year| ReferenceHit { label: r.label.to_string(), year })
            })
            .collect()
    }
}

/// `count` evenly spaced values from `start` to `end` inclusive.
fn linspace(start: f64, end: f64, count: usize) -> impl Iterator<Item = f64> {
    let step = if count > 1 { (end - start) / (count - 1) as f64 } else { 0.0 };
    (0..count).map(move |i| if i + 1 == count && count > 1 { end } else { start + step * i as f64 })
}
