//! Markdown trend report.

use crate::trends::{TrendPayload, TrendSummary};

/// Milestones listed per method.
const MILESTONES_PER_METHOD: usize = 3;

/// Format a doubling time: one decimal from 8 years up, two below.
#[must_use]
pub fn format_doubling(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() && v >= 8.0 => format!("{v:.1} yr"),
        Some(v) if v.is_finite() => format!("{v:.2} yr"),
        _ => "n/a".to_string(),
    }
}

/// Format a projected year, rounded to a whole year.
#[must_use]
pub fn format_year(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.0}"),
        _ => "n/a".to_string(),
    }
}

/// Format an integer with thousands separators.
#[must_use]
pub fn format_count(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Label without its parenthesized suffix.
fn short_label(label: &str) -> &str {
    label.split('(').next().unwrap_or(label).trim()
}

/// Render the report written next to the chart payload.
#[must_use]
pub fn format_trend_report(payload: &TrendPayload, summary: &TrendSummary) -> String {
    let mut output = String::from("# neurotrends\n\n");

    output.push_str(&format!(
        "**Latest datapoint**: {} | {} neurons | {}\n\n",
        summary.latest_date,
        format_count(summary.latest_neurons),
        summary.latest_publication
    ));
    output.push_str(&format!(
        "**Frontier max**: {} neurons | {} ({})\n\n",
        format_count(summary.max_neurons),
        summary.max_publication,
        summary.max_year
    ));
    output.push_str(&format!("**Dataset size**: {} papers from curated sources\n\n", summary.rows));

    // Headline fits
    output.push_str("## Doubling time\n\n");
    for view in [&payload.regressions.frontier, &payload.regressions.overall] {
        output.push_str(&format!("- **{}**: {}\n", view.label, format_doubling(view.doubling_time_years)));
    }
    output.push('\n');

    // Per method
    if !payload.method_regressions.is_empty() {
        output.push_str("## Doubling by modality\n\n");
        output.push_str("| Method | Papers | Doubling | Milestones |\n");
        output.push_str("|--------|--------|----------|------------|\n");
        for stat in &payload.method_regressions {
            let milestones = stat
                .reference_hits
                .iter()
                .take(MILESTONES_PER_METHOD)
                .map(|hit| format!("{} ≈ {}", short_label(&hit.label), format_year(Some(hit.year))))
                .collect::<Vec<_>>();
            output.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                stat.method,
                stat.count,
                format_doubling(stat.doubling_time_years),
                if milestones.is_empty() { "-".to_string() } else { milestones.join("; ") }
            ));
        }
        output.push('\n');
    }

    if !summary.sources.is_empty() {
        output.push_str("## Sources\n\n");
        for source in &summary.sources {
            output.push_str(&format!("- {}: {}\n", source.source, source.count));
        }
        output.push('\n');
    }

    output.push_str(&format!(
        "Fit range: {:.1} to {:.1}.\n",
        payload.x_range.min, payload.x_range.max
    ));
    output
}
