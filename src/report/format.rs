//! Formatted terminal output.
//!
//! Formatting lives here so the fitting code stays free of presentation and
//! output changes are localized.

use crate::domain::{FitMode, FitResult, TitrationSeries};
use crate::fit::JobOutcome;
use crate::report::StepResidual;

/// Format the run summary: dataset shape, fit diagnostics, fitted parameters.
pub fn format_fit_summary(source: &str, series: &TitrationSeries, result: &FitResult) -> String {
    let mut out = String::new();

    out.push_str("=== titr - 1:1 NMR titration fit ===\n");
    out.push_str(&format!("Input: {source}\n"));
    out.push_str(&format!(
        "Data: steps={} | peaks={} | H0={:.4e} M | G0=[0, {:.4e}] M\n",
        series.steps(),
        series.peaks.len(),
        series.host,
        series.max_guest(),
    ));
    let mode = match result.mode {
        FitMode::Single => "single-peak",
        FitMode::Global => "global (shared Ka)",
    };
    out.push_str(&format!("Mode: {mode}\n"));

    out.push_str("\nOptimizer:\n");
    out.push_str(&format!(
        "- status: {} ({})\n",
        if result.converged() { "converged" } else { "NOT converged" },
        result.status.reason
    ));
    out.push_str(&format!(
        "- iterations={} cost_evals={}\n",
        result.status.iterations, result.status.cost_evals
    ));
    out.push_str(&format!(
        "- SSE={:.6e} RMSE={:.6e} ppm n={}\n",
        result.objective, result.rmse, result.n_obs
    ));

    out.push_str("\nFitted parameters:\n");
    out.push_str(&format!("- Ka = {:.6e} M^-1\n", result.ka));
    out.push_str(&format!("{:<12} {:>12} {:>12} {:>12}\n", "peak", "dH", "dHG", "dHG-dH"));
    out.push_str(&format!("{:-<12} {:-<12} {:-<12} {:-<12}\n", "", "", "", ""));
    for peak in &result.peaks {
        out.push_str(&format!(
            "{:<12} {:>12.5} {:>12.5} {:>12.5}\n",
            truncate(&peak.label, 12),
            peak.d_h,
            peak.d_hg,
            peak.d_hg - peak.d_h
        ));
    }

    out
}

/// Format the per-step residual table.
pub fn format_residual_table(rows: &[StepResidual]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<12} {:>12} {:>12} {:>12} {:>12}\n",
            "peak", "G0", "Dd_obs", "Dd_fit", "residual"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<12} {:-<12} {:-<12} {:-<12} {:-<12}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    for r in rows {
        out.push_str(
            format!(
                "{:<12} {:>12.4e} {:>12} {:>12.5} {:>12}\n",
                truncate(&r.label, 12),
                r.guest,
                fmt_opt(r.observed),
                r.fitted,
                fmt_opt(r.residual),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// Format a list of independent fits, one line each.
pub fn format_batch_summary(title: &str, outcomes: &[JobOutcome]) -> String {
    let mut out = format!("{title}:\n");
    for outcome in outcomes {
        match &outcome.result {
            Ok(fit) => {
                let flag = if fit.converged() { "" } else { " (not converged)" };
                out.push_str(&format!(
                    "- {:<12} Ka={:.6e} RMSE={:.3e}{flag}\n",
                    truncate(&outcome.name, 12),
                    fit.ka,
                    fit.rmse
                ));
            }
            Err(err) => out.push_str(&format!("- {:<12} failed: {err}\n", truncate(&outcome.name, 12))),
        }
    }
    out
}

fn fmt_opt(v: f64) -> String {
    if v.is_finite() { format!("{v:.5}") } else { "-".to_string() }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
