//! Command-line parsing for the `titr` binary.
//!
//! Argument parsing and command dispatch stay separate from the fitting code;
//! `app` turns these structs into run configuration.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::data::SyntheticPeak;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "titr", version, about = "1:1 host-guest binding constants from NMR titrations")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Silence all log output.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Also write logs to this file.
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit Ka (and per-peak dHG) to a titration CSV.
    Fit(FitArgs),
    /// Generate a synthetic titration CSV from known parameters.
    Synth(SynthArgs),
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Titration CSV: guest concentration column, then one shift column per peak.
    #[arg(value_name = "CSV")]
    pub csv: PathBuf,

    /// Total host concentration H0 (M).
    #[arg(long)]
    pub host: f64,

    /// Initial guess for Ka (M^-1).
    #[arg(long)]
    pub ka_guess: f64,

    /// Fit all peaks with one shared Ka.
    #[arg(long, conflicts_with = "peak")]
    pub global: bool,

    /// Peak (column label) for a single-peak fit; defaults to the first column.
    #[arg(long)]
    pub peak: Option<String>,

    /// Simplex iteration budget.
    #[arg(long)]
    pub max_iters: Option<u64>,

    /// Also fit every peak independently and compare Ka.
    #[arg(long)]
    pub cross_check: bool,

    /// Write an SVG figure named `<ID>.svg` into `--out-dir`.
    #[arg(long, value_name = "ID")]
    pub svg: Option<String>,

    /// Directory for figure output.
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Export the fit result to JSON.
    #[arg(long = "export-json", value_name = "PATH")]
    pub export_json: Option<PathBuf>,

    /// Export fitted curves and observed points to CSV.
    #[arg(long = "export-curve", value_name = "PATH")]
    pub export_curve: Option<PathBuf>,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Print the per-step residual table.
    #[arg(long)]
    pub residuals: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    /// Total host concentration H0 (M).
    #[arg(long)]
    pub host: f64,

    /// True binding constant (M^-1).
    #[arg(long)]
    pub ka: f64,

    /// Guest concentrations per step, comma separated (first is the reference, usually 0).
    #[arg(long, value_delimiter = ',', num_args = 1.., required = true)]
    pub guest: Vec<f64>,

    /// Peak as `label:dH:dHG`; repeat for several peaks.
    #[arg(long = "peak", value_parser = parse_peak, required = true)]
    pub peaks: Vec<SyntheticPeak>,

    /// Standard deviation of Gaussian shift noise (ppm).
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output CSV; stdout when omitted.
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

/// Parse `label:dH:dHG`.
pub fn parse_peak(s: &str) -> Result<SyntheticPeak, String> {
    let parts: Vec<&str> = s.split(':').collect();
    let [label, d_h, d_hg] = parts.as_slice() else {
        return Err(format!("expected label:dH:dHG, got '{s}'"));
    };
    if label.trim().is_empty() {
        return Err("peak label must not be empty".to_string());
    }
    let number = |v: &str, what: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid {what} '{v}': {e}"))
    };
    Ok(SyntheticPeak {
        label: label.trim().to_string(),
        d_h: number(d_h, "dH")?,
        d_hg: number(d_hg, "dHG")?,
    })
}
