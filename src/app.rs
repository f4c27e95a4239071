//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the real main. It parses CLI
//! arguments, installs logging, runs the fit pipeline or the synthetic data
//! generator, prints reports and plots, and writes optional exports.

use std::fs::File;
use std::io::{BufWriter, Write};

use clap::Parser;

use crate::cli::{Cli, Command, FitArgs, SynthArgs};
use crate::data::{SyntheticSpec, generate_titration};
use crate::domain::{FitConfig, FitMode};
use crate::error::AppError;
use crate::io::{write_curve_csv, write_result_json, write_titration_csv};
use crate::plot::{AsciiRenderer, Renderer, SvgRenderer};
use crate::report::{format_batch_summary, format_fit_summary, format_residual_table};

pub mod pipeline;

/// Entry point for the `titr` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    crate::logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    match cli.command {
        Command::Fit(args) => handle_fit(&args),
        Command::Synth(args) => handle_synth(&args),
    }
}

fn handle_fit(args: &FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(args)?;
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        format_fit_summary(&config.csv_path.display().to_string(), &run.series, &run.result)
    );

    if let Some(outcomes) = &run.cross_check {
        println!("{}", format_batch_summary("Independent per-peak fits", outcomes));
    }

    if config.residuals {
        println!("{}", format_residual_table(&run.residuals));
    }

    if config.plot {
        let renderer = AsciiRenderer {
            width: config.plot_width,
            height: config.plot_height,
        };
        println!("{}", renderer.render(&run.figure, &run.figure.title)?);
    }

    if let Some(id) = &config.svg_id {
        let renderer = SvgRenderer::new(&config.out_dir);
        let path = renderer.render(&run.figure, id)?;
        println!("Figure: {}", path.display());
    }

    if let Some(path) = &config.export_json {
        write_result_json(path, &run.result)?;
    }
    if let Some(path) = &config.export_curve {
        write_curve_csv(path, &run.figure)?;
    }

    Ok(())
}

fn handle_synth(args: &SynthArgs) -> Result<(), AppError> {
    let spec = SyntheticSpec {
        guest: args.guest.clone(),
        host: args.host,
        ka: args.ka,
        peaks: args.peaks.clone(),
        noise: args.noise,
        seed: args.seed,
    };
    let series = generate_titration(&spec)?;

    match &args.out {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", path.display())))?;
            write_titration_csv(BufWriter::new(file), &series)?;
            eprintln!("Wrote {} steps x {} peaks to {}", series.steps(), series.peaks.len(), path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            write_titration_csv(&mut lock, &series)?;
            lock.flush()
                .map_err(|e| AppError::io(format!("Failed to flush stdout: {e}")))?;
        }
    }
    Ok(())
}

/// Build the run configuration, rejecting option values no fit could use.
pub fn fit_config_from_args(args: &FitArgs) -> Result<FitConfig, AppError> {
    if args.max_iters == Some(0) {
        return Err(AppError::Config("--max-iters must be at least 1".to_string()));
    }
    if let Some(id) = &args.svg {
        if id.trim().is_empty() || id.contains(['/', '\\']) {
            return Err(AppError::Config(format!(
                "--svg expects a bare identifier, got '{id}'"
            )));
        }
    }

    Ok(FitConfig {
        csv_path: args.csv.clone(),
        host: args.host,
        ka_guess: args.ka_guess,
        mode: if args.global { FitMode::Global } else { FitMode::Single },
        peak: args.peak.clone(),
        max_iters: args.max_iters,
        cross_check: args.cross_check,
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        residuals: args.residuals,
        svg_id: args.svg.clone(),
        out_dir: args.out_dir.clone(),
        export_json: args.export_json.clone(),
        export_curve: args.export_curve.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> FitArgs {
        let mut argv = vec!["titr", "fit", "data.csv", "--host", "0.001", "--ka-guess", "300"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Fit(args) => args,
            Command::Synth(_) => panic!("expected fit"),
        }
    }

    #[test]
    fn config_defaults_to_single_mode_with_plot() {
        let config = fit_config_from_args(&args(&[])).unwrap();
        assert_eq!(config.mode, FitMode::Single);
        assert!(config.plot);
        assert!(config.svg_id.is_none());
        assert_eq!(config.ka_guess, 300.0);
    }

    #[test]
    fn config_maps_global_and_outputs() {
        let config = fit_config_from_args(&args(&[
            "--global", "--no-plot", "--svg", "fig1", "--out-dir", "out", "--export-json", "r.json",
        ]))
        .unwrap();
        assert_eq!(config.mode, FitMode::Global);
        assert!(!config.plot);
        assert_eq!(config.svg_id.as_deref(), Some("fig1"));
        assert_eq!(config.out_dir, std::path::PathBuf::from("out"));
        assert!(config.export_json.is_some());
    }

    #[test]
    fn config_rejects_bad_options() {
        let err = fit_config_from_args(&args(&["--max-iters", "0"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(fit_config_from_args(&args(&["--svg", "a/b"])).is_err());
    }
}
