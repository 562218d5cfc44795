//! rowfinder
//!
//! Finds line features that run along the same right-of-way.

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use rowfinder_cli::GlobalArgs;
use rowfinder_cli::output::{Status, format_count, format_duration, format_field, format_meters};
use rowfinder_cli::progress;
use rowfinder_core::config::{Config, ConfigSchema};
use rowfinder_core::error::exit_codes;
use rowfinder_core::{Error, ErrorCode, Result, ResultExt};
use rowfinder_geo::{
    Coordinate, MatchStats, PairMatcher, ReportFormat, ReportSummary, SpatialGrid, bearing,
    distance_3d, haversine_distance_meters, load_features, render, render_json,
    vincenty_distance, write_report,
};
use rowfinder_telemetry::{TelemetryConfig, Timer, metrics};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "rowfinder")]
#[command(about = "Find redundant line features that share the same right-of-way")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load features, build the grid index and optionally match pairs
    Scan {
        /// Feature file (JSON array of records)
        input: Option<PathBuf>,

        /// Run pair matching and write the report
        #[arg(long)]
        find_pairs: bool,

        /// Grid cell size in degrees
        #[arg(long)]
        cell_size: Option<f64>,

        /// Maximum midpoint distance in meters
        #[arg(long)]
        proximity: Option<f64>,

        /// Maximum bearing difference in degrees
        #[arg(long)]
        angle: Option<f64>,

        /// Report file path, or "-" for stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report file format: text, json
        #[arg(long)]
        report_format: Option<ReportFormat>,

        /// Print collected metrics after the run
        #[arg(long)]
        metrics: bool,
    },

    /// Build the grid index and print its statistics
    Index {
        /// Feature file (JSON array of records)
        input: Option<PathBuf>,

        /// Grid cell size in degrees
        #[arg(long)]
        cell_size: Option<f64>,
    },

    /// Distance and bearing between two points
    #[command(allow_negative_numbers = true)]
    Distance {
        lat1: f64,
        lon1: f64,
        alt1: f64,
        lat2: f64,
        lon2: f64,
        alt2: f64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.global.quiet {
        owo_colors::set_override(false);
    }

    let json = cli.global.format.is_json();
    let telemetry = TelemetryConfig::from_verbosity(cli.global.verbose).with_json(json);
    if let Err(e) = rowfinder_telemetry::init_with_config(telemetry) {
        Status::warning(&e.to_string());
    }

    match run(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            print_error(&err, json);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.global.config.as_deref())?;
    if let Some(path) = &config.path {
        tracing::info!(path = %path, "configuration loaded");
    }

    match cli.command {
        Commands::Scan {
            input,
            find_pairs,
            cell_size,
            proximity,
            angle,
            output,
            report_format,
            metrics,
        } => {
            let mut schema = config.schema;
            let m = &mut schema.matching;
            m.cell_size_degrees = cell_size.unwrap_or(m.cell_size_degrees);
            m.proximity_threshold_meters = proximity.unwrap_or(m.proximity_threshold_meters);
            m.angle_threshold_degrees = angle.unwrap_or(m.angle_threshold_degrees);
            m.find_pairs |= find_pairs;
            if let Some(format) = report_format {
                schema.report.format = format;
            }
            validate_overrides(&schema)?;

            let input = resolve_input(input, &schema)?;
            let report_path = output.unwrap_or_else(|| {
                Path::new(&schema.general.output_dir).join(&schema.report.file_name)
            });
            run_scan(&cli.global, &schema, &input, &report_path, metrics)
        }

        Commands::Index { input, cell_size } => {
            let mut schema = config.schema;
            if let Some(size) = cell_size {
                schema.matching.cell_size_degrees = size;
            }
            validate_overrides(&schema)?;

            let input = resolve_input(input, &schema)?;
            run_index(&cli.global, &schema, &input)
        }

        Commands::Distance {
            lat1,
            lon1,
            alt1,
            lat2,
            lon2,
            alt2,
        } => run_distance(
            &cli.global,
            Coordinate::new(lat1, lon1, alt1),
            Coordinate::new(lat2, lon2, alt2),
        ),
    }
}

/// Validates merged settings and warns when the grid is finer than the
/// proximity threshold, before any grid is built.
fn validate_overrides(schema: &ConfigSchema) -> Result<()> {
    schema.validate().context("While applying command-line overrides")?;
    let matching = &schema.matching;
    matching.thresholds().check_against_cell_size(matching.cell_size_degrees);
    Ok(())
}

fn resolve_input(input: Option<PathBuf>, schema: &ConfigSchema) -> Result<PathBuf> {
    input
        .or_else(|| schema.general.input.as_ref().map(PathBuf::from))
        .ok_or_else(|| {
            Error::new(ErrorCode::InvalidInput, "No input file given")
                .with_suggestion("Pass a feature file or set general.input in rowfinder.toml")
        })
}

fn build_grid(global: &GlobalArgs, schema: &ConfigSchema, input: &Path) -> Result<SpatialGrid> {
    if !input.exists() {
        return Err(Error::file_not_found(input));
    }

    let quiet = global.quiet || global.format.is_json();
    let spinner = progress::spinner("Loading features...", quiet);

    let timer = Timer::start("load_ms");
    let features = load_features(input)
        .map_err(Error::from)
        .context(format!("While loading {}", input.display()))?;
    timer.stop();

    spinner.set_message("Building spatial index...");
    let timer = Timer::start("index_ms");
    let grid = SpatialGrid::build(&features, schema.matching.cell_size_degrees)?;
    timer.stop();
    progress::finish_clear(&spinner);

    let registry = metrics();
    registry.increment_by("features", grid.feature_count() as u64);
    registry.increment_by("segments", grid.segment_count() as u64);
    registry.gauge("cells", grid.cell_count() as u64);
    registry.gauge("max_cell_occupancy", grid.max_occupancy() as u64);

    tracing::info!(
        input = %input.display(),
        features = grid.feature_count(),
        segments = grid.segment_count(),
        cells = grid.cell_count(),
        "features indexed"
    );

    Ok(grid)
}

fn run_scan(
    global: &GlobalArgs,
    schema: &ConfigSchema,
    input: &Path,
    report_path: &Path,
    show_metrics: bool,
) -> Result<()> {
    let started = Instant::now();
    let grid = build_grid(global, schema, input)?;

    if !schema.matching.find_pairs {
        let summary = ReportSummary::new(&grid, &[]);
        if global.format.is_json() {
            let mut out = serde_json::json!({
                "input": input.display().to_string(),
                "find_pairs": false,
                "summary": summary,
            });
            if show_metrics {
                out["metrics"] = metrics().export_json();
            }
            print_json(&out)?;
        } else {
            Status::header("Scan");
            print_summary(&summary);
            Status::info("Pair matching skipped; pass --find-pairs to enable it");
            if show_metrics {
                print_metrics()?;
            }
        }
        return Ok(());
    }

    let quiet = global.quiet || global.format.is_json();
    let spinner = progress::spinner("Matching segments...", quiet);
    let matcher = PairMatcher::new(schema.matching.thresholds());
    let timer = Timer::start("match_ms");
    let (pairs, stats) = matcher.find_pairs_with_stats(&grid);
    timer.stop();
    progress::finish_clear(&spinner);

    record_stats(&stats);

    if report_path.as_os_str() == "-" {
        print!("{}", render(&pairs, schema.report.format)?);
        return Ok(());
    }

    write_report(report_path, &pairs, schema.report.format)
        .map_err(Error::from)
        .context(format!("While writing {}", report_path.display()))?;

    let summary = ReportSummary::new(&grid, &pairs);

    if global.format.is_json() {
        let mut out = serde_json::json!({
            "input": input.display().to_string(),
            "find_pairs": true,
            "report": report_path.display().to_string(),
            "summary": summary,
            "stats": stats,
            "pairs": render_json(&pairs),
        });
        if show_metrics {
            out["metrics"] = metrics().export_json();
        }
        print_json(&out)?;
    } else {
        Status::header("Scan");
        print_summary(&summary);
        println!("{}", format_field("Comparisons", stats.comparisons));
        println!();
        if pairs.is_empty() {
            Status::info("No segments share a right-of-way");
        } else {
            Status::success(&format!(
                "Found {} across {}",
                format_count(summary.pairs, "matched pair", "matched pairs"),
                format_count(summary.feature_pairs, "feature pair", "feature pairs"),
            ));
        }
        Status::info(&format!(
            "Report written to {} in {}",
            report_path.display(),
            format_duration(started.elapsed())
        ));
        if show_metrics {
            print_metrics()?;
        }
    }

    Ok(())
}

fn run_index(global: &GlobalArgs, schema: &ConfigSchema, input: &Path) -> Result<()> {
    let grid = build_grid(global, schema, input)?;

    if global.format.is_json() {
        return print_json(&serde_json::json!({
            "input": input.display().to_string(),
            "cell_size_degrees": grid.cell_size(),
            "features": grid.feature_count(),
            "segments": grid.segment_count(),
            "cells": grid.cell_count(),
            "max_cell_occupancy": grid.max_occupancy(),
        }));
    }

    Status::header("Index");
    println!("{}", format_field("Cell size", format!("{}°", grid.cell_size())));
    println!("{}", format_field("Features", grid.feature_count()));
    println!("{}", format_field("Segments", grid.segment_count()));
    println!("{}", format_field("Cells", grid.cell_count()));
    println!("{}", format_field("Max occupancy", grid.max_occupancy()));

    Ok(())
}

fn run_distance(global: &GlobalArgs, from: Coordinate, to: Coordinate) -> Result<()> {
    for point in [&from, &to] {
        if !point.is_valid() {
            return Err(Error::new(
                ErrorCode::InvalidCoordinate,
                format!("Invalid coordinate: {}", point),
            )
            .with_suggestion("Latitude must be within ±90 and longitude within ±180"));
        }
    }

    let (surface, method) = match vincenty_distance(&from, &to) {
        Ok(d) => (d, "vincenty"),
        Err(e) => {
            tracing::warn!(error = %e, "falling back to haversine");
            (haversine_distance_meters(&from, &to), "haversine")
        }
    };
    let distance = distance_3d(&from, &to);
    let heading = bearing(&from, &to);

    if global.format.is_json() {
        return print_json(&serde_json::json!({
            "from": from,
            "to": to,
            "surface_distance_m": surface,
            "distance_3d_m": distance,
            "bearing_deg": heading,
            "method": method,
        }));
    }

    println!("{}", format_field("Surface", format_meters(surface)));
    println!("{}", format_field("3D distance", format_meters(distance)));
    println!("{}", format_field("Bearing", format!("{:.2}°", heading)));
    println!("{}", format_field("Method", method));

    Ok(())
}

fn record_stats(stats: &MatchStats) {
    let registry = metrics();
    registry.increment_by("comparisons", stats.comparisons as u64);
    registry.increment_by("duplicates_skipped", stats.duplicates_skipped as u64);
    registry.increment_by("rejected_distance", stats.rejected_distance as u64);
    registry.increment_by("rejected_angle", stats.rejected_angle as u64);
    registry.increment_by("matches", stats.matches as u64);
}

fn print_summary(summary: &ReportSummary) {
    println!("{}", format_field("Features", summary.features));
    println!("{}", format_field("Segments", summary.segments));
    println!("{}", format_field("Cells", summary.cells));
}

fn print_metrics() -> Result<()> {
    Status::header("Metrics");
    print_json(&metrics().export_json())
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_error(err: &Error, json: bool) {
    if json {
        match serde_json::to_string(&err.to_report()) {
            Ok(report) => eprintln!("{}", report),
            Err(_) => eprintln!("{}", err),
        }
        return;
    }

    eprintln!("{} {}", format!("error[{}]:", err.code).red().bold(), err.message);
    if let Some(ctx) = &err.context {
        eprintln!("  {} {}", "context:".dimmed(), ctx);
    }
    if let Some(suggestion) = &err.suggestion {
        eprintln!("  {} {}", "help:".cyan(), suggestion);
    }
}
