//! Command-line interface for scan_graph
//!
//! Analyzes one or more score-graph images (or every image in a directory)
//! and prints the results as JSON on stdout. A summary goes to stderr.

use scan_graph::image_loader::is_supported_path;
use scan_graph::{GraphAnalysis, GraphAnalyzer, ManualOverrides, PipelineConfig};
use std::{
    env, fs,
    path::{Path, PathBuf},
    process,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut overrides = ManualOverrides::none();
    let mut inputs: Vec<PathBuf> = Vec::new();

    // Parse arguments
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => config_path = Some(PathBuf::from(next_value(&args, &mut i))),
            "--zero-y" => overrides.zero_y = Some(parse_number("--zero-y", next_value(&args, &mut i))),
            "--anchor" => {
                let value = next_value(&args, &mut i);
                let Some((y, v)) = value.split_once(':') else {
                    eprintln!("Error: --anchor expects ROW:VALUE, got '{}'", value);
                    process::exit(1);
                };
                overrides = overrides.with_anchor(parse_number("--anchor", y), parse_number("--anchor", v));
            }
            "--profile" => overrides.profile = Some(next_value(&args, &mut i).to_string()),
            "--help" | "-h" => {
                print_help(&args[0]);
                process::exit(0);
            }
            arg if !arg.starts_with("--") => inputs.push(PathBuf::from(arg)),
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                eprintln!("Use --help for usage information");
                process::exit(1);
            }
        }
        i += 1;
    }

    if inputs.is_empty() {
        print_help(&args[0]);
        process::exit(1);
    }

    let config = match config_path {
        Some(path) => match PipelineConfig::from_json_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config file: {}", e);
                process::exit(1);
            }
        },
        None => PipelineConfig::default(),
    };

    let analyzer = match GraphAnalyzer::with_config(config) {
        Ok(analyzer) => analyzer,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    let paths = expand_inputs(&inputs);
    if paths.is_empty() {
        eprintln!("No image files found");
        process::exit(1);
    }

    let results = analyzer.analyze_paths(&paths, &overrides);

    let mut failures = 0;
    let mut report = Vec::with_capacity(paths.len());
    for (path, result) in paths.iter().zip(results) {
        match result {
            Ok(analysis) => {
                print_summary(path, &analysis);
                report.push(serde_json::json!({ "path": path, "analysis": analysis }));
            }
            Err(error) => {
                failures += 1;
                eprintln!("{}: analysis failed: {}", path.display(), error);
                if error.is_recoverable() {
                    eprintln!("  Suggestion: {}", error.user_message());
                }
                report.push(serde_json::json!({ "path": path, "error": error.to_string() }));
            }
        }
    }

    // Print JSON to stdout for programmatic use
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing results: {}", e);
            process::exit(1);
        }
    }

    eprintln!();
    eprintln!("Processed {} image(s), {} failed", paths.len(), failures);
    if failures == paths.len() {
        process::exit(1);
    }
}

fn next_value<'a>(args: &'a [String], i: &mut usize) -> &'a str {
    let flag = &args[*i];
    *i += 1;
    match args.get(*i) {
        Some(value) => value,
        None => {
            eprintln!("Error: {} requires a value", flag);
            process::exit(1);
        }
    }
}

fn parse_number(flag: &str, value: &str) -> f64 {
    match value.parse::<f64>() {
        Ok(n) => n,
        Err(_) => {
            eprintln!("Error: {} expects a number, got '{}'", flag, value);
            process::exit(1);
        }
    }
}

/// Replace directories by the supported images they contain, sorted by name
fn expand_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            match fs::read_dir(input) {
                Ok(entries) => {
                    let mut found: Vec<PathBuf> = entries
                        .filter_map(|entry| entry.ok().map(|e| e.path()))
                        .filter(|p| p.is_file() && is_supported_path(p))
                        .collect();
                    found.sort();
                    paths.extend(found);
                }
                Err(e) => eprintln!("Warning: cannot read directory {}: {}", input.display(), e),
            }
        } else {
            paths.push(input.clone());
        }
    }
    paths
}

fn print_summary(path: &Path, analysis: &GraphAnalysis) {
    let stats = &analysis.statistics;
    eprintln!();
    eprintln!("{}:", path.display());
    eprintln!(
        "  Zero line: y={:.1} ({:?}, confidence {:.0}%{})",
        analysis.zero_line.y,
        analysis.zero_line.source,
        analysis.zero_line.confidence * 100.0,
        if analysis.low_confidence { ", LOW CONFIDENCE" } else { "" }
    );
    eprintln!(
        "  Scale: {:.2} per pixel (anchor y={:.1}, {:?})",
        analysis.calibration.units_per_pixel, analysis.anchor.point.y, analysis.anchor.source
    );
    eprintln!(
        "  Line: {} ({} of {} columns)",
        analysis.profile, stats.present_columns, analysis.width
    );
    eprintln!("  Max: {:.0}  Min: {:.0}  Current: {:.0}", stats.maximum, stats.minimum, stats.current);
    match (stats.first_hit_index, stats.first_hit_value) {
        (Some(column), Some(value)) => eprintln!("  First hit: column {} at {:.0}", column, value),
        _ => eprintln!("  First hit: none"),
    }
}

fn print_help(program_name: &str) {
    eprintln!("Usage: {} [OPTIONS] <image_or_dir>...", program_name);
    eprintln!();
    eprintln!("Recover the score graph from pinball display images.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config FILE        Load pipeline configuration from JSON");
    eprintln!("  --zero-y ROW         Use ROW as the zero line instead of detecting it");
    eprintln!("  --anchor ROW:VALUE   Use ROW as the anchor gridline showing VALUE");
    eprintln!("                       (VALUE is the magnitude, > 0; a row below the zero line reads as -VALUE)");
    eprintln!("  --profile NAME       Trace only the named line color (pink, blue, ...)");
    eprintln!("  --help, -h           Show this help message");
    eprintln!();
    eprintln!("Set RUST_LOG=debug for per-detector output.");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} graph.png", program_name);
    eprintln!("  {} --profile orange --zero-y 248 graph.png", program_name);
    eprintln!("  {} --config config.json screenshots/", program_name);
}
