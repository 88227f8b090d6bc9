//! Generate the default pipeline configuration file
//!
//! Creates a JSON config with all default parameters and the built-in
//! color profile table, ready to be edited and passed to the CLI.

use scan_graph::PipelineConfig;
use std::{env, path::Path, process};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <output_config.json>", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  {} configs/default.json", args[0]);
        process::exit(1);
    }

    let output_path = Path::new(&args[1]);

    // Create parent directory if needed
    if let Some(parent) = output_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Error creating directory: {}", e);
            process::exit(1);
        }
    }

    let config = PipelineConfig::default();

    match config.to_json_file(output_path) {
        Ok(()) => {
            let zl = &config.zero_line;
            let st = &config.statistics;
            eprintln!("Configuration saved to {}", output_path.display());
            eprintln!();
            eprintln!("Config summary:");
            eprintln!(
                "  Zero line: {} detectors, window ±{:.0}% of height, fallback {}",
                zl.methods.len(),
                zl.search_half_height_ratio * 100.0,
                zl.fallback_y.map_or("none".to_string(), |y| format!("row {y}"))
            );
            eprintln!(
                "  Calibration: anchor {:.0} at row {:.0} (search ±{:.0} px)",
                config.calibration.anchor_value, config.calibration.default_anchor_y, config.calibration.search_tolerance
            );
            eprintln!(
                "  Profiles: {}",
                config.trace.profiles.names().collect::<Vec<_>>().join(", ")
            );
            eprintln!(
                "  First hit: rise > {:.0}, rebound {:.0}, baseline < {:.0}, first {} columns",
                st.first_hit_min_rise, st.first_hit_rebound_tolerance, st.first_hit_baseline_ceiling, st.first_hit_window
            );
        }
        Err(e) => {
            eprintln!("Error saving config: {}", e);
            process::exit(1);
        }
    }
}
