use std::path::PathBuf;
use std::process;

use voxcast_bench::report;
use voxcast_bench::runner::BenchmarkRunner;
use voxcast_bench::scenes;
use voxcast_core::GiSettings;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut baseline_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut regression_threshold = 10.0f64;
    let mut refresh_count = 60u32;
    let mut extract_cascade: Option<u32> = None;

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        if matches!(flag, "--help" | "-h") {
            print_usage();
            process::exit(0);
        }
        let Some(value) = args.get(i + 1) else {
            eprintln!("Missing value for {}", flag);
            process::exit(1);
        };
        match flag {
            "--config" => config_path = Some(PathBuf::from(value)),
            "--baseline" => baseline_path = Some(PathBuf::from(value)),
            "--output" => output_path = Some(PathBuf::from(value)),
            "--regression-threshold" => {
                regression_threshold = parse_or_exit(flag, value);
            }
            "--refreshes" => refresh_count = parse_or_exit(flag, value),
            "--extract" => extract_cascade = Some(parse_or_exit(flag, value)),
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
        i += 2;
    }

    let settings = match &config_path {
        Some(path) => match GiSettings::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("ERROR: {e}");
                process::exit(1);
            }
        },
        None => GiSettings::default(),
    };
    log::info!(
        "Grid: {}^3 x {} cascades, voxel size {}",
        settings.grid.resolution,
        settings.grid.cascade_count,
        settings.grid.voxel_pixel_size
    );

    log::info!("Initializing GPU...");
    let runner = match BenchmarkRunner::new(refresh_count) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("ERROR: {e}");
            process::exit(1);
        }
    };

    let mut results = Vec::new();
    for scene in &scenes::standard_scenes() {
        match runner.run_scene(scene, &settings, extract_cascade) {
            Ok(result) => results.push(result),
            Err(e) => {
                eprintln!("ERROR: scene '{}' failed: {e}", scene.name);
                process::exit(1);
            }
        }
    }

    println!("\n## Voxel GI Benchmark Results\n");
    println!("{}", report::format_markdown(&results));

    if let Some(ref path) = output_path {
        let baseline = report::Baseline {
            timestamp: format!("bench-{}", process::id()),
            results: results.clone(),
        };
        if let Err(e) = report::save_baseline(path, &baseline) {
            eprintln!("ERROR: failed to save results: {e}");
            process::exit(1);
        }
        log::info!("Saved results to {}", path.display());
    }

    if let Some(ref path) = baseline_path {
        if let Some(baseline) = report::load_baseline(path) {
            let regressions = report::compare(&results, &baseline, regression_threshold);
            println!(
                "{}",
                report::format_comparison(&regressions, regression_threshold)
            );
            if !regressions.is_empty() {
                eprintln!(
                    "ERROR: {} regressions detected, exiting with code 1",
                    regressions.len()
                );
                process::exit(1);
            }
        } else {
            log::warn!("Baseline file not found: {}", path.display());
        }
    }

    log::info!("Benchmark complete.");
}

fn parse_or_exit<T: std::str::FromStr>(flag: &str, value: &str) -> T {
    match value.parse() {
        Ok(v) => v,
        Err(_) => {
            eprintln!("Invalid {} value: {}", flag, value);
            process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!("Usage: bench-runner [OPTIONS]");
    eprintln!("  --config <path>                RON GiSettings (default: built-in)");
    eprintln!("  --refreshes <n>                Refreshes per scene (default: 60)");
    eprintln!("  --extract <cascade>            Read back one cascade after the last refresh");
    eprintln!("  --output <path>                Save results as JSON");
    eprintln!("  --baseline <path>              Load baseline JSON for comparison");
    eprintln!("  --regression-threshold <pct>   Regression threshold percentage (default: 10)");
}
