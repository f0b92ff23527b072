//! CLI tool for playing a score headlessly
//!
//! Usage: play <score.txt> [config.json] [fingerings.json]
//!
//! Builds every instrument, runs the performance at the configured frame
//! rate against an in-memory scene and reports what was on stage.

use jamcore::prelude::*;
use log::info;
use std::env;
use std::fs;
use std::process;

const USAGE: &str = "Usage: play <score.txt> [config.json] [fingerings.json]

Animate a score without a renderer.

Arguments:
  score.txt        Path to score file
  config.json      Performance configuration (optional, defaults apply)
  fingerings.json  Fingering tables (optional, built-in tables apply)

Examples:
  play song.txt
  RUST_LOG=debug play song.txt stage.json
";

fn load(args: &[String]) -> jamcore::Result<(Performance, SceneGraph)> {
    let content = fs::read_to_string(&args[1])?;
    let score = parse_score(&content)?;
    println!(
        "Parsed {} events at {} ticks per beat",
        score.events.len(),
        score.division
    );

    let config = match args.get(2) {
        Some(path) => PerformanceConfig::from_path(path)?,
        None => PerformanceConfig::default(),
    };
    let tables = match args.get(3) {
        Some(path) => FingeringTables::from_path(path)?,
        None => FingeringTables::builtin()?,
    };

    println!("Configuration:");
    println!("  Frame rate: {} fps", config.frame_rate);
    println!("  Clone pool: {}", config.clone_pool_size);
    println!("  Always visible: {}", config.always_visible);
    println!("  Fingering tables: {}", tables.len());
    println!();

    let mut scene = SceneGraph::new();
    let performance =
        Performance::build(config, score.tempo_map(), &score.events, tables, &mut scene)?;
    Ok((performance, scene))
}

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("{}", USAGE);
        process::exit(1);
    }

    let (mut performance, mut scene) = match load(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error loading {}: {}", args[1], e);
            process::exit(1);
        }
    };

    println!("Instruments:");
    for instrument in performance.instruments() {
        println!("  {}", instrument.kind().name());
    }
    println!();

    println!("Playing {:.2}s...", performance.length());
    let mut peak = 0;
    let mut last_report = 0.0;
    let frames = performance.run(&mut scene, |performance, time| {
        let on_stage = performance
            .instruments()
            .iter()
            .filter(|i| i.is_visible())
            .count();
        peak = peak.max(on_stage);
        if time - last_report >= 1.0 {
            info!("{:.1}s: {} instruments on stage", time, on_stage);
            last_report = time;
        }
    });

    println!("✓ Played {} frames", frames);
    println!("  Most instruments on stage at once: {}", peak);
    println!("  Scene nodes: {}", scene.len());
}
