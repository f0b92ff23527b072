use jamcore::animation::striker::{predict, StrikerConfig};
use jamcore::midi::build_note_periods;
use jamcore::pipeline::clones::distribute;
use jamcore::prelude::*;

const CHORD: &str = "\
+0| tempo=500000, 0:program=56
+0| 0:60d@100, 0:64d@90, 0:67d@80
+480| 0:60u
+480| 0:64u, 0:67u, 0:72d
+960| 0:72u
";

fn demo_clones() -> jamcore::Result<()> {
    println!("\n=== Polyphony Clone Demo ===\n");

    let score = parse_score(CHORD)?;
    let tempo = score.tempo_map();
    let notes: Vec<_> = score.events.iter().filter_map(|e| e.as_note()).collect();
    let periods = build_note_periods(&notes, &tempo);
    let tolerance = PerformanceConfig::default().clone_tolerance_ticks(tempo.division());

    println!("Periods:");
    for period in &periods {
        println!(
            "  pitch {:>3}: {:.2}s - {:.2}s",
            period.pitch, period.start_time, period.end_time
        );
    }
    println!();

    for pool in [1, 2, 4] {
        let distribution = distribute(&periods, pool, tolerance);
        print!("Pool of {}: ", pool);
        for (i, lane) in distribution.lanes.iter().enumerate() {
            let pitches: Vec<_> = lane.iter().map(|p| p.pitch).collect();
            print!("clone{}={:?} ", i, pitches);
        }
        println!("dropped={}", distribution.dropped);
    }
    Ok(())
}

fn demo_strike() {
    println!("\n=== Stick Prediction Demo ===\n");

    let config = StrikerConfig::default();
    println!("Configuration:");
    println!("  Strike speed: {} degrees per beat", config.strike_speed);
    println!("  Resting angle: {} degrees", config.max_idle_angle);
    println!();

    println!("{:<10} {:<12} {:<12}", "Lead (s)", "60 BPM", "120 BPM");
    println!("{}", "-".repeat(34));
    for lead in [2.0, 1.0, 0.5, 0.25, 0.1, 0.0] {
        let slow = predict(Some(lead), 0.0, 1_000_000, config.strike_speed, config.max_idle_angle);
        let fast = predict(Some(lead), 0.0, 500_000, config.strike_speed, config.max_idle_angle);
        println!("{:<10} {:<12.2} {:<12.2}", lead, slow, fast);
    }
}

fn demo_performance() -> jamcore::Result<()> {
    println!("\n=== Performance Demo ===\n");

    let score = parse_score(CHORD)?;
    let mut scene = SceneGraph::new();
    let mut performance = Performance::build(
        PerformanceConfig::default(),
        score.tempo_map(),
        &score.events,
        FingeringTables::builtin()?,
        &mut scene,
    )?;

    let stage = performance.stage();
    let frames = performance.run(&mut scene, |_, _| {});
    println!("Played {} frames of {:.2}s", frames, performance.length());

    for i in 0..4 {
        let shown = scene
            .find_path(stage, &format!("trumpet/clone{i}"))
            .map(|node| scene.is_shown(node));
        match shown {
            Some(shown) => println!("  clone{}: on stage at the end: {}", i, shown),
            None => println!("  clone{}: never opened", i),
        }
    }

    let default_tempo = TempoMap::default();
    println!(
        "\nDefault tempo: {:.0} BPM at {} ticks per beat",
        default_tempo.tempo_before(0).bpm(),
        default_tempo.division()
    );
    Ok(())
}

fn main() -> jamcore::Result<()> {
    env_logger::init();

    println!("jamcore Performance Animation Library");
    println!("=====================================");

    demo_clones()?;
    demo_strike();
    demo_performance()?;

    println!("\n=====================================");
    println!("All demos complete!");
    Ok(())
}
