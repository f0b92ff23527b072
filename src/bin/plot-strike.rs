use jamcore::animation::striker::{Striker, StrikerConfig};
use jamcore::midi::{MidiNoteEvent, TempoMap};
use plotters::prelude::*;

const SAMPLE_RATE: f64 = 1000.0; // 1ms = 1 sample
const DIVISION: u16 = 480;
/// Seconds drawn after the last hit
const TAIL_SECONDS: f64 = 1.0;

struct Args {
    bpm: f64,
    hits: Vec<f64>,
    output_path: String,
}

fn print_usage() {
    eprintln!("Usage: plot-strike <bpm> <hit_seconds> <output.svg>");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  plot-strike 120 0.5,1.0,1.25,3.0 output.svg");
    eprintln!("  plot-strike 60 1,1.1,1.2 fast.svg    # sticky stick between close hits");
}

fn parse_args() -> Result<Args, Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() != 4 {
        print_usage();
        return Err("Invalid number of arguments".into());
    }

    let bpm: f64 = args[1].parse()?;
    let mut hits = args[2]
        .split(',')
        .map(|s| s.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()?;
    let output_path = args[3].clone();

    if bpm <= 0.0 {
        return Err("Tempo must be positive".into());
    }
    if hits.iter().any(|&h| h < 0.0) {
        return Err("Hit times must be non-negative".into());
    }
    hits.sort_by(f64::total_cmp);

    Ok(Args {
        bpm,
        hits,
        output_path,
    })
}

fn build_striker(args: &Args) -> (Striker, TempoMap) {
    let micros = (60_000_000.0 / args.bpm).round() as u32;
    let tempo = TempoMap::constant(DIVISION, micros);
    let ticks_per_second = DIVISION as f64 * args.bpm / 60.0;
    let notes: Vec<MidiNoteEvent> = args
        .hits
        .iter()
        .map(|&seconds| MidiNoteEvent::On {
            tick: (seconds * ticks_per_second).round() as u64,
            channel: 0,
            pitch: 60,
            velocity: 127,
        })
        .collect();
    let striker = Striker::new(&tempo.schedule(&notes), StrikerConfig::default());
    (striker, tempo)
}

/// Stick angle in degrees and visibility for every sample
fn simulate(args: &Args) -> (Vec<f64>, Vec<bool>, Vec<usize>) {
    let (mut striker, tempo) = build_striker(args);
    let end = args.hits.last().copied().unwrap_or(0.0) + TAIL_SECONDS;
    let samples = (end * SAMPLE_RATE) as usize;
    let delta = 1.0 / SAMPLE_RATE;

    let mut angles = Vec::with_capacity(samples);
    let mut visible = Vec::with_capacity(samples);
    let mut strikes = Vec::new();
    for i in 0..samples {
        let status = striker.tick(i as f64 * delta, delta, &tempo);
        if status.strike.is_some() {
            strikes.push(i);
        }
        angles.push(status.angle.to_degrees());
        visible.push(status.visible);
    }
    (angles, visible, strikes)
}

fn check_impacts(
    angles: &[f64],
    strikes: &[usize],
) -> Result<(), Box<dyn std::error::Error>> {
    let config = StrikerConfig::default();
    if let Some((i, angle)) = angles
        .iter()
        .enumerate()
        .find(|&(_, &a)| a > config.max_idle_angle + 1e-9)
    {
        return Err(format!("Angle {angle:.3} above rest at sample {i}").into());
    }

    for &i in strikes {
        let landing = angles[i];
        if landing > 1e-9 {
            return Err(format!(
                "MISSED HIT at sample {} ({}ms): stick at {:.3} degrees",
                i,
                i as f64 / SAMPLE_RATE * 1000.0,
                landing
            )
            .into());
        }
    }
    println!("  ✓ {} hits landed at 0 degrees", strikes.len());
    Ok(())
}

fn create_plot(
    args: &Args,
    angles: &[f64],
    visible: &[bool],
    strikes: &[usize],
) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(&args.output_path, (800, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let max_time = angles.len() as f64;
    let max_idle = StrikerConfig::default().max_idle_angle;
    let title = format!("Stick angle: {} BPM, {} hits", args.bpm, args.hits.len());

    let mut chart = ChartBuilder::on(&root)
        .caption(&title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..max_time, -2f64..max_idle + 5.0)?;

    chart
        .configure_mesh()
        .x_desc("Time (ms)")
        .y_desc("Angle (degrees)")
        .x_labels(10)
        .y_labels(10)
        .draw()?;

    chart.draw_series(LineSeries::new(
        angles.iter().enumerate().map(|(i, &a)| (i as f64, a)),
        BLUE.stroke_width(2),
    ))?;

    // Visibility as a band under the curve
    chart.draw_series(LineSeries::new(
        visible
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as f64, if v { -1.0 } else { -2.0 })),
        GREEN.stroke_width(1),
    ))?;

    for &i in strikes {
        chart.draw_series(std::iter::once(Circle::new(
            (i as f64, 0.0),
            5,
            RED.filled(),
        )))?;
    }

    root.present()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args()?;

    println!("Strike Plot Generator");
    println!("=====================");
    println!("  Tempo: {} BPM", args.bpm);
    println!("  Hits: {:?}", args.hits);
    println!();

    print!("  Simulating stick... ");
    let (angles, visible, strikes) = simulate(&args);
    println!("done ({} samples)", angles.len());

    if strikes.len() != args.hits.len() {
        println!(
            "  Note: {} hits share a sample with another",
            args.hits.len() - strikes.len()
        );
    }
    check_impacts(&angles, &strikes)?;

    print!("  Creating plot... ");
    create_plot(&args, &angles, &visible, &strikes)?;
    println!("done");

    println!();
    println!("Output: {}", args.output_path);

    Ok(())
}
