//! Performance orchestrator
//!
//! Splits the decoded events into one instrument per channel and program,
//! then drives every instrument frame by frame: visibility first, then the
//! stage layout, then the instruments themselves.

use std::collections::{BTreeMap, HashMap};

use log::{info, warn};

use crate::config::PerformanceConfig;
use crate::error::Result;
use crate::fingering::FingeringTables;
use crate::instrument::{build_instrument, Context, Frame, Instrument, InstrumentKind};
use crate::midi::{ChannelEvent, MidiNoteEvent, TempoMap, Ticked, PERCUSSION_CHANNEL};
use crate::pipeline::layout::StageLayout;
use crate::scene::{NodeId, Scene};

/// Events of one performer, keyed by channel and program
type Buckets = BTreeMap<(u8, u8), Vec<ChannelEvent>>;

/// Split a channel-mixed event list into performer buckets
///
/// Notes go to the program active on their channel when they start; the
/// matching note-off follows its note-on. Bends and controllers go to every
/// bucket of their channel. The percussion channel is a single bucket.
fn split_by_program(events: &[ChannelEvent]) -> Buckets {
    let mut programs: HashMap<u8, u8> = HashMap::new();
    let mut held: HashMap<(u8, u8), u8> = HashMap::new();
    let mut buckets = Buckets::new();
    let mut shared: Vec<ChannelEvent> = Vec::new();

    for &event in events {
        let channel = event.channel();
        match event {
            ChannelEvent::Program { program, .. } => {
                programs.insert(channel, program);
            }
            ChannelEvent::Note(note) => {
                let program = if channel == PERCUSSION_CHANNEL {
                    0
                } else {
                    let current = programs.get(&channel).copied().unwrap_or(0);
                    match note {
                        MidiNoteEvent::On { pitch, .. } if note.is_on() => {
                            held.insert((channel, pitch), current);
                            current
                        }
                        _ => held
                            .remove(&(channel, note.pitch()))
                            .unwrap_or(current),
                    }
                };
                buckets.entry((channel, program)).or_default().push(event);
            }
            ChannelEvent::PitchBend { .. } | ChannelEvent::Control { .. } => shared.push(event),
        }
    }

    for ((channel, _), bucket) in buckets.iter_mut() {
        let channel = *channel;
        bucket.extend(shared.iter().filter(|e| e.channel() == channel));
        bucket.sort_by_key(Ticked::tick);
    }
    buckets
}

/// A stage of instruments playing one piece
pub struct Performance {
    config: PerformanceConfig,
    tempo: TempoMap,
    stage: NodeId,
    instruments: Vec<Box<dyn Instrument>>,
    layout: StageLayout,
    length: f64,
}

impl Performance {
    /// Build every instrument for `events`
    ///
    /// # Arguments
    /// * `config` - Performance configuration
    /// * `tempo` - Tempo map of the piece
    /// * `events` - Events of every channel, in tick order
    /// * `tables` - Fingering tables for monophonic instruments
    /// * `scene` - Scene to build the stage in
    ///
    /// # Errors
    /// Fails if the configuration is invalid or an instrument's fingering
    /// table is missing or of the wrong sort.
    pub fn build(
        config: PerformanceConfig,
        tempo: TempoMap,
        events: &[ChannelEvent],
        tables: FingeringTables,
        scene: &mut dyn Scene,
    ) -> Result<Self> {
        config.validate()?;
        let stage = scene.create_node(None, "stage");

        let ctx = Context {
            tempo: &tempo,
            config: &config,
            tables: &tables,
        };
        let mut instruments = Vec::new();
        for ((channel, program), bucket) in split_by_program(events) {
            let kind = if channel == PERCUSSION_CHANNEL {
                Some(InstrumentKind::DrumKit)
            } else {
                InstrumentKind::from_program(program)
            };
            match kind {
                Some(kind) => {
                    instruments.push(build_instrument(kind, &ctx, &bucket, scene, stage)?);
                }
                None => warn!(
                    "No instrument for program {} on channel {}, skipping {} events",
                    program,
                    channel,
                    bucket.len()
                ),
            }
        }

        let length = events
            .iter()
            .map(|e| tempo.seconds_at(e.tick()))
            .fold(0.0, f64::max);
        info!(
            "Performance of {:.2}s with {} instruments",
            length,
            instruments.len()
        );

        Ok(Self {
            config,
            tempo,
            stage,
            instruments,
            layout: StageLayout::default(),
            length,
        })
    }

    /// Seconds until the last event
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Node every instrument hangs from
    pub fn stage(&self) -> NodeId {
        self.stage
    }

    pub fn tempo(&self) -> &TempoMap {
        &self.tempo
    }

    pub fn config(&self) -> &PerformanceConfig {
        &self.config
    }

    pub fn instruments(&self) -> &[Box<dyn Instrument>] {
        &self.instruments
    }

    /// Layout computed by the last frame
    pub fn layout(&self) -> &StageLayout {
        &self.layout
    }

    /// Advance every instrument to `time`
    ///
    /// # Arguments
    /// * `time` - Current time in seconds
    /// * `delta` - Seconds since the previous frame
    /// * `scene` - Scene to write poses to
    pub fn tick(&mut self, time: f64, delta: f64, scene: &mut dyn Scene) {
        let visibility: Vec<_> = self
            .instruments
            .iter_mut()
            .map(|i| (i.kind(), i.update_visibility(time)))
            .collect();
        self.layout = StageLayout::compute(visibility);

        for (slot, instrument) in self.instruments.iter_mut().enumerate() {
            let frame = Frame {
                time,
                delta,
                tempo: &self.tempo,
                layout: &self.layout,
                slot,
            };
            instrument.tick(&frame, scene);
        }
    }

    /// Jump to `time`, forward or backward
    pub fn seek(&mut self, time: f64, scene: &mut dyn Scene) {
        info!("Seeking to {:.2}s", time);
        for instrument in &mut self.instruments {
            instrument.seek(time, scene);
        }
    }

    /// Play from the start at the configured frame rate until every
    /// instrument has left the stage
    ///
    /// `on_frame` is called after every frame with the frame time.
    /// Returns the number of frames played.
    pub fn run(
        &mut self,
        scene: &mut dyn Scene,
        mut on_frame: impl FnMut(&Self, f64),
    ) -> usize {
        let delta = self.config.frame_delta();
        let end = self.length + self.config.visibility.show_after;
        let mut frames = 0;
        loop {
            let time = frames as f64 * delta;
            if time > end {
                break;
            }
            self.tick(time, delta, scene);
            on_frame(self, time);
            frames += 1;
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::parser::parse_score;
    use crate::scene::SceneGraph;

    const TWO_NOTES: &str = "\
+0| 0:program=56
+0| 0:60d@100
+960| 0:60u, 0:64d@100
+960| 0:64u
";

    fn one_clone() -> PerformanceConfig {
        PerformanceConfig {
            clone_pool_size: 1,
            ..PerformanceConfig::default()
        }
    }

    fn build(text: &str, config: PerformanceConfig) -> (Performance, SceneGraph) {
        let score = parse_score(text).unwrap();
        let mut scene = SceneGraph::new();
        let performance = Performance::build(
            config,
            score.tempo_map(),
            &score.events,
            FingeringTables::builtin().unwrap(),
            &mut scene,
        )
        .unwrap();
        (performance, scene)
    }

    fn play_until(performance: &mut Performance, scene: &mut SceneGraph, from: f64, to: f64) {
        let delta = 1.0 / 60.0;
        let mut time = from;
        while time <= to {
            performance.tick(time, delta, scene);
            time += delta;
        }
        performance.tick(to, delta, scene);
    }

    #[test]
    fn test_split_by_program() {
        let text = "\
+0| 0:program=0, 1:program=56, 2:program=127
+0| 0:60d, 1:60d, 2:60d, 9:38d
+480| 0:program=40, 0:60u, 1:60u, 1:bend=9000, 2:60u, 9:38u
+0| 0:62d
+480| 0:62u
";
        let score = parse_score(text).unwrap();
        let buckets = split_by_program(&score.events);
        let keys: Vec<_> = buckets.keys().copied().collect();
        assert_eq!(keys, vec![(0, 0), (0, 40), (1, 56), (2, 127), (9, 0)]);

        // The off follows its on even after a program change
        assert_eq!(buckets[&(0, 0)].len(), 2);
        assert_eq!(buckets[&(0, 40)].len(), 2);
        // Bends reach every bucket of their channel
        assert!(buckets[&(1, 56)]
            .iter()
            .any(|e| matches!(e, ChannelEvent::PitchBend { .. })));
    }

    #[test]
    fn test_unknown_program_is_skipped() {
        let (performance, _) = build(
            "+0| 0:program=127, 1:program=0\n+0| 0:60d, 1:60d\n+480| 0:60u, 1:60u",
            PerformanceConfig::default(),
        );
        let kinds: Vec<_> = performance.instruments().iter().map(|i| i.kind()).collect();
        assert_eq!(kinds, vec![InstrumentKind::Piano]);
    }

    #[test]
    fn test_trumpet_end_to_end() {
        let (mut performance, mut scene) = build(TWO_NOTES, one_clone());
        assert_eq!(performance.instruments().len(), 1);
        assert!((performance.length() - 2.0).abs() < 1e-12);

        let stage = performance.stage();
        let clone = scene.find_path(stage, "trumpet/clone0").unwrap();
        let key = |scene: &SceneGraph, i: usize| {
            let node = scene
                .find_path(stage, &format!("trumpet/clone0/bend/body/key{i}"))
                .unwrap();
            scene.transform(node).translation != [0.0; 3]
        };

        play_until(&mut performance, &mut scene, 0.0, 0.5);
        assert!(scene.is_shown(clone));
        assert!(!key(&scene, 0) && !key(&scene, 1) && !key(&scene, 2));

        play_until(&mut performance, &mut scene, 0.5, 1.5);
        assert!(key(&scene, 0) && key(&scene, 1) && !key(&scene, 2));

        play_until(&mut performance, &mut scene, 1.5, 3.0);
        assert!(scene.is_shown(clone));
        assert!(!key(&scene, 0) && !key(&scene, 1) && !key(&scene, 2));

        // Gone once the after-window has passed
        play_until(&mut performance, &mut scene, 3.0, 4.5);
        assert!(!scene.is_shown(clone));
    }

    #[test]
    fn test_seek_backwards() {
        let (mut performance, mut scene) = build(TWO_NOTES, one_clone());
        let stage = performance.stage();
        let key0 = scene
            .find_path(stage, "trumpet/clone0/bend/body/key0")
            .unwrap();

        play_until(&mut performance, &mut scene, 0.0, 1.5);
        assert_ne!(scene.transform(key0).translation, [0.0; 3]);

        performance.seek(0.25, &mut scene);
        performance.tick(0.25, 1.0 / 60.0, &mut scene);
        assert_eq!(scene.transform(key0).translation, [0.0; 3]);
    }

    #[test]
    fn test_run_covers_after_window() {
        let (mut performance, mut scene) = build(TWO_NOTES, one_clone());
        let mut last = 0.0;
        let frames = performance.run(&mut scene, |_, time| last = time);
        assert!(frames > 0);
        assert!(last >= 2.0 + 2.0 - 1.0 / 60.0);
    }

    #[test]
    fn test_invalid_config_is_refused() {
        let config = PerformanceConfig {
            clone_pool_size: 0,
            ..PerformanceConfig::default()
        };
        let score = parse_score(TWO_NOTES).unwrap();
        let mut scene = SceneGraph::new();
        let result = Performance::build(
            config,
            score.tempo_map(),
            &score.events,
            FingeringTables::builtin().unwrap(),
            &mut scene,
        );
        assert!(result.is_err());
    }
}
