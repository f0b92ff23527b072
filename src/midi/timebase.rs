//! Tick to seconds conversion
//!
//! A tempo map is a list of tempo changes, each holding microseconds per
//! beat from its tick onward. Seconds at a tick are the piecewise sum of
//! every segment before it.

use log::{debug, warn};

use super::Ticked;
use crate::pipeline::queue::Scheduled;

/// Default tempo when a file carries none (120 BPM)
pub const DEFAULT_MICROS_PER_BEAT: u32 = 500_000;

/// A tempo change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tempo {
    pub tick: u64,
    pub micros_per_beat: u32,
}

impl Tempo {
    pub fn new(tick: u64, micros_per_beat: u32) -> Self {
        Self {
            tick,
            micros_per_beat,
        }
    }

    /// Beats per minute
    pub fn bpm(&self) -> f64 {
        60_000_000.0 / self.micros_per_beat as f64
    }

    pub fn seconds_per_beat(&self) -> f64 {
        self.micros_per_beat as f64 / 1_000_000.0
    }
}

/// Maps ticks to seconds for one file
#[derive(Debug, Clone)]
pub struct TempoMap {
    division: u16,
    tempos: Vec<Tempo>,
    /// Seconds at the start of each tempo segment
    starts: Vec<f64>,
}

impl TempoMap {
    /// Create a tempo map
    ///
    /// # Arguments
    /// * `division` - Ticks per quarter note
    /// * `tempos` - Tempo changes in any order. When two share a tick the
    ///   later one in the list wins.
    pub fn new(division: u16, tempos: impl IntoIterator<Item = Tempo>) -> Self {
        let division = if division == 0 {
            warn!("Division of 0 ticks per beat, using 1");
            1
        } else {
            division
        };

        let mut tempos: Vec<Tempo> = tempos.into_iter().collect();
        tempos.sort_by_key(|t| t.tick);

        // Keep the last tempo for each tick
        let mut deduped: Vec<Tempo> = Vec::with_capacity(tempos.len());
        for tempo in tempos {
            match deduped.last_mut() {
                Some(last) if last.tick == tempo.tick => *last = tempo,
                _ => deduped.push(tempo),
            }
        }

        if deduped.is_empty() {
            debug!("No tempo changes, defaulting to 120 BPM");
        }
        if deduped.first().map_or(true, |t| t.tick > 0) {
            deduped.insert(0, Tempo::new(0, DEFAULT_MICROS_PER_BEAT));
        }

        let mut starts = Vec::with_capacity(deduped.len());
        let mut elapsed = 0.0;
        for (i, tempo) in deduped.iter().enumerate() {
            if i > 0 {
                let prev = deduped[i - 1];
                elapsed += (tempo.tick - prev.tick) as f64 / division as f64
                    * prev.seconds_per_beat();
            }
            starts.push(elapsed);
        }

        Self {
            division,
            tempos: deduped,
            starts,
        }
    }

    /// A map with a single constant tempo
    pub fn constant(division: u16, micros_per_beat: u32) -> Self {
        Self::new(division, [Tempo::new(0, micros_per_beat)])
    }

    /// Ticks per quarter note
    pub fn division(&self) -> u16 {
        self.division
    }

    pub fn tempos(&self) -> &[Tempo] {
        &self.tempos
    }

    /// Index of the segment containing `tick`
    fn segment_at(&self, tick: u64) -> usize {
        // The first tempo always sits at tick 0
        self.tempos
            .partition_point(|t| t.tick <= tick)
            .saturating_sub(1)
    }

    /// Seconds elapsed at `tick`
    pub fn seconds_at(&self, tick: u64) -> f64 {
        let i = self.segment_at(tick);
        let tempo = self.tempos[i];
        self.starts[i]
            + (tick - tempo.tick) as f64 / self.division as f64 * tempo.seconds_per_beat()
    }

    /// Tempo in effect strictly before `tick`
    ///
    /// A tempo change landing exactly on `tick` is not yet in effect. At
    /// tick 0 this is the first tempo.
    pub fn tempo_before(&self, tick: u64) -> Tempo {
        if tick == 0 {
            return self.tempos[0];
        }
        self.tempos[self.segment_at(tick - 1)]
    }

    /// Tempo in effect at `seconds`
    pub fn tempo_at_seconds(&self, seconds: f64) -> Tempo {
        let i = self.starts.partition_point(|&s| s <= seconds).saturating_sub(1);
        self.tempos[i]
    }

    /// Length of one beat in ticks
    pub fn beats_to_ticks(&self, beats: f64) -> f64 {
        beats * self.division as f64
    }

    /// Attach wall-clock seconds to every item
    pub fn schedule<E: Ticked + Copy>(&self, items: &[E]) -> Vec<Scheduled<E>> {
        items
            .iter()
            .map(|item| Scheduled::new(self.seconds_at(item.tick()), *item))
            .collect()
    }
}

impl Default for TempoMap {
    fn default() -> Self {
        Self::new(480, [])
    }
}
