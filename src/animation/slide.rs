//! Trombone slide
//!
//! The slide jumps to the closest playable position for the sounding note
//! and glides toward the next note shortly before it starts.

use std::ops::RangeInclusive;

use crate::fingering::SlideTable;
use crate::midi::NotePeriod;

/// Pitches the slide will move for
pub const SLIDE_RANGE: RangeInclusive<u8> = 21..=80;
/// How far ahead the slide starts moving toward the next note, in seconds
pub const PRE_POSITION_WINDOW: f64 = 1.0;
/// Slide translation per position
const UNITS_PER_POSITION: f64 = 3.333333;

/// Slide translation for a position
pub fn slide_translation(position: f64) -> f64 {
    UNITS_PER_POSITION * position - 1.0
}

/// Position for a slide translation
pub fn position_from_translation(translation: f64) -> f64 {
    0.3 * (translation + 1.0)
}

/// Candidate closest to `current`, the first in table order on a tie
pub fn select_position(candidates: &[u8], current: f64) -> Option<u8> {
    candidates.iter().copied().min_by(|&a, &b| {
        let da = (a as f64 - current).abs();
        let db = (b as f64 - current).abs();
        da.total_cmp(&db)
    })
}

/// Slide state of one trombone clone
#[derive(Debug, Clone)]
pub struct Slide {
    position: f64,
}

impl Default for Slide {
    fn default() -> Self {
        Self { position: 1.0 }
    }
}

impl Slide {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn translation(&self) -> f64 {
        slide_translation(self.position)
    }

    /// Advance by one frame
    ///
    /// # Arguments
    /// * `now` - Current time in seconds
    /// * `delta` - Seconds since the previous frame
    /// * `current` - Period the clone is sounding, if any
    /// * `upcoming` - Next period of the clone, if any
    /// * `table` - Slide positions by pitch
    pub fn update(
        &mut self,
        now: f64,
        delta: f64,
        current: Option<&NotePeriod>,
        upcoming: Option<&NotePeriod>,
        table: &SlideTable,
    ) -> f64 {
        if let Some(period) = current {
            if let Some(target) = self.target_for(period.pitch, table) {
                self.position = target as f64;
            }
            return self.position;
        }

        if let Some(next) = upcoming {
            let gap = next.start_time - now;
            if gap > delta && gap <= PRE_POSITION_WINDOW {
                if let Some(target) = self.target_for(next.pitch, table) {
                    self.position += (target as f64 - self.position) / gap * delta;
                }
            }
        }
        self.position
    }

    fn target_for(&self, pitch: u8, table: &SlideTable) -> Option<u8> {
        if !SLIDE_RANGE.contains(&pitch) {
            return None;
        }
        table
            .positions(pitch)
            .and_then(|candidates| select_position(candidates, self.position))
    }

    pub fn reset(&mut self) {
        self.position = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::MidiNoteEvent;
    use smallvec::smallvec;

    fn table() -> SlideTable {
        let mut table = SlideTable::default();
        table.insert(53, smallvec![1, 6]);
        table.insert(52, smallvec![2, 7]);
        table.insert(46, smallvec![1]);
        table
    }

    fn period(pitch: u8, start: f64, end: f64) -> NotePeriod {
        NotePeriod {
            pitch,
            start_time: start,
            end_time: end,
            start_tick: (start * 1000.0) as u64,
            end_tick: (end * 1000.0) as u64,
            source_on: MidiNoteEvent::On {
                tick: 0,
                channel: 0,
                pitch,
                velocity: 100,
            },
            source_off: MidiNoteEvent::Off {
                tick: 0,
                channel: 0,
                pitch,
            },
        }
    }

    #[test]
    fn test_select_closest() {
        assert_eq!(select_position(&[1, 6], 3.0), Some(1));
        assert_eq!(select_position(&[1, 6], 4.0), Some(6));
        assert_eq!(select_position(&[], 4.0), None);
    }

    #[test]
    fn test_select_tie_takes_first() {
        assert_eq!(select_position(&[2, 4], 3.0), Some(2));
        assert_eq!(select_position(&[4, 2], 3.0), Some(4));
    }

    #[test]
    fn test_translation_round_trip() {
        for pos in [1.0, 3.5, 7.0] {
            let z = slide_translation(pos);
            assert!((position_from_translation(z) - pos).abs() < 1e-5);
        }
    }

    #[test]
    fn test_jumps_to_sounding_note() {
        let mut slide = Slide::new();
        let p = period(52, 0.0, 1.0);
        assert_eq!(slide.update(0.5, 0.016, Some(&p), None, &table()), 2.0);
    }

    #[test]
    fn test_unmapped_pitch_keeps_position() {
        let mut slide = Slide::new();
        let p = period(52, 0.0, 1.0);
        slide.update(0.0, 0.016, Some(&p), None, &table());
        let unknown = period(90, 1.0, 2.0);
        assert_eq!(slide.update(1.5, 0.016, Some(&unknown), None, &table()), 2.0);
    }

    #[test]
    fn test_pre_positions_toward_next_note() {
        let mut slide = Slide::new();
        let next = period(52, 1.0, 2.0);

        // Outside the window nothing moves
        assert_eq!(slide.update(-0.5, 0.1, None, Some(&next), &table()), 1.0);

        // Half a second out, one tenth of a second covers a fifth of the way
        let pos = slide.update(0.5, 0.1, None, Some(&next), &table());
        assert!((pos - 1.2).abs() < 1e-12);
    }
}
