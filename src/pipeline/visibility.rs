//! Instrument-level visibility
//!
//! An instrument stays on stage while it plays and for a short while around
//! its notes, so performers do not flicker in and out between phrases.

use serde::{Deserialize, Serialize};

use super::queue::{EventCursor, Timed};

/// How long an instrument stays visible around its notes, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityWindows {
    /// Show this long before the first note of a phrase
    pub show_before: f64,
    /// Stay visible across silences up to this long
    pub show_between: f64,
    /// Stay visible this long after the last note of a phrase
    pub show_after: f64,
}

impl Default for VisibilityWindows {
    fn default() -> Self {
        Self {
            show_before: 1.0,
            show_between: 7.0,
            show_after: 2.0,
        }
    }
}

/// Tracks whether an instrument should be on stage
///
/// Reads its own cursor over the instrument's items, so it never competes
/// with the cursors that drive animation.
#[derive(Debug, Clone)]
pub struct VisibilityTracker<T> {
    cursor: EventCursor<T>,
    windows: VisibilityWindows,
    /// Latest end time of everything already started
    last_end: Option<f64>,
}

impl<T: Timed> VisibilityTracker<T> {
    pub fn new(cursor: EventCursor<T>, windows: VisibilityWindows) -> Self {
        Self {
            cursor,
            windows,
            last_end: None,
        }
    }

    /// Advance to `time` and report visibility
    pub fn update(&mut self, time: f64) -> bool {
        for item in self.cursor.drain(time) {
            let end = item.end_time();
            self.last_end = Some(self.last_end.map_or(end, |e: f64| e.max(end)));
        }
        self.is_visible_at(time)
    }

    fn is_visible_at(&self, time: f64) -> bool {
        let next_start = self.cursor.peek().map(Timed::time);

        if let Some(end) = self.last_end {
            if end > time {
                return true;
            }
            if time - end <= self.windows.show_after {
                return true;
            }
            if let Some(next) = next_start {
                if next - end <= self.windows.show_between {
                    return true;
                }
            }
        }

        next_start.is_some_and(|next| next - time <= self.windows.show_before)
    }

    /// Reposition for a jump to `time`
    pub fn seek(&mut self, time: f64) {
        self.cursor.seek(time);
        self.last_end = self
            .cursor
            .consumed()
            .iter()
            .map(Timed::end_time)
            .fold(None, |acc: Option<f64>, end| Some(acc.map_or(end, |a| a.max(end))));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::{build_note_periods, MidiNoteEvent, NotePeriod, TempoMap};

    /// Notes at 10-11 s and 12-13 s, then 30-31 s
    fn periods() -> Vec<NotePeriod> {
        let map = TempoMap::constant(1000, 1_000_000);
        let mut events = Vec::new();
        for (start, end) in [(10_000, 11_000), (12_000, 13_000), (30_000, 31_000)] {
            events.push(MidiNoteEvent::On {
                tick: start,
                channel: 0,
                pitch: 60,
                velocity: 80,
            });
            events.push(MidiNoteEvent::Off {
                tick: end,
                channel: 0,
                pitch: 60,
            });
        }
        build_note_periods(&events, &map)
    }

    fn tracker() -> VisibilityTracker<NotePeriod> {
        VisibilityTracker::new(EventCursor::new(periods()), VisibilityWindows::default())
    }

    #[test]
    fn test_hidden_until_show_before() {
        let mut t = tracker();
        assert!(!t.update(0.0));
        assert!(!t.update(8.5));
        assert!(t.update(9.0));
    }

    #[test]
    fn test_visible_while_playing_and_across_short_gap() {
        let mut t = tracker();
        assert!(t.update(10.5));
        assert!(t.update(11.5));
        assert!(t.update(12.5));
    }

    #[test]
    fn test_show_after_then_hidden() {
        let mut t = tracker();
        t.update(12.5);
        assert!(t.update(14.9));
        assert!(!t.update(15.5));
        assert!(t.update(29.5));
    }

    #[test]
    fn test_seek_rebuilds_last_end() {
        let mut t = tracker();
        t.seek(14.0);
        assert!(t.update(14.0));
        t.seek(0.0);
        assert!(!t.update(0.0));
    }
}
