//! Note periods
//!
//! A note period is one sounding note: a note-on paired with the note-off
//! that ends it, with both ends converted to seconds.

use std::collections::VecDeque;

use log::debug;

use super::timebase::TempoMap;
use super::{MidiNoteEvent, Ticked};

/// One sounding note
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NotePeriod {
    pub pitch: u8,
    pub start_time: f64,
    pub end_time: f64,
    pub start_tick: u64,
    pub end_tick: u64,
    pub source_on: MidiNoteEvent,
    pub source_off: MidiNoteEvent,
}

impl NotePeriod {
    pub fn velocity(&self) -> u8 {
        self.source_on.velocity()
    }

    pub fn channel(&self) -> u8 {
        self.source_on.channel()
    }

    /// Length in seconds
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// True while `start_time <= time < end_time`
    pub fn is_playing_at(&self, time: f64) -> bool {
        self.start_time <= time && time < self.end_time
    }

    /// Fraction of the period still to come at `now`, clamped to `[0, 1]`
    pub fn remaining_ratio(&self, now: f64) -> f64 {
        let duration = self.duration();
        if duration <= 0.0 {
            return 0.0;
        }
        ((self.end_time - now) / duration).clamp(0.0, 1.0)
    }
}

/// Pair note-ons with note-offs
///
/// Each note-on takes the nearest later note-off of the same pitch that no
/// earlier note-on has claimed. Unmatched events and zero-length pairs are
/// dropped. The result is sorted by start tick, ties broken by pitch, with
/// exact duplicates removed.
///
/// # Arguments
/// * `events` - Note events of one voice in chronological order
/// * `tempo` - Tempo map used to convert ticks to seconds
pub fn build_note_periods(events: &[MidiNoteEvent], tempo: &TempoMap) -> Vec<NotePeriod> {
    let mut pending: Vec<VecDeque<MidiNoteEvent>> = vec![VecDeque::new(); 128];
    let mut periods = Vec::new();
    let mut dropped = 0usize;

    for event in events.iter().map(|e| e.normalized()) {
        let slot = &mut pending[(event.pitch() & 0x7f) as usize];
        if event.is_on() {
            slot.push_back(event);
            continue;
        }

        let Some(on) = slot.pop_front() else {
            debug!(
                "Note-off without note-on: pitch {} at tick {}",
                event.pitch(),
                event.tick()
            );
            dropped += 1;
            continue;
        };

        if on.tick() >= event.tick() {
            debug!(
                "Zero-length note: pitch {} at tick {}",
                event.pitch(),
                event.tick()
            );
            dropped += 1;
            continue;
        }

        periods.push(NotePeriod {
            pitch: event.pitch(),
            start_time: tempo.seconds_at(on.tick()),
            end_time: tempo.seconds_at(event.tick()),
            start_tick: on.tick(),
            end_tick: event.tick(),
            source_on: on,
            source_off: event,
        });
    }

    let unmatched: usize = pending.iter().map(VecDeque::len).sum();
    if unmatched > 0 {
        debug!("{} note-on events never released", unmatched);
    }

    periods.sort_by(|a, b| {
        a.start_tick
            .cmp(&b.start_tick)
            .then(a.pitch.cmp(&b.pitch))
            .then(a.end_tick.cmp(&b.end_tick))
    });
    periods.dedup_by(|a, b| {
        a.start_tick == b.start_tick && a.end_tick == b.end_tick && a.pitch == b.pitch
    });

    if dropped + unmatched > 0 {
        debug!(
            "Built {} note periods, dropped {} events",
            periods.len(),
            dropped + unmatched
        );
    }
    periods
}

/// A run of overlapping note periods
#[derive(Debug, Clone, PartialEq)]
pub struct NotePeriodGroup {
    pub periods: Vec<NotePeriod>,
}

impl NotePeriodGroup {
    pub fn start_time(&self) -> f64 {
        self.periods.first().map_or(0.0, |p| p.start_time)
    }

    pub fn end_time(&self) -> f64 {
        self.periods
            .iter()
            .map(|p| p.end_time)
            .fold(f64::NEG_INFINITY, f64::max)
            .max(self.start_time())
    }

    pub fn duration(&self) -> f64 {
        self.end_time() - self.start_time()
    }
}

/// Split sorted periods into groups where each period overlaps the group
/// that came before it
pub fn contiguous_groups(periods: &[NotePeriod]) -> Vec<NotePeriodGroup> {
    let mut groups: Vec<NotePeriodGroup> = Vec::new();
    let mut group_end = f64::NEG_INFINITY;

    for period in periods {
        match groups.last_mut() {
            Some(group) if period.start_time < group_end => {
                group.periods.push(*period);
                group_end = group_end.max(period.end_time);
            }
            _ => {
                groups.push(NotePeriodGroup {
                    periods: vec![*period],
                });
                group_end = period.end_time;
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on(tick: u64, pitch: u8) -> MidiNoteEvent {
        MidiNoteEvent::On {
            tick,
            channel: 0,
            pitch,
            velocity: 100,
        }
    }

    fn off(tick: u64, pitch: u8) -> MidiNoteEvent {
        MidiNoteEvent::Off {
            tick,
            channel: 0,
            pitch,
        }
    }

    fn map() -> TempoMap {
        TempoMap::constant(480, 500_000)
    }

    #[test]
    fn test_simple_pairing() {
        let events = [on(0, 60), off(480, 60), on(480, 64), off(960, 64)];
        let periods = build_note_periods(&events, &map());
        assert_eq!(periods.len(), 2);
        assert_eq!(periods[0].pitch, 60);
        assert!((periods[0].end_time - 0.5).abs() < 1e-12);
        assert_eq!(periods[1].pitch, 64);
        assert!((periods[1].start_time - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_sorted_and_positive_length() {
        let events = [
            on(0, 67),
            on(0, 60),
            off(100, 60),
            on(100, 60),
            off(200, 67),
            off(240, 60),
            on(300, 62),
            off(300, 62),
        ];
        let periods = build_note_periods(&events, &map());
        assert_eq!(periods.len(), 3);
        for pair in periods.windows(2) {
            assert!(pair[0].start_tick <= pair[1].start_tick);
        }
        for p in &periods {
            assert!(p.start_time < p.end_time);
            assert!(p.start_tick < p.end_tick);
        }
        // Same start tick is ordered by pitch
        assert_eq!(periods[0].pitch, 60);
        assert_eq!(periods[1].pitch, 67);
    }

    #[test]
    fn test_zero_velocity_on_closes_note() {
        let events = [
            on(0, 60),
            MidiNoteEvent::On {
                tick: 240,
                channel: 0,
                pitch: 60,
                velocity: 0,
            },
        ];
        let periods = build_note_periods(&events, &map());
        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].end_tick, 240);
        assert!(periods[0].source_off.is_off());
    }

    #[test]
    fn test_unmatched_events_are_dropped() {
        let events = [off(0, 50), on(10, 60), off(20, 61)];
        assert!(build_note_periods(&events, &map()).is_empty());
    }

    #[test]
    fn test_duplicates_removed() {
        let events = [on(0, 60), on(0, 60), off(100, 60), off(100, 60)];
        let periods = build_note_periods(&events, &map());
        assert_eq!(periods.len(), 1);
    }

    #[test]
    fn test_remaining_ratio() {
        let period = NotePeriod {
            pitch: 60,
            start_time: 1.0,
            end_time: 3.0,
            start_tick: 960,
            end_tick: 2880,
            source_on: on(960, 60),
            source_off: off(2880, 60),
        };
        assert!((period.remaining_ratio(1.5) - 0.75).abs() < 1e-12);
        assert_eq!(period.remaining_ratio(3.0), 0.0);
        assert_eq!(period.remaining_ratio(0.0), 1.0);
        assert!(period.is_playing_at(1.0));
        assert!(!period.is_playing_at(3.0));
    }

    #[test]
    fn test_contiguous_groups() {
        let events = [
            on(0, 60),
            on(100, 62),
            off(200, 60),
            off(300, 62),
            on(480, 64),
            off(960, 64),
        ];
        let periods = build_note_periods(&events, &map());
        let groups = contiguous_groups(&periods);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].periods.len(), 2);
        assert!((groups[0].end_time() - map().seconds_at(300)).abs() < 1e-12);
        assert_eq!(groups[1].periods.len(), 1);
    }
}
