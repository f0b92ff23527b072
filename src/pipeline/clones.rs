//! Polyphony clones for monophonic instruments
//!
//! A trumpet can only sound one note, so overlapping notes are spread over
//! a fixed pool of clones. Each clone owns the periods assigned to it and a
//! cursor over them. Clones are never destroyed; an idle clone other than
//! the first is simply hidden.

use log::debug;

use super::queue::EventCursor;
use crate::midi::NotePeriod;

/// Result of spreading periods over a clone pool
#[derive(Debug, Clone, Default)]
pub struct Distribution {
    /// Periods per clone, each sorted by start
    pub lanes: Vec<Vec<NotePeriod>>,
    /// Periods that did not fit in the pool
    pub dropped: usize,
}

/// Spread periods over at most `pool_size` clones
///
/// Periods are taken in order of start tick, then pitch. Each goes to the
/// lowest-index clone whose last period ends no later than
/// `start_tick + tolerance`. A new clone opens when none fits and the pool
/// has room, otherwise the period is dropped.
///
/// # Arguments
/// * `periods` - Periods of one instrument
/// * `pool_size` - Maximum number of clones
/// * `tolerance` - Overlap in ticks still treated as sequential, usually
///   `division / 8`
pub fn distribute(periods: &[NotePeriod], pool_size: usize, tolerance: u64) -> Distribution {
    let mut sorted = periods.to_vec();
    sorted.sort_by(|a, b| a.start_tick.cmp(&b.start_tick).then(a.pitch.cmp(&b.pitch)));

    let mut distribution = Distribution::default();
    for period in sorted {
        let free = distribution.lanes.iter().position(|lane| {
            lane.last()
                .map_or(true, |last| last.end_tick <= period.start_tick + tolerance)
        });

        match free {
            Some(lane) => distribution.lanes[lane].push(period),
            None if distribution.lanes.len() < pool_size => distribution.lanes.push(vec![period]),
            None => {
                debug!(
                    "Clone pool of {} full, not showing pitch {} at tick {}",
                    pool_size, period.pitch, period.start_tick
                );
                distribution.dropped += 1;
            }
        }
    }
    distribution
}

/// Whether a clone is currently holding a note
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneState {
    Idle,
    Sounding,
}

/// Timing side of one clone: its periods and what it is playing now
#[derive(Debug, Clone)]
pub struct CloneVoice {
    index: usize,
    cursor: EventCursor<NotePeriod>,
    current: Option<NotePeriod>,
    visible: bool,
}

impl CloneVoice {
    pub fn new(index: usize, periods: Vec<NotePeriod>) -> Self {
        Self {
            index,
            cursor: EventCursor::new(periods),
            current: None,
            visible: index == 0,
        }
    }

    /// Move to `now`
    ///
    /// Returns the period that started during this step, if any. When
    /// several started at once only the last one counts.
    pub fn advance(&mut self, now: f64) -> Option<NotePeriod> {
        let started = self.cursor.drain_last_only(now).copied();
        if started.is_some() {
            self.current = started;
        }
        if self.current.is_some_and(|p| p.end_time <= now) {
            self.current = None;
        }
        started
    }

    /// Reposition for a jump to `now`
    pub fn seek(&mut self, now: f64) {
        self.cursor.seek(now);
        self.current = self.cursor.prev().copied().filter(|p| p.end_time > now);
    }

    pub fn state(&self) -> CloneState {
        if self.current.is_some() {
            CloneState::Sounding
        } else {
            CloneState::Idle
        }
    }

    pub fn is_sounding(&self) -> bool {
        self.state() == CloneState::Sounding
    }

    pub fn current(&self) -> Option<&NotePeriod> {
        self.current.as_ref()
    }

    /// Next period not yet started
    pub fn upcoming(&self) -> Option<&NotePeriod> {
        self.cursor.peek()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Recompute visibility against the parent instrument's
    ///
    /// The first clone shows whenever its parent does. Any other clone only
    /// shows while sounding.
    pub fn update_visibility(&mut self, parent_visible: bool) -> bool {
        self.visible = parent_visible && (self.index == 0 || self.is_sounding());
        self.visible
    }

    pub fn periods(&self) -> &[NotePeriod] {
        self.cursor.items()
    }
}

/// Placement of visible clones for one frame
///
/// Built once per frame from every clone's visibility, so placing a clone
/// does not need to look at its siblings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloneLayout {
    slots: Vec<Option<usize>>,
    visible: usize,
}

impl CloneLayout {
    /// Build from visibility flags in clone index order
    pub fn compute(visibility: impl IntoIterator<Item = bool>) -> Self {
        let mut visible = 0;
        let slots = visibility
            .into_iter()
            .map(|shown| {
                shown.then(|| {
                    visible += 1;
                    visible - 1
                })
            })
            .collect();
        Self { slots, visible }
    }

    /// Position of a clone among the visible ones, 0 when hidden
    pub fn index_for_moving(&self, clone: usize) -> usize {
        self.slots.get(clone).copied().flatten().unwrap_or(0)
    }

    pub fn visible_count(&self) -> usize {
        self.visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::{build_note_periods, MidiNoteEvent, TempoMap};

    fn periods(spans: &[(u64, u64, u8)]) -> Vec<NotePeriod> {
        let mut events = Vec::new();
        for &(start, end, pitch) in spans {
            events.push(MidiNoteEvent::On {
                tick: start,
                channel: 0,
                pitch,
                velocity: 100,
            });
            events.push(MidiNoteEvent::Off {
                tick: end,
                channel: 0,
                pitch,
            });
        }
        events.sort_by_key(|e| (crate::midi::Ticked::tick(e), e.is_on()));
        build_note_periods(&events, &TempoMap::constant(480, 500_000))
    }

    #[test]
    fn test_sequential_notes_share_a_clone() {
        let dist = distribute(&periods(&[(0, 480, 60), (480, 960, 64)]), 4, 60);
        assert_eq!(dist.lanes.len(), 1);
        assert_eq!(dist.lanes[0].len(), 2);
    }

    #[test]
    fn test_overlap_within_tolerance_is_sequential() {
        let dist = distribute(&periods(&[(0, 500, 60), (480, 960, 64)]), 4, 60);
        assert_eq!(dist.lanes.len(), 1);
    }

    #[test]
    fn test_chord_opens_clones_and_overflow_drops() {
        let dist = distribute(&periods(&[(0, 480, 60), (0, 480, 64), (0, 480, 67)]), 2, 60);
        assert_eq!(dist.lanes.len(), 2);
        assert_eq!(dist.lanes[0][0].pitch, 60);
        assert_eq!(dist.lanes[1][0].pitch, 64);
        assert_eq!(dist.dropped, 1);
    }

    #[test]
    fn test_full_pool_reuses_freed_clones() {
        let dist = distribute(
            &periods(&[
                (0, 480, 60),
                (0, 480, 64),
                (0, 480, 67),
                (480, 960, 72),
                (480, 960, 74),
            ]),
            2,
            0,
        );
        assert_eq!(dist.lanes.len(), 2);
        assert_eq!(dist.dropped, 1);
        let pitches: Vec<Vec<u8>> = dist
            .lanes
            .iter()
            .map(|lane| lane.iter().map(|p| p.pitch).collect())
            .collect();
        assert_eq!(pitches, vec![vec![60, 72], vec![64, 74]]);
    }

    #[test]
    fn test_lowest_index_clone_wins() {
        let dist = distribute(
            &periods(&[(0, 480, 60), (0, 240, 64), (480, 960, 67)]),
            4,
            0,
        );
        // Both clones are free at 480, the first one takes it
        assert_eq!(dist.lanes[0].len(), 2);
        assert_eq!(dist.lanes[0][1].pitch, 67);
    }

    #[test]
    fn test_voice_state_machine() {
        let lane = periods(&[(0, 480, 60), (960, 1440, 62)]);
        let mut voice = CloneVoice::new(1, lane);

        assert_eq!(voice.state(), CloneState::Idle);
        assert_eq!(voice.advance(0.0).map(|p| p.pitch), Some(60));
        assert_eq!(voice.state(), CloneState::Sounding);
        assert!(voice.update_visibility(true));

        assert!(voice.advance(0.25).is_none());
        assert!(voice.is_sounding());

        voice.advance(0.5);
        assert_eq!(voice.state(), CloneState::Idle);
        assert!(!voice.update_visibility(true));
        assert_eq!(voice.upcoming().map(|p| p.pitch), Some(62));
    }

    #[test]
    fn test_first_clone_visibility_follows_parent() {
        let mut voice = CloneVoice::new(0, Vec::new());
        assert!(voice.update_visibility(true));
        assert!(!voice.update_visibility(false));
    }

    #[test]
    fn test_seek_restores_current() {
        let lane = periods(&[(0, 960, 60), (960, 1920, 62)]);
        let mut voice = CloneVoice::new(0, lane);
        voice.seek(0.75);
        assert_eq!(voice.current().map(|p| p.pitch), Some(60));
        voice.seek(1.25);
        assert_eq!(voice.current().map(|p| p.pitch), Some(62));
        voice.seek(0.0);
        assert!(voice.current().is_none());
        assert_eq!(voice.advance(0.0).map(|p| p.pitch), Some(60));
    }

    #[test]
    fn test_layout_index_for_moving() {
        let layout = CloneLayout::compute([true, false, true, true]);
        assert_eq!(layout.visible_count(), 3);
        assert_eq!(layout.index_for_moving(0), 0);
        assert_eq!(layout.index_for_moving(1), 0);
        assert_eq!(layout.index_for_moving(2), 1);
        assert_eq!(layout.index_for_moving(3), 2);
        assert_eq!(layout.index_for_moving(9), 0);
    }
}
