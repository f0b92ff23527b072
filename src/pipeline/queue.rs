//! Cursors over immutable timed events
//!
//! Events and note periods are built once and shared. Each reader keeps its
//! own cursor, so every item is handed out exactly once per pass and a seek
//! only moves an index.

use std::sync::Arc;

use crate::midi::{ChannelEvent, MidiNoteEvent, NotePeriod, Ticked};

/// Lead time for releasing note-offs early, one frame at 30 fps
pub const OFF_GAP_SECONDS: f64 = 1.0 / 30.0;

/// Anything placed on the wall-clock timeline
pub trait Timed {
    /// Seconds at which this item becomes due
    fn time(&self) -> f64;

    /// Seconds at which this item stops mattering
    fn end_time(&self) -> f64 {
        self.time()
    }

    /// True for items that end something, such as note-offs
    fn is_release(&self) -> bool {
        false
    }
}

/// An event with its time in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scheduled<E> {
    pub time: f64,
    pub event: E,
}

impl<E> Scheduled<E> {
    pub fn new(time: f64, event: E) -> Self {
        Self { time, event }
    }
}

impl<E: Ticked> Ticked for Scheduled<E> {
    fn tick(&self) -> u64 {
        self.event.tick()
    }
}

impl Timed for Scheduled<MidiNoteEvent> {
    fn time(&self) -> f64 {
        self.time
    }

    fn is_release(&self) -> bool {
        self.event.is_off()
    }
}

impl Timed for Scheduled<ChannelEvent> {
    fn time(&self) -> f64 {
        self.time
    }

    fn is_release(&self) -> bool {
        matches!(self.event, ChannelEvent::Note(note) if note.is_off())
    }
}

impl Timed for NotePeriod {
    fn time(&self) -> f64 {
        self.start_time
    }

    fn end_time(&self) -> f64 {
        self.end_time
    }
}

/// Forward-only reader over a shared, time-sorted slice
#[derive(Debug, Clone)]
pub struct EventCursor<T> {
    items: Arc<[T]>,
    /// Index of the next item to hand out
    index: usize,
}

impl<T: Timed> EventCursor<T> {
    /// Create a cursor at the start of `items`
    ///
    /// # Arguments
    /// * `items` - Items sorted ascending by [`Timed::time`]
    pub fn new(items: impl Into<Arc<[T]>>) -> Self {
        Self {
            items: items.into(),
            index: 0,
        }
    }

    /// Pop every leading item due at or before `now`
    ///
    /// Stops at the first future item, so the cost is the number of items
    /// returned.
    pub fn drain(&mut self, now: f64) -> &[T] {
        let start = self.index;
        while self.index < self.items.len() && self.items[self.index].time() <= now {
            self.index += 1;
        }
        &self.items[start..self.index]
    }

    /// Like [`drain`](Self::drain) but releases are popped
    /// [`OFF_GAP_SECONDS`] early, so a repeated note shows a gap between
    /// its two presses
    pub fn drain_with_off_gap(&mut self, now: f64) -> &[T] {
        let start = self.index;
        while let Some(item) = self.items.get(self.index) {
            let due = item.time() <= now || (item.is_release() && item.time() - OFF_GAP_SECONDS <= now);
            if !due {
                break;
            }
            self.index += 1;
        }
        &self.items[start..self.index]
    }

    /// Drain and keep only the last popped item
    pub fn drain_last_only(&mut self, now: f64) -> Option<&T> {
        self.drain(now).last()
    }

    /// Next item without consuming it
    pub fn peek(&self) -> Option<&T> {
        self.items.get(self.index)
    }

    /// Most recently consumed item
    pub fn prev(&self) -> Option<&T> {
        self.index.checked_sub(1).and_then(|i| self.items.get(i))
    }

    /// Items not yet handed out
    pub fn remaining(&self) -> &[T] {
        &self.items[self.index..]
    }

    /// Items already handed out
    pub fn consumed(&self) -> &[T] {
        &self.items[..self.index]
    }

    pub fn is_exhausted(&self) -> bool {
        self.index >= self.items.len()
    }

    /// Every item, consumed or not
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Reposition so the next item is the first with `time >= now`
    ///
    /// Works for jumps in either direction.
    pub fn seek(&mut self, now: f64) {
        self.index = self.items.partition_point(|item| item.time() < now);
    }

    /// Return to the first item
    pub fn rewind(&mut self) {
        self.index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(time: f64, on: bool) -> Scheduled<MidiNoteEvent> {
        let tick = (time * 960.0) as u64;
        let event = if on {
            MidiNoteEvent::On {
                tick,
                channel: 0,
                pitch: 60,
                velocity: 90,
            }
        } else {
            MidiNoteEvent::Off {
                tick,
                channel: 0,
                pitch: 60,
            }
        };
        Scheduled::new(time, event)
    }

    #[test]
    fn test_drain_partitions_by_time() {
        let events = vec![note(0.0, true), note(0.5, false), note(0.5, true), note(1.0, false)];
        let mut cursor = EventCursor::new(events);

        let popped = cursor.drain(0.5);
        assert_eq!(popped.len(), 3);
        assert!(popped.iter().all(|e| e.time <= 0.5));
        assert!(cursor.remaining().iter().all(|e| e.time > 0.5));
        assert_eq!(cursor.consumed().len(), 3);

        // Nothing new before the next event
        assert!(cursor.drain(0.75).is_empty());
        assert_eq!(cursor.drain(2.0).len(), 1);
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn test_off_gap_boundary() {
        let t = 2.0;
        let mut cursor = EventCursor::new(vec![note(t, false)]);
        assert!(cursor.drain_with_off_gap(t - 0.04).is_empty());
        assert_eq!(cursor.drain_with_off_gap(t - 0.033).len(), 1);
    }

    #[test]
    fn test_off_gap_does_not_apply_to_on() {
        let t = 2.0;
        let mut cursor = EventCursor::new(vec![note(t, true)]);
        assert!(cursor.drain_with_off_gap(t - 0.01).is_empty());
        assert_eq!(cursor.drain_with_off_gap(t).len(), 1);
    }

    #[test]
    fn test_drain_last_only() {
        let mut cursor = EventCursor::new(vec![note(0.0, true), note(0.1, false), note(0.2, true)]);
        let last = cursor.drain_last_only(0.15).copied();
        assert_eq!(last.map(|e| e.time), Some(0.1));
        assert_eq!(cursor.peek().map(|e| e.time), Some(0.2));
        assert_eq!(cursor.prev().map(|e| e.time), Some(0.1));
        assert!(cursor.drain_last_only(0.15).is_none());
    }

    #[test]
    fn test_seek_both_directions() {
        let events: Vec<_> = (0..10).map(|i| note(i as f64, i % 2 == 0)).collect();
        let mut cursor = EventCursor::new(events);

        cursor.seek(4.5);
        assert_eq!(cursor.peek().map(|e| e.time), Some(5.0));
        cursor.seek(2.0);
        assert_eq!(cursor.peek().map(|e| e.time), Some(2.0));
        assert_eq!(cursor.consumed().len(), 2);
        cursor.seek(100.0);
        assert!(cursor.is_exhausted());
        cursor.rewind();
        assert_eq!(cursor.remaining().len(), 10);
    }

    #[test]
    fn test_shared_items_independent_cursors() {
        let items: Arc<[Scheduled<MidiNoteEvent>]> = vec![note(0.0, true), note(1.0, false)].into();
        let mut a = EventCursor::new(items.clone());
        let mut b = EventCursor::new(items);
        assert_eq!(a.drain(1.0).len(), 2);
        assert_eq!(b.drain(0.0).len(), 1);
        assert_eq!(b.remaining().len(), 1);
    }
}
