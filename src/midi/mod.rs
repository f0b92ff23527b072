//! Decoded MIDI input
//!
//! Channel events arrive already decoded from a standard MIDI file. This
//! module holds the event types, the tick to seconds mapping and the
//! builder that pairs note-on and note-off into note periods.

pub mod bend;
pub mod parser;
pub mod period;
pub mod timebase;

pub use period::{build_note_periods, NotePeriod};
pub use timebase::{Tempo, TempoMap};

/// MIDI channel that carries percussion in General MIDI
pub const PERCUSSION_CHANNEL: u8 = 9;

/// Anything positioned on the MIDI tick timeline
pub trait Ticked {
    /// Absolute tick of this item
    fn tick(&self) -> u64;
}

/// A note-on or note-off event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MidiNoteEvent {
    On {
        tick: u64,
        channel: u8,
        pitch: u8,
        velocity: u8,
    },
    Off {
        tick: u64,
        channel: u8,
        pitch: u8,
    },
}

impl MidiNoteEvent {
    pub fn channel(&self) -> u8 {
        match *self {
            MidiNoteEvent::On { channel, .. } | MidiNoteEvent::Off { channel, .. } => channel,
        }
    }

    pub fn pitch(&self) -> u8 {
        match *self {
            MidiNoteEvent::On { pitch, .. } | MidiNoteEvent::Off { pitch, .. } => pitch,
        }
    }

    /// Velocity of a note-on, 0 for a note-off
    pub fn velocity(&self) -> u8 {
        match *self {
            MidiNoteEvent::On { velocity, .. } => velocity,
            MidiNoteEvent::Off { .. } => 0,
        }
    }

    /// True for a note-on with nonzero velocity
    pub fn is_on(&self) -> bool {
        matches!(self, MidiNoteEvent::On { velocity, .. } if *velocity > 0)
    }

    /// True for a note-off, including a note-on with velocity 0
    pub fn is_off(&self) -> bool {
        !self.is_on()
    }

    /// Rewrite a velocity-0 note-on as a note-off
    pub fn normalized(self) -> Self {
        match self {
            MidiNoteEvent::On {
                tick,
                channel,
                pitch,
                velocity: 0,
            } => MidiNoteEvent::Off {
                tick,
                channel,
                pitch,
            },
            other => other,
        }
    }
}

impl Ticked for MidiNoteEvent {
    fn tick(&self) -> u64 {
        match *self {
            MidiNoteEvent::On { tick, .. } | MidiNoteEvent::Off { tick, .. } => tick,
        }
    }
}

/// Every decoded channel event the animation core consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelEvent {
    Note(MidiNoteEvent),
    PitchBend {
        tick: u64,
        channel: u8,
        /// 14-bit value, 8192 is centered
        value: u16,
    },
    Control {
        tick: u64,
        channel: u8,
        controller: u8,
        value: u8,
    },
    Program {
        tick: u64,
        channel: u8,
        program: u8,
    },
}

impl ChannelEvent {
    pub fn channel(&self) -> u8 {
        match *self {
            ChannelEvent::Note(note) => note.channel(),
            ChannelEvent::PitchBend { channel, .. }
            | ChannelEvent::Control { channel, .. }
            | ChannelEvent::Program { channel, .. } => channel,
        }
    }

    pub fn as_note(&self) -> Option<MidiNoteEvent> {
        match self {
            ChannelEvent::Note(note) => Some(*note),
            _ => None,
        }
    }
}

impl Ticked for ChannelEvent {
    fn tick(&self) -> u64 {
        match *self {
            ChannelEvent::Note(note) => note.tick(),
            ChannelEvent::PitchBend { tick, .. }
            | ChannelEvent::Control { tick, .. }
            | ChannelEvent::Program { tick, .. } => tick,
        }
    }
}

impl From<MidiNoteEvent> for ChannelEvent {
    fn from(note: MidiNoteEvent) -> Self {
        ChannelEvent::Note(note)
    }
}

/// Velocity dampening used by keys, drums and wobbling cymbals
///
/// Maps velocity onto `[0, 1]` with a square root curve so quiet notes
/// still move visibly.
pub fn velocity_dampening(velocity: u8) -> f64 {
    (velocity as f64).sqrt() / 127f64.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_velocity_on_is_off() {
        let event = MidiNoteEvent::On {
            tick: 10,
            channel: 0,
            pitch: 60,
            velocity: 0,
        };
        assert!(event.is_off());
        assert_eq!(
            event.normalized(),
            MidiNoteEvent::Off {
                tick: 10,
                channel: 0,
                pitch: 60
            }
        );
    }

    #[test]
    fn test_velocity_dampening_range() {
        assert_eq!(velocity_dampening(0), 0.0);
        assert!((velocity_dampening(127) - 1.0).abs() < 1e-12);
        assert!(velocity_dampening(32) > 32.0 / 127.0);
    }

    #[test]
    fn test_channel_event_accessors() {
        let event = ChannelEvent::Control {
            tick: 96,
            channel: 3,
            controller: 1,
            value: 64,
        };
        assert_eq!(event.tick(), 96);
        assert_eq!(event.channel(), 3);
        assert!(event.as_note().is_none());
    }
}
