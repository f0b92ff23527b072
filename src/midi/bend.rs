//! Pitch bend and modulation
//!
//! Tracks pitch wheel, modulation wheel and the registered parameters that
//! scale them, and smooths the result into a bend in semitones.

use super::ChannelEvent;
use crate::pipeline::queue::{EventCursor, Scheduled};

const CC_MODULATION: u8 = 1;
const CC_DATA_ENTRY_MSB: u8 = 6;
const CC_DATA_ENTRY_LSB: u8 = 38;
const CC_RPN_LSB: u8 = 100;
const CC_RPN_MSB: u8 = 101;
const CC_RESET_ALL: u8 = 121;

/// Registered parameter for pitch bend range
const RPN_BEND_SENSITIVITY: (u8, u8) = (0, 0);
/// Registered parameter for modulation depth range
const RPN_MODULATION_RANGE: (u8, u8) = (0, 5);

const DEFAULT_SENSITIVITY: f64 = 2.0;
const DEFAULT_MODULATION_RANGE: f64 = 0.5;
/// Vibrato speed in radians per second
const VIBRATO_SPEED: f64 = 50.0;

/// Eases a value toward a target
#[derive(Debug, Clone)]
pub struct NumberSmoother {
    value: f64,
    /// Fraction of the distance covered per second
    smoothness: f64,
}

impl NumberSmoother {
    pub fn new(value: f64, smoothness: f64) -> Self {
        Self { value, smoothness }
    }

    pub fn tick(&mut self, delta: f64, target: f64) -> f64 {
        let step = (delta * self.smoothness).clamp(0.0, 1.0);
        self.value += (target - self.value) * step;
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn set(&mut self, value: f64) {
        self.value = value;
    }
}

/// Bend state of one channel
#[derive(Debug, Clone)]
pub struct PitchBendController {
    events: EventCursor<Scheduled<ChannelEvent>>,
    /// Wheel offset from center, -8192 to 8191
    wheel: i32,
    sensitivity: f64,
    modulation: u8,
    modulation_range: f64,
    rpn: (Option<u8>, Option<u8>),
    smoother: NumberSmoother,
}

impl PitchBendController {
    /// Create a controller over one channel's events
    ///
    /// Notes and program changes are ignored.
    pub fn new(events: &[Scheduled<ChannelEvent>], smoothness: f64) -> Self {
        let events: Vec<_> = events
            .iter()
            .filter(|e| {
                matches!(
                    e.event,
                    ChannelEvent::PitchBend { .. } | ChannelEvent::Control { .. }
                )
            })
            .copied()
            .collect();
        Self {
            events: EventCursor::new(events),
            wheel: 0,
            sensitivity: DEFAULT_SENSITIVITY,
            modulation: 0,
            modulation_range: DEFAULT_MODULATION_RANGE,
            rpn: (None, None),
            smoother: NumberSmoother::new(0.0, smoothness),
        }
    }

    fn apply(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::PitchBend { value, .. } => self.wheel = value as i32 - 8192,
            ChannelEvent::Control {
                controller, value, ..
            } => self.control(controller, value),
            _ => {}
        }
    }

    fn control(&mut self, controller: u8, value: u8) {
        let rpn = match self.rpn {
            (Some(msb), Some(lsb)) => Some((msb, lsb)),
            _ => None,
        };
        match (controller, rpn) {
            (CC_MODULATION, _) => self.modulation = value,
            (CC_RPN_MSB, _) => self.rpn.0 = Some(value),
            (CC_RPN_LSB, _) => self.rpn.1 = Some(value),
            (CC_DATA_ENTRY_MSB, Some(RPN_BEND_SENSITIVITY)) => self.sensitivity = value as f64,
            (CC_DATA_ENTRY_LSB, Some(RPN_BEND_SENSITIVITY)) => {
                self.sensitivity = self.sensitivity.trunc() + value as f64 / 100.0
            }
            (CC_DATA_ENTRY_MSB, Some(RPN_MODULATION_RANGE)) => {
                self.modulation_range = value as f64
            }
            (CC_DATA_ENTRY_LSB, Some(RPN_MODULATION_RANGE)) => {
                self.modulation_range = self.modulation_range.trunc() + value as f64 * 0.0078125
            }
            (CC_RESET_ALL, _) => self.reset_controllers(),
            _ => {}
        }
    }

    fn reset_controllers(&mut self) {
        self.wheel = 0;
        self.modulation = 0;
        self.rpn = (None, None);
    }

    /// Bend before smoothing, in semitones
    pub fn target_at(&self, time: f64) -> f64 {
        let bend = self.wheel as f64 / 8192.0 * self.sensitivity;
        let depth = self.modulation_range * (self.modulation as f64 / 128.0);
        let vibrato = (VIBRATO_SPEED * time).sin() * depth;
        bend + vibrato
    }

    /// Advance to `time` and return the smoothed bend in semitones
    pub fn tick(&mut self, time: f64, delta: f64) -> f64 {
        let due: Vec<ChannelEvent> = self.events.drain(time).iter().map(|e| e.event).collect();
        for event in due {
            self.apply(event);
        }
        let target = self.target_at(time);
        self.smoother.tick(delta, target)
    }

    pub fn bend(&self) -> f64 {
        self.smoother.value()
    }

    /// Replay every controller change up to `time`
    pub fn seek(&mut self, time: f64) {
        self.wheel = 0;
        self.sensitivity = DEFAULT_SENSITIVITY;
        self.modulation = 0;
        self.modulation_range = DEFAULT_MODULATION_RANGE;
        self.rpn = (None, None);

        self.events.seek(time);
        let past: Vec<ChannelEvent> = self.events.consumed().iter().map(|e| e.event).collect();
        for event in past {
            self.apply(event);
        }
        self.smoother.set(self.target_at(time));
    }
}
