//! Damped wobble for cymbals and hanging bells

use std::f64::consts::PI;

use super::{AnimState, Playable};
use crate::midi::velocity_dampening;

/// How long a wobble lasts, in seconds
pub const WOBBLE_LENGTH: f64 = 2.0;

/// Shape of a wobble
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WobblePreset {
    /// Peak swing in radians
    pub amplitude: f64,
    /// Swings per second, in half turns
    pub speed: f64,
    /// How quickly the swing dies away
    pub damping: f64,
}

impl WobblePreset {
    pub const CRASH_1: Self = Self::new(2.5, 4.5);
    pub const CRASH_2: Self = Self::new(2.5, 5.0);
    pub const SPLASH: Self = Self::new(2.0, 5.0);
    pub const RIDE: Self = Self::new(0.5, 3.0);
    pub const CHINA: Self = Self::new(2.0, 5.0);
    pub const TUBULAR_BELL: Self = Self::new(0.5, 3.0);

    pub const fn new(amplitude: f64, speed: f64) -> Self {
        Self {
            amplitude,
            speed,
            damping: 1.5,
        }
    }

    /// Swing at `t` seconds after the strike
    pub fn rotation_at(&self, t: f64, amplitude: f64) -> f64 {
        if !(0.0..=WOBBLE_LENGTH).contains(&t) {
            return 0.0;
        }
        amplitude * (t * self.speed * PI).sin()
            / (3.0 + t.powi(3) * self.speed * self.damping * PI)
    }
}

/// A wobbling element
#[derive(Debug, Clone)]
pub struct Wobble {
    preset: WobblePreset,
    /// Seconds since the last strike, `None` at rest
    elapsed: Option<f64>,
    /// Amplitude of the current wobble
    amplitude: f64,
}

impl Wobble {
    pub fn new(preset: WobblePreset) -> Self {
        Self {
            preset,
            elapsed: None,
            amplitude: 0.0,
        }
    }

    /// Start a wobble, wider for louder hits
    pub fn strike(&mut self, velocity: u8) {
        self.play(WOBBLE_LENGTH);
        self.amplitude = self.preset.amplitude * velocity_dampening(velocity);
    }

    /// Current swing in radians
    pub fn rotation(&self) -> f64 {
        self.elapsed
            .map_or(0.0, |t| self.preset.rotation_at(t, self.amplitude))
    }
}

impl Playable for Wobble {
    fn play(&mut self, _duration: f64) {
        self.elapsed = Some(0.0);
        self.amplitude = self.preset.amplitude;
    }

    fn tick(&mut self, delta: f64) -> AnimState {
        match self.elapsed {
            Some(t) if t + delta <= WOBBLE_LENGTH => {
                self.elapsed = Some(t + delta);
                AnimState::Running
            }
            _ => {
                self.elapsed = None;
                AnimState::Complete
            }
        }
    }

    fn is_playing(&self) -> bool {
        self.elapsed.is_some()
    }

    fn reset(&mut self) {
        self.elapsed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wobble_starts_and_ends_at_rest() {
        let mut wobble = Wobble::new(WobblePreset::CRASH_1);
        assert_eq!(wobble.rotation(), 0.0);

        wobble.strike(127);
        assert_eq!(wobble.rotation(), 0.0);
        wobble.tick(0.05);
        assert!(wobble.rotation() > 0.0);

        while wobble.tick(0.1) == AnimState::Running {}
        assert!(!wobble.is_playing());
        assert_eq!(wobble.rotation(), 0.0);
    }

    #[test]
    fn test_wobble_dies_away() {
        let preset = WobblePreset::CRASH_2;
        let early = (0..10)
            .map(|i| preset.rotation_at(i as f64 * 0.02, 2.5).abs())
            .fold(0.0, f64::max);
        let late = (0..10)
            .map(|i| preset.rotation_at(1.5 + i as f64 * 0.02, 2.5).abs())
            .fold(0.0, f64::max);
        assert!(late < early / 10.0);
    }

    #[test]
    fn test_quiet_hit_is_narrower() {
        let mut loud = Wobble::new(WobblePreset::RIDE);
        let mut soft = Wobble::new(WobblePreset::RIDE);
        loud.strike(127);
        soft.strike(20);
        loud.tick(0.1);
        soft.tick(0.1);
        assert!(soft.rotation().abs() < loud.rotation().abs());
    }
}
