//! Stick and mallet strikes
//!
//! A stick lowers in time to land exactly on each hit. Its angle is
//! predicted from the time until the next hit and the tempo, so it needs no
//! state beyond the hit cursor and the current angle.

use serde::{Deserialize, Serialize};

use crate::midi::{velocity_dampening, MidiNoteEvent, TempoMap, Ticked};
use crate::pipeline::queue::{EventCursor, Scheduled};

/// Upward recoil speed after a hit, 5 radians per second
pub const RECOIL_DEGREES_PER_SECOND: f64 = 5.0 * (180.0 / std::f64::consts::PI);
/// Return speed of a struck drum body, in units per second
pub const BODY_RETURN_SPEED: f64 = 22.0;

/// Tuning for strike prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrikerConfig {
    /// Degrees per beat of lead time
    pub strike_speed: f64,
    /// Resting angle in degrees, the stick hides at or above it
    pub max_idle_angle: f64,
    /// Hits closer than this many beats keep the stick on screen between them
    pub sticky_beats: f64,
}

impl Default for StrikerConfig {
    fn default() -> Self {
        Self {
            strike_speed: 4.0,
            max_idle_angle: 50.0,
            sticky_beats: 2.1,
        }
    }
}

/// Unclamped swing toward a hit, in degrees
///
/// Past `max_angle` while the hit is too far away to start swinging, and
/// negative once it is due. With nothing scheduled it is `max_angle + 1`.
fn proposed_rotation(
    next_hit: Option<f64>,
    now: f64,
    micros_per_beat: u32,
    strike_speed: f64,
    max_angle: f64,
) -> f64 {
    match next_hit {
        Some(hit) => {
            let bpm = 60_000_000.0 / micros_per_beat.max(1) as f64;
            (hit - now) * bpm * strike_speed
        }
        None => max_angle + 1.0,
    }
}

/// Predicted stick angle in degrees
///
/// 0 at the moment of impact and growing with the time left, held at
/// `max_angle` while the hit is far away. With nothing scheduled the angle
/// is past `max_angle`.
///
/// # Arguments
/// * `next_hit` - Seconds of the next hit, if any
/// * `now` - Current time in seconds
/// * `micros_per_beat` - Tempo in effect before the hit
/// * `strike_speed` - Degrees per beat of lead time
/// * `max_angle` - Resting angle in degrees
pub fn predict(
    next_hit: Option<f64>,
    now: f64,
    micros_per_beat: u32,
    strike_speed: f64,
    max_angle: f64,
) -> f64 {
    let proposed = proposed_rotation(next_hit, now, micros_per_beat, strike_speed, max_angle);
    match next_hit {
        Some(_) => proposed.clamp(0.0, max_angle),
        None => proposed,
    }
}

/// What a stick did this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrikeStatus {
    /// Hit that landed this frame
    pub strike: Option<MidiNoteEvent>,
    /// Stick angle in radians
    pub angle: f64,
    /// Whether the stick should be drawn
    pub visible: bool,
    /// Hit the stick is swinging toward, including the one landing now
    pub striking_for: Option<MidiNoteEvent>,
}

/// One stick or mallet
#[derive(Debug, Clone)]
pub struct Striker {
    hits: EventCursor<Scheduled<MidiNoteEvent>>,
    config: StrikerConfig,
    /// Current angle in degrees
    angle: f64,
    previous_hit: Option<Scheduled<MidiNoteEvent>>,
}

impl Striker {
    /// Create a stick for `hits`
    ///
    /// Only note-ons are kept.
    pub fn new(hits: &[Scheduled<MidiNoteEvent>], config: StrikerConfig) -> Self {
        let hits: Vec<_> = hits.iter().filter(|h| h.event.is_on()).copied().collect();
        Self {
            hits: EventCursor::new(hits),
            config,
            angle: config.max_idle_angle,
            previous_hit: None,
        }
    }

    /// Angle in degrees
    pub fn angle_degrees(&self) -> f64 {
        self.angle
    }

    pub fn has_hits(&self) -> bool {
        !self.hits.items().is_empty()
    }

    /// Advance to `now`
    pub fn tick(&mut self, now: f64, delta: f64, tempo: &TempoMap) -> StrikeStatus {
        let max = self.config.max_idle_angle;

        // Aim at the upcoming hit before it is drained, so the frame that
        // lands it swings all the way down
        let upcoming = self.hits.peek().copied();
        let proposed = proposed_rotation(
            upcoming.map(|h| h.time),
            now,
            upcoming.map_or(0, |h| tempo.tempo_before(h.tick()).micros_per_beat),
            self.config.strike_speed,
            max,
        );

        let strike = self.hits.drain(now).last().copied();
        if strike.is_some() {
            self.previous_hit = strike;
        }
        let next = self.hits.peek().copied();

        if proposed > max {
            self.angle = (self.angle + RECOIL_DEGREES_PER_SECOND * delta).min(max);
        } else {
            self.angle = proposed.clamp(0.0, max);
        }

        let sticky = match (self.previous_hit, next) {
            (Some(prev), Some(next)) => {
                next.tick().saturating_sub(prev.tick()) as f64
                    <= tempo.beats_to_ticks(self.config.sticky_beats)
            }
            _ => false,
        };

        StrikeStatus {
            strike: strike.map(|h| h.event),
            angle: self.angle.to_radians(),
            visible: self.angle < max || sticky,
            striking_for: upcoming.filter(|_| proposed <= max).map(|h| h.event),
        }
    }

    /// Reposition for a jump to `now`
    pub fn seek(&mut self, now: f64) {
        self.hits.seek(now);
        self.previous_hit = self.hits.prev().copied();
        self.angle = self.config.max_idle_angle;
    }
}

/// A struck body that dips and springs back
#[derive(Debug, Clone)]
pub struct Recoil {
    offset: f64,
    distance: f64,
}

impl Recoil {
    /// # Arguments
    /// * `distance` - Dip of a full-velocity hit
    pub fn new(distance: f64) -> Self {
        Self {
            offset: 0.0,
            distance: distance.abs(),
        }
    }

    pub fn strike(&mut self, velocity: u8) {
        self.offset = -self.distance * velocity_dampening(velocity);
    }

    /// Move back toward rest
    pub fn tick(&mut self, delta: f64) -> f64 {
        self.offset = (self.offset + BODY_RETURN_SPEED * delta).min(0.0);
        self.offset
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn reset(&mut self) {
        self.offset = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(time: f64, tempo: &TempoMap) -> Scheduled<MidiNoteEvent> {
        let tick = (time / tempo.seconds_at(1)).round() as u64;
        Scheduled::new(
            tempo.seconds_at(tick),
            MidiNoteEvent::On {
                tick,
                channel: 9,
                pitch: 38,
                velocity: 100,
            },
        )
    }

    #[test]
    fn test_predict_zero_at_impact() {
        assert_eq!(predict(Some(1.0), 1.0, 500_000, 4.0, 50.0), 0.0);
    }

    #[test]
    fn test_predict_lead_time() {
        // 120 BPM, 0.1 s ahead
        assert!((predict(Some(1.1), 1.0, 500_000, 4.0, 50.0) - 48.0).abs() < 1e-9);
        assert_eq!(predict(None, 1.0, 500_000, 4.0, 50.0), 51.0);
    }

    #[test]
    fn test_predict_rests_far_before_hit() {
        assert_eq!(predict(Some(10.0), 0.0, 500_000, 4.0, 50.0), 50.0);
        // Late frames never swing below the strings
        assert_eq!(predict(Some(1.0), 1.2, 500_000, 4.0, 50.0), 0.0);
    }

    #[test]
    fn test_stick_rests_far_before_hit() {
        let tempo = TempoMap::constant(480, 500_000);
        let mut striker = Striker::new(&[hit(5.0, &tempo)], StrikerConfig::default());
        let status = striker.tick(0.0, 1.0 / 60.0, &tempo);
        assert_eq!(striker.angle_degrees(), 50.0);
        assert!(!status.visible);
        assert!(status.strike.is_none());
    }

    #[test]
    fn test_stick_lands_on_hit() {
        let tempo = TempoMap::constant(480, 500_000);
        let h = hit(1.0, &tempo);
        let mut striker = Striker::new(&[h], StrikerConfig::default());

        let status = striker.tick(0.95, 0.05, &tempo);
        assert!(status.visible);
        assert!((striker.angle_degrees() - 24.0).abs() < 1e-6);
        assert_eq!(status.striking_for, Some(h.event));

        let status = striker.tick(1.0, 0.05, &tempo);
        assert_eq!(status.strike, Some(h.event));
        assert_eq!(striker.angle_degrees(), 0.0);
        assert_eq!(status.angle, 0.0);
        assert!(status.visible);

        // Nothing left, the stick recoils upward from the hit
        let status = striker.tick(1.05, 0.05, &tempo);
        assert!(status.strike.is_none());
        let expected = RECOIL_DEGREES_PER_SECOND * 0.05;
        assert!((striker.angle_degrees() - expected).abs() < 1e-9);
        assert_eq!(status.striking_for, None);
    }

    #[test]
    fn test_every_hit_lands_at_frame_rate() {
        let tempo = TempoMap::constant(480, 500_000);
        let hits = [hit(1.0, &tempo), hit(2.0, &tempo)];
        let mut striker = Striker::new(&hits, StrikerConfig::default());

        let delta = 1.0 / 60.0;
        let mut landed = Vec::new();
        for frame in 0..180 {
            let time = frame as f64 * delta;
            let status = striker.tick(time, delta, &tempo);
            if status.strike.is_some() {
                landed.push(striker.angle_degrees());
            }
        }
        assert_eq!(landed, vec![0.0, 0.0]);
    }

    #[test]
    fn test_recoil_caps_at_rest() {
        let tempo = TempoMap::constant(480, 500_000);
        let mut striker = Striker::new(&[hit(1.0, &tempo)], StrikerConfig::default());
        striker.tick(1.0, 0.016, &tempo);
        for _ in 0..100 {
            striker.tick(2.0, 0.016, &tempo);
        }
        assert_eq!(striker.angle_degrees(), 50.0);
    }

    #[test]
    fn test_sticky_between_close_hits() {
        let tempo = TempoMap::constant(480, 500_000);
        // Two beats apart at 120 BPM
        let hits = [hit(1.0, &tempo), hit(2.0, &tempo)];
        let mut striker = Striker::new(&hits, StrikerConfig::default());
        striker.tick(1.0, 0.016, &tempo);
        for _ in 0..30 {
            striker.tick(1.2, 0.016, &tempo);
        }
        let status = striker.tick(1.2, 0.016, &tempo);
        assert_eq!(striker.angle_degrees(), 50.0);
        assert!(status.visible);
    }

    #[test]
    fn test_off_events_are_ignored() {
        let tempo = TempoMap::constant(480, 500_000);
        let off = Scheduled::new(
            0.5,
            MidiNoteEvent::Off {
                tick: 480,
                channel: 9,
                pitch: 38,
            },
        );
        let striker = Striker::new(&[off], StrikerConfig::default());
        assert!(!striker.has_hits());
    }

    #[test]
    fn test_body_recoil() {
        let mut body = Recoil::new(-2.0);
        body.strike(127);
        assert!((body.offset() + 2.0).abs() < 1e-9);
        body.tick(0.05);
        assert!((body.offset() + 0.9).abs() < 1e-9);
        body.tick(1.0);
        assert_eq!(body.offset(), 0.0);
    }
}
