use super::{AnimState, Playable};

/// Rate at which plucked strings settle, in plays per second
pub const PIZZICATO_RATE: f64 = 7.0;

/// A fixed-rate decay from 0 to 1
///
/// Drives the twelve pitch-class elements of wrapped-octave instruments and
/// anything else that runs one motion per note and then rests.
#[derive(Debug, Clone, Default)]
pub struct DecayElement {
    /// Progress through the motion, 0 to 1
    progress: f64,
    /// Motion length in seconds
    duration: f64,
    /// Whether the motion is running
    playing: bool,
}

impl DecayElement {
    /// Create a resting element
    ///
    /// # Example
    /// ```
    /// use jamcore::animation::{DecayElement, Playable};
    ///
    /// let mut bell = DecayElement::new();
    /// bell.play(1.0);
    /// assert!(bell.is_playing());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }
}

impl Playable for DecayElement {
    fn play(&mut self, duration: f64) {
        self.progress = 0.0;
        self.duration = duration.max(f64::EPSILON);
        self.playing = true;
    }

    fn tick(&mut self, delta: f64) -> AnimState {
        if !self.playing {
            return AnimState::Complete;
        }

        self.progress += delta / self.duration;
        if self.progress >= 1.0 {
            self.progress = 1.0;
            self.playing = false;
            AnimState::Complete
        } else {
            AnimState::Running
        }
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn reset(&mut self) {
        self.progress = 0.0;
        self.playing = false;
    }
}

/// Pose of a twelfth, computed from its element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwelfthShape {
    /// Jumps up on the note and falls back, as choir singers do
    Bouncy,
    /// Bow sweeps across the string while the holder leans forward
    BowedString,
    /// String shakes briefly after a pluck
    Pizzicato,
}

/// Height of a bouncing twelfth
pub const BOUNCE_HEIGHT: f64 = 9.5;
/// Length of a bow sweep across a stage string
pub const BOW_SWEEP: f64 = 8.0;
/// How far a string holder leans forward while bowing
pub const HOLDER_LEAN: f64 = 2.0;

impl TwelfthShape {
    /// Vertical offset for a bouncing twelfth
    pub fn bounce_height(element: &DecayElement) -> f64 {
        if !element.is_playing() {
            return 0.0;
        }
        (BOUNCE_HEIGHT - BOUNCE_HEIGHT * element.progress()).max(0.0)
    }

    /// Bow offset along the string, `-4` to `4` over the note
    pub fn bow_position(element: &DecayElement) -> f64 {
        BOW_SWEEP * (element.progress() - 0.5)
    }

    /// Forward lean of the string holder
    pub fn holder_lean(element: &DecayElement) -> f64 {
        if element.is_playing() {
            HOLDER_LEAN
        } else {
            0.0
        }
    }

    /// Scale of a shaking string
    pub fn pluck_wobble(element: &DecayElement) -> f64 {
        if element.is_playing() {
            1.0 + 0.5 * (1.0 - element.progress())
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decay_completes_on_the_same_tick() {
        let mut element = DecayElement::new();
        element.play(1.0);

        assert_eq!(element.tick(0.5), AnimState::Running);
        assert!(element.is_playing());

        assert_eq!(element.tick(0.5), AnimState::Complete);
        assert_eq!(element.progress(), 1.0);
        assert!(!element.is_playing());
    }

    #[test]
    fn test_replay_restarts() {
        let mut element = DecayElement::new();
        element.play(2.0);
        element.tick(1.5);
        element.play(2.0);
        assert_eq!(element.progress(), 0.0);
        assert!(element.is_playing());
    }

    #[test]
    fn test_reset() {
        let mut element = DecayElement::new();
        element.play(1.0);
        element.tick(0.3);
        element.reset();
        assert!(!element.is_playing());
        assert_eq!(element.tick(0.1), AnimState::Complete);
        assert_eq!(element.progress(), 0.0);
    }

    #[test]
    fn test_bounce_falls_to_rest() {
        let mut element = DecayElement::new();
        element.play(1.0);
        assert!((TwelfthShape::bounce_height(&element) - 9.5).abs() < 1e-12);
        element.tick(0.5);
        assert!((TwelfthShape::bounce_height(&element) - 4.75).abs() < 1e-12);
        element.tick(0.5);
        assert_eq!(TwelfthShape::bounce_height(&element), 0.0);
    }

    #[test]
    fn test_bow_sweep_and_lean() {
        let mut element = DecayElement::new();
        element.play(2.0);
        assert_eq!(TwelfthShape::bow_position(&element), -4.0);
        assert_eq!(TwelfthShape::holder_lean(&element), 2.0);
        element.tick(2.0);
        assert_eq!(TwelfthShape::bow_position(&element), 4.0);
        assert_eq!(TwelfthShape::holder_lean(&element), 0.0);
    }

    #[test]
    fn test_pizzicato_rate() {
        let mut element = DecayElement::new();
        element.play(1.0 / PIZZICATO_RATE);
        let mut frames = 0;
        while element.tick(1.0 / 60.0) == AnimState::Running {
            frames += 1;
        }
        // 60 fps over one seventh of a second
        assert!((7..=9).contains(&frames));
    }
}
