//! Bow strokes for the violin family

/// Bow travel speed in units per second
pub const BOW_SPEED: f64 = 3.0;
/// How far the bow travels from center before turning back
pub const BOW_LIMIT: f64 = 7.0;
/// Bow height while a note is sounding
pub const BOW_ACTIVE_HEIGHT: f64 = 0.5;
/// Bow height at rest
pub const BOW_IDLE_HEIGHT: f64 = 1.0;
/// Speed of returning to rest height, in units per second
pub const BOW_LIFT_SPEED: f64 = 1.0;

/// Bow of a single string instrument
///
/// Each new note reverses the stroke direction, so legato passages show
/// alternating up and down bows. A long note turns back at the travel
/// limit.
#[derive(Debug, Clone)]
pub struct Bow {
    /// Offset along the stroke
    position: f64,
    /// Height above the strings
    height: f64,
    /// Stroke direction, true while moving toward negative positions
    up_bow: bool,
}

impl Default for Bow {
    fn default() -> Self {
        Self {
            position: 0.0,
            height: BOW_IDLE_HEIGHT,
            up_bow: false,
        }
    }
}

impl Bow {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new note started, reverse the stroke
    pub fn on_new_note(&mut self) {
        self.up_bow = !self.up_bow;
    }

    /// Advance by one frame
    ///
    /// # Arguments
    /// * `delta` - Seconds since the previous frame
    /// * `active` - Whether any note is sounding
    pub fn tick(&mut self, delta: f64, active: bool) {
        if active {
            let step = BOW_SPEED * delta;
            self.position += if self.up_bow { -step } else { step };
            if self.position >= BOW_LIMIT {
                self.position = BOW_LIMIT;
                self.up_bow = true;
            } else if self.position <= -BOW_LIMIT {
                self.position = -BOW_LIMIT;
                self.up_bow = false;
            }
            self.height = BOW_ACTIVE_HEIGHT;
        } else {
            self.height = (self.height + BOW_LIFT_SPEED * delta).min(BOW_IDLE_HEIGHT);
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn is_up_bow(&self) -> bool {
        self.up_bow
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_toggles_per_note() {
        let mut bow = Bow::new();
        bow.on_new_note();
        bow.tick(1.0, true);
        assert_eq!(bow.position(), -3.0);

        bow.on_new_note();
        bow.tick(0.5, true);
        assert_eq!(bow.position(), -1.5);
    }

    #[test]
    fn test_travel_is_limited() {
        let mut bow = Bow::new();
        bow.tick(10.0, true);
        assert_eq!(bow.position(), BOW_LIMIT);
        assert!(bow.is_up_bow());
    }

    #[test]
    fn test_long_note_turns_at_limit() {
        let mut bow = Bow::new();
        bow.on_new_note();
        let positions: Vec<f64> = (0..5)
            .map(|_| {
                bow.tick(1.0, true);
                bow.position()
            })
            .collect();
        assert_eq!(positions, vec![-3.0, -6.0, -7.0, -4.0, -1.0]);
        assert!(!bow.is_up_bow());
    }

    #[test]
    fn test_height_lifts_when_idle() {
        let mut bow = Bow::new();
        bow.tick(0.1, true);
        assert_eq!(bow.height(), BOW_ACTIVE_HEIGHT);

        bow.tick(0.25, false);
        assert!((bow.height() - 0.75).abs() < 1e-12);
        bow.tick(5.0, false);
        assert_eq!(bow.height(), BOW_IDLE_HEIGHT);
        // Position holds while idle
        assert!((bow.position() - 0.3).abs() < 1e-12);
    }
}
