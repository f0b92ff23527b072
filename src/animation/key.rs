//! Keys and valves
//!
//! Piano keys move at a fixed rate toward their pressed depth and recoil
//! when released. Valves and sax keys on monophonic clones are binary and
//! follow the fingering of the current note.

use serde::{Deserialize, Serialize};

use super::KeyAnimated;
use crate::fingering::KeySet;
use crate::midi::velocity_dampening;
use crate::scene::{NodeId, Scene, Vec3};

/// Rotation of a fully pressed piano key in radians
pub const KEY_PRESS_ANGLE: f64 = 0.1;

/// Speeds for piano key motion, in factor units per second
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeySpeeds {
    pub press: f64,
    pub recoil: f64,
}

impl Default for KeySpeeds {
    fn default() -> Self {
        Self {
            press: 60.0,
            recoil: 20.0,
        }
    }
}

/// One piano key
#[derive(Debug, Clone, Default)]
pub struct PianoKey {
    /// Depth of the key, 0 at rest and 1 fully down
    factor: f64,
    /// Depth to reach while held
    target: Option<f64>,
}

impl PianoKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the key down, deeper for louder notes
    pub fn press(&mut self, velocity: u8) {
        self.target = Some(velocity_dampening(velocity));
    }

    pub fn release(&mut self) {
        self.target = None;
    }

    pub fn is_held(&self) -> bool {
        self.target.is_some()
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Rotation of the key in radians
    pub fn angle(&self) -> f64 {
        self.factor * KEY_PRESS_ANGLE
    }

    /// Move toward the held depth or back to rest
    pub fn tick(&mut self, delta: f64, speeds: &KeySpeeds) -> f64 {
        self.factor = match self.target {
            Some(target) if self.factor < target => (self.factor + speeds.press * delta).min(target),
            Some(target) => (self.factor - speeds.recoil * delta).max(target),
            None => self.factor - speeds.recoil * delta,
        }
        .clamp(0.0, 1.0);
        self.factor
    }

    pub fn reset(&mut self) {
        self.factor = 0.0;
        self.target = None;
    }
}

/// How a binary key shows that it is pressed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyTravel {
    /// Offset the key, as a valve piston sinks
    Translate(Vec3),
    /// Rotate the key, as a sax pad closes
    Rotate(Vec3),
}

/// Binary keys of one clone
#[derive(Debug, Clone)]
pub struct PressedKeys {
    keys: Vec<NodeId>,
    travel: KeyTravel,
    pressed: Vec<bool>,
}

impl PressedKeys {
    pub fn new(keys: Vec<NodeId>, travel: KeyTravel) -> Self {
        let pressed = vec![false; keys.len()];
        Self {
            keys,
            travel,
            pressed,
        }
    }

    pub fn is_pressed(&self, key: usize) -> bool {
        self.pressed.get(key).copied().unwrap_or(false)
    }
}

impl KeyAnimated for PressedKeys {
    fn key_count(&self) -> usize {
        self.keys.len()
    }

    fn animate_keys(&mut self, pressed: Option<&KeySet>, scene: &mut dyn Scene) {
        for (i, &node) in self.keys.iter().enumerate() {
            let down = pressed.is_some_and(|set| set.contains(&(i as u8)));
            self.pressed[i] = down;
            match (self.travel, down) {
                (KeyTravel::Translate(offset), true) => scene.set_translation(node, offset),
                (KeyTravel::Translate(_), false) => scene.set_translation(node, [0.0; 3]),
                (KeyTravel::Rotate(angle), true) => scene.set_rotation(node, angle),
                (KeyTravel::Rotate(_), false) => scene.set_rotation(node, [0.0; 3]),
            }
        }
    }
}
