//! Per-element animation state machines
//!
//! Each element owns its state and advances by the frame delta. Clones of
//! monophonic instruments compose capabilities (keys, hands, stretch, slide,
//! steam) rather than inheriting them.

pub mod bow;
pub mod hands;
pub mod key;
pub mod puffer;
pub mod slide;
pub mod stretch;
pub mod striker;
pub mod twelfth;
pub mod wobble;

pub use twelfth::DecayElement;

use crate::fingering::{HandPair, KeySet};
use crate::scene::Scene;

/// Represents the current state of an animation element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimState {
    /// Element is still moving
    Running,
    /// Element has reached rest and will not move until played again
    Complete,
}

/// Core trait for elements that run a timed motion when played
///
/// Elements advance by the frame delta and are independent of each other.
pub trait Playable {
    /// Start the motion
    ///
    /// # Arguments
    /// * `duration` - Length of the motion in seconds
    fn play(&mut self, duration: f64);

    /// Advance by one frame
    ///
    /// # Arguments
    /// * `delta` - Seconds since the previous frame
    ///
    /// # Returns
    /// * `AnimState::Running` if the element is still moving
    /// * `AnimState::Complete` once it has reached rest
    fn tick(&mut self, delta: f64) -> AnimState;

    /// Check if the element is mid-motion
    fn is_playing(&self) -> bool;

    /// Return to rest immediately
    fn reset(&mut self);
}

/// Clones that press a set of keys or valves
pub trait KeyAnimated {
    /// Number of keys this clone owns
    fn key_count(&self) -> usize;

    /// Show `pressed` keys down and every other key up. `None` releases all.
    fn animate_keys(&mut self, pressed: Option<&KeySet>, scene: &mut dyn Scene);
}

/// Clones that show one left and one right hand shape
pub trait HandAnimated {
    /// Show the given hand pair. `None` leaves the hands as they are.
    fn animate_hands(&mut self, hands: Option<HandPair>, scene: &mut dyn Scene);
}

/// Clones whose bell or body stretches with the remaining note
pub trait Stretchy {
    /// Apply a stretch for `ratio` of the note remaining
    fn stretch(&mut self, ratio: f64, scene: &mut dyn Scene);
}

/// Clones that blow steam while sounding
pub trait Puffing {
    /// Advance the steam by one frame
    fn puff(&mut self, delta: f64, active: bool, scene: &mut dyn Scene);
}
