//! Ratio-of-remaining motions
//!
//! Bells stretch and clone bodies tilt in proportion to how much of the
//! current note is left, returning to neutral as the note ends.

use super::Stretchy;
use crate::midi::NotePeriod;
use crate::scene::{Axis, NodeId, Scene};

/// Fraction of `period` remaining at `now`, 0 when there is no period
pub fn remaining_ratio(period: Option<&NotePeriod>, now: f64) -> f64 {
    period.map_or(0.0, |p| p.remaining_ratio(now))
}

/// Tilt of a clone body for a remaining ratio
///
/// # Arguments
/// * `ratio` - Fraction of the note remaining
/// * `rotation_factor` - Tilt in radians at the start of a note
pub fn clone_tilt(ratio: f64, rotation_factor: f64) -> f64 {
    -ratio * rotation_factor
}

/// A bell node scaled along one axis
#[derive(Debug, Clone)]
pub struct BellStretch {
    node: NodeId,
    axis: Axis,
    /// Extra scale at the start of a note
    factor: f64,
}

impl BellStretch {
    pub fn new(node: NodeId, axis: Axis, factor: f64) -> Self {
        Self { node, axis, factor }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Scale for a remaining ratio
    pub fn scale_for(&self, ratio: f64) -> [f32; 3] {
        let mut scale = [1.0; 3];
        scale[self.axis as usize] = (1.0 + self.factor * ratio.clamp(0.0, 1.0)) as f32;
        scale
    }
}

impl Stretchy for BellStretch {
    fn stretch(&mut self, ratio: f64, scene: &mut dyn Scene) {
        scene.set_scale(self.node, self.scale_for(ratio));
    }
}
