use super::HandAnimated;
use crate::fingering::HandPair;
use crate::scene::{NodeId, Scene};

/// Left and right hand shape variants of one clone
///
/// Exactly one variant of each hand is visible at a time.
#[derive(Debug, Clone)]
pub struct HandShapes {
    left: Vec<NodeId>,
    right: Vec<NodeId>,
    shown: HandPair,
}

impl HandShapes {
    /// Create hand shapes showing variant 0 of each hand
    pub fn new(left: Vec<NodeId>, right: Vec<NodeId>, scene: &mut dyn Scene) -> Self {
        let mut hands = Self {
            left,
            right,
            shown: HandPair { left: 0, right: 0 },
        };
        hands.show(hands.shown, scene);
        hands
    }

    pub fn shown(&self) -> HandPair {
        self.shown
    }

    fn show(&mut self, pair: HandPair, scene: &mut dyn Scene) {
        for (i, &node) in self.left.iter().enumerate() {
            scene.set_visible(node, i == pair.left as usize);
        }
        for (i, &node) in self.right.iter().enumerate() {
            scene.set_visible(node, i == pair.right as usize);
        }
        self.shown = pair;
    }
}

impl HandAnimated for HandShapes {
    fn animate_hands(&mut self, hands: Option<HandPair>, scene: &mut dyn Scene) {
        match hands {
            Some(pair) if pair != self.shown => self.show(pair, scene),
            _ => {}
        }
    }
}
