//! Bowed string instruments
//!
//! The bow changes direction on every new note and travels while a note
//! sounds. The string the note is played on vibrates.

use super::{note_periods, Context, Frame, Instrument, InstrumentKind, Placement, Presence};
use crate::animation::bow::Bow;
use crate::midi::ChannelEvent;
use crate::pipeline::clones::CloneVoice;
use crate::scene::{Axis, NodeId, Scene};

/// Bow tilt toward the lowest string, in radians
const LOWEST_STRING_TILT: f32 = -0.15;
/// Change of bow tilt from one string to the next
const STRING_TILT_STEP: f32 = 0.1;

/// Open string pitches, low to high
pub fn open_strings(kind: InstrumentKind) -> [u8; 4] {
    match kind {
        InstrumentKind::Viola => [48, 55, 62, 69],
        InstrumentKind::Cello => [36, 43, 50, 57],
        InstrumentKind::Contrabass => [28, 33, 38, 43],
        _ => [55, 62, 69, 76],
    }
}

/// Highest string whose open pitch is at or below `pitch`
///
/// Pitches below the lowest string go to the lowest string.
pub fn string_for(open: &[u8; 4], pitch: u8) -> usize {
    open.iter().rposition(|&p| p <= pitch).unwrap_or(0)
}

pub struct BowedString {
    kind: InstrumentKind,
    placement: Placement,
    open: [u8; 4],
    voice: CloneVoice,
    bow: Bow,
    bow_node: NodeId,
    vibrating: Vec<NodeId>,
    presence: Presence,
}

impl BowedString {
    pub fn new(
        kind: InstrumentKind,
        ctx: &Context<'_>,
        events: &[ChannelEvent],
        scene: &mut dyn Scene,
        parent: NodeId,
    ) -> Self {
        let placement = Placement::new(kind, scene, parent);
        let vibrating = (0..4)
            .map(|i| {
                let string = scene.create_node(Some(placement.root()), &format!("string{i}"));
                let node = scene.create_node(Some(string), "vibrating");
                scene.set_visible(node, false);
                node
            })
            .collect();
        let bow_node = scene.create_node(Some(placement.root()), "bow");

        let periods = note_periods(events, ctx.tempo);
        Self {
            kind,
            placement,
            open: open_strings(kind),
            voice: CloneVoice::new(0, periods.clone()),
            bow: Bow::new(),
            bow_node,
            vibrating,
            presence: Presence::new(ctx, periods),
        }
    }

    pub fn bow(&self) -> &Bow {
        &self.bow
    }

    /// String being played, if any
    pub fn active_string(&self) -> Option<usize> {
        self.voice
            .current()
            .map(|p| string_for(&self.open, p.pitch))
    }
}

impl Instrument for BowedString {
    fn kind(&self) -> InstrumentKind {
        self.kind
    }

    fn root(&self) -> NodeId {
        self.placement.root()
    }

    fn update_visibility(&mut self, time: f64) -> bool {
        let visible = self.presence.update(time);
        self.placement.set_visible(visible);
        visible
    }

    fn is_visible(&self) -> bool {
        self.placement.is_visible()
    }

    fn tick(&mut self, frame: &Frame<'_>, scene: &mut dyn Scene) {
        self.placement.apply(frame, scene);

        if self.voice.advance(frame.time).is_some() {
            self.bow.on_new_note();
        }
        self.bow.tick(frame.delta, self.voice.is_sounding());

        let active = self.active_string();
        for (i, &node) in self.vibrating.iter().enumerate() {
            scene.set_visible(node, active == Some(i));
        }

        scene.set_translation(
            self.bow_node,
            [self.bow.position() as f32, self.bow.height() as f32, 0.0],
        );
        if let Some(string) = active {
            let tilt = LOWEST_STRING_TILT + STRING_TILT_STEP * string as f32;
            scene.set_rotation(self.bow_node, Axis::Z.vec(tilt));
        }
    }

    fn seek(&mut self, time: f64, scene: &mut dyn Scene) {
        self.presence.seek(time);
        self.voice.seek(time);
        self.bow.reset();
        for &node in &self.vibrating {
            scene.set_visible(node, false);
        }
    }
}
