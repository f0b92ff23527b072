//! Piano keyboard
//!
//! 88 keys, each pressed by its note-ons and released by its note-offs.
//! Offs are drained slightly early so repeated notes visibly lift the key.

use log::debug;

use super::{
    note_periods, scheduled_notes, Context, Frame, Instrument, InstrumentKind, Placement, Presence,
};
use crate::animation::key::{KeySpeeds, PianoKey};
use crate::midi::{ChannelEvent, MidiNoteEvent};
use crate::pipeline::queue::{EventCursor, Scheduled};
use crate::scene::{Axis, NodeId, Scene};

/// Pitch of the leftmost key
pub const LOWEST_KEY: u8 = 21;
pub const KEY_COUNT: usize = 88;
/// Distance between neighbouring keys
const KEY_SPACING: f32 = 1.0;

pub struct Keyboard {
    placement: Placement,
    keys: Vec<PianoKey>,
    nodes: Vec<NodeId>,
    events: EventCursor<Scheduled<MidiNoteEvent>>,
    /// Releases held back from the previous frame
    deferred: Vec<u8>,
    presence: Presence,
    speeds: KeySpeeds,
}

impl Keyboard {
    pub fn new(
        ctx: &Context<'_>,
        events: &[ChannelEvent],
        scene: &mut dyn Scene,
        parent: NodeId,
    ) -> Self {
        let placement = Placement::new(InstrumentKind::Piano, scene, parent);
        let nodes = (0..KEY_COUNT)
            .map(|i| {
                let node = scene.create_node(Some(placement.root()), &format!("key{i}"));
                scene.set_translation(node, Axis::X.vec(i as f32 * KEY_SPACING));
                node
            })
            .collect();

        Self {
            keys: vec![PianoKey::new(); KEY_COUNT],
            nodes,
            events: EventCursor::new(scheduled_notes(events, ctx.tempo)),
            deferred: Vec::new(),
            presence: Presence::new(ctx, note_periods(events, ctx.tempo)),
            speeds: ctx.config.keys,
            placement,
        }
    }

    fn key_mut(&mut self, pitch: u8) -> Option<&mut PianoKey> {
        pitch
            .checked_sub(LOWEST_KEY)
            .and_then(|i| self.keys.get_mut(i as usize))
    }

    pub fn key(&self, pitch: u8) -> Option<&PianoKey> {
        pitch
            .checked_sub(LOWEST_KEY)
            .and_then(|i| self.keys.get(i as usize))
    }

    fn perform(&mut self, time: f64) {
        for pitch in std::mem::take(&mut self.deferred) {
            if let Some(key) = self.key_mut(pitch) {
                key.release();
            }
        }

        let due: Vec<MidiNoteEvent> = self
            .events
            .drain_with_off_gap(time)
            .iter()
            .map(|e| e.event)
            .collect();

        for event in &due {
            match *event {
                MidiNoteEvent::On {
                    pitch, velocity, ..
                } => {
                    if let Some(key) = self.key_mut(pitch) {
                        key.press(velocity);
                    }
                }
                MidiNoteEvent::Off { pitch, .. } => {
                    // A release in the same frame as a press would never show
                    let pressed_now = due.iter().any(|e| e.is_on() && e.pitch() == pitch);
                    if pressed_now {
                        debug!("Deferring release of key {pitch} to the next frame");
                        self.deferred.push(pitch);
                    } else if let Some(key) = self.key_mut(pitch) {
                        key.release();
                    }
                }
            }
        }
    }
}

impl Instrument for Keyboard {
    fn kind(&self) -> InstrumentKind {
        InstrumentKind::Piano
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
        self.perform(frame.time);

        for (key, &node) in self.keys.iter_mut().zip(&self.nodes) {
            key.tick(frame.delta, &self.speeds);
            scene.set_rotation(node, Axis::X.vec(key.angle() as f32));
        }
    }

    fn seek(&mut self, time: f64, scene: &mut dyn Scene) {
        self.events.seek(time);
        self.presence.seek(time);
        self.deferred.clear();
        for (key, &node) in self.keys.iter_mut().zip(&self.nodes) {
            key.reset();
            scene.set_rotation(node, [0.0; 3]);
        }
    }
}
