//! Wrapped-octave instruments
//!
//! Twelve elements arranged in a ring, one per pitch class. Every note
//! plays the element of its pitch class regardless of octave.

use std::f32::consts::PI;

use super::{
    note_periods, scheduled_notes, Context, Frame, Instrument, InstrumentKind, Placement, Presence,
};
use crate::animation::striker::Striker;
use crate::animation::twelfth::{TwelfthShape, PIZZICATO_RATE};
use crate::animation::wobble::{Wobble, WobblePreset};
use crate::animation::{DecayElement, Playable};
use crate::midi::{ChannelEvent, MidiNoteEvent, NotePeriod};
use crate::pipeline::queue::{EventCursor, Scheduled};
use crate::scene::{Axis, NodeId, Scene};

/// Ring position of a pitch class
fn ring_rotation(pitch_class: usize) -> f32 {
    -(pitch_class as f32) * PI / 6.0
}

#[derive(Debug, Clone)]
struct Twelfth {
    element: DecayElement,
    /// Moved by the motion, under a node turned to the twelfth's place
    animated: NodeId,
}

/// Choir, stage strings and pizzicato strings
pub struct WrappedOctave {
    kind: InstrumentKind,
    shape: TwelfthShape,
    placement: Placement,
    twelfths: Vec<Twelfth>,
    periods: EventCursor<NotePeriod>,
    presence: Presence,
}

impl WrappedOctave {
    /// # Arguments
    /// * `kind` - One of `Choir`, `StageStrings`, `PizzicatoStrings`
    pub fn new(
        kind: InstrumentKind,
        ctx: &Context<'_>,
        events: &[ChannelEvent],
        scene: &mut dyn Scene,
        parent: NodeId,
    ) -> Self {
        let shape = match kind {
            InstrumentKind::Choir => TwelfthShape::Bouncy,
            InstrumentKind::PizzicatoStrings => TwelfthShape::Pizzicato,
            _ => TwelfthShape::BowedString,
        };
        let placement = Placement::new(kind, scene, parent);
        let twelfths = (0..12)
            .map(|i| {
                let ring = scene.create_node(Some(placement.root()), &format!("twelfth{i}"));
                scene.set_rotation(ring, Axis::Y.vec(ring_rotation(i)));
                let animated = scene.create_node(Some(ring), "animated");
                Twelfth {
                    element: DecayElement::new(),
                    animated,
                }
            })
            .collect();

        let periods = note_periods(events, ctx.tempo);
        Self {
            kind,
            shape,
            placement,
            twelfths,
            periods: EventCursor::new(periods.clone()),
            presence: Presence::new(ctx, periods),
        }
    }

    pub fn shape(&self) -> TwelfthShape {
        self.shape
    }

    /// Element for a pitch class
    pub fn element(&self, pitch_class: usize) -> Option<&DecayElement> {
        self.twelfths.get(pitch_class).map(|t| &t.element)
    }

    fn pose(&self, twelfth: &Twelfth, scene: &mut dyn Scene) {
        let element = &twelfth.element;
        match self.shape {
            TwelfthShape::Bouncy => {
                let height = TwelfthShape::bounce_height(element) as f32;
                scene.set_translation(twelfth.animated, Axis::Y.vec(height));
            }
            TwelfthShape::BowedString => {
                let bow = TwelfthShape::bow_position(element) as f32;
                let lean = TwelfthShape::holder_lean(element) as f32;
                scene.set_translation(twelfth.animated, [bow, 0.0, lean]);
            }
            TwelfthShape::Pizzicato => {
                let wobble = TwelfthShape::pluck_wobble(element) as f32;
                scene.set_scale(twelfth.animated, [wobble, 1.0, wobble]);
            }
        }
    }
}

impl Instrument for WrappedOctave {
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

        for period in self.periods.drain(frame.time) {
            let duration = match self.shape {
                TwelfthShape::Pizzicato => 1.0 / PIZZICATO_RATE,
                _ => period.duration(),
            };
            self.twelfths[period.pitch as usize % 12].element.play(duration);
        }

        for twelfth in &mut self.twelfths {
            twelfth.element.tick(frame.delta);
        }
        for twelfth in &self.twelfths {
            self.pose(twelfth, scene);
        }
    }

    fn seek(&mut self, time: f64, scene: &mut dyn Scene) {
        self.periods.seek(time);
        self.presence.seek(time);
        for twelfth in &mut self.twelfths {
            twelfth.element.reset();
        }
        for twelfth in &self.twelfths {
            self.pose(twelfth, scene);
        }
    }
}

#[derive(Debug, Clone)]
struct Bell {
    striker: Striker,
    wobble: Wobble,
    mallet: NodeId,
    bell: NodeId,
}

/// Twelve hanging bells, each with its own mallet
pub struct TubularBells {
    placement: Placement,
    bells: Vec<Bell>,
    presence: Presence,
}

impl TubularBells {
    pub fn new(
        ctx: &Context<'_>,
        events: &[ChannelEvent],
        scene: &mut dyn Scene,
        parent: NodeId,
    ) -> Self {
        let placement = Placement::new(InstrumentKind::TubularBells, scene, parent);
        let hits = scheduled_notes(events, ctx.tempo);

        let bells = (0..12)
            .map(|i| {
                let own: Vec<Scheduled<MidiNoteEvent>> = hits
                    .iter()
                    .filter(|h| h.event.pitch() as usize % 12 == i)
                    .copied()
                    .collect();
                let ring = scene.create_node(Some(placement.root()), &format!("bell{i}"));
                scene.set_translation(ring, Axis::X.vec(i as f32 * 2.0));
                let bell = scene.create_node(Some(ring), "bell");
                let mallet = scene.create_node(Some(ring), "mallet");
                scene.set_visible(mallet, false);
                Bell {
                    striker: Striker::new(&own, ctx.config.striker),
                    wobble: Wobble::new(WobblePreset::TUBULAR_BELL),
                    mallet,
                    bell,
                }
            })
            .collect();

        Self {
            placement,
            bells,
            presence: Presence::new(ctx, note_periods(events, ctx.tempo)),
        }
    }

    /// Swing of the bell for a pitch class, in radians
    pub fn swing(&self, pitch_class: usize) -> f64 {
        self.bells
            .get(pitch_class)
            .map_or(0.0, |b| b.wobble.rotation())
    }
}

impl Instrument for TubularBells {
    fn kind(&self) -> InstrumentKind {
        InstrumentKind::TubularBells
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
        for bell in &mut self.bells {
            let status = bell.striker.tick(frame.time, frame.delta, frame.tempo);
            bell.wobble.tick(frame.delta);
            if let Some(hit) = status.strike {
                bell.wobble.strike(hit.velocity());
            }
            scene.set_rotation(bell.mallet, Axis::X.vec(-status.angle as f32));
            scene.set_visible(bell.mallet, status.visible);
            scene.set_rotation(bell.bell, Axis::Z.vec(bell.wobble.rotation() as f32));
        }
    }

    fn seek(&mut self, time: f64, scene: &mut dyn Scene) {
        self.presence.seek(time);
        for bell in &mut self.bells {
            bell.striker.seek(time);
            bell.wobble.reset();
            scene.set_rotation(bell.bell, [0.0; 3]);
            scene.set_visible(bell.mallet, false);
        }
    }
}
