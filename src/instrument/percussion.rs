//! Drum kit on the percussion channel
//!
//! Each piece owns the General MIDI pitches that strike it. Drums dip and
//! spring back, cymbals wobble.

use log::debug;

use super::{scheduled_notes, Context, Frame, Instrument, InstrumentKind, Placement, Presence};
use crate::animation::striker::{Recoil, Striker};
use crate::animation::wobble::{Wobble, WobblePreset};
use crate::animation::Playable;
use crate::midi::{ChannelEvent, MidiNoteEvent};
use crate::pipeline::queue::Scheduled;
use crate::scene::{Axis, NodeId, Scene};

/// Percussion pitches the kit animates
const KIT_RANGE: std::ops::RangeInclusive<u8> = 27..=87;

#[derive(Debug, Clone, Copy)]
enum PieceKind {
    /// Dips by this much at full velocity
    Drum(f64),
    Cymbal(WobblePreset),
}

/// Name, pitches and response of every piece, in kit order
const PIECES: [(&str, &[u8], PieceKind); 15] = [
    ("bass_drum", &[35, 36], PieceKind::Drum(1.5)),
    ("snare", &[37, 38, 40], PieceKind::Drum(2.0)),
    ("hi_hat", &[42, 44, 46], PieceKind::Drum(0.5)),
    ("low_floor_tom", &[41], PieceKind::Drum(2.0)),
    ("high_floor_tom", &[43], PieceKind::Drum(2.0)),
    ("low_tom", &[45], PieceKind::Drum(2.0)),
    ("low_mid_tom", &[47], PieceKind::Drum(2.0)),
    ("high_mid_tom", &[48], PieceKind::Drum(2.0)),
    ("high_tom", &[50], PieceKind::Drum(2.0)),
    ("crash_1", &[49], PieceKind::Cymbal(WobblePreset::CRASH_1)),
    ("crash_2", &[57], PieceKind::Cymbal(WobblePreset::CRASH_2)),
    ("splash", &[55], PieceKind::Cymbal(WobblePreset::SPLASH)),
    ("china", &[52], PieceKind::Cymbal(WobblePreset::CHINA)),
    ("ride_1", &[51, 53], PieceKind::Cymbal(WobblePreset::RIDE)),
    ("ride_2", &[59], PieceKind::Cymbal(WobblePreset::RIDE)),
];

#[derive(Debug, Clone)]
enum Body {
    Drum(Recoil),
    Cymbal(Wobble),
}

impl Body {
    fn strike(&mut self, velocity: u8) {
        match self {
            Body::Drum(recoil) => recoil.strike(velocity),
            Body::Cymbal(wobble) => wobble.strike(velocity),
        }
    }

    fn tick(&mut self, delta: f64) {
        match self {
            Body::Drum(recoil) => {
                recoil.tick(delta);
            }
            Body::Cymbal(wobble) => {
                wobble.tick(delta);
            }
        }
    }

    fn reset(&mut self) {
        match self {
            Body::Drum(recoil) => recoil.reset(),
            Body::Cymbal(wobble) => wobble.reset(),
        }
    }

    fn pose(&self, node: NodeId, scene: &mut dyn Scene) {
        match self {
            Body::Drum(recoil) => scene.set_translation(node, Axis::Y.vec(recoil.offset() as f32)),
            Body::Cymbal(wobble) => scene.set_rotation(node, Axis::X.vec(wobble.rotation() as f32)),
        }
    }
}

#[derive(Debug, Clone)]
struct Piece {
    name: &'static str,
    striker: Striker,
    body: Body,
    stick: NodeId,
    node: NodeId,
}

/// A drum set
pub struct DrumKit {
    placement: Placement,
    pieces: Vec<Piece>,
    presence: Presence<Scheduled<MidiNoteEvent>>,
}

impl DrumKit {
    pub fn new(
        ctx: &Context<'_>,
        events: &[ChannelEvent],
        scene: &mut dyn Scene,
        parent: NodeId,
    ) -> Self {
        let placement = Placement::new(InstrumentKind::DrumKit, scene, parent);
        let hits: Vec<Scheduled<MidiNoteEvent>> = scheduled_notes(events, ctx.tempo)
            .into_iter()
            .filter(|h| h.event.is_on() && KIT_RANGE.contains(&h.event.pitch()))
            .collect();

        let unknown = hits
            .iter()
            .filter(|h| !PIECES.iter().any(|(_, p, _)| p.contains(&h.event.pitch())))
            .count();
        if unknown > 0 {
            debug!("{unknown} percussion hits have no piece in the kit");
        }

        let pieces = PIECES
            .iter()
            .map(|&(name, pitches, kind)| {
                let own: Vec<_> = hits
                    .iter()
                    .filter(|h| pitches.contains(&h.event.pitch()))
                    .copied()
                    .collect();
                let node = scene.create_node(Some(placement.root()), name);
                let stick = scene.create_node(Some(node), "stick");
                scene.set_visible(stick, false);
                let body = match kind {
                    PieceKind::Drum(distance) => Body::Drum(Recoil::new(distance)),
                    PieceKind::Cymbal(preset) => Body::Cymbal(Wobble::new(preset)),
                };
                Piece {
                    name,
                    striker: Striker::new(&own, ctx.config.striker),
                    body,
                    stick,
                    node,
                }
            })
            .collect();

        Self {
            placement,
            pieces,
            presence: Presence::new(ctx, hits),
        }
    }

    fn piece(&self, name: &str) -> Option<&Piece> {
        self.pieces.iter().find(|p| p.name == name)
    }

    pub fn piece_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.pieces.iter().map(|p| p.name)
    }

    /// Dip of a drum, `None` for cymbals and unknown pieces
    pub fn drum_offset(&self, name: &str) -> Option<f64> {
        match &self.piece(name)?.body {
            Body::Drum(recoil) => Some(recoil.offset()),
            Body::Cymbal(_) => None,
        }
    }

    /// Swing of a cymbal in radians, `None` for drums and unknown pieces
    pub fn cymbal_swing(&self, name: &str) -> Option<f64> {
        match &self.piece(name)?.body {
            Body::Cymbal(wobble) => Some(wobble.rotation()),
            Body::Drum(_) => None,
        }
    }
}

impl Instrument for DrumKit {
    fn kind(&self) -> InstrumentKind {
        InstrumentKind::DrumKit
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
        for piece in &mut self.pieces {
            let status = piece.striker.tick(frame.time, frame.delta, frame.tempo);
            piece.body.tick(frame.delta);
            if let Some(hit) = status.strike {
                piece.body.strike(hit.velocity());
            }
            scene.set_rotation(piece.stick, Axis::X.vec(-status.angle as f32));
            scene.set_visible(piece.stick, status.visible);
            piece.body.pose(piece.node, scene);
        }
    }

    fn seek(&mut self, time: f64, scene: &mut dyn Scene) {
        self.presence.seek(time);
        for piece in &mut self.pieces {
            piece.striker.seek(time);
            piece.body.reset();
            piece.body.pose(piece.node, scene);
            scene.set_visible(piece.stick, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PerformanceConfig;
    use crate::fingering::FingeringTables;
    use crate::midi::{TempoMap, PERCUSSION_CHANNEL};
    use crate::pipeline::layout::StageLayout;
    use crate::scene::{NodeFactory, SceneGraph};

    fn hit(tick: u64, pitch: u8) -> ChannelEvent {
        MidiNoteEvent::On {
            tick,
            channel: PERCUSSION_CHANNEL,
            pitch,
            velocity: 127,
        }
        .into()
    }

    #[test]
    fn test_pieces_respond_to_their_pitches() {
        let tempo = TempoMap::constant(480, 500_000);
        let config = PerformanceConfig::default();
        let tables = FingeringTables::default();
        let mut scene = SceneGraph::new();
        let stage = scene.create_node(None, "stage");
        let ctx = Context {
            tempo: &tempo,
            config: &config,
            tables: &tables,
        };
        // Drum hits rarely have offs
        let events = [hit(480, 38), hit(480, 49), hit(480, 90)];
        let mut kit = DrumKit::new(&ctx, &events, &mut scene, stage);
        assert_eq!(kit.piece_names().count(), PIECES.len());

        let layout = StageLayout::compute([(InstrumentKind::DrumKit, true)]);
        let mut run = |kit: &mut DrumKit, time: f64, delta: f64| {
            let visible = kit.update_visibility(time);
            let frame = Frame {
                time,
                delta,
                tempo: &tempo,
                layout: &layout,
                slot: 0,
            };
            kit.tick(&frame, &mut scene);
            visible
        };

        assert!(run(&mut kit, 0.0, 0.0));
        run(&mut kit, 0.5, 0.5);
        assert_eq!(kit.drum_offset("snare"), Some(-2.0));
        assert_eq!(kit.drum_offset("bass_drum"), Some(0.0));
        assert_eq!(kit.cymbal_swing("crash_1"), Some(0.0));

        run(&mut kit, 0.6, 0.1);
        assert_eq!(kit.drum_offset("snare"), Some(0.0));
        assert!(kit.cymbal_swing("crash_1").unwrap().abs() > 0.0);
        assert_eq!(kit.cymbal_swing("ride_1"), Some(0.0));
        assert_eq!(kit.drum_offset("crash_1"), None);
    }
}
