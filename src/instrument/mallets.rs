//! Twelve-drum octave
//!
//! Mallet bars, agogos and woodblocks: twelve struck bodies, one per pitch
//! class counted from A, each with its own stick.

use super::{
    note_periods, scheduled_notes, Context, Frame, Instrument, InstrumentKind, Placement, Presence,
};
use crate::animation::striker::{Recoil, Striker};
use crate::midi::{ChannelEvent, MidiNoteEvent};
use crate::pipeline::queue::Scheduled;
use crate::scene::{Axis, NodeId, Scene};

/// Dip of a bar struck at full velocity
const BAR_RECOIL: f64 = 0.5;
const BAR_SPACING: f32 = 1.5;

/// Bar index of a pitch, 0 for A
pub fn bar_index(pitch: u8) -> usize {
    (pitch as usize + 3) % 12
}

#[derive(Debug, Clone)]
struct Bar {
    striker: Striker,
    recoil: Recoil,
    stick: NodeId,
    body: NodeId,
}

pub struct TwelveDrumOctave {
    kind: InstrumentKind,
    placement: Placement,
    bars: Vec<Bar>,
    presence: Presence,
}

impl TwelveDrumOctave {
    pub fn new(
        kind: InstrumentKind,
        ctx: &Context<'_>,
        events: &[ChannelEvent],
        scene: &mut dyn Scene,
        parent: NodeId,
    ) -> Self {
        let placement = Placement::new(kind, scene, parent);
        let hits = scheduled_notes(events, ctx.tempo);

        let bars = (0..12)
            .map(|i| {
                let own: Vec<Scheduled<MidiNoteEvent>> = hits
                    .iter()
                    .filter(|h| bar_index(h.event.pitch()) == i)
                    .copied()
                    .collect();
                let slot = scene.create_node(Some(placement.root()), &format!("bar{i}"));
                scene.set_translation(slot, Axis::X.vec(i as f32 * BAR_SPACING));
                let body = scene.create_node(Some(slot), "body");
                let stick = scene.create_node(Some(slot), "stick");
                scene.set_visible(stick, false);
                Bar {
                    striker: Striker::new(&own, ctx.config.striker),
                    recoil: Recoil::new(BAR_RECOIL),
                    stick,
                    body,
                }
            })
            .collect();

        Self {
            kind,
            placement,
            bars,
            presence: Presence::new(ctx, note_periods(events, ctx.tempo)),
        }
    }

    /// Current dip of the bar at `index`
    pub fn bar_offset(&self, index: usize) -> f64 {
        self.bars.get(index).map_or(0.0, |b| b.recoil.offset())
    }

    /// Stick angle of the bar at `index`, in degrees
    pub fn stick_angle(&self, index: usize) -> Option<f64> {
        self.bars.get(index).map(|b| b.striker.angle_degrees())
    }
}

impl Instrument for TwelveDrumOctave {
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
        for bar in &mut self.bars {
            let status = bar.striker.tick(frame.time, frame.delta, frame.tempo);
            bar.recoil.tick(frame.delta);
            if let Some(hit) = status.strike {
                bar.recoil.strike(hit.velocity());
            }
            scene.set_rotation(bar.stick, Axis::X.vec(-status.angle as f32));
            scene.set_visible(bar.stick, status.visible);
            scene.set_translation(bar.body, Axis::Y.vec(bar.recoil.offset() as f32));
        }
    }

    fn seek(&mut self, time: f64, scene: &mut dyn Scene) {
        self.presence.seek(time);
        for bar in &mut self.bars {
            bar.striker.seek(time);
            bar.recoil.reset();
            scene.set_translation(bar.body, [0.0; 3]);
            scene.set_visible(bar.stick, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PerformanceConfig;
    use crate::fingering::FingeringTables;
    use crate::midi::TempoMap;
    use crate::pipeline::layout::StageLayout;
    use crate::scene::{NodeFactory, SceneGraph};

    #[test]
    fn test_bar_index() {
        assert_eq!(bar_index(57), 0);
        assert_eq!(bar_index(60), 3);
        assert_eq!(bar_index(69), 0);
        assert_eq!(bar_index(56), 11);
    }

    #[test]
    fn test_struck_bar_dips_and_returns() {
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
        let events: Vec<ChannelEvent> = vec![
            MidiNoteEvent::On {
                tick: 960,
                channel: 0,
                pitch: 60,
                velocity: 127,
            }
            .into(),
            MidiNoteEvent::Off {
                tick: 1000,
                channel: 0,
                pitch: 60,
            }
            .into(),
        ];
        let mut mallets =
            TwelveDrumOctave::new(InstrumentKind::Mallets, &ctx, &events, &mut scene, stage);
        let layout = StageLayout::compute([(InstrumentKind::Mallets, true)]);
        let mut run = |mallets: &mut TwelveDrumOctave, time: f64, delta: f64| {
            mallets.update_visibility(time);
            let frame = Frame {
                time,
                delta,
                tempo: &tempo,
                layout: &layout,
                slot: 0,
            };
            mallets.tick(&frame, &mut scene);
        };

        run(&mut mallets, 0.0, 0.0);
        assert_eq!(mallets.stick_angle(3), Some(50.0));

        // 120 BPM at 4 degrees per beat of lead
        run(&mut mallets, 0.99, 0.99);
        assert!((mallets.stick_angle(3).unwrap() - 4.8).abs() < 1e-9);

        // Down on the bar as it is struck
        run(&mut mallets, 1.0, 0.01);
        assert_eq!(mallets.stick_angle(3), Some(0.0));
        assert!((mallets.bar_offset(3) + BAR_RECOIL).abs() < 1e-12);

        // Recoiling upward after the hit
        run(&mut mallets, 1.1, 0.1);
        let angle = mallets.stick_angle(3).unwrap();
        assert!(angle > 0.0 && angle < 50.0);
        assert_eq!(mallets.bar_offset(3), 0.0);
        assert_eq!(mallets.bar_offset(4), 0.0);
    }
}
