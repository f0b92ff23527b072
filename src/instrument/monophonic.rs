//! Monophonic instruments
//!
//! Brass, reeds and flutes sound one note at a time, so overlapping notes
//! are spread over clones. Every clone is put together by a per-kind
//! factory from the same capabilities: keys, hands, a bell, a slide and
//! steam.

use log::{debug, info};

use super::{note_periods, Context, Frame, Instrument, InstrumentKind, Placement, Presence};
use crate::animation::hands::HandShapes;
use crate::animation::key::{KeyTravel, PressedKeys};
use crate::animation::puffer::SteamPuffer;
use crate::animation::slide::Slide;
use crate::animation::stretch::{clone_tilt, remaining_ratio, BellStretch};
use crate::animation::{HandAnimated, KeyAnimated, Puffing, Stretchy};
use crate::error::{Error, Result};
use crate::fingering::FingeringTable;
use crate::midi::bend::PitchBendController;
use crate::midi::ChannelEvent;
use crate::pipeline::clones::{distribute, CloneLayout, CloneVoice};
use crate::scene::{Axis, NodeId, Scene, Vec3};

/// Fraction of the distance to the target bend covered per second
const BEND_SMOOTHNESS: f64 = 30.0;
/// Rotation of a clone per semitone of bend, in radians
const BEND_ROTATION: f64 = 0.05;

/// Nodes every clone has, outermost first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloneNodes {
    /// Placed in the row of visible clones, carries clone visibility
    pub offset: NodeId,
    /// Rotated by the channel's pitch bend
    pub bend: NodeId,
    /// Tilted with the remaining note, parent of every part
    pub body: NodeId,
}

impl CloneNodes {
    fn create(scene: &mut dyn Scene, root: NodeId, index: usize) -> Self {
        let offset = scene.create_node(Some(root), &format!("clone{index}"));
        let bend = scene.create_node(Some(offset), "bend");
        let body = scene.create_node(Some(bend), "body");
        Self { offset, bend, body }
    }
}

/// A slide node and its state
#[derive(Debug, Clone)]
pub struct SlideRig {
    pub node: NodeId,
    pub slide: Slide,
}

/// Capabilities of one clone
///
/// A part left `None` is simply not animated.
#[derive(Debug, Clone, Default)]
pub struct CloneRig {
    pub keys: Option<PressedKeys>,
    pub hands: Option<HandShapes>,
    pub bell: Option<BellStretch>,
    pub slide: Option<SlideRig>,
    pub puffer: Option<SteamPuffer>,
}

/// Builds the parts of a clone under its nodes
pub type RigFactory = Box<dyn Fn(&mut dyn Scene, &CloneNodes, usize) -> CloneRig>;

/// How a kind of clone stands and moves
#[derive(Debug, Clone, Copy)]
struct Profile {
    /// Offset between neighbouring clones
    spacing: Vec3,
    /// Body tilt at the start of a note, in radians
    rotation_factor: f64,
    rotation_axis: Axis,
}

#[derive(Debug, Clone, Copy)]
struct Steam {
    axis: Axis,
    scale: f64,
    seed: u64,
}

impl Steam {
    fn build(&self, scene: &mut dyn Scene, body: NodeId, index: usize) -> SteamPuffer {
        let node = scene.create_node(Some(body), "steam");
        SteamPuffer::new(node, self.axis, self.scale, self.seed.wrapping_add(index as u64))
    }
}

fn bell(scene: &mut dyn Scene, body: NodeId, axis: Axis, factor: f64) -> BellStretch {
    BellStretch::new(scene.create_node(Some(body), "bell"), axis, factor)
}

/// Valves or pads in a row under the body
fn keyed_rig(
    count: usize,
    travel: KeyTravel,
    stretch: Option<(Axis, f64)>,
    steam: Option<Steam>,
) -> RigFactory {
    Box::new(
        move |scene: &mut dyn Scene, nodes: &CloneNodes, index: usize| -> CloneRig {
            let keys = (0..count)
                .map(|i| scene.create_node(Some(nodes.body), &format!("key{i}")))
                .collect();
            CloneRig {
                keys: Some(PressedKeys::new(keys, travel)),
                bell: stretch.map(|(axis, factor)| bell(scene, nodes.body, axis, factor)),
                puffer: steam.map(|s| s.build(scene, nodes.body, index)),
                ..CloneRig::default()
            }
        },
    )
}

/// Left and right hand shape variants under the body
fn hand_rig(left: u8, right: u8, steam: Option<Steam>) -> RigFactory {
    Box::new(
        move |scene: &mut dyn Scene, nodes: &CloneNodes, index: usize| -> CloneRig {
            let left = (0..left)
                .map(|i| scene.create_node(Some(nodes.body), &format!("left{i}")))
                .collect();
            let right = (0..right)
                .map(|i| scene.create_node(Some(nodes.body), &format!("right{i}")))
                .collect();
            CloneRig {
                hands: Some(HandShapes::new(left, right, scene)),
                puffer: steam.map(|s| s.build(scene, nodes.body, index)),
                ..CloneRig::default()
            }
        },
    )
}

fn slide_rig(stretch: (Axis, f64)) -> RigFactory {
    Box::new(
        move |scene: &mut dyn Scene, nodes: &CloneNodes, _index: usize| -> CloneRig {
            let node = scene.create_node(Some(nodes.body), "slide");
            let slide = Slide::new();
            scene.set_translation(node, Axis::Z.vec(slide.translation() as f32));
            CloneRig {
                slide: Some(SlideRig { node, slide }),
                bell: Some(bell(scene, nodes.body, stretch.0, stretch.1)),
                ..CloneRig::default()
            }
        },
    )
}

/// One clone: its timing and its parts
#[derive(Debug, Clone)]
pub struct PerformerClone {
    voice: CloneVoice,
    nodes: CloneNodes,
    rig: CloneRig,
}

impl PerformerClone {
    pub fn voice(&self) -> &CloneVoice {
        &self.voice
    }

    pub fn nodes(&self) -> &CloneNodes {
        &self.nodes
    }

    pub fn rig(&self) -> &CloneRig {
        &self.rig
    }

    fn animate(
        &mut self,
        frame: &Frame<'_>,
        layout: &CloneLayout,
        table: &FingeringTable,
        profile: &Profile,
        bend: f64,
        scene: &mut dyn Scene,
    ) {
        let slot = layout.index_for_moving(self.voice.index()) as f32;
        scene.set_translation(self.nodes.offset, profile.spacing.map(|s| s * slot));
        scene.set_visible(self.nodes.offset, self.voice.is_visible());
        scene.set_rotation(self.nodes.bend, Axis::X.vec((bend * BEND_ROTATION) as f32));

        let current = self.voice.current().copied();
        let ratio = remaining_ratio(current.as_ref(), frame.time);
        let tilt = clone_tilt(ratio, profile.rotation_factor);
        scene.set_rotation(self.nodes.body, profile.rotation_axis.vec(tilt as f32));

        let pitch = current.map(|p| p.pitch);
        let rig = &mut self.rig;

        if let Some(keys) = &mut rig.keys {
            let pressed = match (table, pitch) {
                (FingeringTable::PressedKeys(table), Some(pitch)) => table.keys(pitch),
                _ => None,
            };
            keys.animate_keys(pressed, scene);
        }

        if let Some(hands) = &mut rig.hands {
            let pair = match (table, pitch) {
                (FingeringTable::Hands(table), Some(pitch)) => table.hands(pitch),
                _ => None,
            };
            hands.animate_hands(pair, scene);
        }

        if let Some(bell) = &mut rig.bell {
            bell.stretch(ratio, scene);
        }

        if let (Some(part), FingeringTable::Slide(table)) = (&mut rig.slide, table) {
            part.slide.update(
                frame.time,
                frame.delta,
                current.as_ref(),
                self.voice.upcoming(),
                table,
            );
            scene.set_translation(part.node, Axis::Z.vec(part.slide.translation() as f32));
        }

        if let Some(puffer) = &mut rig.puffer {
            puffer.puff(frame.delta, current.is_some(), scene);
        }
    }

    fn reset(&mut self, scene: &mut dyn Scene) {
        if let Some(part) = &mut self.rig.slide {
            part.slide.reset();
        }
        if let Some(puffer) = &mut self.rig.puffer {
            puffer.reset(scene);
        }
        if let Some(keys) = &mut self.rig.keys {
            keys.animate_keys(None, scene);
        }
        if let Some(bell) = &mut self.rig.bell {
            bell.stretch(0.0, scene);
        }
        scene.set_rotation(self.nodes.body, [0.0; 3]);
    }
}

/// A monophonic instrument and its clones
pub struct MonophonicInstrument {
    placement: Placement,
    table: FingeringTable,
    profile: Profile,
    clones: Vec<PerformerClone>,
    bend: PitchBendController,
    presence: Presence,
    dropped: usize,
}

impl MonophonicInstrument {
    /// Build a monophonic instrument of `kind`
    ///
    /// # Errors
    /// * `Error::MissingTable` if no fingering table is loaded for the kind
    /// * `Error::Table` if the table is of the wrong sort
    pub fn for_kind(
        kind: InstrumentKind,
        ctx: &Context<'_>,
        events: &[ChannelEvent],
        scene: &mut dyn Scene,
        parent: NodeId,
    ) -> Result<Self> {
        use InstrumentKind::*;
        let name = kind.name();
        let steam = |axis| Steam {
            axis,
            scale: ctx.config.puffer_scale,
            seed: ctx.config.seed,
        };
        let profile = |spacing, rotation_factor, rotation_axis| Profile {
            spacing,
            rotation_factor,
            rotation_axis,
        };

        let (table, profile, factory) = match kind {
            Trumpet | Tuba | FrenchHorn | AltoSax => {
                let keys = ctx.tables.key_table(name)?;
                let (profile, factory) = match kind {
                    Trumpet => (
                        profile([0.0, 0.0, -4.0], 0.2, Axis::X),
                        keyed_rig(
                            keys.key_count,
                            KeyTravel::Translate([0.0, -0.25, 0.0]),
                            Some((Axis::Z, 0.5)),
                            None,
                        ),
                    ),
                    Tuba => (
                        profile([6.0, 0.0, 0.0], 0.1, Axis::X),
                        keyed_rig(
                            keys.key_count,
                            KeyTravel::Translate([0.0, -0.4, 0.0]),
                            None,
                            Some(steam(Axis::Y)),
                        ),
                    ),
                    FrenchHorn => (
                        profile([0.0, 0.0, -5.0], 0.15, Axis::X),
                        keyed_rig(keys.key_count, KeyTravel::Rotate([0.0, 0.0, -0.4]), None, None),
                    ),
                    _ => (
                        profile([0.0, 0.0, -5.0], 0.2, Axis::Z),
                        keyed_rig(
                            keys.key_count,
                            KeyTravel::Rotate([0.3, 0.0, 0.0]),
                            Some((Axis::Y, 0.3)),
                            None,
                        ),
                    ),
                };
                (FingeringTable::PressedKeys(keys.clone()), profile, factory)
            }
            Piccolo | Flute | Recorder => {
                let hands = ctx.tables.hand_table(name)?;
                let puff = matches!(kind, Piccolo | Flute).then(|| steam(Axis::X));
                (
                    FingeringTable::Hands(hands.clone()),
                    profile([0.0, 0.0, -3.0], 0.1, Axis::X),
                    hand_rig(hands.left_count, hands.right_count, puff),
                )
            }
            Trombone => {
                let slide = ctx.tables.slide_table(name)?;
                (
                    FingeringTable::Slide(slide.clone()),
                    profile([0.0, 0.0, -4.0], 0.2, Axis::X),
                    slide_rig((Axis::Z, 0.4)),
                )
            }
            other => {
                return Err(Error::table(
                    other.name(),
                    "not a monophonic instrument",
                ))
            }
        };

        Ok(Self::with_factory(kind, table, profile, factory, ctx, events, scene, parent))
    }

    #[allow(clippy::too_many_arguments)]
    fn with_factory(
        kind: InstrumentKind,
        table: FingeringTable,
        profile: Profile,
        factory: RigFactory,
        ctx: &Context<'_>,
        events: &[ChannelEvent],
        scene: &mut dyn Scene,
        parent: NodeId,
    ) -> Self {
        let placement = Placement::new(kind, scene, parent);
        let periods = note_periods(events, ctx.tempo);

        let tolerance = ctx.config.clone_tolerance_ticks(ctx.tempo.division());
        let mut distribution = distribute(&periods, ctx.config.clone_pool_size, tolerance);
        if distribution.dropped > 0 {
            debug!(
                "{}: {} notes did not fit in {} clones",
                kind.name(),
                distribution.dropped,
                ctx.config.clone_pool_size
            );
        }
        if distribution.lanes.is_empty() {
            distribution.lanes.push(Vec::new());
        }

        let clones: Vec<_> = distribution
            .lanes
            .into_iter()
            .enumerate()
            .map(|(index, lane)| {
                let nodes = CloneNodes::create(scene, placement.root(), index);
                scene.set_visible(nodes.offset, index == 0);
                PerformerClone {
                    voice: CloneVoice::new(index, lane),
                    rig: factory(scene, &nodes, index),
                    nodes,
                }
            })
            .collect();
        info!(
            "{}: {} periods over {} clones",
            kind.name(),
            periods.len(),
            clones.len()
        );

        let scheduled = ctx.tempo.schedule(events);
        Self {
            placement,
            table,
            profile,
            clones,
            bend: PitchBendController::new(&scheduled, BEND_SMOOTHNESS),
            presence: Presence::new(ctx, periods),
            dropped: distribution.dropped,
        }
    }

    pub fn clones(&self) -> &[PerformerClone] {
        &self.clones
    }

    /// Notes left out because every clone was busy
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Smoothed pitch bend in semitones
    pub fn bend(&self) -> f64 {
        self.bend.bend()
    }
}

impl Instrument for MonophonicInstrument {
    fn kind(&self) -> InstrumentKind {
        self.placement.kind()
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
        let bend = self.bend.tick(frame.time, frame.delta);

        let parent_visible = self.placement.is_visible();
        for clone in &mut self.clones {
            if let Some(started) = clone.voice.advance(frame.time) {
                debug!(
                    "clone {} of {} plays pitch {}",
                    clone.voice.index(),
                    self.placement.kind().name(),
                    started.pitch
                );
            }
            clone.voice.update_visibility(parent_visible);
        }

        let layout = CloneLayout::compute(self.clones.iter().map(|c| c.voice.is_visible()));
        for clone in &mut self.clones {
            clone.animate(frame, &layout, &self.table, &self.profile, bend, scene);
        }
    }

    fn seek(&mut self, time: f64, scene: &mut dyn Scene) {
        self.presence.seek(time);
        self.bend.seek(time);
        for clone in &mut self.clones {
            clone.voice.seek(time);
            clone.reset(scene);
        }
    }
}
