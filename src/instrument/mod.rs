//! Virtual performers
//!
//! Each instrument turns one channel's events into motion on its own scene
//! nodes. Instruments are built once, then ticked every frame with the
//! stage layout for that frame.

pub mod keyboard;
pub mod mallets;
pub mod monophonic;
pub mod percussion;
pub mod strings;
pub mod wrapped_octave;

use log::info;

use crate::config::PerformanceConfig;
use crate::error::Result;
use crate::fingering::FingeringTables;
use crate::midi::{build_note_periods, ChannelEvent, MidiNoteEvent, NotePeriod, TempoMap};
use crate::pipeline::layout::StageLayout;
use crate::pipeline::queue::{EventCursor, Scheduled, Timed};
use crate::pipeline::visibility::VisibilityTracker;
use crate::scene::{NodeId, Scene, Vec3};

/// Every instrument the stage knows how to animate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    Piano,
    Mallets,
    TubularBells,
    Violin,
    Viola,
    Cello,
    Contrabass,
    PizzicatoStrings,
    StageStrings,
    Choir,
    Trumpet,
    Trombone,
    Tuba,
    FrenchHorn,
    AltoSax,
    Piccolo,
    Flute,
    Recorder,
    Agogos,
    Woodblocks,
    DrumKit,
}

impl InstrumentKind {
    /// Instrument for a General MIDI program on a melodic channel
    pub fn from_program(program: u8) -> Option<Self> {
        use InstrumentKind::*;
        match program {
            0..=7 => Some(Piano),
            11..=13 => Some(Mallets),
            14 => Some(TubularBells),
            40 => Some(Violin),
            41 => Some(Viola),
            42 => Some(Cello),
            43 => Some(Contrabass),
            45 => Some(PizzicatoStrings),
            48..=51 => Some(StageStrings),
            52..=54 => Some(Choir),
            56 | 59 => Some(Trumpet),
            57 => Some(Trombone),
            58 => Some(Tuba),
            60 => Some(FrenchHorn),
            64..=67 => Some(AltoSax),
            72 => Some(Piccolo),
            73 => Some(Flute),
            74 => Some(Recorder),
            113 => Some(Agogos),
            115 => Some(Woodblocks),
            _ => None,
        }
    }

    /// Name used for fingering tables and scene nodes
    pub fn name(&self) -> &'static str {
        use InstrumentKind::*;
        match self {
            Piano => "piano",
            Mallets => "mallets",
            TubularBells => "tubular_bells",
            Violin => "violin",
            Viola => "viola",
            Cello => "cello",
            Contrabass => "contrabass",
            PizzicatoStrings => "pizzicato_strings",
            StageStrings => "stage_strings",
            Choir => "choir",
            Trumpet => "trumpet",
            Trombone => "trombone",
            Tuba => "tuba",
            FrenchHorn => "french_horn",
            AltoSax => "alto_sax",
            Piccolo => "piccolo",
            Flute => "flute",
            Recorder => "recorder",
            Agogos => "agogos",
            Woodblocks => "woodblocks",
            DrumKit => "drum_kit",
        }
    }

    /// Where the first of this kind stands, and the step to the next one
    pub fn stage_position(&self) -> (Vec3, Vec3) {
        use InstrumentKind::*;
        match self {
            Piano => ([-50.0, 32.0, -6.0], [-4.0, 10.0, -15.0]),
            Mallets | TubularBells => ([-25.0, 0.0, -40.0], [-10.0, 0.0, 0.0]),
            Violin | Viola => ([10.0, 50.0, -20.0], [20.0, 0.0, 0.0]),
            Cello | Contrabass => ([-70.0, 0.0, -25.0], [-20.0, 0.0, 0.0]),
            PizzicatoStrings | StageStrings => ([0.0, 0.0, -80.0], [0.0, 2.0, -10.0]),
            Choir => ([0.0, 10.0, -100.0], [0.0, 5.0, -10.0]),
            Trumpet | Tuba | FrenchHorn => ([-2.0, 60.0, -40.0], [6.0, 0.0, 0.0]),
            Trombone => ([0.0, 40.0, -40.0], [6.0, 0.0, 0.0]),
            AltoSax => ([-30.0, 40.0, -20.0], [5.0, 0.0, 0.0]),
            Piccolo | Flute | Recorder => ([5.0, 52.0, -30.0], [5.0, 0.0, 0.0]),
            Agogos | Woodblocks => ([0.0, 30.0, -60.0], [0.0, 0.0, -5.0]),
            DrumKit => ([0.0, 0.0, -60.0], [0.0, 0.0, -40.0]),
        }
    }
}

/// What instruments read while they are built
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub tempo: &'a TempoMap,
    pub config: &'a PerformanceConfig,
    pub tables: &'a FingeringTables,
}

/// What instruments read every frame
#[derive(Clone, Copy)]
pub struct Frame<'a> {
    /// Current time in seconds
    pub time: f64,
    /// Seconds since the previous frame
    pub delta: f64,
    pub tempo: &'a TempoMap,
    pub layout: &'a StageLayout,
    /// Index of this instrument in the performance
    pub slot: usize,
}

/// A performer on stage
pub trait Instrument {
    fn kind(&self) -> InstrumentKind;

    /// Node everything of this instrument hangs from
    fn root(&self) -> NodeId;

    /// Decide whether the instrument is on stage at `time`
    ///
    /// Called for every instrument before any is ticked, so the stage
    /// layout for the frame can be computed.
    fn update_visibility(&mut self, time: f64) -> bool;

    fn is_visible(&self) -> bool;

    /// Advance by one frame and write poses to the scene
    fn tick(&mut self, frame: &Frame<'_>, scene: &mut dyn Scene);

    /// Reposition for a jump to `time` and return to rest
    fn seek(&mut self, time: f64, scene: &mut dyn Scene);
}

/// Root node, visibility and row position shared by every instrument
#[derive(Debug, Clone)]
pub struct Placement {
    root: NodeId,
    kind: InstrumentKind,
    visible: bool,
    index: f64,
}

impl Placement {
    pub fn new(kind: InstrumentKind, scene: &mut dyn Scene, parent: NodeId) -> Self {
        let root = scene.create_node(Some(parent), kind.name());
        scene.set_visible(root, false);
        let (base, _) = kind.stage_position();
        scene.set_translation(root, base);
        Self {
            root,
            kind,
            visible: false,
            index: 0.0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn kind(&self) -> InstrumentKind {
        self.kind
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn index(&self) -> f64 {
        self.index
    }

    /// Ease toward this frame's slot and write the root transform
    pub fn apply(&mut self, frame: &Frame<'_>, scene: &mut dyn Scene) {
        self.index = frame.layout.ease_index(frame.slot, self.index, frame.delta);
        let (base, step) = self.kind.stage_position();
        let offset = std::array::from_fn(|i| base[i] + step[i] * self.index as f32);
        scene.set_translation(self.root, offset);
        scene.set_visible(self.root, self.visible);
    }
}

/// Decides when an instrument is on stage from its notes
#[derive(Debug, Clone)]
pub struct Presence<T = NotePeriod> {
    tracker: VisibilityTracker<T>,
    always_visible: bool,
}

impl<T: Timed> Presence<T> {
    pub fn new(ctx: &Context<'_>, notes: Vec<T>) -> Self {
        Self {
            tracker: VisibilityTracker::new(EventCursor::new(notes), ctx.config.visibility),
            always_visible: ctx.config.always_visible,
        }
    }

    pub fn update(&mut self, time: f64) -> bool {
        self.tracker.update(time) || self.always_visible
    }

    pub fn seek(&mut self, time: f64) {
        self.tracker.seek(time);
    }
}

fn note_events(events: &[ChannelEvent]) -> Vec<MidiNoteEvent> {
    events
        .iter()
        .filter_map(ChannelEvent::as_note)
        .map(MidiNoteEvent::normalized)
        .collect()
}

/// Note events of a channel with their times
pub(crate) fn scheduled_notes(
    events: &[ChannelEvent],
    tempo: &TempoMap,
) -> Vec<Scheduled<MidiNoteEvent>> {
    tempo.schedule(&note_events(events))
}

/// Note periods of a channel
pub(crate) fn note_periods(events: &[ChannelEvent], tempo: &TempoMap) -> Vec<NotePeriod> {
    build_note_periods(&note_events(events), tempo)
}

/// Build the instrument for `kind`
///
/// # Arguments
/// * `kind` - What to build
/// * `ctx` - Tempo, configuration and fingering tables
/// * `events` - Every event of the channel, in tick order
/// * `scene` - Scene to create nodes in
/// * `parent` - Node to attach the instrument to
pub fn build_instrument(
    kind: InstrumentKind,
    ctx: &Context<'_>,
    events: &[ChannelEvent],
    scene: &mut dyn Scene,
    parent: NodeId,
) -> Result<Box<dyn Instrument>> {
    use InstrumentKind::*;
    let instrument: Box<dyn Instrument> = match kind {
        Piano => Box::new(keyboard::Keyboard::new(ctx, events, scene, parent)),
        Mallets | Agogos | Woodblocks => {
            Box::new(mallets::TwelveDrumOctave::new(kind, ctx, events, scene, parent))
        }
        TubularBells => Box::new(wrapped_octave::TubularBells::new(ctx, events, scene, parent)),
        Choir | StageStrings | PizzicatoStrings => {
            Box::new(wrapped_octave::WrappedOctave::new(kind, ctx, events, scene, parent))
        }
        Violin | Viola | Cello | Contrabass => {
            Box::new(strings::BowedString::new(kind, ctx, events, scene, parent))
        }
        Trumpet | Trombone | Tuba | FrenchHorn | AltoSax | Piccolo | Flute | Recorder => {
            Box::new(monophonic::MonophonicInstrument::for_kind(kind, ctx, events, scene, parent)?)
        }
        DrumKit => Box::new(percussion::DrumKit::new(ctx, events, scene, parent)),
    };
    info!("Built {} with {} events", kind.name(), events.len());
    Ok(instrument)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_mapping() {
        assert_eq!(InstrumentKind::from_program(0), Some(InstrumentKind::Piano));
        assert_eq!(InstrumentKind::from_program(56), Some(InstrumentKind::Trumpet));
        assert_eq!(InstrumentKind::from_program(57), Some(InstrumentKind::Trombone));
        assert_eq!(InstrumentKind::from_program(73), Some(InstrumentKind::Flute));
        assert_eq!(InstrumentKind::from_program(127), None);
    }

    #[test]
    fn test_names_match_tables() {
        let tables = FingeringTables::builtin().unwrap();
        for kind in [
            InstrumentKind::Trumpet,
            InstrumentKind::Tuba,
            InstrumentKind::FrenchHorn,
            InstrumentKind::AltoSax,
            InstrumentKind::Trombone,
            InstrumentKind::Flute,
            InstrumentKind::Piccolo,
            InstrumentKind::Recorder,
        ] {
            assert!(tables.get(kind.name()).is_some(), "{}", kind.name());
        }
    }
}
