//! # jamcore - MIDI performance animation core
//!
//! Turns decoded MIDI channel events into continuous, time-indexed animation
//! state for a stage of virtual performers: valve and key presses, trombone
//! slide positions, bow strokes, mallet strikes, and polyphony clones for
//! instruments that can only sound one note at a time.
//!
//! The renderer is an external collaborator. Everything here writes to the
//! [`scene::Scene`] trait, which only needs a settable transform and a
//! visibility toggle per node. [`scene::SceneGraph`] is an in-memory
//! implementation for headless runs and tests.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use jamcore::prelude::*;
//!
//! # fn main() -> jamcore::Result<()> {
//! let score = "+0| tempo=500000, 0:program=56\n+0| 0:60d@100\n+480| 0:60u, 0:64d@100\n+480| 0:64u";
//! let parsed = parse_score(score)?;
//!
//! let mut scene = SceneGraph::new();
//! let mut performance = Performance::build(
//!     PerformanceConfig::default(),
//!     parsed.tempo_map(),
//!     &parsed.events,
//!     FingeringTables::builtin()?,
//!     &mut scene,
//! )?;
//!
//! let delta = 1.0 / 60.0;
//! let mut time = 0.0;
//! while time < performance.length() {
//!     performance.tick(time, delta, &mut scene);
//!     time += delta;
//! }
//! # Ok(())
//! # }
//! ```

pub mod animation;
pub mod config;
pub mod error;
pub mod fingering;
pub mod instrument;
pub mod midi;
pub mod pipeline;
pub mod scene;

pub use config::PerformanceConfig;
pub use error::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::PerformanceConfig;
    pub use crate::fingering::FingeringTables;
    pub use crate::instrument::{Instrument, InstrumentKind};
    pub use crate::midi::parser::parse_score;
    pub use crate::midi::timebase::TempoMap;
    pub use crate::midi::{ChannelEvent, MidiNoteEvent};
    pub use crate::pipeline::Performance;
    pub use crate::scene::{NodeId, Scene, SceneGraph};
    pub use crate::{Error, Result};
}
