//! Frame pipeline
//!
//! Turns precomputed events and periods into per-frame work:
//! - Queue: cursors that hand out whatever became due this frame
//! - Clones: polyphony spread over monophonic clones
//! - Visibility and layout: who is on stage and where they stand
//! - Scheduler: the performance that drives every instrument

pub mod clones;
pub mod layout;
pub mod queue;
pub mod scheduler;
pub mod visibility;

pub use queue::{EventCursor, Scheduled, Timed};
pub use scheduler::Performance;
