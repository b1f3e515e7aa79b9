//! The polling pipeline.
//!
//! - `cache` - per-instance segment reuse within each instance's refresh interval
//! - `scheduler` - fixed-period tick loop driving the cache and the emitter
//! - `emitter` - i3bar protocol framing on the output stream
//! - `pause` - run state shared with the signal listener thread

pub mod cache;
pub mod emitter;
pub mod pause;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

pub use emitter::Emitter;
pub use pause::{PauseController, RunState};
pub use scheduler::{Scheduler, SchedulerError};
