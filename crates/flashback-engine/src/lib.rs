//! Recording and realtime playback for Flashback.
//!
//! [`Recorder`] captures a live session into a compressed action log;
//! [`Playback`] drives a loaded log into a host world from a scheduler
//! thread, with pause, reverse, speed and seek controls. Both talk to the
//! host only through the [`flashback_core`] traits.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod playback;
pub mod recorder;
pub mod sampler;
pub mod state_tracker;

pub use config::{ConfigError, PlaybackConfig, RecorderConfig};
pub use error::{PlaybackError, RecorderError};
pub use playback::{Playback, TickAccumulator};
pub use recorder::Recorder;
pub use sampler::{EntitySampler, SampledEntity};
pub use state_tracker::{PlayerStateSnapshot, StateTracker};
