//! Error types for recording and playback.

use std::io;

use flashback_replay::LogError;

use crate::config::ConfigError;

/// Errors from a [`Recorder`](crate::Recorder).
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    /// The recorder was already closed and saved.
    #[error("recorder is closed")]
    Closed,
    /// [`start`](crate::Recorder::start) was called twice.
    #[error("recorder threads are already running")]
    AlreadyStarted,
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Writing the compressed log failed.
    #[error("saving the recording failed: {0}")]
    Log(#[from] LogError),
    /// A background thread could not be spawned.
    #[error("could not spawn {name}: {source}")]
    ThreadSpawnFailed {
        /// Name of the thread.
        name: &'static str,
        /// The OS error.
        #[source]
        source: io::Error,
    },
}

/// Errors from a [`Playback`](crate::Playback).
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// Speed must be finite and positive.
    #[error("invalid playback speed {value}")]
    InvalidSpeed {
        /// The rejected value.
        value: f64,
    },
    /// The playback was closed.
    #[error("playback is closed")]
    Closed,
    /// [`start`](crate::Playback::start) was called twice.
    #[error("playback scheduler is already running")]
    AlreadyStarted,
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The log could not be loaded.
    #[error("loading the recording failed: {0}")]
    Log(#[from] LogError),
    /// The world executor returned without running the task.
    #[error("the world executor did not run the playback task")]
    NotExecuted,
    /// The scheduler thread could not be spawned.
    #[error("could not spawn the playback scheduler: {0}")]
    ThreadSpawnFailed(#[source] io::Error),
}
