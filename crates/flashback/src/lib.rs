//! Flashback: tick-indexed world recording with reversible, variable-speed
//! playback.
//!
//! This is the facade crate that re-exports the public API of the Flashback
//! sub-crates. Hosts implement [`types::WorldAdapter`] (and usually wrap it
//! in [`types::SharedWorld`]) and [`types::CodecLookup`]; everything else is
//! provided.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use flashback::prelude::*;
//! use flashback_test_utils::{lookup, player_profile, pose, MockWorld};
//!
//! // Record two ticks of a player walking east.
//! let recorder = Recorder::new(RecorderConfig::default(), Arc::new(lookup())).unwrap();
//! let steve = Uuid::from_u128(1);
//! recorder.add_player(steve, &player_profile("steve", pose(0.0, 64.0, 0.0)), None);
//! recorder.advance_tick();
//! recorder.push_player_movement(steve, Vec3::new(1.0, 64.0, 0.0), Rotation::default(), Rotation::default());
//! let bytes = recorder.close_and_save(Vec::new()).unwrap();
//!
//! // Play it into a world, then take it back.
//! let world = SharedWorld::new(MockWorld::new());
//! let playback = Playback::open(
//!     bytes.as_slice(),
//!     &ActionRegistry::builtin(),
//!     Arc::new(world.clone()),
//!     Arc::new(lookup()),
//!     PlaybackConfig::default(),
//! )
//! .unwrap();
//! playback.seek(playback.total_ticks()).unwrap();
//! assert_eq!(world.lock().position_of(1), Some(Vec3::new(1.0, 64.0, 0.0)));
//! playback.seek(0).unwrap();
//! assert!(world.lock().player(1).is_none());
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `flashback-core` | Geometry, descriptors, ids, the world and lookup traits |
//! | [`replay`] | `flashback-replay` | Actions, codec, action log, reversible cursor |
//! | [`engine`] | `flashback-engine` | Recorder and realtime playback |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Shared vocabulary (`flashback-core`).
///
/// Geometry, block and item descriptors, surrogate ids, and the host-facing
/// [`types::WorldAdapter`], [`types::WorldExecutor`] and
/// [`types::CodecLookup`] traits.
pub use flashback_core as types;

/// Actions and their storage (`flashback-replay`).
///
/// The [`replay::Action`] set and codec, [`replay::ActionLog`] with its
/// compressed container, and the synchronous [`replay::Cursor`].
pub use flashback_replay as replay;

/// Recording and realtime playback (`flashback-engine`).
pub use flashback_engine as engine;

/// Common imports for recording and playing back.
///
/// ```rust
/// use flashback::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use flashback_core::{
        BlockPos, BlockState, CodecLookup, Pose, Rotation, SharedWorld, SurrogateId, TableLookup,
        Vec3, WorldAdapter, WorldExecutor,
    };

    // Replay
    pub use flashback_replay::{Action, ActionLog, ActionRegistry, Cursor, LoadMode, Step};

    // Engine
    pub use flashback_engine::{
        Playback, PlaybackConfig, PlaybackError, Recorder, RecorderConfig, RecorderError,
    };

    pub use uuid::Uuid;
}
