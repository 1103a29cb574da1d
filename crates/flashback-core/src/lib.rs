//! Core types and traits for the Flashback replay system.
//!
//! This is the leaf crate with no internal dependencies. It defines the
//! vocabulary shared by the codec, the recorder and the playback engine:
//! surrogate ids, geometry, angle quantisation, world descriptors,
//! structured extra data, and the two external seams:
//!
//! - [`WorldAdapter`]: the live environment that playback mutates, reached
//!   only through a [`WorldExecutor`].
//! - [`CodecLookup`]: descriptor ↔ code tables used by action payloads.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod angle;
pub mod descriptor;
pub mod extra;
pub mod geometry;
pub mod id;
pub mod lookup;
pub mod world;

pub use descriptor::{
    Armour, BlockState, Cape, EntityAnimation, EntityProfile, HeldItems, ItemDescriptor,
    ItemStack, Particle, PlayerAnimation, PlayerFlag, PlayerProfile, Skin, Sound,
};
pub use extra::{ExtraData, ExtraValue};
pub use geometry::{BlockPos, Pose, Rotation, Vec3};
pub use id::SurrogateId;
pub use lookup::{CodeCollision, CodecLookup, TableLookup, TableLookupBuilder};
pub use world::{SharedWorld, WorldAdapter, WorldExecutor};

/// Nominal rate at which recordings are ticked, in ticks per second.
pub const NOMINAL_TICK_RATE: u32 = 20;
