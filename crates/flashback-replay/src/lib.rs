//! Action codec and reversible action log for Flashback recordings.
//!
//! A recording is a sequence of ticks, each holding the [`Action`]s
//! observed during that tick. Actions are self-describing binary records:
//! a one-byte discriminator followed by fixed-order fields. Playing an
//! action mutates a [`WorldAdapter`](flashback_core::WorldAdapter) through
//! a [`PlayContext`] and may leave behind a [`ReverseHandler`] that undoes
//! the mutation.
//!
//! # Architecture
//!
//! - [`codec`]: little-endian primitives, varuints and [`codec::ByteReader`]
//! - [`action`]: the closed set of variants and their play/undo logic
//! - [`ActionRegistry`] / [`decode_action`]: discriminator dispatch
//! - [`ActionLog`] / [`TickWriter`]: the tick-indexed log and its
//!   lz4-compressed container
//! - [`Cursor`]: forward and reverse stepping over a log
//!
//! # Format
//!
//! ```text
//! lz4 frame {
//!   [ENTRY COUNT u32] [Entry 1] [Entry 2] ... [Entry N]
//! }
//! Entry = [TICK varuint] [COUNT varuint] [Action 1] ... [Action COUNT]
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod action;
pub mod action_log;
pub mod codec;
pub mod cursor;
pub mod error;
pub mod play;
pub mod record;
pub mod registry;

pub use action::Action;
pub use action_log::{ActionLog, LoadMode, TickWriter, MAX_BODY_BYTES};
pub use cursor::{Cursor, Step, TickHandlers};
pub use error::{CodecError, LogError, PlayError};
pub use play::{PlayContext, ReverseHandler, Roster};
pub use record::{ArmourRecord, BlockRecord, HeldRecord, ItemRecord};
pub use registry::{decode_action, ActionRegistry, DecodeFn};
