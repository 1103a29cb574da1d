//! Error types for the action codec, the log container and playback.

use std::io;

use flashback_core::SurrogateId;

/// A single action record could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The discriminator byte has no registered decoder.
    ///
    /// The reader is left positioned on the discriminator byte.
    #[error("unknown action discriminator {discriminator:#04x} at offset {offset}")]
    UnknownDiscriminator {
        /// The unrecognized discriminator.
        discriminator: u8,
        /// Offset of the discriminator byte in the decoded stream.
        offset: usize,
    },
    /// The payload ran out of bytes or contained an inconsistent value.
    #[error("malformed payload at offset {offset}: {detail}")]
    MalformedPayload {
        /// Human-readable description of what went wrong.
        detail: String,
        /// Offset at which the problem was detected.
        offset: usize,
    },
}

impl CodecError {
    /// Offset at which decoding failed.
    pub fn offset(&self) -> usize {
        match self {
            Self::UnknownDiscriminator { offset, .. } | Self::MalformedPayload { offset, .. } => {
                *offset
            }
        }
    }
}

/// Errors loading or saving a compressed action log.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// Reading the source or writing the sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The compressed frame could not be finished.
    #[error("compression error: {0}")]
    Compression(#[from] lz4_flex::frame::Error),
    /// The stream ended before the tick-entry count.
    #[error("log header is missing or truncated")]
    MissingHeader,
    /// A tick entry's tick number or action count could not be read.
    #[error("tick entry {entry} is malformed: {source}")]
    Entry {
        /// Zero-based index of the tick entry.
        entry: u32,
        /// Underlying decode failure.
        #[source]
        source: CodecError,
    },
    /// An action record inside a tick failed to decode.
    #[error("action {index} of tick {tick} failed to decode: {source}")]
    Record {
        /// Tick the record belongs to.
        tick: u32,
        /// Zero-based position of the record within its tick.
        index: u32,
        /// Underlying decode failure.
        #[source]
        source: CodecError,
    },
    /// Bytes remained after the declared number of tick entries.
    #[error("{count} trailing bytes after the last tick entry (offset {offset})")]
    TrailingBytes {
        /// Offset of the first unexpected byte.
        offset: usize,
        /// Number of unexpected bytes.
        count: usize,
    },
    /// The decompressed body is longer than the load limit.
    #[error("decompressed log body exceeds {limit} bytes")]
    BodyTooLarge {
        /// Limit in effect, in bytes.
        limit: u64,
    },
}

/// An action or reverse handler could not be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlayError {
    /// The referenced player or entity is not present in the world.
    ///
    /// Expected during partial replays and seeks; playback skips the
    /// action and carries on with the tick.
    #[error("object {id} is not present in the world")]
    MissingTarget {
        /// The absent surrogate id.
        id: SurrogateId,
    },
}
