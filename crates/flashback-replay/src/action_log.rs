//! The tick-indexed action log and its compressed container.
//!
//! Container layout, inside a single lz4 frame:
//!
//! ```text
//! u32 LE     entry count
//! entry × count:
//!   varuint  tick
//!   varuint  action count
//!   action record × action count
//! ```
//!
//! [`TickWriter`] builds the body incrementally, the way the recorder
//! flushes it; [`ActionLog::load`] reads a whole container back.
//!
//! Loading decompresses the full body into memory before decoding it.
//! The decompressed body is capped at [`MAX_BODY_BYTES`];
//! [`ActionLog::load_limited`] takes a caller-chosen cap instead.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::time::Duration;

use flashback_core::NOMINAL_TICK_RATE;
use lz4_flex::frame::{FrameDecoder, FrameEncoder};

use crate::action::Action;
use crate::codec::{write_varuint32, ByteReader};
use crate::error::LogError;
use crate::registry::{decode_action, ActionRegistry};

/// Largest decompressed body [`ActionLog::load`] accepts (1 GiB).
pub const MAX_BODY_BYTES: u64 = 1 << 30;

/// How [`ActionLog::load`] reacts to a corrupt record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadMode {
    /// Fail on the first decode error or trailing byte.
    #[default]
    Strict,
    /// Keep every tick decoded before the first failure and log a warning.
    BestEffort,
}

// ── ActionLog ───────────────────────────────────────────────────

/// Decoded actions keyed by tick.
///
/// A tick with no key holds no actions. Every key is at most
/// [`total_ticks`](Self::total_ticks).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionLog {
    total_ticks: u32,
    ticks: BTreeMap<u32, Vec<Action>>,
}

impl ActionLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `action` to `tick`, extending the log if needed.
    pub fn push(&mut self, tick: u32, action: Action) {
        self.ticks.entry(tick).or_default().push(action);
        self.total_ticks = self.total_ticks.max(tick);
    }

    /// Replace the actions at `tick`, returning the previous ones.
    pub fn insert(&mut self, tick: u32, actions: Vec<Action>) -> Option<Vec<Action>> {
        self.total_ticks = self.total_ticks.max(tick);
        self.ticks.insert(tick, actions)
    }

    /// Extend the log so that it spans at least `total_ticks` ticks.
    ///
    /// Trailing ticks with no actions are still played; this is how a
    /// recording that ends in silence keeps its length.
    pub fn extend_to(&mut self, total_ticks: u32) {
        self.total_ticks = self.total_ticks.max(total_ticks);
    }

    /// Actions recorded at `tick`, in recorded order.
    pub fn actions_at(&self, tick: u32) -> &[Action] {
        self.ticks.get(&tick).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ticks that carry at least one key, ascending, with their actions.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[Action])> + '_ {
        self.ticks.iter().map(|(t, a)| (*t, a.as_slice()))
    }

    /// Highest tick of the recording.
    pub fn total_ticks(&self) -> u32 {
        self.total_ticks
    }

    /// Total number of actions across all ticks.
    pub fn action_count(&self) -> usize {
        self.ticks.values().map(Vec::len).sum()
    }

    /// Whether the log holds no actions.
    pub fn is_empty(&self) -> bool {
        self.ticks.values().all(Vec::is_empty)
    }

    /// Length of the recording at the nominal tick rate.
    pub fn duration(&self) -> Duration {
        self.duration_at(NOMINAL_TICK_RATE)
    }

    /// Length of the recording at `tick_rate_hz` (zero if the rate is zero).
    pub fn duration_at(&self, tick_rate_hz: u32) -> Duration {
        if tick_rate_hz == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(f64::from(self.total_ticks) / f64::from(tick_rate_hz))
    }

    /// Load a compressed container whose body fits in [`MAX_BODY_BYTES`].
    pub fn load<R: Read>(
        source: R,
        registry: &ActionRegistry,
        mode: LoadMode,
    ) -> Result<Self, LogError> {
        Self::load_limited(source, registry, mode, MAX_BODY_BYTES)
    }

    /// Load a compressed container, refusing a body longer than `limit`
    /// decompressed bytes.
    ///
    /// At most `limit + 1` bytes are ever decompressed, so a small frame
    /// that inflates to something huge fails early with
    /// [`LogError::BodyTooLarge`].
    pub fn load_limited<R: Read>(
        source: R,
        registry: &ActionRegistry,
        mode: LoadMode,
        limit: u64,
    ) -> Result<Self, LogError> {
        let mut body = Vec::new();
        FrameDecoder::new(source)
            .take(limit.saturating_add(1))
            .read_to_end(&mut body)?;
        if body.len() as u64 > limit {
            return Err(LogError::BodyTooLarge { limit });
        }
        Self::decode_body(&body, registry, mode)
    }

    /// Decode an uncompressed container: the entry count and the entries.
    pub fn decode_body(
        bytes: &[u8],
        registry: &ActionRegistry,
        mode: LoadMode,
    ) -> Result<Self, LogError> {
        let mut r = ByteReader::new(bytes);
        let entries = r.read_u32_le().map_err(|_| LogError::MissingHeader)?;
        let mut decoded = Self::new();

        for entry in 0..entries {
            match decode_entry(&mut r, registry, entry) {
                Ok((tick, actions)) => {
                    if !actions.is_empty() {
                        decoded.ticks.entry(tick).or_default().extend(actions);
                    }
                    decoded.total_ticks = decoded.total_ticks.max(tick);
                }
                Err(e) if mode == LoadMode::BestEffort => {
                    log::warn!(
                        "stopping log load after {entry} of {entries} tick entries \
                         (last tick {}): {e}",
                        decoded.total_ticks
                    );
                    return Ok(decoded);
                }
                Err(e) => return Err(e),
            }
        }

        if !r.is_empty() {
            let err = LogError::TrailingBytes {
                offset: r.position(),
                count: r.remaining(),
            };
            match mode {
                LoadMode::Strict => return Err(err),
                LoadMode::BestEffort => log::warn!("ignoring log tail: {err}"),
            }
        }

        log::debug!(
            "loaded action log: {entries} tick entries, {} actions, {} ticks",
            decoded.action_count(),
            decoded.total_ticks
        );
        Ok(decoded)
    }

    /// Serialize into a [`TickWriter`], emitting every tick from 1 to
    /// [`total_ticks`](Self::total_ticks) (and tick 0 if it has actions).
    pub fn to_writer(&self) -> TickWriter {
        let mut writer = TickWriter::new();
        if let Some(zero) = self.ticks.get(&0) {
            writer.write_tick(0, zero);
        }
        for tick in 1..=self.total_ticks {
            writer.write_tick(tick, self.actions_at(tick));
        }
        writer
    }

    /// Compress the log into `sink`, returning the sink.
    pub fn encode_to<W: Write>(&self, sink: W) -> Result<W, LogError> {
        self.to_writer().finish(sink)
    }
}

fn decode_entry(
    r: &mut ByteReader<'_>,
    registry: &ActionRegistry,
    entry: u32,
) -> Result<(u32, Vec<Action>), LogError> {
    let entry_err = |source| LogError::Entry { entry, source };
    let tick = r.read_varuint32().map_err(entry_err)?;
    let count = r.read_count(1).map_err(entry_err)?;
    let mut actions = Vec::with_capacity(count);
    for index in 0..count {
        let action = decode_action(registry, r).map_err(|source| LogError::Record {
            tick,
            index: index as u32,
            source,
        })?;
        actions.push(action);
    }
    Ok((tick, actions))
}

// ── TickWriter ──────────────────────────────────────────────────

/// Growing, uncompressed container body.
#[derive(Clone, Debug, Default)]
pub struct TickWriter {
    buf: Vec<u8>,
    entries_written: u32,
}

impl TickWriter {
    /// An empty body.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one tick entry. An empty slice writes a zero-count entry.
    pub fn write_tick(&mut self, tick: u32, actions: &[Action]) {
        write_varuint32(&mut self.buf, tick);
        write_varuint32(&mut self.buf, actions.len() as u32);
        for action in actions {
            action.encode(&mut self.buf);
        }
        self.entries_written += 1;
    }

    /// Number of tick entries appended so far.
    pub fn entries_written(&self) -> u32 {
        self.entries_written
    }

    /// Size of the body in bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.entries_written == 0
    }

    /// Body bytes without the entry count.
    pub fn body(&self) -> &[u8] {
        &self.buf
    }

    /// Entry count followed by the body, uncompressed.
    pub fn to_container_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.buf.len());
        out.extend_from_slice(&self.entries_written.to_le_bytes());
        out.extend_from_slice(&self.buf);
        out
    }

    /// Compress the container into `sink` and return the sink.
    pub fn finish<W: Write>(&self, sink: W) -> Result<W, LogError> {
        let mut encoder = FrameEncoder::new(sink);
        encoder.write_all(&self.entries_written.to_le_bytes())?;
        encoder.write_all(&self.buf)?;
        let sink = encoder.finish()?;
        log::debug!(
            "saved action log: {} tick entries, {} body bytes",
            self.entries_written,
            self.buf.len()
        );
        Ok(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{BreakBlock, PlayerDespawn, EMOTE};
    use crate::error::CodecError;
    use flashback_core::{BlockPos, SurrogateId};

    fn despawn(id: u32) -> Action {
        Action::PlayerDespawn(PlayerDespawn { id: SurrogateId(id) })
    }

    fn break_at(x: i32) -> Action {
        Action::BreakBlock(BreakBlock {
            pos: BlockPos::new(x, 64, 0),
        })
    }

    #[test]
    fn push_and_insert_track_total_ticks() {
        let mut log = ActionLog::new();
        log.push(3, despawn(1));
        log.push(3, despawn(2));
        assert_eq!(log.total_ticks(), 3);
        assert_eq!(log.actions_at(3).len(), 2);
        assert!(log.actions_at(2).is_empty());

        let old = log.insert(3, vec![break_at(0)]);
        assert_eq!(old.map(|v| v.len()), Some(2));
        log.insert(9, Vec::new());
        assert_eq!(log.total_ticks(), 9);
        assert_eq!(log.action_count(), 1);
    }

    #[test]
    fn duration_uses_tick_rate() {
        let mut log = ActionLog::new();
        log.extend_to(40);
        assert_eq!(log.duration(), Duration::from_secs(2));
        assert_eq!(log.duration_at(40), Duration::from_secs(1));
        assert_eq!(log.duration_at(0), Duration::ZERO);
    }

    #[test]
    fn compressed_round_trip_fills_gaps() {
        let mut log = ActionLog::new();
        log.push(2, despawn(1));
        log.push(5, break_at(1));
        log.push(5, break_at(2));
        log.extend_to(7);

        let writer = log.to_writer();
        assert_eq!(writer.entries_written(), 7);

        let bytes = log.encode_to(Vec::new()).unwrap();
        let loaded =
            ActionLog::load(bytes.as_slice(), &ActionRegistry::builtin(), LoadMode::Strict)
                .unwrap();
        assert_eq!(loaded, log);
    }

    #[test]
    fn empty_log_has_zero_entries() {
        let bytes = ActionLog::new().encode_to(Vec::new()).unwrap();
        let loaded =
            ActionLog::load(bytes.as_slice(), &ActionRegistry::builtin(), LoadMode::Strict)
                .unwrap();
        assert_eq!(loaded.total_ticks(), 0);
        assert!(loaded.is_empty());
    }

    #[test]
    fn missing_header_is_reported() {
        let err = ActionLog::decode_body(&[1, 0], &ActionRegistry::builtin(), LoadMode::Strict)
            .unwrap_err();
        assert!(matches!(err, LogError::MissingHeader));
    }

    #[test]
    fn corrupt_record_carries_tick_and_index() {
        let mut writer = TickWriter::new();
        writer.write_tick(1, &[despawn(1)]);
        writer.write_tick(2, &[despawn(2), despawn(3)]);
        let mut bytes = writer.to_container_bytes();
        // Second record of tick 2 gets an unknown discriminator.
        let last = bytes.len() - 2;
        bytes[last] = 0xFF;

        let err = ActionLog::decode_body(&bytes, &ActionRegistry::builtin(), LoadMode::Strict)
            .unwrap_err();
        match err {
            LogError::Record { tick, index, source } => {
                assert_eq!((tick, index), (2, 1));
                assert!(matches!(
                    source,
                    CodecError::UnknownDiscriminator {
                        discriminator: 0xFF,
                        ..
                    }
                ));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn best_effort_keeps_ticks_before_corruption() {
        let mut writer = TickWriter::new();
        writer.write_tick(1, &[despawn(1)]);
        writer.write_tick(2, &[]);
        writer.write_tick(3, &[despawn(2)]);
        let mut bytes = writer.to_container_bytes();
        let last = bytes.len() - 2;
        bytes[last] = EMOTE;
        let mut registry = ActionRegistry::builtin();
        registry.unregister(EMOTE);

        let log = ActionLog::decode_body(&bytes, &registry, LoadMode::BestEffort).unwrap();
        assert_eq!(log.total_ticks(), 2);
        assert_eq!(log.action_count(), 1);
        assert!(ActionLog::decode_body(&bytes, &registry, LoadMode::Strict).is_err());
    }

    #[test]
    fn trailing_bytes_fail_only_in_strict_mode() {
        let mut writer = TickWriter::new();
        writer.write_tick(1, &[despawn(1)]);
        let mut bytes = writer.to_container_bytes();
        bytes.extend_from_slice(&[9, 9]);
        let registry = ActionRegistry::builtin();

        let err = ActionLog::decode_body(&bytes, &registry, LoadMode::Strict).unwrap_err();
        assert!(matches!(err, LogError::TrailingBytes { count: 2, .. }));
        let log = ActionLog::decode_body(&bytes, &registry, LoadMode::BestEffort).unwrap();
        assert_eq!(log.action_count(), 1);
    }

    #[test]
    fn oversized_action_count_is_malformed_entry() {
        let mut bytes = 1u32.to_le_bytes().to_vec();
        write_varuint32(&mut bytes, 1);
        write_varuint32(&mut bytes, 1_000_000);
        let err = ActionLog::decode_body(&bytes, &ActionRegistry::builtin(), LoadMode::Strict)
            .unwrap_err();
        assert!(matches!(err, LogError::Entry { entry: 0, .. }));
    }

    #[test]
    fn body_over_the_limit_is_refused() {
        let mut log = ActionLog::new();
        for tick in 1..=64 {
            log.push(tick, despawn(tick));
        }
        let bytes = log.encode_to(Vec::new()).unwrap();
        let registry = ActionRegistry::builtin();

        let err = ActionLog::load_limited(bytes.as_slice(), &registry, LoadMode::Strict, 16)
            .unwrap_err();
        assert!(matches!(err, LogError::BodyTooLarge { limit: 16 }));

        let body_len = log.to_writer().to_container_bytes().len() as u64;
        let exact =
            ActionLog::load_limited(bytes.as_slice(), &registry, LoadMode::Strict, body_len)
                .unwrap();
        assert_eq!(exact, log);
        assert!(matches!(
            ActionLog::load_limited(bytes.as_slice(), &registry, LoadMode::Strict, body_len - 1),
            Err(LogError::BodyTooLarge { .. })
        ));
    }

    #[test]
    fn garbage_input_is_not_a_valid_frame() {
        let err = ActionLog::load(
            &b"definitely not lz4"[..],
            &ActionRegistry::builtin(),
            LoadMode::Strict,
        )
        .unwrap_err();
        assert!(matches!(err, LogError::Io(_)));
    }
}
