//! Live capture into a compressed action log.
//!
//! The [`Recorder`] turns environment notifications into [`Action`]s,
//! batches them by tick and flushes finished ticks into a growing
//! [`TickWriter`]. All mutable state sits behind one lock shared by the
//! capture calls, the tick counter thread and the movement sampler; an
//! action always lands in the tick that was current when it was pushed.
//!
//! ```text
//! capture calls ──┐
//! tick thread ────┼──> Mutex<RecorderState> ──flush──> TickWriter ──close──> lz4 sink
//! sampler thread ─┘
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, Receiver, Sender};
use flashback_core::angle::{encode_pitch, encode_yaw};
use flashback_core::{
    Armour, BlockPos, BlockState, CodecLookup, EntityAnimation, EntityProfile, ExtraData,
    HeldItems, PlayerFlag, PlayerProfile, Pose, Rotation, Skin, SurrogateId, Vec3,
};
use flashback_replay::action::{
    BlockParticle, BlockParticleKind, BlockSound, BlockSoundKind, BreakBlock, ChestUpdate,
    CrackBlock, CrackKind, Emote, EntityAnimate, EntityDespawn, EntityNameTagUpdate, EntitySpawn,
    FallSound, GeneralParticle, GeneralSound, LiquidSound, LiquidSoundKind, MoveDelta, MoveTo,
    PlaceBlock, PlayerAnimate, PlayerAnimateKind, PlayerArmourChange, PlayerDespawn,
    PlayerHandChange, PlayerNameTagUpdate, PlayerSkin, PlayerSpawn, SetBlock, SetLiquid,
    SetPlayerState, SetPlayerVisibleEffects,
};
use flashback_replay::codec::validate_extra;
use flashback_replay::{Action, ArmourRecord, BlockRecord, HeldRecord, TickWriter};
use uuid::Uuid;

use crate::config::RecorderConfig;
use crate::error::RecorderError;
use crate::sampler::{EntitySampler, Moved, MovementFilter};

const TICK_THREAD: &str = "flashback-recorder-tick";
const SAMPLER_THREAD: &str = "flashback-recorder-sampler";

// ── RecorderState ──────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Player,
    Entity,
}

struct RecorderState {
    /// Tick currently collecting actions. Starts at 1.
    tick: u32,
    /// Highest tick already written to `writer`.
    flushed_through: u32,
    writer: TickWriter,
    pending: BTreeMap<u32, Vec<Action>>,
    players: HashMap<Uuid, SurrogateId>,
    entities: HashMap<Uuid, SurrogateId>,
    spawned: HashSet<SurrogateId>,
    next_id: SurrogateId,
    /// Last position pushed per object. Absent after a spawn or despawn,
    /// which makes the next movement a full [`MoveTo`].
    last_position: HashMap<SurrogateId, Vec3>,
    closed: bool,
}

impl RecorderState {
    fn new() -> Self {
        Self {
            tick: 1,
            flushed_through: 0,
            writer: TickWriter::new(),
            pending: BTreeMap::new(),
            players: HashMap::new(),
            entities: HashMap::new(),
            spawned: HashSet::new(),
            next_id: SurrogateId::FIRST,
            last_position: HashMap::new(),
            closed: false,
        }
    }

    fn ids(&self, kind: Kind) -> &HashMap<Uuid, SurrogateId> {
        match kind {
            Kind::Player => &self.players,
            Kind::Entity => &self.entities,
        }
    }

    fn id_of(&self, kind: Kind, external: &Uuid) -> Option<SurrogateId> {
        self.ids(kind).get(external).copied()
    }

    /// Surrogate id for `external`, allocating one on first sighting.
    fn id_or_assign(&mut self, kind: Kind, external: Uuid) -> SurrogateId {
        if let Some(id) = self.id_of(kind, &external) {
            return id;
        }
        let id = self.next_id;
        self.next_id = id.next();
        match kind {
            Kind::Player => self.players.insert(external, id),
            Kind::Entity => self.entities.insert(external, id),
        };
        id
    }

    fn push(&mut self, action: Action) {
        if self.closed {
            log::trace!("recorder closed, dropping action {}", action.discriminator());
            return;
        }
        self.pending.entry(self.tick).or_default().push(action);
    }

    fn movement(
        &mut self,
        kind: Kind,
        id: SurrogateId,
        position: Vec3,
        rotation: Rotation,
        live: Rotation,
    ) {
        let action = match self.last_position.get(&id) {
            None => {
                let m = MoveTo {
                    id,
                    pose: Pose::new(position, rotation),
                };
                match kind {
                    Kind::Player => Action::PlayerMove(m),
                    Kind::Entity => Action::EntityMove(m),
                }
            }
            Some(previous) => {
                let d = MoveDelta::between(id, *previous, live, position, rotation);
                if d.is_empty() {
                    return;
                }
                match kind {
                    Kind::Player => Action::PlayerDeltaMove(d),
                    Kind::Entity => Action::EntityDeltaMove(d),
                }
            }
        };
        self.last_position.insert(id, position);
        self.push(action);
    }

    /// Write every tick from the last flush through `last`, empty ones
    /// included.
    fn flush_through(&mut self, last: u32) {
        if last <= self.flushed_through {
            return;
        }
        let before = self.writer.entries_written();
        for tick in self.flushed_through + 1..=last {
            let actions = self.pending.remove(&tick).unwrap_or_default();
            self.writer.write_tick(tick, &actions);
        }
        self.flushed_through = last;
        log::debug!(
            "flushed {} ticks through tick {last} ({} body bytes)",
            self.writer.entries_written() - before,
            self.writer.len()
        );
    }

    fn advance(&mut self, flush_interval: u32) {
        self.tick = self.tick.saturating_add(1);
        if self.tick % flush_interval == 0 {
            self.flush_through(self.tick - 1);
        }
    }
}

// ── Inner ──────────────────────────────────────────────────────────

/// Shared between the recorder handle and its threads.
struct Inner {
    config: RecorderConfig,
    lookup: Arc<dyn CodecLookup>,
    state: Mutex<RecorderState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Push the action built for the surrogate id of `external`, or drop it
    /// if the object was never seen.
    fn push_for(&self, kind: Kind, external: Uuid, build: impl FnOnce(SurrogateId) -> Action) {
        let mut state = self.lock();
        match state.id_of(kind, &external) {
            Some(id) => state.push(build(id)),
            None => log::trace!("dropping capture for unknown {kind:?} {external}"),
        }
    }

    fn push(&self, action: Action) {
        self.lock().push(action);
    }

    fn movement(
        &self,
        kind: Kind,
        external: Uuid,
        position: Vec3,
        rotation: Rotation,
        live: Rotation,
    ) {
        let mut state = self.lock();
        match state.id_of(kind, &external) {
            Some(id) => state.movement(kind, id, position, rotation, live),
            None => log::trace!("dropping movement for unknown {kind:?} {external}"),
        }
    }

    fn sampled_movements(&self, moved: &[Moved]) {
        if moved.is_empty() {
            return;
        }
        let mut state = self.lock();
        for m in moved {
            if let Some(id) = state.id_of(Kind::Entity, &m.id) {
                state.movement(
                    Kind::Entity,
                    id,
                    m.pose.position,
                    m.pose.rotation,
                    m.previous_rotation,
                );
            }
        }
    }

    fn advance_tick(&self) {
        self.lock().advance(self.config.flush_interval_ticks);
    }

    fn block_code(&self, block: &BlockState) -> u32 {
        self.lookup.block_code(block)
    }
}

// ── Recorder ───────────────────────────────────────────────────────

#[derive(Default)]
struct Control {
    cancel: Option<Sender<()>>,
    threads: Vec<JoinHandle<()>>,
    started: bool,
    closed: bool,
}

/// Records a live session.
///
/// Every capture method takes the object's external [`Uuid`]; the recorder
/// maps it to a dense [`SurrogateId`] on first sighting and reuses that id
/// for the rest of the session. Captures for objects that were never added
/// are dropped.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use flashback_core::{BlockPos, BlockState, TableLookup};
/// use flashback_engine::{Recorder, RecorderConfig};
/// use flashback_replay::{ActionLog, ActionRegistry, LoadMode};
///
/// let lookup = Arc::new(TableLookup::builder().block(BlockState::new("stone")).build().unwrap());
/// let recorder = Recorder::new(RecorderConfig::default(), lookup).unwrap();
/// recorder.push_set_block(BlockPos::new(0, 64, 0), &BlockState::new("stone"), 0);
/// recorder.advance_tick();
///
/// let bytes = recorder.close_and_save(Vec::new()).unwrap();
/// let log = ActionLog::load(bytes.as_slice(), &ActionRegistry::builtin(), LoadMode::Strict).unwrap();
/// assert_eq!(log.total_ticks(), 2);
/// assert_eq!(log.actions_at(1).len(), 1);
/// ```
pub struct Recorder {
    inner: Arc<Inner>,
    control: Mutex<Control>,
}

impl Recorder {
    /// Create an idle recorder at tick 1.
    pub fn new(
        config: RecorderConfig,
        lookup: Arc<dyn CodecLookup>,
    ) -> Result<Self, RecorderError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                lookup,
                state: Mutex::new(RecorderState::new()),
            }),
            control: Mutex::new(Control::default()),
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &RecorderConfig {
        &self.inner.config
    }

    /// Start the tick counter thread and, if entity movement recording is
    /// enabled and a sampler is given, the movement sampler thread.
    pub fn start(&self, sampler: Option<Box<dyn EntitySampler>>) -> Result<(), RecorderError> {
        let mut control = self.control.lock().unwrap_or_else(PoisonError::into_inner);
        if control.closed {
            return Err(RecorderError::Closed);
        }
        if control.started {
            return Err(RecorderError::AlreadyStarted);
        }
        control.started = true;

        let (cancel_tx, cancel_rx) = crossbeam_channel::bounded::<()>(1);
        control.cancel = Some(cancel_tx);
        let period = Duration::from_secs_f64(1.0 / self.inner.config.tick_rate_hz);

        let inner = Arc::clone(&self.inner);
        let rx = cancel_rx.clone();
        let handle = thread::Builder::new()
            .name(TICK_THREAD.into())
            .spawn(move || run_tick_counter(&inner, &rx, period))
            .map_err(|source| RecorderError::ThreadSpawnFailed {
                name: TICK_THREAD,
                source,
            })?;
        control.threads.push(handle);

        match sampler {
            Some(sampler) if self.inner.config.record_entity_movement => {
                let inner = Arc::clone(&self.inner);
                let threshold = self.inner.config.movement_threshold;
                let handle = thread::Builder::new()
                    .name(SAMPLER_THREAD.into())
                    .spawn(move || run_sampler(&inner, &cancel_rx, period, sampler, threshold))
                    .map_err(|source| RecorderError::ThreadSpawnFailed {
                        name: SAMPLER_THREAD,
                        source,
                    })?;
                control.threads.push(handle);
            }
            Some(_) => log::debug!("entity movement recording disabled, sampler ignored"),
            None => {}
        }
        log::info!(
            "recorder started at {} Hz ({} threads)",
            self.inner.config.tick_rate_hz,
            control.threads.len()
        );
        Ok(())
    }

    /// Advance to the next tick, flushing on the configured interval.
    ///
    /// This is what the tick counter thread calls; hosts driving their own
    /// clock call it directly instead of [`start`](Self::start)ing one.
    pub fn advance_tick(&self) {
        self.inner.advance_tick();
    }

    /// Flush every finished tick, leaving the current one pending.
    pub fn flush(&self) {
        let mut state = self.inner.lock();
        let last = state.tick - 1;
        state.flush_through(last);
    }

    /// Tick currently collecting actions.
    pub fn tick(&self) -> u32 {
        self.inner.lock().tick
    }

    /// Highest tick written to the log body so far.
    pub fn flushed_through(&self) -> u32 {
        self.inner.lock().flushed_through
    }

    /// Surrogate id assigned to a player, if seen.
    pub fn player_id(&self, external: &Uuid) -> Option<SurrogateId> {
        self.inner.lock().id_of(Kind::Player, external)
    }

    /// Surrogate id assigned to an entity, if seen.
    pub fn entity_id(&self, external: &Uuid) -> Option<SurrogateId> {
        self.inner.lock().id_of(Kind::Entity, external)
    }

    /// Stop the threads, flush everything including the current tick and
    /// write the compressed log to `sink`.
    ///
    /// Only the first call saves; later calls return
    /// [`RecorderError::Closed`].
    pub fn close_and_save<W: Write>(&self, sink: W) -> Result<W, RecorderError> {
        if !self.shutdown() {
            return Err(RecorderError::Closed);
        }
        let writer = {
            let mut state = self.inner.lock();
            let last = state.tick;
            state.flush_through(last);
            state.closed = true;
            state.pending.clear();
            std::mem::take(&mut state.writer)
        };
        let sink = writer.finish(sink)?;
        log::info!(
            "recording saved: {} ticks, {} body bytes",
            writer.entries_written(),
            writer.len()
        );
        Ok(sink)
    }

    /// Signal and join the threads. Returns false if already closed.
    fn shutdown(&self) -> bool {
        let mut control = self.control.lock().unwrap_or_else(PoisonError::into_inner);
        if control.closed {
            return false;
        }
        control.closed = true;
        control.cancel.take();
        for handle in control.threads.drain(..) {
            if handle.join().is_err() {
                log::warn!("a recorder thread panicked");
            }
        }
        true
    }

    // ── Lifecycle captures ─────────────────────────────────────────

    /// A player appeared. Pushes the skin (if any) and then the spawn,
    /// unless the player is already spawned in the recording.
    pub fn add_player(
        &self,
        external: Uuid,
        profile: &PlayerProfile,
        skin: Option<&Skin>,
    ) -> SurrogateId {
        let lookup = &*self.inner.lookup;
        let armour = ArmourRecord::from_armour(&profile.armour, lookup);
        let held = HeldRecord::from_held(&profile.held, lookup);

        let mut state = self.inner.lock();
        let id = state.id_or_assign(Kind::Player, external);
        if !state.spawned.insert(id) {
            return id;
        }
        if let Some(skin) = skin {
            state.push(Action::PlayerSkin(PlayerSkin {
                id,
                skin: skin.clone(),
            }));
        }
        state.push(Action::PlayerSpawn(PlayerSpawn {
            id,
            name: profile.name.clone(),
            name_tag: profile.name_tag.clone(),
            position: profile.pose.position,
            yaw: encode_yaw(profile.pose.rotation.yaw),
            pitch: encode_pitch(profile.pose.rotation.pitch),
            armour,
            held,
        }));
        id
    }

    /// A player left.
    pub fn remove_player(&self, external: &Uuid) {
        self.remove(Kind::Player, external);
    }

    /// An entity appeared. Extra data that cannot be encoded is dropped
    /// with a warning and the spawn goes ahead without it.
    pub fn add_entity(&self, external: Uuid, profile: &EntityProfile) -> SurrogateId {
        let extra = match validate_extra(&profile.extra) {
            Ok(()) => profile.extra.clone(),
            Err(e) => {
                log::warn!("dropping extra data of entity {external}: {e}");
                ExtraData::new()
            }
        };

        let mut state = self.inner.lock();
        let id = state.id_or_assign(Kind::Entity, external);
        if !state.spawned.insert(id) {
            return id;
        }
        state.push(Action::EntitySpawn(EntitySpawn {
            id,
            identifier: profile.identifier.clone(),
            name_tag: profile.name_tag.clone(),
            position: profile.pose.position,
            yaw: encode_yaw(profile.pose.rotation.yaw),
            pitch: encode_pitch(profile.pose.rotation.pitch),
            extra,
        }));
        id
    }

    /// An entity was removed.
    pub fn remove_entity(&self, external: &Uuid) {
        self.remove(Kind::Entity, external);
    }

    fn remove(&self, kind: Kind, external: &Uuid) {
        let mut state = self.inner.lock();
        let Some(id) = state.id_of(kind, external) else {
            log::trace!("dropping removal of unknown {kind:?} {external}");
            return;
        };
        if !state.spawned.remove(&id) {
            return;
        }
        state.last_position.remove(&id);
        state.push(match kind {
            Kind::Player => Action::PlayerDespawn(PlayerDespawn { id }),
            Kind::Entity => Action::EntityDespawn(EntityDespawn { id }),
        });
    }

    // ── Movement ───────────────────────────────────────────────────

    /// A player moved to `position`/`rotation`. `live_rotation` is the
    /// rotation the player had just before the move; unchanged angles are
    /// left out of the delta.
    pub fn push_player_movement(
        &self,
        external: Uuid,
        position: Vec3,
        rotation: Rotation,
        live_rotation: Rotation,
    ) {
        self.inner
            .movement(Kind::Player, external, position, rotation, live_rotation);
    }

    /// An entity moved. See [`push_player_movement`](Self::push_player_movement).
    pub fn push_entity_movement(
        &self,
        external: Uuid,
        position: Vec3,
        rotation: Rotation,
        live_rotation: Rotation,
    ) {
        self.inner
            .movement(Kind::Entity, external, position, rotation, live_rotation);
    }

    // ── Player state ───────────────────────────────────────────────

    /// Held items changed.
    pub fn push_player_hand_change(&self, external: Uuid, held: &HeldItems) {
        let held = HeldRecord::from_held(held, &*self.inner.lookup);
        self.inner.push_for(Kind::Player, external, |id| {
            Action::PlayerHandChange(PlayerHandChange { id, held })
        });
    }

    /// Worn armour changed.
    pub fn push_player_armour_change(&self, external: Uuid, armour: &Armour) {
        let armour = ArmourRecord::from_armour(armour, &*self.inner.lookup);
        self.inner.push_for(Kind::Player, external, |id| {
            Action::PlayerArmourChange(PlayerArmourChange { id, armour })
        });
    }

    /// A player animation, or a sneak/use-item toggle.
    pub fn push_player_animation(&self, external: Uuid, kind: PlayerAnimateKind) {
        self.inner.push_for(Kind::Player, external, |id| {
            Action::PlayerAnimate(PlayerAnimate { id, kind })
        });
    }

    /// A boolean state flag changed.
    pub fn push_player_state(&self, external: Uuid, flag: PlayerFlag, value: bool) {
        self.inner.push_for(Kind::Player, external, |id| {
            Action::SetPlayerState(SetPlayerState { id, flag, value })
        });
    }

    /// The player's name tag changed.
    pub fn push_player_name_tag(&self, external: Uuid, name_tag: &str) {
        let name_tag = name_tag.to_string();
        self.inner.push_for(Kind::Player, external, |id| {
            Action::PlayerNameTagUpdate(PlayerNameTagUpdate { id, name_tag })
        });
    }

    /// The set of visible effects changed.
    pub fn push_player_effects(&self, external: Uuid, effects: &[u8]) {
        let effects = effects.to_vec();
        self.inner.push_for(Kind::Player, external, |id| {
            Action::SetPlayerVisibleEffects(SetPlayerVisibleEffects { id, effects })
        });
    }

    /// The player's skin changed.
    pub fn push_skin_change(&self, external: Uuid, skin: &Skin) {
        let skin = skin.clone();
        self.inner
            .push_for(Kind::Player, external, |id| Action::PlayerSkin(PlayerSkin { id, skin }));
    }

    /// The player played an emote.
    pub fn push_emote(&self, external: Uuid, emote: Uuid) {
        self.inner
            .push_for(Kind::Player, external, |id| Action::Emote(Emote { id, emote }));
    }

    // ── Entity state ───────────────────────────────────────────────

    /// An entity's name tag changed.
    pub fn push_entity_name_tag(&self, external: Uuid, name_tag: &str) {
        let name_tag = name_tag.to_string();
        self.inner.push_for(Kind::Entity, external, |id| {
            Action::EntityNameTagUpdate(EntityNameTagUpdate { id, name_tag })
        });
    }

    /// An entity animation.
    pub fn push_entity_animation(&self, external: Uuid, animation: EntityAnimation) {
        self.inner.push_for(Kind::Entity, external, |id| {
            Action::EntityAnimate(EntityAnimate { id, animation })
        });
    }

    // ── Blocks ─────────────────────────────────────────────────────

    /// A block changed without player involvement.
    pub fn push_set_block(&self, pos: BlockPos, block: &BlockState, layer: u8) {
        let code = self.inner.block_code(block);
        self.inner.push(Action::SetBlock(SetBlock { pos, code, layer }));
    }

    /// A player placed a block.
    pub fn push_place_block(&self, pos: BlockPos, block: &BlockState) {
        let code = self.inner.block_code(block);
        self.inner.push(Action::PlaceBlock(PlaceBlock { pos, code }));
    }

    /// A block was broken.
    pub fn push_break_block(&self, pos: BlockPos) {
        self.inner.push(Action::BreakBlock(BreakBlock { pos }));
    }

    /// The liquid at `pos` changed; `None` removes it.
    pub fn push_set_liquid(&self, pos: BlockPos, liquid: Option<&BlockState>) {
        let code = match liquid {
            Some(l) => self.inner.block_code(l),
            None => self.inner.block_code(&BlockState::air()),
        };
        self.inner.push(Action::SetLiquid(SetLiquid { code, pos }));
    }

    /// A chest opened or closed.
    pub fn push_chest_update(&self, pos: BlockPos, open: bool) {
        self.inner.push(Action::ChestUpdate(ChestUpdate { pos, open }));
    }

    /// Mining progress at a block. Durations beyond `u16::MAX` ms saturate.
    pub fn push_crack_block(&self, pos: BlockPos, kind: CrackKind, remaining: Duration) {
        let duration_ms = u16::try_from(remaining.as_millis()).unwrap_or(u16::MAX);
        self.inner.push(Action::CrackBlock(CrackBlock {
            pos,
            kind,
            duration_ms,
        }));
    }

    // ── Sounds and particles ───────────────────────────────────────

    /// A block sound.
    pub fn push_block_sound(&self, pos: BlockPos, block: &BlockState, kind: BlockSoundKind) {
        let block = BlockRecord::from_block(block, &*self.inner.lookup);
        self.inner
            .push(Action::BlockSound(BlockSound { pos, block, kind }));
    }

    /// A bucket sound.
    pub fn push_liquid_sound(&self, pos: BlockPos, water: bool, kind: LiquidSoundKind) {
        self.inner
            .push(Action::LiquidSound(LiquidSound { water, kind, pos }));
    }

    /// A fall-damage sound.
    pub fn push_fall_sound(&self, pos: BlockPos, distance: f32) {
        self.inner.push(Action::FallSound(FallSound { pos, distance }));
    }

    /// Any other sound, by environment sound id.
    pub fn push_general_sound(&self, position: Vec3, sound: u32) {
        self.inner
            .push(Action::GeneralSound(GeneralSound { position, sound }));
    }

    /// Block debris particles.
    pub fn push_block_particle(&self, pos: BlockPos, block: &BlockState, kind: BlockParticleKind) {
        let block = BlockRecord::from_block(block, &*self.inner.lookup);
        self.inner
            .push(Action::BlockParticle(BlockParticle { pos, block, kind }));
    }

    /// Any other particle, by environment particle id.
    pub fn push_general_particle(&self, position: Vec3, particle: u32) {
        self.inner
            .push(Action::GeneralParticle(GeneralParticle { position, particle }));
    }

    /// Push a prebuilt action into the current tick.
    pub fn push_action(&self, action: Action) {
        self.inner.push(action);
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("Recorder")
            .field("tick", &state.tick)
            .field("flushed_through", &state.flushed_through)
            .field("objects", &(state.next_id.0 - 1))
            .field("closed", &state.closed)
            .finish()
    }
}

// ── Threads ────────────────────────────────────────────────────────

fn run_tick_counter(inner: &Inner, cancel: &Receiver<()>, period: Duration) {
    let ticker = crossbeam_channel::tick(period);
    loop {
        select! {
            recv(cancel) -> _ => break,
            recv(ticker) -> _ => inner.advance_tick(),
        }
    }
    log::debug!("{TICK_THREAD} stopped");
}

fn run_sampler(
    inner: &Inner,
    cancel: &Receiver<()>,
    period: Duration,
    mut sampler: Box<dyn EntitySampler>,
    threshold: f64,
) {
    let ticker = crossbeam_channel::tick(period);
    let mut filter = MovementFilter::new(threshold);
    loop {
        select! {
            recv(cancel) -> _ => break,
            recv(ticker) -> _ => {
                let moved = filter.update(sampler.sample());
                inner.sampled_movements(&moved);
            }
        }
    }
    log::debug!("{SAMPLER_THREAD} stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashback_core::ExtraValue;
    use flashback_replay::{ActionLog, ActionRegistry, LoadMode};
    use flashback_test_utils::{entity_profile, lookup, player_profile, pose, skin, stone};

    fn recorder(flush_interval_ticks: u32) -> Recorder {
        let config = RecorderConfig {
            flush_interval_ticks,
            ..RecorderConfig::default()
        };
        Recorder::new(config, Arc::new(lookup())).unwrap()
    }

    fn save(recorder: &Recorder) -> ActionLog {
        let bytes = recorder.close_and_save(Vec::new()).unwrap();
        ActionLog::load(bytes.as_slice(), &ActionRegistry::builtin(), LoadMode::Strict).unwrap()
    }

    fn uuid(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    #[test]
    fn ids_are_dense_and_shared_between_players_and_entities() {
        let rec = recorder(3600);
        let a = rec.add_player(uuid(10), &player_profile("a", pose(0.0, 0.0, 0.0)), None);
        let e = rec.add_entity(uuid(20), &entity_profile("minecraft:cow", pose(1.0, 0.0, 0.0)));
        let b = rec.add_player(uuid(30), &player_profile("b", pose(0.0, 0.0, 0.0)), None);
        assert_eq!((a.0, e.0, b.0), (1, 2, 3));

        rec.remove_player(&uuid(10));
        let again = rec.add_player(uuid(10), &player_profile("a", pose(0.0, 0.0, 0.0)), None);
        assert_eq!(again, a);
        assert_eq!(rec.player_id(&uuid(30)), Some(b));
        assert_eq!(rec.entity_id(&uuid(10)), None);
    }

    #[test]
    fn skin_precedes_spawn_and_duplicates_are_ignored() {
        let rec = recorder(3600);
        let profile = player_profile("a", pose(0.0, 64.0, 0.0));
        rec.add_player(uuid(1), &profile, Some(&skin()));
        rec.add_player(uuid(1), &profile, Some(&skin()));
        let log = save(&rec);
        let kinds: Vec<u8> = log.actions_at(1).iter().map(Action::discriminator).collect();
        assert_eq!(kinds, vec![10, 3]);
    }

    #[test]
    fn first_move_after_each_spawn_is_full() {
        let rec = recorder(3600);
        let id = uuid(7);
        let still = Rotation::default();
        let profile = entity_profile("minecraft:pig", pose(0.0, 64.0, 0.0));
        rec.add_entity(id, &profile);
        rec.push_entity_movement(id, Vec3::new(0.0, 65.0, 0.0), still, still);
        rec.push_entity_movement(id, Vec3::new(0.0, 65.0, 0.0), still, still);
        rec.push_entity_movement(id, Vec3::new(0.0, 66.0, 0.0), still, still);
        rec.remove_entity(&id);
        rec.add_entity(id, &profile);
        rec.push_entity_movement(id, Vec3::new(0.0, 66.0, 0.0), still, still);

        let log = save(&rec);
        let kinds: Vec<u8> = log.actions_at(1).iter().map(Action::discriminator).collect();
        assert_eq!(kinds, vec![11, 13, 19, 12, 11, 13]);
        match &log.actions_at(1)[2] {
            Action::EntityDeltaMove(d) => {
                assert_eq!(d.flags, flashback_replay::action::HAS_Y);
                assert_eq!(d.y, 66.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rotation_delta_compares_against_live_rotation() {
        let rec = recorder(3600);
        let id = uuid(3);
        rec.add_player(id, &player_profile("p", pose(0.0, 0.0, 0.0)), None);
        let live = Rotation::new(90.0, 0.0);
        rec.push_player_movement(id, Vec3::new(0.0, 0.0, 0.0), live, live);
        rec.push_player_movement(id, Vec3::new(0.0, 0.0, 0.0), live, live);
        rec.push_player_movement(id, Vec3::new(0.0, 0.0, 0.0), Rotation::new(90.0, 10.0), live);
        let log = save(&rec);
        let deltas: Vec<&MoveDelta> = log
            .actions_at(1)
            .iter()
            .filter_map(|a| match a {
                Action::PlayerDeltaMove(d) => Some(d),
                _ => None,
            })
            .collect();
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].flags, flashback_replay::action::HAS_PITCH);
    }

    #[test]
    fn unknown_objects_are_dropped() {
        let rec = recorder(3600);
        rec.push_player_state(uuid(99), PlayerFlag::Sneaking, true);
        rec.push_entity_name_tag(uuid(99), "x");
        rec.remove_player(&uuid(99));
        rec.push_player_movement(uuid(99), Vec3::ZERO, Rotation::default(), Rotation::default());
        let log = save(&rec);
        assert!(log.is_empty());
        assert_eq!(log.total_ticks(), 1);
    }

    #[test]
    fn periodic_flush_writes_finished_ticks_only() {
        let rec = recorder(4);
        rec.push_set_block(BlockPos::new(0, 0, 0), &stone(), 0);
        rec.advance_tick();
        rec.advance_tick();
        assert_eq!(rec.flushed_through(), 0);
        rec.advance_tick();
        assert_eq!(rec.tick(), 4);
        assert_eq!(rec.flushed_through(), 3);

        rec.push_break_block(BlockPos::new(0, 0, 0));
        rec.flush();
        assert_eq!(rec.flushed_through(), 3);
        rec.advance_tick();
        rec.flush();
        assert_eq!(rec.flushed_through(), 4);

        let log = save(&rec);
        assert_eq!(log.total_ticks(), 5);
        assert_eq!(log.action_count(), 2);
        assert_eq!(log.actions_at(4).len(), 1);
    }

    #[test]
    fn close_is_once_only() {
        let rec = recorder(3600);
        assert!(rec.close_and_save(Vec::new()).is_ok());
        assert!(matches!(
            rec.close_and_save(Vec::new()),
            Err(RecorderError::Closed)
        ));
        assert!(matches!(rec.start(None), Err(RecorderError::Closed)));
    }

    #[test]
    fn oversized_extra_data_is_dropped_not_fatal() {
        let mut nested = ExtraValue::Int(0);
        for _ in 0..40 {
            nested = ExtraValue::List(vec![nested]);
        }
        let mut profile = entity_profile("minecraft:chest_minecart", pose(0.0, 0.0, 0.0));
        profile.extra.insert("deep", nested);

        let rec = recorder(3600);
        rec.add_entity(uuid(5), &profile);
        let log = save(&rec);
        match &log.actions_at(1)[0] {
            Action::EntitySpawn(s) => assert!(s.extra.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn crack_duration_saturates() {
        let rec = recorder(3600);
        rec.push_crack_block(BlockPos::new(1, 2, 3), CrackKind::Start, Duration::from_secs(3600));
        let log = save(&rec);
        match &log.actions_at(1)[0] {
            Action::CrackBlock(c) => assert_eq!(c.duration_ms, u16::MAX),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn tick_thread_advances_until_closed() {
        let config = RecorderConfig {
            tick_rate_hz: 1000.0,
            ..RecorderConfig::default()
        };
        let rec = Recorder::new(config, Arc::new(lookup())).unwrap();
        rec.start(None).unwrap();
        assert!(matches!(rec.start(None), Err(RecorderError::AlreadyStarted)));
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while rec.tick() < 5 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        let log = save(&rec);
        let tick_at_close = log.total_ticks();
        assert!(tick_at_close >= 5);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(rec.tick(), tick_at_close);
    }
}
