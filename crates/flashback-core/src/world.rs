//! The live environment seen from playback.
//!
//! [`WorldAdapter`] is the only bridge between replayed actions and an
//! externally owned environment. Queries return `None` when the target is
//! not present; mutations on absent targets are no-ops.
//!
//! Adapters are never touched directly by the engine's background threads.
//! Every tick is submitted through a [`WorldExecutor`], the environment's
//! own serialized execution context, so at most one tick runs against the
//! world at a time.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use uuid::Uuid;

use crate::descriptor::{
    Armour, BlockState, EntityAnimation, EntityProfile, HeldItems, Particle, PlayerAnimation,
    PlayerFlag, PlayerProfile, Skin, Sound,
};
use crate::extra::ExtraData;
use crate::geometry::{BlockPos, Pose, Vec3};
use crate::id::SurrogateId;

/// Read and mutate the environment a replay is played into.
pub trait WorldAdapter {
    // ── Blocks ──────────────────────────────────────────────────

    /// The block at `pos` on `layer` (0 is the main layer).
    fn block(&self, pos: BlockPos, layer: u8) -> BlockState;

    /// Replace the block at `pos` on `layer`.
    fn set_block(&mut self, pos: BlockPos, block: &BlockState, layer: u8);

    /// The liquid occupying `pos`, if any.
    fn liquid(&self, pos: BlockPos) -> Option<BlockState>;

    /// Set or clear the liquid at `pos`.
    fn set_liquid(&mut self, pos: BlockPos, liquid: Option<&BlockState>);

    /// Whether the container at `pos` is shown open.
    fn chest_open(&self, pos: BlockPos) -> bool;

    /// Open or close the container at `pos`.
    fn set_chest_open(&mut self, pos: BlockPos, open: bool);

    /// Begin the mining-progress visual at `pos`.
    fn start_crack(&mut self, pos: BlockPos, duration: Duration);

    /// Update the remaining mining time at `pos`.
    fn continue_crack(&mut self, pos: BlockPos, duration: Duration);

    /// Remove the mining-progress visual at `pos`.
    fn stop_crack(&mut self, pos: BlockPos);

    // ── Players ─────────────────────────────────────────────────

    /// Spawn a player under `id`.
    fn spawn_player(&mut self, id: SurrogateId, profile: &PlayerProfile, skin: Option<&Skin>);

    /// Remove the player `id`.
    fn despawn_player(&mut self, id: SurrogateId);

    /// Current profile of player `id`, enough to respawn it as it is now.
    fn player_profile(&self, id: SurrogateId) -> Option<PlayerProfile>;

    /// Current pose of player `id`.
    fn player_pose(&self, id: SurrogateId) -> Option<Pose> {
        self.player_profile(id).map(|p| p.pose)
    }

    /// Teleport player `id`.
    fn move_player(&mut self, id: SurrogateId, pose: Pose);

    /// Items held by player `id`.
    fn player_held_items(&self, id: SurrogateId) -> Option<HeldItems> {
        self.player_profile(id).map(|p| p.held)
    }

    /// Replace the items held by player `id`.
    fn set_player_held_items(&mut self, id: SurrogateId, held: &HeldItems);

    /// Armour worn by player `id`.
    fn player_armour(&self, id: SurrogateId) -> Option<Armour> {
        self.player_profile(id).map(|p| p.armour)
    }

    /// Replace the armour worn by player `id`.
    fn set_player_armour(&mut self, id: SurrogateId, armour: &Armour);

    /// Name tag of player `id`.
    fn player_name_tag(&self, id: SurrogateId) -> Option<String> {
        self.player_profile(id).map(|p| p.name_tag)
    }

    /// Replace the name tag of player `id`.
    fn set_player_name_tag(&mut self, id: SurrogateId, name_tag: &str);

    /// Skin of player `id`.
    fn player_skin(&self, id: SurrogateId) -> Option<Skin>;

    /// Replace the skin of player `id`.
    fn set_player_skin(&mut self, id: SurrogateId, skin: &Skin);

    /// A state flag of player `id`.
    fn player_flag(&self, id: SurrogateId, flag: PlayerFlag) -> Option<bool>;

    /// Set a state flag of player `id`.
    fn set_player_flag(&mut self, id: SurrogateId, flag: PlayerFlag, value: bool);

    /// Effect ids whose particles are visible on player `id`.
    fn player_effects(&self, id: SurrogateId) -> Option<Vec<u8>>;

    /// Replace the visible effect ids of player `id`.
    fn set_player_effects(&mut self, id: SurrogateId, effects: &[u8]);

    /// Play a one-shot animation on player `id`.
    fn animate_player(&mut self, id: SurrogateId, animation: PlayerAnimation);

    /// Play emote `emote` on player `id`.
    fn emote(&mut self, id: SurrogateId, emote: Uuid);

    // ── Entities ────────────────────────────────────────────────

    /// Spawn a non-player entity under `id`.
    fn spawn_entity(&mut self, id: SurrogateId, profile: &EntityProfile);

    /// Remove the entity `id`.
    fn despawn_entity(&mut self, id: SurrogateId);

    /// Current profile of entity `id`.
    fn entity_profile(&self, id: SurrogateId) -> Option<EntityProfile>;

    /// Current pose of entity `id`.
    fn entity_pose(&self, id: SurrogateId) -> Option<Pose> {
        self.entity_profile(id).map(|p| p.pose)
    }

    /// Teleport entity `id`.
    fn move_entity(&mut self, id: SurrogateId, pose: Pose);

    /// Name tag of entity `id`.
    fn entity_name_tag(&self, id: SurrogateId) -> Option<String> {
        self.entity_profile(id).map(|p| p.name_tag)
    }

    /// Replace the name tag of entity `id`.
    fn set_entity_name_tag(&mut self, id: SurrogateId, name_tag: &str);

    /// Type-specific data of entity `id`.
    fn entity_extra(&self, id: SurrogateId) -> Option<ExtraData> {
        self.entity_profile(id).map(|p| p.extra)
    }

    /// Replace the type-specific data of entity `id`.
    fn set_entity_extra(&mut self, id: SurrogateId, extra: &ExtraData);

    /// Play a one-shot animation on entity `id`.
    fn animate_entity(&mut self, id: SurrogateId, animation: EntityAnimation);

    // ── Presentation ────────────────────────────────────────────

    /// Play `sound` at `pos`.
    fn play_sound(&mut self, pos: Vec3, sound: &Sound);

    /// Show `particle` at `pos`.
    fn add_particle(&mut self, pos: Vec3, particle: &Particle);
}

/// The environment's serialized execution context.
///
/// `execute` runs `task` with exclusive access to the world and returns
/// once it has finished. Implementations decide how exclusivity is
/// obtained (a mutex, a FIFO on the environment's own thread, ...).
pub trait WorldExecutor: Send + Sync {
    /// Run `task` against the world.
    fn execute(&self, task: &mut dyn FnMut(&mut dyn WorldAdapter));
}

/// A [`WorldExecutor`] over a mutex-guarded adapter.
///
/// Clones share the same world.
pub struct SharedWorld<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> SharedWorld<W> {
    /// Wrap `world`.
    pub fn new(world: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(world)),
        }
    }

    /// Lock the world for direct inspection.
    ///
    /// A panic inside an earlier task does not make the world unusable;
    /// the lock is recovered.
    pub fn lock(&self) -> MutexGuard<'_, W> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W> Clone for SharedWorld<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: WorldAdapter + Send> WorldExecutor for SharedWorld<W> {
    fn execute(&self, task: &mut dyn FnMut(&mut dyn WorldAdapter)) {
        let mut world = self.lock();
        task(&mut *world);
    }
}
