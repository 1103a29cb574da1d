//! Applying actions to a world, and undoing them.
//!
//! Forward application happens through [`Action::play`] with a fresh
//! [`PlayContext`]. An action that changes lasting state leaves a
//! [`ReverseHandler`] in the context: a small command value holding just
//! the state needed to put things back. Playback stores the handlers per
//! tick and applies them, in recorded order, when the tick is rewound.

use std::collections::HashMap;
use std::time::Duration;

use flashback_core::{
    Armour, BlockPos, BlockState, CodecLookup, EntityProfile, HeldItems, PlayerFlag,
    PlayerProfile, Pose, Skin, SurrogateId, WorldAdapter,
};

use crate::action::Action;
use crate::error::PlayError;

// ── Roster ──────────────────────────────────────────────────────

/// State playback owns independently of the world.
///
/// Skins are recorded before the spawn they belong to, so they have to be
/// kept somewhere while the player does not exist yet.
#[derive(Debug, Default)]
pub struct Roster {
    skins: HashMap<SurrogateId, Skin>,
}

impl Roster {
    /// An empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skin last assigned to `id`.
    pub fn skin(&self, id: SurrogateId) -> Option<&Skin> {
        self.skins.get(&id)
    }

    /// Assign a skin, returning the previous one.
    pub fn set_skin(&mut self, id: SurrogateId, skin: Skin) -> Option<Skin> {
        self.skins.insert(id, skin)
    }

    /// Forget the skin of `id`, returning it.
    pub fn clear_skin(&mut self, id: SurrogateId) -> Option<Skin> {
        self.skins.remove(&id)
    }
}

// ── PlayContext ─────────────────────────────────────────────────

/// Everything an action needs while it is applied.
pub struct PlayContext<'a> {
    world: &'a mut dyn WorldAdapter,
    lookup: &'a dyn CodecLookup,
    roster: &'a mut Roster,
    reverse: Option<ReverseHandler>,
}

impl<'a> PlayContext<'a> {
    /// Bind a context to a world, lookup tables and roster.
    pub fn new(
        world: &'a mut dyn WorldAdapter,
        lookup: &'a dyn CodecLookup,
        roster: &'a mut Roster,
    ) -> Self {
        Self {
            world,
            lookup,
            roster,
            reverse: None,
        }
    }

    /// The world being played into.
    pub fn world(&mut self) -> &mut dyn WorldAdapter {
        &mut *self.world
    }

    /// Read-only view of the world.
    pub fn world_ref(&self) -> &dyn WorldAdapter {
        &*self.world
    }

    /// Descriptor tables.
    pub fn lookup(&self) -> &'a dyn CodecLookup {
        self.lookup
    }

    /// Playback-owned state.
    pub fn roster(&mut self) -> &mut Roster {
        &mut *self.roster
    }

    /// Register the handler that undoes the current action.
    pub fn on_reverse(&mut self, handler: ReverseHandler) {
        self.reverse = Some(handler);
    }

    /// Take the registered handler, if any.
    pub fn take_reverse(&mut self) -> Option<ReverseHandler> {
        self.reverse.take()
    }
}

// ── ReverseHandler ──────────────────────────────────────────────

/// An operation that undoes one forward application.
#[derive(Clone, Debug, PartialEq)]
pub enum ReverseHandler {
    /// Put a block back.
    SetBlock {
        /// Where.
        pos: BlockPos,
        /// The block that was there.
        block: BlockState,
        /// Layer it sat on.
        layer: u8,
    },
    /// Put a liquid back (or clear it).
    SetLiquid {
        /// Where.
        pos: BlockPos,
        /// The liquid that was there.
        liquid: Option<BlockState>,
    },
    /// Move a player back.
    MovePlayer {
        /// Which player.
        id: SurrogateId,
        /// Its previous pose.
        pose: Pose,
    },
    /// Move an entity back.
    MoveEntity {
        /// Which entity.
        id: SurrogateId,
        /// Its previous pose.
        pose: Pose,
    },
    /// Remove a player that was spawned.
    DespawnPlayer {
        /// Which player.
        id: SurrogateId,
    },
    /// Bring back a player that was despawned.
    RespawnPlayer {
        /// Which player.
        id: SurrogateId,
        /// Its profile at despawn time.
        profile: Box<PlayerProfile>,
        /// Flags that were set at despawn time.
        flags: Vec<PlayerFlag>,
        /// Visible effects at despawn time.
        effects: Vec<u8>,
    },
    /// Remove an entity that was spawned.
    DespawnEntity {
        /// Which entity.
        id: SurrogateId,
    },
    /// Bring back an entity that was despawned.
    RespawnEntity {
        /// Which entity.
        id: SurrogateId,
        /// Its profile at despawn time.
        profile: Box<EntityProfile>,
    },
    /// Restore held items.
    SetHeldItems {
        /// Which player.
        id: SurrogateId,
        /// Previous items.
        held: Box<HeldItems>,
    },
    /// Restore worn armour.
    SetArmour {
        /// Which player.
        id: SurrogateId,
        /// Previous armour.
        armour: Box<Armour>,
    },
    /// Restore a player's name tag.
    SetPlayerNameTag {
        /// Which player.
        id: SurrogateId,
        /// Previous tag.
        name_tag: String,
    },
    /// Restore an entity's name tag.
    SetEntityNameTag {
        /// Which entity.
        id: SurrogateId,
        /// Previous tag.
        name_tag: String,
    },
    /// Restore a skin, or forget it if there was none.
    SetSkin {
        /// Which player.
        id: SurrogateId,
        /// Previous skin.
        skin: Option<Box<Skin>>,
    },
    /// Restore a state flag.
    SetPlayerFlag {
        /// Which player.
        id: SurrogateId,
        /// Which flag.
        flag: PlayerFlag,
        /// Previous value.
        value: bool,
    },
    /// Restore visible effects.
    SetEffects {
        /// Which player.
        id: SurrogateId,
        /// Previous effect ids.
        effects: Vec<u8>,
    },
    /// Restore a container's open state.
    SetChest {
        /// Where.
        pos: BlockPos,
        /// Previous state.
        open: bool,
    },
    /// Remove a mining-progress visual.
    StopCrack {
        /// Where.
        pos: BlockPos,
    },
    /// Apply the action again. Used by presentation-only events.
    Replay(Box<Action>),
    /// Nothing to undo.
    Noop,
}

impl ReverseHandler {
    /// Undo the forward application this handler was created by.
    pub fn apply(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        match self {
            Self::SetBlock { pos, block, layer } => {
                ctx.world().set_block(*pos, block, *layer);
            }
            Self::SetLiquid { pos, liquid } => {
                ctx.world().set_liquid(*pos, liquid.as_ref());
            }
            Self::MovePlayer { id, pose } => {
                require_player(ctx, *id)?;
                ctx.world().move_player(*id, *pose);
            }
            Self::MoveEntity { id, pose } => {
                require_entity(ctx, *id)?;
                ctx.world().move_entity(*id, *pose);
            }
            Self::DespawnPlayer { id } => {
                require_player(ctx, *id)?;
                ctx.world().despawn_player(*id);
            }
            Self::RespawnPlayer {
                id,
                profile,
                flags,
                effects,
            } => {
                let skin = ctx.roster().skin(*id).cloned();
                let world = ctx.world();
                world.spawn_player(*id, profile, skin.as_ref());
                for flag in PlayerFlag::ALL {
                    world.set_player_flag(*id, flag, flags.contains(&flag));
                }
                world.set_player_effects(*id, effects);
            }
            Self::DespawnEntity { id } => {
                require_entity(ctx, *id)?;
                ctx.world().despawn_entity(*id);
            }
            Self::RespawnEntity { id, profile } => {
                ctx.world().spawn_entity(*id, profile);
            }
            Self::SetHeldItems { id, held } => {
                require_player(ctx, *id)?;
                ctx.world().set_player_held_items(*id, held);
            }
            Self::SetArmour { id, armour } => {
                require_player(ctx, *id)?;
                ctx.world().set_player_armour(*id, armour);
            }
            Self::SetPlayerNameTag { id, name_tag } => {
                require_player(ctx, *id)?;
                ctx.world().set_player_name_tag(*id, name_tag);
            }
            Self::SetEntityNameTag { id, name_tag } => {
                require_entity(ctx, *id)?;
                ctx.world().set_entity_name_tag(*id, name_tag);
            }
            Self::SetSkin { id, skin } => match skin {
                Some(skin) => {
                    ctx.roster().set_skin(*id, Skin::clone(skin));
                    if ctx.world_ref().player_pose(*id).is_some() {
                        ctx.world().set_player_skin(*id, skin);
                    }
                }
                None => {
                    ctx.roster().clear_skin(*id);
                }
            },
            Self::SetPlayerFlag { id, flag, value } => {
                require_player(ctx, *id)?;
                ctx.world().set_player_flag(*id, *flag, *value);
            }
            Self::SetEffects { id, effects } => {
                require_player(ctx, *id)?;
                ctx.world().set_player_effects(*id, effects);
            }
            Self::SetChest { pos, open } => {
                ctx.world().set_chest_open(*pos, *open);
            }
            Self::StopCrack { pos } => {
                ctx.world().stop_crack(*pos);
            }
            Self::Replay(action) => {
                action.play(ctx)?;
                ctx.take_reverse();
            }
            Self::Noop => {}
        }
        Ok(())
    }
}

/// Fail with [`PlayError::MissingTarget`] unless player `id` exists.
pub(crate) fn require_player(ctx: &PlayContext<'_>, id: SurrogateId) -> Result<Pose, PlayError> {
    ctx.world_ref()
        .player_pose(id)
        .ok_or(PlayError::MissingTarget { id })
}

/// Fail with [`PlayError::MissingTarget`] unless entity `id` exists.
pub(crate) fn require_entity(ctx: &PlayContext<'_>, id: SurrogateId) -> Result<Pose, PlayError> {
    ctx.world_ref()
        .entity_pose(id)
        .ok_or(PlayError::MissingTarget { id })
}

/// Milliseconds as a [`Duration`].
pub(crate) fn millis(ms: u16) -> Duration {
    Duration::from_millis(ms as u64)
}
