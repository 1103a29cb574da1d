//! The closed set of action variants.
//!
//! Every variant has a stable one-byte discriminator. Discriminators are
//! never reused: a retired variant keeps its number reserved. An encoded
//! record is the discriminator followed by the variant's fields in a fixed
//! order; decoding goes through the [`ActionRegistry`](crate::ActionRegistry).

mod block;
mod effect;
mod entity;
mod movement;
mod player;

pub use block::{BreakBlock, ChestUpdate, CrackBlock, CrackKind, PlaceBlock, SetBlock, SetLiquid};
pub use effect::{
    BlockParticle, BlockParticleKind, BlockSound, BlockSoundKind, FallSound, GeneralParticle,
    GeneralSound, LiquidSound, LiquidSoundKind,
};
pub use entity::{
    entity_animation_to_u8, EntityAnimate, EntityDespawn, EntityNameTagUpdate, EntitySpawn,
};
pub use movement::{MoveDelta, MoveTo, HAS_PITCH, HAS_X, HAS_Y, HAS_YAW, HAS_Z, MOVEMENT_EPSILON};
pub use player::{
    flag_from_u8, flag_to_u8, Emote, PlayerAnimate, PlayerAnimateKind, PlayerArmourChange,
    PlayerDespawn, PlayerHandChange, PlayerNameTagUpdate, PlayerSkin, PlayerSpawn,
    SetPlayerState, SetPlayerVisibleEffects,
};

use crate::codec::write_u8;
use crate::error::PlayError;
use crate::play::{require_entity, require_player, PlayContext, ReverseHandler};

// ── Discriminators ──────────────────────────────────────────────

/// [`Action::PlayerMove`].
pub const PLAYER_MOVE: u8 = 1;
/// [`Action::PlayerAnimate`].
pub const PLAYER_ANIMATE: u8 = 2;
/// [`Action::PlayerSpawn`].
pub const PLAYER_SPAWN: u8 = 3;
/// [`Action::PlayerDespawn`].
pub const PLAYER_DESPAWN: u8 = 4;
/// [`Action::SetBlock`].
pub const SET_BLOCK: u8 = 5;
/// [`Action::PlayerHandChange`].
pub const PLAYER_HAND_CHANGE: u8 = 6;
/// [`Action::PlayerArmourChange`].
pub const PLAYER_ARMOUR_CHANGE: u8 = 7;
/// [`Action::BreakBlock`].
pub const BREAK_BLOCK: u8 = 8;
/// [`Action::PlaceBlock`].
pub const PLACE_BLOCK: u8 = 9;
/// [`Action::PlayerSkin`].
pub const PLAYER_SKIN: u8 = 10;
/// [`Action::EntitySpawn`].
pub const ENTITY_SPAWN: u8 = 11;
/// [`Action::EntityDespawn`].
pub const ENTITY_DESPAWN: u8 = 12;
/// [`Action::EntityMove`].
pub const ENTITY_MOVE: u8 = 13;
/// [`Action::PlayerNameTagUpdate`].
pub const PLAYER_NAME_TAG_UPDATE: u8 = 14;
/// [`Action::EntityNameTagUpdate`].
pub const ENTITY_NAME_TAG_UPDATE: u8 = 15;
/// [`Action::SetLiquid`].
pub const SET_LIQUID: u8 = 16;
/// [`Action::ChestUpdate`].
pub const CHEST_UPDATE: u8 = 17;
/// [`Action::PlayerDeltaMove`].
pub const PLAYER_DELTA_MOVE: u8 = 18;
/// [`Action::EntityDeltaMove`].
pub const ENTITY_DELTA_MOVE: u8 = 19;
/// [`Action::Emote`].
pub const EMOTE: u8 = 20;
/// [`Action::CrackBlock`].
pub const CRACK_BLOCK: u8 = 21;
/// [`Action::BlockSound`].
pub const BLOCK_SOUND: u8 = 22;
/// [`Action::SetPlayerState`].
pub const SET_PLAYER_STATE: u8 = 23;
/// [`Action::BlockParticle`].
pub const BLOCK_PARTICLE: u8 = 24;
/// [`Action::FallSound`].
pub const FALL_SOUND: u8 = 25;
/// [`Action::GeneralParticle`].
pub const GENERAL_PARTICLE: u8 = 26;
/// [`Action::LiquidSound`].
pub const LIQUID_SOUND: u8 = 27;
/// [`Action::GeneralSound`].
pub const GENERAL_SOUND: u8 = 28;
/// [`Action::SetPlayerVisibleEffects`].
pub const SET_PLAYER_VISIBLE_EFFECTS: u8 = 29;
/// [`Action::EntityAnimate`].
pub const ENTITY_ANIMATE: u8 = 30;

// ── Action ──────────────────────────────────────────────────────

/// One immutable, self-describing world mutation or event.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Full player pose.
    PlayerMove(MoveTo),
    /// Player animation or sneak/item-use toggle.
    PlayerAnimate(PlayerAnimate),
    /// Player appears.
    PlayerSpawn(PlayerSpawn),
    /// Player leaves.
    PlayerDespawn(PlayerDespawn),
    /// Block replaced.
    SetBlock(SetBlock),
    /// Held items change.
    PlayerHandChange(PlayerHandChange),
    /// Armour changes.
    PlayerArmourChange(PlayerArmourChange),
    /// Block broken.
    BreakBlock(BreakBlock),
    /// Block placed.
    PlaceBlock(PlaceBlock),
    /// Player skin.
    PlayerSkin(PlayerSkin),
    /// Entity appears.
    EntitySpawn(EntitySpawn),
    /// Entity leaves.
    EntityDespawn(EntityDespawn),
    /// Full entity pose.
    EntityMove(MoveTo),
    /// Player name tag changes.
    PlayerNameTagUpdate(PlayerNameTagUpdate),
    /// Entity name tag changes.
    EntityNameTagUpdate(EntityNameTagUpdate),
    /// Liquid set or cleared.
    SetLiquid(SetLiquid),
    /// Container opens or closes.
    ChestUpdate(ChestUpdate),
    /// Changed part of a player pose.
    PlayerDeltaMove(MoveDelta),
    /// Changed part of an entity pose.
    EntityDeltaMove(MoveDelta),
    /// Player emote.
    Emote(Emote),
    /// Mining progress visual.
    CrackBlock(CrackBlock),
    /// Block sound.
    BlockSound(BlockSound),
    /// Player state flag.
    SetPlayerState(SetPlayerState),
    /// Block debris particles.
    BlockParticle(BlockParticle),
    /// Fall landing sound.
    FallSound(FallSound),
    /// Other particle.
    GeneralParticle(GeneralParticle),
    /// Bucket sound.
    LiquidSound(LiquidSound),
    /// Other sound.
    GeneralSound(GeneralSound),
    /// Visible effect particles.
    SetPlayerVisibleEffects(SetPlayerVisibleEffects),
    /// Entity animation.
    EntityAnimate(EntityAnimate),
}

impl Action {
    /// The variant's discriminator.
    pub fn discriminator(&self) -> u8 {
        match self {
            Self::PlayerMove(_) => PLAYER_MOVE,
            Self::PlayerAnimate(_) => PLAYER_ANIMATE,
            Self::PlayerSpawn(_) => PLAYER_SPAWN,
            Self::PlayerDespawn(_) => PLAYER_DESPAWN,
            Self::SetBlock(_) => SET_BLOCK,
            Self::PlayerHandChange(_) => PLAYER_HAND_CHANGE,
            Self::PlayerArmourChange(_) => PLAYER_ARMOUR_CHANGE,
            Self::BreakBlock(_) => BREAK_BLOCK,
            Self::PlaceBlock(_) => PLACE_BLOCK,
            Self::PlayerSkin(_) => PLAYER_SKIN,
            Self::EntitySpawn(_) => ENTITY_SPAWN,
            Self::EntityDespawn(_) => ENTITY_DESPAWN,
            Self::EntityMove(_) => ENTITY_MOVE,
            Self::PlayerNameTagUpdate(_) => PLAYER_NAME_TAG_UPDATE,
            Self::EntityNameTagUpdate(_) => ENTITY_NAME_TAG_UPDATE,
            Self::SetLiquid(_) => SET_LIQUID,
            Self::ChestUpdate(_) => CHEST_UPDATE,
            Self::PlayerDeltaMove(_) => PLAYER_DELTA_MOVE,
            Self::EntityDeltaMove(_) => ENTITY_DELTA_MOVE,
            Self::Emote(_) => EMOTE,
            Self::CrackBlock(_) => CRACK_BLOCK,
            Self::BlockSound(_) => BLOCK_SOUND,
            Self::SetPlayerState(_) => SET_PLAYER_STATE,
            Self::BlockParticle(_) => BLOCK_PARTICLE,
            Self::FallSound(_) => FALL_SOUND,
            Self::GeneralParticle(_) => GENERAL_PARTICLE,
            Self::LiquidSound(_) => LIQUID_SOUND,
            Self::GeneralSound(_) => GENERAL_SOUND,
            Self::SetPlayerVisibleEffects(_) => SET_PLAYER_VISIBLE_EFFECTS,
            Self::EntityAnimate(_) => ENTITY_ANIMATE,
        }
    }

    /// Append the discriminator and fields to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        write_u8(buf, self.discriminator());
        match self {
            Self::PlayerMove(a) | Self::EntityMove(a) => a.encode(buf),
            Self::PlayerDeltaMove(a) | Self::EntityDeltaMove(a) => a.encode(buf),
            Self::PlayerAnimate(a) => a.encode(buf),
            Self::PlayerSpawn(a) => a.encode(buf),
            Self::PlayerDespawn(a) => a.encode(buf),
            Self::SetBlock(a) => a.encode(buf),
            Self::PlayerHandChange(a) => a.encode(buf),
            Self::PlayerArmourChange(a) => a.encode(buf),
            Self::BreakBlock(a) => a.encode(buf),
            Self::PlaceBlock(a) => a.encode(buf),
            Self::PlayerSkin(a) => a.encode(buf),
            Self::EntitySpawn(a) => a.encode(buf),
            Self::EntityDespawn(a) => a.encode(buf),
            Self::PlayerNameTagUpdate(a) => a.encode(buf),
            Self::EntityNameTagUpdate(a) => a.encode(buf),
            Self::SetLiquid(a) => a.encode(buf),
            Self::ChestUpdate(a) => a.encode(buf),
            Self::Emote(a) => a.encode(buf),
            Self::CrackBlock(a) => a.encode(buf),
            Self::BlockSound(a) => a.encode(buf),
            Self::SetPlayerState(a) => a.encode(buf),
            Self::BlockParticle(a) => a.encode(buf),
            Self::FallSound(a) => a.encode(buf),
            Self::GeneralParticle(a) => a.encode(buf),
            Self::LiquidSound(a) => a.encode(buf),
            Self::GeneralSound(a) => a.encode(buf),
            Self::SetPlayerVisibleEffects(a) => a.encode(buf),
            Self::EntityAnimate(a) => a.encode(buf),
        }
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }

    /// Apply the action forward, leaving its reverse handler (if any) in
    /// `ctx`.
    pub fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        match self {
            Self::PlayerMove(m) => {
                let previous = require_player(ctx, m.id)?;
                ctx.world().move_player(m.id, m.pose);
                ctx.on_reverse(ReverseHandler::MovePlayer {
                    id: m.id,
                    pose: previous,
                });
                Ok(())
            }
            Self::EntityMove(m) => {
                let previous = require_entity(ctx, m.id)?;
                ctx.world().move_entity(m.id, m.pose);
                ctx.on_reverse(ReverseHandler::MoveEntity {
                    id: m.id,
                    pose: previous,
                });
                Ok(())
            }
            Self::PlayerDeltaMove(d) => {
                let previous = require_player(ctx, d.id)?;
                ctx.world().move_player(d.id, d.resolve(previous));
                ctx.on_reverse(ReverseHandler::MovePlayer {
                    id: d.id,
                    pose: previous,
                });
                Ok(())
            }
            Self::EntityDeltaMove(d) => {
                let previous = require_entity(ctx, d.id)?;
                ctx.world().move_entity(d.id, d.resolve(previous));
                ctx.on_reverse(ReverseHandler::MoveEntity {
                    id: d.id,
                    pose: previous,
                });
                Ok(())
            }
            Self::PlayerAnimate(a) => a.play(ctx),
            Self::PlayerSpawn(a) => a.play(ctx),
            Self::PlayerDespawn(a) => a.play(ctx),
            Self::SetBlock(a) => a.play(ctx),
            Self::PlayerHandChange(a) => a.play(ctx),
            Self::PlayerArmourChange(a) => a.play(ctx),
            Self::BreakBlock(a) => a.play(ctx),
            Self::PlaceBlock(a) => a.play(ctx),
            Self::PlayerSkin(a) => a.play(ctx),
            Self::EntitySpawn(a) => a.play(ctx),
            Self::EntityDespawn(a) => a.play(ctx),
            Self::PlayerNameTagUpdate(a) => a.play(ctx),
            Self::EntityNameTagUpdate(a) => a.play(ctx),
            Self::SetLiquid(a) => a.play(ctx),
            Self::ChestUpdate(a) => a.play(ctx),
            Self::Emote(a) => a.play(ctx),
            Self::CrackBlock(a) => a.play(ctx),
            Self::BlockSound(a) => a.play(ctx),
            Self::SetPlayerState(a) => a.play(ctx),
            Self::BlockParticle(a) => a.play(ctx),
            Self::FallSound(a) => a.play(ctx),
            Self::GeneralParticle(a) => a.play(ctx),
            Self::LiquidSound(a) => a.play(ctx),
            Self::GeneralSound(a) => a.play(ctx),
            Self::SetPlayerVisibleEffects(a) => a.play(ctx),
            Self::EntityAnimate(a) => a.play(ctx),
        }
    }
}
