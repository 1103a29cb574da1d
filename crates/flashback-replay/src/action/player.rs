//! Player lifecycle, appearance and state actions.

use flashback_core::angle::{decode_pitch, decode_yaw};
use flashback_core::{
    PlayerAnimation, PlayerFlag, PlayerProfile, Pose, Rotation, Skin, SurrogateId, Vec3,
};
use uuid::Uuid;

use crate::codec::{
    read_skin, write_bool, write_id, write_skin, write_str, write_u16_le, write_u8,
    write_uuid, write_varuint32, write_vec3, ByteReader,
};
use crate::error::{CodecError, PlayError};
use crate::play::{require_player, PlayContext, ReverseHandler};
use crate::record::{ArmourRecord, HeldRecord};

use super::Action;

// ── PlayerSpawn ─────────────────────────────────────────────────

/// A player appearing in the world.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerSpawn {
    /// Surrogate id of the new player.
    pub id: SurrogateId,
    /// Player name.
    pub name: String,
    /// Name tag at spawn time.
    pub name_tag: String,
    /// Spawn position.
    pub position: Vec3,
    /// Quantised yaw.
    pub yaw: u16,
    /// Quantised pitch.
    pub pitch: u16,
    /// Worn armour.
    pub armour: ArmourRecord,
    /// Held items.
    pub held: HeldRecord,
}

impl PlayerSpawn {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_id(buf, self.id);
        write_str(buf, &self.name);
        write_str(buf, &self.name_tag);
        write_vec3(buf, self.position);
        write_u16_le(buf, self.yaw);
        write_u16_le(buf, self.pitch);
        self.armour.encode(buf);
        self.held.encode(buf);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            id: r.read_id()?,
            name: r.read_string()?,
            name_tag: r.read_string()?,
            position: r.read_vec3()?,
            yaw: r.read_u16_le()?,
            pitch: r.read_u16_le()?,
            armour: ArmourRecord::decode(r)?,
            held: HeldRecord::decode(r)?,
        })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        let lookup = ctx.lookup();
        let profile = PlayerProfile {
            name: self.name.clone(),
            name_tag: self.name_tag.clone(),
            pose: Pose::new(
                self.position,
                Rotation::new(decode_yaw(self.yaw), decode_pitch(self.pitch)),
            ),
            armour: self.armour.to_armour(lookup),
            held: self.held.to_held(lookup),
        };
        let skin = ctx.roster().skin(self.id).cloned();
        ctx.world().spawn_player(self.id, &profile, skin.as_ref());
        ctx.on_reverse(ReverseHandler::DespawnPlayer { id: self.id });
        Ok(())
    }
}

// ── PlayerDespawn ───────────────────────────────────────────────

/// A player leaving the world.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerDespawn {
    /// The departing player.
    pub id: SurrogateId,
}

impl PlayerDespawn {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_id(buf, self.id);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self { id: r.read_id()? })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        let id = self.id;
        let world = ctx.world_ref();
        let profile = world
            .player_profile(id)
            .ok_or(PlayError::MissingTarget { id })?;
        let flags = PlayerFlag::ALL
            .into_iter()
            .filter(|f| world.player_flag(id, *f).unwrap_or(false))
            .collect();
        let effects = world.player_effects(id).unwrap_or_default();
        ctx.world().despawn_player(id);
        ctx.on_reverse(ReverseHandler::RespawnPlayer {
            id,
            profile: Box::new(profile),
            flags,
            effects,
        });
        Ok(())
    }
}

// ── PlayerHandChange / PlayerArmourChange ───────────────────────

/// A player's held items changing.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerHandChange {
    /// Target player.
    pub id: SurrogateId,
    /// New held items.
    pub held: HeldRecord,
}

impl PlayerHandChange {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_id(buf, self.id);
        self.held.encode(buf);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            id: r.read_id()?,
            held: HeldRecord::decode(r)?,
        })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        let id = self.id;
        let previous = ctx
            .world_ref()
            .player_held_items(id)
            .ok_or(PlayError::MissingTarget { id })?;
        let held = self.held.to_held(ctx.lookup());
        ctx.world().set_player_held_items(id, &held);
        ctx.on_reverse(ReverseHandler::SetHeldItems {
            id,
            held: Box::new(previous),
        });
        Ok(())
    }
}

/// A player's armour changing.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerArmourChange {
    /// Target player.
    pub id: SurrogateId,
    /// New armour.
    pub armour: ArmourRecord,
}

impl PlayerArmourChange {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_id(buf, self.id);
        self.armour.encode(buf);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            id: r.read_id()?,
            armour: ArmourRecord::decode(r)?,
        })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        let id = self.id;
        let previous = ctx
            .world_ref()
            .player_armour(id)
            .ok_or(PlayError::MissingTarget { id })?;
        let armour = self.armour.to_armour(ctx.lookup());
        ctx.world().set_player_armour(id, &armour);
        ctx.on_reverse(ReverseHandler::SetArmour {
            id,
            armour: Box::new(previous),
        });
        Ok(())
    }
}

// ── PlayerSkin ──────────────────────────────────────────────────

/// A player's skin. Recorded before the first spawn of each player.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerSkin {
    /// Target player.
    pub id: SurrogateId,
    /// The skin.
    pub skin: Skin,
}

impl PlayerSkin {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_id(buf, self.id);
        write_skin(buf, &self.skin);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            id: r.read_id()?,
            skin: read_skin(r)?,
        })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        let previous = ctx.roster().set_skin(self.id, self.skin.clone());
        if ctx.world_ref().player_pose(self.id).is_some() {
            ctx.world().set_player_skin(self.id, &self.skin);
        }
        ctx.on_reverse(ReverseHandler::SetSkin {
            id: self.id,
            skin: previous.map(Box::new),
        });
        Ok(())
    }
}

// ── PlayerAnimate ───────────────────────────────────────────────

/// Animation kinds carried by [`PlayerAnimate`].
///
/// Sneaking and item use leave lasting state; the rest are one-shot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerAnimateKind {
    /// Arm swing.
    Swing,
    /// Start sneaking.
    Sneak,
    /// Stop sneaking.
    StopSneak,
    /// Damage flash.
    Hurt,
    /// Eating particles.
    Eating,
    /// Start using an item.
    StartUsingItem,
    /// Stop using an item.
    StopUsingItem,
    /// Totem of undying.
    TotemUse,
    /// Critical hit sparkles.
    CriticalHit,
    /// Enchanted hit sparkles.
    EnchantedHit,
}

impl PlayerAnimateKind {
    /// Wire value.
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Swing => 0,
            Self::Sneak => 1,
            Self::StopSneak => 2,
            Self::Hurt => 3,
            Self::Eating => 4,
            Self::StartUsingItem => 5,
            Self::StopUsingItem => 6,
            Self::TotemUse => 7,
            Self::CriticalHit => 8,
            Self::EnchantedHit => 9,
        }
    }

    /// Parse a wire value.
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::Swing,
            1 => Self::Sneak,
            2 => Self::StopSneak,
            3 => Self::Hurt,
            4 => Self::Eating,
            5 => Self::StartUsingItem,
            6 => Self::StopUsingItem,
            7 => Self::TotemUse,
            8 => Self::CriticalHit,
            9 => Self::EnchantedHit,
            _ => return None,
        })
    }

    /// The flag this animation sets, and to what.
    fn flag_change(self) -> Option<(PlayerFlag, bool)> {
        match self {
            Self::Sneak => Some((PlayerFlag::Sneaking, true)),
            Self::StopSneak => Some((PlayerFlag::Sneaking, false)),
            Self::StartUsingItem => Some((PlayerFlag::UsingItem, true)),
            Self::StopUsingItem => Some((PlayerFlag::UsingItem, false)),
            _ => None,
        }
    }

    /// The one-shot animation shown, if this kind is one.
    fn animation(self) -> Option<PlayerAnimation> {
        match self {
            Self::Swing => Some(PlayerAnimation::Swing),
            Self::Hurt => Some(PlayerAnimation::Hurt),
            Self::Eating => Some(PlayerAnimation::Eating),
            Self::TotemUse => Some(PlayerAnimation::TotemUse),
            Self::CriticalHit => Some(PlayerAnimation::CriticalHit),
            Self::EnchantedHit => Some(PlayerAnimation::EnchantedHit),
            _ => None,
        }
    }
}

impl From<PlayerAnimation> for PlayerAnimateKind {
    fn from(a: PlayerAnimation) -> Self {
        match a {
            PlayerAnimation::Swing => Self::Swing,
            PlayerAnimation::Hurt => Self::Hurt,
            PlayerAnimation::Eating => Self::Eating,
            PlayerAnimation::TotemUse => Self::TotemUse,
            PlayerAnimation::CriticalHit => Self::CriticalHit,
            PlayerAnimation::EnchantedHit => Self::EnchantedHit,
        }
    }
}

/// A player animation or sneak/item-use toggle.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerAnimate {
    /// Target player.
    pub id: SurrogateId,
    /// What happened.
    pub kind: PlayerAnimateKind,
}

impl PlayerAnimate {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_id(buf, self.id);
        write_u8(buf, self.kind.to_u8());
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let id = r.read_id()?;
        let raw = r.read_u8()?;
        let kind = PlayerAnimateKind::from_u8(raw)
            .ok_or_else(|| r.malformed(format!("unknown player animation {raw}")))?;
        Ok(Self { id, kind })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        let id = self.id;
        require_player(ctx, id)?;
        if let Some((flag, value)) = self.kind.flag_change() {
            let previous = ctx.world_ref().player_flag(id, flag).unwrap_or(false);
            ctx.world().set_player_flag(id, flag, value);
            ctx.on_reverse(ReverseHandler::SetPlayerFlag {
                id,
                flag,
                value: previous,
            });
        } else if let Some(animation) = self.kind.animation() {
            ctx.world().animate_player(id, animation);
            ctx.on_reverse(ReverseHandler::Replay(Box::new(Action::PlayerAnimate(
                self.clone(),
            ))));
        }
        Ok(())
    }
}

// ── SetPlayerState ──────────────────────────────────────────────

/// Wire value of a player flag.
pub fn flag_to_u8(flag: PlayerFlag) -> u8 {
    match flag {
        PlayerFlag::Visible => 0,
        PlayerFlag::Sneaking => 1,
        PlayerFlag::Sprinting => 2,
        PlayerFlag::Gliding => 3,
        PlayerFlag::UsingItem => 4,
        PlayerFlag::Swimming => 5,
        PlayerFlag::Crawling => 6,
        PlayerFlag::OnFire => 7,
    }
}

/// Parse the wire value of a player flag.
pub fn flag_from_u8(v: u8) -> Option<PlayerFlag> {
    PlayerFlag::ALL.into_iter().find(|f| flag_to_u8(*f) == v)
}

/// A boolean player state change.
#[derive(Clone, Debug, PartialEq)]
pub struct SetPlayerState {
    /// Target player.
    pub id: SurrogateId,
    /// Which flag.
    pub flag: PlayerFlag,
    /// New value.
    pub value: bool,
}

impl SetPlayerState {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_id(buf, self.id);
        write_u8(buf, flag_to_u8(self.flag));
        write_bool(buf, self.value);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let id = r.read_id()?;
        let raw = r.read_u8()?;
        let flag =
            flag_from_u8(raw).ok_or_else(|| r.malformed(format!("unknown player state {raw}")))?;
        Ok(Self {
            id,
            flag,
            value: r.read_bool()?,
        })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        let id = self.id;
        let previous = ctx
            .world_ref()
            .player_flag(id, self.flag)
            .ok_or(PlayError::MissingTarget { id })?;
        ctx.world().set_player_flag(id, self.flag, self.value);
        ctx.on_reverse(ReverseHandler::SetPlayerFlag {
            id,
            flag: self.flag,
            value: previous,
        });
        Ok(())
    }
}

// ── PlayerNameTagUpdate ─────────────────────────────────────────

/// A player's name tag changing.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerNameTagUpdate {
    /// Target player.
    pub id: SurrogateId,
    /// New tag.
    pub name_tag: String,
}

impl PlayerNameTagUpdate {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_id(buf, self.id);
        write_str(buf, &self.name_tag);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            id: r.read_id()?,
            name_tag: r.read_string()?,
        })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        let id = self.id;
        let previous = ctx
            .world_ref()
            .player_name_tag(id)
            .ok_or(PlayError::MissingTarget { id })?;
        ctx.world().set_player_name_tag(id, &self.name_tag);
        ctx.on_reverse(ReverseHandler::SetPlayerNameTag {
            id,
            name_tag: previous,
        });
        Ok(())
    }
}

// ── SetPlayerVisibleEffects ─────────────────────────────────────

/// The set of effects whose particles show on a player.
#[derive(Clone, Debug, PartialEq)]
pub struct SetPlayerVisibleEffects {
    /// Target player.
    pub id: SurrogateId,
    /// Effect ids.
    pub effects: Vec<u8>,
}

impl SetPlayerVisibleEffects {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_id(buf, self.id);
        write_varuint32(buf, self.effects.len() as u32);
        buf.extend_from_slice(&self.effects);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let id = r.read_id()?;
        let count = r.read_count(1)?;
        Ok(Self {
            id,
            effects: r.take(count)?.to_vec(),
        })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        let id = self.id;
        let previous = ctx
            .world_ref()
            .player_effects(id)
            .ok_or(PlayError::MissingTarget { id })?;
        ctx.world().set_player_effects(id, &self.effects);
        ctx.on_reverse(ReverseHandler::SetEffects {
            id,
            effects: previous,
        });
        Ok(())
    }
}

// ── Emote ───────────────────────────────────────────────────────

/// A player performing an emote.
#[derive(Clone, Debug, PartialEq)]
pub struct Emote {
    /// Target player.
    pub id: SurrogateId,
    /// Emote identifier.
    pub emote: Uuid,
}

impl Emote {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_id(buf, self.id);
        write_uuid(buf, &self.emote);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            id: r.read_id()?,
            emote: r.read_uuid()?,
        })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        require_player(ctx, self.id)?;
        ctx.world().emote(self.id, self.emote);
        ctx.on_reverse(ReverseHandler::Replay(Box::new(Action::Emote(self.clone()))));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wire_values_are_dense() {
        for (i, flag) in PlayerFlag::ALL.into_iter().enumerate() {
            assert_eq!(flag_to_u8(flag), i as u8);
            assert_eq!(flag_from_u8(i as u8), Some(flag));
        }
        assert_eq!(flag_from_u8(8), None);
    }

    #[test]
    fn animate_kinds_round_trip() {
        for v in 0..10u8 {
            assert_eq!(PlayerAnimateKind::from_u8(v).unwrap().to_u8(), v);
        }
        assert!(PlayerAnimateKind::from_u8(10).is_none());
    }

    #[test]
    fn only_toggles_change_flags() {
        assert!(PlayerAnimateKind::Swing.flag_change().is_none());
        assert_eq!(
            PlayerAnimateKind::StopUsingItem.flag_change(),
            Some((PlayerFlag::UsingItem, false))
        );
        assert!(PlayerAnimateKind::Sneak.animation().is_none());
    }
}
