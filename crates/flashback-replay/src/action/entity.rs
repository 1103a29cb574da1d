//! Non-player entity actions.

use flashback_core::angle::{decode_pitch, decode_yaw};
use flashback_core::{EntityAnimation, EntityProfile, ExtraData, Pose, Rotation, SurrogateId, Vec3};

use crate::codec::{
    read_extra, write_extra, write_id, write_str, write_u16_le, write_u8, write_vec3, ByteReader,
};
use crate::error::{CodecError, PlayError};
use crate::play::{require_entity, PlayContext, ReverseHandler};

use super::Action;

/// An entity appearing in the world.
#[derive(Clone, Debug, PartialEq)]
pub struct EntitySpawn {
    /// Surrogate id of the new entity.
    pub id: SurrogateId,
    /// Namespaced entity type.
    pub identifier: String,
    /// Name tag at spawn time.
    pub name_tag: String,
    /// Spawn position.
    pub position: Vec3,
    /// Quantised yaw.
    pub yaw: u16,
    /// Quantised pitch.
    pub pitch: u16,
    /// Type-specific data.
    pub extra: ExtraData,
}

impl EntitySpawn {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_id(buf, self.id);
        write_str(buf, &self.identifier);
        write_str(buf, &self.name_tag);
        write_vec3(buf, self.position);
        write_u16_le(buf, self.yaw);
        write_u16_le(buf, self.pitch);
        write_extra(buf, &self.extra);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            id: r.read_id()?,
            identifier: r.read_string()?,
            name_tag: r.read_string()?,
            position: r.read_vec3()?,
            yaw: r.read_u16_le()?,
            pitch: r.read_u16_le()?,
            extra: read_extra(r)?,
        })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        let profile = EntityProfile {
            identifier: self.identifier.clone(),
            name_tag: self.name_tag.clone(),
            pose: Pose::new(
                self.position,
                Rotation::new(decode_yaw(self.yaw), decode_pitch(self.pitch)),
            ),
            extra: self.extra.clone(),
        };
        ctx.world().spawn_entity(self.id, &profile);
        ctx.on_reverse(ReverseHandler::DespawnEntity { id: self.id });
        Ok(())
    }
}

/// An entity leaving the world.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityDespawn {
    /// The departing entity.
    pub id: SurrogateId,
}

impl EntityDespawn {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_id(buf, self.id);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self { id: r.read_id()? })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        let id = self.id;
        let profile = ctx
            .world_ref()
            .entity_profile(id)
            .ok_or(PlayError::MissingTarget { id })?;
        ctx.world().despawn_entity(id);
        ctx.on_reverse(ReverseHandler::RespawnEntity {
            id,
            profile: Box::new(profile),
        });
        Ok(())
    }
}

/// An entity's name tag changing.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityNameTagUpdate {
    /// Target entity.
    pub id: SurrogateId,
    /// New tag.
    pub name_tag: String,
}

impl EntityNameTagUpdate {
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
            .entity_name_tag(id)
            .ok_or(PlayError::MissingTarget { id })?;
        ctx.world().set_entity_name_tag(id, &self.name_tag);
        ctx.on_reverse(ReverseHandler::SetEntityNameTag {
            id,
            name_tag: previous,
        });
        Ok(())
    }
}

/// Wire value of an entity animation.
pub fn entity_animation_to_u8(a: EntityAnimation) -> u8 {
    match a {
        EntityAnimation::FireworkExplosion => 0,
        EntityAnimation::ArrowShake => 1,
    }
}

/// A one-shot entity animation.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityAnimate {
    /// Target entity.
    pub id: SurrogateId,
    /// Animation to show.
    pub animation: EntityAnimation,
}

impl EntityAnimate {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_id(buf, self.id);
        write_u8(buf, entity_animation_to_u8(self.animation));
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let id = r.read_id()?;
        let animation = match r.read_u8()? {
            0 => EntityAnimation::FireworkExplosion,
            1 => EntityAnimation::ArrowShake,
            other => return Err(r.malformed(format!("unknown entity animation {other}"))),
        };
        Ok(Self { id, animation })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        require_entity(ctx, self.id)?;
        ctx.world().animate_entity(self.id, self.animation);
        ctx.on_reverse(ReverseHandler::Replay(Box::new(Action::EntityAnimate(
            self.clone(),
        ))));
        Ok(())
    }
}
