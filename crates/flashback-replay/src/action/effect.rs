//! Presentation-only events: sounds and particles.
//!
//! None of these change lasting world state, so each one is undone by
//! simply showing it again.

use flashback_core::{BlockPos, Particle, Sound, Vec3};

use crate::codec::{
    write_block_pos, write_bool, write_f32_le, write_u8, write_varuint32, write_vec3, ByteReader,
};
use crate::error::{CodecError, PlayError};
use crate::play::{PlayContext, ReverseHandler};
use crate::record::BlockRecord;

use super::Action;

fn replay_self(ctx: &mut PlayContext<'_>, action: Action) {
    ctx.on_reverse(ReverseHandler::Replay(Box::new(action)));
}

/// Which block sound [`BlockSound`] plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockSoundKind {
    /// Block being broken.
    Breaking,
    /// Block being placed.
    Place,
}

/// A block-specific sound.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockSound {
    /// Where.
    pub pos: BlockPos,
    /// The block making the sound.
    pub block: BlockRecord,
    /// Which sound.
    pub kind: BlockSoundKind,
}

impl BlockSound {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_block_pos(buf, self.pos);
        self.block.encode(buf);
        write_u8(
            buf,
            match self.kind {
                BlockSoundKind::Breaking => 0,
                BlockSoundKind::Place => 1,
            },
        );
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let pos = r.read_block_pos()?;
        let block = BlockRecord::decode(r)?;
        let kind = match r.read_u8()? {
            0 => BlockSoundKind::Breaking,
            1 => BlockSoundKind::Place,
            other => return Err(r.malformed(format!("unknown block sound {other}"))),
        };
        Ok(Self { pos, block, kind })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        let block = self.block.to_block(ctx.lookup());
        let sound = match self.kind {
            BlockSoundKind::Breaking => Sound::BlockBreaking(block),
            BlockSoundKind::Place => Sound::BlockPlace(block),
        };
        ctx.world().play_sound(self.pos.centre(), &sound);
        replay_self(ctx, Action::BlockSound(self.clone()));
        Ok(())
    }
}

/// Which bucket sound [`LiquidSound`] plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiquidSoundKind {
    /// Bucket filled.
    Fill,
    /// Bucket emptied.
    Empty,
}

/// A bucket sound.
#[derive(Clone, Debug, PartialEq)]
pub struct LiquidSound {
    /// Water rather than lava.
    pub water: bool,
    /// Fill or empty.
    pub kind: LiquidSoundKind,
    /// Where.
    pub pos: BlockPos,
}

impl LiquidSound {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_bool(buf, self.water);
        write_u8(
            buf,
            match self.kind {
                LiquidSoundKind::Fill => 0,
                LiquidSoundKind::Empty => 1,
            },
        );
        write_block_pos(buf, self.pos);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let water = r.read_bool()?;
        let kind = match r.read_u8()? {
            0 => LiquidSoundKind::Fill,
            1 => LiquidSoundKind::Empty,
            other => return Err(r.malformed(format!("unknown liquid sound {other}"))),
        };
        Ok(Self {
            water,
            kind,
            pos: r.read_block_pos()?,
        })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        let water = self.water;
        let sound = match self.kind {
            LiquidSoundKind::Fill => Sound::BucketFill { water },
            LiquidSoundKind::Empty => Sound::BucketEmpty { water },
        };
        ctx.world().play_sound(self.pos.centre(), &sound);
        replay_self(ctx, Action::LiquidSound(self.clone()));
        Ok(())
    }
}

/// Landing after a fall.
#[derive(Clone, Debug, PartialEq)]
pub struct FallSound {
    /// Where.
    pub pos: BlockPos,
    /// Distance fallen, in blocks.
    pub distance: f32,
}

impl FallSound {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_block_pos(buf, self.pos);
        write_f32_le(buf, self.distance);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            pos: r.read_block_pos()?,
            distance: r.read_f32_le()?,
        })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        ctx.world().play_sound(
            self.pos.centre(),
            &Sound::Fall {
                distance: self.distance,
            },
        );
        replay_self(ctx, Action::FallSound(self.clone()));
        Ok(())
    }
}

/// Any other sound, by adapter-defined id.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneralSound {
    /// Where.
    pub position: Vec3,
    /// Sound id.
    pub sound: u32,
}

impl GeneralSound {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_vec3(buf, self.position);
        write_varuint32(buf, self.sound);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            position: r.read_vec3()?,
            sound: r.read_varuint32()?,
        })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        ctx.world()
            .play_sound(self.position, &Sound::General(self.sound));
        replay_self(ctx, Action::GeneralSound(self.clone()));
        Ok(())
    }
}

/// Which particles [`BlockParticle`] shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockParticleKind {
    /// Block broken.
    Break,
    /// Block being mined on `face`.
    Punching {
        /// Face being hit.
        face: u8,
    },
}

/// Block debris particles.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockParticle {
    /// Where.
    pub pos: BlockPos,
    /// The block the debris comes from.
    pub block: BlockRecord,
    /// Which particles.
    pub kind: BlockParticleKind,
}

impl BlockParticle {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_block_pos(buf, self.pos);
        self.block.encode(buf);
        match self.kind {
            BlockParticleKind::Break => write_u8(buf, 0),
            BlockParticleKind::Punching { face } => {
                write_u8(buf, 1);
                write_u8(buf, face);
            }
        }
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let pos = r.read_block_pos()?;
        let block = BlockRecord::decode(r)?;
        let kind = match r.read_u8()? {
            0 => BlockParticleKind::Break,
            1 => BlockParticleKind::Punching { face: r.read_u8()? },
            other => return Err(r.malformed(format!("unknown block particle {other}"))),
        };
        Ok(Self { pos, block, kind })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        let block = self.block.to_block(ctx.lookup());
        let particle = match self.kind {
            BlockParticleKind::Break => Particle::BlockBreak(block),
            BlockParticleKind::Punching { face } => Particle::PunchBlock { block, face },
        };
        ctx.world().add_particle(self.pos.centre(), &particle);
        replay_self(ctx, Action::BlockParticle(self.clone()));
        Ok(())
    }
}

/// Any other particle, by adapter-defined id.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneralParticle {
    /// Where.
    pub position: Vec3,
    /// Particle id.
    pub particle: u32,
}

impl GeneralParticle {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_vec3(buf, self.position);
        write_varuint32(buf, self.particle);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            position: r.read_vec3()?,
            particle: r.read_varuint32()?,
        })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        ctx.world()
            .add_particle(self.position, &Particle::General(self.particle));
        replay_self(ctx, Action::GeneralParticle(self.clone()));
        Ok(())
    }
}
