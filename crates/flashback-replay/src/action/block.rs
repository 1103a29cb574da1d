//! World mutations at block positions.

use flashback_core::{BlockPos, BlockState, Particle, Sound};

use crate::codec::{write_block_pos, write_bool, write_u16_le, write_u32_le, write_u8, ByteReader};
use crate::error::{CodecError, PlayError};
use crate::play::{millis, PlayContext, ReverseHandler};

/// A block replaced on a layer, with no side effects.
#[derive(Clone, Debug, PartialEq)]
pub struct SetBlock {
    /// Where.
    pub pos: BlockPos,
    /// Lookup code of the new block.
    pub code: u32,
    /// Layer (0 is the main layer).
    pub layer: u8,
}

impl SetBlock {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_block_pos(buf, self.pos);
        write_u32_le(buf, self.code);
        write_u8(buf, self.layer);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            pos: r.read_block_pos()?,
            code: r.read_u32_le()?,
            layer: r.read_u8()?,
        })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        let block = ctx.lookup().block_or_air(self.code);
        let previous = ctx.world_ref().block(self.pos, self.layer);
        ctx.world().set_block(self.pos, &block, self.layer);
        ctx.on_reverse(ReverseHandler::SetBlock {
            pos: self.pos,
            block: previous,
            layer: self.layer,
        });
        Ok(())
    }
}

/// A block placed by a player; also plays the place sound.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaceBlock {
    /// Where.
    pub pos: BlockPos,
    /// Lookup code of the placed block.
    pub code: u32,
}

impl PlaceBlock {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_block_pos(buf, self.pos);
        write_u32_le(buf, self.code);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            pos: r.read_block_pos()?,
            code: r.read_u32_le()?,
        })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        let block = ctx.lookup().block_or_air(self.code);
        let previous = ctx.world_ref().block(self.pos, 0);
        let world = ctx.world();
        world.set_block(self.pos, &block, 0);
        world.play_sound(self.pos.centre(), &Sound::BlockPlace(block));
        ctx.on_reverse(ReverseHandler::SetBlock {
            pos: self.pos,
            block: previous,
            layer: 0,
        });
        Ok(())
    }
}

/// A block broken by a player; also shows the break particles.
#[derive(Clone, Debug, PartialEq)]
pub struct BreakBlock {
    /// Where.
    pub pos: BlockPos,
}

impl BreakBlock {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_block_pos(buf, self.pos);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            pos: r.read_block_pos()?,
        })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        let previous = ctx.world_ref().block(self.pos, 0);
        let world = ctx.world();
        world.set_block(self.pos, &BlockState::air(), 0);
        world.add_particle(self.pos.centre(), &Particle::BlockBreak(previous.clone()));
        ctx.on_reverse(ReverseHandler::SetBlock {
            pos: self.pos,
            block: previous,
            layer: 0,
        });
        Ok(())
    }
}

/// A liquid set or cleared. The air code clears it.
#[derive(Clone, Debug, PartialEq)]
pub struct SetLiquid {
    /// Lookup code of the liquid block.
    pub code: u32,
    /// Where.
    pub pos: BlockPos,
}

impl SetLiquid {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_u32_le(buf, self.code);
        write_block_pos(buf, self.pos);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            code: r.read_u32_le()?,
            pos: r.read_block_pos()?,
        })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        let liquid = Some(ctx.lookup().block_or_air(self.code)).filter(|b| !b.is_air());
        let previous = ctx.world_ref().liquid(self.pos);
        ctx.world().set_liquid(self.pos, liquid.as_ref());
        ctx.on_reverse(ReverseHandler::SetLiquid {
            pos: self.pos,
            liquid: previous,
        });
        Ok(())
    }
}

/// A chest-like container opening or closing.
#[derive(Clone, Debug, PartialEq)]
pub struct ChestUpdate {
    /// Where.
    pub pos: BlockPos,
    /// Open after the update.
    pub open: bool,
}

impl ChestUpdate {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_block_pos(buf, self.pos);
        write_bool(buf, self.open);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            pos: r.read_block_pos()?,
            open: r.read_bool()?,
        })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        let previous = ctx.world_ref().chest_open(self.pos);
        ctx.world().set_chest_open(self.pos, self.open);
        ctx.on_reverse(ReverseHandler::SetChest {
            pos: self.pos,
            open: previous,
        });
        Ok(())
    }
}

/// Phase of a block-cracking visual.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrackKind {
    /// Mining started.
    Start,
    /// Mining time changed mid-way.
    Continue,
    /// Mining stopped.
    Stop,
}

/// Mining-progress visual at a block.
#[derive(Clone, Debug, PartialEq)]
pub struct CrackBlock {
    /// Where.
    pub pos: BlockPos,
    /// Phase.
    pub kind: CrackKind,
    /// Remaining break time in milliseconds. Not encoded for
    /// [`CrackKind::Stop`], and zero after decoding one.
    pub duration_ms: u16,
}

impl CrackBlock {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_block_pos(buf, self.pos);
        let kind = match self.kind {
            CrackKind::Start => 0,
            CrackKind::Continue => 1,
            CrackKind::Stop => 2,
        };
        write_u8(buf, kind);
        if self.kind != CrackKind::Stop {
            write_u16_le(buf, self.duration_ms);
        }
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let pos = r.read_block_pos()?;
        let kind = match r.read_u8()? {
            0 => CrackKind::Start,
            1 => CrackKind::Continue,
            2 => CrackKind::Stop,
            other => return Err(r.malformed(format!("unknown crack kind {other}"))),
        };
        let duration_ms = if kind == CrackKind::Stop {
            0
        } else {
            r.read_u16_le()?
        };
        Ok(Self {
            pos,
            kind,
            duration_ms,
        })
    }

    pub(crate) fn play(&self, ctx: &mut PlayContext<'_>) -> Result<(), PlayError> {
        let duration = millis(self.duration_ms);
        let reverse = match self.kind {
            CrackKind::Start => {
                ctx.world().start_crack(self.pos, duration);
                ReverseHandler::StopCrack { pos: self.pos }
            }
            // Rewinding a continue or a stop would need the earlier
            // progress, which is not recorded.
            CrackKind::Continue => {
                ctx.world().continue_crack(self.pos, duration);
                ReverseHandler::Noop
            }
            CrackKind::Stop => {
                ctx.world().stop_crack(self.pos);
                ReverseHandler::Noop
            }
        };
        ctx.on_reverse(reverse);
        Ok(())
    }
}
