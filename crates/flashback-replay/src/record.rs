//! Sub-records shared by several action payloads.
//!
//! Blocks and items are carried as lookup codes plus their optional
//! structured data, never as full descriptors.

use flashback_core::{Armour, BlockState, CodecLookup, ExtraData, HeldItems, ItemStack};

use crate::codec::{read_extra, write_bool, write_extra, write_u32_le, write_u8, ByteReader};
use crate::error::CodecError;

/// Item flag: the stack renders with the enchantment glint.
pub const ITEM_HAS_ENCHANT: u8 = 1 << 0;
/// Item flag: structured item data follows.
pub const ITEM_HAS_DATA: u8 = 1 << 1;

const ITEM_KNOWN_FLAGS: u8 = ITEM_HAS_ENCHANT | ITEM_HAS_DATA;

// ── ItemRecord ──────────────────────────────────────────────────

/// An item stack as stored in an action.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemRecord {
    /// Lookup code of the item type.
    pub code: u32,
    /// Enchantment glint.
    pub enchanted: bool,
    /// Structured item data.
    pub data: Option<ExtraData>,
}

impl ItemRecord {
    /// Capture `stack` using `lookup` for the item code.
    pub fn from_stack(stack: &ItemStack, lookup: &dyn CodecLookup) -> Self {
        Self {
            code: lookup.item_code(&stack.item),
            enchanted: stack.enchanted,
            data: stack.data.clone(),
        }
    }

    /// Rebuild the stack; unknown codes become the empty slot.
    pub fn to_stack(&self, lookup: &dyn CodecLookup) -> ItemStack {
        ItemStack {
            item: lookup.item_or_air(self.code),
            enchanted: self.enchanted,
            data: self.data.clone(),
        }
    }

    /// Flag byte describing this record.
    pub fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.enchanted {
            flags |= ITEM_HAS_ENCHANT;
        }
        if self.data.is_some() {
            flags |= ITEM_HAS_DATA;
        }
        flags
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_u32_le(buf, self.code);
        write_u8(buf, self.flags());
        if let Some(data) = &self.data {
            write_extra(buf, data);
        }
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let code = r.read_u32_le()?;
        let flags = r.read_u8()?;
        if flags & !ITEM_KNOWN_FLAGS != 0 {
            return Err(r.malformed(format!("unknown item flags {flags:#04x}")));
        }
        let data = if flags & ITEM_HAS_DATA != 0 {
            Some(read_extra(r)?)
        } else {
            None
        };
        Ok(Self {
            code,
            enchanted: flags & ITEM_HAS_ENCHANT != 0,
            data,
        })
    }
}

// ── BlockRecord ─────────────────────────────────────────────────

/// A block state as stored in an action.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockRecord {
    /// Lookup code of the block state.
    pub code: u32,
    /// Block-entity data.
    pub data: Option<ExtraData>,
}

impl BlockRecord {
    /// Capture `block` using `lookup` for the code.
    pub fn from_block(block: &BlockState, lookup: &dyn CodecLookup) -> Self {
        Self {
            code: lookup.block_code(block),
            data: block.data.clone(),
        }
    }

    /// Rebuild the block state; unknown codes become air.
    pub fn to_block(&self, lookup: &dyn CodecLookup) -> BlockState {
        let mut block = lookup.block_or_air(self.code);
        block.data = self.data.clone();
        block
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_u32_le(buf, self.code);
        write_bool(buf, self.data.is_some());
        if let Some(data) = &self.data {
            write_extra(buf, data);
        }
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let code = r.read_u32_le()?;
        let data = if r.read_bool()? {
            Some(read_extra(r)?)
        } else {
            None
        };
        Ok(Self { code, data })
    }
}

// ── Equipment ───────────────────────────────────────────────────

/// Main-hand and off-hand records.
#[derive(Clone, Debug, PartialEq)]
pub struct HeldRecord {
    /// Main hand.
    pub main_hand: ItemRecord,
    /// Off hand.
    pub off_hand: ItemRecord,
}

impl HeldRecord {
    /// Capture held items.
    pub fn from_held(held: &HeldItems, lookup: &dyn CodecLookup) -> Self {
        Self {
            main_hand: ItemRecord::from_stack(&held.main_hand, lookup),
            off_hand: ItemRecord::from_stack(&held.off_hand, lookup),
        }
    }

    /// Rebuild held items.
    pub fn to_held(&self, lookup: &dyn CodecLookup) -> HeldItems {
        HeldItems {
            main_hand: self.main_hand.to_stack(lookup),
            off_hand: self.off_hand.to_stack(lookup),
        }
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        self.main_hand.encode(buf);
        self.off_hand.encode(buf);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            main_hand: ItemRecord::decode(r)?,
            off_hand: ItemRecord::decode(r)?,
        })
    }
}

/// Armour records in helmet, chestplate, leggings, boots order.
#[derive(Clone, Debug, PartialEq)]
pub struct ArmourRecord {
    /// Head slot.
    pub helmet: ItemRecord,
    /// Chest slot.
    pub chestplate: ItemRecord,
    /// Legs slot.
    pub leggings: ItemRecord,
    /// Feet slot.
    pub boots: ItemRecord,
}

impl ArmourRecord {
    /// Capture worn armour.
    pub fn from_armour(armour: &Armour, lookup: &dyn CodecLookup) -> Self {
        Self {
            helmet: ItemRecord::from_stack(&armour.helmet, lookup),
            chestplate: ItemRecord::from_stack(&armour.chestplate, lookup),
            leggings: ItemRecord::from_stack(&armour.leggings, lookup),
            boots: ItemRecord::from_stack(&armour.boots, lookup),
        }
    }

    /// Rebuild worn armour.
    pub fn to_armour(&self, lookup: &dyn CodecLookup) -> Armour {
        Armour {
            helmet: self.helmet.to_stack(lookup),
            chestplate: self.chestplate.to_stack(lookup),
            leggings: self.leggings.to_stack(lookup),
            boots: self.boots.to_stack(lookup),
        }
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        self.helmet.encode(buf);
        self.chestplate.encode(buf);
        self.leggings.encode(buf);
        self.boots.encode(buf);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            helmet: ItemRecord::decode(r)?,
            chestplate: ItemRecord::decode(r)?,
            leggings: ItemRecord::decode(r)?,
            boots: ItemRecord::decode(r)?,
        })
    }
}
