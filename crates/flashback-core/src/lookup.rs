//! Descriptor ↔ code tables used by action payloads.
//!
//! Blocks and items travel through the log as 32-bit codes. The codes are
//! FNV-1a hashes of a canonical descriptor string, so they do not depend on
//! registration order and stay stable between the recording host and the
//! playback host as long as both know the same descriptors.
//!
//! A [`TableLookup`] must be built before any action is encoded or decoded
//! and is passed explicitly to the recorder and the playback engine.

use std::collections::HashMap;

use crate::descriptor::{BlockState, ItemDescriptor};

/// FNV-1a offset basis for 32-bit.
const FNV_OFFSET: u32 = 0x811c_9dc5;
/// FNV-1a prime for 32-bit.
const FNV_PRIME: u32 = 0x0100_0193;

/// FNV-1a over the UTF-8 bytes of `s`.
pub fn fnv1a_32(s: &str) -> u32 {
    s.bytes()
        .fold(FNV_OFFSET, |h, b| (h ^ b as u32).wrapping_mul(FNV_PRIME))
}

/// Code for a block state (block-entity data is not part of the code).
pub fn block_code_of(block: &BlockState) -> u32 {
    fnv1a_32(&block.state_key())
}

/// Code for an item type.
pub fn item_code_of(item: &ItemDescriptor) -> u32 {
    fnv1a_32(&item.key())
}

/// Maps world descriptors to compact codes and back.
pub trait CodecLookup: Send + Sync {
    /// Code for `block`.
    fn block_code(&self, block: &BlockState) -> u32 {
        block_code_of(block)
    }

    /// Block state for `code`, or `None` if the table does not know it.
    fn block(&self, code: u32) -> Option<BlockState>;

    /// Code for `item`.
    fn item_code(&self, item: &ItemDescriptor) -> u32 {
        item_code_of(item)
    }

    /// Item type for `code`, or `None` if the table does not know it.
    fn item(&self, code: u32) -> Option<ItemDescriptor>;

    /// Block state for `code`, falling back to air.
    fn block_or_air(&self, code: u32) -> BlockState {
        self.block(code).unwrap_or_else(BlockState::air)
    }

    /// Item type for `code`, falling back to the empty item.
    fn item_or_air(&self, code: u32) -> ItemDescriptor {
        self.item(code).unwrap_or_else(ItemDescriptor::air)
    }
}

/// Two distinct descriptors hashed to the same code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("code {code:#010x} is shared by `{first}` and `{second}`")]
pub struct CodeCollision {
    /// The contested code.
    pub code: u32,
    /// Canonical key registered first.
    pub first: String,
    /// Canonical key that collided with it.
    pub second: String,
}

/// Table-backed [`CodecLookup`].
///
/// # Examples
///
/// ```
/// use flashback_core::{BlockState, CodecLookup, TableLookup};
///
/// let stone = BlockState::new("minecraft:stone");
/// let lookup = TableLookup::builder().block(stone.clone()).build().unwrap();
///
/// let code = lookup.block_code(&stone);
/// assert_eq!(lookup.block(code), Some(stone));
/// assert!(lookup.block_or_air(0xdead_beef).is_air());
/// ```
#[derive(Debug, Clone, Default)]
pub struct TableLookup {
    blocks: HashMap<u32, BlockState>,
    items: HashMap<u32, ItemDescriptor>,
}

impl TableLookup {
    /// Start building a table. Air is always registered.
    pub fn builder() -> TableLookupBuilder {
        TableLookupBuilder {
            blocks: vec![BlockState::air()],
            items: vec![ItemDescriptor::air()],
        }
    }

    /// Number of registered block states.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Number of registered item types.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

impl CodecLookup for TableLookup {
    fn block(&self, code: u32) -> Option<BlockState> {
        self.blocks.get(&code).cloned()
    }

    fn item(&self, code: u32) -> Option<ItemDescriptor> {
        self.items.get(&code).cloned()
    }
}

/// Collects descriptors for a [`TableLookup`].
#[derive(Debug, Clone)]
pub struct TableLookupBuilder {
    blocks: Vec<BlockState>,
    items: Vec<ItemDescriptor>,
}

impl TableLookupBuilder {
    /// Register a block state.
    pub fn block(mut self, block: BlockState) -> Self {
        self.blocks.push(block.without_data());
        self
    }

    /// Register several block states.
    pub fn blocks(mut self, blocks: impl IntoIterator<Item = BlockState>) -> Self {
        self.blocks
            .extend(blocks.into_iter().map(|b| b.without_data()));
        self
    }

    /// Register an item type.
    pub fn item(mut self, item: ItemDescriptor) -> Self {
        self.items.push(item);
        self
    }

    /// Register several item types.
    pub fn items(mut self, items: impl IntoIterator<Item = ItemDescriptor>) -> Self {
        self.items.extend(items);
        self
    }

    /// Hash every descriptor. Registering the same descriptor twice is
    /// fine; two different descriptors sharing a code is an error.
    pub fn build(self) -> Result<TableLookup, CodeCollision> {
        let mut table = TableLookup::default();
        for block in self.blocks {
            let code = block_code_of(&block);
            if let Some(existing) = table.blocks.get(&code) {
                if *existing != block {
                    return Err(CodeCollision {
                        code,
                        first: existing.state_key(),
                        second: block.state_key(),
                    });
                }
                continue;
            }
            table.blocks.insert(code, block);
        }
        for item in self.items {
            let code = item_code_of(&item);
            if let Some(existing) = table.items.get(&code) {
                if *existing != item {
                    return Err(CodeCollision {
                        code,
                        first: existing.key(),
                        second: item.key(),
                    });
                }
                continue;
            }
            table.items.insert(code, item);
        }
        Ok(table)
    }
}
