//! Descriptors for the things actions place, carry and show.
//!
//! These are the domain values the [`WorldAdapter`](crate::WorldAdapter)
//! speaks in. Action payloads never store them directly; blocks and items
//! travel as codes resolved through a [`CodecLookup`](crate::CodecLookup).

use std::collections::BTreeMap;

use crate::extra::ExtraData;
use crate::geometry::Pose;

// ── Blocks ──────────────────────────────────────────────────────

/// Name used for the empty block.
pub const AIR: &str = "minecraft:air";

/// A block type plus its state properties and optional block-entity data.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockState {
    /// Namespaced block name.
    pub name: String,
    /// State properties, kept sorted so equal states compare equal.
    pub properties: BTreeMap<String, String>,
    /// Block-entity payload (chest contents, sign text, ...).
    pub data: Option<ExtraData>,
}

impl BlockState {
    /// A block with no properties.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
            data: None,
        }
    }

    /// Builder-style property insert.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Builder-style block-entity data.
    pub fn with_data(mut self, data: ExtraData) -> Self {
        self.data = Some(data);
        self
    }

    /// The empty block.
    pub fn air() -> Self {
        Self::new(AIR)
    }

    /// Whether this is the empty block.
    pub fn is_air(&self) -> bool {
        self.name == AIR
    }

    /// Canonical `name|key=value|...` string identifying the block state,
    /// ignoring block-entity data.
    pub fn state_key(&self) -> String {
        let mut key = String::with_capacity(self.name.len() + 1);
        key.push_str(&self.name);
        key.push('|');
        for (k, v) in &self.properties {
            key.push_str(k);
            key.push('=');
            key.push_str(v);
            key.push('|');
        }
        key
    }

    /// The same state without block-entity data.
    pub fn without_data(&self) -> Self {
        Self {
            name: self.name.clone(),
            properties: self.properties.clone(),
            data: None,
        }
    }
}

// ── Items ───────────────────────────────────────────────────────

/// An item type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ItemDescriptor {
    /// Namespaced item name.
    pub name: String,
    /// Variant/damage value.
    pub meta: i16,
}

impl ItemDescriptor {
    /// Build an item descriptor.
    pub fn new(name: impl Into<String>, meta: i16) -> Self {
        Self {
            name: name.into(),
            meta,
        }
    }

    /// The empty item.
    pub fn air() -> Self {
        Self::new(AIR, 0)
    }

    /// Canonical `name:meta` string identifying the item.
    pub fn key(&self) -> String {
        format!("{}:{}", self.name, self.meta)
    }
}

/// An item as shown in a hand or armour slot.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemStack {
    /// The item type.
    pub item: ItemDescriptor,
    /// Whether the item renders with the enchantment glint.
    pub enchanted: bool,
    /// Item data (custom names, dye colour, ...).
    pub data: Option<ExtraData>,
}

impl ItemStack {
    /// A plain stack of `item`.
    pub fn of(item: ItemDescriptor) -> Self {
        Self {
            item,
            enchanted: false,
            data: None,
        }
    }

    /// The empty slot.
    pub fn empty() -> Self {
        Self::of(ItemDescriptor::air())
    }

    /// Whether the slot is empty.
    pub fn is_empty(&self) -> bool {
        self.item.name == AIR
    }
}

impl Default for ItemStack {
    fn default() -> Self {
        Self::empty()
    }
}

/// Main-hand and off-hand items.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeldItems {
    /// Main hand.
    pub main_hand: ItemStack,
    /// Off hand.
    pub off_hand: ItemStack,
}

/// Worn armour, one stack per slot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Armour {
    /// Head slot.
    pub helmet: ItemStack,
    /// Chest slot.
    pub chestplate: ItemStack,
    /// Legs slot.
    pub leggings: ItemStack,
    /// Feet slot.
    pub boots: ItemStack,
}

// ── Skins ───────────────────────────────────────────────────────

/// A cape texture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cape {
    /// Texture width in pixels.
    pub width: u32,
    /// Texture height in pixels.
    pub height: u32,
    /// RGBA pixel data.
    pub pixels: Vec<u8>,
}

/// A player skin. The pixel and geometry payloads are opaque here.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Skin {
    /// Texture width in pixels.
    pub width: u32,
    /// Texture height in pixels.
    pub height: u32,
    /// RGBA pixel data.
    pub pixels: Vec<u8>,
    /// Optional cape.
    pub cape: Option<Cape>,
    /// Name of the geometry model.
    pub geometry_name: String,
    /// Custom geometry definition, if any.
    pub geometry: Option<Vec<u8>>,
}

// ── Players and entities ────────────────────────────────────────

/// Everything needed to (re)spawn a player.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayerProfile {
    /// Player name.
    pub name: String,
    /// Name tag shown above the player.
    pub name_tag: String,
    /// Spawn pose.
    pub pose: Pose,
    /// Worn armour.
    pub armour: Armour,
    /// Held items.
    pub held: HeldItems,
}

/// Everything needed to (re)spawn a non-player entity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityProfile {
    /// Namespaced entity type identifier.
    pub identifier: String,
    /// Name tag shown above the entity.
    pub name_tag: String,
    /// Spawn pose.
    pub pose: Pose,
    /// Type-specific data (item carried, projectile owner, ...).
    pub extra: ExtraData,
}

/// Boolean player state flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlayerFlag {
    /// Rendered to viewers.
    Visible,
    /// Crouching.
    Sneaking,
    /// Sprinting.
    Sprinting,
    /// Gliding with elytra.
    Gliding,
    /// Using an item (eating, drawing a bow, ...).
    UsingItem,
    /// Swimming.
    Swimming,
    /// Crawling.
    Crawling,
    /// Burning.
    OnFire,
}

impl PlayerFlag {
    /// Every flag.
    pub const ALL: [PlayerFlag; 8] = [
        PlayerFlag::Visible,
        PlayerFlag::Sneaking,
        PlayerFlag::Sprinting,
        PlayerFlag::Gliding,
        PlayerFlag::UsingItem,
        PlayerFlag::Swimming,
        PlayerFlag::Crawling,
        PlayerFlag::OnFire,
    ];
}

/// One-shot player animations with no lasting state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlayerAnimation {
    /// Arm swing.
    Swing,
    /// Damage flash.
    Hurt,
    /// Eating particles.
    Eating,
    /// Totem of undying.
    TotemUse,
    /// Critical hit sparkles.
    CriticalHit,
    /// Enchanted hit sparkles.
    EnchantedHit,
}

/// One-shot entity animations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityAnimation {
    /// Firework rocket bursting.
    FireworkExplosion,
    /// Arrow wobbling after hitting a block.
    ArrowShake,
}

// ── Presentation ────────────────────────────────────────────────

/// A sound to play at a position.
#[derive(Clone, Debug, PartialEq)]
pub enum Sound {
    /// A block being broken.
    BlockBreaking(BlockState),
    /// A block being placed.
    BlockPlace(BlockState),
    /// A bucket being filled.
    BucketFill {
        /// Water rather than lava.
        water: bool,
    },
    /// A bucket being emptied.
    BucketEmpty {
        /// Water rather than lava.
        water: bool,
    },
    /// Landing after a fall.
    Fall {
        /// Distance fallen, in blocks.
        distance: f32,
    },
    /// Any other sound, by adapter-defined id.
    General(u32),
}

/// A particle effect to show at a position.
#[derive(Clone, Debug, PartialEq)]
pub enum Particle {
    /// Debris of a broken block.
    BlockBreak(BlockState),
    /// Debris of a block being mined.
    PunchBlock {
        /// The block being mined.
        block: BlockState,
        /// Face being hit (0..6).
        face: u8,
    },
    /// Any other particle, by adapter-defined id.
    General(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_key_sorts_properties() {
        let a = BlockState::new("minecraft:log")
            .with_property("axis", "y")
            .with_property("age", "0");
        assert_eq!(a.state_key(), "minecraft:log|age=0|axis=y|");
        assert_eq!(BlockState::air().state_key(), "minecraft:air|");
    }

    #[test]
    fn default_slots_are_empty() {
        let armour = Armour::default();
        assert!(armour.helmet.is_empty());
        assert!(HeldItems::default().off_hand.is_empty());
        assert_eq!(ItemDescriptor::new("minecraft:stone", 3).key(), "minecraft:stone:3");
    }
}
