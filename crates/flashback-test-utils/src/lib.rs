//! Test utilities for Flashback development.
//!
//! Provides an in-memory [`MockWorld`] adapter, a pre-populated lookup
//! table and small fixture builders.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use flashback_core::{
    Armour, BlockPos, BlockState, EntityAnimation, EntityProfile, ExtraData, HeldItems,
    ItemDescriptor, ItemStack, Particle, PlayerAnimation, PlayerFlag, PlayerProfile, Pose,
    Rotation, Skin, Sound, SurrogateId, TableLookup, Vec3, WorldAdapter,
};
use uuid::Uuid;

// ── Fixtures ────────────────────────────────────────────────────

pub fn stone() -> BlockState {
    BlockState::new("minecraft:stone")
}

pub fn dirt() -> BlockState {
    BlockState::new("minecraft:dirt")
}

pub fn chest() -> BlockState {
    BlockState::new("minecraft:chest").with_property("facing", "north")
}

pub fn water() -> BlockState {
    BlockState::new("minecraft:water").with_property("depth", "0")
}

pub fn sword() -> ItemDescriptor {
    ItemDescriptor::new("minecraft:diamond_sword", 0)
}

pub fn helmet() -> ItemDescriptor {
    ItemDescriptor::new("minecraft:iron_helmet", 0)
}

/// Lookup table knowing every fixture descriptor.
pub fn lookup() -> TableLookup {
    TableLookup::builder()
        .blocks([stone(), dirt(), chest(), water()])
        .items([sword(), helmet()])
        .build()
        .expect("fixture descriptors do not collide")
}

pub fn pose(x: f64, y: f64, z: f64) -> Pose {
    Pose::new(Vec3::new(x, y, z), Rotation::default())
}

pub fn player_profile(name: &str, pose: Pose) -> PlayerProfile {
    PlayerProfile {
        name: name.to_string(),
        name_tag: name.to_string(),
        pose,
        armour: Armour::default(),
        held: HeldItems {
            main_hand: ItemStack::of(sword()),
            off_hand: ItemStack::empty(),
        },
    }
}

pub fn entity_profile(identifier: &str, pose: Pose) -> EntityProfile {
    EntityProfile {
        identifier: identifier.to_string(),
        name_tag: String::new(),
        pose,
        extra: ExtraData::new(),
    }
}

pub fn skin() -> Skin {
    Skin {
        width: 2,
        height: 1,
        pixels: vec![255; 8],
        cape: None,
        geometry_name: "geometry.humanoid.custom".to_string(),
        geometry: None,
    }
}

// ── MockWorld ───────────────────────────────────────────────────

/// A presentation-only event observed by [`MockWorld`].
#[derive(Clone, Debug, PartialEq)]
pub enum WorldEvent {
    Sound(Vec3, Sound),
    Particle(Vec3, Particle),
    PlayerAnimation(SurrogateId, PlayerAnimation),
    EntityAnimation(SurrogateId, EntityAnimation),
    Emote(SurrogateId, Uuid),
}

#[derive(Clone, Debug)]
pub struct MockPlayer {
    pub profile: PlayerProfile,
    pub skin: Option<Skin>,
    pub flags: BTreeMap<PlayerFlag, bool>,
    pub effects: Vec<u8>,
}

/// In-memory world. Unset blocks read as air.
#[derive(Clone, Debug, Default)]
pub struct MockWorld {
    pub blocks: HashMap<(BlockPos, u8), BlockState>,
    pub liquids: HashMap<BlockPos, BlockState>,
    pub open_chests: HashSet<BlockPos>,
    pub cracks: HashMap<BlockPos, Duration>,
    pub players: HashMap<SurrogateId, MockPlayer>,
    pub entities: HashMap<SurrogateId, EntityProfile>,
    pub events: Vec<WorldEvent>,
}

impl MockWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_block(mut self, pos: BlockPos, block: BlockState) -> Self {
        self.blocks.insert((pos, 0), block);
        self
    }

    pub fn player(&self, id: u32) -> Option<&MockPlayer> {
        self.players.get(&SurrogateId(id))
    }

    pub fn entity(&self, id: u32) -> Option<&EntityProfile> {
        self.entities.get(&SurrogateId(id))
    }

    pub fn position_of(&self, id: u32) -> Option<Vec3> {
        self.player(id)
            .map(|p| p.profile.pose.position)
            .or_else(|| self.entity(id).map(|e| e.pose.position))
    }

    /// Everything except the event stream, with player flags reduced to
    /// the set that is on.
    pub fn lasting_state(&self) -> LastingState {
        LastingState {
            blocks: self.blocks.clone(),
            liquids: self.liquids.clone(),
            open_chests: self.open_chests.clone(),
            players: self
                .players
                .iter()
                .map(|(id, p)| {
                    let on = p
                        .flags
                        .iter()
                        .filter(|(_, v)| **v)
                        .map(|(f, _)| *f)
                        .collect();
                    (*id, (p.profile.clone(), on, p.effects.clone()))
                })
                .collect(),
            entities: self.entities.clone(),
        }
    }
}

/// Snapshot produced by [`MockWorld::lasting_state`].
#[derive(Clone, Debug, PartialEq)]
pub struct LastingState {
    pub blocks: HashMap<(BlockPos, u8), BlockState>,
    pub liquids: HashMap<BlockPos, BlockState>,
    pub open_chests: HashSet<BlockPos>,
    pub players: HashMap<SurrogateId, (PlayerProfile, Vec<PlayerFlag>, Vec<u8>)>,
    pub entities: HashMap<SurrogateId, EntityProfile>,
}

impl WorldAdapter for MockWorld {
    fn block(&self, pos: BlockPos, layer: u8) -> BlockState {
        self.blocks
            .get(&(pos, layer))
            .cloned()
            .unwrap_or_else(BlockState::air)
    }

    fn set_block(&mut self, pos: BlockPos, block: &BlockState, layer: u8) {
        if block.is_air() {
            self.blocks.remove(&(pos, layer));
        } else {
            self.blocks.insert((pos, layer), block.clone());
        }
    }

    fn liquid(&self, pos: BlockPos) -> Option<BlockState> {
        self.liquids.get(&pos).cloned()
    }

    fn set_liquid(&mut self, pos: BlockPos, liquid: Option<&BlockState>) {
        match liquid {
            Some(l) => {
                self.liquids.insert(pos, l.clone());
            }
            None => {
                self.liquids.remove(&pos);
            }
        }
    }

    fn chest_open(&self, pos: BlockPos) -> bool {
        self.open_chests.contains(&pos)
    }

    fn set_chest_open(&mut self, pos: BlockPos, open: bool) {
        if open {
            self.open_chests.insert(pos);
        } else {
            self.open_chests.remove(&pos);
        }
    }

    fn start_crack(&mut self, pos: BlockPos, duration: Duration) {
        self.cracks.insert(pos, duration);
    }

    fn continue_crack(&mut self, pos: BlockPos, duration: Duration) {
        self.cracks.insert(pos, duration);
    }

    fn stop_crack(&mut self, pos: BlockPos) {
        self.cracks.remove(&pos);
    }

    fn spawn_player(&mut self, id: SurrogateId, profile: &PlayerProfile, skin: Option<&Skin>) {
        let mut flags = BTreeMap::new();
        flags.insert(PlayerFlag::Visible, true);
        self.players.insert(
            id,
            MockPlayer {
                profile: profile.clone(),
                skin: skin.cloned(),
                flags,
                effects: Vec::new(),
            },
        );
    }

    fn despawn_player(&mut self, id: SurrogateId) {
        self.players.remove(&id);
    }

    fn player_profile(&self, id: SurrogateId) -> Option<PlayerProfile> {
        self.players.get(&id).map(|p| p.profile.clone())
    }

    fn move_player(&mut self, id: SurrogateId, pose: Pose) {
        if let Some(p) = self.players.get_mut(&id) {
            p.profile.pose = pose;
        }
    }

    fn set_player_held_items(&mut self, id: SurrogateId, held: &HeldItems) {
        if let Some(p) = self.players.get_mut(&id) {
            p.profile.held = held.clone();
        }
    }

    fn set_player_armour(&mut self, id: SurrogateId, armour: &Armour) {
        if let Some(p) = self.players.get_mut(&id) {
            p.profile.armour = armour.clone();
        }
    }

    fn set_player_name_tag(&mut self, id: SurrogateId, name_tag: &str) {
        if let Some(p) = self.players.get_mut(&id) {
            p.profile.name_tag = name_tag.to_string();
        }
    }

    fn player_skin(&self, id: SurrogateId) -> Option<Skin> {
        self.players.get(&id).and_then(|p| p.skin.clone())
    }

    fn set_player_skin(&mut self, id: SurrogateId, skin: &Skin) {
        if let Some(p) = self.players.get_mut(&id) {
            p.skin = Some(skin.clone());
        }
    }

    fn player_flag(&self, id: SurrogateId, flag: PlayerFlag) -> Option<bool> {
        self.players
            .get(&id)
            .map(|p| p.flags.get(&flag).copied().unwrap_or(false))
    }

    fn set_player_flag(&mut self, id: SurrogateId, flag: PlayerFlag, value: bool) {
        if let Some(p) = self.players.get_mut(&id) {
            p.flags.insert(flag, value);
        }
    }

    fn player_effects(&self, id: SurrogateId) -> Option<Vec<u8>> {
        self.players.get(&id).map(|p| p.effects.clone())
    }

    fn set_player_effects(&mut self, id: SurrogateId, effects: &[u8]) {
        if let Some(p) = self.players.get_mut(&id) {
            p.effects = effects.to_vec();
        }
    }

    fn animate_player(&mut self, id: SurrogateId, animation: PlayerAnimation) {
        self.events.push(WorldEvent::PlayerAnimation(id, animation));
    }

    fn emote(&mut self, id: SurrogateId, emote: Uuid) {
        self.events.push(WorldEvent::Emote(id, emote));
    }

    fn spawn_entity(&mut self, id: SurrogateId, profile: &EntityProfile) {
        self.entities.insert(id, profile.clone());
    }

    fn despawn_entity(&mut self, id: SurrogateId) {
        self.entities.remove(&id);
    }

    fn entity_profile(&self, id: SurrogateId) -> Option<EntityProfile> {
        self.entities.get(&id).cloned()
    }

    fn move_entity(&mut self, id: SurrogateId, pose: Pose) {
        if let Some(e) = self.entities.get_mut(&id) {
            e.pose = pose;
        }
    }

    fn set_entity_name_tag(&mut self, id: SurrogateId, name_tag: &str) {
        if let Some(e) = self.entities.get_mut(&id) {
            e.name_tag = name_tag.to_string();
        }
    }

    fn set_entity_extra(&mut self, id: SurrogateId, extra: &ExtraData) {
        if let Some(e) = self.entities.get_mut(&id) {
            e.extra = extra.clone();
        }
    }

    fn animate_entity(&mut self, id: SurrogateId, animation: EntityAnimation) {
        self.events.push(WorldEvent::EntityAnimation(id, animation));
    }

    fn play_sound(&mut self, pos: Vec3, sound: &Sound) {
        self.events.push(WorldEvent::Sound(pos, sound.clone()));
    }

    fn add_particle(&mut self, pos: Vec3, particle: &Particle) {
        self.events.push(WorldEvent::Particle(pos, particle.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_blocks_read_as_air() {
        let world = MockWorld::new();
        assert!(world.block(BlockPos::new(0, 0, 0), 0).is_air());
    }

    #[test]
    fn mutations_on_missing_players_are_ignored() {
        let mut world = MockWorld::new();
        world.move_player(SurrogateId(9), pose(1.0, 2.0, 3.0));
        assert!(world.players.is_empty());
        assert_eq!(world.player_flag(SurrogateId(9), PlayerFlag::Sneaking), None);
    }

    #[test]
    fn lasting_state_ignores_explicitly_cleared_flags() {
        let mut world = MockWorld::new();
        world.spawn_player(SurrogateId(1), &player_profile("a", pose(0.0, 0.0, 0.0)), None);
        let before = world.lasting_state();
        world.set_player_flag(SurrogateId(1), PlayerFlag::Gliding, false);
        world.play_sound(Vec3::ZERO, &Sound::BlockPlace(stone()));
        assert_eq!(world.lasting_state(), before);
    }

    #[test]
    fn spawned_players_start_visible() {
        let mut world = MockWorld::new();
        world.spawn_player(SurrogateId(1), &player_profile("a", pose(0.0, 0.0, 0.0)), None);
        assert_eq!(world.player_flag(SurrogateId(1), PlayerFlag::Visible), Some(true));
        assert_eq!(world.player_flag(SurrogateId(1), PlayerFlag::OnFire), Some(false));
    }
}
