//! Diffing of polled player and entity state into capture calls.
//!
//! Hosts that expose state as "here is everything about this player now"
//! rather than as change events feed snapshots to a [`StateTracker`],
//! which pushes only what changed since the previous snapshot.

use std::collections::{BTreeSet, HashMap};

use flashback_core::PlayerFlag;
use uuid::Uuid;

use crate::recorder::Recorder;

/// Everything the tracker compares for one player.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerStateSnapshot {
    /// Flags currently set. Flags not listed are off.
    pub flags: BTreeSet<PlayerFlag>,
    /// Name tag shown above the player.
    pub name_tag: String,
    /// Visible effect colours, in any order.
    pub effects: Vec<u8>,
}

impl PlayerStateSnapshot {
    /// Snapshot with a name tag and nothing else.
    pub fn new(name_tag: impl Into<String>) -> Self {
        Self {
            name_tag: name_tag.into(),
            ..Self::default()
        }
    }

    /// Set `flag`.
    pub fn with_flag(mut self, flag: PlayerFlag) -> Self {
        self.flags.insert(flag);
        self
    }

    /// Replace the visible effects.
    pub fn with_effects(mut self, effects: impl Into<Vec<u8>>) -> Self {
        self.effects = effects.into();
        self
    }

    fn sorted_effects(&self) -> Vec<u8> {
        let mut effects = self.effects.clone();
        effects.sort_unstable();
        effects
    }
}

/// Last observed state per external id.
#[derive(Debug, Default)]
pub struct StateTracker {
    players: HashMap<Uuid, PlayerStateSnapshot>,
    entity_name_tags: HashMap<Uuid, String>,
}

impl StateTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the difference between `snapshot` and the player's previous
    /// snapshot. The first snapshot of a player pushes every flag, the
    /// name tag and the effects. Returns the number of captures pushed.
    pub fn observe_player(
        &mut self,
        recorder: &Recorder,
        player: Uuid,
        snapshot: PlayerStateSnapshot,
    ) -> usize {
        let previous = self.players.insert(player, snapshot.clone());
        let mut pushed = 0;

        let Some(previous) = previous else {
            for flag in PlayerFlag::ALL {
                recorder.push_player_state(player, flag, snapshot.flags.contains(&flag));
            }
            recorder.push_player_name_tag(player, &snapshot.name_tag);
            recorder.push_player_effects(player, &snapshot.effects);
            return PlayerFlag::ALL.len() + 2;
        };

        for flag in previous.flags.symmetric_difference(&snapshot.flags) {
            recorder.push_player_state(player, *flag, snapshot.flags.contains(flag));
            pushed += 1;
        }
        if previous.name_tag != snapshot.name_tag {
            recorder.push_player_name_tag(player, &snapshot.name_tag);
            pushed += 1;
        }
        if previous.sorted_effects() != snapshot.sorted_effects() {
            recorder.push_player_effects(player, &snapshot.effects);
            pushed += 1;
        }
        pushed
    }

    /// Push the entity's name tag if it is new or changed. Returns whether
    /// anything was pushed.
    pub fn observe_entity_name_tag(
        &mut self,
        recorder: &Recorder,
        entity: Uuid,
        name_tag: &str,
    ) -> bool {
        if self.entity_name_tags.get(&entity).map(String::as_str) == Some(name_tag) {
            return false;
        }
        self.entity_name_tags.insert(entity, name_tag.to_string());
        recorder.push_entity_name_tag(entity, name_tag);
        true
    }

    /// Drop everything remembered about `id`, so its next observation is
    /// treated as the first.
    pub fn forget(&mut self, id: &Uuid) {
        self.players.remove(id);
        self.entity_name_tags.remove(id);
    }
}
