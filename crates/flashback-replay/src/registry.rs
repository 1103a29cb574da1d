//! Discriminator → decoder dispatch.

use indexmap::IndexMap;

use crate::action::*;
use crate::codec::ByteReader;
use crate::error::CodecError;

/// Decodes the fields of one variant; the discriminator has already been
/// consumed.
pub type DecodeFn = fn(&mut ByteReader<'_>) -> Result<Action, CodecError>;

/// Maps discriminators to the decoder for their variant.
///
/// # Examples
///
/// ```
/// use flashback_replay::{decode_action, Action, ActionRegistry, CodecError};
/// use flashback_replay::action::PlayerDespawn;
/// use flashback_replay::codec::ByteReader;
/// use flashback_core::SurrogateId;
///
/// let registry = ActionRegistry::builtin();
/// let bytes = Action::PlayerDespawn(PlayerDespawn { id: SurrogateId(3) }).to_bytes();
/// let mut reader = ByteReader::new(&bytes);
/// let action = decode_action(&registry, &mut reader).unwrap();
/// assert_eq!(action.discriminator(), 4);
///
/// let mut reader = ByteReader::new(&[0xFF]);
/// let err = decode_action(&registry, &mut reader).unwrap_err();
/// assert!(matches!(err, CodecError::UnknownDiscriminator { discriminator: 0xFF, .. }));
/// ```
#[derive(Clone, Default)]
pub struct ActionRegistry {
    decoders: IndexMap<u8, DecodeFn>,
}

impl ActionRegistry {
    /// A registry with no decoders.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with every built-in variant registered.
    pub fn builtin() -> Self {
        let mut r = Self::empty();
        r.register(PLAYER_MOVE, |r| MoveTo::decode(r).map(Action::PlayerMove));
        r.register(PLAYER_ANIMATE, |r| {
            PlayerAnimate::decode(r).map(Action::PlayerAnimate)
        });
        r.register(PLAYER_SPAWN, |r| PlayerSpawn::decode(r).map(Action::PlayerSpawn));
        r.register(PLAYER_DESPAWN, |r| {
            PlayerDespawn::decode(r).map(Action::PlayerDespawn)
        });
        r.register(SET_BLOCK, |r| SetBlock::decode(r).map(Action::SetBlock));
        r.register(PLAYER_HAND_CHANGE, |r| {
            PlayerHandChange::decode(r).map(Action::PlayerHandChange)
        });
        r.register(PLAYER_ARMOUR_CHANGE, |r| {
            PlayerArmourChange::decode(r).map(Action::PlayerArmourChange)
        });
        r.register(BREAK_BLOCK, |r| BreakBlock::decode(r).map(Action::BreakBlock));
        r.register(PLACE_BLOCK, |r| PlaceBlock::decode(r).map(Action::PlaceBlock));
        r.register(PLAYER_SKIN, |r| PlayerSkin::decode(r).map(Action::PlayerSkin));
        r.register(ENTITY_SPAWN, |r| EntitySpawn::decode(r).map(Action::EntitySpawn));
        r.register(ENTITY_DESPAWN, |r| {
            EntityDespawn::decode(r).map(Action::EntityDespawn)
        });
        r.register(ENTITY_MOVE, |r| MoveTo::decode(r).map(Action::EntityMove));
        r.register(PLAYER_NAME_TAG_UPDATE, |r| {
            PlayerNameTagUpdate::decode(r).map(Action::PlayerNameTagUpdate)
        });
        r.register(ENTITY_NAME_TAG_UPDATE, |r| {
            EntityNameTagUpdate::decode(r).map(Action::EntityNameTagUpdate)
        });
        r.register(SET_LIQUID, |r| SetLiquid::decode(r).map(Action::SetLiquid));
        r.register(CHEST_UPDATE, |r| ChestUpdate::decode(r).map(Action::ChestUpdate));
        r.register(PLAYER_DELTA_MOVE, |r| {
            MoveDelta::decode(r).map(Action::PlayerDeltaMove)
        });
        r.register(ENTITY_DELTA_MOVE, |r| {
            MoveDelta::decode(r).map(Action::EntityDeltaMove)
        });
        r.register(EMOTE, |r| Emote::decode(r).map(Action::Emote));
        r.register(CRACK_BLOCK, |r| CrackBlock::decode(r).map(Action::CrackBlock));
        r.register(BLOCK_SOUND, |r| BlockSound::decode(r).map(Action::BlockSound));
        r.register(SET_PLAYER_STATE, |r| {
            SetPlayerState::decode(r).map(Action::SetPlayerState)
        });
        r.register(BLOCK_PARTICLE, |r| {
            BlockParticle::decode(r).map(Action::BlockParticle)
        });
        r.register(FALL_SOUND, |r| FallSound::decode(r).map(Action::FallSound));
        r.register(GENERAL_PARTICLE, |r| {
            GeneralParticle::decode(r).map(Action::GeneralParticle)
        });
        r.register(LIQUID_SOUND, |r| LiquidSound::decode(r).map(Action::LiquidSound));
        r.register(GENERAL_SOUND, |r| {
            GeneralSound::decode(r).map(Action::GeneralSound)
        });
        r.register(SET_PLAYER_VISIBLE_EFFECTS, |r| {
            SetPlayerVisibleEffects::decode(r).map(Action::SetPlayerVisibleEffects)
        });
        r.register(ENTITY_ANIMATE, |r| {
            EntityAnimate::decode(r).map(Action::EntityAnimate)
        });
        r
    }

    /// Register (or replace) the decoder for `discriminator`, returning the
    /// one it replaced.
    pub fn register(&mut self, discriminator: u8, decode: DecodeFn) -> Option<DecodeFn> {
        self.decoders.insert(discriminator, decode)
    }

    /// Remove the decoder for `discriminator`.
    pub fn unregister(&mut self, discriminator: u8) -> Option<DecodeFn> {
        self.decoders.shift_remove(&discriminator)
    }

    /// Decoder for `discriminator`.
    pub fn get(&self, discriminator: u8) -> Option<DecodeFn> {
        self.decoders.get(&discriminator).copied()
    }

    /// Whether `discriminator` has a decoder.
    pub fn contains(&self, discriminator: u8) -> bool {
        self.decoders.contains_key(&discriminator)
    }

    /// Registered discriminators in registration order.
    pub fn discriminators(&self) -> impl Iterator<Item = u8> + '_ {
        self.decoders.keys().copied()
    }

    /// Number of registered decoders.
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Whether no decoder is registered.
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("discriminators", &self.decoders.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Decode one action record.
///
/// On an unregistered discriminator the reader is left on the
/// discriminator byte, so the same failure can be observed again.
pub fn decode_action(
    registry: &ActionRegistry,
    r: &mut ByteReader<'_>,
) -> Result<Action, CodecError> {
    let offset = r.position();
    let discriminator = r.peek_u8()?;
    let decode = registry
        .get(discriminator)
        .ok_or(CodecError::UnknownDiscriminator {
            discriminator,
            offset,
        })?;
    r.read_u8()?;
    decode(r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registers_thirty_dense_discriminators() {
        let registry = ActionRegistry::builtin();
        assert_eq!(registry.len(), 30);
        let ids: Vec<u8> = registry.discriminators().collect();
        assert_eq!(ids, (1..=30).collect::<Vec<u8>>());
        assert!(!registry.contains(0));
        assert!(!registry.contains(0xFF));
    }

    #[test]
    fn unknown_discriminator_leaves_reader_in_place() {
        let registry = ActionRegistry::builtin();
        let bytes = [0xFF, 1, 2, 3];
        let mut r = ByteReader::new(&bytes);
        let first = decode_action(&registry, &mut r).unwrap_err();
        assert_eq!(r.position(), 0);
        let second = decode_action(&registry, &mut r).unwrap_err();
        assert_eq!(first, second);
        assert_eq!(
            first,
            CodecError::UnknownDiscriminator {
                discriminator: 0xFF,
                offset: 0
            }
        );
    }

    #[test]
    fn unregistered_builtin_becomes_unknown() {
        let mut registry = ActionRegistry::builtin();
        assert!(registry.unregister(EMOTE).is_some());
        let bytes = [EMOTE];
        let err = decode_action(&registry, &mut ByteReader::new(&bytes)).unwrap_err();
        assert!(matches!(
            err,
            CodecError::UnknownDiscriminator {
                discriminator: EMOTE,
                ..
            }
        ));
    }

    #[test]
    fn empty_input_is_malformed_not_unknown() {
        let registry = ActionRegistry::builtin();
        let err = decode_action(&registry, &mut ByteReader::new(&[])).unwrap_err();
        assert!(matches!(err, CodecError::MalformedPayload { offset: 0, .. }));
    }

    #[test]
    fn custom_decoder_can_override_builtin() {
        fn always_despawn_one(_: &mut ByteReader<'_>) -> Result<Action, CodecError> {
            Ok(Action::PlayerDespawn(PlayerDespawn {
                id: flashback_core::SurrogateId(1),
            }))
        }
        let mut registry = ActionRegistry::builtin();
        assert!(registry.register(200, always_despawn_one).is_none());
        let action = decode_action(&registry, &mut ByteReader::new(&[200])).unwrap();
        assert_eq!(action.discriminator(), PLAYER_DESPAWN);
    }
}
