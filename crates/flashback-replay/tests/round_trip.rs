//! Byte-stable round trips for every action variant, through the single
//! record codec and through the compressed log container.

use flashback_core::{
    BlockPos, Cape, EntityAnimation, ExtraData, ExtraValue, PlayerFlag, Pose, Rotation, Skin,
    SurrogateId, Vec3,
};
use flashback_replay::action::*;
use flashback_replay::codec::ByteReader;
use flashback_replay::{
    decode_action, ActionLog, ActionRegistry, ArmourRecord, BlockRecord, HeldRecord, ItemRecord,
    LoadMode,
};
use proptest::prelude::*;
use uuid::Uuid;

// ── Strategies ──────────────────────────────────────────────────

fn arb_id() -> impl Strategy<Value = SurrogateId> {
    prop_oneof![1u32..200, any::<u32>()].prop_map(SurrogateId)
}

/// Coordinates that survive the f32 wire encoding unchanged.
fn arb_coord() -> impl Strategy<Value = f64> {
    (-3.0e7f32..3.0e7).prop_map(f64::from)
}

fn arb_vec3() -> impl Strategy<Value = Vec3> {
    (arb_coord(), arb_coord(), arb_coord()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

fn arb_pose() -> impl Strategy<Value = Pose> {
    (arb_vec3(), -180.0f32..180.0, -90.0f32..=90.0)
        .prop_map(|(p, yaw, pitch)| Pose::new(p, Rotation::new(yaw.into(), pitch.into())))
}

fn arb_block_pos() -> impl Strategy<Value = BlockPos> {
    (any::<i32>(), -64i32..320, any::<i32>()).prop_map(|(x, y, z)| BlockPos::new(x, y, z))
}

fn arb_extra() -> impl Strategy<Value = ExtraData> {
    prop::collection::vec(
        (
            "[a-z]{1,8}",
            prop_oneof![
                any::<i32>().prop_map(ExtraValue::Int),
                "[a-z ]{0,12}".prop_map(ExtraValue::String),
                prop::collection::vec(any::<i16>().prop_map(ExtraValue::Short), 0..4)
                    .prop_map(ExtraValue::List),
            ],
        ),
        0..4,
    )
    .prop_map(|entries| entries.into_iter().collect())
}

fn arb_item() -> impl Strategy<Value = ItemRecord> {
    (any::<u32>(), any::<bool>(), prop::option::of(arb_extra())).prop_map(
        |(code, enchanted, data)| ItemRecord {
            code,
            enchanted,
            data,
        },
    )
}

fn arb_block() -> impl Strategy<Value = BlockRecord> {
    (any::<u32>(), prop::option::of(arb_extra())).prop_map(|(code, data)| BlockRecord { code, data })
}

fn arb_held() -> impl Strategy<Value = HeldRecord> {
    (arb_item(), arb_item()).prop_map(|(main_hand, off_hand)| HeldRecord {
        main_hand,
        off_hand,
    })
}

fn arb_armour() -> impl Strategy<Value = ArmourRecord> {
    (arb_item(), arb_item(), arb_item(), arb_item()).prop_map(
        |(helmet, chestplate, leggings, boots)| ArmourRecord {
            helmet,
            chestplate,
            leggings,
            boots,
        },
    )
}

fn arb_skin() -> impl Strategy<Value = Skin> {
    (
        1u32..64,
        1u32..64,
        prop::collection::vec(any::<u8>(), 0..64),
        prop::option::of(prop::collection::vec(any::<u8>(), 0..16)),
        "[a-z.]{0,24}",
        prop::option::of(prop::collection::vec(any::<u8>(), 0..32)),
    )
        .prop_map(|(width, height, pixels, cape, geometry_name, geometry)| Skin {
            width,
            height,
            pixels,
            cape: cape.map(|pixels| Cape {
                width: 2,
                height: 2,
                pixels,
            }),
            geometry_name,
            geometry,
        })
}

fn arb_flag() -> impl Strategy<Value = PlayerFlag> {
    prop::sample::select(PlayerFlag::ALL.to_vec())
}

fn arb_delta() -> impl Strategy<Value = MoveDelta> {
    (
        0u8..32,
        arb_id(),
        arb_coord(),
        arb_coord(),
        arb_coord(),
        any::<u16>(),
        any::<u16>(),
    )
        .prop_map(|(flags, id, x, y, z, yaw, pitch)| {
            // Absent fields decode to zero.
            let keep = |bit: u8| flags & bit != 0;
            MoveDelta {
                flags,
                id,
                x: if keep(HAS_X) { x } else { 0.0 },
                y: if keep(HAS_Y) { y } else { 0.0 },
                z: if keep(HAS_Z) { z } else { 0.0 },
                yaw: if keep(HAS_YAW) { yaw } else { 0 },
                pitch: if keep(HAS_PITCH) { pitch } else { 0 },
            }
        })
}

fn arb_crack() -> impl Strategy<Value = CrackBlock> {
    (
        arb_block_pos(),
        prop_oneof![
            Just(CrackKind::Start),
            Just(CrackKind::Continue),
            Just(CrackKind::Stop)
        ],
        any::<u16>(),
    )
        .prop_map(|(pos, kind, duration_ms)| CrackBlock {
            pos,
            kind,
            duration_ms: if kind == CrackKind::Stop { 0 } else { duration_ms },
        })
}

fn arb_player_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (arb_id(), arb_pose()).prop_map(|(id, pose)| Action::PlayerMove(MoveTo { id, pose })),
        (arb_id(), 0u8..10).prop_map(|(id, k)| Action::PlayerAnimate(PlayerAnimate {
            id,
            kind: PlayerAnimateKind::from_u8(k).unwrap(),
        })),
        (
            arb_id(),
            "[A-Za-z0-9_]{1,16}",
            ".{0,16}",
            arb_vec3(),
            any::<u16>(),
            any::<u16>(),
            arb_armour(),
            arb_held(),
        )
            .prop_map(|(id, name, name_tag, position, yaw, pitch, armour, held)| {
                Action::PlayerSpawn(PlayerSpawn {
                    id,
                    name,
                    name_tag,
                    position,
                    yaw,
                    pitch,
                    armour,
                    held,
                })
            }),
        arb_id().prop_map(|id| Action::PlayerDespawn(PlayerDespawn { id })),
        (arb_id(), arb_held())
            .prop_map(|(id, held)| Action::PlayerHandChange(PlayerHandChange { id, held })),
        (arb_id(), arb_armour())
            .prop_map(|(id, armour)| Action::PlayerArmourChange(PlayerArmourChange { id, armour })),
        (arb_id(), arb_skin()).prop_map(|(id, skin)| Action::PlayerSkin(PlayerSkin { id, skin })),
    ]
}

fn arb_player_state_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (arb_id(), ".{0,20}").prop_map(|(id, name_tag)| {
            Action::PlayerNameTagUpdate(PlayerNameTagUpdate { id, name_tag })
        }),
        arb_delta().prop_map(Action::PlayerDeltaMove),
        (arb_id(), any::<u128>()).prop_map(|(id, e)| Action::Emote(Emote {
            id,
            emote: Uuid::from_u128(e),
        })),
        (arb_id(), arb_flag(), any::<bool>())
            .prop_map(|(id, flag, value)| Action::SetPlayerState(SetPlayerState { id, flag, value })),
        (arb_id(), prop::collection::vec(any::<u8>(), 0..8)).prop_map(|(id, effects)| {
            Action::SetPlayerVisibleEffects(SetPlayerVisibleEffects { id, effects })
        }),
    ]
}

fn arb_entity_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (
            arb_id(),
            "[a-z:_]{1,24}",
            ".{0,12}",
            arb_vec3(),
            any::<u16>(),
            any::<u16>(),
            arb_extra(),
        )
            .prop_map(|(id, identifier, name_tag, position, yaw, pitch, extra)| {
                Action::EntitySpawn(EntitySpawn {
                    id,
                    identifier,
                    name_tag,
                    position,
                    yaw,
                    pitch,
                    extra,
                })
            }),
        arb_id().prop_map(|id| Action::EntityDespawn(EntityDespawn { id })),
        (arb_id(), arb_pose()).prop_map(|(id, pose)| Action::EntityMove(MoveTo { id, pose })),
        (arb_id(), ".{0,20}").prop_map(|(id, name_tag)| {
            Action::EntityNameTagUpdate(EntityNameTagUpdate { id, name_tag })
        }),
        arb_delta().prop_map(Action::EntityDeltaMove),
        (
            arb_id(),
            prop_oneof![
                Just(EntityAnimation::FireworkExplosion),
                Just(EntityAnimation::ArrowShake)
            ]
        )
            .prop_map(|(id, animation)| Action::EntityAnimate(EntityAnimate { id, animation })),
    ]
}

fn arb_world_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (arb_block_pos(), any::<u32>(), 0u8..2)
            .prop_map(|(pos, code, layer)| Action::SetBlock(SetBlock { pos, code, layer })),
        arb_block_pos().prop_map(|pos| Action::BreakBlock(BreakBlock { pos })),
        (arb_block_pos(), any::<u32>())
            .prop_map(|(pos, code)| Action::PlaceBlock(PlaceBlock { pos, code })),
        (any::<u32>(), arb_block_pos())
            .prop_map(|(code, pos)| Action::SetLiquid(SetLiquid { code, pos })),
        (arb_block_pos(), any::<bool>())
            .prop_map(|(pos, open)| Action::ChestUpdate(ChestUpdate { pos, open })),
        arb_crack().prop_map(Action::CrackBlock),
    ]
}

fn arb_effect_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (
            arb_block_pos(),
            arb_block(),
            prop_oneof![Just(BlockSoundKind::Breaking), Just(BlockSoundKind::Place)]
        )
            .prop_map(|(pos, block, kind)| Action::BlockSound(BlockSound { pos, block, kind })),
        (
            arb_block_pos(),
            arb_block(),
            prop_oneof![
                Just(BlockParticleKind::Break),
                any::<u8>().prop_map(|face| BlockParticleKind::Punching { face })
            ]
        )
            .prop_map(|(pos, block, kind)| Action::BlockParticle(BlockParticle {
                pos,
                block,
                kind
            })),
        (arb_block_pos(), 0.0f32..256.0)
            .prop_map(|(pos, distance)| Action::FallSound(FallSound { pos, distance })),
        (arb_vec3(), any::<u32>()).prop_map(|(position, particle)| {
            Action::GeneralParticle(GeneralParticle { position, particle })
        }),
        (
            any::<bool>(),
            prop_oneof![Just(LiquidSoundKind::Fill), Just(LiquidSoundKind::Empty)],
            arb_block_pos()
        )
            .prop_map(|(water, kind, pos)| Action::LiquidSound(LiquidSound { water, kind, pos })),
        (arb_vec3(), any::<u32>())
            .prop_map(|(position, sound)| Action::GeneralSound(GeneralSound { position, sound })),
    ]
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        arb_player_action(),
        arb_player_state_action(),
        arb_entity_action(),
        arb_world_action(),
        arb_effect_action(),
    ]
}

// ── Properties ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn every_variant_round_trips(action in arb_action()) {
        let registry = ActionRegistry::builtin();
        let bytes = action.to_bytes();
        prop_assert_eq!(bytes[0], action.discriminator());

        let mut r = ByteReader::new(&bytes);
        let decoded = decode_action(&registry, &mut r).unwrap();
        prop_assert!(r.is_empty(), "{} bytes left over", r.remaining());
        prop_assert_eq!(decoded.to_bytes(), bytes);
        prop_assert_eq!(decoded, action);
    }

    #[test]
    fn truncated_records_never_panic(action in arb_action(), cut in any::<prop::sample::Index>()) {
        let registry = ActionRegistry::builtin();
        let bytes = action.to_bytes();
        let len = cut.index(bytes.len());
        let mut r = ByteReader::new(&bytes[..len]);
        // Every strict prefix must fail cleanly.
        prop_assert!(decode_action(&registry, &mut r).is_err());
    }

    #[test]
    fn logs_round_trip_through_the_container(
        ticks in prop::collection::vec(prop::collection::vec(arb_action(), 0..4), 1..12)
    ) {
        let mut log = ActionLog::new();
        for (i, actions) in ticks.into_iter().enumerate() {
            log.insert(i as u32 + 1, actions);
        }
        // Empty ticks are not kept as keys after loading.
        let expected: Vec<(u32, Vec<Action>)> = log
            .iter()
            .filter(|(_, a)| !a.is_empty())
            .map(|(t, a)| (t, a.to_vec()))
            .collect();

        let bytes = log.encode_to(Vec::new()).unwrap();
        let loaded =
            ActionLog::load(bytes.as_slice(), &ActionRegistry::builtin(), LoadMode::Strict).unwrap();
        prop_assert_eq!(loaded.total_ticks(), log.total_ticks());
        let got: Vec<(u32, Vec<Action>)> = loaded.iter().map(|(t, a)| (t, a.to_vec())).collect();
        prop_assert_eq!(got, expected);
    }
}

#[test]
fn discriminators_are_stable() {
    let id = SurrogateId(1);
    let pos = BlockPos::new(0, 0, 0);
    let cases = [
        (Action::PlayerDespawn(PlayerDespawn { id }), 4),
        (Action::SetBlock(SetBlock { pos, code: 0, layer: 0 }), 5),
        (Action::BreakBlock(BreakBlock { pos }), 8),
        (Action::EntityDespawn(EntityDespawn { id }), 12),
        (Action::ChestUpdate(ChestUpdate { pos, open: true }), 17),
        (
            Action::Emote(Emote {
                id,
                emote: Uuid::nil(),
            }),
            20,
        ),
        (
            Action::EntityAnimate(EntityAnimate {
                id,
                animation: EntityAnimation::ArrowShake,
            }),
            30,
        ),
    ];
    for (action, expected) in cases {
        assert_eq!(action.discriminator(), expected, "{action:?}");
    }
}

#[test]
fn unknown_discriminator_is_detectable_twice() {
    let registry = ActionRegistry::builtin();
    let bytes = [0xFF, 0x01, 0x02];
    let mut r = ByteReader::new(&bytes);
    let first = decode_action(&registry, &mut r).unwrap_err();
    let second = decode_action(&registry, &mut r).unwrap_err();
    assert_eq!(first, second);
    assert_eq!(first.offset(), 0);
    assert_eq!(r.position(), 0);
}
