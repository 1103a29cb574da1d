//! Full and delta movement records, shared by players and entities.

use flashback_core::angle::{decode_pitch, decode_yaw, encode_pitch, encode_yaw};
use flashback_core::{Pose, Rotation, SurrogateId, Vec3};

use crate::codec::{write_f32_le, write_id, write_u16_le, write_u8, write_vec3, ByteReader};
use crate::error::CodecError;

/// Delta flag: x changed.
pub const HAS_X: u8 = 1 << 0;
/// Delta flag: y changed.
pub const HAS_Y: u8 = 1 << 1;
/// Delta flag: z changed.
pub const HAS_Z: u8 = 1 << 2;
/// Delta flag: yaw changed.
pub const HAS_YAW: u8 = 1 << 3;
/// Delta flag: pitch changed.
pub const HAS_PITCH: u8 = 1 << 4;

const KNOWN_FLAGS: u8 = HAS_X | HAS_Y | HAS_Z | HAS_YAW | HAS_PITCH;

/// Two coordinates or angles closer than this are considered unchanged.
pub const MOVEMENT_EPSILON: f64 = 1e-6;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= MOVEMENT_EPSILON
}

/// A full pose for one object.
///
/// Position and angles travel as f32, so decoded values are the f32
/// narrowing of what was recorded.
#[derive(Clone, Debug, PartialEq)]
pub struct MoveTo {
    /// Target object.
    pub id: SurrogateId,
    /// New pose.
    pub pose: Pose,
}

impl MoveTo {
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_id(buf, self.id);
        write_vec3(buf, self.pose.position);
        write_f32_le(buf, self.pose.rotation.yaw as f32);
        write_f32_le(buf, self.pose.rotation.pitch as f32);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let id = r.read_id()?;
        let position = r.read_vec3()?;
        let yaw = r.read_f32_le()? as f64;
        let pitch = r.read_f32_le()? as f64;
        Ok(Self {
            id,
            pose: Pose::new(position, Rotation::new(yaw, pitch)),
        })
    }
}

/// The changed subset of an object's pose.
///
/// Fields whose flag is unset are zero and carry no meaning; they are
/// filled from the object's current pose when the delta is applied.
#[derive(Clone, Debug, PartialEq)]
pub struct MoveDelta {
    /// Which fields are present.
    pub flags: u8,
    /// Target object.
    pub id: SurrogateId,
    /// New x, if [`HAS_X`].
    pub x: f64,
    /// New y, if [`HAS_Y`].
    pub y: f64,
    /// New z, if [`HAS_Z`].
    pub z: f64,
    /// New quantised yaw, if [`HAS_YAW`].
    pub yaw: u16,
    /// New quantised pitch, if [`HAS_PITCH`].
    pub pitch: u16,
}

impl MoveDelta {
    /// Describe the move from `previous_position`/`live_rotation` to
    /// `position`/`rotation`, flagging only the fields that changed.
    pub fn between(
        id: SurrogateId,
        previous_position: Vec3,
        live_rotation: Rotation,
        position: Vec3,
        rotation: Rotation,
    ) -> Self {
        let mut delta = Self {
            flags: 0,
            id,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            yaw: 0,
            pitch: 0,
        };
        if !approx_eq(previous_position.x, position.x) {
            delta.flags |= HAS_X;
            delta.x = position.x;
        }
        if !approx_eq(previous_position.y, position.y) {
            delta.flags |= HAS_Y;
            delta.y = position.y;
        }
        if !approx_eq(previous_position.z, position.z) {
            delta.flags |= HAS_Z;
            delta.z = position.z;
        }
        if !approx_eq(live_rotation.yaw, rotation.yaw) {
            delta.flags |= HAS_YAW;
            delta.yaw = encode_yaw(rotation.yaw);
        }
        if !approx_eq(live_rotation.pitch, rotation.pitch) {
            delta.flags |= HAS_PITCH;
            delta.pitch = encode_pitch(rotation.pitch);
        }
        delta
    }

    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.flags == 0
    }

    /// Whether x is present.
    pub fn has_x(&self) -> bool {
        self.flags & HAS_X != 0
    }

    /// Whether y is present.
    pub fn has_y(&self) -> bool {
        self.flags & HAS_Y != 0
    }

    /// Whether z is present.
    pub fn has_z(&self) -> bool {
        self.flags & HAS_Z != 0
    }

    /// Whether yaw is present.
    pub fn has_yaw(&self) -> bool {
        self.flags & HAS_YAW != 0
    }

    /// Whether pitch is present.
    pub fn has_pitch(&self) -> bool {
        self.flags & HAS_PITCH != 0
    }

    /// The pose after applying this delta to `current`.
    pub fn resolve(&self, current: Pose) -> Pose {
        let mut pose = current;
        if self.has_x() {
            pose.position.x = self.x;
        }
        if self.has_y() {
            pose.position.y = self.y;
        }
        if self.has_z() {
            pose.position.z = self.z;
        }
        if self.has_yaw() {
            pose.rotation.yaw = decode_yaw(self.yaw);
        }
        if self.has_pitch() {
            pose.rotation.pitch = decode_pitch(self.pitch);
        }
        pose
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_u8(buf, self.flags);
        write_id(buf, self.id);
        if self.has_x() {
            write_f32_le(buf, self.x as f32);
        }
        if self.has_y() {
            write_f32_le(buf, self.y as f32);
        }
        if self.has_z() {
            write_f32_le(buf, self.z as f32);
        }
        if self.has_yaw() {
            write_u16_le(buf, self.yaw);
        }
        if self.has_pitch() {
            write_u16_le(buf, self.pitch);
        }
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let flags = r.read_u8()?;
        if flags & !KNOWN_FLAGS != 0 {
            return Err(r.malformed(format!("unknown delta-move flags {flags:#04x}")));
        }
        let id = r.read_id()?;
        let mut delta = Self {
            flags,
            id,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            yaw: 0,
            pitch: 0,
        };
        if delta.has_x() {
            delta.x = r.read_f32_le()? as f64;
        }
        if delta.has_y() {
            delta.y = r.read_f32_le()? as f64;
        }
        if delta.has_z() {
            delta.z = r.read_f32_le()? as f64;
        }
        if delta.has_yaw() {
            delta.yaw = r.read_u16_le()?;
        }
        if delta.has_pitch() {
            delta.pitch = r.read_u16_le()?;
        }
        Ok(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_changed_axes_are_flagged() {
        let rot = Rotation::new(10.0, 5.0);
        let delta = MoveDelta::between(
            SurrogateId(4),
            Vec3::new(1.0, 64.0, 2.0),
            rot,
            Vec3::new(1.0, 65.5, 2.0),
            rot,
        );
        assert_eq!(delta.flags, HAS_Y);
        assert_eq!(delta.x, 0.0);
        assert_eq!(delta.y, 65.5);

        let mut buf = Vec::new();
        delta.encode(&mut buf);
        // flags + one-byte id + one f32
        assert_eq!(buf.len(), 6);
    }

    #[test]
    fn sub_epsilon_jitter_is_not_a_change() {
        let delta = MoveDelta::between(
            SurrogateId(1),
            Vec3::new(0.0, 0.0, 0.0),
            Rotation::new(90.0, 0.0),
            Vec3::new(1e-9, 0.0, -1e-9),
            Rotation::new(90.0 + 1e-9, 0.0),
        );
        assert!(delta.is_empty());
    }

    #[test]
    fn resolve_keeps_unflagged_fields() {
        let current = Pose::new(Vec3::new(3.0, 64.0, -7.0), Rotation::new(45.0, -10.0));
        let delta = MoveDelta {
            flags: HAS_Y | HAS_PITCH,
            id: SurrogateId(1),
            x: 0.0,
            y: 70.0,
            z: 0.0,
            yaw: 0,
            pitch: encode_pitch(20.0),
        };
        let next = delta.resolve(current);
        assert_eq!(next.position, Vec3::new(3.0, 70.0, -7.0));
        assert_eq!(next.rotation.yaw, 45.0);
        assert!((next.rotation.pitch - 20.0).abs() < 0.01);
    }

    #[test]
    fn unknown_flag_bits_are_malformed() {
        let buf = [0x20, 1];
        assert!(MoveDelta::decode(&mut ByteReader::new(&buf)).is_err());
    }

    #[test]
    fn truncated_delta_is_malformed() {
        let buf = [HAS_X | HAS_Y, 1, 0, 0, 0x80, 0x3f];
        let err = MoveDelta::decode(&mut ByteReader::new(&buf)).unwrap_err();
        assert!(matches!(err, CodecError::MalformedPayload { offset: 6, .. }));
    }
}
