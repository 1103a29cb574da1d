//! Positions and orientations in the simulated world.

use std::fmt;

/// A continuous position.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    /// East/west.
    pub x: f64,
    /// Up/down.
    pub y: f64,
    /// North/south.
    pub z: f64,
}

impl Vec3 {
    /// The origin.
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    /// Build a vector from its components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Largest absolute per-axis difference between two positions.
    pub fn max_axis_delta(&self, other: &Vec3) -> f64 {
        (self.x - other.x)
            .abs()
            .max((self.y - other.y).abs())
            .max((self.z - other.z).abs())
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// An integer block coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockPos {
    /// East/west.
    pub x: i32,
    /// Up/down.
    pub y: i32,
    /// North/south.
    pub z: i32,
}

impl BlockPos {
    /// Build a block position from its components.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The block containing `v` (each axis floored).
    pub fn from_vec3(v: Vec3) -> Self {
        Self {
            x: v.x.floor() as i32,
            y: v.y.floor() as i32,
            z: v.z.floor() as i32,
        }
    }

    /// The minimum corner of this block as a continuous position.
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x as f64, self.y as f64, self.z as f64)
    }

    /// The centre of this block.
    pub fn centre(self) -> Vec3 {
        Vec3::new(
            self.x as f64 + 0.5,
            self.y as f64 + 0.5,
            self.z as f64 + 0.5,
        )
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.x, self.y, self.z)
    }
}

/// Orientation in degrees.
///
/// Yaw lies in `[-180, 180)`, pitch in `[-90, 90]`. Values outside those
/// ranges are accepted here and clamped only when quantised.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rotation {
    /// Horizontal heading.
    pub yaw: f64,
    /// Vertical look angle.
    pub pitch: f64,
}

impl Rotation {
    /// Build a rotation from yaw and pitch.
    pub const fn new(yaw: f64, pitch: f64) -> Self {
        Self { yaw, pitch }
    }
}

/// Position plus rotation of a player or entity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose {
    /// Where the object stands.
    pub position: Vec3,
    /// Where it is looking.
    pub rotation: Rotation,
}

impl Pose {
    /// Build a pose.
    pub const fn new(position: Vec3, rotation: Rotation) -> Self {
        Self { position, rotation }
    }
}
