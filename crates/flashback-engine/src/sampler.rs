//! Periodic entity movement sampling.
//!
//! Hosts that cannot report entity movement as it happens hand the
//! recorder an [`EntitySampler`]. The sampler thread polls it once per
//! tick and forwards only the entities whose pose moved past the
//! configured threshold since their previous sample.

use std::collections::HashMap;

use flashback_core::{Pose, Rotation};
use uuid::Uuid;

/// One entity's pose at sampling time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampledEntity {
    /// External identity of the entity.
    pub id: Uuid,
    /// Current pose.
    pub pose: Pose,
}

/// Source of entity poses, polled from the recorder's sampler thread.
///
/// Closures returning a `Vec<SampledEntity>` implement this directly.
pub trait EntitySampler: Send {
    /// Poses of every entity currently tracked by the host.
    fn sample(&mut self) -> Vec<SampledEntity>;
}

impl<F> EntitySampler for F
where
    F: FnMut() -> Vec<SampledEntity> + Send,
{
    fn sample(&mut self) -> Vec<SampledEntity> {
        self()
    }
}

/// An entity that moved since its last sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Moved {
    pub(crate) id: Uuid,
    pub(crate) pose: Pose,
    /// Rotation at the previous sample; equal to `pose.rotation` on first
    /// sighting.
    pub(crate) previous_rotation: Rotation,
}

/// Remembers the last forwarded pose per entity.
#[derive(Debug)]
pub(crate) struct MovementFilter {
    threshold: f64,
    last: HashMap<Uuid, Pose>,
}

impl MovementFilter {
    pub(crate) fn new(threshold: f64) -> Self {
        Self {
            threshold,
            last: HashMap::new(),
        }
    }

    /// Entities from `samples` that are new or moved by more than the
    /// threshold. Entities missing from `samples` are forgotten.
    pub(crate) fn update(&mut self, samples: Vec<SampledEntity>) -> Vec<Moved> {
        let mut seen = HashMap::with_capacity(samples.len());
        let mut moved = Vec::new();
        for sample in samples {
            match self.last.get(&sample.id) {
                None => {
                    moved.push(Moved {
                        id: sample.id,
                        pose: sample.pose,
                        previous_rotation: sample.pose.rotation,
                    });
                    seen.insert(sample.id, sample.pose);
                }
                Some(previous) if self.exceeds(previous, &sample.pose) => {
                    moved.push(Moved {
                        id: sample.id,
                        pose: sample.pose,
                        previous_rotation: previous.rotation,
                    });
                    seen.insert(sample.id, sample.pose);
                }
                Some(previous) => {
                    seen.insert(sample.id, *previous);
                }
            }
        }
        self.last = seen;
        moved
    }

    fn exceeds(&self, previous: &Pose, current: &Pose) -> bool {
        previous.position.max_axis_delta(&current.position) > self.threshold
            || (previous.rotation.yaw - current.rotation.yaw).abs() > self.threshold
            || (previous.rotation.pitch - current.rotation.pitch).abs() > self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashback_core::Vec3;

    fn at(id: u128, x: f64, yaw: f64) -> SampledEntity {
        SampledEntity {
            id: Uuid::from_u128(id),
            pose: Pose::new(Vec3::new(x, 64.0, 0.0), Rotation::new(yaw, 0.0)),
        }
    }

    #[test]
    fn first_sighting_is_forwarded() {
        let mut filter = MovementFilter::new(0.01);
        let moved = filter.update(vec![at(1, 0.0, 0.0), at(2, 5.0, 0.0)]);
        assert_eq!(moved.len(), 2);
        assert_eq!(moved[0].previous_rotation, moved[0].pose.rotation);
    }

    #[test]
    fn small_drift_accumulates_against_last_forwarded_pose() {
        let mut filter = MovementFilter::new(0.01);
        filter.update(vec![at(1, 0.0, 0.0)]);
        assert!(filter.update(vec![at(1, 0.006, 0.0)]).is_empty());
        let moved = filter.update(vec![at(1, 0.012, 0.0)]);
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].pose.position.x, 0.012);
    }

    #[test]
    fn rotation_change_reports_previous_rotation() {
        let mut filter = MovementFilter::new(0.01);
        filter.update(vec![at(1, 0.0, 10.0)]);
        let moved = filter.update(vec![at(1, 0.0, 45.0)]);
        assert_eq!(moved[0].previous_rotation, Rotation::new(10.0, 0.0));
    }

    #[test]
    fn vanished_entities_are_forgotten() {
        let mut filter = MovementFilter::new(0.01);
        filter.update(vec![at(1, 0.0, 0.0)]);
        filter.update(vec![]);
        assert_eq!(filter.update(vec![at(1, 0.0, 0.0)]).len(), 1);
    }

    #[test]
    fn closures_are_samplers() {
        let mut calls = 0;
        let mut sampler = move || {
            calls += 1;
            vec![at(calls, 0.0, 0.0)]
        };
        assert_eq!(EntitySampler::sample(&mut sampler)[0].id, Uuid::from_u128(1));
        assert_eq!(EntitySampler::sample(&mut sampler)[0].id, Uuid::from_u128(2));
    }
}
