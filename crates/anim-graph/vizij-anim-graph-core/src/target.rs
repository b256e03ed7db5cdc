//! Target values: something a pose can aim at (a world transform or a bone).

use serde::{Deserialize, Serialize};

/// Rigid transform with non-uniform scale. Rotation is a quaternion `[x, y, z, w]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Transform {
            translation: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
        }
    }
}

/// Offsets applied on top of a bone target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetOffsets {
    pub rotation: [f32; 4],
    pub translation: [f32; 3],
    /// Offsets are expressed in the bone's local space rather than model space.
    #[serde(default)]
    pub bone_space: bool,
}

impl Default for TargetOffsets {
    fn default() -> Self {
        TargetOffsets {
            rotation: [0.0, 0.0, 0.0, 1.0],
            translation: [0.0; 3],
            bone_space: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Target {
    #[default]
    Unset,
    Transform {
        transform: Transform,
    },
    Bone {
        bone_id: String,
        #[serde(default)]
        offsets: Option<TargetOffsets>,
    },
}

impl Target {
    pub fn is_set(&self) -> bool {
        !matches!(self, Target::Unset)
    }

    pub fn is_bone(&self) -> bool {
        matches!(self, Target::Bone { .. })
    }

    /// Returns a copy with `offsets` composed onto any offsets already present.
    ///
    /// Returns `None` when the target is not a bone target.
    pub fn with_offsets(&self, extra: &TargetOffsets) -> Option<Target> {
        let Target::Bone { bone_id, offsets } = self else {
            return None;
        };
        let combined = match offsets {
            None => *extra,
            Some(existing) => TargetOffsets {
                rotation: quat_mul(existing.rotation, extra.rotation),
                translation: [
                    existing.translation[0] + extra.translation[0],
                    existing.translation[1] + extra.translation[1],
                    existing.translation[2] + extra.translation[2],
                ],
                bone_space: extra.bone_space,
            },
        };
        Some(Target::Bone {
            bone_id: bone_id.clone(),
            offsets: Some(combined),
        })
    }
}

fn quat_mul(a: [f32; 4], b: [f32; 4]) -> [f32; 4] {
    let [ax, ay, az, aw] = a;
    let [bx, by, bz, bw] = b;
    [
        aw * bx + ax * bw + ay * bz - az * by,
        aw * by - ax * bz + ay * bw + az * bx,
        aw * bz + ax * by - ay * bx + az * bw,
        aw * bw - ax * bx - ay * by - az * bz,
    ]
}
