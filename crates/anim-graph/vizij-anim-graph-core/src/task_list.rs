//! Lazily described bone-mask operations.
//!
//! A [`BoneMaskTaskList`] records *how* to build a per-bone weight array rather
//! than the array itself. Tasks resolve front to back; the last task is the
//! result and blend tasks only ever reference earlier tasks. Resolution against
//! a [`Skeleton`] happens once, after the graph has been evaluated.

use serde::{Deserialize, Serialize};

use crate::skeleton::Skeleton;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoneMaskTask {
    /// Per-bone weights taken from the skeleton's mask table at `index`.
    Mask { index: u8 },
    /// The same weight for every bone.
    Uniform { weight: f32 },
    /// Per-bone lerp between two earlier task results.
    Blend {
        source: usize,
        target: usize,
        weight: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneMaskTaskList {
    tasks: Vec<BoneMaskTask>,
}

impl Default for BoneMaskTaskList {
    /// The identity mask: every bone at full weight.
    fn default() -> Self {
        BoneMaskTaskList {
            tasks: vec![BoneMaskTask::Uniform { weight: 1.0 }],
        }
    }
}

impl BoneMaskTaskList {
    /// A list with no tasks. Resolves to the identity mask.
    pub fn empty() -> Self {
        BoneMaskTaskList { tasks: Vec::new() }
    }

    pub fn tasks(&self) -> &[BoneMaskTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn emplace_mask(&mut self, index: u8) {
        self.tasks.push(BoneMaskTask::Mask { index });
    }

    pub fn emplace_uniform(&mut self, weight: f32) {
        self.tasks.push(BoneMaskTask::Uniform { weight });
    }

    /// Replace this list's contents with a copy of `other`.
    pub fn copy_from(&mut self, other: &BoneMaskTaskList) {
        self.tasks.clone_from(&other.tasks);
    }

    /// Describe the per-bone lerp from `a` to `b` at `t`.
    ///
    /// `t <= 0` and `t >= 1` copy the corresponding list exactly.
    pub fn set_to_blend_between(&mut self, a: &BoneMaskTaskList, b: &BoneMaskTaskList, t: f32) {
        if t <= 0.0 {
            self.copy_from(a);
            return;
        }
        if t >= 1.0 {
            self.copy_from(b);
            return;
        }

        self.tasks.clear();
        self.append_rebased(a);
        let source = self.tasks.len() - 1;
        self.append_rebased(b);
        let target = self.tasks.len() - 1;
        self.tasks.push(BoneMaskTask::Blend {
            source,
            target,
            weight: t,
        });
    }

    // Appends `other` with blend references shifted past the tasks already present.
    // An empty list contributes an identity task so it still has a result slot.
    fn append_rebased(&mut self, other: &BoneMaskTaskList) {
        if other.tasks.is_empty() {
            self.emplace_uniform(1.0);
            return;
        }
        let offset = self.tasks.len();
        self.tasks.extend(other.tasks.iter().map(|task| match *task {
            BoneMaskTask::Blend {
                source,
                target,
                weight,
            } => BoneMaskTask::Blend {
                source: source + offset,
                target: target + offset,
                weight,
            },
            other => other,
        }));
    }

    /// Resolve into one weight per skeleton bone.
    pub fn resolve(&self, skeleton: &Skeleton) -> Vec<f32> {
        let bones = skeleton.bone_count;
        if self.tasks.is_empty() {
            return vec![1.0; bones];
        }

        let mut results: Vec<Vec<f32>> = Vec::with_capacity(self.tasks.len());
        for task in &self.tasks {
            let weights = match *task {
                BoneMaskTask::Mask { index } => skeleton
                    .mask_weights(index as usize)
                    .map(|w| {
                        let mut w = w.to_vec();
                        w.resize(bones, 0.0);
                        w
                    })
                    .unwrap_or_else(|| vec![0.0; bones]),
                BoneMaskTask::Uniform { weight } => vec![weight; bones],
                BoneMaskTask::Blend {
                    source,
                    target,
                    weight,
                } => match (results.get(source), results.get(target)) {
                    (Some(a), Some(b)) => a
                        .iter()
                        .zip(b.iter())
                        .map(|(a, b)| a + (b - a) * weight)
                        .collect(),
                    _ => vec![0.0; bones],
                },
            };
            results.push(weights);
        }
        results.pop().unwrap_or_else(|| vec![1.0; bones])
    }
}
