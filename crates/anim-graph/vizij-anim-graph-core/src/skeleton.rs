//! Skeleton bone-mask tables consumed while wiring bone-mask nodes.

use serde::{Deserialize, Serialize};

/// Resolves authored bone-mask ids to indices into a skeleton's mask tables.
pub trait BoneMaskLookup {
    fn bone_mask_index(&self, id: &str) -> Option<usize>;
}

/// Named per-bone weight table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneMaskDefinition {
    pub id: String,
    pub weights: Vec<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    pub bone_count: usize,
    #[serde(default)]
    pub bone_masks: Vec<BoneMaskDefinition>,
}

impl Skeleton {
    pub fn new(bone_count: usize) -> Self {
        Skeleton {
            bone_count,
            bone_masks: Vec::new(),
        }
    }

    /// Register a mask; weights are padded with zero or truncated to `bone_count`.
    pub fn with_mask(mut self, id: impl Into<String>, mut weights: Vec<f32>) -> Self {
        weights.resize(self.bone_count, 0.0);
        self.bone_masks.push(BoneMaskDefinition {
            id: id.into(),
            weights,
        });
        self
    }

    pub fn mask_weights(&self, index: usize) -> Option<&[f32]> {
        self.bone_masks.get(index).map(|m| m.weights.as_slice())
    }
}

impl BoneMaskLookup for Skeleton {
    fn bone_mask_index(&self, id: &str) -> Option<usize> {
        self.bone_masks.iter().position(|m| m.id == id)
    }
}
