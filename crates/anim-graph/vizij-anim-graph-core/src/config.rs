//! Controller configuration.

use serde::{Deserialize, Serialize};

use crate::diagnostics::DiagnosticsCfg;

/// Configuration applied to every controller built from a definition.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub diagnostics: DiagnosticsCfg,

    /// How a bone-mask blend node treats weights strictly between 0 and 1.
    #[serde(default)]
    pub bone_mask_blend: BoneMaskBlendMode,
}

/// Partial-weight behaviour of the bone-mask blend node.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoneMaskBlendMode {
    /// Partial weights return the source mask unchanged.
    #[default]
    PassThrough,
    /// Partial weights produce a lazy blend between source and target.
    Blend,
}
