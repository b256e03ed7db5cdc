//! Runtime for data-driven character animation graphs.
//!
//! A [`GraphDefinition`] is authored as JSON: a flat array of typed nodes that
//! refer to each other by index. [`AnimationGraphController`] binds it against a
//! [`Skeleton`](skeleton::Skeleton), then produces a lazy [`PoseTask`] tree each
//! tick for the host to sample.

pub mod config;
pub mod context;
pub mod controller;
pub mod diagnostics;
pub mod error;
pub mod nodes;
pub mod parameters;
pub mod pose;
pub mod skeleton;
pub mod target;
pub mod task_list;
pub mod topo;
pub mod types;

pub use config::{BoneMaskBlendMode, Config};
pub use context::BranchState;
pub use controller::{AnimationGraphController, NodeValue};
pub use diagnostics::{DiagnosticsCfg, GraphWarning};
pub use error::GraphError;
pub use nodes::bone_mask::BoneMaskSelectorStatus;
pub use nodes::state_machine::StateMachineStatus;
pub use parameters::{
    ControlParameters, ParameterDeclaration, ParameterHandle, ParameterKind, ParameterValue,
};
pub use pose::{GraphPoseNodeResult, PlaybackState, PoseTask};
pub use skeleton::{BoneMaskLookup, Skeleton};
pub use target::{Target, TargetOffsets, Transform};
pub use task_list::{BoneMaskTask, BoneMaskTaskList};
pub use topo::topo_order;
pub use types::*;
