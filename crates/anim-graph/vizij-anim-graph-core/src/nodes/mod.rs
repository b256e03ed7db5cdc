//! Bound graph nodes.
//!
//! Every [`NodeDefinition`] is bound once into a [`GraphNode`] whose child edges
//! are typed arena handles. Evaluation is split by value family:
//!
//! - [`float`], [`boolean`], [`vector`], [`id`] and [`target`] produce plain values.
//! - [`bone_mask`] produces lazy [`BoneMaskTaskList`](crate::task_list::BoneMaskTaskList)s.
//! - [`pose`] and [`state_machine`] produce
//!   [`GraphPoseNodeResult`](crate::pose::GraphPoseNodeResult)s.
//! - [`cached`] implements latching shared by every cached variant.
//! - [`node_state`] holds the per-node state that persists between ticks.

use crate::context::{GraphContext, InitContext};
use crate::error::GraphError;
use crate::types::{NodeDefinition, NodeIndex, PoseNodeDefinition};

pub mod bone_mask;
pub mod boolean;
mod cached;
pub mod float;
pub mod id;
pub mod node_state;
pub mod pose;
pub mod state_machine;
pub mod target;
pub mod vector;

pub use bone_mask::BoneMaskNode;
pub use boolean::BoolNode;
pub use float::FloatNode;
pub use id::IdNode;
pub use node_state::NodeRuntimeState;
pub use pose::PoseNode;
pub use target::TargetNode;
pub use vector::VectorNode;

#[cfg(test)]
mod tests;

/// Typed index of a node in the bound arena.
pub trait NodeHandle: Copy {
    /// Kind name reported when a definition edge points at the wrong node.
    const EXPECTED: &'static str;

    fn accepts(def: &NodeDefinition) -> bool;
    fn from_index(index: usize) -> Self;
    fn index(self) -> usize;
}

macro_rules! node_handle {
    ($(#[$meta:meta])* $name:ident, $expected:literal, $pat:pat) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $name(usize);

        impl NodeHandle for $name {
            const EXPECTED: &'static str = $expected;

            fn accepts(def: &NodeDefinition) -> bool {
                matches!(def, $pat)
            }

            fn from_index(index: usize) -> Self {
                $name(index)
            }

            fn index(self) -> usize {
                self.0
            }
        }
    };
}

node_handle!(FloatHandle, "float", NodeDefinition::Float(_));
node_handle!(BoolHandle, "bool", NodeDefinition::Bool(_));
node_handle!(VectorHandle, "vector", NodeDefinition::Vector(_));
node_handle!(IdHandle, "id", NodeDefinition::Id(_));
node_handle!(TargetHandle, "target", NodeDefinition::Target(_));
node_handle!(BoneMaskHandle, "bone mask", NodeDefinition::BoneMask(_));
node_handle!(PoseHandle, "pose", NodeDefinition::Pose(_));
node_handle!(
    /// A pose node that is specifically a state.
    StateHandle,
    "state",
    NodeDefinition::Pose(PoseNodeDefinition::State { .. })
);
node_handle!(
    TransitionHandle,
    "transition",
    NodeDefinition::Pose(PoseNodeDefinition::Transition { .. })
);

impl StateHandle {
    pub fn as_pose(self) -> PoseHandle {
        PoseHandle(self.0)
    }
}

impl TransitionHandle {
    pub fn as_pose(self) -> PoseHandle {
        PoseHandle(self.0)
    }

    pub fn node_index(self) -> NodeIndex {
        self.0 as NodeIndex
    }
}

#[derive(Debug, Clone)]
pub enum GraphNode {
    Float(FloatNode),
    Bool(BoolNode),
    Vector(VectorNode),
    Id(IdNode),
    Target(TargetNode),
    BoneMask(BoneMaskNode),
    Pose(PoseNode),
}

impl GraphNode {
    /// Wiring phase: resolve every child edge of `def`.
    pub(crate) fn bind(
        def: &NodeDefinition,
        ctx: &mut InitContext<'_>,
    ) -> Result<Self, GraphError> {
        Ok(match def {
            NodeDefinition::Float(def) => GraphNode::Float(FloatNode::bind(def, ctx)?),
            NodeDefinition::Bool(def) => GraphNode::Bool(BoolNode::bind(def, ctx)?),
            NodeDefinition::Vector(def) => GraphNode::Vector(VectorNode::bind(def, ctx)?),
            NodeDefinition::Id(def) => GraphNode::Id(IdNode::bind(def, ctx)?),
            NodeDefinition::Target(def) => GraphNode::Target(TargetNode::bind(def, ctx)?),
            NodeDefinition::BoneMask(def) => GraphNode::BoneMask(BoneMaskNode::bind(def, ctx)?),
            NodeDefinition::Pose(def) => GraphNode::Pose(PoseNode::bind(def, ctx)?),
        })
    }

    pub(crate) fn initial_state(&self) -> NodeRuntimeState {
        match self {
            GraphNode::Float(node) => node.initial_state(),
            GraphNode::Bool(node) => node.initial_state(),
            GraphNode::Vector(node) => node.initial_state(),
            GraphNode::Id(node) => node.initial_state(),
            GraphNode::Target(node) => node.initial_state(),
            GraphNode::BoneMask(node) => node.initial_state(),
            GraphNode::Pose(node) => node.initial_state(),
        }
    }
}

/// Seed runtime state that depends on other nodes' values. Called once per
/// node, children before parents.
pub(crate) fn start(ctx: &mut GraphContext<'_>, index: usize) {
    match ctx.nodes().get(index) {
        Some(GraphNode::Float(_)) => float::start(ctx, index),
        Some(GraphNode::BoneMask(_)) => bone_mask::start(ctx, index),
        Some(GraphNode::Pose(_)) => pose::start(ctx, index),
        _ => {}
    }
}

/// Return `index` and every node below it to its entry state.
///
/// Children are reset before their parents so parents can mirror the fresh
/// playback of their children.
pub(crate) fn reset_subtree(ctx: &mut GraphContext<'_>, index: usize, visited: &mut [bool]) {
    match visited.get_mut(index) {
        Some(seen) if !*seen => *seen = true,
        _ => return,
    }
    for &child in ctx.children(index) {
        reset_subtree(ctx, child, visited);
    }
    ctx.state_mut(index).reset_cache();
    if let Some(GraphNode::Pose(_)) = ctx.nodes().get(index) {
        pose::reset(ctx, index);
    }
}
