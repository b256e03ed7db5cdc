use crate::context::{GraphContext, InitContext};
use crate::error::GraphError;
use crate::nodes::cached::evaluate_cached;
use crate::nodes::node_state::{CachedState, NodeRuntimeState};
use crate::nodes::{GraphNode, TargetHandle};
use crate::parameters::{ParameterHandle, ParameterKind};
use crate::target::{Target, TargetOffsets};
use crate::types::{CachedValueMode, TargetNodeDefinition};

#[derive(Debug, Clone)]
pub enum TargetNode {
    Constant(Target),
    Cached {
        input: TargetHandle,
        mode: CachedValueMode,
    },
    ControlParameter(ParameterHandle),
    /// Adds offsets to a bone target; anything else passes through with a warning.
    Offset {
        input: TargetHandle,
        offsets: TargetOffsets,
    },
}

impl TargetNode {
    pub(crate) fn bind(
        def: &TargetNodeDefinition,
        ctx: &mut InitContext<'_>,
    ) -> Result<Self, GraphError> {
        Ok(match def {
            TargetNodeDefinition::Constant { value } => TargetNode::Constant(value.clone()),
            TargetNodeDefinition::Cached { input, mode } => TargetNode::Cached {
                input: ctx.lookup(*input)?,
                mode: *mode,
            },
            TargetNodeDefinition::ControlParameter { parameter } => {
                TargetNode::ControlParameter(ctx.parameter(parameter, ParameterKind::Target)?)
            }
            TargetNodeDefinition::Offset {
                input,
                rotation_offset,
                translation_offset,
                bone_space,
            } => TargetNode::Offset {
                input: ctx.lookup(*input)?,
                offsets: TargetOffsets {
                    rotation: *rotation_offset,
                    translation: *translation_offset,
                    bone_space: *bone_space,
                },
            },
        })
    }

    pub(crate) fn initial_state(&self) -> NodeRuntimeState {
        match self {
            TargetNode::Cached { mode, .. } => {
                NodeRuntimeState::CachedTarget(CachedState::new(*mode))
            }
            _ => NodeRuntimeState::Stateless,
        }
    }
}

pub(crate) fn evaluate(ctx: &mut GraphContext<'_>, index: usize) -> Target {
    let Some(GraphNode::Target(node)) = ctx.nodes().get(index) else {
        return Target::Unset;
    };
    match node {
        TargetNode::Constant(value) => value.clone(),
        TargetNode::Cached { input, .. } => {
            let input = *input;
            evaluate_cached(ctx, index, |ctx| ctx.target(input))
        }
        TargetNode::ControlParameter(handle) => ctx.parameters().target(*handle),
        TargetNode::Offset { input, offsets } => {
            let value = ctx.target(*input);
            match value.with_offsets(offsets) {
                Some(offset) => offset,
                None => {
                    let reason = if value.is_set() {
                        "target is not a bone target"
                    } else {
                        "target is not set"
                    };
                    ctx.warn(index, format!("cannot apply offsets: {reason}"));
                    value
                }
            }
        }
    }
}
