use crate::context::{GraphContext, InitContext};
use crate::error::GraphError;
use crate::nodes::cached::evaluate_cached;
use crate::nodes::node_state::{CachedState, NodeRuntimeState};
use crate::nodes::{GraphNode, VectorHandle};
use crate::parameters::{ParameterHandle, ParameterKind};
use crate::types::{CachedValueMode, VectorNodeDefinition};

#[derive(Debug, Clone)]
pub enum VectorNode {
    Constant([f32; 4]),
    Cached {
        input: VectorHandle,
        mode: CachedValueMode,
    },
    ControlParameter(ParameterHandle),
}

impl VectorNode {
    pub(crate) fn bind(
        def: &VectorNodeDefinition,
        ctx: &mut InitContext<'_>,
    ) -> Result<Self, GraphError> {
        Ok(match def {
            VectorNodeDefinition::Constant { value } => VectorNode::Constant(*value),
            VectorNodeDefinition::Cached { input, mode } => VectorNode::Cached {
                input: ctx.lookup(*input)?,
                mode: *mode,
            },
            VectorNodeDefinition::ControlParameter { parameter } => {
                VectorNode::ControlParameter(ctx.parameter(parameter, ParameterKind::Vector)?)
            }
        })
    }

    pub(crate) fn initial_state(&self) -> NodeRuntimeState {
        match self {
            VectorNode::Cached { mode, .. } => {
                NodeRuntimeState::CachedVector(CachedState::new(*mode))
            }
            _ => NodeRuntimeState::Stateless,
        }
    }
}

pub(crate) fn evaluate(ctx: &mut GraphContext<'_>, index: usize) -> [f32; 4] {
    let Some(GraphNode::Vector(node)) = ctx.nodes().get(index) else {
        return [0.0; 4];
    };
    match node {
        VectorNode::Constant(value) => *value,
        VectorNode::Cached { input, .. } => {
            let input = *input;
            evaluate_cached(ctx, index, |ctx| ctx.vector(input))
        }
        VectorNode::ControlParameter(handle) => ctx.parameters().vector(*handle),
    }
}
