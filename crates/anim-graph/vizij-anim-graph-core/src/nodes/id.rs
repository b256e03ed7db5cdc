use crate::context::{GraphContext, InitContext};
use crate::error::GraphError;
use crate::nodes::cached::evaluate_cached;
use crate::nodes::node_state::{CachedState, NodeRuntimeState};
use crate::nodes::{GraphNode, IdHandle};
use crate::parameters::{ParameterHandle, ParameterKind};
use crate::types::{CachedValueMode, IdNodeDefinition};

#[derive(Debug, Clone)]
pub enum IdNode {
    Constant(String),
    Cached {
        input: IdHandle,
        mode: CachedValueMode,
    },
    ControlParameter(ParameterHandle),
}

impl IdNode {
    pub(crate) fn bind(
        def: &IdNodeDefinition,
        ctx: &mut InitContext<'_>,
    ) -> Result<Self, GraphError> {
        Ok(match def {
            IdNodeDefinition::Constant { value } => IdNode::Constant(value.clone()),
            IdNodeDefinition::Cached { input, mode } => IdNode::Cached {
                input: ctx.lookup(*input)?,
                mode: *mode,
            },
            IdNodeDefinition::ControlParameter { parameter } => {
                IdNode::ControlParameter(ctx.parameter(parameter, ParameterKind::Id)?)
            }
        })
    }

    pub(crate) fn initial_state(&self) -> NodeRuntimeState {
        match self {
            IdNode::Cached { mode, .. } => NodeRuntimeState::CachedId(CachedState::new(*mode)),
            _ => NodeRuntimeState::Stateless,
        }
    }
}

pub(crate) fn evaluate(ctx: &mut GraphContext<'_>, index: usize) -> String {
    let Some(GraphNode::Id(node)) = ctx.nodes().get(index) else {
        return String::new();
    };
    match node {
        IdNode::Constant(value) => value.clone(),
        IdNode::Cached { input, .. } => {
            let input = *input;
            evaluate_cached(ctx, index, |ctx| ctx.id(input))
        }
        IdNode::ControlParameter(handle) => ctx.parameters().id(*handle).to_string(),
    }
}
