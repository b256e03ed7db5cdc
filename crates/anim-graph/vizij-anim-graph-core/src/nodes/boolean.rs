//! Boolean condition nodes.

use crate::context::{GraphContext, InitContext};
use crate::error::GraphError;
use crate::nodes::cached::evaluate_cached;
use crate::nodes::node_state::{CachedState, NodeRuntimeState};
use crate::nodes::{
    BoolHandle, FloatHandle, GraphNode, IdHandle, NodeHandle, StateHandle, TargetHandle,
};
use crate::parameters::{ParameterHandle, ParameterKind};
use crate::types::{
    BoolNodeDefinition, CachedValueMode, Comparison, IdComparison, TimeConditionType,
};

#[derive(Debug, Clone)]
pub enum BoolNode {
    Constant(bool),
    Cached {
        input: BoolHandle,
        mode: CachedValueMode,
    },
    ControlParameter(ParameterHandle),
    Not(BoolHandle),
    And(Vec<BoolHandle>),
    Or(Vec<BoolHandle>),
    FloatComparison {
        input: FloatHandle,
        comparand: Option<FloatHandle>,
        comparison_value: f32,
        comparison: Comparison,
        epsilon: f32,
    },
    FloatRangeComparison {
        input: FloatHandle,
        range: [f32; 2],
        inclusive: bool,
    },
    IdComparison {
        input: IdHandle,
        ids: Vec<String>,
        comparison: IdComparison,
    },
    StateCompleted {
        source_state: StateHandle,
        transition_duration: f32,
    },
    TimeCondition {
        source_state: StateHandle,
        input: Option<FloatHandle>,
        comparand: f32,
        condition: TimeConditionType,
        operator: Comparison,
    },
    IsTargetSet(TargetHandle),
}

impl BoolNode {
    pub(crate) fn bind(
        def: &BoolNodeDefinition,
        ctx: &mut InitContext<'_>,
    ) -> Result<Self, GraphError> {
        Ok(match def {
            BoolNodeDefinition::Constant { value } => BoolNode::Constant(*value),
            BoolNodeDefinition::Cached { input, mode } => BoolNode::Cached {
                input: ctx.lookup(*input)?,
                mode: *mode,
            },
            BoolNodeDefinition::ControlParameter { parameter } => {
                BoolNode::ControlParameter(ctx.parameter(parameter, ParameterKind::Bool)?)
            }
            BoolNodeDefinition::Not { input } => BoolNode::Not(ctx.lookup(*input)?),
            BoolNodeDefinition::And { conditions } => BoolNode::And(ctx.lookup_array(conditions)?),
            BoolNodeDefinition::Or { conditions } => BoolNode::Or(ctx.lookup_array(conditions)?),
            BoolNodeDefinition::FloatComparison {
                input,
                comparand,
                comparison_value,
                comparison,
                epsilon,
            } => BoolNode::FloatComparison {
                input: ctx.lookup(*input)?,
                comparand: ctx.optional_lookup(*comparand)?,
                comparison_value: *comparison_value,
                comparison: *comparison,
                epsilon: *epsilon,
            },
            BoolNodeDefinition::FloatRangeComparison {
                input,
                range,
                inclusive,
            } => BoolNode::FloatRangeComparison {
                input: ctx.lookup(*input)?,
                range: *range,
                inclusive: *inclusive,
            },
            BoolNodeDefinition::IdComparison {
                input,
                ids,
                comparison,
            } => BoolNode::IdComparison {
                input: ctx.lookup(*input)?,
                ids: ids.clone(),
                comparison: *comparison,
            },
            BoolNodeDefinition::StateCompleted {
                source_state,
                transition_duration,
            } => BoolNode::StateCompleted {
                source_state: ctx.lookup(*source_state)?,
                transition_duration: *transition_duration,
            },
            BoolNodeDefinition::TimeCondition {
                source_state,
                input,
                comparand,
                condition,
                operator,
            } => BoolNode::TimeCondition {
                source_state: ctx.lookup(*source_state)?,
                input: ctx.optional_lookup(*input)?,
                comparand: *comparand,
                condition: *condition,
                operator: *operator,
            },
            BoolNodeDefinition::IsTargetSet { input } => BoolNode::IsTargetSet(ctx.lookup(*input)?),
        })
    }

    pub(crate) fn initial_state(&self) -> NodeRuntimeState {
        match self {
            BoolNode::Cached { mode, .. } => NodeRuntimeState::CachedBool(CachedState::new(*mode)),
            _ => NodeRuntimeState::Stateless,
        }
    }
}

pub(crate) fn evaluate(ctx: &mut GraphContext<'_>, index: usize) -> bool {
    let Some(GraphNode::Bool(node)) = ctx.nodes().get(index) else {
        return false;
    };
    match node {
        BoolNode::Constant(value) => *value,
        BoolNode::Cached { input, .. } => {
            let input = *input;
            evaluate_cached(ctx, index, |ctx| ctx.bool(input))
        }
        BoolNode::ControlParameter(handle) => ctx.parameters().bool(*handle),
        BoolNode::Not(input) => !ctx.bool(*input),
        BoolNode::And(conditions) => conditions.iter().all(|c| ctx.bool(*c)),
        BoolNode::Or(conditions) => conditions.iter().any(|c| ctx.bool(*c)),
        BoolNode::FloatComparison {
            input,
            comparand,
            comparison_value,
            comparison,
            epsilon,
        } => {
            let a = ctx.float(*input);
            let b = match comparand {
                Some(handle) => ctx.float(*handle),
                None => *comparison_value,
            };
            compare(*comparison, a, b, *epsilon)
        }
        BoolNode::FloatRangeComparison {
            input,
            range,
            inclusive,
        } => {
            let value = ctx.float(*input);
            let [min, max] = *range;
            if *inclusive {
                value >= min && value <= max
            } else {
                value > min && value < max
            }
        }
        BoolNode::IdComparison {
            input,
            ids,
            comparison,
        } => {
            let id = ctx.id(*input);
            let matches = ids.iter().any(|candidate| *candidate == id);
            match comparison {
                IdComparison::Matches => matches,
                IdComparison::DoesntMatch => !matches,
            }
        }
        BoolNode::StateCompleted {
            source_state,
            transition_duration,
        } => {
            let playback = ctx.playback(source_state.index());
            if playback.duration <= 0.0 {
                return true;
            }
            let transition_point = 1.0 - transition_duration / playback.duration;
            playback.current_time >= transition_point
        }
        BoolNode::TimeCondition {
            source_state,
            input,
            comparand,
            condition,
            operator,
        } => {
            let b = match input {
                Some(handle) => ctx.float(*handle),
                None => *comparand,
            };
            let Some(state) = ctx.state(source_state.index()).as_state_node() else {
                return false;
            };
            let a = match condition {
                TimeConditionType::PercentageThroughState => state.playback.current_time,
                TimeConditionType::ElapsedTime => state.elapsed,
                TimeConditionType::LoopCount => state.playback.loop_count as f32,
            };
            compare(*operator, a, b, f32::EPSILON)
        }
        BoolNode::IsTargetSet(input) => ctx.target(*input).is_set(),
    }
}

fn compare(comparison: Comparison, a: f32, b: f32, epsilon: f32) -> bool {
    match comparison {
        Comparison::LessThan => a < b,
        Comparison::LessThanEqual => a <= b,
        Comparison::GreaterThan => a > b,
        Comparison::GreaterThanEqual => a >= b,
        Comparison::NearEqual => (a - b).abs() <= epsilon,
    }
}
