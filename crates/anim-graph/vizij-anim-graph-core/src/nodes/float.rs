//! Float value nodes.

use crate::context::{GraphContext, InitContext};
use crate::error::GraphError;
use crate::nodes::cached::evaluate_cached;
use crate::nodes::node_state::{CachedState, EaseState, NodeRuntimeState};
use crate::nodes::{BoolHandle, FloatHandle, GraphNode, IdHandle, VectorHandle};
use crate::parameters::{ParameterHandle, ParameterKind};
use crate::types::{
    AngleOperation, CachedValueMode, Easing, FloatMathOperator, FloatNodeDefinition,
    VectorComponent,
};

/// Distance under which easing snaps to its target.
const EASE_SNAP_DISTANCE: f32 = 0.01;

#[derive(Debug, Clone)]
pub enum FloatNode {
    Constant(f32),
    Cached {
        input: FloatHandle,
        mode: CachedValueMode,
    },
    ControlParameter(ParameterHandle),
    Math {
        input_a: FloatHandle,
        input_b: Option<FloatHandle>,
        value_b: f32,
        operator: FloatMathOperator,
        return_absolute: bool,
        return_negated: bool,
    },
    Clamp {
        input: FloatHandle,
        min: f32,
        max: f32,
    },
    Remap {
        input: FloatHandle,
        input_range: [f32; 2],
        output_range: [f32; 2],
    },
    AngleMath {
        input: FloatHandle,
        operation: AngleOperation,
    },
    Switch {
        switch: BoolHandle,
        if_true: FloatHandle,
        if_false: FloatHandle,
    },
    Ease {
        input: FloatHandle,
        ease_time: f32,
        easing: Easing,
        start_value: Option<f32>,
    },
    Selector {
        conditions: Vec<BoolHandle>,
        values: Vec<f32>,
        default_value: f32,
        easing: Easing,
        ease_time: f32,
    },
    IdToFloat {
        input: IdHandle,
        ids: Vec<String>,
        values: Vec<f32>,
        default_value: f32,
    },
    VectorInfo {
        input: VectorHandle,
        component: VectorComponent,
    },
}

impl FloatNode {
    pub(crate) fn bind(
        def: &FloatNodeDefinition,
        ctx: &mut InitContext<'_>,
    ) -> Result<Self, GraphError> {
        Ok(match def {
            FloatNodeDefinition::Constant { value } => FloatNode::Constant(*value),
            FloatNodeDefinition::Cached { input, mode } => FloatNode::Cached {
                input: ctx.lookup(*input)?,
                mode: *mode,
            },
            FloatNodeDefinition::ControlParameter { parameter } => {
                FloatNode::ControlParameter(ctx.parameter(parameter, ParameterKind::Float)?)
            }
            FloatNodeDefinition::Math {
                input_a,
                input_b,
                value_b,
                operator,
                return_absolute,
                return_negated,
            } => FloatNode::Math {
                input_a: ctx.lookup(*input_a)?,
                input_b: ctx.optional_lookup(*input_b)?,
                value_b: *value_b,
                operator: *operator,
                return_absolute: *return_absolute,
                return_negated: *return_negated,
            },
            FloatNodeDefinition::Clamp { input, min, max } => FloatNode::Clamp {
                input: ctx.lookup(*input)?,
                min: *min,
                max: *max,
            },
            FloatNodeDefinition::Remap {
                input,
                input_range,
                output_range,
            } => FloatNode::Remap {
                input: ctx.lookup(*input)?,
                input_range: *input_range,
                output_range: *output_range,
            },
            FloatNodeDefinition::AngleMath { input, operation } => FloatNode::AngleMath {
                input: ctx.lookup(*input)?,
                operation: *operation,
            },
            FloatNodeDefinition::Switch {
                switch,
                if_true,
                if_false,
            } => FloatNode::Switch {
                switch: ctx.lookup(*switch)?,
                if_true: ctx.lookup(*if_true)?,
                if_false: ctx.lookup(*if_false)?,
            },
            FloatNodeDefinition::Ease {
                input,
                ease_time,
                easing,
                start_value,
            } => FloatNode::Ease {
                input: ctx.lookup(*input)?,
                ease_time: *ease_time,
                easing: *easing,
                start_value: *start_value,
            },
            FloatNodeDefinition::Selector {
                conditions,
                values,
                default_value,
                easing,
                ease_time,
            } => {
                check_counts(ctx, "selector condition/value", conditions.len(), values.len())?;
                FloatNode::Selector {
                    conditions: ctx.lookup_array(conditions)?,
                    values: values.clone(),
                    default_value: *default_value,
                    easing: *easing,
                    ease_time: *ease_time,
                }
            }
            FloatNodeDefinition::IdToFloat {
                input,
                ids,
                values,
                default_value,
            } => {
                check_counts(ctx, "id/value", ids.len(), values.len())?;
                FloatNode::IdToFloat {
                    input: ctx.lookup(*input)?,
                    ids: ids.clone(),
                    values: values.clone(),
                    default_value: *default_value,
                }
            }
            FloatNodeDefinition::VectorInfo { input, component } => FloatNode::VectorInfo {
                input: ctx.lookup(*input)?,
                component: *component,
            },
        })
    }

    pub(crate) fn initial_state(&self) -> NodeRuntimeState {
        match self {
            FloatNode::Cached { mode, .. } => {
                NodeRuntimeState::CachedFloat(CachedState::new(*mode))
            }
            FloatNode::Ease { .. } | FloatNode::Selector { .. } => {
                NodeRuntimeState::Ease(EaseState::default())
            }
            _ => NodeRuntimeState::Stateless,
        }
    }
}

pub(crate) fn check_counts(
    ctx: &InitContext<'_>,
    what: &'static str,
    left: usize,
    right: usize,
) -> Result<(), GraphError> {
    if left != right {
        return Err(GraphError::CountMismatch {
            node: ctx.node_index(),
            what,
            left,
            right,
        });
    }
    Ok(())
}

pub(crate) fn start(ctx: &mut GraphContext<'_>, index: usize) {
    let Some(GraphNode::Float(node)) = ctx.nodes().get(index) else {
        return;
    };
    let initial = match node {
        FloatNode::Ease {
            input, start_value, ..
        } => match start_value {
            Some(value) => *value,
            None => ctx.float(*input),
        },
        FloatNode::Selector {
            conditions,
            values,
            default_value,
            ..
        } => select(ctx, conditions, values, *default_value),
        _ => return,
    };
    *ctx.state_mut(index).ease() = EaseState::settled(initial);
}

pub(crate) fn evaluate(ctx: &mut GraphContext<'_>, index: usize) -> f32 {
    let Some(GraphNode::Float(node)) = ctx.nodes().get(index) else {
        return 0.0;
    };
    match node {
        FloatNode::Constant(value) => *value,
        FloatNode::Cached { input, .. } => {
            let input = *input;
            evaluate_cached(ctx, index, |ctx| ctx.float(input))
        }
        FloatNode::ControlParameter(handle) => ctx.parameters().float(*handle),
        FloatNode::Math {
            input_a,
            input_b,
            value_b,
            operator,
            return_absolute,
            return_negated,
        } => {
            let a = ctx.float(*input_a);
            let b = match input_b {
                Some(handle) => ctx.float(*handle),
                None => *value_b,
            };
            let mut result = math(*operator, a, b);
            if *return_absolute {
                result = result.abs();
            }
            if *return_negated {
                result = -result;
            }
            result
        }
        FloatNode::Clamp { input, min, max } => ctx.float(*input).max(*min).min(*max),
        FloatNode::Remap {
            input,
            input_range,
            output_range,
        } => remap(ctx.float(*input), *input_range, *output_range),
        FloatNode::AngleMath { input, operation } => angle_math(*operation, ctx.float(*input)),
        FloatNode::Switch {
            switch,
            if_true,
            if_false,
        } => {
            if ctx.bool(*switch) {
                ctx.float(*if_true)
            } else {
                ctx.float(*if_false)
            }
        }
        FloatNode::Ease {
            input,
            ease_time,
            easing,
            ..
        } => {
            let target = ctx.float(*input);
            let dt = ctx.delta_time;
            range_ease(ctx.state_mut(index).ease(), dt, target, *ease_time, *easing)
        }
        FloatNode::Selector {
            conditions,
            values,
            default_value,
            easing,
            ease_time,
        } => {
            let target = select(ctx, conditions, values, *default_value);
            if *easing == Easing::None {
                return target;
            }
            let dt = ctx.delta_time;
            range_ease(ctx.state_mut(index).ease(), dt, target, *ease_time, *easing)
        }
        FloatNode::IdToFloat {
            input,
            ids,
            values,
            default_value,
        } => {
            let id = ctx.id(*input);
            ids.iter()
                .position(|candidate| *candidate == id)
                .and_then(|i| values.get(i).copied())
                .unwrap_or(*default_value)
        }
        FloatNode::VectorInfo { input, component } => {
            let v = ctx.vector(*input);
            match component {
                VectorComponent::X => v[0],
                VectorComponent::Y => v[1],
                VectorComponent::Z => v[2],
                VectorComponent::W => v[3],
                VectorComponent::Length => (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt(),
            }
        }
    }
}

fn select(
    ctx: &mut GraphContext<'_>,
    conditions: &[BoolHandle],
    values: &[f32],
    default_value: f32,
) -> f32 {
    for (condition, value) in conditions.iter().zip(values) {
        if ctx.bool(*condition) {
            return *value;
        }
    }
    default_value
}

fn math(operator: FloatMathOperator, a: f32, b: f32) -> f32 {
    match operator {
        FloatMathOperator::Add => a + b,
        FloatMathOperator::Sub => a - b,
        FloatMathOperator::Mul => a * b,
        FloatMathOperator::Div => {
            if b == 0.0 {
                0.0
            } else {
                a / b
            }
        }
        FloatMathOperator::Mod => {
            if b == 0.0 {
                0.0
            } else {
                a % b
            }
        }
        FloatMathOperator::Abs => a.abs(),
        FloatMathOperator::Negate => -a,
        FloatMathOperator::Floor => a.floor(),
        FloatMathOperator::Ceiling => a.ceil(),
        FloatMathOperator::IntegerPart => a.floor(),
        FloatMathOperator::FractionalPart => a - a.floor(),
        FloatMathOperator::InverseFractionalPart => 1.0 - (a - a.floor()),
    }
}

fn remap(value: f32, input_range: [f32; 2], output_range: [f32; 2]) -> f32 {
    let [in_begin, in_end] = input_range;
    let [out_begin, out_end] = output_range;
    let span = in_end - in_begin;
    if span.abs() <= f32::EPSILON {
        return out_begin;
    }
    out_begin + (value - in_begin) / span * (out_end - out_begin)
}

fn clamp_angle_180(angle: f32) -> f32 {
    let mut angle = angle % 360.0;
    if angle > 180.0 {
        angle -= 360.0;
    }
    if angle <= -180.0 {
        angle += 360.0;
    }
    angle
}

fn clamp_angle_360(angle: f32) -> f32 {
    let mut angle = angle % 360.0;
    if angle < 0.0 {
        angle += 360.0;
    }
    angle
}

fn angle_math(operation: AngleOperation, input: f32) -> f32 {
    match operation {
        AngleOperation::ClampTo180 => clamp_angle_180(input),
        AngleOperation::ClampTo360 => clamp_angle_360(input),
        AngleOperation::FlipHemisphere => clamp_angle_180(input - 180.0),
        AngleOperation::FlipHemisphereNegate => -clamp_angle_180(input - 180.0),
    }
}

pub(crate) fn apply_easing(easing: Easing, t: f32) -> f32 {
    match easing {
        Easing::None => 1.0,
        Easing::Linear => t,
        Easing::InQuad => t * t,
        Easing::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
        Easing::InOutQuad => {
            if t < 0.5 {
                2.0 * t * t
            } else {
                1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
            }
        }
        Easing::InCubic => t * t * t,
        Easing::OutCubic => 1.0 - (1.0 - t).powi(3),
        Easing::InOutCubic => {
            if t < 0.5 {
                4.0 * t * t * t
            } else {
                1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
            }
        }
    }
}

/// Advance `state` towards `target`. A new target restarts the ease from the current value.
pub(crate) fn range_ease(
    state: &mut EaseState,
    delta_time: f32,
    target: f32,
    ease_time: f32,
    easing: Easing,
) -> f32 {
    if (state.current - target).abs() < EASE_SNAP_DISTANCE {
        *state = EaseState::settled(target);
        return target;
    }

    if target != state.end {
        state.start = state.current;
        state.end = target;
        state.elapsed = 0.0;
    }

    state.elapsed += delta_time;
    let t = if ease_time <= 0.0 {
        1.0
    } else {
        (state.elapsed / ease_time).clamp(0.0, 1.0)
    };
    state.current = state.start + apply_easing(easing, t) * (state.end - state.start);
    state.current
}
