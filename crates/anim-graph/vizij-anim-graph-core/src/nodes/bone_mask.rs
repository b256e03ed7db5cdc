//! Bone-mask nodes.
//!
//! Mask and fixed-weight nodes build their task list once while wiring. Blend,
//! selector and switch nodes compose the lists of their inputs every
//! evaluation. The selector cross-blends between options over
//! `blend_time_seconds`, accumulating the tick delta while a blend is running.

use serde::{Deserialize, Serialize};

use crate::config::BoneMaskBlendMode;
use crate::context::{GraphContext, InitContext};
use crate::error::GraphError;
use crate::nodes::cached::evaluate_cached;
use crate::nodes::float::check_counts;
use crate::nodes::node_state::{BoneMaskSelectorState, CachedState, NodeRuntimeState};
use crate::nodes::{BoneMaskHandle, BoolHandle, FloatHandle, GraphNode, IdHandle};
use crate::task_list::BoneMaskTaskList;
use crate::types::{BoneMaskNodeDefinition, CachedValueMode};

#[derive(Debug, Clone)]
pub enum BoneMaskNode {
    /// Task list built while wiring: a skeleton mask or a uniform weight.
    Fixed(BoneMaskTaskList),
    Cached {
        input: BoneMaskHandle,
        mode: CachedValueMode,
    },
    Blend {
        source: BoneMaskHandle,
        target: BoneMaskHandle,
        blend_weight: FloatHandle,
    },
    Selector(BoneMaskSelector),
    Switch {
        switch: BoolHandle,
        if_true: BoneMaskHandle,
        if_false: BoneMaskHandle,
    },
}

#[derive(Debug, Clone)]
pub struct BoneMaskSelector {
    pub parameter: IdHandle,
    pub default_mask: Option<BoneMaskHandle>,
    pub masks: Vec<BoneMaskHandle>,
    pub parameter_values: Vec<String>,
    pub switch_dynamically: bool,
    pub blend_time_seconds: f32,
}

/// Snapshot of a bone-mask selector for hosts and tools.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoneMaskSelectorStatus {
    /// Selected option; `None` means the default mask.
    pub selected_option: Option<usize>,
    pub blend_target: Option<usize>,
    pub blending: bool,
    pub blend_weight: f32,
}

impl BoneMaskNode {
    pub(crate) fn bind(
        def: &BoneMaskNodeDefinition,
        ctx: &mut InitContext<'_>,
    ) -> Result<Self, GraphError> {
        Ok(match def {
            BoneMaskNodeDefinition::Mask { bone_mask_id } => {
                let mut list = BoneMaskTaskList::empty();
                match ctx.bone_mask_index(bone_mask_id) {
                    Some(index) => {
                        let index =
                            u8::try_from(index).map_err(|_| GraphError::BoneMaskIndexOutOfRange {
                                node: ctx.node_index(),
                                index,
                            })?;
                        list.emplace_mask(index);
                    }
                    None => {
                        ctx.warn(format!("couldn't find bone mask with id '{bone_mask_id}'"));
                        list.emplace_uniform(0.0);
                    }
                }
                BoneMaskNode::Fixed(list)
            }
            BoneMaskNodeDefinition::FixedWeight { weight } => {
                let mut list = BoneMaskTaskList::empty();
                list.emplace_uniform(*weight);
                BoneMaskNode::Fixed(list)
            }
            BoneMaskNodeDefinition::Cached { input, mode } => BoneMaskNode::Cached {
                input: ctx.lookup(*input)?,
                mode: *mode,
            },
            BoneMaskNodeDefinition::Blend {
                source,
                target,
                blend_weight,
            } => BoneMaskNode::Blend {
                source: ctx.lookup(*source)?,
                target: ctx.lookup(*target)?,
                blend_weight: ctx.lookup(*blend_weight)?,
            },
            BoneMaskNodeDefinition::Selector {
                parameter,
                default_mask,
                masks,
                parameter_values,
                switch_dynamically,
                blend_time_seconds,
            } => {
                check_counts(ctx, "mask/parameter value", masks.len(), parameter_values.len())?;
                BoneMaskNode::Selector(BoneMaskSelector {
                    parameter: ctx.lookup(*parameter)?,
                    default_mask: ctx.optional_lookup(*default_mask)?,
                    masks: ctx.lookup_array(masks)?,
                    parameter_values: parameter_values.clone(),
                    switch_dynamically: *switch_dynamically,
                    blend_time_seconds: *blend_time_seconds,
                })
            }
            BoneMaskNodeDefinition::Switch {
                switch,
                if_true,
                if_false,
            } => BoneMaskNode::Switch {
                switch: ctx.lookup(*switch)?,
                if_true: ctx.lookup(*if_true)?,
                if_false: ctx.lookup(*if_false)?,
            },
        })
    }

    pub(crate) fn initial_state(&self) -> NodeRuntimeState {
        match self {
            BoneMaskNode::Cached { mode, .. } => {
                NodeRuntimeState::CachedBoneMask(CachedState::new(*mode))
            }
            BoneMaskNode::Selector(_) => {
                NodeRuntimeState::BoneMaskSelector(BoneMaskSelectorState::default())
            }
            _ => NodeRuntimeState::Stateless,
        }
    }
}

/// Selects the initial option of a selector.
pub(crate) fn start(ctx: &mut GraphContext<'_>, index: usize) {
    let Some(GraphNode::BoneMask(BoneMaskNode::Selector(selector))) = ctx.nodes().get(index) else {
        return;
    };
    let selected = try_select(ctx, selector);
    *ctx.state_mut(index).bone_mask_selector() = BoneMaskSelectorState {
        selected,
        ..Default::default()
    };
}

pub(crate) fn evaluate(ctx: &mut GraphContext<'_>, index: usize) -> BoneMaskTaskList {
    let Some(GraphNode::BoneMask(node)) = ctx.nodes().get(index) else {
        return BoneMaskTaskList::default();
    };
    match node {
        BoneMaskNode::Fixed(list) => list.clone(),
        BoneMaskNode::Cached { input, .. } => {
            let input = *input;
            evaluate_cached(ctx, index, |ctx| ctx.bone_mask(input))
        }
        BoneMaskNode::Blend {
            source,
            target,
            blend_weight,
        } => {
            let source = ctx.bone_mask(*source);
            let target = ctx.bone_mask(*target);
            let weight = ctx.float(*blend_weight);
            if weight <= 0.0 {
                source
            } else if weight >= 1.0 {
                target
            } else {
                match ctx.config().bone_mask_blend {
                    BoneMaskBlendMode::PassThrough => source,
                    BoneMaskBlendMode::Blend => {
                        let mut list = BoneMaskTaskList::empty();
                        list.set_to_blend_between(&source, &target, weight);
                        list
                    }
                }
            }
        }
        BoneMaskNode::Selector(selector) => evaluate_selector(ctx, index, selector),
        BoneMaskNode::Switch {
            switch,
            if_true,
            if_false,
        } => {
            if ctx.bool(*switch) {
                ctx.bone_mask(*if_true)
            } else {
                ctx.bone_mask(*if_false)
            }
        }
    }
}

fn try_select(ctx: &mut GraphContext<'_>, selector: &BoneMaskSelector) -> Option<usize> {
    let value = ctx.id(selector.parameter);
    selector
        .parameter_values
        .iter()
        .position(|candidate| *candidate == value)
}

fn option_mask(
    ctx: &mut GraphContext<'_>,
    selector: &BoneMaskSelector,
    option: Option<usize>,
) -> BoneMaskTaskList {
    if let Some(mask) = option.and_then(|i| selector.masks.get(i)) {
        return ctx.bone_mask(*mask);
    }
    match selector.default_mask {
        Some(mask) => ctx.bone_mask(mask),
        None => BoneMaskTaskList::default(),
    }
}

fn evaluate_selector(
    ctx: &mut GraphContext<'_>,
    index: usize,
    selector: &BoneMaskSelector,
) -> BoneMaskTaskList {
    let mut state = *ctx.state_mut(index).bone_mask_selector();

    if selector.switch_dynamically && !state.blending {
        let candidate = try_select(ctx, selector);
        if candidate != state.selected {
            state.target = candidate;
            state.elapsed = 0.0;
            state.blending = true;
        }
    }

    let result = if state.blending {
        state.elapsed += ctx.delta_time;
        let weight = if selector.blend_time_seconds <= 0.0 {
            1.0
        } else {
            state.elapsed / selector.blend_time_seconds
        };
        if weight >= 1.0 {
            state.selected = state.target;
            state.target = None;
            state.blending = false;
            option_mask(ctx, selector, state.selected)
        } else {
            let from = option_mask(ctx, selector, state.selected);
            let to = option_mask(ctx, selector, state.target);
            let mut list = BoneMaskTaskList::empty();
            list.set_to_blend_between(&from, &to, weight);
            list
        }
    } else {
        option_mask(ctx, selector, state.selected)
    };

    *ctx.state_mut(index).bone_mask_selector() = state;
    result
}

pub(crate) fn selector_status(
    nodes: &[GraphNode],
    states: &[NodeRuntimeState],
    index: usize,
) -> Option<BoneMaskSelectorStatus> {
    let Some(GraphNode::BoneMask(BoneMaskNode::Selector(selector))) = nodes.get(index) else {
        return None;
    };
    let state = states.get(index)?.as_bone_mask_selector()?;
    let blend_weight = if !state.blending {
        0.0
    } else if selector.blend_time_seconds <= 0.0 {
        1.0
    } else {
        (state.elapsed / selector.blend_time_seconds).min(1.0)
    };
    Some(BoneMaskSelectorStatus {
        selected_option: state.selected,
        blend_target: state.target,
        blending: state.blending,
        blend_weight,
    })
}
