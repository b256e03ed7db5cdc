//! States, transitions and the state machine that sequences them.
//!
//! A state machine is either steady in one state or running one transition.
//! Transitions are armed only from an active branch: the active state's
//! transitions are scanned in authored order and the first whose condition
//! holds is started. While a transition runs only forcible transitions may
//! pre-empt it, and the interrupted transition becomes the new one's source.
//! A transition commits on the first tick after its progress reaches 1.

use serde::{Deserialize, Serialize};

use crate::context::{BranchState, GraphContext, InitContext};
use crate::error::GraphError;
use crate::nodes::node_state::{
    NodeRuntimeState, StateMachineState, StateNodeState, TransitionFlag, TransitionNodeState,
    TransitionSource,
};
use crate::nodes::pose::PoseNode;
use crate::nodes::{
    reset_subtree, BoneMaskHandle, BoolHandle, FloatHandle, GraphNode, NodeHandle, PoseHandle,
    StateHandle, TransitionHandle,
};
use crate::pose::{GraphPoseNodeResult, PlaybackState, PoseTask};
use crate::types::{NodeIndex, StateDefinition};

#[derive(Debug, Clone)]
pub struct StateNode {
    pub child: Option<PoseHandle>,
}

#[derive(Debug, Clone)]
pub struct TransitionNode {
    pub target_state: StateHandle,
    /// Seconds.
    pub duration: f32,
    pub duration_override: Option<FloatHandle>,
    pub bone_mask: Option<BoneMaskHandle>,
}

#[derive(Debug, Clone)]
pub struct TransitionInfo {
    pub transition: TransitionHandle,
    pub condition: BoolHandle,
    /// Index into [`StateMachineNode::states`].
    pub target_state: usize,
    pub can_be_forced: bool,
}

#[derive(Debug, Clone)]
pub struct StateInfo {
    pub state: StateHandle,
    pub entry_condition: Option<BoolHandle>,
    pub transitions: Vec<TransitionInfo>,
    pub has_forceable_transitions: bool,
}

#[derive(Debug, Clone)]
pub struct StateMachineNode {
    pub states: Vec<StateInfo>,
    pub default_state: usize,
}

/// Snapshot of a state machine for hosts and tools.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateMachineStatus {
    pub active_state_index: usize,
    /// Node index of the running transition, if any.
    pub active_transition: Option<NodeIndex>,
    pub transition_progress: Option<f32>,
    pub playback: PlaybackState,
}

impl StateMachineNode {
    pub(crate) fn bind(
        states: &[StateDefinition],
        default_state: NodeIndex,
        ctx: &mut InitContext<'_>,
    ) -> Result<Self, GraphError> {
        let node = ctx.node_index();
        if states.is_empty() {
            return Err(GraphError::EmptyStateMachine { node });
        }
        let count = states.len();
        let default = usize::try_from(default_state)
            .ok()
            .filter(|&i| i < count)
            .ok_or(GraphError::InvalidDefaultState {
                node,
                index: default_state,
                count,
            })?;

        let mut bound = Vec::with_capacity(count);
        for state in states {
            let mut transitions = Vec::with_capacity(state.transitions.len());
            for transition in &state.transitions {
                let target_state = usize::try_from(transition.target_state)
                    .ok()
                    .filter(|&i| i < count)
                    .ok_or(GraphError::InvalidTransitionTarget {
                        node,
                        index: transition.target_state,
                        count,
                    })?;
                transitions.push(TransitionInfo {
                    transition: ctx.lookup(transition.transition)?,
                    condition: ctx.lookup(transition.condition)?,
                    target_state,
                    can_be_forced: transition.can_be_forced,
                });
            }
            bound.push(StateInfo {
                state: ctx.lookup(state.state)?,
                entry_condition: ctx.optional_lookup(state.entry_condition)?,
                has_forceable_transitions: transitions.iter().any(|t| t.can_be_forced),
                transitions,
            });
        }

        Ok(StateMachineNode {
            states: bound,
            default_state: default,
        })
    }
}

fn transition_node<'a>(
    ctx: &GraphContext<'a>,
    handle: TransitionHandle,
) -> Option<&'a TransitionNode> {
    match ctx.nodes().get(handle.index()) {
        Some(GraphNode::Pose(PoseNode::Transition(node))) => Some(node),
        _ => None,
    }
}

fn set_flag(ctx: &mut GraphContext<'_>, state: StateHandle, flag: TransitionFlag) {
    ctx.state_mut(state.index()).state_node().transition = flag;
}

fn is_transitioning(ctx: &GraphContext<'_>, state: StateHandle) -> bool {
    ctx.state(state.index())
        .as_state_node()
        .is_some_and(StateNodeState::is_transitioning)
}

pub(crate) fn reset_state(ctx: &mut GraphContext<'_>, index: usize, node: &StateNode) {
    let playback = node
        .child
        .map(|child| ctx.playback(child.index()))
        .unwrap_or_default();
    *ctx.state_mut(index).state_node() = StateNodeState {
        playback,
        ..Default::default()
    };
}

pub(crate) fn reset_machine(ctx: &mut GraphContext<'_>, index: usize, node: &StateMachineNode) {
    let playback = node
        .states
        .get(node.default_state)
        .map(|info| ctx.playback(info.state.index()))
        .unwrap_or_default();
    *ctx.state_mut(index).state_machine() = StateMachineState {
        active_state: node.default_state,
        active_transition: None,
        playback,
    };
}

pub(crate) fn update_state(
    ctx: &mut GraphContext<'_>,
    index: usize,
    node: &StateNode,
) -> GraphPoseNodeResult {
    let (pose, child_playback) = match node.child {
        Some(child) => {
            let result = ctx.pose(child);
            (result.pose, Some(ctx.playback(child.index())))
        }
        None => (PoseTask::ReferencePose, None),
    };

    let dt = ctx.delta_time;
    let state = ctx.state_mut(index).state_node();
    if let Some(playback) = child_playback {
        state.playback = playback;
    }
    state.elapsed += dt;
    GraphPoseNodeResult::new(pose, &state.playback)
}

// Drops `transition` from the source chain starting at `source` and returns the
// source the new run of `transition` should blend from.
fn unlink_from_chain(
    ctx: &mut GraphContext<'_>,
    source: TransitionSource,
    transition: TransitionHandle,
    fallback: StateHandle,
) -> TransitionSource {
    let previous_source = ctx
        .state(transition.index())
        .as_transition()
        .filter(|state| state.active)
        .and_then(|state| state.source);

    if source == TransitionSource::Transition(transition) {
        return previous_source.unwrap_or(TransitionSource::State(fallback));
    }

    let mut current = source;
    for _ in 0..ctx.nodes().len() {
        let TransitionSource::Transition(link) = current else {
            break;
        };
        let next = ctx.state(link.index()).as_transition().and_then(|s| s.source);
        match next {
            Some(TransitionSource::Transition(t)) if t == transition => {
                ctx.state_mut(link.index()).transition().source = previous_source;
                break;
            }
            Some(next) => current = next,
            None => break,
        }
    }
    source
}

/// Begin `transition`, blending away from `source`.
pub(crate) fn start_transition(
    ctx: &mut GraphContext<'_>,
    transition: TransitionHandle,
    source: TransitionSource,
) {
    let Some(node) = transition_node(ctx, transition) else {
        return;
    };

    let source = unlink_from_chain(ctx, source, transition, node.target_state);
    let duration = match node.duration_override {
        Some(handle) => ctx.float(handle),
        None => node.duration,
    };

    let mut visited = vec![false; ctx.nodes().len()];
    reset_subtree(ctx, node.target_state.index(), &mut visited);

    match source {
        TransitionSource::State(state) => set_flag(ctx, state, TransitionFlag::Out),
        TransitionSource::Transition(previous) => {
            if let Some(previous) = transition_node(ctx, previous) {
                set_flag(ctx, previous.target_state, TransitionFlag::Out);
            }
        }
    }
    set_flag(ctx, node.target_state, TransitionFlag::In);

    let playback = ctx.playback(node.target_state.index());
    *ctx.state_mut(transition.index()).transition() = TransitionNodeState {
        active: true,
        source: Some(source),
        elapsed: 0.0,
        duration,
        progress: if duration <= 0.0 { 1.0 } else { 0.0 },
        playback,
    };
}

/// End `transition` and clear the transition flags along its source chain.
pub(crate) fn stop_transition(ctx: &mut GraphContext<'_>, transition: TransitionHandle) {
    let Some(node) = transition_node(ctx, transition) else {
        return;
    };
    let source = {
        let state = ctx.state_mut(transition.index()).transition();
        state.active = false;
        state.source.take()
    };
    set_flag(ctx, node.target_state, TransitionFlag::None);
    match source {
        Some(TransitionSource::State(state)) => set_flag(ctx, state, TransitionFlag::None),
        Some(TransitionSource::Transition(previous)) => stop_transition(ctx, previous),
        None => {}
    }
}

pub(crate) fn update_transition(
    ctx: &mut GraphContext<'_>,
    index: usize,
    node: &TransitionNode,
) -> GraphPoseNodeResult {
    let dt = ctx.delta_time;
    let (source, progress) = {
        let state = ctx.state_mut(index).transition();
        state.elapsed += dt;
        state.progress = if state.duration <= 0.0 {
            1.0
        } else {
            (state.elapsed / state.duration).clamp(0.0, 1.0)
        };
        (state.source, state.progress)
    };

    // Target first: a state that also sits in the source chain is then
    // updated once, as part of the active branch.
    let target = ctx.pose(node.target_state.as_pose());
    let source_pose = source.map(|source| {
        let handle = match source {
            TransitionSource::State(state) => state.as_pose(),
            TransitionSource::Transition(transition) => transition.as_pose(),
        };
        ctx.with_branch(BranchState::Inactive, |ctx| ctx.pose(handle).pose)
    });
    let bone_mask = node.bone_mask.map(|mask| ctx.bone_mask(mask));

    let playback = ctx.playback(node.target_state.index());
    ctx.state_mut(index).transition().playback = playback;

    let pose = match source_pose {
        Some(source) => PoseTask::Blend {
            source: Box::new(source),
            target: Box::new(target.pose),
            weight: progress,
            bone_mask,
        },
        None => target.pose,
    };
    GraphPoseNodeResult::new(pose, &playback)
}

pub(crate) fn update_machine(
    ctx: &mut GraphContext<'_>,
    index: usize,
    node: &StateMachineNode,
) -> GraphPoseNodeResult {
    if let Some(transition) = ctx.state_mut(index).state_machine().active_transition {
        let complete = ctx
            .state(transition.index())
            .as_transition()
            .map_or(true, TransitionNodeState::is_complete);
        if complete {
            stop_transition(ctx, transition);
            let machine = ctx.state_mut(index).state_machine();
            machine.active_transition = None;
            log::debug!(
                "[anim graph][node {index}] transition {} committed to state {}",
                transition.index(),
                machine.active_state
            );
        }
    }

    let machine = *ctx.state_mut(index).state_machine();
    let Some(active) = node.states.get(machine.active_state) else {
        return GraphPoseNodeResult::new(PoseTask::ReferencePose, &machine.playback);
    };

    let (result, playback) = match machine.active_transition {
        None => {
            let result = ctx.pose(active.state.as_pose());
            (result, ctx.playback(active.state.index()))
        }
        Some(transition) => {
            let result = ctx.pose(transition.as_pose());
            (result, ctx.playback(transition.index()))
        }
    };
    ctx.state_mut(index).state_machine().playback = playback;

    if ctx.branch_state == BranchState::Active {
        evaluate_transitions(ctx, index, node);
    }

    let playback = ctx.state_mut(index).state_machine().playback;
    GraphPoseNodeResult::new(result.pose, &playback)
}

fn evaluate_transitions(ctx: &mut GraphContext<'_>, index: usize, node: &StateMachineNode) {
    let machine = *ctx.state_mut(index).state_machine();
    let Some(active) = node.states.get(machine.active_state) else {
        return;
    };
    let transitioning = machine.active_transition.is_some();
    if transitioning && !active.has_forceable_transitions {
        return;
    }

    let mut selected = None;
    for candidate in &active.transitions {
        if !candidate.can_be_forced {
            if transitioning {
                continue;
            }
            // Entering a state that is already transitioning would loop.
            let target_busy = node
                .states
                .get(candidate.target_state)
                .is_some_and(|target| is_transitioning(ctx, target.state));
            if target_busy {
                continue;
            }
        }
        if ctx.bool(candidate.condition) {
            selected = Some(candidate);
            break;
        }
    }
    let Some(candidate) = selected else {
        return;
    };
    let Some(target) = node.states.get(candidate.target_state) else {
        return;
    };

    let source = match machine.active_transition {
        Some(transition) => TransitionSource::Transition(transition),
        None => TransitionSource::State(active.state),
    };
    start_transition(ctx, candidate.transition, source);
    log::debug!(
        "[anim graph][node {index}] starting transition {} from state {} to state {}",
        candidate.transition.index(),
        machine.active_state,
        candidate.target_state
    );

    let playback = ctx.playback(target.state.index());
    let machine = ctx.state_mut(index).state_machine();
    machine.active_transition = Some(candidate.transition);
    machine.active_state = candidate.target_state;
    machine.playback = playback;
}

pub(crate) fn status(states: &[NodeRuntimeState], index: usize) -> Option<StateMachineStatus> {
    let machine = states.get(index)?.as_state_machine()?;
    let transition_progress = machine
        .active_transition
        .and_then(|t| states.get(t.index()))
        .and_then(NodeRuntimeState::as_transition)
        .map(|t| t.progress);
    Some(StateMachineStatus {
        active_state_index: machine.active_state,
        active_transition: machine.active_transition.map(TransitionHandle::node_index),
        transition_progress,
        playback: machine.playback,
    })
}
