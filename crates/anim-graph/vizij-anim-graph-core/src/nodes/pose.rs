//! Pose nodes: reference and zero poses, clip playback, and dispatch into the
//! state-machine family.

use crate::context::{GraphContext, InitContext};
use crate::error::GraphError;
use crate::nodes::node_state::{
    NodeRuntimeState, StateMachineState, StateNodeState, TransitionNodeState,
};
use crate::nodes::state_machine::{self, StateMachineNode, StateNode, TransitionNode};
use crate::nodes::{BoolHandle, GraphNode};
use crate::pose::{GraphPoseNodeResult, PlaybackState, PoseTask};
use crate::types::PoseNodeDefinition;

#[derive(Debug, Clone)]
pub enum PoseNode {
    ReferencePose,
    ZeroPose,
    Clip(ClipNode),
    State(StateNode),
    Transition(TransitionNode),
    StateMachine(StateMachineNode),
}

#[derive(Debug, Clone)]
pub struct ClipNode {
    pub data_slot: u16,
    pub duration: f32,
    pub speed_multiplier: f32,
    pub looping: bool,
    pub reset_time: Option<BoolHandle>,
    pub play_in_reverse: Option<BoolHandle>,
}

impl PoseNode {
    pub(crate) fn bind(
        def: &PoseNodeDefinition,
        ctx: &mut InitContext<'_>,
    ) -> Result<Self, GraphError> {
        Ok(match def {
            PoseNodeDefinition::ReferencePose => PoseNode::ReferencePose,
            PoseNodeDefinition::ZeroPose => PoseNode::ZeroPose,
            PoseNodeDefinition::Clip {
                data_slot,
                duration,
                speed_multiplier,
                looping,
                reset_time,
                play_in_reverse,
            } => PoseNode::Clip(ClipNode {
                data_slot: *data_slot,
                duration: *duration,
                speed_multiplier: *speed_multiplier,
                looping: *looping,
                reset_time: ctx.optional_lookup(*reset_time)?,
                play_in_reverse: ctx.optional_lookup(*play_in_reverse)?,
            }),
            PoseNodeDefinition::State { child } => PoseNode::State(StateNode {
                child: ctx.optional_lookup(*child)?,
            }),
            PoseNodeDefinition::Transition {
                target_state,
                duration,
                duration_override,
                bone_mask,
            } => PoseNode::Transition(TransitionNode {
                target_state: ctx.lookup(*target_state)?,
                duration: *duration,
                duration_override: ctx.optional_lookup(*duration_override)?,
                bone_mask: ctx.optional_lookup(*bone_mask)?,
            }),
            PoseNodeDefinition::StateMachine {
                states,
                default_state,
            } => PoseNode::StateMachine(StateMachineNode::bind(states, *default_state, ctx)?),
        })
    }

    pub(crate) fn initial_state(&self) -> NodeRuntimeState {
        match self {
            PoseNode::ReferencePose | PoseNode::ZeroPose => NodeRuntimeState::Stateless,
            PoseNode::Clip(clip) => NodeRuntimeState::Clip(PlaybackState::at_start(clip.duration)),
            PoseNode::State(_) => NodeRuntimeState::State(StateNodeState::default()),
            PoseNode::Transition(_) => NodeRuntimeState::Transition(TransitionNodeState::default()),
            PoseNode::StateMachine(machine) => NodeRuntimeState::StateMachine(StateMachineState {
                active_state: machine.default_state,
                ..Default::default()
            }),
        }
    }
}

/// Mirror initial child playback into states and state machines.
pub(crate) fn start(ctx: &mut GraphContext<'_>, index: usize) {
    if let Some(GraphNode::Pose(PoseNode::State(_) | PoseNode::StateMachine(_))) =
        ctx.nodes().get(index)
    {
        reset(ctx, index);
    }
}

/// Return one pose node to its entry state. Children must already be reset.
pub(crate) fn reset(ctx: &mut GraphContext<'_>, index: usize) {
    let Some(GraphNode::Pose(node)) = ctx.nodes().get(index) else {
        return;
    };
    match node {
        PoseNode::ReferencePose | PoseNode::ZeroPose => {}
        PoseNode::Clip(clip) => {
            *ctx.state_mut(index).clip() = PlaybackState::at_start(clip.duration)
        }
        PoseNode::State(state) => state_machine::reset_state(ctx, index, state),
        PoseNode::Transition(_) => {
            *ctx.state_mut(index).transition() = TransitionNodeState::default()
        }
        PoseNode::StateMachine(machine) => state_machine::reset_machine(ctx, index, machine),
    }
}

pub(crate) fn update(ctx: &mut GraphContext<'_>, index: usize) -> GraphPoseNodeResult {
    let Some(GraphNode::Pose(node)) = ctx.nodes().get(index) else {
        return GraphPoseNodeResult::new(PoseTask::ReferencePose, &PlaybackState::default());
    };
    match node {
        PoseNode::ReferencePose => {
            GraphPoseNodeResult::new(PoseTask::ReferencePose, &PlaybackState::default())
        }
        PoseNode::ZeroPose => {
            GraphPoseNodeResult::new(PoseTask::ZeroPose, &PlaybackState::default())
        }
        PoseNode::Clip(clip) => update_clip(ctx, index, clip),
        PoseNode::State(state) => state_machine::update_state(ctx, index, state),
        PoseNode::Transition(transition) => {
            state_machine::update_transition(ctx, index, transition)
        }
        PoseNode::StateMachine(machine) => state_machine::update_machine(ctx, index, machine),
    }
}

fn update_clip(ctx: &mut GraphContext<'_>, index: usize, clip: &ClipNode) -> GraphPoseNodeResult {
    let reset_time = clip.reset_time.map(|h| ctx.bool(h)).unwrap_or(false);
    let reverse = clip.play_in_reverse.map(|h| ctx.bool(h)).unwrap_or(false);
    let dt = ctx.delta_time;

    let playback = ctx.state_mut(index).clip();
    if reset_time {
        playback.current_time = 0.0;
        playback.previous_time = 0.0;
    }

    playback.previous_time = playback.current_time;
    if clip.duration > 0.0 {
        let mut delta = dt * clip.speed_multiplier / clip.duration;
        if reverse {
            delta = -delta;
        }
        playback.current_time += delta;
    }

    if clip.looping {
        if playback.current_time > 1.0 {
            let loops = playback.current_time.floor();
            playback.loop_count += loops as u32;
            playback.current_time -= loops;
        } else if playback.current_time < 0.0 {
            let loops = (-playback.current_time).ceil();
            playback.loop_count += loops as u32;
            playback.current_time += loops;
        }
    } else {
        playback.current_time = playback.current_time.max(0.0).min(1.0);
    }

    let pose = PoseTask::SampleClip {
        data_slot: clip.data_slot,
        time: playback.current_time,
    };
    GraphPoseNodeResult::new(pose, playback)
}
