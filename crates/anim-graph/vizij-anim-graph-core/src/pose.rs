//! Pose descriptions produced by pose nodes.

use serde::{Deserialize, Serialize};

use crate::task_list::BoneMaskTaskList;

/// A lazily described pose. Sampling and blending happen downstream.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PoseTask {
    #[default]
    ReferencePose,
    ZeroPose,
    SampleClip {
        data_slot: u16,
        /// Normalized clip time in `[0, 1]`.
        time: f32,
    },
    Blend {
        source: Box<PoseTask>,
        target: Box<PoseTask>,
        weight: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bone_mask: Option<BoneMaskTaskList>,
    },
}

/// Playback position carried by every pose node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Seconds.
    pub duration: f32,
    /// Normalized.
    pub previous_time: f32,
    /// Normalized.
    pub current_time: f32,
    pub loop_count: u32,
}

impl Default for PlaybackState {
    fn default() -> Self {
        PlaybackState {
            duration: 0.0,
            previous_time: 1.0,
            current_time: 1.0,
            loop_count: 0,
        }
    }
}

impl PlaybackState {
    /// Playback at the start of a clip of `duration` seconds.
    pub fn at_start(duration: f32) -> Self {
        PlaybackState {
            duration,
            previous_time: 0.0,
            current_time: 0.0,
            loop_count: 0,
        }
    }
}

/// Output of one pose-node update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPoseNodeResult {
    pub pose: PoseTask,
    pub duration: f32,
    pub previous_time: f32,
    pub current_time: f32,
}

impl GraphPoseNodeResult {
    pub fn new(pose: PoseTask, playback: &PlaybackState) -> Self {
        GraphPoseNodeResult {
            pose,
            duration: playback.duration,
            previous_time: playback.previous_time,
            current_time: playback.current_time,
        }
    }
}
