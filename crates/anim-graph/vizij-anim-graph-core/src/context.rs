//! Wiring and evaluation contexts handed to every node call.
//!
//! [`InitContext`] exists only while a controller is being built: it resolves
//! child indices into typed arena handles and control-parameter names into
//! slots. [`GraphContext`] is rebuilt for every tick and carries the branch
//! state, the tick delta and mutable access to per-node runtime state.
//!
//! A pose node is updated at most once per context. A second pull in the same
//! tick, such as a state that is both a transition's target and part of its
//! source chain, returns the first result without advancing playback again.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::error::GraphError;
use crate::nodes::node_state::NodeRuntimeState;
use crate::nodes::{
    BoneMaskHandle, BoolHandle, FloatHandle, GraphNode, IdHandle, NodeHandle, PoseHandle,
    TargetHandle, VectorHandle,
};
use crate::parameters::{ControlParameters, ParameterHandle, ParameterKind};
use crate::pose::{GraphPoseNodeResult, PlaybackState};
use crate::skeleton::BoneMaskLookup;
use crate::target::Target;
use crate::task_list::BoneMaskTaskList;
use crate::types::{GraphDefinition, NodeIndex};

/// Whether the branch being evaluated contributes to this tick's result.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchState {
    #[default]
    Active,
    Inactive,
}

pub struct InitContext<'a> {
    definition: &'a GraphDefinition,
    parameters: &'a ControlParameters,
    skeleton: &'a dyn BoneMaskLookup,
    diagnostics: &'a mut Diagnostics,
    node: NodeIndex,
}

impl<'a> InitContext<'a> {
    pub(crate) fn new(
        definition: &'a GraphDefinition,
        parameters: &'a ControlParameters,
        skeleton: &'a dyn BoneMaskLookup,
        diagnostics: &'a mut Diagnostics,
    ) -> Self {
        InitContext {
            definition,
            parameters,
            skeleton,
            diagnostics,
            node: 0,
        }
    }

    /// Index of the node currently being wired.
    pub fn node_index(&self) -> NodeIndex {
        self.node
    }

    pub(crate) fn set_node(&mut self, node: NodeIndex) {
        self.node = node;
    }

    /// Resolve a required child. Fails when the index is absent, out of range,
    /// or names a node of the wrong kind.
    pub fn lookup<H: NodeHandle>(&self, index: NodeIndex) -> Result<H, GraphError> {
        let len = self.definition.nodes.len();
        let def = self
            .definition
            .node(index)
            .ok_or(GraphError::IndexOutOfRange {
                node: self.node,
                index,
                len,
            })?;
        if !H::accepts(def) {
            return Err(GraphError::KindMismatch {
                node: self.node,
                index,
                expected: H::EXPECTED,
                found: def.kind().name(),
            });
        }
        Ok(H::from_index(index as usize))
    }

    /// Resolve an optional child; a negative index means absent.
    pub fn optional_lookup<H: NodeHandle>(
        &self,
        index: NodeIndex,
    ) -> Result<Option<H>, GraphError> {
        if index < 0 {
            return Ok(None);
        }
        self.lookup(index).map(Some)
    }

    pub fn lookup_array<H: NodeHandle>(
        &self,
        indices: &[NodeIndex],
    ) -> Result<Vec<H>, GraphError> {
        indices.iter().map(|&i| self.lookup(i)).collect()
    }

    pub fn parameter(
        &self,
        name: &str,
        kind: ParameterKind,
    ) -> Result<ParameterHandle, GraphError> {
        self.parameters.resolve(name, kind).map_err(|err| match err {
            GraphError::UnknownParameter(name) => GraphError::UnboundParameter {
                node: self.node,
                name,
            },
            other => other,
        })
    }

    pub fn bone_mask_index(&self, id: &str) -> Option<usize> {
        self.skeleton.bone_mask_index(id)
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.diagnostics.warn(self.node, message);
    }
}

/// Last pose result of a node and the tick it was produced in.
#[derive(Debug, Clone)]
pub(crate) struct PoseMemo {
    pub tick: u64,
    pub result: GraphPoseNodeResult,
}

pub struct GraphContext<'a> {
    nodes: &'a [GraphNode],
    edges: &'a [Vec<usize>],
    states: &'a mut [NodeRuntimeState],
    parameters: &'a ControlParameters,
    config: &'a Config,
    diagnostics: &'a mut Diagnostics,
    pose_memo: &'a mut [Option<PoseMemo>],
    tick: u64,
    pub branch_state: BranchState,
    pub delta_time: f32,
}

impl<'a> GraphContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        nodes: &'a [GraphNode],
        edges: &'a [Vec<usize>],
        states: &'a mut [NodeRuntimeState],
        parameters: &'a ControlParameters,
        config: &'a Config,
        diagnostics: &'a mut Diagnostics,
        pose_memo: &'a mut [Option<PoseMemo>],
        tick: u64,
        branch_state: BranchState,
        delta_time: f32,
    ) -> Self {
        GraphContext {
            nodes,
            edges,
            states,
            parameters,
            config,
            diagnostics,
            pose_memo,
            tick,
            branch_state,
            delta_time,
        }
    }

    /// The bound node arena. The returned slice does not borrow the context.
    pub fn nodes(&self) -> &'a [GraphNode] {
        self.nodes
    }

    /// Resolved child indices of `index`, absent children omitted.
    pub fn children(&self, index: usize) -> &'a [usize] {
        let edges: &'a [Vec<usize>] = self.edges;
        edges.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parameters(&self) -> &'a ControlParameters {
        self.parameters
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    pub(crate) fn state(&self, index: usize) -> &NodeRuntimeState {
        &self.states[index]
    }

    pub(crate) fn state_mut(&mut self, index: usize) -> &mut NodeRuntimeState {
        &mut self.states[index]
    }

    pub fn warn(&mut self, node: usize, message: impl Into<String>) {
        self.diagnostics.warn(node as NodeIndex, message);
    }

    /// Run `f` with the branch state temporarily replaced.
    pub fn with_branch<R>(&mut self, branch: BranchState, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = self.branch_state;
        self.branch_state = branch;
        let out = f(self);
        self.branch_state = saved;
        out
    }

    pub fn float(&mut self, handle: FloatHandle) -> f32 {
        crate::nodes::float::evaluate(self, handle.index())
    }

    pub fn bool(&mut self, handle: BoolHandle) -> bool {
        crate::nodes::boolean::evaluate(self, handle.index())
    }

    pub fn vector(&mut self, handle: VectorHandle) -> [f32; 4] {
        crate::nodes::vector::evaluate(self, handle.index())
    }

    pub fn id(&mut self, handle: IdHandle) -> String {
        crate::nodes::id::evaluate(self, handle.index())
    }

    pub fn target(&mut self, handle: TargetHandle) -> Target {
        crate::nodes::target::evaluate(self, handle.index())
    }

    pub fn bone_mask(&mut self, handle: BoneMaskHandle) -> BoneMaskTaskList {
        crate::nodes::bone_mask::evaluate(self, handle.index())
    }

    pub fn pose(&mut self, handle: PoseHandle) -> GraphPoseNodeResult {
        let index = handle.index();
        if let Some(Some(memo)) = self.pose_memo.get(index) {
            if memo.tick == self.tick {
                return memo.result.clone();
            }
        }
        let result = crate::nodes::pose::update(self, index);
        if let Some(slot) = self.pose_memo.get_mut(index) {
            *slot = Some(PoseMemo {
                tick: self.tick,
                result: result.clone(),
            });
        }
        result
    }

    /// Current playback fields of any pose node.
    pub fn playback(&self, index: usize) -> PlaybackState {
        self.states[index].playback().unwrap_or_default()
    }
}
