//! Host-facing controller: one bound graph instance per character.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::context::{BranchState, GraphContext, InitContext, PoseMemo};
use crate::diagnostics::{Diagnostics, GraphWarning};
use crate::error::GraphError;
use crate::nodes::bone_mask::{self, BoneMaskSelectorStatus};
use crate::nodes::state_machine::{self, StateMachineStatus};
use crate::nodes::{
    self, BoneMaskHandle, BoolHandle, FloatHandle, GraphNode, IdHandle, NodeHandle,
    NodeRuntimeState, PoseHandle, TargetHandle, VectorHandle,
};
use crate::parameters::{ControlParameters, ParameterHandle, ParameterValue};
use crate::pose::GraphPoseNodeResult;
use crate::skeleton::BoneMaskLookup;
use crate::target::Target;
use crate::task_list::BoneMaskTaskList;
use crate::topo::topo_order;
use crate::types::{GraphDefinition, NodeDefinition, NodeIndex};

/// Value produced by a non-pose node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum NodeValue {
    Bool(bool),
    Float(f32),
    Vector([f32; 4]),
    Id(String),
    Target(Target),
    BoneMask(BoneMaskTaskList),
}

/// Owns the bound node arena, runtime state and control parameters built
/// from a shared [`GraphDefinition`].
#[derive(Debug)]
pub struct AnimationGraphController {
    definition: Arc<GraphDefinition>,
    config: Config,
    nodes: Vec<GraphNode>,
    edges: Vec<Vec<usize>>,
    states: Vec<NodeRuntimeState>,
    parameters: ControlParameters,
    diagnostics: Diagnostics,
    pose_memo: Vec<Option<PoseMemo>>,
    /// Bumped for every evaluation context.
    tick: u64,
    root: PoseHandle,
}

impl AnimationGraphController {
    /// Validate and bind `definition`.
    ///
    /// Every structural problem is reported here; a controller is never built
    /// from a definition that fails to wire.
    pub fn new(
        definition: Arc<GraphDefinition>,
        skeleton: &dyn BoneMaskLookup,
        config: Config,
    ) -> Result<Self, GraphError> {
        let len = definition.nodes.len();
        if len == 0 {
            return Err(GraphError::EmptyGraph);
        }
        let root_index = definition.root_node;
        if !matches!(definition.node(root_index), Some(NodeDefinition::Pose(_))) {
            return Err(GraphError::InvalidRoot { index: root_index });
        }

        let parameters = ControlParameters::from_declarations(&definition.control_parameters)?;
        let order = topo_order(&definition.nodes)?;
        let mut diagnostics = Diagnostics::new(config.diagnostics.clone());

        let nodes = {
            let mut init = InitContext::new(&definition, &parameters, skeleton, &mut diagnostics);
            let mut nodes = Vec::with_capacity(len);
            for (index, def) in definition.nodes.iter().enumerate() {
                init.set_node(index as NodeIndex);
                nodes.push(GraphNode::bind(def, &mut init)?);
            }
            nodes
        };

        let edges = definition
            .nodes
            .iter()
            .map(|def| {
                def.children()
                    .into_iter()
                    .filter_map(|child| usize::try_from(child).ok())
                    .filter(|&child| child < len)
                    .collect()
            })
            .collect();
        let states = nodes.iter().map(GraphNode::initial_state).collect();

        let mut controller = AnimationGraphController {
            root: PoseHandle::from_index(root_index as usize),
            definition,
            config,
            nodes,
            edges,
            states,
            parameters,
            diagnostics,
            pose_memo: vec![None; len],
            tick: 0,
        };

        let mut ctx = controller.context(BranchState::Active, 0.0);
        for index in order {
            nodes::start(&mut ctx, index as usize);
        }
        Ok(controller)
    }

    fn context(&mut self, branch: BranchState, delta_time: f32) -> GraphContext<'_> {
        self.tick = self.tick.wrapping_add(1);
        GraphContext::new(
            &self.nodes,
            &self.edges,
            &mut self.states,
            &self.parameters,
            &self.config,
            &mut self.diagnostics,
            &mut self.pose_memo,
            self.tick,
            branch,
            delta_time,
        )
    }

    pub fn definition(&self) -> &Arc<GraphDefinition> {
        &self.definition
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Advance the graph by `delta_time` seconds and return the root's pose.
    pub fn update(&mut self, delta_time: f32) -> GraphPoseNodeResult {
        let root = self.root;
        let mut ctx = self.context(BranchState::Active, delta_time);
        ctx.pose(root)
    }

    pub fn parameters(&self) -> &ControlParameters {
        &self.parameters
    }

    pub fn parameter_handle(&self, name: &str) -> Option<ParameterHandle> {
        self.parameters.handle(name)
    }

    pub fn set_parameter(&mut self, name: &str, value: ParameterValue) -> Result<(), GraphError> {
        self.parameters.set(name, value)
    }

    pub fn set_parameter_by_handle(
        &mut self,
        handle: ParameterHandle,
        value: ParameterValue,
    ) -> Result<(), GraphError> {
        self.parameters.set_by_handle(handle, value)
    }

    pub fn set_bool(&mut self, name: &str, value: bool) -> Result<(), GraphError> {
        self.set_parameter(name, ParameterValue::Bool(value))
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> Result<(), GraphError> {
        self.set_parameter(name, ParameterValue::Float(value))
    }

    pub fn set_vector(&mut self, name: &str, value: [f32; 4]) -> Result<(), GraphError> {
        self.set_parameter(name, ParameterValue::Vector(value))
    }

    pub fn set_id(&mut self, name: &str, value: impl Into<String>) -> Result<(), GraphError> {
        self.set_parameter(name, ParameterValue::Id(value.into()))
    }

    pub fn set_target(&mut self, name: &str, value: Target) -> Result<(), GraphError> {
        self.set_parameter(name, ParameterValue::Target(value))
    }

    /// Evaluate one value node outside of [`update`](Self::update).
    ///
    /// Runs with a zero delta, so eases and timed blends do not advance, but
    /// caches may latch exactly as they would during a tick.
    pub fn evaluate_value(
        &mut self,
        index: NodeIndex,
        branch: BranchState,
    ) -> Result<NodeValue, GraphError> {
        self.evaluate_at(index, branch, 0.0)
    }

    pub(crate) fn evaluate_at(
        &mut self,
        index: NodeIndex,
        branch: BranchState,
        delta_time: f32,
    ) -> Result<NodeValue, GraphError> {
        let slot = usize::try_from(index)
            .ok()
            .filter(|&i| i < self.nodes.len())
            .ok_or(GraphError::NotAValueNode { index })?;
        let mut ctx = self.context(branch, delta_time);
        let value = match ctx.nodes().get(slot) {
            Some(GraphNode::Float(_)) => {
                NodeValue::Float(ctx.float(FloatHandle::from_index(slot)))
            }
            Some(GraphNode::Bool(_)) => NodeValue::Bool(ctx.bool(BoolHandle::from_index(slot))),
            Some(GraphNode::Vector(_)) => {
                NodeValue::Vector(ctx.vector(VectorHandle::from_index(slot)))
            }
            Some(GraphNode::Id(_)) => NodeValue::Id(ctx.id(IdHandle::from_index(slot))),
            Some(GraphNode::Target(_)) => {
                NodeValue::Target(ctx.target(TargetHandle::from_index(slot)))
            }
            Some(GraphNode::BoneMask(_)) => {
                NodeValue::BoneMask(ctx.bone_mask(BoneMaskHandle::from_index(slot)))
            }
            Some(GraphNode::Pose(_)) | None => return Err(GraphError::NotAValueNode { index }),
        };
        Ok(value)
    }

    pub fn state_machine_status(&self, index: NodeIndex) -> Option<StateMachineStatus> {
        state_machine::status(&self.states, usize::try_from(index).ok()?)
    }

    pub fn bone_mask_selector_status(&self, index: NodeIndex) -> Option<BoneMaskSelectorStatus> {
        bone_mask::selector_status(&self.nodes, &self.states, usize::try_from(index).ok()?)
    }

    pub fn warnings(&self) -> &[GraphWarning] {
        self.diagnostics.warnings()
    }

    /// Warnings discarded because the retention cap was reached.
    pub fn dropped_warnings(&self) -> usize {
        self.diagnostics.dropped()
    }

    pub fn take_warnings(&mut self) -> Vec<GraphWarning> {
        self.diagnostics.drain()
    }
}
