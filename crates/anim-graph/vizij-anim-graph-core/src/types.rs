//! Immutable graph definitions as produced by an asset pipeline.
//!
//! A [`GraphDefinition`] is a flat, ordered list of node descriptors. Edges are
//! stored as [`NodeIndex`] values into that list, with `-1` meaning "absent".
//! Definitions never change after loading and may be shared (`Arc`) by any
//! number of controllers.

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::parameters::ParameterDeclaration;
use crate::target::Target;

/// Index of a node inside [`GraphDefinition::nodes`]. Negative means absent.
pub type NodeIndex = i16;

/// Sentinel for an absent optional child.
pub const INVALID_INDEX: NodeIndex = -1;

fn absent() -> NodeIndex {
    INVALID_INDEX
}

fn default_true() -> bool {
    true
}

fn default_speed() -> f32 {
    1.0
}

fn identity_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDefinition {
    #[serde(default)]
    pub name: String,
    pub root_node: NodeIndex,
    #[serde(default)]
    pub control_parameters: Vec<ParameterDeclaration>,
    pub nodes: Vec<NodeDefinition>,
}

impl GraphDefinition {
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        serde_json::from_str(json).map_err(|e| GraphError::Parse(e.to_string()))
    }

    pub fn node(&self, index: NodeIndex) -> Option<&NodeDefinition> {
        usize::try_from(index).ok().and_then(|i| self.nodes.get(i))
    }
}

/// Coarse kind of value a node produces.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Float,
    Bool,
    Vector,
    Id,
    Target,
    BoneMask,
    Pose,
}

impl NodeKind {
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Float => "float",
            NodeKind::Bool => "bool",
            NodeKind::Vector => "vector",
            NodeKind::Id => "id",
            NodeKind::Target => "target",
            NodeKind::BoneMask => "bone mask",
            NodeKind::Pose => "pose",
        }
    }
}

/// One node descriptor, tagged by value family.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeDefinition {
    Float(FloatNodeDefinition),
    Bool(BoolNodeDefinition),
    Vector(VectorNodeDefinition),
    Id(IdNodeDefinition),
    Target(TargetNodeDefinition),
    BoneMask(BoneMaskNodeDefinition),
    Pose(PoseNodeDefinition),
}

impl NodeDefinition {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeDefinition::Float(_) => NodeKind::Float,
            NodeDefinition::Bool(_) => NodeKind::Bool,
            NodeDefinition::Vector(_) => NodeKind::Vector,
            NodeDefinition::Id(_) => NodeKind::Id,
            NodeDefinition::Target(_) => NodeKind::Target,
            NodeDefinition::BoneMask(_) => NodeKind::BoneMask,
            NodeDefinition::Pose(_) => NodeKind::Pose,
        }
    }

    /// Every child index referenced by this node, absent entries included.
    pub fn children(&self) -> Vec<NodeIndex> {
        match self {
            NodeDefinition::Float(def) => def.children(),
            NodeDefinition::Bool(def) => def.children(),
            NodeDefinition::Vector(VectorNodeDefinition::Cached { input, .. })
            | NodeDefinition::Id(IdNodeDefinition::Cached { input, .. })
            | NodeDefinition::Target(TargetNodeDefinition::Cached { input, .. })
            | NodeDefinition::Target(TargetNodeDefinition::Offset { input, .. }) => vec![*input],
            NodeDefinition::Vector(_) | NodeDefinition::Id(_) | NodeDefinition::Target(_) => {
                Vec::new()
            }
            NodeDefinition::BoneMask(def) => def.children(),
            NodeDefinition::Pose(def) => def.children(),
        }
    }
}

/// When a cached node refreshes its value.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachedValueMode {
    /// Latch the first value read and hold it.
    OnEntry,
    /// Pass through while active; freeze on the first inactive evaluation.
    #[default]
    OnExit,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloatMathOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Abs,
    Negate,
    Floor,
    Ceiling,
    IntegerPart,
    FractionalPart,
    InverseFractionalPart,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleOperation {
    ClampTo180,
    ClampTo360,
    FlipHemisphere,
    FlipHemisphereNegate,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    #[default]
    None,
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorComponent {
    X,
    Y,
    Z,
    W,
    Length,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    NearEqual,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdComparison {
    Matches,
    DoesntMatch,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeConditionType {
    PercentageThroughState,
    ElapsedTime,
    LoopCount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FloatNodeDefinition {
    Constant {
        value: f32,
    },
    Cached {
        input: NodeIndex,
        #[serde(default)]
        mode: CachedValueMode,
    },
    ControlParameter {
        parameter: String,
    },
    Math {
        input_a: NodeIndex,
        #[serde(default = "absent")]
        input_b: NodeIndex,
        #[serde(default)]
        value_b: f32,
        operator: FloatMathOperator,
        #[serde(default)]
        return_absolute: bool,
        #[serde(default)]
        return_negated: bool,
    },
    Clamp {
        input: NodeIndex,
        min: f32,
        max: f32,
    },
    Remap {
        input: NodeIndex,
        input_range: [f32; 2],
        output_range: [f32; 2],
    },
    AngleMath {
        input: NodeIndex,
        operation: AngleOperation,
    },
    Switch {
        switch: NodeIndex,
        if_true: NodeIndex,
        if_false: NodeIndex,
    },
    Ease {
        input: NodeIndex,
        ease_time: f32,
        easing: Easing,
        #[serde(default)]
        start_value: Option<f32>,
    },
    Selector {
        conditions: Vec<NodeIndex>,
        values: Vec<f32>,
        #[serde(default)]
        default_value: f32,
        #[serde(default)]
        easing: Easing,
        #[serde(default)]
        ease_time: f32,
    },
    IdToFloat {
        input: NodeIndex,
        ids: Vec<String>,
        values: Vec<f32>,
        #[serde(default)]
        default_value: f32,
    },
    VectorInfo {
        input: NodeIndex,
        component: VectorComponent,
    },
}

impl FloatNodeDefinition {
    fn children(&self) -> Vec<NodeIndex> {
        match self {
            FloatNodeDefinition::Constant { .. } | FloatNodeDefinition::ControlParameter { .. } => {
                Vec::new()
            }
            FloatNodeDefinition::Cached { input, .. }
            | FloatNodeDefinition::Clamp { input, .. }
            | FloatNodeDefinition::Remap { input, .. }
            | FloatNodeDefinition::AngleMath { input, .. }
            | FloatNodeDefinition::Ease { input, .. }
            | FloatNodeDefinition::IdToFloat { input, .. }
            | FloatNodeDefinition::VectorInfo { input, .. } => vec![*input],
            FloatNodeDefinition::Math {
                input_a, input_b, ..
            } => vec![*input_a, *input_b],
            FloatNodeDefinition::Switch {
                switch,
                if_true,
                if_false,
            } => vec![*switch, *if_true, *if_false],
            FloatNodeDefinition::Selector { conditions, .. } => conditions.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoolNodeDefinition {
    Constant {
        value: bool,
    },
    Cached {
        input: NodeIndex,
        #[serde(default)]
        mode: CachedValueMode,
    },
    ControlParameter {
        parameter: String,
    },
    Not {
        input: NodeIndex,
    },
    And {
        conditions: Vec<NodeIndex>,
    },
    Or {
        conditions: Vec<NodeIndex>,
    },
    FloatComparison {
        input: NodeIndex,
        #[serde(default = "absent")]
        comparand: NodeIndex,
        #[serde(default)]
        comparison_value: f32,
        comparison: Comparison,
        #[serde(default)]
        epsilon: f32,
    },
    FloatRangeComparison {
        input: NodeIndex,
        range: [f32; 2],
        #[serde(default = "default_true")]
        inclusive: bool,
    },
    IdComparison {
        input: NodeIndex,
        ids: Vec<String>,
        comparison: IdComparison,
    },
    StateCompleted {
        source_state: NodeIndex,
        #[serde(default)]
        transition_duration: f32,
    },
    TimeCondition {
        source_state: NodeIndex,
        #[serde(default = "absent")]
        input: NodeIndex,
        #[serde(default)]
        comparand: f32,
        condition: TimeConditionType,
        operator: Comparison,
    },
    IsTargetSet {
        input: NodeIndex,
    },
}

impl BoolNodeDefinition {
    fn children(&self) -> Vec<NodeIndex> {
        match self {
            BoolNodeDefinition::Constant { .. } | BoolNodeDefinition::ControlParameter { .. } => {
                Vec::new()
            }
            BoolNodeDefinition::Cached { input, .. }
            | BoolNodeDefinition::Not { input }
            | BoolNodeDefinition::FloatRangeComparison { input, .. }
            | BoolNodeDefinition::IdComparison { input, .. }
            | BoolNodeDefinition::IsTargetSet { input } => vec![*input],
            BoolNodeDefinition::And { conditions } | BoolNodeDefinition::Or { conditions } => {
                conditions.clone()
            }
            BoolNodeDefinition::FloatComparison {
                input, comparand, ..
            } => vec![*input, *comparand],
            BoolNodeDefinition::StateCompleted { source_state, .. } => vec![*source_state],
            BoolNodeDefinition::TimeCondition {
                source_state,
                input,
                ..
            } => vec![*source_state, *input],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VectorNodeDefinition {
    Constant {
        value: [f32; 4],
    },
    Cached {
        input: NodeIndex,
        #[serde(default)]
        mode: CachedValueMode,
    },
    ControlParameter {
        parameter: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IdNodeDefinition {
    Constant {
        value: String,
    },
    Cached {
        input: NodeIndex,
        #[serde(default)]
        mode: CachedValueMode,
    },
    ControlParameter {
        parameter: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetNodeDefinition {
    Constant {
        value: Target,
    },
    Cached {
        input: NodeIndex,
        #[serde(default)]
        mode: CachedValueMode,
    },
    ControlParameter {
        parameter: String,
    },
    Offset {
        input: NodeIndex,
        #[serde(default = "identity_rotation")]
        rotation_offset: [f32; 4],
        #[serde(default)]
        translation_offset: [f32; 3],
        #[serde(default)]
        bone_space: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoneMaskNodeDefinition {
    Mask {
        bone_mask_id: String,
    },
    FixedWeight {
        weight: f32,
    },
    Cached {
        input: NodeIndex,
        #[serde(default)]
        mode: CachedValueMode,
    },
    Blend {
        source: NodeIndex,
        target: NodeIndex,
        blend_weight: NodeIndex,
    },
    Selector {
        parameter: NodeIndex,
        #[serde(default = "absent")]
        default_mask: NodeIndex,
        masks: Vec<NodeIndex>,
        parameter_values: Vec<String>,
        #[serde(default = "default_true")]
        switch_dynamically: bool,
        #[serde(default)]
        blend_time_seconds: f32,
    },
    Switch {
        switch: NodeIndex,
        if_true: NodeIndex,
        if_false: NodeIndex,
    },
}

impl BoneMaskNodeDefinition {
    fn children(&self) -> Vec<NodeIndex> {
        match self {
            BoneMaskNodeDefinition::Mask { .. } | BoneMaskNodeDefinition::FixedWeight { .. } => {
                Vec::new()
            }
            BoneMaskNodeDefinition::Cached { input, .. } => vec![*input],
            BoneMaskNodeDefinition::Blend {
                source,
                target,
                blend_weight,
            } => vec![*source, *target, *blend_weight],
            BoneMaskNodeDefinition::Selector {
                parameter,
                default_mask,
                masks,
                ..
            } => {
                let mut children = vec![*parameter, *default_mask];
                children.extend_from_slice(masks);
                children
            }
            BoneMaskNodeDefinition::Switch {
                switch,
                if_true,
                if_false,
            } => vec![*switch, *if_true, *if_false],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionDefinition {
    pub condition: NodeIndex,
    pub transition: NodeIndex,
    pub target_state: NodeIndex,
    #[serde(default)]
    pub can_be_forced: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDefinition {
    pub state: NodeIndex,
    #[serde(default = "absent")]
    pub entry_condition: NodeIndex,
    #[serde(default)]
    pub transitions: Vec<TransitionDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PoseNodeDefinition {
    ReferencePose,
    ZeroPose,
    Clip {
        data_slot: u16,
        /// Clip length in seconds.
        duration: f32,
        #[serde(default = "default_speed")]
        speed_multiplier: f32,
        #[serde(default = "default_true")]
        looping: bool,
        #[serde(default = "absent")]
        reset_time: NodeIndex,
        #[serde(default = "absent")]
        play_in_reverse: NodeIndex,
    },
    State {
        #[serde(default = "absent")]
        child: NodeIndex,
    },
    Transition {
        target_state: NodeIndex,
        /// Blend length in seconds.
        duration: f32,
        #[serde(default = "absent")]
        duration_override: NodeIndex,
        #[serde(default = "absent")]
        bone_mask: NodeIndex,
    },
    StateMachine {
        states: Vec<StateDefinition>,
        default_state: NodeIndex,
    },
}

impl PoseNodeDefinition {
    fn children(&self) -> Vec<NodeIndex> {
        match self {
            PoseNodeDefinition::ReferencePose | PoseNodeDefinition::ZeroPose => Vec::new(),
            PoseNodeDefinition::Clip {
                reset_time,
                play_in_reverse,
                ..
            } => vec![*reset_time, *play_in_reverse],
            PoseNodeDefinition::State { child } => vec![*child],
            PoseNodeDefinition::Transition {
                target_state,
                duration_override,
                bone_mask,
                ..
            } => vec![*target_state, *duration_override, *bone_mask],
            PoseNodeDefinition::StateMachine { states, .. } => {
                let mut children = Vec::new();
                for state in states {
                    children.push(state.state);
                    children.push(state.entry_condition);
                    for transition in &state.transitions {
                        children.push(transition.condition);
                        children.push(transition.transition);
                    }
                }
                children
            }
        }
    }
}
