//! Mutable runtime state that persists across ticks.
//!
//! Bound nodes are immutable; everything a node remembers between ticks lives
//! in one [`NodeRuntimeState`] slot per node, owned by the controller.

use crate::context::BranchState;
use crate::nodes::{StateHandle, TransitionHandle};
use crate::pose::PlaybackState;
use crate::target::Target;
use crate::task_list::BoneMaskTaskList;
use crate::types::CachedValueMode;

/// Latched value of a cached node.
#[derive(Clone, Debug, Default)]
pub struct CachedState<T> {
    pub mode: CachedValueMode,
    pub value: T,
    pub has_value: bool,
}

impl<T: Clone + Default> CachedState<T> {
    pub fn new(mode: CachedValueMode) -> Self {
        CachedState {
            mode,
            value: T::default(),
            has_value: false,
        }
    }

    /// Whether the input must be read this evaluation.
    pub fn needs_input(&self, branch: BranchState) -> bool {
        match self.mode {
            CachedValueMode::OnEntry => !self.has_value,
            CachedValueMode::OnExit => branch == BranchState::Active || !self.has_value,
        }
    }

    pub fn store(&mut self, value: T) -> T {
        self.value = value.clone();
        self.has_value = true;
        value
    }

    /// Forget an entry-latched value so the next read latches again.
    pub fn reset(&mut self) {
        if self.mode == CachedValueMode::OnEntry {
            self.has_value = false;
        }
    }
}

/// Easing progress shared by the ease and selector float nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EaseState {
    pub start: f32,
    pub end: f32,
    pub current: f32,
    pub elapsed: f32,
}

impl EaseState {
    pub fn settled(value: f32) -> Self {
        EaseState {
            start: value,
            end: value,
            current: value,
            elapsed: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoneMaskSelectorState {
    /// Selected option; `None` means the default mask.
    pub selected: Option<usize>,
    /// Option being blended towards while `blending`.
    pub target: Option<usize>,
    pub elapsed: f32,
    pub blending: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransitionFlag {
    #[default]
    None,
    In,
    Out,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StateNodeState {
    pub playback: PlaybackState,
    /// Seconds since the state was entered.
    pub elapsed: f32,
    pub transition: TransitionFlag,
}

impl StateNodeState {
    pub fn is_transitioning(&self) -> bool {
        self.transition != TransitionFlag::None
    }
}

/// What a transition blends away from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionSource {
    State(StateHandle),
    Transition(TransitionHandle),
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TransitionNodeState {
    pub active: bool,
    pub source: Option<TransitionSource>,
    pub elapsed: f32,
    /// Resolved blend length in seconds.
    pub duration: f32,
    pub progress: f32,
    pub playback: PlaybackState,
}

impl TransitionNodeState {
    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StateMachineState {
    pub active_state: usize,
    pub active_transition: Option<TransitionHandle>,
    pub playback: PlaybackState,
}

/// State stored for each node that requires persistence across ticks.
#[derive(Clone, Debug, Default)]
pub enum NodeRuntimeState {
    #[default]
    Stateless,
    CachedFloat(CachedState<f32>),
    CachedBool(CachedState<bool>),
    CachedVector(CachedState<[f32; 4]>),
    CachedId(CachedState<String>),
    CachedTarget(CachedState<Target>),
    CachedBoneMask(CachedState<BoneMaskTaskList>),
    Ease(EaseState),
    BoneMaskSelector(BoneMaskSelectorState),
    Clip(PlaybackState),
    State(StateNodeState),
    Transition(TransitionNodeState),
    StateMachine(StateMachineState),
}

// Returns the slot's inner state, reinitialising it when the slot holds another variant.
macro_rules! state_accessor {
    ($(#[$meta:meta])* $name:ident, $variant:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $name(&mut self) -> &mut $ty {
            if !matches!(self, NodeRuntimeState::$variant(_)) {
                *self = NodeRuntimeState::$variant(<$ty>::default());
            }
            match self {
                NodeRuntimeState::$variant(inner) => inner,
                _ => unreachable!(),
            }
        }
    };
}

impl NodeRuntimeState {
    state_accessor!(cached_float, CachedFloat, CachedState<f32>);
    state_accessor!(cached_bool, CachedBool, CachedState<bool>);
    state_accessor!(cached_vector, CachedVector, CachedState<[f32; 4]>);
    state_accessor!(cached_id, CachedId, CachedState<String>);
    state_accessor!(cached_target, CachedTarget, CachedState<Target>);
    state_accessor!(cached_bone_mask, CachedBoneMask, CachedState<BoneMaskTaskList>);
    state_accessor!(ease, Ease, EaseState);
    state_accessor!(bone_mask_selector, BoneMaskSelector, BoneMaskSelectorState);
    state_accessor!(
        /// Clip playback, normalized time.
        clip,
        Clip,
        PlaybackState
    );
    state_accessor!(state_node, State, StateNodeState);
    state_accessor!(transition, Transition, TransitionNodeState);
    state_accessor!(state_machine, StateMachine, StateMachineState);

    /// Playback fields for pose-node states.
    pub fn playback(&self) -> Option<PlaybackState> {
        match self {
            NodeRuntimeState::Clip(playback) => Some(*playback),
            NodeRuntimeState::State(state) => Some(state.playback),
            NodeRuntimeState::Transition(transition) => Some(transition.playback),
            NodeRuntimeState::StateMachine(machine) => Some(machine.playback),
            _ => None,
        }
    }

    pub fn as_state_node(&self) -> Option<&StateNodeState> {
        match self {
            NodeRuntimeState::State(state) => Some(state),
            _ => None,
        }
    }

    pub fn as_transition(&self) -> Option<&TransitionNodeState> {
        match self {
            NodeRuntimeState::Transition(transition) => Some(transition),
            _ => None,
        }
    }

    pub fn as_state_machine(&self) -> Option<&StateMachineState> {
        match self {
            NodeRuntimeState::StateMachine(machine) => Some(machine),
            _ => None,
        }
    }

    pub fn as_bone_mask_selector(&self) -> Option<&BoneMaskSelectorState> {
        match self {
            NodeRuntimeState::BoneMaskSelector(selector) => Some(selector),
            _ => None,
        }
    }

    /// Return entry-latched caches to their unlatched state.
    pub fn reset_cache(&mut self) {
        match self {
            NodeRuntimeState::CachedFloat(c) => c.reset(),
            NodeRuntimeState::CachedBool(c) => c.reset(),
            NodeRuntimeState::CachedVector(c) => c.reset(),
            NodeRuntimeState::CachedId(c) => c.reset(),
            NodeRuntimeState::CachedTarget(c) => c.reset(),
            NodeRuntimeState::CachedBoneMask(c) => c.reset(),
            _ => {}
        }
    }
}
