//! Error type shared by graph construction and the host-facing controller API.
//!
//! Every variant here is a structural problem with a definition or a misuse of
//! the controller API. Authoring problems that can be recovered from during a
//! tick are reported through [`Diagnostics`](crate::diagnostics::Diagnostics)
//! instead.

use thiserror::Error;

use crate::parameters::ParameterKind;
use crate::types::NodeIndex;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("graph json parse error: {0}")]
    Parse(String),

    #[error("graph definition has no nodes")]
    EmptyGraph,

    #[error("node {node}: child index {index} is out of range (graph has {len} nodes)")]
    IndexOutOfRange {
        node: NodeIndex,
        index: NodeIndex,
        len: usize,
    },

    #[error("node {node}: child {index} is a {found} node, expected {expected}")]
    KindMismatch {
        node: NodeIndex,
        index: NodeIndex,
        expected: &'static str,
        found: &'static str,
    },

    #[error("root node {index} is not a pose node")]
    InvalidRoot { index: NodeIndex },

    #[error("cycle detected in graph definition")]
    Cycle,

    #[error("node {node}: {what} count mismatch ({left} vs {right})")]
    CountMismatch {
        node: NodeIndex,
        what: &'static str,
        left: usize,
        right: usize,
    },

    #[error("node {node}: state machine has no states")]
    EmptyStateMachine { node: NodeIndex },

    #[error("node {node}: default state {index} does not resolve ({count} states)")]
    InvalidDefaultState {
        node: NodeIndex,
        index: NodeIndex,
        count: usize,
    },

    #[error("node {node}: transition targets state {index} but only {count} states exist")]
    InvalidTransitionTarget {
        node: NodeIndex,
        index: NodeIndex,
        count: usize,
    },

    #[error("node {node}: bone mask index {index} does not fit a task")]
    BoneMaskIndexOutOfRange { node: NodeIndex, index: usize },

    #[error("duplicate control parameter '{0}'")]
    DuplicateParameter(String),

    #[error("unknown control parameter '{0}'")]
    UnknownParameter(String),

    #[error("node {node}: unknown control parameter '{name}'")]
    UnboundParameter { node: NodeIndex, name: String },

    #[error("control parameter '{name}' is {found:?}, expected {expected:?}")]
    ParameterKindMismatch {
        name: String,
        expected: ParameterKind,
        found: ParameterKind,
    },

    #[error("node {index} is not a value node")]
    NotAValueNode { index: NodeIndex },
}
