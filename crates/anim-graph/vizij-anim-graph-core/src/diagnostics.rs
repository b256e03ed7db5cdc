//! Diagnostics sink for recoverable authoring problems.

use serde::{Deserialize, Serialize};

use crate::types::NodeIndex;

/// Diagnostics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsCfg {
    pub enabled: bool,
    /// Forward warnings to the `log` facade.
    pub log_warnings: bool,
    /// Retained warnings beyond this count are dropped (and counted).
    pub max_retained: usize,
}

impl Default for DiagnosticsCfg {
    fn default() -> Self {
        DiagnosticsCfg {
            enabled: true,
            log_warnings: true,
            max_retained: 256,
        }
    }
}

/// A non-fatal problem reported by a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphWarning {
    pub node: NodeIndex,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    cfg: DiagnosticsCfg,
    warnings: Vec<GraphWarning>,
    dropped: usize,
}

impl Diagnostics {
    pub fn new(cfg: DiagnosticsCfg) -> Self {
        Self {
            cfg,
            warnings: Vec::new(),
            dropped: 0,
        }
    }

    pub fn warn(&mut self, node: NodeIndex, message: impl Into<String>) {
        if !self.cfg.enabled {
            return;
        }
        let message = message.into();
        if self.cfg.log_warnings {
            log::warn!("[anim graph][node {node}] {message}");
        }
        if self.warnings.len() < self.cfg.max_retained {
            self.warnings.push(GraphWarning { node, message });
        } else {
            self.dropped += 1;
        }
    }

    pub fn warnings(&self) -> &[GraphWarning] {
        &self.warnings
    }

    /// Number of warnings discarded since the last drain.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Take every retained warning, resetting the dropped counter.
    pub fn drain(&mut self) -> Vec<GraphWarning> {
        self.dropped = 0;
        std::mem::take(&mut self.warnings)
    }
}
