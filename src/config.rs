//! Checker configuration
//!
//! Bounds that guarantee termination of trace extraction. A document may
//! embed a `config` object; CLI flags override it.

use serde::{Deserialize, Serialize};

/// Default bound on nested contract unfoldings
pub const DEFAULT_MAX_UNFOLD_DEPTH: usize = 64;

/// Default bound on the size of any intermediate trace set
pub const DEFAULT_MAX_TRACES: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Maximum number of non-memoized unfoldings on one extraction path
    pub max_unfold_depth: usize,
    /// Maximum number of traces any sub-process may produce
    pub max_traces: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        CheckerConfig {
            max_unfold_depth: DEFAULT_MAX_UNFOLD_DEPTH,
            max_traces: DEFAULT_MAX_TRACES,
        }
    }
}

impl CheckerConfig {
    /// Apply optional overrides (from the command line)
    pub fn with_overrides(mut self, max_unfold_depth: Option<usize>, max_traces: Option<usize>) -> Self {
        if let Some(depth) = max_unfold_depth {
            self.max_unfold_depth = depth;
        }
        if let Some(traces) = max_traces {
            self.max_traces = traces;
        }
        self
    }
}
