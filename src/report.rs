//! Diagnostic reporting
//!
//! Turns a failed satisfaction check into a counterexample: the offending
//! trace, where it was rejected, the automaton state reached, and what the
//! type would have accepted there versus what was observed.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use crate::checker::satisfy::Witness;

/// Label used for the recursion transition in expected sets
pub const RECURSION: &str = "<recursion>";

/// A rendered type-mismatch counterexample
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub contract: String,
    pub behavior: String,
    /// Rendered events of the offending trace
    pub trace: Vec<String>,
    /// Index of the rejected event (equal to the trace length for dead ends)
    pub position: usize,
    /// Type terms still to be satisfied at the point of failure
    pub state: Vec<String>,
    /// What the type would have accepted; includes `<recursion>` when a
    /// recursion event was allowed
    pub expected: BTreeSet<String>,
    /// What was observed; `end of trace` for dead ends
    pub observed: String,
}

impl Diagnostic {
    pub fn from_witness(contract: &str, behavior: &str, witness: &Witness) -> Self {
        let mut expected = witness.expected.clone();
        if witness.recursion_allowed {
            expected.insert(RECURSION.to_string());
        }
        Diagnostic {
            contract: contract.to_string(),
            behavior: behavior.to_string(),
            trace: witness.trace.iter().map(|e| e.to_string()).collect(),
            position: witness.position,
            state: witness.state.clone(),
            expected,
            observed: witness
                .observed
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "end of trace".to_string()),
        }
    }

    /// Whether the trace ran the automaton into a state with no transitions
    pub fn is_dead_end(&self) -> bool {
        self.position == self.trace.len()
    }

    /// One-line summary for reports
    pub fn summary(&self) -> String {
        if self.is_dead_end() {
            format!("trace ends in a dead state ({})", self.state.join(" | "))
        } else {
            format!(
                "expected one of {{{}}}, observed `{}` at event {}",
                self.expected.iter().cloned().collect::<Vec<_>>().join(", "),
                self.observed,
                self.position + 1
            )
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        writeln!(
            f,
            "contract `{}` does not satisfy `{}`: {}",
            self.contract,
            self.behavior,
            self.summary()
        )?;
        writeln!(f, "  trace:")?;
        for (i, event) in self.trace.iter().enumerate() {
            let marker = if i == self.position { ">>>" } else { "   " };
            writeln!(f, "  {} {:>3}. {}", marker, i + 1, event)?;
        }
        if self.is_dead_end() {
            writeln!(f, "  >>>      (end of trace)")?;
        }
        writeln!(f, "  state:    {}", self.state.join(" | "))?;
        let expected: Vec<_> = self.expected.iter().cloned().collect();
        writeln!(f, "  expected: {}", if expected.is_empty() { "nothing".to_string() } else { expected.join(", ") })?;
        write!(f, "  observed: {}", self.observed)
    }
}
