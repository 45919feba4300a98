//! Type satisfaction
//!
//! A process satisfies a type when every trace it can produce is accepted by
//! the type's automaton. The type is an upper bound: the process need not
//! produce every trace the type allows.
//!
//! Walking a trace:
//! - events on channels outside the type's alphabet are not observable to
//!   the type and are skipped
//! - an event on an alphabet channel must match an available transition;
//!   it is never discarded or reordered
//! - a recursion event is accepted only where the type is at a recursion
//!   variable, so recursion the type gates behind another event (an
//!   acknowledgement) cannot race ahead of it
//! - after the last event the automaton must still be live

use std::collections::BTreeSet;

use tracing::trace;

use crate::checker::automaton::Automaton;
use crate::checker::extract::{Event, Trace, TraceSet};

/// Why a trace was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness {
    /// The offending trace
    pub trace: Trace,
    /// Index of the rejected event; `trace.len()` for a dead end
    pub position: usize,
    /// Rendered automaton frontier at the point of failure
    pub state: Vec<String>,
    /// Channels the type would have accepted
    pub expected: BTreeSet<String>,
    /// Whether a recursion event would have been accepted
    pub recursion_allowed: bool,
    /// The rejected event; `None` when the trace ended in a dead state
    pub observed: Option<Event>,
}

/// Outcome of walking every trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Satisfaction {
    Holds,
    Violated(Witness),
}

/// Check every trace against the automaton; the first failing trace in
/// extraction order is the witness.
pub fn satisfies(traces: &TraceSet, automaton: &Automaton) -> Satisfaction {
    for trace in traces.iter() {
        if let Err(witness) = check_trace(trace, automaton) {
            return Satisfaction::Violated(witness);
        }
    }
    Satisfaction::Holds
}

/// Walk one trace through the automaton
pub fn check_trace(trace: &[Event], automaton: &Automaton) -> Result<(), Witness> {
    let mut states = automaton.initial();

    for (position, event) in trace.iter().enumerate() {
        let next = match event.channel() {
            Some(channel) if !automaton.alphabet().contains(channel.name()) => {
                trace!(event = %event, "not observable to the type");
                continue;
            }
            Some(channel) => automaton.step(&states, channel.name()),
            None => automaton.recurse(&states),
        };

        if next.is_empty() {
            return Err(Witness {
                trace: trace.to_vec(),
                position,
                state: automaton.describe(&states),
                expected: automaton.expected(&states),
                recursion_allowed: automaton.accepts_recursion(&states),
                observed: Some(event.clone()),
            });
        }
        states = next;
    }

    if !automaton.is_live(&states) {
        return Err(Witness {
            trace: trace.to_vec(),
            position: trace.len(),
            state: automaton.describe(&states),
            expected: BTreeSet::new(),
            recursion_allowed: false,
            observed: None,
        });
    }

    Ok(())
}
