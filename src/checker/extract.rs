//! Trace extraction
//!
//! Derives every communication trace a contract can exhibit:
//! - sends and receives are single events; a receive prefixes its continuation
//! - parallel composition is the shuffle product of the children's traces
//! - a select is the union of its branches (exactly one fires); a branch
//!   emits its join pattern's receives in declared order
//! - a call unfolds into the callee with actual channels substituted for the
//!   formals, memoized on (contract, argument identities): a call whose state
//!   is already being unfolded yields a single `Recurse` event and stops, and
//!   a finished unfolding that closes no loop through its callers is reused
//! - a select with no branches is stuck and contributes only the empty trace
//!
//! Fresh channels (`New`) get identities from their binding site, not from an
//! allocator, so repeated unfoldings reach the same states. Their events are
//! hidden unless the name is sent as a payload inside its scope.

use std::fmt::{self, Display, Formatter};

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::{debug, trace};

use crate::checker::Module;
use crate::config::CheckerConfig;
use crate::error::{CheckError, DefinitionError, DivergentExtraction};
use crate::process::{Action, Contract};

/// Identity of a channel as seen by the checker
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelId {
    /// A formal parameter of the contract under check
    Public { name: String },
    /// Bound by a `New` scope, identified by its binding site
    Fresh {
        name: String,
        contract: String,
        site: usize,
    },
    /// Bound by a receive pattern
    Bound {
        name: String,
        contract: String,
        site: usize,
    },
}

impl ChannelId {
    /// Observable (source) name
    pub fn name(&self) -> &str {
        match self {
            ChannelId::Public { name } | ChannelId::Fresh { name, .. } | ChannelId::Bound { name, .. } => {
                name.as_str()
            }
        }
    }
}

impl Display for ChannelId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An observable event
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Receive { channel: ChannelId },
    Send { channel: ChannelId },
    /// Loop closure: a call to a contract state already being unfolded
    Recurse { contract: String, args: Vec<ChannelId> },
}

impl Event {
    /// Channel the event communicates on; `None` for recursion
    pub fn channel(&self) -> Option<&ChannelId> {
        match self {
            Event::Receive { channel } | Event::Send { channel } => Some(channel),
            Event::Recurse { .. } => None,
        }
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Event::Receive { channel } => write!(f, "{}?", channel),
            Event::Send { channel } => write!(f, "{}!", channel),
            Event::Recurse { contract, args } => {
                let args: Vec<_> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "recurse {}({})", contract, args.join(", "))
            }
        }
    }
}

pub type Trace = Vec<Event>;

/// Render a trace as `a? -> b! -> recurse C(a, b)`
pub fn render_trace(trace: &[Event]) -> String {
    if trace.is_empty() {
        return "(empty)".to_string();
    }
    trace
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Insertion-ordered, de-duplicated set of traces
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceSet {
    traces: IndexSet<Trace>,
}

impl TraceSet {
    /// The set holding only the empty trace
    pub fn unit() -> Self {
        let mut traces = IndexSet::new();
        traces.insert(Vec::new());
        TraceSet { traces }
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn contains(&self, trace: &[Event]) -> bool {
        self.traces.contains(trace)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trace> {
        self.traces.iter()
    }
}

/// Scope entry: source name to identity
type Scope = Vec<(String, ChannelId)>;

/// Per-unfolding state: binding sites are numbered in traversal order
struct Frame {
    contract: String,
    next_site: usize,
}

impl Frame {
    fn site(&mut self) -> usize {
        let site = self.next_site;
        self.next_site += 1;
        site
    }
}

/// Extracts trace sets from contracts of one module
pub struct TraceExtractor<'m> {
    module: &'m Module,
    config: CheckerConfig,
    /// Unfolding stack: (contract, argument identities)
    stack: Vec<(String, Vec<ChannelId>)>,
    /// Finished unfoldings whose traces close no loop below their own frame
    done: IndexMap<(String, Vec<ChannelId>), IndexSet<Trace>>,
    /// Lowest stack index hit by a memoized call in the current unfolding
    low: usize,
}

impl<'m> TraceExtractor<'m> {
    pub fn new(module: &'m Module, config: CheckerConfig) -> Self {
        TraceExtractor {
            module,
            config,
            stack: Vec::new(),
            done: IndexMap::new(),
            low: usize::MAX,
        }
    }

    /// Extract the traces of `name`, with its formals as public channels
    pub fn extract_contract(&mut self, name: &str) -> Result<TraceSet, CheckError> {
        let contract = self
            .module
            .contract(name)
            .ok_or_else(|| DefinitionError::NoSuchContract(name.to_string()))?;
        let args = contract
            .params
            .iter()
            .map(|p| ChannelId::Public { name: p.clone() })
            .collect();
        let traces = self.unfold(contract, args)?;
        self.check_budget(traces.len())?;
        debug!(contract = name, traces = traces.len(), "extracted trace set");
        Ok(TraceSet { traces })
    }

    fn unfold(&mut self, contract: &'m Contract, args: Vec<ChannelId>) -> Result<IndexSet<Trace>, CheckError> {
        let key = (contract.name.clone(), args);
        if let Some(traces) = self.done.get(&key) {
            trace!(contract = %contract.name, "reusing finished unfolding");
            return Ok(traces.clone());
        }
        let args = key.1.clone();
        if self.stack.len() >= self.config.max_unfold_depth {
            return Err(DivergentExtraction::DepthExceeded {
                contract: contract.name.clone(),
                limit: self.config.max_unfold_depth,
            }
            .into());
        }
        debug!(contract = %contract.name, depth = self.stack.len(), "unfolding");

        let mut scope: Scope = contract.params.iter().cloned().zip(args.iter().cloned()).collect();
        let mut frame = Frame {
            contract: contract.name.clone(),
            next_site: 0,
        };
        let index = self.stack.len();
        let outer_low = std::mem::replace(&mut self.low, usize::MAX);
        self.stack.push((contract.name.clone(), args));
        let result = self.extract(&contract.body, &mut scope, &mut frame);
        self.stack.pop();

        // Traces that loop back only to this frame or deeper do not depend
        // on the callers, so they can be reused from any other call site
        let independent = self.low >= index;
        self.low = self.low.min(outer_low);
        let traces = result?;
        if independent {
            self.done.insert(key, traces.clone());
        }
        Ok(traces)
    }

    fn extract(
        &mut self,
        action: &'m Action,
        scope: &mut Scope,
        frame: &mut Frame,
    ) -> Result<IndexSet<Trace>, CheckError> {
        match action {
            Action::Nil => Ok(unit()),
            Action::Send { channel, .. } => {
                let channel = resolve(scope, frame, channel)?;
                let mut set = IndexSet::new();
                set.insert(vec![Event::Send { channel }]);
                Ok(set)
            }
            Action::Receive { channel, bind, then } => {
                let channel = resolve(scope, frame, channel)?;
                let mark = scope.len();
                for name in bind {
                    let site = frame.site();
                    scope.push((name.clone(), bound(name, frame, site)));
                }
                let rest = self.extract(then, scope, frame);
                scope.truncate(mark);
                Ok(prefix(&[Event::Receive { channel }], rest?))
            }
            Action::Parallel(children) => {
                let mut acc = unit();
                for child in children {
                    let traces = self.extract(child, scope, frame)?;
                    acc = shuffle(&acc, &traces, self.config.max_traces)?;
                }
                Ok(acc)
            }
            // A select with no branches is stuck: it contributes only the empty trace
            Action::Select(branches) if branches.is_empty() => Ok(unit()),
            Action::Select(branches) => {
                let mut union = IndexSet::new();
                for branch in branches {
                    let mut events = Vec::with_capacity(branch.join.len());
                    for bind in &branch.join {
                        let channel = resolve(scope, frame, &bind.channel)?;
                        events.push(Event::Receive { channel });
                    }
                    let mark = scope.len();
                    for bind in &branch.join {
                        for name in &bind.bind {
                            let site = frame.site();
                            scope.push((name.clone(), bound(name, frame, site)));
                        }
                    }
                    let rest = self.extract(&branch.then, scope, frame);
                    scope.truncate(mark);
                    union.extend(prefix(&events, rest?));
                    self.check_budget(union.len())?;
                }
                Ok(union)
            }
            Action::New { channels, body } => {
                let mark = scope.len();
                let mut hidden = Vec::new();
                for name in channels {
                    let id = ChannelId::Fresh {
                        name: name.clone(),
                        contract: frame.contract.clone(),
                        site: frame.site(),
                    };
                    if !body.sends_name(name) {
                        hidden.push(id.clone());
                    }
                    scope.push((name.clone(), id));
                }
                let traces = self.extract(body, scope, frame);
                scope.truncate(mark);
                let traces = traces?;
                if hidden.is_empty() {
                    return Ok(traces);
                }
                trace!(hidden = hidden.len(), "hiding fresh channels");
                Ok(traces
                    .into_iter()
                    .map(|t| {
                        t.into_iter()
                            .filter(|e| e.channel().map_or(true, |c| !hidden.contains(c)))
                            .collect()
                    })
                    .collect())
            }
            Action::Recurse { contract, args } => {
                let ids = args
                    .iter()
                    .map(|a| resolve(scope, frame, a))
                    .collect::<Result<Vec<_>, _>>()?;
                if let Some(position) = self.stack.iter().position(|(c, a)| c == contract && *a == ids) {
                    trace!(contract = %contract, "memoized state reached");
                    self.low = self.low.min(position);
                    let mut set = IndexSet::new();
                    set.insert(vec![Event::Recurse {
                        contract: contract.clone(),
                        args: ids,
                    }]);
                    return Ok(set);
                }
                let callee = self.module.contract(contract).ok_or_else(|| DefinitionError::UnknownContract {
                    contract: frame.contract.clone(),
                    callee: contract.clone(),
                })?;
                self.unfold(callee, ids)
            }
        }
    }

    fn check_budget(&self, size: usize) -> Result<(), CheckError> {
        if size > self.config.max_traces {
            return Err(DivergentExtraction::TraceBudgetExceeded {
                limit: self.config.max_traces,
            }
            .into());
        }
        Ok(())
    }
}

fn unit() -> IndexSet<Trace> {
    let mut set = IndexSet::new();
    set.insert(Vec::new());
    set
}

fn bound(name: &str, frame: &Frame, site: usize) -> ChannelId {
    ChannelId::Bound {
        name: name.to_string(),
        contract: frame.contract.clone(),
        site,
    }
}

fn resolve(scope: &Scope, frame: &Frame, name: &str) -> Result<ChannelId, CheckError> {
    scope
        .iter()
        .rev()
        .find(|(n, _)| n == name)
        .map(|(_, id)| id.clone())
        .ok_or_else(|| {
            DefinitionError::UnboundName {
                contract: frame.contract.clone(),
                name: name.to_string(),
            }
            .into()
        })
}

fn prefix(events: &[Event], traces: IndexSet<Trace>) -> IndexSet<Trace> {
    traces
        .into_iter()
        .map(|t| events.iter().cloned().chain(t).collect())
        .collect()
}

/// Shuffle product: every interleaving of one trace from `left` with one
/// trace from `right` that preserves each trace's own order.
pub fn shuffle(left: &IndexSet<Trace>, right: &IndexSet<Trace>, limit: usize) -> Result<IndexSet<Trace>, CheckError> {
    let mut out = IndexSet::new();
    let mut buf = Vec::new();
    for a in left {
        for b in right {
            interleave(a, b, &mut buf, &mut out, limit)?;
        }
    }
    Ok(out)
}

fn interleave(
    a: &[Event],
    b: &[Event],
    buf: &mut Vec<Event>,
    out: &mut IndexSet<Trace>,
    limit: usize,
) -> Result<(), CheckError> {
    if a.is_empty() || b.is_empty() {
        let mut trace = buf.clone();
        trace.extend_from_slice(a);
        trace.extend_from_slice(b);
        out.insert(trace);
        if out.len() > limit {
            return Err(DivergentExtraction::TraceBudgetExceeded { limit }.into());
        }
        return Ok(());
    }

    buf.push(a[0].clone());
    let result = interleave(&a[1..], b, buf, out, limit);
    buf.pop();
    result?;

    buf.push(b[0].clone());
    let result = interleave(a, &b[1..], buf, out, limit);
    buf.pop();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{Bind, Branch, Value};

    fn public(name: &str) -> ChannelId {
        ChannelId::Public { name: name.to_string() }
    }

    fn recv(name: &str) -> Event {
        Event::Receive { channel: public(name) }
    }

    fn send(name: &str) -> Event {
        Event::Send { channel: public(name) }
    }

    fn extract(contracts: Vec<Contract>, name: &str) -> Result<TraceSet, CheckError> {
        let module = Module::new(contracts, vec![]).unwrap();
        TraceExtractor::new(&module, CheckerConfig::default()).extract_contract(name)
    }

    #[test]
    fn test_shuffle_counts() {
        let mut left = IndexSet::new();
        left.insert(vec![recv("a"), recv("b")]);
        let mut right = IndexSet::new();
        right.insert(vec![send("c"), send("d")]);
        // C(4, 2) interleavings
        let out = shuffle(&left, &right, 100).unwrap();
        assert_eq!(out.len(), 6);
        assert!(out.contains(&vec![send("c"), recv("a"), send("d"), recv("b")]));
        assert!(!out.contains(&vec![recv("b"), recv("a"), send("c"), send("d")]));
    }

    #[test]
    fn test_shuffle_budget() {
        let mut left = IndexSet::new();
        left.insert(vec![recv("a"), recv("b"), recv("c")]);
        let mut right = IndexSet::new();
        right.insert(vec![send("d"), send("e"), send("f")]);
        assert_eq!(
            shuffle(&left, &right, 5),
            Err(CheckError::Divergent(DivergentExtraction::TraceBudgetExceeded { limit: 5 }))
        );
    }

    #[test]
    fn test_parallel_and_receive() {
        let body = Action::par(vec![
            Action::receive("a", &[], Action::send("b", vec![])),
            Action::send("c", vec![]),
        ]);
        let traces = extract(vec![Contract::new("P", &["a", "b", "c"], body)], "P").unwrap();
        assert_eq!(traces.len(), 3);
        assert!(traces.contains(&[recv("a"), send("b"), send("c")]));
        assert!(traces.contains(&[recv("a"), send("c"), send("b")]));
        assert!(traces.contains(&[send("c"), recv("a"), send("b")]));
    }

    #[test]
    fn test_select_is_a_union_of_branches() {
        let body = Action::select(vec![
            Branch::new(vec![Bind::new("get", &[]), Bind::new("rtn", &["k"])], Action::send("k", vec![])),
            Branch::new(vec![Bind::new("set", &["v"])], Action::Nil),
        ]);
        let traces = extract(vec![Contract::new("Cell", &["get", "rtn", "set"], body)], "Cell").unwrap();
        assert_eq!(traces.len(), 2);
        let first: Vec<String> = traces.iter().next().unwrap().iter().map(|e| e.to_string()).collect();
        assert_eq!(first, vec!["get?", "rtn?", "k!"]);
        assert!(traces.contains(&[recv("set")]));
    }

    #[test]
    fn test_self_call_is_memoized() {
        let body = Action::receive("a", &[], Action::recurse("Loop", &["a"]));
        let traces = extract(vec![Contract::new("Loop", &["a"], body)], "Loop").unwrap();
        assert_eq!(traces.len(), 1);
        let trace = traces.iter().next().unwrap();
        assert_eq!(render_trace(trace), "a? -> recurse Loop(a)");
    }

    #[test]
    fn test_call_with_other_arguments_unfolds() {
        // Swap(a, b) = a?.Swap(b, a): unfolds once, then reaches Swap(a, b) again
        let body = Action::receive("a", &[], Action::recurse("Swap", &["b", "a"]));
        let traces = extract(vec![Contract::new("Swap", &["a", "b"], body)], "Swap").unwrap();
        let trace = traces.iter().next().unwrap();
        assert_eq!(render_trace(trace), "a? -> b? -> recurse Swap(a, b)");
    }

    #[test]
    fn test_fresh_channel_passed_to_recursion_terminates() {
        let body = Action::fresh(&["n"], Action::par(vec![Action::send("out", vec![]), Action::recurse("Gen", &["out", "n"])]));
        let traces = extract(vec![Contract::new("Gen", &["out", "seed"], body)], "Gen").unwrap();
        assert!(!traces.is_empty());
    }

    #[test]
    fn test_depth_bound_is_reported() {
        let contracts = vec![
            Contract::new("A", &["x"], Action::recurse("B", &["x"])),
            Contract::new("B", &["x"], Action::recurse("C", &["x"])),
            Contract::new("C", &["x"], Action::recurse("C", &["x"])),
        ];
        let module = Module::new(contracts, vec![]).unwrap();
        let config = CheckerConfig {
            max_unfold_depth: 2,
            ..CheckerConfig::default()
        };
        let result = TraceExtractor::new(&module, config).extract_contract("A");
        assert_eq!(
            result,
            Err(CheckError::Divergent(DivergentExtraction::DepthExceeded {
                contract: "C".into(),
                limit: 2
            }))
        );
    }

    #[test]
    fn test_private_channel_is_hidden() {
        let body = Action::fresh(
            &["tmp"],
            Action::par(vec![Action::send("tmp", vec![]), Action::receive("tmp", &[], Action::send("out", vec![]))]),
        );
        let traces = extract(vec![Contract::new("P", &["out"], body)], "P").unwrap();
        assert_eq!(traces.len(), 1);
        assert!(traces.contains(&[send("out")]));
    }

    #[test]
    fn test_extruded_channel_is_visible() {
        let body = Action::fresh(
            &["ack"],
            Action::par(vec![
                Action::send("balance", vec![Value::Int(0), Value::Name("ack".into())]),
                Action::receive("ack", &[], Action::Nil),
            ]),
        );
        let traces = extract(vec![Contract::new("P", &["balance"], body)], "P").unwrap();
        assert_eq!(traces.len(), 2);
        assert!(traces
            .iter()
            .all(|t| t.iter().any(|e| e.channel().map(|c| c.name()) == Some("ack"))));
    }

    #[test]
    fn test_empty_select_does_not_erase_siblings() {
        let body = Action::par(vec![Action::select(vec![]), Action::send("b", vec![])]);
        let traces = extract(vec![Contract::new("P", &["b"], body)], "P").unwrap();
        assert_eq!(traces.len(), 1);
        assert!(traces.contains(&[send("b")]));
    }

    #[test]
    fn test_shared_callees_are_unfolded_once() {
        // Step{i}(a) = Step{i+1}(a) | Step{i+1}(a); 2^40 paths, 41 states
        let depth = 40;
        let mut contracts: Vec<Contract> = (0..depth)
            .map(|i| {
                let next = format!("Step{}", i + 1);
                Contract::new(
                    &format!("Step{}", i),
                    &["a"],
                    Action::par(vec![Action::recurse(&next, &["a"]), Action::recurse(&next, &["a"])]),
                )
            })
            .collect();
        contracts.push(Contract::new(&format!("Step{}", depth), &["a"], Action::Nil));

        let module = Module::new(contracts, vec![]).unwrap();
        let mut extractor = TraceExtractor::new(&module, CheckerConfig::default());
        let traces = extractor.extract_contract("Step0").unwrap();
        assert_eq!(traces.len(), 1);
        assert!(traces.contains(&[]));
        assert_eq!(extractor.done.len(), depth + 1);
    }

    #[test]
    fn test_loop_through_caller_is_not_reused() {
        // Inner closes a loop through Outer, so each call site unfolds it in
        // its own context
        let contracts = vec![
            Contract::new(
                "Outer",
                &["a"],
                Action::receive("a", &[], Action::recurse("Inner", &["a"])),
            ),
            Contract::new("Inner", &["a"], Action::recurse("Outer", &["a"])),
        ];
        let module = Module::new(contracts, vec![]).unwrap();
        let mut extractor = TraceExtractor::new(&module, CheckerConfig::default());
        let traces = extractor.extract_contract("Outer").unwrap();
        assert_eq!(render_trace(traces.iter().next().unwrap()), "a? -> recurse Outer(a)");
        let inner = ("Inner".to_string(), vec![public("a")]);
        assert!(!extractor.done.contains_key(&inner));
    }
}
