//! Type automaton
//!
//! A behavioral type compiled into an arena of states:
//! - `After(ch, T)`: one transition labeled `ch` to the state of `T`
//! - `Choice(T1..Tn)`: unlabeled (epsilon) edges to every alternative
//! - `Fix(X, T)`: epsilon edge to the state of `T`
//! - `Ref(X)`: epsilon back-edge to the `Fix` binding `X`
//!
//! The automaton is walked over epsilon-closed sets of states, so choice is
//! explored exhaustively rather than committed to.

use std::collections::BTreeSet;

use crate::behavior::{BehavioralType, TypeDecl};
use crate::checker::validate::validate_type;
use crate::error::DefinitionError;

pub type StateId = usize;

/// Set of simultaneously possible states
pub type StateSet = BTreeSet<StateId>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    After { channel: String, next: StateId },
    Choice(Vec<StateId>),
    Fix { body: StateId },
    Ref { name: String, target: StateId },
}

#[derive(Debug, Clone)]
pub struct State {
    pub node: Node,
    /// Rendered type term this state stands for
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct Automaton {
    name: String,
    states: Vec<State>,
    start: StateId,
    alphabet: BTreeSet<String>,
}

impl Automaton {
    /// Compile a type declaration. Fails on unbound or unguarded recursion.
    pub fn compile(decl: &TypeDecl) -> Result<Self, DefinitionError> {
        validate_type(decl)?;

        let mut automaton = Automaton {
            name: decl.name.clone(),
            states: Vec::new(),
            start: 0,
            alphabet: decl.body.channels(),
        };
        let mut env = Vec::new();
        automaton.start = automaton.build(decl, &decl.body, &mut env)?;
        Ok(automaton)
    }

    fn build(
        &mut self,
        decl: &TypeDecl,
        ty: &BehavioralType,
        env: &mut Vec<(String, StateId)>,
    ) -> Result<StateId, DefinitionError> {
        let label = ty.to_string();
        let node = match ty {
            BehavioralType::After { channel, then } => Node::After {
                channel: channel.clone(),
                next: self.build(decl, then, env)?,
            },
            BehavioralType::Choice(alternatives) => {
                let mut alts = Vec::with_capacity(alternatives.len());
                for alt in alternatives {
                    alts.push(self.build(decl, alt, env)?);
                }
                Node::Choice(alts)
            }
            BehavioralType::Fix { name, body } => {
                // Reserve the id first so references in the body can point back
                let id = self.push(Node::Choice(Vec::new()), label);
                env.push((name.clone(), id));
                let body = self.build(decl, body, env);
                env.pop();
                self.states[id].node = Node::Fix { body: body? };
                return Ok(id);
            }
            BehavioralType::Ref(name) => {
                let target = env
                    .iter()
                    .rev()
                    .find(|(n, _)| n == name)
                    .map(|(_, id)| *id)
                    .ok_or_else(|| DefinitionError::UnboundTypeVariable {
                        ty: decl.name.clone(),
                        var: name.clone(),
                    })?;
                Node::Ref {
                    name: name.clone(),
                    target,
                }
            }
        };
        Ok(self.push(node, label))
    }

    fn push(&mut self, node: Node, label: String) -> StateId {
        self.states.push(State { node, label });
        self.states.len() - 1
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Channel names the type constrains
    pub fn alphabet(&self) -> &BTreeSet<String> {
        &self.alphabet
    }

    pub fn state(&self, id: StateId) -> &State {
        &self.states[id]
    }

    /// Epsilon-closed initial state set
    pub fn initial(&self) -> StateSet {
        self.closure([self.start])
    }

    /// Every state reachable from `seeds` without consuming an event
    pub fn closure(&self, seeds: impl IntoIterator<Item = StateId>) -> StateSet {
        let mut set = StateSet::new();
        let mut pending: Vec<StateId> = seeds.into_iter().collect();
        while let Some(id) = pending.pop() {
            if !set.insert(id) {
                continue;
            }
            match &self.states[id].node {
                Node::After { .. } => {}
                Node::Choice(alts) => pending.extend(alts.iter().copied()),
                Node::Fix { body } => pending.push(*body),
                Node::Ref { target, .. } => pending.push(*target),
            }
        }
        set
    }

    /// Consume one event on `channel`
    pub fn step(&self, states: &StateSet, channel: &str) -> StateSet {
        let next = states.iter().filter_map(|id| match &self.states[*id].node {
            Node::After { channel: c, next } if c == channel => Some(*next),
            _ => None,
        });
        self.closure(next)
    }

    /// Take the recursion back-edge from every `Ref` in `states`
    pub fn recurse(&self, states: &StateSet) -> StateSet {
        let targets = states.iter().filter_map(|id| match &self.states[*id].node {
            Node::Ref { target, .. } => Some(*target),
            _ => None,
        });
        self.closure(targets)
    }

    /// Channels that would be accepted from `states`
    pub fn expected(&self, states: &StateSet) -> BTreeSet<String> {
        states
            .iter()
            .filter_map(|id| match &self.states[*id].node {
                Node::After { channel, .. } => Some(channel.clone()),
                _ => None,
            })
            .collect()
    }

    /// Whether a recursion event would be accepted from `states`
    pub fn accepts_recursion(&self, states: &StateSet) -> bool {
        states
            .iter()
            .any(|id| matches!(self.states[*id].node, Node::Ref { .. }))
    }

    /// Whether `states` still has an outgoing transition
    pub fn is_live(&self, states: &StateSet) -> bool {
        self.accepts_recursion(states) || !self.expected(states).is_empty()
    }

    /// Rendered frontier of `states`: the terms still to be satisfied
    pub fn describe(&self, states: &StateSet) -> Vec<String> {
        let labels: BTreeSet<String> = states
            .iter()
            .filter(|id| matches!(self.states[**id].node, Node::After { .. } | Node::Ref { .. }))
            .map(|id| self.states[*id].label.clone())
            .collect();
        let mut labels: Vec<String> = labels.into_iter().collect();
        if labels.is_empty() {
            labels.push("0".to_string());
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank_type() -> TypeDecl {
        TypeDecl::new(
            "Bank",
            BehavioralType::fix(
                "X",
                BehavioralType::after("withdraw", BehavioralType::after("updateAck", BehavioralType::var("X"))),
            ),
        )
    }

    #[test]
    fn test_walk_bank_type() {
        let automaton = Automaton::compile(&bank_type()).unwrap();
        let start = automaton.initial();
        assert_eq!(automaton.expected(&start), BTreeSet::from(["withdraw".to_string()]));
        assert!(!automaton.accepts_recursion(&start));

        let after_withdraw = automaton.step(&start, "withdraw");
        assert_eq!(automaton.expected(&after_withdraw), BTreeSet::from(["updateAck".to_string()]));
        assert!(!automaton.accepts_recursion(&after_withdraw));
        assert_eq!(automaton.describe(&after_withdraw), vec!["updateAck.X"]);

        let after_ack = automaton.step(&after_withdraw, "updateAck");
        assert!(automaton.accepts_recursion(&after_ack));
        // the back-edge makes the start available again
        assert_eq!(automaton.expected(&after_ack), BTreeSet::from(["withdraw".to_string()]));
        assert_eq!(automaton.recurse(&after_ack), start);
    }

    #[test]
    fn test_choice_is_explored_exhaustively() {
        // (a.b.0) + (a.c.0): after `a`, both `b` and `c` are possible
        let decl = TypeDecl::new(
            "T",
            BehavioralType::choice(vec![
                BehavioralType::after("a", BehavioralType::after("b", BehavioralType::choice(vec![]))),
                BehavioralType::after("a", BehavioralType::after("c", BehavioralType::choice(vec![]))),
            ]),
        );
        let automaton = Automaton::compile(&decl).unwrap();
        let states = automaton.step(&automaton.initial(), "a");
        let expected: Vec<_> = automaton.expected(&states).into_iter().collect();
        assert_eq!(expected, vec!["b", "c"]);

        let dead = automaton.step(&states, "b");
        assert!(!automaton.is_live(&dead));
        assert_eq!(automaton.describe(&dead), vec!["0"]);
    }

    #[test]
    fn test_describe_lists_each_term_once() {
        let dead = || BehavioralType::choice(vec![]);
        let decl = TypeDecl::new(
            "T",
            BehavioralType::choice(vec![
                BehavioralType::after("b", dead()),
                BehavioralType::after("c", dead()),
                BehavioralType::after("b", dead()),
            ]),
        );
        let automaton = Automaton::compile(&decl).unwrap();
        assert_eq!(automaton.describe(&automaton.initial()), vec!["b.0", "c.0"]);
    }

    #[test]
    fn test_unguarded_type_does_not_compile() {
        let decl = TypeDecl::new("T", BehavioralType::fix("X", BehavioralType::var("X")));
        assert!(matches!(
            Automaton::compile(&decl),
            Err(DefinitionError::UnguardedRecursion { .. })
        ));
    }
}
