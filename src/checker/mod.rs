//! Behavioral type checker
//!
//! This module contains:
//! - `validate`: definition checks run before extraction
//! - `extract`: trace-set extraction with memoized unfolding
//! - `automaton`: behavioral types compiled to an arena automaton
//! - `satisfy`: trace-by-trace satisfaction with counterexample witnesses
//!
//! Each contract/type pair is checked independently; nothing is shared
//! between checks.

pub mod automaton;
pub mod extract;
pub mod satisfy;
pub mod validate;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::behavior::TypeDecl;
use crate::config::CheckerConfig;
use crate::error::{CheckError, DefinitionError};
use crate::process::{Action, Contract};
use crate::report::Diagnostic;

pub use automaton::Automaton;
pub use extract::{ChannelId, Event, Trace, TraceExtractor, TraceSet};
pub use satisfy::{satisfies, Satisfaction, Witness};

/// A set of contract definitions and type declarations
#[derive(Debug, Clone, Default)]
pub struct Module {
    contracts: IndexMap<String, Contract>,
    types: IndexMap<String, TypeDecl>,
}

/// PASS, or FAIL with a counterexample
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(Box<Diagnostic>),
}

/// Result of one successful check invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub contract: String,
    pub behavior: String,
    /// Number of distinct traces examined
    pub traces: usize,
    pub verdict: Verdict,
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        matches!(self.verdict, Verdict::Pass)
    }
}

impl Module {
    /// Build a module; contract and type names must be unique
    pub fn new(contracts: Vec<Contract>, types: Vec<TypeDecl>) -> Result<Self, DefinitionError> {
        let mut module = Module::default();
        for contract in contracts {
            if module.contracts.contains_key(&contract.name) {
                return Err(DefinitionError::DuplicateContract(contract.name));
            }
            module.contracts.insert(contract.name.clone(), contract);
        }
        for decl in types {
            if module.types.contains_key(&decl.name) {
                return Err(DefinitionError::DuplicateType(decl.name));
            }
            module.types.insert(decl.name.clone(), decl);
        }
        Ok(module)
    }

    pub fn contract(&self, name: &str) -> Option<&Contract> {
        self.contracts.get(name)
    }

    pub fn type_decl(&self, name: &str) -> Option<&TypeDecl> {
        self.types.get(name)
    }

    pub fn contracts(&self) -> impl Iterator<Item = &Contract> {
        self.contracts.values()
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDecl> {
        self.types.values()
    }

    /// Contracts carrying a declared behavior, in definition order
    pub fn typed_contracts(&self) -> impl Iterator<Item = &Contract> {
        self.contracts.values().filter(|c| c.behavior.is_some())
    }

    /// `name` followed by every contract it can reach through calls
    pub fn reachable(&self, name: &str) -> Vec<&Contract> {
        let mut out: Vec<&Contract> = Vec::new();
        let mut pending = vec![name.to_string()];
        while let Some(current) = pending.pop() {
            if out.iter().any(|c| c.name == current) {
                continue;
            }
            if let Some(contract) = self.contract(&current) {
                collect_calls(&contract.body, &mut pending);
                out.push(contract);
            }
        }
        out
    }

    /// Validated trace set of a contract
    pub fn extract_traces(&self, contract: &str, config: &CheckerConfig) -> Result<TraceSet, CheckError> {
        validate::validate_contract(self, contract)?;
        TraceExtractor::new(self, *config).extract_contract(contract)
    }

    /// Check a contract against its declared behavior
    pub fn check(&self, contract: &str, config: &CheckerConfig) -> Result<CheckOutcome, CheckError> {
        let behavior = self
            .contract(contract)
            .ok_or_else(|| DefinitionError::NoSuchContract(contract.to_string()))?
            .behavior
            .clone()
            .ok_or_else(|| DefinitionError::NoBehavior(contract.to_string()))?;
        self.check_against(contract, &behavior, config)
    }

    /// Check a contract against a named type declaration
    pub fn check_against(&self, contract: &str, behavior: &str, config: &CheckerConfig) -> Result<CheckOutcome, CheckError> {
        let decl = self.type_decl(behavior).ok_or_else(|| DefinitionError::UnknownType {
            contract: contract.to_string(),
            behavior: behavior.to_string(),
        })?;

        validate::validate_contract(self, contract)?;
        let automaton = Automaton::compile(decl)?;
        let traces = TraceExtractor::new(self, *config).extract_contract(contract)?;

        let verdict = match satisfies(&traces, &automaton) {
            Satisfaction::Holds => Verdict::Pass,
            Satisfaction::Violated(witness) => {
                debug!(contract, behavior, position = witness.position, "type mismatch");
                Verdict::Fail(Box::new(Diagnostic::from_witness(contract, behavior, &witness)))
            }
        };
        info!(contract, behavior, traces = traces.len(), pass = matches!(verdict, Verdict::Pass), "checked");

        Ok(CheckOutcome {
            contract: contract.to_string(),
            behavior: behavior.to_string(),
            traces: traces.len(),
            verdict,
        })
    }

    /// Check every contract that declares a behavior
    pub fn check_all(&self, config: &CheckerConfig) -> Vec<(String, Result<CheckOutcome, CheckError>)> {
        self.typed_contracts()
            .map(|c| (c.name.clone(), self.check(&c.name, config)))
            .collect()
    }
}

/// Names of contracts called anywhere in `action`
pub(crate) fn collect_calls(action: &Action, out: &mut Vec<String>) {
    match action {
        Action::Nil | Action::Send { .. } => {}
        Action::Receive { then, .. } => collect_calls(then, out),
        Action::Parallel(children) => children.iter().for_each(|c| collect_calls(c, out)),
        Action::Select(branches) => branches.iter().for_each(|b| collect_calls(&b.then, out)),
        Action::New { body, .. } => collect_calls(body, out),
        Action::Recurse { contract, .. } => out.push(contract.clone()),
    }
}
