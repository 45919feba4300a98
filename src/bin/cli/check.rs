//! Check orchestration
//!
//! Collects one target per typed contract, runs the checks (in parallel
//! with `--jobs`), and reports results in discovery order.

use std::path::PathBuf;

use anyhow::{Context, Result};
use behavior_lock::error::exit_code;
use behavior_lock::fingerprint::fingerprint;
use behavior_lock::{CheckError, CheckerConfig, Diagnostic, Verdict};
use rayon::prelude::*;
use tracing::debug;

use crate::cli::discover::LoadedDocument;

/// A contract/type pair to check
#[derive(Debug, Clone)]
pub struct CheckTarget {
    pub file_path: PathBuf,
    /// Index into the loaded documents
    pub document: usize,
    pub contract: String,
    pub behavior: String,
    pub fingerprint: String,
}

#[derive(Debug, Clone)]
pub enum CheckResult {
    Passed { traces: usize },
    Failed { traces: usize, diagnostic: Box<Diagnostic> },
    DefinitionError(String),
    Inconclusive(String),
}

impl CheckResult {
    pub fn exit_code(&self) -> i32 {
        match self {
            CheckResult::Passed { .. } => exit_code::PASS,
            CheckResult::Failed { .. } => exit_code::MISMATCH,
            CheckResult::DefinitionError(_) => exit_code::DEFINITION_ERROR,
            CheckResult::Inconclusive(_) => exit_code::INCONCLUSIVE,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            CheckResult::Passed { .. } => "passed",
            CheckResult::Failed { .. } => "failed",
            CheckResult::DefinitionError(_) => "definition_error",
            CheckResult::Inconclusive(_) => "inconclusive",
        }
    }
}

/// CLI overrides of the document config
#[derive(Debug, Clone, Copy, Default)]
pub struct Limits {
    pub max_depth: Option<usize>,
    pub max_traces: Option<usize>,
}

/// Every contract declaring a behavior, in document order
pub fn collect_targets(documents: &[LoadedDocument]) -> Result<Vec<CheckTarget>> {
    let mut targets = Vec::new();
    for (index, doc) in documents.iter().enumerate() {
        for contract in doc.module.typed_contracts() {
            let behavior = contract.behavior.clone().unwrap_or_default();
            let fingerprint = fingerprint(&doc.module, &contract.name, &behavior)
                .with_context(|| format!("failed to fingerprint {}", contract.name))?;
            targets.push(CheckTarget {
                file_path: doc.path.clone(),
                document: index,
                contract: contract.name.clone(),
                behavior,
                fingerprint,
            });
        }
    }
    Ok(targets)
}

/// Check a single target
pub fn check_target(documents: &[LoadedDocument], target: &CheckTarget, limits: Limits) -> CheckResult {
    let doc = &documents[target.document];
    let config: CheckerConfig = doc.config.with_overrides(limits.max_depth, limits.max_traces);

    match doc.module.check_against(&target.contract, &target.behavior, &config) {
        Ok(outcome) => match outcome.verdict {
            Verdict::Pass => CheckResult::Passed { traces: outcome.traces },
            Verdict::Fail(diagnostic) => CheckResult::Failed {
                traces: outcome.traces,
                diagnostic,
            },
        },
        Err(CheckError::Definition(e)) => CheckResult::DefinitionError(e.to_string()),
        Err(CheckError::Divergent(e)) => CheckResult::Inconclusive(e.to_string()),
    }
}

/// Check all targets; `jobs > 1` uses a dedicated thread pool
pub fn run_checks(
    documents: &[LoadedDocument],
    targets: Vec<CheckTarget>,
    limits: Limits,
    jobs: usize,
) -> Result<Vec<(CheckTarget, CheckResult)>> {
    if jobs <= 1 {
        return Ok(targets
            .into_iter()
            .map(|t| {
                let result = check_target(documents, &t, limits);
                (t, result)
            })
            .collect());
    }

    debug!(jobs, targets = targets.len(), "checking in parallel");
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context("failed to start worker threads")?;
    Ok(pool.install(|| {
        targets
            .into_par_iter()
            .map(|t| {
                let result = check_target(documents, &t, limits);
                (t, result)
            })
            .collect()
    }))
}

/// Exit code for a batch: the most severe result wins
pub fn batch_exit_code(results: &[(CheckTarget, CheckResult)]) -> i32 {
    results
        .iter()
        .map(|(_, r)| r.exit_code())
        .max()
        .unwrap_or(exit_code::PASS)
}
