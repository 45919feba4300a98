//! Error types for Behavior Lock
//!
//! Three outcomes end a check without a PASS verdict:
//! - `DefinitionError`: the inputs are ill-formed, detected before extraction
//! - `DivergentExtraction`: the contract's traces could not be finitely
//!   characterized within the configured bounds ("could not determine")
//! - a type mismatch, which is a verdict rather than an error (see `checker`)

use std::path::PathBuf;

use thiserror::Error;

/// Process exit codes for the behavior-lock CLI.
pub mod exit_code {
    /// Every checked contract satisfies its behavioral type.
    pub const PASS: i32 = 0;
    /// At least one contract violates its behavioral type.
    pub const MISMATCH: i32 = 1;
    /// A contract or type definition is ill-formed.
    pub const DEFINITION_ERROR: i32 = 2;
    /// Extraction diverged; the outcome could not be determined.
    pub const INCONCLUSIVE: i32 = 3;
    /// Input could not be read or parsed.
    pub const IO_ERROR: i32 = 4;
}

/// Ill-formed contract or type definitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("contract `{0}` is defined more than once")]
    DuplicateContract(String),

    #[error("type `{0}` is declared more than once")]
    DuplicateType(String),

    #[error("contract `{contract}` declares parameter `{param}` more than once")]
    DuplicateParameter { contract: String, param: String },

    #[error("no contract named `{0}`")]
    NoSuchContract(String),

    #[error("contract `{0}` has no declared behavior")]
    NoBehavior(String),

    #[error("contract `{contract}` calls undefined contract `{callee}`")]
    UnknownContract { contract: String, callee: String },

    #[error("contract `{contract}` calls `{callee}` with {found} argument(s), expected {expected}")]
    ArityMismatch {
        contract: String,
        callee: String,
        expected: usize,
        found: usize,
    },

    #[error("contract `{contract}` uses unbound name `{name}`")]
    UnboundName { contract: String, name: String },

    #[error("contract `{contract}` declares unknown behavior `{behavior}`")]
    UnknownType { contract: String, behavior: String },

    #[error("type `{ty}` refers to unbound recursion variable `{var}`")]
    UnboundTypeVariable { ty: String, var: String },

    #[error("type `{ty}`: recursion variable `{var}` occurs unguarded, outside tail position")]
    UnguardedRecursion { ty: String, var: String },
}

/// Extraction could not finitely characterize a contract
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DivergentExtraction {
    #[error("unfolding `{contract}` exceeded the depth bound of {limit} without reaching a memoized state")]
    DepthExceeded { contract: String, limit: usize },

    #[error("trace set exceeded the budget of {limit} traces")]
    TraceBudgetExceeded { limit: usize },
}

/// Errors that terminate a single check invocation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    #[error("definition error: {0}")]
    Definition(#[from] DefinitionError),

    #[error("divergent extraction: {0}")]
    Divergent(#[from] DivergentExtraction),
}

impl CheckError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CheckError::Definition(_) => exit_code::DEFINITION_ERROR,
            CheckError::Divergent(_) => exit_code::INCONCLUSIVE,
        }
    }
}

/// Errors loading contract documents
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid document {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no `behavior` listings found in {0}")]
    NoListings(String),
}
