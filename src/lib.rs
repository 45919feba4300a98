//! # behavior-lock
//!
//! Behavioral type checking for join-pattern contracts.
//!
//! This crate provides:
//! - Process and behavioral type ASTs (`process`, `behavior`)
//! - Trace extraction with memoized unfolding of recursive contracts
//! - Satisfaction checking of trace sets against type automata
//! - Counterexample diagnostics for contracts that violate their type
//! - Document loading from JSON and Markdown notes (`parser`)
//! - CLI tool (`behavior-lock`) for checking documents
//!
//! ## Usage
//!
//! ```rust
//! use behavior_lock::behavior::{BehavioralType, TypeDecl};
//! use behavior_lock::process::{Action, Contract};
//! use behavior_lock::{CheckerConfig, Module};
//!
//! let ping = Contract::new(
//!     "Ping",
//!     &["ping", "pong"],
//!     Action::receive("ping", &[], Action::par(vec![
//!         Action::send("pong", vec![]),
//!         Action::recurse("Ping", &["ping", "pong"]),
//!     ])),
//! )
//! .with_behavior("PingType");
//! let ty = TypeDecl::new(
//!     "PingType",
//!     BehavioralType::fix("X", BehavioralType::after("ping", BehavioralType::var("X"))),
//! );
//!
//! let module = Module::new(vec![ping], vec![ty]).unwrap();
//! let outcome = module.check("Ping", &CheckerConfig::default()).unwrap();
//! assert!(outcome.passed());
//! ```

pub mod behavior;
pub mod checker;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod parser;
pub mod process;
pub mod report;

pub use checker::{CheckOutcome, Module, Verdict};
pub use config::CheckerConfig;
pub use error::{CheckError, DefinitionError, DivergentExtraction, LoadError};
pub use report::Diagnostic;
