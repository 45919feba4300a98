//! Contract documents
//!
//! A document is a JSON object:
//!
//! ```json
//! {
//!   "config": { "max_unfold_depth": 32 },
//!   "contracts": [{ "name": "Ping", "params": ["ping"], "body": "nil", "behavior": "PingType" }],
//!   "types": [{ "name": "PingType", "body": { "choice": [] } }]
//! }
//! ```
//!
//! Every section is optional. Markdown notes are reduced to the same shape
//! by merging their listings in order.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::behavior::TypeDecl;
use crate::checker::Module;
use crate::config::CheckerConfig;
use crate::error::{DefinitionError, LoadError};
use crate::parser::markdown::extract_listings;
use crate::process::Contract;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Extraction bounds; the CLI may override them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<CheckerConfig>,
    #[serde(default)]
    pub contracts: Vec<Contract>,
    #[serde(default)]
    pub types: Vec<TypeDecl>,
}

impl Document {
    /// Parse a JSON document; `origin` names it in errors
    pub fn from_json(origin: &str, text: &str) -> Result<Self, LoadError> {
        serde_json::from_str(text).map_err(|source| LoadError::Json {
            origin: origin.to_string(),
            source,
        })
    }

    /// Parse every `behavior` listing of a Markdown note and merge them
    pub fn from_markdown(origin: &str, text: &str) -> Result<Self, LoadError> {
        let listings = extract_listings(text);
        if listings.is_empty() {
            return Err(LoadError::NoListings(origin.to_string()));
        }

        let mut document = Document::default();
        for (i, listing) in listings.iter().enumerate() {
            let part = Document::from_json(&format!("{} (listing {})", origin, i + 1), listing)?;
            document.merge(part);
        }
        Ok(document)
    }

    /// Append another document's definitions. The first config seen wins.
    pub fn merge(&mut self, other: Document) {
        if self.config.is_none() {
            self.config = other.config;
        }
        self.contracts.extend(other.contracts);
        self.types.extend(other.types);
    }

    /// Embedded config, or the defaults
    pub fn config(&self) -> CheckerConfig {
        self.config.unwrap_or_default()
    }

    /// Build the module; fails on duplicate names
    pub fn into_module(self) -> Result<Module, DefinitionError> {
        Module::new(self.contracts, self.types)
    }
}

/// Load a `.json` document or a Markdown note (`.md`, `.markdown`)
pub fn load_path(path: &Path) -> Result<Document, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let origin = path.display().to_string();

    let document = match path.extension().and_then(|e| e.to_str()) {
        Some("md") | Some("markdown") => Document::from_markdown(&origin, &text)?,
        _ => Document::from_json(&origin, &text)?,
    };
    debug!(
        path = %origin,
        contracts = document.contracts.len(),
        types = document.types.len(),
        "loaded document"
    );
    Ok(document)
}
