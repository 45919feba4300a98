//! Document discovery
//!
//! Explicit file arguments are always loaded. Directories are walked for
//! `.json` and `.md` files; files found this way that are not documents
//! (Markdown without any `behavior` listing, JSON of another shape) are
//! skipped.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use behavior_lock::config::CheckerConfig;
use behavior_lock::error::LoadError;
use behavior_lock::parser::load_path;
use behavior_lock::Module;
use tracing::debug;
use walkdir::WalkDir;

/// A loaded document, ready to check
#[derive(Debug)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub module: Module,
    /// Config embedded in the document, or the defaults
    pub config: CheckerConfig,
}

/// Files to load for the given arguments; the current directory when empty
pub fn discover_files(paths: &[PathBuf]) -> Result<Vec<(PathBuf, bool)>> {
    let roots: Vec<PathBuf> = if paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        paths.to_vec()
    };

    let mut files = Vec::new();
    for root in roots {
        if root.is_file() {
            files.push((root, true));
            continue;
        }
        if !root.is_dir() {
            anyhow::bail!("no such file or directory: {}", root.display());
        }

        let mut found: Vec<PathBuf> = WalkDir::new(&root)
            .into_iter()
            .filter_entry(|e| !is_skipped_dir(e.path()))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_document(e.path()))
            .map(|e| e.into_path())
            .collect();
        found.sort();
        files.extend(found.into_iter().map(|p| (p, false)));
    }
    Ok(files)
}

/// Load every discovered document
pub fn load_documents(paths: &[PathBuf]) -> Result<Vec<LoadedDocument>> {
    let mut documents = Vec::new();
    for (path, explicit) in discover_files(paths)? {
        let document = match load_path(&path) {
            Ok(document) => document,
            Err(LoadError::NoListings(_)) if !explicit => {
                debug!(path = %path.display(), "no behavior listings, skipping");
                continue;
            }
            Err(LoadError::Json { source, .. }) if !explicit => {
                debug!(path = %path.display(), error = %source, "not a behavior document, skipping");
                continue;
            }
            Err(e) => return Err(e).with_context(|| format!("loading {}", path.display())),
        };
        let config = document.config();
        let module = document
            .into_module()
            .with_context(|| format!("in {}", path.display()))?;
        documents.push(LoadedDocument { path, module, config });
    }
    Ok(documents)
}

/// The first document defining `contract`
pub fn find_contract<'a>(documents: &'a [LoadedDocument], contract: &str) -> Option<&'a LoadedDocument> {
    documents.iter().find(|doc| doc.module.contract(contract).is_some())
}

fn is_document(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("json") | Some("md") | Some("markdown")
    )
}

fn is_skipped_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| matches!(name, "target" | ".git" | "node_modules"))
        .unwrap_or(false)
}
