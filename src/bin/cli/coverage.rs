//! Coverage reporting for behavioral types
//!
//! Reports which contracts declare a behavior, which do not, and which type
//! declarations no contract uses.

use std::path::PathBuf;

use crate::cli::discover::LoadedDocument;

/// A contract and the document it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractRef {
    pub file_path: PathBuf,
    pub contract: String,
    pub behavior: Option<String>,
}

/// Coverage statistics
#[derive(Debug, Clone, Default)]
pub struct CoverageStats {
    pub total_contracts: usize,
    /// Contracts with a declared behavior
    pub typed: Vec<ContractRef>,
    /// Contracts without one
    pub untyped: Vec<ContractRef>,
    /// Type declarations no contract refers to: (file, type)
    pub unused_types: Vec<(PathBuf, String)>,
}

impl CoverageStats {
    pub fn percent(&self) -> f64 {
        if self.total_contracts == 0 {
            0.0
        } else {
            (self.typed.len() as f64 / self.total_contracts as f64) * 100.0
        }
    }
}

/// Generate coverage statistics over loaded documents
pub fn generate_coverage(documents: &[LoadedDocument]) -> CoverageStats {
    let mut stats = CoverageStats::default();

    for doc in documents {
        for contract in doc.module.contracts() {
            stats.total_contracts += 1;
            let entry = ContractRef {
                file_path: doc.path.clone(),
                contract: contract.name.clone(),
                behavior: contract.behavior.clone(),
            };
            if contract.behavior.is_some() {
                stats.typed.push(entry);
            } else {
                stats.untyped.push(entry);
            }
        }

        for decl in doc.module.types() {
            let used = doc
                .module
                .contracts()
                .any(|c| c.behavior.as_deref() == Some(decl.name.as_str()));
            if !used {
                stats.unused_types.push((doc.path.clone(), decl.name.clone()));
            }
        }
    }

    stats
}

/// Format coverage report as human-readable text
pub fn format_coverage_human(stats: &CoverageStats) -> String {
    let mut output = String::new();

    output.push_str("=== Behavior Lock Coverage Report ===\n\n");
    output.push_str(&format!("Total contracts: {}\n", stats.total_contracts));
    output.push_str(&format!("  - With behavioral types: {}\n", stats.typed.len()));
    output.push_str(&format!("  - Without behavioral types: {}\n", stats.untyped.len()));
    output.push_str(&format!("Type coverage: {:.1}%\n\n", stats.percent()));

    if !stats.typed.is_empty() {
        output.push_str("Typed contracts:\n");
        output.push_str("----------------\n");
        for c in &stats.typed {
            output.push_str(&format!(
                "  {} : {} ({})\n",
                c.contract,
                c.behavior.as_deref().unwrap_or("-"),
                c.file_path.display()
            ));
        }
        output.push('\n');
    }

    if !stats.untyped.is_empty() {
        output.push_str("Untyped contracts:\n");
        output.push_str("------------------\n");
        for c in &stats.untyped {
            output.push_str(&format!("  {} ({})\n", c.contract, c.file_path.display()));
        }
        output.push('\n');
    }

    if !stats.unused_types.is_empty() {
        output.push_str("Unused type declarations:\n");
        output.push_str("-------------------------\n");
        for (path, name) in &stats.unused_types {
            output.push_str(&format!("  {} ({})\n", name, path.display()));
        }
    }

    output
}

/// Format coverage report as JSON
pub fn format_coverage_json(stats: &CoverageStats) -> String {
    let entry = |c: &ContractRef| {
        serde_json::json!({
            "contract": c.contract,
            "behavior": c.behavior,
            "file": c.file_path.display().to_string(),
        })
    };

    let json = serde_json::json!({
        "total_contracts": stats.total_contracts,
        "typed": stats.typed.iter().map(entry).collect::<Vec<_>>(),
        "untyped": stats.untyped.iter().map(entry).collect::<Vec<_>>(),
        "unused_types": stats.unused_types.iter().map(|(path, name)| serde_json::json!({
            "type": name,
            "file": path.display().to_string(),
        })).collect::<Vec<_>>(),
        "coverage_percent": stats.percent(),
    });

    serde_json::to_string_pretty(&json).unwrap_or_else(|_| "{}".to_string())
}

/// Format coverage report as Markdown
pub fn format_coverage_markdown(stats: &CoverageStats) -> String {
    let mut output = String::new();

    output.push_str("# Behavior Lock Coverage Report\n\n");
    output.push_str("## Overall Statistics\n\n");
    output.push_str(&format!("- **Total contracts**: {}\n", stats.total_contracts));
    output.push_str(&format!("- **With behavioral types**: {}\n", stats.typed.len()));
    output.push_str(&format!("- **Without behavioral types**: {}\n", stats.untyped.len()));
    output.push_str(&format!("- **Type coverage**: {:.1}%\n\n", stats.percent()));

    if stats.total_contracts > 0 {
        output.push_str("| Contract | Behavior | File |\n");
        output.push_str("|----------|----------|------|\n");
        for c in stats.typed.iter().chain(&stats.untyped) {
            output.push_str(&format!(
                "| `{}` | {} | `{}` |\n",
                c.contract,
                c.behavior.as_deref().map(|b| format!("`{}`", b)).unwrap_or_else(|| "-".to_string()),
                c.file_path.display()
            ));
        }
    }

    output
}
