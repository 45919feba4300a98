//! Output formatting for check results
//!
//! Formats results as human-readable, JSON, JUnit XML, or Markdown

use std::fmt::Write;

use behavior_lock::checker::extract::render_trace;
use behavior_lock::checker::TraceSet;
use behavior_lock::fingerprint::short;
use serde_json::json;

use crate::cli::check::{CheckResult, CheckTarget};
use crate::cli::discover::LoadedDocument;
use crate::cli::OutputFormat;

#[derive(Debug, Default, PartialEq, Eq)]
struct Counts {
    passed: usize,
    failed: usize,
    definition_errors: usize,
    inconclusive: usize,
}

fn counts(results: &[(CheckTarget, CheckResult)]) -> Counts {
    let mut counts = Counts::default();
    for (_, result) in results {
        match result {
            CheckResult::Passed { .. } => counts.passed += 1,
            CheckResult::Failed { .. } => counts.failed += 1,
            CheckResult::DefinitionError(_) => counts.definition_errors += 1,
            CheckResult::Inconclusive(_) => counts.inconclusive += 1,
        }
    }
    counts
}

/// Format check results
pub fn format_results(results: &[(CheckTarget, CheckResult)], format: OutputFormat) -> String {
    match format {
        OutputFormat::Human => format_human(results),
        OutputFormat::Json => format_json(results),
        OutputFormat::Junit => format_junit(results),
        OutputFormat::Markdown => format_markdown(results),
    }
}

/// Format as human-readable text
fn format_human(results: &[(CheckTarget, CheckResult)]) -> String {
    let mut output = String::new();
    output.push_str("Running behavior-lock checks...\n\n");

    for (target, result) in results {
        output.push_str(&format!(
            "{}::{} : {} [{}]\n",
            target.file_path.display(),
            target.contract,
            target.behavior,
            short(&target.fingerprint)
        ));

        match result {
            CheckResult::Passed { traces } => {
                output.push_str(&format!("  PASS ({} traces)\n", traces));
            }
            CheckResult::Failed { diagnostic, .. } => {
                output.push_str("  FAIL\n");
                for line in diagnostic.to_string().lines() {
                    output.push_str(&format!("    {}\n", line));
                }
            }
            CheckResult::DefinitionError(reason) => {
                output.push_str(&format!("  DEFINITION ERROR: {}\n", reason));
            }
            CheckResult::Inconclusive(reason) => {
                output.push_str(&format!("  INCONCLUSIVE: {}\n", reason));
            }
        }
        output.push('\n');
    }

    let c = counts(results);
    let ok = c.failed == 0 && c.definition_errors == 0 && c.inconclusive == 0;
    output.push_str(&format!(
        "check result: {}. {} passed; {} failed; {} definition errors; {} inconclusive\n",
        if ok { "ok" } else { "FAILED" },
        c.passed,
        c.failed,
        c.definition_errors,
        c.inconclusive
    ));

    output
}

/// Format as JSON
fn format_json(results: &[(CheckTarget, CheckResult)]) -> String {
    let c = counts(results);

    let mut json_results = Vec::new();
    for (target, result) in results {
        let mut obj = json!({
            "file": target.file_path.to_string_lossy(),
            "contract": target.contract,
            "behavior": target.behavior,
            "fingerprint": target.fingerprint,
            "status": result.status(),
        });

        match result {
            CheckResult::Passed { traces } => {
                obj["traces"] = json!(traces);
            }
            CheckResult::Failed { traces, diagnostic } => {
                obj["traces"] = json!(traces);
                obj["diagnostic"] = json!(diagnostic);
            }
            CheckResult::DefinitionError(reason) | CheckResult::Inconclusive(reason) => {
                obj["reason"] = json!(reason);
            }
        }

        json_results.push(obj);
    }

    let output = json!({
        "summary": {
            "total": results.len(),
            "passed": c.passed,
            "failed": c.failed,
            "definition_errors": c.definition_errors,
            "inconclusive": c.inconclusive,
        },
        "results": json_results,
    });

    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Format as JUnit XML
fn format_junit(results: &[(CheckTarget, CheckResult)]) -> String {
    let c = counts(results);
    let total = results.len();

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        xml,
        "<testsuites name=\"behavior-lock\" tests=\"{}\" failures=\"{}\" errors=\"{}\">",
        total,
        c.failed,
        c.definition_errors + c.inconclusive
    );
    let _ = writeln!(
        xml,
        "  <testsuite name=\"behavioral-types\" tests=\"{}\" failures=\"{}\" errors=\"{}\">",
        total,
        c.failed,
        c.definition_errors + c.inconclusive
    );

    for (target, result) in results {
        let classname = target
            .file_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown");

        let _ = writeln!(
            xml,
            "    <testcase name=\"{}\" classname=\"{}\">",
            xml_escape(&target.contract),
            xml_escape(classname)
        );
        let _ = writeln!(
            xml,
            "      <properties>\n        <property name=\"behavior\" value=\"{}\"/>\n        <property name=\"fingerprint\" value=\"{}\"/>\n      </properties>",
            xml_escape(&target.behavior),
            target.fingerprint
        );

        match result {
            CheckResult::Passed { .. } => {}
            CheckResult::Failed { diagnostic, .. } => {
                let _ = writeln!(
                    xml,
                    "      <failure message=\"{}\">{}</failure>",
                    xml_escape(&diagnostic.summary()),
                    xml_escape(&diagnostic.to_string())
                );
            }
            CheckResult::DefinitionError(reason) => {
                let _ = writeln!(xml, "      <error type=\"definition\" message=\"{}\"/>", xml_escape(reason));
            }
            CheckResult::Inconclusive(reason) => {
                let _ = writeln!(xml, "      <error type=\"inconclusive\" message=\"{}\"/>", xml_escape(reason));
            }
        }

        xml.push_str("    </testcase>\n");
    }

    xml.push_str("  </testsuite>\n");
    xml.push_str("</testsuites>\n");

    xml
}

/// Format as Markdown
fn format_markdown(results: &[(CheckTarget, CheckResult)]) -> String {
    let c = counts(results);
    let mut md = String::new();

    md.push_str("# Behavior Lock Report\n\n");
    md.push_str("## Summary\n\n");
    md.push_str(&format!("- **Total contracts:** {}\n", results.len()));
    md.push_str(&format!("- **Passed:** {}\n", c.passed));
    md.push_str(&format!("- **Failed:** {}\n", c.failed));
    md.push_str(&format!("- **Definition errors:** {}\n", c.definition_errors));
    md.push_str(&format!("- **Inconclusive:** {}\n\n", c.inconclusive));

    md.push_str("## Results\n\n");
    md.push_str("| File | Contract | Behavior | Status |\n");
    md.push_str("|------|----------|----------|--------|\n");

    for (target, result) in results {
        let file_name = target
            .file_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown");

        let status = match result {
            CheckResult::Passed { traces } => format!("Passed ({} traces)", traces),
            CheckResult::Failed { .. } => "Failed".to_string(),
            CheckResult::DefinitionError(_) => "Definition error".to_string(),
            CheckResult::Inconclusive(_) => "Inconclusive".to_string(),
        };

        md.push_str(&format!(
            "| `{}` | `{}` | `{}` | {} |\n",
            file_name, target.contract, target.behavior, status
        ));
    }

    let problems: Vec<_> = results
        .iter()
        .filter(|(_, r)| !matches!(r, CheckResult::Passed { .. }))
        .collect();

    if !problems.is_empty() {
        md.push_str("\n## Problems\n\n");
        for (target, result) in problems {
            md.push_str(&format!("### `{}::{}`\n\n", target.file_path.display(), target.contract));
            match result {
                CheckResult::Failed { diagnostic, .. } => {
                    md.push_str("```text\n");
                    md.push_str(&diagnostic.to_string());
                    md.push_str("\n```\n\n");
                }
                CheckResult::DefinitionError(reason) | CheckResult::Inconclusive(reason) => {
                    md.push_str(&format!("- **Reason:** {}\n\n", reason));
                }
                CheckResult::Passed { .. } => {}
            }
        }
    }

    md
}

/// Render an extracted trace set
pub fn format_traces(contract: &str, traces: &TraceSet, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            let rendered: Vec<Vec<String>> = traces
                .iter()
                .map(|t| t.iter().map(|e| e.to_string()).collect())
                .collect();
            let output = json!({
                "contract": contract,
                "count": traces.len(),
                "traces": rendered,
            });
            serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
        }
        _ => {
            let mut output = format!("{}: {} traces\n", contract, traces.len());
            for (i, trace) in traces.iter().enumerate() {
                output.push_str(&format!("  {:>4}. {}\n", i + 1, render_trace(trace)));
            }
            output
        }
    }
}

/// Render the contracts of every loaded document
pub fn format_listing(documents: &[LoadedDocument]) -> String {
    let mut output = String::new();
    for doc in documents {
        output.push_str(&format!("{}\n", doc.path.display()));
        for contract in doc.module.contracts() {
            output.push_str(&format!(
                "  {}({}) : {}\n",
                contract.name,
                contract.params.join(", "),
                contract.behavior.as_deref().unwrap_or("-")
            ));
        }
        for decl in doc.module.types() {
            output.push_str(&format!("  type {} = {}\n", decl.name, decl.body));
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use behavior_lock::Diagnostic;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn results() -> Vec<(CheckTarget, CheckResult)> {
        let target = |name: &str| CheckTarget {
            file_path: PathBuf::from("notes/bank.md"),
            document: 0,
            contract: name.to_string(),
            behavior: "BankType".to_string(),
            fingerprint: "0123456789abcdef".to_string(),
        };
        vec![
            (target("Cell"), CheckResult::Passed { traces: 4 }),
            (
                target("TokenBank"),
                CheckResult::Failed {
                    traces: 3,
                    diagnostic: Box::new(Diagnostic {
                        contract: "TokenBank".into(),
                        behavior: "BankType".into(),
                        trace: vec!["withdraw?".into(), "recurse TokenBank(balance, withdraw)".into()],
                        position: 1,
                        state: vec!["updateAck.X".into()],
                        expected: BTreeSet::from(["updateAck".to_string()]),
                        observed: "recurse TokenBank(balance, withdraw)".into(),
                    }),
                },
            ),
            (target("Spin"), CheckResult::Inconclusive("trace set exceeded the budget".into())),
        ]
    }

    #[test]
    fn test_human_summary() {
        let text = format_results(&results(), OutputFormat::Human);
        assert!(text.contains("notes/bank.md::Cell : BankType [0123456789ab]"));
        assert!(text.contains("  PASS (4 traces)"));
        assert!(text.contains("expected one of {updateAck}"));
        assert!(text.ends_with("check result: FAILED. 1 passed; 1 failed; 0 definition errors; 1 inconclusive\n"));
    }

    #[test]
    fn test_json_report() {
        let text = format_results(&results(), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["summary"]["failed"], 1);
        assert_eq!(value["results"][1]["status"], "failed");
        assert_eq!(value["results"][1]["diagnostic"]["position"], 1);
        assert_eq!(value["results"][2]["status"], "inconclusive");
    }

    #[test]
    fn test_junit_escapes() {
        let xml = format_results(&results(), OutputFormat::Junit);
        assert!(xml.contains("tests=\"3\" failures=\"1\" errors=\"1\""));
        assert!(xml.contains("<failure message=\"expected one of {updateAck}"));
        assert!(!xml.contains(">>> "));
        assert!(xml.contains("&gt;&gt;&gt;"));
    }

    #[test]
    fn test_markdown_lists_problems() {
        let md = format_results(&results(), OutputFormat::Markdown);
        assert!(md.contains("| `bank.md` | `Cell` | `BankType` | Passed (4 traces) |"));
        assert!(md.contains("### `notes/bank.md::TokenBank`"));
        assert!(md.contains("### `notes/bank.md::Spin`"));
    }
}
