use specmark::{Diagnostic, Diagnostics, ParseConfig, Severity, format_nodes, nodes_from_html};

use crate::fixture::ExpectedDiagnostic;

pub struct NodeRun {
    pub lines: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parses a fixture as a whole document fragment, closing what is left open.
pub fn run_nodes(input: &str, config: &ParseConfig) -> NodeRun {
    let diags = Diagnostics::new();
    let nodes = nodes_from_html(input, config, &diags, 1, true);
    NodeRun {
        lines: format_nodes(&nodes),
        diagnostics: diags.take(),
    }
}

/// Checks reports in order against `expected`; extra or missing reports fail.
pub fn check_diagnostics(
    expected: &[ExpectedDiagnostic],
    actual: &[Diagnostic],
) -> Result<(), String> {
    if expected.len() != actual.len() {
        return Err(format!(
            "expected {} diagnostics, got {}:\n{}",
            expected.len(),
            actual.len(),
            render(actual)
        ));
    }
    for (i, (want, got)) in expected.iter().zip(actual).enumerate() {
        let severity = match got.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        if want.severity != severity || !got.message.contains(&want.contains) {
            return Err(format!(
                "diagnostic #{i} mismatch: wanted {} containing '{}', got {got}",
                want.severity, want.contains
            ));
        }
    }
    Ok(())
}

fn render(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| format!("  {d}"))
        .collect::<Vec<_>>()
        .join("\n")
}
