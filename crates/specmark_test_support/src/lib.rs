use std::fmt::Write;

pub mod fixture;

#[cfg(feature = "nodes")]
pub mod fixture_config;

#[cfg(feature = "nodes")]
pub mod node_snapshot;

/// Human-readable report of where two snapshots diverge, with two lines
/// of context either side of the first difference.
pub fn diff_lines(expected: &[String], actual: &[String]) -> String {
    const MISSING: &str = "<missing>";
    let line_at = |lines: &[String], idx: usize| -> String {
        lines.get(idx).cloned().unwrap_or_else(|| MISSING.to_string())
    };

    let total = expected.len().max(actual.len());
    let first_diff = (0..total).find(|&i| expected.get(i) != actual.get(i));
    let mut out = String::new();
    match first_diff {
        Some(i) => {
            let from = i.saturating_sub(2);
            let to = (i + 3).min(total);
            let _ = writeln!(out, "first difference at line {}:", i + 1);
            for idx in from..to {
                let marker = if idx == i { '>' } else { ' ' };
                let _ = writeln!(out, "{marker} {:>4} expected: {}", idx + 1, line_at(expected, idx));
                let _ = writeln!(out, "{marker} {:>4}   actual: {}", idx + 1, line_at(actual, idx));
            }
        }
        None => {
            let _ = writeln!(out, "snapshots are identical");
        }
    }
    let _ = writeln!(
        out,
        "expected {} lines, actual {} lines",
        expected.len(),
        actual.len()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn diff_points_at_first_mismatch() {
        let report = diff_lines(&lines(&["a", "b", "c"]), &lines(&["a", "x", "c"]));
        assert!(report.contains("first difference at line 2"));
        assert!(report.contains(">    2   actual: x"));
    }

    #[test]
    fn diff_reports_missing_lines() {
        let report = diff_lines(&lines(&["a", "b"]), &lines(&["a"]));
        assert!(report.contains("actual: <missing>"));
        assert!(report.contains("expected 2 lines, actual 1 lines"));
    }
}
