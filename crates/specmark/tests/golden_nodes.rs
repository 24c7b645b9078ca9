use std::path::{Path, PathBuf};

use specmark::ParseConfig;
use specmark_test_support::diff_lines;
use specmark_test_support::fixture::{Fixture, FixtureFilter, FixtureStatus, load_fixtures};
use specmark_test_support::fixture_config::FixtureConfig;
use specmark_test_support::node_snapshot::{check_diagnostics, run_nodes};

fn fixture_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("nodes")
}

fn parse_config(fixture: &Fixture) -> ParseConfig {
    let Some(text) = &fixture.config_toml else {
        return ParseConfig::default();
    };
    FixtureConfig::from_toml(text)
        .unwrap_or_else(|err| panic!("invalid config.toml in '{}': {err}", fixture.name))
        .to_parse_config()
        .unwrap_or_else(|err| panic!("bad parser settings in '{}': {err}", fixture.name))
}

#[test]
fn golden_node_snapshots() {
    let filter = FixtureFilter::from_env();
    let mut ran = 0usize;
    for fixture in load_fixtures(&fixture_root()) {
        if !filter.matches(&fixture.name) {
            continue;
        }
        ran += 1;
        if fixture.expected.status == FixtureStatus::Skip {
            continue;
        }
        let config = parse_config(&fixture);
        let run = run_nodes(&fixture.input, &config);

        let mut problems = Vec::new();
        if run.lines != fixture.expected.lines {
            problems.push(diff_lines(&fixture.expected.lines, &run.lines));
        }
        if let Some(count) = fixture.expected.diagnostic_count
            && count != run.diagnostics.len()
        {
            problems.push(format!(
                "expected {count} diagnostics, got {}: {:?}",
                run.diagnostics.len(),
                run.diagnostics
            ));
        }
        if let Some(expected) = &fixture.diagnostics
            && let Err(err) = check_diagnostics(expected, &run.diagnostics)
        {
            problems.push(err);
        }

        match fixture.expected.status {
            FixtureStatus::Active if !problems.is_empty() => panic!(
                "node mismatch in fixture '{}'\npath: {}\n{}",
                fixture.name,
                fixture.dir.display(),
                problems.join("\n")
            ),
            FixtureStatus::Xfail if problems.is_empty() => panic!(
                "fixture '{}' matched but is marked xfail; reason: {}",
                fixture.name,
                fixture.expected.reason.as_deref().unwrap_or("<missing reason>")
            ),
            _ => {}
        }
    }
    assert!(ran > 0, "no fixtures matched filter");
}
