//! Golden fixture loading.
//!
//! A fixture is a directory holding `input.bs`, the expected `nodes.txt`
//! snapshot, and optionally `config.toml` (parser settings) and
//! `diagnostics.json` (expected reports).

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const NODE_FORMAT_V1: &str = "specmark-node-v1";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FixtureStatus {
    Active,
    Xfail,
    Skip,
}

#[derive(Debug)]
pub struct ExpectedNodes {
    pub status: FixtureStatus,
    pub reason: Option<String>,
    /// From the `# diagnostics: N` header.
    pub diagnostic_count: Option<usize>,
    pub lines: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ExpectedDiagnostic {
    /// `"error"` or `"warning"`.
    pub severity: String,
    /// Substring the reported message must contain.
    pub contains: String,
}

#[derive(Debug)]
pub struct Fixture {
    pub name: String,
    pub dir: PathBuf,
    pub input: String,
    pub config_toml: Option<String>,
    pub expected: ExpectedNodes,
    pub diagnostics: Option<Vec<ExpectedDiagnostic>>,
}

pub fn load_fixtures(root: &Path) -> Vec<Fixture> {
    let mut entries: Vec<_> = fs::read_dir(root)
        .unwrap_or_else(|err| panic!("failed to read fixture root {root:?}: {err}"))
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .collect();
    entries.sort_by_key(|entry| entry.file_name());

    let mut fixtures = Vec::with_capacity(entries.len());
    for entry in entries {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        assert_eq!(
            name,
            name.trim(),
            "fixture directory has leading/trailing whitespace"
        );
        let dir = entry.path();
        let input = read_required(&dir.join("input.bs"));
        let expected = parse_expected_nodes(&read_required(&dir.join("nodes.txt")), &dir);
        let config_toml = read_optional(&dir.join("config.toml"));
        let diagnostics = read_optional(&dir.join("diagnostics.json")).map(|json| {
            serde_json::from_str(&json)
                .unwrap_or_else(|err| panic!("invalid diagnostics.json in {dir:?}: {err}"))
        });
        fixtures.push(Fixture {
            name,
            dir,
            input,
            config_toml,
            expected,
            diagnostics,
        });
    }
    fixtures
}

fn read_required(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|err| panic!("failed to read {path:?}: {err}"))
}

fn read_optional(path: &Path) -> Option<String> {
    path.exists().then(|| read_required(path))
}

/// Splits a `nodes.txt` file into `# key: value` headers and snapshot lines.
pub fn parse_expected_nodes(content: &str, origin: &Path) -> ExpectedNodes {
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    let mut lines = Vec::new();
    for raw in content.lines() {
        let line = raw.trim_end();
        if line.is_empty() {
            continue;
        }
        let Some(header) = line.strip_prefix('#') else {
            lines.push(line.to_string());
            continue;
        };
        let header = header.trim();
        if header.is_empty() {
            continue;
        }
        let (key, value) = header
            .split_once(':')
            .unwrap_or_else(|| panic!("invalid header in {origin:?}: '{line}'"));
        let key = key.trim().to_ascii_lowercase();
        if headers.insert(key.clone(), value.trim().to_string()).is_some() {
            panic!("duplicate header '{key}' in {origin:?}");
        }
    }

    let format = headers
        .get("format")
        .unwrap_or_else(|| panic!("missing format header in {origin:?}"));
    assert_eq!(format, NODE_FORMAT_V1, "unsupported format in {origin:?}");

    let status = match headers.get("status").map(String::as_str) {
        Some("active") | None => FixtureStatus::Active,
        Some("xfail") => FixtureStatus::Xfail,
        Some("skip") => FixtureStatus::Skip,
        Some(other) => panic!("unsupported status '{other}' in {origin:?}"),
    };
    let reason = headers.get("reason").cloned();
    if status != FixtureStatus::Active && reason.as_deref().unwrap_or("").is_empty() {
        panic!("non-active fixture missing reason in {origin:?}");
    }
    let diagnostic_count = headers.get("diagnostics").map(|value| {
        value
            .parse()
            .unwrap_or_else(|_| panic!("diagnostics header must be a count in {origin:?}"))
    });

    ExpectedNodes {
        status,
        reason,
        diagnostic_count,
        lines,
    }
}

/// Restricts a run to fixtures whose name contains `$SPECMARK_NODE_FIXTURE`.
pub struct FixtureFilter {
    raw: Option<String>,
}

impl FixtureFilter {
    pub fn from_env() -> Self {
        Self {
            raw: env::var("SPECMARK_NODE_FIXTURE").ok(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.raw.as_deref().is_none_or(|filter| name.contains(filter))
    }
}
