//! Mapping comparison.
//!
//! The diff walks both mappings recursively and records every divergent
//! node. Object keys are compared over the union of both key sets and arrays
//! index by index, so swapping the arguments yields the same set of paths.

use std::fmt;

use search_client::SearchClient;
use serde_json::Value;

use crate::error::VerifyError;
use crate::report::{Outcome, Verdict};
use crate::reporter::{ReportEvent, Reporter};

/// How a node differs between the two mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifferenceKind {
    /// Same JSON type, different value.
    ValueChanged,
    /// Different JSON types.
    TypeChanged,
    /// Present only on the expected (source) side.
    Removed,
    /// Present only on the actual (destination) side.
    Added,
}

impl DifferenceKind {
    fn mirrored(self) -> Self {
        match self {
            Self::Removed => Self::Added,
            Self::Added => Self::Removed,
            other => other,
        }
    }
}

/// One divergent node.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDifference {
    /// JSON pointer to the node; empty for the root.
    pub path: String,
    pub kind: DifferenceKind,
    pub expected: Option<Value>,
    pub actual: Option<Value>,
}

impl SchemaDifference {
    /// The same difference seen from the other side.
    pub fn mirrored(&self) -> Self {
        Self {
            path: self.path.clone(),
            kind: self.kind.mirrored(),
            expected: self.actual.clone(),
            actual: self.expected.clone(),
        }
    }
}

impl fmt::Display for SchemaDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { self.path.as_str() };
        let show = |v: &Option<Value>| match v {
            Some(v) => v.to_string(),
            None => "<absent>".to_string(),
        };
        write!(
            f,
            "{path}: expected {}, found {}",
            show(&self.expected),
            show(&self.actual)
        )
    }
}

/// Compute every divergent node between two mappings.
pub fn diff_mappings(expected: &Value, actual: &Value) -> Vec<SchemaDifference> {
    let mut differences = Vec::new();
    diff_node(String::new(), expected, actual, &mut differences);
    differences
}

fn diff_node(path: String, expected: &Value, actual: &Value, out: &mut Vec<SchemaDifference>) {
    match (expected, actual) {
        (Value::Object(e), Value::Object(a)) => {
            let mut keys: Vec<&String> = e.keys().chain(a.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let child = format!("{path}/{}", escape_pointer(key));
                match (e.get(key.as_str()), a.get(key.as_str())) {
                    (Some(ev), Some(av)) => diff_node(child, ev, av, out),
                    (Some(ev), None) => out.push(SchemaDifference {
                        path: child,
                        kind: DifferenceKind::Removed,
                        expected: Some(ev.clone()),
                        actual: None,
                    }),
                    (None, Some(av)) => out.push(SchemaDifference {
                        path: child,
                        kind: DifferenceKind::Added,
                        expected: None,
                        actual: Some(av.clone()),
                    }),
                    (None, None) => {}
                }
            }
        }
        (Value::Array(e), Value::Array(a)) => {
            for i in 0..e.len().max(a.len()) {
                let child = format!("{path}/{i}");
                match (e.get(i), a.get(i)) {
                    (Some(ev), Some(av)) => diff_node(child, ev, av, out),
                    (Some(ev), None) => out.push(SchemaDifference {
                        path: child,
                        kind: DifferenceKind::Removed,
                        expected: Some(ev.clone()),
                        actual: None,
                    }),
                    (None, Some(av)) => out.push(SchemaDifference {
                        path: child,
                        kind: DifferenceKind::Added,
                        expected: None,
                        actual: Some(av.clone()),
                    }),
                    (None, None) => {}
                }
            }
        }
        (e, a) if e == a => {}
        (e, a) => {
            let kind = if json_type(e) == json_type(a) {
                DifferenceKind::ValueChanged
            } else {
                DifferenceKind::TypeChanged
            };
            out.push(SchemaDifference {
                path,
                kind,
                expected: Some(e.clone()),
                actual: Some(a.clone()),
            });
        }
    }
}

fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Fetch both mappings, diff them, and report the verdict plus every
/// difference.
pub async fn compare_mappings<S, D>(
    source: &S,
    source_index: &str,
    destination: &D,
    destination_index: &str,
    reporter: &dyn Reporter,
) -> Result<Verdict, VerifyError>
where
    S: SearchClient + ?Sized,
    D: SearchClient + ?Sized,
{
    let expected = source.mapping(source_index).await?;
    let actual = destination.mapping(destination_index).await?;

    let differences = diff_mappings(&expected, &actual);
    let verdict = if differences.is_empty() {
        Verdict::plain(Outcome::Ok, "Index mappings match")
    } else {
        tracing::debug!("Mappings differ at {} nodes", differences.len());
        Verdict::plain(Outcome::Failure, "Index mappings do not match")
    };

    reporter.report(ReportEvent::Verdict(verdict.clone()));
    for difference in differences {
        reporter.report(ReportEvent::SchemaDifference(difference));
    }
    Ok(verdict)
}
