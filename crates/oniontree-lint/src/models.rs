//! # Lint Results
//!
//! A record either passes or fails with a [`LintError`] holding every
//! [`Violation`] found. Violations name the [`Rule`] they broke and the
//! field they were found in, so tools can group or filter them.
//!
//! | Rule | Field | Checked |
//! |------|-------|---------|
//! | `Syntax` | `<document>` | raw bytes decode as a record |
//! | `Name` | `name` | non-blank |
//! | `Urls` | `urls`, `urls[i]` | present, unique, absolute http(s), onion host |
//! | `PublicKeys` | `public_keys[i]` | parses, stored identity matches |
//! | `UnknownField` | the field name | only when unknown fields are disallowed |

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Field name used for violations that concern the whole document.
pub const DOCUMENT_FIELD: &str = "<document>";

/// The rule a violation broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// The record does not decode.
    Syntax,
    /// The service name is missing.
    Name,
    /// A URL is missing, duplicated or not acceptable.
    Urls,
    /// A public key does not parse or its stored identity is stale.
    PublicKeys,
    /// The record carries a field the format does not define.
    UnknownField,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rule::Syntax => "syntax",
            Rule::Name => "name",
            Rule::Urls => "urls",
            Rule::PublicKeys => "public_keys",
            Rule::UnknownField => "unknown_field",
        };
        f.write_str(name)
    }
}

/// A single problem found in a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Rule that was broken.
    pub rule: Rule,

    /// Field the problem was found in.
    pub field: String,

    /// Human-readable description.
    pub message: String,
}

impl Violation {
    /// Creates a violation.
    pub fn new(rule: Rule, field: impl Into<String>, message: impl Into<String>) -> Self {
        Violation {
            rule,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// All violations found in one record.
///
/// Displays as one violation per line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join_lines(.violations))]
pub struct LintError {
    /// Violations in the order the rules found them. Never empty.
    pub violations: Vec<Violation>,
}

impl LintError {
    /// Returns true if any violation broke `rule`.
    pub fn has_rule(&self, rule: Rule) -> bool {
        self.violations.iter().any(|v| v.rule == rule)
    }
}

fn join_lines(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
