//! The record linter.

use crate::config::LintConfig;
use crate::models::{LintError, Rule, Violation, DOCUMENT_FIELD};
use oniontree_repo::{Codec, PublicKey, Service, YamlCodec};
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;
use url::Url;

/// Onion host: optional subdomains, then a v2 (16 chars) or v3 (56 chars)
/// base32 service name.
const ONION_HOST: &str = r"^(?:[a-z0-9-]+\.)*(?:[a-z2-7]{16}|[a-z2-7]{56})\.onion$";

/// Validates service records.
///
/// # Example
///
/// ```rust
/// use oniontree_lint::{LintConfig, Linter};
///
/// let linter = Linter::new(LintConfig::default()).unwrap();
/// let raw = b"name: Example\nurls:\n- http://expyuzz4wqqyqhjn.onion\n";
/// assert!(linter.lint_raw(raw).is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct Linter {
    config: LintConfig,
    onion_host: Regex,
}

impl Linter {
    /// Creates a linter with the given rule switches.
    ///
    /// # Errors
    ///
    /// Fails only if the built-in host pattern does not compile.
    pub fn new(config: LintConfig) -> Result<Self, regex::Error> {
        Ok(Linter {
            config,
            onion_host: Regex::new(ONION_HOST)?,
        })
    }

    /// Lints the raw bytes of a record.
    ///
    /// A record that does not decode yields a single `Syntax` violation and
    /// no further rules run.
    pub fn lint_raw(&self, raw: &[u8]) -> Result<(), LintError> {
        match YamlCodec.decode(raw) {
            Ok(service) => self.lint(&service),
            Err(err) => Err(LintError {
                violations: vec![Violation::new(
                    Rule::Syntax,
                    DOCUMENT_FIELD,
                    err.to_string(),
                )],
            }),
        }
    }

    /// Lints a decoded record. All rules run and every violation is
    /// reported.
    pub fn lint(&self, service: &Service) -> Result<(), LintError> {
        let mut violations = Vec::new();

        if service.name.trim().is_empty() {
            violations.push(Violation::new(Rule::Name, "name", "must not be blank"));
        }
        self.check_urls(&service.urls, &mut violations);
        check_public_keys(&service.public_keys, &mut violations);
        if !self.config.allow_unknown_fields {
            for field in service.extra.keys() {
                violations.push(Violation::new(
                    Rule::UnknownField,
                    field.as_str(),
                    "unknown field",
                ));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            debug!(count = violations.len(), "record failed lint");
            Err(LintError { violations })
        }
    }

    fn check_urls(&self, urls: &[String], violations: &mut Vec<Violation>) {
        if urls.is_empty() {
            violations.push(Violation::new(
                Rule::Urls,
                "urls",
                "at least one URL is required",
            ));
            return;
        }

        let mut seen = HashSet::new();
        for (i, raw) in urls.iter().enumerate() {
            let field = format!("urls[{}]", i);
            if !seen.insert(raw.as_str()) {
                violations.push(Violation::new(
                    Rule::Urls,
                    field,
                    format!("duplicate URL {}", raw),
                ));
                continue;
            }

            let url = match Url::parse(raw) {
                Ok(url) => url,
                Err(err) => {
                    violations.push(Violation::new(
                        Rule::Urls,
                        field,
                        format!("invalid URL {}: {}", raw, err),
                    ));
                    continue;
                }
            };

            if !matches!(url.scheme(), "http" | "https") {
                violations.push(Violation::new(
                    Rule::Urls,
                    field,
                    format!("unsupported scheme {} in {}", url.scheme(), raw),
                ));
                continue;
            }

            if self.config.require_onion_urls {
                let onion = url
                    .host_str()
                    .map(|host| self.onion_host.is_match(host))
                    .unwrap_or(false);
                if !onion {
                    violations.push(Violation::new(
                        Rule::Urls,
                        field,
                        format!("{} is not an onion address", raw),
                    ));
                }
            }
        }
    }
}

fn check_public_keys(keys: &[PublicKey], violations: &mut Vec<Violation>) {
    for (i, key) in keys.iter().enumerate() {
        let field = format!("public_keys[{}]", i);
        if key.value.trim().is_empty() {
            violations.push(Violation::new(
                Rule::PublicKeys,
                field,
                "value must not be blank",
            ));
            continue;
        }

        let parsed = match oniontree_keys::parse(&key.value) {
            Ok(parsed) => parsed,
            Err(err) => {
                violations.push(Violation::new(Rule::PublicKeys, field, err.to_string()));
                continue;
            }
        };

        if !key.fingerprint.is_empty()
            && !key.fingerprint.eq_ignore_ascii_case(&parsed.fingerprint)
        {
            violations.push(Violation::new(
                Rule::PublicKeys,
                field.clone(),
                format!(
                    "fingerprint {} does not match key ({})",
                    key.fingerprint, parsed.fingerprint
                ),
            ));
        }
        if !key.id.is_empty() && !key.id.eq_ignore_ascii_case(&parsed.id) {
            violations.push(Violation::new(
                Rule::PublicKeys,
                field,
                format!("id {} does not match key ({})", key.id, parsed.id),
            ));
        }
    }
}
