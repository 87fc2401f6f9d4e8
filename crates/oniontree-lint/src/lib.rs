//! # OnionTree Lint
//!
//! Checks service records beyond what the engine enforces. The engine only
//! needs a record to decode; the linter checks that it is useful: a name, at
//! least one reachable onion URL, and public keys whose stored identity
//! matches the key material.
//!
//! ## Rules
//!
//! ```text
//!   raw bytes ──▶ syntax ──✗──▶ LintError [Syntax]   (nothing else runs)
//!                   │
//!                   ✓
//!                   ▼
//!   ┌──────┬──────┬─────────────┬───────────────┐
//!   │ name │ urls │ public_keys │ unknown field │   all run, all reported
//!   └──────┴──────┴─────────────┴───────────────┘
//! ```
//!
//! See [`models`] for the field each rule reports against.

pub mod config;
pub mod linter;
pub mod models;

pub use config::LintConfig;
pub use linter::Linter;
pub use models::{LintError, Rule, Violation};
