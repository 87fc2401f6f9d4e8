//! # Record Codec
//!
//! Converts a [`Service`] to and from the bytes stored in the record store.
//! The engine never interprets record bytes itself; it hands them to the
//! codec it was opened with.
//!
//! ## Contract
//!
//! - `decode(encode(s)) == s` on every populated field (the ID excepted, it
//!   lives in the filename).
//! - Unknown fields decode into [`Service::extra`] instead of failing, and are
//!   written back unchanged.
//!
//! Only YAML is supported today. Configuration names a format with
//! [`Format`]; code that needs a different encoding can pass its own
//! [`Codec`] through [`OpenOptions`](crate::OpenOptions).

use crate::error::{RepoError, Result};
use crate::models::Service;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;

/// Error produced by a codec, whatever the encoding.
pub type CodecError = Box<dyn StdError + Send + Sync>;

/// Encodes and decodes records.
pub trait Codec: fmt::Debug + Send + Sync {
    /// Filename extension for records in this encoding, without the dot.
    fn extension(&self) -> &'static str;

    /// Encodes a record.
    fn encode(&self, service: &Service) -> Result<Vec<u8>>;

    /// Decodes a record. The returned value has an empty ID.
    fn decode(&self, bytes: &[u8]) -> std::result::Result<Service, CodecError>;
}

/// Record encodings that can be named in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Format {
    /// Human-readable YAML documents (`.yaml`).
    #[default]
    Yaml,
}

impl Format {
    /// Returns the codec implementing this format.
    pub fn codec(self) -> Box<dyn Codec> {
        match self {
            Format::Yaml => Box::new(YamlCodec),
        }
    }

    /// Filename extension used by this format.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Yaml => "yaml",
        }
    }
}

impl FromStr for Format {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Format::Yaml),
            other => Err(RepoError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl TryFrom<String> for Format {
    type Error = RepoError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Format> for String {
    fn from(format: Format) -> Self {
        format.to_string()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// The default YAML codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn extension(&self) -> &'static str {
        Format::Yaml.extension()
    }

    fn encode(&self, service: &Service) -> Result<Vec<u8>> {
        serde_yaml::to_string(service)
            .map(String::into_bytes)
            .map_err(|err| RepoError::Encode(err.into()))
    }

    fn decode(&self, bytes: &[u8]) -> std::result::Result<Service, CodecError> {
        Ok(serde_yaml::from_slice(bytes)?)
    }
}
