//! Configuration types for opening a repository.

use crate::codec::{Codec, Format};
use crate::resolver::DEFAULT_MAX_DEPTH;
use serde::{Deserialize, Serialize};

/// The `[repository]` section of the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Record encoding.
    pub format: Format,

    /// Maximum number of directories inspected during root discovery.
    pub max_depth: usize,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            format: Format::Yaml,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl RepositoryConfig {
    /// Builds engine options from this section.
    pub fn open_options(&self) -> OpenOptions {
        OpenOptions::new()
            .with_codec(self.format.codec())
            .with_max_depth(self.max_depth)
    }
}

/// Options used when binding a handle to a repository.
#[derive(Debug)]
pub struct OpenOptions {
    pub(crate) codec: Box<dyn Codec>,
    pub(crate) max_depth: usize,
}

impl OpenOptions {
    /// YAML records and the default search bound.
    pub fn new() -> Self {
        Self {
            codec: Format::Yaml.codec(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Uses `codec` for reading and writing records.
    pub fn with_codec(mut self, codec: Box<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    /// Sets the root discovery bound.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self::new()
    }
}
