//! Parser configuration.
//!
//! All fields default to "inactive": no predefined macros, no extra include
//! directories, no length limits, and preprocessing decided by the
//! uppercase-extension heuristic.

use std::collections::HashMap;
use std::error::Error;
use std::fmt::Display;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    /// Preprocessor definitions seeded into every parse.
    pub pp_defs: HashMap<String, String>,
    /// Ordered search path for `#include`; the file's own directory is
    /// always consulted first.
    pub include_dirs: Vec<PathBuf>,
    /// Extensions (with dot, e.g. `.F90`) that force preprocessing. When
    /// empty, files with an all-uppercase extension are preprocessed.
    pub pp_suffixes: Vec<String>,
    /// Maximum code line length; `None` disables the check.
    pub max_line_length: Option<usize>,
    /// Maximum comment line length; `None` disables the check.
    pub max_comment_line_length: Option<usize>,
}

#[derive(Debug)]
pub struct ConfigError(String);

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid configuration: {}", self.0)
    }
}

impl Error for ConfigError {}

impl ParseConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError(e.to_string()))
    }
}
