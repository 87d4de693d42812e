//! Configuration of tables, parsers and full-text evaluation.
//!
//! Options are plain data with `Default` values and fluent setters; they
//! serialize with `serde` so hosts can keep them in their own configuration
//! files.

use serde::{Deserialize, Serialize};

use crate::consts::INLINE_TEXT;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Maximum number of addressable table positions.
    pub max_nodes: usize,
    /// Content up to this many bytes is stored inline in the node record.
    pub inline_text: usize,
    /// Drop whitespace-only text nodes while parsing.
    pub chop_whitespace: bool,
    /// Ignore namespace declarations and prefixes while parsing.
    pub strip_namespaces: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_nodes: u32::MAX as usize,
            inline_text: INLINE_TEXT,
            chop_whitespace: true,
            strip_namespaces: false,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    pub fn with_inline_text(mut self, bytes: usize) -> Self {
        self.inline_text = bytes;
        self
    }

    pub fn with_chop_whitespace(mut self, chop: bool) -> Self {
        self.chop_whitespace = chop;
        self
    }

    pub fn with_strip_namespaces(mut self, strip: bool) -> Self {
        self.strip_namespaces = strip;
        self
    }
}

/// Case handling of the full-text lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FtCase {
    #[default]
    Insensitive,
    Sensitive,
    Lower,
    Upper,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FtOptions {
    pub case: FtCase,
    pub diacritics_sensitive: bool,
}

impl FtOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_case(mut self, case: FtCase) -> Self {
        self.case = case;
        self
    }

    pub fn with_diacritics_sensitive(mut self, sensitive: bool) -> Self {
        self.diacritics_sensitive = sensitive;
        self
    }
}
