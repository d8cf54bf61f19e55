//! Configuration for reading and writing Visio packages.
//!
//! Options for the package codec: archive compression, how strictly a loaded
//! package is validated, where the working directory lives, and the numbering
//! conventions used for new pages.
//!
//! # Examples
//!
//! ```rust
//! use vsdx::visio::{CodecOptions, Compression};
//!
//! let options = CodecOptions::new()
//!     .with_compression(Compression::Stored)
//!     .with_strict(false);
//! assert!(!options.strict);
//! ```

use crate::opc::allocator::PartAllocator;
use crate::visio::error::{Result, VisioError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Compression method for written archive members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Deflate every member
    #[default]
    Deflated,
    /// Store members uncompressed
    Stored,
}

impl Compression {
    pub(crate) fn method(self) -> zip::CompressionMethod {
        match self {
            Compression::Deflated => zip::CompressionMethod::Deflated,
            Compression::Stored => zip::CompressionMethod::Stored,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    /// Compression for written archive members
    pub compression: Compression,
    /// Abort loading on dangling relationships and unresolved content types.
    /// When disabled these are logged and tolerated; saving always checks them.
    pub strict: bool,
    /// Explicit working directory; must not exist yet
    pub workdir: Option<PathBuf>,
    /// Numbering conventions for page ids, relationship ids and page filenames
    pub numbering: PartAllocator,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            compression: Compression::Deflated,
            strict: true,
            workdir: None,
            numbering: PartAllocator::default(),
        }
    }
}

impl CodecOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    #[inline]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Use `path` as the working directory instead of a fresh temp directory.
    ///
    /// Load and save fail with an output conflict if `path` already exists.
    #[inline]
    pub fn with_workdir(mut self, path: impl Into<PathBuf>) -> Self {
        self.workdir = Some(path.into());
        self
    }

    #[inline]
    pub fn with_numbering(mut self, numbering: PartAllocator) -> Self {
        self.numbering = numbering;
        self
    }

    /// Load options from YAML. Missing keys take their default values.
    ///
    /// ```rust
    /// use vsdx::visio::CodecOptions;
    ///
    /// let options = CodecOptions::from_yaml_str("strict: false\ncompression: stored\n").unwrap();
    /// assert!(!options.strict);
    /// ```
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_saphyr::from_str(yaml)
            .map_err(|e| VisioError::Config(format!("Failed to parse codec options: {}", e)))
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_saphyr::to_string(self)
            .map_err(|e| VisioError::Config(format!("Failed to serialize codec options: {}", e)))
    }
}
