// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Filesystem-backed rule document source.

use std::fs;
use std::path::{Path, PathBuf};

use collide_core::{RuleSource, SourceError};

/// Reads the rule document from a path on every load.
#[derive(Debug, Clone)]
pub struct FsRuleSource {
    path: PathBuf,
}

impl FsRuleSource {
    /// Source backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RuleSource for FsRuleSource {
    fn load_raw(&self) -> Result<Vec<u8>, SourceError> {
        read_document(&self.path)
    }
}

pub(crate) fn read_document(path: &Path) -> Result<Vec<u8>, SourceError> {
    fs::read(path).map_err(|source| SourceError::Io {
        path: path.display().to_string(),
        source,
    })
}
