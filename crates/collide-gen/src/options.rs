// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Rendering options for the C dispatch table.
//!
//! Options are plain serde values so they can live in a JSON document next to
//! the rule file (`--sink-config`) and still be overridden from the command
//! line. Every field has a default; a partial document is fine.

use std::path::Path;

use collide_core::SourceError;
use serde::{Deserialize, Serialize};

use crate::source::read_document;

/// Target the debug trap is generated for.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Decide at C compile time: trap in debug builds, except on Windows.
    #[default]
    Any,
    /// Known POSIX target: trap in every debug build.
    Posix,
    /// Known Windows target: no `raise(SIGINT)`, so no trap.
    Windows,
}

impl Platform {
    /// Preprocessor condition guarding the trap, or `None` when the platform
    /// cannot raise it.
    pub fn trap_condition(self) -> Option<&'static str> {
        match self {
            Self::Any => Some("defined(DEBUG) && !(defined(__WIN32) || defined(__WIN32__))"),
            Self::Posix => Some("defined(DEBUG)"),
            Self::Windows => None,
        }
    }
}

/// Names the generated table expects from the code that includes it.
///
/// The table never decides which side triggered the collision; the caller
/// hands over both entities and the `first_flag`, and the table only reads
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchContext {
    /// Entity on the first side of the collision.
    pub left: String,
    /// Entity on the second side.
    pub right: String,
    /// Non-zero when `left` triggered first.
    pub first_flag: String,
    /// Macro folding two type tags into one switch key.
    pub merge_macro: String,
    /// Field holding an entity's type tag.
    pub type_field: String,
    /// Field holding an entity's owner; equal owners never collide.
    pub owner_field: String,
    /// Status variable written by every block.
    pub status: String,
    /// Status sentinel for success.
    pub ok: String,
    /// Status reported by the debug trap.
    pub unhandled: String,
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self {
            left: "node1".to_owned(),
            right: "node2".to_owned(),
            first_flag: "isFirstCase".to_owned(),
            merge_macro: "MERGE_TYPES".to_owned(),
            type_field: "type".to_owned(),
            owner_field: "pChild".to_owned(),
            status: "erv".to_owned(),
            ok: "ERR_OK".to_owned(),
            unhandled: "ERR_UNHANDLED_COLLISION".to_owned(),
        }
    }
}

/// Everything the sink needs besides the fragment stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkOptions {
    /// Name printed in the `@file` header line. Per run, never read from a
    /// config document.
    #[serde(skip)]
    pub artifact_name: String,
    /// Rule document named in the header. Per run, like `artifact_name`.
    #[serde(skip)]
    pub source_name: String,
    /// Emit a `default:` branch that traps unhandled pairs in debug builds.
    pub include_debug_trap: bool,
    /// Platform the trap condition is written for.
    pub platform: Platform,
    /// Wrap ignore-mode cases in the trap condition so release builds skip
    /// them and fall through to the silent default.
    pub guard_ignored: bool,
    /// Identifiers used by the generated code.
    pub context: DispatchContext,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            artifact_name: "stdout".to_owned(),
            source_name: "collision.json".to_owned(),
            include_debug_trap: true,
            platform: Platform::default(),
            guard_ignored: true,
            context: DispatchContext::default(),
        }
    }
}

impl SinkOptions {
    /// Load options from a JSON document; absent fields keep their defaults.
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let bytes = read_document(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Condition for the debug trap, or `None` when no trap is emitted.
    pub fn trap_condition(&self) -> Option<&'static str> {
        if self.include_debug_trap {
            self.platform.trap_condition()
        } else {
            None
        }
    }

    /// Condition wrapping ignore-mode cases, or `None` when they are emitted
    /// unconditionally.
    pub fn ignore_guard(&self) -> Option<&'static str> {
        if self.guard_ignored {
            self.trap_condition()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    use super::*;

    #[test]
    fn partial_document_keeps_defaults() {
        let opts: SinkOptions = serde_json::from_str(
            r#"{ "platform": "posix", "context": { "status": "rv" } }"#,
        )
        .unwrap();
        assert_eq!(opts.platform, Platform::Posix);
        assert_eq!(opts.context.status, "rv");
        assert_eq!(opts.context.ok, "ERR_OK");
        assert!(opts.include_debug_trap);
    }

    #[test]
    fn header_names_are_not_read_from_documents() {
        let opts: SinkOptions =
            serde_json::from_str(r#"{ "artifact_name": "elsewhere.c" }"#).unwrap();
        assert_eq!(opts.artifact_name, SinkOptions::default().artifact_name);
    }

    #[test]
    fn windows_has_no_trap_and_no_guard() {
        let opts = SinkOptions {
            platform: Platform::Windows,
            ..SinkOptions::default()
        };
        assert_eq!(opts.trap_condition(), None);
        assert_eq!(opts.ignore_guard(), None);
    }

    #[test]
    fn guard_follows_the_trap() {
        let mut opts = SinkOptions::default();
        assert!(opts.ignore_guard().is_some());
        opts.include_debug_trap = false;
        assert_eq!(opts.ignore_guard(), None);
    }

    #[test]
    fn options_round_trip_through_a_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let opts = SinkOptions {
            platform: Platform::Windows,
            guard_ignored: false,
            ..SinkOptions::default()
        };
        std::fs::write(file.path(), serde_json::to_vec_pretty(&opts).unwrap()).unwrap();
        assert_eq!(SinkOptions::from_path(file.path()).unwrap(), opts);
    }
}
