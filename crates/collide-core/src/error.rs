// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error types for loading and compiling rule documents.

use std::io;

use thiserror::Error;

/// Failure to obtain a [`RuleSet`](crate::RuleSet) from a config source.
///
/// Both variants abort the run before any fragment is produced.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The document could not be read.
    #[error("failed to read rule document '{path}': {source}")]
    Io {
        /// Location of the document, for diagnostics.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The document is not valid JSON, its root is not an object, or a field
    /// has the wrong JSON type.
    #[error("failed to decode rule document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Terminal failure raised while compiling a well-formed JSON document.
///
/// Fragments produced before the failure are part of an invalid stream; the
/// caller decides how to discard or flag them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A group lacks `type_a` or `cases`.
    #[error("malformed collision group '{group}': missing `{missing}`")]
    MalformedGroup {
        /// Name of the offending group.
        group: String,
        /// The absent key.
        missing: &'static str,
    },
    /// A case lacks `type_b` or `function` (`function: null` is fine).
    #[error("malformed case #{index} in collision group '{group}': missing `{missing}`")]
    MalformedCase {
        /// Name of the group holding the case.
        group: String,
        /// Zero-based position of the case within the group.
        index: usize,
        /// The absent key.
        missing: &'static str,
    },
    /// The ordered pair `(a, b)` was already claimed by an earlier case.
    #[error("duplicate collision pair ({a}, {b}) in group '{group}'")]
    DuplicatePair {
        /// First type of the pair, as declared.
        a: String,
        /// Second type of the pair, as declared.
        b: String,
        /// Group in which the repeated declaration was found.
        group: String,
    },
}
