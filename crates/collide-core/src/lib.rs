// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Collision rule compiler.
//!
//! Consumes a [`RuleSet`] (named groups of `type_a × type_b` cases, each bound
//! to a handler function or to "ignore") and produces the ordered stream of
//! [`Fragment`]s a sink renders into a dispatch table.
//!
//! Invariants:
//!
//! - Every unordered type pair appears in at most one case across the whole
//!   document. A pair whose mirror was already emitted is skipped silently;
//!   the exact same ordered pair declared twice is a [`CompileError::DuplicatePair`].
//! - Fragments come out in input order (group name order, then case order,
//!   then `type_a` × `type_b`), so compiling the same document twice yields
//!   the same stream.
//! - The compiler never touches I/O. Loading documents is the job of a
//!   [`RuleSource`]; rendering is the job of the caller's sink.

pub mod compile;
pub mod error;
pub mod fragment;
pub mod ir;
pub mod pair;

pub use compile::{compile, Compilation, Compiler, Stats};
pub use error::{CompileError, SourceError};
pub use fragment::{Fragment, HandlerBlock, HandlerMode};
pub use ir::{Case, Group, RuleSet, RuleSource, SliceSource};
pub use pair::{Claim, PairKey, SeenSet};
