// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Peripheral plumbing around [`collide_core`]: reading rule documents from
//! disk, rendering the fragment stream as a C `switch` table, and the
//! end-to-end [`generate`](generate::generate) pipeline used by the
//! `collide-gen` binary.

pub mod generate;
pub mod options;
pub mod sink;
pub mod source;

pub use generate::{exit_code, generate, Destination, GenerateError};
pub use options::{DispatchContext, Platform, SinkOptions};
pub use sink::{CSwitchSink, SinkError};
pub use source::FsRuleSource;
