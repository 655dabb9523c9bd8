// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! End-to-end pipeline: load the rules, open the destination, stream the
//! compiled fragments through the sink.
//!
//! A failed run never leaves a finished-looking artifact behind and never
//! touches an existing file: a file destination is written to a temporary
//! file next to it and only renamed over the target once the table is
//! complete. Standard output is terminated with an `#error` directive.

use std::io::{self, BufWriter, IntoInnerError, StdoutLock, Write};
use std::path::{Path, PathBuf};

use collide_core::{CompileError, Compiler, RuleSet, RuleSource, SourceError, Stats};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::options::SinkOptions;
use crate::sink::{CSwitchSink, SinkError};

/// Process exit codes of `collide-gen`.
pub mod exit_code {
    /// Table written.
    pub const SUCCESS: u8 = 0;
    /// Wrong number or shape of arguments.
    pub const USAGE: u8 = 1;
    /// Destination could not be opened or written.
    pub const OUTPUT: u8 = 2;
    /// Rule document (or sink config) unreadable or not valid JSON.
    pub const CONFIG: u8 = 3;
    /// A group lacks `type_a` or `cases`.
    pub const MALFORMED_GROUP: u8 = 4;
    /// A case lacks `type_b` or `function`.
    pub const MALFORMED_CASE: u8 = 5;
    /// A pair was declared more than once.
    pub const DUPLICATE_PAIR: u8 = 6;
}

/// Where the table goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Standard output.
    Stdout,
    /// A file, replaced only when the table is complete.
    File(PathBuf),
}

impl Destination {
    /// Argument value selecting standard output.
    pub const STDOUT: &'static str = "stdout";

    /// Interpret a command-line argument.
    pub fn from_arg(arg: &str) -> Self {
        if arg == Self::STDOUT {
            Self::Stdout
        } else {
            Self::File(PathBuf::from(arg))
        }
    }

    /// Name used in the generated header.
    pub fn display_name(&self) -> String {
        match self {
            Self::Stdout => Self::STDOUT.to_owned(),
            Self::File(path) => path.display().to_string(),
        }
    }

    fn open(&self) -> Result<Output, GenerateError> {
        match self {
            Self::Stdout => Ok(Output::Stdout(io::stdout().lock())),
            Self::File(path) => {
                let dir = match path.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent,
                    _ => Path::new("."),
                };
                let staging = NamedTempFile::new_in(dir).map_err(|source| {
                    GenerateError::OpenOutput {
                        path: path.display().to_string(),
                        source,
                    }
                })?;
                debug!(staging = %staging.path().display(), "staging output");
                Ok(Output::File(BufWriter::new(staging)))
            }
        }
    }

    fn commit(&self, output: Output) -> Result<(), GenerateError> {
        let (Self::File(path), Output::File(staging)) = (self, output) else {
            return Ok(());
        };
        let commit_err = |source| GenerateError::Commit {
            path: path.display().to_string(),
            source,
        };
        staging
            .into_inner()
            .map_err(IntoInnerError::into_error)
            .map_err(commit_err)?
            .persist(path)
            .map_err(|err| commit_err(err.error))?;
        Ok(())
    }
}

/// Open destination. A staged file is deleted on drop unless committed.
#[derive(Debug)]
enum Output {
    Stdout(StdoutLock<'static>),
    File(BufWriter<NamedTempFile>),
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stdout(out) => out.write(buf),
            Self::File(out) => out.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stdout(out) => out.flush(),
            Self::File(out) => out.flush(),
        }
    }
}

/// Why a run failed.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The destination directory does not accept a new file.
    #[error("failed to open output '{path}': {source}")]
    OpenOutput {
        /// Destination path.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The finished table could not replace the destination.
    #[error("failed to replace output '{path}': {source}")]
    Commit {
        /// Destination path.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The rule document could not be loaded.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// The rule document is structurally invalid.
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// Writing the table failed midway.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl GenerateError {
    /// Exit code reported for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::OpenOutput { .. } | Self::Commit { .. } | Self::Sink(_) => exit_code::OUTPUT,
            Self::Source(_) => exit_code::CONFIG,
            Self::Compile(CompileError::MalformedGroup { .. }) => exit_code::MALFORMED_GROUP,
            Self::Compile(CompileError::MalformedCase { .. }) => exit_code::MALFORMED_CASE,
            Self::Compile(CompileError::DuplicatePair { .. }) => exit_code::DUPLICATE_PAIR,
        }
    }
}

/// Compile the document from `source` into `destination`.
///
/// The document is fully loaded before the destination is opened, so the
/// destination may be the document itself.
pub fn generate<S>(
    source: &S,
    destination: &Destination,
    options: SinkOptions,
) -> Result<Stats, GenerateError>
where
    S: RuleSource + ?Sized,
{
    let rules = source.load()?;
    debug!(groups = rules.len(), "rule document loaded");

    let mut sink = CSwitchSink::new(destination.open()?, options);
    match stream(&rules, &mut sink) {
        Ok(stats) => {
            destination.commit(sink.finish()?)?;
            info!(
                destination = %destination.display_name(),
                groups = stats.groups,
                cases = stats.cases,
                labels = stats.pair_labels + stats.self_labels,
                "dispatch table written"
            );
            Ok(stats)
        }
        Err(err) => {
            if let GenerateError::Compile(compile_err) = &err {
                if let Err(abort_err) = sink.abort(&compile_err.to_string()) {
                    warn!(%abort_err, "failed to mark output as incomplete");
                }
            }
            Err(err)
        }
    }
}

fn stream<W: Write>(rules: &RuleSet, sink: &mut CSwitchSink<W>) -> Result<Stats, GenerateError> {
    sink.begin()?;
    let mut compiler = Compiler::new(rules);
    for fragment in compiler.by_ref() {
        sink.push(&fragment?)?;
    }
    Ok(compiler.stats())
}
