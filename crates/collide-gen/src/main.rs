// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `collide-gen`: compile a collision rule document into a C dispatch table.
//!
//! # Usage
//! ```text
//! collide-gen <RULES> <OUTPUT|stdout> [--sink-config FILE] [--platform any|posix|windows]
//!             [--no-debug-trap] [--no-guard-ignored]
//! ```
//!
//! Exit codes: `0` success, `1` bad arguments, `2` output could not be
//! opened or written, `3` rule document (or sink config) unreadable or not
//! JSON, `4` malformed group, `5` malformed case, `6` duplicate pair.

// The CLI reports failures on stderr.
#![allow(clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use collide_gen::{exit_code, generate, Destination, FsRuleSource, Platform, SinkOptions};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "collide-gen",
    version,
    about = "Generate the collision dispatch switch from a JSON rule document"
)]
struct Cli {
    /// Path to the collision rule document (JSON)
    rules: PathBuf,
    /// Destination file, or `stdout`
    output: String,
    /// JSON document with sink options (identifiers, trap, platform)
    #[arg(long)]
    sink_config: Option<PathBuf>,
    /// Platform the debug trap is generated for
    #[arg(long, value_enum)]
    platform: Option<Platform>,
    /// Omit the debug-only `default:` trap
    #[arg(long)]
    no_debug_trap: bool,
    /// Emit ignored cases unconditionally instead of only in debug builds
    #[arg(long)]
    no_guard_ignored: bool,
    /// Name printed in the `@file` header (defaults to OUTPUT)
    #[arg(long)]
    artifact_name: Option<String>,
    /// Rule document name printed in the header (defaults to RULES)
    #[arg(long)]
    source_name: Option<String>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => exit_code::SUCCESS,
                _ => exit_code::USAGE,
            };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let destination = Destination::from_arg(&cli.output);
    let options = match sink_options(&cli, &destination) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("collide-gen: {err:#}");
            return ExitCode::from(exit_code::CONFIG);
        }
    };

    match generate(&FsRuleSource::new(&cli.rules), &destination, options) {
        Ok(_) => ExitCode::from(exit_code::SUCCESS),
        Err(err) => {
            eprintln!("collide-gen: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn sink_options(cli: &Cli, destination: &Destination) -> Result<SinkOptions> {
    let mut options = match &cli.sink_config {
        Some(path) => SinkOptions::from_path(path)
            .with_context(|| format!("failed to load sink config '{}'", path.display()))?,
        None => SinkOptions::default(),
    };
    options.artifact_name = cli
        .artifact_name
        .clone()
        .unwrap_or_else(|| destination.display_name());
    options.source_name = cli
        .source_name
        .clone()
        .unwrap_or_else(|| cli.rules.display().to_string());
    if let Some(platform) = cli.platform {
        options.platform = platform;
    }
    if cli.no_debug_trap {
        options.include_debug_trap = false;
    }
    if cli.no_guard_ignored {
        options.guard_ignored = false;
    }
    Ok(options)
}
