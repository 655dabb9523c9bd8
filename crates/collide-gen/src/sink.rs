// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! C `switch` renderer for the compiler's fragment stream.
//!
//! Output layout:
//!
//! ```text
//! /** header: @file, source document, expected inputs, DO NOT EDIT */
//! erv = ERR_OK;
//! switch (MERGE_TYPES(node1.type, node2.type)) {
//!     /* Collision group 'g' */
//!     CASE(A, B)            <- one label per fragment
//!         ...handler block...
//!     break;
//!     default: { ...debug trap... }
//! } /* switch (...) */
//! ASSERT(erv == ERR_OK, erv);
//! ```
//!
//! The label macros (`CASE`, `SELFCASE`, `IGNORE`, `IGNORESELF`) are defined
//! by the including file; each two-type macro expands to both orders of the
//! merged key.

use std::io::{self, Write};

use collide_core::{Fragment, HandlerBlock, HandlerMode};
use thiserror::Error;

use crate::options::SinkOptions;

/// Failure while writing the table.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The destination rejected a write.
    #[error("failed to write dispatch table: {0}")]
    Io(#[from] io::Error),
}

/// Streams fragments into a writer as C source.
#[derive(Debug)]
pub struct CSwitchSink<W> {
    out: W,
    options: SinkOptions,
    in_guard: bool,
}

impl<W: Write> CSwitchSink<W> {
    /// Wrap `out`; nothing is written until [`begin`](Self::begin).
    pub fn new(out: W, options: SinkOptions) -> Self {
        Self {
            out,
            options,
            in_guard: false,
        }
    }

    /// Header comment, status preset and switch opener.
    pub fn begin(&mut self) -> Result<(), SinkError> {
        let key = self.switch_key();
        let opts = &self.options;
        let ctx = &opts.context;
        writeln!(self.out, "/**")?;
        writeln!(self.out, " * @file {}", comment_safe(&opts.artifact_name))?;
        writeln!(self.out, " *")?;
        writeln!(
            self.out,
            " * File generated from '{}' to simplify handling collisions",
            comment_safe(&opts.source_name)
        )?;
        writeln!(self.out, " *")?;
        writeln!(self.out, " * Expects in scope:")?;
        writeln!(
            self.out,
            " *   - {}, {}: the colliding entities (with .{} and .{})",
            ctx.left, ctx.right, ctx.type_field, ctx.owner_field
        )?;
        writeln!(
            self.out,
            " *   - {}: non-zero when {} triggered the collision first",
            ctx.first_flag, ctx.left
        )?;
        writeln!(self.out, " *   - {}: the resulting status", ctx.status)?;
        writeln!(self.out, " *")?;
        writeln!(self.out, " * DO NOT EDIT MANUALLY")?;
        writeln!(self.out, " */")?;
        writeln!(self.out)?;
        writeln!(self.out, "/* Avoid error if it's a self collision */")?;
        writeln!(self.out, "{} = {};", ctx.status, ctx.ok)?;
        writeln!(
            self.out,
            "/* Merge both types into a single one, so it's easier to compare */"
        )?;
        writeln!(self.out, "switch ({key}) {{")?;
        Ok(())
    }

    /// Render one fragment.
    pub fn push(&mut self, fragment: &Fragment) -> Result<(), SinkError> {
        match fragment {
            Fragment::GroupComment { group } => {
                writeln!(self.out, "    /* Collision group '{}' */", comment_safe(group))?;
            }
            Fragment::PairLabel { a, b, mode } => {
                self.open_guard_for(*mode)?;
                let label = match mode {
                    HandlerMode::Dispatch => "CASE",
                    HandlerMode::Ignore => "IGNORE",
                };
                writeln!(self.out, "    {label}({a}, {b})")?;
            }
            Fragment::SelfLabel { ty, mode } => {
                self.open_guard_for(*mode)?;
                let label = match mode {
                    HandlerMode::Dispatch => "SELFCASE",
                    HandlerMode::Ignore => "IGNORESELF",
                };
                writeln!(self.out, "    {label}({ty})")?;
            }
            Fragment::Handler(HandlerBlock::Ignore) => {
                self.open_guard_for(HandlerMode::Ignore)?;
                let ctx = &self.options.context;
                writeln!(self.out, "        {} = {};", ctx.status, ctx.ok)?;
            }
            Fragment::Handler(HandlerBlock::Dispatch { function }) => {
                self.write_dispatch(function)?;
            }
            Fragment::Break => {
                writeln!(self.out, "    break;")?;
                self.close_guard()?;
            }
        }
        Ok(())
    }

    /// Default branch, switch closer and status assertion; returns the writer.
    pub fn finish(mut self) -> Result<W, SinkError> {
        self.close_guard()?;
        if let Some(cond) = self.options.trap_condition() {
            let ctx = &self.options.context;
            writeln!(
                self.out,
                "    /* In debug builds, an unhandled collision raises SIGINT so a debugger"
            )?;
            writeln!(
                self.out,
                "     * stops here and shows which types weren't handled */"
            )?;
            writeln!(self.out, "    default: {{")?;
            writeln!(self.out, "#  if {cond}")?;
            writeln!(self.out, "        /* Unfiltered collision, do something about it */")?;
            writeln!(self.out, "        raise(SIGINT);")?;
            writeln!(self.out, "        {} = {};", ctx.status, ctx.unhandled)?;
            writeln!(self.out, "#  endif /* {cond} */")?;
            writeln!(self.out, "    }}")?;
        }
        let key = self.switch_key();
        let ctx = &self.options.context;
        writeln!(self.out, "}} /* switch ({key}) */")?;
        writeln!(self.out, "ASSERT({0} == {1}, {0});", ctx.status, ctx.ok)?;
        self.out.flush()?;
        Ok(self.out)
    }

    /// Mark the output as unusable so it cannot compile by accident.
    pub fn abort(mut self, reason: &str) -> Result<W, SinkError> {
        self.close_guard()?;
        writeln!(
            self.out,
            "#error \"collision dispatch table is incomplete: {}\"",
            reason.replace(['"', '\\', '\n'], "'")
        )?;
        self.out.flush()?;
        Ok(self.out)
    }

    fn switch_key(&self) -> String {
        let ctx = &self.options.context;
        format!(
            "{}({}.{}, {}.{})",
            ctx.merge_macro, ctx.left, ctx.type_field, ctx.right, ctx.type_field
        )
    }

    fn write_dispatch(&mut self, function: &str) -> Result<(), SinkError> {
        let ctx = &self.options.context;
        let (left, right, status) = (&ctx.left, &ctx.right, &ctx.status);
        writeln!(
            self.out,
            "        if ({left}.{owner} != {right}.{owner}) {{",
            owner = ctx.owner_field
        )?;
        writeln!(self.out, "            /* Filter out self collision */")?;
        writeln!(self.out, "            if ({}) {{", ctx.first_flag)?;
        writeln!(self.out, "                {status} = {function}(&{left}, &{right});")?;
        writeln!(self.out, "            }}")?;
        writeln!(self.out, "            else {{")?;
        writeln!(self.out, "                {status} = {function}(&{right}, &{left});")?;
        writeln!(self.out, "            }}")?;
        writeln!(self.out, "        }}")?;
        Ok(())
    }

    fn open_guard_for(&mut self, mode: HandlerMode) -> Result<(), SinkError> {
        if mode != HandlerMode::Ignore || self.in_guard {
            return Ok(());
        }
        if let Some(cond) = self.options.ignore_guard() {
            writeln!(self.out, "#  if {cond}")?;
            self.in_guard = true;
        }
        Ok(())
    }

    fn close_guard(&mut self) -> Result<(), SinkError> {
        if self.in_guard {
            if let Some(cond) = self.options.ignore_guard() {
                writeln!(self.out, "#  endif /* {cond} */")?;
            }
            self.in_guard = false;
        }
        Ok(())
    }
}

fn comment_safe(text: &str) -> String {
    text.replace("*/", "* /")
}

/// Render a complete table into a string.
pub fn render_to_string(fragments: &[Fragment], options: SinkOptions) -> String {
    fn render(fragments: &[Fragment], options: SinkOptions) -> Result<Vec<u8>, SinkError> {
        let mut sink = CSwitchSink::new(Vec::new(), options);
        sink.begin()?;
        for fragment in fragments {
            sink.push(fragment)?;
        }
        sink.finish()
    }
    // Writes into a Vec cannot fail.
    let bytes = render(fragments, options).unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    use super::*;
    use crate::options::Platform;
    use collide_core::{compile, Case, Group, RuleSet};

    fn table(rules: &RuleSet, options: SinkOptions) -> String {
        let fragments = compile(rules).into_result().unwrap();
        render_to_string(&fragments, options)
    }

    #[test]
    fn dispatch_block_orders_arguments_by_trigger_side() {
        let mut rules = RuleSet::new();
        rules.insert("G1", Group::new(["X"], vec![Case::dispatch(["Y"], "onXY")]));
        let out = table(&rules, SinkOptions::default());

        let expected = "    /* Collision group 'G1' */
    CASE(X, Y)
        if (node1.pChild != node2.pChild) {
            /* Filter out self collision */
            if (isFirstCase) {
                erv = onXY(&node1, &node2);
            }
            else {
                erv = onXY(&node2, &node1);
            }
        }
    break;
";
        assert!(out.contains(expected), "{out}");
    }

    #[test]
    fn header_and_footer_wrap_the_switch() {
        let opts = SinkOptions {
            artifact_name: "misc/auto/collisioncases.c".to_owned(),
            source_name: "misc/collision.json".to_owned(),
            ..SinkOptions::default()
        };
        let out = table(&RuleSet::new(), opts);
        assert!(out.starts_with("/**\n * @file misc/auto/collisioncases.c\n"));
        assert!(out.contains("File generated from 'misc/collision.json'"));
        assert!(out.contains("DO NOT EDIT MANUALLY"));
        assert!(out.contains("erv = ERR_OK;\n"));
        assert!(out.contains("switch (MERGE_TYPES(node1.type, node2.type)) {\n"));
        assert!(out.ends_with(
            "} /* switch (MERGE_TYPES(node1.type, node2.type)) */\nASSERT(erv == ERR_OK, erv);\n"
        ));
    }

    #[test]
    fn self_pair_uses_selfcase() {
        let mut rules = RuleSet::new();
        rules.insert("G", Group::new(["X"], vec![Case::dispatch(["X"], "f")]));
        let out = table(&rules, SinkOptions::default());
        assert!(out.contains("    SELFCASE(X)\n        if (node1.pChild != node2.pChild) {"));
    }

    #[test]
    fn ignored_cases_are_guarded_by_the_trap_condition() {
        let mut rules = RuleSet::new();
        rules.insert("quiet", Group::new(["X"], vec![Case::ignore(["X", "Z"])]));
        let out = table(&rules, SinkOptions::default());
        let cond = Platform::Any.trap_condition().unwrap();
        let expected = format!(
            "#  if {cond}\n    IGNORESELF(X)\n    IGNORE(X, Z)\n        erv = ERR_OK;\n    \
             break;\n#  endif /* {cond} */\n"
        );
        assert!(out.contains(&expected), "{out}");
    }

    #[test]
    fn ignored_cases_are_plain_without_guard() {
        let mut rules = RuleSet::new();
        rules.insert("quiet", Group::new(["X"], vec![Case::ignore(["Z"])]));
        let opts = SinkOptions {
            guard_ignored: false,
            ..SinkOptions::default()
        };
        let out = table(&rules, opts);
        assert!(out.contains("    IGNORE(X, Z)\n        erv = ERR_OK;\n    break;\n"));
        assert_eq!(out.matches("#  if").count(), 1);
    }

    #[test]
    fn trap_follows_platform() {
        let posix = table(
            &RuleSet::new(),
            SinkOptions {
                platform: Platform::Posix,
                ..SinkOptions::default()
            },
        );
        assert!(posix.contains("    default: {\n#  if defined(DEBUG)\n"));
        assert!(posix.contains("        raise(SIGINT);\n        erv = ERR_UNHANDLED_COLLISION;\n"));

        let windows = table(
            &RuleSet::new(),
            SinkOptions {
                platform: Platform::Windows,
                ..SinkOptions::default()
            },
        );
        assert!(!windows.contains("default:"));
        assert!(!windows.contains("raise(SIGINT)"));

        let off = table(
            &RuleSet::new(),
            SinkOptions {
                include_debug_trap: false,
                ..SinkOptions::default()
            },
        );
        assert!(!off.contains("default:"));
    }

    #[test]
    fn context_names_flow_into_the_table() {
        let mut rules = RuleSet::new();
        rules.insert("G", Group::new(["A"], vec![Case::dispatch(["B"], "hit")]));
        let mut opts = SinkOptions::default();
        opts.context.left = "lhs".to_owned();
        opts.context.right = "rhs".to_owned();
        opts.context.first_flag = "lhsFirst".to_owned();
        opts.context.status = "rv".to_owned();
        let out = table(&rules, opts);
        assert!(out.contains("switch (MERGE_TYPES(lhs.type, rhs.type)) {"));
        assert!(out.contains("            if (lhsFirst) {\n                rv = hit(&lhs, &rhs);"));
        assert!(out.contains("ASSERT(rv == ERR_OK, rv);"));
    }

    #[test]
    fn abort_leaves_an_error_directive() {
        let mut sink = CSwitchSink::new(Vec::new(), SinkOptions::default());
        sink.begin().unwrap();
        sink.push(&Fragment::PairLabel {
            a: "X".to_owned(),
            b: "Y".to_owned(),
            mode: HandlerMode::Ignore,
        })
        .unwrap();
        let bytes = sink.abort("duplicate \"pair\"").unwrap();
        let out = String::from_utf8(bytes).unwrap();
        assert!(out.contains("#  endif"));
        assert!(out.ends_with(
            "#error \"collision dispatch table is incomplete: duplicate 'pair'\"\n"
        ));
    }

    #[test]
    fn group_names_cannot_close_the_comment() {
        let out = render_to_string(
            &[Fragment::GroupComment {
                group: "evil */ name".to_owned(),
            }],
            SinkOptions::default(),
        );
        assert!(out.contains("/* Collision group 'evil * / name' */"));
    }
}
