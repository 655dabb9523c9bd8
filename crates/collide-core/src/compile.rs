// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Single-pass rule compiler.
//!
//! [`Compiler`] walks the rule set lazily and yields one [`Fragment`] per
//! call to `next`, so a caller can stream straight into its sink. Nothing is
//! buffered: the compiler only keeps a cursor over (group, case, `type_a`
//! entry, `type_b` entry). Fragments produced before a failure are still
//! yielded, followed by the error, after which the iterator is exhausted.

use std::collections::btree_map;
use std::iter::FusedIterator;
use std::mem;

use tracing::{debug, trace};

use crate::error::CompileError;
use crate::fragment::{Fragment, HandlerBlock, HandlerMode};
use crate::ir::{Case, Group, RuleSet};
use crate::pair::{Claim, PairKey, SeenSet};

/// Counters collected while compiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Groups fully compiled.
    pub groups: usize,
    /// Cases fully compiled.
    pub cases: usize,
    /// Two-type labels emitted.
    pub pair_labels: usize,
    /// Self-pair labels emitted.
    pub self_labels: usize,
    /// Pairs skipped because their mirror came from the same case.
    pub mirrored: usize,
    /// Handler blocks that call a function.
    pub dispatch_blocks: usize,
    /// Handler blocks that do nothing.
    pub ignore_blocks: usize,
}

/// Lazy fragment stream over a [`RuleSet`].
#[derive(Debug)]
pub struct Compiler<'a> {
    groups: btree_map::Iter<'a, String, Group>,
    seen: SeenSet,
    state: State<'a>,
    next_case: usize,
    stats: Stats,
}

#[derive(Debug)]
enum State<'a> {
    /// Between groups.
    Idle,
    /// Group comment yielded; required keys not checked yet.
    Opened { name: &'a str, group: &'a Group },
    /// Walking the cases of a well-formed group.
    Cases(GroupCursor<'a>),
    /// Exhausted, either normally or after an error.
    Done,
}

#[derive(Debug)]
struct GroupCursor<'a> {
    name: &'a str,
    type_a: &'a [String],
    cases: &'a [Case],
    index: usize,
    current: Option<CaseCursor<'a>>,
}

#[derive(Debug)]
struct CaseCursor<'a> {
    type_b: &'a [String],
    mode: HandlerMode,
    /// Taken once the labels are exhausted.
    block: Option<HandlerBlock>,
    ordinal: usize,
    a: usize,
    b: usize,
}

impl<'a> GroupCursor<'a> {
    fn open(name: &'a str, group: &'a Group) -> Result<Self, CompileError> {
        let malformed = |missing| CompileError::MalformedGroup {
            group: name.to_owned(),
            missing,
        };
        Ok(Self {
            name,
            type_a: group.type_a.as_deref().ok_or_else(|| malformed("type_a"))?,
            cases: group.cases.as_deref().ok_or_else(|| malformed("cases"))?,
            index: 0,
            current: None,
        })
    }
}

impl<'a> CaseCursor<'a> {
    fn open(
        group: &str,
        index: usize,
        case: &'a Case,
        ordinal: usize,
    ) -> Result<Self, CompileError> {
        let malformed = |missing| CompileError::MalformedCase {
            group: group.to_owned(),
            index,
            missing,
        };
        let type_b = case.type_b.as_deref().ok_or_else(|| malformed("type_b"))?;
        let block = match case.function.as_ref().ok_or_else(|| malformed("function"))? {
            Some(function) => HandlerBlock::Dispatch {
                function: function.clone(),
            },
            None => HandlerBlock::Ignore,
        };
        Ok(Self {
            type_b,
            mode: block.mode(),
            block: Some(block),
            ordinal,
            a: 0,
            b: 0,
        })
    }
}

impl<'a> Compiler<'a> {
    /// Start compiling `rules`.
    pub fn new(rules: &'a RuleSet) -> Self {
        Self {
            groups: rules.iter(),
            seen: SeenSet::new(),
            state: State::Idle,
            next_case: 0,
            stats: Stats::default(),
        }
    }

    /// Counters for everything compiled so far.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Pairs claimed so far.
    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    /// Next fragment of the group under `cursor`, or `None` once it is done.
    fn advance(&mut self, cursor: &mut GroupCursor<'a>) -> Result<Option<Fragment>, CompileError> {
        loop {
            let Some(case) = cursor.current.as_mut() else {
                let Some(raw) = cursor.cases.get(cursor.index) else {
                    return Ok(None);
                };
                let case = CaseCursor::open(cursor.name, cursor.index, raw, self.next_case)?;
                self.next_case += 1;
                cursor.current = Some(case);
                continue;
            };

            while let Some(a) = cursor.type_a.get(case.a) {
                let Some(b) = case.type_b.get(case.b) else {
                    case.a += 1;
                    case.b = 0;
                    continue;
                };
                case.b += 1;
                let pair = PairKey::new(a.as_str(), b.as_str());
                match self.seen.claim(&pair, case.ordinal) {
                    Claim::Mirror => {
                        trace!(group = %cursor.name, %pair, "mirror already labelled by this case");
                        self.stats.mirrored += 1;
                    }
                    Claim::Duplicate => {
                        return Err(CompileError::DuplicatePair {
                            a: pair.first,
                            b: pair.second,
                            group: cursor.name.to_owned(),
                        });
                    }
                    Claim::Fresh if pair.is_self() => {
                        self.stats.self_labels += 1;
                        return Ok(Some(Fragment::SelfLabel {
                            ty: pair.first,
                            mode: case.mode,
                        }));
                    }
                    Claim::Fresh => {
                        self.stats.pair_labels += 1;
                        return Ok(Some(Fragment::PairLabel {
                            a: pair.first,
                            b: pair.second,
                            mode: case.mode,
                        }));
                    }
                }
            }

            if let Some(block) = case.block.take() {
                match block {
                    HandlerBlock::Ignore => self.stats.ignore_blocks += 1,
                    HandlerBlock::Dispatch { .. } => self.stats.dispatch_blocks += 1,
                }
                return Ok(Some(Fragment::Handler(block)));
            }

            cursor.current = None;
            cursor.index += 1;
            self.stats.cases += 1;
            return Ok(Some(Fragment::Break));
        }
    }
}

impl Iterator for Compiler<'_> {
    type Item = Result<Fragment, CompileError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match mem::replace(&mut self.state, State::Done) {
                State::Done => return None,
                State::Idle => {
                    let Some((name, group)) = self.groups.next() else {
                        debug!(stats = ?self.stats, pairs = self.seen.len(), "rule set compiled");
                        return None;
                    };
                    self.state = State::Opened {
                        name: name.as_str(),
                        group,
                    };
                    return Some(Ok(Fragment::GroupComment {
                        group: name.clone(),
                    }));
                }
                State::Opened { name, group } => match GroupCursor::open(name, group) {
                    Ok(cursor) => {
                        let cases = cursor.cases.len();
                        debug!(group = %name, cases, "compiling collision group");
                        self.state = State::Cases(cursor);
                    }
                    Err(err) => return Some(Err(err)),
                },
                State::Cases(mut cursor) => match self.advance(&mut cursor) {
                    Ok(Some(fragment)) => {
                        self.state = State::Cases(cursor);
                        return Some(Ok(fragment));
                    }
                    Ok(None) => {
                        self.stats.groups += 1;
                        self.state = State::Idle;
                    }
                    Err(err) => return Some(Err(err)),
                },
            }
        }
    }
}

impl FusedIterator for Compiler<'_> {}

/// Everything a compilation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compilation {
    /// Fragments in output order. Incomplete when `outcome` is an error.
    pub fragments: Vec<Fragment>,
    /// Final counters, or the error that stopped compilation.
    pub outcome: Result<Stats, CompileError>,
}

impl Compilation {
    /// `true` when every group compiled.
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The fragments, or the error when compilation failed.
    pub fn into_result(self) -> Result<Vec<Fragment>, CompileError> {
        self.outcome.map(|_| self.fragments)
    }
}

/// Compile `rules` eagerly, collecting every fragment.
pub fn compile(rules: &RuleSet) -> Compilation {
    let mut compiler = Compiler::new(rules);
    let mut fragments = Vec::new();
    for item in compiler.by_ref() {
        match item {
            Ok(fragment) => fragments.push(fragment),
            Err(err) => {
                return Compilation {
                    fragments,
                    outcome: Err(err),
                }
            }
        }
    }
    Compilation {
        fragments,
        outcome: Ok(compiler.stats()),
    }
}
