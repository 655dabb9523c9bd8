// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Units of the generated dispatch table.

use std::fmt;

/// How the handler block of a case resolves a collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerMode {
    /// Call the case's handler function.
    Dispatch,
    /// Do nothing and report success.
    Ignore,
}

/// Body shared by every label of one case.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HandlerBlock {
    /// No-op that leaves the status at the ok sentinel.
    Ignore,
    /// Call `function` with both entities, first-triggered side first,
    /// unless both entities share the same owner.
    Dispatch {
        /// Handler identifier.
        function: String,
    },
}

impl HandlerBlock {
    /// Mode tag carried by the labels leading into this block.
    pub fn mode(&self) -> HandlerMode {
        match self {
            Self::Ignore => HandlerMode::Ignore,
            Self::Dispatch { .. } => HandlerMode::Dispatch,
        }
    }
}

/// One emitted piece of the dispatch table, in output order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fragment {
    /// Marks the start of a group's cases.
    GroupComment {
        /// Group name.
        group: String,
    },
    /// Label for two distinct types; covers both orders.
    PairLabel {
        /// Declared `type_a` side.
        a: String,
        /// Declared `type_b` side.
        b: String,
        /// Mode of the block this label leads into.
        mode: HandlerMode,
    },
    /// Label for a type colliding with itself.
    SelfLabel {
        /// The type.
        ty: String,
        /// Mode of the block this label leads into.
        mode: HandlerMode,
    },
    /// Body for the labels emitted since the previous block.
    Handler(HandlerBlock),
    /// Ends a case; control never falls into the next one.
    Break,
}

impl Fragment {
    /// `true` for [`Fragment::PairLabel`] and [`Fragment::SelfLabel`].
    pub fn is_label(&self) -> bool {
        matches!(self, Self::PairLabel { .. } | Self::SelfLabel { .. })
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GroupComment { group } => write!(f, "group {group}"),
            Self::PairLabel { a, b, mode } => write!(f, "{mode:?} ({a}, {b})"),
            Self::SelfLabel { ty, mode } => write!(f, "{mode:?} self ({ty})"),
            Self::Handler(HandlerBlock::Ignore) => f.write_str("ignore block"),
            Self::Handler(HandlerBlock::Dispatch { function }) => {
                write!(f, "dispatch block -> {function}")
            }
            Self::Break => f.write_str("break"),
        }
    }
}
