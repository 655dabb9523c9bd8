// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Type pairs and the document-wide claim set.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

/// A declared `(first, second)` type pair.
///
/// Equality is ordered; use [`PairKey::canonical`] for the unordered identity
/// (`(X, Y)` and `(Y, X)` share one canonical key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    /// Type on the `type_a` side.
    pub first: String,
    /// Type on the `type_b` side.
    pub second: String,
}

impl PairKey {
    /// Build a pair in declaration order.
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    /// The same pair with its sides swapped.
    pub fn mirror(&self) -> Self {
        Self {
            first: self.second.clone(),
            second: self.first.clone(),
        }
    }

    /// Unordered identity: the lexicographically smaller type first.
    pub fn canonical(&self) -> Self {
        if self.first <= self.second {
            self.clone()
        } else {
            self.mirror()
        }
    }

    /// `true` for a type colliding with itself.
    pub fn is_self(&self) -> bool {
        self.first == self.second
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.first, self.second)
    }
}

/// Result of offering a pair to a [`SeenSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// Neither order was seen; the pair now belongs to the offering case.
    Fresh,
    /// The mirror was emitted earlier by the same case. Both orders are now
    /// recorded and any further declaration is a duplicate.
    Mirror,
    /// The pair (in either order) already belongs to another declaration.
    Duplicate,
}

#[derive(Debug, Clone)]
struct Owner {
    ordered: PairKey,
    case: usize,
    both_orders: bool,
}

/// Every pair claimed so far in one compilation, keyed by canonical pair.
///
/// `case` arguments are document-wide case ordinals; the set only compares
/// them for equality.
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    owners: HashMap<PairKey, Owner>,
}

impl SeenSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer `pair`, declared by case number `case`.
    pub fn claim(&mut self, pair: &PairKey, case: usize) -> Claim {
        match self.owners.entry(pair.canonical()) {
            Entry::Vacant(slot) => {
                slot.insert(Owner {
                    ordered: pair.clone(),
                    case,
                    both_orders: false,
                });
                Claim::Fresh
            }
            Entry::Occupied(mut slot) => {
                let owner = slot.get_mut();
                if owner.case == case && !owner.both_orders && owner.ordered != *pair {
                    owner.both_orders = true;
                    Claim::Mirror
                } else {
                    Claim::Duplicate
                }
            }
        }
    }

    /// Number of distinct unordered pairs claimed.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// `true` if nothing was claimed yet.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    use super::*;

    #[test]
    fn canonical_ignores_order() {
        let xy = PairKey::new("X", "Y");
        assert_eq!(xy.canonical(), xy.mirror().canonical());
        assert_ne!(xy, xy.mirror());
    }

    #[test]
    fn mirror_within_one_case_is_skipped_once() {
        let mut seen = SeenSet::new();
        assert_eq!(seen.claim(&PairKey::new("X", "Y"), 0), Claim::Fresh);
        assert_eq!(seen.claim(&PairKey::new("Y", "X"), 0), Claim::Mirror);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen.claim(&PairKey::new("Y", "X"), 0), Claim::Duplicate);
        assert_eq!(seen.claim(&PairKey::new("X", "Y"), 1), Claim::Duplicate);
    }

    #[test]
    fn mirror_from_another_case_is_a_duplicate() {
        let mut seen = SeenSet::new();
        assert_eq!(seen.claim(&PairKey::new("X", "Y"), 0), Claim::Fresh);
        assert_eq!(seen.claim(&PairKey::new("Y", "X"), 1), Claim::Duplicate);
    }

    #[test]
    fn exact_repeat_is_a_duplicate_even_in_the_same_case() {
        let mut seen = SeenSet::new();
        assert_eq!(seen.claim(&PairKey::new("X", "X"), 0), Claim::Fresh);
        assert_eq!(seen.claim(&PairKey::new("X", "X"), 0), Claim::Duplicate);
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn distinct_pairs_are_counted_once_per_unordered_pair() {
        let mut seen = SeenSet::new();
        assert!(seen.is_empty());
        assert_eq!(seen.claim(&PairKey::new("A", "B"), 3), Claim::Fresh);
        assert_eq!(seen.claim(&PairKey::new("A", "C"), 3), Claim::Fresh);
        assert_eq!(seen.claim(&PairKey::new("B", "A"), 3), Claim::Mirror);
        assert_eq!(seen.len(), 2);
    }
}
