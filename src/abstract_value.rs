// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use std::collections::{BTreeSet, HashSet};

use crate::util::w256;

/// The default bound on a tracked value set before it widens to
/// `Top`, used whenever no `authorized_values` set (i.e. no set of
/// known `JUMPDEST` PCs) is available to narrow things further.
pub const DEFAULT_MAX: usize = 100;

/// The value of a single abstract stack slot: either `Top` ("any
/// value", absorbing), or a bounded set of concrete values, where
/// `None` stands for `⊥` ("unknown but tracked") — distinct from
/// `Top` because a slot full of `⊥` still participates in merges
/// without forcing the whole thing to `Top`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbsStackElem {
    Top,
    Values(BTreeSet<Option<w256>>),
}

impl AbsStackElem {
    /// A single unknown value.
    pub fn bottom() -> Self {
        let mut s = BTreeSet::new();
        s.insert(None);
        AbsStackElem::Values(s)
    }

    /// A single known concrete value.
    pub fn singleton(value: w256) -> Self {
        let mut s = BTreeSet::new();
        s.insert(Some(value));
        AbsStackElem::Values(s)
    }

    pub fn is_top(&self) -> bool {
        matches!(self, AbsStackElem::Top)
    }

    /// The tracked values, or `None` if this slot is `Top`.
    pub fn values(&self) -> Option<&BTreeSet<Option<w256>>> {
        match self {
            AbsStackElem::Top => None,
            AbsStackElem::Values(s) => Some(s),
        }
    }

    /// Add `value` to this element, coercing it to `⊥` if an
    /// `authorized_values` set is supplied and `value` is not a
    /// member. `BTreeSet` dedup means re-inserting `⊥` is automatically
    /// a no-op — this is the "only if not already representative"
    /// rule from the widening definition, for free. Widens to `Top` if
    /// the resulting set would exceed `max`.
    pub fn append(&self, value: w256, authorized_values: Option<&HashSet<w256>>, max: usize) -> AbsStackElem {
        if self.is_top() {
            return AbsStackElem::Top;
        }
        let mut set = self.values().unwrap().clone();
        let coerced = match authorized_values {
            Some(auth) if !auth.contains(&value) => None,
            _ => Some(value),
        };
        set.insert(coerced);
        if set.len() > max {
            AbsStackElem::Top
        } else {
            AbsStackElem::Values(set)
        }
    }

    /// Lattice join: `Top` is absorbing; otherwise the union of the
    /// two value sets, widened to `Top` if it would exceed `max`.
    pub fn merge(&self, other: &AbsStackElem, max: usize) -> AbsStackElem {
        match (self, other) {
            (AbsStackElem::Top, _) | (_, AbsStackElem::Top) => AbsStackElem::Top,
            (AbsStackElem::Values(a), AbsStackElem::Values(b)) => {
                let union: BTreeSet<_> = a.union(b).cloned().collect();
                if union.len() > max {
                    AbsStackElem::Top
                } else {
                    AbsStackElem::Values(union)
                }
            }
        }
    }

    /// Bitwise AND across every pair of concrete values drawn one
    /// from each operand; `⊥` propagates (if either operand contains
    /// an unknown value, the result set also contains `⊥`, since the
    /// AND of an unknown value with anything is itself unknown).
    pub fn and(&self, other: &AbsStackElem) -> AbsStackElem {
        match (self, other) {
            (AbsStackElem::Top, _) | (_, AbsStackElem::Top) => AbsStackElem::Top,
            (AbsStackElem::Values(a), AbsStackElem::Values(b)) => {
                let mut out = BTreeSet::new();
                let has_bottom = a.contains(&None) || b.contains(&None);
                for x in a.iter().flatten() {
                    for y in b.iter().flatten() {
                        out.insert(Some(*x & *y));
                    }
                }
                if has_bottom {
                    out.insert(None);
                }
                AbsStackElem::Values(out)
            }
        }
    }
}
