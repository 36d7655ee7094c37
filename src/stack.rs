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
use crate::abstract_value::AbsStackElem;

/// The abstract operand stack the value-set analysis carries through
/// a basic block. Top of stack is the back of the `Vec`, matching the
/// teacher's convention of growing structures at the end.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Stack(Vec<AbsStackElem>);

impl Stack {
    pub fn new() -> Self {
        Stack(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn top(&self) -> Option<&AbsStackElem> {
        self.0.last()
    }

    pub fn push(&mut self, elem: AbsStackElem) {
        self.0.push(elem);
    }

    /// Pop from underflow is not an error: it synthesizes a fresh `⊥`,
    /// since a block can be entered without knowing the full depth of
    /// whatever its caller left behind.
    pub fn pop(&mut self) -> AbsStackElem {
        self.0.pop().unwrap_or_else(AbsStackElem::bottom)
    }

    /// `DUPn`: push a copy of the `n`-th element from the top
    /// (1-based). Underflow pushes a fresh `⊥` rather than growing the
    /// stack.
    pub fn dup(&mut self, n: usize) {
        let len = self.0.len();
        let elem = if n >= 1 && n <= len {
            self.0[len - n].clone()
        } else {
            AbsStackElem::bottom()
        };
        self.push(elem);
    }

    /// `SWAPn`: swap the top with the `(n+1)`-th element from the top
    /// (1-based). Underflow grows the stack by inserting `⊥`s at the
    /// bottom (index 0) until depth `n+1` is reached; inserting at the
    /// bottom leaves every existing element's depth-from-top
    /// unchanged, which is what "prior top preserved" means here.
    pub fn swap(&mut self, n: usize) {
        while self.0.len() < n + 1 {
            self.0.insert(0, AbsStackElem::bottom());
        }
        let len = self.0.len();
        self.0.swap(len - 1, len - 1 - n);
    }

    /// Merge two stacks position-by-position from the top down. The
    /// longer stack determines the resulting depth: its bottom
    /// `n - m` slots are taken verbatim, the remaining `m` top slots
    /// are merged element-wise with the shorter stack.
    pub fn merge(&self, other: &Stack, max: usize) -> Stack {
        let (shorter, longer) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        let m = shorter.len();
        let n = longer.len();
        let mut out = Vec::with_capacity(n);
        out.extend_from_slice(&longer.0[..n - m]);
        for i in 0..m {
            out.push(shorter.0[i].merge(&longer.0[n - m + i], max));
        }
        Stack(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::w256;

    fn singleton(x: u128) -> AbsStackElem {
        AbsStackElem::singleton(w256::from(x))
    }

    #[test]
    fn test_push_pop_roundtrip() {
        let mut s = Stack::new();
        s.push(singleton(42));
        assert_eq!(s.pop(), singleton(42));
    }

    #[test]
    fn test_pop_empty_yields_bottom() {
        let mut s = Stack::new();
        assert_eq!(s.pop(), AbsStackElem::bottom());
    }

    #[test]
    fn test_dup_underflow_pushes_bottom() {
        let mut s = Stack::new();
        s.dup(1);
        assert_eq!(s.top(), Some(&AbsStackElem::bottom()));
    }

    #[test]
    fn test_dup_copies_nth_from_top() {
        let mut s = Stack::new();
        s.push(singleton(1));
        s.push(singleton(2));
        s.dup(2);
        assert_eq!(s.top(), Some(&singleton(1)));
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn test_swap_basic() {
        let mut s = Stack::new();
        s.push(singleton(1));
        s.push(singleton(2));
        s.swap(1);
        assert_eq!(s.top(), Some(&singleton(1)));
    }

    #[test]
    fn test_swap_underflow_extends_bottom() {
        let mut s = Stack::new();
        s.push(singleton(7));
        s.swap(2);
        assert_eq!(s.len(), 3);
        // The prior top ends up at the bottom after swapping with the
        // newly materialized bottom slot.
        assert_eq!(s.0[0], singleton(7));
        assert_eq!(s.top(), Some(&AbsStackElem::bottom()));
    }

    #[test]
    fn test_merge_example() {
        // Two paths joining: one pushes {1,2} on top of {1}, the other
        // pushes {3,5} on top of {1}.
        let mut a = Stack::new();
        a.push(singleton(1));
        let mut a_top = AbsStackElem::singleton(w256::from(1u128));
        a_top = a_top.merge(&AbsStackElem::singleton(w256::from(2u128)), 100);
        a.push(a_top);

        let mut b = Stack::new();
        b.push(singleton(1));
        let mut b_top = AbsStackElem::singleton(w256::from(3u128));
        b_top = b_top.merge(&AbsStackElem::singleton(w256::from(5u128)), 100);
        b.push(b_top);

        let merged = a.merge(&b, 100);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.0[0], singleton(1));
        let top_values = merged.0[1].values().unwrap();
        assert!(top_values.contains(&Some(w256::from(1u128))));
        assert!(top_values.contains(&Some(w256::from(2u128))));
        assert!(top_values.contains(&Some(w256::from(3u128))));
        assert!(top_values.contains(&Some(w256::from(5u128))));
    }

    #[test]
    fn test_merge_different_lengths() {
        let mut short = Stack::new();
        short.push(singleton(9));
        let mut long = Stack::new();
        long.push(singleton(1));
        long.push(singleton(2));
        long.push(singleton(9));
        let merged = short.merge(&long, 100);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.0[0], singleton(1));
        assert_eq!(merged.0[1], singleton(2));
        assert_eq!(merged.0[2], singleton(9));
    }
}
