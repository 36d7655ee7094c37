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
use std::collections::{HashMap, HashSet};

use crate::instruction::Instruction;

/// Function key used to namespace edges and reachability: a selector
/// for a regular public function, `-1` for the fallback, `-2` for the
/// synthetic dispatcher.
pub type FunctionKey = i64;

pub const DISPATCHER_ID: FunctionKey = -2;
pub const FALLBACK_ID: FunctionKey = -1;

/// Stable index into [`crate::cfg::Cfg::blocks`]. Never reused or
/// invalidated once assigned; edges refer to blocks by id, never by
/// pc, so the arena can be mutated (new blocks appended) without
/// disturbing existing references.
pub type BlockId = usize;

/// A maximal run of instructions with a single entry and a single
/// terminating exit. Holds per-function-key edge sets rather than a
/// single global adjacency, because the same block can be visited by
/// more than one function's sub-CFG with different predecessors and
/// successors (the dispatcher's blocks, most obviously).
#[derive(Clone, Debug, Default)]
pub struct BasicBlock {
    /// Program counters of this block's instructions, in order,
    /// contiguous in the original bytecode.
    pub pcs: Vec<u32>,
    pub incoming: HashMap<FunctionKey, HashSet<BlockId>>,
    pub outgoing: HashMap<FunctionKey, HashSet<BlockId>>,
    pub reachable_for: HashSet<FunctionKey>,
}

impl BasicBlock {
    pub fn new(pcs: Vec<u32>) -> Self {
        assert!(!pcs.is_empty());
        BasicBlock {
            pcs,
            incoming: HashMap::new(),
            outgoing: HashMap::new(),
            reachable_for: HashSet::new(),
        }
    }

    pub fn start(&self) -> u32 {
        self.pcs[0]
    }

    pub fn end(&self) -> u32 {
        *self.pcs.last().unwrap()
    }

    pub fn add_outgoing(&mut self, key: FunctionKey, target: BlockId) -> bool {
        self.outgoing.entry(key).or_default().insert(target)
    }

    pub fn add_incoming(&mut self, key: FunctionKey, source: BlockId) -> bool {
        self.incoming.entry(key).or_default().insert(source)
    }

    pub fn outgoing_for(&self, key: FunctionKey) -> impl Iterator<Item = &BlockId> {
        self.outgoing.get(&key).into_iter().flatten()
    }

    pub fn incoming_for(&self, key: FunctionKey) -> impl Iterator<Item = &BlockId> {
        self.incoming.get(&key).into_iter().flatten()
    }

    pub fn is_reachable_for(&self, key: FunctionKey) -> bool {
        self.reachable_for.contains(&key)
    }

    /// Remove every incoming/outgoing edge registered under `key`.
    /// Used by reachability pruning to drop the spurious linear edges
    /// `compute_simple_edges` adds for blocks a function never
    /// actually executes.
    pub fn clear_edges_for(&mut self, key: FunctionKey) {
        self.incoming.remove(&key);
        self.outgoing.remove(&key);
    }
}

/// Split a flat, pc-ordered instruction sequence into basic blocks
/// per the three-rule partition:
/// 1. `JUMPDEST` ends the current block (if non-empty) and begins a
///    new one.
/// 2. A terminator opcode ends the current block.
/// 3. Every other instruction extends the current block.
pub fn split_blocks(instructions: &[Instruction]) -> Vec<BasicBlock> {
    let mut blocks = Vec::new();
    let mut current: Vec<u32> = Vec::new();
    for ins in instructions {
        if ins.name == crate::instruction::Mnemonic::Jumpdest && !current.is_empty() {
            blocks.push(BasicBlock::new(std::mem::take(&mut current)));
        }
        current.push(ins.pc);
        if ins.is_terminator() {
            blocks.push(BasicBlock::new(std::mem::take(&mut current)));
        }
    }
    if !current.is_empty() {
        blocks.push(BasicBlock::new(current));
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::decode;
    use crate::opcode;

    #[test]
    fn test_split_single_block() {
        let ins = decode(&[opcode::ADD, opcode::STOP]);
        let blocks = split_blocks(&ins);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start(), 0);
        assert_eq!(blocks[0].end(), 1);
    }

    #[test]
    fn test_split_on_jumpdest() {
        let ins = decode(&[opcode::JUMP, opcode::JUMPDEST, opcode::STOP]);
        let blocks = split_blocks(&ins);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].pcs, vec![0]);
        assert_eq!(blocks[1].pcs, vec![1, 2]);
    }

    #[test]
    fn test_split_empty() {
        let ins = decode(&[]);
        assert!(split_blocks(&ins).is_empty());
    }
}
