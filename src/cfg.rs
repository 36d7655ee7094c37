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

use crate::block::{split_blocks, BasicBlock, BlockId, FunctionKey, DISPATCHER_ID, FALLBACK_ID};
use crate::function::{classify_attributes, Function};
use crate::instruction::{decode, Instruction, Mnemonic};
use crate::metadata::{rewrite_library_placeholders, strip_metadata};
use crate::signature::SignatureTable;
use crate::util::{w256, FromHexString};
use crate::vsa::{self, VsaConfig};

/// Accepted forms of bytecode input: raw bytes, or ASCII hex (with an
/// optional `0x` prefix, tolerated embedded newlines, and library
/// placeholders — all handled before decoding).
pub enum BytecodeInput {
    Raw(Vec<u8>),
    Hex(String),
}

impl From<Vec<u8>> for BytecodeInput {
    fn from(v: Vec<u8>) -> Self {
        BytecodeInput::Raw(v)
    }
}

impl From<&[u8]> for BytecodeInput {
    fn from(v: &[u8]) -> Self {
        BytecodeInput::Raw(v.to_vec())
    }
}

impl From<String> for BytecodeInput {
    fn from(v: String) -> Self {
        BytecodeInput::Hex(v)
    }
}

impl From<&str> for BytecodeInput {
    fn from(v: &str) -> Self {
        BytecodeInput::Hex(v.to_string())
    }
}

/// The root aggregate: owns every instruction and basic block, and
/// indexes functions discovered on top of them. Mutated only by
/// `analyze()`'s pipeline; read-only to callers afterwards.
pub struct Cfg {
    bytecode: Vec<u8>,
    pub instructions: HashMap<u32, Instruction>,
    pub basic_blocks: HashMap<u32, BlockId>,
    pub blocks: Vec<BasicBlock>,
    pub functions: HashMap<FunctionKey, Function>,
    pub jumpdest_values: HashSet<w256>,
    entry_point: Option<BlockId>,
    optimization_enabled: bool,
    max_exploration: usize,
}

impl Cfg {
    /// Build a CFG from `bytecode`. `remove_metadata` strips a
    /// trailing Solidity metadata trailer before decoding. `analyze`
    /// runs dispatcher/function discovery; `compute_cfgs` (meaningful
    /// only alongside `analyze`) additionally runs the per-function
    /// stack value-set analysis. `optimization_enabled` controls the
    /// `authorized_values` widening (see [`crate::abstract_value`]).
    pub fn new(
        bytecode: impl Into<BytecodeInput>,
        remove_metadata: bool,
        analyze: bool,
        optimization_enabled: bool,
        compute_cfgs: bool,
    ) -> Cfg {
        let raw: Vec<u8> = match bytecode.into() {
            BytecodeInput::Raw(b) => b,
            BytecodeInput::Hex(h) => {
                let rewritten = rewrite_library_placeholders(&h);
                rewritten.from_hex_string().unwrap_or_else(|e| {
                    log::error!("bytecode decode error: {e}");
                    Vec::new()
                })
            }
        };
        let code = if remove_metadata {
            strip_metadata(&raw).to_vec()
        } else {
            raw
        };

        let mut cfg = Cfg {
            bytecode: Vec::new(),
            instructions: HashMap::new(),
            basic_blocks: HashMap::new(),
            blocks: Vec::new(),
            functions: HashMap::new(),
            jumpdest_values: HashSet::new(),
            entry_point: None,
            optimization_enabled,
            max_exploration: 100,
        };
        cfg.compute_basic_blocks(&code);
        if analyze {
            cfg.compute_functions();
            if compute_cfgs {
                cfg.create_cfgs();
            }
        }
        cfg
    }

    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    pub fn entry_point(&self) -> Option<BlockId> {
        self.entry_point
    }

    pub fn get_instruction_at(&self, pc: u32) -> Option<&Instruction> {
        self.instructions.get(&pc)
    }

    pub fn get_basic_block_at(&self, pc: u32) -> Option<&BasicBlock> {
        self.basic_blocks.get(&pc).map(|&id| &self.blocks[id])
    }

    pub fn get_function_at(&self, pc: u32) -> Option<&Function> {
        self.functions.values().find(|f| f.start_pc == pc)
    }

    pub fn is_jumpdest(&self, pc: u32) -> bool {
        self.instructions.get(&pc).map(|i| i.name) == Some(Mnemonic::Jumpdest)
    }

    /// Re-run the whole pipeline from scratch. Deterministic in the
    /// bytecode alone, so calling it twice in a row is a no-op: the
    /// block arena, edges and functions are rebuilt identically each
    /// time rather than incrementally patched.
    pub fn analyze(&mut self) {
        let code = self.bytecode.clone();
        self.compute_basic_blocks(&code);
        self.compute_functions();
        self.create_cfgs();
    }

    /// Consult `table` and rename any discovered function whose
    /// selector resolves to a known textual signature.
    pub fn rename_known_selectors(&mut self, table: &dyn SignatureTable) {
        for (key, function) in self.functions.iter_mut() {
            if *key < 0 {
                continue;
            }
            if let Some(sig) = table.lookup(*key as u32) {
                function.name = sig.to_string();
            }
        }
    }

    fn compute_basic_blocks(&mut self, code: &[u8]) {
        self.bytecode = code.to_vec();
        self.instructions.clear();
        self.basic_blocks.clear();
        self.blocks.clear();
        self.jumpdest_values.clear();

        let decoded = decode(code);
        for ins in &decoded {
            if ins.name == Mnemonic::Jumpdest {
                self.jumpdest_values.insert(w256::from(ins.pc as u128));
            }
            self.instructions.insert(ins.pc, ins.clone());
        }

        self.blocks = split_blocks(&decoded);
        for (idx, block) in self.blocks.iter().enumerate() {
            self.basic_blocks.insert(block.start(), idx);
            if block.end() != block.start() {
                self.basic_blocks.insert(block.end(), idx);
            }
        }
        self.entry_point = if self.blocks.is_empty() { None } else { Some(0) };
    }

    /// For function key `key`, add the linear (non-indirect) edges:
    /// the `JUMPI` false branch, and the straight-through edge for any
    /// block that ends simply because a `JUMPDEST` follows it.
    pub fn compute_simple_edges(&mut self, key: FunctionKey) {
        for b in 0..self.blocks.len() {
            let end_pc = self.blocks[b].end();
            let Some(end_ins) = self.instructions.get(&end_pc) else {
                continue;
            };
            let fallthrough_pc = match end_ins.name {
                Mnemonic::Jumpi => Some(end_pc + 1),
                _ if !end_ins.is_terminator() => Some(end_pc + 1 + end_ins.operand_size as u32),
                _ => None,
            };
            let Some(fpc) = fallthrough_pc else { continue };
            match self.basic_blocks.get(&fpc) {
                Some(&target) => {
                    self.blocks[b].add_outgoing(key, target);
                    self.blocks[target].add_incoming(key, b);
                }
                None => {
                    log::debug!("compute_simple_edges: no basic block at fallthrough pc {fpc}");
                }
            }
        }
    }

    /// Walk the dispatcher from the entry block, discovering one
    /// `Function` per selector-compare-and-jump, plus the synthetic
    /// dispatcher function covering the whole prologue. Iterative with
    /// an explicit queue (the dispatcher skeleton is naturally
    /// recursive, but its depth is bounded only by the number of
    /// selectors, which can be large).
    pub fn compute_functions(&mut self) {
        self.functions.clear();
        let Some(entry_id) = self.entry_point else {
            return;
        };

        let mut queue: Vec<(BlockId, bool)> = vec![(entry_id, true)];
        let mut visited: HashSet<BlockId> = HashSet::new();

        while let Some((block_id, is_entry)) = queue.pop() {
            if !visited.insert(block_id) {
                continue;
            }
            let block_pcs = self.blocks[block_id].pcs.clone();
            let end_pc = self.blocks[block_id].end();
            let Some(end_ins) = self.instructions.get(&end_pc).cloned() else {
                continue;
            };

            let pushes: Vec<w256> = block_pcs
                .iter()
                .filter_map(|pc| self.instructions.get(pc))
                .filter_map(|i| match i.name {
                    Mnemonic::Push(_) => i.operand,
                    _ => None,
                })
                .collect();
            let has = |name: Mnemonic| {
                block_pcs
                    .iter()
                    .any(|pc| self.instructions.get(pc).map(|i| i.name) == Some(name))
            };

            if is_entry && end_ins.name == Mnemonic::Jumpi && has(Mnemonic::Callvalue) {
                // Solidity's non-payable-reject prologue: follow the
                // true branch (the PUSH immediately before the JUMPI)
                // and keep treating the target as an entry in case of
                // further guards.
                if let Some(&dest) = pushes.last() {
                    if let Some(&dest_block) = self.basic_blocks.get(&dest.as_u32()) {
                        queue.push((dest_block, true));
                    }
                }
                continue;
            }

            let is_jumpi = end_ins.name == Mnemonic::Jumpi;
            let (target, selector) = if is_jumpi && has(Mnemonic::Calldatasize) {
                (pushes.last().copied(), Some(FALLBACK_ID))
            } else if is_jumpi && pushes.len() >= 2 {
                let target = pushes[pushes.len() - 1];
                let selector = pushes[pushes.len() - 2];
                (Some(target), Some(selector.as_u32() as FunctionKey))
            } else {
                (None, None)
            };

            if let (Some(target), Some(selector)) = (target, selector) {
                match self.basic_blocks.get(&target.as_u32()) {
                    Some(&target_block) => {
                        if has(Mnemonic::Gt) {
                            // A binary-search dispatcher node, not a
                            // function: recurse into its subtree.
                            queue.push((target_block, false));
                        } else {
                            let name = default_function_name(selector);
                            self.functions
                                .insert(selector, Function::new(selector, target.as_u32(), target_block, name));
                        }
                    }
                    None => {
                        log::debug!(
                            "compute_functions: selector target pc {} has no basic block",
                            target.as_u32()
                        );
                    }
                }
            }

            if is_jumpi {
                let fallthrough_pc = end_pc + 1;
                if let Some(&fallthrough_block) = self.basic_blocks.get(&fallthrough_pc) {
                    queue.push((fallthrough_block, false));
                }
            }
        }

        self.functions.insert(
            DISPATCHER_ID,
            Function::new(DISPATCHER_ID, 0, entry_id, "_dispatcher".to_string()),
        );
    }

    /// For every discovered function: install its linear edges, run
    /// the stack value-set analysis to resolve indirect jumps and
    /// prune to reachable blocks, then classify its attributes.
    pub fn create_cfgs(&mut self) {
        let keys: Vec<FunctionKey> = self.functions.keys().copied().collect();
        for key in keys {
            self.compute_simple_edges(key);
            let Some(entry) = self.functions.get(&key).map(|f| f.entry) else {
                continue;
            };
            let config = VsaConfig {
                max_exploration: self.max_exploration,
                enable_optimization: self.optimization_enabled,
                ..VsaConfig::default()
            };
            vsa::analyze_function(self, key, entry, &config);

            let reachable: Vec<BlockId> = (0..self.blocks.len())
                .filter(|&b| self.blocks[b].is_reachable_for(key))
                .collect();
            if let Some(f) = self.functions.get_mut(&key) {
                f.basic_blocks = reachable;
            }

            if key != DISPATCHER_ID {
                if let Some(mut f) = self.functions.remove(&key) {
                    classify_attributes(self, &mut f);
                    self.functions.insert(key, f);
                }
            }
        }
    }
}

fn default_function_name(selector: FunctionKey) -> String {
    if selector == FALLBACK_ID {
        "_fallback".to_string()
    } else {
        format!("function_{:08x}", selector as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode;

    #[test]
    fn test_empty_bytecode() {
        let cfg = Cfg::new(Vec::new(), true, true, true, true);
        assert_eq!(cfg.blocks.len(), 0);
        assert_eq!(cfg.entry_point(), None);
        // The dispatcher is only synthesized once an entry block exists.
        assert_eq!(cfg.functions.len(), 0);
    }

    #[test]
    fn test_single_stop() {
        let cfg = Cfg::new(vec![opcode::STOP], true, true, true, true);
        assert_eq!(cfg.blocks.len(), 1);
        assert_eq!(cfg.blocks[0].pcs, vec![0]);
        assert_eq!(cfg.functions.len(), 1);
        assert!(cfg.functions.contains_key(&crate::block::DISPATCHER_ID));
    }

    #[test]
    fn test_trivial_selector_dispatch() {
        // PUSH1 0x00 CALLDATALOAD PUSH1 0xE0 SHR
        // DUP1 PUSH4 0x12345678 EQ PUSH1 <P> JUMPI
        // PUSH1 0x00 PUSH1 0x00 REVERT
        // JUMPDEST(P) STOP
        let mut code = vec![
            opcode::PUSH1, 0x00,
            opcode::CALLDATALOAD,
            opcode::PUSH1, 0xE0,
            opcode::SHR,
            opcode::DUP1,
            opcode::PUSH4, 0x12, 0x34, 0x56, 0x78,
            opcode::EQ,
            opcode::PUSH1, 0x00, // placeholder for P, patched below
            opcode::JUMPI,
            opcode::PUSH1, 0x00,
            opcode::PUSH1, 0x00,
            opcode::REVERT,
        ];
        let p = code.len() as u8; // JUMPDEST pc (appended right after this block)
        let jumpi_push_idx = code.len() - 7; // index of the `00` operand of `PUSH1 <P>`
        code[jumpi_push_idx] = p;
        code.push(opcode::JUMPDEST);
        code.push(opcode::STOP);

        let cfg = Cfg::new(code, true, true, true, true);
        let f = cfg.functions.get(&0x12345678i64).expect("selector function discovered");
        assert_eq!(f.start_pc, p as u32);
        assert!(f.basic_blocks.iter().any(|&b| cfg.blocks[b].start() == p as u32));
    }

    #[test]
    fn test_fallback_via_calldatasize() {
        // PUSH1 0x04 CALLDATASIZE LT PUSH2 <addr> JUMPI ... JUMPDEST STOP
        let mut code = vec![
            opcode::PUSH1, 0x04,
            opcode::CALLDATASIZE,
            opcode::LT,
            opcode::PUSH2, 0x00, 0x00,
            opcode::JUMPI,
            opcode::PUSH1, 0x00,
            opcode::PUSH1, 0x00,
            opcode::REVERT,
        ];
        let addr = code.len() as u16;
        code[5] = (addr >> 8) as u8;
        code[6] = (addr & 0xff) as u8;
        code.push(opcode::JUMPDEST);
        code.push(opcode::STOP);

        let cfg = Cfg::new(code, true, true, true, true);
        let f = cfg.functions.get(&crate::block::FALLBACK_ID).expect("fallback discovered");
        assert_eq!(f.name, "_fallback");
    }

    #[test]
    fn test_analyze_is_idempotent() {
        let mut cfg = Cfg::new(vec![opcode::STOP], true, true, true, true);
        let before = cfg.functions.len();
        let before_blocks = cfg.blocks.len();
        cfg.analyze();
        assert_eq!(cfg.functions.len(), before);
        assert_eq!(cfg.blocks.len(), before_blocks);
    }

    #[test]
    fn test_block_map_duality() {
        let cfg = Cfg::new(vec![opcode::JUMP, opcode::JUMPDEST, opcode::STOP], true, true, true, true);
        for (idx, block) in cfg.blocks.iter().enumerate() {
            assert_eq!(cfg.basic_blocks[&block.start()], idx);
            assert_eq!(cfg.basic_blocks[&block.end()], idx);
        }
    }
}
