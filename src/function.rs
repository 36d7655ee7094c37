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
use std::collections::HashSet;

use crate::block::{BlockId, FunctionKey};
use crate::cfg::Cfg;
use crate::instruction::Mnemonic;

/// A behavioral attribute derived from the opcodes a function's
/// reachable blocks can execute. Set semantics: recomputing attributes
/// is idempotent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    Payable,
    View,
    Pure,
}

/// A discovered public function (or the fallback, or the synthetic
/// dispatcher). `entry`/`basic_blocks` are non-owning references into
/// the owning [`Cfg`]'s block arena.
#[derive(Clone, Debug)]
pub struct Function {
    pub selector: FunctionKey,
    pub start_pc: u32,
    pub entry: BlockId,
    pub name: String,
    pub basic_blocks: Vec<BlockId>,
    pub attributes: HashSet<Attribute>,
}

impl Function {
    pub fn new(selector: FunctionKey, start_pc: u32, entry: BlockId, name: String) -> Self {
        Function {
            selector,
            start_pc,
            entry,
            name,
            basic_blocks: Vec::new(),
            attributes: HashSet::new(),
        }
    }

    pub fn is_payable(&self) -> bool {
        self.attributes.contains(&Attribute::Payable)
    }

    pub fn is_view(&self) -> bool {
        self.attributes.contains(&Attribute::View)
    }

    pub fn is_pure(&self) -> bool {
        self.attributes.contains(&Attribute::Pure)
    }
}

/// Opcodes that mutate state or transfer value; their presence rules
/// out `view` (and hence `pure`).
const STATE_CHANGING: &[Mnemonic] = &[
    Mnemonic::Create,
    Mnemonic::Create2,
    Mnemonic::Call,
    Mnemonic::Callcode,
    Mnemonic::Delegatecall,
    Mnemonic::Selfdestruct,
    Mnemonic::Sstore,
];

/// Opcodes that read environment/block state; their presence (beyond
/// the state-changing set) rules out `pure` but not `view`.
const STATE_READING: &[Mnemonic] = &[
    Mnemonic::Address,
    Mnemonic::Balance,
    Mnemonic::Origin,
    Mnemonic::Caller,
    Mnemonic::Callvalue,
    Mnemonic::Calldataload,
    Mnemonic::Calldatasize,
    Mnemonic::Calldatacopy,
    Mnemonic::Codesize,
    Mnemonic::Codecopy,
    Mnemonic::Extcodesize,
    Mnemonic::Extcodehash,
    Mnemonic::Extcodecopy,
    Mnemonic::Returndatasize,
    Mnemonic::Returndatacopy,
    Mnemonic::Blockhash,
    Mnemonic::Coinbase,
    Mnemonic::Timestamp,
    Mnemonic::Number,
    Mnemonic::Difficulty,
    Mnemonic::Gaslimit,
    Mnemonic::Log(0),
    Mnemonic::Log(1),
    Mnemonic::Log(2),
    Mnemonic::Log(3),
    Mnemonic::Log(4),
    Mnemonic::Staticcall,
    Mnemonic::Sload,
];

/// Classify `function`'s `payable`/`view`/`pure` attributes from the
/// opcodes reachable under its key, per the entry-prologue heuristic
/// for `payable` and opcode-set membership for `view`/`pure`. Not
/// meaningful for the synthetic dispatcher, which has no single
/// calling convention.
pub fn classify_attributes(cfg: &Cfg, function: &mut Function) {
    let entry_has_callvalue = cfg.blocks[function.entry]
        .pcs
        .iter()
        .any(|pc| cfg.instructions.get(pc).map(|i| i.name) == Some(Mnemonic::Callvalue));
    if !entry_has_callvalue {
        function.attributes.insert(Attribute::Payable);
    }

    let mut has_state_changing = false;
    let mut has_state_reading = false;
    for &block_id in &function.basic_blocks {
        let block = &cfg.blocks[block_id];
        if !block.is_reachable_for(function.selector) {
            continue;
        }
        for pc in &block.pcs {
            let Some(ins) = cfg.instructions.get(pc) else { continue };
            if STATE_CHANGING.contains(&ins.name) {
                has_state_changing = true;
            }
            if STATE_READING.contains(&ins.name) {
                has_state_reading = true;
            }
        }
    }

    if !has_state_changing {
        function.attributes.insert(Attribute::View);
        if !has_state_reading {
            function.attributes.insert(Attribute::Pure);
        }
    }
}
