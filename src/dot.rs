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
use std::fmt::Write as _;

use crate::block::BlockId;
use crate::cfg::Cfg;
use crate::function::Function;

/// Render `function`'s reachable sub-CFG as Graphviz DOT text: one
/// node per reachable basic block (labeled with its disassembly), one
/// edge per `outgoing` entry under the function's key.
pub fn function_to_dot(cfg: &Cfg, function: &Function) -> String {
    let mut out = String::new();
    writeln!(out, "digraph \"{}\" {{", function.name).unwrap();
    for &block_id in &function.basic_blocks {
        write_block_node(cfg, &mut out, block_id);
    }
    for &block_id in &function.basic_blocks {
        for target in cfg.blocks[block_id].outgoing_for(function.selector) {
            writeln!(out, "  \"{}\" -> \"{}\";", node_label_id(block_id), node_label_id(*target)).unwrap();
        }
    }
    writeln!(out, "}}").unwrap();
    out
}

/// Render the whole CFG (every block, every key's edges merged) as
/// one DOT graph — used for the dispatcher or for an overview dump.
pub fn cfg_to_dot(cfg: &Cfg) -> String {
    let mut out = String::new();
    writeln!(out, "digraph cfg {{").unwrap();
    for block_id in 0..cfg.blocks.len() {
        write_block_node(cfg, &mut out, block_id);
    }
    for block_id in 0..cfg.blocks.len() {
        let mut seen = std::collections::HashSet::new();
        for (_key, targets) in &cfg.blocks[block_id].outgoing {
            for &target in targets {
                if seen.insert(target) {
                    writeln!(out, "  \"{}\" -> \"{}\";", node_label_id(block_id), node_label_id(target)).unwrap();
                }
            }
        }
    }
    writeln!(out, "}}").unwrap();
    out
}

fn node_label_id(block_id: BlockId) -> String {
    format!("block_{block_id}")
}

fn write_block_node(cfg: &Cfg, out: &mut String, block_id: BlockId) {
    let block = &cfg.blocks[block_id];
    let mut body = String::new();
    for pc in &block.pcs {
        if let Some(ins) = cfg.instructions.get(pc) {
            match ins.operand {
                Some(v) => {
                    let _ = write!(body, "{:#06x}: {} {:#x}\\l", pc, ins.name, v);
                }
                None => {
                    let _ = write!(body, "{:#06x}: {}\\l", pc, ins.name);
                }
            }
        }
    }
    writeln!(
        out,
        "  \"{}\" [shape=box label=\"{}\"];",
        node_label_id(block_id),
        body
    )
    .unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::Cfg;
    use crate::opcode;

    #[test]
    fn test_dot_contains_function_name() {
        let cfg = Cfg::new(vec![opcode::STOP], true, true, true, true);
        let f = cfg.functions.get(&crate::block::DISPATCHER_ID).unwrap();
        let dot = function_to_dot(&cfg, f);
        assert!(dot.starts_with("digraph \"_dispatcher\""));
        assert!(dot.contains("STOP"));
    }
}
