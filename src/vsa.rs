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

use crate::abstract_value::{AbsStackElem, DEFAULT_MAX};
use crate::block::{BlockId, FunctionKey, DISPATCHER_ID};
use crate::cfg::Cfg;
use crate::instruction::Mnemonic;
use crate::stack::Stack;
use crate::util::w256;

/// Tunables for a single function's stack value-set analysis.
#[derive(Clone, Copy, Debug)]
pub struct VsaConfig {
    /// Per-block visit cap; a block hitting this is not requeued even
    /// if its stack would otherwise have changed. Escape hatch from
    /// pathological widening loops.
    pub max_exploration: usize,
    /// Cap on the number of worklist pops for the *whole* function, a
    /// coarser backstop than `max_exploration` against runaway
    /// dispatcher-shaped functions.
    pub max_iteration: usize,
    pub enable_optimization: bool,
}

impl Default for VsaConfig {
    fn default() -> Self {
        VsaConfig {
            max_exploration: 100,
            max_iteration: 1000,
            enable_optimization: true,
        }
    }
}

/// Run the stack value-set analysis fixed point for function `key`
/// starting from `entry`, discovering indirect jump edges as they
/// resolve, then prune to the blocks actually reachable under `key`.
pub fn analyze_function(cfg: &mut Cfg, key: FunctionKey, entry: BlockId, config: &VsaConfig) {
    let authorized_values: Option<HashSet<w256>> = if config.enable_optimization {
        Some(cfg.jumpdest_values.clone())
    } else {
        None
    };
    let max = authorized_values.as_ref().map_or(DEFAULT_MAX, |s| s.len().max(1));

    let mut visits: HashMap<BlockId, usize> = HashMap::new();
    let mut stack_out: HashMap<BlockId, Stack> = HashMap::new();
    let mut last_branch_top: HashMap<u32, AbsStackElem> = HashMap::new();
    let mut all_discovered_targets: HashSet<(BlockId, u32)> = HashSet::new();
    let mut worklist: Vec<BlockId> = vec![entry];
    let mut iterations = 0usize;

    while let Some(block_id) = worklist.pop() {
        iterations += 1;
        if iterations > config.max_iteration {
            log::warn!("VSA: MAXITERATION exceeded analyzing function key {key}");
            break;
        }

        // The dispatcher's sub-CFG is a DAG by construction; visiting
        // a block twice would just repeat work forever on a loopless
        // structure, so cap it at one visit.
        if key == DISPATCHER_ID && cfg.blocks[block_id].is_reachable_for(key) {
            continue;
        }

        let visit_count = visits.entry(block_id).or_insert(0);
        *visit_count += 1;
        if *visit_count > config.max_exploration {
            continue;
        }

        let input_stack = merge_incoming(cfg, block_id, key, &stack_out, max);
        let (new_stack, branch_top) = transfer_block(cfg, block_id, input_stack, authorized_values.as_ref(), max);

        let mut last_discovered_targets: Vec<(BlockId, u32)> = Vec::new();
        let end_pc = cfg.blocks[block_id].end();
        let terminator = cfg.instructions.get(&end_pc).map(|i| i.name);
        if matches!(terminator, Some(Mnemonic::Jump) | Some(Mnemonic::Jumpi)) {
            if let Some(top) = &branch_top {
                last_branch_top.insert(end_pc, top.clone());
                if let Some(values) = top.values() {
                    for target in values.iter().flatten() {
                        let target_pc = target.as_u32();
                        if cfg.is_jumpdest(target_pc) && all_discovered_targets.insert((block_id, target_pc)) {
                            last_discovered_targets.push((block_id, target_pc));
                        }
                    }
                }
            }
        }

        let changed = stack_out.get(&block_id) != Some(&new_stack);
        stack_out.insert(block_id, new_stack);

        for (src, target_pc) in last_discovered_targets {
            let Some(&dst) = cfg.basic_blocks.get(&target_pc) else {
                log::debug!("VSA: discovered jump target pc {target_pc} has no basic block");
                continue;
            };
            let added = cfg.blocks[src].add_outgoing(key, dst);
            cfg.blocks[dst].add_incoming(key, src);
            if added {
                worklist.push(dst);
            }
        }

        if changed {
            let successors: Vec<BlockId> = cfg.blocks[block_id].outgoing_for(key).copied().collect();
            worklist.extend(successors);
        }
    }

    compute_reachability(cfg, entry, key);
}

fn merge_incoming(
    cfg: &Cfg,
    block_id: BlockId,
    key: FunctionKey,
    stack_out: &HashMap<BlockId, Stack>,
    max: usize,
) -> Stack {
    let incoming: Vec<BlockId> = cfg.blocks[block_id].incoming_for(key).copied().collect();
    let mut merged: Option<Stack> = None;
    for pred in incoming {
        if let Some(s) = stack_out.get(&pred) {
            merged = Some(match merged {
                None => s.clone(),
                Some(m) => m.merge(s, max),
            });
        }
    }
    merged.unwrap_or_else(Stack::new)
}

/// Run the per-instruction transfer across one block, returning the
/// resulting stack and, if the block ends in `JUMP`/`JUMPI`, the
/// top-of-stack value set recorded immediately before the pop (the
/// candidate jump target(s)).
fn transfer_block(
    cfg: &Cfg,
    block_id: BlockId,
    mut stack: Stack,
    authorized_values: Option<&HashSet<w256>>,
    max: usize,
) -> (Stack, Option<AbsStackElem>) {
    let mut branch_top = None;
    let pcs = cfg.blocks[block_id].pcs.clone();
    for pc in pcs {
        let ins = &cfg.instructions[&pc];
        match ins.name {
            Mnemonic::Push(_) => {
                let operand = ins.operand.unwrap_or(w256::ZERO);
                let empty = AbsStackElem::Values(Default::default());
                stack.push(empty.append(operand, authorized_values, max));
            }
            Mnemonic::Swap(n) => stack.swap(n as usize),
            Mnemonic::Dup(n) => stack.dup(n as usize),
            Mnemonic::And => {
                let a = stack.pop();
                let b = stack.pop();
                stack.push(a.and(&b));
            }
            Mnemonic::Jump | Mnemonic::Jumpi => {
                branch_top = stack.top().cloned();
                for _ in 0..ins.pops {
                    stack.pop();
                }
                for _ in 0..ins.pushes {
                    stack.push(AbsStackElem::bottom());
                }
            }
            _ => {
                for _ in 0..ins.pops {
                    stack.pop();
                }
                for _ in 0..ins.pushes {
                    stack.push(AbsStackElem::bottom());
                }
            }
        }
    }
    (stack, branch_top)
}

/// Forward-traverse from `entry` along `key`-outgoing edges, marking
/// every visited block `reachable_for ∋ key`; then drop any `key`-edge
/// still attached to a block that traversal never reached — spurious
/// residue `compute_simple_edges` leaves behind for code the function
/// never actually executes.
pub fn compute_reachability(cfg: &mut Cfg, entry: BlockId, key: FunctionKey) {
    let mut visited: HashSet<BlockId> = HashSet::new();
    let mut stack = vec![entry];
    while let Some(b) = stack.pop() {
        if !visited.insert(b) {
            continue;
        }
        cfg.blocks[b].reachable_for.insert(key);
        let succs: Vec<BlockId> = cfg.blocks[b].outgoing_for(key).copied().collect();
        for s in succs {
            if !visited.contains(&s) {
                stack.push(s);
            }
        }
    }

    let spurious: Vec<BlockId> = (0..cfg.blocks.len())
        .filter(|b| {
            !visited.contains(b)
                && (cfg.blocks[*b].outgoing.contains_key(&key) || cfg.blocks[*b].incoming.contains_key(&key))
        })
        .collect();

    for b in spurious {
        let outs: Vec<BlockId> = cfg.blocks[b].outgoing.remove(&key).map(|s| s.into_iter().collect()).unwrap_or_default();
        for t in outs {
            if let Some(set) = cfg.blocks[t].incoming.get_mut(&key) {
                set.remove(&b);
            }
        }
        let ins: Vec<BlockId> = cfg.blocks[b].incoming.remove(&key).map(|s| s.into_iter().collect()).unwrap_or_default();
        for s in ins {
            if let Some(set) = cfg.blocks[s].outgoing.get_mut(&key) {
                set.remove(&b);
            }
        }
    }
}
