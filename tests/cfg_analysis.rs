use evm_cfg_builder::block::{DISPATCHER_ID, FALLBACK_ID};
use evm_cfg_builder::cfg::Cfg;
use evm_cfg_builder::opcode;

/// Every edge registered as `outgoing` under a key has a matching
/// `incoming` registration on the other end, and vice versa — for
/// every function key, not just the dispatcher's.
#[test]
fn test_edge_sets_are_symmetric() {
    let code = vec![
        opcode::PUSH1, 0x00,
        opcode::CALLDATALOAD,
        opcode::PUSH1, 0xE0,
        opcode::SHR,
        opcode::DUP1,
        opcode::PUSH4, 0xaa, 0xbb, 0xcc, 0xdd,
        opcode::EQ,
        opcode::PUSH1, 0x00,
        opcode::JUMPI,
        opcode::PUSH1, 0x00,
        opcode::PUSH1, 0x00,
        opcode::REVERT,
    ];
    let mut code = code;
    let p = code.len() as u8;
    let jumpi_push_idx = code.len() - 7;
    code[jumpi_push_idx] = p;
    code.push(opcode::JUMPDEST);
    code.push(opcode::PUSH1);
    code.push(0x01);
    code.push(opcode::JUMP);

    let cfg = Cfg::new(code, true, true, true, true);
    for key in cfg.functions.keys() {
        for (block_id, block) in cfg.blocks.iter().enumerate() {
            for target in block.outgoing_for(*key) {
                assert!(
                    cfg.blocks[*target].incoming_for(*key).any(|s| *s == block_id),
                    "missing reciprocal incoming edge for key {key}"
                );
            }
            for source in block.incoming_for(*key) {
                assert!(
                    cfg.blocks[*source].outgoing_for(*key).any(|t| *t == block_id),
                    "missing reciprocal outgoing edge for key {key}"
                );
            }
        }
    }
}

/// A function whose reachable code only ever reads `SLOAD` is `view`
/// but not `pure`: `SLOAD` is state-reading, not state-changing.
#[test]
fn test_sload_is_view_not_pure() {
    let code = [
        opcode::PUSH1, 0x00,
        opcode::SLOAD,
        opcode::POP,
        opcode::STOP,
    ];
    let cfg = Cfg::new(code.to_vec(), true, true, true, true);
    let dispatcher = cfg.functions.get(&DISPATCHER_ID).unwrap();
    let mut f = evm_cfg_builder::function::Function::new(0, 0, dispatcher.entry, "f".to_string());
    f.basic_blocks = dispatcher.basic_blocks.clone();
    let mut cfg = cfg;
    for b in f.basic_blocks.clone() {
        cfg.blocks[b].reachable_for.insert(0);
    }
    evm_cfg_builder::function::classify_attributes(&cfg, &mut f);
    assert!(f.is_view());
    assert!(!f.is_pure());
}

/// A function touching only arithmetic (no state-changing, no
/// state-reading opcode) classifies as both `view` and `pure`.
#[test]
fn test_pure_arithmetic_function() {
    let code = [
        opcode::PUSH1, 0x01,
        opcode::PUSH1, 0x02,
        opcode::ADD,
        opcode::POP,
        opcode::STOP,
    ];
    let cfg = Cfg::new(code.to_vec(), true, true, true, true);
    let dispatcher = cfg.functions.get(&DISPATCHER_ID).unwrap();
    let mut f = evm_cfg_builder::function::Function::new(0, 0, dispatcher.entry, "f".to_string());
    f.basic_blocks = dispatcher.basic_blocks.clone();
    let mut cfg = cfg;
    for b in f.basic_blocks.clone() {
        cfg.blocks[b].reachable_for.insert(0);
    }
    evm_cfg_builder::function::classify_attributes(&cfg, &mut f);
    assert!(f.is_view());
    assert!(f.is_pure());
}

/// `SSTORE` anywhere reachable rules out both `view` and `pure`.
#[test]
fn test_sstore_is_neither_view_nor_pure() {
    let code = [
        opcode::PUSH1, 0x01,
        opcode::PUSH1, 0x00,
        opcode::SSTORE,
        opcode::STOP,
    ];
    let cfg = Cfg::new(code.to_vec(), true, true, true, true);
    let dispatcher = cfg.functions.get(&DISPATCHER_ID).unwrap();
    let mut f = evm_cfg_builder::function::Function::new(0, 0, dispatcher.entry, "f".to_string());
    f.basic_blocks = dispatcher.basic_blocks.clone();
    let mut cfg = cfg;
    for b in f.basic_blocks.clone() {
        cfg.blocks[b].reachable_for.insert(0);
    }
    evm_cfg_builder::function::classify_attributes(&cfg, &mut f);
    assert!(!f.is_view());
    assert!(!f.is_pure());
}

/// A selector entry guarded by a leading `CALLVALUE`/`JUMPI` reject
/// prologue classifies as non-payable.
#[test]
fn test_callvalue_guard_is_not_payable() {
    let code = [
        opcode::CALLVALUE,
        opcode::ISZERO,
        opcode::PUSH1, 0x06,
        opcode::JUMPI,
        opcode::PUSH1, 0x00,
        opcode::PUSH1, 0x00,
        opcode::REVERT,
        opcode::JUMPDEST,
        opcode::STOP,
    ];
    let cfg = Cfg::new(code.to_vec(), true, true, true, true);
    let dispatcher = cfg.functions.get(&DISPATCHER_ID).unwrap();
    let mut f = evm_cfg_builder::function::Function::new(0, 0, dispatcher.entry, "f".to_string());
    f.basic_blocks = dispatcher.basic_blocks.clone();
    evm_cfg_builder::function::classify_attributes(&cfg, &mut f);
    assert!(!f.is_payable());
}

/// A function with no `CALLVALUE` at all in its entry block is
/// payable by default.
#[test]
fn test_no_callvalue_check_is_payable() {
    let code = [opcode::PUSH1, 0x01, opcode::POP, opcode::STOP];
    let cfg = Cfg::new(code.to_vec(), true, true, true, true);
    let dispatcher = cfg.functions.get(&DISPATCHER_ID).unwrap();
    let mut f = evm_cfg_builder::function::Function::new(0, 0, dispatcher.entry, "f".to_string());
    evm_cfg_builder::function::classify_attributes(&cfg, &mut f);
    assert!(f.is_payable());
}

/// Re-running `analyze()` repeatedly never grows the block arena or
/// the discovered function set beyond the first pass's fixed point —
/// the VSA worklist, driven purely by the bytecode, actually
/// terminates rather than drifting.
#[test]
fn test_repeated_analysis_reaches_same_fixed_point() {
    let code = vec![
        opcode::PUSH1, 0x00,
        opcode::CALLDATALOAD,
        opcode::PUSH1, 0xE0,
        opcode::SHR,
        opcode::DUP1,
        opcode::PUSH4, 0x11, 0x22, 0x33, 0x44,
        opcode::EQ,
        opcode::PUSH1, 0x00,
        opcode::JUMPI,
        opcode::PUSH1, 0x00,
        opcode::PUSH1, 0x00,
        opcode::REVERT,
    ];
    let mut code = code;
    let p = code.len() as u8;
    let jumpi_push_idx = code.len() - 7;
    code[jumpi_push_idx] = p;
    code.push(opcode::JUMPDEST);
    code.push(opcode::STOP);

    let mut cfg = Cfg::new(code, true, true, true, true);
    let first_blocks = cfg.blocks.len();
    let first_functions = cfg.functions.len();
    for _ in 0..3 {
        cfg.analyze();
        assert_eq!(cfg.blocks.len(), first_blocks);
        assert_eq!(cfg.functions.len(), first_functions);
    }
}

/// A `CALLDATASIZE`-guarded `JUMPI` whose true branch rejects short
/// calldata is the fallback discovery shape; its fallthrough (false
/// branch) continues into the rest of the dispatcher rather than
/// being swallowed.
#[test]
fn test_fallback_fallthrough_continues_dispatch() {
    let mut code = vec![
        opcode::PUSH1, 0x04,
        opcode::CALLDATASIZE,
        opcode::LT,
        opcode::PUSH2, 0x00, 0x00,
        opcode::JUMPI,
        opcode::PUSH1, 0x00,
        opcode::CALLDATALOAD,
        opcode::PUSH1, 0xE0,
        opcode::SHR,
        opcode::PUSH4, 0x55, 0x66, 0x77, 0x88,
        opcode::EQ,
        opcode::PUSH1, 0x00,
        opcode::JUMPI,
        opcode::PUSH1, 0x00,
        opcode::PUSH1, 0x00,
        opcode::REVERT,
    ];
    let addr = code.len() as u16;
    code[5] = (addr >> 8) as u8;
    code[6] = (addr & 0xff) as u8;
    let jumpi_push_idx = code.len() - 7;
    code.push(opcode::JUMPDEST);
    code.push(opcode::STOP);
    let p = code.len() as u8;
    code[jumpi_push_idx] = p;
    code.push(opcode::JUMPDEST);
    code.push(opcode::STOP);

    let cfg = Cfg::new(code, true, true, true, true);
    assert!(cfg.functions.contains_key(&FALLBACK_ID));
    assert!(cfg.functions.contains_key(&0x55667788i64));
}

/// A realistic Solidity >=0.5.2 entry block pushes the free-memory
/// pointer (`PUSH1 0x80; PUSH1 0x40; MSTORE`) before the
/// `CALLVALUE`/`ISZERO`/`JUMPI` non-payable guard, so the guard's
/// `JUMPI` is preceded by more than one live `PUSH`. The guard must
/// follow the last push (the jump tag) rather than the second-to-last
/// (here, the stale `0x40` memory-pointer constant) or no selectors
/// past the guard are ever discovered.
#[test]
fn test_callvalue_guard_with_leading_pushes_discovers_selector() {
    let mut code = vec![
        opcode::PUSH1, 0x80,
        opcode::PUSH1, 0x40,
        opcode::MSTORE,
        opcode::CALLVALUE,
        opcode::DUP1,
        opcode::ISZERO,
        opcode::PUSH2, 0x00, 0x00, // patched below: guard JUMPI target
        opcode::JUMPI,
        opcode::PUSH1, 0x00,
        opcode::PUSH1, 0x00,
        opcode::REVERT,
    ];
    let guard_tag_idx = code.len() - 8;
    let tag = code.len() as u16;
    code[guard_tag_idx] = (tag >> 8) as u8;
    code[guard_tag_idx + 1] = (tag & 0xff) as u8;
    code.push(opcode::JUMPDEST);

    code.extend_from_slice(&[
        opcode::PUSH1, 0x00,
        opcode::CALLDATALOAD,
        opcode::PUSH1, 0xE0,
        opcode::SHR,
        opcode::DUP1,
        opcode::PUSH4, 0xaa, 0xbb, 0xcc, 0xdd,
        opcode::EQ,
        opcode::PUSH1, 0x00, // patched below: selector JUMPI target
        opcode::JUMPI,
        opcode::PUSH1, 0x00,
        opcode::PUSH1, 0x00,
        opcode::REVERT,
    ]);
    let selector_jumpi_push_idx = code.len() - 7;
    let p = code.len() as u8;
    code[selector_jumpi_push_idx] = p;
    code.push(opcode::JUMPDEST);
    code.push(opcode::STOP);

    let cfg = Cfg::new(code, true, true, true, true);
    let f = cfg
        .functions
        .get(&0xaabbccddi64)
        .expect("selector discovered past the CALLVALUE guard");
    assert_eq!(f.start_pc, p as u32);
}

/// `get_function_at` looks up by function *entry* address, not by any
/// block reachable under some function — it returns `None` for a
/// shared dispatcher block even though that block is reachable for
/// several functions, and `Some` only at an actual `start_pc`.
#[test]
fn test_get_function_at_matches_entry_pc_only() {
    let code = vec![
        opcode::PUSH1, 0x00,
        opcode::CALLDATALOAD,
        opcode::PUSH1, 0xE0,
        opcode::SHR,
        opcode::DUP1,
        opcode::PUSH4, 0x11, 0x22, 0x33, 0x44,
        opcode::EQ,
        opcode::PUSH1, 0x00,
        opcode::JUMPI,
        opcode::PUSH1, 0x00,
        opcode::PUSH1, 0x00,
        opcode::REVERT,
    ];
    let mut code = code;
    let p = code.len() as u8;
    let jumpi_push_idx = code.len() - 7;
    code[jumpi_push_idx] = p;
    code.push(opcode::JUMPDEST);
    code.push(opcode::STOP);

    let cfg = Cfg::new(code, true, true, true, true);
    let f = cfg.get_function_at(p as u32).expect("function starts here");
    assert_eq!(f.selector, 0x11223344i64);

    // The dispatcher's trailing REVERT block is reachable under both
    // the dispatcher's key and (via compute_simple_edges' JUMPI false
    // branch) the discovered selector's key, but it is not any
    // function's start_pc.
    let revert_pc = p as u32 - 1;
    assert_eq!(cfg.get_instruction_at(revert_pc).map(|i| i.name), Some(evm_cfg_builder::instruction::Mnemonic::Revert));
    assert!(cfg.get_function_at(revert_pc).is_none());
}
