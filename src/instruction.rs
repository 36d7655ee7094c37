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
use std::fmt;

use crate::opcode;
use crate::util::w256;

/// The name of a decoded instruction.  `PushN`/`DupN`/`SwapN`/`LogN`
/// carry their `N` so `operand_size`/`pops`/`pushes` can be computed
/// without a second lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Stop,
    Add,
    Mul,
    Sub,
    Div,
    Sdiv,
    Mod,
    Smod,
    Addmod,
    Mulmod,
    Exp,
    Signextend,
    Lt,
    Gt,
    Slt,
    Sgt,
    Eq,
    Iszero,
    And,
    Or,
    Xor,
    Not,
    Byte,
    Shl,
    Shr,
    Sar,
    Keccak256,
    Address,
    Balance,
    Origin,
    Caller,
    Callvalue,
    Calldataload,
    Calldatasize,
    Calldatacopy,
    Codesize,
    Codecopy,
    Gasprice,
    Extcodesize,
    Extcodecopy,
    Returndatasize,
    Returndatacopy,
    Extcodehash,
    Blockhash,
    Coinbase,
    Timestamp,
    Number,
    Difficulty,
    Gaslimit,
    Chainid,
    Selfbalance,
    Basefee,
    Pop,
    Mload,
    Mstore,
    Mstore8,
    Sload,
    Sstore,
    Jump,
    Jumpi,
    Pc,
    Msize,
    Gas,
    Jumpdest,
    Push(u8),
    Dup(u8),
    Swap(u8),
    Log(u8),
    Create,
    Call,
    Callcode,
    Return,
    Delegatecall,
    Create2,
    Staticcall,
    Revert,
    Invalid,
    Selfdestruct,
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Mnemonic::Stop => write!(f, "STOP"),
            Mnemonic::Add => write!(f, "ADD"),
            Mnemonic::Mul => write!(f, "MUL"),
            Mnemonic::Sub => write!(f, "SUB"),
            Mnemonic::Div => write!(f, "DIV"),
            Mnemonic::Sdiv => write!(f, "SDIV"),
            Mnemonic::Mod => write!(f, "MOD"),
            Mnemonic::Smod => write!(f, "SMOD"),
            Mnemonic::Addmod => write!(f, "ADDMOD"),
            Mnemonic::Mulmod => write!(f, "MULMOD"),
            Mnemonic::Exp => write!(f, "EXP"),
            Mnemonic::Signextend => write!(f, "SIGNEXTEND"),
            Mnemonic::Lt => write!(f, "LT"),
            Mnemonic::Gt => write!(f, "GT"),
            Mnemonic::Slt => write!(f, "SLT"),
            Mnemonic::Sgt => write!(f, "SGT"),
            Mnemonic::Eq => write!(f, "EQ"),
            Mnemonic::Iszero => write!(f, "ISZERO"),
            Mnemonic::And => write!(f, "AND"),
            Mnemonic::Or => write!(f, "OR"),
            Mnemonic::Xor => write!(f, "XOR"),
            Mnemonic::Not => write!(f, "NOT"),
            Mnemonic::Byte => write!(f, "BYTE"),
            Mnemonic::Shl => write!(f, "SHL"),
            Mnemonic::Shr => write!(f, "SHR"),
            Mnemonic::Sar => write!(f, "SAR"),
            Mnemonic::Keccak256 => write!(f, "KECCAK256"),
            Mnemonic::Address => write!(f, "ADDRESS"),
            Mnemonic::Balance => write!(f, "BALANCE"),
            Mnemonic::Origin => write!(f, "ORIGIN"),
            Mnemonic::Caller => write!(f, "CALLER"),
            Mnemonic::Callvalue => write!(f, "CALLVALUE"),
            Mnemonic::Calldataload => write!(f, "CALLDATALOAD"),
            Mnemonic::Calldatasize => write!(f, "CALLDATASIZE"),
            Mnemonic::Calldatacopy => write!(f, "CALLDATACOPY"),
            Mnemonic::Codesize => write!(f, "CODESIZE"),
            Mnemonic::Codecopy => write!(f, "CODECOPY"),
            Mnemonic::Gasprice => write!(f, "GASPRICE"),
            Mnemonic::Extcodesize => write!(f, "EXTCODESIZE"),
            Mnemonic::Extcodecopy => write!(f, "EXTCODECOPY"),
            Mnemonic::Returndatasize => write!(f, "RETURNDATASIZE"),
            Mnemonic::Returndatacopy => write!(f, "RETURNDATACOPY"),
            Mnemonic::Extcodehash => write!(f, "EXTCODEHASH"),
            Mnemonic::Blockhash => write!(f, "BLOCKHASH"),
            Mnemonic::Coinbase => write!(f, "COINBASE"),
            Mnemonic::Timestamp => write!(f, "TIMESTAMP"),
            Mnemonic::Number => write!(f, "NUMBER"),
            Mnemonic::Difficulty => write!(f, "DIFFICULTY"),
            Mnemonic::Gaslimit => write!(f, "GASLIMIT"),
            Mnemonic::Chainid => write!(f, "CHAINID"),
            Mnemonic::Selfbalance => write!(f, "SELFBALANCE"),
            Mnemonic::Basefee => write!(f, "BASEFEE"),
            Mnemonic::Pop => write!(f, "POP"),
            Mnemonic::Mload => write!(f, "MLOAD"),
            Mnemonic::Mstore => write!(f, "MSTORE"),
            Mnemonic::Mstore8 => write!(f, "MSTORE8"),
            Mnemonic::Sload => write!(f, "SLOAD"),
            Mnemonic::Sstore => write!(f, "SSTORE"),
            Mnemonic::Jump => write!(f, "JUMP"),
            Mnemonic::Jumpi => write!(f, "JUMPI"),
            Mnemonic::Pc => write!(f, "PC"),
            Mnemonic::Msize => write!(f, "MSIZE"),
            Mnemonic::Gas => write!(f, "GAS"),
            Mnemonic::Jumpdest => write!(f, "JUMPDEST"),
            Mnemonic::Push(n) => write!(f, "PUSH{n}"),
            Mnemonic::Dup(n) => write!(f, "DUP{n}"),
            Mnemonic::Swap(n) => write!(f, "SWAP{n}"),
            Mnemonic::Log(n) => write!(f, "LOG{n}"),
            Mnemonic::Create => write!(f, "CREATE"),
            Mnemonic::Call => write!(f, "CALL"),
            Mnemonic::Callcode => write!(f, "CALLCODE"),
            Mnemonic::Return => write!(f, "RETURN"),
            Mnemonic::Delegatecall => write!(f, "DELEGATECALL"),
            Mnemonic::Create2 => write!(f, "CREATE2"),
            Mnemonic::Staticcall => write!(f, "STATICCALL"),
            Mnemonic::Revert => write!(f, "REVERT"),
            Mnemonic::Invalid => write!(f, "INVALID"),
            Mnemonic::Selfdestruct => write!(f, "SELFDESTRUCT"),
        }
    }
}

/// A single decoded instruction.  Immutable once produced by
/// [`decode`]; `pc` is this instruction's own program counter, never
/// recomputed after the fact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub pc: u32,
    pub name: Mnemonic,
    pub operand: Option<w256>,
    pub operand_size: u8,
    pub pops: u8,
    pub pushes: u8,
}

impl Instruction {
    /// True for the opcodes which, per the block-splitting rule, always
    /// end the basic block they appear in.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self.name,
            Mnemonic::Stop
                | Mnemonic::Return
                | Mnemonic::Revert
                | Mnemonic::Invalid
                | Mnemonic::Selfdestruct
                | Mnemonic::Jump
                | Mnemonic::Jumpi
        )
    }
}

/// Decode `pops`/`pushes` for a fixed (non-PUSH/DUP/SWAP/LOG) opcode.
/// Matches the stack effect of every EVM instruction exactly.
fn fixed_stack_effect(name: &Mnemonic) -> (u8, u8) {
    use Mnemonic::*;
    match name {
        Stop => (0, 0),
        Add | Mul | Sub | Div | Sdiv | Mod | Smod | Exp | Signextend | Lt | Gt | Slt | Sgt
        | Eq | And | Or | Xor | Byte | Shl | Shr | Sar | Keccak256 => (2, 1),
        Addmod | Mulmod => (3, 1),
        Iszero | Not => (1, 1),
        Address | Origin | Caller | Callvalue | Calldatasize | Codesize | Gasprice
        | Returndatasize | Coinbase | Timestamp | Number | Difficulty | Gaslimit | Chainid
        | Selfbalance | Basefee | Pc | Msize | Gas | Pop => {
            if matches!(name, Pop) {
                (1, 0)
            } else {
                (0, 1)
            }
        }
        Balance | Calldataload | Extcodesize | Extcodehash | Blockhash | Mload | Sload
        | Jump => (1, if matches!(name, Jump) { 0 } else { 1 }),
        Calldatacopy | Codecopy | Mstore | Mstore8 | Sstore | Jumpi => {
            if matches!(name, Jumpi) {
                (2, 0)
            } else {
                (3, 0)
            }
        }
        Extcodecopy => (4, 0),
        Returndatacopy => (3, 0),
        Jumpdest => (0, 0),
        Create => (3, 1),
        Call | Callcode => (7, 1),
        Return => (2, 0),
        Delegatecall | Staticcall => (6, 1),
        Create2 => (4, 1),
        Revert => (2, 0),
        Invalid => (0, 0),
        Selfdestruct => (1, 0),
        Push(_) | Dup(_) | Swap(_) | Log(_) => unreachable!("handled by caller"),
    }
}

/// Decode a full bytecode sequence into instructions. PCs advance by
/// `1 + operand_size`. Unknown opcodes decode to `INVALID` with no
/// stack effect and no operand, per the external decoder contract.
pub fn decode(bytes: &[u8]) -> Vec<Instruction> {
    let mut out = Vec::new();
    let mut pc = 0usize;
    while pc < bytes.len() {
        let op = bytes[pc];
        let start = pc as u32;
        let (name, operand_size) = match op {
            opcode::STOP => (Mnemonic::Stop, 0),
            opcode::ADD => (Mnemonic::Add, 0),
            opcode::MUL => (Mnemonic::Mul, 0),
            opcode::SUB => (Mnemonic::Sub, 0),
            opcode::DIV => (Mnemonic::Div, 0),
            opcode::SDIV => (Mnemonic::Sdiv, 0),
            opcode::MOD => (Mnemonic::Mod, 0),
            opcode::SMOD => (Mnemonic::Smod, 0),
            opcode::ADDMOD => (Mnemonic::Addmod, 0),
            opcode::MULMOD => (Mnemonic::Mulmod, 0),
            opcode::EXP => (Mnemonic::Exp, 0),
            opcode::SIGNEXTEND => (Mnemonic::Signextend, 0),
            opcode::LT => (Mnemonic::Lt, 0),
            opcode::GT => (Mnemonic::Gt, 0),
            opcode::SLT => (Mnemonic::Slt, 0),
            opcode::SGT => (Mnemonic::Sgt, 0),
            opcode::EQ => (Mnemonic::Eq, 0),
            opcode::ISZERO => (Mnemonic::Iszero, 0),
            opcode::AND => (Mnemonic::And, 0),
            opcode::OR => (Mnemonic::Or, 0),
            opcode::XOR => (Mnemonic::Xor, 0),
            opcode::NOT => (Mnemonic::Not, 0),
            opcode::BYTE => (Mnemonic::Byte, 0),
            opcode::SHL => (Mnemonic::Shl, 0),
            opcode::SHR => (Mnemonic::Shr, 0),
            opcode::SAR => (Mnemonic::Sar, 0),
            opcode::KECCAK256 => (Mnemonic::Keccak256, 0),
            opcode::ADDRESS => (Mnemonic::Address, 0),
            opcode::BALANCE => (Mnemonic::Balance, 0),
            opcode::ORIGIN => (Mnemonic::Origin, 0),
            opcode::CALLER => (Mnemonic::Caller, 0),
            opcode::CALLVALUE => (Mnemonic::Callvalue, 0),
            opcode::CALLDATALOAD => (Mnemonic::Calldataload, 0),
            opcode::CALLDATASIZE => (Mnemonic::Calldatasize, 0),
            opcode::CALLDATACOPY => (Mnemonic::Calldatacopy, 0),
            opcode::CODESIZE => (Mnemonic::Codesize, 0),
            opcode::CODECOPY => (Mnemonic::Codecopy, 0),
            opcode::GASPRICE => (Mnemonic::Gasprice, 0),
            opcode::EXTCODESIZE => (Mnemonic::Extcodesize, 0),
            opcode::EXTCODECOPY => (Mnemonic::Extcodecopy, 0),
            opcode::RETURNDATASIZE => (Mnemonic::Returndatasize, 0),
            opcode::RETURNDATACOPY => (Mnemonic::Returndatacopy, 0),
            opcode::EXTCODEHASH => (Mnemonic::Extcodehash, 0),
            opcode::BLOCKHASH => (Mnemonic::Blockhash, 0),
            opcode::COINBASE => (Mnemonic::Coinbase, 0),
            opcode::TIMESTAMP => (Mnemonic::Timestamp, 0),
            opcode::NUMBER => (Mnemonic::Number, 0),
            opcode::DIFFICULTY => (Mnemonic::Difficulty, 0),
            opcode::GASLIMIT => (Mnemonic::Gaslimit, 0),
            opcode::CHAINID => (Mnemonic::Chainid, 0),
            opcode::SELFBALANCE => (Mnemonic::Selfbalance, 0),
            opcode::BASEFEE => (Mnemonic::Basefee, 0),
            opcode::POP => (Mnemonic::Pop, 0),
            opcode::MLOAD => (Mnemonic::Mload, 0),
            opcode::MSTORE => (Mnemonic::Mstore, 0),
            opcode::MSTORE8 => (Mnemonic::Mstore8, 0),
            opcode::SLOAD => (Mnemonic::Sload, 0),
            opcode::SSTORE => (Mnemonic::Sstore, 0),
            opcode::JUMP => (Mnemonic::Jump, 0),
            opcode::JUMPI => (Mnemonic::Jumpi, 0),
            opcode::PC => (Mnemonic::Pc, 0),
            opcode::MSIZE => (Mnemonic::Msize, 0),
            opcode::GAS => (Mnemonic::Gas, 0),
            opcode::JUMPDEST => (Mnemonic::Jumpdest, 0),
            opcode::PUSH1..=opcode::PUSH32 => (Mnemonic::Push(op - opcode::PUSH1 + 1), op - opcode::PUSH1 + 1),
            opcode::DUP1..=opcode::DUP16 => (Mnemonic::Dup(op - opcode::DUP1 + 1), 0),
            opcode::SWAP1..=opcode::SWAP16 => (Mnemonic::Swap(op - opcode::SWAP1 + 1), 0),
            opcode::LOG0..=opcode::LOG4 => (Mnemonic::Log(op - opcode::LOG0), 0),
            opcode::CREATE => (Mnemonic::Create, 0),
            opcode::CALL => (Mnemonic::Call, 0),
            opcode::CALLCODE => (Mnemonic::Callcode, 0),
            opcode::RETURN => (Mnemonic::Return, 0),
            opcode::DELEGATECALL => (Mnemonic::Delegatecall, 0),
            opcode::CREATE2 => (Mnemonic::Create2, 0),
            opcode::STATICCALL => (Mnemonic::Staticcall, 0),
            opcode::REVERT => (Mnemonic::Revert, 0),
            opcode::INVALID => (Mnemonic::Invalid, 0),
            opcode::SELFDESTRUCT => (Mnemonic::Selfdestruct, 0),
            _ => (Mnemonic::Invalid, 0),
        };
        let (operand, consumed) = match name {
            Mnemonic::Push(n) => {
                let avail = &bytes[(pc + 1).min(bytes.len())..bytes.len().min(pc + 1 + n as usize)];
                (Some(w256::from_be_bytes(avail)), n as usize)
            }
            _ => (None, 0),
        };
        let (pops, pushes) = match name {
            Mnemonic::Push(_) => (0, 1),
            Mnemonic::Dup(n) => (n, n + 1),
            Mnemonic::Swap(n) => (n + 1, n + 1),
            Mnemonic::Log(n) => (2 + n, 0),
            _ => fixed_stack_effect(&name),
        };
        out.push(Instruction {
            pc: start,
            name,
            operand,
            operand_size,
            pops,
            pushes,
        });
        pc += 1 + consumed;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_stop() {
        let ins = decode(&[opcode::STOP]);
        assert_eq!(ins.len(), 1);
        assert_eq!(ins[0].pc, 0);
        assert_eq!(ins[0].name, Mnemonic::Stop);
    }

    #[test]
    fn test_decode_push() {
        let ins = decode(&[opcode::PUSH2, 0x12, 0x34, opcode::STOP]);
        assert_eq!(ins.len(), 2);
        assert_eq!(ins[0].name, Mnemonic::Push(2));
        assert_eq!(ins[0].operand, Some(w256::from(0x1234u128)));
        assert_eq!(ins[0].operand_size, 2);
        assert_eq!(ins[1].pc, 3);
    }

    #[test]
    fn test_decode_truncated_push() {
        // A PUSH at the very end of the bytecode with fewer operand
        // bytes available than it calls for; matches real-world
        // bytecode that has been truncated by a trailing metadata
        // strip.
        let ins = decode(&[opcode::PUSH2, 0x12]);
        assert_eq!(ins.len(), 1);
        assert_eq!(ins[0].operand, Some(w256::from(0x12u128)));
    }

    #[test]
    fn test_decode_unknown() {
        let ins = decode(&[0x0c]);
        assert_eq!(ins[0].name, Mnemonic::Invalid);
        assert_eq!(ins[0].pops, 0);
        assert_eq!(ins[0].pushes, 0);
    }

    #[test]
    fn test_is_terminator() {
        let ins = decode(&[opcode::JUMP]);
        assert!(ins[0].is_terminator());
        let ins = decode(&[opcode::ADD]);
        assert!(!ins[0].is_terminator());
    }
}
