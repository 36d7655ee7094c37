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

//! Recovers a control-flow graph from EVM bytecode: basic-block
//! splitting, Solidity metadata stripping, dispatcher/function
//! discovery, a per-function stack value-set analysis that resolves
//! indirect jumps, reachability pruning, and `payable`/`view`/`pure`
//! classification.
//!
//! The analysis is deliberately unsound (see [`abstract_value`]): it
//! under-approximates an over-approximation of the program's possible
//! jump targets. Treat the recovered CFG as best-effort.

/// The abstract stack element lattice (`Top` / bounded value sets)
/// the value-set analysis is built on.
pub mod abstract_value;
/// Basic blocks, their per-function edge maps, and block splitting.
pub mod block;
/// The CFG root aggregate: construction, the analysis pipeline, and
/// public lookups.
pub mod cfg;
/// Graphviz DOT rendering of a function's (or the whole CFG's)
/// recovered control flow.
pub mod dot;
/// Function/attribute model and `payable`/`view`/`pure`
/// classification.
pub mod function;
/// The decoded instruction model and the byte-to-instruction decoder.
pub mod instruction;
/// Solidity metadata-trailer stripping and library-placeholder
/// rewriting, both applied before decoding.
pub mod metadata;
/// Raw EVM opcode byte constants.
pub mod opcode;
/// External 4-byte-selector-to-signature lookup.
pub mod signature;
/// The abstract operand stack built from `AbsStackElem`s.
pub mod stack;
/// Small free-standing helpers: 256-bit words, hex conversion, byte
/// packing.
pub mod util;
/// The stack value-set analysis driver: the worklist fixed point that
/// resolves indirect `JUMP`/`JUMPI` targets.
pub mod vsa;
