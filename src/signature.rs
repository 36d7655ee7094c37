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
use std::collections::HashMap;

/// An external collaborator mapping a 4-byte selector to a textual
/// function signature, e.g. `transfer(address,uint256)`. Consumed, not
/// specified: callers may wire up their own full 4-byte directory.
pub trait SignatureTable {
    fn lookup(&self, selector: u32) -> Option<&str>;
}

/// The crate's own small built-in table, covering the handful of
/// selectors common enough to show up in nearly every ERC-20-shaped
/// contract. Grounded in `known_hashes.py`'s `known_hashes` dict
/// format, but not a mirror of its full (multi-megabyte) contents.
pub struct BuiltinSignatures {
    table: HashMap<u32, &'static str>,
}

impl BuiltinSignatures {
    pub fn new() -> Self {
        let entries: &[(u32, &'static str)] = &[
            (0xa9059cbb, "transfer(address,uint256)"),
            (0x095ea7b3, "approve(address,uint256)"),
            (0x23b872dd, "transferFrom(address,address,uint256)"),
            (0x70a08231, "balanceOf(address)"),
            (0x18160ddd, "totalSupply()"),
            (0xdd62ed3e, "allowance(address,address)"),
            (0x313ce567, "decimals()"),
            (0x06fdde03, "name()"),
            (0x95d89b41, "symbol()"),
            (0x42966c68, "burn(uint256)"),
        ];
        BuiltinSignatures {
            table: entries.iter().copied().collect(),
        }
    }
}

impl Default for BuiltinSignatures {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureTable for BuiltinSignatures {
    fn lookup(&self, selector: u32) -> Option<&str> {
        self.table.get(&selector).copied()
    }
}

/// A table that never resolves anything; the default when a caller
/// doesn't care about human-readable names.
#[derive(Default)]
pub struct NoSignatures;

impl SignatureTable for NoSignatures {
    fn lookup(&self, _selector: u32) -> Option<&str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let t = BuiltinSignatures::new();
        assert_eq!(t.lookup(0xa9059cbb), Some("transfer(address,uint256)"));
        assert_eq!(t.lookup(0xdeadbeef), None);
    }

    #[test]
    fn test_no_signatures() {
        let t = NoSignatures;
        assert_eq!(t.lookup(0xa9059cbb), None);
    }
}
