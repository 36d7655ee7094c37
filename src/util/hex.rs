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
use std::fmt::Write;

/// A simple trait allowing something to be converted into a hex
/// string.
pub trait ToHexString {
    fn to_hex_string(&self) -> String;
}

/// A simple trait allowing something to be converted from a hex
/// string.
pub trait FromHexString {
    type Error;

    fn from_hex_string(&self) -> Result<Vec<u8>, Self::Error>;
}

/// Something went wrong turning caller-supplied text into bytecode.
/// This is the one error surface this crate exposes past its own
/// boundary; everything downstream of a successful decode is
/// infallible (unknown opcodes just become `INVALID`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HexDecodeError {
    /// A character outside `[0-9a-fA-F]` was encountered at the given
    /// (post `0x`-stripping, post newline-stripping) offset.
    InvalidDigit(usize),
}

impl fmt::Display for HexDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HexDecodeError::InvalidDigit(at) => {
                write!(f, "invalid hex digit at offset {at}")
            }
        }
    }
}

impl std::error::Error for HexDecodeError {}

/// A default implementation for byte slices.
impl ToHexString for [u8] {
    fn to_hex_string(&self) -> String {
        let size = 2 + (2 * self.len());
        let mut hexstr = String::with_capacity(size);
        // Prepend "0x"
        write!(hexstr, "0x").unwrap();
        // Write each byte
        for b in self {
            write!(hexstr, "{b:02x}").unwrap();
        }
        // Done
        hexstr
    }
}

/// A default implementation for string slices.  Tolerates an optional
/// `0x` prefix and embedded newlines (bytecode is sometimes pasted in
/// from a multi-line source), and assumes a leading zero digit if an
/// odd number of hex digits remain.
impl FromHexString for str {
    type Error = HexDecodeError;

    fn from_hex_string(&self) -> Result<Vec<u8>, Self::Error> {
        let cleaned: String = self.chars().filter(|c| *c != '\n' && *c != '\r').collect();
        // Remove prepended "0x" (only if present)
        let slice = cleaned.strip_prefix("0x").unwrap_or(&cleaned);
        let digit = |i: usize| -> Result<u8, HexDecodeError> {
            let c = slice.as_bytes()[i] as char;
            c.to_digit(16).map(|v| v as u8).ok_or(HexDecodeError::InvalidDigit(i))
        };
        let mut bytes: Vec<u8> = Vec::new();
        let mut i = 0;
        // Account for an odd number of digits by assuming the leading
        // digit is zero.
        if slice.len() % 2 != 0 {
            bytes.push(digit(0)?);
            i = 1;
        }
        while i < slice.len() {
            let hi = digit(i)?;
            let lo = digit(i + 1)?;
            bytes.push((hi << 4) | lo);
            i += 2;
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let bytes: Vec<u8> = vec![0x60, 0x80, 0x60, 0x40];
        let hex = bytes.to_hex_string();
        assert_eq!(hex.from_hex_string().unwrap(), bytes);
    }

    #[test]
    fn test_no_prefix() {
        assert_eq!("6080".from_hex_string().unwrap(), vec![0x60, 0x80]);
    }

    #[test]
    fn test_odd_digits() {
        assert_eq!("fff".from_hex_string().unwrap(), vec![0x0f, 0xff]);
    }

    #[test]
    fn test_embedded_newlines() {
        assert_eq!("60\n80\r\n60\n40".from_hex_string().unwrap(), vec![0x60, 0x80, 0x60, 0x40]);
    }

    #[test]
    fn test_invalid_digit() {
        assert!("60zz".from_hex_string().is_err());
    }
}
