//! Operation identifiers
//!
//! Byte-sized opcodes with their mnemonics. The table follows the EVM
//! numbering so programs produced by other tooling decode unchanged.

use std::fmt;

/// A single-byte operation identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpCode(u8);

#[allow(missing_docs)]
impl OpCode {
    pub const STOP: OpCode = OpCode(0x00);
    pub const ADD: OpCode = OpCode(0x01);
    pub const MUL: OpCode = OpCode(0x02);
    pub const SUB: OpCode = OpCode(0x03);
    pub const DIV: OpCode = OpCode(0x04);
    pub const SDIV: OpCode = OpCode(0x05);
    pub const MOD: OpCode = OpCode(0x06);
    pub const SMOD: OpCode = OpCode(0x07);
    pub const ADDMOD: OpCode = OpCode(0x08);
    pub const MULMOD: OpCode = OpCode(0x09);
    pub const EXP: OpCode = OpCode(0x0a);
    pub const SIGNEXTEND: OpCode = OpCode(0x0b);

    pub const LT: OpCode = OpCode(0x10);
    pub const GT: OpCode = OpCode(0x11);
    pub const SLT: OpCode = OpCode(0x12);
    pub const SGT: OpCode = OpCode(0x13);
    pub const EQ: OpCode = OpCode(0x14);
    pub const ISZERO: OpCode = OpCode(0x15);
    pub const AND: OpCode = OpCode(0x16);
    pub const OR: OpCode = OpCode(0x17);
    pub const XOR: OpCode = OpCode(0x18);
    pub const NOT: OpCode = OpCode(0x19);
    pub const BYTE: OpCode = OpCode(0x1a);
    pub const SHL: OpCode = OpCode(0x1b);
    pub const SHR: OpCode = OpCode(0x1c);
    pub const SAR: OpCode = OpCode(0x1d);

    pub const ADDRESS: OpCode = OpCode(0x30);
    pub const ORIGIN: OpCode = OpCode(0x32);
    pub const CALLER: OpCode = OpCode(0x33);
    pub const CALLVALUE: OpCode = OpCode(0x34);
    pub const CALLDATALOAD: OpCode = OpCode(0x35);
    pub const CALLDATASIZE: OpCode = OpCode(0x36);
    pub const CALLDATACOPY: OpCode = OpCode(0x37);
    pub const CODESIZE: OpCode = OpCode(0x38);
    pub const CODECOPY: OpCode = OpCode(0x39);
    pub const GASPRICE: OpCode = OpCode(0x3a);
    pub const RETURNDATASIZE: OpCode = OpCode(0x3d);

    pub const COINBASE: OpCode = OpCode(0x41);
    pub const TIMESTAMP: OpCode = OpCode(0x42);
    pub const NUMBER: OpCode = OpCode(0x43);
    pub const DIFFICULTY: OpCode = OpCode(0x44);
    pub const GASLIMIT: OpCode = OpCode(0x45);
    pub const CHAINID: OpCode = OpCode(0x46);
    pub const SELFBALANCE: OpCode = OpCode(0x47);

    pub const POP: OpCode = OpCode(0x50);
    pub const MLOAD: OpCode = OpCode(0x51);
    pub const MSTORE: OpCode = OpCode(0x52);
    pub const MSTORE8: OpCode = OpCode(0x53);
    pub const SLOAD: OpCode = OpCode(0x54);
    pub const SSTORE: OpCode = OpCode(0x55);
    pub const JUMP: OpCode = OpCode(0x56);
    pub const JUMPI: OpCode = OpCode(0x57);
    pub const PC: OpCode = OpCode(0x58);
    pub const MSIZE: OpCode = OpCode(0x59);
    pub const GAS: OpCode = OpCode(0x5a);
    pub const JUMPDEST: OpCode = OpCode(0x5b);

    pub const PUSH1: OpCode = OpCode(0x60);
    pub const PUSH32: OpCode = OpCode(0x7f);
    pub const DUP1: OpCode = OpCode(0x80);
    pub const DUP16: OpCode = OpCode(0x8f);
    pub const SWAP1: OpCode = OpCode(0x90);
    pub const SWAP16: OpCode = OpCode(0x9f);

    pub const RETURN: OpCode = OpCode(0xf3);
    pub const REVERT: OpCode = OpCode(0xfd);
    pub const INVALID: OpCode = OpCode(0xfe);
}

const PUSH_NAMES: [&str; 32] = [
    "PUSH1", "PUSH2", "PUSH3", "PUSH4", "PUSH5", "PUSH6", "PUSH7", "PUSH8", "PUSH9", "PUSH10",
    "PUSH11", "PUSH12", "PUSH13", "PUSH14", "PUSH15", "PUSH16", "PUSH17", "PUSH18", "PUSH19",
    "PUSH20", "PUSH21", "PUSH22", "PUSH23", "PUSH24", "PUSH25", "PUSH26", "PUSH27", "PUSH28",
    "PUSH29", "PUSH30", "PUSH31", "PUSH32",
];

const DUP_NAMES: [&str; 16] = [
    "DUP1", "DUP2", "DUP3", "DUP4", "DUP5", "DUP6", "DUP7", "DUP8", "DUP9", "DUP10", "DUP11",
    "DUP12", "DUP13", "DUP14", "DUP15", "DUP16",
];

const SWAP_NAMES: [&str; 16] = [
    "SWAP1", "SWAP2", "SWAP3", "SWAP4", "SWAP5", "SWAP6", "SWAP7", "SWAP8", "SWAP9", "SWAP10",
    "SWAP11", "SWAP12", "SWAP13", "SWAP14", "SWAP15", "SWAP16",
];

impl OpCode {
    /// Wrap a raw byte
    #[inline]
    pub const fn new(byte: u8) -> Self {
        Self(byte)
    }

    /// Raw byte value
    #[inline]
    pub const fn byte(self) -> u8 {
        self.0
    }

    /// Number of immediate bytes following a `PUSHn`, `None` for every other opcode
    #[inline]
    pub const fn push_size(self) -> Option<usize> {
        if self.0 >= Self::PUSH1.0 && self.0 <= Self::PUSH32.0 {
            Some((self.0 - Self::PUSH1.0) as usize + 1)
        } else {
            None
        }
    }

    /// Stack position duplicated by a `DUPn` (1-based)
    #[inline]
    pub const fn dup_position(self) -> Option<usize> {
        if self.0 >= Self::DUP1.0 && self.0 <= Self::DUP16.0 {
            Some((self.0 - Self::DUP1.0) as usize + 1)
        } else {
            None
        }
    }

    /// Stack position exchanged with the top by a `SWAPn` (1-based)
    #[inline]
    pub const fn swap_position(self) -> Option<usize> {
        if self.0 >= Self::SWAP1.0 && self.0 <= Self::SWAP16.0 {
            Some((self.0 - Self::SWAP1.0) as usize + 1)
        } else {
            None
        }
    }

    /// Mnemonic, or `None` if the byte is not an assigned opcode
    pub fn name(self) -> Option<&'static str> {
        if let Some(n) = self.push_size() {
            return Some(PUSH_NAMES[n - 1]);
        }
        if let Some(n) = self.dup_position() {
            return Some(DUP_NAMES[n - 1]);
        }
        if let Some(n) = self.swap_position() {
            return Some(SWAP_NAMES[n - 1]);
        }

        let name = match self {
            Self::STOP => "STOP",
            Self::ADD => "ADD",
            Self::MUL => "MUL",
            Self::SUB => "SUB",
            Self::DIV => "DIV",
            Self::SDIV => "SDIV",
            Self::MOD => "MOD",
            Self::SMOD => "SMOD",
            Self::ADDMOD => "ADDMOD",
            Self::MULMOD => "MULMOD",
            Self::EXP => "EXP",
            Self::SIGNEXTEND => "SIGNEXTEND",
            Self::LT => "LT",
            Self::GT => "GT",
            Self::SLT => "SLT",
            Self::SGT => "SGT",
            Self::EQ => "EQ",
            Self::ISZERO => "ISZERO",
            Self::AND => "AND",
            Self::OR => "OR",
            Self::XOR => "XOR",
            Self::NOT => "NOT",
            Self::BYTE => "BYTE",
            Self::SHL => "SHL",
            Self::SHR => "SHR",
            Self::SAR => "SAR",
            Self::ADDRESS => "ADDRESS",
            Self::ORIGIN => "ORIGIN",
            Self::CALLER => "CALLER",
            Self::CALLVALUE => "CALLVALUE",
            Self::CALLDATALOAD => "CALLDATALOAD",
            Self::CALLDATASIZE => "CALLDATASIZE",
            Self::CALLDATACOPY => "CALLDATACOPY",
            Self::CODESIZE => "CODESIZE",
            Self::CODECOPY => "CODECOPY",
            Self::GASPRICE => "GASPRICE",
            Self::RETURNDATASIZE => "RETURNDATASIZE",
            Self::COINBASE => "COINBASE",
            Self::TIMESTAMP => "TIMESTAMP",
            Self::NUMBER => "NUMBER",
            Self::DIFFICULTY => "DIFFICULTY",
            Self::GASLIMIT => "GASLIMIT",
            Self::CHAINID => "CHAINID",
            Self::SELFBALANCE => "SELFBALANCE",
            Self::POP => "POP",
            Self::MLOAD => "MLOAD",
            Self::MSTORE => "MSTORE",
            Self::MSTORE8 => "MSTORE8",
            Self::SLOAD => "SLOAD",
            Self::SSTORE => "SSTORE",
            Self::JUMP => "JUMP",
            Self::JUMPI => "JUMPI",
            Self::PC => "PC",
            Self::MSIZE => "MSIZE",
            Self::GAS => "GAS",
            Self::JUMPDEST => "JUMPDEST",
            Self::RETURN => "RETURN",
            Self::REVERT => "REVERT",
            Self::INVALID => "INVALID",
            _ => return None,
        };
        Some(name)
    }
}

impl OpCode {
    /// Look up an opcode by mnemonic, ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        (0..=u8::MAX)
            .map(Self)
            .find(|op| op.name().is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }

    /// Stack effect as `(consumed, produced)`, `None` for unassigned bytes
    pub fn stack_io(self) -> Option<(usize, usize)> {
        if self.push_size().is_some() {
            return Some((0, 1));
        }
        if let Some(n) = self.dup_position() {
            return Some((n, n + 1));
        }
        if let Some(n) = self.swap_position() {
            return Some((n + 1, n + 1));
        }

        let io = match self {
            Self::STOP | Self::JUMPDEST | Self::INVALID => (0, 0),

            Self::ADD
            | Self::MUL
            | Self::SUB
            | Self::DIV
            | Self::SDIV
            | Self::MOD
            | Self::SMOD
            | Self::EXP
            | Self::SIGNEXTEND
            | Self::LT
            | Self::GT
            | Self::SLT
            | Self::SGT
            | Self::EQ
            | Self::AND
            | Self::OR
            | Self::XOR
            | Self::BYTE
            | Self::SHL
            | Self::SHR
            | Self::SAR => (2, 1),
            Self::ADDMOD | Self::MULMOD => (3, 1),
            Self::ISZERO | Self::NOT => (1, 1),

            Self::ADDRESS
            | Self::ORIGIN
            | Self::CALLER
            | Self::CALLVALUE
            | Self::CALLDATASIZE
            | Self::CODESIZE
            | Self::GASPRICE
            | Self::RETURNDATASIZE
            | Self::COINBASE
            | Self::TIMESTAMP
            | Self::NUMBER
            | Self::DIFFICULTY
            | Self::GASLIMIT
            | Self::CHAINID
            | Self::SELFBALANCE
            | Self::PC
            | Self::MSIZE
            | Self::GAS => (0, 1),

            Self::CALLDATALOAD | Self::MLOAD | Self::SLOAD => (1, 1),
            Self::CALLDATACOPY | Self::CODECOPY => (3, 0),
            Self::POP | Self::JUMP => (1, 0),
            Self::MSTORE | Self::MSTORE8 | Self::SSTORE | Self::JUMPI => (2, 0),
            Self::RETURN | Self::REVERT => (2, 0),
            _ => return None,
        };
        Some(io)
    }
}

impl From<u8> for OpCode {
    fn from(byte: u8) -> Self {
        Self(byte)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:02x}", self.0),
        }
    }
}
