//! Gas schedule
//!
//! Static per-opcode costs plus the constants for the dynamic parts
//! (memory expansion, copies, `EXP` exponent bytes, storage writes).

#![allow(missing_docs)]

use opmeter_core::OpCode;

pub const ZERO: u64 = 0;
pub const JUMPDEST: u64 = 1;
pub const BASE: u64 = 2;
pub const VERY_LOW: u64 = 3;
pub const LOW: u64 = 5;
pub const MID: u64 = 8;
pub const HIGH: u64 = 10;

/// Per-byte cost of the `EXP` exponent
pub const EXP_BYTE: u64 = 50;
/// Per-word cost of `CALLDATACOPY` / `CODECOPY`
pub const COPY_WORD: u64 = 3;
pub const SLOAD: u64 = 800;
/// Writing to a slot that already holds a value (or clearing it)
pub const SSTORE_RESET: u64 = 5000;
/// Writing a non-zero value into an empty slot
pub const SSTORE_SET: u64 = 20000;

/// Static cost of `op`, `None` for unassigned bytes and `INVALID`
pub fn static_cost(op: OpCode) -> Option<u64> {
    if op.push_size().is_some() || op.dup_position().is_some() || op.swap_position().is_some() {
        return Some(VERY_LOW);
    }
    let cost = match op {
        OpCode::STOP | OpCode::RETURN | OpCode::REVERT => ZERO,

        OpCode::ADD | OpCode::SUB => VERY_LOW,
        OpCode::MUL | OpCode::DIV | OpCode::SDIV | OpCode::MOD | OpCode::SMOD => LOW,
        OpCode::SIGNEXTEND => LOW,
        OpCode::ADDMOD | OpCode::MULMOD => MID,
        OpCode::EXP => HIGH,

        OpCode::LT
        | OpCode::GT
        | OpCode::SLT
        | OpCode::SGT
        | OpCode::EQ
        | OpCode::ISZERO
        | OpCode::AND
        | OpCode::OR
        | OpCode::XOR
        | OpCode::NOT
        | OpCode::BYTE
        | OpCode::SHL
        | OpCode::SHR
        | OpCode::SAR => VERY_LOW,

        OpCode::ADDRESS
        | OpCode::ORIGIN
        | OpCode::CALLER
        | OpCode::CALLVALUE
        | OpCode::CALLDATASIZE
        | OpCode::CODESIZE
        | OpCode::GASPRICE
        | OpCode::RETURNDATASIZE
        | OpCode::COINBASE
        | OpCode::TIMESTAMP
        | OpCode::NUMBER
        | OpCode::DIFFICULTY
        | OpCode::GASLIMIT
        | OpCode::CHAINID
        | OpCode::POP
        | OpCode::PC
        | OpCode::MSIZE
        | OpCode::GAS => BASE,
        OpCode::SELFBALANCE => LOW,

        OpCode::CALLDATALOAD
        | OpCode::CALLDATACOPY
        | OpCode::CODECOPY
        | OpCode::MLOAD
        | OpCode::MSTORE
        | OpCode::MSTORE8 => VERY_LOW,

        OpCode::SLOAD => SLOAD,
        OpCode::SSTORE => SSTORE_RESET,
        OpCode::JUMP => MID,
        OpCode::JUMPI => HIGH,
        OpCode::JUMPDEST => JUMPDEST,

        _ => return None,
    };
    Some(cost)
}
