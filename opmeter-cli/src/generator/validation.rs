//! Validation program generator
//!
//! Programs drawn from the whole operation selection, used to check a cost
//! model against measurements of mixed code. Every program starts with a
//! memory preallocation and one jump, so allocation and jump-table effects
//! are paid up front instead of landing on whichever operation happens to
//! touch them first.
//!
//! Operands are pushed right before each operation. With `clean_stack` the
//! results are popped afterwards; otherwise they feed the next operation and
//! only the missing operands are pushed.

use super::{GeneratorError, seeded_rng};
use opmeter_core::OpCode;
use rand::Rng;
use std::io::{self, Write};
use std::str::FromStr;

/// Operations limit used when neither limit is given
pub const DEFAULT_OPS_LIMIT: usize = 100;

/// Memory offset and length operands stay below this bound
const MEMORY_ARG_LIMIT: u64 = 1 << 14;

/// Bytes preallocated by the prologue; covers a copy of the largest length at
/// the largest offset
const PREALLOCATED: u64 = 2 * MEMORY_ARG_LIMIT;

/// One entry of the selection. PUSH, DUP and SWAP each count as a single
/// entry so their 64 variants do not swamp the rest; the variant is drawn
/// afterwards with equal probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Op(OpCode),
    Push,
    Dup,
    Swap,
}

const SELECTION: &[Entry] = &[
    // arithmetic
    Entry::Op(OpCode::ADD),
    Entry::Op(OpCode::MUL),
    Entry::Op(OpCode::SUB),
    Entry::Op(OpCode::DIV),
    Entry::Op(OpCode::SDIV),
    Entry::Op(OpCode::MOD),
    Entry::Op(OpCode::SMOD),
    Entry::Op(OpCode::ADDMOD),
    Entry::Op(OpCode::MULMOD),
    Entry::Op(OpCode::EXP),
    // bitwise, byte, shift
    Entry::Op(OpCode::AND),
    Entry::Op(OpCode::OR),
    Entry::Op(OpCode::XOR),
    Entry::Op(OpCode::NOT),
    Entry::Op(OpCode::BYTE),
    Entry::Op(OpCode::SIGNEXTEND),
    Entry::Op(OpCode::SHL),
    Entry::Op(OpCode::SHR),
    Entry::Op(OpCode::SAR),
    // comparison
    Entry::Op(OpCode::LT),
    Entry::Op(OpCode::GT),
    Entry::Op(OpCode::SLT),
    Entry::Op(OpCode::SGT),
    Entry::Op(OpCode::EQ),
    Entry::Op(OpCode::ISZERO),
    // nullary environment reads
    Entry::Op(OpCode::ADDRESS),
    Entry::Op(OpCode::ORIGIN),
    Entry::Op(OpCode::CALLER),
    Entry::Op(OpCode::CALLVALUE),
    Entry::Op(OpCode::CODESIZE),
    Entry::Op(OpCode::GASPRICE),
    Entry::Op(OpCode::COINBASE),
    Entry::Op(OpCode::TIMESTAMP),
    Entry::Op(OpCode::NUMBER),
    Entry::Op(OpCode::DIFFICULTY),
    Entry::Op(OpCode::GASLIMIT),
    Entry::Op(OpCode::CHAINID),
    Entry::Op(OpCode::SELFBALANCE),
    Entry::Op(OpCode::PC),
    Entry::Op(OpCode::MSIZE),
    Entry::Op(OpCode::GAS),
    Entry::Op(OpCode::RETURNDATASIZE),
    Entry::Op(OpCode::POP),
    Entry::Op(OpCode::JUMPDEST),
    // memory reads and copies
    Entry::Op(OpCode::CALLDATALOAD),
    Entry::Op(OpCode::CALLDATASIZE),
    Entry::Op(OpCode::CALLDATACOPY),
    Entry::Op(OpCode::CODECOPY),
    Entry::Op(OpCode::MLOAD),
    // control flow
    Entry::Op(OpCode::JUMP),
    Entry::Op(OpCode::JUMPI),
    // memory writes
    Entry::Op(OpCode::MSTORE),
    Entry::Op(OpCode::MSTORE8),
    // stack
    Entry::Push,
    Entry::Dup,
    Entry::Swap,
];

fn is_byte_op(op: OpCode) -> bool {
    matches!(op, OpCode::BYTE | OpCode::SIGNEXTEND)
}

fn is_shift_op(op: OpCode) -> bool {
    matches!(op, OpCode::SHL | OpCode::SHR | OpCode::SAR)
}

fn is_jump(op: OpCode) -> bool {
    matches!(op, OpCode::JUMP | OpCode::JUMPI)
}

fn is_mstore(op: OpCode) -> bool {
    matches!(op, OpCode::MSTORE | OpCode::MSTORE8)
}

/// Operations whose operands are all memory offsets or lengths
fn is_memory_op(op: OpCode) -> bool {
    matches!(
        op,
        OpCode::CALLDATALOAD
            | OpCode::CALLDATASIZE
            | OpCode::CALLDATACOPY
            | OpCode::CODECOPY
            | OpCode::MLOAD
    )
}

/// Takes arbitrary-size offsets off the stack unless operands are controlled
fn needs_clean_stack(op: OpCode) -> bool {
    is_memory_op(op) || is_mstore(op)
}

/// Whether `op` can be drawn at all
fn is_selectable(op: OpCode) -> bool {
    op.push_size().is_some()
        || op.dup_position().is_some()
        || op.swap_position().is_some()
        || SELECTION.contains(&Entry::Op(op))
}

/// Opcode favored in every draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dominant {
    /// This opcode, for every program
    Fixed(OpCode),
    /// An opcode drawn from the selection, once per program
    Random,
}

impl FromStr for Dominant {
    type Err = GeneratorError;

    /// `random`, or a mnemonic from the selection (any case)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("random") {
            return Ok(Dominant::Random);
        }
        match OpCode::from_name(s) {
            Some(op) if is_selectable(op) => Ok(Dominant::Fixed(op)),
            _ => Err(GeneratorError::UnknownOpcode(s.to_string())),
        }
    }
}

/// Shape of generated validation programs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Stop after this many generated operations, pushes and pops included
    pub ops_limit: Option<usize>,
    /// Stop once the program reaches this many bytes
    pub bytecode_limit: Option<usize>,
    /// Draw each program's operations limit from `1..=ops_limit`
    pub randomize_ops_limit: bool,
    /// Opcode picked for about half of the operations
    pub dominant: Option<Dominant>,
    /// Width of pushed operands in bytes (1..=32)
    pub push: usize,
    /// Draw each operand width from `1..=push`
    pub randomize_push: bool,
    /// Pop every result right after its operation
    pub clean_stack: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            ops_limit: None,
            bytecode_limit: None,
            randomize_ops_limit: false,
            dominant: None,
            push: 32,
            randomize_push: false,
            clean_stack: false,
        }
    }
}

impl ValidationOptions {
    /// Reject operand widths outside `1..=32` and dominants that cannot be
    /// generated with these options
    pub fn validate(&self) -> Result<(), GeneratorError> {
        if !(1..=32).contains(&self.push) {
            return Err(GeneratorError::PushSize(self.push));
        }
        if let Some(Dominant::Fixed(op)) = self.dominant {
            if needs_clean_stack(op) && !self.clean_stack {
                return Err(GeneratorError::NeedsCleanStack(op));
            }
        }
        Ok(())
    }

    /// Limits in effect: zero means unset, and no limit at all means
    /// [`DEFAULT_OPS_LIMIT`] operations
    fn limits(&self) -> (Option<usize>, Option<usize>) {
        let ops = self.ops_limit.filter(|&n| n > 0);
        let bytes = self.bytecode_limit.filter(|&n| n > 0);
        match (ops, bytes) {
            (None, None) => (Some(DEFAULT_OPS_LIMIT), None),
            limits => limits,
        }
    }

    fn pool(&self) -> Vec<Entry> {
        SELECTION
            .iter()
            .copied()
            .filter(|entry| match entry {
                Entry::Op(op) => self.clean_stack || !needs_clean_stack(*op),
                _ => true,
            })
            .collect()
    }

    fn operand_width(&self, rng: &mut impl Rng) -> usize {
        if self.randomize_push {
            rng.gen_range(1..=self.push)
        } else {
            self.push
        }
    }
}

/// One generated validation program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationProgram {
    /// Program bytes
    pub bytecode: Vec<u8>,
    /// Generated operations, prologue excluded
    pub op_count: usize,
    /// Opcode this program was biased toward
    pub dominant: Option<OpCode>,
}

impl ValidationProgram {
    /// Hex text of the program, as accepted by `opmeter --bytecode`
    pub fn hex(&self) -> String {
        hex::encode(&self.bytecode)
    }
}

fn resolve(entry: Entry, rng: &mut impl Rng) -> OpCode {
    match entry {
        Entry::Op(op) => op,
        Entry::Push => OpCode::new(OpCode::PUSH1.byte() + rng.gen_range(0..32u8)),
        Entry::Dup => OpCode::new(OpCode::DUP1.byte() + rng.gen_range(0..16u8)),
        Entry::Swap => OpCode::new(OpCode::SWAP1.byte() + rng.gen_range(0..16u8)),
    }
}

/// `PUSH<width>` of `value`, big-endian and zero-padded
fn push_fixed(code: &mut Vec<u8>, width: usize, value: u64) {
    code.push(OpCode::PUSH1.byte() + (width - 1) as u8);
    let be = value.to_be_bytes();
    if width >= be.len() {
        code.resize(code.len() + width - be.len(), 0);
        code.extend_from_slice(&be);
    } else {
        code.extend_from_slice(&be[be.len() - width..]);
    }
}

/// `PUSH<width>` of random bytes
fn push_random(code: &mut Vec<u8>, rng: &mut impl Rng, width: usize) {
    code.push(OpCode::PUSH1.byte() + (width - 1) as u8);
    let start = code.len();
    code.resize(start + width, 0);
    rng.fill(&mut code[start..]);
}

/// Push the address of the `JUMPDEST` that directly follows `jump`
fn jump_combo(code: &mut Vec<u8>, jump: OpCode) {
    let width = if code.len() + 4 <= u16::MAX as usize { 2 } else { 4 };
    let dest = code.len() + 1 + width + 1;
    push_fixed(code, width, dest as u64);
    code.push(jump.byte());
    code.push(OpCode::JUMPDEST.byte());
}

/// Touch the top of the preallocated region, then take one jump
fn prologue(code: &mut Vec<u8>) {
    push_fixed(code, 1, 0);
    push_fixed(code, 2, PREALLOCATED - 32);
    code.push(OpCode::MSTORE.byte());
    jump_combo(code, OpCode::JUMP);
}

/// One program; at least one of `ops_limit` and `bytecode_limit` is set
fn generate_one(
    rng: &mut impl Rng,
    options: &ValidationOptions,
    pool: &[Entry],
    ops_limit: Option<usize>,
    bytecode_limit: Option<usize>,
    dominant: Option<OpCode>,
) -> ValidationProgram {
    let mut code = Vec::new();
    prologue(&mut code);

    let mut op_count = 0;
    // results of the previous operation still on the stack
    let mut leftover = 0;

    while ops_limit.map_or(true, |limit| op_count < limit)
        && bytecode_limit.map_or(true, |limit| code.len() < limit)
    {
        let entry = match dominant {
            Some(op) if rng.gen_bool(0.5) => Entry::Op(op),
            _ => pool[rng.gen_range(0..pool.len())],
        };
        let op = resolve(entry, rng);
        let (inputs, outputs) = op.stack_io().unwrap_or((0, 0));
        // jump destinations come with the combo
        let arity = if is_jump(op) { inputs - 1 } else { inputs };
        let needed = if options.clean_stack {
            arity
        } else {
            arity.saturating_sub(leftover)
        };
        let fresh = options.clean_stack || leftover == 0;

        let pushes = if is_byte_op(op) {
            // byte index / sign position on top must stay below 32
            if fresh {
                let width = options.operand_width(rng);
                push_random(&mut code, rng, width);
            }
            push_fixed(&mut code, 1, rng.gen_range(0..32));
            1 + usize::from(fresh)
        } else if is_shift_op(op) {
            // shift amount on top fits one byte
            if fresh {
                let width = options.operand_width(rng);
                push_random(&mut code, rng, width);
            }
            push_random(&mut code, rng, 1);
            1 + usize::from(fresh)
        } else if is_memory_op(op) {
            for _ in 0..needed {
                push_fixed(&mut code, 2, rng.gen_range(0..MEMORY_ARG_LIMIT));
            }
            needed
        } else if is_mstore(op) {
            // value, then offset on top
            let width = options.operand_width(rng);
            push_random(&mut code, rng, width);
            push_fixed(&mut code, 2, rng.gen_range(0..MEMORY_ARG_LIMIT));
            2
        } else {
            for _ in 0..needed {
                let width = options.operand_width(rng);
                push_random(&mut code, rng, width);
            }
            needed
        };
        op_count += pushes;

        if is_jump(op) {
            jump_combo(&mut code, op);
            op_count += 3;
        } else if let Some(width) = op.push_size() {
            push_random(&mut code, rng, width);
            op_count += 1;
        } else {
            code.push(op.byte());
            op_count += 1;
        }

        if options.clean_stack {
            code.extend(std::iter::repeat(OpCode::POP.byte()).take(outputs));
            op_count += outputs;
        } else {
            leftover = outputs;
        }
    }

    ValidationProgram {
        bytecode: code,
        op_count,
        dominant,
    }
}

/// Generate `count` validation programs; a seed makes the output reproducible
pub fn generate_validation(
    count: usize,
    options: &ValidationOptions,
    seed: Option<u64>,
) -> Result<Vec<ValidationProgram>, GeneratorError> {
    options.validate()?;

    let mut rng = seeded_rng(seed);
    let (ops_limit, bytecode_limit) = options.limits();
    let pool = options.pool();

    let programs = (0..count)
        .map(|_| {
            let limit = match ops_limit {
                Some(max) if options.randomize_ops_limit => Some(rng.gen_range(1..=max)),
                limit => limit,
            };
            let dominant = match options.dominant {
                Some(Dominant::Fixed(op)) => Some(op),
                Some(Dominant::Random) => {
                    let entry = pool[rng.gen_range(0..pool.len())];
                    Some(resolve(entry, &mut rng))
                }
                None => None,
            };
            generate_one(&mut rng, options, &pool, limit, bytecode_limit, dominant)
        })
        .collect();
    Ok(programs)
}

/// Write programs one hex line each, or as `program_id,bytecode,dominant` CSV
/// with header; programs without a dominant leave the column empty
pub fn write_validation_programs(
    out: &mut impl Write,
    programs: &[ValidationProgram],
    full_csv: bool,
) -> io::Result<()> {
    if full_csv {
        writeln!(out, "program_id,bytecode,dominant")?;
        for (i, program) in programs.iter().enumerate() {
            let dominant = program.dominant.map(|op| op.to_string()).unwrap_or_default();
            writeln!(out, "{},{},{}", i, program.hex(), dominant)?;
        }
    } else {
        for program in programs {
            writeln!(out, "{}", program.hex())?;
        }
    }
    Ok(())
}
