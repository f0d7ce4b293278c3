//! Arithmetic program generator
//!
//! Produces straight-line programs made of random `PUSH32` operands and
//! arithmetic operations, sized by a gas budget. Each operation finds one
//! operand already on the stack and has the rest pushed right before it, so
//! generated programs never underflow.

use opmeter_core::OpCode;
use opmeter_vm::gas;
use super::seeded_rng;
use rand::Rng;
use std::io::{self, Write};

/// Operations drawn from, with the number of stack operands each consumes
const ARITHMETIC: [(OpCode, usize); 9] = [
    (OpCode::ADD, 2),
    (OpCode::MUL, 2),
    (OpCode::SUB, 2),
    (OpCode::DIV, 2),
    (OpCode::SDIV, 2),
    (OpCode::MOD, 2),
    (OpCode::SMOD, 2),
    (OpCode::ADDMOD, 3),
    (OpCode::MULMOD, 3),
];

/// One generated program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedProgram {
    /// Program bytes
    pub bytecode: Vec<u8>,
    /// Operations in the program, pushes included
    pub op_count: usize,
    /// Gas the program consumes on the reference schedule
    pub gas: u64,
}

impl GeneratedProgram {
    /// Hex text of the program, as accepted by `opmeter --bytecode`
    pub fn hex(&self) -> String {
        hex::encode(&self.bytecode)
    }
}

fn push_random_word(rng: &mut impl Rng, bytecode: &mut Vec<u8>) {
    let mut word = [0u8; 32];
    rng.fill(&mut word[..]);
    bytecode.push(OpCode::PUSH32.byte());
    bytecode.extend_from_slice(&word);
}

/// Generate one program whose gas reaches `gas_limit`
pub fn generate_arithmetic(rng: &mut impl Rng, gas_limit: u64) -> GeneratedProgram {
    let push_cost = gas::VERY_LOW;

    let mut bytecode = Vec::new();
    push_random_word(rng, &mut bytecode);
    let mut op_count = 1;
    let mut used = push_cost;

    while used < gas_limit {
        let (op, arity) = ARITHMETIC[rng.gen_range(0..ARITHMETIC.len())];
        // one operand is always already on the stack
        let pushes = arity - 1;
        for _ in 0..pushes {
            push_random_word(rng, &mut bytecode);
        }
        bytecode.push(op.byte());
        op_count += pushes + 1;
        used += push_cost * pushes as u64 + gas::static_cost(op).unwrap_or(0);
    }

    GeneratedProgram {
        bytecode,
        op_count,
        gas: used,
    }
}

/// Generate `count` programs; a seed makes the output reproducible
pub fn generate(count: usize, gas_limit: u64, seed: Option<u64>) -> Vec<GeneratedProgram> {
    let mut rng = seeded_rng(seed);
    (0..count)
        .map(|_| generate_arithmetic(&mut rng, gas_limit))
        .collect()
}

/// Write programs one hex line each, or as `program_id,bytecode` CSV with header
pub fn write_programs(
    out: &mut impl Write,
    programs: &[GeneratedProgram],
    full_csv: bool,
) -> io::Result<()> {
    if full_csv {
        writeln!(out, "program_id,bytecode")?;
        for (i, program) in programs.iter().enumerate() {
            writeln!(out, "{},{}", i, program.hex())?;
        }
    } else {
        for program in programs {
            writeln!(out, "{}", program.hex())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_reaches_gas_limit() {
        let mut rng = StdRng::seed_from_u64(7);
        let program = generate_arithmetic(&mut rng, 100);
        assert!(program.gas >= 100);
        assert_eq!(program.bytecode[0], OpCode::PUSH32.byte());
    }

    #[test]
    fn test_small_limit_still_emits_one_operation() {
        let mut rng = StdRng::seed_from_u64(7);
        let program = generate_arithmetic(&mut rng, 4);
        assert!(program.op_count >= 3);
    }

    #[test]
    fn test_seed_is_deterministic() {
        let a = generate(3, 500, Some(123_123_123));
        let b = generate(3, 500, Some(123_123_123));
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert_ne!(a[0], a[1]);
    }

    #[test]
    fn test_op_count_matches_bytecode() {
        let program = &generate(1, 1000, Some(1))[0];
        let mut count = 0;
        let mut i = 0;
        while i < program.bytecode.len() {
            let op = OpCode::new(program.bytecode[i]);
            i += 1 + op.push_size().unwrap_or(0);
            count += 1;
        }
        assert_eq!(count, program.op_count);
    }

    #[test]
    fn test_write_full_csv() {
        let programs = vec![
            GeneratedProgram {
                bytecode: vec![0x01],
                op_count: 1,
                gas: 3,
            },
            GeneratedProgram {
                bytecode: vec![0x02, 0x03],
                op_count: 2,
                gas: 8,
            },
        ];
        let mut out = Vec::new();
        write_programs(&mut out, &programs, true).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "program_id,bytecode\n0,01\n1,0203\n"
        );

        let mut out = Vec::new();
        write_programs(&mut out, &programs, false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "01\n0203\n");
    }
}
