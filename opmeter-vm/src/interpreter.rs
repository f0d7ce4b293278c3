//! Interpreter loop
//!
//! One frame per `execute` call. Every iteration fetches the opcode, prices
//! it, reports the step to the attached hook, charges gas and only then runs
//! the operation, so a hook always sees the state the operation started from.

use crate::alu::{self, as_u64, as_usize_saturating, bool_word};
use crate::gas;
use crate::memory::{self, Memory};
use crate::stack::Stack;
use opmeter_core::{
    Engine, EnvConfig, Execution, ExecutionError, OpCode, RunConfig, Step, StepHook, Word,
    word_from_tail,
};
use std::collections::BTreeMap;

/// The bundled reference engine
#[derive(Debug, Default, Clone, Copy)]
pub struct Vm;

impl Vm {
    /// Create an engine
    pub fn new() -> Self {
        Self
    }
}

impl Engine for Vm {
    fn execute(
        &self,
        program: &[u8],
        input: Option<&[u8]>,
        config: &mut RunConfig<'_>,
    ) -> Execution {
        let env = config.env.clone();
        let hook = config.hook();

        let mut frame = Frame::new(program, input.unwrap_or_default(), &env);
        hook.on_begin();
        let result = frame.run(hook);

        let gas_left = match &result {
            Ok(()) | Err(ExecutionError::Reverted) => frame.gas,
            Err(_) => 0,
        };
        let gas_used = env.gas_limit - gas_left;
        let error = result.err();
        hook.on_end(gas_used, error.as_ref());

        tracing::debug!(
            steps = frame.steps,
            gas_used,
            error = ?error,
            "execution finished"
        );

        Execution {
            output: frame.output,
            gas_left,
            error,
        }
    }
}

enum Flow {
    Continue,
    Jump(usize),
    Halt,
}

struct Frame<'a> {
    code: &'a [u8],
    input: &'a [u8],
    env: &'a EnvConfig,
    jumpdests: Vec<bool>,
    pc: usize,
    gas: u64,
    steps: u64,
    stack: Stack,
    memory: Memory,
    storage: BTreeMap<Word, Word>,
    return_data: Vec<u8>,
    output: Vec<u8>,
}

fn jumpdest_map(code: &[u8]) -> Vec<bool> {
    let mut map = vec![false; code.len()];
    let mut i = 0;
    while i < code.len() {
        let op = OpCode::new(code[i]);
        if op == OpCode::JUMPDEST {
            map[i] = true;
        }
        i += 1 + op.push_size().unwrap_or(0);
    }
    map
}

/// Copy `src[offset..]` into `dest`, zero-filling whatever lies past the end of `src`
fn copy_padded(dest: &mut [u8], src: &[u8], offset: usize) {
    let available = src.get(offset..).unwrap_or_default();
    let n = available.len().min(dest.len());
    dest[..n].copy_from_slice(&available[..n]);
    dest[n..].fill(0);
}

impl<'a> Frame<'a> {
    fn new(code: &'a [u8], input: &'a [u8], env: &'a EnvConfig) -> Self {
        Self {
            code,
            input,
            env,
            jumpdests: jumpdest_map(code),
            pc: 0,
            gas: env.gas_limit,
            steps: 0,
            stack: Stack::new(),
            memory: Memory::default(),
            storage: BTreeMap::new(),
            return_data: Vec::new(),
            output: Vec::new(),
        }
    }

    fn run(&mut self, hook: &mut dyn StepHook) -> Result<(), ExecutionError> {
        loop {
            // past the end of code reads as STOP
            let op = OpCode::new(self.code.get(self.pc).copied().unwrap_or(0));
            let cost = self.price(op);

            hook.on_step(&Step {
                pc: self.pc as u64,
                op,
                gas: self.gas,
                cost: cost.as_ref().ok().copied(),
                depth: 1,
                stack: self.stack.as_slice(),
                memory: self.memory.as_slice(),
                return_data: &self.return_data,
                storage: &self.storage,
            });
            self.steps += 1;

            self.gas = self.gas.checked_sub(cost?).ok_or(ExecutionError::OutOfGas)?;

            match self.exec(op)? {
                Flow::Continue => self.pc += 1 + op.push_size().unwrap_or(0),
                Flow::Jump(dest) => self.pc = dest,
                Flow::Halt => return Ok(()),
            }
        }
    }

    /// Operand `n` from the top without popping; missing operands read as zero
    /// and are reported as underflow when the operation runs.
    fn arg(&self, n: usize) -> Word {
        self.stack.peek(n).copied().unwrap_or_default()
    }

    fn expansion(&self, offset: &Word, size: &Word) -> Result<u64, ExecutionError> {
        Ok(memory::region_end(offset, size)?
            .map_or(0, |end| memory::expansion_cost(self.memory.len(), end)))
    }

    fn price(&self, op: OpCode) -> Result<u64, ExecutionError> {
        let base = gas::static_cost(op).ok_or(ExecutionError::InvalidOpcode(op))?;
        let dynamic = match op {
            OpCode::EXP => gas::EXP_BYTE * alu::byte_len(&self.arg(1)),
            OpCode::MLOAD | OpCode::MSTORE => self.expansion(&self.arg(0), &Word::from(32u64))?,
            OpCode::MSTORE8 => self.expansion(&self.arg(0), &Word::from(1u64))?,
            OpCode::CALLDATACOPY | OpCode::CODECOPY => {
                let size = self.arg(2);
                let words = as_u64(&size).ok_or(ExecutionError::OutOfGas)?.div_ceil(32);
                gas::COPY_WORD
                    .saturating_mul(words)
                    .saturating_add(self.expansion(&self.arg(0), &size)?)
            }
            OpCode::RETURN | OpCode::REVERT => self.expansion(&self.arg(0), &self.arg(1))?,
            OpCode::SSTORE => {
                let current = self.storage.get(&self.arg(0)).copied().unwrap_or_default();
                if current.is_zero() && !self.arg(1).is_zero() {
                    gas::SSTORE_SET - gas::SSTORE_RESET
                } else {
                    0
                }
            }
            _ => 0,
        };
        Ok(base.saturating_add(dynamic))
    }

    /// Grow memory to cover `[offset, offset + size)`; `None` for an empty region
    fn touch(&mut self, offset: &Word, size: &Word) -> Result<Option<(usize, usize)>, ExecutionError> {
        let Some(end) = memory::region_end(offset, size)? else {
            return Ok(None);
        };
        self.memory.ensure(end)?;
        let len = as_usize_saturating(size);
        Ok(Some((end as usize - len, len)))
    }

    fn jump_target(&self, dest: &Word) -> Result<usize, ExecutionError> {
        let dest = as_usize_saturating(dest);
        if self.jumpdests.get(dest).copied().unwrap_or(false) {
            Ok(dest)
        } else {
            Err(ExecutionError::InvalidJump)
        }
    }

    fn push_immediate(&mut self, size: usize) -> Result<(), ExecutionError> {
        let start = (self.pc + 1).min(self.code.len());
        let end = (self.pc + 1 + size).min(self.code.len());
        let data = &self.code[start..end];
        // immediates cut off by the end of code are right-padded with zeros
        let mut buf = [0u8; 32];
        buf[32 - size..32 - size + data.len()].copy_from_slice(data);
        self.stack.push(Word::from_be_bytes(buf))
    }

    fn binary(&mut self, f: impl FnOnce(Word, Word) -> Word) -> Result<Flow, ExecutionError> {
        let [a, b] = self.stack.pop_n::<2>()?;
        self.stack.push(f(a, b))?;
        Ok(Flow::Continue)
    }

    fn push_word(&mut self, value: Word) -> Result<Flow, ExecutionError> {
        self.stack.push(value)?;
        Ok(Flow::Continue)
    }

    fn exec(&mut self, op: OpCode) -> Result<Flow, ExecutionError> {
        if let Some(size) = op.push_size() {
            self.push_immediate(size)?;
            return Ok(Flow::Continue);
        }
        if let Some(n) = op.dup_position() {
            self.stack.dup(n)?;
            return Ok(Flow::Continue);
        }
        if let Some(n) = op.swap_position() {
            self.stack.swap(n)?;
            return Ok(Flow::Continue);
        }

        match op {
            OpCode::STOP => Ok(Flow::Halt),

            OpCode::ADD => self.binary(|a, b| a.wrapping_add(b)),
            OpCode::MUL => self.binary(|a, b| a.wrapping_mul(b)),
            OpCode::SUB => self.binary(|a, b| a.wrapping_sub(b)),
            OpCode::DIV => self.binary(alu::div),
            OpCode::SDIV => self.binary(alu::sdiv),
            OpCode::MOD => self.binary(alu::rem),
            OpCode::SMOD => self.binary(alu::smod),
            OpCode::ADDMOD => {
                let [a, b, n] = self.stack.pop_n::<3>()?;
                let r = if n.is_zero() { Word::ZERO } else { a.add_mod(b, n) };
                self.push_word(r)
            }
            OpCode::MULMOD => {
                let [a, b, n] = self.stack.pop_n::<3>()?;
                let r = if n.is_zero() { Word::ZERO } else { a.mul_mod(b, n) };
                self.push_word(r)
            }
            OpCode::EXP => self.binary(|base, exp| base.wrapping_pow(exp)),
            OpCode::SIGNEXTEND => self.binary(alu::signextend),

            OpCode::LT => self.binary(|a, b| bool_word(a < b)),
            OpCode::GT => self.binary(|a, b| bool_word(a > b)),
            OpCode::SLT => self.binary(|a, b| bool_word(alu::slt(a, b))),
            OpCode::SGT => self.binary(|a, b| bool_word(alu::slt(b, a))),
            OpCode::EQ => self.binary(|a, b| bool_word(a == b)),
            OpCode::ISZERO => {
                let [a] = self.stack.pop_n::<1>()?;
                self.push_word(bool_word(a.is_zero()))
            }
            OpCode::AND => self.binary(|a, b| a & b),
            OpCode::OR => self.binary(|a, b| a | b),
            OpCode::XOR => self.binary(|a, b| a ^ b),
            OpCode::NOT => {
                let [a] = self.stack.pop_n::<1>()?;
                self.push_word(!a)
            }
            OpCode::BYTE => self.binary(alu::byte),
            OpCode::SHL => self.binary(alu::shl),
            OpCode::SHR => self.binary(alu::shr),
            OpCode::SAR => self.binary(alu::sar),

            OpCode::ADDRESS => self.push_word(self.env.address),
            OpCode::ORIGIN => self.push_word(self.env.origin),
            OpCode::CALLER => self.push_word(self.env.caller),
            OpCode::CALLVALUE => self.push_word(self.env.value),
            OpCode::CALLDATALOAD => {
                let [offset] = self.stack.pop_n::<1>()?;
                let mut buf = [0u8; 32];
                copy_padded(&mut buf, self.input, as_usize_saturating(&offset));
                self.push_word(Word::from_be_bytes(buf))
            }
            OpCode::CALLDATASIZE => self.push_word(Word::from(self.input.len() as u64)),
            OpCode::CALLDATACOPY => {
                let [dest, offset, size] = self.stack.pop_n::<3>()?;
                if let Some((start, len)) = self.touch(&dest, &size)? {
                    let mut buf = vec![0u8; len];
                    copy_padded(&mut buf, self.input, as_usize_saturating(&offset));
                    self.memory.store(start, &buf);
                }
                Ok(Flow::Continue)
            }
            OpCode::CODESIZE => self.push_word(Word::from(self.code.len() as u64)),
            OpCode::CODECOPY => {
                let [dest, offset, size] = self.stack.pop_n::<3>()?;
                if let Some((start, len)) = self.touch(&dest, &size)? {
                    let mut buf = vec![0u8; len];
                    copy_padded(&mut buf, self.code, as_usize_saturating(&offset));
                    self.memory.store(start, &buf);
                }
                Ok(Flow::Continue)
            }
            OpCode::GASPRICE => self.push_word(Word::from(self.env.gas_price)),
            OpCode::RETURNDATASIZE => self.push_word(Word::from(self.return_data.len() as u64)),

            OpCode::COINBASE => self.push_word(self.env.coinbase),
            OpCode::TIMESTAMP => self.push_word(Word::from(self.env.timestamp)),
            OpCode::NUMBER => self.push_word(Word::from(self.env.block_number)),
            OpCode::DIFFICULTY => self.push_word(self.env.difficulty),
            OpCode::GASLIMIT => self.push_word(Word::from(self.env.gas_limit)),
            OpCode::CHAINID => self.push_word(Word::from(self.env.chain_id)),
            // no account state: every balance is zero
            OpCode::SELFBALANCE => self.push_word(Word::ZERO),

            OpCode::POP => {
                self.stack.pop_n::<1>()?;
                Ok(Flow::Continue)
            }
            OpCode::MLOAD => {
                let [offset] = self.stack.pop_n::<1>()?;
                let word = match self.touch(&offset, &Word::from(32u64))? {
                    Some((start, len)) => word_from_tail(self.memory.read(start, len)),
                    None => Word::ZERO,
                };
                self.push_word(word)
            }
            OpCode::MSTORE => {
                let [offset, value] = self.stack.pop_n::<2>()?;
                if let Some((start, _)) = self.touch(&offset, &Word::from(32u64))? {
                    self.memory.store(start, &value.to_be_bytes::<32>());
                }
                Ok(Flow::Continue)
            }
            OpCode::MSTORE8 => {
                let [offset, value] = self.stack.pop_n::<2>()?;
                if let Some((start, _)) = self.touch(&offset, &Word::from(1u64))? {
                    self.memory.store(start, &[value.to_be_bytes::<32>()[31]]);
                }
                Ok(Flow::Continue)
            }
            OpCode::SLOAD => {
                let [key] = self.stack.pop_n::<1>()?;
                let value = *self.storage.entry(key).or_default();
                self.push_word(value)
            }
            OpCode::SSTORE => {
                let [key, value] = self.stack.pop_n::<2>()?;
                self.storage.insert(key, value);
                Ok(Flow::Continue)
            }
            OpCode::JUMP => {
                let [dest] = self.stack.pop_n::<1>()?;
                Ok(Flow::Jump(self.jump_target(&dest)?))
            }
            OpCode::JUMPI => {
                let [dest, condition] = self.stack.pop_n::<2>()?;
                if condition.is_zero() {
                    Ok(Flow::Continue)
                } else {
                    Ok(Flow::Jump(self.jump_target(&dest)?))
                }
            }
            OpCode::PC => self.push_word(Word::from(self.pc as u64)),
            OpCode::MSIZE => self.push_word(Word::from(self.memory.len() as u64)),
            OpCode::GAS => self.push_word(Word::from(self.gas)),
            OpCode::JUMPDEST => Ok(Flow::Continue),

            OpCode::RETURN | OpCode::REVERT => {
                let [offset, size] = self.stack.pop_n::<2>()?;
                self.output = match self.touch(&offset, &size)? {
                    Some((start, len)) => self.memory.read(start, len).to_vec(),
                    None => Vec::new(),
                };
                if op == OpCode::REVERT {
                    Err(ExecutionError::Reverted)
                } else {
                    Ok(Flow::Halt)
                }
            }

            _ => Err(ExecutionError::InvalidOpcode(op)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opmeter_core::{InstrumentCollector, TraceRecorder, TracerConfig};

    fn env() -> EnvConfig {
        EnvConfig {
            timestamp: 1_600_000_000,
            ..EnvConfig::default()
        }
    }

    fn run(code: &str) -> (Execution, InstrumentCollector) {
        let code = hex::decode(code).unwrap();
        let mut collector = InstrumentCollector::new();
        let mut config = RunConfig::builder(env()).instrumented(&mut collector);
        let execution = Vm::new().execute(&code, None, &mut config);
        (execution, collector)
    }

    fn ops(collector: &InstrumentCollector) -> Vec<OpCode> {
        collector.observations().iter().map(|o| o.op).collect()
    }

    #[test]
    fn test_add_and_return() {
        // PUSH1 2 PUSH1 3 ADD PUSH1 0 MSTORE PUSH1 32 PUSH1 0 RETURN
        let (execution, collector) = run("600260030160005260206000f3");
        assert!(execution.is_success());
        assert_eq!(word_from_tail(&execution.output), Word::from(5u64));
        assert_eq!(collector.len(), 8);
        assert_eq!(ops(&collector)[2], OpCode::ADD);
    }

    #[test]
    fn test_costs_reported_per_step() {
        // PUSH1 1 PUSH1 2 MUL STOP
        let (execution, collector) = run("600160020200");
        let costs: Vec<u64> = collector.observations().iter().map(|o| o.cost).collect();
        assert_eq!(costs, vec![3, 3, 5, 0]);
        assert_eq!(env().gas_limit - execution.gas_left, 11);
    }

    #[test]
    fn test_implicit_stop_is_observed() {
        let (execution, collector) = run("6001");
        assert!(execution.is_success());
        assert_eq!(ops(&collector), vec![OpCode::PUSH1, OpCode::STOP]);
    }

    #[test]
    fn test_invalid_opcode_reports_zero_cost() {
        let (execution, collector) = run("fe");
        assert_eq!(
            execution.error,
            Some(ExecutionError::InvalidOpcode(OpCode::INVALID))
        );
        assert_eq!(execution.gas_left, 0);
        assert_eq!(collector.observations()[0].cost, 0);
    }

    #[test]
    fn test_stack_underflow() {
        let (execution, collector) = run("01");
        assert!(matches!(
            execution.error,
            Some(ExecutionError::StackUnderflow { len: 0, required: 2 })
        ));
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn test_out_of_gas() {
        let code = hex::decode("6001600101").unwrap();
        let mut collector = InstrumentCollector::new();
        let mut config = RunConfig::builder(env())
            .gas_limit(5)
            .instrumented(&mut collector);
        let execution = Vm::new().execute(&code, None, &mut config);
        assert_eq!(execution.error, Some(ExecutionError::OutOfGas));
        assert_eq!(execution.gas_left, 0);
        // the failing PUSH1 is still observed
        assert_eq!(collector.len(), 2);
    }

    #[test]
    fn test_jumps() {
        // PUSH1 4 JUMP INVALID JUMPDEST PUSH1 1 STOP
        let (execution, collector) = run("600456fe5b600100");
        assert!(execution.is_success());
        assert_eq!(
            ops(&collector),
            vec![
                OpCode::PUSH1,
                OpCode::JUMP,
                OpCode::JUMPDEST,
                OpCode::PUSH1,
                OpCode::STOP
            ]
        );

        // jumping into push data
        let (execution, _) = run("600456605b00");
        assert_eq!(execution.error, Some(ExecutionError::InvalidJump));
    }

    #[test]
    fn test_conditional_jump_falls_through_on_zero() {
        // PUSH1 0 PUSH1 7 JUMPI PUSH1 1 STOP
        let (execution, collector) = run("6000600757600100");
        assert!(execution.is_success());
        assert_eq!(ops(&collector).len(), 5);
    }

    #[test]
    fn test_revert_keeps_output_and_gas() {
        // PUSH1 0xaa PUSH1 0 MSTORE8 PUSH1 1 PUSH1 0 REVERT
        let (execution, _) = run("60aa60005360016000fd");
        assert_eq!(execution.error, Some(ExecutionError::Reverted));
        assert_eq!(execution.output, vec![0xaa]);
        assert!(execution.gas_left > 0);
    }

    #[test]
    fn test_memory_expansion_cost() {
        // PUSH1 1 PUSH1 0 MSTORE STOP
        let (_, collector) = run("600160005200");
        assert_eq!(collector.observations()[2].cost, 3 + 3);
    }

    #[test]
    fn test_exp_byte_cost() {
        // PUSH2 0x0100 PUSH1 2 EXP
        let (execution, collector) = run("61010060020a");
        assert!(execution.is_success());
        assert_eq!(collector.observations()[2].cost, 10 + 2 * 50);
    }

    #[test]
    fn test_sstore_pricing_and_storage_view() {
        // PUSH1 7 PUSH1 1 SSTORE PUSH1 8 PUSH1 1 SSTORE STOP
        let code = hex::decode("6007600155600860015500").unwrap();
        let mut recorder = TraceRecorder::new(TracerConfig {
            disable_storage: false,
            ..TracerConfig::default()
        });
        let mut config = RunConfig::builder(env()).traced(&mut recorder);
        let execution = Vm::new().execute(&code, None, &mut config);
        assert!(execution.is_success());

        let steps = recorder.steps();
        assert_eq!(steps[2].cost, 20000);
        assert_eq!(steps[5].cost, 5000);
        let storage = steps[5].storage.as_ref().unwrap();
        assert_eq!(storage.get(&Word::from(1u64)), Some(&Word::from(7u64)));
    }

    #[test]
    fn test_push_data_truncated_by_end_of_code() {
        let code = [0x61, 0xab];
        let mut recorder = TraceRecorder::new(TracerConfig::default());
        let mut config = RunConfig::builder(env()).traced(&mut recorder);
        let execution = Vm::new().execute(&code, None, &mut config);
        assert!(execution.is_success());
        assert_eq!(recorder.steps()[1].stack, vec![Word::from(0xab00u64)]);
    }

    #[test]
    fn test_calldata() {
        // PUSH1 0 CALLDATALOAD CALLDATASIZE STOP
        let code = hex::decode("6000353600").unwrap();
        let input = [0x11u8, 0x22];
        let mut recorder = TraceRecorder::new(TracerConfig::default());
        let mut config = RunConfig::builder(env()).traced(&mut recorder);
        Vm::new().execute(&code, Some(&input), &mut config);

        let last = recorder.steps().last().unwrap();
        let mut expected = [0u8; 32];
        expected[..2].copy_from_slice(&input);
        assert_eq!(
            last.stack,
            vec![Word::from_be_bytes(expected), Word::from(2u64)]
        );
    }

    #[test]
    fn test_environment_reads() {
        // CHAINID TIMESTAMP GASLIMIT STOP
        let code = hex::decode("46424500").unwrap();
        let mut recorder = TraceRecorder::new(TracerConfig::default());
        let mut config = RunConfig::builder(env()).gas_limit(1000).traced(&mut recorder);
        Vm::new().execute(&code, None, &mut config);
        assert_eq!(
            recorder.steps()[3].stack,
            vec![
                Word::from(1u64),
                Word::from(1_600_000_000u64),
                Word::from(1000u64)
            ]
        );
    }

    #[test]
    fn test_hook_end_receives_gas_used() {
        let code = hex::decode("600160020200").unwrap();
        let mut recorder = TraceRecorder::new(TracerConfig::default());
        let mut config = RunConfig::builder(env()).gas_limit(100).traced(&mut recorder);
        Vm::new().execute(&code, None, &mut config);
        assert_eq!(recorder.gas_used(), 11);
        assert!(recorder.error().is_none());
    }
}
