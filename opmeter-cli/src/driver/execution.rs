//! Warm-up, sampling and finalization
//!
//! Every repetition builds its own [`RunConfig`] with a freshly created hook,
//! so nothing observed in one run can leak into the next. The warm-up uses
//! the same collector hook as `total`/`all` runs and its observations are
//! thrown away; only its return value and error are reported.

use super::{ConfigError, DriverError, MeasurementMode};
use crate::config::MeasureConfig;
use opmeter_core::{
    Engine, EnvConfig, Execution, ExecutionError, InstrumentCollector, Program, RunConfig, Timer,
    TraceRecorder, TracerConfig, pin_to_cpu, quiesce,
};
use opmeter_report::{CsvWriter, RunSummary, format_run_log, format_summary};
use opmeter_stats::compute_duration_stats;
use std::io::Write;
use std::time::{Duration, Instant};

/// Upper bound on the duration buffer reserved up front; larger sample sizes
/// grow it as runs complete
const MAX_PRESIZED_DURATIONS: usize = 1 << 16;

/// Validated measurement settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureSettings {
    /// Number of sampling repetitions (at least 1)
    pub sample_size: usize,
    /// What each repetition measures
    pub mode: MeasurementMode,
    /// Write the per-run log to the diagnostic stream (`all` mode)
    pub print_each: bool,
    /// Write CSV rows to the output stream
    pub print_csv: bool,
    /// Precede the CSV rows with a header line
    pub csv_header: bool,
    /// Pin the measuring thread to this CPU
    pub pin_cpu: Option<usize>,
}

impl MeasureSettings {
    /// Validate raw settings; fails on an unknown mode or a zero sample size
    pub fn from_config(config: &MeasureConfig) -> Result<Self, ConfigError> {
        let mode = config.mode.parse::<MeasurementMode>()?;
        if config.sample_size == 0 {
            return Err(ConfigError::ZeroSampleSize);
        }
        Ok(Self {
            sample_size: config.sample_size,
            mode,
            print_each: config.print_each,
            print_csv: config.print_csv,
            csv_header: config.csv_header,
            pin_cpu: config.pin_cpu,
        })
    }
}

/// Outcome of one sampling repetition, after its rows were written
#[derive(Debug, Clone, PartialEq)]
pub struct SampleResult {
    /// Repetition index (0-based, warm-up excluded)
    pub sample_id: usize,
    /// Wall time of the `execute` call (`all` mode only)
    pub duration: Option<Duration>,
    /// Operations observed
    pub steps: usize,
    /// Engine error, if the run stopped abnormally
    pub error: Option<ExecutionError>,
}

/// Runs the measurement protocol for one program
pub struct Driver<'p, E, O: Write, D: Write> {
    engine: E,
    program: &'p Program,
    env: EnvConfig,
    settings: MeasureSettings,
    csv: CsvWriter<O>,
    diag: D,
    /// Observation count of the warm-up, used to pre-size collectors
    capacity: usize,
}

/// Validate `config`, then warm up and sample `program` on `engine`.
///
/// Configuration errors are returned before the engine is called at all.
pub fn measure<E: Engine, O: Write, D: Write>(
    engine: E,
    program: &Program,
    env: EnvConfig,
    config: &MeasureConfig,
    out: O,
    diag: D,
) -> Result<RunSummary, DriverError> {
    let settings = MeasureSettings::from_config(config)?;
    Driver::new(engine, program, env, settings, out, diag).run()
}

impl<'p, E: Engine, O: Write, D: Write> Driver<'p, E, O, D> {
    /// Create a driver writing CSV rows to `out` and everything else to `diag`
    pub fn new(
        engine: E,
        program: &'p Program,
        env: EnvConfig,
        settings: MeasureSettings,
        out: O,
        diag: D,
    ) -> Self {
        let csv = CsvWriter::new(out, settings.csv_header);
        Self {
            engine,
            program,
            env,
            settings,
            csv,
            diag,
            capacity: 0,
        }
    }

    /// Warm-up, `sample_size` repetitions, then the summary
    pub fn run(&mut self) -> Result<RunSummary, DriverError> {
        if let Some(cpu) = self.settings.pin_cpu {
            match pin_to_cpu(cpu) {
                Ok(()) => tracing::debug!(cpu, "pinned measuring thread"),
                Err(e) => tracing::warn!(cpu, error = %e, "could not pin measuring thread"),
            }
        }

        tracing::info!(
            program = %self.program.id(),
            mode = %self.settings.mode,
            samples = self.settings.sample_size,
            "starting measurement"
        );

        let warmup = self.warm_up();

        let mut durations = Vec::new();
        if self.settings.mode == MeasurementMode::All {
            durations.reserve(self.settings.sample_size.min(MAX_PRESIZED_DURATIONS));
        }
        let start = Instant::now();
        for sample_id in 0..self.settings.sample_size {
            let result = self.sample(sample_id)?;
            if let Some(duration) = result.duration {
                durations.push(duration);
            }
        }
        let sample_duration = start.elapsed();
        self.csv.flush()?;

        let summary = RunSummary {
            program_id: self.program.id().to_string(),
            warmup_output: warmup.output,
            warmup_error: warmup.error,
            sample_duration,
            sample_count: self.settings.sample_size,
            run_durations: (self.settings.mode == MeasurementMode::All)
                .then(|| compute_duration_stats(&durations)),
        };

        self.diag.write_all(format_summary(&summary).as_bytes())?;
        self.diag.flush()?;
        Ok(summary)
    }

    /// One untimed run with a collector attached; observations are discarded
    pub fn warm_up(&mut self) -> Execution {
        let mut collector = InstrumentCollector::new();
        let mut config = RunConfig::builder(self.env.clone()).instrumented(&mut collector);
        let execution = self.engine.execute(self.program.code(), None, &mut config);
        drop(config);

        self.capacity = collector.len();
        tracing::debug!(
            steps = collector.len(),
            error = ?execution.error,
            "warm-up finished"
        );
        execution
    }

    /// One sampling repetition in the configured mode
    pub fn sample(&mut self, sample_id: usize) -> Result<SampleResult, DriverError> {
        match self.settings.mode {
            MeasurementMode::Total => self.sample_total(sample_id),
            MeasurementMode::All => self.sample_all(sample_id),
            MeasurementMode::Trace => self.sample_trace(sample_id),
        }
    }

    fn report_error(&mut self, sample_id: usize, execution: &Execution) -> Result<(), DriverError> {
        if let Some(err) = &execution.error {
            writeln!(self.diag, "Run {} error: {}", sample_id, err)?;
        }
        Ok(())
    }

    fn sample_total(&mut self, sample_id: usize) -> Result<SampleResult, DriverError> {
        let mut collector = InstrumentCollector::with_capacity(self.capacity);
        let execution = {
            let mut config = RunConfig::builder(self.env.clone()).instrumented(&mut collector);
            quiesce();
            self.engine.execute(self.program.code(), None, &mut config)
        };

        self.report_error(sample_id, &execution)?;
        if self.settings.print_csv {
            self.csv.write_aggregate(sample_id, &collector.summary())?;
        }

        Ok(SampleResult {
            sample_id,
            duration: None,
            steps: collector.len(),
            error: execution.error,
        })
    }

    fn sample_all(&mut self, sample_id: usize) -> Result<SampleResult, DriverError> {
        let mut collector = InstrumentCollector::with_capacity(self.capacity);
        let (execution, duration) = {
            let mut config = RunConfig::builder(self.env.clone()).instrumented(&mut collector);
            quiesce();
            let timer = Timer::start();
            let execution = self.engine.execute(self.program.code(), None, &mut config);
            let duration = timer.stop();
            (execution, duration)
        };

        self.report_error(sample_id, &execution)?;
        if self.settings.print_each {
            let log = format_run_log(duration, collector.observations());
            self.diag.write_all(log.as_bytes())?;
        }
        if self.settings.print_csv {
            self.csv.write_observations(sample_id, collector.observations())?;
        }

        Ok(SampleResult {
            sample_id,
            duration: Some(duration),
            steps: collector.len(),
            error: execution.error,
        })
    }

    fn sample_trace(&mut self, sample_id: usize) -> Result<SampleResult, DriverError> {
        let mut recorder = TraceRecorder::new(TracerConfig::default());
        let execution = {
            let mut config = RunConfig::builder(self.env.clone()).traced(&mut recorder);
            self.engine.execute(self.program.code(), None, &mut config)
        };

        self.report_error(sample_id, &execution)?;
        if self.settings.print_csv {
            self.csv.write_trace(recorder.steps())?;
        }

        Ok(SampleResult {
            sample_id,
            duration: None,
            steps: recorder.steps_seen(),
            error: execution.error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opmeter_core::{OpCode, Step, Word};
    use opmeter_report::{FULL_HEADER, TRACE_STACK_COLUMNS};
    use std::cell::Cell;
    use std::collections::BTreeMap;

    /// Engine double: reports a fixed step sequence and counts invocations
    struct CountingEngine {
        calls: Cell<usize>,
        ops: Vec<(OpCode, Option<u64>)>,
        fail_on_call: Option<usize>,
        delay: Duration,
    }

    impl CountingEngine {
        fn new() -> Self {
            Self {
                calls: Cell::new(0),
                ops: vec![
                    (OpCode::PUSH1, Some(3)),
                    (OpCode::PUSH1, Some(3)),
                    (OpCode::ADD, Some(3)),
                    (OpCode::INVALID, None),
                ],
                fail_on_call: None,
                delay: Duration::ZERO,
            }
        }

        fn calls(&self) -> usize {
            self.calls.get()
        }
    }

    impl Engine for CountingEngine {
        fn execute(
            &self,
            _program: &[u8],
            _input: Option<&[u8]>,
            config: &mut RunConfig<'_>,
        ) -> Execution {
            let call = self.calls.get();
            self.calls.set(call + 1);

            let stack = [Word::from(1u64), Word::from(2u64)];
            let storage = BTreeMap::new();
            let hook = config.hook();
            hook.on_begin();
            for (i, (op, cost)) in self.ops.iter().enumerate() {
                hook.on_step(&Step {
                    pc: i as u64,
                    op: *op,
                    gas: 1000,
                    cost: *cost,
                    depth: 1,
                    stack: &stack,
                    memory: &[],
                    return_data: &[],
                    storage: &storage,
                });
            }
            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
            let error = (self.fail_on_call == Some(call)).then_some(ExecutionError::Reverted);
            hook.on_end(9, error.as_ref());

            Execution {
                output: vec![0x2a],
                gas_left: 991,
                error,
            }
        }
    }

    fn program() -> Program {
        Program::from_hex("6001600201fe").unwrap()
    }

    fn config(mode: &str, sample_size: usize) -> MeasureConfig {
        MeasureConfig {
            sample_size,
            mode: mode.to_string(),
            print_each: false,
            print_csv: true,
            csv_header: false,
            pin_cpu: None,
        }
    }

    fn env() -> EnvConfig {
        EnvConfig {
            timestamp: 0,
            ..EnvConfig::default()
        }
    }

    fn run(
        engine: &CountingEngine,
        cfg: &MeasureConfig,
    ) -> (Result<RunSummary, DriverError>, String, String) {
        let mut out = Vec::new();
        let mut diag = Vec::new();
        let result = measure(engine, &program(), env(), cfg, &mut out, &mut diag);
        (
            result,
            String::from_utf8(out).unwrap(),
            String::from_utf8(diag).unwrap(),
        )
    }

    #[test]
    fn test_warm_up_plus_sample_size_invocations() {
        let engine = CountingEngine::new();
        let (result, _, _) = run(&engine, &config("total", 5));
        result.unwrap();
        assert_eq!(engine.calls(), 6);
    }

    #[test]
    fn test_total_mode_one_row_per_repetition() {
        let engine = CountingEngine::new();
        let (result, out, _) = run(&engine, &config("total", 3));
        result.unwrap();

        let rows: Vec<Vec<&str>> = out.lines().map(|l| l.split(',').collect()).collect();
        assert_eq!(rows.len(), 3);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row[0], i.to_string());
            // collector starts empty every repetition: identical counts and costs
            assert_eq!(row[1], "4");
            assert_eq!(row[2], "9");
        }
    }

    #[test]
    fn test_invalid_mode_never_calls_engine() {
        let engine = CountingEngine::new();
        let (result, out, diag) = run(&engine, &config("fast", 3));
        assert!(matches!(
            result,
            Err(DriverError::Config(ConfigError::InvalidMode(ref m))) if m == "fast"
        ));
        assert_eq!(engine.calls(), 0);
        assert!(out.is_empty());
        assert!(diag.is_empty());
    }

    #[test]
    fn test_zero_sample_size_rejected() {
        let engine = CountingEngine::new();
        let (result, _, _) = run(&engine, &config("all", 0));
        assert!(matches!(
            result,
            Err(DriverError::Config(ConfigError::ZeroSampleSize))
        ));
        assert_eq!(engine.calls(), 0);
    }

    #[test]
    fn test_all_mode_rows_and_logs() {
        let engine = CountingEngine::new();
        let mut cfg = config("all", 2);
        cfg.print_each = true;
        cfg.csv_header = true;
        let (result, out, diag) = run(&engine, &cfg);
        let summary = result.unwrap();

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], FULL_HEADER);
        // header once, then one row per observation of each sampled run
        assert_eq!(lines.len(), 1 + 2 * 4);
        assert!(lines[1].starts_with("0,0,0,PUSH1,3,"));
        assert!(lines[4].starts_with("0,3,3,INVALID,0,"));
        assert!(lines[5].starts_with("1,0,0,PUSH1,3,"));

        assert_eq!(diag.matches("Run duration:").count(), 2);
        let stats = summary.run_durations.unwrap();
        assert_eq!(stats.sample_count, 2);
    }

    #[test]
    fn test_print_each_off_keeps_diagnostics_quiet() {
        let engine = CountingEngine::new();
        let (result, _, diag) = run(&engine, &config("all", 2));
        result.unwrap();
        assert!(!diag.contains("Run duration:"));
        assert!(diag.contains("Program: 6001600201fe"));
        assert!(diag.contains("Return: 0x2a"));
    }

    #[test]
    fn test_trace_mode_fixed_width_rows() {
        let engine = CountingEngine::new();
        let (result, out, _) = run(&engine, &config("trace", 2));
        let summary = result.unwrap();
        assert!(summary.run_durations.is_none());

        let rows: Vec<&str> = out.lines().collect();
        assert_eq!(rows.len(), 2 * 4);
        for row in rows {
            let cells: Vec<&str> = row.split(',').collect();
            assert_eq!(cells.len(), 4 + TRACE_STACK_COLUMNS);
            assert_eq!(cells[3], "2");
            assert_eq!(&cells[4..6], &["1", "2"]);
            assert!(cells[6..].iter().all(|c| c.is_empty()));
        }
    }

    #[test]
    fn test_csv_disabled_writes_nothing_to_output() {
        let engine = CountingEngine::new();
        let mut cfg = config("total", 3);
        cfg.print_csv = false;
        let (result, out, _) = run(&engine, &cfg);
        result.unwrap();
        assert!(out.is_empty());
        assert_eq!(engine.calls(), 4);
    }

    #[test]
    fn test_engine_errors_do_not_abort_sampling() {
        let mut engine = CountingEngine::new();
        // call 0 is the warm-up; call 2 is sample 1
        engine.fail_on_call = Some(2);
        let (result, out, diag) = run(&engine, &config("total", 4));
        result.unwrap();
        assert_eq!(engine.calls(), 5);
        assert_eq!(out.lines().count(), 4);
        assert!(diag.contains("Run 1 error: execution reverted"));
    }

    #[test]
    fn test_warm_up_error_reported_in_summary() {
        let mut engine = CountingEngine::new();
        engine.fail_on_call = Some(0);
        let (result, out, diag) = run(&engine, &config("total", 1));
        let summary = result.unwrap();
        assert_eq!(summary.warmup_error, Some(ExecutionError::Reverted));
        assert!(diag.contains("Warm-up error: execution reverted"));
        assert_eq!(out.lines().count(), 1);
    }

    #[test]
    fn test_sample_duration_spans_every_repetition() {
        let mut engine = CountingEngine::new();
        engine.delay = Duration::from_micros(200);

        let (one, _, _) = run(&engine, &config("total", 1));
        let (five, _, _) = run(&engine, &config("total", 5));
        let one = one.unwrap().sample_duration;
        let five = five.unwrap().sample_duration;

        assert!(one >= Duration::from_micros(200));
        assert!(five >= Duration::from_micros(5 * 200));
    }

    #[test]
    fn test_driver_reuses_nothing_between_samples() {
        let engine = CountingEngine::new();
        let settings = MeasureSettings::from_config(&config("all", 1)).unwrap();
        let program = program();
        let mut driver = Driver::new(&engine, &program, env(), settings, Vec::new(), Vec::new());
        driver.warm_up();
        let first = driver.sample(0).unwrap();
        let second = driver.sample(1).unwrap();
        assert_eq!(first.steps, 4);
        assert_eq!(second.steps, 4);
        assert!(first.duration.is_some());
    }

    /// Output sink that refuses every write
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_huge_sample_size_does_not_preallocate() {
        for mode in ["total", "all"] {
            let engine = CountingEngine::new();
            let mut diag = Vec::new();
            let result = measure(
                &engine,
                &program(),
                env(),
                &config(mode, usize::MAX),
                ClosedPipe,
                &mut diag,
            );

            // warm-up, then the first repetition fails on its CSV write
            assert!(matches!(result, Err(DriverError::Io(_))), "mode {mode}");
            assert_eq!(engine.calls(), 2, "mode {mode}");
        }
    }
}
