#![warn(missing_docs)]
//! opmeter CLI Library
//!
//! Command-line front end for the measurement harness. Use `opmeter::run()`
//! (or `opmeter_cli::run()`) from a `main` function:
//!
//! ```ignore
//! fn main() {
//!     if let Err(e) = opmeter_cli::run() {
//!         eprintln!("error: {e:#}");
//!         std::process::exit(1);
//!     }
//! }
//! ```
//!
//! Standard output carries CSV rows only. Logs, per-run output, the final
//! summary and errors all go to standard error.

mod config;
mod driver;
mod generator;

pub use config::*;
pub use driver::{
    ConfigError, Driver, DriverError, MeasureSettings, MeasurementMode, SampleResult, measure,
};
pub use generator::{
    DEFAULT_OPS_LIMIT, Dominant, GeneratedProgram, GeneratorError, ValidationOptions,
    ValidationProgram, generate, generate_arithmetic, generate_validation, write_programs,
    write_validation_programs,
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use opmeter_core::Program;
use opmeter_vm::Vm;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// opmeter CLI arguments
#[derive(Parser, Debug)]
#[command(name = "opmeter")]
#[command(
    author,
    version,
    about = "opmeter - per-operation cost measurement for bytecode programs"
)]
pub struct Cli {
    /// Optional subcommand; without one, the program given by --bytecode is measured
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Program to measure, hex encoded (a leading 0x is accepted)
    #[arg(long, short = 'b')]
    pub bytecode: Option<String>,

    /// Number of measured repetitions after the warm-up run
    #[arg(long, short = 'n')]
    pub sample_size: Option<usize>,

    /// Measurement mode: all, total or trace
    #[arg(long, short = 'm')]
    pub mode: Option<String>,

    /// Print each run's duration and operation log to stderr (all mode)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub print_each: Option<bool>,

    /// Write CSV rows to stdout
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub print_csv: Option<bool>,

    /// Write a header line before the first CSV row
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub csv_header: Option<bool>,

    /// Pin the measuring thread to this CPU
    #[arg(long)]
    pub pin_cpu: Option<usize>,

    /// Gas available to each execution (default: unlimited)
    #[arg(long)]
    pub gas_limit: Option<u64>,

    /// Configuration file (default: nearest opmeter.toml)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate random arithmetic programs
    Generate {
        /// Number of programs
        #[arg(long, default_value = "1")]
        count: usize,
        /// Gas each program should consume
        #[arg(long, default_value = "10000")]
        gas_limit: u64,
        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
        /// Print `program_id,bytecode` CSV instead of one program per line
        #[arg(long)]
        full_csv: bool,
    },
    /// Generate programs mixing the whole operation selection
    GenerateValidation {
        /// Number of programs
        #[arg(long, default_value = "1")]
        count: usize,
        /// Operations per program, pushes and pops included (default 100 when no limit is given)
        #[arg(long)]
        ops_limit: Option<usize>,
        /// Bytes per program
        #[arg(long)]
        bytecode_limit: Option<usize>,
        /// Draw each program's operations limit from 1..=ops-limit
        #[arg(long)]
        randomize_ops_limit: bool,
        /// Opcode picked for about half of the operations, or `random` for one per program
        #[arg(long)]
        dominant: Option<String>,
        /// Operand width in bytes, 1 to 32
        #[arg(long, default_value = "32")]
        push: usize,
        /// Draw each operand width from 1..=push
        #[arg(long)]
        randomize_push: bool,
        /// Pop every result right after its operation
        #[arg(long)]
        clean_stack: bool,
        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
        /// Print `program_id,bytecode,dominant` CSV instead of one program per line
        #[arg(long)]
        full_csv: bool,
    },
    /// Print a default opmeter.toml
    InitConfig,
}

/// Run the opmeter CLI with the process arguments.
///
/// # Returns
/// Returns `Ok(())` on success, or the error that should end the process
/// with a non-zero status.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the opmeter CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    init_tracing(cli.verbose);

    match cli.command {
        Some(Commands::InitConfig) => {
            print!("{}", OpmeterConfig::default_toml());
            Ok(())
        }
        Some(Commands::Generate {
            count,
            gas_limit,
            seed,
            full_csv,
        }) => {
            let programs = generate(count, gas_limit, seed);
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            write_programs(&mut out, &programs, full_csv)?;
            out.flush()?;
            Ok(())
        }
        Some(Commands::GenerateValidation {
            count,
            ops_limit,
            bytecode_limit,
            randomize_ops_limit,
            ref dominant,
            push,
            randomize_push,
            clean_stack,
            seed,
            full_csv,
        }) => {
            let options = ValidationOptions {
                ops_limit,
                bytecode_limit,
                randomize_ops_limit,
                dominant: dominant
                    .as_deref()
                    .map(str::parse::<Dominant>)
                    .transpose()?,
                push,
                randomize_push,
                clean_stack,
            };
            let programs = generate_validation(count, &options, seed)?;
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            write_validation_programs(&mut out, &programs, full_csv)?;
            out.flush()?;
            Ok(())
        }
        None => run_measurement(&cli),
    }
}

/// Default filter `warn`; `--verbose` raises the opmeter crates to `debug`;
/// `RUST_LOG` wins over both. Always writes to stderr.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,opmeter=debug,opmeter_cli=debug,opmeter_core=debug,opmeter_vm=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // a subscriber may already be installed when embedded or under test
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Layer configuration: built-in defaults, then the file, then flags.
pub fn resolve_config(cli: &Cli) -> anyhow::Result<OpmeterConfig> {
    let mut config = match &cli.config {
        Some(path) => OpmeterConfig::load(path)?,
        None => OpmeterConfig::discover()?.unwrap_or_default(),
    };
    apply_overrides(cli, &mut config);
    Ok(config)
}

/// Apply the flags the user actually passed on top of `config`
pub fn apply_overrides(cli: &Cli, config: &mut OpmeterConfig) {
    let measure = &mut config.measure;
    if let Some(n) = cli.sample_size {
        measure.sample_size = n;
    }
    if let Some(mode) = &cli.mode {
        measure.mode = mode.clone();
    }
    if let Some(v) = cli.print_each {
        measure.print_each = v;
    }
    if let Some(v) = cli.print_csv {
        measure.print_csv = v;
    }
    if let Some(v) = cli.csv_header {
        measure.csv_header = v;
    }
    if cli.pin_cpu.is_some() {
        measure.pin_cpu = cli.pin_cpu;
    }
    if cli.gas_limit.is_some() {
        config.engine.gas_limit = cli.gas_limit;
    }
}

fn run_measurement(cli: &Cli) -> anyhow::Result<()> {
    let config = resolve_config(cli)?;

    // validated here as well as in `measure` so a bad mode wins over a bad program
    MeasureSettings::from_config(&config.measure)?;
    let text = cli
        .bytecode
        .as_deref()
        .context("no program given (use --bytecode <HEX>)")?;
    let program = Program::from_hex(text).map_err(ConfigError::from)?;

    let env = config.engine.to_env();
    tracing::debug!(?env, "execution environment");

    let stdout = io::stdout();
    let stderr = io::stderr();
    let out = BufWriter::new(stdout.lock());
    let diag = stderr.lock();
    measure(Vm::new(), &program, env, &config.measure, out, diag)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("opmeter").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_override_file_values() {
        let cli = parse(&[
            "--bytecode",
            "6001",
            "--sample-size",
            "7",
            "--mode",
            "trace",
            "--print-csv",
            "--print-each",
            "false",
            "--gas-limit",
            "500",
        ]);
        let mut config = OpmeterConfig::default();
        config.measure.csv_header = true;
        apply_overrides(&cli, &mut config);

        assert_eq!(config.measure.sample_size, 7);
        assert_eq!(config.measure.mode, "trace");
        assert!(config.measure.print_csv);
        assert!(!config.measure.print_each);
        // untouched by flags
        assert!(config.measure.csv_header);
        assert_eq!(config.engine.gas_limit, Some(500));
    }

    #[test]
    fn test_no_flags_keep_file_values() {
        let cli = parse(&["--bytecode", "6001"]);
        let mut config = OpmeterConfig::default();
        config.measure.mode = "total".to_string();
        config.measure.sample_size = 3;
        apply_overrides(&cli, &mut config);
        assert_eq!(config.measure.mode, "total");
        assert_eq!(config.measure.sample_size, 3);
    }

    #[test]
    fn test_generate_subcommand() {
        let cli = parse(&["generate", "--count", "2", "--seed", "5", "--full-csv"]);
        match cli.command {
            Some(Commands::Generate {
                count,
                gas_limit,
                seed,
                full_csv,
            }) => {
                assert_eq!(count, 2);
                assert_eq!(gas_limit, 10_000);
                assert_eq!(seed, Some(5));
                assert!(full_csv);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_generate_validation_subcommand() {
        let cli = parse(&[
            "generate-validation",
            "--ops-limit",
            "40",
            "--dominant",
            "mload",
            "--push",
            "4",
            "--clean-stack",
            "--seed",
            "9",
        ]);
        match cli.command {
            Some(Commands::GenerateValidation {
                count,
                ops_limit,
                bytecode_limit,
                ref dominant,
                push,
                clean_stack,
                seed,
                ..
            }) => {
                assert_eq!(count, 1);
                assert_eq!(ops_limit, Some(40));
                assert_eq!(bytecode_limit, None);
                assert_eq!(dominant.as_deref(), Some("mload"));
                assert_eq!(push, 4);
                assert!(clean_stack);
                assert_eq!(seed, Some(9));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_generate_validation_rejects_unknown_dominant() {
        let cli = parse(&["generate-validation", "--dominant", "CALL"]);
        let err = run_with_cli(cli).unwrap_err();
        assert!(err.to_string().contains("unsupported dominant opcode: CALL"));
    }

    #[test]
    fn test_invalid_mode_is_fatal_before_program_decoding() {
        let cli = parse(&["--bytecode", "zz", "--mode", "fast"]);
        let err = run_measurement(&cli).unwrap_err();
        assert!(err.to_string().contains("invalid measurement mode: fast"));
    }

    #[test]
    fn test_bad_hex_is_fatal() {
        let cli = parse(&["--bytecode", "0x60zz", "--mode", "total"]);
        let err = run_measurement(&cli).unwrap_err();
        assert!(err.to_string().contains("invalid program"));
    }

    #[test]
    fn test_missing_program_is_fatal() {
        let cli = parse(&["--mode", "total"]);
        assert!(run_measurement(&cli).is_err());
    }
}
