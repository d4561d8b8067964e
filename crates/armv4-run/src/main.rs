//! Host runner for the ARMv4 core: flat binaries and Linux kernels.

mod boot;
mod config;
mod logger;

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::boot::Machine;
use crate::config::RunnerConfig;

#[cfg(test)]
use tempfile as _;

#[derive(Debug, Parser)]
#[command(name = "armv4-run", version, about = "Run an image on the ARMv4 core")]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Wait for a line on stdin before each instruction (`c` runs on, `q` quits).
    #[arg(long, global = true)]
    step: bool,

    /// Log every executed instruction at trace level.
    #[arg(long, global = true)]
    disasm: bool,

    /// Stop after this many instructions.
    #[arg(long, global = true)]
    max_instructions: Option<u64>,

    /// Log level for stderr output.
    #[arg(long, global = true, default_value = "info")]
    log_level: log::LevelFilter,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Load a flat binary and jump to it.
    Bin {
        /// Image file.
        image: PathBuf,
        /// Load address.
        #[arg(long, value_parser = parse_address, default_value = "0")]
        base: u32,
        /// Entry point; defaults to the load address.
        #[arg(long, value_parser = parse_address)]
        entry: Option<u32>,
    },
    /// Boot a Linux kernel image with a device tree.
    Linux {
        /// Kernel image (zImage or Image).
        image: PathBuf,
        /// Device tree blob.
        #[arg(long)]
        dtb: PathBuf,
    },
}

/// Accepts `0x`-prefixed hex or decimal.
fn parse_address(text: &str) -> Result<u32, String> {
    let parsed = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .map_or_else(|| text.parse(), |hex| u32::from_str_radix(hex, 16));
    parsed.map_err(|error| format!("invalid address `{text}`: {error}"))
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_config(args: &Args) -> Result<RunnerConfig> {
    let mut config = match &args.config {
        Some(path) => RunnerConfig::load(path)?,
        None => RunnerConfig::default(),
    };
    if args.disasm {
        config.core.trace_instructions = true;
    }
    Ok(config)
}

/// What the single-step prompt asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prompt {
    Step,
    Continue,
    Quit,
}

fn parse_prompt(line: &str) -> Prompt {
    match line.trim() {
        "c" => Prompt::Continue,
        "q" => Prompt::Quit,
        _ => Prompt::Step,
    }
}

fn run(machine: &mut Machine, args: &Args) -> Result<u64> {
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    let mut stepping = args.step;
    let mut retired = 0u64;

    while args.max_instructions.is_none_or(|limit| retired < limit) {
        if stepping {
            eprint!("{:#010x}> ", machine.cpu.pc());
            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }
            match parse_prompt(&line) {
                Prompt::Quit => break,
                Prompt::Continue => stepping = false,
                Prompt::Step => {}
            }
        }

        let outcome = machine.step()?;
        retired += 1;
        if stepping {
            eprintln!("{outcome:?}");
        }

        let console = machine.take_console();
        if !console.is_empty() {
            stdout.write_all(&console)?;
            stdout.flush()?;
        }

        if machine.is_parked() {
            log::info!("parked at {:#010x}", machine.cpu.decoder.address);
            break;
        }
    }
    Ok(retired)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.disasm {
        log::LevelFilter::Trace
    } else {
        args.log_level
    };
    logger::init(level).context("logger already installed")?;

    let config = load_config(&args)?;
    let mut machine = Machine::new(&config);
    match &args.mode {
        Mode::Bin { image, base, entry } => {
            machine.boot_bin(&read_file(image)?, *base, *entry)?;
        }
        Mode::Linux { image, dtb } => {
            machine.boot_linux(&read_file(image)?, &read_file(dtb)?)?;
        }
    }

    let retired = run(&mut machine, &args)?;
    let stats = machine.cpu.mmu.stats();
    log::info!(
        "{retired} steps, {} instructions, tlb {}/{} hits",
        machine.cpu.instruction_counter,
        stats.hits,
        stats.total
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_accept_hex_and_decimal() {
        assert_eq!(parse_address("0x8000"), Ok(0x8000));
        assert_eq!(parse_address("0XFF"), Ok(0xFF));
        assert_eq!(parse_address("4096"), Ok(4096));
        assert!(parse_address("0xZZ").is_err());
        assert!(parse_address("").is_err());
    }

    #[test]
    fn bin_subcommand_parses_flags() {
        let args = Args::try_parse_from([
            "armv4-run",
            "bin",
            "image.bin",
            "--base",
            "0x100",
            "--max-instructions",
            "50",
            "--disasm",
        ])
        .unwrap();
        assert!(args.disasm);
        assert_eq!(args.max_instructions, Some(50));
        assert_eq!(args.log_level, log::LevelFilter::Info);
        match args.mode {
            Mode::Bin { image, base, entry } => {
                assert_eq!(image, PathBuf::from("image.bin"));
                assert_eq!(base, 0x100);
                assert_eq!(entry, None);
            }
            Mode::Linux { .. } => panic!("expected bin"),
        }
    }

    #[test]
    fn linux_requires_dtb() {
        assert!(Args::try_parse_from(["armv4-run", "linux", "zImage"]).is_err());
        let args = Args::try_parse_from([
            "armv4-run",
            "--log-level",
            "debug",
            "linux",
            "zImage",
            "--dtb",
            "board.dtb",
        ])
        .unwrap();
        assert_eq!(args.log_level, log::LevelFilter::Debug);
        assert!(matches!(args.mode, Mode::Linux { .. }));
    }

    #[test]
    fn missing_subcommand_is_an_error() {
        assert!(Args::try_parse_from(["armv4-run"]).is_err());
    }

    #[test]
    fn disasm_turns_on_instruction_trace() {
        let args = Args::try_parse_from(["armv4-run", "bin", "a.bin", "--disasm"]).unwrap();
        assert!(load_config(&args).unwrap().core.trace_instructions);
    }

    #[test]
    fn prompt_commands() {
        assert_eq!(parse_prompt("q\n"), Prompt::Quit);
        assert_eq!(parse_prompt(" c "), Prompt::Continue);
        assert_eq!(parse_prompt("\n"), Prompt::Step);
    }

    #[test]
    fn run_stops_at_instruction_limit() {
        let mut machine = Machine::new(&RunnerConfig {
            core: armv4_core::CoreConfig::bare_metal(),
            ..RunnerConfig::default()
        });
        // B . with IRQs enabled so the loop never parks.
        machine.cpu.regs.cpsr_mut().set_irq_disabled(false);
        machine.boot_bin(&0xEAFF_FFFEu32.to_le_bytes(), 0, None).unwrap();
        let args =
            Args::try_parse_from(["armv4-run", "bin", "a.bin", "--max-instructions", "25"]).unwrap();
        assert_eq!(run(&mut machine, &args).unwrap(), 25);
        assert_eq!(machine.cpu.pc(), 0);
    }
}
