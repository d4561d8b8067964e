//! Instruction throughput of the core on two small loops.
//!
//! ```sh
//! cargo run --release -p armv4-core --example throughput
//! ```
//!
//! Each loop runs once with the MMU off and once with an identity section
//! mapping, so the cost of TLB lookups shows up as the difference.

#![allow(clippy::pedantic)]

use armv4_core::mmu::{reg, CONTROL_M};
use armv4_core::{step_one, CoreConfig, CpuState, PeripheralTable, StepOutcome};
use log as _;
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

use std::time::{Duration, Instant};

const ALU_LOOP: &[u32] = &[
    0xE280_0001, // ADD r0, r0, #1
    0xE021_1000, // EOR r1, r1, r0
    0xE1A0_2160, // MOV r2, r0, ROR #2
    0xE350_0000, // CMP r0, #0
    0xEAFF_FFFA, // B start
];

const MEMORY_LOOP: &[u32] = &[
    0xE3A0_1A01, // MOV r1, #0x1000
    0xE481_0004, // STR r0, [r1], #4
    0xE511_2004, // LDR r2, [r1, #-4]
    0xE280_0001, // ADD r0, r0, #1
    0xE351_0A02, // CMP r1, #0x2000
    0x1AFF_FFFA, // BNE store
    0xEAFF_FFF8, // B start
];

struct BenchmarkResult {
    name: &'static str,
    mmu: bool,
    instructions: u64,
    cycles: u64,
    elapsed: Duration,
}

fn run_loop(name: &'static str, program: &[u32], mmu: bool, duration: Duration) -> BenchmarkResult {
    let config = CoreConfig::default();
    let mut cpu = CpuState::with_config(&config);
    let image: Vec<u8> = program.iter().flat_map(|word| word.to_le_bytes()).collect();
    cpu.load_image(0, &image).ok();
    if mmu {
        cpu.memory[0x4000..0x4004].copy_from_slice(&0x0000_0C02u32.to_le_bytes());
        cpu.mmu.write_register(reg::TTB, 0, 0, 0x4000);
        cpu.mmu.write_register(reg::DACR, 0, 0, 0x1);
        cpu.mmu.write_register(reg::CONTROL, 0, 0, CONTROL_M);
    }
    let mut devices = PeripheralTable::new();

    let mut instructions = 0u64;
    let mut cycles = 0u64;
    let start = Instant::now();
    while start.elapsed() < duration {
        for _ in 0..10_000 {
            match step_one(&mut cpu, &mut devices, &config) {
                Ok(StepOutcome::Retired { cycles: cost }) => cycles += u64::from(cost),
                Ok(_) => cycles += 1,
                Err(error) => panic!("{name}: core halted: {error}"),
            }
            instructions += 1;
        }
    }

    BenchmarkResult {
        name,
        mmu,
        instructions,
        cycles,
        elapsed: start.elapsed(),
    }
}

fn main() {
    let duration = Duration::from_millis(500);
    println!("{:<12} {:>5} {:>16} {:>16}", "loop", "mmu", "instr/s", "cycles/s");
    for (name, program) in [("alu", ALU_LOOP), ("memory", MEMORY_LOOP)] {
        for mmu in [false, true] {
            let result = run_loop(name, program, mmu, duration);
            let secs = result.elapsed.as_secs_f64();
            println!(
                "{:<12} {:>5} {:>16.0} {:>16.0}",
                result.name,
                result.mmu,
                result.instructions as f64 / secs,
                result.cycles as f64 / secs
            );
        }
    }
}
