//! MIPS32r6 simulator binary.
//!
//! Loads a flat binary image into guest memory and runs it on the
//! stdio terminal and filesystem adapters.

use std::path::PathBuf;
use std::process;

use cpu_mips32::{BLOCK_SIZE, ExitCode};
use emu_mips32::io::{FsFileHandler, StdioDevice};
use emu_mips32::{Component, Machine};

/// Boot vector; flat images load and start here unless told otherwise.
const BOOT_ADDRESS: u32 = 0xBFC0_0000;

struct CliArgs {
    image: Option<PathBuf>,
    load_address: u32,
    ram_bytes: u32,
    steps: Option<u64>,
    save_state: Option<String>,
    restore_state: Option<String>,
}

fn parse_u32(text: &str) -> Option<u32> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        image: None,
        load_address: BOOT_ADDRESS,
        ram_bytes: 16 * 1024 * 1024,
        steps: None,
        save_state: None,
        restore_state: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--load" => {
                i += 1;
                cli.image = args.get(i).map(PathBuf::from);
            }
            "--at" => {
                i += 1;
                cli.load_address = args
                    .get(i)
                    .and_then(|s| parse_u32(s))
                    .unwrap_or(BOOT_ADDRESS);
            }
            "--ram" => {
                i += 1;
                if let Some(bytes) = args.get(i).and_then(|s| parse_u32(s)) {
                    cli.ram_bytes = bytes;
                }
            }
            "--steps" => {
                i += 1;
                cli.steps = args.get(i).and_then(|s| s.parse().ok());
            }
            "--save-state" => {
                i += 1;
                cli.save_state = args.get(i).cloned();
            }
            "--restore-state" => {
                i += 1;
                cli.restore_state = args.get(i).cloned();
            }
            "--help" | "-h" => {
                eprintln!("Usage: emu-mips32 [OPTIONS]");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  --load <file>           Flat binary image to load");
                eprintln!(
                    "  --at <addr>             Load/start address [default: 0xBFC00000]"
                );
                eprintln!(
                    "  --ram <bytes>           Resident RAM budget, multiple of 64 KiB [default: 16 MiB]"
                );
                eprintln!("  --steps <n>             Single-step at most n instructions");
                eprintln!("  --save-state <name>     Save a state snapshot after the run");
                eprintln!("  --restore-state <name>  Restore a state snapshot before the run");
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn main() {
    env_logger::init();
    let cli = parse_args();

    if cli.ram_bytes == 0 || cli.ram_bytes % BLOCK_SIZE != 0 {
        eprintln!("--ram must be a non-zero multiple of 0x{BLOCK_SIZE:X} bytes");
        process::exit(1);
    }

    let mut machine = Machine::new(
        cli.ram_bytes,
        Box::new(StdioDevice::new()),
        Box::new(FsFileHandler::new()),
    );

    if let Some(name) = &cli.restore_state {
        if let Err(e) = machine.restore_state(Component::All, name) {
            eprintln!("failed to restore state {name:?}: {e}");
            process::exit(1);
        }
        log::info!("restored state {name:?}");
    }

    if let Some(image) = &cli.image {
        let bytes = match std::fs::read(image) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("failed to read {}: {e}", image.display());
                process::exit(1);
            }
        };

        machine.load(&bytes, cli.load_address);
        machine.inspector().set_pc(cli.load_address);
    }

    let exit = match cli.steps {
        Some(steps) => {
            let mut exit = ExitCode::None;
            for _ in 0..steps {
                exit = machine.single_step();
                if exit != ExitCode::None {
                    break;
                }
            }
            exit
        }
        None => machine.run(),
    };

    if let Some(name) = &cli.save_state {
        if let Err(e) = machine.save_state(Component::All, name) {
            eprintln!("failed to save state {name:?}: {e}");
            process::exit(1);
        }
        log::info!("saved state {name:?}");
    }

    println!();
    println!("exit: {exit:?}");
}
