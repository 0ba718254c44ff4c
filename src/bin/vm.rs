use std::fs;
use std::io::stdin;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use risc16::vm::disasm;
use risc16::vm::mem::Memory;
use risc16::vm::{Trap, Vm};

#[derive(Parser, Debug)]
#[command(about = "Run a RiSC-16 machine-code image")]
struct Opts {
    /// Machine-code file, one hex word per line
    #[arg(short = 'f', value_name = "FILE")]
    file: PathBuf,
    /// Pause for a line of input before executing each instruction
    #[arg(short = 'd')]
    debug: bool,
    /// Trace machine state and disassembly while running
    #[arg(short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let image = fs::read_to_string(&opts.file)?;
    let mut machine = Vm::with_memory(Memory::load_hex(&image)?);

    loop {
        machine.fetch();
        if opts.verbose {
            eprintln!("vm: {}", machine);
            eprintln!("vm: {:#018b} {}", machine.ci, disasm::disassemble(machine.ci));
        }
        if opts.debug {
            eprintln!("vm: paused...");
            let mut line = String::new();
            stdin().read_line(&mut line)?;
        }
        match machine.execute() {
            Ok(()) => (),
            Err(Trap::Halted) => break,
            Err(trap) => anyhow::bail!(trap),
        }
    }
    Ok(())
}
