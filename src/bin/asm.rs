use std::fs;
use std::path::PathBuf;
use std::process::exit;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use risc16::asm::Assembler;

#[derive(Parser, Debug)]
#[command(about = "Assemble RiSC-16 source into machine-code words")]
struct Opts {
    /// Assembly source file
    #[arg(short = 'f', value_name = "FILE")]
    file: PathBuf,
    /// Annotate every word with its source line
    #[arg(short = 'd')]
    debug: bool,
    /// Treat out-of-range immediates as errors instead of warnings
    #[arg(long)]
    strict: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let source = fs::read_to_string(&opts.file)?;

    let mut assembler = Assembler::new();
    if opts.strict {
        assembler = assembler.strict();
    }

    let mut failed = false;
    for record in assembler.assemble(&source) {
        match record {
            Ok(code) => {
                if opts.debug {
                    println!("{:04x}  # {}", code.word, code.lineno);
                } else {
                    println!("{:04x}", code.word);
                }
            }
            Err(err) => {
                eprintln!("asm: {}", err);
                failed = true;
            }
        }
    }
    if failed {
        exit(1);
    }
    Ok(())
}
