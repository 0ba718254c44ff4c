use std::fs;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn main() {
    // phf_codegen for the mnemonic dispatch table
    let path = Path::new("codegen/mnemonic.rs");
    fs::create_dir("codegen").unwrap_or_else(|why| {
        println!("! {:?}", why.kind());
    });
    let mut file = BufWriter::new(File::create(path).unwrap());

    let mut map = phf_codegen::Map::new();
    map.entry("add", "Mnemonic::Add")
        .entry("addi", "Mnemonic::Addi")
        .entry("nand", "Mnemonic::Nand")
        .entry("lui", "Mnemonic::Lui")
        .entry("sw", "Mnemonic::Sw")
        .entry("lw", "Mnemonic::Lw")
        .entry("beq", "Mnemonic::Beq")
        .entry("jalr", "Mnemonic::Jalr")
        // Pseudo-instructions
        .entry("nop", "Mnemonic::Nop")
        .entry("halt", "Mnemonic::Halt")
        .entry("lli", "Mnemonic::Lli")
        .entry("movi", "Mnemonic::Movi")
        // Data directives
        .entry(".fill", "Mnemonic::Fill")
        .entry(".space", "Mnemonic::Space");

    writeln!(
        &mut file,
        "static MNEMONIC: phf::Map<&'static str, Mnemonic> = {};",
        map.build()
    )
    .unwrap();

    println!("cargo:rerun-if-changed=build.rs");
}
