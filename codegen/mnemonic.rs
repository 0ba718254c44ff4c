static MNEMONIC: phf::Map<&'static str, Mnemonic> = ::phf::Map {
    key: 15467950696543387533,
    disps: &[
        (6, 0),
        (2, 12),
        (10, 9),
    ],
    entries: &[
        (".space", Mnemonic::Space),
        ("halt", Mnemonic::Halt),
        ("beq", Mnemonic::Beq),
        (".fill", Mnemonic::Fill),
        ("nand", Mnemonic::Nand),
        ("lui", Mnemonic::Lui),
        ("lli", Mnemonic::Lli),
        ("lw", Mnemonic::Lw),
        ("movi", Mnemonic::Movi),
        ("addi", Mnemonic::Addi),
        ("nop", Mnemonic::Nop),
        ("jalr", Mnemonic::Jalr),
        ("sw", Mnemonic::Sw),
        ("add", Mnemonic::Add),
    ],
};
