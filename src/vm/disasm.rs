use twiddle::Twiddle;

use crate::vm::opcode::{
    EXC_TYPE_EXCEPTION, EXC_VALUE_HALT, OP_ADD, OP_ADDI, OP_BEQ, OP_JALR, OP_LUI, OP_LW, OP_NAND,
    OP_SW,
};
use crate::vm::sign_extend_7;

/// Renders a machine word as canonical assembly: lowercase mnemonics,
/// signed decimals for sign-extended immediates. The `halt` encoding
/// disassembles back to `halt`, and a zero jalr immediate is omitted, so
/// any word the assembler can produce re-assembles to itself.
pub fn disassemble(inst: u16) -> String {
    let op = inst >> 13;
    let ra = (inst >> 10) & u16::mask(2..=0);
    let rb = (inst >> 7) & u16::mask(2..=0);
    let rc = inst & u16::mask(2..=0);
    let imm7 = sign_extend_7(inst & u16::mask(6..=0));
    let imm10 = inst & u16::mask(9..=0);
    match op {
        OP_ADD => format!("add r{} r{} r{}", ra, rb, rc),
        OP_ADDI => format!("addi r{} r{} {}", ra, rb, imm7 as i16),
        OP_NAND => format!("nand r{} r{} r{}", ra, rb, rc),
        // rendered as the value the register ends up with, so the text
        // re-assembles to the same word
        OP_LUI => format!("lui r{} {}", ra, imm10 << 6),
        OP_SW => format!("sw r{} r{} {}", ra, rb, imm7 as i16),
        OP_LW => format!("lw r{} r{} {}", ra, rb, imm7 as i16),
        OP_BEQ => format!("beq r{} r{} {}", ra, rb, imm7 as i16),
        OP_JALR => {
            let code = inst & u16::mask(6..=0);
            if ra == 0 && rb == 0 && code == (EXC_TYPE_EXCEPTION | EXC_VALUE_HALT) {
                "halt".to_string()
            } else if code == 0 {
                format!("jalr r{} r{}", ra, rb)
            } else {
                format!("jalr r{} r{} {}", ra, rb, imm7 as i16)
            }
        }
        // a 3-bit opcode cannot get here, but stay total
        _ => format!("# unknown instruction: {}", inst),
    }
}

#[cfg(test)]
pub mod canonical_text {
    use super::*;

    #[test]
    fn machine_instructions() {
        assert_eq!(disassemble(0x0503), "add r1 r2 r3");
        assert_eq!(disassemble(0x243F), "addi r1 r0 63");
        assert_eq!(disassemble(0x2440), "addi r1 r0 -64");
        assert_eq!(disassemble(0x5F87), "nand r7 r7 r7");
        assert_eq!(disassemble(0x6448), "lui r1 4608");
        assert_eq!(disassemble(0x8C07), "sw r3 r0 7");
        assert_eq!(disassemble(0xA405), "lw r1 r0 5");
        assert_eq!(disassemble(0xC07C), "beq r0 r0 -4");
        assert_eq!(disassemble(0xE480), "jalr r1 r1");
    }

    #[test]
    fn halt_reads_back_as_halt() {
        assert_eq!(disassemble(0xE071), "halt");
    }

    #[test]
    fn nop_expansion_reads_back() {
        assert_eq!(disassemble(0x0000), "add r0 r0 r0");
    }

    #[test]
    fn non_halt_exception_code() {
        // not reachable from the assembler, rendered with its immediate
        assert_eq!(disassemble(0xE005), "jalr r0 r0 5");
    }
}
