//! The RiSC-16 virtual machine: eight 16-bit registers, a 16-bit program
//! counter, a current-instruction register, and 2^16 words of memory.

use std::fmt;

use thiserror::Error;
use twiddle::Twiddle;

pub mod disasm;
pub mod mem;
pub mod opcode;
pub mod regfile;

use crate::vm::mem::Memory;
use crate::vm::regfile::RegFile;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Trap {
    #[error("vm: halted")]
    Halted,
    #[error("vm: exception with code {0}")]
    Exception(u16),
}

/// Machine state. A single owner drives it; operations are sequential.
pub struct Vm {
    /// Program counter.
    pub pc: u16,
    /// Current instruction, loaded by `fetch` and consumed by `execute`.
    pub ci: u16,
    /// General purpose registers; index 0 reads as zero.
    pub gpr: RegFile,
    /// Word-addressed memory, wrapping modulo 2^16.
    pub mem: Memory,
}

impl Vm {
    pub fn new() -> Vm {
        Vm::with_memory(Memory::new())
    }

    pub fn with_memory(mem: Memory) -> Vm {
        Vm {
            pc: 0,
            ci: 0,
            gpr: RegFile::new(),
            mem,
        }
    }

    /// Loads the word at the program counter into `ci` and advances the
    /// counter, wrapping at the top of memory.
    pub fn fetch(&mut self) {
        self.ci = self.mem.load(self.pc);
        self.pc = self.pc.wrapping_add(1);
    }

    /// Decodes and executes `ci`. The register file discards writes to
    /// r0, and `ci` is cleared up front, so after any call `gpr[0] == 0`
    /// and a second `execute` without a `fetch` is a plain nop.
    pub fn execute(&mut self) -> Result<(), Trap> {
        let inst = self.ci;
        self.ci = 0;

        let op = inst >> 13;
        let ra = ((inst >> 10) & u16::mask(2..=0)) as usize;
        let rb = ((inst >> 7) & u16::mask(2..=0)) as usize;
        let rc = (inst & u16::mask(2..=0)) as usize;
        let imm7 = sign_extend_7(inst & u16::mask(6..=0));
        let imm10 = inst & u16::mask(9..=0);

        match op {
            opcode::OP_ADD => {
                self.gpr[ra] = self.gpr[rb].wrapping_add(self.gpr[rc]);
            }
            opcode::OP_ADDI => {
                self.gpr[ra] = self.gpr[rb].wrapping_add(imm7);
            }
            opcode::OP_NAND => {
                self.gpr[ra] = !(self.gpr[rb] & self.gpr[rc]);
            }
            opcode::OP_LUI => {
                self.gpr[ra] = imm10 << 6;
            }
            opcode::OP_SW => {
                self.mem
                    .store(self.gpr[rb].wrapping_add(imm7), self.gpr[ra]);
            }
            opcode::OP_LW => {
                self.gpr[ra] = self.mem.load(self.gpr[rb].wrapping_add(imm7));
            }
            opcode::OP_BEQ => {
                if self.gpr[ra] == self.gpr[rb] {
                    self.pc = self.pc.wrapping_add(imm7);
                }
            }
            opcode::OP_JALR => {
                // jalr r0 r0 carries an exception code in its immediate
                if ra == 0 && rb == 0 {
                    let code = inst & u16::mask(6..=0);
                    if code == (opcode::EXC_TYPE_EXCEPTION | opcode::EXC_VALUE_HALT) {
                        return Err(Trap::Halted);
                    }
                    return Err(Trap::Exception(code));
                }
                // link first: jalr rA rA lands on the next instruction
                self.gpr[ra] = self.pc;
                self.pc = self.gpr[rb];
            }
            // a 3-bit opcode covers no other values
            _ => (),
        }
        Ok(())
    }

    /// One fetch/execute round.
    pub fn step(&mut self) -> Result<(), Trap> {
        self.fetch();
        self.execute()
    }

    /// Runs until the machine traps.
    pub fn run(&mut self) -> Trap {
        loop {
            if let Err(trap) = self.step() {
                return trap;
            }
        }
    }
}

impl Default for Vm {
    fn default() -> Vm {
        Vm::new()
    }
}

impl fmt::Display for Vm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{PC:{} GPR:[", self.pc)?;
        for idx in 0..8 {
            if idx > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", self.gpr[idx])?;
        }
        write!(f, "]}}")
    }
}

/// Widens a 7-bit two's complement value to 16 bits.
pub fn sign_extend_7(v: u16) -> u16 {
    if v & u16::mask(6..=6) != 0 {
        v | u16::mask(15..=7)
    } else {
        v
    }
}

// Tests getting too long, include instead
include!("test.rs");
