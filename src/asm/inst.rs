use std::collections::HashMap;
use std::str::FromStr;

use tracing::warn;
use twiddle::Twiddle;

use crate::asm::AsmError;
use crate::vm::opcode;

/// A general purpose register, `r0` through `r7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
}

impl Reg {
    pub fn num(self) -> u16 {
        self as u16
    }
}

impl FromStr for Reg {
    type Err = ();

    fn from_str(s: &str) -> Result<Reg, ()> {
        // The `r` prefix is optional, as in the original RiSC-16 assembler.
        match s.strip_prefix('r').unwrap_or(s) {
            "0" => Ok(Reg::R0),
            "1" => Ok(Reg::R1),
            "2" => Ok(Reg::R2),
            "3" => Ok(Reg::R3),
            "4" => Ok(Reg::R4),
            "5" => Ok(Reg::R5),
            "6" => Ok(Reg::R6),
            "7" => Ok(Reg::R7),
            _ => Err(()),
        }
    }
}

/// One word of output, before label resolution. Immediates that may name a
/// label stay as raw text until encoding; `Jalr`'s immediate is not
/// reachable from the grammar (only the `halt` expansion sets it) and
/// `Data`'s value is already fixed, so both are numeric here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inst {
    Add { ra: Reg, rb: Reg, rc: Reg },
    Addi { ra: Reg, rb: Reg, imm: String },
    Nand { ra: Reg, rb: Reg, rc: Reg },
    Lui { ra: Reg, imm: String },
    Sw { ra: Reg, rb: Reg, imm: String },
    Lw { ra: Reg, rb: Reg, imm: String },
    Beq { ra: Reg, rb: Reg, imm: String },
    Jalr { ra: Reg, rb: Reg, imm: u16 },
    Lli { ra: Reg, imm: String },
    Data { value: u16 },
}

/// An instruction (or data word) in emission order, with the labels bound
/// to its address. Pseudo-instructions that expand to several words carry
/// their labels on the first word only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    pub lineno: usize,
    pub labels: Vec<String>,
    pub inst: Inst,
}

impl Stmt {
    /// Encodes one 16-bit machine word. Layout, MSB first: opcode 15..13,
    /// ra 12..10, rb 9..7, then rc in 2..0 (R-R-R), a 7-bit immediate in
    /// 6..0, or a 10-bit immediate in 9..0 (LUI).
    pub fn encode(
        &self,
        labels: &HashMap<String, i64>,
        pc: u16,
        strict: bool,
    ) -> Result<u16, AsmError> {
        let lineno = self.lineno;
        match &self.inst {
            Inst::Add { ra, rb, rc } => Ok(pack(opcode::OP_ADD, *ra, *rb) | rc.num()),
            Inst::Addi { ra, rb, imm } => {
                let value = resolve_immediate(labels, imm, 7, lineno, strict)?;
                Ok(pack(opcode::OP_ADDI, *ra, *rb) | (value & u16::mask(6..=0)))
            }
            Inst::Nand { ra, rb, rc } => Ok(pack(opcode::OP_NAND, *ra, *rb) | rc.num()),
            Inst::Lui { ra, imm } => {
                // The source holds the full 16-bit value; only its top ten
                // bits land in the word.
                let value = resolve_immediate(labels, imm, 16, lineno, strict)?;
                Ok(pack(opcode::OP_LUI, *ra, Reg::R0) | (value >> 6))
            }
            Inst::Sw { ra, rb, imm } => {
                let value = resolve_immediate(labels, imm, 7, lineno, strict)?;
                Ok(pack(opcode::OP_SW, *ra, *rb) | (value & u16::mask(6..=0)))
            }
            Inst::Lw { ra, rb, imm } => {
                let value = resolve_immediate(labels, imm, 7, lineno, strict)?;
                Ok(pack(opcode::OP_LW, *ra, *rb) | (value & u16::mask(6..=0)))
            }
            Inst::Beq { ra, rb, imm } => {
                // A bare label encodes its absolute index, faithful to the
                // original RiSC-16 assembler; `@label` encodes the offset
                // from the already-incremented pc that actually reaches it.
                let value = match imm.strip_prefix('@') {
                    Some(name) => {
                        let target = match labels.get(name) {
                            Some(&target) => target,
                            None => {
                                return Err(AsmError::MissingLabel {
                                    lineno,
                                    label: name.to_string(),
                                })
                            }
                        };
                        check_range(target - (i64::from(pc) + 1), 7, imm, lineno, strict)?
                    }
                    None => resolve_immediate(labels, imm, 7, lineno, strict)?,
                };
                Ok(pack(opcode::OP_BEQ, *ra, *rb) | (value & u16::mask(6..=0)))
            }
            Inst::Jalr { ra, rb, imm } => {
                Ok(pack(opcode::OP_JALR, *ra, *rb) | (imm & u16::mask(6..=0)))
            }
            Inst::Lli { ra, imm } => {
                // addi ra ra (imm & 0x3f)
                let value = resolve_immediate(labels, imm, 16, lineno, strict)?;
                Ok(pack(opcode::OP_ADDI, *ra, *ra) | (value & u16::mask(5..=0)))
            }
            Inst::Data { value } => Ok(*value),
        }
    }
}

fn pack(op: u16, ra: Reg, rb: Reg) -> u16 {
    (op & u16::mask(2..=0)) << 13 | ra.num() << 10 | rb.num() << 7
}

/// Numeric parse of an immediate: `0x` prefix is hex, a leading `0` with
/// more digits is octal, anything else decimal; a leading `-` negates.
pub fn parse_int(text: &str) -> Option<i64> {
    let (neg, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok()?
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };
    Some(if neg { -value } else { value })
}

/// Resolves an immediate: numeric literal first, label lookup second.
fn resolve_immediate(
    labels: &HashMap<String, i64>,
    text: &str,
    bits: u32,
    lineno: usize,
    strict: bool,
) -> Result<u16, AsmError> {
    let value = match parse_int(text) {
        Some(value) => value,
        None => match labels.get(text) {
            Some(&value) => value,
            None => {
                return Err(AsmError::MissingLabel {
                    lineno,
                    label: text.to_string(),
                })
            }
        },
    };
    check_range(value, bits, text, lineno, strict)
}

/// Range-checks a resolved value against its field width and truncates to
/// the low bits. 7-bit fields take the signed range; the 16-bit case also
/// admits unsigned literals so `.fill 0xffff` and `lui r1 0xffff` work.
/// Overflow is a warning unless strict mode promotes it to an error.
fn check_range(
    value: i64,
    bits: u32,
    text: &str,
    lineno: usize,
    strict: bool,
) -> Result<u16, AsmError> {
    let lo = -(1i64 << (bits - 1));
    let hi = if bits == 16 {
        (1i64 << bits) - 1
    } else {
        (1i64 << (bits - 1)) - 1
    };
    if value < lo || value > hi {
        if strict {
            return Err(AsmError::OutOfRange {
                lineno,
                value: text.to_string(),
                bits,
            });
        }
        warn!(
            "value out of {}-bit range for '{}' on line {}",
            bits, text, lineno
        );
    }
    Ok(value as u16)
}
