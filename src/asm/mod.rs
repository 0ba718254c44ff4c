//! The RiSC-16 assembler: a pull pipeline of lexer and parser feeding a
//! two-pass driver that binds labels to word indices and then encodes.

use std::collections::HashMap;

use thiserror::Error;

pub mod inst;
pub mod lexer;
pub mod parser;

use crate::asm::inst::Stmt;
use crate::asm::lexer::Lexer;
use crate::asm::parser::Parser;
use crate::vm::mem::MEMORY_SIZE;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmError {
    #[error("invalid input on line {0}")]
    Invalid(usize),
    #[error("expected name or number on line {0}")]
    ExpectedNameOrNumber(usize),
    #[error("expected end of line on line {0}")]
    ExpectedEol(usize),
    #[error("unknown instruction '{name}' on line {lineno}")]
    UnknownInstruction { lineno: usize, name: String },
    #[error("invalid register name '{name}' on line {lineno}")]
    InvalidRegister { lineno: usize, name: String },
    #[error("label '{label}' is missing on line {lineno}")]
    MissingLabel { lineno: usize, label: String },
    #[error("value out of {bits}-bit range for '{value}' on line {lineno}")]
    OutOfRange {
        lineno: usize,
        value: String,
        bits: u32,
    },
    #[error("duplicate label '{label}' on line {lineno}")]
    DuplicateLabel { lineno: usize, label: String },
    #[error("label '{label}' on line {lineno} does not prefix anything")]
    OrphanLabel { lineno: usize, label: String },
    #[error("program does not fit in memory ({0} words)")]
    TooManyInstructions(usize),
}

/// One emitted machine word and the source line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeWord {
    pub word: u16,
    pub lineno: usize,
}

/// Two-pass assembler. Pass 1 drains the parser, binding every label to
/// the index of the word it prefixes; pass 2 encodes against the finished
/// label map. A parse error (or a duplicate label) aborts with a single
/// diagnostic; encode errors are reported per instruction and assembly
/// continues, so one run can surface several of them.
pub struct Assembler {
    strict: bool,
}

impl Assembler {
    pub fn new() -> Assembler {
        Assembler { strict: false }
    }

    /// Promotes out-of-range immediate warnings to errors.
    pub fn strict(mut self) -> Assembler {
        self.strict = true;
        self
    }

    pub fn assemble(&self, input: &str) -> Vec<Result<CodeWord, AsmError>> {
        let mut out = Vec::new();
        let mut labels: HashMap<String, i64> = HashMap::new();
        let mut stmts: Vec<Stmt> = Vec::new();

        // Pass 1: collect statements and assign label indices
        for item in Parser::new(Lexer::new(input)) {
            match item {
                Ok(stmt) => {
                    for label in &stmt.labels {
                        let idx = stmts.len() as i64;
                        if labels.insert(label.clone(), idx).is_some() {
                            out.push(Err(AsmError::DuplicateLabel {
                                lineno: stmt.lineno,
                                label: label.clone(),
                            }));
                            return out;
                        }
                    }
                    stmts.push(stmt);
                }
                Err(err) => {
                    out.push(Err(err));
                    return out;
                }
            }
        }
        if stmts.len() > MEMORY_SIZE {
            out.push(Err(AsmError::TooManyInstructions(stmts.len())));
            return out;
        }

        // Pass 2: encode against the finished label map
        for (pc, stmt) in stmts.iter().enumerate() {
            match stmt.encode(&labels, pc as u16, self.strict) {
                Ok(word) => out.push(Ok(CodeWord {
                    word,
                    lineno: stmt.lineno,
                })),
                Err(err) => out.push(Err(err)),
            }
        }
        out
    }
}

impl Default for Assembler {
    fn default() -> Assembler {
        Assembler::new()
    }
}

/// Assembles with the default (non-strict) settings.
pub fn assemble(input: &str) -> Vec<Result<CodeWord, AsmError>> {
    Assembler::new().assemble(input)
}
