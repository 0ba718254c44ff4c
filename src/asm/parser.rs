use std::collections::VecDeque;

use crate::asm::inst::{self, Inst, Reg, Stmt};
use crate::asm::lexer::{Lexer, Token, TokenKind};
use crate::asm::AsmError;
use crate::vm::opcode::{self, Mnemonic};

/// Turns the token stream into statements, one machine word each.
///
/// Grammar per line: `Label? mnemonic operands? Eol`, where a single comma
/// may precede any operand (including the first) and is treated as blank.
/// Pseudo-instructions expand here: `movi` yields two statements and
/// `.space n` yields n, with the line's labels bound to the first word
/// only. A label on an otherwise empty line binds to the next statement.
///
/// The parser yields `Err` once for the first problem it hits and then
/// fuses, so a lex or parse error aborts the stream.
pub struct Parser<'a> {
    input_iter: Lexer<'a>,
    /// Words still owed from a multi-word expansion.
    pending: VecDeque<Stmt>,
    /// Labels from label-only lines, waiting for an instruction.
    labels: Vec<(String, usize)>,
    lineno: usize,
    done: bool,
}

impl<'a> Parser<'a> {
    pub fn new(input: Lexer<'a>) -> Parser<'a> {
        Parser {
            input_iter: input,
            pending: VecDeque::new(),
            labels: Vec::new(),
            lineno: 1,
            done: false,
        }
    }

    fn read_token(&mut self) -> Token {
        match self.input_iter.next() {
            Some(token) => {
                self.lineno = token.lineno;
                token
            }
            None => Token {
                kind: TokenKind::Eof,
                lineno: self.lineno,
            },
        }
    }

    pub fn next_stmt(&mut self) -> Option<Result<Stmt, AsmError>> {
        let item = self.parse_next();
        if let Some(Err(_)) = &item {
            self.done = true;
        }
        item
    }

    fn parse_next(&mut self) -> Option<Result<Stmt, AsmError>> {
        if let Some(stmt) = self.pending.pop_front() {
            return Some(Ok(stmt));
        }
        if self.done {
            return None;
        }
        loop {
            let token = self.read_token();
            match token.kind {
                TokenKind::Eol => continue,
                TokenKind::Eof => {
                    if let Some((label, lineno)) = self.labels.pop() {
                        return Some(Err(AsmError::OrphanLabel { lineno, label }));
                    }
                    return None;
                }
                TokenKind::Invalid => {
                    return Some(Err(AsmError::Invalid(token.lineno)));
                }
                TokenKind::Comma => {
                    return Some(Err(AsmError::ExpectedNameOrNumber(token.lineno)));
                }
                TokenKind::Label(name) => {
                    let label_lineno = token.lineno;
                    // the rest of the line is an instruction, or nothing
                    let token = self.read_token();
                    match token.kind {
                        TokenKind::Eol => {
                            self.labels.push((name, label_lineno));
                            continue;
                        }
                        TokenKind::NameOrNumber(mnemonic) => {
                            self.labels.push((name, label_lineno));
                            return Some(self.parse_instruction(mnemonic, token.lineno));
                        }
                        TokenKind::Eof => {
                            return Some(Err(AsmError::OrphanLabel {
                                lineno: label_lineno,
                                label: name,
                            }));
                        }
                        TokenKind::Invalid => {
                            return Some(Err(AsmError::Invalid(token.lineno)));
                        }
                        _ => {
                            return Some(Err(AsmError::ExpectedNameOrNumber(token.lineno)));
                        }
                    }
                }
                TokenKind::NameOrNumber(mnemonic) => {
                    return Some(self.parse_instruction(mnemonic, token.lineno));
                }
            }
        }
    }

    fn parse_instruction(&mut self, name: String, lineno: usize) -> Result<Stmt, AsmError> {
        let mnemonic = match opcode::lookup(&name) {
            Some(mnemonic) => mnemonic,
            None => return Err(AsmError::UnknownInstruction { lineno, name }),
        };
        let labels: Vec<String> = self
            .labels
            .drain(..)
            .map(|(label, _lineno)| label)
            .collect();
        let stmt = |inst| Stmt {
            lineno,
            labels,
            inst,
        };
        match mnemonic {
            Mnemonic::Add => {
                let ra = self.parse_register()?;
                let rb = self.parse_register()?;
                let rc = self.parse_register()?;
                self.parse_eol()?;
                Ok(stmt(Inst::Add { ra, rb, rc }))
            }
            Mnemonic::Addi => {
                let ra = self.parse_register()?;
                let rb = self.parse_register()?;
                let imm = self.parse_immediate()?;
                self.parse_eol()?;
                Ok(stmt(Inst::Addi { ra, rb, imm }))
            }
            Mnemonic::Nand => {
                let ra = self.parse_register()?;
                let rb = self.parse_register()?;
                let rc = self.parse_register()?;
                self.parse_eol()?;
                Ok(stmt(Inst::Nand { ra, rb, rc }))
            }
            Mnemonic::Lui => {
                let ra = self.parse_register()?;
                let imm = self.parse_immediate()?;
                self.parse_eol()?;
                Ok(stmt(Inst::Lui { ra, imm }))
            }
            Mnemonic::Sw => {
                let ra = self.parse_register()?;
                let rb = self.parse_register()?;
                let imm = self.parse_immediate()?;
                self.parse_eol()?;
                Ok(stmt(Inst::Sw { ra, rb, imm }))
            }
            Mnemonic::Lw => {
                let ra = self.parse_register()?;
                let rb = self.parse_register()?;
                let imm = self.parse_immediate()?;
                self.parse_eol()?;
                Ok(stmt(Inst::Lw { ra, rb, imm }))
            }
            Mnemonic::Beq => {
                let ra = self.parse_register()?;
                let rb = self.parse_register()?;
                let imm = self.parse_immediate()?;
                self.parse_eol()?;
                Ok(stmt(Inst::Beq { ra, rb, imm }))
            }
            Mnemonic::Jalr => {
                // the immediate field is not writable from source
                let ra = self.parse_register()?;
                let rb = self.parse_register()?;
                self.parse_eol()?;
                Ok(stmt(Inst::Jalr { ra, rb, imm: 0 }))
            }
            Mnemonic::Nop => {
                self.parse_eol()?;
                Ok(stmt(Inst::Add {
                    ra: Reg::R0,
                    rb: Reg::R0,
                    rc: Reg::R0,
                }))
            }
            Mnemonic::Halt => {
                self.parse_eol()?;
                Ok(stmt(Inst::Jalr {
                    ra: Reg::R0,
                    rb: Reg::R0,
                    imm: opcode::EXC_TYPE_EXCEPTION | opcode::EXC_VALUE_HALT,
                }))
            }
            Mnemonic::Lli => {
                let ra = self.parse_register()?;
                let imm = self.parse_immediate()?;
                self.parse_eol()?;
                Ok(stmt(Inst::Lli { ra, imm }))
            }
            Mnemonic::Movi => {
                let ra = self.parse_register()?;
                let imm = self.parse_immediate()?;
                self.parse_eol()?;
                // lui takes the top ten bits, lli patches in the low six
                self.pending.push_back(Stmt {
                    lineno,
                    labels: Vec::new(),
                    inst: Inst::Lli {
                        ra,
                        imm: imm.clone(),
                    },
                });
                Ok(stmt(Inst::Lui { ra, imm }))
            }
            Mnemonic::Fill => {
                let imm = self.parse_immediate()?;
                self.parse_eol()?;
                let value = match inst::parse_int(&imm) {
                    Some(value) if (-0x8000..=0xFFFF).contains(&value) => value as u16,
                    _ => {
                        return Err(AsmError::OutOfRange {
                            lineno,
                            value: imm,
                            bits: 16,
                        })
                    }
                };
                Ok(stmt(Inst::Data { value }))
            }
            Mnemonic::Space => {
                let imm = self.parse_immediate()?;
                self.parse_eol()?;
                let count = match inst::parse_int(&imm) {
                    Some(count) if (1..=0xFFFF).contains(&count) => count,
                    _ => {
                        return Err(AsmError::OutOfRange {
                            lineno,
                            value: imm,
                            bits: 16,
                        })
                    }
                };
                for _ in 1..count {
                    self.pending.push_back(Stmt {
                        lineno,
                        labels: Vec::new(),
                        inst: Inst::Data { value: 0 },
                    });
                }
                Ok(stmt(Inst::Data { value: 0 }))
            }
        }
    }

    /// Reads one operand, skipping at most one comma in front of it.
    fn parse_operand(&mut self) -> Result<(String, usize), AsmError> {
        let mut token = self.read_token();
        if token.kind == TokenKind::Comma {
            token = self.read_token();
        }
        match token.kind {
            TokenKind::NameOrNumber(text) => Ok((text, token.lineno)),
            _ => Err(AsmError::ExpectedNameOrNumber(token.lineno)),
        }
    }

    fn parse_register(&mut self) -> Result<Reg, AsmError> {
        let (text, lineno) = self.parse_operand()?;
        text.parse()
            .map_err(|_| AsmError::InvalidRegister { lineno, name: text })
    }

    fn parse_immediate(&mut self) -> Result<String, AsmError> {
        let (text, _lineno) = self.parse_operand()?;
        Ok(text)
    }

    fn parse_eol(&mut self) -> Result<(), AsmError> {
        let token = self.read_token();
        match token.kind {
            TokenKind::Eol => Ok(()),
            _ => Err(AsmError::ExpectedEol(token.lineno)),
        }
    }
}

impl<'a> Iterator for Parser<'a> {
    type Item = Result<Stmt, AsmError>;

    fn next(&mut self) -> Option<Result<Stmt, AsmError>> {
        self.next_stmt()
    }
}

#[cfg(test)]
pub mod parser_stmt {
    use super::*;

    fn parse(input: &str) -> Vec<Result<Stmt, AsmError>> {
        Parser::new(Lexer::new(input)).collect()
    }

    fn stmt(lineno: usize, labels: &[&str], inst: Inst) -> Result<Stmt, AsmError> {
        Ok(Stmt {
            lineno,
            labels: labels.iter().map(|s| s.to_string()).collect(),
            inst,
        })
    }

    #[test]
    fn test_rrr_line() {
        let expected = vec![stmt(
            1,
            &["start"],
            Inst::Add {
                ra: Reg::R1,
                rb: Reg::R2,
                rc: Reg::R3,
            },
        )];
        assert_eq!(parse("start: add r1 r2 r3\n"), expected);
    }

    #[test]
    fn test_commas_are_optional() {
        let expected = parse("add r1 r2 r3\n");
        assert_eq!(parse("add r1, r2, r3\n"), expected);
        assert_eq!(parse("add, r1, r2, r3\n"), expected);
        assert_eq!(parse("add r1,r2,r3\n"), expected);
    }

    #[test]
    fn test_immediate_stays_text() {
        let expected = vec![stmt(
            1,
            &[],
            Inst::Beq {
                ra: Reg::R0,
                rb: Reg::R0,
                imm: "start".to_string(),
            },
        )];
        assert_eq!(parse("beq r0 r0 start\n"), expected);
    }

    #[test]
    fn test_nop_and_halt_expansions() {
        let expected = vec![
            stmt(
                1,
                &[],
                Inst::Add {
                    ra: Reg::R0,
                    rb: Reg::R0,
                    rc: Reg::R0,
                },
            ),
            stmt(
                2,
                &[],
                Inst::Jalr {
                    ra: Reg::R0,
                    rb: Reg::R0,
                    imm: 0x71,
                },
            ),
        ];
        assert_eq!(parse("nop\nhalt\n"), expected);
    }

    #[test]
    fn test_movi_expands_to_two_words() {
        let expected = vec![
            stmt(
                1,
                &["val"],
                Inst::Lui {
                    ra: Reg::R1,
                    imm: "0x1234".to_string(),
                },
            ),
            stmt(
                1,
                &[],
                Inst::Lli {
                    ra: Reg::R1,
                    imm: "0x1234".to_string(),
                },
            ),
        ];
        assert_eq!(parse("val: movi r1 0x1234\n"), expected);
    }

    #[test]
    fn test_fill() {
        let expected = vec![
            stmt(1, &["a"], Inst::Data { value: 7 }),
            stmt(2, &[], Inst::Data { value: 0xFFFF }),
            stmt(3, &[], Inst::Data { value: 0xFFF9 }),
        ];
        assert_eq!(parse("a: .fill 7\n.fill 0xffff\n.fill -7\n"), expected);
    }

    #[test]
    fn test_space_expands_with_label_on_first_word() {
        let expected = vec![
            stmt(1, &["buf"], Inst::Data { value: 0 }),
            stmt(1, &[], Inst::Data { value: 0 }),
            stmt(1, &[], Inst::Data { value: 0 }),
            stmt(
                2,
                &[],
                Inst::Jalr {
                    ra: Reg::R0,
                    rb: Reg::R0,
                    imm: 0x71,
                },
            ),
        ];
        assert_eq!(parse("buf: .space 3\nhalt\n"), expected);
    }

    #[test]
    fn test_space_must_be_positive() {
        assert_eq!(
            parse(".space 0\n"),
            vec![Err(AsmError::OutOfRange {
                lineno: 1,
                value: "0".to_string(),
                bits: 16,
            })]
        );
        assert_eq!(
            parse(".space -1\n"),
            vec![Err(AsmError::OutOfRange {
                lineno: 1,
                value: "-1".to_string(),
                bits: 16,
            })]
        );
    }

    #[test]
    fn test_fill_rejects_labels_and_overflow() {
        assert_eq!(
            parse(".fill nope\n"),
            vec![Err(AsmError::OutOfRange {
                lineno: 1,
                value: "nope".to_string(),
                bits: 16,
            })]
        );
        assert_eq!(
            parse(".fill 0x10000\n"),
            vec![Err(AsmError::OutOfRange {
                lineno: 1,
                value: "0x10000".to_string(),
                bits: 16,
            })]
        );
    }

    #[test]
    fn test_label_only_line_binds_forward() {
        let expected = vec![stmt(
            3,
            &["loop", "again"],
            Inst::Add {
                ra: Reg::R0,
                rb: Reg::R0,
                rc: Reg::R0,
            },
        )];
        assert_eq!(parse("loop:\nagain:\nnop\n"), expected);
    }

    #[test]
    fn test_trailing_orphan_label() {
        assert_eq!(
            parse("nop\nend:\n"),
            vec![
                stmt(
                    1,
                    &[],
                    Inst::Add {
                        ra: Reg::R0,
                        rb: Reg::R0,
                        rc: Reg::R0,
                    },
                ),
                Err(AsmError::OrphanLabel {
                    lineno: 2,
                    label: "end".to_string(),
                }),
            ]
        );
    }

    #[test]
    fn test_missing_operand() {
        assert_eq!(
            parse("add r1 r2\n"),
            vec![Err(AsmError::ExpectedNameOrNumber(1))]
        );
    }

    #[test]
    fn test_extra_operand() {
        assert_eq!(parse("jalr r1 r2 5\n"), vec![Err(AsmError::ExpectedEol(1))]);
        assert_eq!(parse("nop r1\n"), vec![Err(AsmError::ExpectedEol(1))]);
    }

    #[test]
    fn test_unknown_instruction() {
        assert_eq!(
            parse("sub r1 r2 r3\n"),
            vec![Err(AsmError::UnknownInstruction {
                lineno: 1,
                name: "sub".to_string(),
            })]
        );
    }

    #[test]
    fn test_invalid_register() {
        assert_eq!(
            parse("add r1 r2 r9\n"),
            vec![Err(AsmError::InvalidRegister {
                lineno: 1,
                name: "r9".to_string(),
            })]
        );
    }

    #[test]
    fn test_lex_invalid_line() {
        assert_eq!(parse("!?\n"), vec![Err(AsmError::Invalid(1))]);
    }

    #[test]
    fn test_error_fuses_the_stream() {
        // nothing after the first error, even with valid lines below
        assert_eq!(
            parse("bogus\nnop\nhalt\n"),
            vec![Err(AsmError::UnknownInstruction {
                lineno: 1,
                name: "bogus".to_string(),
            })]
        );
    }
}
