use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TokenKind {
    /// An identifier suffixed with `:` in the source; the suffix is
    /// stripped here so downstream stages only see the name.
    Label(String),
    /// An identifier or a numeric literal. Which of the two it is gets
    /// decided at encode time, so that immediates may reference labels.
    NameOrNumber(String),
    Comma,
    Eol,
    Eof,
    /// Some part of a line matched no rule; the rest of the line is gone.
    Invalid,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lineno: usize,
}

/// Line-oriented lexer. Each source line produces its tokens followed by
/// one `Eol`; the whole input is terminated by a single `Eof`. Line
/// numbers start at 1.
///
/// Rules, first match wins: comment (`#` to end of line), label, name
/// (leading `.` admits directives, leading `@` branch targets), number
/// (sign, then digits and any identifier tail so `0x12` stays one token),
/// comma, blank. Anything else swallows the rest of the line as `Invalid`.
pub struct Lexer<'a> {
    input_iter: Peekable<Chars<'a>>,
    lineno: usize,
    mid_line: bool,
    sent_eof: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Lexer<'a> {
        Lexer {
            input_iter: input.chars().peekable(),
            lineno: 1,
            mid_line: false,
            sent_eof: false,
        }
    }

    fn discard_char(&mut self) {
        let _ = self.input_iter.next();
    }

    fn peek_char(&mut self) -> Option<&char> {
        self.input_iter.peek()
    }

    fn skip_to_eol(&mut self) {
        while let Some(&c) = self.peek_char() {
            match c {
                '\n' => break,
                _ => self.discard_char(),
            }
        }
    }

    fn read_name(&mut self, c: char) -> String {
        let mut ident = String::new();
        ident.push(c);

        while let Some(&c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' {
                ident.push(c);
                self.discard_char();
            } else {
                break;
            }
        }
        ident
    }

    fn token(&self, kind: TokenKind) -> Token {
        Token {
            kind,
            lineno: self.lineno,
        }
    }

    fn invalid_rest_of_line(&mut self) -> Token {
        self.skip_to_eol();
        self.token(TokenKind::Invalid)
    }

    pub fn next_token(&mut self) -> Option<Token> {
        loop {
            let c = match self.peek_char() {
                Some(&c) => c,
                None => {
                    // An unterminated final line still gets its Eol.
                    if self.mid_line {
                        self.mid_line = false;
                        return Some(self.token(TokenKind::Eol));
                    }
                    if self.sent_eof {
                        return None;
                    }
                    self.sent_eof = true;
                    return Some(self.token(TokenKind::Eof));
                }
            };

            match c {
                '\n' => {
                    self.discard_char();
                    let token = self.token(TokenKind::Eol);
                    self.lineno += 1;
                    self.mid_line = false;
                    return Some(token);
                }
                ' ' | '\t' => {
                    self.discard_char();
                    self.mid_line = true;
                }
                '#' => {
                    self.skip_to_eol();
                    self.mid_line = true;
                }
                ',' => {
                    self.discard_char();
                    self.mid_line = true;
                    return Some(self.token(TokenKind::Comma));
                }
                _ if c.is_ascii_alphabetic() || c == '_' || c == '.' || c == '@' => {
                    self.discard_char();
                    self.mid_line = true;
                    let ident = self.read_name(c);
                    // Only plain names can be labels
                    if !ident.starts_with('.')
                        && !ident.starts_with('@')
                        && self.peek_char() == Some(&':')
                    {
                        self.discard_char();
                        return Some(self.token(TokenKind::Label(ident)));
                    }
                    return Some(self.token(TokenKind::NameOrNumber(ident)));
                }
                _ if c.is_ascii_digit() || c == '-' => {
                    self.discard_char();
                    self.mid_line = true;
                    if c == '-' && !matches!(self.peek_char(), Some(d) if d.is_ascii_digit()) {
                        return Some(self.invalid_rest_of_line());
                    }
                    let mut digits = String::new();
                    digits.push(c);
                    while let Some(&d) = self.peek_char() {
                        if d.is_ascii_alphanumeric() || d == '_' {
                            digits.push(d);
                            self.discard_char();
                        } else {
                            break;
                        }
                    }
                    return Some(self.token(TokenKind::NameOrNumber(digits)));
                }
                _ => {
                    self.mid_line = true;
                    return Some(self.invalid_rest_of_line());
                }
            }
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;
    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}
