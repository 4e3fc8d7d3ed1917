//! Lexer for JScript source code
//!
//! Converts source text into a stream of tokens. Regular-expression literals
//! are context sensitive, so the lexer always produces `Slash`/`SlashEq` and
//! the parser asks for a rescan when it expects an operand.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::SourceLocation;
use crate::string_dict::StringDict;
use crate::value::JsString;

/// Source span information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            offset: self.start as u32,
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self {
            start: 0,
            end: 0,
            line: 1,
            column: 1,
        }
    }
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    String(JsString),
    RegExp(String, String), // (pattern, flags)
    True,
    False,
    Null,

    Identifier(JsString),

    // Keywords
    Let,
    Const,
    Var,
    Function,
    Return,
    If,
    Else,
    For,
    While,
    Do,
    Break,
    Continue,
    Switch,
    Case,
    Default,
    Try,
    Catch,
    Finally,
    Throw,
    New,
    This,
    Typeof,
    Instanceof,
    In,
    Void,
    Delete,
    With,
    Debugger,

    // Operators
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    PlusPlus,   // ++
    MinusMinus, // --
    Eq,         // =
    EqEq,       // ==
    EqEqEq,     // ===
    BangEq,     // !=
    BangEqEq,   // !==
    Lt,         // <
    LtEq,       // <=
    Gt,         // >
    GtEq,       // >=
    LtLt,       // <<
    GtGt,       // >>
    GtGtGt,     // >>>
    Amp,        // &
    AmpAmp,     // &&
    Pipe,       // |
    PipePipe,   // ||
    Caret,      // ^
    Tilde,      // ~
    Bang,       // !
    Question,   // ?

    // Assignment Operators
    PlusEq,   // +=
    MinusEq,  // -=
    StarEq,   // *=
    SlashEq,  // /=
    PercentEq, // %=
    AmpEq,    // &=
    PipeEq,   // |=
    CaretEq,  // ^=
    LtLtEq,   // <<=
    GtGtEq,   // >>=
    GtGtGtEq, // >>>=

    // Punctuation
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    LBracket,  // [
    RBracket,  // ]
    Dot,       // .
    Comma,     // ,
    Colon,     // :
    Semicolon, // ;

    // Special
    Eof,
    /// Unterminated string literal
    Unterminated,
    Invalid(char),
}

/// A token with its source location
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn eof(pos: usize, line: u32, column: u32) -> Self {
        Self {
            kind: TokenKind::Eof,
            span: Span::new(pos, pos, line, column),
        }
    }
}

/// Lexer for tokenizing JScript source code
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    /// Base offset added to char_indices positions after a rescan
    chars_base_offset: usize,
    current_pos: usize,
    line: u32,
    column: u32,
    start_pos: usize,
    start_line: u32,
    start_column: u32,
    /// Tracks if we just saw a newline (for ASI)
    saw_newline: bool,
    /// String dictionary for interning identifiers and strings
    string_dict: &'a mut StringDict,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, string_dict: &'a mut StringDict) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            chars_base_offset: 0,
            current_pos: 0,
            line: 1,
            column: 1,
            start_pos: 0,
            start_line: 1,
            start_column: 1,
            saw_newline: false,
            string_dict,
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Get mutable reference to the string dictionary for interning
    pub fn string_dict(&mut self) -> &mut StringDict {
        self.string_dict
    }

    /// Reset the lexer to the start of `span` and scan a regexp literal.
    /// Used when the parser determines that a `/` starts an operand.
    pub fn rescan_as_regexp(&mut self, span: Span) -> Token {
        self.current_pos = span.start;
        self.line = span.line;
        self.column = span.column;
        self.start_pos = span.start;
        self.start_line = span.line;
        self.start_column = span.column;

        self.chars_base_offset = span.start;
        self.chars = self
            .source
            .get(span.start..)
            .unwrap_or("")
            .char_indices()
            .peekable();

        self.scan_regexp()
    }

    /// Get the next token from the source
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        self.start_pos = self.current_pos;
        self.start_line = self.line;
        self.start_column = self.column;

        let Some((_pos, ch)) = self.advance() else {
            return Token::eof(self.current_pos, self.line, self.column);
        };

        let kind = match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '~' => TokenKind::Tilde,
            ':' => TokenKind::Colon,
            '?' => TokenKind::Question,

            '.' => self.scan_dot(),
            '+' => self.scan_plus(),
            '-' => self.scan_minus(),
            '*' => self.with_assign(TokenKind::Star, TokenKind::StarEq),
            '/' => self.with_assign(TokenKind::Slash, TokenKind::SlashEq),
            '%' => self.with_assign(TokenKind::Percent, TokenKind::PercentEq),
            '^' => self.with_assign(TokenKind::Caret, TokenKind::CaretEq),
            '=' => self.scan_equals(),
            '!' => self.scan_bang(),
            '<' => self.scan_less_than(),
            '>' => self.scan_greater_than(),
            '&' => self.scan_ampersand(),
            '|' => self.scan_pipe(),

            '"' | '\'' => self.scan_string(ch),

            '0'..='9' => self.scan_number(ch),

            c if is_id_start(c) => self.scan_identifier(c),

            c => TokenKind::Invalid(c),
        };

        Token::new(kind, self.make_span())
    }

    /// Check if there was a newline before the current token
    pub fn had_newline_before(&self) -> bool {
        self.saw_newline
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((pos, ch)) = result {
            self.current_pos = self.chars_base_offset + pos + ch.len_utf8();
            if is_line_terminator(ch) {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        result
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn peek_next(&self) -> Option<char> {
        let slice = self.source.get(self.current_pos..)?;
        let mut iter = slice.chars();
        iter.next();
        iter.next()
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn make_span(&self) -> Span {
        Span::new(
            self.start_pos,
            self.current_pos,
            self.start_line,
            self.start_column,
        )
    }

    fn skip_whitespace_and_comments(&mut self) {
        self.saw_newline = false;

        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r' | '\u{000B}' | '\u{000C}' | '\u{00A0}' | '\u{FEFF}') => {
                    self.advance();
                }
                Some('\n' | '\u{2028}' | '\u{2029}') => {
                    self.saw_newline = true;
                    self.advance();
                }
                Some('/') => {
                    let next = self.peek_next();
                    if next == Some('/') {
                        self.advance();
                        self.advance();
                        while let Some(ch) = self.peek() {
                            if is_line_terminator(ch) {
                                break;
                            }
                            self.advance();
                        }
                    } else if next == Some('*') {
                        self.advance();
                        self.advance();
                        loop {
                            match self.advance() {
                                Some((_, '*')) if self.peek() == Some('/') => {
                                    self.advance();
                                    break;
                                }
                                Some((_, c)) if is_line_terminator(c) => {
                                    self.saw_newline = true;
                                }
                                Some(_) => {}
                                None => break,
                            }
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    fn with_assign(&mut self, plain: TokenKind, assign: TokenKind) -> TokenKind {
        if self.match_char('=') { assign } else { plain }
    }

    fn scan_dot(&mut self) -> TokenKind {
        if matches!(self.peek(), Some('0'..='9')) {
            self.scan_number('.')
        } else {
            TokenKind::Dot
        }
    }

    fn scan_plus(&mut self) -> TokenKind {
        if self.match_char('+') {
            TokenKind::PlusPlus
        } else {
            self.with_assign(TokenKind::Plus, TokenKind::PlusEq)
        }
    }

    fn scan_minus(&mut self) -> TokenKind {
        if self.match_char('-') {
            TokenKind::MinusMinus
        } else {
            self.with_assign(TokenKind::Minus, TokenKind::MinusEq)
        }
    }

    /// Scan a regular expression literal.
    /// The leading `/` is at the current position (not yet consumed).
    pub fn scan_regexp(&mut self) -> Token {
        let start_pos = self.current_pos;
        let start_line = self.line;
        let start_column = self.column;

        self.advance();

        let mut pattern = String::new();
        let mut in_class = false;
        let mut terminated = false;

        loop {
            match self.advance() {
                Some((_, '/')) if !in_class => {
                    terminated = true;
                    break;
                }
                Some((_, '[')) => {
                    in_class = true;
                    pattern.push('[');
                }
                Some((_, ']')) => {
                    in_class = false;
                    pattern.push(']');
                }
                Some((_, '\\')) => {
                    pattern.push('\\');
                    if let Some((_, c)) = self.advance() {
                        pattern.push(c);
                    }
                }
                Some((_, c)) if is_line_terminator(c) => break,
                Some((_, c)) => pattern.push(c),
                None => break,
            }
        }

        let span = Span::new(start_pos, self.current_pos, start_line, start_column);
        if !terminated {
            return Token::new(TokenKind::Invalid('/'), span);
        }

        let mut flags = String::new();
        while let Some(ch) = self.peek() {
            if is_id_continue(ch) {
                flags.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let span = Span::new(start_pos, self.current_pos, start_line, start_column);
        Token::new(TokenKind::RegExp(pattern, flags), span)
    }

    fn scan_equals(&mut self) -> TokenKind {
        if self.match_char('=') {
            if self.match_char('=') {
                TokenKind::EqEqEq
            } else {
                TokenKind::EqEq
            }
        } else {
            TokenKind::Eq
        }
    }

    fn scan_bang(&mut self) -> TokenKind {
        if self.match_char('=') {
            if self.match_char('=') {
                TokenKind::BangEqEq
            } else {
                TokenKind::BangEq
            }
        } else {
            TokenKind::Bang
        }
    }

    fn scan_less_than(&mut self) -> TokenKind {
        if self.match_char('<') {
            self.with_assign(TokenKind::LtLt, TokenKind::LtLtEq)
        } else {
            self.with_assign(TokenKind::Lt, TokenKind::LtEq)
        }
    }

    fn scan_greater_than(&mut self) -> TokenKind {
        if self.match_char('>') {
            if self.match_char('>') {
                self.with_assign(TokenKind::GtGtGt, TokenKind::GtGtGtEq)
            } else {
                self.with_assign(TokenKind::GtGt, TokenKind::GtGtEq)
            }
        } else {
            self.with_assign(TokenKind::Gt, TokenKind::GtEq)
        }
    }

    fn scan_ampersand(&mut self) -> TokenKind {
        if self.match_char('&') {
            TokenKind::AmpAmp
        } else {
            self.with_assign(TokenKind::Amp, TokenKind::AmpEq)
        }
    }

    fn scan_pipe(&mut self) -> TokenKind {
        if self.match_char('|') {
            TokenKind::PipePipe
        } else {
            self.with_assign(TokenKind::Pipe, TokenKind::PipeEq)
        }
    }

    fn scan_string(&mut self, quote: char) -> TokenKind {
        let mut value = String::new();

        loop {
            match self.advance() {
                Some((_, c)) if c == quote => break,
                Some((_, '\\')) => match self.advance() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, 'b')) => value.push('\x08'),
                    Some((_, 'f')) => value.push('\x0C'),
                    Some((_, 'v')) => value.push('\x0B'),
                    Some((_, c @ '0'..='7')) => {
                        // Legacy octal escape, up to three digits and at most \377
                        let mut code = c.to_digit(8).unwrap_or(0);
                        let max_digits = if c <= '3' { 3 } else { 2 };
                        for _ in 1..max_digits {
                            match self.peek().and_then(|d| d.to_digit(8)) {
                                Some(d) => {
                                    code = code * 8 + d;
                                    self.advance();
                                }
                                None => break,
                            }
                        }
                        if let Some(ch) = char::from_u32(code) {
                            value.push(ch);
                        }
                    }
                    Some((_, 'x')) => match self.scan_hex_escape(2) {
                        Some(ch) => value.push(ch),
                        None => value.push('x'),
                    },
                    Some((_, 'u')) => match self.scan_hex_escape(4) {
                        Some(ch) => value.push(ch),
                        None => value.push('u'),
                    },
                    Some((_, '\r')) => {
                        self.match_char('\n');
                    }
                    Some((_, c)) if is_line_terminator(c) => {}
                    Some((_, c)) => value.push(c),
                    None => return TokenKind::Unterminated,
                },
                Some((_, c)) if is_line_terminator(c) => return TokenKind::Unterminated,
                Some((_, c)) => value.push(c),
                None => return TokenKind::Unterminated,
            }
        }

        TokenKind::String(self.string_dict.get_or_insert(&value))
    }

    fn scan_hex_escape(&mut self, count: usize) -> Option<char> {
        let rest = self.source.get(self.current_pos..)?;
        let digits = rest.get(..count)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let code = u32::from_str_radix(digits, 16).ok()?;
        for _ in 0..count {
            self.advance();
        }
        // Lone surrogates cannot be represented in a Rust string
        Some(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    fn scan_number(&mut self, first: char) -> TokenKind {
        let mut num_str = String::new();

        if first == '0' {
            match self.peek() {
                Some('x' | 'X') => {
                    self.advance();
                    while let Some(ch) = self.peek() {
                        if ch.is_ascii_hexdigit() {
                            num_str.push(ch);
                            self.advance();
                        } else {
                            break;
                        }
                    }
                    if num_str.is_empty() {
                        return TokenKind::Invalid('x');
                    }
                    return TokenKind::Number(parse_radix(&num_str, 16));
                }
                Some('0'..='7') => {
                    // Legacy octal literal; falls back to decimal if an 8 or 9 shows up
                    while let Some(ch) = self.peek() {
                        if ch.is_ascii_digit() {
                            num_str.push(ch);
                            self.advance();
                        } else {
                            break;
                        }
                    }
                    if num_str.bytes().all(|b| b < b'8') {
                        return TokenKind::Number(parse_radix(&num_str, 8));
                    }
                    return TokenKind::Number(num_str.parse().unwrap_or(f64::NAN));
                }
                _ => num_str.push(first),
            }
        } else if first != '.' {
            num_str.push(first);
        }

        if first != '.' {
            while let Some(ch) = self.peek() {
                if ch.is_ascii_digit() {
                    num_str.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if first == '.' || self.peek() == Some('.') {
            if first != '.' {
                self.advance();
            }
            num_str.push('.');
            while let Some(ch) = self.peek() {
                if ch.is_ascii_digit() {
                    num_str.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
            // "1." is a valid literal but not valid input for str::parse
            if num_str.ends_with('.') {
                num_str.push('0');
            }
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            let has_digits = match self.peek_next() {
                Some('0'..='9') => true,
                Some('+' | '-') => {
                    let rest = self.source.get(self.current_pos..).unwrap_or("");
                    rest.chars().nth(2).is_some_and(|c| c.is_ascii_digit())
                }
                _ => false,
            };
            if has_digits {
                num_str.push('e');
                self.advance();
                if let Some(sign @ ('+' | '-')) = self.peek() {
                    num_str.push(sign);
                    self.advance();
                }
                while let Some(ch) = self.peek() {
                    if ch.is_ascii_digit() {
                        num_str.push(ch);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        if self.peek().is_some_and(is_id_start) {
            return TokenKind::Invalid(self.peek().unwrap_or(first));
        }

        TokenKind::Number(num_str.parse().unwrap_or(f64::NAN))
    }

    fn scan_identifier(&mut self, first: char) -> TokenKind {
        let mut name = String::new();
        name.push(first);

        while let Some(ch) = self.peek() {
            if is_id_continue(ch) {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match name.as_str() {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "let" => TokenKind::Let,
            "const" => TokenKind::Const,
            "var" => TokenKind::Var,
            "function" => TokenKind::Function,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "switch" => TokenKind::Switch,
            "case" => TokenKind::Case,
            "default" => TokenKind::Default,
            "try" => TokenKind::Try,
            "catch" => TokenKind::Catch,
            "finally" => TokenKind::Finally,
            "throw" => TokenKind::Throw,
            "new" => TokenKind::New,
            "this" => TokenKind::This,
            "typeof" => TokenKind::Typeof,
            "instanceof" => TokenKind::Instanceof,
            "in" => TokenKind::In,
            "void" => TokenKind::Void,
            "delete" => TokenKind::Delete,
            "with" => TokenKind::With,
            "debugger" => TokenKind::Debugger,
            _ => TokenKind::Identifier(self.string_dict.get_or_insert(&name)),
        }
    }
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    digits
        .chars()
        .filter_map(|c| c.to_digit(radix))
        .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d))
}

fn is_line_terminator(ch: char) -> bool {
    matches!(ch, '\n' | '\u{2028}' | '\u{2029}')
}

/// Check if a character can start an identifier
fn is_id_start(ch: char) -> bool {
    ch == '_' || ch == '$' || unicode_xid::UnicodeXID::is_xid_start(ch)
}

/// Check if a character can continue an identifier
fn is_id_continue(ch: char) -> bool {
    ch == '_' || ch == '$' || unicode_xid::UnicodeXID::is_xid_continue(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(value: &str) -> JsString {
        JsString::from(value)
    }

    fn lex(source: &str) -> Vec<TokenKind> {
        let mut dict = StringDict::new();
        let mut lexer = Lexer::new(source, &mut dict);
        let mut tokens = vec![];
        loop {
            let token = lexer.next_token();
            if token.kind == TokenKind::Eof {
                break;
            }
            tokens.push(token.kind);
        }
        tokens
    }

    #[test]
    fn test_numbers() {
        assert_eq!(lex("42"), vec![TokenKind::Number(42.0)]);
        assert_eq!(lex("3.5"), vec![TokenKind::Number(3.5)]);
        assert_eq!(lex("1e10"), vec![TokenKind::Number(1e10)]);
        assert_eq!(lex("0xff"), vec![TokenKind::Number(255.0)]);
        assert_eq!(lex(".5"), vec![TokenKind::Number(0.5)]);
        assert_eq!(lex("1."), vec![TokenKind::Number(1.0)]);
    }

    #[test]
    fn test_legacy_octal() {
        assert_eq!(lex("017"), vec![TokenKind::Number(15.0)]);
        assert_eq!(lex("019"), vec![TokenKind::Number(19.0)]);
        assert_eq!(lex("0"), vec![TokenKind::Number(0.0)]);
    }

    #[test]
    fn test_number_followed_by_identifier_is_invalid() {
        assert_eq!(lex("3in"), vec![TokenKind::Invalid('i')]);
    }

    #[test]
    fn test_strings() {
        assert_eq!(lex(r#""hello""#), vec![TokenKind::String(s("hello"))]);
        assert_eq!(lex(r#"'world'"#), vec![TokenKind::String(s("world"))]);
        assert_eq!(lex(r#""line\nbreak""#), vec![TokenKind::String(s("line\nbreak"))]);
        assert_eq!(lex(r#""\x41B\101""#), vec![TokenKind::String(s("ABA"))]);
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(lex("\"abc"), vec![TokenKind::Unterminated]);
        assert_eq!(
            lex("'abc\n'"),
            vec![TokenKind::Unterminated, TokenKind::Unterminated]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            lex("+ - * / %"),
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Percent
            ]
        );
        assert_eq!(lex("=== !== "), vec![TokenKind::EqEqEq, TokenKind::BangEqEq]);
        assert_eq!(
            lex(">>>= >>= <<="),
            vec![TokenKind::GtGtGtEq, TokenKind::GtGtEq, TokenKind::LtLtEq]
        );
        assert_eq!(lex("a++"), vec![TokenKind::Identifier(s("a")), TokenKind::PlusPlus]);
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            lex("var with typeof"),
            vec![TokenKind::Var, TokenKind::With, TokenKind::Typeof]
        );
        // Keywords are case sensitive
        assert_eq!(lex("Var"), vec![TokenKind::Identifier(s("Var"))]);
    }

    #[test]
    fn test_comments_and_newlines() {
        let mut dict = StringDict::new();
        let mut lexer = Lexer::new("a /* x\n */ b // c\nd", &mut dict);
        assert_eq!(lexer.next_token().kind, TokenKind::Identifier(s("a")));
        assert!(!lexer.had_newline_before());
        assert_eq!(lexer.next_token().kind, TokenKind::Identifier(s("b")));
        assert!(lexer.had_newline_before());
        assert_eq!(lexer.next_token().kind, TokenKind::Identifier(s("d")));
        assert!(lexer.had_newline_before());
    }

    #[test]
    fn test_regexp_rescan() {
        let mut dict = StringDict::new();
        let mut lexer = Lexer::new("/a[/]b\\//gi", &mut dict);
        let slash = lexer.next_token();
        assert_eq!(slash.kind, TokenKind::Slash);
        let regexp = lexer.rescan_as_regexp(slash.span);
        assert_eq!(
            regexp.kind,
            TokenKind::RegExp("a[/]b\\/".to_string(), "gi".to_string())
        );
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn test_spans() {
        let mut dict = StringDict::new();
        let mut lexer = Lexer::new("x\n  yy", &mut dict);
        lexer.next_token();
        let token = lexer.next_token();
        assert_eq!(token.span, Span::new(4, 6, 2, 3));
    }
}
