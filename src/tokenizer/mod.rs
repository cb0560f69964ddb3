use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::diagnostics::{DiagnosticSink, Stage};

/// Represents the position of a token in the source code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// All possible token types in the Python subset
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),

    // Identifiers
    Identifier(String),

    // Keywords
    If,
    Elif,
    Else,
    While,
    For,
    In,
    Print,
    Input,
    And,
    Or,
    Not,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Equal,
    EqualEqual,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
    Colon,
    Dot,

    // Layout
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl TokenKind {
    /// Classifier name used in the lexeme/token table.
    pub fn label(&self) -> &'static str {
        match self {
            TokenKind::Integer(_) => "INTEGER_LITERAL",
            TokenKind::Float(_) => "FLOAT_LITERAL",
            TokenKind::String(_) => "STRING_LITERAL",
            TokenKind::Boolean(_) => "BOOLEAN_LITERAL",
            TokenKind::Identifier(_) => "IDENTIFIER",
            TokenKind::If => "IF",
            TokenKind::Elif => "ELIF",
            TokenKind::Else => "ELSE",
            TokenKind::While => "WHILE",
            TokenKind::For => "FOR",
            TokenKind::In => "IN",
            TokenKind::Print => "PRINT",
            TokenKind::Input => "INPUT",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Not => "NOT",
            TokenKind::Plus => "PLUS",
            TokenKind::Minus => "MINUS",
            TokenKind::Star => "MULTIPLY",
            TokenKind::Slash => "DIVIDE",
            TokenKind::Percent => "MODULO",
            TokenKind::Equal => "ASSIGN",
            TokenKind::EqualEqual => "EQUAL_EQUAL",
            TokenKind::NotEqual => "NOT_EQUAL",
            TokenKind::Less => "LESS_THAN",
            TokenKind::LessEqual => "LESS_EQUAL",
            TokenKind::Greater => "GREATER_THAN",
            TokenKind::GreaterEqual => "GREATER_EQUAL",
            TokenKind::LeftParen => "LPAREN",
            TokenKind::RightParen => "RPAREN",
            TokenKind::LeftBracket => "LBRACKET",
            TokenKind::RightBracket => "RBRACKET",
            TokenKind::Comma => "COMMA",
            TokenKind::Colon => "COLON",
            TokenKind::Dot => "DOT",
            TokenKind::Newline => "NEWLINE",
            TokenKind::Indent => "INDENT",
            TokenKind::Dedent => "DEDENT",
            TokenKind::Eof => "END_OF_FILE",
        }
    }

    /// Source text for the lexeme/token table. Layout tokens have none.
    pub fn lexeme(&self) -> String {
        match self {
            TokenKind::Integer(value) => value.to_string(),
            TokenKind::Float(value) => value.to_string(),
            TokenKind::String(value) => value.clone(),
            TokenKind::Boolean(true) => "True".into(),
            TokenKind::Boolean(false) => "False".into(),
            TokenKind::Identifier(name) => name.clone(),
            TokenKind::If => "if".into(),
            TokenKind::Elif => "elif".into(),
            TokenKind::Else => "else".into(),
            TokenKind::While => "while".into(),
            TokenKind::For => "for".into(),
            TokenKind::In => "in".into(),
            TokenKind::Print => "print".into(),
            TokenKind::Input => "input".into(),
            TokenKind::And => "and".into(),
            TokenKind::Or => "or".into(),
            TokenKind::Not => "not".into(),
            TokenKind::Plus => "+".into(),
            TokenKind::Minus => "-".into(),
            TokenKind::Star => "*".into(),
            TokenKind::Slash => "/".into(),
            TokenKind::Percent => "%".into(),
            TokenKind::Equal => "=".into(),
            TokenKind::EqualEqual => "==".into(),
            TokenKind::NotEqual => "!=".into(),
            TokenKind::Less => "<".into(),
            TokenKind::LessEqual => "<=".into(),
            TokenKind::Greater => ">".into(),
            TokenKind::GreaterEqual => ">=".into(),
            TokenKind::LeftParen => "(".into(),
            TokenKind::RightParen => ")".into(),
            TokenKind::LeftBracket => "[".into(),
            TokenKind::RightBracket => "]".into(),
            TokenKind::Comma => ",".into(),
            TokenKind::Colon => ":".into(),
            TokenKind::Dot => ".".into(),
            TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent => String::new(),
            TokenKind::Eof => "EOF".into(),
        }
    }

    pub fn is_layout(&self) -> bool {
        matches!(
            self,
            TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent
        )
    }
}

/// A token with its kind and position information
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, position: Position) -> Self {
        Self { kind, position }
    }
}

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    HashMap::from([
        ("if", TokenKind::If),
        ("elif", TokenKind::Elif),
        ("else", TokenKind::Else),
        ("while", TokenKind::While),
        ("for", TokenKind::For),
        ("in", TokenKind::In),
        ("print", TokenKind::Print),
        ("input", TokenKind::Input),
        ("and", TokenKind::And),
        ("or", TokenKind::Or),
        ("not", TokenKind::Not),
        ("True", TokenKind::Boolean(true)),
        ("False", TokenKind::Boolean(false)),
    ])
});

/// Tokenizer for the Python subset.
///
/// Lexical failures are recorded on the sink and scanning continues past
/// them, so a single bad literal does not hide the rest of the file.
pub struct Tokenizer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    indent_stack: Vec<usize>,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            indent_stack: vec![0],
        }
    }

    pub fn tokenize(&mut self, sink: &mut DiagnosticSink) -> Vec<Token> {
        self.measure_indentation();

        while !self.is_at_end() {
            self.skip_spaces();

            if self.is_at_end() {
                break;
            }

            let ch = self.current_char();

            if ch == '\n' {
                self.handle_newline();
                continue;
            }

            if ch == '#' {
                self.skip_comment();
                continue;
            }

            if ch == '"' || ch == '\'' {
                self.scan_string(sink);
                continue;
            }

            if ch.is_ascii_digit() {
                self.scan_number(sink);
                continue;
            }

            if ch.is_alphabetic() || ch == '_' {
                self.scan_identifier();
                continue;
            }

            self.scan_operator(sink);
        }

        // Close any blocks still open at end of input.
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.emit(TokenKind::Dedent, self.current_position());
        }

        self.emit(TokenKind::Eof, self.current_position());
        std::mem::take(&mut self.tokens)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_char(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.input[self.position]
        }
    }

    fn peek_char(&self) -> Option<char> {
        if self.position + 1 >= self.input.len() {
            None
        } else {
            Some(self.input[self.position + 1])
        }
    }

    fn advance(&mut self) -> char {
        let ch = self.current_char();
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    fn current_position(&self) -> Position {
        Position::new(self.line, self.column, self.position)
    }

    fn emit(&mut self, kind: TokenKind, position: Position) {
        self.tokens.push(Token::new(kind, position));
    }

    fn skip_spaces(&mut self) {
        while !self.is_at_end() {
            match self.current_char() {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                _ => break,
            }
        }
    }

    fn skip_comment(&mut self) {
        while !self.is_at_end() && self.current_char() != '\n' {
            self.advance();
        }
    }

    fn handle_newline(&mut self) {
        let position = self.current_position();
        self.advance();
        self.emit(TokenKind::Newline, position);
        self.measure_indentation();
    }

    /// Measures the indentation of the next logical line, skipping blank and
    /// comment-only lines, and emits Indent/Dedent tokens as needed.
    fn measure_indentation(&mut self) {
        loop {
            let mut probe = self.position;
            let mut width = 0usize;

            while probe < self.input.len() && matches!(self.input[probe], ' ' | '\t') {
                width += if self.input[probe] == '\t' { 4 } else { 1 };
                probe += 1;
            }

            if probe >= self.input.len() {
                return;
            }

            match self.input[probe] {
                '\n' | '\r' => {
                    // Blank line: consume it without touching the indent stack.
                    while self.position <= probe {
                        self.advance();
                    }
                }
                '#' => {
                    while self.position < probe {
                        self.advance();
                    }
                    self.skip_comment();
                    if !self.is_at_end() {
                        self.advance();
                    }
                }
                _ => {
                    while self.position < probe {
                        self.advance();
                    }
                    self.apply_indentation(width);
                    return;
                }
            }
        }
    }

    fn apply_indentation(&mut self, width: usize) {
        let current = self.indent_stack.last().copied().unwrap_or(0);

        if width > current {
            self.indent_stack.push(width);
            self.emit(TokenKind::Indent, self.current_position());
        } else if width < current {
            while let Some(&level) = self.indent_stack.last() {
                if level <= width {
                    break;
                }
                self.indent_stack.pop();
                self.emit(TokenKind::Dedent, self.current_position());
            }
        }
    }

    fn scan_string(&mut self, sink: &mut DiagnosticSink) {
        let start = self.current_position();
        let quote = self.advance();
        let mut value = String::new();

        while !self.is_at_end() && self.current_char() != quote && self.current_char() != '\n' {
            if self.current_char() == '\\' {
                self.advance();
                if self.is_at_end() {
                    break;
                }
                match self.current_char() {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '\\' => value.push('\\'),
                    '"' => value.push('"'),
                    '\'' => value.push('\''),
                    other => {
                        value.push('\\');
                        value.push(other);
                    }
                }
                self.advance();
            } else {
                value.push(self.advance());
            }
        }

        if self.is_at_end() || self.current_char() == '\n' {
            sink.error(Stage::Lexical, "Unterminated string literal.", &start);
            return;
        }

        self.advance();
        self.emit(TokenKind::String(value), start);
    }

    fn scan_number(&mut self, sink: &mut DiagnosticSink) {
        let start = self.current_position();
        let mut text = String::new();
        let mut is_float = false;

        while !self.is_at_end() && self.current_char().is_ascii_digit() {
            text.push(self.advance());
        }

        // A dot only begins a fractional part when a digit follows it;
        // otherwise it is left for the next token.
        if self.current_char() == '.'
            && self.peek_char().is_some_and(|ch| ch.is_ascii_digit())
        {
            is_float = true;
            text.push(self.advance());
            while !self.is_at_end() && self.current_char().is_ascii_digit() {
                text.push(self.advance());
            }
        }

        if is_float {
            match text.parse::<f64>() {
                Ok(value) => self.emit(TokenKind::Float(value), start),
                Err(_) => sink.error(
                    Stage::Lexical,
                    format!("Invalid float literal: {}", text),
                    &start,
                ),
            }
        } else {
            match text.parse::<i64>() {
                Ok(value) => self.emit(TokenKind::Integer(value), start),
                Err(_) => sink.error(
                    Stage::Lexical,
                    format!("Invalid integer literal: {}", text),
                    &start,
                ),
            }
        }
    }

    fn scan_identifier(&mut self) {
        let start = self.current_position();
        let mut name = String::new();

        while !self.is_at_end()
            && (self.current_char().is_alphanumeric() || self.current_char() == '_')
        {
            name.push(self.advance());
        }

        let kind = KEYWORDS
            .get(name.as_str())
            .cloned()
            .unwrap_or(TokenKind::Identifier(name));
        self.emit(kind, start);
    }

    fn scan_operator(&mut self, sink: &mut DiagnosticSink) {
        let start = self.current_position();
        let ch = self.advance();

        let kind = match ch {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '=' => {
                if self.current_char() == '=' {
                    self.advance();
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                }
            }
            '!' => {
                if self.current_char() == '=' {
                    self.advance();
                    TokenKind::NotEqual
                } else {
                    sink.error(Stage::Lexical, "Unknown character: '!'", &start);
                    return;
                }
            }
            '<' => {
                if self.current_char() == '=' {
                    self.advance();
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                }
            }
            '>' => {
                if self.current_char() == '=' {
                    self.advance();
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,
            other => {
                sink.error(
                    Stage::Lexical,
                    format!("Unexpected character: '{}'", other),
                    &start,
                );
                return;
            }
        };

        self.emit(kind, start);
    }
}
