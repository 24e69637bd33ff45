// SQL Lexer Implementation
//
// This module tokenizes the SQL dialect accepted by the transpiler. The
// lexer is total: unrecognized characters become Unknown tokens so the
// parser can report a precise position instead of the lexer failing.

use std::collections::HashMap;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use once_cell::sync::Lazy;

/// SQL token types
#[derive(Debug, PartialEq, Clone)]
pub enum TokenType {
    // Keywords
    Select,
    Distinct,
    From,
    As,
    Join,
    Inner,
    Left,
    Outer,
    On,
    Where,
    And,
    Or,
    Not,
    Like,
    In,
    Is,
    Null,
    Group,
    By,
    Order,
    Asc,
    Desc,
    Top,
    Limit,
    Count,
    Sum,
    Avg,
    Min,
    Max,

    // Literals
    String(String),
    Integer(i64),
    Float(f64),

    // Identifiers (case preserved; attribute names are case-sensitive
    // in the target platform)
    Identifier(String),

    // Operators
    Equals,       // =
    NotEqual,     // <>
    LessThan,     // <
    GreaterThan,  // >
    LessEqual,    // <=
    GreaterEqual, // >=
    Star,         // * (wildcard / COUNT(*))

    // Punctuation
    Comma,      // ,
    LeftParen,  // (
    RightParen, // )
    Dot,        // .
    Semicolon,  // ;

    // Special
    Eof,
    Unknown(String),
}

static KEYWORDS: Lazy<HashMap<&'static str, TokenType>> = Lazy::new(|| {
    HashMap::from([
        ("SELECT", TokenType::Select),
        ("DISTINCT", TokenType::Distinct),
        ("FROM", TokenType::From),
        ("AS", TokenType::As),
        ("JOIN", TokenType::Join),
        ("INNER", TokenType::Inner),
        ("LEFT", TokenType::Left),
        ("OUTER", TokenType::Outer),
        ("ON", TokenType::On),
        ("WHERE", TokenType::Where),
        ("AND", TokenType::And),
        ("OR", TokenType::Or),
        ("NOT", TokenType::Not),
        ("LIKE", TokenType::Like),
        ("IN", TokenType::In),
        ("IS", TokenType::Is),
        ("NULL", TokenType::Null),
        ("GROUP", TokenType::Group),
        ("BY", TokenType::By),
        ("ORDER", TokenType::Order),
        ("ASC", TokenType::Asc),
        ("DESC", TokenType::Desc),
        ("TOP", TokenType::Top),
        ("LIMIT", TokenType::Limit),
        ("COUNT", TokenType::Count),
        ("SUM", TokenType::Sum),
        ("AVG", TokenType::Avg),
        ("MIN", TokenType::Min),
        ("MAX", TokenType::Max),
    ])
});

/// A Token is a lexical unit of the SQL input
#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub literal: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}({})", self.token_type, self.literal)
    }
}

/// SQL lexer for breaking a query string into tokens
pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
    ch: Option<char>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer from a SQL query string
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer {
            input: input.chars().peekable(),
            line: 1,
            column: 0,
            ch: None,
        };
        lexer.read_char();
        lexer
    }

    /// Tokenize the whole input, including the trailing Eof token
    pub fn tokenize(input: &'a str) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();

        loop {
            let token = lexer.next_token();
            let is_eof = matches!(token.token_type, TokenType::Eof);
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        tokens
    }

    /// Read the next character from the input
    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.next();
        self.ch = ch;

        if let Some(c) = ch {
            self.column += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            }
        }

        ch
    }

    /// Peek at the next character without advancing
    fn peek_char(&mut self) -> Option<char> {
        self.input.peek().copied()
    }

    /// Skip whitespace characters
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.ch {
            if ch.is_whitespace() {
                self.read_char();
            } else {
                break;
            }
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> String {
        let mut identifier = String::new();

        if let Some(ch) = self.ch {
            if is_letter(ch) {
                identifier.push(ch);
            }
        }

        while let Some(next_ch) = self.peek_char() {
            if is_letter(next_ch) || next_ch.is_ascii_digit() {
                identifier.push(next_ch);
                self.read_char();
            } else {
                break;
            }
        }

        // Advance past the identifier
        self.read_char();

        identifier
    }

    /// Read a number (integer or float)
    fn read_number(&mut self) -> String {
        let mut number = String::new();
        let mut has_dot = false;

        if let Some(ch) = self.ch {
            if ch.is_ascii_digit() {
                number.push(ch);
            }
        }

        while let Some(next_ch) = self.peek_char() {
            if next_ch.is_ascii_digit() {
                number.push(next_ch);
                self.read_char();
            } else if next_ch == '.' && !has_dot {
                has_dot = true;
                number.push(next_ch);
                self.read_char();
            } else {
                break;
            }
        }

        // Advance past the number
        self.read_char();

        number
    }

    /// Read a single-quoted string literal. A doubled quote ('') inside
    /// the literal is an escaped single quote. Returns None when the
    /// literal is unterminated.
    fn read_string(&mut self) -> Option<String> {
        let mut string = String::new();

        // Skip opening quote which is in self.ch
        self.read_char();

        loop {
            match self.ch {
                Some('\'') => {
                    if self.peek_char() == Some('\'') {
                        // Escaped quote: consume both, keep one
                        self.read_char();
                        string.push('\'');
                        self.read_char();
                    } else {
                        // Closing quote
                        self.read_char();
                        return Some(string);
                    }
                }
                Some(ch) => {
                    string.push(ch);
                    self.read_char();
                }
                None => return None,
            }
        }
    }

    /// Get the token type for an identifier (could be a keyword).
    /// Keywords are case-insensitive; identifiers preserve their case.
    fn lookup_identifier(&self, ident: &str) -> TokenType {
        match KEYWORDS.get(ident.to_uppercase().as_str()) {
            Some(keyword) => keyword.clone(),
            None => TokenType::Identifier(ident.to_string()),
        }
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let mut token = Token {
            token_type: TokenType::Eof,
            literal: String::new(),
            line: self.line,
            column: self.column,
        };

        match self.ch {
            Some(ch) => {
                token.literal = ch.to_string();

                match ch {
                    ',' => token.token_type = TokenType::Comma,
                    '(' => token.token_type = TokenType::LeftParen,
                    ')' => token.token_type = TokenType::RightParen,
                    '.' => token.token_type = TokenType::Dot,
                    ';' => token.token_type = TokenType::Semicolon,
                    '*' => token.token_type = TokenType::Star,
                    '=' => token.token_type = TokenType::Equals,
                    '<' => {
                        if let Some(next_ch) = self.peek_char() {
                            if next_ch == '=' {
                                self.read_char();
                                token.literal.push('=');
                                token.token_type = TokenType::LessEqual;
                            } else if next_ch == '>' {
                                self.read_char();
                                token.literal.push('>');
                                token.token_type = TokenType::NotEqual;
                            } else {
                                token.token_type = TokenType::LessThan;
                            }
                        } else {
                            token.token_type = TokenType::LessThan;
                        }
                    }
                    '>' => {
                        if let Some(next_ch) = self.peek_char() {
                            if next_ch == '=' {
                                self.read_char();
                                token.literal.push('=');
                                token.token_type = TokenType::GreaterEqual;
                            } else {
                                token.token_type = TokenType::GreaterThan;
                            }
                        } else {
                            token.token_type = TokenType::GreaterThan;
                        }
                    }
                    '\'' => {
                        match self.read_string() {
                            Some(str_value) => {
                                token.literal = format!("'{}'", str_value);
                                token.token_type = TokenType::String(str_value);
                            }
                            None => {
                                token.token_type =
                                    TokenType::Unknown("unterminated string literal".to_string());
                            }
                        }
                        return token; // read_string already advanced
                    }
                    _ => {
                        if is_letter(ch) {
                            let identifier = self.read_identifier();
                            token.literal = identifier.clone();
                            token.token_type = self.lookup_identifier(&identifier);
                            return token; // read_identifier already advanced
                        } else if ch.is_ascii_digit() {
                            let number = self.read_number();
                            token.literal = number.clone();

                            if number.contains('.') {
                                if let Ok(value) = number.parse::<f64>() {
                                    token.token_type = TokenType::Float(value);
                                } else {
                                    token.token_type = TokenType::Unknown(number);
                                }
                            } else if let Ok(value) = number.parse::<i64>() {
                                token.token_type = TokenType::Integer(value);
                            } else {
                                token.token_type = TokenType::Unknown(number);
                            }
                            return token; // read_number already advanced
                        } else {
                            token.token_type = TokenType::Unknown(ch.to_string());
                        }
                    }
                }
            }
            None => {
                token.token_type = TokenType::Eof;
                token.literal = String::new();
                return token;
            }
        }

        self.read_char();
        token
    }
}

/// Check if a character is a letter (for identifiers)
fn is_letter(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}
