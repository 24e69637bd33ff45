// XML Subset Scanner
//
// Hand-written recursive-descent parser for the XML subset query-XML
// documents use: a prolog, comments, elements with quoted attributes,
// text content, and the five predefined entities. Produces an owned
// element tree; no external XML dependency.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum XmlScanError {
    #[error("malformed XML at line {line}, column {column}: {message}")]
    Malformed {
        message: String,
        line: usize,
        column: usize,
    },
    #[error("unexpected end of XML input: {message}")]
    UnexpectedEnd { message: String },
}

pub type XmlScanResult<T> = Result<T, XmlScanError>;

/// One element of the parsed tree
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    /// Look up an attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Child elements with the given name, in document order
    pub fn children_named<'e>(&'e self, name: &str) -> impl Iterator<Item = &'e XmlElement> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// First child element with the given name
    pub fn first_child(&self, name: &str) -> Option<&XmlElement> {
        self.children_named(name).next()
    }
}

impl fmt::Display for XmlElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.name)
    }
}

/// Parse a document into its root element
pub fn parse_document(input: &str) -> XmlScanResult<XmlElement> {
    let mut scanner = Scanner::new(input);

    scanner.skip_misc()?;
    let root = scanner.parse_element()?;
    scanner.skip_misc()?;

    if scanner.ch.is_some() {
        return Err(scanner.malformed("content after the root element"));
    }

    Ok(root)
}

/// Character-level scanner with 1-based position tracking
struct Scanner<'a> {
    input: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
    ch: Option<char>,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        let mut scanner = Scanner {
            input: input.chars().peekable(),
            line: 1,
            column: 0,
            ch: None,
        };
        scanner.read_char();
        scanner
    }

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

    fn peek_char(&mut self) -> Option<char> {
        self.input.peek().copied()
    }

    fn malformed(&self, message: &str) -> XmlScanError {
        XmlScanError::Malformed {
            message: message.to_string(),
            line: self.line,
            column: self.column,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.ch {
            if ch.is_whitespace() {
                self.read_char();
            } else {
                break;
            }
        }
    }

    /// Skip whitespace, the XML declaration, and comments before or
    /// after the root element
    fn skip_misc(&mut self) -> XmlScanResult<()> {
        loop {
            self.skip_whitespace();

            if self.ch == Some('<') {
                match self.peek_char() {
                    Some('?') => self.skip_declaration()?,
                    Some('!') => self.skip_comment()?,
                    _ => return Ok(()),
                }
            } else {
                return Ok(());
            }
        }
    }

    /// Skip `<?xml ... ?>`
    fn skip_declaration(&mut self) -> XmlScanResult<()> {
        // Consume '<?'
        self.read_char();
        self.read_char();

        loop {
            match self.ch {
                Some('?') => {
                    if self.peek_char() == Some('>') {
                        self.read_char();
                        self.read_char();
                        return Ok(());
                    }
                    self.read_char();
                }
                Some(_) => {
                    self.read_char();
                }
                None => {
                    return Err(XmlScanError::UnexpectedEnd {
                        message: "unterminated XML declaration".to_string(),
                    });
                }
            }
        }
    }

    /// Skip `<!-- ... -->`
    fn skip_comment(&mut self) -> XmlScanResult<()> {
        // Consume '<!'
        self.read_char();
        self.read_char();

        if self.ch != Some('-') || self.peek_char() != Some('-') {
            return Err(self.malformed("expected comment after '<!'"));
        }
        self.read_char();
        self.read_char();

        let mut dashes = 0usize;
        loop {
            match self.ch {
                Some('-') => {
                    dashes += 1;
                    self.read_char();
                }
                Some('>') if dashes >= 2 => {
                    self.read_char();
                    return Ok(());
                }
                Some(_) => {
                    dashes = 0;
                    self.read_char();
                }
                None => {
                    return Err(XmlScanError::UnexpectedEnd {
                        message: "unterminated comment".to_string(),
                    });
                }
            }
        }
    }

    /// Parse one element, recursively parsing its children
    fn parse_element(&mut self) -> XmlScanResult<XmlElement> {
        if self.ch != Some('<') {
            return Err(self.malformed("expected '<'"));
        }
        self.read_char();

        let name = self.read_name()?;
        let mut element = XmlElement {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
            text: String::new(),
        };

        // Attributes until '>' or '/>'
        loop {
            self.skip_whitespace();

            match self.ch {
                Some('/') => {
                    self.read_char();
                    if self.ch != Some('>') {
                        return Err(self.malformed("expected '>' after '/'"));
                    }
                    self.read_char();
                    return Ok(element);
                }
                Some('>') => {
                    self.read_char();
                    break;
                }
                Some(ch) if is_name_start(ch) => {
                    let attribute = self.read_attribute()?;
                    element.attributes.push(attribute);
                }
                Some(_) => return Err(self.malformed("expected attribute, '>' or '/>'")),
                None => {
                    return Err(XmlScanError::UnexpectedEnd {
                        message: format!("unterminated start tag <{}", element.name),
                    });
                }
            }
        }

        // Content until the matching close tag
        loop {
            match self.ch {
                Some('<') => match self.peek_char() {
                    Some('/') => {
                        self.read_char();
                        self.read_char();
                        let close_name = self.read_name()?;
                        if close_name != element.name {
                            return Err(self.malformed(&format!(
                                "mismatched close tag </{}> for <{}>",
                                close_name, element.name
                            )));
                        }
                        self.skip_whitespace();
                        if self.ch != Some('>') {
                            return Err(self.malformed("expected '>' in close tag"));
                        }
                        self.read_char();
                        return Ok(element);
                    }
                    Some('!') => self.skip_comment()?,
                    _ => {
                        let child = self.parse_element()?;
                        element.children.push(child);
                    }
                },
                Some(_) => {
                    let text = self.read_text()?;
                    element.text.push_str(&text);
                }
                None => {
                    return Err(XmlScanError::UnexpectedEnd {
                        message: format!("missing close tag for <{}>", element.name),
                    });
                }
            }
        }
    }

    /// Read an element or attribute name
    fn read_name(&mut self) -> XmlScanResult<String> {
        let mut name = String::new();

        match self.ch {
            Some(ch) if is_name_start(ch) => {
                name.push(ch);
                self.read_char();
            }
            Some(_) => return Err(self.malformed("expected a name")),
            None => {
                return Err(XmlScanError::UnexpectedEnd {
                    message: "expected a name".to_string(),
                });
            }
        }

        while let Some(ch) = self.ch {
            if is_name_char(ch) {
                name.push(ch);
                self.read_char();
            } else {
                break;
            }
        }

        Ok(name)
    }

    /// Read `name="value"` with entity decoding in the value
    fn read_attribute(&mut self) -> XmlScanResult<(String, String)> {
        let name = self.read_name()?;

        self.skip_whitespace();
        if self.ch != Some('=') {
            return Err(self.malformed(&format!("expected '=' after attribute '{}'", name)));
        }
        self.read_char();
        self.skip_whitespace();

        let quote = match self.ch {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.malformed("expected quoted attribute value")),
        };
        self.read_char();

        let mut value = String::new();
        loop {
            match self.ch {
                Some(ch) if ch == quote => {
                    self.read_char();
                    break;
                }
                Some('&') => {
                    let decoded = self.read_entity()?;
                    value.push(decoded);
                }
                Some('<') => return Err(self.malformed("'<' is not allowed in attribute values")),
                Some(ch) => {
                    value.push(ch);
                    self.read_char();
                }
                None => {
                    return Err(XmlScanError::UnexpectedEnd {
                        message: format!("unterminated value for attribute '{}'", name),
                    });
                }
            }
        }

        Ok((name, value))
    }

    /// Read element text content up to the next markup
    fn read_text(&mut self) -> XmlScanResult<String> {
        let mut text = String::new();

        while let Some(ch) = self.ch {
            match ch {
                '<' => break,
                '&' => {
                    let decoded = self.read_entity()?;
                    text.push(decoded);
                }
                _ => {
                    text.push(ch);
                    self.read_char();
                }
            }
        }

        Ok(text)
    }

    /// Decode one of the predefined entities starting at '&'
    fn read_entity(&mut self) -> XmlScanResult<char> {
        // Consume '&'
        self.read_char();

        let mut entity = String::new();
        loop {
            match self.ch {
                Some(';') => {
                    self.read_char();
                    break;
                }
                Some(ch) if ch.is_ascii_alphanumeric() || ch == '#' => {
                    entity.push(ch);
                    self.read_char();
                }
                Some(_) => return Err(self.malformed("malformed entity reference")),
                None => {
                    return Err(XmlScanError::UnexpectedEnd {
                        message: "unterminated entity reference".to_string(),
                    });
                }
            }
        }

        match entity.as_str() {
            "amp" => Ok('&'),
            "lt" => Ok('<'),
            "gt" => Ok('>'),
            "quot" => Ok('"'),
            "apos" => Ok('\''),
            other => Err(self.malformed(&format!("unknown entity '&{};'", other))),
        }
    }
}

fn is_name_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.' | ':')
}
