//! Markup Tokenizer - State machine for XML/HTML token extraction
//!
//! Implements a pull-parser style tokenizer that extracts tokens:
//! - Element start/end tags (attributes left raw for the reader)
//! - Text content (entities decoded)
//! - CDATA sections
//! - Comments
//! - Processing instructions and the XML declaration
//! - DOCTYPE declarations
//!
//! HTML mode lower-cases tag names, decodes HTML entities and treats the
//! content of `script`/`style` (and `textarea`/`title`) as raw text.
//! Strict mode stops at the first well-formedness violation.

use super::entities::{decode_text, decode_text_strict, EntitySet};
use super::scanner::{is_name_start_char, Scanner};
use std::borrow::Cow;

/// Current parsing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Initial state before parsing starts
    Init,
    /// Between markup constructs
    Content,
    /// End of input reached
    Done,
}

/// Type of token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Element start tag: <element>
    StartTag,
    /// Element end tag: </element>
    EndTag,
    /// Empty element: <element/>
    EmptyTag,
    /// Text content
    Text,
    /// CDATA section: <![CDATA[...]]>
    CData,
    /// Comment: <!--...-->
    Comment,
    /// Processing instruction: <?target ...?>
    ProcessingInstruction,
    /// XML declaration: <?xml ...?>
    XmlDeclaration,
    /// DOCTYPE declaration
    DocType,
    /// End of file
    Eof,
}

/// A single token
#[derive(Debug, Clone)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Raw span in input (start, end)
    pub span: (usize, usize),
    /// 1-based line of the token start
    pub line: u32,
    /// Tag name or PI target
    pub name: Option<Cow<'a, [u8]>>,
    /// Text/CDATA/comment/PI content, or the raw attribute region of a tag
    pub content: Option<Cow<'a, [u8]>>,
}

impl<'a> Token<'a> {
    fn new(kind: TokenKind, span: (usize, usize), line: u32) -> Self {
        Token {
            kind,
            span,
            line,
            name: None,
            content: None,
        }
    }

    fn with_name(mut self, name: Cow<'a, [u8]>) -> Self {
        self.name = Some(name);
        self
    }

    fn with_content(mut self, content: Cow<'a, [u8]>) -> Self {
        self.content = Some(content);
        self
    }
}

/// Well-formedness failure reported in strict mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub line: u32,
}

/// Elements whose content is not parsed as markup in HTML mode.
/// The flag says whether entities are still decoded (RCDATA).
const HTML_RAW_TEXT: &[(&[u8], bool)] = &[
    (b"script", false),
    (b"style", false),
    (b"textarea", true),
    (b"title", true),
];

/// Pull tokenizer over UTF-8 input
pub struct Tokenizer<'a> {
    scanner: Scanner<'a>,
    state: ParseState,
    strict: bool,
    html: bool,
    error: Option<SyntaxError>,
    /// Raw-text element awaiting its close tag (HTML)
    raw_text: Option<(&'static [u8], bool)>,
}

impl<'a> Tokenizer<'a> {
    /// Create a new tokenizer for the given input (lenient XML)
    pub fn new(input: &'a [u8]) -> Self {
        Tokenizer {
            scanner: Scanner::new(input),
            state: ParseState::Init,
            strict: false,
            html: false,
            error: None,
            raw_text: None,
        }
    }

    /// Create a new tokenizer in strict XML mode
    pub fn new_strict(input: &'a [u8]) -> Self {
        Tokenizer {
            strict: true,
            ..Tokenizer::new(input)
        }
    }

    /// Create a new tokenizer in HTML mode (always lenient)
    pub fn new_html(input: &'a [u8]) -> Self {
        Tokenizer {
            html: true,
            ..Tokenizer::new(input)
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn is_html(&self) -> bool {
        self.html
    }

    /// Get any parse error (strict mode only)
    pub fn error(&self) -> Option<&SyntaxError> {
        self.error.as_ref()
    }

    /// Take the parse error, leaving `None`
    pub fn take_error(&mut self) -> Option<SyntaxError> {
        self.error.take()
    }

    /// Get the current parse state
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Get the current position in the input
    pub fn position(&self) -> usize {
        self.scanner.position()
    }

    /// 1-based line of an input position
    pub fn line_at(&mut self, pos: usize) -> u32 {
        self.scanner.line_at(pos)
    }

    /// Record an error (first one wins) and stop tokenizing.
    fn fail(&mut self, message: impl Into<String>, pos: usize) -> Option<Token<'a>> {
        if self.error.is_none() {
            let line = self.scanner.line_at(pos);
            self.error = Some(SyntaxError {
                message: message.into(),
                line,
            });
        }
        self.state = ParseState::Done;
        None
    }

    fn entity_set(&self) -> EntitySet {
        if self.html {
            EntitySet::Html
        } else {
            EntitySet::Xml
        }
    }

    /// Get the next token, or None after Eof (or a strict-mode error)
    pub fn next_token(&mut self) -> Option<Token<'a>> {
        loop {
            match self.state {
                ParseState::Done => return None,
                ParseState::Init => {
                    if !self.strict {
                        self.scanner.skip_whitespace();
                    }
                    self.state = ParseState::Content;
                }
                ParseState::Content => {}
            }

            if let Some((name, decode)) = self.raw_text.take() {
                if let Some(token) = self.parse_raw_text(name, decode) {
                    return Some(token);
                }
            }

            if self.scanner.is_eof() {
                self.state = ParseState::Done;
                let pos = self.scanner.position();
                let line = self.scanner.line_at(pos);
                return Some(Token::new(TokenKind::Eof, (pos, pos), line));
            }

            let token = if self.at_markup() {
                self.parse_markup()
            } else {
                self.parse_text()
            };

            // Lenient mode skips bogus markup and keeps going
            match token {
                Some(token) => return Some(token),
                None if self.state == ParseState::Done => return None,
                None => continue,
            }
        }
    }

    /// Whether the '<' at the current position opens markup
    fn at_markup(&self) -> bool {
        if self.scanner.peek() != Some(b'<') {
            return false;
        }
        if self.strict {
            return true;
        }
        match self.scanner.peek_at(1) {
            Some(b'/' | b'!' | b'?') => true,
            Some(b) => is_name_start_char(b) && b != b':',
            None => false,
        }
    }

    /// Parse markup starting with '<'
    fn parse_markup(&mut self) -> Option<Token<'a>> {
        let start = self.scanner.position();
        self.scanner.advance(1); // Skip '<'

        match self.scanner.peek() {
            Some(b'/') => self.parse_end_tag(start),
            Some(b'!') => self.parse_bang_markup(start),
            Some(b'?') => self.parse_pi(start),
            _ => self.parse_start_tag(start),
        }
    }

    /// Parse a start tag or empty element tag
    fn parse_start_tag(&mut self, start: usize) -> Option<Token<'a>> {
        let Some(raw_name) = self.scanner.read_name() else {
            return self.fail("Invalid element name: must start with letter, underscore, or colon", start);
        };
        let name_end = self.scanner.position();

        let (end, next) = match self.scanner.find_tag_end_quoted() {
            Some(end) => (end, end + 1),
            None if self.strict => return self.fail("Unterminated start tag", start),
            None => {
                let eof = self.scanner.remaining().len() + name_end;
                (eof, eof)
            }
        };

        let is_empty = end > name_end && self.scanner.slice(end - 1, end) == b"/";
        let attrs_end = if is_empty { end - 1 } else { end };
        let attrs = self.scanner.slice(name_end, attrs_end);

        let name = self.normalize_name(raw_name);
        let line = self.scanner.line_at(start);
        self.scanner.set_position(next);

        if self.html && !is_empty {
            self.raw_text = HTML_RAW_TEXT
                .iter()
                .find(|(tag, _)| *tag == name.as_ref())
                .copied();
        }

        let kind = if is_empty { TokenKind::EmptyTag } else { TokenKind::StartTag };
        Some(
            Token::new(kind, (start, next), line)
                .with_name(name)
                .with_content(Cow::Borrowed(attrs)),
        )
    }

    /// Parse an end tag
    fn parse_end_tag(&mut self, start: usize) -> Option<Token<'a>> {
        self.scanner.advance(1); // Skip '/'

        let raw_name = self.scanner.read_name();
        let name_end = self.scanner.position();
        let end = self.scanner.find_byte(b'>');

        let Some(raw_name) = raw_name else {
            if self.strict {
                return self.fail("Invalid element name in end tag", start);
            }
            // Bogus end tag such as `</ >`, dropped
            self.scanner.set_position(end.map_or(usize::MAX, |e| e + 1));
            return None;
        };

        if self.strict {
            self.scanner.skip_whitespace();
            if self.scanner.peek() != Some(b'>') {
                return match end {
                    Some(_) => self.fail("End tag cannot have attributes or other content", start),
                    None => self.fail("Unterminated end tag", start),
                };
            }
            self.scanner.set_position(name_end);
        }

        let next = end.map_or(usize::MAX, |e| e + 1);
        let name = self.normalize_name(raw_name);
        let line = self.scanner.line_at(start);
        self.scanner.set_position(next);
        let next = self.scanner.position();

        Some(Token::new(TokenKind::EndTag, (start, next), line).with_name(name))
    }

    /// Parse markup starting with '!' (comment, CDATA, DOCTYPE)
    fn parse_bang_markup(&mut self, start: usize) -> Option<Token<'a>> {
        self.scanner.advance(1); // Skip '!'

        if self.scanner.starts_with(b"--") {
            self.parse_comment(start)
        } else if self.scanner.starts_with(b"[CDATA[") {
            self.parse_cdata(start)
        } else if self.scanner.starts_with_ci(b"DOCTYPE") {
            self.parse_doctype(start)
        } else if self.strict {
            self.fail("Invalid declaration - expected comment, CDATA, or DOCTYPE", start)
        } else {
            // Bogus comment, as browsers treat `<!foo>`
            let content_start = self.scanner.position();
            let end = self.scanner.find_byte(b'>');
            let content_end = end.unwrap_or(content_start + self.scanner.remaining().len());
            let content = self.scanner.slice(content_start, content_end);
            let line = self.scanner.line_at(start);
            self.scanner.set_position(end.map_or(usize::MAX, |e| e + 1));
            Some(
                Token::new(TokenKind::Comment, (start, self.scanner.position()), line)
                    .with_content(Cow::Borrowed(content)),
            )
        }
    }

    /// Find `terminator`, or in lenient mode treat EOF as the end.
    /// Returns (content end, position after the terminator).
    fn find_terminator(&mut self, terminator: &[u8], what: &str, start: usize) -> Option<(usize, usize)> {
        match self.scanner.find_seq(terminator) {
            Some(pos) => Some((pos, pos + terminator.len())),
            None if self.strict => {
                self.fail(format!("Unterminated {}", what), start);
                None
            }
            None => {
                let eof = self.scanner.position() + self.scanner.remaining().len();
                Some((eof, eof))
            }
        }
    }

    /// Parse a comment <!--...-->
    fn parse_comment(&mut self, start: usize) -> Option<Token<'a>> {
        self.scanner.advance(2); // Skip '--'
        let content_start = self.scanner.position();
        let (content_end, next) = self.find_terminator(b"-->", "comment", start)?;
        let content = self.scanner.slice(content_start, content_end);

        if self.strict && memchr::memmem::find(content, b"--").is_some() {
            return self.fail("'--' is not allowed inside a comment", start);
        }

        let line = self.scanner.line_at(start);
        self.scanner.set_position(next);
        Some(Token::new(TokenKind::Comment, (start, next), line).with_content(Cow::Borrowed(content)))
    }

    /// Parse a CDATA section <![CDATA[...]]>
    fn parse_cdata(&mut self, start: usize) -> Option<Token<'a>> {
        self.scanner.advance(7); // Skip '[CDATA['
        let content_start = self.scanner.position();
        let (content_end, next) = self.find_terminator(b"]]>", "CDATA section", start)?;
        let content = self.scanner.slice(content_start, content_end);

        let line = self.scanner.line_at(start);
        self.scanner.set_position(next);
        Some(Token::new(TokenKind::CData, (start, next), line).with_content(Cow::Borrowed(content)))
    }

    /// Parse <!DOCTYPE ...>, skipping over an internal subset in brackets
    fn parse_doctype(&mut self, start: usize) -> Option<Token<'a>> {
        self.scanner.advance(7); // Skip 'DOCTYPE'
        let content_start = self.scanner.position();
        let rest = self.scanner.remaining();

        let mut depth = 0usize;
        let mut quote: Option<u8> = None;
        let mut close = None;
        for (i, &b) in rest.iter().enumerate() {
            match (quote, b) {
                (Some(q), _) if b == q => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(b),
                (None, b'[') => depth += 1,
                (None, b']') => depth = depth.saturating_sub(1),
                (None, b'>') if depth == 0 => {
                    close = Some(content_start + i);
                    break;
                }
                _ => {}
            }
        }

        let (content_end, next) = match close {
            Some(end) => (end, end + 1),
            None if self.strict => return self.fail("Unterminated DOCTYPE declaration", start),
            None => (content_start + rest.len(), content_start + rest.len()),
        };
        let content = trim_ascii(self.scanner.slice(content_start, content_end));

        let line = self.scanner.line_at(start);
        self.scanner.set_position(next);
        Some(Token::new(TokenKind::DocType, (start, next), line).with_content(Cow::Borrowed(content)))
    }

    /// Parse a processing instruction or the XML declaration
    fn parse_pi(&mut self, start: usize) -> Option<Token<'a>> {
        self.scanner.advance(1); // Skip '?'

        let Some(target) = self.scanner.read_name() else {
            if self.strict {
                return self.fail("Processing instruction must start with a target name", start);
            }
            // Bogus PI, read as a comment up to '>'
            let content_start = self.scanner.position();
            let end = self.scanner.find_byte(b'>');
            let content_end = end.unwrap_or(content_start + self.scanner.remaining().len());
            let content = self.scanner.slice(content_start, content_end);
            let line = self.scanner.line_at(start);
            self.scanner.set_position(end.map_or(usize::MAX, |e| e + 1));
            return Some(
                Token::new(TokenKind::Comment, (start, self.scanner.position()), line)
                    .with_content(Cow::Borrowed(content)),
            );
        };

        let data_start = self.scanner.position();
        let (data_end, next) = self.find_terminator(b"?>", "processing instruction", start)?;
        let data = trim_ascii(self.scanner.slice(data_start, data_end));

        let is_decl = target == b"xml";
        if self.strict {
            if is_decl && start != 0 {
                return self.fail("XML declaration allowed only at the start of the document", start);
            }
            if !is_decl && target.eq_ignore_ascii_case(b"xml") {
                return self.fail("Processing instruction target 'xml' is reserved", start);
            }
        }

        let line = self.scanner.line_at(start);
        self.scanner.set_position(next);
        let kind = if is_decl { TokenKind::XmlDeclaration } else { TokenKind::ProcessingInstruction };
        Some(
            Token::new(kind, (start, next), line)
                .with_name(Cow::Borrowed(target))
                .with_content(Cow::Borrowed(data)),
        )
    }

    /// Parse character data up to the next markup
    fn parse_text(&mut self) -> Option<Token<'a>> {
        let start = self.scanner.position();

        // A literal '<' that does not open markup stays in the text (lenient)
        let mut end = start;
        loop {
            self.scanner.set_position(end + 1);
            match self.scanner.find_tag_start() {
                Some(pos) => {
                    self.scanner.set_position(pos);
                    if self.at_markup() {
                        end = pos;
                        break;
                    }
                    end = pos;
                }
                None => {
                    end = self.scanner.position() + self.scanner.remaining().len();
                    break;
                }
            }
        }
        self.scanner.set_position(end);

        let raw = self.scanner.slice(start, end);
        let content = if self.strict {
            if memchr::memmem::find(raw, b"]]>").is_some() {
                return self.fail("']]>' is not allowed in text content", start);
            }
            match decode_text_strict(raw) {
                Ok(content) => content,
                Err(message) => return self.fail(message, start),
            }
        } else {
            decode_text(raw, self.entity_set())
        };

        let line = self.scanner.line_at(start);
        Some(Token::new(TokenKind::Text, (start, end), line).with_content(content))
    }

    /// Content of a raw-text element up to its close tag (HTML)
    fn parse_raw_text(&mut self, name: &[u8], decode: bool) -> Option<Token<'a>> {
        let start = self.scanner.position();
        let end = self
            .scanner
            .find_close_tag_ci(name)
            .unwrap_or(start + self.scanner.remaining().len());
        if end == start {
            return None;
        }

        let raw = self.scanner.slice(start, end);
        let content = if decode { decode_text(raw, EntitySet::Html) } else { Cow::Borrowed(raw) };
        let line = self.scanner.line_at(start);
        self.scanner.set_position(end);
        Some(Token::new(TokenKind::Text, (start, end), line).with_content(content))
    }

    /// Lower-case tag names in HTML mode
    fn normalize_name(&self, name: &'a [u8]) -> Cow<'a, [u8]> {
        if self.html && name.iter().any(u8::is_ascii_uppercase) {
            Cow::Owned(name.to_ascii_lowercase())
        } else {
            Cow::Borrowed(name)
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().take_while(|b| b.is_ascii_whitespace()).count();
    let end = bytes.len() - bytes[start..].iter().rev().take_while(|b| b.is_ascii_whitespace()).count();
    &bytes[start..end]
}
