//! XPath Lexer
//!
//! Tokenizes XPath expressions. `*` and the operator names (`and`, `or`,
//! `div`, `mod`) are context sensitive: after a token that can end an
//! operand they are operators, anywhere else they are name tests. That is
//! what lets `//div` select `<div>` elements while `6 div 2` divides.

/// XPath token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Operators
    Slash,       // /
    DoubleSlash, // //
    Pipe,        // |
    Plus,        // +
    Minus,       // -
    Multiply,    // * between operands
    Eq,          // =
    NotEq,       // !=
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=
    And,         // and
    Or,          // or
    Mod,         // mod
    Div,         // div

    // Abbreviations
    Dot,       // .
    DoubleDot, // ..
    At,        // @
    Star,      // * as a name test

    // Brackets
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]

    // Literals
    Number(f64),
    Literal(String),

    // Names
    Name(String),         // NCName or prefix:local
    NameTest(String),     // prefix:*
    FunctionName(String), // name followed by (
    NodeType(String),     // node, text, comment, processing-instruction followed by (
    Axis(String),         // name followed by ::
    Variable(String),     // $name

    // Special
    DoubleColon, // ::
    Comma,       // ,
}

impl Token {
    /// Whether a `*` or NCName after this token is an operator
    fn ends_operand(&self) -> bool {
        !matches!(
            self,
            Token::At
                | Token::DoubleColon
                | Token::LeftParen
                | Token::LeftBracket
                | Token::Comma
                | Token::Slash
                | Token::DoubleSlash
                | Token::Pipe
                | Token::Plus
                | Token::Minus
                | Token::Multiply
                | Token::Eq
                | Token::NotEq
                | Token::Lt
                | Token::LtEq
                | Token::Gt
                | Token::GtEq
                | Token::And
                | Token::Or
                | Token::Mod
                | Token::Div
        )
    }
}

/// XPath lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    /// Whether the previous token can end an operand
    after_operand: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            after_operand: false,
        }
    }

    /// Get the remaining input
    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Peek at current character
    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// Peek at character at offset
    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    /// Advance by n bytes
    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Skip whitespace
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if matches!(c, ' ' | '\t' | '\n' | '\r') {
                self.advance(1);
            } else {
                break;
            }
        }
    }

    /// Next non-whitespace character, without consuming anything
    fn peek_past_whitespace(&self) -> (Option<char>, usize) {
        let rest = self.remaining();
        let trimmed = rest.trim_start_matches([' ', '\t', '\n', '\r']);
        (trimmed.chars().next(), rest.len() - trimmed.len())
    }

    /// Get the next token, `Ok(None)` at end of input
    pub fn next_token(&mut self) -> Result<Option<Token>, String> {
        self.skip_whitespace();

        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let token = match c {
            '/' => {
                self.advance(1);
                if self.peek() == Some('/') {
                    self.advance(1);
                    Token::DoubleSlash
                } else {
                    Token::Slash
                }
            }
            '.' => {
                if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                    self.read_number()
                } else if self.peek_at(1) == Some('.') {
                    self.advance(2);
                    Token::DoubleDot
                } else {
                    self.advance(1);
                    Token::Dot
                }
            }
            '@' => {
                self.advance(1);
                Token::At
            }
            '|' => {
                self.advance(1);
                Token::Pipe
            }
            '+' => {
                self.advance(1);
                Token::Plus
            }
            '-' => {
                self.advance(1);
                Token::Minus
            }
            '*' => {
                self.advance(1);
                if self.after_operand {
                    Token::Multiply
                } else {
                    Token::Star
                }
            }
            '=' => {
                self.advance(1);
                Token::Eq
            }
            '!' => {
                if self.peek_at(1) != Some('=') {
                    return Err(format!("Unexpected character '!' at offset {}", self.pos));
                }
                self.advance(2);
                Token::NotEq
            }
            '<' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Token::LtEq
                } else {
                    Token::Lt
                }
            }
            '>' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Token::GtEq
                } else {
                    Token::Gt
                }
            }
            '(' => {
                self.advance(1);
                Token::LeftParen
            }
            ')' => {
                self.advance(1);
                Token::RightParen
            }
            '[' => {
                self.advance(1);
                Token::LeftBracket
            }
            ']' => {
                self.advance(1);
                Token::RightBracket
            }
            ',' => {
                self.advance(1);
                Token::Comma
            }
            ':' if self.peek_at(1) == Some(':') => {
                self.advance(2);
                Token::DoubleColon
            }
            '$' => {
                self.advance(1);
                let name = self.read_ncname();
                if name.is_empty() {
                    return Err("Expected variable name after '$'".to_string());
                }
                let name = self.read_qname_tail(name).0;
                Token::Variable(name)
            }
            '"' | '\'' => self.read_literal(c)?,
            '0'..='9' => self.read_number(),
            _ if is_name_start_char(c) => self.read_name_or_keyword(),
            _ => return Err(format!("Unexpected character '{}' at offset {}", c, self.pos)),
        };

        self.after_operand = token.ends_operand();
        Ok(Some(token))
    }

    /// Read a number literal: Digits ('.' Digits?)? | '.' Digits
    fn read_number(&mut self) -> Token {
        let start = self.pos;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance(1);
        }
        if self.peek() == Some('.') && self.peek_at(1) != Some('.') {
            self.advance(1);
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance(1);
            }
        }

        let value = self.input[start..self.pos].parse().unwrap_or(f64::NAN);
        Token::Number(value)
    }

    /// Read a string literal; there are no escapes in XPath 1.0
    fn read_literal(&mut self, quote: char) -> Result<Token, String> {
        let start = self.pos;
        self.advance(1);
        match self.remaining().find(quote) {
            Some(len) => {
                let value = self.remaining()[..len].to_string();
                self.advance(len + 1);
                Ok(Token::Literal(value))
            }
            None => Err(format!("Unterminated string literal at offset {}", start)),
        }
    }

    fn read_ncname(&mut self) -> String {
        let start = self.pos;
        if self.peek().is_some_and(is_name_start_char) {
            while let Some(c) = self.peek() {
                if is_name_char(c) {
                    self.advance(c.len_utf8());
                } else {
                    break;
                }
            }
        }
        self.input[start..self.pos].to_string()
    }

    /// Extend `name` with `:local` or `:*` when written without spaces.
    /// Returns the name and whether it ended in `:*`.
    fn read_qname_tail(&mut self, name: String) -> (String, bool) {
        if self.peek() != Some(':') {
            return (name, false);
        }
        match self.peek_at(1) {
            Some('*') => {
                self.advance(2);
                (format!("{}:*", name), true)
            }
            Some(c) if is_name_start_char(c) => {
                self.advance(1);
                let local = self.read_ncname();
                (format!("{}:{}", name, local), false)
            }
            _ => (name, false),
        }
    }

    /// Read a name, operator name, axis, node type or function name
    fn read_name_or_keyword(&mut self) -> Token {
        let name = self.read_ncname();

        if self.after_operand {
            match name.as_str() {
                "and" => return Token::And,
                "or" => return Token::Or,
                "mod" => return Token::Mod,
                "div" => return Token::Div,
                _ => {}
            }
        }

        let (next, _) = self.peek_past_whitespace();
        if next == Some(':') && self.remaining().trim_start().starts_with("::") {
            return Token::Axis(name);
        }

        let (name, wildcard) = self.read_qname_tail(name);
        if wildcard {
            return Token::NameTest(name);
        }

        if self.peek_past_whitespace().0 == Some('(') {
            return match name.as_str() {
                "node" | "text" | "comment" | "processing-instruction" => Token::NodeType(name),
                _ => Token::FunctionName(name),
            };
        }

        Token::Name(name)
    }

    /// Tokenize entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        Lexer::new(input).tokenize().unwrap()
    }

    fn name(s: &str) -> Token {
        Token::Name(s.to_string())
    }

    #[test]
    fn test_simple_path() {
        assert_eq!(
            lex("/root/child"),
            vec![Token::Slash, name("root"), Token::Slash, name("child")]
        );
    }

    #[test]
    fn test_predicate() {
        assert_eq!(
            lex("item[@id='test']"),
            vec![
                name("item"),
                Token::LeftBracket,
                Token::At,
                name("id"),
                Token::Eq,
                Token::Literal("test".to_string()),
                Token::RightBracket,
            ]
        );
    }

    #[test]
    fn test_operator_names_are_contextual() {
        assert_eq!(lex("//div"), vec![Token::DoubleSlash, name("div")]);
        assert_eq!(lex("6 div 2"), vec![Token::Number(6.0), Token::Div, Token::Number(2.0)]);
        assert_eq!(
            lex("and and and"),
            vec![name("and"), Token::And, name("and")]
        );
        assert_eq!(lex("mod/or"), vec![name("mod"), Token::Slash, name("or")]);
    }

    #[test]
    fn test_star_is_contextual() {
        assert_eq!(lex("*"), vec![Token::Star]);
        assert_eq!(lex("2 * 3"), vec![Token::Number(2.0), Token::Multiply, Token::Number(3.0)]);
        assert_eq!(
            lex("a/*[* * 2]"),
            vec![
                name("a"),
                Token::Slash,
                Token::Star,
                Token::LeftBracket,
                Token::Star,
                Token::Multiply,
                Token::Number(2.0),
                Token::RightBracket,
            ]
        );
    }

    #[test]
    fn test_axis_and_functions() {
        assert_eq!(
            lex("child :: x"),
            vec![Token::Axis("child".to_string()), Token::DoubleColon, name("x")]
        );
        assert_eq!(
            lex("count (text())"),
            vec![
                Token::FunctionName("count".to_string()),
                Token::LeftParen,
                Token::NodeType("text".to_string()),
                Token::LeftParen,
                Token::RightParen,
                Token::RightParen,
            ]
        );
    }

    #[test]
    fn test_qualified_names() {
        assert_eq!(lex("p:item"), vec![name("p:item")]);
        assert_eq!(lex("p:*"), vec![Token::NameTest("p:*".to_string())]);
        assert_eq!(lex("$v"), vec![Token::Variable("v".to_string())]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(lex(".5"), vec![Token::Number(0.5)]);
        assert_eq!(lex("5."), vec![Token::Number(5.0)]);
        assert_eq!(lex("../x"), vec![Token::DoubleDot, Token::Slash, name("x")]);
    }

    #[test]
    fn test_errors() {
        assert!(Lexer::new("'open").tokenize().is_err());
        assert!(Lexer::new("a ! b").tokenize().is_err());
        assert!(Lexer::new("#x").tokenize().is_err());
        assert!(Lexer::new("$").tokenize().is_err());
    }
}
