//! CSS Selector Parser
//!
//! Parses selector groups into an AST. Only the subset that maps onto
//! XPath 1.0 is accepted; anything else is an error rather than a silent
//! mismatch.

/// Comma-separated list of selectors
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorGroup(pub Vec<ComplexSelector>);

/// Compound selectors joined by combinators
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexSelector {
    pub first: Compound,
    pub rest: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
    /// `a + b`
    Adjacent,
    /// `a ~ b`
    Sibling,
}

/// Type selector plus the filters applied to it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Compound {
    pub element: TypeSelector,
    pub filters: Vec<Filter>,
}

/// `ns|name`, `*|name`, `|name`, `name` or `*`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeSelector {
    pub namespace: NamespaceSelector,
    /// `None` for `*`
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum NamespaceSelector {
    /// No `|` written
    #[default]
    Default,
    /// `*|`
    Any,
    /// `|name`
    None,
    /// `prefix|`
    Prefix(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Id(String),
    Class(String),
    Attribute {
        prefix: Option<String>,
        name: String,
        matcher: Option<(AttrOp, String)>,
    },
    Pseudo(Pseudo),
    Not(Box<Compound>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    /// `=`
    Equals,
    /// `~=`
    Includes,
    /// `^=`
    Prefix,
    /// `$=`
    Suffix,
    /// `*=`
    Substring,
    /// `|=`
    DashMatch,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pseudo {
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    NthChild(Nth),
    NthLastChild(Nth),
    NthOfType(Nth),
    NthLastOfType(Nth),
    Empty,
    Root,
    Contains(String),
}

/// `an+b`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nth {
    pub a: i64,
    pub b: i64,
}

impl Nth {
    /// Parse `odd`, `even`, `b`, `an`, `an+b` (whitespace around the sign allowed)
    pub fn parse(input: &str) -> Result<Nth, String> {
        let compact: String = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        let invalid = || format!("Invalid nth expression '{}'", input.trim());

        match compact.as_str() {
            "odd" => return Ok(Nth { a: 2, b: 1 }),
            "even" => return Ok(Nth { a: 2, b: 0 }),
            "" => return Err(invalid()),
            _ => {}
        }

        let Some((a_part, b_part)) = compact.split_once('n') else {
            let b = compact.trim_start_matches('+').parse().map_err(|_| invalid())?;
            return Ok(Nth { a: 0, b });
        };

        let a = match a_part {
            "" | "+" => 1,
            "-" => -1,
            _ => a_part.trim_start_matches('+').parse().map_err(|_| invalid())?,
        };
        let b = match b_part.as_bytes().first() {
            None => 0,
            Some(b'+') => b_part[1..].parse().map_err(|_| invalid())?,
            Some(b'-') => -b_part[1..].parse::<i64>().map_err(|_| invalid())?,
            Some(_) => return Err(invalid()),
        };
        Ok(Nth { a, b })
    }
}

/// Deepest `:not()` nesting accepted
pub const MAX_NESTING: usize = 32;

/// Character-level selector parser
pub struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser { input, pos: 0, depth: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Skip whitespace, reporting whether any was skipped
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance(1);
        }
        self.pos > start
    }

    fn expect(&mut self, c: char) -> Result<(), String> {
        if self.peek() == Some(c) {
            self.advance(c.len_utf8());
            Ok(())
        } else {
            Err(format!("Expected '{}', found {}", c, self.describe_current()))
        }
    }

    fn describe_current(&self) -> String {
        match self.peek() {
            Some(c) => format!("'{}' at offset {}", c, self.pos),
            None => "end of selector".to_string(),
        }
    }

    /// Parse a full selector group
    pub fn parse(&mut self) -> Result<SelectorGroup, String> {
        let mut selectors = Vec::new();
        loop {
            self.skip_whitespace();
            selectors.push(self.parse_complex()?);
            self.skip_whitespace();
            match self.peek() {
                None => return Ok(SelectorGroup(selectors)),
                Some(',') => self.advance(1),
                Some(_) => return Err(format!("Unexpected {}", self.describe_current())),
            }
        }
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector, String> {
        let first = self.parse_compound()?;
        let mut rest = Vec::new();

        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.peek() {
                Some('>') => Combinator::Child,
                Some('+') => Combinator::Adjacent,
                Some('~') => Combinator::Sibling,
                Some(',') | None => return Ok(ComplexSelector { first, rest }),
                Some(_) if had_space => {
                    rest.push((Combinator::Descendant, self.parse_compound()?));
                    continue;
                }
                Some(_) => return Err(format!("Unexpected {}", self.describe_current())),
            };
            self.advance(1);
            self.skip_whitespace();
            rest.push((combinator, self.parse_compound()?));
        }
    }

    fn parse_compound(&mut self) -> Result<Compound, String> {
        let start = self.pos;
        let element = self.parse_type_selector()?;
        let mut filters = Vec::new();

        loop {
            match self.peek() {
                Some('#') => {
                    self.advance(1);
                    filters.push(Filter::Id(self.read_ident("an id")?));
                }
                Some('.') => {
                    self.advance(1);
                    filters.push(Filter::Class(self.read_ident("a class name")?));
                }
                Some('[') => filters.push(self.parse_attribute()?),
                Some(':') => filters.push(self.parse_pseudo()?),
                _ => break,
            }
        }

        if self.pos == start {
            return Err(format!("Expected selector, found {}", self.describe_current()));
        }
        Ok(Compound { element, filters })
    }

    fn parse_type_selector(&mut self) -> Result<TypeSelector, String> {
        let first = match self.peek() {
            Some('*') => {
                self.advance(1);
                Some(None)
            }
            Some(c) if is_ident_start(c) => Some(Some(self.read_ident("a name")?)),
            Some('|') => None,
            _ => return Ok(TypeSelector::default()),
        };

        // `x|name`, but not an attribute operator like `|=`
        if self.peek() == Some('|') && self.peek_at(1) != Some('=') {
            self.advance(1);
            let namespace = match first {
                None => NamespaceSelector::None,
                Some(None) => NamespaceSelector::Any,
                Some(Some(prefix)) => NamespaceSelector::Prefix(prefix),
            };
            let name = if self.peek() == Some('*') {
                self.advance(1);
                None
            } else {
                Some(self.read_ident("an element name")?)
            };
            return Ok(TypeSelector { namespace, name });
        }

        match first {
            Some(name) => Ok(TypeSelector {
                namespace: NamespaceSelector::Default,
                name,
            }),
            None => Err(format!("Unexpected {}", self.describe_current())),
        }
    }

    fn parse_attribute(&mut self) -> Result<Filter, String> {
        self.expect('[')?;
        self.skip_whitespace();

        let mut name = self.read_ident("an attribute name")?;
        let mut prefix = None;
        if self.peek() == Some('|') && self.peek_at(1) != Some('=') {
            self.advance(1);
            prefix = Some(name);
            name = self.read_ident("an attribute name")?;
        }
        self.skip_whitespace();

        let op = match (self.peek(), self.peek_at(1)) {
            (Some(']'), _) => {
                self.advance(1);
                return Ok(Filter::Attribute {
                    prefix,
                    name,
                    matcher: None,
                });
            }
            (Some('='), _) => AttrOp::Equals,
            (Some('~'), Some('=')) => AttrOp::Includes,
            (Some('^'), Some('=')) => AttrOp::Prefix,
            (Some('$'), Some('=')) => AttrOp::Suffix,
            (Some('*'), Some('=')) => AttrOp::Substring,
            (Some('|'), Some('=')) => AttrOp::DashMatch,
            _ => return Err(format!("Expected attribute operator, found {}", self.describe_current())),
        };
        self.advance(if op == AttrOp::Equals { 1 } else { 2 });
        self.skip_whitespace();

        let value = match self.peek() {
            Some('"' | '\'') => self.read_string()?,
            _ => self.read_bare("an attribute value")?,
        };
        self.skip_whitespace();
        self.expect(']')?;

        Ok(Filter::Attribute {
            prefix,
            name,
            matcher: Some((op, value)),
        })
    }

    fn parse_pseudo(&mut self) -> Result<Filter, String> {
        self.expect(':')?;
        let name = self.read_ident("a pseudo-class name")?.to_ascii_lowercase();

        let pseudo = match name.as_str() {
            "first-child" => Pseudo::FirstChild,
            "last-child" => Pseudo::LastChild,
            "only-child" => Pseudo::OnlyChild,
            "first-of-type" => Pseudo::FirstOfType,
            "last-of-type" => Pseudo::LastOfType,
            "only-of-type" => Pseudo::OnlyOfType,
            "empty" => Pseudo::Empty,
            "root" => Pseudo::Root,
            "nth-child" => Pseudo::NthChild(Nth::parse(&self.read_parenthesized()?)?),
            "nth-last-child" => Pseudo::NthLastChild(Nth::parse(&self.read_parenthesized()?)?),
            "nth-of-type" => Pseudo::NthOfType(Nth::parse(&self.read_parenthesized()?)?),
            "nth-last-of-type" => Pseudo::NthLastOfType(Nth::parse(&self.read_parenthesized()?)?),
            "contains" => {
                self.expect('(')?;
                self.skip_whitespace();
                let text = match self.peek() {
                    Some('"' | '\'') => self.read_string()?,
                    _ => self.read_bare("text")?,
                };
                self.skip_whitespace();
                self.expect(')')?;
                Pseudo::Contains(text)
            }
            "not" => {
                self.expect('(')?;
                self.skip_whitespace();
                self.depth += 1;
                if self.depth > MAX_NESTING {
                    return Err("Selector nested too deeply".to_string());
                }
                let inner = self.parse_compound()?;
                self.depth -= 1;
                self.skip_whitespace();
                self.expect(')')?;
                return Ok(Filter::Not(Box::new(inner)));
            }
            other => return Err(format!("Unsupported pseudo-class ':{}'", other)),
        };
        Ok(Filter::Pseudo(pseudo))
    }

    /// Raw text between parentheses
    fn read_parenthesized(&mut self) -> Result<String, String> {
        self.expect('(')?;
        let rest = self.remaining();
        let Some(len) = rest.find(')') else {
            return Err("Unterminated '(' in selector".to_string());
        };
        let content = rest[..len].to_string();
        self.advance(len + 1);
        Ok(content)
    }

    fn read_ident(&mut self, what: &str) -> Result<String, String> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.advance(1);
        }
        match self.peek() {
            Some(c) if is_ident_start(c) => {}
            _ => {
                self.pos = start;
                return Err(format!("Expected {}, found {}", what, self.describe_current()));
            }
        }
        while let Some(c) = self.peek() {
            if is_ident_char(c) {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
        Ok(self.input[start..self.pos].to_string())
    }

    /// Unquoted value: a run of identifier characters, digits allowed first
    fn read_bare(&mut self, what: &str) -> Result<String, String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_ident_char(c) {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(format!("Expected {}, found {}", what, self.describe_current()));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    /// Quoted string; a backslash escapes the next character
    fn read_string(&mut self) -> Result<String, String> {
        let start = self.pos;
        let Some(quote) = self.peek() else {
            return Err("Expected string".to_string());
        };
        self.advance(1);

        let mut value = String::new();
        let mut chars = self.remaining().char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => {
                    if let Some((_, escaped)) = chars.next() {
                        value.push(escaped);
                    }
                }
                c if c == quote => {
                    self.advance(i + 1);
                    return Ok(value);
                }
                c => value.push(c),
            }
        }
        Err(format!("Unterminated string starting at offset {}", start))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || !c.is_ascii()
}

fn is_ident_char(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit() || c == '-'
}

/// Parse a selector string
pub fn parse(selector: &str) -> Result<SelectorGroup, String> {
    Parser::new(selector).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(selector: &str) -> ComplexSelector {
        let mut group = parse(selector).unwrap();
        assert_eq!(group.0.len(), 1);
        group.0.remove(0)
    }

    #[test]
    fn test_compound_selectors() {
        let sel = single("div#main.note.big[data-x='1']:first-child");
        assert_eq!(sel.first.element.name.as_deref(), Some("div"));
        assert_eq!(
            sel.first.filters,
            vec![
                Filter::Id("main".into()),
                Filter::Class("note".into()),
                Filter::Class("big".into()),
                Filter::Attribute {
                    prefix: None,
                    name: "data-x".into(),
                    matcher: Some((AttrOp::Equals, "1".into())),
                },
                Filter::Pseudo(Pseudo::FirstChild),
            ]
        );
    }

    #[test]
    fn test_combinators() {
        let sel = single("ul > li a + b ~ c");
        let combinators: Vec<_> = sel.rest.iter().map(|(c, _)| *c).collect();
        assert_eq!(
            combinators,
            vec![
                Combinator::Child,
                Combinator::Descendant,
                Combinator::Adjacent,
                Combinator::Sibling,
            ]
        );
        assert_eq!(parse("a, b ,c").unwrap().0.len(), 3);
    }

    #[test]
    fn test_namespaces() {
        let sel = single("p|item");
        assert_eq!(sel.first.element.namespace, NamespaceSelector::Prefix("p".into()));
        assert_eq!(single("*|item").first.element.namespace, NamespaceSelector::Any);
        assert_eq!(single("|item").first.element.namespace, NamespaceSelector::None);
        let sel = single("[lang|=en]");
        assert!(matches!(
            &sel.first.filters[0],
            Filter::Attribute { matcher: Some((AttrOp::DashMatch, v)), .. } if v == "en"
        ));
    }

    #[test]
    fn test_nth_expressions() {
        assert_eq!(Nth::parse("odd").unwrap(), Nth { a: 2, b: 1 });
        assert_eq!(Nth::parse(" 2n + 1 ").unwrap(), Nth { a: 2, b: 1 });
        assert_eq!(Nth::parse("-n+3").unwrap(), Nth { a: -1, b: 3 });
        assert_eq!(Nth::parse("n").unwrap(), Nth { a: 1, b: 0 });
        assert_eq!(Nth::parse("5").unwrap(), Nth { a: 0, b: 5 });
        assert_eq!(Nth::parse("3n-2").unwrap(), Nth { a: 3, b: -2 });
        assert!(Nth::parse("x").is_err());
        assert!(Nth::parse("2n1").is_err());
    }

    #[test]
    fn test_strings_and_not() {
        let sel = single("p:contains(\"say \\\"hi\\\"\"):not(.x)");
        assert_eq!(sel.first.filters[0], Filter::Pseudo(Pseudo::Contains("say \"hi\"".into())));
        assert!(matches!(&sel.first.filters[1], Filter::Not(inner) if inner.filters == vec![Filter::Class("x".into())]));
    }

    #[test]
    fn test_not_nesting_limit() {
        let nested = |depth: usize| format!("a{}b{}", ":not(".repeat(depth), ")".repeat(depth));
        assert!(parse(&nested(MAX_NESTING)).is_ok());
        assert_eq!(parse(&nested(MAX_NESTING + 1)), Err("Selector nested too deeply".to_string()));
        assert!(parse(&format!("{}r", ":not(".repeat(20_000))).is_err());
    }

    #[test]
    fn test_errors() {
        for bad in ["", "a >", "a,", "#", "[x", "[x=]", "a:hover", ":nth-child(x)", "a$b", "'x'", "a:contains('x"] {
            assert!(parse(bad).is_err(), "{bad:?} should fail");
        }
    }
}
