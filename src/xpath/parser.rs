//! XPath Parser
//!
//! Recursive descent parser for XPath 1.0 expressions.

use super::lexer::{Lexer, Token};

/// XPath expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Root path (/)
    Root,
    /// Location path relative to the context node
    Relative(Vec<Step>),
    /// Steps applied to the node-set of an expression (expr/step/step)
    Path(Box<Expr>, Vec<Step>),
    /// Union of two expressions (|)
    Union(Box<Expr>, Box<Expr>),
    /// Filter expression with predicate
    Filter(Box<Expr>, Box<Expr>),
    /// Function call
    Function(String, Vec<Expr>),
    /// Binary operation
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    /// Unary negation
    Negate(Box<Expr>),
    /// Literal number
    Number(f64),
    /// Literal string
    String(String),
    /// Variable reference
    Variable(String),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Location step in a path
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    fn new(axis: Axis, node_test: NodeTest) -> Self {
        Step {
            axis,
            node_test,
            predicates: Vec::new(),
        }
    }

    /// `//` abbreviation: descendant-or-self::node()
    fn descendant_or_self() -> Self {
        Step::new(Axis::DescendantOrSelf, NodeTest::Node)
    }
}

/// XPath axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    Self_,
    Attribute,
    Namespace,
}

impl Axis {
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "child" => Some(Axis::Child),
            "descendant" => Some(Axis::Descendant),
            "descendant-or-self" => Some(Axis::DescendantOrSelf),
            "parent" => Some(Axis::Parent),
            "ancestor" => Some(Axis::Ancestor),
            "ancestor-or-self" => Some(Axis::AncestorOrSelf),
            "following-sibling" => Some(Axis::FollowingSibling),
            "preceding-sibling" => Some(Axis::PrecedingSibling),
            "following" => Some(Axis::Following),
            "preceding" => Some(Axis::Preceding),
            "self" => Some(Axis::Self_),
            "attribute" => Some(Axis::Attribute),
            "namespace" => Some(Axis::Namespace),
            _ => None,
        }
    }

    /// Reverse axes number their proximity positions backwards
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Parent | Axis::Ancestor | Axis::AncestorOrSelf | Axis::PrecedingSibling | Axis::Preceding
        )
    }
}

/// Node test in a location step
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    /// Any node of the axis' principal type (*)
    Any,
    /// Unprefixed name
    Name(String),
    /// prefix:local
    QName(String, String),
    /// prefix:*
    NamespaceWildcard(String),
    /// node() - matches any node
    Node,
    /// text() - matches text nodes
    Text,
    /// comment() - matches comments
    Comment,
    /// processing-instruction() - matches PIs, optionally by target
    ProcessingInstruction(Option<String>),
}

/// Deepest parenthesis, predicate, argument or negation nesting accepted
pub const MAX_NESTING: usize = 128;

/// Most operators accepted in one expression; bounds the tree depth
pub const MAX_OPERATORS: usize = 1024;

/// XPath parser
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    operators: usize,
}

impl Parser {
    /// Create a new parser
    pub fn new(input: &str) -> Result<Self, String> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Parser {
            tokens,
            pos: 0,
            depth: 0,
            operators: 0,
        })
    }

    /// Parse a complete XPath expression
    pub fn parse(&mut self) -> Result<Expr, String> {
        if self.tokens.is_empty() {
            return Err("Empty expression".to_string());
        }
        let expr = self.parse_or_expr()?;
        match self.current() {
            None => Ok(expr),
            Some(token) => Err(format!("Unexpected token {:?} after expression", token)),
        }
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn at(&self, token: &Token) -> bool {
        self.current() == Some(token)
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), String> {
        if self.at(&token) {
            self.advance();
            Ok(())
        } else {
            Err(format!("Expected {}, found {}", what, describe(self.current())))
        }
    }

    fn enter(&mut self) -> Result<(), String> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err("Expression nested too deeply".to_string());
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Count one more node stacked onto the tree
    fn grow(&mut self) -> Result<(), String> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err("Expression too complex".to_string());
        }
        Ok(())
    }

    /// Parse a nested expression: parenthesized, predicate or argument
    fn parse_nested(&mut self) -> Result<Expr, String> {
        self.enter()?;
        let expr = self.parse_or_expr()?;
        self.leave();
        Ok(expr)
    }

    /// Parse or expression
    fn parse_or_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and_expr()?;

        while self.at(&Token::Or) {
            self.advance();
            self.grow()?;
            let right = self.parse_and_expr()?;
            left = Expr::Binary(Box::new(left), BinaryOp::Or, Box::new(right));
        }

        Ok(left)
    }

    /// Parse and expression
    fn parse_and_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_equality_expr()?;

        while self.at(&Token::And) {
            self.advance();
            self.grow()?;
            let right = self.parse_equality_expr()?;
            left = Expr::Binary(Box::new(left), BinaryOp::And, Box::new(right));
        }

        Ok(left)
    }

    /// Parse equality expression
    fn parse_equality_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_relational_expr()?;

        loop {
            let op = match self.current() {
                Some(Token::Eq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            self.grow()?;
            let right = self.parse_relational_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }

        Ok(left)
    }

    /// Parse relational expression
    fn parse_relational_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_additive_expr()?;

        loop {
            let op = match self.current() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::LtEq) => BinaryOp::LtEq,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::GtEq) => BinaryOp::GtEq,
                _ => break,
            };
            self.advance();
            self.grow()?;
            let right = self.parse_additive_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }

        Ok(left)
    }

    /// Parse additive expression
    fn parse_additive_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_multiplicative_expr()?;

        loop {
            let op = match self.current() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            self.grow()?;
            let right = self.parse_multiplicative_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }

        Ok(left)
    }

    /// Parse multiplicative expression
    fn parse_multiplicative_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_unary_expr()?;

        loop {
            let op = match self.current() {
                Some(Token::Multiply) => BinaryOp::Mul,
                Some(Token::Div) => BinaryOp::Div,
                Some(Token::Mod) => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            self.grow()?;
            let right = self.parse_unary_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }

        Ok(left)
    }

    /// Parse unary expression
    fn parse_unary_expr(&mut self) -> Result<Expr, String> {
        if self.at(&Token::Minus) {
            self.advance();
            self.enter()?;
            self.grow()?;
            let expr = self.parse_unary_expr()?;
            self.leave();
            Ok(Expr::Negate(Box::new(expr)))
        } else {
            self.parse_union_expr()
        }
    }

    /// Parse union expression
    fn parse_union_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_path_expr()?;

        while self.at(&Token::Pipe) {
            self.advance();
            self.grow()?;
            let right = self.parse_path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    /// Parse path expression
    fn parse_path_expr(&mut self) -> Result<Expr, String> {
        match self.current() {
            Some(Token::Slash) => {
                self.advance();
                if !self.starts_step() {
                    // Just /
                    return Ok(Expr::Root);
                }
                let steps = self.parse_relative_path(Vec::new())?;
                Ok(Expr::Path(Box::new(Expr::Root), steps))
            }
            Some(Token::DoubleSlash) => {
                self.advance();
                let steps = self.parse_relative_path(vec![Step::descendant_or_self()])?;
                Ok(Expr::Path(Box::new(Expr::Root), steps))
            }
            _ if self.starts_step() => {
                let steps = self.parse_relative_path(Vec::new())?;
                Ok(Expr::Relative(steps))
            }
            _ => self.parse_filter_path(),
        }
    }

    /// Whether the current token can begin a location step
    fn starts_step(&self) -> bool {
        matches!(
            self.current(),
            Some(
                Token::Name(_)
                    | Token::NameTest(_)
                    | Token::NodeType(_)
                    | Token::Star
                    | Token::At
                    | Token::Dot
                    | Token::DoubleDot
                    | Token::Axis(_)
            )
        )
    }

    /// Parse `step (('/' | '//') step)*`, appending to `steps`
    fn parse_relative_path(&mut self, mut steps: Vec<Step>) -> Result<Vec<Step>, String> {
        steps.push(self.parse_step()?);
        loop {
            match self.current() {
                Some(Token::Slash) => {
                    self.advance();
                    steps.push(self.parse_step()?);
                }
                Some(Token::DoubleSlash) => {
                    self.advance();
                    steps.push(Step::descendant_or_self());
                    steps.push(self.parse_step()?);
                }
                _ => return Ok(steps),
            }
        }
    }

    /// FilterExpr, optionally followed by a relative path
    fn parse_filter_path(&mut self) -> Result<Expr, String> {
        let mut expr = self.parse_primary_expr()?;

        while self.at(&Token::LeftBracket) {
            self.grow()?;
            let pred = self.parse_predicate()?;
            expr = Expr::Filter(Box::new(expr), Box::new(pred));
        }

        match self.current() {
            Some(Token::Slash) => {
                self.advance();
                let steps = self.parse_relative_path(Vec::new())?;
                Ok(Expr::Path(Box::new(expr), steps))
            }
            Some(Token::DoubleSlash) => {
                self.advance();
                let steps = self.parse_relative_path(vec![Step::descendant_or_self()])?;
                Ok(Expr::Path(Box::new(expr), steps))
            }
            _ => Ok(expr),
        }
    }

    fn parse_predicate(&mut self) -> Result<Expr, String> {
        self.expect(Token::LeftBracket, "'['")?;
        let pred = self.parse_nested()?;
        self.expect(Token::RightBracket, "']'")?;
        Ok(pred)
    }

    /// Parse primary expression
    fn parse_primary_expr(&mut self) -> Result<Expr, String> {
        let expr = match self.current().cloned() {
            Some(Token::Number(n)) => Expr::Number(n),
            Some(Token::Literal(s)) => Expr::String(s),
            Some(Token::Variable(name)) => Expr::Variable(name),
            Some(Token::LeftParen) => {
                self.advance();
                let expr = self.parse_nested()?;
                self.expect(Token::RightParen, "')'")?;
                return Ok(expr);
            }
            Some(Token::FunctionName(name)) => {
                self.advance();
                self.advance(); // Skip (
                let args = self.parse_function_args()?;
                return Ok(Expr::Function(name, args));
            }
            other => return Err(format!("Unexpected {}", describe(other.as_ref()))),
        };
        self.advance();
        Ok(expr)
    }

    /// Parse a location step
    fn parse_step(&mut self) -> Result<Step, String> {
        match self.current() {
            Some(Token::Dot) => {
                self.advance();
                return Ok(Step::new(Axis::Self_, NodeTest::Node));
            }
            Some(Token::DoubleDot) => {
                self.advance();
                return Ok(Step::new(Axis::Parent, NodeTest::Node));
            }
            _ => {}
        }

        let axis = match self.current().cloned() {
            Some(Token::At) => {
                self.advance();
                Axis::Attribute
            }
            Some(Token::Axis(name)) => {
                let axis = Axis::from_name(&name).ok_or_else(|| format!("Unknown axis: {}", name))?;
                self.advance();
                self.expect(Token::DoubleColon, "'::' after axis name")?;
                axis
            }
            _ => Axis::Child,
        };

        let node_test = self.parse_node_test()?;

        let mut step = Step::new(axis, node_test);
        while self.at(&Token::LeftBracket) {
            step.predicates.push(self.parse_predicate()?);
        }
        Ok(step)
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, String> {
        let test = match self.current().cloned() {
            Some(Token::Star) => NodeTest::Any,
            Some(Token::Name(name)) => match name.split_once(':') {
                Some((prefix, local)) => NodeTest::QName(prefix.to_string(), local.to_string()),
                None => NodeTest::Name(name),
            },
            Some(Token::NameTest(qname)) => {
                let prefix = qname.trim_end_matches(":*");
                NodeTest::NamespaceWildcard(prefix.to_string())
            }
            Some(Token::NodeType(name)) => {
                self.advance();
                self.advance(); // Skip (
                let arg = match self.current().cloned() {
                    Some(Token::Literal(s)) if name == "processing-instruction" => {
                        self.advance();
                        Some(s)
                    }
                    _ => None,
                };
                self.expect(Token::RightParen, "')'")?;
                return Ok(match name.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => NodeTest::ProcessingInstruction(arg),
                });
            }
            other => return Err(format!("Expected node test, found {}", describe(other.as_ref()))),
        };
        self.advance();
        Ok(test)
    }

    /// Parse function arguments after the opening parenthesis
    fn parse_function_args(&mut self) -> Result<Vec<Expr>, String> {
        let mut args = Vec::new();

        if !self.at(&Token::RightParen) {
            args.push(self.parse_nested()?);

            while self.at(&Token::Comma) {
                self.advance();
                args.push(self.parse_nested()?);
            }
        }

        self.expect(Token::RightParen, "')' after function arguments")?;
        Ok(args)
    }
}

fn describe(token: Option<&Token>) -> String {
    match token {
        Some(token) => format!("{:?}", token),
        None => "end of expression".to_string(),
    }
}

/// Parse an XPath expression string
pub fn parse(input: &str) -> Result<Expr, String> {
    Parser::new(input)?.parse()
}
