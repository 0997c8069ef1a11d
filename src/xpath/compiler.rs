//! XPath Expression Compiler
//!
//! Lowers the AST to a flat list of stack operations. Function names and
//! arities are checked here so a bad call fails at compile time instead of
//! on the first node that reaches it.

use super::functions;
use super::parser::{Axis, BinaryOp, Expr, NodeTest, Step};

/// Compiled XPath expression
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    pub ops: Vec<Op>,
}

/// Compiled operation
#[derive(Debug, Clone)]
pub enum Op {
    /// Push the document node
    Root,
    /// Push the context node
    Context,
    /// Replace the node-set on top of the stack with the result of a step
    Step(CompiledStep),
    /// Filter the node-set on top of the stack, positions in document order
    Filter(Box<CompiledExpr>),
    /// Union two node sets
    Union,
    /// Push literal number
    Number(f64),
    /// Push literal string
    String(String),
    /// Call function
    Call(String, usize), // name, arg count
    /// Binary operation
    Binary(BinaryOp),
    /// Negate
    Negate,
    /// Variable reference
    Variable(String),
}

/// A location step with its predicates
#[derive(Debug, Clone)]
pub struct CompiledStep {
    pub axis: Axis,
    pub node_test: CompiledNodeTest,
    pub predicates: Vec<CompiledExpr>,
}

/// Compiled node test
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledNodeTest {
    Any,
    Name(String),
    QName(String, String),
    NamespaceWildcard(String),
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

impl CompiledExpr {
    /// Compile an XPath expression
    pub fn compile(expr: &Expr) -> Result<Self, String> {
        let mut ops = Vec::new();
        Self::compile_expr(expr, &mut ops)?;
        Ok(CompiledExpr { ops })
    }

    fn compile_expr(expr: &Expr, ops: &mut Vec<Op>) -> Result<(), String> {
        match expr {
            Expr::Root => ops.push(Op::Root),
            Expr::Number(n) => ops.push(Op::Number(*n)),
            Expr::String(s) => ops.push(Op::String(s.clone())),
            Expr::Variable(name) => ops.push(Op::Variable(name.clone())),
            Expr::Negate(inner) => {
                Self::compile_expr(inner, ops)?;
                ops.push(Op::Negate);
            }
            Expr::Binary(left, op, right) => {
                Self::compile_expr(left, ops)?;
                Self::compile_expr(right, ops)?;
                ops.push(Op::Binary(*op));
            }
            Expr::Union(left, right) => {
                Self::compile_expr(left, ops)?;
                Self::compile_expr(right, ops)?;
                ops.push(Op::Union);
            }
            Expr::Relative(steps) => {
                ops.push(Op::Context);
                for step in steps {
                    ops.push(Op::Step(Self::compile_step(step)?));
                }
            }
            Expr::Path(base, steps) => {
                Self::compile_expr(base, ops)?;
                for step in steps {
                    ops.push(Op::Step(Self::compile_step(step)?));
                }
            }
            Expr::Filter(base, pred) => {
                Self::compile_expr(base, ops)?;
                ops.push(Op::Filter(Box::new(CompiledExpr::compile(pred)?)));
            }
            Expr::Function(name, args) => {
                functions::check_arity(name, args.len())?;
                for arg in args {
                    Self::compile_expr(arg, ops)?;
                }
                ops.push(Op::Call(name.clone(), args.len()));
            }
        }
        Ok(())
    }

    fn compile_step(step: &Step) -> Result<CompiledStep, String> {
        let node_test = match &step.node_test {
            NodeTest::Any => CompiledNodeTest::Any,
            NodeTest::Name(n) => CompiledNodeTest::Name(n.clone()),
            NodeTest::QName(ns, local) => CompiledNodeTest::QName(ns.clone(), local.clone()),
            NodeTest::NamespaceWildcard(ns) => CompiledNodeTest::NamespaceWildcard(ns.clone()),
            NodeTest::Node => CompiledNodeTest::Node,
            NodeTest::Text => CompiledNodeTest::Text,
            NodeTest::Comment => CompiledNodeTest::Comment,
            NodeTest::ProcessingInstruction(arg) => CompiledNodeTest::ProcessingInstruction(arg.clone()),
        };

        let predicates = step
            .predicates
            .iter()
            .map(CompiledExpr::compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CompiledStep {
            axis: step.axis,
            node_test,
            predicates,
        })
    }
}

/// Compile an XPath expression string
pub fn compile(xpath: &str) -> Result<CompiledExpr, String> {
    let expr = super::parser::parse(xpath)?;
    CompiledExpr::compile(&expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_simple() {
        let compiled = compile("/root").unwrap();
        assert!(matches!(compiled.ops[0], Op::Root));
        assert!(matches!(&compiled.ops[1], Op::Step(step) if step.axis == Axis::Child));
    }

    #[test]
    fn test_compile_relative() {
        let compiled = compile("a/b[2]").unwrap();
        assert_eq!(compiled.ops.len(), 3);
        assert!(matches!(compiled.ops[0], Op::Context));
        assert!(matches!(&compiled.ops[2], Op::Step(step) if step.predicates.len() == 1));
    }

    #[test]
    fn test_function_checks() {
        assert!(compile("count(//a)").is_ok());
        assert!(compile("concat('a', 'b', 'c')").is_ok());
        assert!(compile("nosuch(1)").unwrap_err().contains("Unknown function"));
        assert!(compile("count()").is_err());
        assert!(compile("concat('a')").is_err());
        assert!(compile("true(1)").is_err());
    }
}
