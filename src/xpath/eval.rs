//! XPath Evaluation Engine
//!
//! Evaluates compiled XPath expressions against a document.

use super::axes::{matches_node_test, navigate};
use super::compiler::{CompiledExpr, CompiledStep, Op};
use super::functions;
use super::parser::{Axis, BinaryOp};
use super::value::{parse_number, XPathValue};
use crate::dom::{DocumentAccess, NodeId, NodeKind, PrefixRegistry};

/// Evaluation context - generic over document type
pub struct EvalContext<'a, D: DocumentAccess> {
    pub doc: &'a D,
    pub prefixes: &'a PrefixRegistry,
    pub node: NodeId,
    pub position: usize,
    pub size: usize,
}

impl<'a, D: DocumentAccess> EvalContext<'a, D> {
    fn with_node(&self, node: NodeId, position: usize, size: usize) -> Self {
        EvalContext {
            doc: self.doc,
            prefixes: self.prefixes,
            node,
            position,
            size,
        }
    }
}

/// Evaluate an XPath expression with the document node as context
#[cfg(test)]
#[must_use = "XPath evaluation result should be used"]
pub(crate) fn evaluate<D: DocumentAccess>(doc: &D, prefixes: &PrefixRegistry, xpath: &str) -> Result<XPathValue, String> {
    evaluate_from_node(doc, prefixes, 0, xpath)
}

/// Evaluate an XPath expression from a specific context node
#[cfg(test)]
#[must_use = "XPath evaluation result should be used"]
pub(crate) fn evaluate_from_node<D: DocumentAccess>(
    doc: &D,
    prefixes: &PrefixRegistry,
    context_node: NodeId,
    xpath: &str,
) -> Result<XPathValue, String> {
    let compiled = super::compiler::compile(xpath)?;
    evaluate_at(doc, prefixes, &compiled, context_node)
}

/// Evaluate an already compiled expression from a context node
pub fn evaluate_at<D: DocumentAccess>(
    doc: &D,
    prefixes: &PrefixRegistry,
    compiled: &CompiledExpr,
    context_node: NodeId,
) -> Result<XPathValue, String> {
    let ctx = EvalContext {
        doc,
        prefixes,
        node: context_node,
        position: 1,
        size: 1,
    };
    evaluate_compiled(compiled, &ctx)
}

fn pop(stack: &mut Vec<XPathValue>) -> Result<XPathValue, String> {
    stack.pop().ok_or_else(|| "Malformed expression: operand missing".to_string())
}

fn pop_nodeset(stack: &mut Vec<XPathValue>, what: &str) -> Result<Vec<NodeId>, String> {
    match pop(stack)? {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        other => Err(format!("Cannot apply {} to a {}", what, other.type_name())),
    }
}

/// Evaluate a compiled expression
pub fn evaluate_compiled<D: DocumentAccess>(expr: &CompiledExpr, ctx: &EvalContext<'_, D>) -> Result<XPathValue, String> {
    let mut stack: Vec<XPathValue> = Vec::new();

    for op in &expr.ops {
        match op {
            Op::Root => stack.push(XPathValue::single_node(0)),

            Op::Context => stack.push(XPathValue::single_node(ctx.node)),

            Op::Step(step) => {
                let nodes = pop_nodeset(&mut stack, "a location step")?;
                stack.push(XPathValue::NodeSet(apply_step(step, &nodes, ctx)?));
            }

            Op::Filter(pred) => {
                let nodes = pop_nodeset(&mut stack, "a predicate")?;
                stack.push(XPathValue::NodeSet(filter(pred, nodes, ctx)?));
            }

            Op::Union => {
                let right = pop_nodeset(&mut stack, "'|'")?;
                let mut left = pop_nodeset(&mut stack, "'|'")?;
                left.extend(right);
                left.sort_unstable();
                left.dedup();
                stack.push(XPathValue::NodeSet(left));
            }

            Op::Number(n) => stack.push(XPathValue::Number(*n)),

            Op::String(s) => stack.push(XPathValue::String(s.clone())),

            Op::Variable(name) => {
                return Err(format!("Variable references are not supported: ${}", name));
            }

            Op::Negate => {
                let val = pop(&mut stack)?;
                stack.push(XPathValue::Number(-val.to_number(ctx.doc)));
            }

            Op::Binary(op) => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;
                let doc = ctx.doc;

                let result = match op {
                    BinaryOp::Or => XPathValue::Boolean(left.to_boolean() || right.to_boolean()),
                    BinaryOp::And => XPathValue::Boolean(left.to_boolean() && right.to_boolean()),
                    BinaryOp::Eq
                    | BinaryOp::NotEq
                    | BinaryOp::Lt
                    | BinaryOp::LtEq
                    | BinaryOp::Gt
                    | BinaryOp::GtEq => XPathValue::Boolean(compare(doc, *op, &left, &right)),
                    BinaryOp::Add => XPathValue::Number(left.to_number(doc) + right.to_number(doc)),
                    BinaryOp::Sub => XPathValue::Number(left.to_number(doc) - right.to_number(doc)),
                    BinaryOp::Mul => XPathValue::Number(left.to_number(doc) * right.to_number(doc)),
                    BinaryOp::Div => XPathValue::Number(left.to_number(doc) / right.to_number(doc)),
                    BinaryOp::Mod => XPathValue::Number(left.to_number(doc) % right.to_number(doc)),
                };

                stack.push(result);
            }

            Op::Call(name, arg_count) => {
                if stack.len() < *arg_count {
                    return Err(format!("Malformed expression: {}() is missing arguments", name));
                }
                let args = stack.split_off(stack.len() - arg_count);
                stack.push(functions::call(name, args, ctx)?);
            }
        }
    }

    pop(&mut stack)
}

/// Apply a location step to every node of the input set
fn apply_step<D: DocumentAccess>(step: &CompiledStep, input: &[NodeId], ctx: &EvalContext<'_, D>) -> Result<Vec<NodeId>, String> {
    let doc = ctx.doc;
    let mut result = Vec::new();

    // Without predicates, a descendant step from a node inside an earlier
    // context's subtree adds nothing new
    let skip_nested = step.predicates.is_empty() && matches!(step.axis, Axis::Descendant | Axis::DescendantOrSelf);
    let mut covered_until: NodeId = 0;

    for &node in input {
        if skip_nested && doc.node_kind(node) != Some(NodeKind::Attribute) {
            if node < covered_until {
                continue;
            }
            covered_until = doc.subtree_end(node);
        }

        let mut candidates: Vec<NodeId> = navigate(doc, node, step.axis)
            .into_iter()
            .filter(|&c| matches_node_test(doc, c, step.axis, &step.node_test, ctx.prefixes))
            .collect();

        // Candidates are in axis order, so index + 1 is the proximity position
        for pred in &step.predicates {
            candidates = filter(pred, candidates, ctx)?;
        }
        result.extend(candidates);
    }

    if input.len() > 1 || step.axis.is_reverse() {
        result.sort_unstable();
        result.dedup();
    }
    Ok(result)
}

/// Keep the nodes for which the predicate holds; a number predicate
/// compares against the position
fn filter<D: DocumentAccess>(pred: &CompiledExpr, nodes: Vec<NodeId>, ctx: &EvalContext<'_, D>) -> Result<Vec<NodeId>, String> {
    let size = nodes.len();
    let mut kept = Vec::with_capacity(size);

    for (i, node) in nodes.into_iter().enumerate() {
        let pred_ctx = ctx.with_node(node, i + 1, size);
        let include = match evaluate_compiled(pred, &pred_ctx)? {
            XPathValue::Number(n) => (i + 1) as f64 == n,
            other => other.to_boolean(),
        };
        if include {
            kept.push(node);
        }
    }

    Ok(kept)
}

/// XPath 1.0 comparison, including the existential node-set rules
fn compare<D: DocumentAccess>(doc: &D, op: BinaryOp, left: &XPathValue, right: &XPathValue) -> bool {
    use XPathValue::{Boolean, NodeSet};

    match (left, right) {
        (NodeSet(l), NodeSet(r)) => {
            let right_values: Vec<String> = r.iter().map(|&n| doc.string_value(n)).collect();
            l.iter().any(|&n| {
                let lv = doc.string_value(n);
                right_values.iter().any(|rv| compare_strings(op, &lv, rv))
            })
        }
        (NodeSet(nodes), Boolean(b)) => compare_atomic(doc, op, &Boolean(!nodes.is_empty()), &Boolean(*b)),
        (Boolean(b), NodeSet(nodes)) => compare_atomic(doc, op, &Boolean(*b), &Boolean(!nodes.is_empty())),
        (NodeSet(nodes), other) => nodes
            .iter()
            .any(|&n| compare_atomic(doc, op, &XPathValue::String(doc.string_value(n)), other)),
        (other, NodeSet(nodes)) => nodes
            .iter()
            .any(|&n| compare_atomic(doc, op, other, &XPathValue::String(doc.string_value(n)))),
        (l, r) => compare_atomic(doc, op, l, r),
    }
}

fn compare_strings(op: BinaryOp, a: &str, b: &str) -> bool {
    match op {
        BinaryOp::Eq => a == b,
        BinaryOp::NotEq => a != b,
        _ => compare_numbers(op, parse_number(a), parse_number(b)),
    }
}

/// Compare two values that are not node-sets
fn compare_atomic<D: DocumentAccess>(doc: &D, op: BinaryOp, left: &XPathValue, right: &XPathValue) -> bool {
    use XPathValue::{Boolean, Number};

    match op {
        BinaryOp::Eq | BinaryOp::NotEq => {
            let equal = if matches!(left, Boolean(_)) || matches!(right, Boolean(_)) {
                left.to_boolean() == right.to_boolean()
            } else if matches!(left, Number(_)) || matches!(right, Number(_)) {
                left.to_number(doc) == right.to_number(doc)
            } else {
                left.to_string_value(doc) == right.to_string_value(doc)
            };
            (op == BinaryOp::Eq) == equal
        }
        _ => compare_numbers(op, left.to_number(doc), right.to_number(doc)),
    }
}

fn compare_numbers(op: BinaryOp, a: f64, b: f64) -> bool {
    match op {
        BinaryOp::Lt => a < b,
        BinaryOp::LtEq => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::GtEq => a >= b,
        BinaryOp::Eq => a == b,
        _ => a != b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::OwnedXmlDocument;
    use crate::options::ParseOptions;

    fn doc(input: &str) -> OwnedXmlDocument {
        OwnedXmlDocument::parse(input.as_bytes(), &ParseOptions::xml()).unwrap()
    }

    fn names(doc: &OwnedXmlDocument, xpath: &str) -> Vec<String> {
        let result = evaluate(doc, &PrefixRegistry::new(), xpath).unwrap();
        result
            .as_nodeset()
            .unwrap()
            .iter()
            .map(|&n| doc.node_name(n).map_or_else(|| doc.string_value(n), str::to_string))
            .collect()
    }

    fn eval(doc: &OwnedXmlDocument, xpath: &str) -> XPathValue {
        evaluate(doc, &PrefixRegistry::new(), xpath).unwrap()
    }

    #[test]
    fn test_paths() {
        let d = doc("<root><a><b/></a><c/></root>");
        assert_eq!(names(&d, "/root/a/b"), vec!["b"]);
        assert_eq!(names(&d, "//b"), vec!["b"]);
        assert_eq!(names(&d, "/root/*"), vec!["a", "c"]);
        assert_eq!(names(&d, "root/c"), vec!["c"]);
        assert_eq!(names(&d, "//b/ancestor::*"), vec!["root", "a"]);
        assert!(names(&d, "/nothing").is_empty());
    }

    #[test]
    fn test_positional_predicates_are_per_context() {
        let d = doc("<r><l><i>1</i><i>2</i></l><l><i>3</i><i>4</i></l></r>");
        assert_eq!(names(&d, "//l/i[1]"), vec!["i", "i"]);
        assert_eq!(eval(&d, "string(//l[2]/i[1])").to_string_value(&d), "3");
        assert_eq!(eval(&d, "string(//l/i[2])").to_string_value(&d), "2");
        assert_eq!(eval(&d, "count(//i[1])").to_number(&d), 2.0);
        assert_eq!(eval(&d, "count((//i)[1])").to_number(&d), 1.0);
        assert_eq!(eval(&d, "string((//i)[last()])").to_string_value(&d), "4");
        assert_eq!(eval(&d, "string(//i[position() = last()][. > 3])").to_string_value(&d), "4");
    }

    #[test]
    fn test_reverse_axis_positions() {
        let d = doc("<r><a/><b/><c/></r>");
        assert_eq!(names(&d, "//c/preceding-sibling::*[1]"), vec!["b"]);
        assert_eq!(names(&d, "//c/preceding-sibling::*[last()]"), vec!["a"]);
        assert_eq!(names(&d, "//c/ancestor-or-self::*[2]"), vec!["r"]);
    }

    #[test]
    fn test_union_in_document_order() {
        let d = doc("<root><a/><b/><c/></root>");
        assert_eq!(names(&d, "//c | //a"), vec!["a", "c"]);
        assert_eq!(names(&d, "//a | //a"), vec!["a"]);
    }

    #[test]
    fn test_attributes() {
        let d = doc("<r><i id=\"1\" k=\"x\"/><i id=\"2\"/></r>");
        assert_eq!(eval(&d, "count(//@id)").to_number(&d), 2.0);
        assert_eq!(eval(&d, "count(//i[@k])").to_number(&d), 1.0);
        assert_eq!(eval(&d, "string(//i[@id = 2]/@id)").to_string_value(&d), "2");
        assert_eq!(eval(&d, "name(//i/@*[2])").to_string_value(&d), "k");
        assert_eq!(names(&d, "//@k/.."), vec!["i"]);
    }

    #[test]
    fn test_comparisons() {
        let d = doc("<r><n>1</n><n>5</n><s>abc</s></r>");
        let truth = |x: &str| eval(&d, x).to_boolean();
        assert!(truth("//n = 5"));
        assert!(truth("//n != 5"));
        assert!(truth("//n > 4"));
        assert!(!truth("//n > 5"));
        assert!(truth("5 = //n"));
        assert!(truth("//s = 'abc'"));
        assert!(truth("//n = //n"));
        assert!(!truth("//missing = ''"));
        assert!(truth("//missing = false()"));
        assert!(truth("1 < 2 and 'a' = 'a'"));
        assert!(truth("true() = 'x'"));
    }

    #[test]
    fn test_arithmetic() {
        let d = doc("<r/>");
        assert_eq!(eval(&d, "1 + 2 * 3").to_number(&d), 7.0);
        assert_eq!(eval(&d, "7 mod 3").to_number(&d), 1.0);
        assert_eq!(eval(&d, "-7 mod 3").to_number(&d), -1.0);
        assert_eq!(eval(&d, "6 div 4").to_number(&d), 1.5);
        assert!(eval(&d, "1 div 0").to_number(&d).is_infinite());
        assert_eq!(eval(&d, "--2").to_number(&d), 2.0);
    }

    #[test]
    fn test_functions() {
        let d = doc("<r xml:lang=\"en-US\"><p> a  b </p><q xml:id=\"k\">z</q></r>");
        let s = |x: &str| eval(&d, x).to_string_value(&d);
        assert_eq!(s("normalize-space(//p)"), "a b");
        assert_eq!(s("concat('a', 1, true())"), "a1true");
        assert_eq!(s("substring-before('2024-01', '-')"), "2024");
        assert_eq!(s("substring-after('2024-01', '-')"), "01");
        assert_eq!(s("name(id('k'))"), "q");
        assert_eq!(s("translate('abc', 'b', '')"), "ac");
        assert_eq!(s("local-name(/*)"), "r");
        assert_eq!(s("count(//p[lang('en')])"), "1");
        assert_eq!(s("count(//p[lang('de')])"), "0");
        assert_eq!(s("sum(//q) = sum(//q)"), "false");
        assert_eq!(s("round(2.5)"), "3");
        assert_eq!(s("string-length('héllo')"), "5");
    }

    #[test]
    fn test_text_and_node_tests() {
        let d = doc("<r>a<!--c--><?pi x?><b>t</b></r>");
        assert_eq!(eval(&d, "count(/r/node())").to_number(&d), 4.0);
        assert_eq!(eval(&d, "count(//text())").to_number(&d), 2.0);
        assert_eq!(eval(&d, "count(//comment())").to_number(&d), 1.0);
        assert_eq!(eval(&d, "count(//processing-instruction('pi'))").to_number(&d), 1.0);
        assert_eq!(eval(&d, "count(//processing-instruction('no'))").to_number(&d), 0.0);
    }

    #[test]
    fn test_evaluation_errors() {
        let d = doc("<r/>");
        let prefixes = PrefixRegistry::new();
        assert!(evaluate(&d, &prefixes, "$x").is_err());
        assert!(evaluate(&d, &prefixes, "1 | //r").is_err());
        assert!(evaluate(&d, &prefixes, "count(1)").is_err());
        assert!(evaluate(&d, &prefixes, "'a'/b").is_err());
    }

    #[test]
    fn test_context_node() {
        let d = doc("<r><a><b/></a><b/></r>");
        let a = d.children_vec(1)[0];
        let result = evaluate_from_node(&d, &PrefixRegistry::new(), a, ".//b").unwrap();
        assert_eq!(result.as_nodeset().unwrap().len(), 1);
        let result = evaluate_from_node(&d, &PrefixRegistry::new(), a, "//b").unwrap();
        assert_eq!(result.as_nodeset().unwrap().len(), 2);
    }
}
