//! XPath 1.0 Functions
//!
//! Implements the XPath 1.0 core function library:
//!
//! Node Set Functions:
//! - position(), last(), count(), id(), local-name(), namespace-uri(), name()
//!
//! String Functions:
//! - string(), concat(), starts-with(), contains(), substring(),
//!   substring-before(), substring-after(), string-length(),
//!   normalize-space(), translate()
//!
//! Boolean Functions:
//! - boolean(), not(), true(), false(), lang()
//!
//! Number Functions:
//! - number(), sum(), floor(), ceiling(), round()

use super::eval::EvalContext;
use super::value::{parse_number, XPathValue};
use crate::dom::{DocumentAccess, NodeId, NodeKind};

/// Accepted argument counts: (min, max), `None` for variadic
fn arity(name: &str) -> Option<(usize, Option<usize>)> {
    let range = match name {
        "last" | "position" | "true" | "false" => (0, Some(0)),
        "count" | "id" | "boolean" | "not" | "lang" | "sum" | "floor" | "ceiling" | "round" => (1, Some(1)),
        "local-name" | "namespace-uri" | "name" | "string" | "string-length" | "normalize-space"
        | "number" => (0, Some(1)),
        "starts-with" | "contains" | "substring-before" | "substring-after" => (2, Some(2)),
        "substring" => (2, Some(3)),
        "translate" => (3, Some(3)),
        "concat" => (2, None),
        _ => return None,
    };
    Some(range)
}

/// Validate a call at compile time
pub fn check_arity(name: &str, count: usize) -> Result<(), String> {
    let (min, max) = arity(name).ok_or_else(|| format!("Unknown function: {}()", name))?;
    if count < min || max.is_some_and(|max| count > max) {
        let expected = match max {
            Some(max) if max == min => format!("{}", min),
            Some(max) => format!("{} to {}", min, max),
            None => format!("at least {}", min),
        };
        return Err(format!(
            "{}() takes {} argument(s), {} given",
            name, expected, count
        ));
    }
    Ok(())
}

/// Evaluate a function call
pub fn call<D: DocumentAccess>(name: &str, args: Vec<XPathValue>, ctx: &EvalContext<'_, D>) -> Result<XPathValue, String> {
    check_arity(name, args.len())?;
    let doc = ctx.doc;
    let mut args = args.into_iter();

    // String argument, or the context node's string-value when omitted
    let string_arg = |arg: Option<XPathValue>| match arg {
        Some(value) => value.to_string_value(doc),
        None => doc.string_value(ctx.node),
    };

    let result = match name {
        // Node Set Functions
        "position" => XPathValue::Number(ctx.position as f64),
        "last" => XPathValue::Number(ctx.size as f64),
        "count" => XPathValue::Number(nodeset_arg(name, args.next())?.len() as f64),
        "id" => fn_id(doc, args.next().unwrap_or_default()),
        "local-name" => {
            let node = first_node(name, args.next(), ctx.node)?;
            XPathValue::String(node.and_then(|n| doc.node_local_name(n)).unwrap_or("").to_string())
        }
        "namespace-uri" => {
            let node = first_node(name, args.next(), ctx.node)?;
            XPathValue::String(node.and_then(|n| doc.node_namespace(n)).unwrap_or("").to_string())
        }
        "name" => {
            let node = first_node(name, args.next(), ctx.node)?;
            XPathValue::String(node.and_then(|n| doc.node_name(n)).unwrap_or("").to_string())
        }

        // String Functions
        "string" => XPathValue::String(string_arg(args.next())),
        "concat" => XPathValue::String(args.map(|a| a.to_string_value(doc)).collect()),
        "starts-with" => {
            let (s, prefix) = two_strings(doc, &mut args);
            XPathValue::Boolean(s.starts_with(&prefix))
        }
        "contains" => {
            let (s, needle) = two_strings(doc, &mut args);
            XPathValue::Boolean(s.contains(&needle))
        }
        "substring-before" => {
            let (s, needle) = two_strings(doc, &mut args);
            XPathValue::String(s.find(&needle).map(|i| s[..i].to_string()).unwrap_or_default())
        }
        "substring-after" => {
            let (s, needle) = two_strings(doc, &mut args);
            XPathValue::String(
                s.find(&needle)
                    .map(|i| s[i + needle.len()..].to_string())
                    .unwrap_or_default(),
            )
        }
        "substring" => {
            let s = string_arg(args.next());
            let start = args.next().map_or(f64::NAN, |v| v.to_number(doc));
            let length = args.next().map(|v| v.to_number(doc));
            XPathValue::String(substring(&s, start, length))
        }
        "string-length" => XPathValue::Number(string_arg(args.next()).chars().count() as f64),
        "normalize-space" => XPathValue::String(normalize_space(&string_arg(args.next()))),
        "translate" => {
            let s = string_arg(args.next());
            let (from, to) = two_strings(doc, &mut args);
            XPathValue::String(translate(&s, &from, &to))
        }

        // Boolean Functions
        "boolean" => XPathValue::Boolean(args.next().is_some_and(|v| v.to_boolean())),
        "not" => XPathValue::Boolean(!args.next().is_some_and(|v| v.to_boolean())),
        "true" => XPathValue::Boolean(true),
        "false" => XPathValue::Boolean(false),
        "lang" => {
            let lang = string_arg(args.next());
            XPathValue::Boolean(fn_lang(doc, ctx.node, &lang))
        }

        // Number Functions
        "number" => XPathValue::Number(match args.next() {
            Some(value) => value.to_number(doc),
            None => parse_number(&doc.string_value(ctx.node)),
        }),
        "sum" => XPathValue::Number(
            nodeset_arg(name, args.next())?
                .iter()
                .map(|&n| parse_number(&doc.string_value(n)))
                .sum(),
        ),
        "floor" => XPathValue::Number(number_arg(doc, args.next()).floor()),
        "ceiling" => XPathValue::Number(number_arg(doc, args.next()).ceil()),
        "round" => XPathValue::Number(round(number_arg(doc, args.next()))),

        _ => return Err(format!("Unknown function: {}()", name)),
    };
    Ok(result)
}

fn nodeset_arg(name: &str, arg: Option<XPathValue>) -> Result<Vec<NodeId>, String> {
    match arg {
        Some(XPathValue::NodeSet(nodes)) => Ok(nodes),
        Some(other) => Err(format!("{}() expects a node-set, got a {}", name, other.type_name())),
        None => Ok(Vec::new()),
    }
}

/// First node of an optional node-set argument, defaulting to the context node
fn first_node(name: &str, arg: Option<XPathValue>, context: NodeId) -> Result<Option<NodeId>, String> {
    match arg {
        None => Ok(Some(context)),
        Some(value) => Ok(nodeset_arg(name, Some(value))?.first().copied()),
    }
}

fn number_arg<D: DocumentAccess>(doc: &D, arg: Option<XPathValue>) -> f64 {
    arg.map_or(f64::NAN, |v| v.to_number(doc))
}

fn two_strings<D: DocumentAccess>(doc: &D, args: &mut impl Iterator<Item = XPathValue>) -> (String, String) {
    let a = args.next().map(|v| v.to_string_value(doc)).unwrap_or_default();
    let b = args.next().map(|v| v.to_string_value(doc)).unwrap_or_default();
    (a, b)
}

/// id(): whitespace-separated IDs, or the string-values of a node-set
fn fn_id<D: DocumentAccess>(doc: &D, arg: XPathValue) -> XPathValue {
    let tokens: Vec<String> = match &arg {
        XPathValue::NodeSet(nodes) => nodes.iter().map(|&n| doc.string_value(n)).collect(),
        other => vec![other.to_string_value(doc)],
    };

    let mut result: Vec<NodeId> = tokens
        .iter()
        .flat_map(|t| t.split_ascii_whitespace())
        .filter_map(|id| doc.element_by_id(id))
        .collect();
    result.sort_unstable();
    result.dedup();
    XPathValue::NodeSet(result)
}

/// lang(): nearest `xml:lang` (or HTML `lang`) on the context or an ancestor
fn fn_lang<D: DocumentAccess>(doc: &D, context: NodeId, lang: &str) -> bool {
    let html = doc.is_html();
    let mut current = Some(context);
    while let Some(id) = current {
        if doc.node_kind(id) == Some(NodeKind::Element) {
            let value = doc
                .get_attribute(id, "xml:lang")
                .or_else(|| if html { doc.get_attribute(id, "lang") } else { None });
            if let Some(value) = value {
                return value.eq_ignore_ascii_case(lang)
                    || (value.len() > lang.len()
                        && value.as_bytes()[lang.len()] == b'-'
                        && value[..lang.len()].eq_ignore_ascii_case(lang));
            }
        }
        current = doc.parent_of(id);
    }
    false
}

/// XPath substring(): 1-based, rounded positions, NaN selects nothing
fn substring(s: &str, start: f64, length: Option<f64>) -> String {
    let first = round(start);
    let end = match length {
        Some(len) => first + round(len),
        None => f64::INFINITY,
    };
    s.chars()
        .enumerate()
        .filter(|&(i, _)| {
            let pos = (i + 1) as f64;
            pos >= first && pos < end
        })
        .map(|(_, c)| c)
        .collect()
}

fn normalize_space(s: &str) -> String {
    s.split(|c: char| matches!(c, ' ' | '\t' | '\n' | '\r'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn translate(s: &str, from: &str, to: &str) -> String {
    let from: Vec<char> = from.chars().collect();
    let to: Vec<char> = to.chars().collect();
    s.chars()
        .filter_map(|c| match from.iter().position(|&f| f == c) {
            Some(idx) => to.get(idx).copied(),
            None => Some(c),
        })
        .collect()
}

/// XPath round(): half up, with NaN, infinities and negative zero kept
fn round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        n
    } else if (-0.5..0.0).contains(&n) {
        -0.0
    } else {
        (n + 0.5).floor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_rules() {
        assert_eq!(substring("12345", 2.0, Some(3.0)), "234");
        assert_eq!(substring("12345", 1.5, Some(2.6)), "234");
        assert_eq!(substring("12345", 0.0, Some(3.0)), "12");
        assert_eq!(substring("12345", f64::NAN, Some(3.0)), "");
        assert_eq!(substring("12345", 1.0, Some(f64::NAN)), "");
        assert_eq!(substring("12345", -42.0, Some(f64::INFINITY)), "12345");
        assert_eq!(substring("12345", f64::NEG_INFINITY, Some(f64::INFINITY)), "");
        assert_eq!(substring("héllo", 2.0, None), "éllo");
    }

    #[test]
    fn test_round() {
        assert_eq!(round(2.5), 3.0);
        assert_eq!(round(-2.5), -2.0);
        assert!(round(-0.2).is_sign_negative());
        assert!(round(f64::NAN).is_nan());
    }

    #[test]
    fn test_string_helpers() {
        assert_eq!(normalize_space("  a \n b\t\tc  "), "a b c");
        assert_eq!(translate("bar", "abc", "ABC"), "BAr");
        assert_eq!(translate("--aaa--", "abc-", "ABC"), "AAA");
    }

    #[test]
    fn test_arity() {
        assert!(check_arity("substring", 3).is_ok());
        assert!(check_arity("substring", 1).is_err());
        assert!(check_arity("concat", 5).is_ok());
        assert!(check_arity("position", 1).is_err());
        assert!(check_arity("frobnicate", 0).is_err());
    }
}
