//! Selector to XPath Translation
//!
//! Each selector in a group becomes one location path rooted at
//! `descendant-or-self::`, and the group becomes their union. The generated
//! expressions only use XPath 1.0 core functions so they run on the same
//! engine as hand-written queries.

use super::parser::{
    AttrOp, Combinator, ComplexSelector, Compound, Filter, NamespaceSelector, Nth, Pseudo, SelectorGroup,
    TypeSelector,
};

/// Translate a parsed group
pub fn translate(group: &SelectorGroup) -> Result<String, String> {
    let paths = group.0.iter().map(translate_complex).collect::<Result<Vec<_>, _>>()?;
    Ok(paths.join(" | "))
}

fn translate_complex(selector: &ComplexSelector) -> Result<String, String> {
    let mut xpath = String::from("descendant-or-self::");
    xpath.push_str(&translate_compound(&selector.first)?);

    for (combinator, compound) in &selector.rest {
        xpath.push_str(match combinator {
            Combinator::Descendant => "/descendant::",
            Combinator::Child => "/",
            Combinator::Adjacent => "/following-sibling::*[1]/self::",
            Combinator::Sibling => "/following-sibling::",
        });
        xpath.push_str(&translate_compound(compound)?);
    }
    Ok(xpath)
}

/// Node test followed by one predicate per condition
fn translate_compound(compound: &Compound) -> Result<String, String> {
    let (test, mut conditions) = type_test(&compound.element);
    let of_type = of_type_step(&compound.element);
    conditions.extend(filter_conditions(&compound.filters, of_type.as_deref())?);

    let mut step = test;
    for condition in conditions {
        step.push('[');
        step.push_str(&condition);
        step.push(']');
    }
    Ok(step)
}

/// Name test plus any condition the name test alone cannot express
fn type_test(element: &TypeSelector) -> (String, Vec<String>) {
    let name = element.name.as_deref();
    match (&element.namespace, name) {
        (NamespaceSelector::Default | NamespaceSelector::Any, None) => ("*".to_string(), Vec::new()),
        (NamespaceSelector::Default | NamespaceSelector::None, Some(name)) => (name.to_string(), Vec::new()),
        (NamespaceSelector::Any, Some(name)) => {
            ("*".to_string(), vec![format!("local-name() = {}", literal(name))])
        }
        (NamespaceSelector::None, None) => ("*".to_string(), vec!["namespace-uri() = ''".to_string()]),
        (NamespaceSelector::Prefix(prefix), Some(name)) => (format!("{}:{}", prefix, name), Vec::new()),
        (NamespaceSelector::Prefix(prefix), None) => (format!("{}:*", prefix), Vec::new()),
    }
}

/// Sibling step selecting elements of the same type, if the type is named
fn of_type_step(element: &TypeSelector) -> Option<String> {
    element.name.as_ref()?;
    let (test, conditions) = type_test(element);
    Some(
        conditions
            .iter()
            .fold(test, |step, condition| format!("{}[{}]", step, condition)),
    )
}

fn filter_conditions(filters: &[Filter], of_type: Option<&str>) -> Result<Vec<String>, String> {
    filters.iter().map(|filter| filter_condition(filter, of_type)).collect()
}

fn filter_condition(filter: &Filter, of_type: Option<&str>) -> Result<String, String> {
    let condition = match filter {
        Filter::Id(id) => format!("@id = {}", literal(id)),
        Filter::Class(class) => format!(
            "@class and contains(concat(' ', normalize-space(@class), ' '), {})",
            literal(&format!(" {} ", class))
        ),
        Filter::Attribute { prefix, name, matcher } => {
            let attr = match prefix {
                Some(prefix) => format!("@{}:{}", prefix, name),
                None => format!("@{}", name),
            };
            match matcher {
                None => attr,
                Some((op, value)) => attribute_condition(&attr, *op, value),
            }
        }
        Filter::Pseudo(pseudo) => pseudo_condition(pseudo, of_type)?,
        Filter::Not(inner) => {
            let (test, mut conditions) = type_test(&inner.element);
            if test != "*" {
                conditions.insert(0, format!("self::{}", test));
            }
            let inner_type = of_type_step(&inner.element);
            conditions.extend(filter_conditions(&inner.filters, inner_type.as_deref().or(of_type))?);
            match conditions.len() {
                0 => "not(self::*)".to_string(),
                1 => format!("not({})", conditions[0]),
                _ => format!("not(({}))", conditions.join(") and (")),
            }
        }
    };
    Ok(condition)
}

fn attribute_condition(attr: &str, op: AttrOp, value: &str) -> String {
    let lit = literal(value);
    match op {
        AttrOp::Equals => format!("{} = {}", attr, lit),
        // Empty or whitespace-bearing words can never match a token
        AttrOp::Includes if value.is_empty() || value.contains(char::is_whitespace) => "false()".to_string(),
        AttrOp::Includes => format!(
            "{attr} and contains(concat(' ', normalize-space({attr}), ' '), {})",
            literal(&format!(" {} ", value))
        ),
        AttrOp::Prefix | AttrOp::Suffix | AttrOp::Substring if value.is_empty() => "false()".to_string(),
        AttrOp::Prefix => format!("{attr} and starts-with({attr}, {lit})"),
        AttrOp::Suffix => format!(
            "{attr} and substring({attr}, string-length({attr}) - {} + 1) = {lit}",
            value.chars().count()
        ),
        AttrOp::Substring => format!("{attr} and contains({attr}, {lit})"),
        AttrOp::DashMatch => format!(
            "{attr} and ({attr} = {lit} or starts-with({attr}, {}))",
            literal(&format!("{}-", value))
        ),
    }
}

fn pseudo_condition(pseudo: &Pseudo, of_type: Option<&str>) -> Result<String, String> {
    let typed = |what: &str| {
        of_type.ok_or_else(|| format!("':{}' needs an element name, as in 'p:{}'", what, what))
    };
    let condition = match pseudo {
        Pseudo::FirstChild => "not(preceding-sibling::*)".to_string(),
        Pseudo::LastChild => "not(following-sibling::*)".to_string(),
        Pseudo::OnlyChild => "not(preceding-sibling::*) and not(following-sibling::*)".to_string(),
        Pseudo::FirstOfType => format!("not(preceding-sibling::{})", typed("first-of-type")?),
        Pseudo::LastOfType => format!("not(following-sibling::{})", typed("last-of-type")?),
        Pseudo::OnlyOfType => {
            let step = typed("only-of-type")?;
            format!("not(preceding-sibling::{step}) and not(following-sibling::{step})")
        }
        Pseudo::NthChild(nth) => nth_condition("preceding-sibling::*", *nth)?,
        Pseudo::NthLastChild(nth) => nth_condition("following-sibling::*", *nth)?,
        Pseudo::NthOfType(nth) => nth_condition(&format!("preceding-sibling::{}", typed("nth-of-type")?), *nth)?,
        Pseudo::NthLastOfType(nth) => {
            nth_condition(&format!("following-sibling::{}", typed("nth-last-of-type")?), *nth)?
        }
        Pseudo::Empty => "not(*) and not(text())".to_string(),
        Pseudo::Root => "not(parent::*)".to_string(),
        Pseudo::Contains(text) => format!("contains(string(.), {})", literal(text)),
    };
    Ok(condition)
}

/// Position (1-based, counted along `siblings`) equals `a*n + b` for some n >= 0
fn nth_condition(siblings: &str, nth: Nth) -> Result<String, String> {
    let out_of_range = || format!("Invalid nth expression '{}n{:+}': out of range", nth.a, nth.b);
    let count = format!("count({})", siblings);
    // position - b == count - (b - 1)
    let offset = nth.b.checked_sub(1).ok_or_else(out_of_range)?;

    if nth.a == 0 {
        return Ok(if nth.b < 1 {
            "false()".to_string()
        } else {
            format!("{} = {}", count, offset)
        });
    }

    let diff = match offset {
        0 => count,
        o if o > 0 => format!("({} - {})", count, o),
        o => format!("({} + {})", count, o.checked_neg().ok_or_else(out_of_range)?),
    };
    let sign = if nth.a > 0 { ">=" } else { "<=" };
    let step = nth.a.checked_abs().ok_or_else(out_of_range)?;
    Ok(if step == 1 {
        format!("{} {} 0", diff, sign)
    } else {
        format!("{diff} {sign} 0 and {diff} mod {step} = 0")
    })
}

/// Quote a string as an XPath literal
fn literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{}'", s)
    } else if !s.contains('"') {
        format!("\"{}\"", s)
    } else {
        let parts: Vec<String> = s.split('\'').map(|part| format!("'{}'", part)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}
