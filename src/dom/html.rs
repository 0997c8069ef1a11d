//! HTML tree-construction rules
//!
//! A small subset of the HTML parsing algorithm: void elements and the
//! implied end tags that keep `<p>`, `<li>`, table cells and friends from
//! nesting inside each other.

/// Elements that never have content or an end tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text content is written out unescaped
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Start tags that close an open `<p>`
const CLOSES_P: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "dialog", "div", "dl", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hgroup",
    "hr", "main", "menu", "nav", "ol", "p", "pre", "section", "table", "ul",
];

/// Elements that bound the search for an element to close implicitly
const SCOPE_BOUNDARY: &[&str] = &[
    "applet", "button", "caption", "html", "marquee", "object", "table", "td", "template", "th",
];

#[inline]
pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

#[inline]
pub fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

/// Index in `open` (names of open elements, outermost first) of the element
/// that opening `tag` closes implicitly. Everything from that index up is
/// closed before `tag` is inserted.
pub fn implied_close(open: &[&str], tag: &str) -> Option<usize> {
    // Table sections only look as far as their own table
    let (targets, boundaries, scoped): (&[&str], &[&str], bool) = match tag {
        "li" => (&["li"], &["ul", "ol", "menu"], true),
        "dt" | "dd" => (&["dt", "dd"], &["dl"], true),
        "option" => (&["option"], &["select", "datalist", "optgroup"], true),
        "optgroup" => (&["optgroup", "option"], &["select"], true),
        "tr" => (&["tr"], &["table", "tbody", "thead", "tfoot"], false),
        "td" | "th" => (&["td", "th"], &["tr", "table"], false),
        "tbody" | "thead" | "tfoot" => (&["tbody", "thead", "tfoot"], &["table"], false),
        _ if CLOSES_P.contains(&tag) => (&["p"], &[], true),
        _ => return None,
    };

    for (idx, name) in open.iter().enumerate().rev() {
        if targets.contains(name) {
            return Some(idx);
        }
        if boundaries.contains(name) || (scoped && SCOPE_BOUNDARY.contains(name)) {
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_void_and_raw() {
        assert!(is_void("br"));
        assert!(!is_void("div"));
        assert!(is_raw_text("script"));
    }

    #[test]
    fn test_paragraphs_close_on_block_start() {
        assert_eq!(implied_close(&["body", "p"], "p"), Some(1));
        assert_eq!(implied_close(&["body", "p", "b"], "div"), Some(1));
        assert_eq!(implied_close(&["body", "p"], "span"), None);
        // A table cell is a boundary
        assert_eq!(implied_close(&["p", "table", "tr", "td"], "div"), None);
    }

    #[test]
    fn test_list_items_and_cells() {
        assert_eq!(implied_close(&["ul", "li"], "li"), Some(1));
        assert_eq!(implied_close(&["ul", "li", "ul"], "li"), None);
        assert_eq!(implied_close(&["table", "tr", "td"], "td"), Some(2));
        assert_eq!(implied_close(&["table", "tr", "td"], "tr"), Some(1));
        assert_eq!(implied_close(&["dl", "dt"], "dd"), Some(1));
        assert_eq!(implied_close(&["ul", "li", "table", "tr", "td"], "li"), None);
        assert_eq!(implied_close(&["select", "option"], "option"), Some(1));
    }
}
