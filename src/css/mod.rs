//! CSS Selectors
//!
//! Selectors are translated to XPath 1.0 and run on the XPath engine, so a
//! CSS query sees exactly the same nodes, namespaces and ordering rules as
//! the equivalent hand-written expression.
//!
//! Supported: type and universal selectors (with `ns|`), `#id`, `.class`,
//! attribute selectors (`[a]`, `=`, `~=`, `^=`, `$=`, `*=`, `|=`), the four
//! combinators, selector groups, the structural pseudo-classes, `:not()`
//! over a compound selector and `:contains()`.

pub mod parser;
pub mod translate;

/// Translate a selector (or a comma-separated group) to XPath
pub fn to_xpath(selector: &str) -> Result<String, String> {
    let group = parser::parse(selector)?;
    translate::translate(&group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DocumentAccess, OwnedXmlDocument, PrefixRegistry};
    use crate::options::ParseOptions;
    use crate::xpath::evaluate;

    const SAMPLE: &str = r#"<shop>
        <list id="fruit" class="items  featured">
            <item lang="en-GB" sku="a-100">apple</item>
            <item sku="b-200" class="sale">banana</item>
            <note>seasonal</note>
            <item sku="c-300">cherry</item>
            <empty/>
        </list>
        <list id="veg"><item>kale</item></list>
    </shop>"#;

    fn select(doc: &OwnedXmlDocument, selector: &str) -> Vec<String> {
        select_with(doc, &PrefixRegistry::new(), selector)
    }

    fn select_with(doc: &OwnedXmlDocument, prefixes: &PrefixRegistry, selector: &str) -> Vec<String> {
        let xpath = to_xpath(selector).unwrap();
        let result = evaluate(doc, prefixes, &xpath).unwrap();
        result
            .as_nodeset()
            .unwrap()
            .iter()
            .map(|&n| doc.string_value(n).trim().to_string())
            .collect()
    }

    fn sample() -> OwnedXmlDocument {
        OwnedXmlDocument::parse(SAMPLE.as_bytes(), &ParseOptions::xml()).unwrap()
    }

    #[test]
    fn test_type_id_and_class() {
        let doc = sample();
        assert_eq!(select(&doc, "item").len(), 4);
        assert_eq!(select(&doc, "#veg item"), vec!["kale"]);
        assert_eq!(select(&doc, ".sale"), vec!["banana"]);
        assert_eq!(select(&doc, "list.featured > note"), vec!["seasonal"]);
        assert!(select(&doc, ".item").is_empty());
    }

    #[test]
    fn test_attribute_operators() {
        let doc = sample();
        assert_eq!(select(&doc, "[sku]").len(), 3);
        assert_eq!(select(&doc, "[sku='b-200']"), vec!["banana"]);
        assert_eq!(select(&doc, "[sku^=c]"), vec!["cherry"]);
        assert_eq!(select(&doc, "[sku$='100']"), vec!["apple"]);
        assert_eq!(select(&doc, "[sku*='-2']"), vec!["banana"]);
        assert_eq!(select(&doc, "[lang|=en]"), vec!["apple"]);
        assert_eq!(select(&doc, "list[class~=featured]").len(), 1);
        assert!(select(&doc, "[sku^='']").is_empty());
    }

    #[test]
    fn test_sibling_combinators() {
        let doc = sample();
        assert_eq!(select(&doc, "item + item"), vec!["banana"]);
        assert_eq!(select(&doc, "note ~ item"), vec!["cherry"]);
        assert_eq!(select(&doc, "note + *"), vec!["cherry"]);
    }

    #[test]
    fn test_structural_pseudo_classes() {
        let doc = sample();
        assert_eq!(select(&doc, "item:first-child"), vec!["apple", "kale"]);
        assert_eq!(select(&doc, "#fruit > :last-child").len(), 1);
        assert_eq!(select(&doc, "item:only-child"), vec!["kale"]);
        assert_eq!(select(&doc, "#fruit item:last-of-type"), vec!["cherry"]);
        assert_eq!(select(&doc, "#fruit > :nth-child(2n+1)"), vec!["apple", "seasonal", ""]);
        assert_eq!(select(&doc, "#fruit > :nth-child(even)"), vec!["banana", "cherry"]);
        assert_eq!(select(&doc, "#fruit item:nth-of-type(3)"), vec!["cherry"]);
        assert_eq!(select(&doc, "#fruit > :nth-last-child(1)").len(), 1);
        assert_eq!(select(&doc, "#fruit > :nth-child(-n+2)"), vec!["apple", "banana"]);
        assert_eq!(select(&doc, ":empty").len(), 1);
        assert_eq!(select(&doc, ":root").len(), 1);
    }

    #[test]
    fn test_not_and_contains() {
        let doc = sample();
        assert_eq!(select(&doc, "#fruit item:not(.sale)"), vec!["apple", "cherry"]);
        assert_eq!(select(&doc, "#fruit > :not(item)"), vec!["seasonal", ""]);
        assert_eq!(select(&doc, "item:contains('an')"), vec!["banana"]);
    }

    #[test]
    fn test_groups_are_in_document_order() {
        let doc = sample();
        assert_eq!(select(&doc, "note, item:first-child"), vec!["apple", "seasonal", "kale"]);
    }

    #[test]
    fn test_namespaced_types() {
        let doc = OwnedXmlDocument::parse(
            br#"<r xmlns:a="urn:a"><a:x>1</a:x><x>2</x></r>"#,
            &ParseOptions::xml(),
        )
        .unwrap();
        let mut prefixes = PrefixRegistry::new();
        prefixes.define("n", "urn:a");
        assert_eq!(select_with(&doc, &prefixes, "n|x"), vec!["1"]);
        assert_eq!(select_with(&doc, &prefixes, "*|x"), vec!["1", "2"]);
        assert_eq!(select_with(&doc, &prefixes, "x"), vec!["2"]);
        assert!(select_with(&doc, &PrefixRegistry::new(), "n|x").is_empty());
    }

    #[test]
    fn test_html_is_case_insensitive() {
        let doc = OwnedXmlDocument::parse(
            b"<html><body><DIV Class=\"a\"><p>x</p></DIV></body></html>",
            &ParseOptions::html(),
        )
        .unwrap();
        assert_eq!(select(&doc, "div.a > P"), vec!["x"]);
    }

    #[test]
    fn test_errors() {
        assert!(to_xpath("").is_err());
        assert!(to_xpath("a >> b").is_err());
        assert!(to_xpath("a:hover").unwrap_err().contains("hover"));
        assert!(to_xpath(":nth-of-type(2)").is_err());
        assert!(to_xpath(&format!("{}r{}", ":not(".repeat(20_000), ")".repeat(20_000))).is_err());
    }

    #[test]
    fn test_extreme_nth_offsets() {
        let doc = sample();
        assert_eq!(select(&doc, "item:nth-child(n-9223372036854775806)").len(), 4);
        assert!(to_xpath("item:nth-child(n-9223372036854775807)").is_err());
        assert!(to_xpath("a:nth-child(-9223372036854775808n)").is_err());
    }
}
