use swc_core::common::SourceMap;
use swc_core::css::ast::{ClassSelector, Stylesheet};
use swc_core::css::visit::{Visit, VisitWith};
use std::sync::Arc;

/// A class selector token as it appears in the stylesheet source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassToken {
    /// Class name with CSS escapes decoded (`\32xl\:flex` is `2xl:flex`)
    pub name: String,
    /// Selector name as written, escapes intact (without the leading dot)
    pub raw: String,
    /// Line number in the stylesheet (1-indexed)
    pub line: usize,
    /// Column number in the stylesheet (0-indexed)
    pub column: usize,
}

/// Visitor that records every class selector in a stylesheet, in source order.
///
/// The default traversal descends into at-rule blocks, pseudo-class
/// arguments and every compound selector of a complex selector, so nested
/// occurrences are not skipped.
pub struct ClassSelectorCollector {
    tokens: Vec<ClassToken>,
    source_map: Arc<SourceMap>,
}

impl ClassSelectorCollector {
    pub fn new(source_map: Arc<SourceMap>) -> Self {
        Self {
            tokens: Vec::new(),
            source_map,
        }
    }

    pub fn into_tokens(self) -> Vec<ClassToken> {
        self.tokens
    }
}

impl Visit for ClassSelectorCollector {
    fn visit_class_selector(&mut self, node: &ClassSelector) {
        let name = node.text.value.to_string();
        let raw = node.text.raw.as_deref().map_or_else(|| name.clone(), str::to_string);
        let loc = self.source_map.lookup_char_pos(node.span.lo);

        self.tokens.push(ClassToken {
            name,
            raw,
            line: loc.line,
            column: loc.col_display,
        });
    }
}

/// Produce the sequence of class selector tokens of a parsed stylesheet
pub fn class_tokens(stylesheet: &Stylesheet, source_map: Arc<SourceMap>) -> Vec<ClassToken> {
    let mut collector = ClassSelectorCollector::new(source_map);
    stylesheet.visit_with(&mut collector);
    collector.into_tokens()
}

#[cfg(test)]
mod tests {
    use crate::extractor::parse_class_tokens;

    fn names(css: &str) -> Vec<(String, String)> {
        parse_class_tokens(css, "visitor.css")
            .unwrap()
            .tokens
            .into_iter()
            .map(|t| (t.name, t.raw))
            .collect()
    }

    #[test]
    fn test_character_escapes_decoded() {
        assert_eq!(
            names(r".sm\:hover\:bg-red {} .w-1\.5 {}"),
            vec![
                ("sm:hover:bg-red".to_string(), r"sm\:hover\:bg-red".to_string()),
                ("w-1.5".to_string(), r"w-1\.5".to_string()),
            ]
        );
    }

    #[test]
    fn test_hex_escapes_decoded() {
        let tokens = names(r".\32xl\:text-lg {} .\31 0 {} .foo\3A bar {}");
        let decoded: Vec<&str> = tokens.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(decoded, vec!["2xl:text-lg", "10", "foo:bar"]);
        assert_eq!(tokens[0].1, r"\32xl\:text-lg");
    }

    #[test]
    fn test_escaped_backslash_kept() {
        assert_eq!(names(r".a\\b {}")[0].0, r"a\b");
    }

    #[test]
    fn test_plain_name_unchanged() {
        assert_eq!(
            names(".btn-primary {}"),
            vec![("btn-primary".to_string(), "btn-primary".to_string())]
        );
    }
}
