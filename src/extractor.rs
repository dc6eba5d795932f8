use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use swc_core::common::{FileName, Globals, SourceMap, GLOBALS};
use swc_core::css::ast::Stylesheet;
use swc_core::css::parser::parse_file;
use swc_core::css::parser::parser::ParserConfig;
use tracing::{debug, warn};

use crate::ast_visitor::{class_tokens, ClassToken};
use crate::errors::{ManifestError, Result};

/// Distinct, unescaped class names in first-occurrence order.
///
/// Serializes as a flat JSON array of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassNameSet(IndexSet<String>);

impl ClassNameSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, class: &str) -> bool {
        self.0.contains(class)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Class names as an owned sequence, ready for serialization
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }

    /// Compact JSON array, e.g. `["btn","btn-primary"]`
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl FromIterator<String> for ClassNameSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ClassNameSet {
    type Item = &'a String;
    type IntoIter = indexmap::set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Fold a token sequence into the set of decoded class names
pub fn collect_class_names<'a, I>(tokens: I) -> ClassNameSet
where
    I: IntoIterator<Item = &'a ClassToken>,
{
    tokens.into_iter().map(|token| token.name.clone()).collect()
}

/// Class selector tokens of a stylesheet plus the errors the parser recovered from
#[derive(Debug, Clone, Default)]
pub struct TokenScan {
    pub tokens: Vec<ClassToken>,
    /// Rules affected by these errors keep no selector tree
    pub recovered_errors: Vec<String>,
}

/// Parse CSS content and return the class selector tokens in source order
pub fn parse_class_tokens(content: &str, source_name: &str) -> Result<TokenScan> {
    // Create source map
    let source_map = Arc::new(SourceMap::default());
    let source_file = source_map.new_source_file(
        FileName::Custom(source_name.to_string()).into(),
        content.to_string(),
    );

    let mut errors = vec![];

    // Parse the stylesheet
    let stylesheet: Stylesheet = GLOBALS.set(&Globals::new(), || {
        parse_file(&source_file, None, ParserConfig::default(), &mut errors).map_err(|e| {
            ManifestError::ParseError {
                path: source_name.to_string(),
                message: format!("{:?}", e),
            }
        })
    })?;

    let recovered_errors: Vec<String> = errors.iter().map(|e| format!("{:?}", e)).collect();
    for error in &recovered_errors {
        debug!(source = source_name, "recovered CSS parse error: {}", error);
    }

    Ok(TokenScan {
        tokens: class_tokens(&stylesheet, source_map),
        recovered_errors,
    })
}

/// Extract the distinct class names referenced by a stylesheet
pub fn extract_class_names(content: &str) -> Result<ClassNameSet> {
    extract_class_names_from(content, "stylesheet.css", false)
}

/// Like [`extract_class_names`], naming the source in diagnostics.
///
/// With `strict`, any error the parser had to recover from fails the
/// extraction instead of yielding a possibly incomplete set.
pub fn extract_class_names_from(content: &str, source_name: &str, strict: bool) -> Result<ClassNameSet> {
    let scan = parse_class_tokens(content, source_name)?;

    if let Some(first) = scan.recovered_errors.first() {
        if strict {
            return Err(ManifestError::ParseError {
                path: source_name.to_string(),
                message: format!(
                    "{} ({} error(s) in total)",
                    first,
                    scan.recovered_errors.len()
                ),
            });
        }
        // Rules the parser skipped contribute no classes
        warn!(
            source = source_name,
            errors = scan.recovered_errors.len(),
            "stylesheet has parse errors, class list may be incomplete: {}",
            first
        );
    }

    let classes = collect_class_names(&scan.tokens);

    debug!(
        source = source_name,
        occurrences = scan.tokens.len(),
        unique = classes.len(),
        "extracted class selectors"
    );

    Ok(classes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_rules() {
        let classes = extract_class_names(".btn{color:red} .btn-primary{color:blue}").unwrap();
        assert_eq!(classes.to_vec(), vec!["btn", "btn-primary"]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let classes = extract_class_names(".a{} .b{} .a{}").unwrap();
        assert_eq!(classes.to_vec(), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_stylesheet() {
        let classes = extract_class_names("").unwrap();
        assert!(classes.is_empty());
    }

    #[test]
    fn test_selector_without_class() {
        let classes = extract_class_names("div > p { margin: 0 } #main { color: red }").unwrap();
        assert!(classes.is_empty());
    }

    #[test]
    fn test_token_locations() {
        let scan = parse_class_tokens(".a {}\n  .b {}", "test.css").unwrap();
        let tokens = scan.tokens;
        assert!(scan.recovered_errors.is_empty());
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[1].column, 2);
    }

    #[test]
    fn test_escape_variants_collapse() {
        let classes = extract_class_names(r".md\:flex{} .md\:flex:hover{}").unwrap();
        assert_eq!(classes.to_vec(), vec!["md:flex"]);
    }

    #[test]
    fn test_strict_rejects_recovered_errors() {
        let css = ".ok{} ..broken{color:red}";

        let lenient = extract_class_names_from(css, "broken.css", false).unwrap();
        assert!(lenient.contains("ok"));

        let err = extract_class_names_from(css, "broken.css", true).unwrap_err();
        assert!(err.to_string().contains("broken.css"), "{}", err);
    }

    #[test]
    fn test_stray_brace_is_reported_not_hidden() {
        let css = "a { color: red } } .late {}";

        let scan = parse_class_tokens(css, "stray.css").unwrap();
        assert!(!scan.recovered_errors.is_empty());

        // Lenient mode still yields a (partial) result, strict mode refuses it
        assert!(extract_class_names_from(css, "stray.css", false).is_ok());
        assert!(matches!(
            extract_class_names_from(css, "stray.css", true),
            Err(ManifestError::ParseError { .. })
        ));
    }

    #[test]
    fn test_hex_and_character_escapes_collapse() {
        let classes = extract_class_names(r".\32xl\:text-lg{} .foo\:bar{} .foo\3A bar{} .\32 xl\3a text-lg{}").unwrap();
        assert_eq!(classes.to_vec(), vec!["2xl:text-lg", "foo:bar"]);
    }

    #[test]
    fn test_json_is_flat_array() {
        let classes = extract_class_names(".x{} .y{}").unwrap();
        assert_eq!(classes.to_json().unwrap(), r#"["x","y"]"#);
    }
}
