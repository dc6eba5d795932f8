use serde::Serialize;

use crate::assets::{is_stylesheet, Chunk};
use crate::errors::Result;
use crate::extractor::ClassNameSet;
use crate::template::{FilenameTemplate, PathData};

/// Everything a filename template may refer to for one chunk
#[derive(Debug, Clone, Copy)]
pub struct NamingContext<'a> {
    /// Filename of the chunk's stylesheet
    pub css_filename: &'a str,
    pub content_hash: &'a str,
    pub chunk: &'a Chunk,
    /// Build-wide hash, if the host provides one
    pub full_hash: Option<&'a str>,
}

impl<'a> NamingContext<'a> {
    pub fn path_data(&self) -> PathData<'a> {
        PathData {
            filename: Some(self.css_filename),
            chunk_id: Some(self.chunk.id.as_str()),
            chunk_name: self.chunk.name.as_deref(),
            chunk_hash: self.chunk.hash.as_deref(),
            content_hash: Some(self.content_hash),
            full_hash: self.full_hash,
        }
    }
}

/// Manifest filename for a stylesheet when no template is configured:
/// a trailing `.css` (any case) becomes `.json`
pub fn default_output_filename(css_filename: &str) -> String {
    if is_stylesheet(css_filename) {
        format!("{}.json", &css_filename[..css_filename.len() - 4])
    } else {
        css_filename.to_string()
    }
}

/// Final path of the manifest for one chunk.
///
/// With a template, placeholders are substituted from `naming`. Without one,
/// the default `.css` -> `.json` rename applies and the content hash is not
/// used.
pub fn resolve_output_filename(
    naming: &NamingContext<'_>,
    template: Option<&FilenameTemplate>,
) -> Result<String> {
    match template {
        Some(template) => template.render(&naming.path_data()),
        None => Ok(default_output_filename(naming.css_filename)),
    }
}

/// A manifest ready to be registered with the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmittedManifest {
    pub chunk_id: String,
    /// Stylesheet the classes were read from
    pub css_file: String,
    /// Output asset name
    pub filename: String,
    pub classes: ClassNameSet,
}

impl EmittedManifest {
    /// UTF-8 JSON array of the class names
    pub fn content(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.classes)?)
    }
}
