//! Output path templates with bundler-style `[placeholder]` substitution.
//!
//! Templates are parsed once, when the plugin is configured, so an unknown
//! placeholder fails the build before any asset is processed. Rendering then
//! only fails when a known placeholder has no value for a given chunk.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::errors::{ManifestError, Result};

/// `[name]`, `[name:arg]` and the escaped `[\name\]` form
fn placeholder_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\[\\*([\w:]+)\\*\]").expect("valid placeholder regex"))
}

/// Recognized placeholders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// Full stylesheet filename including directory, query and the `.css`
    /// extension. Use `[path][name]` for a name without the extension.
    File,
    /// Query string of the filename, with the leading `?`
    Query,
    /// Fragment of the filename, with the leading `#`
    Fragment,
    /// Directory part of the filename, with a trailing `/`
    Path,
    /// Filename without directory
    Base,
    /// Chunk name, else chunk id, else the filename stem
    Name,
    /// Extension of the filename, with the leading `.`
    Ext,
    Id,
    ChunkHash,
    ContentHash,
    /// Build-wide hash; `[hash]` is accepted as an alias
    FullHash,
}

impl Placeholder {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "file" => Self::File,
            "query" => Self::Query,
            "fragment" => Self::Fragment,
            "path" => Self::Path,
            "base" => Self::Base,
            "name" => Self::Name,
            "ext" => Self::Ext,
            "id" => Self::Id,
            "chunkhash" => Self::ChunkHash,
            "contenthash" => Self::ContentHash,
            "fullhash" | "hash" => Self::FullHash,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Query => "query",
            Self::Fragment => "fragment",
            Self::Path => "path",
            Self::Base => "base",
            Self::Name => "name",
            Self::Ext => "ext",
            Self::Id => "id",
            Self::ChunkHash => "chunkhash",
            Self::ContentHash => "contenthash",
            Self::FullHash => "fullhash",
        }
    }

    /// Hash placeholders accept a length, e.g. `[contenthash:8]`
    pub fn is_hash(&self) -> bool {
        matches!(self, Self::ChunkHash | Self::ContentHash | Self::FullHash)
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder {
        kind: Placeholder,
        length: Option<usize>,
    },
}

/// A validated output filename template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl FilenameTemplate {
    /// Parse a template, rejecting unknown placeholders
    pub fn parse(template: &str) -> Result<Self> {
        if template.trim().is_empty() {
            return Err(ManifestError::config("outputFilename must not be empty"));
        }

        let mut segments = Vec::new();
        let mut last = 0;

        for caps in placeholder_regex().captures_iter(template) {
            let whole = caps.get(0).expect("match 0 always present");
            let contents = &caps[1];

            if whole.start() > last {
                segments.push(Segment::Literal(template[last..whole.start()].to_string()));
            }
            last = whole.end();

            let matched = whole.as_str();
            if contents.len() + 2 == matched.len() {
                segments.push(Self::parse_placeholder(matched, contents)?);
            } else if matched.starts_with("[\\") && matched.ends_with("\\]") {
                // `[\name\]` is the escape for a literal `[name]`
                segments.push(Segment::Literal(format!("[{}]", &matched[2..matched.len() - 2])));
            } else {
                return Err(ManifestError::config(format!(
                    "Malformed placeholder {} in outputFilename '{}'",
                    matched, template
                )));
            }
        }

        if last < template.len() {
            segments.push(Segment::Literal(template[last..].to_string()));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    fn parse_placeholder(matched: &str, contents: &str) -> Result<Segment> {
        let (name, arg) = match contents.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (contents, None),
        };

        let kind = Placeholder::from_name(name).ok_or_else(|| {
            ManifestError::config(format!("Unknown placeholder {} in outputFilename", matched))
        })?;

        let length = match arg {
            None => None,
            Some(_) if !kind.is_hash() => {
                return Err(ManifestError::config(format!(
                    "Placeholder {} does not take a length argument",
                    matched
                )))
            }
            Some(arg) => match arg.parse::<usize>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    return Err(ManifestError::config(format!(
                        "Invalid length in placeholder {}: expected a positive number",
                        matched
                    )))
                }
            },
        };

        Ok(Segment::Placeholder { kind, length })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholders used by this template, in order of appearance
    pub fn placeholders(&self) -> impl Iterator<Item = Placeholder> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder { kind, .. } => Some(*kind),
            Segment::Literal(_) => None,
        })
    }

    pub fn uses(&self, placeholder: Placeholder) -> bool {
        self.placeholders().any(|p| p == placeholder)
    }

    /// Substitute every placeholder from `data`
    pub fn render(&self, data: &PathData<'_>) -> Result<String> {
        let mut out = String::with_capacity(self.source.len() + 32);

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder { kind, length } => {
                    let value = data.value_of(*kind).ok_or_else(|| ManifestError::TemplateError {
                        placeholder: kind.to_string(),
                        chunk: data.chunk_label().to_string(),
                        message: format!("no value available in template '{}'", self.source),
                    })?;
                    match length {
                        Some(n) => out.extend(value.chars().take(*n)),
                        None => out.push_str(&value),
                    }
                }
            }
        }

        Ok(out)
    }
}

impl fmt::Display for FilenameTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Values available to a template
#[derive(Debug, Clone, Default)]
pub struct PathData<'a> {
    pub filename: Option<&'a str>,
    pub chunk_id: Option<&'a str>,
    pub chunk_name: Option<&'a str>,
    pub chunk_hash: Option<&'a str>,
    pub content_hash: Option<&'a str>,
    pub full_hash: Option<&'a str>,
}

/// Split of a filename into its templating parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileParts<'a> {
    pub path: &'a str,
    pub base: &'a str,
    pub name: &'a str,
    pub ext: &'a str,
    pub query: &'a str,
    pub fragment: &'a str,
}

impl<'a> FileParts<'a> {
    pub fn parse(file: &'a str) -> Self {
        let (rest, fragment) = match file.find('#') {
            Some(i) => (&file[..i], &file[i..]),
            None => (file, ""),
        };
        let (resource, query) = match rest.find('?') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };
        let (path, base) = match resource.rfind('/') {
            Some(i) => (&resource[..=i], &resource[i + 1..]),
            None => ("", resource),
        };
        // A leading dot names a hidden file, not an extension
        let (name, ext) = match base.rfind('.') {
            Some(i) if i > 0 => (&base[..i], &base[i..]),
            _ => (base, ""),
        };

        Self {
            path,
            base,
            name,
            ext,
            query,
            fragment,
        }
    }
}

impl<'a> PathData<'a> {
    fn chunk_label(&self) -> &str {
        self.chunk_name.or(self.chunk_id).unwrap_or("<none>")
    }

    fn value_of(&self, placeholder: Placeholder) -> Option<String> {
        let file = self.filename.map(FileParts::parse);

        let value = match placeholder {
            Placeholder::File => self.filename?,
            Placeholder::Query => file?.query,
            Placeholder::Fragment => file?.fragment,
            Placeholder::Path => file?.path,
            Placeholder::Base => file?.base,
            Placeholder::Ext => file?.ext,
            Placeholder::Name => match self.chunk_name.or(self.chunk_id) {
                Some(name) => name,
                None => file?.name,
            },
            Placeholder::Id => self.chunk_id?,
            Placeholder::ChunkHash => self.chunk_hash?,
            Placeholder::ContentHash => self.content_hash?,
            Placeholder::FullHash => self.full_hash?,
        };

        Some(value.to_string())
    }
}
