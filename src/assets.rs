//! The slice of the host build that manifest emission needs: chunks, their
//! entrypoints, and a store of named output assets.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::{ManifestError, Result};

/// One output chunk of the build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Chunk hash as computed by the host, for `[chunkhash]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    /// Output filenames in the order the host registered them
    #[serde(default)]
    pub files: Vec<String>,

    /// Class manifest registered for this chunk by an earlier run; it is a
    /// member of `files` but not part of the chunk's content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
}

impl Chunk {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            hash: None,
            files: Vec::new(),
            manifest: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files.extend(files.into_iter().map(Into::into));
        self
    }

    /// The chunk's stylesheet: its first file ending in `.css`, any case
    pub fn stylesheet(&self) -> Option<&str> {
        self.files
            .iter()
            .map(String::as_str)
            .find(|f| is_stylesheet(f))
    }

    /// Record a new member file; the file list behaves as a set
    pub fn add_file(&mut self, filename: &str) {
        if !self.files.iter().any(|f| f == filename) {
            self.files.push(filename.to_string());
        }
    }

    /// Files whose bytes make up the chunk's content hash
    pub fn content_files(&self) -> Vec<&str> {
        self.files
            .iter()
            .map(String::as_str)
            .filter(|f| self.manifest.as_deref() != Some(*f))
            .collect()
    }

    /// Record `filename` as the chunk's manifest, replacing an earlier one
    pub fn set_manifest(&mut self, filename: &str) {
        if let Some(previous) = self.manifest.take() {
            if previous != filename {
                self.files.retain(|f| *f != previous);
            }
        }
        self.add_file(filename);
        self.manifest = Some(filename.to_string());
    }

    /// Human-readable identity used in diagnostics
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

pub(crate) fn is_stylesheet(filename: &str) -> bool {
    filename.len() >= 4
        && filename.is_char_boundary(filename.len() - 4)
        && filename[filename.len() - 4..].eq_ignore_ascii_case(".css")
}

/// A named entry point and the chunks it loads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrypoint {
    pub name: String,
    #[serde(default)]
    pub chunks: Vec<Chunk>,
}

/// The build's chunk graph as seen after assets are finalized
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildGraph {
    /// Build-wide hash, for `[fullhash]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_hash: Option<String>,

    #[serde(default)]
    pub entrypoints: Vec<Entrypoint>,
}

impl BuildGraph {
    /// Load a graph description from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ManifestError::config(format!("Failed to read build graph {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            ManifestError::config(format!("Failed to parse build graph {}: {}", path.display(), e))
        })
    }

    /// Entry chunks across all entrypoints, each chunk id once, first seen first
    pub fn entry_chunks(&self) -> Vec<&Chunk> {
        let mut seen = IndexSet::new();
        self.entrypoints
            .iter()
            .flat_map(|entry| entry.chunks.iter())
            .filter(|chunk| seen.insert(chunk.id.as_str()))
            .collect()
    }

    /// Record `filename` as the manifest of every occurrence of chunk `chunk_id`
    pub fn set_chunk_manifest(&mut self, chunk_id: &str, filename: &str) {
        for chunk in self.chunks_mut(chunk_id) {
            chunk.set_manifest(filename);
        }
    }

    /// Manifests recorded by earlier runs, keyed by chunk id
    pub fn recorded_manifests(&self) -> IndexMap<&str, &str> {
        self.entrypoints
            .iter()
            .flat_map(|entry| entry.chunks.iter())
            .filter_map(|chunk| Some((chunk.id.as_str(), chunk.manifest.as_deref()?)))
            .collect()
    }

    fn chunks_mut<'a>(&'a mut self, chunk_id: &'a str) -> impl Iterator<Item = &'a mut Chunk> + 'a {
        self.entrypoints
            .iter_mut()
            .flat_map(|entry| entry.chunks.iter_mut())
            .filter(move |chunk| chunk.id == chunk_id)
    }
}

/// Read access to the build's output assets
pub trait AssetSource {
    /// Current bytes of the named asset, if it exists
    fn source(&self, filename: &str) -> Option<Cow<'_, [u8]>>;
}

/// Write access to the build's output assets
pub trait AssetSink {
    /// Register a new asset. Emitting different bytes under a name that is
    /// already taken is an error; re-emitting identical bytes is not.
    fn emit_asset(&mut self, filename: &str, content: Vec<u8>) -> Result<()>;
}

/// Asset store held in memory, in insertion order
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    assets: IndexMap<String, Vec<u8>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an asset
    pub fn insert(&mut self, filename: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.assets.insert(filename.into(), content.into());
    }

    pub fn get(&self, filename: &str) -> Option<&[u8]> {
        self.assets.get(filename).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.assets.keys().map(String::as_str)
    }
}

impl AssetSource for MemoryAssets {
    fn source(&self, filename: &str) -> Option<Cow<'_, [u8]>> {
        self.get(filename).map(Cow::Borrowed)
    }
}

impl AssetSink for MemoryAssets {
    fn emit_asset(&mut self, filename: &str, content: Vec<u8>) -> Result<()> {
        match self.assets.get(filename) {
            Some(existing) if *existing != content => Err(ManifestError::AssetConflict {
                filename: filename.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.assets.insert(filename.to_string(), content);
                Ok(())
            }
        }
    }
}

/// Asset store backed by a build output directory.
///
/// Files already on disk belong to earlier runs and are overwritten; the
/// write-once rule covers names emitted through this store.
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    root: PathBuf,
    emitted: IndexSet<String>,
}

impl DirectoryAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            emitted: IndexSet::new(),
        }
    }

    /// Names emitted through this store so far
    pub fn emitted(&self) -> impl Iterator<Item = &str> {
        self.emitted.iter().map(String::as_str)
    }

    /// Delete a leftover asset from an earlier run. Names emitted through
    /// this store and missing files are left alone.
    pub fn remove_stale(&self, filename: &str) -> Result<bool> {
        if self.emitted.contains(filename) {
            return Ok(false);
        }
        match fs::remove_file(self.path_of(filename)?) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of an asset name; asset names never escape the root
    pub fn path_of(&self, filename: &str) -> Result<PathBuf> {
        let relative = Path::new(filename);
        let escapes = relative.components().any(|c| {
            !matches!(c, std::path::Component::Normal(_) | std::path::Component::CurDir)
        });
        if escapes {
            return Err(ManifestError::OutputError {
                path: filename.to_string(),
                message: "asset name must be a relative path inside the output directory"
                    .to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl AssetSource for DirectoryAssets {
    fn source(&self, filename: &str) -> Option<Cow<'_, [u8]>> {
        let path = self.path_of(filename).ok()?;
        fs::read(path).ok().map(Cow::Owned)
    }
}

impl AssetSink for DirectoryAssets {
    fn emit_asset(&mut self, filename: &str, content: Vec<u8>) -> Result<()> {
        let path = self.path_of(filename)?;

        if self.emitted.contains(filename) {
            if fs::read(&path)? == content {
                return Ok(());
            }
            return Err(ManifestError::AssetConflict {
                filename: filename.to_string(),
            });
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        write_atomic(&path, &content).map_err(|e| ManifestError::OutputError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        self.emitted.insert(filename.to_string());
        Ok(())
    }
}

/// Write file atomically by writing to temp file then renaming
pub fn write_atomic<P: AsRef<Path>>(path: P, content: &[u8]) -> std::io::Result<()> {
    let path = path.as_ref();
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let mut file = fs::File::create(&temp_path)?;
    file.write_all(content)?;
    file.sync_all()?;

    fs::rename(&temp_path, path)?;

    Ok(())
}
