use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::assets::{AssetSink, AssetSource, BuildGraph, Chunk};
use crate::config::{ParseErrorPolicy, PluginOptions};
use crate::errors::{ManifestError, Result};
use crate::extractor::{extract_class_names_from, ClassNameSet};
use crate::hashing::{compute_hash, HashConfig};
use crate::manifest::{resolve_output_filename, EmittedManifest, NamingContext};
use crate::template::FilenameTemplate;

/// Why a chunk produced no manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The chunk has no stylesheet
    NoStylesheet,
    /// The stylesheet could not be parsed and the policy is `skip`
    ParseError(String),
}

/// Result of processing one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    Emitted(EmittedManifest),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedChunk {
    pub chunk_id: String,
    pub reason: SkipReason,
}

/// Manifests produced for one build, in chunk order
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub emitted: Vec<EmittedManifest>,
    pub skipped: Vec<SkippedChunk>,
}

impl BuildReport {
    /// Store every manifest and record it in its chunk's file list
    pub fn register<K>(&self, sink: &mut K, graph: &mut BuildGraph) -> Result<()>
    where
        K: AssetSink + ?Sized,
    {
        for manifest in &self.emitted {
            sink.emit_asset(&manifest.filename, manifest.content()?)?;
            graph.set_chunk_manifest(&manifest.chunk_id, &manifest.filename);
        }
        Ok(())
    }

    pub fn total_classes(&self) -> usize {
        self.emitted.iter().map(|m| m.classes.len()).sum()
    }
}

/// Validated configuration plus the processing entry points
#[derive(Debug, Clone)]
pub struct ManifestPlugin {
    template: Option<FilenameTemplate>,
    parse_errors: ParseErrorPolicy,
    strict: bool,
    hash: HashConfig,
}

impl ManifestPlugin {
    /// Validate options up front so configuration errors surface before any
    /// chunk is processed
    pub fn new(options: PluginOptions, hash: HashConfig) -> Result<Self> {
        hash.validate()?;
        let template = options.template()?;

        Ok(Self {
            template,
            parse_errors: options.parse_errors,
            strict: options.strict,
            hash,
        })
    }

    pub fn template(&self) -> Option<&FilenameTemplate> {
        self.template.as_ref()
    }

    pub fn hash_config(&self) -> &HashConfig {
        &self.hash
    }

    /// Produce the manifest for one chunk, or say why there is none
    pub fn process_chunk<A>(
        &self,
        chunk: &Chunk,
        full_hash: Option<&str>,
        assets: &A,
    ) -> Result<ChunkOutcome>
    where
        A: AssetSource + ?Sized,
    {
        let Some(css_file) = chunk.stylesheet() else {
            debug!(chunk = %chunk.id, "no stylesheet, skipping");
            return Ok(ChunkOutcome::Skipped(SkipReason::NoStylesheet));
        };

        let content_hash = compute_hash(
            &chunk.content_files(),
            assets,
            &self.hash,
            chunk.display_name(),
        )?;

        let naming = NamingContext {
            css_filename: css_file,
            content_hash: &content_hash,
            chunk,
            full_hash,
        };
        let filename = resolve_output_filename(&naming, self.template.as_ref())?;

        let bytes = assets.source(css_file).ok_or_else(|| ManifestError::MissingAsset {
            chunk: chunk.display_name().to_string(),
            file: css_file.to_string(),
        })?;
        let css = String::from_utf8_lossy(&bytes);

        let classes = match extract_class_names_from(&css, css_file, self.strict) {
            Ok(classes) => classes,
            Err(e @ ManifestError::ParseError { .. }) => match self.parse_errors {
                ParseErrorPolicy::Fail => return Err(e),
                ParseErrorPolicy::Skip => {
                    warn!(chunk = %chunk.id, "{}; no manifest emitted", e);
                    return Ok(ChunkOutcome::Skipped(SkipReason::ParseError(e.to_string())));
                }
                ParseErrorPolicy::Empty => {
                    warn!(chunk = %chunk.id, "{}; emitting an empty manifest", e);
                    ClassNameSet::new()
                }
            },
            Err(e) => return Err(e),
        };

        debug!(
            chunk = %chunk.id,
            css = css_file,
            manifest = %filename,
            classes = classes.len(),
            "manifest ready"
        );

        Ok(ChunkOutcome::Emitted(EmittedManifest {
            chunk_id: chunk.id.clone(),
            css_file: css_file.to_string(),
            filename,
            classes,
        }))
    }

    /// Process every entry chunk of the build. Chunks are independent and
    /// run in parallel; the report keeps chunk order.
    pub fn process_build<A>(&self, graph: &BuildGraph, assets: &A) -> Result<BuildReport>
    where
        A: AssetSource + Sync + ?Sized,
    {
        let chunks = graph.entry_chunks();
        let full_hash = graph.full_hash.as_deref();

        let outcomes: Vec<(&Chunk, ChunkOutcome)> = chunks
            .par_iter()
            .map(|chunk| {
                self.process_chunk(chunk, full_hash, assets)
                    .map(|outcome| (*chunk, outcome))
            })
            .collect::<Result<_>>()?;

        let mut report = BuildReport::default();
        for (chunk, outcome) in outcomes {
            match outcome {
                ChunkOutcome::Emitted(manifest) => report.emitted.push(manifest),
                ChunkOutcome::Skipped(reason) => report.skipped.push(SkippedChunk {
                    chunk_id: chunk.id.clone(),
                    reason,
                }),
            }
        }

        info!(
            chunks = chunks.len(),
            manifests = report.emitted.len(),
            classes = report.total_classes(),
            "class manifests processed"
        );

        Ok(report)
    }
}
