pub mod assets;
pub mod ast_visitor;
pub mod config;
pub mod errors;
pub mod extractor;
pub mod hashing;
pub mod manifest;
pub mod processor;
pub mod template;

#[cfg(feature = "cli")]
pub mod args;
#[cfg(feature = "cli")]
pub mod logging;

pub use assets::{AssetSink, AssetSource, BuildGraph, Chunk, DirectoryAssets, Entrypoint, MemoryAssets};
pub use ast_visitor::ClassToken;
pub use config::{ParseErrorPolicy, PluginOptions};
pub use errors::{ManifestError, Result};
pub use extractor::{extract_class_names, extract_class_names_from, ClassNameSet};
pub use hashing::{compute_hash, DigestEncoding, HashConfig, HashFunction};
pub use manifest::{default_output_filename, resolve_output_filename, EmittedManifest, NamingContext};
pub use processor::{BuildReport, ChunkOutcome, ManifestPlugin, SkipReason, SkippedChunk};
pub use template::FilenameTemplate;

#[cfg(feature = "cli")]
pub use args::{Cli, Commands, EmitArgs, ExtractArgs, PipeArgs};

#[cfg(feature = "cli")]
pub use cli::{emit, extract, handle_pipe_command, ExtractionResult, StylesheetManifest};

#[cfg(feature = "cli")]
mod cli {
    use indexmap::IndexMap;
    use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
    use rayon::prelude::*;
    use std::collections::HashSet;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tracing::{info, warn};

    use crate::args::{EmitArgs, ExtractArgs, PipeArgs};
    use crate::assets::{write_atomic, BuildGraph, DirectoryAssets};
    use crate::config::{ParseErrorPolicy, PluginOptions};
    use crate::errors::{ManifestError, Result};
    use crate::extractor::{extract_class_names, extract_class_names_from, ClassNameSet};
    use crate::manifest::default_output_filename;
    use crate::processor::{BuildReport, ManifestPlugin};

    /// Manifest produced for one stylesheet by the extract command
    #[derive(Debug, Clone)]
    pub struct StylesheetManifest {
        pub stylesheet: PathBuf,
        pub manifest: PathBuf,
        pub classes: ClassNameSet,
    }

    /// Result of the extract command
    #[derive(Debug)]
    pub struct ExtractionResult {
        pub manifests: Vec<StylesheetManifest>,
        /// Stylesheets left without a manifest because they failed to parse
        pub skipped: Vec<PathBuf>,
        pub total_files_processed: usize,
        pub total_classes: usize,
    }

    /// Write `<name>.json` next to every stylesheet matching the input patterns
    pub fn extract(args: ExtractArgs) -> Result<ExtractionResult> {
        args.validate().map_err(ManifestError::config)?;

        let files = collect_files(&args.input, &args.exclude)?;
        if files.is_empty() {
            return Err(ManifestError::NoFilesFound);
        }

        info!(files = files.len(), "extracting class selectors");

        if let Some(num_jobs) = args.jobs {
            // Ignore the error if the global pool is already initialized
            let _ = rayon::ThreadPoolBuilder::new()
                .num_threads(num_jobs)
                .build_global();
        }

        let progress_bar = if args.verbose || args.stdout {
            ProgressBar::with_draw_target(Some(files.len() as u64), ProgressDrawTarget::hidden())
        } else {
            let pb = ProgressBar::new(files.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({msg})")
            {
                pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
            }
            pb
        };

        let results: Vec<(PathBuf, Option<ClassNameSet>)> = files
            .par_iter()
            .map(|path| {
                let outcome = extract_file(path, args.parse_errors, args.strict);
                progress_bar.inc(1);
                outcome.map(|classes| (path.clone(), classes))
            })
            .collect::<Result<_>>()?;

        progress_bar.finish_and_clear();

        let mut manifests = Vec::new();
        let mut skipped = Vec::new();
        for (stylesheet, classes) in results {
            match classes {
                Some(classes) => {
                    let manifest = manifest_path(&stylesheet);
                    manifests.push(StylesheetManifest {
                        stylesheet,
                        manifest,
                        classes,
                    });
                }
                None => skipped.push(stylesheet),
            }
        }

        if args.stdout {
            let by_file: IndexMap<String, &ClassNameSet> = manifests
                .iter()
                .map(|m| (m.stylesheet.display().to_string(), &m.classes))
                .collect();
            println!("{}", serde_json::to_string_pretty(&by_file)?);
        } else if !args.dry_run {
            for m in &manifests {
                write_atomic(&m.manifest, m.classes.to_json()?.as_bytes()).map_err(|e| {
                    ManifestError::OutputError {
                        path: m.manifest.display().to_string(),
                        message: e.to_string(),
                    }
                })?;
            }
        }

        let total_classes = manifests.iter().map(|m| m.classes.len()).sum();
        Ok(ExtractionResult {
            total_files_processed: files.len(),
            total_classes,
            manifests,
            skipped,
        })
    }

    /// `None` when the stylesheet failed to parse and the policy skips it
    fn extract_file(path: &Path, policy: ParseErrorPolicy, strict: bool) -> Result<Option<ClassNameSet>> {
        let bytes = fs::read(path)?;
        let css = String::from_utf8_lossy(&bytes);
        let source_name = path.display().to_string();

        match extract_class_names_from(&css, &source_name, strict) {
            Ok(classes) => Ok(Some(classes)),
            Err(e @ ManifestError::ParseError { .. }) => match policy {
                ParseErrorPolicy::Fail => Err(e),
                ParseErrorPolicy::Skip => {
                    warn!("{}; no manifest written", e);
                    Ok(None)
                }
                ParseErrorPolicy::Empty => {
                    warn!("{}; writing an empty manifest", e);
                    Ok(Some(ClassNameSet::new()))
                }
            },
            Err(e) => Err(e),
        }
    }

    fn manifest_path(stylesheet: &Path) -> PathBuf {
        let name = stylesheet
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        stylesheet.with_file_name(default_output_filename(&name))
    }

    /// Collect stylesheet files matching the given patterns
    fn collect_files(patterns: &[String], exclude_patterns: &[String]) -> Result<Vec<PathBuf>> {
        let excludes = exclude_patterns
            .iter()
            .map(|p| glob::Pattern::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut files = Vec::new();
        let mut seen = HashSet::new();

        for pattern in patterns {
            for entry in glob::glob(pattern)? {
                let path = entry?;

                if path.is_dir() || excludes.iter().any(|p| p.matches_path(&path)) {
                    continue;
                }

                let is_css = path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("css"))
                    .unwrap_or(false);
                if !is_css {
                    warn!(path = %path.display(), "not a stylesheet, skipping");
                    continue;
                }

                if seen.insert(path.clone()) {
                    files.push(path);
                }
            }
        }

        Ok(files)
    }

    /// Handle pipe command - read CSS from stdin, print the class list to stdout
    pub async fn handle_pipe_command(args: PipeArgs) -> Result<()> {
        use tokio::io::{self, AsyncReadExt, AsyncWriteExt};

        let mut input = Vec::new();
        io::stdin().read_to_end(&mut input).await?;

        let classes = extract_class_names(&String::from_utf8_lossy(&input))?;

        let mut output = if args.pretty {
            serde_json::to_string_pretty(&classes)?
        } else {
            classes.to_json()?
        };
        output.push('\n');

        let mut stdout = io::stdout();
        stdout
            .write_all(output.as_bytes())
            .await
            .map_err(|e| ManifestError::OutputError {
                path: "stdout".to_string(),
                message: e.to_string(),
            })?;
        stdout.flush().await.map_err(|e| ManifestError::OutputError {
            path: "stdout".to_string(),
            message: e.to_string(),
        })?;

        Ok(())
    }

    /// Emit manifests for every entry chunk of a build output directory
    pub fn emit(args: EmitArgs) -> Result<BuildReport> {
        let options = match &args.config {
            Some(path) => PluginOptions::from_file(path)?,
            None => PluginOptions::default(),
        }
        .merge(args.output_filename.clone(), args.parse_errors, args.strict);

        // Configuration errors surface before any asset is read
        let plugin = ManifestPlugin::new(options, args.hash_config())?;

        let mut graph = BuildGraph::from_file(&args.graph)?;
        let mut assets = DirectoryAssets::new(&args.output_dir);

        let previous: IndexMap<String, String> = graph
            .recorded_manifests()
            .into_iter()
            .map(|(chunk, file)| (chunk.to_string(), file.to_string()))
            .collect();

        let report = plugin.process_build(&graph, &assets)?;
        report.register(&mut assets, &mut graph)?;

        // Manifests of earlier runs that this run replaced under a new name
        for manifest in &report.emitted {
            if let Some(stale) = previous.get(&manifest.chunk_id) {
                if *stale != manifest.filename && assets.remove_stale(stale)? {
                    info!(manifest = %stale, "removed stale manifest");
                }
            }
        }

        if args.write_graph {
            write_atomic(&args.graph, &serde_json::to_vec_pretty(&graph)?).map_err(|e| {
                ManifestError::OutputError {
                    path: args.graph.display().to_string(),
                    message: e.to_string(),
                }
            })?;
        }

        Ok(report)
    }
}
