use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ParseErrorPolicy;
use crate::hashing::{DigestEncoding, HashConfig, HashFunction};

/// CSS class manifest CLI - Writes the class selectors of bundled stylesheets to JSON manifests
#[derive(Parser, Debug)]
#[command(name = "css-class-manifest")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a manifest next to every stylesheet matching the input patterns
    Extract(ExtractArgs),
    /// Read CSS from stdin and print its class names as a JSON array
    Pipe(PipeArgs),
    /// Emit manifests for the entry chunks of a build output directory
    Emit(EmitArgs),
}

/// Arguments for the extract command
#[derive(Parser, Debug, Clone)]
pub struct ExtractArgs {
    /// Input file patterns (glob patterns supported)
    #[arg(
        short = 'i',
        long = "input",
        value_name = "PATTERN",
        required = true,
        num_args = 1..,
        help = "Stylesheet patterns to scan for class selectors"
    )]
    pub input: Vec<String>,

    /// Exclude patterns (glob patterns to exclude)
    #[arg(
        short = 'e',
        long = "exclude",
        value_name = "PATTERN",
        num_args = 0..,
        help = "Patterns to exclude from scanning"
    )]
    pub exclude: Vec<String>,

    /// Print manifests to stdout instead of writing files
    #[arg(
        long = "stdout",
        default_value_t = false,
        help = "Print one JSON object mapping stylesheet to classes instead of writing files"
    )]
    pub stdout: bool,

    /// Parse error policy
    #[arg(
        long = "parse-errors",
        value_name = "POLICY",
        default_value = "skip",
        help = "What to do with unparsable stylesheets: skip, empty or fail"
    )]
    pub parse_errors: ParseErrorPolicy,

    /// Strict parsing
    #[arg(
        long = "strict",
        default_value_t = false,
        help = "Treat CSS the parser had to recover from as unparsable"
    )]
    pub strict: bool,

    /// Verbose output
    #[arg(
        short = 'v',
        long = "verbose",
        default_value_t = false,
        help = "Enable verbose output"
    )]
    pub verbose: bool,

    /// Number of parallel threads to use
    #[arg(
        short = 'j',
        long = "jobs",
        value_name = "NUM",
        help = "Number of parallel threads to use (defaults to number of CPU cores)"
    )]
    pub jobs: Option<usize>,

    /// Dry run (don't write output files)
    #[arg(
        long = "dry-run",
        default_value_t = false,
        help = "Perform extraction but don't write output files"
    )]
    pub dry_run: bool,
}

/// Arguments for the pipe command
#[derive(Parser, Debug, Clone)]
pub struct PipeArgs {
    /// Pretty-print the JSON output
    #[arg(
        long = "pretty",
        default_value_t = false,
        help = "Pretty-print the JSON array"
    )]
    pub pretty: bool,
}

/// Arguments for the emit command
#[derive(Parser, Debug, Clone)]
pub struct EmitArgs {
    /// Build output directory
    #[arg(
        short = 'd',
        long = "output-dir",
        value_name = "DIR",
        required = true,
        help = "Directory holding the build's output assets"
    )]
    pub output_dir: PathBuf,

    /// Chunk graph description (JSON)
    #[arg(
        short = 'g',
        long = "graph",
        value_name = "PATH",
        required = true,
        help = "JSON file describing entrypoints and their chunks"
    )]
    pub graph: PathBuf,

    /// Plugin options file
    #[arg(
        short = 'c',
        long = "config",
        value_name = "PATH",
        help = "Path to plugin options file (YAML or JSON)"
    )]
    pub config: Option<PathBuf>,

    /// Output filename template
    #[arg(
        short = 'o',
        long = "output-filename",
        value_name = "TEMPLATE",
        help = "Manifest filename template, e.g. '[name].[contenthash:8].json'"
    )]
    pub output_filename: Option<String>,

    /// Parse error policy
    #[arg(
        long = "parse-errors",
        value_name = "POLICY",
        help = "What to do with unparsable stylesheets: skip, empty or fail"
    )]
    pub parse_errors: Option<ParseErrorPolicy>,

    /// Strict parsing
    #[arg(
        long = "strict",
        default_value_t = false,
        help = "Treat CSS the parser had to recover from as unparsable"
    )]
    pub strict: bool,

    #[arg(
        long = "hash-function",
        value_name = "NAME",
        env = "CSS_MANIFEST_HASH_FUNCTION",
        default_value = "xxhash64",
        help = "Hash function of the host build: xxhash64, sha256, sha512 or blake3"
    )]
    pub hash_function: HashFunction,

    #[arg(
        long = "hash-digest",
        value_name = "ENCODING",
        env = "CSS_MANIFEST_HASH_DIGEST",
        default_value = "hex",
        help = "Digest encoding of the host build: hex, base64 or base64url"
    )]
    pub hash_digest: DigestEncoding,

    #[arg(
        long = "hash-digest-length",
        value_name = "NUM",
        env = "CSS_MANIFEST_HASH_DIGEST_LENGTH",
        default_value_t = 20,
        help = "Number of digest characters kept in hashes"
    )]
    pub hash_digest_length: usize,

    /// Write the updated chunk graph back to the graph file
    #[arg(
        long = "write-graph",
        default_value_t = false,
        help = "Record emitted manifests in the chunk graph file"
    )]
    pub write_graph: bool,

    /// Verbose output
    #[arg(
        short = 'v',
        long = "verbose",
        default_value_t = false,
        help = "Enable verbose output"
    )]
    pub verbose: bool,
}

impl ExtractArgs {
    /// Validate that the arguments are consistent
    pub fn validate(&self) -> Result<(), String> {
        if self.input.is_empty() {
            return Err("At least one input pattern must be provided".to_string());
        }

        if let Some(jobs) = self.jobs {
            if jobs == 0 {
                return Err("Number of jobs must be at least 1".to_string());
            }
        }

        Ok(())
    }
}

impl EmitArgs {
    pub fn hash_config(&self) -> HashConfig {
        HashConfig {
            hash_function: self.hash_function,
            hash_digest: self.hash_digest,
            hash_digest_length: self.hash_digest_length,
        }
    }
}
