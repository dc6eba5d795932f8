use css_class_manifest::{
    compute_hash, emit, extract, AssetSource, BuildGraph, Chunk, EmitArgs, Entrypoint,
    ExtractArgs, HashConfig, ManifestPlugin, MemoryAssets, ParseErrorPolicy, PluginOptions,
};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::tempdir;

fn extract_args(dir: &Path) -> ExtractArgs {
    ExtractArgs {
        input: vec![format!("{}/**/*.css", dir.display())],
        exclude: vec![],
        stdout: false,
        parse_errors: ParseErrorPolicy::Skip,
        strict: false,
        verbose: true,
        jobs: None,
        dry_run: false,
    }
}

fn emit_args(dir: &Path, graph: &Path) -> EmitArgs {
    EmitArgs {
        output_dir: dir.to_path_buf(),
        graph: graph.to_path_buf(),
        config: None,
        output_filename: None,
        parse_errors: None,
        strict: false,
        hash_function: Default::default(),
        hash_digest: Default::default(),
        hash_digest_length: 20,
        write_graph: false,
        verbose: true,
    }
}

#[test]
fn test_chunk_with_hashed_template() {
    let mut assets = MemoryAssets::new();
    assets.insert("main.a1b2.css", ".btn{color:red} .btn-primary{color:blue}");
    assets.insert("main.a1b2.js", "import './main.css'");

    let mut graph = BuildGraph {
        full_hash: Some("f00d".to_string()),
        entrypoints: vec![Entrypoint {
            name: "main".to_string(),
            chunks: vec![Chunk::new("main").with_files(["main.a1b2.css", "main.a1b2.js"])],
        }],
    };

    let options = PluginOptions {
        output_filename: Some("[file]-[contenthash].json".to_string()),
        ..PluginOptions::default()
    };
    let plugin = ManifestPlugin::new(options, HashConfig::default()).unwrap();

    let report = plugin.process_build(&graph, &assets).unwrap();
    report.register(&mut assets, &mut graph).unwrap();

    let hash = compute_hash(
        &["main.a1b2.css", "main.a1b2.js"],
        &assets,
        &HashConfig::default(),
        "main",
    )
    .unwrap();
    let expected = format!("main.a1b2.css-{}.json", hash);

    assert_eq!(report.emitted.len(), 1);
    assert_eq!(report.emitted[0].filename, expected);
    assert_eq!(
        assets.source(&expected).unwrap().as_ref(),
        br#"["btn","btn-primary"]"#
    );
    assert!(graph.entrypoints[0].chunks[0].files.contains(&expected));
}

#[test]
fn test_build_without_stylesheets_emits_nothing() {
    let mut assets = MemoryAssets::new();
    assets.insert("vendor.js", "1");
    let graph = BuildGraph {
        full_hash: None,
        entrypoints: vec![Entrypoint {
            name: "vendor".to_string(),
            chunks: vec![Chunk::new("vendor").with_files(["vendor.js"])],
        }],
    };

    let plugin = ManifestPlugin::new(PluginOptions::default(), HashConfig::default()).unwrap();
    let report = plugin.process_build(&graph, &assets).unwrap();

    assert!(report.emitted.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(assets.len(), 1);
}

#[test]
fn test_every_chunk_gets_its_own_manifest() {
    let mut assets = MemoryAssets::new();
    assets.insert("a.css", ".a{}");
    assets.insert("b.css", ".b{} .shared{}");
    assets.insert("c.css", ".c{}");

    let graph = BuildGraph {
        full_hash: None,
        entrypoints: vec![
            Entrypoint {
                name: "one".to_string(),
                chunks: vec![
                    Chunk::new("a").with_files(["a.css"]),
                    Chunk::new("b").with_files(["b.css"]),
                ],
            },
            Entrypoint {
                name: "two".to_string(),
                chunks: vec![
                    Chunk::new("b").with_files(["b.css"]),
                    Chunk::new("c").with_files(["c.css"]),
                ],
            },
        ],
    };

    let plugin = ManifestPlugin::new(PluginOptions::default(), HashConfig::default()).unwrap();
    let report = plugin.process_build(&graph, &assets).unwrap();

    let names: Vec<&str> = report.emitted.iter().map(|m| m.filename.as_str()).collect();
    assert_eq!(names, vec!["a.json", "b.json", "c.json"]);
    assert_eq!(report.emitted[1].classes.to_vec(), vec!["b", "shared"]);
    assert_eq!(report.total_classes(), 4);
}

#[test]
fn test_extract_writes_manifest_next_to_each_stylesheet() {
    let temp_dir = tempdir().unwrap();
    fs::create_dir(temp_dir.path().join("nested")).unwrap();
    fs::write(temp_dir.path().join("app.css"), ".app{} .btn{}").unwrap();
    fs::write(temp_dir.path().join("nested/theme.min.css"), ".dark .btn{}").unwrap();
    fs::write(temp_dir.path().join("notes.txt"), ".ignored{}").unwrap();

    let result = extract(extract_args(temp_dir.path())).unwrap();

    assert_eq!(result.total_files_processed, 2);
    assert_eq!(result.total_classes, 4);
    assert!(result.skipped.is_empty());

    let app = fs::read_to_string(temp_dir.path().join("app.json")).unwrap();
    assert_eq!(app, r#"["app","btn"]"#);
    let theme = fs::read_to_string(temp_dir.path().join("nested/theme.min.json")).unwrap();
    assert_eq!(theme, r#"["dark","btn"]"#);
}

#[test]
fn test_extract_dry_run_writes_nothing() {
    let temp_dir = tempdir().unwrap();
    fs::write(temp_dir.path().join("app.css"), ".app{}").unwrap();

    let args = ExtractArgs {
        dry_run: true,
        ..extract_args(temp_dir.path())
    };
    let result = extract(args).unwrap();

    assert_eq!(result.manifests.len(), 1);
    assert!(!temp_dir.path().join("app.json").exists());
}

#[test]
fn test_extract_strict_skip_policy() {
    let temp_dir = tempdir().unwrap();
    fs::write(temp_dir.path().join("good.css"), ".good{}").unwrap();
    fs::write(temp_dir.path().join("bad.css"), ".ok{} ..broken{color:red}").unwrap();

    let args = ExtractArgs {
        strict: true,
        ..extract_args(temp_dir.path())
    };
    let result = extract(args).unwrap();

    assert_eq!(result.manifests.len(), 1);
    assert_eq!(result.skipped.len(), 1);
    assert!(temp_dir.path().join("good.json").exists());
    assert!(!temp_dir.path().join("bad.json").exists());
}

#[test]
fn test_emit_over_output_directory() {
    let temp_dir = tempdir().unwrap();
    let out = temp_dir.path().join("dist");
    fs::create_dir_all(out.join("css")).unwrap();
    fs::write(out.join("css/main.css"), ".layout{} .layout .header{}").unwrap();
    fs::write(out.join("main.js"), "console.log(1)").unwrap();
    fs::write(out.join("vendor.js"), "console.log(2)").unwrap();

    let graph_path = temp_dir.path().join("graph.json");
    fs::write(
        &graph_path,
        r#"{
            "fullHash": "0123456789abcdef",
            "entrypoints": [
                {
                    "name": "main",
                    "chunks": [
                        { "id": "1", "name": "main", "files": ["main.js", "css/main.css"] },
                        { "id": "2", "name": "vendor", "files": ["vendor.js"] }
                    ]
                }
            ]
        }"#,
    )
    .unwrap();

    let args = EmitArgs {
        output_filename: Some("[path][name].[fullhash:6].json".to_string()),
        write_graph: true,
        ..emit_args(&out, &graph_path)
    };
    let report = emit(args).unwrap();

    assert_eq!(report.emitted.len(), 1);
    assert_eq!(report.emitted[0].filename, "css/main.012345.json");
    assert_eq!(
        fs::read_to_string(out.join("css/main.012345.json")).unwrap(),
        r#"["layout","header"]"#
    );

    let graph = BuildGraph::from_file(&graph_path).unwrap();
    assert_eq!(
        graph.entrypoints[0].chunks[0].files,
        vec!["main.js", "css/main.css", "css/main.012345.json"]
    );
    assert_eq!(graph.entrypoints[0].chunks[1].files, vec!["vendor.js"]);
}

#[test]
fn test_emit_is_repeatable() {
    let temp_dir = tempdir().unwrap();
    fs::write(temp_dir.path().join("app.css"), ".a{}").unwrap();
    let graph_path = temp_dir.path().join("graph.json");
    fs::write(
        &graph_path,
        r#"{ "entrypoints": [ { "name": "app", "chunks": [ { "id": "app", "files": ["app.css"] } ] } ] }"#,
    )
    .unwrap();

    emit(emit_args(temp_dir.path(), &graph_path)).unwrap();
    // Same bytes under the same name are not a conflict
    let report = emit(emit_args(temp_dir.path(), &graph_path)).unwrap();

    assert_eq!(report.emitted[0].filename, "app.json");
    assert_eq!(fs::read_to_string(temp_dir.path().join("app.json")).unwrap(), r#"["a"]"#);
}

#[test]
fn test_emit_rerun_after_stylesheet_change() {
    let temp_dir = tempdir().unwrap();
    fs::write(temp_dir.path().join("app.css"), ".a{}").unwrap();
    let graph_path = temp_dir.path().join("graph.json");
    fs::write(
        &graph_path,
        r#"{ "entrypoints": [ { "name": "app", "chunks": [ { "id": "app", "files": ["app.css"] } ] } ] }"#,
    )
    .unwrap();

    emit(emit_args(temp_dir.path(), &graph_path)).unwrap();
    fs::write(temp_dir.path().join("app.css"), ".a{} .b{}").unwrap();
    let report = emit(emit_args(temp_dir.path(), &graph_path)).unwrap();

    assert_eq!(report.emitted[0].filename, "app.json");
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("app.json")).unwrap(),
        r#"["a","b"]"#
    );
}

#[test]
fn test_emit_rerun_with_recorded_hashed_manifest() {
    let temp_dir = tempdir().unwrap();
    let out = temp_dir.path().join("dist");
    fs::create_dir(&out).unwrap();
    fs::write(out.join("app.css"), ".a{}").unwrap();
    let graph_path = temp_dir.path().join("graph.json");
    fs::write(
        &graph_path,
        r#"{ "entrypoints": [ { "name": "app", "chunks": [ { "id": "app", "files": ["app.css"] } ] } ] }"#,
    )
    .unwrap();

    let hashed = |dir: &Path, graph: &Path| EmitArgs {
        output_filename: Some("[name].[contenthash:8].json".to_string()),
        write_graph: true,
        ..emit_args(dir, graph)
    };

    let first = emit(hashed(&out, &graph_path)).unwrap().emitted[0].filename.clone();
    // The recorded manifest is not part of the chunk's content
    let again = emit(hashed(&out, &graph_path)).unwrap().emitted[0].filename.clone();
    assert_eq!(first, again);

    fs::write(out.join("app.css"), ".a{} .b{}").unwrap();
    let changed = emit(hashed(&out, &graph_path)).unwrap().emitted[0].filename.clone();
    assert_ne!(first, changed);
    assert!(!out.join(&first).exists());
    assert!(out.join(&changed).exists());

    let graph = BuildGraph::from_file(&graph_path).unwrap();
    let chunk = &graph.entrypoints[0].chunks[0];
    assert_eq!(chunk.files, vec!["app.css".to_string(), changed.clone()]);
    assert_eq!(chunk.manifest.as_deref(), Some(changed.as_str()));
}

#[test]
fn test_pipe_mode() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_css-class-manifest"))
        .arg("pipe")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn css-class-manifest");

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(br".btn{color:red} .sm\:flex{display:flex} .btn:hover{}")
            .unwrap();
    }

    let output = child.wait_with_output().expect("Failed to wait for output");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(output.status.success(), "pipe failed: {}", stderr);
    assert!(!stderr.contains("panicked at"), "{}", stderr);
    assert_eq!(stdout.trim(), r#"["btn","sm:flex"]"#);
}
