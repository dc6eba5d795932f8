use clap::Parser;
use css_class_manifest::logging::init_logging;
use css_class_manifest::{emit, extract, handle_pipe_command, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract(args) => {
            init_logging(args.verbose);
            let to_stdout = args.stdout;

            match extract(args) {
                Ok(result) => {
                    if !to_stdout {
                        println!("Extraction successful!");
                        println!("  - Processed {} stylesheets", result.total_files_processed);
                        println!("  - Wrote {} manifests", result.manifests.len());
                        println!("  - Extracted {} class names", result.total_classes);
                        if !result.skipped.is_empty() {
                            println!("  - Skipped {} unparsable stylesheets", result.skipped.len());
                        }
                    }
                    Ok(())
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Pipe(args) => {
            init_logging(false);
            handle_pipe_command(args).await?;
            Ok(())
        }
        Commands::Emit(args) => {
            init_logging(args.verbose);

            match emit(args) {
                Ok(report) => {
                    for manifest in &report.emitted {
                        println!(
                            "{} -> {} ({} classes)",
                            manifest.css_file,
                            manifest.filename,
                            manifest.classes.len()
                        );
                    }
                    Ok(())
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}
