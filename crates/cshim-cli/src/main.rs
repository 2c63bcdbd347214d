//! cshim command-line interface.
//!
//! Thin I/O shell around the generator: reads a symbol-graph JSON file,
//! builds and validates the model, and writes the generated header. All real
//! work happens in `cshim-model` and `cshim-gen`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use cshim_cli::parse_symbol_graph;

#[derive(Parser)]
#[command(name = "cshim")]
#[command(version = "0.1.0")]
#[command(about = "Generate flat C shim headers from a symbol graph", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the C shim header from a symbol graph
    Generate {
        /// Symbol-graph JSON file
        graph: PathBuf,
        /// Output file, or a directory to receive `<Module>.shim.h`
        /// (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Parse and validate a symbol graph without generating
    Check {
        /// Symbol-graph JSON file
        graph: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), String> {
    match command {
        Commands::Generate { graph, output } => generate(&graph, output.as_deref()),
        Commands::Check { graph } => check(&graph),
    }
}

fn generate(graph: &Path, output: Option<&Path>) -> Result<(), String> {
    let loaded = load(graph)?;
    let header = cshim_gen::generate(&loaded.model).map_err(|e| e.to_string())?;

    match output {
        None => {
            print!("{header}");
        }
        Some(path) => {
            let path = if path.is_dir() {
                path.join(format!("{}.shim.h", loaded.model.module()))
            } else {
                path.to_path_buf()
            };
            fs::write(&path, &header)
                .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
            eprintln!("generated {}", path.display());
        }
    }
    Ok(())
}

fn check(graph: &Path) -> Result<(), String> {
    let loaded = load(graph)?;
    println!(
        "ok: {} symbols, {} members ({} unbridgeable members skipped)",
        loaded.model.len(),
        loaded.model.member_count(),
        loaded.skipped_members
    );
    Ok(())
}

fn load(graph: &Path) -> Result<cshim_cli::LoadedModule, String> {
    let json = fs::read_to_string(graph)
        .map_err(|e| format!("failed to read {}: {e}", graph.display()))?;
    parse_symbol_graph(&json).map_err(|e| e.to_string())
}
