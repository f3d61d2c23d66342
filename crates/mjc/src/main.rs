//! MiniJava Compiler CLI

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mj_core::{analyze_program, compile_program, render_offsets, Compiler};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mjc")]
#[command(author, version, about = "MiniJava to LLVM IR compiler", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile MiniJava source files to LLVM IR
    Compile {
        /// Input file(s) to compile
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Directory for the generated `.ll` files (defaults to next to each input)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Write a per-file success/failure report
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Check source files for errors without writing output
    Check {
        /// Input file(s) to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Parse and dump AST
    Ast {
        /// Input file to parse
        file: PathBuf,

        /// Pretty print
        #[arg(short, long)]
        pretty: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Print field offsets and method slots of every class
    Offsets {
        /// Input file to analyze
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Compile {
            files,
            out_dir,
            report,
        } => compile(&files, out_dir.as_deref(), report.as_deref()),
        Commands::Check { files } => check(&files),
        Commands::Ast { file, pretty, json } => dump_ast(&file, pretty, json),
        Commands::Offsets { file } => dump_offsets(&file),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

/// `Foo.java` → `Foo.ll`, optionally moved into `out_dir`.
fn output_path(input: &Path, out_dir: Option<&Path>) -> PathBuf {
    let output = input.with_extension("ll");
    match (out_dir, output.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => output,
    }
}

fn compile(files: &[PathBuf], out_dir: Option<&Path>, report: Option<&Path>) -> Result<()> {
    if let Some(dir) = out_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    }

    let mut compiler = Compiler::new();
    let mut lines = Vec::with_capacity(files.len());
    let mut failed = 0;

    for file in files {
        let ok = match compiler.compile_file(file) {
            Ok(ir) => {
                let output = output_path(file, out_dir);
                match fs::write(&output, ir) {
                    Ok(()) => {
                        tracing::info!("Wrote {}", output.display());
                        true
                    }
                    Err(e) => {
                        eprintln!("error: cannot write {}: {}", output.display(), e);
                        false
                    }
                }
            }
            Err(e) => {
                eprint!("{}", compiler.render_error(&e));
                false
            }
        };

        let status = if ok { "Success" } else { "Failed" };
        println!("{}: {}", status, file.display());
        lines.push(format!("{}: {}\n", status, file.display()));
        if !ok {
            failed += 1;
        }
    }

    if let Some(report) = report {
        fs::write(report, lines.concat())
            .with_context(|| format!("Failed to write report: {}", report.display()))?;
    }

    if failed > 0 {
        bail!("{} of {} file(s) failed to compile", failed, files.len());
    }
    Ok(())
}

fn check(files: &[PathBuf]) -> Result<()> {
    let mut compiler = Compiler::new();
    let mut failed = 0;

    for file in files {
        let result = compiler
            .load_file(file)
            .and_then(|program| compile_program(&program));
        match result {
            Ok(_) => println!("ok: {}", file.display()),
            Err(e) => {
                eprint!("{}", compiler.render_error(&e));
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} file(s) have errors", failed, files.len());
    }
    Ok(())
}

fn dump_ast(file: &Path, pretty: bool, json: bool) -> Result<()> {
    let mut compiler = Compiler::new();
    let ast = match compiler.load_file(file) {
        Ok(ast) => ast,
        Err(e) => {
            eprint!("{}", compiler.render_error(&e));
            bail!("Failed to parse {}", file.display());
        }
    };

    if json {
        if pretty {
            println!(
                "{}",
                serde_json::to_string_pretty(&ast).context("Failed to serialize AST to JSON")?
            );
        } else {
            println!(
                "{}",
                serde_json::to_string(&ast).context("Failed to serialize AST to JSON")?
            );
        }
    } else if pretty {
        println!("{:#?}", ast);
    } else {
        println!("{:?}", ast);
    }

    Ok(())
}

fn dump_offsets(file: &Path) -> Result<()> {
    let mut compiler = Compiler::new();
    let table = match compiler
        .load_file(file)
        .and_then(|program| analyze_program(&program))
    {
        Ok(table) => table,
        Err(e) => {
            eprint!("{}", compiler.render_error(&e));
            bail!("Failed to analyze {}", file.display());
        }
    };

    print!("{}", render_offsets(&table));
    Ok(())
}
