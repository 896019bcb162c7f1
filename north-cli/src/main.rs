use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use north_diagnostics::SourceFile;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "northc")]
#[command(version)]
#[command(about = "North Programming Language Compiler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a North source file
    Build {
        /// Input .n file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Compilation target
        #[arg(long, value_enum, default_value = "llvm")]
        target: Target,

        /// Release build
        #[arg(long)]
        release: bool,

        /// Output file
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Parse a source file and print its AST as JSON
    DumpAst {
        /// Input .n file
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Compile a source file and print the textual IR
    EmitIr {
        /// Input .n file
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Target {
    Llvm,
    C,
}

fn main() {
    env_logger::init();

    if let Err(err) = run() {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            target,
            release,
            output,
        } => {
            if target == Target::C {
                bail!("the C backend is not implemented yet");
            }

            let (source, name) = read_input(&input)?;
            log::info!("building {} (release: {})", name, release);

            let compilation = compile_or_exit(&source, &name);

            // The object writer and linker live behind the IR handoff; the
            // build artifact is the verified textual IR.
            let out = output.unwrap_or_else(|| input.with_extension("ll"));
            std::fs::write(&out, compilation.ir.to_string())
                .with_context(|| format!("couldn't write {}", out.display()))?;
            println!("{}", out.display());
        }

        Commands::DumpAst { input } => {
            let (source, name) = read_input(&input)?;
            let module = match north_parser::parse_module(&source, &name) {
                Ok(module) => module,
                Err(diag) => report_and_exit(&diag, &name, &source),
            };
            println!("{}", serde_json::to_string_pretty(&module)?);
        }

        Commands::EmitIr { input } => {
            let (source, name) = read_input(&input)?;
            let compilation = compile_or_exit(&source, &name);
            print!("{}", compilation.ir);
        }
    }

    Ok(())
}

fn read_input(input: &Path) -> Result<(String, String)> {
    let source = std::fs::read_to_string(input)
        .with_context(|| format!("couldn't open {}", input.display()))?;
    let name = input.display().to_string();
    Ok((source, name))
}

fn compile_or_exit(source: &str, name: &str) -> north_compiler::Compilation {
    match north_compiler::compile(source, name) {
        Ok(compilation) => compilation,
        Err(diag) => report_and_exit(&diag, name, source),
    }
}

fn report_and_exit(diag: &north_diagnostics::Diagnostic, name: &str, source: &str) -> ! {
    let file = SourceFile::new(name, source);
    eprint!("{}", diag.render(&file));
    std::process::exit(1);
}
