//! Command-line entry point: reads a source file, compiles it, and writes out the
//! fasm assembly. CLI shape and logging follow the same pattern as `why`'s binary.

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::{error, info};

use minicc::compile_source;
use minicc::consts::DEFAULT_OUTPUT;
use minicc::error::CompilerError;

#[derive(Parser, Debug)]
#[command(author, version, about = "Compiles a restricted C dialect to fasm PE64 assembly")]
struct Cli {
    /// The path to the C source file.
    file: PathBuf,

    /// The path to the output fasm file.
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Specify the log level of the compiler.
    #[arg(value_enum, short, long, default_value_t = LogLevel::default())]
    verbosity: LogLevel,
}

#[derive(ValueEnum, Clone, Default, Debug)]
enum LogLevel {
    #[default]
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<&LogLevel> for log::Level {
    fn from(value: &LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();
    simple_logger::init_with_level((&args.verbosity).into())?;

    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run(args: &Cli) -> Result<(), CompilerError> {
    info!("reading {}", args.file.display());
    let source = fs::read_to_string(&args.file).map_err(|source| CompilerError::ReadSource {
        path: args.file.clone(),
        source,
    })?;

    let input_name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.display().to_string());

    let outcome = compile_source(&source, &input_name);

    for diagnostic in &outcome.diagnostics {
        error!("{}", diagnostic);
    }

    fs::write(&args.output, &outcome.output).map_err(|source| CompilerError::WriteOutput {
        path: args.output.clone(),
        source,
    })?;
    info!("wrote {}", args.output.display());

    if outcome.error_count > 0 {
        return Err(CompilerError::CompilationFailed(outcome.error_count));
    }

    Ok(())
}
