use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors: the compiler cannot proceed at all. Distinct from the non-fatal,
/// accumulating diagnostics produced while compiling a syntactically-recoverable
/// source file; those live on `Compiler` directly.
#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("could not read source file {path}: {source}")]
    ReadSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write output file {path}: {source}")]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("compilation failed with {0} error(s)")]
    CompilationFailed(usize),
}

pub type Result<T> = std::result::Result<T, CompilerError>;
