//! A single-pass compiler for a restricted C dialect, emitting fasm PE64 assembly
//! targeting the Windows x64 calling convention.

pub mod compiler;
pub mod consts;
pub mod error;
pub mod escape;
pub mod label;
pub mod lexer;
pub mod output;
pub mod source;
pub mod strings;
pub mod symtab;
pub mod token;

use compiler::{CompileOutcome, Compiler};

/// Compiles `source` (whose original path is `input_name`, used only in diagnostic
/// messages) into fasm assembly text. Compile errors are non-fatal and accumulate in
/// the returned diagnostics; the caller decides whether to still write the output.
pub fn compile_source(source: &str, input_name: &str) -> CompileOutcome {
    Compiler::new(source, input_name).run()
}
