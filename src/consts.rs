// Centralized constants mirroring the teacher's common.rs: one place for the magic
// numbers and literal boilerplate strings the compiler needs, each with a short note
// on where it comes from.

/// Size in bytes of a machine word on x86-64; also the pointer size.
pub const WORD_SIZE: i64 = 8;

/// Windows x64 calling convention shadow space reserved below the return address.
pub const SHADOW_SPACE: i64 = 32;

/// Default output path when `-o`/`--output` is not given.
pub const DEFAULT_OUTPUT: &str = "a.asm";

/// Externs predeclared by the compiler before the user's own declarations, so programs
/// can call the C runtime without explicit `extern` lines.
pub const PREDECLARED_EXTERNS: &[&str] = &[
    "getchar", "malloc", "calloc", "free", "atoi", "fopen", "fclose", "fgetc", "ungetc",
    "feof", "fputs", "fprintf", "puts", "printf", "isalpha", "isdigit", "isalnum", "strlen",
    "strcmp", "strncmp", "strchr", "strcpy", "strdup", "sprintf",
];

/// msvcrt import used only by the generated bootstrap, never reachable from user code.
pub const MSVCRT_BOOTSTRAP_IMPORT: &str = "__getmainargs";

pub const KERNEL32_IMPORTS: &[&str] = &["GetCommandLineA", "ExitProcess"];
pub const SHELL32_IMPORTS: &[&str] = &["CommandLineToArgv"];

pub const FASM_FORMAT_LINE: &str = "format PE64 console";
pub const FASM_INCLUDE_LINE: &str = "include 'win64wx.inc' ;";
pub const FASM_ENTRY_LINE: &str = "entry start";
