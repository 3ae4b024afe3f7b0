// Builds the non-statement parts of the emitted fasm file: the header and process
// bootstrap, the .data/.rodata sections, and the .idata import section. The statement
// and expression bodies are streamed directly by `Compiler` as it parses; this module
// only assembles what has to wait until the whole translation unit has been seen.

use std::fmt::Write as _;

use crate::consts::*;
use crate::escape::decode_literal_body;
use crate::strings::StringTable;
use crate::symtab::SymbolTable;

pub fn write_header(out: &mut String) {
    writeln!(out, "{}", FASM_FORMAT_LINE).unwrap();
    writeln!(out, "{}", FASM_INCLUDE_LINE).unwrap();
    writeln!(out, "{}", FASM_ENTRY_LINE).unwrap();
    writeln!(out).unwrap();
    writeln!(out, ".text").unwrap();
    writeln!(out, "start:").unwrap();
    writeln!(out, "    sub rsp, 40").unwrap();
    writeln!(out, "    lea rcx, [main_argc]").unwrap();
    writeln!(out, "    lea rdx, [main_argv]").unwrap();
    writeln!(out, "    lea r8, [main_env_arr]").unwrap();
    writeln!(out, "    xor r9, r9").unwrap();
    writeln!(out, "    call [{}]", MSVCRT_BOOTSTRAP_IMPORT).unwrap();
    writeln!(out, "    add rsp, 40").unwrap();
    writeln!(out, "    and rsp, -16").unwrap();
    writeln!(out, "    mov rcx, [main_argc]").unwrap();
    writeln!(out, "    mov rdx, [main_argv]").unwrap();
    writeln!(out, "    jmp main").unwrap();
    writeln!(out).unwrap();
}

/// Tail block appended after all user functions have streamed out. Mirrors the
/// original's stray trailing `call [getchar]`, kept verbatim.
pub fn write_bootstrap_tail(out: &mut String) {
    writeln!(out, "    call [getchar]").unwrap();
}

pub fn write_data_section(out: &mut String, symtab: &SymbolTable) {
    writeln!(out).unwrap();
    writeln!(out, ".data").unwrap();
    for g in &symtab.globals {
        if g.is_function {
            continue;
        }
        writeln!(out, "    {} dq {}", g.name, g.init_value).unwrap();
    }
    writeln!(out, "    main_argc dq ?").unwrap();
    writeln!(out, "    main_argv dq ?").unwrap();
    writeln!(out, "    main_env_arr dq ?").unwrap();
    writeln!(out, "    db 0, 0, 0, 0").unwrap();
}

fn is_plain_printable(byte: u8) -> bool {
    (32..=126).contains(&byte) && byte != 39 && byte != 92
}

fn format_bytes(bytes: &[u8]) -> String {
    let mut parts = Vec::with_capacity(bytes.len());
    for &b in bytes {
        if is_plain_printable(b) {
            parts.push(format!("'{}'", b as char));
        } else {
            parts.push(b.to_string());
        }
    }
    parts.join(", ")
}

pub fn write_rodata_section(out: &mut String, strings: &StringTable) {
    if strings.is_empty() {
        return;
    }
    writeln!(out).unwrap();
    writeln!(out, ".rodata").unwrap();
    for entry in strings.entries() {
        let body = &entry.raw_lexeme[1..entry.raw_lexeme.len() - 1];
        // Already validated during parsing; a residual error here is silently
        // emitted as an empty constant rather than panicking the output pass.
        let bytes = decode_literal_body(body).unwrap_or_default();
        let label = crate::label::label_name(entry.label);
        if bytes.is_empty() {
            writeln!(out, "    {} db 0", label).unwrap();
        } else {
            writeln!(out, "    {} db {}, 0", label, format_bytes(&bytes)).unwrap();
        }
    }
}

pub fn write_idata_section(out: &mut String, symtab: &SymbolTable) {
    writeln!(out).unwrap();
    writeln!(out, ".idata").unwrap();
    writeln!(out, "  library kernel32, 'kernel32.dll', \\").unwrap();
    writeln!(out, "          shell32, 'SHELL32.DLL', \\").unwrap();
    writeln!(out, "          msvcrt, 'msvcrt.dll'").unwrap();
    writeln!(out).unwrap();

    writeln!(out, "  import kernel32, \\").unwrap();
    let kernel_lines: Vec<String> = KERNEL32_IMPORTS
        .iter()
        .map(|n| format!("         {}, '{}'", n, n))
        .collect();
    writeln!(out, "{}", kernel_lines.join(", \\\n")).unwrap();
    writeln!(out).unwrap();

    writeln!(out, "  import shell32, \\").unwrap();
    let shell_lines: Vec<String> = SHELL32_IMPORTS
        .iter()
        .map(|n| format!("         {}, '{}'", n, n))
        .collect();
    writeln!(out, "{}", shell_lines.join(", \\\n")).unwrap();
    writeln!(out).unwrap();

    let mut msvcrt_names: Vec<&str> = vec![MSVCRT_BOOTSTRAP_IMPORT];
    for g in &symtab.globals {
        if g.is_function && g.is_extern {
            msvcrt_names.push(&g.name);
        }
    }
    writeln!(out, "  import msvcrt, \\").unwrap();
    let msvcrt_lines: Vec<String> = msvcrt_names
        .iter()
        .map(|n| format!("         {}, '{}'", n, n))
        .collect();
    writeln!(out, "{}", msvcrt_lines.join(", \\\n")).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_contains_fasm_preamble_and_bootstrap() {
        let mut out = String::new();
        write_header(&mut out);
        assert!(out.contains("format PE64 console"));
        assert!(out.contains("call [__getmainargs]"));
        assert!(out.contains("jmp main"));
    }

    #[test]
    fn data_section_lists_globals_then_argv_slots() {
        let mut st = SymbolTable::new();
        st.new_global("counter", 5);
        st.new_fn("main", false);
        let mut out = String::new();
        write_data_section(&mut out, &st);
        assert!(out.contains("counter dq 5"));
        assert!(!out.contains("main dq"));
        assert!(out.contains("main_argc dq ?"));
    }

    #[test]
    fn rodata_skipped_when_no_strings() {
        let mut out = String::new();
        write_rodata_section(&mut out, &StringTable::new());
        assert!(out.is_empty());
    }

    #[test]
    fn rodata_formats_printable_bytes_as_chars() {
        let mut strings = StringTable::new();
        strings.push(0, "\"hi\"".to_string());
        let mut out = String::new();
        write_rodata_section(&mut out, &strings);
        assert!(out.contains("_00000000 db 'h', 'i', 0"));
    }

    #[test]
    fn rodata_formats_newline_escape_as_decimal() {
        let mut strings = StringTable::new();
        strings.push(0, "\"a\\n\"".to_string());
        let mut out = String::new();
        write_rodata_section(&mut out, &strings);
        assert!(out.contains("_00000000 db 'a', 10, 0"));
    }

    #[test]
    fn idata_lists_predeclared_and_user_externs_under_msvcrt() {
        let mut st = SymbolTable::new();
        st.new_fn("printf", true);
        let mut out = String::new();
        write_idata_section(&mut out, &st);
        assert!(out.contains("__getmainargs"));
        assert!(out.contains("printf"));
        assert!(out.contains("ExitProcess"));
        assert!(out.contains("CommandLineToArgv"));
    }
}
