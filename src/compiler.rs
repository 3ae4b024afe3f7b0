// The compiler proper: a recursive-descent parser that emits fasm text directly as it
// recognizes each construct. There is no intermediate AST; `self.out` accumulates the
// `.text` body while `self.symtab`/`self.strings` accumulate the bookkeeping needed to
// emit `.data`/`.rodata`/`.idata` once the whole file has been seen.

use std::fmt::Write as _;

use crate::consts::*;
use crate::escape::{decode_literal_body, UnknownEscape};
use crate::label::label_name;
use crate::lexer::Lexer;
use crate::strings::StringTable;
use crate::symtab::SymbolTable;
use crate::token::{Token, TokenKind};

const MAX_CALL_ARGS: usize = 4;
const PARAM_REGS: [&str; MAX_CALL_ARGS] = ["rcx", "rdx", "r8", "r9"];

pub struct CompileOutcome {
    pub output: String,
    pub error_count: usize,
    pub diagnostics: Vec<String>,
}

pub struct Compiler {
    lexer: Lexer,
    cur: Token,
    out: String,
    symtab: SymbolTable,
    labels: crate::label::LabelGen,
    strings: StringTable,
    /// Set by the primary/postfix level whenever `self.out` currently holds the
    /// *address* of the just-parsed expression rather than its value, so the
    /// assignment level (`expr0`) knows whether `=` is legal here.
    lvalue: bool,
    /// Set by `compile_ident_ref` whenever the primary just parsed was a function
    /// reference, recording whether it was an extern (imported) function. `compile_call`
    /// captures this into a call-local variable before evaluating arguments, since
    /// argument evaluation may reference other identifiers and overwrite it.
    curr_is_extern: bool,
    return_label: Option<u32>,
    error_count: usize,
    diagnostics: Vec<String>,
    input_name: String,
}

impl Compiler {
    pub fn new(source: &str, input_name: &str) -> Self {
        let mut symtab = SymbolTable::new();
        for name in PREDECLARED_EXTERNS {
            symtab.new_fn(name, true);
        }
        Compiler {
            lexer: Lexer::new(source),
            cur: Token::eof(1),
            out: String::new(),
            symtab,
            labels: crate::label::LabelGen::new(),
            strings: StringTable::new(),
            lvalue: false,
            curr_is_extern: false,
            return_label: None,
            error_count: 0,
            diagnostics: Vec::new(),
            input_name: input_name.to_string(),
        }
    }

    pub fn run(mut self) -> CompileOutcome {
        log::info!("compiling {}", self.input_name);
        self.advance();
        while !self.cur.is_eof() {
            self.top_level_decl();
        }
        self.finish()
    }

    fn finish(self) -> CompileOutcome {
        let Compiler {
            out,
            symtab,
            strings,
            error_count,
            diagnostics,
            ..
        } = self;

        let mut final_out = String::new();
        crate::output::write_header(&mut final_out);
        final_out.push_str(&out);
        crate::output::write_bootstrap_tail(&mut final_out);
        crate::output::write_data_section(&mut final_out, &symtab);
        crate::output::write_rodata_section(&mut final_out, &strings);
        crate::output::write_idata_section(&mut final_out, &symtab);

        CompileOutcome {
            output: final_out,
            error_count,
            diagnostics,
        }
    }

    // --- token plumbing -----------------------------------------------------

    fn advance(&mut self) {
        self.cur = self.lexer.next();
    }

    fn is(&self, lexeme: &str) -> bool {
        self.cur.lexeme == lexeme
    }

    fn is_type_keyword(&self) -> bool {
        self.is("int") || self.is("char") || self.is("bool")
    }

    fn wants_address(&self) -> bool {
        self.is("=") || self.is("++") || self.is("--")
    }

    /// Always advances, even on mismatch, so a missing token doesn't wedge the parser.
    fn expect(&mut self, lexeme: &str) {
        if !self.is(lexeme) {
            self.error(&format!("expected '{}', got '%s'", lexeme));
        }
        self.advance();
    }

    /// `int`/`char`/`bool` are accepted and discarded; the compiler is typeless.
    fn expect_type_keyword(&mut self) {
        if self.is_type_keyword() {
            self.advance();
        } else {
            self.error("expected a type keyword, got '%s'");
        }
    }

    fn ident_name(&mut self) -> String {
        if self.cur.kind != TokenKind::Ident {
            self.error("expected identifier, got '%s'");
            self.advance();
            return String::from("<error>");
        }
        let name = self.cur.lexeme.clone();
        self.advance();
        name
    }

    fn error(&mut self, template: &str) {
        let msg = template.replacen("%s", &self.cur.lexeme, 1);
        self.error_at(self.cur.line, &msg);
    }

    fn error_at(&mut self, line: usize, msg: &str) {
        let full = format!("{}:{}: error: {}", self.input_name, line, msg);
        log::error!("{}", full);
        self.diagnostics.push(full);
        self.error_count += 1;
    }

    // --- top level ------------------------------------------------------------

    fn top_level_decl(&mut self) {
        self.expect_type_keyword();
        while self.is("*") {
            self.advance();
        }
        let name = self.ident_name();

        if self.is("(") {
            self.compile_function(&name);
        } else {
            self.compile_global_var(&name);
        }
    }

    fn compile_global_var(&mut self, name: &str) {
        let mut init = 0i64;
        if self.is("=") {
            self.advance();
            init = self.const_int_expr();
        }
        self.symtab.new_global(name, init);
        self.expect(";");
    }

    fn const_int_expr(&mut self) -> i64 {
        let neg = self.is("-");
        if neg {
            self.advance();
        }
        if self.cur.kind != TokenKind::Int {
            self.error("expected a constant integer, got '%s'");
            return 0;
        }
        let v: i64 = self.cur.lexeme.parse().unwrap_or(0);
        self.advance();
        if neg {
            -v
        } else {
            v
        }
    }

    fn compile_function(&mut self, name: &str) {
        self.symtab.new_fn(name, false);
        self.symtab.new_scope();

        self.expect("(");
        let mut param_count = 0usize;
        if !self.is(")") {
            loop {
                self.expect_type_keyword();
                while self.is("*") {
                    self.advance();
                }
                let pname = self.ident_name();
                self.symtab.new_param(&pname);
                param_count += 1;
                if self.is(",") {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect(")");

        if param_count > MAX_CALL_ARGS {
            self.error_at(
                self.cur.line,
                &format!("at most {} parameters are supported", MAX_CALL_ARGS),
            );
        }

        if self.is(";") {
            // Prototype only; nothing to emit, the globals table already knows it.
            self.advance();
            return;
        }

        log::debug!("compiling function {}", name);

        // Body-first layout: the prologue can only be sized once local_no is known,
        // which happens only after the whole body has streamed out. So the body is
        // emitted first behind a label, and the prologue (emitted last) jumps into it.
        let body_label = self.labels.new_label();
        let return_to = self.labels.new_label();
        let saved_return_label = self.return_label;
        self.return_label = Some(return_to);

        writeln!(self.out, "{}:", label_name(body_label)).unwrap();
        for (i, reg) in PARAM_REGS.iter().enumerate().take(param_count) {
            let offset = self.symtab.locals[i].offset;
            writeln!(self.out, "    mov qword [rbp{:+}], {}", offset, reg).unwrap();
        }

        self.expect("{");
        while !self.is("}") && !self.cur.is_eof() {
            self.statement();
        }
        self.expect("}");

        if name == "main" {
            self.out.push_str("    mov rcx, 0\n");
            self.out.push_str("    call [ExitProcess]\n");
        }

        writeln!(self.out, "{}:", label_name(return_to)).unwrap();
        self.out.push_str("    mov rsp, rbp\n");
        self.out.push_str("    pop rbp\n");
        self.out.push_str("    ret\n");

        writeln!(self.out, "{}:", name).unwrap();
        self.out.push_str("    push rbp\n");
        self.out.push_str("    mov rbp, rsp\n");
        writeln!(self.out, "    sub rsp, {}", WORD_SIZE * self.symtab.local_no()).unwrap();
        writeln!(self.out, "    jmp {}", label_name(body_label)).unwrap();

        self.return_label = saved_return_label;
    }

    // --- statements -------------------------------------------------------------

    fn statement(&mut self) {
        if self.is_type_keyword() {
            self.local_decl();
        } else if self.is("if") {
            self.compile_if();
        } else if self.is("while") {
            self.compile_while_or_do(false);
        } else if self.is("do") {
            self.advance();
            self.compile_while_or_do(true);
        } else if self.is("for") {
            self.compile_for();
        } else if self.is("return") {
            self.compile_return();
        } else if self.is("{") {
            self.advance();
            while !self.is("}") && !self.cur.is_eof() {
                self.statement();
            }
            self.expect("}");
        } else if self.is(";") {
            self.advance();
        } else {
            self.expr0();
            self.expect(";");
        }
    }

    fn local_decl(&mut self) {
        self.expect_type_keyword();
        loop {
            while self.is("*") {
                self.advance();
            }
            let name = self.ident_name();

            if self.is("(") {
                self.error_at(
                    self.cur.line,
                    "function declarations are only allowed at module scope",
                );
            }

            let offset = self.symtab.new_local(&name);
            if self.is("=") {
                self.advance();
                self.expr0();
                writeln!(self.out, "    mov [rbp{:+}], rax", offset).unwrap();
            }

            if self.is(",") {
                self.advance();
                continue;
            }
            break;
        }
        self.expect(";");
    }

    fn compile_return(&mut self) {
        self.advance();
        if self.is(";") {
            self.out.push_str("    xor rax, rax\n");
        } else {
            self.expr0();
        }
        self.expect(";");
        match self.return_label {
            Some(label) => writeln!(self.out, "    jmp {}", label_name(label)).unwrap(),
            None => self.error_at(self.cur.line, "'return' outside of a function"),
        }
    }

    /// Shared by `if` and the ternary operator. Assumes the condition value is already
    /// in `rax`. `isexpr` selects expression-branches (parsed via `expr1`, joined by
    /// `:`) vs statement-branches (parsed via `statement`, with an optional `else`).
    fn branch(&mut self, isexpr: bool) {
        let false_label = self.labels.new_label();
        let join_label = self.labels.new_label();
        self.out.push_str("    cmp rax, 0\n");
        writeln!(self.out, "    je {}", label_name(false_label)).unwrap();
        if isexpr {
            self.expr1();
        } else {
            self.statement();
        }
        writeln!(self.out, "    jmp {}", label_name(join_label)).unwrap();
        writeln!(self.out, "{}:", label_name(false_label)).unwrap();
        if isexpr {
            self.expect(":");
            self.expr1();
        } else if self.is("else") {
            self.advance();
            self.statement();
        }
        writeln!(self.out, "{}:", label_name(join_label)).unwrap();
    }

    fn compile_if(&mut self) {
        self.advance();
        self.expect("(");
        self.expr0();
        self.expect(")");
        self.branch(false);
    }

    /// Shared body for `while` and `do ... while`. For a plain `while`, the leading
    /// keyword is left unconsumed by the caller; this routine's own `expect("while")`
    /// consumes it, mirroring the original's single shared loop routine.
    fn compile_while_or_do(&mut self, is_do: bool) {
        log::debug!("compiling {} loop", if is_do { "do-while" } else { "while" });
        let head = self.labels.new_label();
        let brk = self.labels.new_label();
        writeln!(self.out, "{}:", label_name(head)).unwrap();

        if is_do {
            self.statement();
        }

        self.expect("while");
        self.expect("(");
        self.expr0();
        self.expect(")");
        if is_do {
            self.expect(";");
        }

        self.out.push_str("    cmp rax, 0\n");
        writeln!(self.out, "    je {}", label_name(brk)).unwrap();

        if !is_do {
            self.statement();
        }

        writeln!(self.out, "    jmp {}", label_name(head)).unwrap();
        writeln!(self.out, "{}:", label_name(brk)).unwrap();
    }

    fn compile_for(&mut self) {
        self.advance();
        self.expect("(");
        self.statement(); // init; a full statement, consumes its own ';'

        let cond_label = self.labels.new_label();
        let step_label = self.labels.new_label();
        let body_label = self.labels.new_label();
        let end_label = self.labels.new_label();

        writeln!(self.out, "{}:", label_name(cond_label)).unwrap();
        self.statement(); // cond; also a full statement, consumes its own ';'
        self.out.push_str("    cmp rax, 0\n");
        writeln!(self.out, "    jne {}", label_name(body_label)).unwrap();
        // Redundant re-check of the same flags, kept verbatim.
        self.out.push_str("    cmp rax, 0\n");
        writeln!(self.out, "    je {}", label_name(end_label)).unwrap();

        writeln!(self.out, "{}:", label_name(step_label)).unwrap();
        if !self.is(")") {
            self.expr0();
        }
        self.expect(")");
        writeln!(self.out, "    jmp {}", label_name(cond_label)).unwrap();

        writeln!(self.out, "{}:", label_name(body_label)).unwrap();
        self.statement();
        writeln!(self.out, "    jmp {}", label_name(step_label)).unwrap();
        writeln!(self.out, "{}:", label_name(end_label)).unwrap();
    }

    // --- expressions --------------------------------------------------------------
    //
    // assignment -> ternary -> ||/&& -> comparison -> arithmetic -> unary/postfix/primary
    // Every level leaves its value (or address, when lvalue) in rax; sub-expressions
    // spill via push rax / pop rbx.

    fn expr0(&mut self) {
        self.expr1();
        if self.lvalue && self.is("=") {
            self.out.push_str("    push rax\n");
            self.advance();
            self.expr0();
            self.out.push_str("    pop rbx\n");
            self.out.push_str("    mov [rbx], rax\n");
            self.lvalue = false;
        }
    }

    fn expr1(&mut self) {
        self.expr2();
        if self.is("?") {
            self.lvalue = false;
            self.advance();
            self.branch(true);
        }
    }

    fn expr2(&mut self) {
        self.expr3();
        loop {
            if self.is("||") {
                self.lvalue = false;
                self.advance();
                let join = self.labels.new_label();
                self.out.push_str("    cmp rax, 0\n");
                writeln!(self.out, "    jne {}", label_name(join)).unwrap();
                self.expr3();
                writeln!(self.out, "{}:", label_name(join)).unwrap();
            } else if self.is("&&") {
                self.lvalue = false;
                self.advance();
                let join = self.labels.new_label();
                self.out.push_str("    cmp rax, 0\n");
                writeln!(self.out, "    je {}", label_name(join)).unwrap();
                self.expr3();
                writeln!(self.out, "{}:", label_name(join)).unwrap();
            } else {
                break;
            }
        }
    }

    fn expr3(&mut self) {
        self.expr4();
        loop {
            let op = if self.is("==") {
                "=="
            } else if self.is("!=") {
                "!="
            } else if self.is("<") {
                "<"
            } else if self.is(">=") {
                ">="
            } else {
                break;
            };
            self.lvalue = false;
            self.advance();
            self.out.push_str("    push rax\n");
            self.expr4();
            self.out.push_str("    pop rbx\n");
            self.out.push_str("    cmp rbx, rax\n");
            self.out.push_str("    mov rax, 0\n");
            let setcc = match op {
                "==" => "sete",
                "!=" => "setne",
                "<" => "setl",
                ">=" => "setge",
                _ => unreachable!(),
            };
            writeln!(self.out, "    {} al", setcc).unwrap();
        }
    }

    fn expr4(&mut self) {
        self.primary();
        loop {
            let op = if self.is("+") {
                "+"
            } else if self.is("-") {
                "-"
            } else if self.is("*") {
                "*"
            } else {
                break;
            };
            self.lvalue = false;
            self.advance();
            self.out.push_str("    push rax\n");
            self.primary();
            self.out.push_str("    mov rbx, rax\n");
            self.out.push_str("    pop rax\n");
            match op {
                "+" => self.out.push_str("    add rax, rbx\n"),
                "-" => self.out.push_str("    sub rax, rbx\n"),
                "*" => self.out.push_str("    imul rax, rbx\n"),
                _ => unreachable!(),
            }
        }
    }

    fn primary(&mut self) {
        if self.is("-") {
            self.advance();
            self.primary();
            self.lvalue = false;
            self.out.push_str("    neg rax\n");
        } else if self.is("!") {
            self.advance();
            self.primary();
            self.lvalue = false;
            self.out.push_str("    cmp rax, 0\n");
            self.out.push_str("    mov rax, 0\n");
            self.out.push_str("    sete al\n");
        } else {
            self.primary_atom();
            self.primary_postfix();
        }
    }

    fn primary_atom(&mut self) {
        self.lvalue = false;
        self.curr_is_extern = false;

        match self.cur.kind {
            TokenKind::Int => {
                let v: i64 = self.cur.lexeme.parse().unwrap_or(0);
                writeln!(self.out, "    mov rax, {}", v).unwrap();
                self.advance();
            }
            TokenKind::Char => self.compile_char_literal(),
            TokenKind::Str => self.compile_string_literal(),
            TokenKind::Ident => {
                let name = self.cur.lexeme.clone();
                self.advance();
                if name == "true" {
                    self.out.push_str("    mov rax, 1\n");
                } else if name == "false" {
                    self.out.push_str("    mov rax, 0\n");
                } else {
                    self.compile_ident_ref(&name);
                }
            }
            TokenKind::Other => {
                if self.is("(") {
                    self.advance();
                    self.expr0();
                    self.expect(")");
                } else {
                    self.error("unexpected token '%s' in expression");
                    self.out.push_str("    xor rax, rax\n");
                    self.advance();
                }
            }
        }
    }

    /// Global found -> `lea rax, [name]` when it's a function or lvalue is wanted,
    /// otherwise `mov rax, [name]`. Local found -> same choice against `[rbp+off]`.
    fn compile_ident_ref(&mut self, name: &str) {
        if let Some(local) = self.symtab.lookup_local(name) {
            let offset = local.offset;
            if self.wants_address() {
                writeln!(self.out, "    lea rax, [rbp{:+}]", offset).unwrap();
                self.lvalue = true;
            } else {
                writeln!(self.out, "    mov rax, [rbp{:+}]", offset).unwrap();
                self.lvalue = false;
            }
            return;
        }

        let global = self.symtab.lookup_global(name).cloned();
        match global {
            Some(g) if g.is_function => {
                writeln!(self.out, "    lea rax, [{}]", name).unwrap();
                self.curr_is_extern = g.is_extern;
                self.lvalue = false;
            }
            Some(_) => {
                if self.wants_address() {
                    writeln!(self.out, "    lea rax, [{}]", name).unwrap();
                    self.lvalue = true;
                } else {
                    writeln!(self.out, "    mov rax, [{}]", name).unwrap();
                    self.lvalue = false;
                }
            }
            None => {
                self.error_at(self.cur.line, &format!("undeclared identifier '{}'", name));
                self.out.push_str("    xor rax, rax\n");
                self.lvalue = false;
            }
        }
    }

    fn primary_postfix(&mut self) {
        loop {
            if self.is("(") {
                self.compile_call();
            } else if self.is("[") {
                self.advance();
                self.out.push_str("    push rax\n"); // base
                self.expr0(); // index, left in rax
                self.expect("]");
                self.out.push_str("    pop rbx\n"); // base
                if self.wants_address() {
                    self.out.push_str("    lea rax, [rbx+rax*8]\n");
                    self.lvalue = true;
                } else {
                    self.out.push_str("    mov rax, [rbx+rax*8]\n");
                    self.lvalue = false;
                }
            } else if self.is("++") || self.is("--") {
                let inc = self.is("++");
                self.advance();
                if !self.lvalue {
                    self.error_at(self.cur.line, "postfix '++'/'--' requires an lvalue");
                } else {
                    self.out.push_str("    mov rbx, rax\n");
                    self.out.push_str("    mov rax, [rbx]\n");
                    if inc {
                        self.out.push_str("    add qword [rbx], 1\n");
                    } else {
                        self.out.push_str("    sub qword [rbx], 1\n");
                    }
                }
                self.lvalue = false;
            } else {
                break;
            }
        }
    }

    /// Precondition: `self.out` already holds, in rax, either the real address of the
    /// callee (non-extern) or the address of its import-table slot (extern), and
    /// `self.curr_is_extern` records which.
    fn compile_call(&mut self) {
        let is_extern = self.curr_is_extern;
        self.advance(); // '('

        writeln!(self.out, "    sub rsp, {}", SHADOW_SPACE).unwrap();
        self.out.push_str("    push rax\n"); // save callee pointer

        let mut arg_chunks: Vec<String> = Vec::new();
        if !self.is(")") {
            loop {
                let start = self.out.len();
                self.expr0();
                arg_chunks.push(self.out.split_off(start));
                if self.is(",") {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect(")");

        let argc = arg_chunks.len();
        if argc > MAX_CALL_ARGS {
            self.error_at(
                self.cur.line,
                &format!("at most {} call arguments are supported", MAX_CALL_ARGS),
            );
        }

        // Pushed in reverse (right-to-left) so the first-written argument ends up
        // nearest rsp, matching the register load order below (§4.5.2's trampoline
        // achieves the same push order by evaluating right-to-left at runtime; this
        // buffered form gets there by replaying the chunks back to front instead).
        for chunk in arg_chunks.iter().rev() {
            self.out.push_str(chunk);
            self.out.push_str("    push rax\n");
        }

        for (i, reg) in PARAM_REGS.iter().enumerate().take(argc) {
            writeln!(self.out, "    mov {}, qword [rsp+{}]", reg, i as i64 * WORD_SIZE).unwrap();
        }

        if is_extern {
            writeln!(self.out, "    mov rax, [rsp+{}]", argc as i64 * WORD_SIZE).unwrap();
        } else {
            writeln!(self.out, "    lea rax, [rsp+{}]", argc as i64 * WORD_SIZE).unwrap();
        }
        self.out.push_str("    call qword [rax]\n");

        writeln!(self.out, "    add rsp, {}", WORD_SIZE * (argc as i64 + 1)).unwrap();
        writeln!(self.out, "    add rsp, {}", SHADOW_SPACE).unwrap();

        self.lvalue = false;
        self.curr_is_extern = false;
    }

    fn compile_char_literal(&mut self) {
        let lexeme = self.cur.lexeme.clone();
        let line = self.cur.line;
        let body = &lexeme[1..lexeme.len() - 1];
        match decode_literal_body(body) {
            Ok(bytes) if bytes.len() == 1 => {
                writeln!(self.out, "    mov rax, {}", bytes[0]).unwrap();
            }
            Ok(_) => {
                self.error_at(line, "a char literal must decode to exactly one byte");
                self.out.push_str("    xor rax, rax\n");
            }
            Err(UnknownEscape(c)) => {
                self.error_at(line, &format!("unknown escape '\\{}' in char literal", c));
                self.out.push_str("    xor rax, rax\n");
            }
        }
        self.advance();
    }

    /// Adjacent string literals concatenate: `"ab" "cd"` becomes one constant.
    fn compile_string_literal(&mut self) {
        let mut lexeme = self.cur.lexeme.clone();
        let line = self.cur.line;
        self.advance();
        while self.cur.kind == TokenKind::Str {
            let next = &self.cur.lexeme;
            lexeme.truncate(lexeme.len() - 1); // drop trailing '"'
            lexeme.push_str(&next[1..]); // append, dropping leading '"'
            self.advance();
        }

        let body = lexeme[1..lexeme.len() - 1].to_string();
        if let Err(UnknownEscape(c)) = decode_literal_body(&body) {
            self.error_at(line, &format!("unknown escape '\\{}' in string literal", c));
        }
        let label = self.labels.new_label();
        self.strings.push(label, lexeme);
        writeln!(self.out, "    lea rax, [{}]", label_name(label)).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(src: &str) -> CompileOutcome {
        Compiler::new(src, "test.c").run()
    }

    #[test]
    fn empty_main_emits_prologue_and_epilogue() {
        let out = compile("int main() { return 0; }");
        assert_eq!(out.error_count, 0);
        assert!(out.output.contains("main:"));
        assert!(out.output.contains("push rbp"));
        assert!(out.output.contains("pop rbp"));
        assert!(out.output.contains("ret"));
    }

    #[test]
    fn undeclared_identifier_is_an_error() {
        let out = compile("int main() { return y; }");
        assert_eq!(out.error_count, 1);
        assert!(out.diagnostics[0].contains("undeclared identifier 'y'"));
    }

    #[test]
    fn assignment_to_local_stores_through_its_address() {
        let out = compile("int main() { int x; x = 5; return x; }");
        assert_eq!(out.error_count, 0);
        assert!(out.output.contains("lea rax, [rbp-8]"));
        assert!(out.output.contains("mov [rbx], rax"));
    }

    #[test]
    fn calls_use_mov_lea_indirection_distinguishing_extern_from_internal() {
        let out = compile("int helper() { return 1; } int main() { helper(); printf(); return 0; }");
        assert_eq!(out.error_count, 0);
        assert!(out.output.contains("lea rax, [helper]"));
        assert!(out.output.contains("lea rax, [rsp+0]"));
        assert!(out.output.contains("mov rax, [printf]"));
        assert!(out.output.contains("mov rax, [rsp+0]"));
        assert!(out.output.matches("call qword [rax]").count() == 2);
    }

    #[test]
    fn call_arguments_load_into_registers_in_source_order() {
        let out = compile(
            "int add(int a, int b) { return a + b; } int main() { return add(10, 20); }",
        );
        assert_eq!(out.error_count, 0);
        // add(10, 20): 10 must reach rcx (first param), 20 must reach rdx (second),
        // which requires the buffered chunks to be pushed back-to-front so the
        // first-written argument ends up nearest rsp (see compile_call).
        let rcx_pos = out.output.find("mov rcx, qword [rsp+0]").unwrap();
        let mov10 = out.output.find("mov rax, 10\n").unwrap();
        let mov20 = out.output.find("mov rax, 20\n").unwrap();
        assert!(mov20 < mov10, "20 must be evaluated/pushed before 10");
        assert!(rcx_pos > mov10);
        assert!(out.output.contains("mov rdx, qword [rsp+8]"));
    }

    #[test]
    fn nested_call_preserves_outer_callee_pointer_across_inner_evaluation() {
        let out = compile(
            "int g(int x) { return x; } int f(int x, int y) { return x; } int main() { return f(g(1), 2); }",
        );
        assert_eq!(out.error_count, 0);
        assert!(out.output.matches("call qword [rax]").count() == 3);
    }

    #[test]
    fn if_else_emits_two_labels() {
        let out = compile("int main() { if (1) { return 1; } else { return 0; } }");
        assert_eq!(out.error_count, 0);
        assert_eq!(out.output.matches("je _").count(), 1);
        assert_eq!(out.output.matches("jmp _").count(), 1);
    }

    #[test]
    fn for_loop_has_redundant_condition_check() {
        let out = compile("int main() { for (;1;) { return 0; } }");
        assert_eq!(out.error_count, 0);
        assert_eq!(out.output.matches("cmp rax, 0").count(), 2);
    }

    #[test]
    fn do_while_and_while_share_loop_emitter() {
        let out = compile("int main() { int i; i = 0; while (i < 3) { i = i + 1; } do { i = i - 1; } while (i != 0); return i; }");
        assert_eq!(out.error_count, 0);
        assert!(out.output.matches("jne _").count() >= 1);
    }

    #[test]
    fn break_and_continue_are_not_keywords_and_fail_as_undeclared_identifiers() {
        let out = compile("int main() { while (1) { break; } return 0; }");
        assert_eq!(out.error_count, 1);
        assert!(out.diagnostics[0].contains("undeclared identifier 'break'"));
    }

    #[test]
    fn string_literal_is_pushed_into_rodata_table() {
        let out = compile(r#"int main() { puts("hi"); return 0; }"#);
        assert_eq!(out.error_count, 0);
        assert!(out.output.contains(".rodata"));
        assert!(out.output.contains("'h', 'i', 0"));
    }

    #[test]
    fn adjacent_string_literals_concatenate() {
        let out = compile(r#"int main() { puts("ab" "cd"); return 0; }"#);
        assert_eq!(out.error_count, 0);
        assert!(out.output.contains("'a', 'b', 'c', 'd', 0"));
    }

    #[test]
    fn pointer_indexing_scales_by_word_size() {
        let out = compile("int main() { int *p; p = malloc(40); p[1] = 2; return p[1]; }");
        assert_eq!(out.error_count, 0);
        assert!(out.output.contains("rax*8"));
    }

    #[test]
    fn postfix_increment_returns_pre_value() {
        let out = compile("int main() { int a; int b; a = 10; b = a++; return b; }");
        assert_eq!(out.error_count, 0);
        assert!(out.output.contains("mov rax, [rbx]"));
        assert!(out.output.contains("add qword [rbx], 1"));
    }

    #[test]
    fn missing_semicolon_reports_error_but_keeps_parsing() {
        let out = compile("int main() { int x = 1 return x; }");
        assert_eq!(out.error_count, 1);
        assert!(out.output.contains("main:"));
    }
}
