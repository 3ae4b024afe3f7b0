// Flat, insertion-ordered symbol tables. Lookups are linear scans, matching the
// original mini-c's approach and the small symbol counts a single translation
// unit actually has.

#[derive(Clone, Debug)]
pub struct GlobalSymbol {
    pub name: String,
    pub is_function: bool,
    pub is_extern: bool,
    pub init_value: i64,
}

#[derive(Clone, Debug)]
pub struct LocalSymbol {
    pub name: String,
    /// Offset from rbp. Positive for parameters, negative for locals.
    pub offset: i64,
}

#[derive(Default)]
pub struct SymbolTable {
    pub globals: Vec<GlobalSymbol>,
    pub locals: Vec<LocalSymbol>,
    local_no: i64,
    param_no: i64,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn new_global(&mut self, name: &str, init_value: i64) {
        self.globals.push(GlobalSymbol {
            name: name.to_string(),
            is_function: false,
            is_extern: false,
            init_value,
        });
    }

    pub fn new_fn(&mut self, name: &str, is_extern: bool) {
        self.globals.push(GlobalSymbol {
            name: name.to_string(),
            is_function: true,
            is_extern,
            init_value: 0,
        });
    }

    /// Starts a fresh local scope for a new function body.
    pub fn new_scope(&mut self) {
        self.locals.clear();
        self.local_no = 0;
        self.param_no = 0;
    }

    /// Total local slots consumed so far, parameters included (the prologue reserves
    /// `8 * local_no` bytes, which is why a function with parameters reserves more
    /// stack than its real local count needs, kept verbatim).
    pub fn local_no(&self) -> i64 {
        self.local_no
    }

    /// Declares a local variable, at the next free slot below the frame pointer.
    pub fn new_local(&mut self, name: &str) -> i64 {
        self.local_no += 1;
        let offset = -8 * (self.local_no - self.param_no + 1);
        self.locals.push(LocalSymbol {
            name: name.to_string(),
            offset,
        });
        offset
    }

    /// Declares a parameter. Calls `new_local` first (so `local_no` advances exactly
    /// as it does for an ordinary local), then overwrites the offset to land above the
    /// return address instead of below rbp.
    pub fn new_param(&mut self, name: &str) -> i64 {
        self.new_local(name);
        let offset = 8 * (2 + self.param_no);
        self.locals.last_mut().unwrap().offset = offset;
        self.param_no += 1;
        offset
    }

    /// First match in insertion order, matching `lookup_global` (§4.3's generic
    /// `lookup` operation is specified identically for both tables).
    pub fn lookup_local(&self, name: &str) -> Option<&LocalSymbol> {
        self.locals.iter().find(|l| l.name == name)
    }

    pub fn lookup_global(&self, name: &str) -> Option<&GlobalSymbol> {
        self.globals.iter().find(|g| g.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_get_positive_offsets_above_return_address() {
        let mut st = SymbolTable::new();
        st.new_scope();
        assert_eq!(st.new_param("a"), 16);
        assert_eq!(st.new_param("b"), 24);
    }

    #[test]
    fn locals_after_params_account_for_params_in_local_no() {
        let mut st = SymbolTable::new();
        st.new_scope();
        st.new_param("a");
        st.new_param("b");
        assert_eq!(st.new_local("x"), -16);
        assert_eq!(st.new_local("y"), -24);
        assert_eq!(st.local_no(), 4);
    }

    #[test]
    fn locals_with_no_params_get_tight_offsets() {
        let mut st = SymbolTable::new();
        st.new_scope();
        assert_eq!(st.new_local("x"), -8);
        assert_eq!(st.new_local("y"), -16);
    }

    #[test]
    fn earliest_local_wins_on_duplicate_name() {
        let mut st = SymbolTable::new();
        st.new_scope();
        let first = st.new_local("x");
        st.new_local("x");
        assert_eq!(st.lookup_local("x").unwrap().offset, first);
    }

    #[test]
    fn new_scope_clears_locals_and_resets_counters() {
        let mut st = SymbolTable::new();
        st.new_scope();
        st.new_param("a");
        st.new_local("x");
        st.new_scope();
        assert!(st.locals.is_empty());
        assert_eq!(st.new_param("b"), 16);
    }

    #[test]
    fn global_lookup_finds_functions_and_data() {
        let mut st = SymbolTable::new();
        st.new_global("counter", 0);
        st.new_fn("main", false);
        st.new_fn("printf", true);
        assert!(!st.lookup_global("counter").unwrap().is_function);
        assert!(st.lookup_global("main").unwrap().is_function);
        assert!(st.lookup_global("printf").unwrap().is_extern);
        assert!(st.lookup_global("missing").is_none());
    }
}
