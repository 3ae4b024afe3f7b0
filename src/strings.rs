// Accumulates string literal constants seen during compilation, for emission into
// .rodata once the whole function body has streamed past.

pub struct StringEntry {
    pub label: u32,
    /// The literal's raw source text, quotes included, escapes not yet decoded.
    pub raw_lexeme: String,
}

#[derive(Default)]
pub struct StringTable {
    entries: Vec<StringEntry>,
}

impl StringTable {
    pub fn new() -> Self {
        StringTable::default()
    }

    pub fn push(&mut self, label: u32, raw_lexeme: String) {
        self.entries.push(StringEntry { label, raw_lexeme });
    }

    pub fn entries(&self) -> &[StringEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
