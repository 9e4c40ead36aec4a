//! Per-thread call-stack symbol entries.
//!
//! The parser emits one symbol record per API call on threads that were
//! traced with stack capture enabled; the Nth entry for a thread belongs to
//! the Nth API call on that thread. Consumed by hover / goto-source features.

use std::collections::BTreeMap;

use crate::record::SymbolFileEntry;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolEntry {
    pub api_name: String,
    pub symbol_name: String,
    pub file_name: String,
    pub line_number: u32,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: BTreeMap<u64, Vec<SymbolEntry>>,
}

impl SymbolTable {
    pub fn add_entry(&mut self, entry: &SymbolFileEntry) {
        self.entries
            .entry(entry.thread_id)
            .or_default()
            .push(SymbolEntry {
                api_name: entry.api_name.clone(),
                symbol_name: entry.symbol_name.clone(),
                file_name: entry.file_name.clone(),
                line_number: entry.line_number,
            });
    }

    /// The symbol entry for the call at `call_index` on `thread_id`.
    pub fn entry(&self, thread_id: u64, call_index: usize) -> Option<&SymbolEntry> {
        self.entries
            .get(&thread_id)
            .and_then(|list| list.get(call_index))
    }

    pub fn thread_has_symbols(&self, thread_id: u64) -> bool {
        self.entries.get(&thread_id).is_some_and(|l| !l.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
