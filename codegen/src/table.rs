use std::collections::BTreeMap;

use crate::error::CodegenError;

/// Name of the hidden lower-bound snapshot cell for a loop iterator.
pub fn lbound_name(iter: &str) -> String {
    format!("{iter}@lo")
}

/// Name of the hidden upper-bound snapshot cell for a loop iterator.
pub fn ubound_name(iter: &str) -> String {
    format!("{iter}@hi")
}

/// What a declared name stands for.
///
/// `Shadow` cells hold a loop bound snapshot; their names carry an `@`
/// so they can never collide with source identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Scalar { iterator: bool },
    Shadow,
    Array { from: u64, to: u64 },
}

/// A declared name with its assigned memory cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub line: usize,
    pub cell: u64,
    pub kind: SymbolKind,
}

impl Symbol {
    /// Memory cells the symbol occupies.
    ///
    /// An array gets one cell more than its extent; the first cell is
    /// reserved and elements start at `cell + 1`.
    pub fn cells(&self) -> u64 {
        match self.kind {
            SymbolKind::Scalar { .. } | SymbolKind::Shadow => 1,
            SymbolKind::Array { from, to } => to - from + 2,
        }
    }

    pub fn is_iterator(&self) -> bool {
        matches!(self.kind, SymbolKind::Scalar { iterator: true })
    }
}

/// Maps declared names to memory cells.
///
/// Cells are handed out in declaration order, starting at zero. The
/// usage-weighted pass rebuilds the table in a different order; the
/// mapping itself never changes once emission starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationTable {
    symbols: BTreeMap<String, Symbol>,
    next_free: u64,
}

impl AllocationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next free cells to `name`.
    pub fn declare(
        &mut self,
        name: &str,
        line: usize,
        kind: SymbolKind,
    ) -> Result<(), CodegenError> {
        if let SymbolKind::Array { from, to } = kind {
            if to < from {
                return Err(CodegenError::InvalidArrayBounds {
                    name: name.to_owned(),
                    line,
                    from,
                    to,
                });
            }
        }
        if self.symbols.contains_key(name) {
            return Err(CodegenError::DuplicateDeclaration {
                name: name.to_owned(),
                line,
            });
        }
        let symbol = Symbol {
            name: name.to_owned(),
            line,
            cell: self.next_free,
            kind,
        };
        self.next_free += symbol.cells();
        self.symbols.insert(name.to_owned(), symbol);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&Symbol, CodegenError> {
        self.symbols.get(name).ok_or_else(|| CodegenError::UnboundVariable {
            name: name.to_owned(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn next_free(&self) -> u64 {
        self.next_free
    }

    /// All symbols, in name order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    /// All symbols, in memory-cell order.
    pub fn symbols_by_cell(&self) -> Vec<&Symbol> {
        let mut list: Vec<&Symbol> = self.symbols.values().collect();
        list.sort_by_key(|s| s.cell);
        list
    }

    /// Mark an existing scalar as a loop iterator.
    pub fn promote_iterator(&mut self, name: &str) {
        if let Some(symbol) = self.symbols.get_mut(name) {
            if let SymbolKind::Scalar { iterator } = &mut symbol.kind {
                *iterator = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_are_assigned_in_declaration_order() {
        let mut table = AllocationTable::new();
        assert!(table.is_empty());
        table.declare("a", 1, SymbolKind::Scalar { iterator: false }).unwrap();
        table.declare("t", 1, SymbolKind::Array { from: 1, to: 5 }).unwrap();
        table.declare("b", 2, SymbolKind::Scalar { iterator: false }).unwrap();

        assert_eq!(table.resolve("a").unwrap().cell, 0);
        assert_eq!(table.resolve("t").unwrap().cell, 1);
        // 5 elements plus the reserved first cell.
        assert_eq!(table.resolve("t").unwrap().cells(), 6);
        assert_eq!(table.resolve("b").unwrap().cell, 7);
        assert_eq!(table.next_free(), 8);
    }

    #[test]
    fn duplicate_declaration_is_rejected() {
        let mut table = AllocationTable::new();
        table.declare("a", 1, SymbolKind::Scalar { iterator: false }).unwrap();
        let err = table
            .declare("a", 3, SymbolKind::Array { from: 0, to: 2 })
            .unwrap_err();
        assert_eq!(
            err,
            CodegenError::DuplicateDeclaration { name: "a".into(), line: 3 }
        );
    }

    #[test]
    fn reversed_bounds_are_rejected() {
        let mut table = AllocationTable::new();
        let err = table
            .declare("t", 2, SymbolKind::Array { from: 5, to: 1 })
            .unwrap_err();
        assert!(matches!(err, CodegenError::InvalidArrayBounds { .. }));
    }

    #[test]
    fn unknown_name_is_unbound() {
        let table = AllocationTable::new();
        assert_eq!(
            table.resolve("x").unwrap_err(),
            CodegenError::UnboundVariable { name: "x".into() }
        );
    }

    #[test]
    fn shadow_names_cannot_collide_with_identifiers() {
        // Source identifiers are lowercase letters and underscores only,
        // so the '@' in shadow names keeps them out of that namespace.
        assert_eq!(lbound_name("i"), "i@lo");
        assert_eq!(ubound_name("i"), "i@hi");
    }

    #[test]
    fn promote_marks_a_scalar_as_iterator() {
        let mut table = AllocationTable::new();
        table.declare("i", 1, SymbolKind::Scalar { iterator: false }).unwrap();
        assert!(!table.resolve("i").unwrap().is_iterator());
        table.promote_iterator("i");
        assert!(table.resolve("i").unwrap().is_iterator());
    }
}
