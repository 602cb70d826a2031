use std::collections::BTreeMap;

use parser::ast::{Expr, Ident, Index, Stmt, Value};

use crate::table::{AllocationTable, SymbolKind, lbound_name, ubound_name};

/// Multiplier applied to everything inside a loop body.
pub const LOOP_WEIGHT: u64 = 20;

/// Extra weight a loop iterator earns at its `FOR` header, on top of the
/// uses counted inside the body.
pub const ITERATOR_BONUS: u64 = 201;

/// Weighted occurrence counts for every name the program touches.
///
/// Loop bodies multiply the weight of everything inside them, so a name
/// used once in a doubly nested loop outweighs many straight-line uses.
pub fn count_occurrences(body: &[Stmt]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    count_block(body, 1, &mut counts);
    counts
}

fn bump(counts: &mut BTreeMap<String, u64>, name: &str, weight: u64) {
    *counts.entry(name.to_owned()).or_default() += weight;
}

fn count_ident(ident: &Ident, weight: u64, counts: &mut BTreeMap<String, u64>) {
    match ident {
        Ident::Scalar(name) => bump(counts, name, weight),
        Ident::Element { array, index } => {
            bump(counts, array, weight);
            if let Index::Variable(pid) = index {
                bump(counts, pid, weight);
            }
        }
    }
}

fn count_value(value: &Value, weight: u64, counts: &mut BTreeMap<String, u64>) {
    if let Value::Ident(ident) = value {
        count_ident(ident, weight, counts);
    }
}

fn count_block(
    body: &[Stmt],
    weight: u64,
    counts: &mut BTreeMap<String, u64>,
) {
    for stmt in body {
        count_stmt(stmt, weight, counts);
    }
}

fn count_stmt(stmt: &Stmt, weight: u64, counts: &mut BTreeMap<String, u64>) {
    match stmt {
        Stmt::Assign { target, expr } => {
            count_ident(target, weight, counts);
            match expr {
                Expr::Value(value) => count_value(value, weight, counts),
                Expr::Binary { lhs, rhs, .. } => {
                    count_value(lhs, weight, counts);
                    count_value(rhs, weight, counts);
                }
            }
        }
        Stmt::Read { target } => count_ident(target, weight, counts),
        Stmt::Write { value } => count_value(value, weight, counts),
        Stmt::If { cond, body } => {
            count_value(&cond.lhs, weight, counts);
            count_value(&cond.rhs, weight, counts);
            count_block(body, weight, counts);
        }
        Stmt::IfElse { cond, then_body, else_body } => {
            count_value(&cond.lhs, weight, counts);
            count_value(&cond.rhs, weight, counts);
            count_block(then_body, weight, counts);
            count_block(else_body, weight, counts);
        }
        Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
            let inner = weight.saturating_mul(LOOP_WEIGHT);
            count_value(&cond.lhs, inner, counts);
            count_value(&cond.rhs, inner, counts);
            count_block(body, inner, counts);
        }
        Stmt::For { iter, from, to, body }
        | Stmt::ForDownTo { iter, from, to, body } => {
            let inner = weight.saturating_mul(LOOP_WEIGHT);
            bump(counts, iter, ITERATOR_BONUS.saturating_mul(weight));
            count_value(from, inner, counts);
            count_value(to, inner, counts);
            count_block(body, inner, counts);
        }
    }
}

/// Rebuild the allocation table so hot names get low memory cells.
///
/// Low cells are cheap to address (fewer instructions to materialize the
/// address constant), so symbols are re-declared in order of descending
/// weighted use; iterators keep their bound-snapshot cells adjacent.
/// Names the program never touches keep their relative order at the end.
///
/// If the rebuilt table does not cover exactly the original names, the
/// original table is returned unchanged.
pub fn optimize(table: AllocationTable, body: &[Stmt]) -> AllocationTable {
    let counts = count_occurrences(body);

    let mut used: Vec<_> = table
        .symbols()
        .filter(|s| s.kind != SymbolKind::Shadow)
        .filter(|s| counts.get(&s.name).copied().unwrap_or(0) > 0)
        .cloned()
        .collect();
    used.sort_by(|a, b| {
        let ca = counts.get(&a.name).copied().unwrap_or(0);
        let cb = counts.get(&b.name).copied().unwrap_or(0);
        cb.cmp(&ca).then_with(|| a.name.cmp(&b.name))
    });

    let mut unused: Vec<_> = table
        .symbols()
        .filter(|s| s.kind != SymbolKind::Shadow)
        .filter(|s| counts.get(&s.name).copied().unwrap_or(0) == 0)
        .cloned()
        .collect();
    unused.sort_by_key(|s| s.cell);

    let mut rebuilt = AllocationTable::new();
    for symbol in used.iter().chain(unused.iter()) {
        let declared = rebuilt
            .declare(&symbol.name, symbol.line, symbol.kind)
            .and_then(|()| {
                if symbol.is_iterator() {
                    rebuilt.declare(
                        &lbound_name(&symbol.name),
                        symbol.line,
                        SymbolKind::Shadow,
                    )?;
                    rebuilt.declare(
                        &ubound_name(&symbol.name),
                        symbol.line,
                        SymbolKind::Shadow,
                    )?;
                }
                Ok(())
            });
        if declared.is_err() {
            log::debug!(
                "allocation rebuild failed at '{}', keeping original order",
                symbol.name
            );
            return table;
        }
    }

    if rebuilt.len() != table.len() {
        log::debug!(
            "allocation rebuild covered {} of {} names, keeping original order",
            rebuilt.len(),
            table.len()
        );
        return table;
    }

    rebuilt
}
