use crate::ast::Expr;
use crate::error::Error;
use crate::parser::parse_with;
use crate::registry::Grammar;
use dashmap::DashMap;
use std::sync::Arc;

// Process-wide AST cache. Entries are never mutated after insertion, so any
// number of threads can evaluate the same `Arc<Expr>` at once.
lazy_static::lazy_static! {
    static ref AST_CACHE: DashMap<String, Arc<Expr>> = DashMap::new();
}

/// The operator set and depth limit shape the parse as much as the text does.
fn cache_key(expression: &str, grammar: &Grammar, max_depth: usize) -> String {
    format!("{}\u{1}{}\u{1}{}", grammar.signature(), max_depth, expression)
}

/// Returns the cached AST for `expression`, parsing and inserting it on a
/// miss. Parse failures are not cached.
pub fn get_or_parse(expression: &str, grammar: &Grammar, max_depth: usize) -> Result<Arc<Expr>, Error> {
    let key = cache_key(expression, grammar, max_depth);
    if let Some(entry) = AST_CACHE.get(&key) {
        return Ok(Arc::clone(entry.value()));
    }

    log::debug!("AST cache miss for expression: {}", expression);
    let ast = Arc::new(parse_with(expression, grammar, max_depth)?);
    // another thread may have parsed the same text meanwhile; keep the first
    let entry = AST_CACHE.entry(key).or_insert(ast);
    Ok(Arc::clone(entry.value()))
}

pub fn len() -> usize {
    AST_CACHE.len()
}

pub fn is_empty() -> bool {
    AST_CACHE.is_empty()
}

/// Drop every cached AST.
pub fn clear() {
    AST_CACHE.clear();
}
