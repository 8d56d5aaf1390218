use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::{EngineError, EngineResult};

static NON_IDENT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9a-z]+").expect("identifier pattern compiles"));

/// Rewrites an arbitrary header into a lowercase snake_case identifier.
///
/// Every run of characters outside `[0-9a-z]` becomes one underscore, edge
/// underscores are dropped, and names that would start with a digit get a
/// `col_` prefix. An input with nothing usable left becomes `col`.
pub fn sanitize_identifier(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let replaced = NON_IDENT_RUN.replace_all(&lowered, "_");
    let trimmed = replaced.trim_matches('_');

    if trimmed.is_empty() {
        return "col".to_string();
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("col_{trimmed}");
    }
    trimmed.to_string()
}

/// Makes sanitized names unique in order of appearance.
///
/// The first holder of a name keeps it; later duplicates get `_2`, `_3`, ...
/// skipping any suffix that is taken or that another column already carries.
/// Names in `reserved` are treated as taken before the first column.
pub fn unique_identifiers(names: &[String], reserved: &[&str]) -> Vec<String> {
    let mut taken: HashSet<String> = reserved.iter().map(|name| name.to_string()).collect();
    let originals: HashSet<&str> = names.iter().map(String::as_str).collect();
    let mut unique = Vec::with_capacity(names.len());

    for name in names {
        if taken.insert(name.clone()) {
            unique.push(name.clone());
            continue;
        }
        let mut suffix = 2usize;
        loop {
            let candidate = format!("{name}_{suffix}");
            if !originals.contains(candidate.as_str()) && taken.insert(candidate.clone()) {
                unique.push(candidate);
                break;
            }
            suffix += 1;
        }
    }
    unique
}

/// Double-quotes an identifier for use in generated SQL.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn validate_identifier(kind: &str, value: &str) -> EngineResult<()> {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return Err(EngineError::InvalidInput(format!("{kind} is empty")));
    };
    if !is_ident_start(first) || !chars.all(is_ident_continue) {
        return Err(EngineError::InvalidInput(format!(
            "{kind} must be alphanumeric or underscore and start with a letter or underscore: {value}"
        )));
    }
    Ok(())
}

fn is_ident_start(value: char) -> bool {
    value == '_' || value.is_ascii_alphabetic()
}

fn is_ident_continue(value: char) -> bool {
    is_ident_start(value) || value.is_ascii_digit()
}
