use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static NON_IDENT: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"[^A-Za-z0-9_]+").expect("valid identifier regex")
});

/// Check if a string is snake_case
pub(crate) fn is_snake_case(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    if !s
        .chars()
        .next()
        .map(|c| c.is_lowercase() || c == '_')
        .unwrap_or(false)
    {
        return false;
    }
    s.chars()
        .all(|c| c.is_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Convert a string to snake_case
pub(crate) fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    let mut prev_lower = false;

    for ch in s.chars() {
        if ch.is_uppercase() {
            if prev_lower && !result.ends_with('_') {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
            prev_lower = false;
        } else if ch.is_lowercase() || ch.is_ascii_digit() {
            result.push(ch);
            prev_lower = true;
        } else if !result.is_empty() && !result.ends_with('_') {
            result.push('_');
            prev_lower = false;
        }
    }

    result.trim_end_matches('_').to_string()
}

/// Last path segment of a type, without generic arguments
///
/// `app::orders::GetOrder<T>` → `GetOrder`
pub(crate) fn type_stem(ty: &str) -> &str {
    let base = ty.split('<').next().unwrap_or(ty).trim();
    base.rsplit("::").next().unwrap_or(base)
}

/// snake_case identifier fragment for a type or method name
pub(crate) fn ident_fragment(raw: &str) -> String {
    let cleaned = NON_IDENT.replace_all(type_stem(raw), "_");
    let snake = if is_snake_case(&cleaned) {
        cleaned.into_owned()
    } else {
        to_snake_case(&cleaned)
    };
    match snake.chars().next() {
        None => "unnamed".to_string(),
        Some(c) if c.is_ascii_digit() => format!("_{snake}"),
        Some(_) => snake,
    }
}

/// Return `base`, or `base_N` if it was already handed out
pub(crate) fn unique_ident(seen: &mut HashSet<String>, base: &str) -> String {
    if seen.insert(base.to_string()) {
        return base.to_string();
    }
    let mut i = 1usize;
    loop {
        let candidate = format!("{base}_{i}");
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        i += 1;
    }
}

/// A Rust string literal for `s`
pub(crate) fn str_literal(s: &str) -> String {
    format!("{s:?}")
}
