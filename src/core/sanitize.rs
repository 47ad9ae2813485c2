// src/core/sanitize.rs

/// Collapse runs of whitespace to one space and trim.
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space { out.push(' '); prev_space = true; }
        } else { out.push(ch); prev_space = false; }
    }
    out.trim().to_string()
}

/// Directory-safe name: letters (any script), digits, `_`, `-`, `(`, `)`.
/// Everything else is dropped. Empty results fall back to `fallback`.
pub fn slug(name: &str, fallback: &str) -> String {
    let out: String = name
        .chars()
        .filter(|&ch| ch.is_alphanumeric() || matches!(ch, '_' | '-' | '(' | ')'))
        .collect();
    if out.is_empty() { s!(fallback) } else { out }
}
