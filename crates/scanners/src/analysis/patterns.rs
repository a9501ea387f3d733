//! Lexical helpers shared by the model builder and the detectors.

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// `true` when `word` occurs in `text` delimited by non-identifier characters.
pub fn contains_word(text: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    text.match_indices(word).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + word.len()..].chars().next();
        !before.map_or(false, is_ident_char) && !after.map_or(false, is_ident_char)
    })
}

/// Leading identifier of an lvalue: `balances[msg.sender].amount` gives `balances`.
pub fn root_identifier(expr: &str) -> Option<&str> {
    let trimmed = expr.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
    let end = trimmed
        .char_indices()
        .find(|(_, c)| !is_ident_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    let ident = &trimmed[..end];
    match ident.chars().next() {
        Some(c) if !c.is_ascii_digit() => Some(ident),
        _ => None,
    }
}

/// Byte offset of the first plain `=` (not `==`, `!=`, `<=`, `>=`, `=>`, or a compound operator).
pub fn assignment_position(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'=' {
            continue;
        }
        let prev = if i > 0 { bytes[i - 1] } else { b' ' };
        let next = bytes.get(i + 1).copied().unwrap_or(b' ');
        if next == b'=' || next == b'>' {
            continue;
        }
        if matches!(
            prev,
            b'=' | b'!' | b'<' | b'>' | b'+' | b'-' | b'*' | b'/' | b'%' | b'|' | b'&' | b'^'
        ) {
            continue;
        }
        return Some(i);
    }
    None
}

/// Name that captures the first value of a binding target.
///
/// `(bool ok, bytes memory data)` gives `ok`, `bool sent` gives `sent`,
/// `(, bytes memory data)` gives `None` because the first slot is discarded.
pub fn bound_variable(target: &str) -> Option<String> {
    let inner = target.trim().trim_start_matches('(').trim_end_matches(')');
    let first = inner.split(',').next()?.trim();
    let name = first.split_whitespace().last()?;
    if name.chars().all(is_ident_char) && !name.is_empty() {
        Some(name.to_string())
    } else {
        None
    }
}

/// Removes `{value: ..., gas: ...}` call options from a callee expression.
pub fn strip_call_options(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

pub fn references_timestamp(text: &str) -> bool {
    text.contains("block.timestamp") || contains_word(text, "now")
}

pub fn uses_safe_math(text: &str) -> bool {
    text.contains("SafeMath")
        || [".add(", ".sub(", ".mul(", ".div(", ".tryAdd(", ".trySub(", ".tryMul("]
            .iter()
            .any(|p| text.contains(p))
}

/// Guard-like statement text: `require`, `assert`, `revert` or an `if` header.
pub fn is_guard_text(text: &str) -> bool {
    let t = text.trim_start();
    ["require", "assert", "revert", "if"].iter().any(|kw| {
        t.strip_prefix(kw)
            .map_or(false, |rest| !rest.starts_with(is_ident_char))
    })
}

pub fn is_comparison(text: &str) -> bool {
    text.contains("==") || text.contains("!=")
}
