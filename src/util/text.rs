/// One-line preview of `s` for dry-run logging: newlines escaped, cut at
/// `length` characters.
pub fn preview(s: &str, length: usize) -> String {
    if s.is_empty() {
        return "empty".to_string();
    }
    let escaped = s.replace("\r\n", "\\n").replace('\n', "\\n");
    if escaped.chars().count() <= length {
        return escaped;
    }
    let cut: String = escaped.chars().take(length).collect();
    format!("{cut}...")
}

/// Cut `s` to at most `max` characters, keeping the head.
pub fn truncate_chars(s: &mut String, max: usize) {
    if let Some((idx, _)) = s.char_indices().nth(max) {
        s.truncate(idx);
    }
}
