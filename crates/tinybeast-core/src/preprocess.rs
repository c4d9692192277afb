use unicode_normalization::UnicodeNormalization;

/// Longest query accepted from any input source
pub const MAX_QUERY_CHARS: usize = 256;

/// Cap a query at [`MAX_QUERY_CHARS`] characters
pub fn truncate_query(text: &str) -> String {
    text.chars().take(MAX_QUERY_CHARS).collect()
}

/// Clean text captured from the clipboard or a selection
pub fn normalize_captured(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }

    let text: String = text.nfkc().collect();
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    truncate_query(&collapsed)
}
