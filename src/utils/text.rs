const ELLIPSIS: &str = "...";

/// Shortens `text` to at most `max_length` characters, the last three being an ellipsis.
pub fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    let kept = max_length.saturating_sub(ELLIPSIS.len());
    let mut result = text.chars().take(kept).collect::<String>();
    result.push_str(ELLIPSIS);
    result
}
