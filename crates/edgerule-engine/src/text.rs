//! Text normalization for data element values

/// Trim and collapse every whitespace run, newlines included, to one space
pub fn clean_text(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
