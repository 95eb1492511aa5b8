pub use insights_core::config::DEFAULT_CHUNK_SIZE;

/// Split `text` into consecutive windows of `size` characters; the last one
/// may be shorter. Boundaries ignore word breaks but never split a UTF-8
/// sequence. A `size` of zero is treated as one.
pub fn chunk_text(text: &str, size: usize) -> Vec<&str> {
    let size = size.max(1);
    let mut chunks = Vec::with_capacity(text.len() / size + 1);
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == size {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }

    chunks
}
