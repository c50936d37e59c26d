/// Split `text` into contiguous slices of at most `chunk_chars` characters.
///
/// Boundaries are counted in chars, never bytes, so no slice splits a UTF-8 sequence. The
/// slices concatenate back to `text`; empty input yields no chunks.
pub fn chunk_text(text: &str, chunk_chars: usize) -> Vec<&str> {
    let size = chunk_chars.max(1);
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut n = 0usize;
    for (idx, _) in text.char_indices() {
        if n == size {
            out.push(&text[start..idx]);
            start = idx;
            n = 0;
        }
        n += 1;
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}
