//! Sliding-window word chunking for semantic search.

/// Split `text` into overlapping word windows.
///
/// Tokens are whitespace-delimited (newlines included, empty tokens
/// dropped). Windows of `window_size` tokens advance by `stride`, starting
/// at token 0; windows are emitted while the start index stays below
/// `len + stride - window_size`, which permits one trailing short window.
/// With the default window of 15 and stride of 5 adjacent windows overlap by
/// 10 tokens, so concept mentions at window boundaries are not lost.
///
/// Returns an empty vec when the text is too short to form a window —
/// callers treat that as insufficient input.
pub fn chunk(text: &str, window_size: usize, stride: usize) -> Vec<String> {
    let tokens: Vec<&str> = text.split_whitespace().collect();

    let mut windows = Vec::new();
    let mut start = 0;
    while start + window_size < tokens.len() + stride {
        let end = (start + window_size).min(tokens.len());
        windows.push(tokens[start..end].join(" "));
        start += stride;
    }

    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_short_input_yields_nothing() {
        assert!(chunk("too short input", 15, 5).is_empty());
        assert!(chunk("", 15, 5).is_empty());
    }

    #[test]
    fn test_exact_window_yields_one_chunk() {
        let text = words(15);
        let chunks = chunk(&text, 15, 5);
        assert_eq!(chunks, vec![text]);
    }

    #[test]
    fn test_windows_overlap_by_stride() {
        let chunks = chunk(&words(25), 15, 5);
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].starts_with("w0 "));
        assert!(chunks[1].starts_with("w5 "));
        assert!(chunks[2].starts_with("w10 "));
        // Last window is short (15 tokens would run past the end)
        assert!(chunks[2].ends_with("w24"));
    }

    #[test]
    fn test_deterministic() {
        let text = "Severe flooding hit the coastal region\nprompting new environmental policy debates across parliament this week";
        assert_eq!(chunk(text, 15, 5), chunk(text, 15, 5));
    }

    #[test]
    fn test_newlines_and_extra_whitespace_are_separators() {
        let messy = "a  b\nc\n\n d e f g h i j k l m n o";
        let clean = "a b c d e f g h i j k l m n o";
        assert_eq!(chunk(messy, 15, 5), chunk(clean, 15, 5));
    }

    #[test]
    fn test_rejoined_with_single_spaces() {
        let chunks = chunk(&words(15), 15, 5);
        assert!(!chunks[0].contains("  "));
    }
}
