/// Convert a user wildcard pattern (`*`) into an SQL LIKE pattern.
pub fn like_pattern(pattern: &str) -> String {
    pattern.replace('*', "%")
}

/// True when the value contains a wildcard and needs a LIKE comparison
pub fn has_wildcard(pattern: &str) -> bool {
    pattern.contains('*')
}

/// Split a slice into fixed-size chunks, treating zero as one chunk
pub fn chunked<T>(items: &[T], chunk_size: usize) -> std::slice::Chunks<'_, T> {
    items.chunks(chunk_size.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_becomes_percent() {
        assert_eq!(like_pattern("core.*"), "core.%");
        assert_eq!(like_pattern("*/src/*.c"), "%/src/%.c");
        assert_eq!(like_pattern("exact"), "exact");
    }

    #[test]
    fn detects_wildcards() {
        assert!(has_wildcard("abc*"));
        assert!(!has_wildcard("abc"));
    }

    #[test]
    fn chunks_never_panic_on_zero() {
        let items = [1, 2, 3];
        assert_eq!(chunked(&items, 0).count(), 3);
        assert_eq!(chunked(&items, 2).count(), 2);
    }
}
