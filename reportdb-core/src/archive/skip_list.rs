use glob::Pattern;
use tracing::warn;

/// Ordered `+`/`-` glob rules. The first matching rule decides.
#[derive(Clone, Debug, Default)]
pub struct SkipList {
    rules: Vec<(bool, Pattern)>,
}

impl SkipList {
    pub fn parse(raw: &str) -> Self {
        let mut rules = Vec::new();
        for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let (skip, glob) = if let Some(rest) = line.strip_prefix('-') {
                (true, rest.trim())
            } else if let Some(rest) = line.strip_prefix('+') {
                (false, rest.trim())
            } else {
                warn!("Skipping malformed skip list line: {}", line);
                continue;
            };
            match Pattern::new(glob) {
                Ok(pattern) => rules.push((skip, pattern)),
                Err(e) => warn!("Skipping invalid skip list pattern {}: {}", glob, e),
            }
        }
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn should_skip(&self, path: &str) -> bool {
        self.rules
            .iter()
            .find(|(_, pattern)| pattern.matches(path))
            .map(|(skip, _)| *skip)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_match_wins() {
        let list = SkipList::parse("+/src/keep/*\n-/src/*\n");
        assert!(!list.should_skip("/src/keep/a.c"));
        assert!(list.should_skip("/src/other.c"));
        assert!(!list.should_skip("/lib/x.c"));
    }

    #[test]
    fn question_mark_matches_one_char() {
        let list = SkipList::parse("-/gen/file?.c");
        assert!(list.should_skip("/gen/file1.c"));
        assert!(!list.should_skip("/gen/file12.c"));
    }

    #[test]
    fn malformed_lines_are_ignored() {
        let list = SkipList::parse("garbage\n\n-/x/*");
        assert!(list.should_skip("/x/y"));
        assert!(!SkipList::parse("").should_skip("/x"));
    }

    #[test]
    fn star_crosses_directories_and_dots_are_literal() {
        let list = SkipList::parse("-/src/*.c");
        assert!(list.should_skip("/src/deep/nested/a.c"));
        assert!(!list.should_skip("/src/a_c"));
    }

    #[test]
    fn invalid_pattern_is_dropped() {
        let list = SkipList::parse("-/src/[a\n+/x/*");
        assert!(!list.should_skip("/src/[a"));
        assert!(!list.is_empty());
    }
}
