//! Inline review annotations written in source comments
//!
//! ```c
//! // codechecker_false_positive [core.NullDereference] the pointer is checked by the caller
//! int *p = lookup();
//! ```
//!
//! The comment block directly above a finding's last bug path line is
//! scanned for `codechecker_<status> [checkers] message` annotations.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::database::entities::common_types::ReviewStatus;

static ANNOTATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^codechecker_(suppress|false_positive|intentional|confirmed)\s*\[([^\]]*)\]\s*(.*)$")
        .expect("annotation pattern is valid")
});

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceAnnotation {
    pub status: ReviewStatus,
    pub checkers: Vec<String>,
    pub message: String,
}

impl SourceAnnotation {
    pub fn applies_to(&self, checker: &str) -> bool {
        self.checkers.iter().any(|c| c == "all" || c == checker)
    }
}

fn status_for(keyword: &str) -> ReviewStatus {
    match keyword {
        "confirmed" => ReviewStatus::Confirmed,
        "intentional" => ReviewStatus::Intentional,
        _ => ReviewStatus::FalsePositive,
    }
}

/// Comment text of a line without its markers, or `None` for code.
fn comment_text(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix("//") {
        return Some(rest.trim());
    }
    if !trimmed.starts_with("/*") && !trimmed.starts_with('*') {
        return None;
    }
    // Closing marker first, so a bare `*/` line leaves no text behind.
    let body = trimmed.strip_suffix("*/").unwrap_or(trimmed);
    let body = match body.strip_prefix("/*") {
        Some(rest) => rest,
        None => body.trim_start_matches('*'),
    };
    Some(body.trim())
}

/// Annotations in the comment block right above `line` (1-based) that
/// apply to `checker`.
pub fn annotations_for(source: &str, line: usize, checker: &str) -> Vec<SourceAnnotation> {
    if line < 2 {
        return Vec::new();
    }
    let lines: Vec<&str> = source.lines().collect();
    let mut block = Vec::new();
    let mut index = (line - 1).min(lines.len());
    while index > 0 {
        index -= 1;
        match comment_text(lines[index]) {
            Some(text) => block.push(text),
            None => break,
        }
    }
    block.reverse();

    let mut annotations: Vec<SourceAnnotation> = Vec::new();
    let mut open = false;
    for text in block {
        if let Some(captures) = ANNOTATION.captures(text) {
            annotations.push(SourceAnnotation {
                status: status_for(&captures[1]),
                checkers: captures[2]
                    .split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect(),
                message: captures[3].trim().to_string(),
            });
            open = true;
        } else if open && !text.is_empty() {
            if let Some(last) = annotations.last_mut() {
                if !last.message.is_empty() {
                    last.message.push(' ');
                }
                last.message.push_str(text);
            }
        } else {
            open = false;
        }
    }

    annotations.retain(|a| a.applies_to(checker));
    annotations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_annotation_above_line() {
        let source = "int f() {\n  // codechecker_suppress [core.NullDereference] checked by caller\n  return *p;\n}\n";
        let found = annotations_for(source, 3, "core.NullDereference");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].status, ReviewStatus::FalsePositive);
        assert_eq!(found[0].message, "checked by caller");
        assert!(annotations_for(source, 3, "other.Checker").is_empty());
    }

    #[test]
    fn all_matches_every_checker_and_messages_continue() {
        let source = "/* codechecker_intentional [all] kept on purpose\n * see ticket 12\n */\nx = 1;\n";
        let found = annotations_for(source, 4, "deadcode.DeadStores");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].status, ReviewStatus::Intentional);
        assert_eq!(found[0].message, "kept on purpose see ticket 12");
    }

    #[test]
    fn block_comment_markers_leave_no_text() {
        assert_eq!(comment_text(" */"), Some(""));
        assert_eq!(comment_text("/**/"), Some(""));
        assert_eq!(comment_text(" * note */"), Some("note"));
        assert_eq!(comment_text("/* note */"), Some("note"));
        assert_eq!(comment_text("x = 1;"), None);
    }

    #[test]
    fn conflicting_annotations_are_all_returned() {
        let source = "// codechecker_confirmed [a.B] real\n// codechecker_false_positive [a.B, c.D] not real\ncall();\n";
        let found = annotations_for(source, 3, "a.B");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].status, ReviewStatus::Confirmed);
        assert_eq!(found[1].status, ReviewStatus::FalsePositive);
    }

    #[test]
    fn code_between_comment_and_line_breaks_the_block() {
        let source = "// codechecker_confirmed [a.B] real\nint y = 0;\ncall();\n";
        assert!(annotations_for(source, 3, "a.B").is_empty());
        assert!(annotations_for(source, 1, "a.B").is_empty());
    }
}
