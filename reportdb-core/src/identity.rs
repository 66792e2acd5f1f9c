//! Finding identity hashes
//!
//! The identity (`bug_id`) of a finding survives line shifts: it is derived
//! from the checker, the file name, the normalized text of the reported line
//! and the message. Analyzers that compute their own hash may send it along.

use sha2::{Digest, Sha256};

use crate::archive::{FindingFile, FindingRecord};

fn hex_digest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(parts.join("|").as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Collapse whitespace runs so indentation changes keep the identity.
pub fn normalize_line(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Identity of a finding given the text of its main source line.
pub fn finding_identity(record: &FindingRecord, file_path: &str, source_line: &str) -> String {
    if let Some(hash) = record.bug_hash.as_deref().filter(|h| !h.is_empty()) {
        return hash.to_string();
    }
    hex_digest(&[
        &record.checker_name,
        basename(file_path),
        &normalize_line(source_line),
        &record.message,
    ])
}

/// Hash over the whole path. Two records with the same value in one
/// archive are the same report sent twice.
pub fn report_path_hash(record: &FindingRecord, identity: &str, file: &FindingFile) -> String {
    let location = |index: usize, line: i32, column: i32| {
        format!("{}:{}:{}", file.path_of(index).unwrap_or(""), line, column)
    };
    let mut parts = vec![
        record.checker_name.clone(),
        identity.to_string(),
        location(record.file, record.line, record.column),
    ];
    for step in &record.bug_path {
        parts.push(location(step.file, step.line, step.column));
    }
    let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
    hex_digest(&refs)
}
