use serde::{Deserialize, Serialize};

use crate::database::entities::common_types::Severity;

/// One parsed `reports/*.json` file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingFile {
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub reports: Vec<FindingRecord>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingRecord {
    pub checker_name: String,
    #[serde(default)]
    pub analyzer_name: Option<String>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub message: String,
    pub file: usize,
    pub line: i32,
    #[serde(default)]
    pub column: i32,
    #[serde(default)]
    pub bug_hash: Option<String>,
    #[serde(default)]
    pub bug_path: Vec<BugPathStep>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BugPathStep {
    pub file: usize,
    pub line: i32,
    #[serde(default)]
    pub column: i32,
    #[serde(default)]
    pub message: String,
}

impl FindingFile {
    pub fn path_of(&self, index: usize) -> Option<&str> {
        self.files.get(index).map(String::as_str)
    }

    /// Every analyzed path referenced by a report or one of its steps.
    pub fn referenced_paths(&self) -> Vec<&str> {
        let mut paths = Vec::new();
        for report in &self.reports {
            for index in std::iter::once(report.file).chain(report.bug_path.iter().map(|s| s.file))
            {
                if let Some(path) = self.path_of(index) {
                    if !paths.contains(&path) {
                        paths.push(path);
                    }
                }
            }
        }
        paths
    }
}

impl FindingRecord {
    /// The last step of the bug path, or the main location.
    pub fn last_location(&self) -> (usize, i32) {
        self.bug_path
            .last()
            .map(|step| (step.file, step.line))
            .unwrap_or((self.file, self.line))
    }
}
