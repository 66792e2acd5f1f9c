use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Contents of `reports/metadata.json`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub tool_version: Option<String>,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub durations: Vec<f64>,
    #[serde(default)]
    pub checkers: BTreeMap<String, CheckerSet>,
    #[serde(default)]
    pub statistics: BTreeMap<String, AnalyzerStats>,
}

/// Checkers of one analyzer, either with explicit enablement or as a plain
/// list of enabled names.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckerSet {
    Map(BTreeMap<String, bool>),
    List(Vec<String>),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerStats {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub successful: i32,
    #[serde(default)]
    pub failed: i32,
    #[serde(default)]
    pub failed_files: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CheckerInfo {
    pub enabled: HashSet<String>,
    pub disabled: HashSet<String>,
    pub checker_to_analyzer: HashMap<String, String>,
}

impl Metadata {
    /// Command line recorded on the run history.
    pub fn check_command(&self) -> String {
        match self.commands.as_slice() {
            [] => String::new(),
            [single] => single.clone(),
            many => format!("multiple analyze calls: {}", many.join("; ")),
        }
    }

    pub fn duration_secs(&self) -> i64 {
        self.durations.iter().sum::<f64>() as i64
    }

    pub fn checker_info(&self) -> CheckerInfo {
        let mut info = CheckerInfo::default();
        for (analyzer, checkers) in &self.checkers {
            match checkers {
                CheckerSet::Map(map) => {
                    for (checker, enabled) in map {
                        if *enabled {
                            info.enabled.insert(checker.clone());
                        } else {
                            info.disabled.insert(checker.clone());
                        }
                        info.checker_to_analyzer
                            .insert(checker.clone(), analyzer.clone());
                    }
                }
                CheckerSet::List(list) => {
                    for checker in list {
                        info.enabled.insert(checker.clone());
                        info.checker_to_analyzer
                            .insert(checker.clone(), analyzer.clone());
                    }
                }
            }
        }
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Metadata {
        serde_json::from_str(
            r#"{
                "toolVersion": "6.23.0",
                "commands": ["analyze a", "analyze b"],
                "durations": [1.5, 2.7],
                "checkers": {
                    "clangsa": {"core.NullDereference": true, "alpha.Unused": false},
                    "clang-tidy": ["misc-unused"]
                },
                "statistics": {
                    "clangsa": {"version": "17", "successful": 3, "failed": 1, "failedFiles": ["/src/b.c"]}
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn multiple_commands_are_joined() {
        assert_eq!(
            sample().check_command(),
            "multiple analyze calls: analyze a; analyze b"
        );
        assert_eq!(Metadata::default().check_command(), "");
    }

    #[test]
    fn durations_are_summed() {
        assert_eq!(sample().duration_secs(), 4);
    }

    #[test]
    fn checker_maps_and_lists_are_merged() {
        let info = sample().checker_info();
        assert!(info.enabled.contains("core.NullDereference"));
        assert!(info.enabled.contains("misc-unused"));
        assert!(info.disabled.contains("alpha.Unused"));
        assert_eq!(info.checker_to_analyzer["misc-unused"], "clang-tidy");
    }
}
