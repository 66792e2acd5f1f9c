use serde::{Deserialize, Serialize};
use strum::EnumString;

/// Finding severity, stored as its numeric weight so it sorts naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Severity {
    Unspecified,
    Style,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn weight(&self) -> i32 {
        match self {
            Self::Unspecified => 0,
            Self::Style => 10,
            Self::Low => 20,
            Self::Medium => 30,
            Self::High => 40,
            Self::Critical => 50,
        }
    }

    pub fn from_weight(weight: i32) -> Self {
        match weight {
            w if w >= 50 => Self::Critical,
            w if w >= 40 => Self::High,
            w if w >= 30 => Self::Medium,
            w if w >= 20 => Self::Low,
            w if w >= 10 => Self::Style,
            _ => Self::Unspecified,
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self::Unspecified
    }
}

/// Lifecycle state of a finding within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "snake_case")]
pub enum DetectionStatus {
    New,
    Unresolved,
    Reopened,
    Resolved,
    Off,
    Unavailable,
}

impl DetectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Unresolved => "unresolved",
            Self::Reopened => "reopened",
            Self::Resolved => "resolved",
            Self::Off => "off",
            Self::Unavailable => "unavailable",
        }
    }

    /// Statuses that no longer count as an open finding
    pub fn closed() -> [DetectionStatus; 3] {
        [Self::Resolved, Self::Off, Self::Unavailable]
    }

    /// Parse a stored value, treating unknown text as unresolved
    pub fn from_db(value: &str) -> Self {
        value.parse().unwrap_or(Self::Unresolved)
    }
}

impl From<DetectionStatus> for String {
    fn from(status: DetectionStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Human or system judgement on a finding identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "snake_case")]
pub enum ReviewStatus {
    Unreviewed,
    Confirmed,
    FalsePositive,
    Intentional,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unreviewed => "unreviewed",
            Self::Confirmed => "confirmed",
            Self::FalsePositive => "false_positive",
            Self::Intentional => "intentional",
        }
    }

    /// Capitalized label used in audit comments
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unreviewed => "Unreviewed",
            Self::Confirmed => "Confirmed",
            Self::FalsePositive => "False positive",
            Self::Intentional => "Intentional",
        }
    }

    /// Statuses that take a finding out of the unresolved count
    pub fn dismissed() -> [ReviewStatus; 2] {
        [Self::FalsePositive, Self::Intentional]
    }

    pub fn from_db(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or(Self::Unreviewed)
    }
}

impl Default for ReviewStatus {
    fn default() -> Self {
        Self::Unreviewed
    }
}

impl From<ReviewStatus> for String {
    fn from(status: ReviewStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "snake_case")]
pub enum CommentKind {
    User,
    System,
}

impl CommentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::System => "system",
        }
    }
}

impl From<CommentKind> for String {
    fn from(kind: CommentKind) -> Self {
        kind.as_str().to_string()
    }
}
