use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::Order;
use serde::{Deserialize, Serialize};

use crate::database::entities::{files, reports, review_statuses};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortType {
    Filename,
    CheckerName,
    Severity,
    ReviewStatus,
    DetectionStatus,
    BugPathLength,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn order(&self) -> Order {
        match self {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortMode {
    #[serde(rename = "type")]
    pub sort_type: SortType,
    #[serde(default)]
    pub ord: SortOrder,
}

impl SortMode {
    pub fn new(sort_type: SortType, ord: SortOrder) -> Self {
        Self { sort_type, ord }
    }
}

/// Severity descending when nothing was requested.
pub fn default_sort() -> Vec<SortMode> {
    vec![SortMode::new(SortType::Severity, SortOrder::Desc)]
}

/// Columns a sort key orders by, in sequence. In uniqueness mode rows are
/// grouped by identity, so the file key sorts by file name and detection
/// status is not sortable.
pub fn sort_columns(sort_type: SortType, is_unique: bool) -> Vec<SimpleExpr> {
    let report = |column: reports::Column| -> SimpleExpr { Expr::col((reports::Entity, column)).into() };
    match sort_type {
        SortType::Filename if is_unique => {
            vec![Expr::col((files::Entity, files::Column::Filename)).into()]
        }
        SortType::Filename => vec![
            Expr::col((files::Entity, files::Column::Filepath)).into(),
            report(reports::Column::Line),
        ],
        SortType::BugPathLength => vec![report(reports::Column::PathLength)],
        SortType::CheckerName => vec![report(reports::Column::CheckerId)],
        SortType::Severity => vec![report(reports::Column::Severity)],
        SortType::ReviewStatus => {
            vec![Expr::col((review_statuses::Entity, review_statuses::Column::Status)).into()]
        }
        SortType::DetectionStatus if is_unique => vec![],
        SortType::DetectionStatus => vec![report(reports::Column::DetectionStatus)],
    }
}

/// `(column, order)` pairs for a sort request, falling back to the default.
pub fn order_by(sort: &[SortMode], is_unique: bool) -> Vec<(SimpleExpr, Order)> {
    let modes = if sort.is_empty() {
        default_sort()
    } else {
        sort.to_vec()
    };
    modes
        .iter()
        .flat_map(|mode| {
            sort_columns(mode.sort_type, is_unique)
                .into_iter()
                .map(move |column| (column, mode.ord.order()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_sorts_by_path_then_line() {
        let columns = order_by(&[SortMode::new(SortType::Filename, SortOrder::Asc)], false);
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].1, Order::Asc);
    }

    #[test]
    fn unique_mode_drops_detection_status() {
        assert!(sort_columns(SortType::DetectionStatus, true).is_empty());
        assert_eq!(sort_columns(SortType::Filename, true).len(), 1);
    }

    #[test]
    fn empty_request_uses_severity_desc() {
        let columns = order_by(&[], false);
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].1, Order::Desc);
    }

    #[test]
    fn sort_mode_parses() {
        let mode: SortMode = serde_json::from_str(r#"{"type": "BUG_PATH_LENGTH", "ord": "ASC"}"#).unwrap();
        assert_eq!(mode, SortMode::new(SortType::BugPathLength, SortOrder::Asc));
    }
}
