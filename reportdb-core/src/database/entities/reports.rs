use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub use super::common_types::{DetectionStatus, ReviewStatus, Severity};

/// Current state of one finding within a run
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reports")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub run_id: i32,
    pub file_id: i32,
    pub line: i32,
    pub column_number: i32,
    pub checker_id: String,
    pub analyzer_name: String,
    pub severity: i32,
    pub bug_id: String,
    #[sea_orm(column_type = "Text")]
    pub checker_message: String,
    pub detection_status: String,
    pub path_length: i32,
    pub detected_at: ChronoDateTimeUtc,
    pub fixed_at: Option<ChronoDateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::runs::Entity",
        from = "Column::RunId",
        to = "super::runs::Column::Id"
    )]
    Runs,
    #[sea_orm(
        belongs_to = "super::files::Entity",
        from = "Column::FileId",
        to = "super::files::Column::Id"
    )]
    Files,
    #[sea_orm(has_many = "super::bug_path_events::Entity")]
    BugPathEvents,
    #[sea_orm(
        belongs_to = "super::review_statuses::Entity",
        from = "Column::BugId",
        to = "super::review_statuses::Column::BugHash"
    )]
    ReviewStatuses,
}

impl Related<super::runs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Runs.def()
    }
}

impl Related<super::files::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Files.def()
    }
}

impl Related<super::bug_path_events::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BugPathEvents.def()
    }
}

impl Related<super::review_statuses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReviewStatuses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn get_detection_status(&self) -> DetectionStatus {
        DetectionStatus::from_db(&self.detection_status)
    }

    pub fn get_severity(&self) -> Severity {
        Severity::from_weight(self.severity)
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed_at.is_some()
    }
}
