//! Report filter composition
//!
//! A [`ReportFilter`] is turned into an ordered list of [`ReportPredicate`]s.
//! Each predicate contributes one condition and the list is combined with
//! AND. Fields that are not set add nothing. Source component names are
//! resolved against the database while the list is built, so building is
//! async while applying is not.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Alias, Condition, Expr, Func, JoinType, Query, SelectStatement, SimpleExpr};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    Select,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::{has_wildcard, like_pattern};
use crate::database::entities::common_types::{DetectionStatus, ReviewStatus, Severity};
use crate::database::entities::{files, reports, review_statuses, run_histories, runs, source_components};
use crate::errors::CoreResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiffType {
    New,
    Resolved,
    Unresolved,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BugPathLengthRange {
    pub min: Option<i32>,
    pub max: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DateInterval {
    pub before: Option<DateTime<Utc>>,
    pub after: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportDate {
    pub detected: Option<DateInterval>,
    pub fixed: Option<DateInterval>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportFilter {
    pub filepath: Vec<String>,
    pub checker_msg: Vec<String>,
    pub checker_name: Vec<String>,
    pub report_hash: Vec<String>,
    pub severity: Vec<Severity>,
    pub review_status: Vec<ReviewStatus>,
    pub detection_status: Vec<DetectionStatus>,
    pub run_name: Vec<String>,
    /// History ids selecting the base snapshot
    pub run_tag: Vec<i32>,
    pub component_names: Vec<String>,
    pub bug_path_length: Option<BugPathLengthRange>,
    pub date: Option<ReportDate>,
    pub first_detection_date: Option<DateTime<Utc>>,
    pub fix_date: Option<DateTime<Utc>>,
    /// Reports open at any of these times
    pub run_history_tag: Vec<DateTime<Utc>>,
    pub analyzer_names: Vec<String>,
    pub open_reports_date: Option<DateTime<Utc>>,
    pub is_unique: bool,
}

/// The other side of a comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareData {
    #[serde(default)]
    pub run_ids: Vec<i32>,
    pub diff_type: DiffType,
    #[serde(default)]
    pub run_tag: Vec<i32>,
    #[serde(default)]
    pub open_reports_date: Option<DateTime<Utc>>,
}

impl CompareData {
    pub fn is_empty(&self) -> bool {
        self.run_ids.is_empty() && self.run_tag.is_empty() && self.open_reports_date.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunFilter {
    pub ids: Vec<i32>,
    pub names: Vec<String>,
    pub exact_match: bool,
    pub before_time: Option<DateTime<Utc>>,
    pub after_time: Option<DateTime<Utc>>,
    pub before_run: Option<String>,
    pub after_run: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunHistoryFilter {
    pub tag_names: Vec<String>,
    pub tag_ids: Vec<i32>,
}

fn report_col(column: reports::Column) -> Expr {
    Expr::col((reports::Entity, column))
}

fn file_col(column: files::Column) -> Expr {
    Expr::col((files::Entity, column))
}

/// Case-insensitive wildcard match of any of the patterns.
pub(crate) fn ilike_any(column: SimpleExpr, patterns: &[String]) -> Condition {
    patterns.iter().fold(Condition::any(), |cond, pattern| {
        cond.add(
            Expr::expr(Func::lower(column.clone())).like(like_pattern(pattern).to_lowercase()),
        )
    })
}

/// `detected_at <= time` and not fixed by then.
fn open_at(time: DateTime<Utc>, inclusive_fix: bool) -> Condition {
    let fixed_later = if inclusive_fix {
        report_col(reports::Column::FixedAt).gte(time)
    } else {
        report_col(reports::Column::FixedAt).gt(time)
    };
    Condition::all()
        .add(report_col(reports::Column::DetectedAt).lte(time))
        .add(
            Condition::any()
                .add(report_col(reports::Column::FixedAt).is_null())
                .add(fixed_later),
        )
}

/// One source component turned into a file condition.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentRules {
    pub include: Vec<String>,
    pub skip: Vec<String>,
}

impl ComponentRules {
    fn file_ids_matching(patterns: &[String]) -> SelectStatement {
        let mut any = Condition::any();
        for pattern in patterns {
            any = any.add(file_col(files::Column::Filepath).like(like_pattern(pattern)));
        }
        Query::select()
            .column((files::Entity, files::Column::Id))
            .from(files::Entity)
            .cond_where(any)
            .to_owned()
    }

    fn condition(&self) -> Option<Condition> {
        match (self.include.is_empty(), self.skip.is_empty()) {
            (true, true) => None,
            (false, false) => Some(
                Condition::all()
                    .add(
                        file_col(files::Column::Id)
                            .in_subquery(Self::file_ids_matching(&self.include)),
                    )
                    .add(
                        file_col(files::Column::Id)
                            .not_in_subquery(Self::file_ids_matching(&self.skip)),
                    ),
            ),
            (false, true) => Some(self.include.iter().fold(Condition::any(), |cond, p| {
                cond.add(file_col(files::Column::Filepath).like(like_pattern(p)))
            })),
            (true, false) => Some(self.skip.iter().fold(Condition::all(), |cond, p| {
                cond.add(file_col(files::Column::Filepath).not_like(like_pattern(p)))
            })),
        }
    }
}

/// One condition on the joined report rows.
#[derive(Clone, Debug, PartialEq)]
pub enum ReportPredicate {
    FilePath(Vec<String>),
    CheckerMessage(Vec<String>),
    CheckerName(Vec<String>),
    AnalyzerName(Vec<String>),
    RunName(Vec<String>),
    ReportHash(Vec<String>),
    Severity(Vec<Severity>),
    DetectionStatus(Vec<DetectionStatus>),
    ReviewStatus(Vec<ReviewStatus>),
    DetectedAfter(DateTime<Utc>),
    DetectedBefore(DateTime<Utc>),
    FixedAfter(DateTime<Utc>),
    FixedBefore(DateTime<Utc>),
    FirstDetectedSince(DateTime<Utc>),
    DetectedBeforeFix(DateTime<Utc>),
    OpenAtAny(Vec<DateTime<Utc>>),
    Components(Vec<ComponentRules>),
    BugPathLength(BugPathLengthRange),
    /// Run and comparison restriction
    Selection(Condition),
}

impl ReportPredicate {
    pub fn condition(&self) -> Condition {
        match self {
            Self::FilePath(patterns) => ilike_any(file_col(files::Column::Filepath).into(), patterns),
            Self::CheckerMessage(patterns) => {
                ilike_any(report_col(reports::Column::CheckerMessage).into(), patterns)
            }
            Self::CheckerName(patterns) => {
                ilike_any(report_col(reports::Column::CheckerId).into(), patterns)
            }
            Self::AnalyzerName(patterns) => {
                ilike_any(report_col(reports::Column::AnalyzerName).into(), patterns)
            }
            Self::RunName(patterns) => {
                ilike_any(Expr::col((runs::Entity, runs::Column::Name)).into(), patterns)
            }
            Self::ReportHash(hashes) => {
                let (wildcards, exact): (Vec<&String>, Vec<&String>) =
                    hashes.iter().partition(|h| has_wildcard(h));
                let mut any = Condition::any();
                for pattern in wildcards {
                    any = any.add(report_col(reports::Column::BugId).like(like_pattern(pattern)));
                }
                if !exact.is_empty() {
                    any = any.add(report_col(reports::Column::BugId).is_in(exact.into_iter().cloned()));
                }
                any
            }
            Self::Severity(severities) => Condition::all().add(
                report_col(reports::Column::Severity).is_in(severities.iter().map(|s| s.weight())),
            ),
            Self::DetectionStatus(statuses) => Condition::all().add(
                report_col(reports::Column::DetectionStatus)
                    .is_in(statuses.iter().map(|s| s.as_str())),
            ),
            Self::ReviewStatus(statuses) => {
                let status_col = || Expr::col((review_statuses::Entity, review_statuses::Column::Status));
                let mut any = Condition::any()
                    .add(status_col().is_in(statuses.iter().map(|s| s.as_str())));
                if statuses.contains(&ReviewStatus::Unreviewed) {
                    any = any.add(status_col().is_null());
                }
                any
            }
            Self::DetectedAfter(date) => {
                Condition::all().add(report_col(reports::Column::DetectedAt).gte(*date))
            }
            Self::DetectedBefore(date) => {
                Condition::all().add(report_col(reports::Column::DetectedAt).lte(*date))
            }
            Self::FixedAfter(date) => {
                Condition::all().add(report_col(reports::Column::FixedAt).gte(*date))
            }
            Self::FixedBefore(date) => {
                Condition::all().add(report_col(reports::Column::FixedAt).lte(*date))
            }
            Self::FirstDetectedSince(date) => {
                Condition::all().add(report_col(reports::Column::DetectedAt).gte(*date))
            }
            Self::DetectedBeforeFix(date) => {
                Condition::all().add(report_col(reports::Column::DetectedAt).lt(*date))
            }
            Self::OpenAtAny(dates) => dates
                .iter()
                .fold(Condition::any(), |cond, date| cond.add(open_at(*date, true))),
            Self::Components(components) => components
                .iter()
                .filter_map(ComponentRules::condition)
                .fold(Condition::any(), |cond, c| cond.add(c)),
            Self::BugPathLength(range) => {
                let mut all = Condition::all();
                if let Some(min) = range.min {
                    all = all.add(report_col(reports::Column::PathLength).gte(min));
                }
                if let Some(max) = range.max {
                    all = all.add(report_col(reports::Column::PathLength).lte(max));
                }
                all
            }
            Self::Selection(condition) => condition.clone(),
        }
    }
}

/// Ordered predicates combined with AND.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterPredicates {
    predicates: Vec<ReportPredicate>,
}

impl FilterPredicates {
    pub fn push(&mut self, predicate: ReportPredicate) {
        self.predicates.push(predicate);
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReportPredicate> {
        self.predicates.iter()
    }

    pub fn condition(&self) -> Condition {
        self.predicates
            .iter()
            .fold(Condition::all(), |cond, p| cond.add(p.condition()))
    }

    /// Predicates for the filter fields alone, without run selection.
    pub async fn from_filter<C: ConnectionTrait>(conn: &C, filter: &ReportFilter) -> CoreResult<Self> {
        let mut list = Self::default();

        if !filter.filepath.is_empty() {
            list.push(ReportPredicate::FilePath(filter.filepath.clone()));
        }
        if !filter.checker_msg.is_empty() {
            list.push(ReportPredicate::CheckerMessage(filter.checker_msg.clone()));
        }
        if !filter.checker_name.is_empty() {
            list.push(ReportPredicate::CheckerName(filter.checker_name.clone()));
        }
        if !filter.analyzer_names.is_empty() {
            list.push(ReportPredicate::AnalyzerName(filter.analyzer_names.clone()));
        }
        if !filter.run_name.is_empty() {
            list.push(ReportPredicate::RunName(filter.run_name.clone()));
        }
        if !filter.report_hash.is_empty() {
            list.push(ReportPredicate::ReportHash(filter.report_hash.clone()));
        }
        if !filter.severity.is_empty() {
            list.push(ReportPredicate::Severity(filter.severity.clone()));
        }
        if !filter.detection_status.is_empty() {
            list.push(ReportPredicate::DetectionStatus(filter.detection_status.clone()));
        }
        if !filter.review_status.is_empty() {
            list.push(ReportPredicate::ReviewStatus(filter.review_status.clone()));
        }
        if let Some(date) = filter.first_detection_date {
            list.push(ReportPredicate::FirstDetectedSince(date));
        }
        if let Some(date) = filter.fix_date {
            list.push(ReportPredicate::DetectedBeforeFix(date));
        }
        if let Some(report_date) = &filter.date {
            if let Some(detected) = &report_date.detected {
                if let Some(before) = detected.before {
                    list.push(ReportPredicate::DetectedBefore(before));
                }
                if let Some(after) = detected.after {
                    list.push(ReportPredicate::DetectedAfter(after));
                }
            }
            if let Some(fixed) = &report_date.fixed {
                if let Some(before) = fixed.before {
                    list.push(ReportPredicate::FixedBefore(before));
                }
                if let Some(after) = fixed.after {
                    list.push(ReportPredicate::FixedAfter(after));
                }
            }
        }
        if !filter.run_history_tag.is_empty() {
            list.push(ReportPredicate::OpenAtAny(filter.run_history_tag.clone()));
        }
        if !filter.component_names.is_empty() {
            let components = resolve_components(conn, &filter.component_names).await?;
            if components.iter().any(|c| c.condition().is_some()) {
                list.push(ReportPredicate::Components(components));
            }
        }
        if let Some(range) = &filter.bug_path_length {
            if range.min.is_some() || range.max.is_some() {
                list.push(ReportPredicate::BugPathLength(range.clone()));
            }
        }

        Ok(list)
    }

    /// Run selection and comparison followed by the filter fields.
    pub async fn build<C: ConnectionTrait>(
        conn: &C,
        run_ids: &[i32],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
    ) -> CoreResult<Self> {
        let mut list = Self::default();
        if let Some(selection) = selection_condition(run_ids, filter, cmp_data) {
            list.push(ReportPredicate::Selection(selection));
        }
        for predicate in Self::from_filter(conn, filter).await?.predicates {
            list.push(predicate);
        }
        Ok(list)
    }
}

async fn resolve_components<C: ConnectionTrait>(
    conn: &C,
    names: &[String],
) -> CoreResult<Vec<ComponentRules>> {
    let found = source_components::Entity::find()
        .filter(source_components::Column::Name.is_in(names.iter().cloned()))
        .order_by_asc(source_components::Column::Name)
        .all(conn)
        .await?;
    if found.len() < names.len() {
        debug!("Some of the source components {:?} do not exist", names);
    }
    Ok(found
        .iter()
        .map(|component| {
            let (include, skip) = component.rules();
            ComponentRules { include, skip }
        })
        .collect())
}

/// Distinct identities of a selection. Tag ids restrict to reports open at
/// the tag time.
pub fn bug_id_query(
    run_ids: &[i32],
    tag_ids: &[i32],
    open_reports_date: Option<DateTime<Utc>>,
) -> SelectStatement {
    let mut query = Query::select()
        .distinct()
        .column((reports::Entity, reports::Column::BugId))
        .from(reports::Entity)
        .to_owned();

    if !run_ids.is_empty() {
        query.and_where(report_col(reports::Column::RunId).is_in(run_ids.iter().copied()));
    }
    if !tag_ids.is_empty() {
        let history_time = Expr::col((run_histories::Entity, run_histories::Column::Time));
        query
            .join(
                JoinType::LeftJoin,
                run_histories::Entity,
                Expr::col((run_histories::Entity, run_histories::Column::RunId))
                    .equals((reports::Entity, reports::Column::RunId)),
            )
            .and_where(
                Expr::col((run_histories::Entity, run_histories::Column::Id))
                    .is_in(tag_ids.iter().copied()),
            )
            .and_where(report_col(reports::Column::DetectedAt).lte(history_time.clone()))
            .cond_where(
                Condition::any()
                    .add(report_col(reports::Column::FixedAt).is_null())
                    .add(report_col(reports::Column::FixedAt).gt(history_time)),
            );
    }
    if let Some(date) = open_reports_date {
        query.cond_where(open_at(date, false));
    }
    query
}

/// Run ids of a selection.
pub fn run_id_query(run_ids: &[i32], tag_ids: &[i32]) -> SelectStatement {
    let mut query = Query::select()
        .distinct()
        .column((runs::Entity, runs::Column::Id))
        .from(runs::Entity)
        .to_owned();

    if !run_ids.is_empty() {
        query.and_where(Expr::col((runs::Entity, runs::Column::Id)).is_in(run_ids.iter().copied()));
    }
    if !tag_ids.is_empty() {
        query
            .join(
                JoinType::LeftJoin,
                run_histories::Entity,
                Expr::col((run_histories::Entity, run_histories::Column::RunId))
                    .equals((runs::Entity, runs::Column::Id)),
            )
            .and_where(
                Expr::col((run_histories::Entity, run_histories::Column::Id))
                    .is_in(tag_ids.iter().copied()),
            );
    }
    query
}

/// Restriction of the report rows to the base selection, or to one side
/// of a comparison.
pub fn selection_condition(
    run_ids: &[i32],
    filter: &ReportFilter,
    cmp_data: Option<&CompareData>,
) -> Option<Condition> {
    let base_ids = || bug_id_query(run_ids, &filter.run_tag, filter.open_reports_date);
    let base_runs = || run_id_query(run_ids, &filter.run_tag);
    let bug_id = || report_col(reports::Column::BugId);
    let run_id = || report_col(reports::Column::RunId);

    let cmp = match cmp_data.filter(|cmp| !cmp.is_empty()) {
        Some(cmp) => cmp,
        None => {
            if run_ids.is_empty() && filter.run_tag.is_empty() && filter.open_reports_date.is_none() {
                return None;
            }
            return Some(
                Condition::all()
                    .add(bug_id().in_subquery(base_ids()))
                    .add(run_id().in_subquery(base_runs())),
            );
        }
    };

    let cmp_ids = || bug_id_query(&cmp.run_ids, &cmp.run_tag, cmp.open_reports_date);
    let cmp_runs = || run_id_query(&cmp.run_ids, &cmp.run_tag);

    let condition = match cmp.diff_type {
        DiffType::New => Condition::all()
            .add(bug_id().in_subquery(cmp_ids()))
            .add(bug_id().not_in_subquery(base_ids()))
            .add(run_id().in_subquery(cmp_runs())),
        DiffType::Resolved => Condition::all()
            .add(bug_id().in_subquery(base_ids()))
            .add(bug_id().not_in_subquery(cmp_ids()))
            .add(run_id().in_subquery(base_runs())),
        DiffType::Unresolved => Condition::all()
            .add(bug_id().in_subquery(base_ids()))
            .add(bug_id().in_subquery(cmp_ids()))
            .add(run_id().in_subquery(cmp_runs())),
    };
    Some(condition)
}

/// Report rows joined with their file, run and review status.
pub fn joined_reports() -> Select<reports::Entity> {
    reports::Entity::find()
        .join(JoinType::LeftJoin, reports::Relation::Files.def())
        .join(JoinType::LeftJoin, reports::Relation::ReviewStatuses.def())
        .join(JoinType::InnerJoin, reports::Relation::Runs.def())
}

/// `COUNT(DISTINCT bug_id)` in uniqueness mode, `COUNT(*)` otherwise.
pub fn count_expr(is_unique: bool) -> SimpleExpr {
    if is_unique {
        Expr::cust(r#"COUNT(DISTINCT "reports"."bug_id")"#)
    } else {
        Expr::cust("COUNT(*)")
    }
}

pub fn count_alias() -> Alias {
    Alias::new("count")
}
