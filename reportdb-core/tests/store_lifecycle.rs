mod common;

use chrono::Duration;
use reportdb::database::entities::common_types::{DetectionStatus, ReviewStatus};
use reportdb::database::entities::run_locks;
use reportdb::errors::{CoreErrorKind, ErrorCode};
use reportdb::query::{ReportFilter, RunFilter, RunHistoryFilter};
use reportdb_test_utils::{bug_path_step, content_hash_of, finding, ArchiveBuilder};
use sea_orm::{EntityTrait, Set};

use common::*;

#[tokio::test]
async fn finding_goes_new_resolved_reopened() {
    let ctx = context().await;

    let run_id = store(&ctx, "proj", &null_deref_archive()).await;
    let first = results(&ctx, &[run_id]).await;
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].detection_status, DetectionStatus::New);
    assert_eq!(first[0].checked_file, "/src/main.c");
    assert!(first[0].fixed_at.is_none());

    let clean = ArchiveBuilder::new()
        .source("/src/main.c", MAIN_C)
        .report_file("main.c.json", &["/src/main.c"], vec![]);
    assert_eq!(store(&ctx, "proj", &clean).await, run_id);
    let second = results(&ctx, &[run_id]).await;
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].detection_status, DetectionStatus::Resolved);
    assert!(second[0].fixed_at.is_some());

    store(&ctx, "proj", &null_deref_archive()).await;
    let third = results(&ctx, &[run_id]).await;
    assert_eq!(third.len(), 1);
    assert_eq!(third[0].detection_status, DetectionStatus::Reopened);
    assert_eq!(third[0].bug_hash, first[0].bug_hash);
    assert_eq!(third[0].detected_at, first[0].detected_at);
    assert!(third[0].fixed_at.is_none());

    let history = ctx
        .get_run_history(&admin(), &[run_id], None, 0, &RunHistoryFilter::default())
        .await
        .unwrap();
    assert_eq!(history.len(), 3);
}

#[tokio::test]
async fn identity_survives_line_shifts() {
    let ctx = context().await;
    let run_id = store(&ctx, "proj", &null_deref_archive()).await;

    let shifted_source = "#include <stdio.h>\n\nint main() {\n  int *p = 0;\n      return   *p;\n}\n";
    let shifted = ArchiveBuilder::new()
        .source("/src/main.c", shifted_source)
        .report_file(
            "main.c.json",
            &["/src/main.c"],
            vec![finding(NULL_DEREF, 0, 5, "Dereference of null pointer")],
        );
    store(&ctx, "proj", &shifted).await;

    let reports = results(&ctx, &[run_id]).await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].detection_status, DetectionStatus::Unresolved);
    assert_eq!(reports[0].line, 5);
}

#[tokio::test]
async fn bug_path_is_stored_with_the_report() {
    let ctx = context().await;
    let mut record = finding(NULL_DEREF, 0, 3, "Dereference of null pointer");
    record["bugPath"] = serde_json::json!([
        bug_path_step(0, 2, "'p' initialized to a null pointer value"),
        bug_path_step(0, 3, "Dereference of null pointer"),
    ]);
    let archive = ArchiveBuilder::new()
        .source("/src/main.c", MAIN_C)
        .report_file("main.c.json", &["/src/main.c"], vec![record]);
    let run_id = store(&ctx, "proj", &archive).await;

    let report = &results(&ctx, &[run_id]).await[0];
    assert_eq!(report.bug_path_length, 2);
    let details = ctx.get_report_details(&admin(), report.report_id).await.unwrap();
    let lines: Vec<i32> = details.path_events.iter().map(|e| e.line).collect();
    assert_eq!(lines, vec![2, 3]);
    assert_eq!(details.path_events[0].file_path, "/src/main.c");

    let source = ctx
        .get_source_file_data(&admin(), report.file_id, true)
        .await
        .unwrap();
    assert_eq!(source.file_content.as_deref(), Some(MAIN_C));
}

#[tokio::test]
async fn held_lock_rejects_store_until_it_expires() {
    let ctx = context().await;
    let guard = ctx
        .run_lock_service()
        .acquire("proj", "someone-else")
        .await
        .unwrap();

    let err = ctx
        .mass_store(&admin(), &request("proj", &null_deref_archive()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::Conflict);
    assert_eq!(err.code(), ErrorCode::Database);
    ctx.run_lock_service().release(&guard).await.unwrap();

    run_locks::Entity::insert(run_locks::ActiveModel {
        name: Set("proj".to_string()),
        username: Set("crashed-client".to_string()),
        locked_at: Set(chrono::Utc::now() - Duration::hours(2)),
        version: Set(1),
    })
    .exec_without_returning(ctx.db())
    .await
    .unwrap();

    let run_id = store(&ctx, "proj", &null_deref_archive()).await;
    assert_eq!(results(&ctx, &[run_id]).await.len(), 1);
    let remaining = run_locks::Entity::find().all(ctx.db()).await.unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn only_unknown_contents_are_missing() {
    let ctx = context().await;
    store(&ctx, "proj", &null_deref_archive()).await;

    let known = content_hash_of(MAIN_C);
    let missing = ctx
        .get_missing_content_hashes(&admin(), &[known, "h2".to_string()])
        .await
        .unwrap();
    assert_eq!(missing, vec!["h2".to_string()]);
}

#[tokio::test]
async fn source_annotation_sets_review_status() {
    let ctx = context().await;
    let source = "int main() {\n  int *p = 0;\n  // codechecker_false_positive [core.NullDereference] p is patched at link time\n  return *p;\n}\n";
    let archive = ArchiveBuilder::new().source("/src/main.c", source).report_file(
        "main.c.json",
        &["/src/main.c"],
        vec![finding(NULL_DEREF, 0, 4, "Dereference of null pointer")],
    );
    let run_id = store(&ctx, "proj", &archive).await;

    let report = &results(&ctx, &[run_id]).await[0];
    assert_eq!(report.review_data.status, ReviewStatus::FalsePositive);
    assert_eq!(
        report.review_data.comment.as_deref(),
        Some("p is patched at link time")
    );
}

#[tokio::test]
async fn conflicting_annotations_are_reported_after_the_store() {
    let ctx = context().await;
    let source = "int main() {\n  int *p = 0;\n  // codechecker_false_positive [core.NullDereference] first\n  // codechecker_confirmed [core.NullDereference] second\n  return *p;\n}\n";
    let archive = ArchiveBuilder::new().source("/src/main.c", source).report_file(
        "main.c.json",
        &["/src/main.c"],
        vec![finding(NULL_DEREF, 0, 5, "Dereference of null pointer")],
    );

    let err = ctx
        .mass_store(&admin(), &request("proj", &archive))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::SourceFile);
    assert_eq!(err.extra_info(), ["main.c|5|core.NullDereference".to_string()]);

    let count = ctx.get_run_count(&admin(), &RunFilter::default()).await.unwrap();
    assert_eq!(count, 1);
    let total = ctx
        .get_run_result_count(&admin(), &[], &ReportFilter::default(), None)
        .await
        .unwrap();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn run_count_quota_only_blocks_new_runs() {
    let ctx = context_with(reportdb::config::StoreConfig {
        max_run_count: Some(1),
        ..test_config()
    })
    .await;
    store(&ctx, "first", &null_deref_archive()).await;

    let err = ctx
        .mass_store(&admin(), &request("second", &null_deref_archive()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::LimitExceeded);
    assert_eq!(err.code(), ErrorCode::General);

    store(&ctx, "first", &null_deref_archive()).await;
}

#[tokio::test]
async fn forced_store_starts_the_run_over() {
    let ctx = context().await;
    let run_id = store(&ctx, "proj", &hashed_archive(&["h1", "h2"])).await;

    let mut forced = request("proj", &hashed_archive(&["h3"]));
    forced.force = true;
    let new_id = ctx.mass_store(&admin(), &forced).await.unwrap();
    assert_ne!(new_id, run_id);

    let reports = results(&ctx, &[new_id]).await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].bug_hash, "h3");
    assert_eq!(reports[0].detection_status, DetectionStatus::New);

    let history = ctx
        .get_run_history_count(&admin(), &[new_id], &RunHistoryFilter::default())
        .await
        .unwrap();
    assert_eq!(history, 1);
}

#[tokio::test]
async fn check_command_and_statistics_come_from_metadata() {
    let ctx = context().await;
    let archive = null_deref_archive().metadata(serde_json::json!({
        "toolVersion": "6.23.0",
        "commands": ["CodeChecker analyze -o reports build.json"],
        "durations": [12.0],
        "checkers": { "clangsa": { "core.NullDereference": true, "core.DivideZero": false } },
        "statistics": {
            "clangsa": { "version": "17.0.6", "successful": 4, "failed": 1, "failedFiles": ["/src/gen.c"] }
        }
    }));
    let run_id = store(&ctx, "proj", &archive).await;

    let command = ctx
        .get_check_command(&admin(), None, Some(run_id))
        .await
        .unwrap();
    assert_eq!(command, "CodeChecker analyze -o reports build.json");

    let stats = ctx
        .get_analysis_statistics(&admin(), Some(run_id), None)
        .await
        .unwrap();
    let clangsa = &stats["clangsa"];
    assert_eq!(clangsa.successful, 4);
    assert_eq!(clangsa.failed_file_paths, vec!["/src/gen.c".to_string()]);
}

fn checker_archive(findings: &[(&str, &str)]) -> ArchiveBuilder {
    let reports = findings
        .iter()
        .enumerate()
        .map(|(i, (checker, hash))| {
            let mut record = finding(checker, 0, i as i32 + 1, "Something odd");
            record["bugHash"] = (*hash).into();
            record
        })
        .collect();
    ArchiveBuilder::new()
        .source("/src/lib.c", "a = 1;\nb = 2;\nc = 3;\n")
        .report_file("lib.c.json", &["/src/lib.c"], reports)
}

#[tokio::test]
async fn missing_reports_are_off_unavailable_or_resolved_by_checker_state() {
    let ctx = context().await;
    let run_id = store(
        &ctx,
        "proj",
        &checker_archive(&[("alpha.X", "h-alpha"), ("core.Z", "h-core"), ("misc.Y", "h-misc")]),
    )
    .await;

    let rerun = checker_archive(&[]).metadata(serde_json::json!({
        "checkers": { "clangsa": { "alpha.X": false, "core.Z": true } }
    }));
    store(&ctx, "proj", &rerun).await;

    let mut statuses: Vec<(String, DetectionStatus)> = results(&ctx, &[run_id])
        .await
        .into_iter()
        .map(|r| (r.checker_id, r.detection_status))
        .collect();
    statuses.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        statuses,
        vec![
            ("alpha.X".to_string(), DetectionStatus::Off),
            ("core.Z".to_string(), DetectionStatus::Resolved),
            ("misc.Y".to_string(), DetectionStatus::Unavailable),
        ]
    );
    assert!(results(&ctx, &[run_id])
        .await
        .iter()
        .all(|r| r.fixed_at.is_some()));
}

#[tokio::test]
async fn concurrent_stores_into_one_run_admit_a_single_writer() {
    let ctx = context().await;
    let first = request("proj", &null_deref_archive());
    let second = request("proj", &null_deref_archive());
    let actor = admin();

    let (a, b) = tokio::join!(
        ctx.mass_store(&actor, &first),
        ctx.mass_store(&actor, &second)
    );
    let (winner, loser) = match (a, b) {
        (Ok(run_id), Err(err)) | (Err(err), Ok(run_id)) => (run_id, err),
        other => panic!("expected exactly one store to win, got {:?}", other),
    };
    assert_eq!(loser.kind(), CoreErrorKind::Conflict);
    assert_eq!(loser.code(), ErrorCode::Database);
    assert!(loser.message().contains("is being stored into by"));
    assert_eq!(results(&ctx, &[winner]).await.len(), 1);
}

#[tokio::test]
async fn duplicates_in_one_batch_collapse_to_one_row() {
    let ctx = context().await;
    let duplicated = ArchiveBuilder::new().source("/src/main.c", MAIN_C).report_file(
        "main.c.json",
        &["/src/main.c"],
        vec![
            finding(NULL_DEREF, 0, 3, "Dereference of null pointer"),
            finding(NULL_DEREF, 0, 3, "Dereference of null pointer"),
        ],
    );

    let run_id = store(&ctx, "proj", &duplicated).await;
    let first = results(&ctx, &[run_id]).await;
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].detection_status, DetectionStatus::New);

    store(&ctx, "proj", &duplicated).await;
    let second = results(&ctx, &[run_id]).await;
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].detection_status, DetectionStatus::Unresolved);
    assert_eq!(second[0].bug_hash, first[0].bug_hash);
}
