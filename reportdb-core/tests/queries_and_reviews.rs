mod common;

use reportdb::auth::{resolve_actor, Actor, Permission};
use reportdb::config::{PermissionConfig, StoreConfig};
use reportdb::database::entities::common_types::{DetectionStatus, ReviewStatus, Severity};
use reportdb::errors::{CoreErrorKind, ErrorCode};
use reportdb::query::{CompareData, DiffType, ReportFilter, RunFilter};
use reportdb::services::comment_service::CommentKind;

use common::*;

fn hashes(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn literal_hash_diff_against_a_run() {
    let ctx = context().await;
    let run_id = store(&ctx, "proj", &hashed_archive(&["h1", "h2"])).await;
    let local = hashes(&["h2", "h3", "h3"]);

    let new = ctx
        .get_diff_results_hash(&admin(), &[run_id], &local, DiffType::New, &[])
        .await
        .unwrap();
    assert_eq!(new, hashes(&["h3"]));

    let resolved = ctx
        .get_diff_results_hash(&admin(), &[run_id], &local, DiffType::Resolved, &[])
        .await
        .unwrap();
    assert_eq!(resolved, hashes(&["h1"]));

    let unresolved = ctx
        .get_diff_results_hash(&admin(), &[run_id], &local, DiffType::Unresolved, &[])
        .await
        .unwrap();
    assert_eq!(unresolved, hashes(&["h2"]));
}

#[tokio::test]
async fn run_comparison_filters_results() {
    let ctx = context().await;
    let base = store(&ctx, "base", &hashed_archive(&["h1", "h2"])).await;
    let head = store(&ctx, "head", &hashed_archive(&["h2", "h3"])).await;

    let diff = |diff_type| CompareData {
        run_ids: vec![head],
        diff_type,
        run_tag: vec![],
        open_reports_date: None,
    };
    let bug_hashes = |reports: Vec<reportdb::query::ReportData>| {
        let mut hashes: Vec<String> = reports.into_iter().map(|r| r.bug_hash).collect();
        hashes.sort();
        hashes
    };

    let filter = ReportFilter::default();
    let new = ctx
        .get_run_results(&admin(), &[base], None, 0, &[], &filter, Some(&diff(DiffType::New)), false)
        .await
        .unwrap();
    assert_eq!(bug_hashes(new), hashes(&["h3"]));

    let resolved = ctx
        .get_run_results(&admin(), &[base], None, 0, &[], &filter, Some(&diff(DiffType::Resolved)), false)
        .await
        .unwrap();
    assert_eq!(bug_hashes(resolved), hashes(&["h1"]));

    let unresolved = ctx
        .get_run_result_count(&admin(), &[base], &filter, Some(&diff(DiffType::Unresolved)))
        .await
        .unwrap();
    assert_eq!(unresolved, 1);
}

#[tokio::test]
async fn unique_mode_counts_identities_across_runs() {
    let ctx = context().await;
    store(&ctx, "a", &hashed_archive(&["h1", "h2"])).await;
    store(&ctx, "b", &hashed_archive(&["h2"])).await;

    let all = ctx
        .get_run_result_count(&admin(), &[], &ReportFilter::default(), None)
        .await
        .unwrap();
    assert_eq!(all, 3);

    let unique = ReportFilter {
        is_unique: true,
        ..ReportFilter::default()
    };
    let count = ctx
        .get_run_result_count(&admin(), &[], &unique, None)
        .await
        .unwrap();
    assert_eq!(count, 2);
    let page = ctx
        .get_run_results(&admin(), &[], None, 0, &[], &unique, None, false)
        .await
        .unwrap();
    assert_eq!(page.len(), 2);

    let checkers = ctx
        .get_checker_counts(&admin(), &[], &unique, None, None, 0)
        .await
        .unwrap();
    assert_eq!(checkers.len(), 1);
    assert_eq!(checkers[0].name, "deadcode.DeadStores");
    assert_eq!(checkers[0].count, 2);

    let per_run = ctx
        .get_run_report_counts(&admin(), &[], &ReportFilter::default(), None, 0)
        .await
        .unwrap();
    let counts: Vec<(String, i64)> = per_run.into_iter().map(|c| (c.name, c.report_count)).collect();
    assert_eq!(counts, vec![("a".to_string(), 2), ("b".to_string(), 1)]);
}

#[tokio::test]
async fn aggregates_follow_the_filter() {
    let ctx = context().await;
    let run_id = store(&ctx, "proj", &null_deref_archive()).await;

    let severities = ctx
        .get_severity_counts(&admin(), &[run_id], &ReportFilter::default(), None)
        .await
        .unwrap();
    assert_eq!(severities.get(&Severity::Unspecified), Some(&1));

    let detection = ctx
        .get_detection_status_counts(&admin(), &[run_id], &ReportFilter::default(), None)
        .await
        .unwrap();
    assert_eq!(detection.get(&DetectionStatus::New), Some(&1));

    let reviews = ctx
        .get_review_status_counts(&admin(), &[run_id], &ReportFilter::default(), None)
        .await
        .unwrap();
    assert_eq!(reviews.get(&ReviewStatus::Unreviewed), Some(&1));

    let files = ctx
        .get_file_counts(&admin(), &[run_id], &ReportFilter::default(), None, None, 0)
        .await
        .unwrap();
    assert_eq!(files.get("/src/main.c"), Some(&1));

    let other_checker = ReportFilter {
        checker_name: vec!["deadcode.*".to_string()],
        ..ReportFilter::default()
    };
    let messages = ctx
        .get_checker_msg_counts(&admin(), &[run_id], &other_checker, None, None, 0)
        .await
        .unwrap();
    assert!(messages.is_empty());
}

#[tokio::test]
async fn review_status_follows_the_identity_into_other_runs() {
    let ctx = context().await;
    let first = store(&ctx, "first", &null_deref_archive()).await;
    let report_id = results(&ctx, &[first]).await[0].report_id;

    ctx.change_review_status(&admin(), report_id, ReviewStatus::FalsePositive, Some("not reachable"))
        .await
        .unwrap();

    let second = store(&ctx, "second", &null_deref_archive()).await;
    let review = &results(&ctx, &[second]).await[0].review_data;
    assert_eq!(review.status, ReviewStatus::FalsePositive);
    assert_eq!(review.author.as_deref(), Some("admin"));
    assert_eq!(review.comment.as_deref(), Some("not reachable"));

    let runs = ctx
        .get_run_data(&admin(), &RunFilter::default(), None, 0, None)
        .await
        .unwrap();
    assert!(runs.iter().all(|run| run.result_count == 0));
}

#[tokio::test]
async fn review_change_leaves_an_expanded_system_comment() {
    let ctx = context().await;
    let run_id = store(&ctx, "proj", &null_deref_archive()).await;
    let report_id = results(&ctx, &[run_id]).await[0].report_id;

    ctx.change_review_status(&admin(), report_id, ReviewStatus::Confirmed, Some("real bug"))
        .await
        .unwrap();
    ctx.add_comment(&admin(), report_id, "fix in progress")
        .await
        .unwrap();

    let comments = ctx.get_comments(&admin(), report_id).await.unwrap();
    assert_eq!(comments.len(), 2);
    let system = comments
        .iter()
        .find(|c| c.kind == CommentKind::System)
        .unwrap();
    assert_eq!(
        system.message,
        "changed review status from Unreviewed to Confirmed with comment: real bug"
    );
    assert_eq!(ctx.get_comment_count(&admin(), report_id).await.unwrap(), 2);
}

#[tokio::test]
async fn review_changes_can_be_disabled() {
    let ctx = context_with(reportdb::config::StoreConfig {
        review_status_change_disabled: true,
        ..test_config()
    })
    .await;
    let run_id = store(&ctx, "proj", &null_deref_archive()).await;
    let report_id = results(&ctx, &[run_id]).await[0].report_id;

    let err = ctx
        .change_review_status(&admin(), report_id, ReviewStatus::Confirmed, None)
        .await
        .unwrap_err();
    assert_eq!(err.message(), "Review status change is disabled!");
}

#[tokio::test]
async fn only_the_author_edits_a_comment() {
    let ctx = context().await;
    let run_id = store(&ctx, "proj", &null_deref_archive()).await;
    let report_id = results(&ctx, &[run_id]).await[0].report_id;

    let alice = Actor::user("alice").with_permission(Permission::Access);
    let bob = Actor::user("bob").with_permission(Permission::Access);
    ctx.add_comment(&alice, report_id, "looks real").await.unwrap();
    let comment_id = ctx.get_comments(&alice, report_id).await.unwrap()[0].id;

    let err = ctx
        .update_comment(&bob, comment_id, "not real")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::Unauthorized);
    assert_eq!(err.code(), ErrorCode::Unauthorized);
    assert!(ctx.remove_comment(&bob, comment_id).await.is_err());

    ctx.update_comment(&alice, comment_id, "definitely real")
        .await
        .unwrap();
    let comments = ctx.get_comments(&alice, report_id).await.unwrap();
    assert!(comments
        .iter()
        .any(|c| c.message == "changed comment message from looks real to definitely real"));
    assert!(ctx.remove_comment(&alice, comment_id).await.unwrap());
}

#[tokio::test]
async fn permissions_gate_operations() {
    let ctx = context().await;
    let config = PermissionConfig {
        anonymous: vec![],
        users: [("reader".to_string(), vec![Permission::Access])].into(),
    };

    let reader = resolve_actor(&config, Some("reader"));
    let err = ctx
        .mass_store(&reader, &request("proj", &null_deref_archive()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);
    assert_eq!(
        err.message(),
        "You are not authorized to execute this action. PRODUCT_STORE permission is required."
    );
    assert!(ctx.get_run_count(&reader, &RunFilter::default()).await.is_ok());

    let anonymous = resolve_actor(&config, None);
    assert!(ctx.get_run_count(&anonymous, &RunFilter::default()).await.is_err());
}

#[tokio::test]
async fn literal_hash_diff_in_small_chunks() {
    let ctx = context_with(StoreConfig {
        diff_chunk_size: 1,
        ..test_config()
    })
    .await;
    let run_id = store(&ctx, "proj", &hashed_archive(&["h1", "h2", "h3"])).await;
    let local = hashes(&["h2", "h3", "h4", "h5", "h4"]);

    let expected = [
        (DiffType::New, hashes(&["h4", "h5"])),
        (DiffType::Resolved, hashes(&["h1"])),
        (DiffType::Unresolved, hashes(&["h2", "h3"])),
    ];
    for (diff_type, want) in expected {
        let got = ctx
            .get_diff_results_hash(&admin(), &[run_id], &local, diff_type, &[])
            .await
            .unwrap();
        assert_eq!(got, want, "{:?}", diff_type);
    }
}
