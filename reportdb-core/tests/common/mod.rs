#![allow(dead_code)]

use reportdb::auth::{Actor, Permission};
use reportdb::config::StoreConfig;
use reportdb::database::connection::connect_and_migrate;
use reportdb::query::{ReportData, ReportFilter};
use reportdb::services::MassStoreRequest;
use reportdb::AppContext;
use reportdb_test_utils::{finding, ArchiveBuilder};

pub const NULL_DEREF: &str = "core.NullDereference";

pub const MAIN_C: &str = "int main() {\n  int *p = 0;\n  return *p;\n}\n";

pub fn test_config() -> StoreConfig {
    StoreConfig {
        store_retry_base_delay_ms: 1,
        ..StoreConfig::default()
    }
}

pub async fn context() -> AppContext {
    context_with(test_config()).await
}

pub async fn context_with(config: StoreConfig) -> AppContext {
    let db = connect_and_migrate("sqlite::memory:")
        .await
        .expect("in-memory database");
    AppContext::new(db, config)
}

pub fn admin() -> Actor {
    Actor::user("admin").with_permission(Permission::Admin)
}

pub fn request(run_name: &str, archive: &ArchiveBuilder) -> MassStoreRequest {
    MassStoreRequest {
        run_name: run_name.to_string(),
        archive: archive.build().expect("archive"),
        ..MassStoreRequest::default()
    }
}

/// `/src/main.c` with a null dereference reported on line 3.
pub fn null_deref_archive() -> ArchiveBuilder {
    ArchiveBuilder::new().source("/src/main.c", MAIN_C).report_file(
        "main.c.json",
        &["/src/main.c"],
        vec![finding(NULL_DEREF, 0, 3, "Dereference of null pointer")],
    )
}

/// Findings with fixed identities, one per hash.
pub fn hashed_archive(hashes: &[&str]) -> ArchiveBuilder {
    let reports = hashes
        .iter()
        .enumerate()
        .map(|(i, hash)| {
            let mut record = finding("deadcode.DeadStores", 0, i as i32 + 1, "Value never read");
            record["bugHash"] = (*hash).into();
            record
        })
        .collect();
    ArchiveBuilder::new()
        .source("/src/lib.c", "a = 1;\nb = 2;\nc = 3;\nd = 4;\n")
        .report_file("lib.c.json", &["/src/lib.c"], reports)
}

pub async fn store(ctx: &AppContext, run_name: &str, archive: &ArchiveBuilder) -> i32 {
    ctx.mass_store(&admin(), &request(run_name, archive))
        .await
        .expect("store succeeds")
}

pub async fn results(ctx: &AppContext, run_ids: &[i32]) -> Vec<ReportData> {
    ctx.get_run_results(
        &admin(),
        run_ids,
        None,
        0,
        &[],
        &ReportFilter::default(),
        None,
        false,
    )
    .await
    .expect("results")
}
