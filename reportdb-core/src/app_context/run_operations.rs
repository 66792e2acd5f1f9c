use std::collections::HashMap;

use super::AppContext;
use crate::auth::{Actor, Permission};
use crate::errors::CoreResult;
use crate::query::{CompareData, ReportFilter, RunFilter, RunHistoryFilter};
use crate::services::{AnalyzerStatisticsData, RunHistoryData, RunSortMode, RunSummary};

impl AppContext {
    pub async fn get_run_data(
        &self,
        actor: &Actor,
        filter: &RunFilter,
        limit: Option<u64>,
        offset: u64,
        sort: Option<RunSortMode>,
    ) -> CoreResult<Vec<RunSummary>> {
        self.authorize(actor, Permission::Access)?;
        self.run_service
            .get_run_data(filter, self.page_size(limit), offset, sort)
            .await
    }

    pub async fn get_run_count(&self, actor: &Actor, filter: &RunFilter) -> CoreResult<u64> {
        self.authorize(actor, Permission::Access)?;
        self.run_service.get_run_count(filter).await
    }

    pub async fn get_run_history(
        &self,
        actor: &Actor,
        run_ids: &[i32],
        limit: Option<u64>,
        offset: u64,
        filter: &RunHistoryFilter,
    ) -> CoreResult<Vec<RunHistoryData>> {
        self.authorize(actor, Permission::Access)?;
        self.run_service
            .get_run_history(run_ids, self.page_size(limit), offset, filter)
            .await
    }

    pub async fn get_run_history_count(
        &self,
        actor: &Actor,
        run_ids: &[i32],
        filter: &RunHistoryFilter,
    ) -> CoreResult<u64> {
        self.authorize(actor, Permission::Access)?;
        self.run_service.get_run_history_count(run_ids, filter).await
    }

    pub async fn get_check_command(
        &self,
        actor: &Actor,
        run_history_id: Option<i32>,
        run_id: Option<i32>,
    ) -> CoreResult<String> {
        self.authorize(actor, Permission::Access)?;
        self.run_service
            .get_check_command(run_history_id, run_id)
            .await
    }

    pub async fn get_analysis_statistics(
        &self,
        actor: &Actor,
        run_id: Option<i32>,
        run_history_id: Option<i32>,
    ) -> CoreResult<HashMap<String, AnalyzerStatisticsData>> {
        self.authorize(actor, Permission::Access)?;
        self.run_service
            .get_analysis_statistics(run_id, run_history_id)
            .await
    }

    pub async fn remove_run(&self, actor: &Actor, run_id: i32) -> CoreResult<bool> {
        self.authorize(actor, Permission::Store)?;
        self.run_service.remove_run(run_id).await
    }

    pub async fn remove_run_results(&self, actor: &Actor, run_ids: &[i32]) -> CoreResult<bool> {
        self.authorize(actor, Permission::Store)?;
        self.run_service.remove_run_results(run_ids).await
    }

    pub async fn remove_run_reports(
        &self,
        actor: &Actor,
        run_ids: &[i32],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
    ) -> CoreResult<bool> {
        self.authorize(actor, Permission::Store)?;
        self.run_service
            .remove_run_reports(run_ids, filter, cmp_data)
            .await
    }

    pub async fn update_run_data(
        &self,
        actor: &Actor,
        run_id: i32,
        new_name: &str,
    ) -> CoreResult<bool> {
        self.authorize(actor, Permission::Store)?;
        self.run_service.update_run_data(run_id, new_name).await
    }
}
