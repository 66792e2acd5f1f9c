use super::AppContext;
use crate::auth::{Actor, Permission};
use crate::errors::CoreResult;
use crate::services::{MassStoreRequest, SourceFileData};

impl AppContext {
    /// Store an archive into a run and return the run id. Suppression
    /// conflicts surface as an error after the store has been committed.
    pub async fn mass_store(&self, actor: &Actor, request: &MassStoreRequest) -> CoreResult<i32> {
        self.authorize(actor, Permission::Store)?;
        self.mass_store_service
            .store(actor.username(), request)
            .await?
            .into_result()
    }

    pub async fn get_missing_content_hashes(
        &self,
        actor: &Actor,
        hashes: &[String],
    ) -> CoreResult<Vec<String>> {
        self.authorize(actor, Permission::Store)?;
        self.content_service.get_missing_content_hashes(hashes).await
    }

    pub async fn get_source_file_data(
        &self,
        actor: &Actor,
        file_id: i32,
        with_content: bool,
    ) -> CoreResult<SourceFileData> {
        self.authorize(actor, Permission::Access)?;
        self.content_service
            .get_source_file_data(file_id, with_content)
            .await
    }
}
