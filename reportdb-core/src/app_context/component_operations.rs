use super::AppContext;
use crate::auth::{Actor, Permission};
use crate::errors::CoreResult;
use crate::services::SourceComponentData;

impl AppContext {
    pub async fn add_source_component(
        &self,
        actor: &Actor,
        name: &str,
        value: &str,
        description: Option<&str>,
    ) -> CoreResult<bool> {
        self.authorize(actor, Permission::Admin)?;
        self.source_component_service
            .add_source_component(name, value, description, actor.username())
            .await
    }

    pub async fn get_source_components(
        &self,
        actor: &Actor,
        patterns: &[String],
    ) -> CoreResult<Vec<SourceComponentData>> {
        self.authorize(actor, Permission::Access)?;
        self.source_component_service
            .get_source_components(patterns)
            .await
    }

    pub async fn remove_source_component(&self, actor: &Actor, name: &str) -> CoreResult<bool> {
        self.authorize(actor, Permission::Admin)?;
        self.source_component_service
            .remove_source_component(name)
            .await
    }
}
