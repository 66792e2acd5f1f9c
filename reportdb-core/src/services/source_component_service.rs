use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Serialize;
use tracing::info;

use crate::database::entities::source_components;
use crate::errors::{CoreError, CoreErrorKind, CoreResult};
use crate::query::filter::ilike_any;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceComponentData {
    pub name: String,
    pub value: String,
    pub description: Option<String>,
}

impl From<source_components::Model> for SourceComponentData {
    fn from(model: source_components::Model) -> Self {
        Self {
            name: model.name,
            value: model.value,
            description: model.description,
        }
    }
}

#[derive(Clone)]
pub struct SourceComponentService {
    db: DatabaseConnection,
}

impl SourceComponentService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create or replace a component.
    pub async fn add_source_component(
        &self,
        name: &str,
        value: &str,
        description: Option<&str>,
        username: &str,
    ) -> CoreResult<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("Source component name can not be empty!"));
        }

        source_components::Entity::insert(source_components::ActiveModel {
            name: Set(name.to_string()),
            value: Set(value.to_string()),
            description: Set(description.map(str::to_string)),
            username: Set(Some(username.to_string())),
        })
        .on_conflict(
            OnConflict::column(source_components::Column::Name)
                .update_columns([
                    source_components::Column::Value,
                    source_components::Column::Description,
                    source_components::Column::Username,
                ])
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await?;

        info!("Source component '{}' was saved by {}", name, username);
        Ok(true)
    }

    /// Components whose name matches any of the patterns, all when none.
    pub async fn get_source_components(
        &self,
        patterns: &[String],
    ) -> CoreResult<Vec<SourceComponentData>> {
        let mut select = source_components::Entity::find();
        if !patterns.is_empty() {
            select = select.filter(ilike_any(
                Expr::col((source_components::Entity, source_components::Column::Name)).into(),
                patterns,
            ));
        }
        let rows = select
            .order_by_asc(source_components::Column::Name)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(SourceComponentData::from).collect())
    }

    pub async fn remove_source_component(&self, name: &str) -> CoreResult<bool> {
        let deleted = source_components::Entity::delete_by_id(name.to_string())
            .exec(&self.db)
            .await?;
        if deleted.rows_affected == 0 {
            return Err(CoreError::new(
                CoreErrorKind::NotFound,
                format!("Source component {} was not found in the database.", name),
            ));
        }
        info!("Source component '{}' was removed", name);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::setup_test_db;
    use crate::errors::ErrorCode;

    #[tokio::test]
    async fn upsert_replaces_rules() {
        let service = SourceComponentService::new(setup_test_db().await);
        service
            .add_source_component("core", "+/src/*", None, "admin")
            .await
            .unwrap();
        service
            .add_source_component("core", "+/src/*\n-/src/gen/*", Some("core sources"), "admin")
            .await
            .unwrap();
        service
            .add_source_component("arch", "+/arch/*", None, "admin")
            .await
            .unwrap();

        let all = service.get_source_components(&[]).await.unwrap();
        let names: Vec<&str> = all.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["arch", "core"]);
        assert_eq!(all[1].value, "+/src/*\n-/src/gen/*");
        assert_eq!(all[1].description.as_deref(), Some("core sources"));

        let filtered = service
            .get_source_components(&["CO*".to_string()])
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
    }

    #[tokio::test]
    async fn removing_unknown_component_fails() {
        let service = SourceComponentService::new(setup_test_db().await);
        let err = service.remove_source_component("nope").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Database);
        assert_eq!(
            err.message(),
            "Source component nope was not found in the database."
        );
    }
}
