use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Connection settings for a throwaway test database. Migrations are run by
/// the caller so this crate stays independent of the schema.
pub struct TestDb {
    url: String,
}

impl TestDb {
    pub fn new_in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
        }
    }

    pub fn new_file(path: impl Into<String>) -> Self {
        Self {
            url: format!("sqlite://{}?mode=rwc", path.into()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn connect(&self) -> Result<DatabaseConnection, DbErr> {
        let mut options = ConnectOptions::new(self.url.clone());
        // An in-memory database only lives as long as its one connection
        options.max_connections(1).sqlx_logging(false);
        Database::connect(options).await
    }
}
