use sea_orm::DatabaseConnection;

pub async fn setup_test_db() -> DatabaseConnection {
    super::connection::connect_and_migrate("sqlite::memory:")
        .await
        .expect("Failed to set up test database")
}
