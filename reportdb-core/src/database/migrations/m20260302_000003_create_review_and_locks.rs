use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReviewStatuses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReviewStatuses::BugHash)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ReviewStatuses::Status).string().not_null())
                    .col(ColumnDef::new(ReviewStatuses::Author).string().not_null())
                    .col(
                        ColumnDef::new(ReviewStatuses::Message)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(ReviewStatuses::Date).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Comments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Comments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Comments::BugHash).string().not_null())
                    .col(ColumnDef::new(Comments::Author).string().not_null())
                    .col(ColumnDef::new(Comments::Message).text().not_null())
                    .col(
                        ColumnDef::new(Comments::Kind)
                            .string()
                            .not_null()
                            .default("user"),
                    )
                    .col(ColumnDef::new(Comments::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comments_bug_hash")
                    .table(Comments::Table)
                    .col(Comments::BugHash)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RunLocks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RunLocks::Name)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RunLocks::Username).string().not_null())
                    .col(ColumnDef::new(RunLocks::LockedAt).timestamp().not_null())
                    .col(
                        ColumnDef::new(RunLocks::Version)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SourceComponents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SourceComponents::Name)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SourceComponents::Value).text().not_null())
                    .col(ColumnDef::new(SourceComponents::Description).text())
                    .col(ColumnDef::new(SourceComponents::Username).string())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SourceComponents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RunLocks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Comments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ReviewStatuses::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ReviewStatuses {
    Table,
    BugHash,
    Status,
    Author,
    Message,
    Date,
}

#[derive(DeriveIden)]
enum Comments {
    Table,
    Id,
    BugHash,
    Author,
    Message,
    Kind,
    CreatedAt,
}

#[derive(DeriveIden)]
enum RunLocks {
    Table,
    Name,
    Username,
    LockedAt,
    Version,
}

#[derive(DeriveIden)]
enum SourceComponents {
    Table,
    Name,
    Value,
    Description,
    Username,
}
