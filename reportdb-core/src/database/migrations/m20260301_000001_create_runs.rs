use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Runs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Runs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Runs::Name).string().not_null().unique_key())
                    .col(ColumnDef::new(Runs::Date).timestamp().not_null())
                    .col(
                        ColumnDef::new(Runs::Duration)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Runs::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RunHistories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RunHistories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RunHistories::RunId).integer().not_null())
                    .col(ColumnDef::new(RunHistories::Time).timestamp().not_null())
                    .col(ColumnDef::new(RunHistories::VersionTag).string())
                    .col(ColumnDef::new(RunHistories::User).string().not_null())
                    .col(ColumnDef::new(RunHistories::CcVersion).string())
                    .col(ColumnDef::new(RunHistories::Description).text())
                    .col(ColumnDef::new(RunHistories::CheckCommand).binary())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_run_histories_run")
                            .from(RunHistories::Table, RunHistories::RunId)
                            .to(Runs::Table, Runs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // NULL tags never collide, so this only constrains tagged snapshots.
        manager
            .create_index(
                Index::create()
                    .name("idx_run_histories_run_tag")
                    .table(RunHistories::Table)
                    .col(RunHistories::RunId)
                    .col(RunHistories::VersionTag)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AnalyzerStatistics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AnalyzerStatistics::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AnalyzerStatistics::RunHistoryId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AnalyzerStatistics::AnalyzerType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AnalyzerStatistics::Version).binary())
                    .col(
                        ColumnDef::new(AnalyzerStatistics::Successful)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AnalyzerStatistics::Failed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(AnalyzerStatistics::FailedFiles).binary())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_analyzer_statistics_history")
                            .from(AnalyzerStatistics::Table, AnalyzerStatistics::RunHistoryId)
                            .to(RunHistories::Table, RunHistories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AnalyzerStatistics::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RunHistories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Runs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Runs {
    Table,
    Id,
    Name,
    Date,
    Duration,
    CreatedAt,
}

#[derive(DeriveIden)]
enum RunHistories {
    Table,
    Id,
    RunId,
    Time,
    VersionTag,
    User,
    CcVersion,
    Description,
    CheckCommand,
}

#[derive(DeriveIden)]
enum AnalyzerStatistics {
    Table,
    Id,
    RunHistoryId,
    AnalyzerType,
    Version,
    Successful,
    Failed,
    FailedFiles,
}
