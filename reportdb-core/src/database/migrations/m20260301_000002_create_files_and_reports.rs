use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FileContents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FileContents::ContentHash)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FileContents::Content).binary().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Files::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Files::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Files::Filepath).string().not_null())
                    .col(ColumnDef::new(Files::Filename).string().not_null())
                    .col(ColumnDef::new(Files::ContentHash).string().not_null())
                    .index(
                        Index::create()
                            .name("idx_files_path_hash")
                            .col(Files::Filepath)
                            .col(Files::ContentHash)
                            .unique(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_files_content")
                            .from(Files::Table, Files::ContentHash)
                            .to(FileContents::Table, FileContents::ContentHash)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Reports::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reports::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Reports::RunId).integer().not_null())
                    .col(ColumnDef::new(Reports::FileId).integer().not_null())
                    .col(ColumnDef::new(Reports::Line).integer().not_null())
                    .col(ColumnDef::new(Reports::ColumnNumber).integer().not_null())
                    .col(ColumnDef::new(Reports::CheckerId).string().not_null())
                    .col(ColumnDef::new(Reports::AnalyzerName).string().not_null())
                    .col(
                        ColumnDef::new(Reports::Severity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Reports::BugId).string().not_null())
                    .col(ColumnDef::new(Reports::CheckerMessage).text().not_null())
                    .col(
                        ColumnDef::new(Reports::DetectionStatus)
                            .string()
                            .not_null()
                            .default("new"),
                    )
                    .col(
                        ColumnDef::new(Reports::PathLength)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Reports::DetectedAt).timestamp().not_null())
                    .col(ColumnDef::new(Reports::FixedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reports_run")
                            .from(Reports::Table, Reports::RunId)
                            .to(Runs::Table, Runs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reports_file")
                            .from(Reports::Table, Reports::FileId)
                            .to(Files::Table, Files::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reports_run_bug")
                    .table(Reports::Table)
                    .col(Reports::RunId)
                    .col(Reports::BugId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reports_bug")
                    .table(Reports::Table)
                    .col(Reports::BugId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BugPathEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BugPathEvents::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BugPathEvents::ReportId).integer().not_null())
                    .col(ColumnDef::new(BugPathEvents::Position).integer().not_null())
                    .col(ColumnDef::new(BugPathEvents::FileId).integer().not_null())
                    .col(ColumnDef::new(BugPathEvents::Line).integer().not_null())
                    .col(ColumnDef::new(BugPathEvents::ColumnNumber).integer().not_null())
                    .col(ColumnDef::new(BugPathEvents::Message).text().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bug_path_events_report")
                            .from(BugPathEvents::Table, BugPathEvents::ReportId)
                            .to(Reports::Table, Reports::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bug_path_events_file")
                            .from(BugPathEvents::Table, BugPathEvents::FileId)
                            .to(Files::Table, Files::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BugPathEvents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Reports::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Files::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FileContents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Runs {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum FileContents {
    Table,
    ContentHash,
    Content,
}

#[derive(DeriveIden)]
enum Files {
    Table,
    Id,
    Filepath,
    Filename,
    ContentHash,
}

#[derive(DeriveIden)]
enum Reports {
    Table,
    Id,
    RunId,
    FileId,
    Line,
    ColumnNumber,
    CheckerId,
    AnalyzerName,
    Severity,
    BugId,
    CheckerMessage,
    DetectionStatus,
    PathLength,
    DetectedAt,
    FixedAt,
}

#[derive(DeriveIden)]
enum BugPathEvents {
    Table,
    Id,
    ReportId,
    Position,
    FileId,
    Line,
    ColumnNumber,
    Message,
}
