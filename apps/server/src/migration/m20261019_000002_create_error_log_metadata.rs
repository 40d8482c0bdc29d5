//! Create error_log_metadata table.

use sea_orm_migration::prelude::*;

use super::m20261019_000001_create_error_logs::ErrorLog;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ErrorLogMetadata::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ErrorLogMetadata::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ErrorLogMetadata::ErrorLogId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ErrorLogMetadata::ErrorType).string())
                    .col(ColumnDef::new(ErrorLogMetadata::ErrorCategory).string())
                    .col(ColumnDef::new(ErrorLogMetadata::ImpactLevel).string())
                    .col(ColumnDef::new(ErrorLogMetadata::OccurredAt).string())
                    .col(ColumnDef::new(ErrorLogMetadata::SystemType).string())
                    .col(ColumnDef::new(ErrorLogMetadata::Severity).string())
                    .col(ColumnDef::new(ErrorLogMetadata::ResourceType).string())
                    .col(ColumnDef::new(ErrorLogMetadata::ServiceName).string())
                    .col(ColumnDef::new(ErrorLogMetadata::FilePath).string())
                    .col(ColumnDef::new(ErrorLogMetadata::LineNumber).integer())
                    .col(ColumnDef::new(ErrorLogMetadata::AnalysisData).json())
                    .col(
                        ColumnDef::new(ErrorLogMetadata::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ErrorLogMetadata::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ErrorLogMetadata::Table, ErrorLogMetadata::ErrorLogId)
                            .to(ErrorLog::Table, ErrorLog::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Current metadata lookups order by created_at within one log.
        manager
            .create_index(
                Index::create()
                    .name("idx_error_log_metadata_log_created")
                    .table(ErrorLogMetadata::Table)
                    .col(ErrorLogMetadata::ErrorLogId)
                    .col(ErrorLogMetadata::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ErrorLogMetadata::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ErrorLogMetadata {
    Table,
    Id,
    ErrorLogId,
    ErrorType,
    ErrorCategory,
    ImpactLevel,
    OccurredAt,
    SystemType,
    Severity,
    ResourceType,
    ServiceName,
    FilePath,
    LineNumber,
    AnalysisData,
    CreatedAt,
    UpdatedAt,
}
