//! Create error_logs table.
//!
//! One row per ingested log. Filter fields are denormalized out of the
//! opaque `parsed_data` payload.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ErrorLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ErrorLog::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ErrorLog::LogContent).text().not_null())
                    .col(ColumnDef::new(ErrorLog::LogType).string())
                    .col(ColumnDef::new(ErrorLog::ParsedData).json())
                    .col(ColumnDef::new(ErrorLog::SystemType).string())
                    .col(ColumnDef::new(ErrorLog::Severity).string())
                    .col(ColumnDef::new(ErrorLog::ResourceType).string())
                    .col(ColumnDef::new(ErrorLog::ServiceName).string())
                    .col(ColumnDef::new(ErrorLog::FilePath).string())
                    .col(ColumnDef::new(ErrorLog::LineNumber).integer())
                    .col(ColumnDef::new(ErrorLog::ErrorType).string())
                    .col(ColumnDef::new(ErrorLog::ErrorCategory).string())
                    .col(ColumnDef::new(ErrorLog::Timestamp).string())
                    .col(
                        ColumnDef::new(ErrorLog::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ErrorLog::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx_error_logs_created_at", ErrorLog::CreatedAt),
            ("idx_error_logs_timestamp", ErrorLog::Timestamp),
            ("idx_error_logs_system_type", ErrorLog::SystemType),
            ("idx_error_logs_severity", ErrorLog::Severity),
            ("idx_error_logs_error_type", ErrorLog::ErrorType),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(ErrorLog::Table)
                        .col(column)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ErrorLog::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ErrorLog {
    #[sea_orm(iden = "error_logs")]
    Table,
    Id,
    LogContent,
    LogType,
    ParsedData,
    SystemType,
    Severity,
    ResourceType,
    ServiceName,
    FilePath,
    LineNumber,
    ErrorType,
    ErrorCategory,
    Timestamp,
    CreatedAt,
    UpdatedAt,
}
