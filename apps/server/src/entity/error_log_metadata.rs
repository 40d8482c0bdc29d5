//! Error log metadata entity for SeaORM.
//!
//! Append-only; the row with the latest `created_at` is the current metadata.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "error_log_metadata")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub error_log_id: i32,
    pub error_type: Option<String>,
    pub error_category: Option<String>,
    pub impact_level: Option<String>,
    pub occurred_at: Option<String>,
    pub system_type: Option<String>,
    pub severity: Option<String>,
    pub resource_type: Option<String>,
    pub service_name: Option<String>,
    pub file_path: Option<String>,
    pub line_number: Option<i32>,
    #[sea_orm(column_type = "Json", nullable)]
    pub analysis_data: Option<JsonValue>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::error_log::Entity",
        from = "Column::ErrorLogId",
        to = "super::error_log::Column::Id",
        on_delete = "Cascade"
    )]
    ErrorLog,
}

impl Related<super::error_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ErrorLog.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
