//! Error log entity for SeaORM.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "error_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_type = "Text")]
    pub log_content: String,
    pub log_type: Option<String>,
    #[sea_orm(column_type = "Json", nullable)]
    pub parsed_data: Option<JsonValue>,
    pub system_type: Option<String>,
    pub severity: Option<String>,
    pub resource_type: Option<String>,
    pub service_name: Option<String>,
    pub file_path: Option<String>,
    pub line_number: Option<i32>,
    pub error_type: Option<String>,
    pub error_category: Option<String>,
    pub timestamp: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::error_log_metadata::Entity")]
    Metadata,
}

impl Related<super::error_log_metadata::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Metadata.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
