//! Database queries for error logs and their metadata.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::entity::error_log::{self, Entity as ErrorLog};
use crate::entity::error_log_metadata::{self, Entity as ErrorLogMetadata};
use crate::error::{AppError, AppResult};
use crate::models::{ErrorLogRecord, HistoryResult, LogFilters, ResolvedSubmission};
use crate::services::grouping;

use super::DbPool;

impl DbPool {
    /// Resolve a submission and store it with its metadata in one transaction.
    pub async fn create_error_log(&self, submission: &JsonValue) -> AppResult<ErrorLogRecord> {
        let resolved = ResolvedSubmission::from_submission(submission)?;
        let analysis_data = serde_json::to_value(&resolved.analysis_data)
            .map_err(|e| AppError::Database(format!("Failed to encode analysis data: {}", e)))?;
        let now = Utc::now();

        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let log = error_log::ActiveModel {
            id: ActiveValue::NotSet,
            log_content: Set(resolved.log_content),
            log_type: Set(resolved.log_type),
            parsed_data: Set(Some(resolved.parsed_data)),
            system_type: Set(resolved.system_type.clone()),
            severity: Set(resolved.severity.clone()),
            resource_type: Set(resolved.resource_type.clone()),
            service_name: Set(resolved.service_name.clone()),
            file_path: Set(resolved.file_path.clone()),
            line_number: Set(resolved.line_number),
            error_type: Set(resolved.error_type.clone()),
            error_category: Set(resolved.error_category.clone()),
            timestamp: Set(resolved.timestamp.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to insert error log: {}", e)))?;

        let metadata = error_log_metadata::ActiveModel {
            id: ActiveValue::NotSet,
            error_log_id: Set(log.id),
            error_type: Set(resolved.error_type),
            error_category: Set(resolved.error_category),
            impact_level: Set(resolved.impact_level),
            occurred_at: Set(resolved.timestamp),
            system_type: Set(resolved.system_type),
            severity: Set(resolved.severity),
            resource_type: Set(resolved.resource_type),
            service_name: Set(resolved.service_name),
            file_path: Set(resolved.file_path),
            line_number: Set(resolved.line_number),
            analysis_data: Set(Some(analysis_data)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to insert error log metadata: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit error log: {}", e)))?;

        info!(
            id = log.id,
            severity = ?log.severity,
            system_type = ?log.system_type,
            "Error log saved"
        );

        Ok(ErrorLogRecord::from_models(log, Some(metadata)))
    }

    /// Get an error log with its current metadata.
    pub async fn find_error_log_by_id(&self, id: i32) -> AppResult<Option<ErrorLogRecord>> {
        let Some(log) = ErrorLog::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get error log: {}", e)))?
        else {
            return Ok(None);
        };

        let mut metadata = self.current_metadata(&[id]).await?;
        Ok(Some(ErrorLogRecord::from_models(log, metadata.remove(&id))))
    }

    /// List error logs, newest first, optionally grouped by date.
    pub async fn find_error_logs(
        &self,
        limit: u64,
        filters: &LogFilters,
        group_by_date: bool,
    ) -> AppResult<HistoryResult> {
        let mut select = ErrorLog::find();

        if let Some(ref system_type) = filters.system_type {
            select = select.filter(error_log::Column::SystemType.eq(system_type.as_str()));
        }
        if let Some(ref severity) = filters.severity {
            select = select.filter(error_log::Column::Severity.eq(severity.as_str()));
        }
        if let Some(ref error_type) = filters.error_type {
            select = select.filter(error_log::Column::ErrorType.eq(error_type.as_str()));
        }
        if let Some(ref start_date) = filters.start_date {
            select = select.filter(error_log::Column::Timestamp.gte(start_date.as_str()));
        }
        if let Some(ref end_date) = filters.end_date {
            select = match day_after(end_date) {
                Some(next_day) => select.filter(error_log::Column::Timestamp.lt(next_day)),
                None => select.filter(error_log::Column::Timestamp.lte(end_date.as_str())),
            };
        }

        let logs = select
            .order_by_desc(error_log::Column::CreatedAt)
            .order_by_desc(error_log::Column::Id)
            .limit(limit)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list error logs: {}", e)))?;

        let ids: Vec<i32> = logs.iter().map(|log| log.id).collect();
        let mut metadata = self.current_metadata(&ids).await?;

        let records: Vec<ErrorLogRecord> = logs
            .into_iter()
            .map(|log| {
                let current = metadata.remove(&log.id);
                ErrorLogRecord::from_models(log, current)
            })
            .collect();

        debug!(count = records.len(), group_by_date, "Loaded error log history");

        Ok(if group_by_date {
            HistoryResult::Grouped(grouping::group_by_date(records))
        } else {
            HistoryResult::Flat(records)
        })
    }

    /// Delete every error log and all metadata. Returns the number of logs removed.
    pub async fn delete_all_error_logs(&self) -> AppResult<u64> {
        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        ErrorLogMetadata::delete_many()
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete error log metadata: {}", e)))?;

        let result = ErrorLog::delete_many()
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete error logs: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit deletion: {}", e)))?;

        info!(deleted = result.rows_affected, "Deleted all error logs");

        Ok(result.rows_affected)
    }

    /// Latest-created metadata row per error log id.
    async fn current_metadata(
        &self,
        ids: &[i32],
    ) -> AppResult<HashMap<i32, error_log_metadata::Model>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = ErrorLogMetadata::find()
            .filter(error_log_metadata::Column::ErrorLogId.is_in(ids.iter().copied()))
            .order_by_asc(error_log_metadata::Column::CreatedAt)
            .order_by_asc(error_log_metadata::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get error log metadata: {}", e)))?;

        // Ascending order, so later rows replace earlier ones.
        Ok(rows.into_iter().map(|row| (row.error_log_id, row)).collect())
    }
}

/// Exclusive upper bound for a bare `YYYY-MM-DD` end date.
fn day_after(end_date: &str) -> Option<String> {
    if end_date.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(end_date, "%Y-%m-%d")
        .ok()?
        .succ_opt()
        .map(|day| day.format("%Y-%m-%d").to_string())
}
