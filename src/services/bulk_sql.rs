use crate::models::{BulkProgress, BulkSqlEntry, BulkSqlResult, BulkStatus, StorageEntity};
use crate::services::api_client::AcquisitionClient;

/// Ask the backend for a delete statement per row, one request at a time.
///
/// Rows with no recorded data are skipped. A failed row is kept in the result
/// with its error and does not stop the rest.
pub async fn generate_bulk_sql<F>(
    client: &dyn AcquisitionClient,
    entities: &[StorageEntity],
    mut on_progress: F,
) -> BulkSqlResult
where
    F: FnMut(BulkProgress),
{
    let targets: Vec<_> = entities
        .iter()
        .filter_map(|e| e.delete_target().map(|target| (e, target)))
        .collect();

    let total = targets.len();
    if total < entities.len() {
        log::debug!(
            "[BulkSql] Skipping {} rows without recorded data",
            entities.len() - total
        );
    }

    let mut result = BulkSqlResult {
        status: BulkStatus::Error,
        entities: Vec::with_capacity(total),
        total_storage_saved: 0,
        total_count: 0,
        success_count: 0,
        error_count: 0,
    };

    for (done, (entity, (origin, count))) in targets.into_iter().enumerate() {
        let response = client
            .generate_delete_sql(
                &entity.entity_id,
                origin,
                entity.in_states_meta,
                entity.in_statistics_meta,
            )
            .await;

        match response {
            Ok(response) => {
                result.total_storage_saved += response.storage_saved;
                result.total_count += count;
                result.success_count += 1;
                result.entities.push(BulkSqlEntry {
                    entity_id: entity.entity_id.clone(),
                    sql: response.sql,
                    storage_saved: response.storage_saved,
                    count,
                    error: None,
                });
            }
            Err(e) => {
                log::error!("[BulkSql] Failed to generate SQL for {}: {}", entity.entity_id, e);
                result.error_count += 1;
                result.entities.push(BulkSqlEntry {
                    entity_id: entity.entity_id.clone(),
                    sql: String::new(),
                    storage_saved: 0,
                    count: 0,
                    error: Some(e.to_string()),
                });
            }
        }

        on_progress(BulkProgress {
            done: done + 1,
            total,
        });
    }

    result.status = match (result.success_count, result.error_count) {
        (0, _) => BulkStatus::Error,
        (_, 0) => BulkStatus::Success,
        _ => BulkStatus::Partial,
    };
    log::info!(
        "[BulkSql] Generated {} statements, {} failed",
        result.success_count,
        result.error_count
    );
    result
}

impl BulkSqlResult {
    pub fn combined_sql(&self) -> String {
        self.entities
            .iter()
            .map(|e| match &e.error {
                Some(error) => format!("-- Entity: {}\n-- ERROR: {}\n", e.entity_id, error),
                None => format!(
                    "-- Entity: {} ({} records, {:.2} MB saved)\n{}",
                    e.entity_id,
                    crate::utils::format::format_number(e.count),
                    e.storage_saved as f64 / (1024.0 * 1024.0),
                    e.sql
                ),
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
