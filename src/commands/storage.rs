use crate::models::{
    BulkSqlResult, CacheMetadata, FilterCriteria, MessageHistogram, SelectionBreakdown,
    SortState, StorageEntity, StorageOverview,
};
use crate::services::panel::PanelState;

fn overview(panel: &PanelState) -> StorageOverview {
    StorageOverview {
        entities: panel.entities().to_vec(),
        summary: panel.summary().cloned(),
        database_size: panel.database_size().cloned(),
        source: panel.source(),
        cache_age: panel.data_age(),
    }
}

pub async fn get_storage_overview(panel: &mut PanelState) -> Result<StorageOverview, String> {
    if panel.entities().is_empty() && !panel.mount() {
        panel.refresh(false).await.map_err(|e| e.to_string())?;
    }
    Ok(overview(panel))
}

pub async fn refresh_storage_overview(
    panel: &mut PanelState,
    start_over: Option<bool>,
) -> Result<StorageOverview, String> {
    panel
        .refresh(start_over.unwrap_or(false))
        .await
        .map_err(|e| e.to_string())?;
    Ok(overview(panel))
}

pub async fn get_filtered_entities(
    panel: &mut PanelState,
    filters: Option<FilterCriteria>,
    sort: Option<Vec<SortState>>,
) -> Result<Vec<StorageEntity>, String> {
    panel.ensure_inventory().map_err(|e| e.to_string())?;
    if let Some(filters) = filters {
        panel.set_filter(filters);
    }
    if let Some(sort) = sort {
        panel.set_sort(sort);
    }
    Ok(panel.visible_rows().to_vec())
}

pub async fn update_selection(
    panel: &mut PanelState,
    select: Vec<String>,
    deselect: Vec<String>,
) -> Result<SelectionBreakdown, String> {
    panel.ensure_inventory().map_err(|e| e.to_string())?;

    let rejected: Vec<&str> = select
        .iter()
        .filter(|id| !panel.select(id))
        .map(String::as_str)
        .collect();
    if !rejected.is_empty() {
        log::warn!("[Commands] Not selectable: {}", rejected.join(", "));
    }
    for id in &deselect {
        panel.deselect(id);
    }
    Ok(panel.selection_breakdown())
}

pub async fn generate_bulk_delete_sql(panel: &mut PanelState) -> Result<BulkSqlResult, String> {
    panel.generate_bulk_sql().await.map_err(|e| e.to_string())
}

pub async fn get_message_histogram(
    panel: &PanelState,
    entity_id: String,
    hours: Option<u32>,
) -> Result<Option<MessageHistogram>, String> {
    panel
        .load_histogram(&entity_id, hours.unwrap_or(24))
        .await
        .map_err(|e| e.to_string())
}

pub async fn get_cache_metadata(panel: &PanelState) -> Result<Option<CacheMetadata>, String> {
    Ok(panel.cache_metadata())
}
