use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::{RegistryStatus, SelectionBreakdown, SelectionType, StorageEntity};
use crate::utils::format::parse_timestamp;

#[derive(Default)]
pub struct EntitySelection {
    disabled: Option<(Arc<[StorageEntity]>, Arc<HashSet<String>>)>,
}

impl EntitySelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_disabled_with_data(entity: &StorageEntity) -> bool {
        entity.registry_status == RegistryStatus::Disabled && entity.has_recorded_data()
    }

    pub fn selection_type(entity: &StorageEntity) -> SelectionType {
        if !entity.has_recorded_data() {
            SelectionType::NotSelectable
        } else if entity.is_deleted() {
            SelectionType::Deleted
        } else if Self::is_disabled_with_data(entity) {
            SelectionType::Disabled
        } else {
            SelectionType::NotSelectable
        }
    }

    pub fn is_selectable(entity: &StorageEntity) -> bool {
        Self::selection_type(entity) != SelectionType::NotSelectable
    }

    pub fn selectable_entities(entities: &[StorageEntity]) -> Vec<StorageEntity> {
        entities
            .iter()
            .filter(|e| Self::is_selectable(e))
            .cloned()
            .collect()
    }

    pub fn selectable_ids(entities: &[StorageEntity]) -> HashSet<String> {
        entities
            .iter()
            .filter(|e| Self::is_selectable(e))
            .map(|e| e.entity_id.clone())
            .collect()
    }

    pub fn disabled_ids(&mut self, entities: &Arc<[StorageEntity]>) -> Arc<HashSet<String>> {
        if let Some((inventory, ids)) = &self.disabled {
            if Arc::ptr_eq(inventory, entities) {
                return Arc::clone(ids);
            }
        }

        let ids: Arc<HashSet<String>> = Arc::new(
            entities
                .iter()
                .filter(|e| Self::is_disabled_with_data(e))
                .map(|e| e.entity_id.clone())
                .collect(),
        );
        self.disabled = Some((Arc::clone(entities), Arc::clone(&ids)));
        ids
    }

    pub fn clear_cache(&mut self) {
        self.disabled = None;
    }

    /// Splits a selection into deleted and disabled rows, in inventory order.
    /// Ids that no longer exist in `all` are dropped.
    pub fn selection_breakdown(selected: &HashSet<String>, all: &[StorageEntity]) -> SelectionBreakdown {
        let mut breakdown = SelectionBreakdown::default();
        for entity in all.iter().filter(|e| selected.contains(&e.entity_id)) {
            match Self::selection_type(entity) {
                SelectionType::Deleted => breakdown.deleted.push(entity.clone()),
                SelectionType::Disabled => breakdown.disabled.push(entity.clone()),
                SelectionType::NotSelectable => {}
            }
        }
        breakdown
    }

    pub fn format_disabled_duration(entity: &StorageEntity, now: DateTime<Utc>) -> String {
        let Some(last_update) = entity.last_stats_update.as_deref().and_then(parse_timestamp) else {
            return "unknown duration".to_string();
        };

        let days = (now - last_update).num_days();
        if days < 1 {
            return "stats updated today".to_string();
        }
        if days < 30 {
            return format!("stats {} day{} old", days, plural(days));
        }
        if days < 365 {
            let months = days / 30;
            return format!("stats {} month{} old", months, plural(months));
        }

        let years = days / 365;
        let months = (days % 365) / 30;
        if months == 0 {
            format!("stats {} year{} old", years, plural(years))
        } else {
            format!(
                "stats {} year{}, {} month{} old",
                years,
                plural(years),
                months,
                plural(months)
            )
        }
    }
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
