use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{
    AdvancedFilter, BasicFilter, FilterCriteria, SortColumn, SortDirection, SortState,
    StatesFilter, StatisticsFilter, StorageEntity,
};
use crate::utils::format::timestamp_millis;

const MISSING_INTERVAL: f64 = 999_999.0;

#[derive(Default)]
pub struct EntityFilterEngine {
    cache: HashMap<String, Arc<[StorageEntity]>>,
    inventory: Option<Arc<[StorageEntity]>>,
}

impl EntityFilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter_key(filters: &FilterCriteria, sort_stack: &[SortState]) -> String {
        fn part<T: std::fmt::Display>(value: &Option<T>) -> String {
            value
                .as_ref()
                .map_or_else(|| "null".to_string(), ToString::to_string)
        }

        let sort = sort_stack
            .iter()
            .map(|s| format!("{}:{}", s.column, s.direction))
            .collect::<Vec<_>>()
            .join(",");

        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}",
            filters.search_query,
            part(&filters.basic_filter),
            part(&filters.registry_filter),
            part(&filters.state_filter),
            part(&filters.advanced_filter),
            part(&filters.states_filter),
            part(&filters.statistics_filter),
            sort
        )
    }

    pub fn filter_and_sort(
        &mut self,
        entities: &Arc<[StorageEntity]>,
        filters: &FilterCriteria,
        sort_stack: &[SortState],
    ) -> Arc<[StorageEntity]> {
        let same_inventory = self
            .inventory
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, entities));
        if !same_inventory {
            if !self.cache.is_empty() {
                log::debug!(
                    "[EntityFilter] Inventory changed, dropping {} cached results",
                    self.cache.len()
                );
            }
            self.cache.clear();
            self.inventory = Some(Arc::clone(entities));
        }

        let key = Self::filter_key(filters, sort_stack);
        if let Some(hit) = self.cache.get(&key) {
            return Arc::clone(hit);
        }

        let mut rows: Vec<StorageEntity> = entities
            .iter()
            .filter(|e| matches_filters(e, filters))
            .cloned()
            .collect();
        sort_entities(&mut rows, sort_stack);

        let result: Arc<[StorageEntity]> = rows.into();
        self.cache.insert(key, Arc::clone(&result));
        result
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.inventory = None;
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

fn matches_filters(e: &StorageEntity, filters: &FilterCriteria) -> bool {
    if !filters.search_query.is_empty()
        && !e
            .entity_id
            .to_lowercase()
            .contains(&filters.search_query.to_lowercase())
    {
        return false;
    }

    let basic = match filters.basic_filter {
        None => true,
        Some(BasicFilter::InRegistry) => e.in_entity_registry,
        Some(BasicFilter::InState) => e.in_state_machine,
        Some(BasicFilter::Deleted) => e.is_deleted(),
        Some(BasicFilter::NumericSensorsNoStats) => {
            e.entity_id.starts_with("sensor.")
                && e.in_states_meta
                && !e.in_statistics_meta
                && e
                    .statistics_eligibility_reason
                    .as_deref()
                    .is_some_and(|reason| !reason.is_empty() && !reason.contains("is not numeric"))
        }
    };
    if !basic {
        return false;
    }

    if let Some(registry) = filters.registry_filter {
        if e.registry_status.as_str() != registry.as_str() {
            return false;
        }
    }
    if let Some(state) = filters.state_filter {
        if e.state_status.as_str() != state.as_str() {
            return false;
        }
    }

    let advanced = match filters.advanced_filter {
        None => true,
        Some(AdvancedFilter::OnlyStates) => e.in_states && !e.in_statistics_meta,
        Some(AdvancedFilter::OnlyStats) => e.in_statistics_meta && !e.in_states,
    };
    let states = match filters.states_filter {
        None => true,
        Some(StatesFilter::InStates) => e.in_states,
        Some(StatesFilter::NotInStates) => !e.in_states,
    };
    let statistics = match filters.statistics_filter {
        None => true,
        Some(StatisticsFilter::InStatistics) => e.in_statistics_meta,
        Some(StatisticsFilter::NotInStatistics) => !e.in_statistics_meta,
    };

    advanced && states && statistics
}

/// Stable multi-column sort; earlier entries in `sort_stack` take priority.
pub fn sort_entities(rows: &mut [StorageEntity], sort_stack: &[SortState]) {
    if sort_stack.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        for sort in sort_stack {
            let ord = compare_column(a, b, sort.column);
            let ord = match sort.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn compare_column(a: &StorageEntity, b: &StorageEntity, column: SortColumn) -> Ordering {
    match column {
        SortColumn::EntityId => a.entity_id.cmp(&b.entity_id),
        SortColumn::Registry => a.registry_status.as_str().cmp(b.registry_status.as_str()),
        SortColumn::State => a.state_status.as_str().cmp(b.state_status.as_str()),
        SortColumn::StatesCount => a.states_count.cmp(&b.states_count),
        SortColumn::StatsShortCount => a.stats_short_count.cmp(&b.stats_short_count),
        SortColumn::StatsLongCount => a.stats_long_count.cmp(&b.stats_long_count),
        SortColumn::UpdateInterval => {
            let a = a.update_interval_seconds.unwrap_or(MISSING_INTERVAL);
            let b = b.update_interval_seconds.unwrap_or(MISSING_INTERVAL);
            a.total_cmp(&b)
        }
        SortColumn::LastStateUpdate => timestamp_millis(a.last_state_update.as_deref())
            .cmp(&timestamp_millis(b.last_state_update.as_deref())),
        SortColumn::LastStatsUpdate => timestamp_millis(a.last_stats_update.as_deref())
            .cmp(&timestamp_millis(b.last_stats_update.as_deref())),
        SortColumn::InEntityRegistry => a.in_entity_registry.cmp(&b.in_entity_registry),
        SortColumn::InStateMachine => a.in_state_machine.cmp(&b.in_state_machine),
        SortColumn::InStatesMeta => a.in_states_meta.cmp(&b.in_states_meta),
        SortColumn::InStates => a.in_states.cmp(&b.in_states),
        SortColumn::InStatisticsMeta => a.in_statistics_meta.cmp(&b.in_statistics_meta),
        SortColumn::InStatisticsShortTerm => {
            a.in_statistics_short_term.cmp(&b.in_statistics_short_term)
        }
        SortColumn::InStatisticsLongTerm => {
            a.in_statistics_long_term.cmp(&b.in_statistics_long_term)
        }
    }
}
