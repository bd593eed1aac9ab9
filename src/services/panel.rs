use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::error::{PanelError, PanelResult};
use crate::models::{
    AdvancedFilter, BasicFilter, BulkSqlResult, BulkStatus, CacheMetadata, CacheSettings,
    CachedSnapshot, DataSource, DatabaseSize, FilterCriteria, LoadOutcome, MessageHistogram,
    PanelEvent, RegistryFilter, ResumeState, ScanState, SelectionBreakdown, SortState,
    StateFilter, StatesFilter, StatisticsFilter, StorageEntity, StorageSummary,
};
use crate::services::api_client::AcquisitionClient;
use crate::services::bulk_sql::generate_bulk_sql;
use crate::services::entity_filter::EntityFilterEngine;
use crate::services::entity_selection::EntitySelection;
use crate::services::scan_controller::ScanController;
use crate::services::snapshot_cache::SnapshotCache;

/// Monotonic request token. A load captures one at start and only applies
/// its result if no newer token was issued meanwhile.
#[derive(Clone, Default, Debug)]
pub struct LoadGeneration(Arc<AtomicU64>);

impl LoadGeneration {
    pub fn begin(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, token: u64) -> bool {
        self.0.load(Ordering::SeqCst) == token
    }

    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Debug)]
pub struct PanelHandle {
    loads: LoadGeneration,
    histograms: LoadGeneration,
}

impl PanelHandle {
    pub fn detach(&self) {
        self.loads.bump();
        self.histograms.bump();
    }
}

pub struct PanelState {
    client: Arc<dyn AcquisitionClient>,
    scan: ScanController,
    cache: Option<SnapshotCache>,
    cache_settings: CacheSettings,
    filter_engine: EntityFilterEngine,
    selection: EntitySelection,
    filters: FilterCriteria,
    sort_stack: Vec<SortState>,
    entities: Arc<[StorageEntity]>,
    summary: Option<StorageSummary>,
    database_size: Option<DatabaseSize>,
    data_timestamp: Option<i64>,
    source: Option<DataSource>,
    selected: HashSet<String>,
    loads: LoadGeneration,
    histograms: LoadGeneration,
    events: Option<UnboundedSender<PanelEvent>>,
}

impl PanelState {
    pub fn new(
        client: Arc<dyn AcquisitionClient>,
        cache: Option<SnapshotCache>,
        cache_settings: CacheSettings,
    ) -> Self {
        let cache = cache.filter(|_| cache_settings.enabled);
        Self {
            scan: ScanController::new(Arc::clone(&client)),
            client,
            cache,
            cache_settings,
            filter_engine: EntityFilterEngine::new(),
            selection: EntitySelection::new(),
            filters: FilterCriteria::default(),
            sort_stack: Vec::new(),
            entities: Arc::from(Vec::new()),
            summary: None,
            database_size: None,
            data_timestamp: None,
            source: None,
            selected: HashSet::new(),
            loads: LoadGeneration::default(),
            histograms: LoadGeneration::default(),
            events: None,
        }
    }

    pub fn attach(&mut self, sender: UnboundedSender<PanelEvent>) {
        self.events = Some(sender);
    }

    pub fn handle(&self) -> PanelHandle {
        PanelHandle {
            loads: self.loads.clone(),
            histograms: self.histograms.clone(),
        }
    }

    pub fn detach(&mut self) {
        self.handle().detach();
        self.events = None;
    }

    fn emit(&self, event: PanelEvent) {
        if let Some(sender) = &self.events {
            if sender.send(event).is_err() {
                log::debug!("[Panel] Event receiver dropped");
            }
        }
    }

    pub fn entities(&self) -> &Arc<[StorageEntity]> {
        &self.entities
    }

    pub fn summary(&self) -> Option<&StorageSummary> {
        self.summary.as_ref()
    }

    pub fn database_size(&self) -> Option<&DatabaseSize> {
        self.database_size.as_ref()
    }

    pub fn source(&self) -> Option<DataSource> {
        self.source
    }

    pub fn filters(&self) -> &FilterCriteria {
        &self.filters
    }

    pub fn sort_stack(&self) -> &[SortState] {
        &self.sort_stack
    }

    pub fn selected_ids(&self) -> &HashSet<String> {
        &self.selected
    }

    pub fn scan_state(&self) -> &ScanState {
        self.scan.state()
    }

    pub fn resume_state(&self) -> Option<&ResumeState> {
        self.scan.resume_state()
    }

    pub fn data_age(&self) -> Option<i64> {
        self.data_timestamp
            .map(|ts| chrono::Utc::now().timestamp_millis() - ts)
    }

    pub fn is_just_refreshed(&self, threshold_ms: i64) -> bool {
        self.data_age().is_some_and(|age| age < threshold_ms)
    }

    pub fn is_stale(&self) -> bool {
        self.data_age()
            .map_or(true, |age| age > self.cache_settings.stale_after_ms)
    }

    pub fn mount(&mut self) -> bool {
        let snapshot = self.cache.as_ref().and_then(SnapshotCache::load);
        let found = snapshot.is_some();
        let age = SnapshotCache::age(snapshot.as_ref());
        let is_stale = SnapshotCache::is_stale(self.cache_settings.stale_after_ms, snapshot.as_ref());

        if let Some(snapshot) = snapshot {
            self.apply_snapshot(snapshot);
        }
        self.emit(PanelEvent::CacheState {
            age,
            is_stale,
            source: found.then_some(DataSource::Cache),
        });
        if found {
            let rows = self.visible_rows();
            self.emit(PanelEvent::Rows(rows));
        }
        found
    }

    fn apply_snapshot(&mut self, snapshot: CachedSnapshot) {
        log::info!(
            "[Panel] Showing cached inventory of {} entities ({})",
            snapshot.data.storage_entities.len(),
            SnapshotCache::format_age(SnapshotCache::age(Some(&snapshot)))
        );
        self.entities = snapshot.data.storage_entities.into();
        self.summary = snapshot.data.storage_summary;
        self.database_size = snapshot.data.database_size;
        self.data_timestamp = Some(snapshot.timestamp);
        self.source = Some(DataSource::Cache);
        self.prune_selection();
    }

    pub async fn refresh(&mut self, start_over: bool) -> PanelResult<LoadOutcome> {
        if start_over {
            self.scan.reset();
        }

        let token = self.loads.begin();
        let events = self.events.clone();
        let loads = self.loads.clone();
        let result = self
            .scan
            .start(|progress| {
                if !loads.is_current(token) {
                    return;
                }
                if let Some(sender) = &events {
                    let _ = sender.send(PanelEvent::Progress(progress.clone()));
                }
            })
            .await;

        self.scan.acknowledge();
        if !self.loads.is_current(token) {
            log::info!("[Panel] Discarding superseded scan result");
            return Ok(LoadOutcome::Discarded);
        }

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                self.emit(PanelEvent::Error {
                    message: err.to_string(),
                    retryable: err.is_retryable(),
                });
                return Err(err);
            }
        };

        if let Some(cache) = &self.cache {
            cache.save(
                Some(&outcome.database_size),
                &outcome.entities,
                Some(&outcome.summary),
            );
        }

        self.entities = outcome.entities.into();
        self.summary = Some(outcome.summary.clone());
        self.database_size = Some(outcome.database_size);
        self.data_timestamp = Some(chrono::Utc::now().timestamp_millis());
        self.source = Some(DataSource::Live);
        self.prune_selection();

        self.emit(PanelEvent::Completed {
            entities: Arc::clone(&self.entities),
            summary: outcome.summary,
        });
        self.emit(PanelEvent::CacheState {
            age: Some(0),
            is_stale: false,
            source: Some(DataSource::Live),
        });
        let rows = self.visible_rows();
        self.emit(PanelEvent::Rows(rows));
        Ok(LoadOutcome::Applied)
    }

    /// Called when the panel finds itself without data, e.g. after the host
    /// recreated it. Tries the cache before reporting that nothing is loaded.
    pub fn ensure_inventory(&mut self) -> PanelResult<()> {
        if !self.entities.is_empty() || self.scan.is_running() {
            return Ok(());
        }

        match self.cache.as_ref().and_then(SnapshotCache::load) {
            Some(snapshot) => {
                log::info!("[Panel] Recovered inventory from cache");
                self.apply_snapshot(snapshot);
                let rows = self.visible_rows();
                self.emit(PanelEvent::Rows(rows));
                Ok(())
            }
            None => {
                let err = PanelError::NoData;
                self.emit(PanelEvent::Error {
                    message: err.to_string(),
                    retryable: true,
                });
                Err(err)
            }
        }
    }

    pub fn visible_rows(&mut self) -> Arc<[StorageEntity]> {
        self.filter_engine
            .filter_and_sort(&self.entities, &self.filters, &self.sort_stack)
    }

    fn publish_rows(&mut self) -> Arc<[StorageEntity]> {
        let rows = self.visible_rows();
        self.emit(PanelEvent::Rows(Arc::clone(&rows)));
        rows
    }

    pub fn set_filter(&mut self, filters: FilterCriteria) -> Arc<[StorageEntity]> {
        self.filters = filters;
        self.publish_rows()
    }

    pub fn set_search(&mut self, query: &str) -> Arc<[StorageEntity]> {
        self.filters.search_query = query.to_string();
        self.publish_rows()
    }

    pub fn set_sort(&mut self, sort_stack: Vec<SortState>) -> Arc<[StorageEntity]> {
        self.sort_stack = sort_stack;
        self.publish_rows()
    }

    pub fn toggle_basic(&mut self, value: BasicFilter) -> Arc<[StorageEntity]> {
        self.filters.toggle_basic(value);
        self.publish_rows()
    }

    pub fn toggle_registry(&mut self, value: RegistryFilter) -> Arc<[StorageEntity]> {
        self.filters.toggle_registry(value);
        self.publish_rows()
    }

    pub fn toggle_state(&mut self, value: StateFilter) -> Arc<[StorageEntity]> {
        self.filters.toggle_state(value);
        self.publish_rows()
    }

    pub fn toggle_advanced(&mut self, value: AdvancedFilter) -> Arc<[StorageEntity]> {
        self.filters.toggle_advanced(value);
        self.publish_rows()
    }

    pub fn toggle_states(&mut self, value: StatesFilter) -> Arc<[StorageEntity]> {
        self.filters.toggle_states(value);
        self.publish_rows()
    }

    pub fn toggle_statistics(&mut self, value: StatisticsFilter) -> Arc<[StorageEntity]> {
        self.filters.toggle_statistics(value);
        self.publish_rows()
    }

    pub fn disabled_ids(&mut self) -> Arc<HashSet<String>> {
        self.selection.disabled_ids(&self.entities)
    }

    pub fn selection_breakdown(&self) -> SelectionBreakdown {
        EntitySelection::selection_breakdown(&self.selected, &self.entities)
    }

    fn publish_selection(&self) -> SelectionBreakdown {
        let breakdown = self.selection_breakdown();
        self.emit(PanelEvent::Selection(breakdown.clone()));
        breakdown
    }

    // A new inventory may no longer contain (or no longer allow) earlier picks.
    fn prune_selection(&mut self) {
        let keep = EntitySelection::selectable_ids(&self.entities);
        self.selected.retain(|id| keep.contains(id));
    }

    pub fn select(&mut self, entity_id: &str) -> bool {
        let selectable = self
            .entities
            .iter()
            .any(|e| e.entity_id == entity_id && EntitySelection::is_selectable(e));
        if selectable {
            self.selected.insert(entity_id.to_string());
            self.publish_selection();
        }
        selectable
    }

    pub fn deselect(&mut self, entity_id: &str) -> SelectionBreakdown {
        self.selected.remove(entity_id);
        self.publish_selection()
    }

    pub fn select_all_visible(&mut self) -> SelectionBreakdown {
        let rows = self.visible_rows();
        self.selected.extend(
            rows.iter()
                .filter(|e| EntitySelection::is_selectable(e))
                .map(|e| e.entity_id.clone()),
        );
        self.publish_selection()
    }

    pub fn clear_selection(&mut self) -> SelectionBreakdown {
        self.selected.clear();
        self.publish_selection()
    }

    /// Generate delete statements for the current selection. The selection is
    /// cleared unless every row failed.
    pub async fn generate_bulk_sql(&mut self) -> PanelResult<BulkSqlResult> {
        if self.selected.is_empty() {
            return Err(PanelError::InvalidRequest("no entities selected".to_string()));
        }

        let rows: Vec<StorageEntity> = self
            .entities
            .iter()
            .filter(|e| self.selected.contains(&e.entity_id) && EntitySelection::is_selectable(e))
            .cloned()
            .collect();

        let events = self.events.clone();
        let result = generate_bulk_sql(self.client.as_ref(), &rows, |progress| {
            if let Some(sender) = &events {
                let _ = sender.send(PanelEvent::BulkProgress(progress));
            }
        })
        .await;

        if result.status != BulkStatus::Error {
            self.clear_selection();
        }
        Ok(result)
    }

    /// Fetch an hourly message histogram. Returns `Ok(None)` when a newer
    /// histogram request was started before this one finished.
    pub async fn load_histogram(
        &self,
        entity_id: &str,
        hours: u32,
    ) -> PanelResult<Option<MessageHistogram>> {
        let token = self.histograms.begin();
        let result = self.client.fetch_message_histogram(entity_id, hours).await;

        if !self.histograms.is_current(token) {
            log::debug!("[Panel] Dropping superseded histogram for {}", entity_id);
            return Ok(None);
        }
        Ok(Some(result?))
    }

    pub fn cache_metadata(&self) -> Option<CacheMetadata> {
        self.cache.as_ref().and_then(SnapshotCache::metadata)
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }
}
