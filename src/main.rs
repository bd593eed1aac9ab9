mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use statistics_orphan_finder::commands::storage;
use statistics_orphan_finder::database::{KeyValueStore, MemoryKvStore, SqliteKvStore};
use statistics_orphan_finder::models::{
    CacheSettings, DataSource, FilterCriteria, PanelEvent, Settings, StorageEntity, TOTAL_STEPS,
};
use statistics_orphan_finder::services::api_client::HttpAcquisitionClient;
use statistics_orphan_finder::services::entity_selection::EntitySelection;
use statistics_orphan_finder::services::snapshot_cache::SnapshotCache;
use statistics_orphan_finder::utils::config;
use statistics_orphan_finder::utils::format::{
    format_bytes, format_date, format_duration, format_interval, format_number,
};
use statistics_orphan_finder::PanelState;

use cli::{Cli, Commands};

fn main() {
    config::load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(cli)) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn open_store(data_dir: &Path, settings: &CacheSettings) -> Arc<dyn KeyValueStore> {
    let db_path = data_dir.join(&settings.database_file);
    match SqliteKvStore::open(&db_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            log::warn!(
                "Could not open cache database {}: {}. Cache will not persist.",
                db_path.display(),
                e
            );
            Arc::new(MemoryKvStore::new())
        }
    }
}

async fn print_events(mut rx: UnboundedReceiver<PanelEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            PanelEvent::Progress(progress) => log::info!(
                "[{}/{}] {}",
                (progress.step_index + 1).min(TOTAL_STEPS),
                progress.total_steps,
                progress.label
            ),
            PanelEvent::CacheState { age, is_stale, source } => log::debug!(
                "Data source {:?}, age {}{}",
                source,
                SnapshotCache::format_age(age),
                if is_stale { " (outdated)" } else { "" }
            ),
            PanelEvent::BulkProgress(progress) => {
                log::info!("Generating SQL {}/{}", progress.done, progress.total)
            }
            PanelEvent::Error { message, retryable } => {
                if retryable {
                    log::warn!("{}", message);
                } else {
                    log::error!("{}", message);
                }
            }
            PanelEvent::Completed { .. } | PanelEvent::Rows(_) | PanelEvent::Selection(_) => {}
        }
    }
}

fn print_row(entity: &StorageEntity) {
    println!(
        "{:<60} {:<16} {:<12} {:>10} {:>10} {:>10} {:>9} {}",
        entity.entity_id,
        entity.registry_status.as_str(),
        entity.state_status.as_str(),
        format_number(entity.states_count),
        format_number(entity.stats_short_count),
        format_number(entity.stats_long_count),
        format_interval(entity.update_interval_seconds),
        format_date(entity.last_state_update.as_deref()),
    );
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let data_dir = config::data_dir();
    if let Commands::InitConfig { force } = cli.command {
        return init_config(&data_dir, force);
    }
    let settings = config::load_settings(&data_dir)?;

    let client = HttpAcquisitionClient::new(&settings.connection)?;
    let store = open_store(&data_dir, &settings.cache);
    let cache = SnapshotCache::with_key(store, settings.cache.cache_key.clone());
    let mut panel = PanelState::new(Arc::new(client), Some(cache), settings.cache.clone());

    let (tx, rx) = mpsc::unbounded_channel();
    panel.attach(tx);
    let printer = tokio::spawn(print_events(rx));

    let result = dispatch(&mut panel, cli.command, &settings).await;

    panel.detach();
    let _ = printer.await;
    result
}

fn init_config(data_dir: &Path, force: bool) -> anyhow::Result<()> {
    let path = config::settings_path(data_dir);
    if path.exists() && !force {
        anyhow::bail!("{} already exists, pass --force to overwrite", path.display());
    }
    config::save_settings(data_dir, &Settings::default())?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn dispatch(
    panel: &mut PanelState,
    command: Commands,
    settings: &Settings,
) -> anyhow::Result<()> {
    match command {
        Commands::Scan { start_over, retries } => {
            let started = Instant::now();
            let mut attempt = 0;
            let overview = loop {
                let start_over = start_over && attempt == 0;
                match storage::refresh_storage_overview(panel, Some(start_over)).await {
                    Ok(overview) => break overview,
                    Err(message) if attempt < retries && panel.resume_state().is_some() => {
                        attempt += 1;
                        log::warn!("{} (retry {}/{})", message, attempt, retries);
                    }
                    Err(message) => anyhow::bail!(message),
                }
            };

            println!("Entities:              {}", format_number(overview.entities.len() as i64));
            if let Some(summary) = &overview.summary {
                println!("Deleted from registry: {}", format_number(summary.deleted_from_registry));
                println!("Disabled in registry:  {}", format_number(summary.registry_disabled));
                println!("Deleted storage:       {}", format_bytes(summary.deleted_storage_bytes));
                println!("Disabled storage:      {}", format_bytes(summary.disabled_storage_bytes));
            }
            if let Some(size) = &overview.database_size {
                println!("Database size:         {}", format_bytes(size.total_size()));
            }
            println!(
                "Scan took {}",
                format_duration(started.elapsed().as_secs() as i64)
            );
        }
        Commands::Show {
            search,
            basic,
            registry,
            state,
            advanced,
            states,
            statistics,
            sort,
            selectable,
            limit,
        } => {
            panel.mount();
            let filters = FilterCriteria {
                search_query: search.unwrap_or_default(),
                basic_filter: basic,
                registry_filter: registry,
                state_filter: state,
                advanced_filter: advanced,
                states_filter: states,
                statistics_filter: statistics,
            };
            let filtered = filters.has_active_filters();
            let rows = storage::get_filtered_entities(panel, Some(filters), Some(sort))
                .await
                .map_err(anyhow::Error::msg)?;

            let rows: Vec<&StorageEntity> = rows
                .iter()
                .filter(|e| !selectable || EntitySelection::is_selectable(e))
                .collect();
            let shown = limit.unwrap_or(rows.len()).min(rows.len());
            for entity in &rows[..shown] {
                print_row(entity);
            }
            if filtered {
                println!(
                    "{} of {} rows ({} entities before filtering)",
                    shown,
                    rows.len(),
                    panel.entities().len()
                );
            } else {
                println!("{} of {} rows", shown, rows.len());
            }
            if panel.is_just_refreshed(settings.cache.fresh_within_ms) {
                println!("Data refreshed just now");
            } else if panel.source() == Some(DataSource::Cache) {
                if let Some(meta) = panel.cache_metadata() {
                    let hint = if panel.is_stale() {
                        " (outdated), run `orphan-finder scan` to refresh"
                    } else {
                        ""
                    };
                    println!("Data cached {}{}", meta.age_formatted, hint);
                }
            }
        }
        Commands::Sql { entity_ids } => {
            panel.mount();
            let breakdown = storage::update_selection(panel, entity_ids, Vec::new())
                .await
                .map_err(anyhow::Error::msg)?;
            if breakdown.total() == 0 {
                anyhow::bail!("none of the given entities are eligible for deletion");
            }
            for entity in &breakdown.disabled {
                log::info!(
                    "{} is disabled, {}",
                    entity.entity_id,
                    EntitySelection::format_disabled_duration(entity, chrono::Utc::now())
                );
            }

            let result = storage::generate_bulk_delete_sql(panel)
                .await
                .map_err(anyhow::Error::msg)?;
            println!("{}", result.combined_sql());
            println!(
                "-- {} statements, {} failed, {} records, {} saved",
                result.success_count,
                result.error_count,
                format_number(result.total_count),
                format_bytes(result.total_storage_saved)
            );
        }
        Commands::Histogram { entity_id, hours } => {
            let hours = hours.unwrap_or(settings.scan.default_histogram_hours);
            let histogram = storage::get_message_histogram(panel, entity_id, Some(hours))
                .await
                .map_err(anyhow::Error::msg)?;
            if let Some(histogram) = histogram {
                let peak = histogram.hourly_counts.iter().copied().max().unwrap_or(0).max(1);
                for (hour, count) in histogram.hourly_counts.iter().enumerate() {
                    let bar = "#".repeat(((*count * 40) / peak) as usize);
                    println!("{:>4}h {:>8} {}", hour, format_number(*count), bar);
                }
                println!("Total: {}", format_number(histogram.total_messages));
            }
        }
        Commands::CacheInfo => match storage::get_cache_metadata(panel).await.map_err(anyhow::Error::msg)? {
            Some(meta) => println!("Cached snapshot written {}", meta.age_formatted),
            None => println!("No cached snapshot"),
        },
        Commands::ClearCache => {
            panel.clear_cache();
            println!("Cache cleared");
        }
        Commands::InitConfig { .. } => {}
    }
    Ok(())
}
