use clap::{Parser, Subcommand};

use statistics_orphan_finder::models::{
    AdvancedFilter, BasicFilter, RegistryFilter, SortState, StateFilter, StatesFilter,
    StatisticsFilter,
};

#[derive(Debug, Parser)]
#[command(name = "orphan-finder")]
#[command(about = "Find recorder data left behind by deleted or disabled entities", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the storage scan and cache the result
    Scan {
        /// Discard any resume point and begin at step 1
        #[arg(long)]
        start_over: bool,
        /// How many times to resume after a failed step
        #[arg(long, default_value_t = 2)]
        retries: u32,
    },
    /// List cached entities with filters and sorting
    Show {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        basic: Option<BasicFilter>,
        #[arg(long)]
        registry: Option<RegistryFilter>,
        #[arg(long)]
        state: Option<StateFilter>,
        #[arg(long)]
        advanced: Option<AdvancedFilter>,
        #[arg(long)]
        states: Option<StatesFilter>,
        #[arg(long)]
        statistics: Option<StatisticsFilter>,
        /// Sort column, optionally `column:desc`. Repeat for secondary keys.
        #[arg(long)]
        sort: Vec<SortState>,
        /// Only list rows eligible for deletion
        #[arg(long)]
        selectable: bool,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Generate delete statements for the given entities
    Sql {
        #[arg(required = true)]
        entity_ids: Vec<String>,
    },
    /// Show the hourly message histogram for one entity
    Histogram {
        entity_id: String,
        #[arg(long)]
        hours: Option<u32>,
    },
    /// Print the age of the cached snapshot
    CacheInfo,
    /// Remove the cached snapshot
    ClearCache,
    /// Write a settings file with default values
    InitConfig {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
}
