use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! filter_value {
    ($name:ident { $($variant:ident => $key:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                #[serde(rename = $key)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $key,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($key => Ok($name::$variant),)+
                    other => Err(format!("unknown {} value: {}", stringify!($name), other)),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

filter_value!(BasicFilter {
    InRegistry => "in_registry",
    InState => "in_state",
    Deleted => "deleted",
    NumericSensorsNoStats => "numeric_sensors_no_stats",
});

filter_value!(RegistryFilter {
    Enabled => "Enabled",
    Disabled => "Disabled",
});

filter_value!(StateFilter {
    Available => "Available",
    Unavailable => "Unavailable",
});

filter_value!(AdvancedFilter {
    OnlyStates => "only_states",
    OnlyStats => "only_stats",
});

filter_value!(StatesFilter {
    InStates => "in_states",
    NotInStates => "not_in_states",
});

filter_value!(StatisticsFilter {
    InStatistics => "in_statistics",
    NotInStatistics => "not_in_statistics",
});

filter_value!(SortColumn {
    EntityId => "entity_id",
    Registry => "registry",
    State => "state",
    StatesCount => "states_count",
    StatsShortCount => "stats_short_count",
    StatsLongCount => "stats_long_count",
    UpdateInterval => "update_interval",
    LastStateUpdate => "last_state_update",
    LastStatsUpdate => "last_stats_update",
    InEntityRegistry => "in_entity_registry",
    InStateMachine => "in_state_machine",
    InStatesMeta => "in_states_meta",
    InStates => "in_states",
    InStatisticsMeta => "in_statistics_meta",
    InStatisticsShortTerm => "in_statistics_short_term",
    InStatisticsLongTerm => "in_statistics_long_term",
});

filter_value!(SortDirection {
    Asc => "asc",
    Desc => "desc",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortState {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(column: SortColumn, direction: SortDirection) -> Self {
        Self { column, direction }
    }
}

impl FromStr for SortState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (column, direction) = match s.split_once(':') {
            Some((column, direction)) => (column, direction.parse()?),
            None => (s, SortDirection::Asc),
        };
        Ok(Self {
            column: column.parse()?,
            direction,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct FilterCriteria {
    pub search_query: String,
    pub basic_filter: Option<BasicFilter>,
    pub registry_filter: Option<RegistryFilter>,
    pub state_filter: Option<StateFilter>,
    pub advanced_filter: Option<AdvancedFilter>,
    pub states_filter: Option<StatesFilter>,
    pub statistics_filter: Option<StatisticsFilter>,
}

fn toggle<T: PartialEq>(slot: &mut Option<T>, value: T) {
    if slot.as_ref() == Some(&value) {
        *slot = None;
    } else {
        *slot = Some(value);
    }
}

impl FilterCriteria {
    pub fn toggle_basic(&mut self, value: BasicFilter) {
        toggle(&mut self.basic_filter, value);
    }

    pub fn toggle_registry(&mut self, value: RegistryFilter) {
        toggle(&mut self.registry_filter, value);
    }

    pub fn toggle_state(&mut self, value: StateFilter) {
        toggle(&mut self.state_filter, value);
    }

    pub fn toggle_advanced(&mut self, value: AdvancedFilter) {
        toggle(&mut self.advanced_filter, value);
    }

    pub fn toggle_states(&mut self, value: StatesFilter) {
        toggle(&mut self.states_filter, value);
    }

    pub fn toggle_statistics(&mut self, value: StatisticsFilter) {
        toggle(&mut self.statistics_filter, value);
    }

    pub fn has_active_filters(&self) -> bool {
        !self.search_query.is_empty()
            || self.basic_filter.is_some()
            || self.registry_filter.is_some()
            || self.state_filter.is_some()
            || self.advanced_filter.is_some()
            || self.states_filter.is_some()
            || self.statistics_filter.is_some()
    }
}
