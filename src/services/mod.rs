pub mod api_client;
pub mod bulk_sql;
pub mod entity_filter;
pub mod entity_selection;
pub mod panel;
pub mod scan_controller;
pub mod snapshot_cache;
