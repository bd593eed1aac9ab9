pub mod entity;
pub mod filter;
pub mod panel;
pub mod scan;
pub mod settings;
pub mod snapshot;
pub mod sql;

pub use entity::*;
pub use filter::*;
pub use panel::*;
pub use scan::*;
pub use settings::*;
pub use snapshot::*;
pub use sql::*;
