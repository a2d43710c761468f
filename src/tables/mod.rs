pub mod loader;
pub mod merge;

pub use loader::{load_table, SourceTable};
pub use merge::{join, merge_tables, JoinType};
