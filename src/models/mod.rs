pub mod matching;
pub mod table;

pub use matching::MatchResult;
pub use table::{Column, ColumnKind, Table, Value};
