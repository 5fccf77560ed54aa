//! In-memory tables and the row-wise merge over them.

pub mod merge;
pub mod table;
