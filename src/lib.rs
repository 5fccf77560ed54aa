//! # Rusty Sheet Merger
//!
//! Merges several Excel workbooks that share a column layout into one table, removes
//! exact duplicate rows and offers the result back as a single `merged_data.xlsx`.
//!
//! ## Stages
//!
//! - **Ingestion**: each `.xls` / `.xlsx` upload is parsed on its own (first sheet, first
//!   row as header); a broken file is reported without stopping the others
//! - **Merge**: rows are concatenated in upload order with columns aligned by name, then
//!   only the first of each group of identical rows is kept
//! - **Export**: the merged table is written as a one-sheet workbook named `Merged_Data`,
//!   together with a preview that has no row-number column
//!
//! [`pipeline::Pipeline`] runs the stages; [`server`] and [`cli`] present the result.

pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub(crate) mod helpers;
pub mod pipeline;
pub mod preview;
pub mod server;
pub mod spreadsheet;

pub use error::MergerError;
pub use pipeline::MergeReport;
pub use pipeline::Pipeline;
pub use pipeline::UploadedFile;
