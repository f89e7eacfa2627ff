//! File I/O, cleaning, and encoding for the attrition pipeline.

pub mod charts;
mod clean;
mod error;
mod reader;
mod table;
mod writer;

pub use clean::{DROPPED_COLUMNS, TARGET_COLUMN, clean};
pub use error::DataError;
pub use reader::TableReader;
pub use table::{CleanTable, RawTable, RunName};
pub use writer::ResultWriter;
