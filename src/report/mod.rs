pub mod checkpoint;
pub mod sink;
pub mod tables;

pub use checkpoint::DoneList;
pub use sink::{CsvSink, format_value};
