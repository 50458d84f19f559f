mod reader;
mod writer;

pub use reader::{parse_dataset, parse_line, read_dataset};
pub use writer::{write_results, write_top_k};
