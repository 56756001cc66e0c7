mod parser;

pub use parser::{parse_batch, SchemaError, REQUIRED_COLUMNS};
