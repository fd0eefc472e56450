//! Leaf parsers: statement text, mapper documents and Java sources.

pub mod java;
pub mod mapper_xml;
pub mod sql;

pub use mapper_xml::{parse_mapper_file, parse_mapper_str};
pub use sql::{extract_table_names, normalize_table_name};
