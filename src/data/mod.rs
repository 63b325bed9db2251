//! Input and output in line-based text formats

pub mod abc;

pub use abc::{parse_clusters, read_abc, read_abc_file, write_abc, write_indexed_edges};
