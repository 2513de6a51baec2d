pub mod ingest;

pub use ingest::{IngestPipeline, RunOptions, RunReport};
