pub mod ingestion;

pub use ingestion::IngestionHandler;
