//! Ingestion services.

pub mod fetcher;
pub mod pipeline;

pub use fetcher::{AttachmentSource, FetchError, FetchedContent, LineContentClient};
pub use pipeline::{IngestError, IngestOutcome, IngestStage, IngestionPipeline, PipelineTimeouts};
