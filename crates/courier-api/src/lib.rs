//! Courier API Library
//!
//! Webhook receiver, ingestion pipeline and application setup.

pub mod constants;
pub mod error;
pub mod handlers;
pub mod services;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use services::{IngestOutcome, IngestionPipeline};
pub use state::AppState;
