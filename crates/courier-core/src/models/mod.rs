//! Domain models shared across crates.

pub mod file_record;
pub mod message;
pub mod storage;

pub use file_record::{FileRecord, NewFileRecord};
pub use message::{IncomingEvent, MediaMessage, MessageKind, RawMessage, SkipReason};
pub use storage::StoredObject;
