//! User metadata: which company a subject belongs to, who supervises them, and their department.

pub mod router;
pub mod service;


pub use router::directory_router;
pub use service::{DirectoryService, MetadataChanges, NewUserMetadata};
