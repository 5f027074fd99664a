pub mod boundary;
pub mod client;
pub mod error;
pub mod render;
pub mod website;

pub use boundary::{ExtractionBoundary, HttpBoundary};
pub use client::{BulkFailure, BulkOutcome, ExtractionClient};
pub use error::ClientError;
pub use render::render_table;
pub use website::normalize_website;
