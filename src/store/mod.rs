//! Document store
//!
//! The pipeline's single source of truth for document, stage, and requirement
//! state. The trait is the consumed surface; `MemoryDocumentStore` is the
//! in-process implementation used by the CLI and tests.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::Result;
use crate::types::{Document, DocumentStatus, Requirement, StageStatus};

pub use memory::MemoryDocumentStore;

/// Persistence operations consumed by the pipeline.
///
/// Implementations must serialize writes per document. Updates addressing a
/// document that no longer exists are silent no-ops so that a background run
/// racing a deletion cannot fail on its own status writes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document with its stages and any persisted requirements
    async fn get_document(&self, id: &str) -> Result<Option<Document>>;

    /// Update document-level status, optionally stamping completion time
    async fn update_document_status(
        &self,
        id: &str,
        status: DocumentStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Update one stage's status and timestamps
    async fn update_stage(
        &self,
        id: &str,
        stage_id: u8,
        status: StageStatus,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Persist requirements together with their nested test cases
    async fn save_requirements(&self, id: &str, requirements: &[Requirement]) -> Result<()>;
}
