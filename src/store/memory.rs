//! In-memory document store
//!
//! Documents live in a map behind one mutex; every trait call takes and
//! releases the lock without awaiting, which serializes writes across the
//! whole store and therefore per document.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::errors::Result;
use crate::store::DocumentStore;
use crate::types::{AgentStage, Document, DocumentStatus, Requirement, StageStatus};

/// Map-backed store for CLI runs and tests
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<String, Document>>,
}

impl MemoryDocumentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
        }
    }

    /// Register a freshly uploaded document with its initial stage set
    pub fn create_document(&self, file_name: &str) -> Document {
        let document = Document {
            id: Uuid::new_v4().to_string(),
            file_name: file_name.to_string(),
            uploaded_at: Utc::now(),
            status: DocumentStatus::Uploaded,
            stages: AgentStage::initial_set(),
            requirements: None,
            completed_at: None,
        };

        self.documents
            .lock()
            .unwrap()
            .insert(document.id.clone(), document.clone());
        document
    }

    /// Remove a document; returns whether it existed
    pub fn delete_document(&self, id: &str) -> bool {
        self.documents.lock().unwrap().remove(id).is_some()
    }

    /// All documents, most recently uploaded first
    pub fn all_documents(&self) -> Vec<Document> {
        let mut documents: Vec<Document> =
            self.documents.lock().unwrap().values().cloned().collect();
        documents.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        documents
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.documents.lock().unwrap().get(id).cloned())
    }

    async fn update_document_status(
        &self,
        id: &str,
        status: DocumentStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        if let Some(document) = self.documents.lock().unwrap().get_mut(id) {
            document.status = status;
            document.completed_at = completed_at;
        }
        Ok(())
    }

    async fn update_stage(
        &self,
        id: &str,
        stage_id: u8,
        status: StageStatus,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        if let Some(document) = self.documents.lock().unwrap().get_mut(id) {
            if let Some(stage) = document.stages.iter_mut().find(|s| s.id == stage_id) {
                stage.status = status;
                if started_at.is_some() {
                    stage.started_at = started_at;
                }
                if completed_at.is_some() {
                    stage.completed_at = completed_at;
                }
            }
        }
        Ok(())
    }

    async fn save_requirements(&self, id: &str, requirements: &[Requirement]) -> Result<()> {
        if let Some(document) = self.documents.lock().unwrap().get_mut(id) {
            document.requirements = Some(requirements.to_vec());
        }
        Ok(())
    }
}
