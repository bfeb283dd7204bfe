//! The conversion pipeline orchestrator: ties analysis, prompting, the
//! collaborator, instrumentation, validator synthesis, and publication
//! into the ten-step flow spec'd for `request_conversion`/`status`.
//!
//! Concurrency is modeled the way the Session Runtime models a room:
//! one `tokio::spawn`ed task per in-flight conversion, gated by a
//! `tokio::sync::Semaphore` permit so the worker pool has bounded
//! concurrency, with an in-memory set tracking which room ids already
//! have a conversion running so concurrent requests for the same id
//! are deduplicated rather than double-run.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use forge_analyzer::AnalysisReport;
use forge_llm::{RetryingCollaborator, TextCollaborator};
use forge_protocol::{ConversionStatus, RoomId};
use forge_room::RoomManager;
use forge_sandbox::Sandbox;
use forge_store::{ArtifactStore, StoreAdapter};
use tokio::sync::Semaphore;

use crate::error::ConversionError;
use crate::instrument::{inject_bridge, inject_markers, RoomConfigPayload};
use crate::prompt::build_prompt;
use crate::synth::synthesize_validator;

#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Maximum number of conversions running at once across the whole
    /// pipeline.
    pub max_concurrent: usize,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self { max_concurrent: 4 }
    }
}

/// The latest known state of a room's conversion, as returned by
/// `status`.
#[derive(Debug, Clone)]
pub struct ConversionStatusReport {
    pub status: ConversionStatus,
    pub document_ref: Option<String>,
    pub validator_ref: Option<String>,
    pub error: Option<String>,
}

pub struct ConversionPipeline<S, B, C> {
    store: Arc<S>,
    rooms: Arc<RoomManager<S, B>>,
    artifacts: Arc<dyn ArtifactStore>,
    collaborator: Arc<RetryingCollaborator<C>>,
    semaphore: Arc<Semaphore>,
    inflight: Mutex<HashSet<RoomId>>,
}

impl<S, B, C> ConversionPipeline<S, B, C>
where
    S: StoreAdapter + Send + Sync + 'static,
    B: Sandbox + Send + Sync + 'static,
    C: TextCollaborator,
{
    pub fn new(
        store: Arc<S>,
        rooms: Arc<RoomManager<S, B>>,
        artifacts: Arc<dyn ArtifactStore>,
        collaborator: Arc<RetryingCollaborator<C>>,
        config: ConversionConfig,
    ) -> Self {
        Self {
            store,
            rooms,
            artifacts,
            collaborator,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            inflight: Mutex::new(HashSet::new()),
        }
    }

    /// Requests conversion for a room that already exists in `pending`
    /// status (created via [`RoomManager::create_room`]). Idempotent:
    /// a room already in a terminal state returns its existing result
    /// without re-running anything; a room with a conversion already
    /// in flight is left alone and the existing run's eventual result
    /// is what `status` will report.
    pub async fn request_conversion(
        self: &Arc<Self>,
        room_id: RoomId,
        source_document: String,
    ) -> Result<ConversionStatusReport, ConversionError> {
        let existing = self
            .store
            .get(&room_id)
            .await?
            .ok_or_else(|| ConversionError::RoomNotFound(room_id.clone()))?;

        if matches!(
            existing.conversion_status,
            ConversionStatus::Complete | ConversionStatus::Failed
        ) {
            return Ok(status_from(existing));
        }

        // Durably attach the source document before the conversion task
        // is ever spawned, so a crash between this call and the task
        // actually running still leaves a persisted record to recover
        // or retry from.
        let doc = source_document.clone();
        let existing = self
            .store
            .update_fields(&room_id, existing.version, move |r| {
                r.source_document = Some(doc.clone());
            })
            .await?;

        let already_running = {
            let mut inflight = self.inflight.lock().expect("conversion registry poisoned");
            !inflight.insert(room_id.clone())
        };

        if !already_running {
            let pipeline = Arc::clone(self);
            let spawn_room_id = room_id.clone();
            tokio::spawn(async move {
                let result = pipeline.run(&spawn_room_id, source_document).await;
                if let Err(err) = result {
                    tracing::warn!(room_id = %spawn_room_id, error = %err, "conversion failed");
                    let _ = pipeline
                        .rooms
                        .mark_conversion_failed(&spawn_room_id, err.reason_code())
                        .await;
                }
                pipeline
                    .inflight
                    .lock()
                    .expect("conversion registry poisoned")
                    .remove(&spawn_room_id);
            });
        }

        Ok(status_from(existing))
    }

    pub async fn status(&self, room_id: &RoomId) -> Result<ConversionStatusReport, ConversionError> {
        let room = self
            .store
            .get(room_id)
            .await?
            .ok_or_else(|| ConversionError::RoomNotFound(room_id.clone()))?;
        Ok(status_from(room))
    }

    /// Steps 2-9 of the pipeline. Step 1 (the `pending` record itself)
    /// is `RoomManager::create_room`'s job, which runs before this is
    /// ever called.
    async fn run(&self, room_id: &RoomId, source_document: String) -> Result<(), ConversionError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("conversion semaphore closed");

        self.rooms.mark_processing(room_id).await?;

        let report: AnalysisReport = forge_analyzer::analyze(&source_document);

        let marked = inject_markers(&source_document, &report.elements);
        let prompt = build_prompt(&marked, &report);

        let converted = self.collaborator.complete(&prompt).await?;
        if !looks_like_document(&converted) {
            return Err(ConversionError::MalformedDocument(
                "collaborator output missing a root document element".to_string(),
            ));
        }

        let re_marked = inject_markers(&converted, &report.elements);
        let config = RoomConfigPayload::new(room_id, format!("sess-{}", room_id.as_str()));
        let instrumented = inject_bridge(&re_marked, &config);

        let validator = synthesize_validator(&report);

        let document_ref = self.artifacts.put(instrumented.into_bytes()).await?;

        let room = self
            .store
            .get(room_id)
            .await?
            .ok_or_else(|| ConversionError::RoomNotFound(room_id.clone()))?;
        let doc_ref = document_ref.clone();
        self.store
            .update_fields(room_id, room.version, move |r| {
                r.document_ref = Some(doc_ref.clone());
            })
            .await?;

        let content_bytes = serde_json::to_vec(&report).unwrap_or_default();
        let content_hash = forge_store::content_hash(&content_bytes);
        self.rooms
            .deploy_validator(room_id, content_hash, validator)
            .await?;

        tracing::info!(%room_id, %document_ref, "conversion complete");
        Ok(())
    }
}

/// Step-5 acceptance check: rejects obviously truncated or
/// structure-less collaborator output. Not a parser — a document-level
/// sanity check, same rigor as the rest of this pipeline.
fn looks_like_document(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("<html") || lower.contains("<body") || lower.contains("<!doctype")
}

fn status_from(room: forge_store::PersistedRoom) -> ConversionStatusReport {
    ConversionStatusReport {
        status: room.conversion_status,
        document_ref: room.document_ref,
        validator_ref: room.validator_ref,
        error: room.conversion_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_sandbox::InMemorySandbox;
    use forge_store::{InMemoryArtifactStore, InMemoryStore, PersistedRoom};

    fn make_pipeline() -> (Arc<ConversionPipeline<InMemoryStore, InMemorySandbox, forge_llm::MockCollaborator>>, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let sandbox = Arc::new(InMemorySandbox::new());
        let rooms = Arc::new(RoomManager::new(store.clone(), sandbox, Default::default()));
        let artifacts: Arc<dyn ArtifactStore> = Arc::new(InMemoryArtifactStore::new());
        // Echo fallback: the mock has no scripted response, so it echoes
        // the prompt back, which still embeds the source document's
        // "<html" token and satisfies the malformed-document check.
        let collaborator = Arc::new(RetryingCollaborator::new(
            forge_llm::MockCollaborator::new(),
            Default::default(),
        ));
        let pipeline = Arc::new(ConversionPipeline::new(
            store.clone(),
            rooms,
            artifacts,
            collaborator,
            Default::default(),
        ));
        (pipeline, store)
    }

    #[tokio::test]
    async fn conversion_completes_and_publishes_artifacts() {
        let (pipeline, store) = make_pipeline();
        let room_id = RoomId::generate();
        store
            .put(PersistedRoom::pending(room_id.clone(), "custom-game", String::new(), 0))
            .await
            .unwrap();

        pipeline
            .request_conversion(
                room_id.clone(),
                "<html><body><button>Go</button></body></html>".to_string(),
            )
            .await
            .unwrap();

        for _ in 0..50 {
            let status = pipeline.status(&room_id).await.unwrap();
            if status.status == ConversionStatus::Complete {
                assert!(status.document_ref.is_some());
                assert!(status.validator_ref.is_some());
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("conversion never reached Complete");
    }

    #[tokio::test]
    async fn terminal_status_short_circuits_request_conversion() {
        let (pipeline, store) = make_pipeline();
        let room_id = RoomId::generate();
        let mut room = PersistedRoom::pending(room_id.clone(), "custom-game", String::new(), 0);
        room.conversion_status = ConversionStatus::Failed;
        room.conversion_error = Some("PRIOR_FAILURE".to_string());
        store.put(room).await.unwrap();

        let result = pipeline
            .request_conversion(room_id.clone(), "<html></html>".to_string())
            .await
            .unwrap();
        assert_eq!(result.status, ConversionStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("PRIOR_FAILURE"));
    }

    #[tokio::test]
    async fn malformed_collaborator_output_marks_room_failed() {
        let store = Arc::new(InMemoryStore::new());
        let sandbox = Arc::new(InMemorySandbox::new());
        let rooms = Arc::new(RoomManager::new(store.clone(), sandbox, Default::default()));
        let artifacts: Arc<dyn ArtifactStore> = Arc::new(InMemoryArtifactStore::new());
        // The mock's echo fallback reflects the prompt text back, so a
        // source document carrying none of the accepted document tokens
        // reliably produces output `looks_like_document` rejects,
        // without needing an exact prompt-text key match.
        let collaborator = Arc::new(RetryingCollaborator::new(
            forge_llm::MockCollaborator::new(),
            forge_llm::CollaboratorBudget { max_attempts: 1, ..Default::default() },
        ));
        let pipeline = Arc::new(ConversionPipeline::new(
            store.clone(),
            rooms,
            artifacts,
            collaborator,
            Default::default(),
        ));

        let room_id = RoomId::generate();
        store
            .put(PersistedRoom::pending(room_id.clone(), "custom-game", String::new(), 0))
            .await
            .unwrap();

        pipeline
            .request_conversion(room_id.clone(), "just a plain div with no document root".to_string())
            .await
            .unwrap();

        for _ in 0..50 {
            let status = pipeline.status(&room_id).await.unwrap();
            if status.status == ConversionStatus::Failed {
                assert_eq!(status.error.as_deref(), Some("MALFORMED_DOCUMENT"));
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("conversion never reached Failed");
    }

    #[test]
    fn looks_like_document_rejects_bare_text() {
        assert!(!looks_like_document("just some text"));
        assert!(looks_like_document("<html><body></body></html>"));
    }
}
