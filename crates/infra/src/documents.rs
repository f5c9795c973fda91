//! Downstream document generation (pickslips, transfer notes, ...).
//!
//! Rendering itself is an external collaborator. The engine only hands off a
//! request after a confirmed commit and never waits for the document; a
//! failed hand-off is reported as a warning and never undoes the commit.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use wms_allocation::{MovementKind, MovementOutput};
use wms_core::SubmissionId;

use crate::movement_store::CommitReceipt;

/// Everything a renderer needs to reproduce the movement document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub submission_id: SubmissionId,
    pub kind: MovementKind,
    pub movements: Vec<MovementOutput>,
    pub requested_at: DateTime<Utc>,
}

impl DocumentRequest {
    pub fn for_receipt(kind: MovementKind, receipt: &CommitReceipt) -> Self {
        Self {
            submission_id: receipt.submission_id,
            kind,
            movements: receipt.records.iter().map(|r| r.to_output()).collect(),
            requested_at: Utc::now(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("document service unavailable")]
    Unavailable,

    #[error("document generation failed: {0}")]
    Failed(String),
}

/// Fire-and-forget document hand-off.
pub trait DocumentGenerator: Send + Sync {
    fn request(&self, request: DocumentRequest) -> Result<(), DocumentError>;
}

impl<D> DocumentGenerator for Arc<D>
where
    D: DocumentGenerator + ?Sized,
{
    fn request(&self, request: DocumentRequest) -> Result<(), DocumentError> {
        (**self).request(request)
    }
}

/// Recording generator for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryDocumentQueue {
    requests: Mutex<Vec<DocumentRequest>>,
    fail_with: Mutex<Option<DocumentError>>,
}

impl InMemoryDocumentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent request fails with `error` (until cleared).
    pub fn fail_with(&self, error: Option<DocumentError>) {
        if let Ok(mut slot) = self.fail_with.lock() {
            *slot = error;
        }
    }

    pub fn requests(&self) -> Vec<DocumentRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl DocumentGenerator for InMemoryDocumentQueue {
    fn request(&self, request: DocumentRequest) -> Result<(), DocumentError> {
        if let Some(err) = self.fail_with.lock().ok().and_then(|slot| slot.clone()) {
            return Err(err);
        }
        self.requests
            .lock()
            .map_err(|_| DocumentError::Unavailable)?
            .push(request);
        Ok(())
    }
}

/// Renderer invoked on the background thread.
pub type RenderFn = Box<dyn Fn(&DocumentRequest) -> Result<(), DocumentError> + Send>;

/// Hands requests to a dedicated worker thread and returns immediately.
///
/// Render failures on the worker are logged; the submitter has already moved
/// on. A request only fails synchronously when the worker is gone.
#[derive(Debug)]
pub struct BackgroundDocumentGenerator {
    sender: Option<mpsc::Sender<DocumentRequest>>,
    join: Option<thread::JoinHandle<()>>,
}

impl BackgroundDocumentGenerator {
    pub fn spawn(render: RenderFn) -> Self {
        let (tx, rx) = mpsc::channel::<DocumentRequest>();
        let join = thread::spawn(move || {
            for request in rx {
                match render(&request) {
                    Ok(()) => debug!(
                        submission_id = %request.submission_id,
                        movements = request.movements.len(),
                        "document rendered"
                    ),
                    Err(err) => warn!(
                        submission_id = %request.submission_id,
                        error = %err,
                        "document rendering failed"
                    ),
                }
            }
        });
        Self {
            sender: Some(tx),
            join: Some(join),
        }
    }

    /// Stop accepting requests and wait for queued ones to finish.
    pub fn shutdown(mut self) {
        self.sender.take();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl DocumentGenerator for BackgroundDocumentGenerator {
    fn request(&self, request: DocumentRequest) -> Result<(), DocumentError> {
        let sender = self.sender.as_ref().ok_or(DocumentError::Unavailable)?;
        sender.send(request).map_err(|_| DocumentError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> DocumentRequest {
        DocumentRequest {
            submission_id: SubmissionId::new(),
            kind: MovementKind::BinTransfer,
            movements: vec![],
            requested_at: Utc::now(),
        }
    }

    #[test]
    fn background_generator_renders_every_queued_request() {
        let rendered = Arc::new(Mutex::new(Vec::new()));
        let sink = rendered.clone();
        let generator = BackgroundDocumentGenerator::spawn(Box::new(move |req| {
            sink.lock().unwrap().push(req.submission_id);
            Ok(())
        }));

        let first = request();
        let second = request();
        generator.request(first.clone()).unwrap();
        generator.request(second.clone()).unwrap();
        generator.shutdown();

        assert_eq!(
            *rendered.lock().unwrap(),
            vec![first.submission_id, second.submission_id]
        );
    }

    #[test]
    fn render_failures_do_not_surface_to_the_submitter() {
        let generator = BackgroundDocumentGenerator::spawn(Box::new(|_| {
            Err(DocumentError::Failed("printer offline".to_string()))
        }));

        assert!(generator.request(request()).is_ok());
        generator.shutdown();
    }

    #[test]
    fn in_memory_queue_can_be_made_to_fail() {
        let queue = InMemoryDocumentQueue::new();
        queue.fail_with(Some(DocumentError::Unavailable));
        assert_eq!(queue.request(request()), Err(DocumentError::Unavailable));

        queue.fail_with(None);
        assert!(queue.request(request()).is_ok());
        assert_eq!(queue.requests().len(), 1);
    }
}
