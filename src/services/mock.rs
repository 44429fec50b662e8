//! Configurable in-process stand-in for every backend collaborator.
//!
//! Used by the workflow, advisory, directory and forwarding tests. Responses
//! are fixed per service and can be swapped while the mock is shared; every
//! call is counted, and an optional delay simulates a slow network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::*;
use crate::inference::RawPrediction;

pub struct MockServices {
    classification: Mutex<Result<ClassificationResponse, ServiceError>>,
    advice: Mutex<Result<Option<String>, ServiceError>>,
    officers: Mutex<Result<Vec<Officer>, ServiceError>>,
    /// `None` → a fresh case id per call, mode as requested.
    forward: Mutex<Option<Result<ForwardResponse, ServiceError>>>,
    direct: Mutex<Result<DirectSubmission, ServiceError>>,
    delay: Mutex<Duration>,

    classify_calls: AtomicUsize,
    last_classified: AtomicUsize,
    advice_calls: AtomicUsize,
    advice_requests: Mutex<Vec<(String, String)>>,
    directory_calls: AtomicUsize,
    forwarded: Mutex<Vec<ForwardRequest>>,
    direct_hints: Mutex<Vec<LocationHints>>,
}

impl MockServices {
    pub fn new() -> Self {
        let healthy = ClassificationResponse::Flat(RawPrediction {
            label: Some("Tomato___healthy".into()),
            confidence: Some(0.9),
            is_leaf: Some(true),
            leaf_probability: Some(0.98),
            ..Default::default()
        });
        Self {
            classification: Mutex::new(Ok(healthy.clone())),
            advice: Mutex::new(Ok(Some("No treatment needed.".into()))),
            officers: Mutex::new(Ok(Vec::new())),
            forward: Mutex::new(None),
            direct: Mutex::new(Ok(DirectSubmission {
                classification: healthy,
                advice: Some("No treatment needed.".into()),
                case: Some(CaseRef {
                    id: 1,
                    status: Some("PENDING".into()),
                    assigned_officer: None,
                }),
            })),
            delay: Mutex::new(Duration::ZERO),
            classify_calls: AtomicUsize::new(0),
            last_classified: AtomicUsize::new(0),
            advice_calls: AtomicUsize::new(0),
            advice_requests: Mutex::new(Vec::new()),
            directory_calls: AtomicUsize::new(0),
            forwarded: Mutex::new(Vec::new()),
            direct_hints: Mutex::new(Vec::new()),
        }
    }

    // ── Configuration ───────────────────────────────────────

    pub fn with_classification(self, response: ClassificationResponse) -> Self {
        *locked(&self.classification) = Ok(response);
        self
    }

    pub fn with_classification_error(self, err: ServiceError) -> Self {
        *locked(&self.classification) = Err(err);
        self
    }

    pub fn with_advice(self, advice: Option<String>) -> Self {
        *locked(&self.advice) = Ok(advice);
        self
    }

    pub fn with_advice_error(self, err: ServiceError) -> Self {
        *locked(&self.advice) = Err(err);
        self
    }

    pub fn with_officers(self, officers: Vec<Officer>) -> Self {
        self.set_officers(officers);
        self
    }

    /// Replace the directory while the mock is shared.
    pub fn set_officers(&self, officers: Vec<Officer>) {
        *locked(&self.officers) = Ok(officers);
    }

    pub fn with_directory_error(self, err: ServiceError) -> Self {
        *locked(&self.officers) = Err(err);
        self
    }

    pub fn with_forward_response(self, response: ForwardResponse) -> Self {
        *locked(&self.forward) = Some(Ok(response));
        self
    }

    pub fn with_forward_error(self, err: ServiceError) -> Self {
        *locked(&self.forward) = Some(Err(err));
        self
    }

    /// Back to the default forward behaviour.
    pub fn clear_forward_error(&self) {
        *locked(&self.forward) = None;
    }

    pub fn with_direct_submission(self, submission: DirectSubmission) -> Self {
        *locked(&self.direct) = Ok(submission);
        self
    }

    pub fn with_direct_error(self, err: ServiceError) -> Self {
        *locked(&self.direct) = Err(err);
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        self.set_delay(delay);
        self
    }

    pub fn set_delay(&self, delay: Duration) {
        *locked(&self.delay) = delay;
    }

    // ── Inspection ──────────────────────────────────────────

    pub fn classify_calls(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }

    /// Number of photos in the most recent classification call.
    pub fn last_classified_count(&self) -> usize {
        self.last_classified.load(Ordering::SeqCst)
    }

    pub fn advice_calls(&self) -> usize {
        self.advice_calls.load(Ordering::SeqCst)
    }

    pub fn last_advice_request(&self) -> Option<(String, String)> {
        locked(&self.advice_requests).last().cloned()
    }

    pub fn directory_calls(&self) -> usize {
        self.directory_calls.load(Ordering::SeqCst)
    }

    pub fn forward_calls(&self) -> usize {
        locked(&self.forwarded).len()
    }

    /// Every forward request received, in order.
    pub fn forwarded(&self) -> Vec<ForwardRequest> {
        locked(&self.forwarded).clone()
    }

    pub fn direct_calls(&self) -> usize {
        locked(&self.direct_hints).len()
    }

    pub fn last_direct_hints(&self) -> Option<LocationHints> {
        locked(&self.direct_hints).last().cloned()
    }

    // ── Internal ────────────────────────────────────────────

    async fn pause(&self) {
        let delay = *locked(&self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for MockServices {
    fn default() -> Self {
        Self::new()
    }
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// Each call snapshots its response before the delay, so a response swapped
// mid-flight only affects later calls.

#[async_trait]
impl ClassificationService for MockServices {
    async fn classify(&self, images: &[UploadImage]) -> Result<ClassificationResponse, ServiceError> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        self.last_classified.store(images.len(), Ordering::SeqCst);
        let response = locked(&self.classification).clone();
        self.pause().await;
        response
    }
}

#[async_trait]
impl AdvisoryService for MockServices {
    async fn advice(&self, crop: &str, disease: &str) -> Result<Option<String>, ServiceError> {
        self.advice_calls.fetch_add(1, Ordering::SeqCst);
        locked(&self.advice_requests).push((crop.to_string(), disease.to_string()));
        let response = locked(&self.advice).clone();
        self.pause().await;
        response
    }
}

#[async_trait]
impl OfficerDirectoryService for MockServices {
    async fn officers(&self) -> Result<Vec<Officer>, ServiceError> {
        self.directory_calls.fetch_add(1, Ordering::SeqCst);
        let response = locked(&self.officers).clone();
        self.pause().await;
        response
    }
}

#[async_trait]
impl ForwardingService for MockServices {
    async fn forward(&self, request: &ForwardRequest) -> Result<ForwardResponse, ServiceError> {
        let call = {
            let mut forwarded = locked(&self.forwarded);
            forwarded.push(request.clone());
            forwarded.len()
        };
        let response = locked(&self.forward).clone().unwrap_or(Ok(ForwardResponse {
            case_id: call as i64,
            routed_mode: Some(request.mode),
            assigned_officer: None,
        }));
        self.pause().await;
        response
    }
}

#[async_trait]
impl DirectReportService for MockServices {
    async fn predict_and_create(
        &self,
        images: &[UploadImage],
        hints: &LocationHints,
    ) -> Result<DirectSubmission, ServiceError> {
        locked(&self.direct_hints).push(hints.clone());
        self.last_classified.store(images.len(), Ordering::SeqCst);
        let response = locked(&self.direct).clone();
        self.pause().await;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward::ForwardMode;

    #[tokio::test]
    async fn default_forward_echoes_mode_with_fresh_ids() {
        let mock = MockServices::new();
        let request = ForwardRequest::new(
            "Rice",
            "Blast",
            "advice",
            vec![UploadImage::new("a.jpg", vec![1u8])],
            ForwardMode::Nearest,
            LocationHints::default(),
        )
        .unwrap();

        let first = mock.forward(&request).await.unwrap();
        let second = mock.forward(&request).await.unwrap();
        assert_eq!(first.routed_mode, Some(ForwardMode::Nearest));
        assert_ne!(first.case_id, second.case_id);
        assert_eq!(mock.forward_calls(), 2);
    }

    #[tokio::test]
    async fn responses_can_be_swapped_while_shared() {
        let mock = MockServices::new().with_directory_error(ServiceError::Timeout(5));
        assert!(mock.officers().await.is_err());
        mock.set_officers(vec![]);
        assert!(mock.officers().await.unwrap().is_empty());
        assert_eq!(mock.directory_calls(), 2);
    }
}
