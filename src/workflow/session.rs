//! The report draft and every operation on it.
//!
//! Key properties:
//! - Any change to the photo set clears the diagnosis and the advice and
//!   bumps the draft version
//! - Stage requests remember the version they started at; a result that
//!   arrives for an older version, or after `close()`, is dropped
//! - `forward()` sends nothing unless the draft is eligible, and never more
//!   than one submission at a time
//! - The draft lock is never held across an await

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{ValidationError, WorkflowError, WorkflowStage};
use crate::advisory::{AdvisoryFetcher, AdvisoryResult, AdvisoryStatus, NO_ADVICE_TEXT};
use crate::config::CompressionConfig;
use crate::forward::*;
use crate::geo::{DirectoryCache, GeolocationProvider, NearbyOfficers, PositionOptions};
use crate::inference::{normalize_response, InferenceError, InferenceOrchestrator, InferenceResult};
use crate::intake::{AddReport, AssetId, CropRect, ImageAsset, ImageBlob, ImageIntake, PreviewStore, ThumbnailPreviews};
use crate::services::*;

// ═══════════════════════════════════════════════════════════
// Wiring
// ═══════════════════════════════════════════════════════════

/// Collaborators a workflow talks to.
#[derive(Clone)]
pub struct WorkflowServices {
    pub classification: Arc<dyn ClassificationService>,
    pub advisory: Arc<dyn AdvisoryService>,
    pub forwarding: Arc<dyn ForwardingService>,
    pub direct: Arc<dyn DirectReportService>,
    /// Shared with the map view; one per session.
    pub directory: Arc<DirectoryCache>,
    pub locator: Arc<dyn GeolocationProvider>,
    pub previews: Arc<dyn PreviewStore>,
}

impl WorkflowServices {
    /// Every remote capability served by one backend.
    pub fn from_backend<B>(backend: Arc<B>, locator: Arc<dyn GeolocationProvider>) -> Self
    where
        B: ClassificationService
            + AdvisoryService
            + ForwardingService
            + DirectReportService
            + OfficerDirectoryService
            + 'static,
    {
        Self {
            classification: backend.clone(),
            advisory: backend.clone(),
            forwarding: backend.clone(),
            direct: backend.clone(),
            directory: Arc::new(DirectoryCache::new(backend)),
            locator,
            previews: Arc::new(ThumbnailPreviews::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowConfig {
    pub compression: CompressionConfig,
    pub position: PositionOptions,
}

// ═══════════════════════════════════════════════════════════
// Results
// ═══════════════════════════════════════════════════════════

/// How a stage request ended, as far as the draft is concerned.
#[derive(Debug, Clone, PartialEq)]
pub enum Settled<T> {
    Applied(T),
    /// The draft changed or the workflow closed while the request was in
    /// flight; the result was dropped.
    Discarded,
}

impl<T> Settled<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::Discarded => None,
        }
    }

    pub fn is_discarded(&self) -> bool {
        matches!(self, Self::Discarded)
    }
}

/// Outcome of the one-shot predict-and-create call.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectReport {
    pub inference: InferenceResult,
    pub advisory: AdvisoryResult,
    pub case: Option<CaseRef>,
}

// ═══════════════════════════════════════════════════════════
// Draft
// ═══════════════════════════════════════════════════════════

struct Draft {
    intake: ImageIntake,
    hints: LocationHints,
    inference: Option<InferenceResult>,
    /// Reason the last photo set was rejected as non-leaf.
    leaf_rejection: Option<String>,
    advisory: Option<AdvisoryResult>,
    last_receipt: Option<ForwardReceipt>,
    last_case: Option<CaseRef>,
    version: u64,
}

impl Draft {
    /// Drop every result derived from the photo set.
    fn invalidate(&mut self) {
        self.version += 1;
        self.inference = None;
        self.leaf_rejection = None;
        self.advisory = None;
    }

    fn stage(&self) -> WorkflowStage {
        WorkflowStage::derive(
            self.intake.len(),
            self.leaf_rejection.is_some(),
            self.inference.as_ref(),
            self.advisory.as_ref(),
        )
    }

    /// The five forward preconditions.
    fn eligibility(&self) -> Result<(&InferenceResult, &AdvisoryResult), Ineligibility> {
        if self.intake.is_empty() {
            return Err(Ineligibility::NoImages);
        }
        if self.leaf_rejection.is_some() {
            return Err(Ineligibility::NotALeaf);
        }
        let inference = self.inference.as_ref().ok_or(Ineligibility::NoPrediction)?;
        if !inference.leaf_valid {
            return Err(Ineligibility::NotALeaf);
        }
        let advisory = self.advisory.as_ref().ok_or(Ineligibility::AdviceNotReady)?;
        Ok((inference, advisory))
    }
}

// ═══════════════════════════════════════════════════════════
// ReportWorkflow
// ═══════════════════════════════════════════════════════════

/// One disease report in progress.
pub struct ReportWorkflow {
    draft: Mutex<Draft>,
    inference: InferenceOrchestrator,
    advisory: AdvisoryFetcher,
    forwarding: ForwardCoordinator,
    direct: Arc<dyn DirectReportService>,
    directory: Arc<DirectoryCache>,
    locator: Arc<dyn GeolocationProvider>,
    position: PositionOptions,
    cancel: CancellationToken,
}

impl ReportWorkflow {
    pub fn new(services: WorkflowServices, config: WorkflowConfig) -> Self {
        Self {
            draft: Mutex::new(Draft {
                intake: ImageIntake::new(config.compression, services.previews),
                hints: LocationHints::default(),
                inference: None,
                leaf_rejection: None,
                advisory: None,
                last_receipt: None,
                last_case: None,
                version: 0,
            }),
            inference: InferenceOrchestrator::new(services.classification),
            advisory: AdvisoryFetcher::new(services.advisory),
            forwarding: ForwardCoordinator::new(services.forwarding),
            direct: services.direct,
            directory: services.directory,
            locator: services.locator,
            position: config.position,
            cancel: CancellationToken::new(),
        }
    }

    // ── Photo set ───────────────────────────────────────────

    /// Add photos, best effort. Clears all results if at least one photo was
    /// accepted.
    pub fn add_images(&self, blobs: Vec<ImageBlob>) -> Result<AddReport, WorkflowError> {
        let mut draft = self.draft()?;
        let report = draft.intake.add(blobs);
        if report.any_added() {
            draft.invalidate();
        }
        Ok(report)
    }

    pub fn crop_image(&self, id: AssetId, rect: CropRect) -> Result<(), WorkflowError> {
        let mut draft = self.draft()?;
        draft.intake.crop(id, rect)?;
        draft.invalidate();
        Ok(())
    }

    pub fn remove_image(&self, id: AssetId) -> Result<(), WorkflowError> {
        let mut draft = self.draft()?;
        draft.intake.remove(id)?;
        draft.invalidate();
        Ok(())
    }

    /// Remove every photo; the draft returns to `Upload`.
    pub fn clear(&self) -> Result<(), WorkflowError> {
        let mut draft = self.draft()?;
        draft.intake.clear();
        draft.invalidate();
        draft.last_receipt = None;
        draft.last_case = None;
        Ok(())
    }

    /// State/district sent with forwarded reports. Does not touch results.
    pub fn set_location_hints(&self, hints: LocationHints) -> Result<(), WorkflowError> {
        self.draft()?.hints = hints;
        Ok(())
    }

    // ── Stages ──────────────────────────────────────────────

    /// Classify the current photo set.
    ///
    /// Starting a prediction clears the previous diagnosis and advice. A
    /// non-leaf verdict leaves the draft at `Upload`.
    pub async fn predict(&self) -> Result<Settled<InferenceResult>, WorkflowError> {
        let (version, images) = {
            let mut draft = self.draft()?;
            if draft.intake.is_empty() {
                return Err(ValidationError::new("Add at least one photo first").into());
            }
            draft.invalidate();
            (draft.version, draft.intake.upload_images())
        };

        let Some(outcome) = self.until_closed(self.inference.predict(&images)).await else {
            return Ok(Settled::Discarded);
        };

        let mut draft = self.draft()?;
        if !self.is_current(&draft, version, "prediction") {
            return Ok(Settled::Discarded);
        }
        match outcome {
            Ok(result) => {
                draft.inference = Some(result.clone());
                Ok(Settled::Applied(result))
            }
            Err(InferenceError::NotALeaf { reason }) => {
                info!(reason = %reason, "Photos rejected as non-leaf");
                draft.leaf_rejection = Some(reason.clone());
                Err(InferenceError::NotALeaf { reason }.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch advice for the current diagnosis. Replaces earlier advice.
    pub async fn fetch_advice(&self) -> Result<Settled<AdvisoryResult>, WorkflowError> {
        let (version, crop, disease) = {
            let draft = self.draft()?;
            let inference = draft
                .inference
                .as_ref()
                .ok_or_else(|| ValidationError::new("Run a prediction first"))?;
            let parsed = inference.crop_disease();
            (draft.version, parsed.crop, parsed.disease)
        };

        let Some(result) = self.until_closed(self.advisory.fetch(&crop, &disease)).await else {
            return Ok(Settled::Discarded);
        };

        let mut draft = self.draft()?;
        if !self.is_current(&draft, version, "advice") {
            return Ok(Settled::Discarded);
        }
        draft.advisory = Some(result.clone());
        Ok(Settled::Applied(result))
    }

    /// Submit the draft in `mode`.
    ///
    /// Returns `NotEligible` without sending anything when a precondition
    /// fails, and `Busy` while another submission is pending.
    pub async fn forward(&self, mode: ForwardMode) -> Result<ForwardOutcome, WorkflowError> {
        let (version, request) = {
            let draft = self.draft()?;
            let (inference, advisory) = match draft.eligibility() {
                Ok(ready) => ready,
                Err(reason) => {
                    debug!(reason = %reason, "Forward skipped");
                    return Ok(ForwardOutcome::NotEligible(reason));
                }
            };
            let parsed = inference.crop_disease();
            let request = ForwardRequest::new(
                &parsed.crop,
                &parsed.disease,
                &advisory.text,
                draft.intake.upload_images(),
                mode,
                draft.hints.clone(),
            )?;
            (draft.version, request)
        };

        let Some(outcome) = self.until_closed(self.forwarding.submit(request)).await else {
            return Ok(ForwardOutcome::Discarded);
        };

        let mut draft = self.draft()?;
        if !self.is_current(&draft, version, "forward") {
            return Ok(ForwardOutcome::Discarded);
        }
        let outcome = outcome?;
        if let ForwardOutcome::Submitted(receipt) = &outcome {
            draft.last_receipt = Some(receipt.clone());
        }
        Ok(outcome)
    }

    /// Predict, advise and open a pool case in one backend call.
    pub async fn submit_direct(&self) -> Result<Settled<DirectReport>, WorkflowError> {
        let (version, images, hints) = {
            let mut draft = self.draft()?;
            if draft.intake.is_empty() {
                return Err(ValidationError::new("Add at least one photo first").into());
            }
            draft.invalidate();
            (draft.version, draft.intake.upload_images(), draft.hints.clone())
        };

        info!(images = images.len(), "Submitting report in one step");
        let call = self.direct.predict_and_create(&images, &hints);
        let Some(outcome) = self.until_closed(call).await else {
            return Ok(Settled::Discarded);
        };

        let mut draft = self.draft()?;
        if !self.is_current(&draft, version, "direct submission") {
            return Ok(Settled::Discarded);
        }
        let submission = outcome.map_err(InferenceError::from)?;
        let inference = match normalize_response(submission.classification) {
            Ok(result) => result,
            Err(InferenceError::NotALeaf { reason }) => {
                draft.leaf_rejection = Some(reason.clone());
                return Err(InferenceError::NotALeaf { reason }.into());
            }
            Err(e) => return Err(e.into()),
        };

        let parsed = inference.crop_disease();
        let (text, status) = match submission.advice.filter(|a| !a.trim().is_empty()) {
            Some(text) => (text, AdvisoryStatus::Delivered),
            None => (NO_ADVICE_TEXT.to_string(), AdvisoryStatus::Empty),
        };
        let advisory = AdvisoryResult {
            crop: parsed.crop,
            disease: parsed.disease,
            text,
            status,
        };

        draft.inference = Some(inference.clone());
        draft.advisory = Some(advisory.clone());
        draft.last_case = submission.case.clone();
        info!(
            label = %inference.best.label,
            case_id = submission.case.as_ref().map(|c| c.id),
            "Direct submission complete"
        );
        Ok(Settled::Applied(DirectReport {
            inference,
            advisory,
            case: submission.case,
        }))
    }

    /// Device position and officer directory, merged for the forward dialog.
    pub async fn nearby_officers(&self) -> Result<NearbyOfficers, WorkflowError> {
        Ok(NearbyOfficers::resolve(&self.directory, self.locator.as_ref(), &self.position).await?)
    }

    /// Tear down: in-flight requests stop and no later result applies.
    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            info!("Report workflow closed");
        }
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    // ── Queries ─────────────────────────────────────────────

    pub fn stage(&self) -> WorkflowStage {
        self.view(Draft::stage)
    }

    /// `Ok` when `forward()` would send a request.
    pub fn eligibility(&self) -> Result<(), Ineligibility> {
        self.view(|d| d.eligibility().map(|_| ()))
    }

    pub fn images(&self) -> Vec<ImageAsset> {
        self.view(|d| d.intake.assets().to_vec())
    }

    pub fn inference(&self) -> Option<InferenceResult> {
        self.view(|d| d.inference.clone())
    }

    pub fn advisory(&self) -> Option<AdvisoryResult> {
        self.view(|d| d.advisory.clone())
    }

    pub fn leaf_rejection(&self) -> Option<String> {
        self.view(|d| d.leaf_rejection.clone())
    }

    pub fn location_hints(&self) -> LocationHints {
        self.view(|d| d.hints.clone())
    }

    pub fn last_receipt(&self) -> Option<ForwardReceipt> {
        self.view(|d| d.last_receipt.clone())
    }

    /// Case opened by the last `submit_direct()`, if any.
    pub fn last_case(&self) -> Option<CaseRef> {
        self.view(|d| d.last_case.clone())
    }

    pub fn version(&self) -> u64 {
        self.view(|d| d.version)
    }

    pub fn is_forwarding(&self) -> bool {
        self.forwarding.is_busy()
    }

    pub fn directory(&self) -> &Arc<DirectoryCache> {
        &self.directory
    }

    // ── Internal ────────────────────────────────────────────

    fn draft(&self) -> Result<MutexGuard<'_, Draft>, WorkflowError> {
        self.draft.lock().map_err(|_| WorkflowError::LockPoisoned)
    }

    fn view<T>(&self, read: impl FnOnce(&Draft) -> T) -> T {
        let draft = self.draft.lock().unwrap_or_else(PoisonError::into_inner);
        read(&draft)
    }

    /// Run `work` unless the workflow closes first.
    async fn until_closed<F: Future>(&self, work: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("Request abandoned, workflow closed");
                None
            }
            output = work => Some(output),
        }
    }

    fn is_current(&self, draft: &Draft, version: u64, what: &str) -> bool {
        if self.cancel.is_cancelled() {
            debug!(what, "Result arrived after close, discarded");
            return false;
        }
        if draft.version != version {
            debug!(what, started = version, current = draft.version, "Stale result discarded");
            return false;
        }
        true
    }
}

impl Drop for ReportWorkflow {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
