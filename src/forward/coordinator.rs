//! Sends forward requests, one at a time.
//!
//! A second `submit()` while one is pending is dropped, not queued: the busy
//! flag is taken before the first await and released when the guard drops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::types::*;
use super::ForwardError;
use crate::services::ForwardingService;

pub struct ForwardCoordinator {
    service: Arc<dyn ForwardingService>,
    busy: AtomicBool,
}

impl ForwardCoordinator {
    pub fn new(service: Arc<dyn ForwardingService>) -> Self {
        Self {
            service,
            busy: AtomicBool::new(false),
        }
    }

    /// Is a submission pending?
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Take the busy flag. `None` if a submission is already pending.
    pub fn try_begin(&self) -> Option<SubmissionGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(SubmissionGuard { coordinator: self })
    }

    /// Submit `request` unless another submission is pending.
    pub async fn submit(&self, request: ForwardRequest) -> Result<ForwardOutcome, ForwardError> {
        let Some(_guard) = self.try_begin() else {
            debug!(mode = %request.mode, "Forward already pending, ignoring");
            return Ok(ForwardOutcome::Busy);
        };
        self.send(&request).await.map(ForwardOutcome::Submitted)
    }

    async fn send(&self, request: &ForwardRequest) -> Result<ForwardReceipt, ForwardError> {
        info!(
            crop = %request.crop,
            disease = %request.disease,
            mode = %request.mode,
            images = request.images.len(),
            "Forwarding report"
        );

        let response = self.service.forward(request).await.map_err(|e| {
            let classified = ForwardError::classify(e);
            warn!(error = %classified, "Forward rejected");
            classified
        })?;

        let receipt = ForwardReceipt {
            case_id: response.case_id,
            requested_mode: request.mode,
            routed_mode: response.routed_mode.unwrap_or(request.mode),
            assigned_officer: response.assigned_officer,
            submitted_at: Utc::now(),
        };
        info!(
            case_id = receipt.case_id,
            routed = %receipt.routed_mode,
            fell_back = receipt.fell_back_to_pool(),
            "Report forwarded"
        );
        Ok(receipt)
    }
}

// ═══════════════════════════════════════════════════════════
// SubmissionGuard — RAII busy flag
// ═══════════════════════════════════════════════════════════

/// Holds the coordinator's busy flag; dropping it releases the flag.
pub struct SubmissionGuard<'a> {
    coordinator: &'a ForwardCoordinator,
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.busy.store(false, Ordering::Release);
    }
}
