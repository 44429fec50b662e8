//! REST client for the Agriverse backend.
//!
//! Endpoints:
//! - `POST /api/ml/predict` — multipart `image` parts
//! - `POST /api/ml/predict-and-create` — multipart `image` parts + `state`, `district`
//! - `POST /api/ml/advice` — JSON `{crop_name, disease_name}` → `{answer}`
//! - `POST /api/ml/forward` — multipart `crop`, `diseaseName`, `advice`,
//!   `image` parts, `forwardMode`, `state`, `district`
//! - `GET /api/map/officers` — officers with coordinates

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::*;
use crate::config::ServiceConfig;
use crate::forward::ForwardMode;
use crate::inference::{Candidate, RawPrediction};

/// Fallback message for a failed forward whose body says nothing useful.
const FORWARD_FAILED: &str = "Forward failed";

pub struct AgriverseClient {
    config: ServiceConfig,
    client: reqwest::Client,
}

impl AgriverseClient {
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ServiceError::HttpClient(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    // ── Request plumbing ────────────────────────────────────

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send and return the response if it succeeded. Non-success statuses
    /// become `ServiceError::Http` with the server's message, or `fallback`.
    async fn send(&self, request: RequestBuilder, fallback: &str) -> Result<Response, ServiceError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body).unwrap_or_else(|| fallback.to_string());
            debug!(status = status.as_u16(), message = %message, "Backend rejected request");
            return Err(ServiceError::Http {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fallback: &str,
    ) -> Result<T, ServiceError> {
        self.send(request, fallback)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::ResponseParsing(e.to_string()))
    }

    fn transport_error(&self, e: reqwest::Error) -> ServiceError {
        if e.is_connect() {
            ServiceError::Connection(self.config.api_base_url.clone())
        } else if e.is_timeout() {
            ServiceError::Timeout(self.config.request_timeout.as_secs())
        } else {
            ServiceError::HttpClient(e.to_string())
        }
    }
}

fn image_form(images: &[UploadImage]) -> Result<Form, ServiceError> {
    images.iter().try_fold(Form::new(), |form, image| {
        let part = Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.clone())
            .mime_str("image/jpeg")
            .map_err(|e| ServiceError::HttpClient(e.to_string()))?;
        Ok(form.part("image", part))
    })
}

fn with_hints(mut form: Form, hints: &LocationHints) -> Form {
    if let Some(state) = &hints.state {
        form = form.text("state", state.clone());
    }
    if let Some(district) = &hints.district {
        form = form.text("district", district.clone());
    }
    form
}

/// Message carried by an error body: a bare string, else `message`, else
/// `error`. `None` when the body says nothing usable.
pub fn error_message(body: &str) -> Option<String> {
    let text = body.trim();
    if text.is_empty() {
        return None;
    }
    let message = match serde_json::from_str::<Value>(text) {
        Ok(Value::String(s)) => Some(s),
        Ok(Value::Object(map)) => ["message", "error"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str).map(str::to_string)),
        Ok(_) => None,
        Err(_) => Some(text.to_string()),
    };
    message.filter(|m| !m.trim().is_empty())
}

// ═══════════════════════════════════════════════════════════
// Wire types
// ═══════════════════════════════════════════════════════════

/// One prediction as the backend sends it. `/predict` nests the best pick
/// under `prediction` and lists every photo under `allPredictions`; the
/// plain classifier shape has a label string under `prediction`.
#[derive(Debug, Default, Deserialize)]
struct WirePrediction {
    error: Option<String>,
    is_leaf: Option<bool>,
    reason: Option<String>,
    leaf_probability: Option<f64>,
    prediction: Option<PredictionField>,
    confidence: Option<f64>,
    #[serde(alias = "top5")]
    topk: Option<Vec<WireCandidate>>,
    #[serde(rename = "allPredictions")]
    all_predictions: Option<Vec<WirePrediction>>,
    advice: Option<String>,
    request: Option<WireCase>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PredictionField {
    Label(String),
    Nested(Box<WirePrediction>),
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    label: String,
    #[serde(alias = "prob")]
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WireCase {
    id: i64,
    status: Option<String>,
    #[serde(rename = "assignedOfficerUsername")]
    assigned_officer_username: Option<String>,
    #[serde(rename = "forwardMode")]
    forward_mode: Option<String>,
}

#[derive(Serialize)]
struct AdviceRequest<'a> {
    crop_name: &'a str,
    disease_name: &'a str,
}

#[derive(Deserialize)]
struct AdviceResponse {
    answer: Option<String>,
}

impl WirePrediction {
    /// This entry alone, ignoring any nesting.
    fn raw(&self) -> RawPrediction {
        let label = match &self.prediction {
            Some(PredictionField::Label(label)) => Some(label.clone()),
            _ => None,
        };
        RawPrediction {
            label,
            confidence: self.confidence,
            is_leaf: self.is_leaf,
            reason: self.reason.clone(),
            leaf_probability: self.leaf_probability,
            top_k: self
                .topk
                .iter()
                .flatten()
                .map(|c| Candidate {
                    label: c.label.clone(),
                    score: c.score.unwrap_or(0.0),
                })
                .collect(),
            error: self.error.clone(),
        }
    }

    /// Top-level error and leaf fields fill whatever the nested best entry
    /// leaves out.
    fn fold_into(&self, mut best: RawPrediction) -> RawPrediction {
        best.error = best.error.filter(|e| !e.is_empty()).or_else(|| self.error.clone());
        best.is_leaf = best.is_leaf.or(self.is_leaf);
        best.reason = best.reason.filter(|r| !r.is_empty()).or_else(|| self.reason.clone());
        best.leaf_probability = best.leaf_probability.or(self.leaf_probability);
        best
    }

    fn into_classification(self) -> ClassificationResponse {
        let per_image = self.all_predictions.as_ref().map(|all| {
            all.iter().map(WirePrediction::raw).collect::<Vec<_>>()
        });

        match (&self.prediction, per_image) {
            (Some(PredictionField::Nested(nested)), per_image) => ClassificationResponse::Aggregate {
                best: self.fold_into(nested.raw()),
                per_image: per_image.unwrap_or_default(),
            },
            (None, Some(per_image)) if self.error.is_none() => ClassificationResponse::Aggregate {
                best: RawPrediction::default(),
                per_image,
            },
            (None, None) if self.error.is_some() => {
                ClassificationResponse::Failed(self.error.clone().unwrap_or_default())
            }
            (_, Some(per_image)) => ClassificationResponse::Aggregate {
                best: self.raw(),
                per_image,
            },
            (_, None) => ClassificationResponse::Flat(self.raw()),
        }
    }
}

impl WireCase {
    fn into_case(self) -> CaseRef {
        CaseRef {
            id: self.id,
            status: self.status,
            assigned_officer: self.assigned_officer_username,
        }
    }

    /// Mode the server used. Without an explicit `forwardMode`, an assigned
    /// officer means NEAREST and an unassigned case means POOL.
    fn routed_mode(&self) -> ForwardMode {
        self.forward_mode
            .as_deref()
            .and_then(ForwardMode::parse)
            .unwrap_or(match self.assigned_officer_username {
                Some(_) => ForwardMode::Nearest,
                None => ForwardMode::Pool,
            })
    }
}

// ═══════════════════════════════════════════════════════════
// Service implementations
// ═══════════════════════════════════════════════════════════

#[async_trait]
impl ClassificationService for AgriverseClient {
    async fn classify(&self, images: &[UploadImage]) -> Result<ClassificationResponse, ServiceError> {
        let form = image_form(images)?;
        let request = self.client.post(self.url("/api/ml/predict")).multipart(form);
        let wire: WirePrediction = self.send_json(request, "Prediction failed").await?;
        Ok(wire.into_classification())
    }
}

#[async_trait]
impl AdvisoryService for AgriverseClient {
    async fn advice(&self, crop: &str, disease: &str) -> Result<Option<String>, ServiceError> {
        let body = AdviceRequest {
            crop_name: crop,
            disease_name: disease,
        };
        let request = self.client.post(self.url("/api/ml/advice")).json(&body);
        let response: AdviceResponse = self.send_json(request, "Advice failed").await?;
        Ok(response.answer)
    }
}

#[async_trait]
impl OfficerDirectoryService for AgriverseClient {
    async fn officers(&self) -> Result<Vec<Officer>, ServiceError> {
        let request = self.client.get(self.url("/api/map/officers"));
        self.send_json(request, "Failed to load officers").await
    }
}

#[async_trait]
impl ForwardingService for AgriverseClient {
    async fn forward(&self, request: &ForwardRequest) -> Result<ForwardResponse, ServiceError> {
        let form = image_form(&request.images)?
            .text("crop", request.crop.clone())
            .text("diseaseName", request.disease.clone())
            .text("advice", request.advisory_text.clone())
            .text("forwardMode", request.mode.as_str());
        let form = with_hints(form, &request.hints);

        let http = self.client.post(self.url("/api/ml/forward")).multipart(form);
        let case: WireCase = self.send_json(http, FORWARD_FAILED).await?;
        Ok(ForwardResponse {
            case_id: case.id,
            routed_mode: Some(case.routed_mode()),
            assigned_officer: case.assigned_officer_username,
        })
    }
}

#[async_trait]
impl DirectReportService for AgriverseClient {
    async fn predict_and_create(
        &self,
        images: &[UploadImage],
        hints: &LocationHints,
    ) -> Result<DirectSubmission, ServiceError> {
        let form = with_hints(image_form(images)?, hints);
        let request = self
            .client
            .post(self.url("/api/ml/predict-and-create"))
            .multipart(form);
        let mut wire: WirePrediction = self.send_json(request, "Submission failed").await?;

        let advice = wire.advice.take();
        let case = wire.request.take().map(WireCase::into_case);
        Ok(DirectSubmission {
            classification: wire.into_classification(),
            advice,
            case,
        })
    }
}
