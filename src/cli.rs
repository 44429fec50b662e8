//! Command-line driver: photos in, forwarded case out.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{CompressionConfig, ServiceConfig, DEFAULT_API_URL};
use crate::forward::{ForwardMode, ForwardOutcome};
use crate::geo::{format_distance, FixedLocation, GeolocationProvider, NoLocation, Position};
use crate::inference::percent;
use crate::intake::ImageBlob;
use crate::services::{AgriverseClient, LocationHints, ServiceError};
use crate::workflow::{
    ReportWorkflow, Settled, SuggestedAction, WorkflowConfig, WorkflowError, WorkflowServices,
};

/// Number of ranked guesses printed after a prediction.
const SHOWN_CANDIDATES: usize = 5;

#[derive(Parser, Debug)]
#[command(name = "agriverse")]
#[command(about = "Diagnose leaf photos and forward the report to an agriculture officer")]
#[command(version)]
pub struct Args {
    /// Leaf photos, in the order they should be reported
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Route to the nearest officer instead of the shared pool
    #[arg(long)]
    pub nearest: bool,

    /// Resubmit to the pool if no nearby officer can be found
    #[arg(long, requires = "nearest")]
    pub fallback_to_pool: bool,

    /// Predict, advise and open a pool case in a single request
    #[arg(long, conflicts_with_all = ["nearest", "dry_run"])]
    pub direct: bool,

    /// Stop after the advice; do not forward
    #[arg(long)]
    pub dry_run: bool,

    /// State/division to attach to the report
    #[arg(long)]
    pub state: Option<String>,

    /// District to attach to the report
    #[arg(long)]
    pub district: Option<String>,

    /// Your latitude, used to show the nearest officer
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Your longitude, used to show the nearest officer
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Backend base URL
    #[arg(long, env = "AGRIVERSE_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Bearer token of the logged-in farmer
    #[arg(long, env = "AGRIVERSE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Longest side of uploaded photos, in pixels
    #[arg(long, default_value_t = 1200, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_dimension: u32,

    /// JPEG quality of uploaded photos
    #[arg(long, default_value_t = 80, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,
}

impl Args {
    pub fn mode(&self) -> ForwardMode {
        if self.nearest {
            ForwardMode::Nearest
        } else {
            ForwardMode::Pool
        }
    }

    pub fn origin(&self) -> Option<Position> {
        Some(Position::new(self.lat?, self.lon?))
    }

    fn service_config(&self) -> ServiceConfig {
        let token = self.token.clone().filter(|t| !t.trim().is_empty());
        ServiceConfig::new(&self.api_url).with_token(token)
    }

    fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            compression: CompressionConfig {
                max_dimension: self.max_dimension,
                quality: self.quality,
            },
            ..Default::default()
        }
    }
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("None of the photos could be used")]
    NoUsablePhotos,

    #[error("{}", .0.user_message())]
    Workflow(#[from] WorkflowError),

    #[error("{0}")]
    Service(#[from] ServiceError),
}

/// Read the photo files in argument order.
pub async fn load_blobs(paths: &[PathBuf]) -> Result<Vec<ImageBlob>, CliError> {
    let mut blobs = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path).await.map_err(|source| CliError::Io {
            path: path.clone(),
            source,
        })?;
        blobs.push(ImageBlob::new(file_name(path), bytes));
    }
    Ok(blobs)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "leaf.jpg".to_string())
}

/// Run the whole pipeline once.
pub async fn execute(args: Args) -> Result<(), CliError> {
    let blobs = load_blobs(&args.images).await?;

    let client = Arc::new(AgriverseClient::new(args.service_config())?);
    let locator: Arc<dyn GeolocationProvider> = match args.origin() {
        Some(origin) => Arc::new(FixedLocation(origin)),
        None => Arc::new(NoLocation),
    };
    let workflow = Arc::new(ReportWorkflow::new(
        WorkflowServices::from_backend(client, locator),
        args.workflow_config(),
    ));

    let interrupt = tokio::spawn({
        let workflow = Arc::clone(&workflow);
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, abandoning report");
                workflow.close();
            }
        }
    });
    let result = drive(&workflow, &args, blobs).await;
    interrupt.abort();
    workflow.close();
    result
}

async fn drive(workflow: &ReportWorkflow, args: &Args, blobs: Vec<ImageBlob>) -> Result<(), CliError> {
    let report = workflow.add_images(blobs)?;
    for failure in &report.failed {
        println!("Skipped: {failure}");
    }
    if !report.any_added() {
        return Err(CliError::NoUsablePhotos);
    }
    workflow.set_location_hints(LocationHints::new(args.state.clone(), args.district.clone()))?;

    if args.direct {
        return direct(workflow).await;
    }

    let Settled::Applied(result) = workflow.predict().await? else {
        return Ok(());
    };
    println!("Diagnosis: {} ({})", result.summary(), percent(Some(result.best.confidence)));
    for (index, verdict) in result.images.iter().enumerate() {
        let status = if verdict.leaf_valid { "leaf" } else { "rejected" };
        println!(
            "  photo {}: {} [{}] {}",
            index + 1,
            verdict.crop_disease(),
            status,
            verdict.reason.as_deref().unwrap_or_default()
        );
    }
    for candidate in result.top_candidates(SHOWN_CANDIDATES) {
        println!("  {:>6}  {}", percent(Some(candidate.score)), candidate.label);
    }

    let Settled::Applied(advice) = workflow.fetch_advice().await? else {
        return Ok(());
    };
    println!("\nAdvice:\n{}\n", advice.formatted());

    if args.origin().is_some() {
        match workflow.nearby_officers().await {
            Ok(nearby) => match &nearby.nearest {
                Some(nearest) => println!(
                    "Nearest officer: {} <{}>, {}",
                    nearest.officer.username,
                    nearest.officer.email,
                    nearest.distance_km.map(format_distance).unwrap_or_default()
                ),
                None => println!("No officers with a known location."),
            },
            Err(e) => warn!(error = %e, "Officer lookup failed"),
        }
    }

    if args.dry_run {
        info!("Dry run, not forwarding");
        return Ok(());
    }

    match workflow.forward(args.mode()).await {
        Ok(outcome) => print_outcome(&outcome),
        Err(e) if args.fallback_to_pool && e.suggested_action() == Some(SuggestedAction::RetryInPool) => {
            println!("{}", e.user_message());
            println!("Resubmitting to the officer pool.");
            print_outcome(&workflow.forward(ForwardMode::Pool).await?);
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn direct(workflow: &ReportWorkflow) -> Result<(), CliError> {
    let Settled::Applied(report) = workflow.submit_direct().await? else {
        return Ok(());
    };
    println!(
        "Diagnosis: {} ({})",
        report.inference.summary(),
        percent(Some(report.inference.best.confidence))
    );
    println!("\nAdvice:\n{}\n", report.advisory.formatted());
    match report.case {
        Some(case) => println!("Case #{} opened in the officer pool.", case.id),
        None => println!("No case was opened."),
    }
    Ok(())
}

fn print_outcome(outcome: &ForwardOutcome) {
    match outcome {
        ForwardOutcome::Submitted(receipt) => {
            println!("{}: case #{}", receipt.headline(), receipt.case_id);
            println!("{}", receipt.detail());
            if let Some(officer) = &receipt.assigned_officer {
                println!("Assigned to {officer}");
            }
        }
        ForwardOutcome::NotEligible(reason) => println!("Not forwarded: {reason}"),
        ForwardOutcome::Busy => println!("A submission is already in progress."),
        ForwardOutcome::Discarded => println!("Report changed while sending; nothing recorded."),
    }
}
