//! One-shot device position lookup that never fails the pipeline.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::Position;

/// Slack added on top of the provider timeout before giving up on it.
const GUARD_SLACK: Duration = Duration::from_secs(1);

/// Upper bound for the whole lookup.
const MAX_GUARD: Duration = Duration::from_secs(9);

/// Parameters passed to the position provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Accept a cached fix at most this old.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: false,
            timeout: Duration::from_secs(7),
            maximum_age: Duration::from_secs(300),
        }
    }
}

/// Source of the device position. Resolves to `None` when unavailable,
/// denied or unsupported; never errors.
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn current_position(&self, options: &PositionOptions) -> Option<Position>;
}

/// Ask `provider` for a position, giving up after the provider timeout plus
/// a little slack (never more than nine seconds).
pub async fn locate(provider: &dyn GeolocationProvider, options: &PositionOptions) -> Option<Position> {
    let guard = (options.timeout + GUARD_SLACK).min(MAX_GUARD);
    locate_within(provider, options, guard).await
}

/// `locate` with an explicit overall deadline.
pub async fn locate_within(
    provider: &dyn GeolocationProvider,
    options: &PositionOptions,
    guard: Duration,
) -> Option<Position> {
    match tokio::time::timeout(guard, provider.current_position(options)).await {
        Ok(Some(position)) if is_valid(&position) => Some(position),
        Ok(Some(position)) => {
            debug!(?position, "Discarding out-of-range position");
            None
        }
        Ok(None) => None,
        Err(_) => {
            debug!(guard_ms = guard.as_millis() as u64, "Geolocation timed out");
            None
        }
    }
}

fn is_valid(position: &Position) -> bool {
    position.latitude.is_finite()
        && position.longitude.is_finite()
        && (-90.0..=90.0).contains(&position.latitude)
        && (-180.0..=180.0).contains(&position.longitude)
}

/// Always reports the same position (e.g. typed in by the user).
pub struct FixedLocation(pub Position);

#[async_trait]
impl GeolocationProvider for FixedLocation {
    async fn current_position(&self, _options: &PositionOptions) -> Option<Position> {
        Some(self.0)
    }
}

/// Device without positioning.
pub struct NoLocation;

#[async_trait]
impl GeolocationProvider for NoLocation {
    async fn current_position(&self, _options: &PositionOptions) -> Option<Position> {
        None
    }
}
