use tracing::debug;

use super::directory::{DirectoryCache, DirectoryError, OfficerList};
use super::location::{locate, GeolocationProvider, PositionOptions};
use super::matcher::{nearest, rank, RankedOfficer};
use super::Position;

/// Map centre when neither the user nor any officer has a position (Dhaka).
pub const DEFAULT_MAP_CENTER: Position = Position {
    latitude: 23.8103,
    longitude: 90.4125,
};

/// The user's position merged with the officer directory, as shown in the
/// forward dialog.
#[derive(Debug, Clone)]
pub struct NearbyOfficers {
    pub origin: Option<Position>,
    pub officers: OfficerList,
    pub nearest: Option<RankedOfficer>,
}

impl NearbyOfficers {
    /// Look up the position and the directory concurrently, then merge.
    pub async fn resolve(
        directory: &DirectoryCache,
        locator: &dyn GeolocationProvider,
        options: &PositionOptions,
    ) -> Result<Self, DirectoryError> {
        let (origin, officers) = tokio::join!(locate(locator, options), directory.officers());
        let nearby = Self::from_parts(origin, officers?);
        debug!(
            located = nearby.origin.is_some(),
            officers = nearby.officers.len(),
            nearest = nearby.nearest.as_ref().map(|n| n.officer.id),
            "Nearby officers resolved"
        );
        Ok(nearby)
    }

    pub fn from_parts(origin: Option<Position>, officers: OfficerList) -> Self {
        let nearest = nearest(&officers, origin);
        Self {
            origin,
            officers,
            nearest,
        }
    }

    /// User position, else the first officer, else the default centre.
    pub fn map_center(&self) -> Position {
        self.origin
            .or_else(|| self.officers.first().map(|o| o.position()))
            .unwrap_or(DEFAULT_MAP_CENTER)
    }

    /// Closer nearest officer → tighter zoom.
    pub fn zoom_level(&self) -> u8 {
        match self.nearest.as_ref().and_then(|n| n.distance_km) {
            Some(d) if d < 5.0 => 13,
            Some(d) if d < 20.0 => 11,
            Some(d) if d < 50.0 => 10,
            _ => 8,
        }
    }

    /// Officers matching `query`, nearest first.
    pub fn ranked(&self, query: &str) -> Vec<RankedOfficer> {
        rank(&self.officers, self.origin, query)
    }
}
