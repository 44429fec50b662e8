pub mod directory;
pub mod distance;
pub mod location;
pub mod matcher;
pub mod nearby;

pub use directory::*;
pub use distance::*;
pub use location::*;
pub use matcher::*;
pub use nearby::*;

use serde::{Deserialize, Serialize};

/// Officer snapshot as published by the directory service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Officer {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Officer {
    pub fn position(&self) -> Position {
        Position::new(self.latitude, self.longitude)
    }
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}
