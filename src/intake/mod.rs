//! Photo intake: decode, orient, downscale and re-encode leaf photos, and
//! keep them in the order the user added them.

pub mod asset;
pub mod pipeline;
pub mod preprocess;
pub mod preview;

pub use asset::*;
pub use pipeline::*;
pub use preprocess::*;
pub use preview::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntakeError {
    /// One photo could not be turned into an asset. Other photos in the same
    /// batch are unaffected.
    #[error("Cannot read image '{name}': {reason}")]
    Decode { name: String, reason: String },

    #[error("Image encoding failed: {0}")]
    Encode(String),

    #[error("No image with id {0}")]
    UnknownAsset(AssetId),

    #[error("Preview error: {0}")]
    Preview(String),
}
