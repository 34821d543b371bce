//! Error types for the formfit sizing engine.

use thiserror::Error;

/// Primary error type for sizing operations.
///
/// Only conditions that abort a page or the whole run live here. Per-field
/// problems are reported as [`InputError`] rejections and weak pixel
/// evidence is recorded on the output record instead.
#[derive(Error, Debug)]
pub enum SizingError {
    #[error("invalid raster for page {page}: {reason}")]
    InvalidRaster { page: u32, reason: String },

    #[error("failed to rasterize page {page}: {reason}")]
    Rasterize { page: u32, reason: String },

    #[error("invalid sizing configuration: {0}")]
    InvalidConfig(String),

    #[error("document has neither `validated_fields` nor `fields`")]
    MissingFields,

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Convenience Result type alias for SizingError.
pub type Result<T> = std::result::Result<T, SizingError>;

/// Why a field candidate was rejected before sizing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("label is empty")]
    EmptyLabel,

    #[error("anchor box has zero area")]
    DegenerateAnchor,

    #[error("anchor box lies outside the page")]
    AnchorOutOfRange,

    #[error("page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: usize },

    #[error("unknown field type: {0}")]
    UnknownFieldType(String),

    #[error("confidence {0} is outside [0, 100]")]
    InvalidConfidence(f64),

    #[error("malformed field record: {0}")]
    Malformed(String),
}
