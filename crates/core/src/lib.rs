//! formfit - pixel-driven sizing of fillable form fields.
//!
//! Takes coarse field candidates (a label, an approximate location and a
//! field type) and computes precise, non-overlapping fillable boxes by
//! reading the rendered page pixels.

pub mod analysis;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod model;
pub mod overlap;
pub mod raster;
pub mod solver;

pub use config::SizingConfig;
pub use document::{FieldsDocument, OutputFormat, SizedDocument};
pub use engine::{FieldSizer, PageFailure, PageFields, SizingReport, SizingStats};
pub use error::{InputError, Result, SizingError};
pub use geometry::NormBox;
pub use model::{Degradation, FieldCandidate, FieldType, Rejection, SizedField};
pub use overlap::resolve_overlaps;
pub use raster::{PageRaster, PixelRect, PreRendered, Rasterizer};
