//! Pixel analysis of a rasterized page around one field anchor.
//!
//! Produces a [`PixelSignal`]: candidate underlines, the free space around
//! the anchor, and an estimate of the local text height. The raster is only
//! read, so fields on one page can be analyzed concurrently.

mod text_height;
mod underline;
mod whitespace;

pub use underline::{UnderlineRun, UnderlineRuns};
pub use whitespace::{DirectionScan, ScanStop, WhitespaceExtent};

use crate::config::SizingConfig;
use crate::model::FieldCandidate;
use crate::raster::PageRaster;

/// Pixel evidence gathered for one candidate. Ephemeral, never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelSignal {
    /// Qualifying horizontal runs near the anchor's baseline, by row then column.
    pub underline_runs: UnderlineRuns,
    /// The run chosen as the field's underline, if any.
    pub underline: Option<UnderlineRun>,
    pub whitespace: WhitespaceExtent,
    /// Dominant dark-run height near the anchor, in pixels.
    pub text_height_estimate: Option<f64>,
}

/// Analyzes the pixels around `candidate`'s anchor.
pub fn analyze(
    raster: &PageRaster,
    candidate: &FieldCandidate,
    config: &SizingConfig,
) -> PixelSignal {
    let anchor = raster.px_rect(&candidate.anchor_box);

    let underline_runs = underline::find_underline_runs(raster, anchor, config);
    let underline = underline::select_underline(&underline_runs, anchor);

    let plan = whitespace::scan_plan(candidate.field_type, raster, anchor, config);
    let whitespace = whitespace::scan(raster, &plan, config.darkness_threshold);

    let text_height_estimate =
        text_height::estimate_text_height(raster, anchor, underline.map(|u| u.row), config);

    tracing::trace!(
        label = %candidate.label,
        runs = underline_runs.len(),
        underline = ?underline,
        text_height = ?text_height_estimate,
        "pixel signal"
    );

    PixelSignal {
        underline_runs,
        underline,
        whitespace,
        text_height_estimate,
    }
}

#[cfg(test)]
mod tests {
    use super::analyze;
    use crate::config::SizingConfig;
    use crate::geometry::NormBox;
    use crate::model::{FieldCandidate, FieldType};
    use crate::raster::{PageRaster, PixelRect};

    #[test]
    fn analysis_is_repeatable() {
        let mut raster = PageRaster::blank(500, 500, 100).unwrap();
        raster.fill_rect(
            PixelRect {
                x0: 50,
                y0: 112,
                x1: 300,
                y1: 113,
            },
            0,
        );
        let candidate = FieldCandidate::new(
            "Name",
            FieldType::Text,
            1,
            NormBox::new(0.1, 0.2, 0.1, 0.02),
        );
        let config = SizingConfig::default();
        let a = analyze(&raster, &candidate, &config);
        let b = analyze(&raster, &candidate, &config);
        assert_eq!(a, b);
        assert_eq!(a.underline.map(|u| u.row), Some(112));
    }

    #[test]
    fn blank_page_yields_no_underline() {
        let raster = PageRaster::blank(500, 500, 100).unwrap();
        let candidate = FieldCandidate::new(
            "Name",
            FieldType::Text,
            1,
            NormBox::new(0.1, 0.2, 0.1, 0.02),
        );
        let signal = analyze(&raster, &candidate, &SizingConfig::default());
        assert!(signal.underline_runs.is_empty());
        assert!(signal.underline.is_none());
        assert!(signal.text_height_estimate.is_none());
        assert!(!signal.whitespace.any_boundary());
    }
}
