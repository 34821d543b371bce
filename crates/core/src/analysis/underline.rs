//! Underline detection.
//!
//! Scans the rows of a band around the anchor's bottom edge for long
//! horizontal runs of ink, the printed fill-in lines of a paper form.

use std::cmp::Reverse;

use smallvec::SmallVec;

use crate::config::SizingConfig;
use crate::raster::{PageRaster, PixelRect};

/// Horizontal dark run `[x0, x1)` on one pixel row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UnderlineRun {
    pub row: u32,
    pub x0: u32,
    pub x1: u32,
}

impl UnderlineRun {
    pub fn len(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn is_empty(&self) -> bool {
        self.x1 <= self.x0
    }

    fn overlaps_columns(&self, x0: u32, x1: u32) -> bool {
        self.x0 < x1 && x0 < self.x1
    }
}

pub type UnderlineRuns = SmallVec<[UnderlineRun; 4]>;

/// Rows searched for underlines: from the anchor's vertical middle down to
/// `underline_band_factor` anchor heights below its bottom edge.
pub(crate) fn search_band(
    raster: &PageRaster,
    anchor: PixelRect,
    config: &SizingConfig,
) -> (u32, u32) {
    let h = anchor.height();
    let below = (f64::from(h) * config.underline_band_factor).ceil() as u32;
    let y0 = anchor.y0 + h / 2;
    let y1 = anchor.y1.saturating_add(below).min(raster.height());
    (y0.min(y1), y1)
}

/// Collects every qualifying run in the band, ordered by row then column.
///
/// A run qualifies when it is at least `underline_min_run_fraction` of the
/// anchor width long and reaches into the anchor's columns or the stretch of
/// the same width just right of it.
pub(crate) fn find_underline_runs(
    raster: &PageRaster,
    anchor: PixelRect,
    config: &SizingConfig,
) -> UnderlineRuns {
    let mut runs = UnderlineRuns::new();
    if anchor.is_empty() {
        return runs;
    }
    let min_len = (f64::from(anchor.width()) * config.underline_min_run_fraction).ceil() as u32;
    let min_len = min_len.max(2);
    let reach_x1 = anchor.x1.saturating_add(anchor.width()).min(raster.width());
    let (y0, y1) = search_band(raster, anchor, config);
    let threshold = config.darkness_threshold;

    for y in y0..y1 {
        let row = raster.row(y);
        let mut start: Option<u32> = None;
        for (x, &luma) in row.iter().enumerate() {
            let x = x as u32;
            if luma < threshold {
                start.get_or_insert(x);
            } else if let Some(s) = start.take() {
                push_if_qualifies(&mut runs, y, s, x, min_len, anchor.x0, reach_x1);
            }
        }
        if let Some(s) = start {
            push_if_qualifies(&mut runs, y, s, raster.width(), min_len, anchor.x0, reach_x1);
        }
    }
    runs
}

fn push_if_qualifies(
    runs: &mut UnderlineRuns,
    row: u32,
    x0: u32,
    x1: u32,
    min_len: u32,
    reach_x0: u32,
    reach_x1: u32,
) {
    let run = UnderlineRun { row, x0, x1 };
    if run.len() >= min_len && run.overlaps_columns(reach_x0, reach_x1) {
        runs.push(run);
    }
}

/// Picks the underline: the run closest to the anchor's bottom edge, the
/// longer one on ties. A line several pixels thick is reported by its top
/// row so that the field sits on top of the ink.
///
/// The band reaches below the anchor, so on a tightly spaced form it can
/// also hold the next row's line; that line must never win over a nearer one.
pub(crate) fn select_underline(runs: &[UnderlineRun], anchor: PixelRect) -> Option<UnderlineRun> {
    let best = runs
        .iter()
        .copied()
        .min_by_key(|r| (r.row.abs_diff(anchor.y1), Reverse(r.len()), r.row))?;

    let mut top = best;
    while let Some(above) = runs
        .iter()
        .find(|r| r.row + 1 == top.row && r.overlaps_columns(top.x0, top.x1))
    {
        top = UnderlineRun {
            row: above.row,
            x0: best.x0,
            x1: best.x1,
        };
    }
    Some(top)
}
