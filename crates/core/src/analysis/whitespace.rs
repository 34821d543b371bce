//! White-space scanning.
//!
//! Starting from a seed region, each of the four directions is scanned
//! independently, one pixel line at a time, until the line holds enough ink
//! to count as an obstruction, the page edge is reached, or the scan runs out
//! of reach.

use crate::config::SizingConfig;
use crate::model::FieldType;
use crate::raster::{PageRaster, PixelRect};

/// Why a directional scan stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScanStop {
    /// Ink was found; the extent is a real boundary.
    Obstruction,
    /// The page edge was reached first.
    PageEdge,
    /// The configured reach was exhausted.
    ReachLimit,
}

/// Result of scanning one direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DirectionScan {
    /// Free pixels between the seed edge and the stop.
    pub extent: u32,
    pub stop: ScanStop,
}

impl DirectionScan {
    /// A boundary backed by ink at a non-zero distance.
    pub fn found_boundary(&self) -> bool {
        self.stop == ScanStop::Obstruction && self.extent > 0
    }
}

/// Free space around a seed region, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WhitespaceExtent {
    pub seed: PixelRect,
    pub left: DirectionScan,
    pub right: DirectionScan,
    pub up: DirectionScan,
    pub down: DirectionScan,
}

impl WhitespaceExtent {
    pub fn any_boundary(&self) -> bool {
        [self.left, self.right, self.up, self.down]
            .iter()
            .any(DirectionScan::found_boundary)
    }
}

/// Where and how a field type scans.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ScanPlan {
    pub seed: PixelRect,
    /// Rows inspected by the left and right scans.
    pub rows: (u32, u32),
    /// Columns inspected by the up and down scans.
    pub cols: (u32, u32),
    /// Dark pixels a scan line needs before it obstructs.
    pub min_dark: u32,
    pub reach_x: u32,
    pub reach_y: u32,
}

/// Builds the scan plan for a field type.
///
/// Toggles grow from a small seed at the anchor centre and stop at any ink.
/// Signatures inspect a band three anchor-heights tall. Other types scan from
/// the anchor edges and ignore lines thinner than the noise floor, so an
/// underline crossing the band does not end a horizontal scan.
pub(crate) fn scan_plan(
    field_type: FieldType,
    raster: &PageRaster,
    anchor: PixelRect,
    config: &SizingConfig,
) -> ScanPlan {
    let noise = config
        .scale_px(config.noise_floor_px, raster.dpi())
        .round()
        .max(1.0) as u32;
    let page_reach_x = raster.width();
    let page_reach_y = raster.height();

    match field_type {
        FieldType::Checkbox | FieldType::Radio => {
            let side = (anchor.width().min(anchor.height()) / 4).max(1);
            let x0 = anchor.x0 + (anchor.width().saturating_sub(side)) / 2;
            let y0 = anchor.y0 + (anchor.height().saturating_sub(side)) / 2;
            let seed = PixelRect {
                x0,
                y0,
                x1: (x0 + side).min(raster.width()),
                y1: (y0 + side).min(raster.height()),
            };
            ScanPlan {
                seed,
                rows: (seed.y0, seed.y1),
                cols: (seed.x0, seed.x1),
                min_dark: 1,
                reach_x: page_reach_x,
                reach_y: page_reach_y,
            }
        }
        FieldType::Signature => {
            let h = anchor.height();
            ScanPlan {
                seed: anchor,
                rows: (anchor.y0.saturating_sub(h), (anchor.y1 + h).min(raster.height())),
                cols: (anchor.x0, anchor.x1),
                min_dark: noise + 1,
                reach_x: page_reach_x,
                reach_y: page_reach_y,
            }
        }
        FieldType::Textarea => ScanPlan {
            seed: anchor,
            rows: (anchor.y0, anchor.y1),
            cols: (anchor.x0, anchor.x1),
            min_dark: noise + 1,
            reach_x: page_reach_x,
            reach_y: page_reach_y,
        },
        _ => ScanPlan {
            seed: anchor,
            rows: (anchor.y0, anchor.y1),
            cols: (anchor.x0, anchor.x1),
            min_dark: noise + 1,
            reach_x: (f64::from(raster.width()) * config.max_inline_width).round() as u32,
            reach_y: page_reach_y,
        },
    }
}

/// Scans all four directions of a plan.
pub(crate) fn scan(raster: &PageRaster, plan: &ScanPlan, threshold: u8) -> WhitespaceExtent {
    let seed = plan.seed;
    let (r0, r1) = plan.rows;
    let (c0, c1) = plan.cols;

    let column_dark = |x: u32| (r0..r1).filter(|&y| raster.is_dark(x, y, threshold)).count() as u32;
    let row_dark = |y: u32| (c0..c1).filter(|&x| raster.is_dark(x, y, threshold)).count() as u32;

    let right = walk(
        (seed.x1..raster.width()).map(column_dark),
        plan.min_dark,
        plan.reach_x,
    );
    let left = walk(
        (0..seed.x0).rev().map(column_dark),
        plan.min_dark,
        plan.reach_x,
    );
    let down = walk(
        (seed.y1..raster.height()).map(row_dark),
        plan.min_dark,
        plan.reach_y,
    );
    let up = walk((0..seed.y0).rev().map(row_dark), plan.min_dark, plan.reach_y);

    WhitespaceExtent {
        seed,
        left,
        right,
        up,
        down,
    }
}

fn walk(lines: impl Iterator<Item = u32>, min_dark: u32, reach: u32) -> DirectionScan {
    let mut extent = 0;
    for dark in lines {
        if extent >= reach {
            return DirectionScan {
                extent,
                stop: ScanStop::ReachLimit,
            };
        }
        if dark >= min_dark {
            return DirectionScan {
                extent,
                stop: ScanStop::Obstruction,
            };
        }
        extent += 1;
    }
    DirectionScan {
        extent,
        stop: ScanStop::PageEdge,
    }
}
