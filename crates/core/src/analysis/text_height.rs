//! Text height estimation from vertical run lengths.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::config::SizingConfig;
use crate::raster::{PageRaster, PixelRect};

/// Share of band columns a row must ink to count as a horizontal rule.
const RULE_FILL: f64 = 0.9;

/// Estimates the dominant glyph height near the anchor, in pixels.
///
/// Samples a narrow column band at the anchor's left edge, spanning half an
/// anchor height above and below it (cut off at `limit_y`, usually the
/// underline). Rows inked across nearly the whole band are horizontal rules,
/// not glyphs, and read as background. Vertical dark runs no longer than the
/// noise floor are dropped; the modal remaining run length wins, larger on
/// ties. Returns `None` when nothing survives.
pub(crate) fn estimate_text_height(
    raster: &PageRaster,
    anchor: PixelRect,
    limit_y: Option<u32>,
    config: &SizingConfig,
) -> Option<f64> {
    if anchor.is_empty() {
        return None;
    }
    let noise = config.scale_px(config.noise_floor_px, raster.dpi());
    let band_w = ((f64::from(anchor.width()) * config.text_band_fraction).round() as u32).max(1);
    let x0 = anchor.x0;
    let x1 = (anchor.x0 + band_w).min(raster.width());
    let half = anchor.height() / 2;
    let y0 = anchor.y0.saturating_sub(half);
    let mut y1 = (anchor.y1 + half).min(raster.height());
    if let Some(limit) = limit_y {
        y1 = y1.min(limit.max(anchor.y0));
    }

    let threshold = config.darkness_threshold;
    let rules = rule_rows(raster, x0..x1, y0..y1, threshold);
    let mut histogram: BTreeMap<u32, u32> = BTreeMap::new();
    for x in x0..x1 {
        let mut run = 0u32;
        for y in y0..y1 {
            if !rules[(y - y0) as usize] && raster.is_dark(x, y, threshold) {
                run += 1;
            } else {
                record_run(&mut histogram, run, noise);
                run = 0;
            }
        }
        record_run(&mut histogram, run, noise);
    }

    histogram
        .into_iter()
        .max_by_key(|&(len, count)| (count, len))
        .map(|(len, _)| f64::from(len))
}

/// Marks the rows of the band that are dark in at least [`RULE_FILL`] of its
/// columns. A one column band has no rules.
fn rule_rows(raster: &PageRaster, xs: Range<u32>, ys: Range<u32>, threshold: u8) -> Vec<bool> {
    let width = xs.len();
    if width < 2 {
        return vec![false; ys.len()];
    }
    let needed = (width as f64 * RULE_FILL).ceil() as usize;
    ys.map(|y| {
        let row = &raster.row(y)[xs.start as usize..xs.end as usize];
        row.iter().filter(|&&luma| luma < threshold).count() >= needed
    })
    .collect()
}

fn record_run(histogram: &mut BTreeMap<u32, u32>, run: u32, noise: f64) {
    if run > 0 && f64::from(run) > noise {
        *histogram.entry(run).or_default() += 1;
    }
}
