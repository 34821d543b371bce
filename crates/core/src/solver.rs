//! Geometry solving: one raw box per candidate from its pixel signal.
//!
//! Every policy works in normalized page coordinates. Pixel measurements are
//! converted with the raster's own dimensions, and the result is always fitted
//! onto the page with width and height at least `min_field_size`.

use crate::analysis::PixelSignal;
use crate::config::SizingConfig;
use crate::geometry::{NormBox, fit_span};
use crate::model::{Degradation, FieldCandidate, FieldType, SizedField};
use crate::raster::PageRaster;

/// Box edges before page fitting, plus whether pixels backed them.
struct RawBox {
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
    evidence: bool,
}

/// Computes the raw sized field for one candidate.
///
/// Never fails: a box without pixel support, or one that had to be clamped,
/// is still emitted and carries [`Degradation`] markers.
pub fn solve(
    raster: &PageRaster,
    candidate: &FieldCandidate,
    signal: &PixelSignal,
    config: &SizingConfig,
) -> SizedField {
    let text_px = text_unit_px(raster, candidate, signal, config);
    let raw = match candidate.field_type {
        FieldType::Text
        | FieldType::Number
        | FieldType::Date
        | FieldType::Email
        | FieldType::Phone => single_line(raster, candidate, signal, text_px, config),
        FieldType::Dropdown => dropdown(raster, candidate, signal, text_px, config),
        FieldType::Textarea => textarea(raster, candidate, signal, text_px, config),
        FieldType::Checkbox | FieldType::Radio => toggle(raster, signal, text_px),
        FieldType::Signature => signature(raster, candidate, signal, text_px, config),
    };

    let floor = config.min_field_size;
    let x = fit_span(raw.left, raw.right, floor);
    let y = fit_span(raw.top, raw.bottom, floor);
    let bbox = NormBox::from_edges(x.start, y.start, x.end, y.end);

    let mut degradations = Vec::new();
    if !raw.evidence {
        degradations.push(Degradation::NoPixelEvidence);
    }
    if x.clamped || y.clamped {
        degradations.push(Degradation::ClampedToPage);
    }
    if x.collapsed || y.collapsed {
        degradations.push(Degradation::CollapsedSize);
    }
    if !degradations.is_empty() {
        tracing::debug!(
            label = %candidate.label,
            page = candidate.page,
            ?degradations,
            "field sized without strong evidence"
        );
    }

    SizedField {
        candidate: candidate.clone(),
        bbox,
        adjusted: false,
        degradations,
        residual_overlap: 0.0,
    }
}

/// Text height in pixels: the measured estimate, else the anchor's height
/// (never below the configured default glyph height). Toggle anchors fall
/// back to their shorter side.
fn text_unit_px(
    raster: &PageRaster,
    candidate: &FieldCandidate,
    signal: &PixelSignal,
    config: &SizingConfig,
) -> f64 {
    if let Some(px) = signal.text_height_estimate {
        return px;
    }
    let anchor = raster.px_rect(&candidate.anchor_box);
    let anchor_px = if candidate.field_type.is_toggle() {
        anchor.width().min(anchor.height())
    } else {
        anchor.height()
    };
    f64::from(anchor_px).max(config.scale_px(config.default_text_height_px, raster.dpi()))
}

fn single_line(
    raster: &PageRaster,
    candidate: &FieldCandidate,
    signal: &PixelSignal,
    text_px: f64,
    config: &SizingConfig,
) -> RawBox {
    let line_h = raster.norm_y(text_px * config.padding_factor);
    if let Some(u) = signal.underline {
        let bottom = raster.norm_y(f64::from(u.row));
        return RawBox {
            left: raster.norm_x(f64::from(u.x0)),
            top: bottom - line_h,
            right: raster.norm_x(f64::from(u.x1)),
            bottom,
            evidence: true,
        };
    }

    let anchor = &candidate.anchor_box;
    let ws = &signal.whitespace;
    let right = (anchor.right() + raster.norm_x(f64::from(ws.right.extent)))
        .min(anchor.left + config.max_inline_width);
    let (_, cy) = anchor.center();
    RawBox {
        left: anchor.left,
        top: cy - line_h / 2.0,
        right,
        bottom: cy + line_h / 2.0,
        evidence: ws.right.found_boundary(),
    }
}

fn dropdown(
    raster: &PageRaster,
    candidate: &FieldCandidate,
    signal: &PixelSignal,
    text_px: f64,
    config: &SizingConfig,
) -> RawBox {
    let mut raw = single_line(raster, candidate, signal, text_px, config);
    let longest = candidate
        .options
        .iter()
        .map(|o| o.chars().count())
        .max()
        .unwrap_or(0);
    if longest > 0 {
        // two extra glyphs leave room for the drop arrow
        let floor_px = (longest + 2) as f64 * config.char_width_factor * text_px;
        let floor = raster.norm_x(floor_px);
        if raw.right - raw.left < floor {
            raw.right = raw.left + floor;
        }
    }
    raw
}

fn textarea(
    raster: &PageRaster,
    candidate: &FieldCandidate,
    signal: &PixelSignal,
    text_px: f64,
    config: &SizingConfig,
) -> RawBox {
    let anchor = &candidate.anchor_box;
    let ws = &signal.whitespace;
    let limit = 1.0 - config.page_margin;
    let right = (anchor.right() + raster.norm_x(f64::from(ws.right.extent)))
        .min(limit)
        .max(anchor.right().min(limit));
    let min_h = raster.norm_y(text_px * config.padding_factor) * config.textarea_min_lines;
    let bottom = (anchor.bottom() + raster.norm_y(f64::from(ws.down.extent)))
        .min(limit)
        .max(anchor.top + min_h);
    RawBox {
        left: anchor.left,
        top: anchor.top,
        right,
        bottom,
        evidence: ws.right.found_boundary() || ws.down.found_boundary(),
    }
}

fn toggle(raster: &PageRaster, signal: &PixelSignal, text_px: f64) -> RawBox {
    let ws = &signal.whitespace;
    let seed = ws.seed;
    let avail_w = seed.width() + 2 * ws.left.extent.min(ws.right.extent);
    let avail_h = seed.height() + 2 * ws.up.extent.min(ws.down.extent);
    let side = text_px.min(f64::from(avail_w)).min(f64::from(avail_h)).max(1.0);
    let cx = (f64::from(seed.x0) + f64::from(seed.x1)) / 2.0;
    let cy = (f64::from(seed.y0) + f64::from(seed.y1)) / 2.0;
    RawBox {
        left: raster.norm_x(cx - side / 2.0),
        top: raster.norm_y(cy - side / 2.0),
        right: raster.norm_x(cx + side / 2.0),
        bottom: raster.norm_y(cy + side / 2.0),
        evidence: ws.any_boundary(),
    }
}

fn signature(
    raster: &PageRaster,
    candidate: &FieldCandidate,
    signal: &PixelSignal,
    text_px: f64,
    config: &SizingConfig,
) -> RawBox {
    let height =
        raster.norm_y(text_px * config.padding_factor) * config.signature_height_lines;
    let anchor = &candidate.anchor_box;
    let mut raw = match signal.underline {
        Some(u) => {
            let bottom = raster.norm_y(f64::from(u.row));
            RawBox {
                left: raster.norm_x(f64::from(u.x0)),
                top: bottom - height,
                right: raster.norm_x(f64::from(u.x1)),
                bottom,
                evidence: true,
            }
        }
        None => {
            let ws = &signal.whitespace;
            let right = (anchor.right() + raster.norm_x(f64::from(ws.right.extent)))
                .min(1.0 - config.page_margin);
            let (_, cy) = anchor.center();
            RawBox {
                left: anchor.left,
                top: cy - height / 2.0,
                right,
                bottom: cy + height / 2.0,
                evidence: ws.right.found_boundary(),
            }
        }
    };
    if raw.right - raw.left < config.signature_min_width {
        raw.right = raw.left + config.signature_min_width;
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::solve;
    use crate::analysis::analyze;
    use crate::config::SizingConfig;
    use crate::geometry::NormBox;
    use crate::model::{Degradation, FieldCandidate, FieldType};
    use crate::raster::{PageRaster, PixelRect};

    fn rect(x0: u32, y0: u32, x1: u32, y1: u32) -> PixelRect {
        PixelRect { x0, y0, x1, y1 }
    }

    fn size(raster: &PageRaster, candidate: &FieldCandidate) -> crate::model::SizedField {
        let config = SizingConfig::default();
        let signal = analyze(raster, candidate, &config);
        solve(raster, candidate, &signal, &config)
    }

    #[test]
    fn text_without_underline_extends_to_obstruction() {
        let mut raster = PageRaster::blank(1000, 1000, 100).unwrap();
        raster.fill_rect(rect(450, 200, 460, 220), 0);
        let candidate = FieldCandidate::new(
            "City",
            FieldType::Text,
            1,
            NormBox::new(0.15, 0.20, 0.10, 0.02),
        );
        let field = size(&raster, &candidate);
        assert!((field.bbox.left - 0.15).abs() < 1e-9);
        assert!((field.bbox.right() - 0.45).abs() < 1e-9);
        assert!(!field.degraded());
        // 20 px anchor fallback text height, padded by 1.5
        assert!((field.bbox.height - 0.03).abs() < 1e-9);
    }

    #[test]
    fn sparse_page_caps_inline_width() {
        let raster = PageRaster::blank(1000, 1000, 100).unwrap();
        let candidate = FieldCandidate::new(
            "City",
            FieldType::Text,
            1,
            NormBox::new(0.10, 0.20, 0.10, 0.02),
        );
        let field = size(&raster, &candidate);
        assert!((field.bbox.width - 0.5).abs() < 1e-9);
        assert_eq!(field.degradations, vec![Degradation::NoPixelEvidence]);
    }

    #[test]
    fn textarea_enforces_minimum_height() {
        let mut raster = PageRaster::blank(1000, 1000, 100).unwrap();
        // obstruction right below the label
        raster.fill_rect(rect(0, 225, 1000, 235), 0);
        let candidate = FieldCandidate::new(
            "Comments",
            FieldType::Textarea,
            1,
            NormBox::new(0.10, 0.20, 0.20, 0.02),
        );
        let field = size(&raster, &candidate);
        // three padded 20 px lines
        assert!((field.bbox.height - 0.09).abs() < 1e-9);
        assert!((field.bbox.right() - 0.98).abs() < 1e-9);
    }

    #[test]
    fn dropdown_width_fits_longest_option() {
        let mut raster = PageRaster::blank(1000, 1000, 100).unwrap();
        raster.fill_rect(rect(260, 200, 270, 220), 0);
        let candidate = FieldCandidate::new(
            "Country",
            FieldType::Dropdown,
            1,
            NormBox::new(0.20, 0.20, 0.05, 0.02),
        )
        .with_options(vec!["US".into(), "United Kingdom".into()]);
        let field = size(&raster, &candidate);
        // (14 + 2) glyphs * 0.6 * 20 px = 192 px
        assert!((field.bbox.width - 0.192).abs() < 1e-9);
    }

    #[test]
    fn signature_gets_wide_floor() {
        let mut raster = PageRaster::blank(1000, 1000, 100).unwrap();
        raster.fill_rect(rect(300, 500, 320, 520), 0);
        let candidate = FieldCandidate::new(
            "Signature",
            FieldType::Signature,
            1,
            NormBox::new(0.20, 0.50, 0.05, 0.02),
        );
        let field = size(&raster, &candidate);
        assert!((field.bbox.width - 0.2).abs() < 1e-9);
        assert!((field.bbox.height - 0.06).abs() < 1e-9);
    }

    #[test]
    fn radio_is_square() {
        let raster = PageRaster::blank(1000, 1000, 100).unwrap();
        let candidate = FieldCandidate::new(
            "Yes",
            FieldType::Radio,
            1,
            NormBox::new(0.30, 0.30, 0.03, 0.015),
        );
        let field = size(&raster, &candidate);
        assert!((field.bbox.width - field.bbox.height).abs() < 1e-9);
        assert!((field.bbox.width - 0.015).abs() < 1e-9);
    }
}
