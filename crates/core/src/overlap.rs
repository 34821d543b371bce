//! Cross-field overlap resolution for one page.
//!
//! Runs after every field on the page has been sized. Fields are visited in
//! reading order (top, then left); each field is separated from the fields
//! visited before it by shrinking or translating it, never the other way
//! round. A move is only accepted when it does not increase the field's
//! intersection with any other field beyond what the solver's raw boxes had,
//! so resolution never makes a pairwise overlap worse.

use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::config::SizingConfig;
use crate::geometry::{Axis, GEOM_EPSILON, NormBox};
use crate::model::SizedField;

/// Passes over the earlier fields before settling for a residual overlap.
const MAX_PASSES: usize = 3;

/// Resolves pairwise overlaps between the fields of one page.
///
/// The output has one record per input record, in input order. Records whose
/// box changed, or that still overlap an earlier field, come back with
/// `adjusted = true` and the remaining intersection area.
pub fn resolve_overlaps(fields: &[SizedField], config: &SizingConfig) -> Vec<SizedField> {
    let raw: Vec<NormBox> = fields.iter().map(|f| f.bbox).collect();
    let mut current = raw.clone();
    let mut residual = vec![0.0; fields.len()];

    let order: Vec<usize> = (0..fields.len())
        .sorted_by_key(|&i| (OrderedFloat(raw[i].top), OrderedFloat(raw[i].left), i))
        .collect();

    for (k, &i) in order.iter().enumerate() {
        let earlier = &order[..k];
        for _ in 0..MAX_PASSES {
            let mut moved = false;
            for &j in earlier {
                if !current[i].overlaps(&current[j]) {
                    continue;
                }
                if let Some(next) = separate(i, j, &raw, &current, config) {
                    current[i] = next;
                    moved = true;
                }
            }
            if !moved {
                break;
            }
        }
        residual[i] = earlier
            .iter()
            .map(|&j| current[i].intersection_area(&current[j]))
            .sum();
        if residual[i] > 0.0 {
            tracing::warn!(
                label = %fields[i].candidate.label,
                page = fields[i].page(),
                residual = residual[i],
                "overlap left unresolved"
            );
        }
    }

    fields
        .iter()
        .enumerate()
        .map(|(i, f)| f.with_resolution(current[i], residual[i]))
        .collect()
}

/// Finds a new box for field `i` that reduces its overlap with field `j`.
///
/// Tries, along the axis of deepest penetration and then the other axis:
/// shrinking down to the size floor, translating away from `j` within the
/// page margin, and translating then shrinking. The first move that removes
/// the overlap wins; otherwise the move leaving the smallest intersection.
fn separate(
    i: usize,
    j: usize,
    raw: &[NormBox],
    current: &[NormBox],
    config: &SizingConfig,
) -> Option<NormBox> {
    let me = current[i];
    let other = current[j];
    let overlap = me.intersection(&other)?;

    let fx = overlap.width / me.width;
    let fy = overlap.height / me.height;
    let deep = if fx >= fy {
        Axis::Horizontal
    } else {
        Axis::Vertical
    };

    let mut best: Option<(NormBox, f64)> = None;
    let before = overlap.area();
    for axis in [deep, deep.other()] {
        let floor = config.min_field_size.min(raw[i].extent(axis));
        let moves = [
            shrink(&me, &other, axis, floor),
            translate(&me, &other, axis, config.page_margin),
            translate(&me, &other, axis, config.page_margin)
                .and_then(|t| shrink(&t, &other, axis, floor)),
        ];
        for cand in moves.into_iter().flatten() {
            if !is_acceptable(i, &cand, raw, current) {
                continue;
            }
            let left = cand.intersection_area(&other);
            if left == 0.0 {
                return Some(cand);
            }
            if left + GEOM_EPSILON < before && best.is_none_or(|(_, b)| left < b) {
                best = Some((cand, left));
            }
        }
    }
    best.map(|(b, _)| b)
}

/// Cuts the side of `me` facing `other`, keeping at least `floor`.
fn shrink(me: &NormBox, other: &NormBox, axis: Axis, floor: f64) -> Option<NormBox> {
    let (start, end) = (me.start(axis), me.end(axis));
    let (s, e) = if after(me, other, axis) {
        let s = other.end(axis).max(start);
        (s.min(end - floor), end)
    } else {
        let e = other.start(axis).min(end);
        (start, e.max(start + floor))
    };
    let cand = me.with_span(axis, s, e);
    (cand != *me).then_some(cand)
}

/// Moves `me` just past `other`, stopping at the page margin.
fn translate(me: &NormBox, other: &NormBox, axis: Axis, margin: f64) -> Option<NormBox> {
    let len = me.extent(axis);
    let lo = margin.min(me.start(axis)).max(0.0);
    let hi = (1.0 - margin).max(me.end(axis)).min(1.0);
    if hi - lo < len {
        return None;
    }
    let start = if after(me, other, axis) {
        other.end(axis).min(hi - len)
    } else {
        (other.start(axis) - len).max(lo)
    };
    let cand = me.with_span(axis, start, start + len);
    (cand != *me).then_some(cand)
}

/// True when `me` lies after `other` along the axis, judged by centres.
fn after(me: &NormBox, other: &NormBox, axis: Axis) -> bool {
    let (mx, my) = me.center();
    let (ox, oy) = other.center();
    match axis {
        Axis::Horizontal => mx >= ox,
        Axis::Vertical => my >= oy,
    }
}

/// A candidate stays on the page and overlaps no field more than the raw
/// boxes did.
fn is_acceptable(i: usize, cand: &NormBox, raw: &[NormBox], current: &[NormBox]) -> bool {
    cand.is_within_page()
        && current.iter().enumerate().all(|(m, other)| {
            m == i
                || cand.intersection_area(other)
                    <= raw[i].intersection_area(&raw[m]) + GEOM_EPSILON
        })
}
