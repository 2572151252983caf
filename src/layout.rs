//! Justified grid layout.
//!
//! Packs a sequence of items with known aspect ratios into rows that exactly
//! span a fixed container width. Every row is scaled to a common height, so
//! items keep their aspect ratio and the right edge of the grid is flush.
//!
//! ## Algorithm
//!
//! 1. **Fill**: walk the items in order, sizing each at the target row height
//!    (`round(row_height * aspect)`). When the next item plus the gaps would
//!    overflow the container, close the current row. A row always takes at
//!    least one item, however wide.
//! 2. **Justify**: a closed row of aspect ratios `a_i` gets height
//!    `h = (container_width - gap * (n - 1)) / Σ a_i` and widths
//!    `round(h * a_i)`.
//! 3. **Round off**: in rows of two or more items, the last item absorbs the
//!    rounding error so `Σ width + gaps == container_width` exactly.
//! 4. **Last row**: a lone trailing item is never stretched; it is shown at
//!    `min(max_trailing_width, row_height * aspect)`. A trailing row of several
//!    items after at least one full row has its height capped at `row_height`;
//!    when the cap bites the row stays narrower than the container and skips
//!    the round-off. A layout that fits in one row is justified like a full row.
//!
//! Items with a zero height are laid out as squares.
//!
//! ```
//! use folder_gal::layout::{LayoutParams, justify};
//! use folder_gal::media::Dimensions;
//!
//! let items = [
//!     Dimensions { width: 1600, height: 900 },
//!     Dimensions { width: 800, height: 800 },
//!     Dimensions { width: 1200, height: 600 },
//! ];
//! let sizes = justify(&items, &LayoutParams::default());
//! let total: u32 = sizes.iter().map(|s| s.width).sum::<u32>() + 2 * 8;
//! assert_eq!(total, 1200);
//! ```

use crate::media::Dimensions;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Geometry of the grid being laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutParams {
    /// Width every full row must span, gaps included.
    pub container_width: u32,
    /// Height items are sized at while filling rows.
    pub row_height: u32,
    /// Horizontal gap between neighbouring items.
    pub gap: u32,
    /// Widest a single item in the final row may be shown.
    pub max_trailing_width: u32,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            container_width: 1200,
            row_height: 200,
            gap: 8,
            max_trailing_width: 400,
        }
    }
}

impl LayoutParams {
    /// Same geometry with a different container width (e.g. the client's viewport).
    pub fn with_container_width(self, container_width: u32) -> Self {
        Self {
            container_width,
            ..self
        }
    }
}

/// Size an item is rendered at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenderedSize {
    pub width: u32,
    pub height: u32,
}

/// Aspect ratio (width / height); a zero height counts as square.
pub fn aspect_ratio(dims: Dimensions) -> f64 {
    if dims.height == 0 {
        1.0
    } else {
        dims.width as f64 / dims.height as f64
    }
}

/// Lay out `items` in order, returning one rendered size per item.
pub fn justify(items: &[Dimensions], params: &LayoutParams) -> Vec<RenderedSize> {
    let ratios: Vec<f64> = items.iter().map(|d| aspect_ratio(*d)).collect();
    let rows = break_rows(&ratios, params);
    let last = rows.len().saturating_sub(1);

    let mut sizes = Vec::with_capacity(items.len());
    for (index, row) in rows.into_iter().enumerate() {
        let row_ratios = &ratios[row];
        if index == last {
            sizes.extend(justify_last_row(row_ratios, params, index > 0));
        } else {
            sizes.extend(justify_row(row_ratios, params, None));
        }
    }
    sizes
}

/// Split items into rows by greedy filling at the target row height.
///
/// Returns index ranges into `ratios`; every range is non-empty and the
/// ranges cover all items in order.
pub fn break_rows(ratios: &[f64], params: &LayoutParams) -> Vec<Range<usize>> {
    let container = params.container_width as i64;
    let gap = params.gap as i64;
    let target = params.row_height as f64;

    let mut rows = Vec::new();
    let mut start = 0;
    let mut row_width: i64 = 0;

    for (i, &ratio) in ratios.iter().enumerate() {
        let width = (target * ratio).round() as i64;
        let placed = (i - start) as i64;

        if placed > 0 && row_width + width + gap * placed > container {
            rows.push(start..i);
            start = i;
            row_width = width;
        } else {
            row_width += width;
        }
    }

    if start < ratios.len() {
        rows.push(start..ratios.len());
    }
    rows
}

/// Scale one row so it spans the container, optionally capping its height.
/// A capped row keeps `round(h * aspect)` for every item and ends short.
fn justify_row(
    ratios: &[f64],
    params: &LayoutParams,
    max_height: Option<f64>,
) -> Vec<RenderedSize> {
    let n = ratios.len();
    let available = params.container_width as i64 - params.gap as i64 * (n as i64 - 1);
    let total: f64 = ratios.iter().sum();

    let mut height = if total > 0.0 {
        available as f64 / total
    } else {
        params.row_height as f64
    };
    let mut capped = false;
    if let Some(cap) = max_height {
        if height > cap {
            height = cap;
            capped = true;
        }
    }

    let rendered_height = px(height.round());
    let mut sizes: Vec<RenderedSize> = ratios
        .iter()
        .map(|ratio| RenderedSize {
            width: px((height * ratio).round()),
            height: rendered_height,
        })
        .collect();

    if n > 1 && !capped {
        let used: i64 = sizes[..n - 1].iter().map(|s| s.width as i64).sum();
        sizes[n - 1].width = (available - used).max(0) as u32;
    }
    sizes
}

fn justify_last_row(
    ratios: &[f64],
    params: &LayoutParams,
    follows_rows: bool,
) -> Vec<RenderedSize> {
    if let [ratio] = ratios {
        let natural = params.row_height as f64 * ratio;
        let width = natural.min(params.max_trailing_width as f64).floor();
        let height = if *ratio > 0.0 {
            (width / ratio).round()
        } else {
            params.row_height as f64
        };
        return vec![RenderedSize {
            width: px(width),
            height: px(height),
        }];
    }
    let cap = follows_rows.then_some(params.row_height as f64);
    justify_row(ratios, params, cap)
}

/// Float → pixel count. Negative and NaN become 0.
fn px(value: f64) -> u32 {
    value as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    fn row_span(sizes: &[RenderedSize], gap: u32) -> u32 {
        sizes.iter().map(|s| s.width).sum::<u32>() + gap * (sizes.len() as u32 - 1)
    }

    /// A mixed sequence long enough to produce several rows.
    fn mixed_items() -> Vec<Dimensions> {
        vec![
            dims(1600, 900),
            dims(800, 800),
            dims(1200, 600),
            dims(600, 900),
            dims(4000, 3000),
            dims(1080, 1920),
            dims(3000, 2000),
            dims(500, 500),
            dims(2048, 1536),
            dims(1920, 1080),
            dims(900, 1200),
            dims(1000, 1000),
        ]
    }

    // =========================================================================
    // Shape
    // =========================================================================

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(justify(&[], &LayoutParams::default()).is_empty());
        assert!(break_rows(&[], &LayoutParams::default()).is_empty());
    }

    #[test]
    fn output_has_one_size_per_item() {
        let items = mixed_items();
        for n in 1..=items.len() {
            let sizes = justify(&items[..n], &LayoutParams::default());
            assert_eq!(sizes.len(), n);
        }
    }

    #[test]
    fn rows_cover_items_in_order() {
        let items = mixed_items();
        let ratios: Vec<f64> = items.iter().map(|d| aspect_ratio(*d)).collect();
        let rows = break_rows(&ratios, &LayoutParams::default());

        assert!(rows.len() > 1);
        let mut expected_start = 0;
        for row in &rows {
            assert_eq!(row.start, expected_start);
            assert!(!row.is_empty());
            expected_start = row.end;
        }
        assert_eq!(expected_start, items.len());
    }

    #[test]
    fn order_is_preserved() {
        // Distinct ratios at the same row position must map to distinct widths
        // in the same order as the input.
        let items = [dims(100, 100), dims(300, 100), dims(200, 100)];
        let sizes = justify(&items, &LayoutParams::default());
        assert!(sizes[0].width < sizes[2].width);
    }

    // =========================================================================
    // Row justification
    // =========================================================================

    #[test]
    fn three_items_share_one_exact_row() {
        // 356 + 200 + 400 plus two gaps = 972 fits in 1200, so one row.
        let items = [dims(1600, 900), dims(800, 800), dims(1200, 600)];
        let params = LayoutParams::default();
        let ratios: Vec<f64> = items.iter().map(|d| aspect_ratio(*d)).collect();
        assert_eq!(break_rows(&ratios, &params), vec![0..3]);

        // The only row is justified in full: h = 1184 / 4.778 ~ 247.8.
        let sizes = justify(&items, &params);
        assert_eq!(row_span(&sizes, params.gap), 1200);
        assert!(sizes.iter().all(|s| s.height == 248));
        assert_eq!(sizes[0].width, 441);
        assert_eq!(sizes[1].width, 248);
        assert_eq!(sizes[2].width, 495);
    }

    #[test]
    fn every_full_row_spans_the_container() {
        let items = mixed_items();
        let params = LayoutParams::default();
        let ratios: Vec<f64> = items.iter().map(|d| aspect_ratio(*d)).collect();
        let rows = break_rows(&ratios, &params);
        let sizes = justify(&items, &params);

        for row in &rows[..rows.len() - 1] {
            assert_eq!(
                row_span(&sizes[row.clone()], params.gap),
                params.container_width,
                "row {row:?} does not span the container"
            );
        }
    }

    #[test]
    fn items_keep_their_aspect_ratio() {
        let items = mixed_items();
        let params = LayoutParams::default();
        let ratios: Vec<f64> = items.iter().map(|d| aspect_ratio(*d)).collect();
        let rows = break_rows(&ratios, &params);
        let sizes = justify(&items, &params);

        for row in &rows {
            // The last item of a row absorbs rounding, so skip it.
            for i in row.start..row.end - 1 {
                let rendered = sizes[i].width as f64 / sizes[i].height as f64;
                assert!(
                    (rendered - ratios[i]).abs() < 0.02,
                    "item {i}: rendered {rendered:.4} vs true {:.4}",
                    ratios[i]
                );
            }
        }
    }

    #[test]
    fn rows_share_a_single_height() {
        let items = mixed_items();
        let params = LayoutParams::default();
        let ratios: Vec<f64> = items.iter().map(|d| aspect_ratio(*d)).collect();
        let sizes = justify(&items, &params);

        for row in break_rows(&ratios, &params) {
            let first = sizes[row.start].height;
            assert!(sizes[row].iter().all(|s| s.height == first));
        }
    }

    #[test]
    fn oversized_item_gets_its_own_row() {
        // A 10:1 panorama is 2000px wide at row height: alone in row one,
        // scaled down to the container with no rounding correction.
        let items = [dims(10000, 1000), dims(1000, 1000)];
        let sizes = justify(&items, &LayoutParams::default());
        assert_eq!(sizes[0], RenderedSize { width: 1200, height: 120 });
    }

    #[test]
    fn gap_is_respected_when_breaking() {
        // Four 300px squares fit in 1200 only without gaps.
        let items = [dims(300, 200); 5];
        let params = LayoutParams {
            gap: 0,
            ..Default::default()
        };
        let ratios: Vec<f64> = items.iter().map(|d| aspect_ratio(*d)).collect();
        assert_eq!(break_rows(&ratios, &params), vec![0..4, 4..5]);

        let with_gap = LayoutParams::default();
        assert_eq!(break_rows(&ratios, &with_gap), vec![0..3, 3..5]);
    }

    // =========================================================================
    // Last row
    // =========================================================================

    #[test]
    fn lone_trailing_item_is_not_stretched() {
        // Three 16:9 items fill a row; the fourth is alone at the end.
        let items = [dims(1600, 900); 4];
        let params = LayoutParams::default();
        let sizes = justify(&items, &params);
        let last = sizes[3];
        let natural = params.row_height as f64 * 1600.0 / 900.0;

        assert!(last.width <= params.max_trailing_width);
        assert!(last.width as f64 <= natural);
        assert_eq!(last.width, 355);
        assert_eq!(last.height, 200);
    }

    #[test]
    fn lone_wide_trailing_item_is_capped() {
        let sizes = justify(&[dims(4000, 1000)], &LayoutParams::default());
        assert_eq!(sizes, vec![RenderedSize { width: 400, height: 100 }]);
    }

    #[test]
    fn short_trailing_row_is_not_taller_than_target() {
        // Trailing row is 16:9 + two squares; filling the container needs h ~ 313.
        let items = [dims(1600, 900); 4]
            .into_iter()
            .chain([dims(500, 500), dims(500, 500)])
            .collect::<Vec<_>>();
        let params = LayoutParams::default();
        let ratios: Vec<f64> = items.iter().map(|d| aspect_ratio(*d)).collect();
        assert_eq!(break_rows(&ratios, &params), vec![0..3, 3..6]);

        let sizes = justify(&items, &params);
        let tail = &sizes[3..];
        assert!(tail.iter().all(|s| s.height == 200));

        // No item is widened to make up the difference.
        for (size, ratio) in tail.iter().zip(&ratios[3..]) {
            let natural = params.row_height as f64 * ratio;
            assert!((size.width as f64 - natural).abs() <= 1.0, "{size:?} vs {natural}");
        }
        assert!(row_span(tail, params.gap) < params.container_width);
    }

    #[test]
    fn capped_trailing_row_keeps_every_aspect_ratio() {
        // Row one: three 16:9 items. Trailing row: 3:2 + 1:1 + 2:3, h would be ~374.
        let items = [
            dims(1600, 900),
            dims(1600, 900),
            dims(1600, 900),
            dims(1500, 1000),
            dims(800, 800),
            dims(600, 900),
        ];
        let params = LayoutParams::default();
        let ratios: Vec<f64> = items.iter().map(|d| aspect_ratio(*d)).collect();
        assert_eq!(break_rows(&ratios, &params), vec![0..3, 3..6]);

        let sizes = justify(&items, &params);
        assert_eq!(
            &sizes[3..],
            &[
                RenderedSize { width: 300, height: 200 },
                RenderedSize { width: 200, height: 200 },
                RenderedSize { width: 133, height: 200 },
            ]
        );
    }

    // =========================================================================
    // Degenerate input
    // =========================================================================

    #[test]
    fn zero_height_is_square() {
        assert_eq!(aspect_ratio(dims(500, 0)), 1.0);
        let sizes = justify(&[dims(500, 0)], &LayoutParams::default());
        assert_eq!(sizes, vec![RenderedSize { width: 200, height: 200 }]);
    }

    #[test]
    fn zero_width_items_do_not_panic() {
        let items = [dims(0, 100), dims(0, 100), dims(0, 100)];
        let sizes = justify(&items, &LayoutParams::default());
        assert_eq!(sizes.len(), 3);
    }

    #[test]
    fn narrow_container_never_underflows() {
        let params = LayoutParams {
            container_width: 10,
            gap: 8,
            ..Default::default()
        };
        let sizes = justify(&mixed_items(), &params);
        assert_eq!(sizes.len(), mixed_items().len());
    }

    #[test]
    fn with_container_width_keeps_other_fields() {
        let params = LayoutParams::default().with_container_width(800);
        assert_eq!(params.container_width, 800);
        assert_eq!(params.row_height, 200);
        assert_eq!(params.gap, 8);
    }
}
