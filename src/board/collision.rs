#![forbid(unsafe_code)]

use std::cmp::Ordering;

use crate::board::{Bounds, DropZone};

/// Picks the drop zone whose corners are nearest to the dragged rectangle's corners.
///
/// Only zones overlapping `dragged` (after growing each zone by `margin`) are candidates;
/// with none overlapping there is no target. Equal corner scores fall back to centre
/// distance, then to zone order.
#[must_use]
pub fn closest_corners(dragged: Bounds, zones: &[DropZone], margin: u16) -> Option<&DropZone> {
    let drag_corners = corners(dragged);
    let drag_center = center(dragged);

    zones
        .iter()
        .filter(|z| z.bounds.expand(margin).intersects(dragged))
        .map(|z| {
            let zc = corners(z.bounds);
            let score: f64 = drag_corners
                .iter()
                .zip(zc.iter())
                .map(|(a, b)| distance(*a, *b))
                .sum::<f64>()
                / 4.0;
            let tie = distance(drag_center, center(z.bounds));
            (z, score, tie)
        })
        .min_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal))
        })
        .map(|(z, _, _)| z)
}

fn corners(b: Bounds) -> [(f64, f64); 4] {
    let (x, y) = (f64::from(b.x), f64::from(b.y));
    let (r, bt) = (f64::from(b.right()), f64::from(b.bottom()));
    [(x, y), (r, y), (x, bt), (r, bt)]
}

fn center(b: Bounds) -> (f64, f64) {
    (
        f64::from(b.x) + f64::from(b.width) / 2.0,
        f64::from(b.y) + f64::from(b.height) / 2.0,
    )
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<DropZone> {
        vec![
            DropZone::new("TODO", Bounds::new(0, 0, 30, 40)),
            DropZone::new("IN_PROGRESS", Bounds::new(30, 0, 30, 40)),
            DropZone::new("COMPLETED", Bounds::new(60, 0, 30, 40)),
        ]
    }

    #[test]
    fn card_inside_a_column_targets_it() {
        let zones = columns();
        let card = Bounds::new(62, 5, 26, 4);
        assert_eq!(
            closest_corners(card, &zones, 0).map(|z| z.id.as_str()),
            Some("COMPLETED")
        );
    }

    #[test]
    fn card_straddling_two_columns_picks_the_nearer() {
        let zones = columns();
        // Mostly over IN_PROGRESS, slightly overlapping TODO.
        let card = Bounds::new(26, 5, 26, 4);
        assert_eq!(
            closest_corners(card, &zones, 0).map(|z| z.id.as_str()),
            Some("IN_PROGRESS")
        );
    }

    #[test]
    fn nothing_in_range_means_no_target() {
        let zones = columns();
        let card = Bounds::new(0, 50, 26, 4);
        assert!(closest_corners(card, &zones, 0).is_none());
        assert!(closest_corners(card, &[], 0).is_none());
        // A generous margin brings the row above back into range.
        assert!(closest_corners(card, &zones, 12).is_some());
    }

    #[test]
    fn exact_ties_resolve_to_first_zone() {
        let zones = vec![
            DropZone::new("TODO", Bounds::new(0, 0, 10, 10)),
            DropZone::new("IN_PROGRESS", Bounds::new(0, 0, 10, 10)),
        ];
        let card = Bounds::new(2, 2, 4, 4);
        assert_eq!(
            closest_corners(card, &zones, 0).map(|z| z.id.as_str()),
            Some("TODO")
        );
    }
}
