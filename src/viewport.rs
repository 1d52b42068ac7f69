use crate::model::{Coordinate, Region};

/// Computes a region framing every coordinate.
///
/// Spans are the coordinate extent scaled by `1 + padding`, never smaller than `min_span`.
/// A single coordinate, or several that coincide, get a `min_span` square around them.
/// Returns `None` for an empty slice.
pub fn compute_bounds(coordinates: &[Coordinate], padding: f64, min_span: f64) -> Option<Region> {
    let (first, rest) = coordinates.split_first()?;
    let min_span = if min_span.is_finite() && min_span > 0.0 {
        min_span
    } else {
        f64::EPSILON
    };

    if rest.is_empty() {
        return Some(Region {
            center: *first,
            latitude_span: min_span,
            longitude_span: min_span,
        });
    }

    let padding = if padding.is_finite() { padding.max(0.0) } else { 0.0 };
    let mut min_lat = first.latitude;
    let mut max_lat = first.latitude;
    let mut min_lng = first.longitude;
    let mut max_lng = first.longitude;
    for coordinate in rest {
        min_lat = min_lat.min(coordinate.latitude);
        max_lat = max_lat.max(coordinate.latitude);
        min_lng = min_lng.min(coordinate.longitude);
        max_lng = max_lng.max(coordinate.longitude);
    }

    Some(Region {
        center: Coordinate::new((min_lat + max_lat) / 2.0, (min_lng + max_lng) / 2.0),
        latitude_span: ((max_lat - min_lat) * (1.0 + padding)).max(min_span),
        longitude_span: ((max_lng - min_lng) * (1.0 + padding)).max(min_span),
    })
}
