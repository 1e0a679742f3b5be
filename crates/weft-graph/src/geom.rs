//! Shared geometry: transformed bounding boxes.

use weft_core::DataRange;
use weft_math::{Affine, Point};

/// Axis-aligned integer bounding box of `range` pushed through `m`.
///
/// Corners are transformed in fixed point; the box takes the floor of the
/// minima and the ceiling of the maxima, so it never under-covers.
pub(crate) fn transform_bounds(m: &Affine, range: DataRange) -> DataRange {
    if range.is_empty() {
        return DataRange::EMPTY;
    }
    let corners = [
        Point::from_int(range.x, range.y),
        Point::from_int(range.right(), range.y),
        Point::from_int(range.x, range.bottom()),
        Point::from_int(range.right(), range.bottom()),
    ];
    let mut min_x = i32::MAX;
    let mut min_y = i32::MAX;
    let mut max_x = i32::MIN;
    let mut max_y = i32::MIN;
    for corner in corners {
        let p = m.apply(corner);
        min_x = min_x.min(p.x.floor());
        min_y = min_y.min(p.y.floor());
        max_x = max_x.max(p.x.ceil());
        max_y = max_y.max(p.y.ceil());
    }
    DataRange::new(min_x, min_y, max_x - min_x, max_y - min_y)
}
