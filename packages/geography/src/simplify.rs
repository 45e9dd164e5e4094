//! Douglas-Peucker simplification that never breaks polygon topology.
//!
//! Rings are simplified independently. A ring that would collapse below a
//! valid ring (four coordinates) keeps its original coordinates, so a unit
//! never loses a polygon to simplification. A polygon whose simplified form
//! is invalid (a hole escaping its shell, crossing rings) keeps its original
//! rings, and so does the whole multipolygon if its parts come to overlap.

use geo::{LineString, MultiPolygon, Polygon, Simplify as _, Validation as _};

/// Smallest coordinate count of a closed ring.
const MIN_RING_COORDS: usize = 4;

/// Simplifies every ring of `geometry` with `tolerance` (in degrees).
///
/// A tolerance of zero returns the geometry unchanged.
#[must_use]
pub fn simplify_multipolygon(geometry: &MultiPolygon<f64>, tolerance: f64) -> MultiPolygon<f64> {
    if tolerance <= 0.0 {
        return geometry.clone();
    }
    let simplified = MultiPolygon(
        geometry
            .0
            .iter()
            .map(|polygon| simplify_polygon(polygon, tolerance))
            .collect(),
    );
    if simplified.is_valid() || !geometry.is_valid() {
        simplified
    } else {
        geometry.clone()
    }
}

fn simplify_polygon(polygon: &Polygon<f64>, tolerance: f64) -> Polygon<f64> {
    let exterior = simplify_ring(polygon.exterior(), tolerance);
    let interiors = polygon
        .interiors()
        .iter()
        .map(|ring| simplify_ring(ring, tolerance))
        .collect();
    let simplified = Polygon::new(exterior, interiors);
    if simplified.is_valid() || !polygon.is_valid() {
        simplified
    } else {
        polygon.clone()
    }
}

fn simplify_ring(ring: &LineString<f64>, tolerance: f64) -> LineString<f64> {
    let simplified = ring.simplify(tolerance);
    if simplified.0.len() < MIN_RING_COORDS {
        ring.clone()
    } else {
        simplified
    }
}

/// Total number of coordinates in a multipolygon.
#[must_use]
pub fn coord_count(geometry: &MultiPolygon<f64>) -> usize {
    geometry
        .0
        .iter()
        .map(|p| p.exterior().0.len() + p.interiors().iter().map(|r| r.0.len()).sum::<usize>())
        .sum()
}

#[cfg(test)]
mod tests {
    use geo::{LineString, polygon};

    use super::*;

    fn square_with_midpoints() -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 0.5, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 0.5),
            (x: 1.0, y: 1.0),
            (x: 0.5, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.5),
        ]])
    }

    #[test]
    fn removes_collinear_vertices() {
        let simplified = simplify_multipolygon(&square_with_midpoints(), 0.01);
        assert_eq!(coord_count(&square_with_midpoints()), 9);
        assert_eq!(coord_count(&simplified), 5);
        assert_eq!(simplified.0.len(), 1);
    }

    #[test]
    fn zero_tolerance_is_identity() {
        let geometry = square_with_midpoints();
        assert_eq!(simplify_multipolygon(&geometry, 0.0), geometry);
    }

    #[test]
    fn collapsing_ring_keeps_original_shape() {
        let tiny = MultiPolygon(vec![Polygon::new(
            LineString::from(vec![(0.0, 0.0), (0.001, 0.0), (0.0, 0.001), (0.0, 0.0)]),
            vec![],
        )]);
        let simplified = simplify_multipolygon(&tiny, 1.0);
        assert_eq!(simplified, tiny);
    }

    #[test]
    fn hole_stays_inside_its_shell() {
        // Dropping the shell's dent at (5, -0.5) would leave the hole below
        // the new bottom edge.
        let dented = MultiPolygon(vec![Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (5.0, -0.5),
                (10.0, 0.0),
                (10.0, 10.0),
                (0.0, 10.0),
                (0.0, 0.0),
            ]),
            vec![LineString::from(vec![
                (4.5, -0.3),
                (5.5, -0.3),
                (5.0, -0.1),
                (4.5, -0.3),
            ])],
        )]);
        assert!(dented.is_valid());

        let simplified = simplify_multipolygon(&dented, 1.0);
        assert!(simplified.is_valid(), "simplification produced an invalid polygon");
        assert_eq!(simplified, dented);
    }

    #[test]
    fn valid_polygons_with_holes_are_still_simplified() {
        let framed = MultiPolygon(vec![Polygon::new(
            square_with_midpoints().0[0].exterior().clone(),
            vec![LineString::from(vec![
                (0.4, 0.4),
                (0.6, 0.4),
                (0.6, 0.6),
                (0.4, 0.6),
                (0.4, 0.4),
            ])],
        )]);

        let simplified = simplify_multipolygon(&framed, 0.01);
        assert!(simplified.is_valid());
        assert_eq!(coord_count(&simplified), 10);
    }

    #[test]
    fn keeps_every_polygon() {
        let mut geometry = square_with_midpoints();
        geometry.0.push(Polygon::new(
            LineString::from(vec![(5.0, 5.0), (5.0001, 5.0), (5.0, 5.0001), (5.0, 5.0)]),
            vec![],
        ));
        let simplified = simplify_multipolygon(&geometry, 0.1);
        assert_eq!(simplified.0.len(), 2);
    }
}
