//! In-memory geometry model shared by the codec, schema builder, converter
//! and validator.
//!
//! `geo-types` is deliberately not used here: several invariants in this
//! crate (the `" Z"` GeoJSON type suffix, 6-element bboxes) are expressed in
//! terms of an optional third ordinate per coordinate, which `geo_types`
//! cannot represent without threading a second generic dimension parameter
//! through every algorithm that touches a coordinate.

use crate::bbox::Bbox;

/// A single coordinate, optionally carrying a third (Z) ordinate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Coord {
    pub fn xy(x: f64, y: f64) -> Coord {
        Coord { x, y, z: None }
    }

    pub fn xyz(x: f64, y: f64, z: f64) -> Coord {
        Coord { x, y, z: Some(z) }
    }
}

pub type Ring = Vec<Coord>;

/// The seven base GeoJSON geometry shapes, plus `GeometryCollection`, each
/// optionally carrying Z coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Point(Coord),
    LineString(Vec<Coord>),
    Polygon(Vec<Ring>),
    MultiPoint(Vec<Coord>),
    MultiLineString(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Vec<Ring>>),
    GeometryCollection(Vec<Geometry>),
}

/// Ring winding direction, used by the orientation validator rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RingOrientation {
    Clockwise,
    CounterClockwise,
}

impl Geometry {
    /// Whether any coordinate reachable from this geometry carries a Z value.
    pub fn has_z(&self) -> bool {
        match self {
            Geometry::Point(c) => c.z.is_some(),
            Geometry::LineString(cs) | Geometry::MultiPoint(cs) => {
                cs.iter().any(|c| c.z.is_some())
            }
            Geometry::Polygon(rings) | Geometry::MultiLineString(rings) => rings
                .iter()
                .any(|ring| ring.iter().any(|c| c.z.is_some())),
            Geometry::MultiPolygon(polys) => polys.iter().any(|poly| {
                poly.iter().any(|ring| ring.iter().any(|c| c.z.is_some()))
            }),
            Geometry::GeometryCollection(geoms) => geoms.iter().any(Geometry::has_z),
        }
    }

    /// The GeoJSON type tag for this geometry, with a `" Z"` suffix appended
    /// when any coordinate is three-dimensional.
    pub fn kind(&self) -> String {
        let base = match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::MultiPolygon(_) => "MultiPolygon",
            Geometry::GeometryCollection(_) => "GeometryCollection",
        };
        if self.has_z() {
            format!("{base} Z")
        } else {
            base.to_string()
        }
    }

    /// The 2D bounding box of this geometry (Z is ignored; callers that
    /// track Z bounds accumulate them separately).
    pub fn bound(&self) -> Bbox {
        let mut b = Bbox::default();
        self.fold_xy(&mut |x, y| b.expand_xy(x, y));
        b
    }

    /// The 3D bound as `(xmin, ymin, zmin, xmax, ymax, zmax)`, `None` for the
    /// z components when no coordinate in this geometry carries one.
    pub fn bound_z(&self) -> (Bbox, Option<f64>, Option<f64>) {
        let mut b = Bbox::default();
        let mut zmin = f64::INFINITY;
        let mut zmax = f64::NEG_INFINITY;
        let mut any_z = false;
        self.fold_coords(&mut |c| {
            b.expand_xy(c.x, c.y);
            if let Some(z) = c.z {
                any_z = true;
                zmin = zmin.min(z);
                zmax = zmax.max(z);
            }
        });
        if any_z {
            (b, Some(zmin), Some(zmax))
        } else {
            (b, None, None)
        }
    }

    fn fold_xy(&self, f: &mut impl FnMut(f64, f64)) {
        self.fold_coords(&mut |c| f(c.x, c.y));
    }

    fn fold_coords(&self, f: &mut impl FnMut(Coord)) {
        match self {
            Geometry::Point(c) => f(*c),
            Geometry::LineString(cs) | Geometry::MultiPoint(cs) => {
                for c in cs {
                    f(*c);
                }
            }
            Geometry::Polygon(rings) | Geometry::MultiLineString(rings) => {
                for ring in rings {
                    for c in ring {
                        f(*c);
                    }
                }
            }
            Geometry::MultiPolygon(polys) => {
                for poly in polys {
                    for ring in poly {
                        for c in ring {
                            f(*c);
                        }
                    }
                }
            }
            Geometry::GeometryCollection(geoms) => {
                for g in geoms {
                    g.fold_coords(f);
                }
            }
        }
    }

    /// Ring orientation of a polygon's `i`th ring (0 = exterior) by the sign
    /// of its shoelace signed area. Returns `None` for degenerate rings.
    pub fn ring_orientation(&self, i: usize) -> Option<RingOrientation> {
        let Geometry::Polygon(rings) = self else {
            return None;
        };
        ring_orientation(rings.get(i)?)
    }
}

/// Signed-area based winding direction of a single ring.
pub fn ring_orientation(ring: &[Coord]) -> Option<RingOrientation> {
    if ring.len() < 3 {
        return None;
    }
    let area = signed_area(ring);
    if area == 0.0 {
        return None;
    }
    Some(if area > 0.0 {
        RingOrientation::CounterClockwise
    } else {
        RingOrientation::Clockwise
    })
}

fn signed_area(ring: &[Coord]) -> f64 {
    let mut sum = 0.0;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_appends_z_suffix() {
        let g = Geometry::Point(Coord::xyz(1.0, 2.0, 3.0));
        assert_eq!(g.kind(), "Point Z");
        let g = Geometry::Point(Coord::xy(1.0, 2.0));
        assert_eq!(g.kind(), "Point");
    }

    #[test]
    fn ccw_square_is_counter_clockwise() {
        let ring = vec![
            Coord::xy(0.0, 0.0),
            Coord::xy(1.0, 0.0),
            Coord::xy(1.0, 1.0),
            Coord::xy(0.0, 1.0),
            Coord::xy(0.0, 0.0),
        ];
        assert_eq!(ring_orientation(&ring), Some(RingOrientation::CounterClockwise));
        let mut rev = ring.clone();
        rev.reverse();
        assert_eq!(ring_orientation(&rev), Some(RingOrientation::Clockwise));
    }

    #[test]
    fn bound_folds_all_coordinates() {
        let g = Geometry::LineString(vec![Coord::xy(1.0, 5.0), Coord::xy(-3.0, 2.0)]);
        let b = g.bound();
        assert_eq!((b.xmin, b.ymin, b.xmax, b.ymax), (-3.0, 2.0, 1.0, 5.0));
    }
}
