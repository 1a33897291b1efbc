//! Well-Known Text encode/decode, built on the `wkt` crate's `Wkt<f64>` AST
//! (the same crate `geozero`'s own `with-wkt` feature depends on),
//! converting to and from the crate-local [`Geometry`].

use crate::error::{Error, Result};
use crate::geometry::{Coord, Geometry};
use std::str::FromStr;
use wkt::types::{
    Coord as WktCoord, LineString as WktLineString, MultiLineString as WktMultiLineString,
    MultiPoint as WktMultiPoint, MultiPolygon as WktMultiPolygon, Point as WktPoint,
    Polygon as WktPolygon,
};
use wkt::{Geometry as WktGeometryEnum, Wkt};

/// Serialize a [`Geometry`] to WKT text.
pub fn encode_wkt(geom: &Geometry) -> Result<String> {
    Ok(to_wkt_geometry(geom).to_string())
}

fn to_wkt_coord(c: &Coord) -> WktCoord<f64> {
    WktCoord {
        x: c.x,
        y: c.y,
        z: c.z,
        m: None,
    }
}

fn to_wkt_linestring(cs: &[Coord]) -> WktLineString<f64> {
    WktLineString(cs.iter().map(to_wkt_coord).collect())
}

fn to_wkt_polygon(rings: &[Vec<Coord>]) -> WktPolygon<f64> {
    WktPolygon(rings.iter().map(|r| to_wkt_linestring(r)).collect())
}

fn to_wkt_geometry(geom: &Geometry) -> Wkt<f64> {
    let inner = match geom {
        Geometry::Point(c) => WktGeometryEnum::Point(WktPoint(Some(to_wkt_coord(c)))),
        Geometry::LineString(cs) => WktGeometryEnum::LineString(to_wkt_linestring(cs)),
        Geometry::Polygon(rings) => WktGeometryEnum::Polygon(to_wkt_polygon(rings)),
        Geometry::MultiPoint(cs) => WktGeometryEnum::MultiPoint(WktMultiPoint(
            cs.iter().map(|c| WktPoint(Some(to_wkt_coord(c)))).collect(),
        )),
        Geometry::MultiLineString(lines) => WktGeometryEnum::MultiLineString(WktMultiLineString(
            lines.iter().map(|l| to_wkt_linestring(l)).collect(),
        )),
        Geometry::MultiPolygon(polys) => WktGeometryEnum::MultiPolygon(WktMultiPolygon(
            polys.iter().map(|p| to_wkt_polygon(p)).collect(),
        )),
        Geometry::GeometryCollection(geoms) => WktGeometryEnum::GeometryCollection(
            wkt::types::GeometryCollection(geoms.iter().map(to_wkt_geometry_inner).collect()),
        ),
    };
    Wkt::from(inner)
}

fn to_wkt_geometry_inner(geom: &Geometry) -> WktGeometryEnum<f64> {
    to_wkt_geometry(geom).item
}

/// Parse a WKT string into a [`Geometry`].
pub fn decode_wkt(text: &str) -> Result<Geometry> {
    let parsed = Wkt::<f64>::from_str(text.trim())
        .map_err(|e| Error::BadGeometry(format!("invalid WKT: {e}")))?;
    from_wkt_geometry(&parsed.item)
}

fn from_wkt_coord(c: &WktCoord<f64>) -> Coord {
    Coord { x: c.x, y: c.y, z: c.z }
}

fn from_wkt_linestring(ls: &WktLineString<f64>) -> Vec<Coord> {
    ls.0.iter().map(from_wkt_coord).collect()
}

fn from_wkt_polygon(p: &WktPolygon<f64>) -> Vec<Vec<Coord>> {
    p.0.iter().map(from_wkt_linestring).collect()
}

fn from_wkt_geometry(g: &WktGeometryEnum<f64>) -> Result<Geometry> {
    match g {
        WktGeometryEnum::Point(p) => {
            let c = p
                .0
                .as_ref()
                .ok_or_else(|| Error::BadGeometry("empty WKT POINT has no coordinate".into()))?;
            Ok(Geometry::Point(from_wkt_coord(c)))
        }
        WktGeometryEnum::LineString(ls) => Ok(Geometry::LineString(from_wkt_linestring(ls))),
        WktGeometryEnum::Polygon(p) => Ok(Geometry::Polygon(from_wkt_polygon(p))),
        WktGeometryEnum::MultiPoint(mp) => Ok(Geometry::MultiPoint(
            mp.0.iter()
                .filter_map(|p| p.0.as_ref().map(from_wkt_coord))
                .collect(),
        )),
        WktGeometryEnum::MultiLineString(mls) => Ok(Geometry::MultiLineString(
            mls.0.iter().map(from_wkt_linestring).collect(),
        )),
        WktGeometryEnum::MultiPolygon(mp) => Ok(Geometry::MultiPolygon(
            mp.0.iter().map(from_wkt_polygon).collect(),
        )),
        WktGeometryEnum::GeometryCollection(gc) => {
            let geoms = gc
                .0
                .iter()
                .map(from_wkt_geometry)
                .collect::<Result<Vec<_>>>()?;
            Ok(Geometry::GeometryCollection(geoms))
        }
        other => Err(Error::BadGeometry(format!(
            "unsupported WKT geometry type: {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_round_trip() {
        let g = Geometry::Point(Coord::xy(1.0, 2.0));
        let text = encode_wkt(&g).unwrap();
        assert_eq!(decode_wkt(&text).unwrap(), g);
    }

    #[test]
    fn polygon_round_trip() {
        let ring = vec![
            Coord::xy(0.0, 0.0),
            Coord::xy(1.0, 0.0),
            Coord::xy(1.0, 1.0),
            Coord::xy(0.0, 0.0),
        ];
        let g = Geometry::Polygon(vec![ring]);
        let text = encode_wkt(&g).unwrap();
        assert_eq!(decode_wkt(&text).unwrap(), g);
    }

    #[test]
    fn invalid_text_is_bad_geometry() {
        assert!(matches!(decode_wkt("not wkt at all"), Err(Error::BadGeometry(_))));
    }
}
