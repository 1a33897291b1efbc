//! Well-Known Binary encode/decode.
//!
//! Grounded in `geozero`'s `src/wkb/wkb_reader.rs` and `wkb_writer.rs`
//! (same crate, `scroll`, and the same OGC 06-103r4 type-code table, here
//! reproduced only for the 2D/3D variants this crate's `Geometry` needs),
//! but collapsed from `geozero`'s push-based `GeomProcessor` visitor into
//! direct `Geometry -> Vec<u8>` / `&[u8] -> Geometry` functions: every call
//! site here wants the whole decoded value, never a streaming visit.

use crate::error::{Error, Result};
use crate::geometry::{Coord, Geometry};
use scroll::{Endian, Pread, Pwrite, LE};

const WKB_POINT: u32 = 1;
const WKB_LINESTRING: u32 = 2;
const WKB_POLYGON: u32 = 3;
const WKB_MULTIPOINT: u32 = 4;
const WKB_MULTILINESTRING: u32 = 5;
const WKB_MULTIPOLYGON: u32 = 6;
const WKB_GEOMETRYCOLLECTION: u32 = 7;
const WKB_Z_OFFSET: u32 = 1000;

/// Encode a [`Geometry`] as WKB, little-endian, using the Z-suffixed OGC
/// type codes (`1001`..`1007`) when any coordinate is three-dimensional.
pub fn encode_wkb(geom: &Geometry) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_geometry(&mut buf, geom)?;
    Ok(buf)
}

fn write_geometry(buf: &mut Vec<u8>, geom: &Geometry) -> Result<()> {
    let has_z = geom.has_z();
    let offset = if has_z { WKB_Z_OFFSET } else { 0 };
    write_byte_order_and_type(buf, type_code(geom) + offset);
    match geom {
        Geometry::Point(c) => write_coord(buf, c, has_z),
        Geometry::LineString(cs) => write_ring(buf, cs, has_z),
        Geometry::MultiPoint(cs) => {
            write_u32(buf, cs.len() as u32);
            for c in cs {
                write_byte_order_and_type(buf, WKB_POINT + offset);
                write_coord(buf, c, has_z);
            }
        }
        Geometry::Polygon(rings) => write_polygon(buf, rings, has_z),
        Geometry::MultiLineString(lines) => {
            write_u32(buf, lines.len() as u32);
            for line in lines {
                write_byte_order_and_type(buf, WKB_LINESTRING + offset);
                write_ring(buf, line, has_z);
            }
        }
        Geometry::MultiPolygon(polys) => {
            write_u32(buf, polys.len() as u32);
            for poly in polys {
                write_byte_order_and_type(buf, WKB_POLYGON + offset);
                write_polygon(buf, poly, has_z);
            }
        }
        Geometry::GeometryCollection(geoms) => {
            write_u32(buf, geoms.len() as u32);
            for g in geoms {
                write_geometry(buf, g)?;
            }
        }
    }
    Ok(())
}

fn type_code(geom: &Geometry) -> u32 {
    match geom {
        Geometry::Point(_) => WKB_POINT,
        Geometry::LineString(_) => WKB_LINESTRING,
        Geometry::Polygon(_) => WKB_POLYGON,
        Geometry::MultiPoint(_) => WKB_MULTIPOINT,
        Geometry::MultiLineString(_) => WKB_MULTILINESTRING,
        Geometry::MultiPolygon(_) => WKB_MULTIPOLYGON,
        Geometry::GeometryCollection(_) => WKB_GEOMETRYCOLLECTION,
    }
}

fn write_byte_order_and_type(buf: &mut Vec<u8>, type_code: u32) {
    buf.push(1); // little endian marker
    write_u32(buf, type_code);
}

fn write_u32(buf: &mut Vec<u8>, v: u32) {
    let mut tmp = [0u8; 4];
    tmp.pwrite_with(v, 0, LE).expect("fixed-size write");
    buf.extend_from_slice(&tmp);
}

fn write_f64(buf: &mut Vec<u8>, v: f64) {
    let mut tmp = [0u8; 8];
    tmp.pwrite_with(v, 0, LE).expect("fixed-size write");
    buf.extend_from_slice(&tmp);
}

fn write_coord(buf: &mut Vec<u8>, c: &Coord, has_z: bool) {
    write_f64(buf, c.x);
    write_f64(buf, c.y);
    if has_z {
        write_f64(buf, c.z.unwrap_or(0.0));
    }
}

fn write_ring(buf: &mut Vec<u8>, ring: &[Coord], has_z: bool) {
    write_u32(buf, ring.len() as u32);
    for c in ring {
        write_coord(buf, c, has_z);
    }
}

fn write_polygon(buf: &mut Vec<u8>, rings: &[Vec<Coord>], has_z: bool) {
    write_u32(buf, rings.len() as u32);
    for ring in rings {
        write_ring(buf, ring, has_z);
    }
}

/// Decode a WKB byte string into a [`Geometry`].
///
/// Per spec, empty byte strings are not an error: callers that want "null
/// geometry on empty bytes" semantics should check `bytes.is_empty()` before
/// calling; this function expects a well-formed non-empty WKB value.
pub fn decode_wkb(bytes: &[u8]) -> Result<Geometry> {
    let mut offset = 0usize;
    read_geometry(bytes, &mut offset)
}

fn read_endian(bytes: &[u8], offset: &mut usize) -> Result<Endian> {
    let b: u8 = bytes
        .pread_with(*offset, ())
        .map_err(|e| Error::BadGeometry(format!("truncated WKB (byte order): {e}")))?;
    *offset += 1;
    Ok(if b == 0 { Endian::Big } else { Endian::Little })
}

fn read_u32(bytes: &[u8], offset: &mut usize, endian: Endian) -> Result<u32> {
    let v: u32 = bytes
        .pread_with(*offset, endian)
        .map_err(|e| Error::BadGeometry(format!("truncated WKB (u32): {e}")))?;
    *offset += 4;
    Ok(v)
}

fn read_f64(bytes: &[u8], offset: &mut usize, endian: Endian) -> Result<f64> {
    let v: f64 = bytes
        .pread_with(*offset, endian)
        .map_err(|e| Error::BadGeometry(format!("truncated WKB (f64): {e}")))?;
    *offset += 8;
    Ok(v)
}

fn read_coord(bytes: &[u8], offset: &mut usize, endian: Endian, has_z: bool) -> Result<Coord> {
    let x = read_f64(bytes, offset, endian)?;
    let y = read_f64(bytes, offset, endian)?;
    let z = if has_z {
        Some(read_f64(bytes, offset, endian)?)
    } else {
        None
    };
    Ok(Coord { x, y, z })
}

fn read_ring(
    bytes: &[u8],
    offset: &mut usize,
    endian: Endian,
    has_z: bool,
) -> Result<Vec<Coord>> {
    let n = read_u32(bytes, offset, endian)? as usize;
    (0..n).map(|_| read_coord(bytes, offset, endian, has_z)).collect()
}

fn read_polygon(
    bytes: &[u8],
    offset: &mut usize,
    endian: Endian,
    has_z: bool,
) -> Result<Vec<Vec<Coord>>> {
    let n = read_u32(bytes, offset, endian)? as usize;
    (0..n).map(|_| read_ring(bytes, offset, endian, has_z)).collect()
}

fn read_geometry(bytes: &[u8], offset: &mut usize) -> Result<Geometry> {
    let endian = read_endian(bytes, offset)?;
    let raw_type = read_u32(bytes, offset, endian)?;
    let has_z = raw_type >= WKB_Z_OFFSET;
    let base_type = if has_z { raw_type - WKB_Z_OFFSET } else { raw_type };
    match base_type {
        WKB_POINT => Ok(Geometry::Point(read_coord(bytes, offset, endian, has_z)?)),
        WKB_LINESTRING => Ok(Geometry::LineString(read_ring(bytes, offset, endian, has_z)?)),
        WKB_POLYGON => Ok(Geometry::Polygon(read_polygon(bytes, offset, endian, has_z)?)),
        WKB_MULTIPOINT => {
            let n = read_u32(bytes, offset, endian)? as usize;
            let mut points = Vec::with_capacity(n);
            for _ in 0..n {
                let _ = read_endian(bytes, offset)?;
                let _ = read_u32(bytes, offset, endian)?;
                points.push(read_coord(bytes, offset, endian, has_z)?);
            }
            Ok(Geometry::MultiPoint(points))
        }
        WKB_MULTILINESTRING => {
            let n = read_u32(bytes, offset, endian)? as usize;
            let mut lines = Vec::with_capacity(n);
            for _ in 0..n {
                let _ = read_endian(bytes, offset)?;
                let _ = read_u32(bytes, offset, endian)?;
                lines.push(read_ring(bytes, offset, endian, has_z)?);
            }
            Ok(Geometry::MultiLineString(lines))
        }
        WKB_MULTIPOLYGON => {
            let n = read_u32(bytes, offset, endian)? as usize;
            let mut polys = Vec::with_capacity(n);
            for _ in 0..n {
                let _ = read_endian(bytes, offset)?;
                let _ = read_u32(bytes, offset, endian)?;
                polys.push(read_polygon(bytes, offset, endian, has_z)?);
            }
            Ok(Geometry::MultiPolygon(polys))
        }
        WKB_GEOMETRYCOLLECTION => {
            let n = read_u32(bytes, offset, endian)? as usize;
            let mut geoms = Vec::with_capacity(n);
            for _ in 0..n {
                geoms.push(read_geometry(bytes, offset)?);
            }
            Ok(Geometry::GeometryCollection(geoms))
        }
        other => Err(Error::BadGeometry(format!("unsupported WKB type code {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_round_trip() {
        let g = Geometry::Point(Coord::xy(1.5, -2.25));
        let bytes = encode_wkb(&g).unwrap();
        let back = decode_wkb(&bytes).unwrap();
        assert_eq!(g, back);
    }

    #[test]
    fn point_z_round_trip() {
        let g = Geometry::Point(Coord::xyz(1.0, 2.0, 3.0));
        let bytes = encode_wkb(&g).unwrap();
        assert_eq!(decode_wkb(&bytes).unwrap(), g);
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
        let bytes = encode_wkb(&g).unwrap();
        assert_eq!(decode_wkb(&bytes).unwrap(), g);
    }

    #[test]
    fn multipolygon_round_trip() {
        let ring = vec![Coord::xy(0.0, 0.0), Coord::xy(1.0, 0.0), Coord::xy(0.0, 1.0)];
        let g = Geometry::MultiPolygon(vec![vec![ring.clone()], vec![ring]]);
        let bytes = encode_wkb(&g).unwrap();
        assert_eq!(decode_wkb(&bytes).unwrap(), g);
    }

    #[test]
    fn truncated_bytes_are_bad_geometry() {
        let err = decode_wkb(&[1, 1, 0, 0]);
        assert!(matches!(err, Err(Error::BadGeometry(_))));
    }
}
