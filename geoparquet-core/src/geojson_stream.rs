//! Feature stream (C5): a tolerant streaming reader/writer for GeoJSON
//! `FeatureCollection` / `Feature` / bare `Geometry` / newline-delimited
//! `Feature` objects (RFC 7946 plus the tolerated extensions in §6.1).
//!
//! Grounded in `geozero`'s `src/geojson/geojson_reader.rs`
//! (`process_geojson`, `process_geojson_feature`, `process_geojson_geom_n`)
//! for the shape-dispatch logic -- FeatureCollection vs. Feature vs. bare
//! Geometry vs. per-element recursion -- but restructured from a push-based
//! `FeatureProcessor` visitor into a pull-based `Iterator<Item =
//! Result<Feature>>` reader, per the design note on feature-reader state
//! machines and the REDESIGN FLAGS (input shapes are heterogeneous; a
//! schema-driven deserializer can't express "maybe a bare Geometry, maybe a
//! Feature, maybe a collection, maybe one-object-per-line").
//!
//! Rather than a byte-level hand-rolled tokenizer, the state machine is
//! expressed through a custom `serde::Deserialize` for [`RawObject`] that
//! walks each top-level JSON object's `MapAccess` once, with the four
//! duplicate-sensitive keys (`geometry`, `properties`, `id`, `coordinates`)
//! tracked explicitly and unknown keys skip-scanned via `IgnoredAny` --
//! `serde_json`'s own skip-scan, not a hand-rolled one, but behaviorally
//! identical. `serde_json::Deserializer::from_reader(..).into_iter()`
//! supplies the "one JSON value after another, possibly newline-delimited"
//! splitting newline-delimited input needs. Nested Feature objects inside a
//! `FeatureCollection.features` array get the same duplicate-key
//! enforcement (they deserialize through the same `RawObject` visitor);
//! `coordinates` duplication is checked only at the object that directly
//! carries it (a bare Geometry, or nested inside a `geometry.geometries`
//! element), not recursively re-verified once already captured as a
//! `serde_json::Value`.

use crate::bbox::Bbox;
use crate::error::{Error, Result};
use crate::feature::{Feature, FeatureId};
use crate::geometry::{Coord, Geometry};
use crate::property::{properties_from_json, PropertyMap};
use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::io::{Read, Write};

#[derive(Default)]
struct RawObject {
    type_: Option<String>,
    geometry: Option<Value>,
    properties: Option<Value>,
    id: Option<Value>,
    coordinates: Option<Value>,
    geometries: Option<Value>,
    features: Option<Vec<RawObject>>,
    bbox: Option<Value>,
}

impl<'de> Deserialize<'de> for RawObject {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RawObjectVisitor;

        impl<'de> Visitor<'de> for RawObjectVisitor {
            type Value = RawObject;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a GeoJSON object")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<RawObject, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut obj = RawObject::default();
                let (mut seen_geometry, mut seen_properties, mut seen_id, mut seen_coords) =
                    (false, false, false, false);
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "type" => obj.type_ = Some(map.next_value()?),
                        "geometry" => {
                            if seen_geometry {
                                return Err(de::Error::custom("duplicate key \"geometry\""));
                            }
                            seen_geometry = true;
                            obj.geometry = Some(map.next_value()?);
                        }
                        "properties" => {
                            if seen_properties {
                                return Err(de::Error::custom("duplicate key \"properties\""));
                            }
                            seen_properties = true;
                            obj.properties = Some(map.next_value()?);
                        }
                        "id" => {
                            if seen_id {
                                return Err(de::Error::custom("duplicate key \"id\""));
                            }
                            seen_id = true;
                            obj.id = Some(map.next_value()?);
                        }
                        "coordinates" => {
                            if seen_coords {
                                return Err(de::Error::custom("duplicate key \"coordinates\""));
                            }
                            seen_coords = true;
                            obj.coordinates = Some(map.next_value()?);
                        }
                        "geometries" => obj.geometries = Some(map.next_value()?),
                        "features" => obj.features = Some(map.next_value()?),
                        "bbox" => obj.bbox = Some(map.next_value()?),
                        _ => {
                            let _: IgnoredAny = map.next_value()?;
                        }
                    }
                }
                Ok(obj)
            }
        }

        deserializer.deserialize_map(RawObjectVisitor)
    }
}

fn malformed(msg: impl Into<String>) -> Error {
    Error::MalformedGeoJson(msg.into())
}

fn coord_from_value(v: &Value) -> Result<Coord> {
    let arr = v
        .as_array()
        .ok_or_else(|| malformed("coordinates entry is not an array"))?;
    if arr.len() < 2 {
        return Err(malformed("coordinate needs at least x, y"));
    }
    let x = arr[0].as_f64().ok_or_else(|| malformed("coordinate x is not a number"))?;
    let y = arr[1].as_f64().ok_or_else(|| malformed("coordinate y is not a number"))?;
    let z = arr.get(2).and_then(Value::as_f64);
    Ok(Coord { x, y, z })
}

fn ring_from_value(v: &Value) -> Result<Vec<Coord>> {
    v.as_array()
        .ok_or_else(|| malformed("ring is not an array"))?
        .iter()
        .map(coord_from_value)
        .collect()
}

fn rings_from_value(v: &Value) -> Result<Vec<Vec<Coord>>> {
    v.as_array()
        .ok_or_else(|| malformed("polygon is not an array of rings"))?
        .iter()
        .map(ring_from_value)
        .collect()
}

fn geometry_from_parts(type_: &str, coordinates: Option<&Value>, geometries: Option<&Value>) -> Result<Geometry> {
    match type_ {
        "Point" => {
            let c = coordinates.ok_or_else(|| malformed("Point missing coordinates"))?;
            Ok(Geometry::Point(coord_from_value(c)?))
        }
        "LineString" => {
            let c = coordinates.ok_or_else(|| malformed("LineString missing coordinates"))?;
            Ok(Geometry::LineString(ring_from_value(c)?))
        }
        "Polygon" => {
            let c = coordinates.ok_or_else(|| malformed("Polygon missing coordinates"))?;
            Ok(Geometry::Polygon(rings_from_value(c)?))
        }
        "MultiPoint" => {
            let c = coordinates.ok_or_else(|| malformed("MultiPoint missing coordinates"))?;
            Ok(Geometry::MultiPoint(ring_from_value(c)?))
        }
        "MultiLineString" => {
            let c = coordinates.ok_or_else(|| malformed("MultiLineString missing coordinates"))?;
            let lines = c
                .as_array()
                .ok_or_else(|| malformed("MultiLineString coordinates not an array"))?
                .iter()
                .map(ring_from_value)
                .collect::<Result<Vec<_>>>()?;
            Ok(Geometry::MultiLineString(lines))
        }
        "MultiPolygon" => {
            let c = coordinates.ok_or_else(|| malformed("MultiPolygon missing coordinates"))?;
            let polys = c
                .as_array()
                .ok_or_else(|| malformed("MultiPolygon coordinates not an array"))?
                .iter()
                .map(rings_from_value)
                .collect::<Result<Vec<_>>>()?;
            Ok(Geometry::MultiPolygon(polys))
        }
        "GeometryCollection" => {
            let geoms = geometries
                .ok_or_else(|| malformed("GeometryCollection missing geometries"))?
                .as_array()
                .ok_or_else(|| malformed("geometries is not an array"))?
                .iter()
                .map(geometry_value_to_geometry)
                .collect::<Result<Vec<_>>>()?;
            Ok(Geometry::GeometryCollection(geoms))
        }
        other => Err(malformed(format!("unknown geometry type \"{other}\""))),
    }
}

fn geometry_value_to_geometry(v: &Value) -> Result<Geometry> {
    let obj = v.as_object().ok_or_else(|| malformed("geometry is not an object"))?;
    let type_ = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("geometry missing \"type\""))?;
    geometry_from_parts(type_, obj.get("coordinates"), obj.get("geometries"))
}

fn id_from_value(v: &Value) -> Result<FeatureId> {
    match v {
        Value::String(s) => Ok(FeatureId::String(s.clone())),
        Value::Number(n) => n
            .as_i64()
            .map(FeatureId::Number)
            .ok_or_else(|| malformed("feature id number is not representable as i64")),
        _ => Err(malformed("feature id must be a string or number")),
    }
}

fn bbox_from_value(v: &Value) -> Result<Bbox> {
    let arr = v.as_array().ok_or_else(|| malformed("bbox is not an array"))?;
    if arr.len() != 4 && arr.len() != 6 {
        return Err(malformed("bbox must have 4 or 6 numbers"));
    }
    let nums: Vec<f64> = arr
        .iter()
        .map(|x| x.as_f64().ok_or_else(|| malformed("bbox entry is not a number")))
        .collect::<Result<_>>()?;
    if nums.len() == 6 {
        Ok(Bbox::new(nums[0], nums[1], nums[3], nums[4]))
    } else {
        Ok(Bbox::new(nums[0], nums[1], nums[2], nums[3]))
    }
}

fn raw_object_to_feature(obj: RawObject) -> Result<Feature> {
    let geometry = match &obj.geometry {
        Some(Value::Null) | None => None,
        Some(v) => Some(geometry_value_to_geometry(v)?),
    };
    let properties: PropertyMap = match &obj.properties {
        Some(Value::Object(map)) => properties_from_json(map),
        Some(Value::Null) | None => PropertyMap::new(),
        Some(_) => return Err(malformed("\"properties\" must be an object or null")),
    };
    let id = match &obj.id {
        Some(v) => Some(id_from_value(v)?),
        None => None,
    };
    let bbox = match &obj.bbox {
        Some(v) => Some(bbox_from_value(v)?),
        None => None,
    };
    Ok(Feature { id, geometry, properties, bbox })
}

fn bare_geometry_to_feature(obj: RawObject) -> Result<Feature> {
    let type_ = obj.type_.as_deref().ok_or_else(|| malformed("missing \"type\""))?;
    let geometry = geometry_from_parts(type_, obj.coordinates.as_ref(), obj.geometries.as_ref())?;
    Ok(Feature {
        id: None,
        geometry: Some(geometry),
        properties: PropertyMap::new(),
        bbox: match &obj.bbox {
            Some(v) => Some(bbox_from_value(v)?),
            None => None,
        },
    })
}

fn raw_object_to_features(obj: RawObject) -> Result<Vec<Feature>> {
    match obj.type_.as_deref() {
        Some("FeatureCollection") => {
            let features = obj
                .features
                .ok_or_else(|| malformed("FeatureCollection missing \"features\""))?;
            features.into_iter().map(raw_object_to_feature).collect()
        }
        Some("Feature") => Ok(vec![raw_object_to_feature(obj)?]),
        Some(_) => Ok(vec![bare_geometry_to_feature(obj)?]),
        None => Err(malformed("top-level object missing \"type\"")),
    }
}

/// Pull-based reader over any of: `FeatureCollection`, a single `Feature`, a
/// bare `Geometry`, or newline-delimited `Feature` objects.
pub struct FeatureReader<R: Read> {
    stream: serde_json::StreamDeserializer<'static, serde_json::de::IoRead<R>, RawObject>,
    pending: VecDeque<Feature>,
}

impl<R: Read> FeatureReader<R> {
    pub fn new(reader: R) -> FeatureReader<R> {
        FeatureReader {
            stream: serde_json::Deserializer::from_reader(reader).into_iter::<RawObject>(),
            pending: VecDeque::new(),
        }
    }

    /// Read the next feature, or `Ok(None)` at end of input.
    pub fn read(&mut self) -> Result<Option<Feature>> {
        loop {
            if let Some(f) = self.pending.pop_front() {
                return Ok(Some(f));
            }
            match self.stream.next() {
                None => return Ok(None),
                Some(Err(e)) => return Err(malformed(e.to_string())),
                Some(Ok(obj)) => {
                    let features = raw_object_to_features(obj)?;
                    self.pending.extend(features);
                }
            }
        }
    }
}

impl<R: Read> Iterator for FeatureReader<R> {
    type Item = Result<Feature>;

    fn next(&mut self) -> Option<Result<Feature>> {
        match self.read() {
            Ok(Some(f)) => Some(Ok(f)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Render a [`Geometry`] as a standard GeoJSON geometry object. Exposed for
/// secondary geometry columns, which the record-batch-to-feature path (§4.5)
/// embeds as a property value rather than `feature.geometry`.
pub fn geometry_to_json(geom: &Geometry) -> Value {
    fn coord(c: &Coord) -> Value {
        match c.z {
            Some(z) => serde_json::json!([c.x, c.y, z]),
            None => serde_json::json!([c.x, c.y]),
        }
    }
    fn ring(r: &[Coord]) -> Value {
        Value::Array(r.iter().map(coord).collect())
    }
    fn rings(r: &[Vec<Coord>]) -> Value {
        Value::Array(r.iter().map(|x| ring(x)).collect())
    }
    match geom {
        Geometry::Point(c) => serde_json::json!({"type": "Point", "coordinates": coord(c)}),
        Geometry::LineString(cs) => {
            serde_json::json!({"type": "LineString", "coordinates": ring(cs)})
        }
        Geometry::Polygon(rs) => serde_json::json!({"type": "Polygon", "coordinates": rings(rs)}),
        Geometry::MultiPoint(cs) => {
            serde_json::json!({"type": "MultiPoint", "coordinates": ring(cs)})
        }
        Geometry::MultiLineString(ls) => {
            serde_json::json!({"type": "MultiLineString", "coordinates": rings(ls)})
        }
        Geometry::MultiPolygon(ps) => {
            let coords: Vec<Value> = ps.iter().map(|p| rings(p)).collect();
            serde_json::json!({"type": "MultiPolygon", "coordinates": coords})
        }
        Geometry::GeometryCollection(gs) => {
            let geometries: Vec<Value> = gs.iter().map(geometry_to_json).collect();
            serde_json::json!({"type": "GeometryCollection", "geometries": geometries})
        }
    }
}

fn feature_id_to_json(id: &FeatureId) -> Value {
    match id {
        FeatureId::String(s) => Value::String(s.clone()),
        FeatureId::Number(n) => serde_json::json!(n),
    }
}

/// Render a [`Feature`] as a standard GeoJSON Feature `serde_json::Value`.
pub fn feature_to_json(feature: &Feature) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert("type".to_string(), Value::String("Feature".to_string()));
    if let Some(id) = &feature.id {
        obj.insert("id".to_string(), feature_id_to_json(id));
    }
    if let Some(bbox) = &feature.bbox {
        obj.insert("bbox".to_string(), serde_json::json!(bbox.as_array()));
    }
    obj.insert(
        "geometry".to_string(),
        match &feature.geometry {
            Some(g) => geometry_to_json(g),
            None => Value::Null,
        },
    );
    let mut props = serde_json::Map::new();
    for (k, v) in &feature.properties {
        props.insert(k.clone(), v.to_json());
    }
    obj.insert("properties".to_string(), Value::Object(props));
    Value::Object(obj)
}

/// Streaming `FeatureCollection` writer (§4.5): the first `write` emits the
/// opening `{"type":"FeatureCollection","features":[`; subsequent writes
/// prepend `,`. `close` emits `]}`, or -- if nothing was written -- the
/// full empty-collection literal.
pub struct FeatureWriter<W: Write> {
    out: W,
    count: usize,
}

impl<W: Write> FeatureWriter<W> {
    pub fn new(out: W) -> FeatureWriter<W> {
        FeatureWriter { out, count: 0 }
    }

    pub fn write(&mut self, feature: &Feature) -> Result<()> {
        if self.count == 0 {
            self.out
                .write_all(br#"{"type":"FeatureCollection","features":["#)?;
        } else {
            self.out.write_all(b",")?;
        }
        serde_json::to_writer(&mut self.out, &feature_to_json(feature))
            .map_err(|e| malformed(e.to_string()))?;
        self.count += 1;
        Ok(())
    }

    /// Number of features written so far.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn close(mut self) -> Result<W> {
        if self.count == 0 {
            self.out
                .write_all(br#"{"type":"FeatureCollection","features":[]}"#)?;
        } else {
            self.out.write_all(b"]}")?;
        }
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_feature_collection() {
        let input = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":{"type":"Point","coordinates":[1.0,2.0]},"properties":{"a":1}}
        ]}"#;
        let mut reader = FeatureReader::new(input.as_bytes());
        let f = reader.read().unwrap().unwrap();
        assert_eq!(f.geometry, Some(Geometry::Point(Coord::xy(1.0, 2.0))));
        assert!(reader.read().unwrap().is_none());
    }

    #[test]
    fn reads_bare_geometry() {
        let input = r#"{"type":"Point","coordinates":[1.0,2.0]}"#;
        let mut reader = FeatureReader::new(input.as_bytes());
        let f = reader.read().unwrap().unwrap();
        assert_eq!(f.geometry, Some(Geometry::Point(Coord::xy(1.0, 2.0))));
        assert!(f.properties.is_empty());
    }

    #[test]
    fn reads_ndjson_features() {
        let input = "{\"type\":\"Feature\",\"geometry\":{\"type\":\"Point\",\"coordinates\":[1,1]},\"properties\":{}}\n\
                      {\"type\":\"Feature\",\"geometry\":{\"type\":\"Point\",\"coordinates\":[2,2]},\"properties\":{}}\n";
        let mut reader = FeatureReader::new(input.as_bytes());
        let a = reader.read().unwrap().unwrap();
        let b = reader.read().unwrap().unwrap();
        assert_eq!(a.geometry, Some(Geometry::Point(Coord::xy(1.0, 1.0))));
        assert_eq!(b.geometry, Some(Geometry::Point(Coord::xy(2.0, 2.0))));
        assert!(reader.read().unwrap().is_none());
    }

    #[test]
    fn duplicate_geometry_key_fails() {
        let input = r#"{"type":"Feature","geometry":null,"geometry":null,"properties":{}}"#;
        let mut reader = FeatureReader::new(input.as_bytes());
        assert!(reader.read().is_err());
    }

    #[test]
    fn non_string_non_number_id_is_rejected() {
        let input = r#"{"type":"Feature","id":true,"geometry":null,"properties":{}}"#;
        let mut reader = FeatureReader::new(input.as_bytes());
        assert!(reader.read().is_err());
    }

    #[test]
    fn writer_emits_empty_collection_when_nothing_written() {
        let mut buf = Vec::new();
        let writer = FeatureWriter::new(&mut buf);
        writer.close().unwrap();
        assert_eq!(
            std::str::from_utf8(&buf).unwrap(),
            r#"{"type":"FeatureCollection","features":[]}"#
        );
    }

    #[test]
    fn writer_joins_features_with_comma() {
        let mut buf = Vec::new();
        let mut writer = FeatureWriter::new(&mut buf);
        let f1 = Feature { geometry: Some(Geometry::Point(Coord::xy(0.0, 0.0))), ..Feature::new() };
        let f2 = Feature { geometry: Some(Geometry::Point(Coord::xy(1.0, 1.0))), ..Feature::new() };
        writer.write(&f1).unwrap();
        writer.write(&f2).unwrap();
        writer.close().unwrap();
        let text = std::str::from_utf8(&buf).unwrap();
        assert!(text.starts_with(r#"{"type":"FeatureCollection","features":[{"#));
        assert!(text.ends_with("]}"));
        assert_eq!(text.matches(r#""type":"Feature""#).count(), 2);
    }
}
