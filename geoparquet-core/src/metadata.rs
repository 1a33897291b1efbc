//! `geo` file metadata model (C3): the JSON document stored under the
//! Parquet file's `geo` key-value metadata entry (§3.1).
//!
//! Structurally grounded in `geozero`'s
//! `src/arrow/geoparquet_reader.rs` `GeoParquetFileMetadata` /
//! `GeoParquetColumnMetadata` (serde-derived structs over the same field
//! set), generalized here with the fields that read-only struct never
//! needed: `covering`, `epoch`, and `bbox` lifecycle mutation used while
//! writing (`union_bounds`, `add_geometry_type`).

use crate::bbox::Bbox;
use crate::error::{Error, Result};
use parquet::format::KeyValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const GEO_METADATA_KEY: &str = "geo";
pub const DEFAULT_VERSION: &str = "1.0.0";
pub const DEFAULT_PRIMARY_COLUMN: &str = "geometry";
pub const DEFAULT_ENCODING: &str = "WKB";

/// `covering.bbox.{xmin,ymin,xmax,ymax}`: each a two-element `[column,
/// field]` path into a struct column holding per-row bounding boxes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoveringBbox {
    pub xmin: [String; 2],
    pub ymin: [String; 2],
    pub xmax: [String; 2],
    pub ymax: [String; 2],
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Covering {
    pub bbox: CoveringBbox,
}

/// A single geometry column descriptor (§3.1 table).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeometryColumn {
    pub encoding: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub geometry_types: Vec<String>,
    /// Legacy singular form, coalesced into `geometry_types` by
    /// [`Metadata::get_geometry_types`]. Never written back out.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "geometry_type")]
    pub geometry_type_legacy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edges: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covering: Option<Covering>,
}

impl GeometryColumn {
    pub fn new(encoding: &str) -> GeometryColumn {
        GeometryColumn {
            encoding: encoding.to_string(),
            geometry_types: Vec::new(),
            geometry_type_legacy: None,
            crs: None,
            edges: None,
            orientation: None,
            bbox: None,
            epoch: None,
            covering: None,
        }
    }

    /// Union a 2D bound into this column's running `bbox`, as 4 numbers.
    pub fn union_bounds(&mut self, bound: &Bbox) {
        let mut current = self.as_bbox_4();
        current.expand(bound);
        self.bbox = Some(current.as_array().to_vec());
    }

    fn as_bbox_4(&self) -> Bbox {
        match &self.bbox {
            Some(v) if v.len() >= 4 => {
                let (xmin, ymin) = (v[0], v[1]);
                let (xmax, ymax) = if v.len() == 6 { (v[3], v[4]) } else { (v[2], v[3]) };
                Bbox::new(xmin, ymin, xmax, ymax)
            }
            _ => Bbox::default(),
        }
    }

    pub fn add_geometry_type(&mut self, kind: &str) {
        if !self.geometry_types.iter().any(|t| t == kind) {
            self.geometry_types.push(kind.to_string());
        }
    }
}

/// The top-level `geo` metadata document (§3.1).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub version: String,
    pub primary_column: String,
    pub columns: BTreeMap<String, GeometryColumn>,
}

impl Metadata {
    /// A freshly constructed metadata document: version `1.0.0`, primary
    /// column `"geometry"`, one WKB column with empty types -- the
    /// converter's defaults (§3.1 "Lifecycle").
    pub fn default_for_primary(primary_column: &str) -> Metadata {
        let mut columns = BTreeMap::new();
        columns.insert(
            primary_column.to_string(),
            GeometryColumn::new(DEFAULT_ENCODING),
        );
        Metadata {
            version: DEFAULT_VERSION.to_string(),
            primary_column: primary_column.to_string(),
            columns,
        }
    }

    pub fn parse(json_bytes: &[u8]) -> Result<Metadata> {
        let meta: Metadata = serde_json::from_slice(json_bytes)?;
        Ok(meta)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// `geo.columns[primary_column]` must exist (§3.1 invariants).
    pub fn validate_primary_column(&self) -> Result<()> {
        if self.columns.contains_key(&self.primary_column) {
            Ok(())
        } else {
            Err(Error::MissingPrimaryColumn(self.primary_column.clone()))
        }
    }

    pub fn primary(&self) -> Option<&GeometryColumn> {
        self.columns.get(&self.primary_column)
    }

    pub fn primary_mut(&mut self) -> Option<&mut GeometryColumn> {
        self.columns.get_mut(&self.primary_column)
    }

    /// Coalesce the legacy singular `geometry_type` with the plural
    /// `geometry_types`; `[]` when both are absent.
    pub fn get_geometry_types(&self, column: &str) -> Vec<String> {
        let Some(col) = self.columns.get(column) else {
            return Vec::new();
        };
        if !col.geometry_types.is_empty() {
            return col.geometry_types.clone();
        }
        match &col.geometry_type_legacy {
            Some(t) if !t.is_empty() => vec![t.clone()],
            _ => Vec::new(),
        }
    }

    /// Locate the `geo` metadata entry in a Parquet file's key-value
    /// metadata and parse it. `NoMetadata` if absent, `DuplicateMetadata`
    /// if the key appears more than once.
    pub fn from_key_value_metadata(kvs: &[KeyValue]) -> Result<Metadata> {
        let matches: Vec<&KeyValue> = kvs.iter().filter(|kv| kv.key == GEO_METADATA_KEY).collect();
        match matches.len() {
            0 => Err(Error::NoMetadata),
            1 => {
                let value = matches[0].value.as_deref().ok_or(Error::NoMetadata)?;
                Metadata::parse(value.as_bytes())
            }
            _ => Err(Error::DuplicateMetadata),
        }
    }

    pub fn to_key_value(&self) -> Result<KeyValue> {
        let json = String::from_utf8(self.serialize()?).map_err(|e| Error::Other(e.to_string()))?;
        Ok(KeyValue {
            key: GEO_METADATA_KEY.to_string(),
            value: Some(json),
        })
    }
}

/// Index of the covering bbox column, `None` when no covering column is
/// configured (a `-1` sentinel expressed as an `Option`).
#[derive(Clone, Debug, PartialEq)]
pub struct BboxColumn {
    /// Column index of the covering struct column, resolved against the
    /// caller's schema; `None` if absent.
    pub column_index: Option<usize>,
    pub column_name: String,
    pub primary_geometry_index: Option<usize>,
    pub field_names: [String; 4], // xmin, ymin, xmax, ymax
}

impl BboxColumn {
    pub fn is_present(&self) -> bool {
        self.column_index.is_some()
    }
}

/// Resolve the covering bbox column for `meta`'s primary geometry column
/// against `column_names` (an ordered list standing in for the caller's
/// Arrow/Parquet schema). Two policies, as the REDESIGN note describes:
/// the default name `"bbox"`, or the path named by `covering.bbox.*[0]`.
pub fn get_bbox_column(column_names: &[String], meta: &Metadata) -> BboxColumn {
    let primary_geometry_index = column_names.iter().position(|n| n == &meta.primary_column);

    let (name, fields) = match meta.primary().and_then(|c| c.covering.as_ref()) {
        Some(covering) => (
            covering.bbox.xmin[0].clone(),
            [
                covering.bbox.xmin[1].clone(),
                covering.bbox.ymin[1].clone(),
                covering.bbox.xmax[1].clone(),
                covering.bbox.ymax[1].clone(),
            ],
        ),
        None => (
            "bbox".to_string(),
            [
                "xmin".to_string(),
                "ymin".to_string(),
                "xmax".to_string(),
                "ymax".to_string(),
            ],
        ),
    };

    let column_index = column_names.iter().position(|n| n == &name).filter(|_| {
        // Only report presence when the metadata actually declares a
        // covering, or the conventional "bbox" column happens to exist.
        meta.primary().and_then(|c| c.covering.as_ref()).is_some() || name == "bbox"
    });

    BboxColumn {
        column_index,
        column_name: name,
        primary_geometry_index,
        field_names: fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_document() {
        let json = br#"{"version":"1.0.0","primary_column":"geometry","columns":{"geometry":{"encoding":"WKB","geometry_types":[]}}}"#;
        let meta = Metadata::parse(json).unwrap();
        assert_eq!(meta.primary_column, "geometry");
        assert!(meta.validate_primary_column().is_ok());
    }

    #[test]
    fn legacy_singular_geometry_type_is_coalesced() {
        let json = br#"{"version":"1.0.0","primary_column":"geometry","columns":{"geometry":{"encoding":"WKB","geometry_type":"Point"}}}"#;
        let meta = Metadata::parse(json).unwrap();
        assert_eq!(meta.get_geometry_types("geometry"), vec!["Point".to_string()]);
    }

    #[test]
    fn missing_primary_column_is_invariant_violation() {
        let json = br#"{"version":"1.0.0","primary_column":"geom","columns":{"geometry":{"encoding":"WKB","geometry_types":[]}}}"#;
        let meta = Metadata::parse(json).unwrap();
        assert!(matches!(
            meta.validate_primary_column(),
            Err(Error::MissingPrimaryColumn(_))
        ));
    }

    #[test]
    fn duplicate_key_is_an_error() {
        let kvs = vec![
            KeyValue { key: "geo".into(), value: Some("{}".into()) },
            KeyValue { key: "geo".into(), value: Some("{}".into()) },
        ];
        assert!(matches!(
            Metadata::from_key_value_metadata(&kvs),
            Err(Error::DuplicateMetadata)
        ));
    }

    #[test]
    fn absent_key_is_no_metadata() {
        let kvs = vec![KeyValue { key: "other".into(), value: None }];
        assert!(matches!(
            Metadata::from_key_value_metadata(&kvs),
            Err(Error::NoMetadata)
        ));
    }

    #[test]
    fn default_bbox_column_name_is_bbox() {
        let meta = Metadata::default_for_primary("geometry");
        let cols = vec!["geometry".to_string(), "bbox".to_string()];
        let bc = get_bbox_column(&cols, &meta);
        assert!(bc.is_present());
        assert_eq!(bc.column_name, "bbox");
    }

    #[test]
    fn covering_bbox_overrides_default_name() {
        let mut meta = Metadata::default_for_primary("geometry");
        meta.primary_mut().unwrap().covering = Some(Covering {
            bbox: CoveringBbox {
                xmin: ["my_bbox".into(), "x_min".into()],
                ymin: ["my_bbox".into(), "y_min".into()],
                xmax: ["my_bbox".into(), "x_max".into()],
                ymax: ["my_bbox".into(), "y_max".into()],
            },
        });
        let cols = vec!["geometry".to_string(), "my_bbox".to_string()];
        let bc = get_bbox_column(&cols, &meta);
        assert_eq!(bc.column_name, "my_bbox");
        assert_eq!(bc.field_names[0], "x_min");
    }
}
