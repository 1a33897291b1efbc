//! Schema builder (C4): infers a typed column schema from a stream of
//! heterogeneous property maps.
//!
//! `geozero` has no schema-inference stage, since every writer target it
//! ships already has a fixed shape. This is grounded instead in its
//! `PropertyProcessor`/`ColumnValue` vocabulary for what a "scalar kind" is
//! (see [`crate::property`]), reimplemented as a pull-based builder over
//! [`crate::property::PropertyValue`] rather than a push-based visitor,
//! because two-phase buffered schema
//! discovery (§4.7.1) needs to inspect each record before deciding whether
//! the schema is [`SchemaBuilder::ready`], which a one-shot visitor cannot
//! express.

use crate::codec::Encoding;
use crate::error::{Error, Result};
use crate::property::{PropertyMap, PropertyValue};
use std::collections::BTreeMap;

/// A resolved leaf or composite field type.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldType {
    Bool,
    I32,
    I64,
    F32,
    F64,
    Binary,
    String,
    List(Box<FieldType>),
    Struct(Vec<(String, FieldType)>),
}

impl FieldType {
    fn label(&self) -> &'static str {
        match self {
            FieldType::Bool => "bool",
            FieldType::I32 => "i32",
            FieldType::I64 => "i64",
            FieldType::F32 => "f32",
            FieldType::F64 => "f64",
            FieldType::Binary => "binary",
            FieldType::String => "string",
            FieldType::List(_) => "list",
            FieldType::Struct(_) => "struct",
        }
    }
}

/// The built schema: fields in sorted-name order for determinism.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Schema {
    pub fields: Vec<(String, FieldType)>,
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&FieldType> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }
}

/// A field's inference state: either still waiting for a non-null,
/// non-empty value to appear, or permanently resolved.
#[derive(Clone, Debug, PartialEq)]
enum NodeState {
    Pending,
    Resolved(FieldType),
    /// A struct node tracks each sub-field's own state so nested schemas can
    /// evolve the same way top-level ones do.
    Struct(BTreeMap<String, NodeState>),
}

#[derive(Default)]
pub struct SchemaBuilder {
    fields: BTreeMap<String, NodeState>,
    /// Insertion order for non-property (geometry/bbox) columns, which are
    /// always resolved and never touched by `add`.
    extra_order: Vec<String>,
}

impl SchemaBuilder {
    pub fn new() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Merge one record's properties into the builder's running schema.
    pub fn add(&mut self, properties: &PropertyMap) -> Result<()> {
        for (name, value) in properties {
            let state = self.fields.entry(name.clone()).or_insert(NodeState::Pending);
            merge_state(name, state, value)?;
        }
        Ok(())
    }

    /// Add a geometry column under `name`, typed `binary` for WKB or
    /// `string` for WKT. Any other encoding is `UnsupportedEncoding`.
    pub fn add_geometry(&mut self, name: &str, encoding: &str) -> Result<()> {
        let field_type = match Encoding::parse(encoding) {
            Ok(Encoding::Wkb) => FieldType::Binary,
            Ok(Encoding::Wkt) => FieldType::String,
            Err(_) => return Err(Error::UnsupportedEncoding(encoding.to_string())),
        };
        self.insert_resolved(name, field_type);
        Ok(())
    }

    /// Add a non-null covering bbox struct column `{xmin, ymin, xmax, ymax}`
    /// of nullable f64 fields.
    pub fn add_bbox(&mut self, name: &str) {
        let field_type = FieldType::Struct(vec![
            ("xmin".to_string(), FieldType::F64),
            ("ymin".to_string(), FieldType::F64),
            ("xmax".to_string(), FieldType::F64),
            ("ymax".to_string(), FieldType::F64),
        ]);
        self.insert_resolved(name, field_type);
    }

    fn insert_resolved(&mut self, name: &str, field_type: FieldType) {
        if !self.fields.contains_key(name) {
            self.extra_order.push(name.to_string());
        }
        self.fields
            .insert(name.to_string(), NodeState::Resolved(field_type));
    }

    /// True iff no field (recursively) remains pending.
    pub fn ready(&self) -> bool {
        self.fields.values().all(state_ready)
    }

    /// Build the final [`Schema`], in sorted-name order. Fields still
    /// pending (all-null/all-empty-array columns) are omitted: they carried
    /// no type information to build a column from.
    pub fn build(&self) -> Schema {
        let mut fields = Vec::new();
        for (name, state) in &self.fields {
            if let Some(t) = resolve(state) {
                fields.push((name.clone(), t));
            }
        }
        Schema { fields }
    }
}

fn state_ready(state: &NodeState) -> bool {
    match state {
        NodeState::Pending => false,
        NodeState::Resolved(_) => true,
        NodeState::Struct(fields) => fields.values().all(state_ready),
    }
}

fn resolve(state: &NodeState) -> Option<FieldType> {
    match state {
        NodeState::Pending => None,
        NodeState::Resolved(t) => Some(t.clone()),
        NodeState::Struct(fields) => {
            let mut out = Vec::new();
            for (name, sub) in fields {
                if let Some(t) = resolve(sub) {
                    out.push((name.clone(), t));
                }
            }
            Some(FieldType::Struct(out))
        }
    }
}

fn merge_state(name: &str, state: &mut NodeState, value: &PropertyValue) -> Result<()> {
    match value {
        PropertyValue::Null => Ok(()), // a later null for an already-typed field is ignored
        PropertyValue::Map(obj) => merge_struct(name, state, obj),
        scalar_or_array => merge_scalar_or_array(name, state, scalar_or_array),
    }
}

fn merge_struct(
    name: &str,
    state: &mut NodeState,
    obj: &BTreeMap<String, PropertyValue>,
) -> Result<()> {
    match state {
        NodeState::Pending => {
            let mut sub = BTreeMap::new();
            for (k, v) in obj {
                let mut s = NodeState::Pending;
                merge_state(&format!("{name}.{k}"), &mut s, v)?;
                sub.insert(k.clone(), s);
            }
            *state = NodeState::Struct(sub);
            Ok(())
        }
        NodeState::Struct(sub) => {
            for (k, v) in obj {
                let entry = sub.entry(k.clone()).or_insert(NodeState::Pending);
                merge_state(&format!("{name}.{k}"), entry, v)?;
            }
            Ok(())
        }
        NodeState::Resolved(existing) => Err(Error::MixedScalarTypes(
            name.to_string(),
            existing.label(),
            "struct",
        )),
    }
}

fn merge_scalar_or_array(name: &str, state: &mut NodeState, value: &PropertyValue) -> Result<()> {
    let inferred = infer_scalar_or_array(name, value)?;
    let Some(inferred) = inferred else {
        return Ok(()); // empty array: stays pending
    };
    match state {
        NodeState::Pending => {
            *state = NodeState::Resolved(inferred);
            Ok(())
        }
        NodeState::Resolved(existing) => {
            if *existing == inferred {
                Ok(())
            } else {
                Err(Error::MixedScalarTypes(
                    name.to_string(),
                    existing.label(),
                    inferred.label(),
                ))
            }
        }
        NodeState::Struct(_) => Err(Error::MixedScalarTypes(
            name.to_string(),
            "struct",
            inferred.label(),
        )),
    }
}

/// Infer a [`FieldType`] for a scalar or (uniform-element) array value.
/// Returns `None` for null or an empty array -- "still pending".
fn infer_scalar_or_array(name: &str, value: &PropertyValue) -> Result<Option<FieldType>> {
    match value {
        PropertyValue::Null => Ok(None),
        PropertyValue::Bool(_) => Ok(Some(FieldType::Bool)),
        PropertyValue::Int(_) => Ok(Some(FieldType::I32)),
        PropertyValue::Long(_) => Ok(Some(FieldType::I64)),
        PropertyValue::Double(_) => Ok(Some(FieldType::F64)),
        PropertyValue::String(_) => Ok(Some(FieldType::String)),
        PropertyValue::Map(obj) => {
            let mut fields = Vec::new();
            for (k, v) in obj {
                if let Some(t) = infer_scalar_or_array(&format!("{name}.{k}"), v)? {
                    fields.push((k.clone(), t));
                }
            }
            Ok(Some(FieldType::Struct(fields)))
        }
        PropertyValue::Array(items) => {
            if items.is_empty() {
                return Ok(None);
            }
            let mut elem: Option<FieldType> = None;
            for item in items {
                if let Some(t) = infer_scalar_or_array(name, item)? {
                    match &elem {
                        None => elem = Some(t),
                        Some(existing) if *existing == t => {}
                        Some(existing) => {
                            return Err(Error::MixedElementTypes(
                                name.to_string(),
                                existing.label(),
                                t.label(),
                            ))
                        }
                    }
                }
            }
            Ok(elem.map(|t| FieldType::List(Box::new(t))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyValue as PV;

    fn props(pairs: &[(&str, PV)]) -> PropertyMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn null_then_value_resolves() {
        let mut b = SchemaBuilder::new();
        b.add(&props(&[("name", PV::Null)])).unwrap();
        assert!(!b.ready());
        b.add(&props(&[("name", PV::String("a".into()))])).unwrap();
        assert!(b.ready());
        let schema = b.build();
        assert_eq!(schema.field("name"), Some(&FieldType::String));
    }

    #[test]
    fn later_null_is_ignored() {
        let mut b = SchemaBuilder::new();
        b.add(&props(&[("name", PV::String("a".into()))])).unwrap();
        b.add(&props(&[("name", PV::Null)])).unwrap();
        assert!(b.ready());
        assert_eq!(b.build().field("name"), Some(&FieldType::String));
    }

    #[test]
    fn mixed_scalar_types_error() {
        let mut b = SchemaBuilder::new();
        b.add(&props(&[("n", PV::Int(1))])).unwrap();
        let err = b.add(&props(&[("n", PV::String("x".into()))]));
        assert!(matches!(err, Err(Error::MixedScalarTypes(..))));
    }

    #[test]
    fn mixed_element_types_error() {
        let mut b = SchemaBuilder::new();
        let arr = PV::Array(vec![PV::Int(1), PV::String("x".into())]);
        let err = b.add(&props(&[("tags", arr)]));
        assert!(matches!(err, Err(Error::MixedElementTypes(..))));
    }

    #[test]
    fn empty_array_stays_pending() {
        let mut b = SchemaBuilder::new();
        b.add(&props(&[("tags", PV::Array(vec![]))])).unwrap();
        assert!(!b.ready());
        b.add(&props(&[("tags", PV::Array(vec![PV::String("x".into())]))]))
            .unwrap();
        assert!(b.ready());
        assert_eq!(
            b.build().field("tags"),
            Some(&FieldType::List(Box::new(FieldType::String)))
        );
    }

    #[test]
    fn geometry_and_bbox_columns_are_immediately_resolved() {
        let mut b = SchemaBuilder::new();
        b.add_geometry("geometry", "WKB").unwrap();
        b.add_bbox("bbox");
        assert!(b.ready());
        let schema = b.build();
        assert_eq!(schema.field("geometry"), Some(&FieldType::Binary));
        assert!(matches!(schema.field("bbox"), Some(FieldType::Struct(_))));
    }

    #[test]
    fn unsupported_geometry_encoding_errors() {
        let mut b = SchemaBuilder::new();
        assert!(matches!(
            b.add_geometry("geometry", "EWKB"),
            Err(Error::UnsupportedEncoding(_))
        ));
    }
}
