//! Bridges the crate-local [`crate::schema::Schema`] / [`crate::property`]
//! value model to `arrow-schema`/`arrow-array`, the dependency this crate
//! adopts in place of `arrow2` (see DESIGN.md: `arrow2` exposes no
//! column-chunk statistics API, which C8's predicate pushdown requires).

use crate::error::{Error, Result};
use crate::property::{PropertyMap, PropertyValue};
use crate::schema::{FieldType, Schema};
use arrow_array::builder::{
    ArrayBuilder, BinaryBuilder, BooleanBuilder, Float32Builder, Float64Builder, Int32Builder,
    Int64Builder, ListBuilder, StringBuilder,
};
use arrow_array::{
    Array, ArrayRef, BinaryArray, BooleanArray, Float32Array, Float64Array, Int32Array,
    Int64Array, ListArray, RecordBatch, StringArray, StructArray,
};
use crate::geometry::Geometry;
use arrow_schema::{DataType, Field, Fields, Schema as ArrowSchema};
use arrow_select::concat::concat;
use std::collections::HashMap;
use std::sync::Arc;

/// Map a crate-local [`FieldType`] to its Arrow `DataType`. All leaves are
/// nullable (§3.3).
pub fn data_type(field_type: &FieldType) -> DataType {
    match field_type {
        FieldType::Bool => DataType::Boolean,
        FieldType::I32 => DataType::Int32,
        FieldType::I64 => DataType::Int64,
        FieldType::F32 => DataType::Float32,
        FieldType::F64 => DataType::Float64,
        FieldType::Binary => DataType::Binary,
        FieldType::String => DataType::Utf8,
        FieldType::List(inner) => {
            DataType::List(Arc::new(Field::new("item", data_type(inner), true)))
        }
        FieldType::Struct(fields) => DataType::Struct(Fields::from(
            fields
                .iter()
                .map(|(name, t)| Field::new(name, data_type(t), true))
                .collect::<Vec<_>>(),
        )),
    }
}

/// Build an `arrow_schema::Schema` from the inferred [`Schema`], in the
/// builder's sorted-name field order.
pub fn to_arrow_schema(schema: &Schema) -> ArrowSchema {
    let fields: Vec<Field> = schema
        .fields
        .iter()
        .map(|(name, t)| Field::new(name, data_type(t), true))
        .collect();
    ArrowSchema::new(fields)
}

/// The reverse of [`data_type`]: best-effort recovery of a [`FieldType`]
/// from an Arrow `DataType`, for batches read back from a file this crate
/// did not necessarily write itself (plain Parquet with no `geo` key, or a
/// GeoParquet file written by another implementation).
pub fn field_type(data_type: &DataType) -> Result<FieldType> {
    match data_type {
        DataType::Boolean => Ok(FieldType::Bool),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::UInt8 | DataType::UInt16 => {
            Ok(FieldType::I32)
        }
        DataType::Int64 | DataType::UInt32 | DataType::UInt64 => Ok(FieldType::I64),
        DataType::Float32 => Ok(FieldType::F32),
        DataType::Float64 => Ok(FieldType::F64),
        DataType::Binary | DataType::LargeBinary => Ok(FieldType::Binary),
        DataType::Utf8 | DataType::LargeUtf8 => Ok(FieldType::String),
        DataType::List(field) | DataType::LargeList(field) => {
            Ok(FieldType::List(Box::new(field_type(field.data_type())?)))
        }
        DataType::Struct(fields) => {
            let mut out = Vec::with_capacity(fields.len());
            for field in fields {
                out.push((field.name().clone(), field_type(field.data_type())?));
            }
            Ok(FieldType::Struct(out))
        }
        other => Err(Error::Other(format!("unsupported Arrow data type {other:?}"))),
    }
}

/// Recover a crate-local [`Schema`] from an Arrow schema, in the schema's
/// own column order (not sorted, unlike [`SchemaBuilder::build`]'s output --
/// a file read back preserves whatever order it was written in).
pub fn from_arrow_schema(arrow_schema: &ArrowSchema) -> Schema {
    let fields = arrow_schema
        .fields()
        .iter()
        .filter_map(|f| field_type(f.data_type()).ok().map(|t| (f.name().clone(), t)))
        .collect();
    Schema { fields }
}

/// A single column's worth of in-progress row data, built up one
/// [`PropertyValue`] / raw geometry bytes at a time, then finished into an
/// Arrow `ArrayRef`.
pub enum ColumnBuilder {
    Bool(BooleanBuilder),
    I32(Int32Builder),
    I64(Int64Builder),
    F32(Float32Builder),
    F64(Float64Builder),
    Binary(BinaryBuilder),
    String(StringBuilder),
    List(Box<FieldType>, ListBuilder<Box<ColumnBuilder>>),
    Struct(Vec<(String, FieldType)>, Vec<ColumnBuilder>),
}

// `ListBuilder` requires its inner builder to implement `ArrayBuilder`; we
// only ever build homogeneous scalar-leaf lists (the schema builder forbids
// mixed element types), so a thin delegating impl is enough.
impl ArrayBuilder for ColumnBuilder {
    fn len(&self) -> usize {
        match self {
            ColumnBuilder::Bool(b) => b.len(),
            ColumnBuilder::I32(b) => b.len(),
            ColumnBuilder::I64(b) => b.len(),
            ColumnBuilder::F32(b) => b.len(),
            ColumnBuilder::F64(b) => b.len(),
            ColumnBuilder::Binary(b) => b.len(),
            ColumnBuilder::String(b) => b.len(),
            ColumnBuilder::List(_, b) => b.len(),
            ColumnBuilder::Struct(_, fields) => fields.first().map_or(0, |f| f.len()),
        }
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn finish(&mut self) -> ArrayRef {
        finish_builder(self)
    }

    fn finish_cloned(&self) -> ArrayRef {
        // Builders are only ever finished once per batch in this crate.
        unimplemented!("finish_cloned is not used by the record writer")
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn into_box_any(self: Box<Self>) -> Box<dyn std::any::Any> {
        self
    }
}

impl ColumnBuilder {
    pub fn new(field_type: &FieldType) -> ColumnBuilder {
        match field_type {
            FieldType::Bool => ColumnBuilder::Bool(BooleanBuilder::new()),
            FieldType::I32 => ColumnBuilder::I32(Int32Builder::new()),
            FieldType::I64 => ColumnBuilder::I64(Int64Builder::new()),
            FieldType::F32 => ColumnBuilder::F32(Float32Builder::new()),
            FieldType::F64 => ColumnBuilder::F64(Float64Builder::new()),
            FieldType::Binary => ColumnBuilder::Binary(BinaryBuilder::new()),
            FieldType::String => ColumnBuilder::String(StringBuilder::new()),
            FieldType::List(inner) => ColumnBuilder::List(
                inner.clone(),
                ListBuilder::new(Box::new(ColumnBuilder::new(inner))),
            ),
            FieldType::Struct(fields) => ColumnBuilder::Struct(
                fields.clone(),
                fields.iter().map(|(_, t)| ColumnBuilder::new(t)).collect(),
            ),
        }
    }

    pub fn append_null(&mut self) {
        match self {
            ColumnBuilder::Bool(b) => b.append_null(),
            ColumnBuilder::I32(b) => b.append_null(),
            ColumnBuilder::I64(b) => b.append_null(),
            ColumnBuilder::F32(b) => b.append_null(),
            ColumnBuilder::F64(b) => b.append_null(),
            ColumnBuilder::Binary(b) => b.append_null(),
            ColumnBuilder::String(b) => b.append_null(),
            ColumnBuilder::List(_, b) => b.append(false),
            ColumnBuilder::Struct(_, fields) => {
                for f in fields {
                    f.append_null();
                }
            }
        }
    }

    pub fn append_value(&mut self, value: &PropertyValue) -> Result<()> {
        if value.is_null() {
            self.append_null();
            return Ok(());
        }
        match (self, value) {
            (ColumnBuilder::Bool(b), PropertyValue::Bool(v)) => b.append_value(*v),
            (ColumnBuilder::I32(b), PropertyValue::Int(v)) => b.append_value(*v),
            (ColumnBuilder::I64(b), PropertyValue::Long(v)) => b.append_value(*v),
            (ColumnBuilder::I64(b), PropertyValue::Int(v)) => b.append_value(*v as i64),
            (ColumnBuilder::F64(b), PropertyValue::Double(v)) => b.append_value(*v),
            (ColumnBuilder::F32(b), PropertyValue::Double(v)) => b.append_value(*v as f32),
            (ColumnBuilder::String(b), PropertyValue::String(v)) => b.append_value(v),
            (ColumnBuilder::List(inner, b), PropertyValue::Array(items)) => {
                for item in items {
                    b.values().append_value(item)?;
                }
                let _ = inner;
                b.append(true);
            }
            (ColumnBuilder::Struct(field_defs, fields), PropertyValue::Map(map)) => {
                for ((name, _), builder) in field_defs.iter().zip(fields.iter_mut()) {
                    match map.get(name) {
                        Some(v) => builder.append_value(v)?,
                        None => builder.append_null(),
                    }
                }
            }
            (builder, v) => {
                return Err(Error::Other(format!(
                    "schema/value type mismatch while building column (got {})",
                    v.kind_label()
                )))
            }
        }
        Ok(())
    }
}

fn append_to_values(builder: &mut Box<ColumnBuilder>, value: &PropertyValue) -> Result<()> {
    builder.append_value(value)
}

// Small shim so `ListBuilder<Box<ColumnBuilder>>::values()` can be used with
// `.append_value(item)` the way the scalar Arrow builders expose it.
trait AppendValue {
    fn append_value(&mut self, value: &PropertyValue) -> Result<()>;
}

impl AppendValue for Box<ColumnBuilder> {
    fn append_value(&mut self, value: &PropertyValue) -> Result<()> {
        append_to_values(self, value)
    }
}

fn finish_builder(builder: &mut ColumnBuilder) -> ArrayRef {
    match builder {
        ColumnBuilder::Bool(b) => Arc::new(b.finish()),
        ColumnBuilder::I32(b) => Arc::new(b.finish()),
        ColumnBuilder::I64(b) => Arc::new(b.finish()),
        ColumnBuilder::F32(b) => Arc::new(b.finish()),
        ColumnBuilder::F64(b) => Arc::new(b.finish()),
        ColumnBuilder::Binary(b) => Arc::new(b.finish()),
        ColumnBuilder::String(b) => Arc::new(b.finish()),
        ColumnBuilder::List(_, b) => Arc::new(b.finish()),
        ColumnBuilder::Struct(field_defs, fields) => {
            let arrow_fields: Vec<Field> = field_defs
                .iter()
                .map(|(name, t)| Field::new(name, data_type(t), true))
                .collect();
            let arrays: Vec<ArrayRef> = fields.iter_mut().map(finish_builder).collect();
            let pairs: Vec<(Arc<Field>, ArrayRef)> = arrow_fields
                .into_iter()
                .map(Arc::new)
                .zip(arrays)
                .collect();
            Arc::new(arrow_array::StructArray::from(pairs))
        }
    }
}

/// Build a single `RecordBatch` from a slice of property maps plus
/// already-encoded extra columns (geometry bytes, bbox structs, ...),
/// following `schema`'s field order.
pub fn build_record_batch(
    arrow_schema: Arc<ArrowSchema>,
    schema: &Schema,
    rows: &[PropertyMap],
    extra_columns: &std::collections::HashMap<String, ArrayRef>,
) -> Result<RecordBatch> {
    let mut arrays = Vec::with_capacity(schema.fields.len());
    for (name, field_type) in &schema.fields {
        if let Some(array) = extra_columns.get(name) {
            arrays.push(array.clone());
            continue;
        }
        let mut builder = ColumnBuilder::new(field_type);
        for row in rows {
            match row.get(name) {
                Some(v) => builder.append_value(v)?,
                None => builder.append_null(),
            }
        }
        arrays.push(finish_builder(&mut builder));
    }
    RecordBatch::try_new(arrow_schema, arrays).map_err(Error::from)
}

/// A single-row WKB binary array, `None` for a null geometry -- the shape
/// [`crate::record::RecordWriter::push_extra_column`] expects for a geometry
/// column registered outside the property map.
pub fn geometry_wkb_array(geom: Option<&Geometry>) -> Result<ArrayRef> {
    match geom {
        None => Ok(Arc::new(BinaryArray::from(vec![None::<&[u8]>]))),
        Some(g) => {
            let bytes = crate::codec::encode_wkb(g)?;
            Ok(Arc::new(BinaryArray::from(vec![Some(bytes.as_slice())])))
        }
    }
}

/// A single-row WKT string array, `None` for a null geometry.
pub fn geometry_wkt_array(geom: Option<&Geometry>) -> Result<ArrayRef> {
    match geom {
        None => Ok(Arc::new(StringArray::from(vec![None::<&str>]))),
        Some(g) => {
            let text = crate::codec::encode_wkt(g)?;
            Ok(Arc::new(StringArray::from(vec![Some(text.as_str())])))
        }
    }
}

/// Concatenate each column's per-row (length-1) arrays, accumulated by
/// [`crate::record::RecordWriter::push_extra_column`], into one array per
/// column spanning the whole buffered batch. Drains `buffered` so a second
/// flush starts from empty columns.
pub fn concat_extra_columns(
    buffered: &mut HashMap<String, Vec<ArrayRef>>,
) -> Result<HashMap<String, ArrayRef>> {
    let mut out = HashMap::new();
    for (name, arrays) in buffered.drain() {
        if arrays.is_empty() {
            continue;
        }
        let refs: Vec<&dyn Array> = arrays.iter().map(|a| a.as_ref()).collect();
        let combined = concat(&refs).map_err(Error::from)?;
        out.insert(name, combined);
    }
    Ok(out)
}

/// Read a single row of `array` back into a [`PropertyValue`], guided by the
/// inferred [`FieldType`]. The reverse of [`ColumnBuilder::append_value`].
pub fn array_value_as_property(
    array: &dyn Array,
    row: usize,
    field_type: &FieldType,
) -> Result<PropertyValue> {
    if array.is_null(row) {
        return Ok(PropertyValue::Null);
    }
    let mismatch = || Error::Other(format!("column does not match inferred type {field_type:?}"));
    match field_type {
        FieldType::Bool => {
            let a = array.as_any().downcast_ref::<BooleanArray>().ok_or_else(mismatch)?;
            Ok(PropertyValue::Bool(a.value(row)))
        }
        FieldType::I32 => {
            let a = array.as_any().downcast_ref::<Int32Array>().ok_or_else(mismatch)?;
            Ok(PropertyValue::Int(a.value(row)))
        }
        FieldType::I64 => {
            let a = array.as_any().downcast_ref::<Int64Array>().ok_or_else(mismatch)?;
            Ok(PropertyValue::Long(a.value(row)))
        }
        FieldType::F32 => {
            let a = array.as_any().downcast_ref::<Float32Array>().ok_or_else(mismatch)?;
            Ok(PropertyValue::Double(a.value(row) as f64))
        }
        FieldType::F64 => {
            let a = array.as_any().downcast_ref::<Float64Array>().ok_or_else(mismatch)?;
            Ok(PropertyValue::Double(a.value(row)))
        }
        FieldType::String => {
            let a = array.as_any().downcast_ref::<StringArray>().ok_or_else(mismatch)?;
            Ok(PropertyValue::String(a.value(row).to_string()))
        }
        FieldType::Binary => Err(Error::Other(
            "binary-typed property columns have no JSON representation".to_string(),
        )),
        FieldType::List(inner) => {
            let a = array.as_any().downcast_ref::<ListArray>().ok_or_else(mismatch)?;
            let values = a.value(row);
            let mut out = Vec::with_capacity(values.len());
            for i in 0..values.len() {
                out.push(array_value_as_property(values.as_ref(), i, inner)?);
            }
            Ok(PropertyValue::Array(out))
        }
        FieldType::Struct(fields) => {
            let a = array.as_any().downcast_ref::<StructArray>().ok_or_else(mismatch)?;
            let mut out = std::collections::BTreeMap::new();
            for (name, t) in fields {
                let col = a
                    .column_by_name(name)
                    .ok_or_else(|| Error::UnknownColumn(name.clone()))?;
                out.insert(name.clone(), array_value_as_property(col.as_ref(), row, t)?);
            }
            Ok(PropertyValue::Map(out))
        }
    }
}

/// Build the property map for one row of `batch`, following `schema`'s field
/// order and skipping any column named in `exclude` (geometry/bbox columns
/// handled separately by the caller).
pub fn row_properties(
    batch: &RecordBatch,
    schema: &Schema,
    row: usize,
    exclude: &[String],
) -> Result<PropertyMap> {
    let mut props = PropertyMap::new();
    for (name, field_type) in &schema.fields {
        if exclude.iter().any(|e| e == name) {
            continue;
        }
        let col = batch
            .column_by_name(name)
            .ok_or_else(|| Error::UnknownColumn(name.clone()))?;
        props.insert(name.clone(), array_value_as_property(col.as_ref(), row, field_type)?);
    }
    Ok(props)
}

/// The raw WKB/WKT bytes of `column` at `row`, `None` for a null/empty value.
pub fn geometry_raw_at<'a>(
    batch: &'a RecordBatch,
    column: &str,
) -> Result<crate::codec::RawColumn<'a>> {
    let col = batch
        .column_by_name(column)
        .ok_or_else(|| Error::UnknownColumn(column.to_string()))?;
    if let Some(a) = col.as_any().downcast_ref::<BinaryArray>() {
        Ok(crate::codec::RawColumn::Bytes(a))
    } else if let Some(a) = col.as_any().downcast_ref::<StringArray>() {
        Ok(crate::codec::RawColumn::Text(a))
    } else {
        Err(Error::BadGeometry(format!("column \"{column}\" is neither binary nor string")))
    }
}

/// One sub-field of a covering bbox struct column at `row`, `None` if the
/// struct, or the field itself, is null.
pub fn struct_f64_field(
    batch: &RecordBatch,
    struct_column: &str,
    field_name: &str,
    row: usize,
) -> Result<Option<f64>> {
    let col = batch
        .column_by_name(struct_column)
        .ok_or_else(|| Error::UnknownColumn(struct_column.to_string()))?;
    let s = col
        .as_any()
        .downcast_ref::<StructArray>()
        .ok_or_else(|| Error::BadBboxStruct(struct_column.to_string(), "not a struct column".to_string()))?;
    if s.is_null(row) {
        return Ok(None);
    }
    let field = s
        .column_by_name(field_name)
        .ok_or_else(|| Error::BadBboxStruct(struct_column.to_string(), field_name.to_string()))?;
    let f = field
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| Error::BadBboxStruct(struct_column.to_string(), field_name.to_string()))?;
    if f.is_null(row) {
        Ok(None)
    } else {
        Ok(Some(f.value(row)))
    }
}

/// Build a single-row four-field bbox struct array `{xmin, ymin, xmax,
/// ymax}`, all non-null -- the per-row covering column value.
pub fn bbox_struct_array(bound: &crate::bbox::Bbox) -> ArrayRef {
    let fields = vec![
        Field::new("xmin", DataType::Float64, true),
        Field::new("ymin", DataType::Float64, true),
        Field::new("xmax", DataType::Float64, true),
        Field::new("ymax", DataType::Float64, true),
    ];
    let arrays: Vec<ArrayRef> = vec![
        Arc::new(Float64Array::from(vec![bound.xmin])),
        Arc::new(Float64Array::from(vec![bound.ymin])),
        Arc::new(Float64Array::from(vec![bound.xmax])),
        Arc::new(Float64Array::from(vec![bound.ymax])),
    ];
    let pairs: Vec<(Arc<Field>, ArrayRef)> =
        fields.into_iter().map(Arc::new).zip(arrays).collect();
    Arc::new(StructArray::from(pairs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;

    #[test]
    fn data_type_maps_primitives() {
        assert_eq!(data_type(&FieldType::Bool), DataType::Boolean);
        assert_eq!(data_type(&FieldType::Binary), DataType::Binary);
        assert_eq!(data_type(&FieldType::String), DataType::Utf8);
    }

    #[test]
    fn builds_record_batch_from_rows() {
        let mut builder = SchemaBuilder::new();
        let mut row = PropertyMap::new();
        row.insert("name".to_string(), PropertyValue::String("a".into()));
        row.insert("count".to_string(), PropertyValue::Int(3));
        builder.add(&row).unwrap();
        let schema = builder.build();
        let arrow_schema = Arc::new(to_arrow_schema(&schema));
        let batch = build_record_batch(
            arrow_schema,
            &schema,
            &[row],
            &std::collections::HashMap::new(),
        )
        .unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.num_columns(), 2);
    }
}
