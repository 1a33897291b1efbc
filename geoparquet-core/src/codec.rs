//! Geometry codec adapter (C1): encoding-aware decode dispatch on top of the
//! [`crate::wkb`] and [`crate::wkt`] codecs.

use crate::error::{Error, Result};
use crate::geometry::Geometry;
use crate::{wkb, wkt};
use arrow_array::{Array, BinaryArray, StringArray};

/// The declared or sniffed encoding of a geometry column value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    Wkb,
    Wkt,
}

impl Encoding {
    /// Parse a `geo` metadata `encoding` string. Only `"WKB"` is accepted by
    /// the metadata model (§3.1); this is used by the codec layer which is
    /// more permissive (readers may additionally accept `WKT`).
    pub fn parse(s: &str) -> Result<Encoding> {
        match s {
            "WKB" => Ok(Encoding::Wkb),
            "WKT" => Ok(Encoding::Wkt),
            other => Err(Error::InvalidEncoding(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Wkb => "WKB",
            Encoding::Wkt => "WKT",
        }
    }
}

/// A raw encoded geometry value as stored in a Parquet column.
#[derive(Clone, Debug)]
pub enum RawValue<'a> {
    Bytes(&'a [u8]),
    Text(&'a str),
}

/// Decode a raw column value into a [`Geometry`], or `None` for a null
/// geometry (empty WKB bytes decode to `None`, not an error).
///
/// `encoding` is the declared encoding string from `geo` metadata. An empty
/// string means "sniff from the value's runtime shape": bytes are read as
/// WKB, text as WKT. Any other string is `InvalidEncoding`.
pub fn decode(value: &RawValue<'_>, encoding: &str) -> Result<Option<Geometry>> {
    let resolved = if encoding.is_empty() {
        match value {
            RawValue::Bytes(_) => Encoding::Wkb,
            RawValue::Text(_) => Encoding::Wkt,
        }
    } else {
        Encoding::parse(encoding)?
    };

    match (resolved, value) {
        (Encoding::Wkb, RawValue::Bytes(bytes)) => {
            if bytes.is_empty() {
                Ok(None)
            } else {
                Ok(Some(wkb::decode_wkb(bytes)?))
            }
        }
        (Encoding::Wkb, RawValue::Text(_)) => {
            Err(Error::BadGeometry("WKB encoding requires a bytes value".into()))
        }
        (Encoding::Wkt, RawValue::Text(text)) => {
            if text.is_empty() {
                Ok(None)
            } else {
                Ok(Some(wkt::decode_wkt(text)?))
            }
        }
        (Encoding::Wkt, RawValue::Bytes(_)) => {
            Err(Error::BadGeometry("WKT encoding requires a string value".into()))
        }
    }
}

/// A whole geometry column as read from a record batch, kept generic over
/// its physical Arrow representation so callers don't need to re-downcast
/// per row.
pub enum RawColumn<'a> {
    Bytes(&'a BinaryArray),
    Text(&'a StringArray),
}

impl<'a> RawColumn<'a> {
    pub fn is_null(&self, row: usize) -> bool {
        match self {
            RawColumn::Bytes(a) => a.is_null(row),
            RawColumn::Text(a) => a.is_null(row),
        }
    }

    pub fn value(&self, row: usize) -> RawValue<'a> {
        match self {
            RawColumn::Bytes(a) => RawValue::Bytes(a.value(row)),
            RawColumn::Text(a) => RawValue::Text(a.value(row)),
        }
    }

    /// Decode row `row`, or `None` for a null/empty value, using `encoding`
    /// (empty sniffs from the column's physical representation).
    pub fn decode_row(&self, row: usize, encoding: &str) -> Result<Option<Geometry>> {
        if self.is_null(row) {
            return Ok(None);
        }
        decode(&self.value(row), encoding)
    }
}

/// Encode a geometry to WKB bytes (the primary write-side output per §6.1).
pub fn encode_wkb(geom: &Geometry) -> Result<Vec<u8>> {
    wkb::encode_wkb(geom)
}

/// Encode a geometry to WKT text.
pub fn encode_wkt(geom: &Geometry) -> Result<String> {
    wkt::encode_wkt(geom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Coord;

    #[test]
    fn empty_wkb_bytes_decode_to_null() {
        let v = RawValue::Bytes(&[]);
        assert_eq!(decode(&v, "WKB").unwrap(), None);
    }

    #[test]
    fn sniffs_encoding_when_unspecified() {
        let geom = Geometry::Point(Coord::xy(1.0, 2.0));
        let bytes = encode_wkb(&geom).unwrap();
        let v = RawValue::Bytes(&bytes);
        assert_eq!(decode(&v, "").unwrap(), Some(geom));
    }

    #[test]
    fn unknown_encoding_is_invalid() {
        let v = RawValue::Bytes(&[]);
        assert!(matches!(decode(&v, "XDR"), Err(Error::InvalidEncoding(_))));
    }
}
