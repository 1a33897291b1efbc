//! In-memory [`Feature`] model (§3.2).

use crate::bbox::Bbox;
use crate::geometry::Geometry;
use crate::property::PropertyMap;

/// A Feature `id`: GeoJSON permits only a string or a number here.
#[derive(Clone, Debug, PartialEq)]
pub enum FeatureId {
    String(String),
    Number(i64),
}

/// An in-memory GeoJSON Feature.
///
/// `geometry` may be absent (a null geometry), but `properties` is always a
/// (possibly empty) map -- never absent.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Feature {
    pub id: Option<FeatureId>,
    pub geometry: Option<Geometry>,
    pub properties: PropertyMap,
    pub bbox: Option<Bbox>,
}

impl Feature {
    pub fn new() -> Feature {
        Feature::default()
    }
}
