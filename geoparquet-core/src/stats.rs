//! `GeometryStats`/`DatasetStats` accumulators (§5 "Shared-resource
//! policy"): running bbox + geometry-type set per geometry column, updated
//! while the converter writes.
//!
//! `geozero` processes everything single-threaded and has no equivalent
//! aggregator, so this follows the general `Option<Mutex<T>>`-guarded-vs-plain
//! idiom: a `Mutex`-guarded variant when the caller declares a concurrent
//! context, a `RefCell`-backed no-op guard otherwise.

use crate::bbox::Bbox;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::sync::Mutex;

/// Whether an aggregator must guard against concurrent updates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConcurrencyContext {
    #[default]
    SingleThreaded,
    Concurrent,
}

/// Running bbox + geometry-type set for one geometry column.
#[derive(Clone, Debug, Default)]
pub struct GeometryStatsInner {
    pub bbox: Bbox,
    pub zmin: Option<f64>,
    pub zmax: Option<f64>,
    pub geometry_types: BTreeSet<String>,
    pub row_count: u64,
}

impl GeometryStatsInner {
    pub fn observe(&mut self, bound: &Bbox, zmin: Option<f64>, zmax: Option<f64>, kind: &str) {
        self.bbox.expand(bound);
        if let Some(z) = zmin {
            self.zmin = Some(self.zmin.map_or(z, |cur| cur.min(z)));
        }
        if let Some(z) = zmax {
            self.zmax = Some(self.zmax.map_or(z, |cur| cur.max(z)));
        }
        self.geometry_types.insert(kind.to_string());
        self.row_count += 1;
    }
}

enum Guard {
    SingleThreaded(RefCell<GeometryStatsInner>),
    Concurrent(Mutex<GeometryStatsInner>),
}

/// A [`GeometryStatsInner`] accumulator, optionally guarded for concurrent
/// updates (used by the extract engine's parallel row-group scan, §4.8, and
/// available to the converter for future concurrent writers).
pub struct GeometryStats(Guard);

impl GeometryStats {
    pub fn new(ctx: ConcurrencyContext) -> GeometryStats {
        GeometryStats(match ctx {
            ConcurrencyContext::SingleThreaded => {
                Guard::SingleThreaded(RefCell::new(GeometryStatsInner::default()))
            }
            ConcurrencyContext::Concurrent => {
                Guard::Concurrent(Mutex::new(GeometryStatsInner::default()))
            }
        })
    }

    pub fn observe(&self, bound: &Bbox, zmin: Option<f64>, zmax: Option<f64>, kind: &str) {
        match &self.0 {
            Guard::SingleThreaded(cell) => cell.borrow_mut().observe(bound, zmin, zmax, kind),
            Guard::Concurrent(mutex) => {
                mutex.lock().expect("stats mutex poisoned").observe(bound, zmin, zmax, kind)
            }
        }
    }

    pub fn snapshot(&self) -> GeometryStatsInner {
        match &self.0 {
            Guard::SingleThreaded(cell) => cell.borrow().clone(),
            Guard::Concurrent(mutex) => mutex.lock().expect("stats mutex poisoned").clone(),
        }
    }
}

/// Per-column [`GeometryStats`] for an entire dataset being written.
pub struct DatasetStats {
    ctx: ConcurrencyContext,
    columns: std::collections::HashMap<String, GeometryStats>,
}

impl DatasetStats {
    pub fn new(ctx: ConcurrencyContext) -> DatasetStats {
        DatasetStats { ctx, columns: std::collections::HashMap::new() }
    }

    pub fn column(&mut self, name: &str) -> &GeometryStats {
        self.columns
            .entry(name.to_string())
            .or_insert_with(|| GeometryStats::new(self.ctx))
    }

    pub fn snapshot(&self, name: &str) -> Option<GeometryStatsInner> {
        self.columns.get(name).map(GeometryStats::snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_bounds_and_types() {
        let stats = GeometryStats::new(ConcurrencyContext::SingleThreaded);
        stats.observe(&Bbox::new(0.0, 0.0, 1.0, 1.0), None, None, "Point");
        stats.observe(&Bbox::new(-1.0, -1.0, 0.5, 0.5), None, None, "Point");
        let snap = stats.snapshot();
        assert_eq!((snap.bbox.xmin, snap.bbox.ymin, snap.bbox.xmax, snap.bbox.ymax), (-1.0, -1.0, 1.0, 1.0));
        assert_eq!(snap.row_count, 2);
        assert!(snap.geometry_types.contains("Point"));
    }
}
