//! Polygon module: the boundary to the polygon store.
//!
//! Polygon filters only read polygons through a [`PolygonHandle`], a non-owning reference to
//! whatever implements [`PolygonLookup`]. The store stays authoritative for polygon lifetime.

use crate::{FilterError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, Weak};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub name: String,
    pub corners: Vec<Coordinate>,
}

impl Polygon {
    pub fn new(name: impl Into<String>, corners: Vec<Coordinate>) -> Self {
        Self { name: name.into(), corners }
    }

    /// `ST_Contains` clause testing the given point columns against this polygon.
    ///
    /// The ring is closed by repeating the first corner. Returns `None` for a polygon
    /// without corners.
    pub fn contains_point_sql(
        &self,
        latitude_column: &str,
        longitude_column: &str,
    ) -> Option<String> {
        let first = self.corners.first()?;
        let ring = self
            .corners
            .iter()
            .chain(std::iter::once(first))
            .map(|c| format!("{} {}", c.latitude, c.longitude))
            .collect::<Vec<_>>()
            .join(", ");
        Some(format!(
            "ST_Contains(ST_MakePolygon(ST_GeomFromText('LINESTRING({ring})')), \
             ST_POINT({latitude_column}, {longitude_column}))"
        ))
    }
}

/// Read-only access to the polygon store.
pub trait PolygonLookup: Send + Sync {
    fn get_polygon(&self, id: &Uuid) -> Option<Polygon>;
    fn get_all_polygon_ids(&self) -> Vec<Uuid>;
}

/// Non-owning capability handed to polygon filters.
#[derive(Clone)]
pub struct PolygonHandle {
    lookup: Weak<dyn PolygonLookup>,
}

impl PolygonHandle {
    pub fn new(lookup: &Arc<dyn PolygonLookup>) -> Self {
        Self { lookup: Arc::downgrade(lookup) }
    }

    /// Resolves a polygon. `None` if the store is gone or does not know the id.
    pub fn get_polygon(&self, id: &Uuid) -> Option<Polygon> {
        self.lookup.upgrade()?.get_polygon(id)
    }

    pub fn get_all_polygon_ids(&self) -> Vec<Uuid> {
        self.lookup
            .upgrade()
            .map(|lookup| lookup.get_all_polygon_ids())
            .unwrap_or_default()
    }
}

impl fmt::Debug for PolygonHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolygonHandle")
            .field("alive", &(self.lookup.strong_count() > 0))
            .finish()
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    polygons: HashMap<Uuid, Polygon>,
    order: Vec<Uuid>,
}

/// In-memory polygon store keeping insertion order.
#[derive(Debug, Default)]
pub struct PolygonStore {
    inner: RwLock<StoreInner>,
}

impl PolygonStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, polygon: Polygon) -> Uuid {
        let id = Uuid::new_v4();
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.polygons.insert(id, polygon);
        inner.order.push(id);
        id
    }

    /// Removes a polygon unless `in_use` reports that a filter still references it.
    pub fn remove_if_unused<F>(&self, id: &Uuid, in_use: F) -> Result<Polygon>
    where
        F: Fn(&Uuid) -> bool,
    {
        if in_use(id) {
            return Err(FilterError::PolygonInUse(*id));
        }
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let polygon = inner.polygons.remove(id).ok_or(FilterError::NotFound(*id))?;
        inner.order.retain(|other| other != id);
        Ok(polygon)
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PolygonLookup for PolygonStore {
    fn get_polygon(&self, id: &Uuid) -> Option<Polygon> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .polygons
            .get(id)
            .cloned()
    }

    fn get_all_polygon_ids(&self) -> Vec<Uuid> {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).order.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Polygon {
        Polygon::new(
            "triangle",
            vec![
                Coordinate::new(52.5, 13.4),
                Coordinate::new(52.6, 13.4),
                Coordinate::new(52.6, 13.5),
            ],
        )
    }

    #[test]
    fn test_contains_point_sql_closes_ring() {
        let sql = triangle().contains_point_sql("latitude", "longitude").unwrap();
        assert_eq!(
            sql,
            "ST_Contains(ST_MakePolygon(ST_GeomFromText('LINESTRING(52.5 13.4, 52.6 13.4, 52.6 13.5, 52.5 13.4)')), ST_POINT(latitude, longitude))"
        );
    }

    #[test]
    fn test_contains_point_sql_empty_polygon() {
        assert_eq!(Polygon::new("empty", vec![]).contains_point_sql("lat", "lon"), None);
    }

    #[test]
    fn test_store_insert_and_lookup() {
        let store = PolygonStore::new();
        let a = store.insert(triangle());
        let b = store.insert(Polygon::new("other", vec![Coordinate::new(1.0, 2.0)]));
        assert_eq!(store.get_all_polygon_ids(), vec![a, b]);
        assert_eq!(store.get_polygon(&a).unwrap().name, "triangle");
        assert!(store.get_polygon(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_store_remove_guarded() {
        let store = PolygonStore::new();
        let id = store.insert(triangle());
        assert_eq!(store.remove_if_unused(&id, |_| true), Err(FilterError::PolygonInUse(id)));
        assert_eq!(store.len(), 1);
        assert!(store.remove_if_unused(&id, |_| false).is_ok());
        assert!(store.is_empty());
        assert!(matches!(store.remove_if_unused(&id, |_| false), Err(FilterError::NotFound(_))));
    }

    #[test]
    fn test_handle_does_not_keep_store_alive() {
        let store: Arc<dyn PolygonLookup> = Arc::new(PolygonStore::new());
        let handle = PolygonHandle::new(&store);
        assert!(handle.get_all_polygon_ids().is_empty());
        drop(store);
        assert!(handle.get_polygon(&Uuid::new_v4()).is_none());
        assert!(handle.get_all_polygon_ids().is_empty());
    }
}
