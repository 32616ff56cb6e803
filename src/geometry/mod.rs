mod decode;

pub use decode::{ShapeDoc, ShapeFeature};

use std::collections::BTreeMap;

use geo::{Area, BoundingRect, Polygon, Rect};

use crate::error::{Error, Result};

/// A single district ring with its planar area, computed once at
/// construction.
#[derive(Debug, Clone)]
pub struct DistrictPolygon {
    polygon: Polygon<f64>,
    area: f64,
}

impl DistrictPolygon {
    pub(crate) fn new(polygon: Polygon<f64>) -> Self {
        let area = polygon.unsigned_area();
        Self { polygon, area }
    }

    #[inline] pub fn polygon(&self) -> &Polygon<f64> { &self.polygon }

    /// Planar (shoelace) area; always non-negative.
    #[inline] pub fn area(&self) -> f64 { self.area }
}

/// An immutable, name-keyed set of district polygons.
///
/// Built once from a decoded shape document; iteration is ascending by name
/// so downstream consumers see a deterministic order.
#[derive(Debug, Clone)]
pub struct PolygonSet {
    polygons: BTreeMap<String, DistrictPolygon>,
}

impl PolygonSet {
    pub(crate) fn from_polygons(polygons: BTreeMap<String, DistrictPolygon>) -> Self {
        Self { polygons }
    }

    /// Look up a district by name.
    pub fn lookup(&self, name: &str) -> Result<&DistrictPolygon> {
        self.polygons.get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool { self.polygons.contains_key(name) }

    #[inline] pub fn len(&self) -> usize { self.polygons.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.polygons.is_empty() }

    /// All districts in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DistrictPolygon)> {
        self.polygons.iter().map(|(name, poly)| (name.as_str(), poly))
    }

    /// District names in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.polygons.keys().map(String::as_str)
    }

    /// Bounding rect of the whole set (None if the set is empty).
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        let mut bounds: Option<Rect<f64>> = None;
        for poly in self.polygons.values() {
            let Some(rect) = poly.polygon.bounding_rect() else { continue };
            bounds = Some(match bounds {
                None => rect,
                Some(acc) => Rect::new(
                    geo::coord! {
                        x: acc.min().x.min(rect.min().x),
                        y: acc.min().y.min(rect.min().y),
                    },
                    geo::coord! {
                        x: acc.max().x.max(rect.max().x),
                        y: acc.max().y.max(rect.max().y),
                    },
                ),
            });
        }
        bounds
    }
}
