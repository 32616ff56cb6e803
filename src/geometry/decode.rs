use std::collections::BTreeMap;

use geo::{Coord, LineString, Polygon};
use serde::Deserialize;

use crate::error::{Error, Result};

use super::{DistrictPolygon, PolygonSet};

/// An InstantAtlas shape document: a pixel-grid bounding box plus one
/// delta-coded point stream per named feature.
#[derive(Debug, Clone, Deserialize)]
pub struct ShapeDoc {
    /// Four whitespace-separated floats: `x0 y0 x1 y1`.
    #[serde(rename = "boundingBox")]
    pub bounding_box: String,
    #[serde(rename = "pixelWidth")]
    pub pixel_width: f64,
    #[serde(rename = "pixelHeight")]
    pub pixel_height: f64,
    pub features: Vec<ShapeFeature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShapeFeature {
    /// District name, the key everything downstream joins on.
    pub n: String,
    /// Rings of flat `(dx, dy)` integer deltas; only the outer ring is used.
    #[serde(default)]
    pub p: Vec<Vec<i64>>,
}

impl ShapeDoc {
    fn grid(&self) -> Result<(f64, f64, f64, f64)> {
        let parts: Vec<f64> = self.bounding_box
            .split_whitespace()
            .map(str::parse)
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::shape(format!("bad boundingBox {:?}: {e}", self.bounding_box)))?;
        let [x0, y0, x1, y1] = parts[..] else {
            return Err(Error::shape(format!(
                "boundingBox has {} fields, expected 4", parts.len(),
            )));
        };
        if self.pixel_width == 0.0 || self.pixel_height == 0.0 {
            return Err(Error::shape("pixel grid has zero extent"));
        }
        Ok((x0, y0, x1 - x0, y1 - y0))
    }
}

impl PolygonSet {
    /// Decode a shape document into a polygon set.
    ///
    /// Each feature's outer point stream is a run of `(dx, dy)` deltas; the
    /// accumulated grid position maps into the declared bounding box. A
    /// feature decoding to fewer than 3 points carries no polygon and is
    /// skipped. A repeated feature name overwrites the earlier entry.
    pub fn from_doc(doc: &ShapeDoc) -> Result<Self> {
        let (off_x, off_y, width, height) = doc.grid()?;
        let (pix_w, pix_h) = (doc.pixel_width, doc.pixel_height);

        let mut polygons = BTreeMap::new();
        for feature in &doc.features {
            let Some(deltas) = feature.p.first() else { continue };
            if deltas.len() % 2 != 0 {
                return Err(Error::shape(format!(
                    "feature {:?} has an odd point stream ({} values)",
                    feature.n, deltas.len(),
                )));
            }

            let (mut xa, mut ya) = (0i64, 0i64);
            let mut points = Vec::with_capacity(deltas.len() / 2);
            for pair in deltas.chunks_exact(2) {
                xa += pair[0];
                ya += pair[1];
                points.push(Coord {
                    x: off_x + xa as f64 / pix_w * width,
                    y: off_y + ya as f64 / pix_h * height,
                });
            }

            if points.len() < 3 { continue }
            let polygon = Polygon::new(LineString(points), vec![]);
            polygons.insert(feature.n.clone(), DistrictPolygon::new(polygon));
        }

        Ok(Self::from_polygons(polygons))
    }
}
