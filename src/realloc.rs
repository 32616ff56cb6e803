use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use geo::{Area, BooleanOps, BoundingRect, Intersects, Rect};
use rstar::{RTree, RTreeObject, AABB};

use crate::error::{Error, Result};
use crate::geometry::{DistrictPolygon, PolygonSet};
use crate::table::AttrTable;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReallocOptions {
    /// Emit a zero row for target districts that overlap no source district.
    /// Off by default: such districts are simply absent from the result.
    pub include_empty_targets: bool,
}

/// Counters for one reallocation run. `degenerate_pairs` tracks polygon
/// pairs whose intersection could not be computed and contributed zero;
/// `zero_area_sources` tracks source rows whose polygon had no area to
/// distribute and therefore dropped out of the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReallocStats {
    pub pairs_tested: usize,
    pub pairs_overlapping: usize,
    pub degenerate_pairs: usize,
    pub zero_area_sources: usize,
}

#[derive(Debug, Clone)]
struct TargetBounds {
    idx: usize, // Index into the sorted target list
    bbox: Rect<f64>,
}

impl RTreeObject for TargetBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

/// Area of `a ∩ b`. The boolean op can panic on degenerate rings; that is
/// reported as `Error::Geometry` so the caller can count and move on.
fn intersection_area(a: &DistrictPolygon, b: &DistrictPolygon) -> Result<f64> {
    catch_unwind(AssertUnwindSafe(|| {
        a.polygon().intersection(b.polygon()).unsigned_area()
    }))
    .map_err(|_| Error::Geometry("boolean intersection failed".into()))
}

/// Redistribute each source row onto the target partition, weighted by the
/// fraction of the source district's area inside each target district.
///
/// For every overlapping (source, target) pair the contribution per column
/// is `round(value * shared_area / source_area)`, accumulated in integers.
/// Rounding happens at each contribution, matching the published figures
/// this pipeline has to reproduce. Result rows come out in ascending
/// target-name order with the source's column order.
///
/// A source row whose name has no polygon in `source_polys` is a hard
/// `Error::NotFound`: the table and the geometry disagree.
pub fn reallocate(
    source: &AttrTable,
    source_polys: &PolygonSet,
    target_polys: &PolygonSet,
    options: &ReallocOptions,
) -> Result<AttrTable> {
    Ok(reallocate_with_stats(source, source_polys, target_polys, options)?.0)
}

/// Like [`reallocate`], also returning pair counters for diagnostics.
pub fn reallocate_with_stats(
    source: &AttrTable,
    source_polys: &PolygonSet,
    target_polys: &PolygonSet,
    options: &ReallocOptions,
) -> Result<(AttrTable, ReallocStats)> {
    let targets: Vec<(&str, &DistrictPolygon)> = target_polys.iter().collect();
    let rtree = RTree::bulk_load(
        targets.iter().enumerate()
            .filter_map(|(idx, (_, poly))| {
                poly.polygon().bounding_rect().map(|bbox| TargetBounds { idx, bbox })
            })
            .collect(),
    );

    let width = source.columns().len();
    let mut stats = ReallocStats::default();
    let mut sums: BTreeMap<&str, Vec<i64>> = BTreeMap::new();

    for (name, row) in source.iter() {
        let precinct = source_polys.lookup(name)?;
        // A degenerate source ring has no area to distribute; count the
        // dropped row instead of losing it silently.
        if precinct.area() == 0.0 {
            stats.zero_area_sources += 1;
            continue;
        }
        let Some(rect) = precinct.polygon().bounding_rect() else { continue };

        let search = AABB::from_corners(
            [rect.min().x, rect.min().y],
            [rect.max().x, rect.max().y],
        );
        for cand in rtree.locate_in_envelope_intersecting(&search) {
            let (target_name, target) = targets[cand.idx];
            stats.pairs_tested += 1;
            if !target.polygon().intersects(precinct.polygon()) { continue }
            stats.pairs_overlapping += 1;

            let shared = match intersection_area(target, precinct) {
                Ok(area) => area,
                Err(_) => {
                    stats.degenerate_pairs += 1;
                    0.0
                }
            };

            let fraction = shared / precinct.area();
            let totals = sums.entry(target_name).or_insert_with(|| vec![0i64; width]);
            for (i, value) in row.iter().enumerate() {
                totals[i] += (value * fraction).round() as i64;
            }
        }
    }

    let mut result = AttrTable::new(source.columns().to_vec());
    for (target_name, totals) in sums {
        result.insert_row(target_name, totals.into_iter().map(|v| v as f64).collect())?;
    }
    if options.include_empty_targets {
        for name in target_polys.names() {
            if !result.contains(name) {
                result.insert_row(name, vec![0.0; width])?;
            }
        }
    }

    Ok((result, stats))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use geo::{Coord, LineString, Polygon};

    use super::*;

    fn rect_polygon(x0: f64, y0: f64, x1: f64, y1: f64) -> DistrictPolygon {
        DistrictPolygon::new(Polygon::new(
            LineString(vec![
                Coord { x: x0, y: y0 },
                Coord { x: x1, y: y0 },
                Coord { x: x1, y: y1 },
                Coord { x: x0, y: y1 },
            ]),
            vec![],
        ))
    }

    fn set(polys: Vec<(&str, DistrictPolygon)>) -> PolygonSet {
        PolygonSet::from_polygons(
            polys.into_iter().map(|(n, p)| (n.to_string(), p)).collect::<BTreeMap<_, _>>(),
        )
    }

    fn source_table(rows: Vec<(&str, Vec<f64>)>, columns: Vec<&str>) -> AttrTable {
        let mut t = AttrTable::new(columns.into_iter().map(String::from).collect());
        for (name, values) in rows {
            t.insert_row(name, values).unwrap();
        }
        t
    }

    /// Unit square split evenly between a left and a right target half.
    #[test]
    fn splits_unit_square_in_half() {
        let sources = set(vec![("A", rect_polygon(0.0, 0.0, 1.0, 1.0))]);
        let targets = set(vec![
            ("L", rect_polygon(0.0, 0.0, 0.5, 1.0)),
            ("R", rect_polygon(0.5, 0.0, 1.0, 1.0)),
        ]);
        let table = source_table(vec![("A", vec![100.0])], vec!["votes"]);

        let result = reallocate(&table, &sources, &targets, &ReallocOptions::default()).unwrap();
        assert_eq!(result.row("L").unwrap(), &[50.0]);
        assert_eq!(result.row("R").unwrap(), &[50.0]);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn missing_source_polygon_is_fatal() {
        let sources = set(vec![("A", rect_polygon(0.0, 0.0, 1.0, 1.0))]);
        let targets = set(vec![("T", rect_polygon(0.0, 0.0, 1.0, 1.0))]);
        let table = source_table(vec![("B", vec![1.0])], vec!["votes"]);

        let err = reallocate(&table, &sources, &targets, &ReallocOptions::default()).unwrap_err();
        assert!(matches!(err, Error::NotFound(name) if name == "B"));
    }

    #[test]
    fn non_overlapping_target_is_absent() {
        let sources = set(vec![("A", rect_polygon(0.0, 0.0, 1.0, 1.0))]);
        let targets = set(vec![
            ("near", rect_polygon(0.0, 0.0, 1.0, 1.0)),
            ("far", rect_polygon(5.0, 5.0, 6.0, 6.0)),
        ]);
        let table = source_table(vec![("A", vec![10.0])], vec!["votes"]);

        let result = reallocate(&table, &sources, &targets, &ReallocOptions::default()).unwrap();
        assert!(result.contains("near"));
        assert!(!result.contains("far"));
    }

    #[test]
    fn empty_targets_emitted_when_requested() {
        let sources = set(vec![("A", rect_polygon(0.0, 0.0, 1.0, 1.0))]);
        let targets = set(vec![
            ("near", rect_polygon(0.0, 0.0, 1.0, 1.0)),
            ("far", rect_polygon(5.0, 5.0, 6.0, 6.0)),
        ]);
        let table = source_table(vec![("A", vec![10.0])], vec!["votes"]);
        let options = ReallocOptions { include_empty_targets: true };

        let result = reallocate(&table, &sources, &targets, &options).unwrap();
        assert_eq!(result.row("far").unwrap(), &[0.0]);
        assert_eq!(result.row("near").unwrap(), &[10.0]);
    }

    #[test]
    fn deterministic_and_sorted() {
        let sources = set(vec![
            ("A", rect_polygon(0.0, 0.0, 1.0, 1.0)),
            ("B", rect_polygon(1.0, 0.0, 2.0, 1.0)),
        ]);
        let targets = set(vec![
            ("z", rect_polygon(0.5, 0.0, 1.5, 1.0)),
            ("a", rect_polygon(0.0, 0.0, 0.5, 1.0)),
            ("m", rect_polygon(1.5, 0.0, 2.0, 1.0)),
        ]);
        let table = source_table(
            vec![("A", vec![100.0, 40.0]), ("B", vec![60.0, 20.0])],
            vec!["x", "y"],
        );

        let first = reallocate(&table, &sources, &targets, &ReallocOptions::default()).unwrap();
        let second = reallocate(&table, &sources, &targets, &ReallocOptions::default()).unwrap();
        assert_eq!(first, second);

        let names: Vec<&str> = first.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "m", "z"]);
    }

    /// A source fully tiled by targets conserves each column up to one
    /// rounding step per contributing target.
    #[test]
    fn conservation_bound_over_tiling_targets() {
        let sources = set(vec![("A", rect_polygon(0.0, 0.0, 1.0, 1.0))]);
        let targets = set(vec![
            ("t0", rect_polygon(0.0, 0.0, 0.3, 1.0)),
            ("t1", rect_polygon(0.3, 0.0, 0.7, 1.0)),
            ("t2", rect_polygon(0.7, 0.0, 1.0, 1.0)),
        ]);
        let table = source_table(vec![("A", vec![1001.0])], vec!["votes"]);

        let result = reallocate(&table, &sources, &targets, &ReallocOptions::default()).unwrap();
        let total: f64 = result.iter().map(|(_, row)| row[0]).sum();
        assert!((total - 1001.0).abs() <= 3.0, "total {total} drifted too far");
    }

    /// Rounding happens per contribution: each of the ten 7%-wide strips
    /// rounds 15 * 0.07 = 1.05 down to 1, so the total visibly undershoots.
    #[test]
    fn rounds_at_each_contribution() {
        let sources = set(vec![("A", rect_polygon(0.0, 0.0, 1.0, 1.0))]);
        let targets = PolygonSet::from_polygons(
            (0..10)
                .map(|i| {
                    let x = i as f64 * 0.07;
                    (format!("s{i}"), rect_polygon(x, 0.0, x + 0.07, 1.0))
                })
                .collect(),
        );
        let table = source_table(vec![("A", vec![15.0])], vec!["votes"]);

        let result = reallocate(&table, &sources, &targets, &ReallocOptions::default()).unwrap();
        for (_, row) in result.iter() {
            assert_eq!(row[0], 1.0);
        }
        let total: f64 = result.iter().map(|(_, row)| row[0]).sum();
        assert_eq!(total, 10.0);
    }

    #[test]
    fn end_to_end_from_shape_documents() {
        use crate::geometry::ShapeDoc;

        let precincts: ShapeDoc = serde_json::from_str(r#"{
            "boundingBox": "0 0 2 1",
            "pixelWidth": 2, "pixelHeight": 1,
            "features": [
                {"n": "11", "p": [[0,0,1,0,0,1,-1,0]]},
                {"n": "12", "p": [[1,0,1,0,0,1,-1,0]]}
            ]
        }"#).unwrap();
        let districts: ShapeDoc = serde_json::from_str(r#"{
            "boundingBox": "0 0 2 1",
            "pixelWidth": 2, "pixelHeight": 1,
            "features": [
                {"n": "Mitte", "p": [[0,0,2,0,0,1,-2,0]]}
            ]
        }"#).unwrap();
        let sources = PolygonSet::from_doc(&precincts).unwrap();
        let targets = PolygonSet::from_doc(&districts).unwrap();
        let table = source_table(vec![("11", vec![40.0]), ("12", vec![60.0])], vec!["SPD"]);

        let result = reallocate(&table, &sources, &targets, &ReallocOptions::default()).unwrap();
        assert_eq!(result.row("Mitte").unwrap(), &[100.0]);
    }

    #[test]
    fn zero_area_source_rows_are_dropped_and_counted() {
        let sources = set(vec![
            ("A", rect_polygon(0.0, 0.0, 1.0, 1.0)),
            ("flat", rect_polygon(2.0, 2.0, 3.0, 2.0)), // zero-height ring
        ]);
        let targets = set(vec![("T", rect_polygon(0.0, 0.0, 4.0, 4.0))]);
        let table = source_table(
            vec![("A", vec![10.0]), ("flat", vec![5.0])],
            vec!["votes"],
        );

        let (result, stats) =
            reallocate_with_stats(&table, &sources, &targets, &ReallocOptions::default()).unwrap();
        assert_eq!(result.row("T").unwrap(), &[10.0]);
        assert_eq!(stats.zero_area_sources, 1);
    }

    #[test]
    fn source_polygons_without_rows_are_ignored() {
        let sources = set(vec![
            ("A", rect_polygon(0.0, 0.0, 1.0, 1.0)),
            ("unused", rect_polygon(3.0, 3.0, 4.0, 4.0)),
        ]);
        let targets = set(vec![("T", rect_polygon(0.0, 0.0, 4.0, 4.0))]);
        let table = source_table(vec![("A", vec![8.0])], vec!["votes"]);

        let (result, stats) =
            reallocate_with_stats(&table, &sources, &targets, &ReallocOptions::default()).unwrap();
        assert_eq!(result.row("T").unwrap(), &[8.0]);
        assert_eq!(stats.pairs_overlapping, 1);
        assert_eq!(stats.degenerate_pairs, 0);
    }
}
