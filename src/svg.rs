use std::{collections::BTreeMap, fmt::Write as _, fs::File, io::{BufWriter, Write}, path::Path};

use anyhow::{Context, Result};
use geo::Rect;

use crate::geometry::PolygonSet;

/// How district polygons are filled.
#[derive(Debug, Clone)]
pub enum Shading<'a> {
    /// One color for every district.
    Flat(&'a str),
    /// Numeric value per district, normalized by the maximum and mapped
    /// through a warm color ramp. Missing names count as zero.
    Heatmap(&'a BTreeMap<String, f64>),
}

fn ramp(v: f64) -> String {
    let channel = |x: f64| (x * 255.0).clamp(0.0, 255.0).round() as u8;
    format!(
        "rgb({}, {}, {})",
        channel(v),
        channel(v.powf(0.3)),
        channel((v * std::f64::consts::PI).sin()),
    )
}

fn fill_for(shading: &Shading, name: &str, max_value: f64) -> String {
    match shading {
        Shading::Flat(color) => (*color).to_string(),
        Shading::Heatmap(values) => {
            let value = values.get(name).copied().unwrap_or(0.0);
            ramp(if max_value > 0.0 { value / max_value } else { 0.0 })
        }
    }
}

/// Render a polygon set as an SVG document, districts in ascending name
/// order. The viewBox is the set's bounding rect; the y axis is flipped so
/// north ends up on top.
pub fn render(set: &PolygonSet, shading: &Shading) -> String {
    let bounds = set.bounding_rect()
        .unwrap_or_else(|| Rect::new(geo::coord! { x: 0.0, y: 0.0 }, geo::coord! { x: 1.0, y: 1.0 }));
    let (min_y, height) = (bounds.min().y, bounds.height());

    let max_value = match shading {
        Shading::Heatmap(values) => values.values().copied().fold(0.0, f64::max),
        _ => 0.0,
    };

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg width="400px" height="400px" viewBox="{} {} {} {}" xmlns="http://www.w3.org/2000/svg" version="1.1">"#,
        bounds.min().x, bounds.min().y, bounds.width(), bounds.height(),
    );

    for (name, district) in set.iter() {
        let points = district.polygon().exterior().0.iter()
            .map(|c| {
                // Flip within the viewBox: plane y grows north, svg y south.
                let y = min_y + height - (c.y - min_y);
                format!("{},{}", c.x.round(), y.round())
            })
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(
            svg,
            r#"<polygon fill="{}" stroke="black" stroke-width="10" points="{points}" />"#,
            fill_for(shading, name, max_value),
        );
    }

    svg.push_str("</svg>\n");
    svg
}

/// Render to a file through a buffered writer.
pub fn write_svg(path: &Path, set: &PolygonSet, shading: &Shading) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(render(set, shading).as_bytes())
        .with_context(|| format!("write {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use geo::{Coord, LineString, Polygon};

    use crate::geometry::DistrictPolygon;

    use super::*;

    fn unit_square_set() -> PolygonSet {
        let square = Polygon::new(
            LineString(vec![
                Coord { x: 0.0, y: 0.0 },
                Coord { x: 10.0, y: 0.0 },
                Coord { x: 10.0, y: 10.0 },
                Coord { x: 0.0, y: 10.0 },
            ]),
            vec![],
        );
        PolygonSet::from_polygons(BTreeMap::from([
            ("a".to_string(), DistrictPolygon::new(square)),
        ]))
    }

    #[test]
    fn renders_viewbox_and_polygons() {
        let svg = render(&unit_square_set(), &Shading::Flat("#abc"));
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"viewBox="0 0 10 10""#));
        assert!(svg.contains(r##"fill="#abc""##));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn y_axis_is_flipped() {
        let svg = render(&unit_square_set(), &Shading::Flat("#abc"));
        // Plane origin (0,0) lands at the bottom of the 0..10 viewBox.
        assert!(svg.contains("0,10"));
    }

    #[test]
    fn heatmap_normalizes_by_max() {
        let values = BTreeMap::from([("a".to_string(), 5.0)]);
        let svg = render(&unit_square_set(), &Shading::Heatmap(&values));
        // v = 1.0 after normalization: full red and green channels.
        assert!(svg.contains("rgb(255, 255,"), "unexpected fill in {svg}");
    }

    #[test]
    fn heatmap_without_values_renders_at_zero() {
        let values = BTreeMap::new();
        let svg = render(&unit_square_set(), &Shading::Heatmap(&values));
        assert!(svg.contains("rgb(0, 0, 0)"));
    }
}
