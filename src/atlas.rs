//! Parsing of the InstantAtlas JSON documents the city publishes: election
//! result sets, the district-statistics index with its per-theme files, and
//! the delta-coded shape documents.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::geometry::ShapeDoc;
use crate::table::AttrTable;

/// Indicators that are commentary rather than per-district counts.
const EXCLUDED_INDICATORS: &[&str] = &[
    "Von 102 Wahllokalen sind ausgezählt",
    "Stimmenmehrheit",
    "Wahlbeteiligung",
];

#[derive(Debug, Deserialize)]
struct AtlasDoc {
    geographies: Vec<Geography>,
}

#[derive(Debug, Deserialize)]
struct Geography {
    #[serde(default)]
    features: Vec<AtlasFeature>,
    #[serde(default)]
    themes: Vec<Theme>,
}

#[derive(Debug, Deserialize)]
struct AtlasFeature {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Theme {
    #[serde(default)]
    indicators: Vec<Indicator>,
    #[serde(rename = "themeId", default)]
    theme_id: Option<String>,
    #[serde(rename = "fileName", default)]
    file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicator {
    name: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    values: Vec<Value>,
    #[serde(default)]
    associates: Vec<Associate>,
}

#[derive(Debug, Deserialize)]
struct Associate {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    values: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ThemeFile {
    #[serde(default)]
    indicators: Vec<Indicator>,
}

/// A statistics theme announced by the index document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatTheme {
    pub id: String,
    pub file_name: String,
}

/// Ordered column collector with keyed-map overwrite semantics: a repeated
/// column name replaces the earlier values but keeps its original position.
struct ColumnBuilder {
    names: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl ColumnBuilder {
    fn new() -> Self {
        Self { names: Vec::new(), values: Vec::new() }
    }

    fn push(&mut self, name: String, values: Vec<f64>) {
        match self.names.iter().position(|n| *n == name) {
            Some(idx) => self.values[idx] = values,
            None => {
                self.names.push(name);
                self.values.push(values);
            }
        }
    }

    /// Transpose into an `AttrTable`; `rows[i]` owns `values[*][i]`.
    fn into_table(self, rows: &[String]) -> Result<AttrTable> {
        for (name, values) in self.names.iter().zip(&self.values) {
            if values.len() != rows.len() {
                bail!(
                    "column {:?} has {} values for {} districts",
                    name, values.len(), rows.len(),
                );
            }
        }
        let mut table = AttrTable::new(self.names);
        for (i, row) in rows.iter().enumerate() {
            let cells = self.values.iter().map(|column| column[i]).collect();
            table.insert_row(row.clone(), cells)?;
        }
        Ok(table)
    }
}

fn as_count(value: &Value) -> Option<f64> {
    // Only integer entries count; "-" placeholders and floats become 0.
    value.as_i64().map(|v| v as f64)
}

/// Decode a shape document out of a fetched JSON value.
pub fn shape_doc(doc: &Value) -> Result<ShapeDoc> {
    serde_json::from_value(doc.clone()).context("decode shape document")
}

/// Build the per-precinct election results table from a result document.
///
/// Row names come from `features[1:]` of the first geography (index 0 is the
/// city-wide total). Each kept indicator becomes one column: values start
/// from the indicator's first `numeric` associate and are overridden
/// per-entry by integer entries of the indicator's own value list.
pub fn election_table(doc: &Value) -> Result<AttrTable> {
    let doc: AtlasDoc = serde_json::from_value(doc.clone()).context("decode election document")?;
    let Some(geography) = doc.geographies.first() else {
        bail!("election document has no geographies");
    };
    if geography.features.is_empty() {
        bail!("election document has no features");
    }
    let rows: Vec<String> = geography.features[1..].iter().map(|f| f.name.clone()).collect();

    let mut columns = ColumnBuilder::new();
    for theme in &geography.themes {
        for indicator in &theme.indicators {
            if EXCLUDED_INDICATORS.contains(&indicator.name.as_str()) { continue }
            let Some(associate) = indicator.associates.iter().find(|a| a.kind == "numeric") else {
                continue
            };
            if associate.values.len() < rows.len() + 1 {
                bail!(
                    "indicator {:?} has {} values for {} districts",
                    indicator.name, associate.values.len(), rows.len(),
                );
            }
            let values = (1..=rows.len())
                .map(|i| {
                    indicator.values.get(i).and_then(as_count)
                        .or_else(|| as_count(&associate.values[i]))
                        .unwrap_or(0.0)
                })
                .collect();
            columns.push(indicator.name.clone(), values);
        }
    }
    columns.into_table(&rows)
}

/// Read the district names and announced themes from the statistics index.
pub fn stat_index(doc: &Value) -> Result<(Vec<String>, Vec<StatTheme>)> {
    let doc: AtlasDoc = serde_json::from_value(doc.clone()).context("decode statistics index")?;
    let Some(geography) = doc.geographies.first() else {
        bail!("statistics index has no geographies");
    };
    let names = geography.features.iter().map(|f| f.name.clone()).collect();

    let mut themes = Vec::new();
    for theme in &geography.themes {
        let (Some(id), Some(file)) = (&theme.theme_id, &theme.file_name) else { continue };
        // The index carries a path; only the last segment names the file.
        let file_name = file.rsplit('/').next().unwrap_or(file).to_string();
        themes.push(StatTheme { id: id.clone(), file_name });
    }
    Ok((names, themes))
}

/// Assemble the district-statistics table from the index document plus the
/// fetched theme files, optionally keeping only indicators of one year.
/// Columns are named `name(date)`.
pub fn stat_table(index_doc: &Value, theme_docs: &[Value], year: Option<&str>) -> Result<AttrTable> {
    let (rows, _) = stat_index(index_doc)?;

    let mut columns = ColumnBuilder::new();
    for doc in theme_docs {
        let file: ThemeFile = serde_json::from_value(doc.clone()).context("decode theme file")?;
        for indicator in &file.indicators {
            let date = indicator.date.as_deref().unwrap_or("");
            if year.is_some_and(|y| y != date) { continue }
            let values = indicator.values.iter()
                .map(|v| v.as_f64().unwrap_or(0.0))
                .collect();
            columns.push(format!("{}({})", indicator.name, date), values);
        }
    }
    columns.into_table(&rows)
}
