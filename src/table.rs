use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// A table of named numeric series: one row per district, one value per
/// column. Column order is fixed at construction and shared by every row;
/// rows iterate in ascending name order.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrTable {
    columns: Vec<String>,
    rows: BTreeMap<String, Vec<f64>>,
}

impl AttrTable {
    /// Create an empty table with the given column set.
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: BTreeMap::new() }
    }

    /// Insert a row. The row must match the column count exactly; a repeated
    /// name overwrites the previous row (keyed-map insert semantics).
    pub fn insert_row(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if values.len() != self.columns.len() {
            return Err(Error::shape(format!(
                "row {:?} has {} values, table has {} columns",
                name, values.len(), self.columns.len(),
            )));
        }
        self.rows.insert(name, values);
        Ok(())
    }

    /// Look up a row by district name.
    pub fn row(&self, name: &str) -> Result<&[f64]> {
        self.rows.get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// Single cell access by row name and column name.
    pub fn get(&self, name: &str, column: &str) -> Result<f64> {
        let idx = self.column_index(column)?;
        Ok(self.row(name)?[idx])
    }

    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.columns.iter().position(|c| c == column)
            .ok_or_else(|| Error::NotFound(column.to_string()))
    }

    #[inline] pub fn columns(&self) -> &[String] { &self.columns }

    #[inline] pub fn len(&self) -> usize { self.rows.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn contains(&self, name: &str) -> bool { self.rows.contains_key(name) }

    /// Rows in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.rows.iter().map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// All values of one column, in ascending row-name order.
    pub fn column(&self, column: &str) -> Result<Vec<f64>> {
        let idx = self.column_index(column)?;
        Ok(self.rows.values().map(|row| row[idx]).collect())
    }

    /// Rename columns through a mapping; names without an entry are kept.
    /// Row data and column order are unchanged.
    pub fn rename_columns(&mut self, mapping: &BTreeMap<&str, &str>) {
        for column in &mut self.columns {
            if let Some(new) = mapping.get(column.as_str()) {
                *column = (*new).to_string();
            }
        }
    }

    /// Serialize as CSV, rows in ascending name order.
    pub fn to_csv(&self) -> String {
        fn field(s: &str) -> String {
            if s.contains([',', '"', '\n']) {
                format!("\"{}\"", s.replace('"', "\"\""))
            } else {
                s.to_string()
            }
        }

        let mut out = String::from("Bezirk");
        for column in &self.columns {
            out.push(',');
            out.push_str(&field(column));
        }
        out.push('\n');
        for (name, row) in &self.rows {
            out.push_str(&field(name));
            for value in row {
                out.push(',');
                out.push_str(&value.to_string());
            }
            out.push('\n');
        }
        out
    }

    /// Apply a function to every cell, given its column name.
    pub fn map_cells(&mut self, mut f: impl FnMut(&str, &str, f64) -> f64) {
        for (name, row) in &mut self.rows {
            for (idx, value) in row.iter_mut().enumerate() {
                *value = f(name, &self.columns[idx], *value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> AttrTable {
        let mut t = AttrTable::new(vec!["a".into(), "b".into()]);
        t.insert_row("x", vec![1.0, 2.0]).unwrap();
        t.insert_row("y", vec![3.0, 4.0]).unwrap();
        t
    }

    #[test]
    fn insert_and_lookup() {
        let t = table();
        assert_eq!(t.row("x").unwrap(), &[1.0, 2.0]);
        assert_eq!(t.get("y", "b").unwrap(), 4.0);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn width_mismatch_rejected() {
        let mut t = table();
        assert!(matches!(t.insert_row("z", vec![1.0]), Err(Error::Shape(_))));
        assert!(!t.contains("z"));
    }

    #[test]
    fn missing_row_is_not_found() {
        let t = table();
        assert!(matches!(t.row("nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn repeated_insert_overwrites() {
        let mut t = table();
        t.insert_row("x", vec![9.0, 9.0]).unwrap();
        assert_eq!(t.row("x").unwrap(), &[9.0, 9.0]);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn iteration_is_sorted_by_name() {
        let mut t = AttrTable::new(vec!["a".into()]);
        t.insert_row("b", vec![2.0]).unwrap();
        t.insert_row("a", vec![1.0]).unwrap();
        t.insert_row("c", vec![3.0]).unwrap();
        let names: Vec<&str> = t.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(t.column("a").unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn map_cells_sees_row_and_column_names() {
        let mut t = table();
        t.map_cells(|name, column, value| {
            if name == "x" && column == "b" { value * 10.0 } else { value }
        });
        assert_eq!(t.row("x").unwrap(), &[1.0, 20.0]);
        assert_eq!(t.row("y").unwrap(), &[3.0, 4.0]);
    }

    #[test]
    fn csv_has_header_and_quoted_fields() {
        let mut t = AttrTable::new(vec!["a,b".into(), "c".into()]);
        t.insert_row("row \"x\"", vec![1.0, 2.5]).unwrap();
        let csv = t.to_csv();
        assert_eq!(csv, "Bezirk,\"a,b\",c\n\"row \"\"x\"\"\",1,2.5\n");
    }

    #[test]
    fn rename_keeps_unmapped_columns() {
        let mut t = table();
        let mapping = BTreeMap::from([("a", "alpha")]);
        t.rename_columns(&mapping);
        assert_eq!(t.columns(), &["alpha".to_string(), "b".to_string()]);
        assert_eq!(t.get("x", "alpha").unwrap(), 1.0);
    }
}
