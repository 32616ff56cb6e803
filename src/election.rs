//! Helpers specific to the 2018 mayoral election result sets: short column
//! labels, percentage derivation, and the key normalization that joins
//! result rows to shape-document features.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};

use crate::table::AttrTable;

/// Candidate names as published, mapped to their party (or campaign) label.
/// The four count columns get the short names the rest of the pipeline uses:
/// `n` eligible, `nw` voters, `nu` invalid, `ng` valid.
pub const COLUMN_LABELS: &[(&str, &str)] = &[
    ("Wahlberechtigte", "n"),
    ("Wähler", "nw"),
    ("ungültige Stimmen", "nu"),
    ("gültige Stimmen", "ng"),
    ("Benjamin Koppe", "CDU"),
    ("Martina Flämmich-Winckler", "LINKE"),
    ("Dr. Albrecht Schröter", "SPD"),
    ("Denny Jankowski", "AFD"),
    ("Denis Peisker", "GRÜNE"),
    ("Dr. Thomas Nitzsche", "FDP"),
    ("Dr. Heidrun Jänchen", "πRATEN"),
    ("Sandro Dreßler", "SANDRO"),
    ("Arne Petrich", "ARNE"),
];

/// Apply the short column labels; unknown columns keep their name.
pub fn relabel(table: &mut AttrTable) {
    let mapping: BTreeMap<&str, &str> = COLUMN_LABELS.iter().copied().collect();
    table.rename_columns(&mapping);
}

/// Derive percentages from a relabeled absolute-count table:
/// party columns as % of valid votes, valid/invalid as % of voters, voters
/// as % of eligible. Denominators are clamped to at least 1, and the
/// turnout column is only derived when the eligible counts are present at
/// all. The eligible column itself stays absolute.
pub fn to_percentages(table: &AttrTable) -> Result<AttrTable> {
    let idx_n = table.column_index("n")?;
    let idx_nw = table.column_index("nw")?;
    table.column_index("nu")?;
    let idx_ng = table.column_index("ng")?;
    let any_eligible = table.iter().any(|(_, row)| row[idx_n] > 0.0);

    // Denominators come from the absolute counts, so snapshot them before
    // any cell is rewritten.
    let denominators: BTreeMap<String, (f64, f64, f64)> = table.iter()
        .map(|(name, row)| (name.to_string(), (row[idx_n], row[idx_nw], row[idx_ng])))
        .collect();

    let clamp = |v: f64| v.max(1.0);
    let mut result = table.clone();
    result.map_cells(|name, column, value| {
        let (n, nw, ng) = denominators[name];
        match column {
            "n" => value,
            "nw" => if any_eligible { value / clamp(n) * 100.0 } else { value },
            "nu" | "ng" => value / clamp(nw) * 100.0,
            other if other.starts_with('n') => value,
            _ => value / clamp(ng) * 100.0,
        }
    });
    Ok(result)
}

/// Normalize a result-row name to the shape-document feature key: the
/// leading integer token with leading zeros dropped ("011 Rathaus" -> "11").
pub fn precinct_key(name: &str) -> Option<String> {
    let token = name.split_whitespace().next()?;
    token.parse::<i64>().ok().map(|v| v.to_string())
}

/// Re-key every row of a results table by its precinct number, so it joins
/// against the precinct shape document.
pub fn key_rows_by_precinct(table: &AttrTable) -> Result<AttrTable> {
    let mut result = AttrTable::new(table.columns().to_vec());
    for (name, row) in table.iter() {
        let key = precinct_key(name)
            .ok_or_else(|| anyhow!("row {:?} has no leading precinct number", name))?;
        result.insert_row(key, row.to_vec())?;
    }
    Ok(result)
}
