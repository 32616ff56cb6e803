use std::{fs, io::Write, path::{Path, PathBuf}};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tempfile::NamedTempFile;

/// One known upstream document: stable id, cache filename, source URL.
#[derive(Debug, Clone, Copy)]
pub struct DataSource {
    pub id: &'static str,
    pub filename: &'static str,
    pub url: &'static str,
}

/// Base URL the statistics index's theme files hang off of.
pub const STAT_BASE_URL: &str = "http://statistiken.jena.de/instantatlas/stadtbezirksstatistik/";

/// The documents the Jena pipeline is built around: the two 2018 mayoral
/// election result sets, the district-statistics index, and the shape
/// documents for both partitions. Per-theme statistics files are discovered
/// from the index at runtime and go through [`Cache::fetch_url`].
pub const SOURCES: &[DataSource] = &[
    DataSource {
        id: "bm01",
        filename: "bm-2018-jena-01.json",
        url: "http://statistiken.jena.de/instantatlas/wahlstatistik2018_ob_wg1/data.js",
    },
    DataSource {
        id: "bm02",
        filename: "bm-2018-jena-02.json",
        url: "http://statistiken.jena.de/instantatlas/wahlstatistik/data.js",
    },
    DataSource {
        id: "stats-index",
        filename: "jena-stat-index.json",
        url: "http://statistiken.jena.de/instantatlas/stadtbezirksstatistik/data.js",
    },
    DataSource {
        id: "stats-shape",
        filename: "jena-stat-shape.json",
        url: "http://statistiken.jena.de/instantatlas/stadtbezirksstatistik/_Jena_StatBez.shp1.js",
    },
    DataSource {
        id: "bm-shape",
        filename: "bm-2018-jena-shape.json",
        url: "http://statistiken.jena.de/instantatlas/wahlstatistik2018_ob_wg1/_WBZ_Jena_20170630_extra.shp1.js",
    },
];

/// Look up a registered document by id.
pub fn source(id: &str) -> Result<&'static DataSource> {
    match SOURCES.iter().find(|s| s.id == id) {
        Some(source) => Ok(source),
        None => bail!(
            "unknown data source {:?} (known: {})",
            id,
            SOURCES.iter().map(|s| s.id).collect::<Vec<_>>().join(", "),
        ),
    }
}

/// The upstream server prepends a junk byte sequence to some documents;
/// drop it so the payload parses as JSON.
fn clean_payload(data: &[u8]) -> &[u8] {
    match data.first() {
        Some(&b) if b >= 0x80 && data.len() >= 3 => &data[3..],
        _ => data,
    }
}

/// Fetch-once, reuse-forever download cache for the upstream JSON documents.
#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[inline] pub fn dir(&self) -> &Path { &self.dir }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Fetch a registered document, reusing the cached file unless `force`.
    pub fn fetch(&self, source: &DataSource, force: bool, verbose: u8) -> Result<Value> {
        self.fetch_url(source.url, source.filename, force, verbose)
    }

    /// Fetch an arbitrary document URL into the cache under `filename`.
    pub fn fetch_url(&self, url: &str, filename: &str, force: bool, verbose: u8) -> Result<Value> {
        let path = self.path_for(filename);
        if force || !path.exists() {
            self.download(url, &path, verbose)?;
        } else if verbose > 1 {
            eprintln!("[fetch] cached {}", path.display());
        }
        let bytes = fs::read(&path)
            .with_context(|| format!("read cached file {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("parse {} as JSON", path.display()))
    }

    fn download(&self, url: &str, path: &Path, verbose: u8) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create cache dir {}", self.dir.display()))?;
        if verbose > 0 {
            eprintln!("[fetch] {url} -> {}", path.display());
        }

        let body = reqwest::blocking::get(url)
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url} returned error status"))?
            .bytes()
            .with_context(|| format!("read body of {url}"))?;

        // Write via tempfile + rename so a failed download never leaves a
        // truncated cache entry behind.
        let mut tmp = NamedTempFile::new_in(&self.dir).context("create temp file")?;
        tmp.write_all(clean_payload(&body))
            .with_context(|| format!("write {}", path.display()))?;
        tmp.persist(path)
            .with_context(|| format!("rename to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_ids_are_unique() {
        for (i, a) in SOURCES.iter().enumerate() {
            for b in &SOURCES[i + 1..] {
                assert_ne!(a.id, b.id);
                assert_ne!(a.filename, b.filename);
            }
        }
        assert_eq!(source("bm-shape").unwrap().filename, "bm-2018-jena-shape.json");
        assert!(source("nope").is_err());
    }

    #[test]
    fn junk_prefix_is_stripped() {
        let tainted = [0xef, 0xbb, 0xbf, b'{', b'}'];
        assert_eq!(clean_payload(&tainted), b"{}");
        assert_eq!(clean_payload(b"{}"), b"{}");
        assert_eq!(clean_payload(b""), b"");
    }

    #[test]
    fn cached_file_is_reused_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(cache.path_for("doc.json"), br#"{"k": 1}"#).unwrap();

        // An unroutable URL: this only passes if the cache short-circuits.
        let value = cache.fetch_url("http://invalid.invalid/doc.js", "doc.json", false, 0).unwrap();
        assert_eq!(value["k"], 1);
    }
}
