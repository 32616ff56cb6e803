use std::fs;

use anyhow::{Context, Result};

use crate::atlas;
use crate::cli::{Cli, ReallocArgs};
use crate::election;
use crate::fetch::{source, Cache};
use crate::geometry::PolygonSet;
use crate::realloc::{reallocate_with_stats, ReallocOptions};
use crate::table::AttrTable;

/// The full pipeline: fetch the election results and both shape documents,
/// relabel and re-key the precinct rows, then reallocate onto the
/// statistical districts.
pub(crate) fn reallocated_table(
    cache: &Cache,
    election_id: &str,
    options: &ReallocOptions,
    verbose: u8,
) -> Result<AttrTable> {
    let doc = cache.fetch(source(election_id)?, false, verbose)?;
    let mut results = atlas::election_table(&doc)
        .with_context(|| format!("parse election document {election_id:?}"))?;
    election::relabel(&mut results);
    let results = election::key_rows_by_precinct(&results)?;

    let precincts = PolygonSet::from_doc(
        &atlas::shape_doc(&cache.fetch(source("bm-shape")?, false, verbose)?)?,
    )?;
    let districts = PolygonSet::from_doc(
        &atlas::shape_doc(&cache.fetch(source("stats-shape")?, false, verbose)?)?,
    )?;

    if verbose > 0 {
        eprintln!(
            "[realloc] {} precinct rows, {} precinct polygons -> {} districts",
            results.len(), precincts.len(), districts.len(),
        );
    }

    let (table, stats) = reallocate_with_stats(&results, &precincts, &districts, options)?;
    if verbose > 0 {
        eprintln!(
            "[realloc] {} pairs tested, {} overlapping, {} degenerate, {} zero-area sources",
            stats.pairs_tested, stats.pairs_overlapping,
            stats.degenerate_pairs, stats.zero_area_sources,
        );
    }
    Ok(table)
}

pub fn run(cli: &Cli, args: &ReallocArgs) -> Result<()> {
    let cache = Cache::new(&cli.cache_dir);
    let options = ReallocOptions { include_empty_targets: args.empty_targets };

    let mut table = reallocated_table(&cache, &args.election, &options, cli.verbose)?;
    if args.percent {
        table = election::to_percentages(&table)?;
    }

    fs::write(&args.output, table.to_csv())
        .with_context(|| format!("write {}", args.output.display()))?;
    println!("Wrote {} district rows to {}", table.len(), args.output.display());
    Ok(())
}
