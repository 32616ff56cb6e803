use std::collections::BTreeMap;

use anyhow::{Context, Result};

use crate::atlas;
use crate::cli::{Cli, RenderArgs};
use crate::fetch::{source, Cache};
use crate::geometry::PolygonSet;
use crate::realloc::ReallocOptions;
use crate::svg::{write_svg, Shading};

use super::realloc::reallocated_table;

pub fn run(cli: &Cli, args: &RenderArgs) -> Result<()> {
    let cache = Cache::new(&cli.cache_dir);
    let doc = cache.fetch(source(&args.shape)?, false, cli.verbose)?;
    let set = PolygonSet::from_doc(&atlas::shape_doc(&doc)?)?;

    let heat: Option<BTreeMap<String, f64>> = match &args.column {
        None => None,
        Some(column) => {
            let table = reallocated_table(
                &cache, &args.election, &ReallocOptions::default(), cli.verbose,
            )?;
            let idx = table.column_index(column)
                .with_context(|| format!("no column {column:?} in reallocated results"))?;
            Some(table.iter().map(|(name, row)| (name.to_string(), row[idx])).collect())
        }
    };

    let shading = match &heat {
        Some(values) => Shading::Heatmap(values),
        None => Shading::Flat("#ddd"),
    };
    write_svg(&args.output, &set, &shading)?;

    println!("Wrote {} districts to {}", set.len(), args.output.display());
    Ok(())
}
