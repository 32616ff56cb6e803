use std::fs;

use anyhow::{Context, Result};

use crate::atlas;
use crate::cli::{Cli, StatsArgs};
use crate::fetch::{source, Cache, STAT_BASE_URL};

pub fn run(cli: &Cli, args: &StatsArgs) -> Result<()> {
    let cache = Cache::new(&cli.cache_dir);
    let index = cache.fetch(source("stats-index")?, false, cli.verbose)?;
    let (_, themes) = atlas::stat_index(&index)?;

    if cli.verbose > 0 {
        eprintln!("[stats] index announces {} themes", themes.len());
    }

    let theme_docs = themes.iter()
        .map(|theme| {
            cache.fetch_url(
                &format!("{STAT_BASE_URL}{}", theme.file_name),
                &format!("stat-{}.json", theme.id),
                false,
                cli.verbose,
            )
        })
        .collect::<Result<Vec<_>>>()?;

    let table = atlas::stat_table(&index, &theme_docs, args.year.as_deref())?;
    fs::write(&args.output, table.to_csv())
        .with_context(|| format!("write {}", args.output.display()))?;
    println!(
        "Wrote {} districts x {} indicators to {}",
        table.len(), table.columns().len(), args.output.display(),
    );
    Ok(())
}
