use anyhow::Result;

use crate::cli::{Cli, FetchArgs};
use crate::fetch::{source, Cache, SOURCES};

pub fn run(cli: &Cli, args: &FetchArgs) -> Result<()> {
    let cache = Cache::new(&cli.cache_dir);

    let sources = if args.ids.is_empty() {
        SOURCES.iter().collect::<Vec<_>>()
    } else {
        args.ids.iter()
            .map(|id| source(id))
            .collect::<Result<Vec<_>>>()?
    };

    for src in &sources {
        cache.fetch(src, args.force, cli.verbose)?;
    }

    println!("Fetched {} documents into {}", sources.len(), cache.dir().display());
    Ok(())
}
