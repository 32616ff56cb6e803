use clap::{Args, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

/// Municipal district statistics CLI (argument schema only)
#[derive(Parser, Debug)]
#[command(name = "bezirk", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Download cache directory
    #[arg(long, default_value = "data", value_hint = ValueHint::DirPath)]
    pub cache_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download upstream documents into the local cache
    Fetch(FetchArgs),

    /// Reallocate precinct election results onto the statistical districts
    Realloc(ReallocArgs),

    /// Render a district partition as an SVG map
    Render(RenderArgs),

    /// Build the district-statistics table from the index and its themes
    Stats(StatsArgs),
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Keep only indicators of this year
    #[arg(long)]
    pub year: Option<String>,

    /// Output CSV file
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Document ids to fetch (all registered documents if omitted)
    pub ids: Vec<String>,

    /// Re-download even if a cached copy exists
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ReallocArgs {
    /// Election result document id
    #[arg(long, default_value = "bm01")]
    pub election: String,

    /// Output CSV file
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: PathBuf,

    /// Derive percentage columns instead of absolute counts
    #[arg(long)]
    pub percent: bool,

    /// Emit zero rows for districts without any overlapping precinct
    #[arg(long)]
    pub empty_targets: bool,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Shape document id to draw
    #[arg(long, default_value = "stats-shape")]
    pub shape: String,

    /// Color districts by this column of the reallocated election results
    #[arg(long)]
    pub column: Option<String>,

    /// Election result document id backing the heatmap
    #[arg(long, default_value = "bm01")]
    pub election: String,

    /// Output SVG file
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: PathBuf,
}
