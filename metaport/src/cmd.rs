use std::path::PathBuf;

use argh::FromArgs;

#[derive(FromArgs, PartialEq, Eq, Debug, Clone)]
/// Upgrade legacy tenant metadata to the normalized schema
pub struct MetaportCommand {
    #[argh(subcommand)]
    pub nested: NestedCommand,

    #[argh(switch, short = 'v', long = "verbose")]
    /// enable verbose output
    pub verbose: bool,
}

#[derive(FromArgs, PartialEq, Eq, Debug, Clone)]
#[argh(subcommand)]
pub enum NestedCommand {
    Run(RunCommand),
    Replay(ReplayCommand),
}

#[derive(FromArgs, PartialEq, Eq, Debug, Clone)]
#[argh(subcommand, name = "run")]
/// Migrate a legacy database into the target database
pub struct RunCommand {
    #[argh(option)]
    /// legacy database url, overrides LEGACY_DATABASE_URL
    pub legacy_url: Option<String>,

    #[argh(option)]
    /// target database url, overrides TARGET_DATABASE_URL
    pub target_url: Option<String>,

    #[argh(option)]
    /// deferred actions allowed in flight per queue
    pub concurrency: Option<usize>,
}

#[derive(FromArgs, PartialEq, Eq, Debug, Clone)]
#[argh(subcommand, name = "replay")]
/// Migrate legacy collections exported as JSON files into memory
pub struct ReplayCommand {
    #[argh(positional)]
    /// directory holding one <collection>.json file per legacy collection
    pub dir: PathBuf,

    #[argh(switch)]
    /// print the migrated entities after the report
    pub dump: bool,
}
