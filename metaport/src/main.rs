use std::sync::Arc;

use anyhow::Context;
use metaport::cmd::{MetaportCommand, NestedCommand, ReplayCommand, RunCommand};
use metaport::{MigrateConf, MigrationReport, Migrator};
use metaport_db::{JsonDirSource, MemoryStore, PgLegacySource, PgMetaStore, connect};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(report: &MigrationReport) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

async fn run(conf: MigrateConf, cmd: RunCommand) -> anyhow::Result<()> {
    let legacy_url = match cmd.legacy_url {
        Some(url) => url,
        None => conf.legacy_url()?.to_string(),
    };
    let target_url = match cmd.target_url {
        Some(url) => url,
        None => conf.target_url()?.to_string(),
    };
    let mode = match cmd.concurrency {
        Some(n) => metaport::DrainMode::from_concurrency(n),
        None => conf.drain_mode(),
    };

    let legacy = connect(&legacy_url, conf.max_connections)
        .await
        .context("connecting to the legacy database")?;
    let target = connect(&target_url, conf.max_connections)
        .await
        .context("connecting to the target database")?;
    let store = PgMetaStore::new(target);
    store.ensure_schema().await?;

    let report = Migrator::builder(Arc::new(PgLegacySource::new(legacy)), Arc::new(store))
        .drain_mode(mode)
        .build()
        .run()
        .await?;
    print_report(&report)
}

async fn replay(conf: MigrateConf, cmd: ReplayCommand) -> anyhow::Result<()> {
    anyhow::ensure!(cmd.dir.is_dir(), "{} is not a directory", cmd.dir.display());
    let store = Arc::new(MemoryStore::new());
    let report = Migrator::builder(Arc::new(JsonDirSource::new(&cmd.dir)), store.clone())
        .drain_mode(conf.drain_mode())
        .build()
        .run()
        .await?;
    print_report(&report)?;
    if cmd.dump {
        println!("{}", serde_json::to_string_pretty(&store.snapshot())?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd: MetaportCommand = argh::from_env();
    let conf = MigrateConf::from_env();
    if conf.log_init {
        init_logging(cmd.verbose);
    }
    match cmd.nested {
        NestedCommand::Run(run_cmd) => run(conf, run_cmd).await,
        NestedCommand::Replay(replay_cmd) => replay(conf, replay_cmd).await,
    }
}
