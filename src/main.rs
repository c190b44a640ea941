use anyhow::Context;
use clap::Parser;
use libsplitledger::{store, LedgerIndex};
use tracing::info;

mod cli;
mod completion;
mod session;

use session::Session;

/// Log to stderr. `-v` flags win over `RUST_LOG`, which wins over `warn`.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose);

    let content = store::load(&cli.file)
        .with_context(|| format!("cannot open ledger file `{}'", cli.file.display()))?;
    let index = LedgerIndex::scan(&content);
    info!(
        path = %cli.file.display(),
        accounts = index.accounts().count(),
        currencies = index.currencies().count(),
        skipped = index.skipped(),
        "ledger ready"
    );

    let mut session = Session::new(cli.file.clone(), index, cli.dry_run);
    if cli.script {
        session::run_script(&mut session)
    } else {
        session::run_interactive(&mut session, cli.history())
    }
}
