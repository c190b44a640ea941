use clap::{builder::BoolishValueParser, ArgAction, Parser};

use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(
    name = "splitledger",
    about = "Type in balanced transactions, splits included, and file them into a ledger",
    version
)]
pub struct Cli {
    /// Ledger file to insert transactions into
    #[arg(env = "LEDGER_FILE")]
    pub file: PathBuf,

    /// Line editing history file
    #[arg(long, env = "SPLITLEDGER_HISTORY", default_value = ".splitledger_history")]
    pub history: PathBuf,

    /// Do not load or save line editing history
    #[arg(long)]
    pub no_history: bool,

    /// Print finished transactions instead of writing them to the ledger
    #[arg(long)]
    pub dry_run: bool,

    /// Read lines from stdin, without line editing
    #[arg(long, env = "SPLITLEDGER_SCRIPT", value_parser = BoolishValueParser::new())]
    pub script: bool,

    /// More logging, repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn history(&self) -> Option<&Path> {
        (!self.no_history).then_some(self.history.as_path())
    }
}
