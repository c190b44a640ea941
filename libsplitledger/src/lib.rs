//! libsplitledger - building balanced transactions for plain text ledger files
//! ---
//!
//! Transactions are typed in one posting at a time, either as a plain posting,
//! as an amount split in half between two accounts, or as the final balancing
//! posting that zeroes every currency. Finished transactions are inserted into
//! an existing [ledger](https://ledger-cli.org) file at their chronological
//! position, leaving everything else in that file untouched.
//!

extern crate pest;
#[macro_use]
extern crate pest_derive;

/// Accumulates postings and produces balanced [`Transaction`][transaction::Transaction]s.
///
/// The builder follows a small state machine, `AwaitingHeader -> Accumulating
/// -> Finalized`. Failing commands never touch the accumulated state.
pub mod builder;

/// The interactive command language (`a`, `s`, `f` and the empty line).
pub mod command;

/// Best-effort scan of an existing ledger file, feeding autocompletion.
pub mod index;

/// Currency tagged decimal amounts.
pub mod money;

/// Our main parser entrypoints.
pub mod parser;

pub mod posting;

/// Loading and atomically replacing the ledger file.
pub mod store;

pub mod transaction;

/// Inserting a finished transaction into ledger file content.
pub mod writer;

pub use builder::{BuilderState, TransactionBuilder};
pub use command::Command;
pub use index::LedgerIndex;
pub use money::{CommodityStyle, Money};
pub use posting::Posting;
pub use transaction::{Header, Transaction};
pub use writer::{insert, Insertion, Layout};

/// Everything that can go wrong while building or saving a transaction.
///
/// All variants except [`LedgerError::Io`] are recoverable at the command
/// level: the builder state is left as it was before the failing command.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid date `{0}'")]
    InvalidDate(String),

    #[error("cannot combine `{left}' with `{right}'")]
    CurrencyMismatch { left: String, right: String },

    #[error("{0}")]
    InvalidState(String),

    #[error("`{left}' plus `{right}' is out of range")]
    Overflow { left: String, right: String },

    #[error("transaction has no postings")]
    EmptyTransaction,

    #[error("{0}")]
    MalformedCommand(String),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;
