use crate::{
    command::Command,
    money::Money,
    parser::parse_date,
    posting::Posting,
    transaction::{Header, Transaction},
    LedgerError,
};

use indexmap::IndexMap;
use tracing::{debug, trace};

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuilderState {
    AwaitingHeader,
    Accumulating,
    Finalized,
}

impl fmt::Display for BuilderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuilderState::AwaitingHeader => write!(f, "no transaction in progress, enter a header first"),
            BuilderState::Accumulating => write!(f, "a transaction is already in progress"),
            BuilderState::Finalized => write!(f, "transaction is already finalized"),
        }
    }
}

#[derive(Debug)]
pub struct TransactionBuilder {
    state: BuilderState,
    header: Option<Header>,
    postings: Vec<Posting>,
    totals: IndexMap<String, Money>,
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionBuilder {
    pub fn new() -> TransactionBuilder {
        TransactionBuilder {
            state: BuilderState::AwaitingHeader,
            header: None,
            postings: Vec::new(),
            totals: IndexMap::new(),
        }
    }

    pub fn state(&self) -> BuilderState {
        self.state
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    /// Running totals per currency, in the order currencies were first used.
    pub fn totals(&self) -> impl Iterator<Item = &Money> {
        self.totals.values()
    }

    pub fn running_total(&self, currency: &str) -> Option<&Money> {
        self.totals.get(currency)
    }

    /// Totals that still need a balancing posting.
    pub fn imbalance(&self) -> Vec<&Money> {
        self.totals().filter(|total| !total.is_zero()).collect()
    }

    /// Drop whatever is in progress and wait for a new header.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn expect_state(&self, expected: BuilderState) -> Result<(), LedgerError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(LedgerError::InvalidState(self.state.to_string()))
        }
    }

    pub fn start_header(&mut self, date_text: &str, description: &str) -> Result<(), LedgerError> {
        self.expect_state(BuilderState::AwaitingHeader)?;
        let date = parse_date(date_text)?;

        debug!(%date, description, "starting transaction");
        self.header = Some(Header {
            date,
            description: description.trim().to_string(),
        });
        self.state = BuilderState::Accumulating;
        Ok(())
    }

    /// Accept a raw header line, `<date> <description>`.
    pub fn start_header_line(&mut self, line: &str) -> Result<(), LedgerError> {
        let line = line.trim();
        let (date_text, description) = line
            .split_once(char::is_whitespace)
            .unwrap_or((line, ""));
        self.start_header(date_text, description)
    }

    /// Add `amount` to the running total of its currency. Nothing is touched
    /// when the sum cannot be computed.
    fn accumulate(&mut self, amount: &Money) -> Result<Money, LedgerError> {
        match self.totals.get(amount.currency()) {
            Some(total) => total.checked_add(amount),
            None => Ok(amount.clone()),
        }
    }

    pub fn apply_add(&mut self, account: &str, amount: Money) -> Result<(), LedgerError> {
        self.expect_state(BuilderState::Accumulating)?;
        let total = self.accumulate(&amount)?;

        trace!(account, %amount, "add posting");
        self.totals.insert(amount.currency().to_string(), total);
        self.postings.push(Posting::new(account, amount));
        Ok(())
    }

    pub fn apply_split(&mut self, first: &str, second: &str, amount: Money) -> Result<(), LedgerError> {
        self.expect_state(BuilderState::Accumulating)?;
        let total = self.accumulate(&amount)?;
        let (first_share, second_share) = amount.halve();

        trace!(first, %first_share, second, %second_share, "split posting");
        self.totals.insert(amount.currency().to_string(), total);
        self.postings.push(Posting::new(first, first_share));
        self.postings.push(Posting::new(second, second_share));
        Ok(())
    }

    /// Balance every currency against `account` and hand out the finished
    /// transaction. Currencies already at zero get no posting.
    pub fn apply_finalize(&mut self, account: &str) -> Result<Transaction, LedgerError> {
        self.expect_state(BuilderState::Accumulating)?;
        self.ensure_postings()?;

        let balancing: Vec<Posting> = self
            .imbalance()
            .into_iter()
            .map(|total| Posting::new(account, -total))
            .collect();
        self.postings.extend(balancing);
        self.complete()
    }

    /// Finish a transaction that already balances on its own.
    pub fn finish(&mut self) -> Result<Transaction, LedgerError> {
        self.expect_state(BuilderState::Accumulating)?;
        self.ensure_postings()?;

        let imbalance = self.imbalance();
        if !imbalance.is_empty() {
            let remaining: Vec<String> = imbalance.iter().map(|total| total.to_string()).collect();
            return Err(LedgerError::InvalidState(format!(
                "transaction does not balance, {} left over, use `f <account>'",
                remaining.join(", ")
            )));
        }
        self.complete()
    }

    pub fn apply(&mut self, command: Command<'_>) -> Result<Option<Transaction>, LedgerError> {
        match command {
            Command::Add { account, amount } => self.apply_add(account, amount).map(|_| None),
            Command::Split {
                first,
                second,
                amount,
            } => self.apply_split(first, second, amount).map(|_| None),
            Command::Finalize { account } => self.apply_finalize(account).map(Some),
            Command::Submit => self.finish().map(Some),
        }
    }

    fn ensure_postings(&mut self) -> Result<(), LedgerError> {
        if self.postings.is_empty() {
            debug!("discarding empty transaction");
            self.reset();
            return Err(LedgerError::EmptyTransaction);
        }
        Ok(())
    }

    fn complete(&mut self) -> Result<Transaction, LedgerError> {
        let header = self
            .header
            .clone()
            .ok_or_else(|| LedgerError::InvalidState(BuilderState::AwaitingHeader.to_string()))?;
        let transaction = Transaction::new(header, self.postings.clone())?;
        debug_assert!(transaction.is_balanced());

        debug!(date = %transaction.date(), postings = transaction.postings().len(), "transaction finalized");
        self.state = BuilderState::Finalized;
        Ok(transaction)
    }
}
