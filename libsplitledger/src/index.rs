use crate::money::{observe_style, CommodityStyle, Styles};
use crate::parser::{classify, lines, Line};
use crate::transaction::Transaction;

use indexmap::IndexSet;
use tracing::{debug, trace};

/// Accounts and currencies known to a ledger file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LedgerIndex {
    accounts: IndexSet<String>,
    currencies: IndexSet<String>,
    styles: Styles,
    skipped: usize,
}

/// `(Assets:Budget)` and `[Assets:Budget]` are virtual postings to `Assets:Budget`.
fn strip_virtual(account: &str) -> &str {
    account
        .trim_start_matches(&['(', '['][..])
        .trim_end_matches(&[')', ']'][..])
}

impl LedgerIndex {
    pub fn new() -> Self {
        Default::default()
    }

    /// Single pass over `content`. Lines that cannot be parsed are skipped.
    pub fn scan(content: &str) -> Self {
        let mut index = Self::new();
        let mut in_block = false;

        for (line_no, raw) in lines(content).enumerate() {
            match classify(raw.text) {
                Line::Header(_) | Line::Automated => in_block = true,
                Line::Posting(posting) if in_block => {
                    index.add_account(posting.account);
                    if let Some(amount) = posting.amount {
                        index.add_currency(amount.symbol);
                        observe_style(&mut index.styles, &amount);
                    }
                }
                Line::Posting(_) => trace!(line = line_no + 1, "posting outside of a transaction"),
                Line::Comment { indented: true } => {}
                Line::Unparsed { indented } => {
                    trace!(line = line_no + 1, "skipping unparseable line");
                    index.skipped += 1;
                    in_block = in_block && indented;
                }
                Line::AccountDirective(account) => {
                    index.add_account(account);
                    in_block = false;
                }
                Line::CommodityDirective { symbol, amount } => {
                    index.add_currency(symbol);
                    if let Some(amount) = amount {
                        observe_style(&mut index.styles, &amount);
                    }
                    in_block = false;
                }
                Line::Blank | Line::Comment { indented: false } | Line::Other => in_block = false,
            }
        }

        debug!(
            accounts = index.accounts.len(),
            currencies = index.currencies.len(),
            skipped = index.skipped,
            "ledger indexed"
        );
        index
    }

    fn add_account(&mut self, account: &str) {
        let account = strip_virtual(account);
        if !account.is_empty() && !self.accounts.contains(account) {
            self.accounts.insert(account.to_string());
        }
    }

    fn add_currency(&mut self, symbol: &str) {
        if !self.currencies.contains(symbol) {
            self.currencies.insert(symbol.to_string());
        }
    }

    /// Make the accounts and currencies of a freshly saved transaction completable.
    pub fn absorb(&mut self, transaction: &Transaction) {
        for posting in transaction.postings() {
            self.add_account(posting.account());
            if let Some(amount) = posting.amount() {
                self.add_currency(amount.currency());
            }
        }
    }

    pub fn accounts(&self) -> impl Iterator<Item = &str> {
        self.accounts.iter().map(String::as_str)
    }

    pub fn currencies(&self) -> impl Iterator<Item = &str> {
        self.currencies.iter().map(String::as_str)
    }

    pub fn has_account(&self, account: &str) -> bool {
        self.accounts.contains(account)
    }

    pub fn style(&self, symbol: &str) -> Option<&CommodityStyle> {
        self.styles.get(symbol)
    }

    pub fn styles(&self) -> &Styles {
        &self.styles
    }

    /// Lines that looked like ledger entries but could not be parsed.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn complete_accounts(&self, prefix: &str) -> Vec<&str> {
        complete(&self.accounts, prefix)
    }

    pub fn complete_currencies(&self, prefix: &str) -> Vec<&str> {
        complete(&self.currencies, prefix)
    }
}

fn complete<'s>(set: &'s IndexSet<String>, prefix: &str) -> Vec<&'s str> {
    let mut matches: Vec<&str> = set
        .iter()
        .map(String::as_str)
        .filter(|candidate| candidate.starts_with(prefix))
        .collect();
    matches.sort_unstable();
    matches
}
