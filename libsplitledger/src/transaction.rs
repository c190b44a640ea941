use crate::{money::Money, posting::Posting, writer::Layout, LedgerError};

use chrono::NaiveDate;
use indexmap::IndexMap;
use rust_decimal::Decimal;

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub date: NaiveDate,
    pub description: String,
}

/// A finished transaction, ready to be written to the ledger file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    header: Header,
    postings: Vec<Posting>,
}

impl Transaction {
    pub fn new(header: Header, postings: Vec<Posting>) -> Result<Transaction, LedgerError> {
        if postings.iter().filter(|&p| p.is_open()).count() > 1 {
            return Err(LedgerError::InvalidState(
                "only 1 posting can have its amount elided".to_string(),
            ));
        }
        Ok(Transaction { header, postings })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn date(&self) -> NaiveDate {
        self.header.date
    }

    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    /// Per currency sum of all concrete amounts, in first-seen order.
    pub fn balance(&self) -> Result<IndexMap<&str, Decimal>, LedgerError> {
        let mut balances: IndexMap<&str, Money> = IndexMap::new();
        for amount in self.postings.iter().filter_map(Posting::amount) {
            let total = match balances.get(amount.currency()) {
                Some(total) => total.checked_add(amount)?,
                None => amount.clone(),
            };
            balances.insert(amount.currency(), total);
        }
        Ok(balances
            .into_iter()
            .map(|(currency, total)| (currency, total.amount()))
            .collect())
    }

    /// Every currency sums to zero, or an open slot takes up the difference.
    pub fn is_balanced(&self) -> bool {
        self.postings.iter().any(Posting::is_open)
            || self
                .balance()
                .map_or(false, |balance| balance.values().all(|total| total.is_zero()))
    }

    pub fn amounts(&self) -> impl Iterator<Item = &Money> {
        self.postings.iter().filter_map(Posting::amount)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Layout::default().render(self))
    }
}
