use crate::money::Money;

/// One account line of a transaction. Without an amount the posting is the
/// open slot that absorbs whatever the rest of the transaction leaves over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Posting {
    account: String,
    amount: Option<Money>,
}

impl Posting {
    pub fn new(account: &str, amount: Money) -> Self {
        Posting {
            account: account.to_string(),
            amount: Some(amount),
        }
    }

    pub fn open(account: &str) -> Self {
        Posting {
            account: account.to_string(),
            amount: None,
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn amount(&self) -> Option<&Money> {
        self.amount.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.amount.is_none()
    }
}
