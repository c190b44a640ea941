use crate::money::{Money, ParsedAmount};
use crate::parser::{LedgerParser, Rule};
use crate::LedgerError;

use pest::iterators::{Pair, Pairs};
use pest::Parser;

const ADD_USAGE: &str = "usage: a <account> <amount>";
const SPLIT_USAGE: &str = "usage: s <account> <account> <amount>";
const FINALIZE_USAGE: &str = "usage: f <account>";

#[derive(Clone, Debug, PartialEq)]
pub enum Command<'c> {
    Add {
        account: &'c str,
        amount: Money,
    },
    Split {
        first: &'c str,
        second: &'c str,
        amount: Money,
    },
    Finalize {
        account: &'c str,
    },
    /// The empty line: finalize without a balancing account and save.
    Submit,
}

macro_rules! parse_next {
    (account, $pairs:ident) => {
        parse_next!($pairs, "account").as_str()
    };
    (amount, $pairs:ident) => {
        ParsedAmount::parse(parse_next!($pairs, "amount"))
            .map_err(|err| LedgerError::MalformedCommand(err.to_string()))?
            .to_money()?
    };
    ($pairs:ident, $what:expr) => {
        $pairs.next().ok_or(LedgerError::MalformedCommand(format!(
            "invalid next token, expected {}",
            $what
        )))?
    };
}

impl<'c> Command<'c> {
    pub fn verbs() -> &'static [&'static str] {
        &["a", "s", "f"]
    }

    /// Accounts the command posts to.
    pub fn accounts(&self) -> Vec<&'c str> {
        match *self {
            Command::Add { account, .. } | Command::Finalize { account } => vec![account],
            Command::Split { first, second, .. } => vec![first, second],
            Command::Submit => Vec::new(),
        }
    }

    pub fn parse(line: &'c str) -> Result<Command<'c>, LedgerError> {
        let trimmed = line.trim();
        let verb = match trimmed.split_whitespace().next() {
            None => return Ok(Command::Submit),
            Some(verb) => verb,
        };
        let usage = match verb {
            "a" => ADD_USAGE,
            "s" => SPLIT_USAGE,
            "f" => FINALIZE_USAGE,
            _ => {
                return Err(LedgerError::MalformedCommand(format!(
                    "unknown command `{}', expected one of a, s, f",
                    verb
                )))
            }
        };

        let mut pairs = LedgerParser::parse(Rule::command, line)
            .map_err(|_| LedgerError::MalformedCommand(usage.to_string()))?;
        let command = pairs
            .next()
            .and_then(|command| command.into_inner().next())
            .ok_or(LedgerError::MalformedCommand(usage.to_string()))?;
        Self::into_command(command)
    }

    fn into_command(command: Pair<'c, Rule>) -> Result<Command<'c>, LedgerError> {
        let tag = command.as_rule();
        let mut pairs: Pairs<'c, Rule> = command.into_inner();

        let command = match tag {
            Rule::add_command => Command::Add {
                account: parse_next!(account, pairs),
                amount: parse_next!(amount, pairs),
            },
            Rule::split_command => Command::Split {
                first: parse_next!(account, pairs),
                second: parse_next!(account, pairs),
                amount: parse_next!(amount, pairs),
            },
            Rule::finalize_command => Command::Finalize {
                account: parse_next!(account, pairs),
            },
            _ => {
                return Err(LedgerError::MalformedCommand(format!(
                    "unexpected command `{}'",
                    pairs.as_str()
                )))
            }
        };

        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use crate::command::Command;
    use crate::money::Money;
    use crate::LedgerError;
    use rust_decimal_macros::dec;

    use anyhow::Result;

    fn malformed(line: &str) -> String {
        match Command::parse(line) {
            Err(LedgerError::MalformedCommand(msg)) => msg,
            other => panic!("expected malformed command, got {:?}", other),
        }
    }

    #[test]
    fn parse_add_command() -> Result<()> {
        assert_eq!(
            Command::parse("a Expenses:Food €5.00")?,
            Command::Add {
                account: "Expenses:Food",
                amount: Money::new(dec!(5.00), "€"),
            }
        );
        assert_eq!(
            Command::parse("  a\tAssets:Cash   -12.5 CZK  ")?,
            Command::Add {
                account: "Assets:Cash",
                amount: Money::new(dec!(-12.50), "CZK"),
            }
        );
        Ok(())
    }

    #[test]
    fn parse_split_command() -> Result<()> {
        assert_eq!(
            Command::parse("s Debts:Roomie Debts:Me €5.01")?,
            Command::Split {
                first: "Debts:Roomie",
                second: "Debts:Me",
                amount: Money::new(dec!(5.01), "€"),
            }
        );
        assert_eq!(
            Command::parse("s Expenses:Food Debts:Peter \"M&M\" 1,200")?,
            Command::Split {
                first: "Expenses:Food",
                second: "Debts:Peter",
                amount: Money::new(dec!(1200), "M&M"),
            }
        );
        Ok(())
    }

    #[test]
    fn parse_finalize_and_submit() -> Result<()> {
        assert_eq!(
            Command::parse("f Accounts:Checking")?,
            Command::Finalize {
                account: "Accounts:Checking"
            }
        );
        assert_eq!(Command::parse("")?, Command::Submit);
        assert_eq!(Command::parse("   ")?, Command::Submit);
        Ok(())
    }

    #[test]
    fn command_accounts() -> Result<()> {
        assert_eq!(
            Command::parse("s Debts:Roomie Debts:Me €5")?.accounts(),
            vec!["Debts:Roomie", "Debts:Me"]
        );
        assert_eq!(Command::parse("f Assets:Cash")?.accounts(), vec!["Assets:Cash"]);
        assert!(Command::Submit.accounts().is_empty());
        Ok(())
    }

    #[test]
    fn parse_malformed_commands() {
        assert_eq!(
            malformed("x Expenses:Food €5"),
            "unknown command `x', expected one of a, s, f"
        );
        assert_eq!(malformed("a Expenses:Food"), "usage: a <account> <amount>");
        assert_eq!(malformed("a Expenses:Food €five"), "usage: a <account> <amount>");
        assert_eq!(malformed("s Debts:Roomie €5.00"), "usage: s <account> <account> <amount>");
        assert_eq!(malformed("f"), "usage: f <account>");
        assert_eq!(malformed("f Assets:Cash Assets:Bank"), "usage: f <account>");
        assert_eq!(malformed("a Expenses:Food €5.0.1"), "invalid amount `5.0.1'");
    }
}
