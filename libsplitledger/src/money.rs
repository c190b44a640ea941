use crate::parser::{unquote, Rule};
use crate::LedgerError;
use anyhow::{anyhow, Result};
use indexmap::IndexMap;
use pest::iterators::Pair;
use rust_decimal::Decimal;

use std::fmt;
use std::str::FromStr;

/// Fractional digits every amount carries at least.
pub const MIN_SCALE: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Position {
    Prefix, // €5.00
    Suffix, // 5.00 EUR
}

/// How a commodity is written in a ledger file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommodityStyle {
    pub position: Position,
    pub spaced: bool,
    pub precision: u32,
}

impl CommodityStyle {
    /// Style used for symbols the ledger file never mentions: glyphs stick to
    /// the front of the number, alphabetic codes follow it after a space.
    pub fn default_for(symbol: &str) -> Self {
        let is_code = symbol.chars().count() > 1 && symbol.chars().all(char::is_alphabetic);
        CommodityStyle {
            position: if is_code {
                Position::Suffix
            } else {
                Position::Prefix
            },
            spaced: is_code,
            precision: MIN_SCALE,
        }
    }
}

/// Commodity styles keyed by symbol, in first-seen order.
pub type Styles = IndexMap<String, CommodityStyle>;

/// Record the style of an amount seen in a ledger file. The first sighting
/// decides position and spacing, precision grows to the widest seen.
pub fn observe_style(styles: &mut Styles, amount: &ParsedAmount<'_>) {
    styles
        .entry(amount.symbol.to_string())
        .and_modify(|style| style.precision = style.precision.max(amount.style.precision))
        .or_insert(amount.style);
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedAmount<'s> {
    pub negative: bool,
    pub quantity: &'s str,
    pub symbol: &'s str,
    pub style: CommodityStyle,
}

impl<'a> ParsedAmount<'a> {
    pub fn parse(token: Pair<'a, Rule>) -> Result<ParsedAmount<'a>> {
        let inner = token
            .into_inner()
            .next()
            .ok_or(anyhow!("invalid next token, expected amount"))?;
        let position = match inner.as_rule() {
            Rule::prefix_amount => Position::Prefix,
            Rule::suffix_amount => Position::Suffix,
            _ => {
                return Err(anyhow!(format!(
                    "unexpected token for amount: '{}'",
                    inner.as_str()
                )))
            }
        };
        let text = inner.as_str();
        let base = inner.as_span().start();

        let mut negative = false;
        let mut symbol = None;
        let mut quantity = None;
        for pair in inner.into_inner() {
            let span = pair.as_span();
            match pair.as_rule() {
                Rule::neg => negative = !negative,
                Rule::symbol => symbol = Some((span.start() - base, span.end() - base)),
                Rule::quantity => quantity = Some((span.start() - base, span.end() - base)),
                _ => {}
            }
        }
        let symbol = symbol.ok_or(anyhow!(format!("invalid currency: '{}'", text)))?;
        let quantity = quantity.ok_or(anyhow!(format!("invalid nominal: '{}'", text)))?;

        let gap = match position {
            Position::Prefix => &text[symbol.1..quantity.0],
            Position::Suffix => &text[quantity.1..symbol.0],
        };
        let quantity = &text[quantity.0..quantity.1];
        let precision = quantity
            .rfind('.')
            .map(|dot| (quantity.len() - dot - 1) as u32)
            .unwrap_or(0);

        Ok(ParsedAmount {
            negative,
            quantity,
            symbol: unquote(&text[symbol.0..symbol.1]),
            style: CommodityStyle {
                position,
                spaced: gap.contains(|c: char| c == ' ' || c == '\t'),
                precision,
            },
        })
    }

    /// `,` only groups thousands, the decimal point is always `.`.
    pub fn to_money(&self) -> Result<Money, LedgerError> {
        if let Some(dot) = self.quantity.find('.') {
            if self.quantity[dot..].contains(',') {
                return Err(LedgerError::MalformedCommand(format!(
                    "invalid amount `{}', use `.' for decimals and `,' for thousands",
                    self.quantity
                )));
            }
        }
        let digits: String = self.quantity.chars().filter(|&c| c != ',').collect();
        let amount = Decimal::from_str(&digits)
            .map_err(|_| LedgerError::MalformedCommand(format!("invalid amount `{}'", self.quantity)))?;
        Ok(Money::new(
            if self.negative { -amount } else { amount },
            self.symbol,
        ))
    }
}

/// An exact decimal amount of one currency.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Money {
    amount: Decimal,
    currency: String,
}

impl Money {
    /// Amounts carry at least [`MIN_SCALE`] fractional digits, more if given.
    pub fn new(amount: Decimal, currency: &str) -> Self {
        let mut amount = amount;
        if amount.scale() < MIN_SCALE {
            amount.rescale(MIN_SCALE);
        }
        Money {
            amount,
            currency: currency.to_string(),
        }
    }

    pub fn zero(currency: &str) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Sum of two amounts of the same currency, at the wider of both scales.
    pub fn checked_add(&self, rhs: &Money) -> Result<Money, LedgerError> {
        if self.currency != rhs.currency {
            return Err(LedgerError::CurrencyMismatch {
                left: self.to_string(),
                right: rhs.to_string(),
            });
        }
        let amount = self
            .amount
            .checked_add(rhs.amount)
            .ok_or_else(|| LedgerError::Overflow {
                left: self.to_string(),
                right: rhs.to_string(),
            })?;
        Ok(Money {
            amount,
            currency: self.currency.clone(),
        })
    }

    /// Split into two shares summing exactly to `self`. The first share is the
    /// floor of the half in the smallest unit of the amount's scale, the second
    /// takes the remainder.
    pub fn halve(&self) -> (Money, Money) {
        let scale = self.amount.scale();
        let first = Decimal::from_i128_with_scale(self.amount.mantissa().div_euclid(2), scale);
        let second = self.amount - first;
        (
            Money {
                amount: first,
                currency: self.currency.clone(),
            },
            Money {
                amount: second,
                currency: self.currency.clone(),
            },
        )
    }

    pub fn render(&self, style: &CommodityStyle) -> String {
        let mut magnitude = self.amount.abs();
        if magnitude.scale() < style.precision {
            magnitude.rescale(style.precision);
        }
        let sign = if self.amount.is_sign_negative() && !self.amount.is_zero() {
            "-"
        } else {
            ""
        };
        let symbol = quote(&self.currency);
        let space = if style.spaced { " " } else { "" };

        match style.position {
            Position::Prefix => format!("{sign}{symbol}{space}{magnitude}"),
            Position::Suffix => format!("{sign}{magnitude}{space}{symbol}"),
        }
    }
}

fn quote(symbol: &str) -> String {
    let needs_quotes = symbol.is_empty()
        || symbol.contains(|c: char| {
            c.is_ascii_digit() || c.is_whitespace() || "-+.,;@=()".contains(c)
        });
    if needs_quotes {
        format!("\"{symbol}\"")
    } else {
        symbol.to_string()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&CommodityStyle::default_for(&self.currency)))
    }
}

impl std::ops::Neg for &Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money {
            amount: -self.amount,
            currency: self.currency.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::money::{observe_style, CommodityStyle, Money, ParsedAmount, Position, Styles};
    use crate::parser::{LedgerParser, Rule};
    use crate::LedgerError;
    use pest::Parser;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use anyhow::{anyhow, Result};

    fn parse_amount(input: &str) -> Result<ParsedAmount<'_>> {
        let mut tokens = LedgerParser::parse(Rule::amount, input)?;
        ParsedAmount::parse(tokens.next().ok_or(anyhow!("empty ast"))?)
    }

    #[test]
    fn parse_prefix_amount() -> Result<()> {
        let amount = parse_amount("-€1,234.5")?;
        assert!(amount.negative);
        assert_eq!(amount.quantity, "1,234.5");
        assert_eq!(amount.symbol, "€");
        assert_eq!(
            amount.style,
            CommodityStyle {
                position: Position::Prefix,
                spaced: false,
                precision: 1,
            }
        );
        assert_eq!(amount.to_money()?, Money::new(dec!(-1234.50), "€"));
        Ok(())
    }

    #[test]
    fn parse_suffix_amount() -> Result<()> {
        let amount = parse_amount("120 CZK")?;
        assert!(!amount.negative);
        assert_eq!(amount.symbol, "CZK");
        assert_eq!(amount.style.position, Position::Suffix);
        assert!(amount.style.spaced);
        assert_eq!(amount.style.precision, 0);

        let amount = parse_amount("\"M&M\" 3")?;
        assert_eq!(amount.symbol, "M&M");
        assert_eq!(amount.style.position, Position::Prefix);
        Ok(())
    }

    #[test]
    fn parse_invalid_quantity() -> Result<()> {
        let amount = parse_amount("€1.2.3")?;
        assert!(matches!(
            amount.to_money(),
            Err(LedgerError::MalformedCommand(msg)) if msg == "invalid amount `1.2.3'"
        ));

        let amount = parse_amount("€1.234,56")?;
        assert!(matches!(
            amount.to_money(),
            Err(LedgerError::MalformedCommand(msg))
                if msg == "invalid amount `1.234,56', use `.' for decimals and `,' for thousands"
        ));
        assert_eq!(parse_amount("€1,234.56")?.to_money()?, Money::new(dec!(1234.56), "€"));
        Ok(())
    }

    #[test]
    fn test_money_scale() {
        assert_eq!(Money::new(dec!(7), "€").amount().scale(), 2);
        assert_eq!(Money::new(dec!(0.125), "€").amount().scale(), 3);
        assert!(Money::zero("$").is_zero());
    }

    #[test]
    fn test_checked_add() -> Result<()> {
        let sum = Money::new(dec!(5.00), "€").checked_add(&Money::new(dec!(0.125), "€"))?;
        assert_eq!(sum.amount(), dec!(5.125));
        assert_eq!(sum.amount().scale(), 3);

        let err = Money::new(dec!(5.00), "€")
            .checked_add(&Money::new(dec!(5.00), "$"))
            .unwrap_err();
        assert_eq!(format!("{}", err), "cannot combine `€5.00' with `$5.00'");

        let err = Money::new(Decimal::MAX, "€")
            .checked_add(&Money::new(dec!(1), "€"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Overflow { .. }));
        Ok(())
    }

    #[test]
    fn test_negate() {
        let money = Money::new(dec!(5.00), "€");
        assert_eq!(-&money, Money::new(dec!(-5.00), "€"));
        assert_eq!(-&-&money, money);
    }

    #[test]
    fn test_halve_odd_minor_units() {
        let (first, second) = Money::new(dec!(5.01), "€").halve();
        assert_eq!(first, Money::new(dec!(2.50), "€"));
        assert_eq!(second, Money::new(dec!(2.51), "€"));

        let (first, second) = Money::new(dec!(-5.01), "€").halve();
        assert_eq!(first, Money::new(dec!(-2.51), "€"));
        assert_eq!(second, Money::new(dec!(-2.50), "€"));

        let (first, second) = Money::new(dec!(7), "€").halve();
        assert_eq!(first.to_string(), "€3.50");
        assert_eq!(second.to_string(), "€3.50");
    }

    #[test]
    fn test_render_styles() {
        let money = Money::new(dec!(-5), "€");
        assert_eq!(money.to_string(), "-€5.00");
        assert_eq!(Money::new(dec!(120), "CZK").to_string(), "120.00 CZK");
        assert_eq!(Money::new(dec!(3), "M&M 1").to_string(), "\"M&M 1\"3.00");

        let style = CommodityStyle {
            position: Position::Prefix,
            spaced: true,
            precision: 3,
        };
        assert_eq!(Money::new(dec!(1.5), "USD").render(&style), "USD 1.500");
    }

    #[test]
    fn test_observe_style() -> Result<()> {
        let mut styles = Styles::new();
        observe_style(&mut styles, &parse_amount("€5")?);
        observe_style(&mut styles, &parse_amount("€ 5.125")?);
        let style = styles.get("€").ok_or(anyhow!("style not recorded"))?;
        assert!(!style.spaced);
        assert_eq!(style.precision, 3);
        Ok(())
    }

    proptest! {
        #[test]
        fn halve_reconstructs_exactly(mantissa in any::<i64>(), scale in 0u32..8) {
            let money = Money::new(Decimal::new(mantissa, scale), "€");
            let (first, second) = money.halve();
            prop_assert_eq!(first.checked_add(&second).unwrap(), money.clone());
            prop_assert!(first.amount() <= second.amount());
            prop_assert_eq!(money.halve(), (first, second));
        }
    }
}
